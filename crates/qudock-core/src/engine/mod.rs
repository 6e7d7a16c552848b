//! # Engine Module
//!
//! The stateful optimization layer: validated configuration, run-state and
//! best-so-far tracking, the coordinate perturbation rule, the concurrent
//! candidate store, progress reporting, and the engine-level error taxonomy.
//!
//! The engine never talks to a simulation backend directly; the workflow
//! layer wires an [`Executor`](crate::core::quantum::simulator::Executor)
//! into the loop, so every piece here is testable without quantum state.

pub mod config;
pub mod error;
pub mod perturb;
pub mod progress;
pub mod state;
pub mod store;
