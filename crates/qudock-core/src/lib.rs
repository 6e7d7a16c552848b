//! # QuDock Core Library
//!
//! A qubit-based molecular binding simulator and drug-candidate optimizer.
//! Atoms are encoded into small qubit registers, candidate molecules are
//! assembled into simulable quantum circuits, and an iterative optimizer
//! searches the coordinate space for candidates with improved binding,
//! stability, and mutation resistance against a target protein site.
//!
//! The scores produced here are comparative ranking metrics for candidate
//! triage, not experimentally validated binding affinities.
//!
//! ## Architectural Philosophy
//!
//! The library is designed with a strict three-layer architecture to ensure a
//! clear separation of concerns, making it modular, testable, and extensible.
//!
//! - **[`core`]: The Foundation.** Contains stateless data models (`Atom`,
//!   `Molecule`, `RegisterMap`), the pure quantum machinery (qubit encoding,
//!   circuit assembly, state-vector simulation), and the scoring math.
//!
//! - **[`engine`]: The Logic Core.** This stateful layer carries the
//!   optimization machinery: validated configuration, run-state tracking,
//!   the perturbation rule, the concurrent candidate store, and progress
//!   reporting.
//!
//! - **[`workflows`]: The Public API.** The highest-level, user-facing layer.
//!   It ties `engine` and `core` together to execute complete optimization
//!   runs, one per target mutation, and is the intended entry point for
//!   end-users of the library.

pub mod core;
pub mod engine;
pub mod workflows;
