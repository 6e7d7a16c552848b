//! Stateless foundation: molecular data models, qubit encoding, circuit
//! assembly, state-vector simulation, and score computation. Nothing in this
//! layer holds state across calls; everything is a pure function of its
//! inputs (plus an explicitly injected random source where sampling is
//! involved).

pub mod models;
pub mod quantum;
pub mod scoring;
