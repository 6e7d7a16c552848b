//! User-facing workflows. [`optimize::run`] executes one complete
//! optimization run against a target mutation; [`optimize::run_many`] fans
//! independent runs out over a set of targets in parallel.

pub mod optimize;
