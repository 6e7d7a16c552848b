pub mod bundle;
pub mod engine;
