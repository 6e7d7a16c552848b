pub mod circuit;
pub mod encoder;
pub mod simulator;
