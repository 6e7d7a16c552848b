pub mod atom;
pub mod element;
pub mod molecule;
pub mod reference;
pub mod register;
