//! Domain models for the winter service decision widget

mod area;
mod provider;
mod risk;
mod weather;

pub use area::*;
pub use provider::*;
pub use risk::*;
pub use weather::*;
