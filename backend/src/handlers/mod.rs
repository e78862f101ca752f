//! HTTP handlers for the winter service widget

pub mod area;
pub mod health;
pub mod location;
pub mod map;
pub mod weather;

pub use area::*;
pub use health::*;
pub use location::*;
pub use map::*;
pub use weather::*;
