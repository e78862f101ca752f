//! Shared types and computations for the winter service decision widget
//!
//! This crate contains the domain models, the risk engine and the spherical
//! geometry used by both the backend and the browser (via WASM).

pub mod geometry;
pub mod models;
pub mod risk;
pub mod types;
pub mod validation;

pub use geometry::*;
pub use models::*;
pub use risk::*;
pub use types::*;
pub use validation::*;
