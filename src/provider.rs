//! Identity provider metadata and error classification.
//!
//! [`ProviderDescriptor`] holds the validated authorization, token, and end-session endpoints
//! of an authority. [`ProviderStrategy`] maps token endpoint failures into the crate's error
//! kinds without depending on any HTTP client type.

pub mod descriptor;
pub mod strategy;

pub use descriptor::*;
pub use strategy::*;
