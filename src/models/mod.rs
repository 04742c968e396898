//! Core data models for packaging and verification

pub mod manifest;
pub mod build;
pub mod outcome;

pub use manifest::*;
pub use build::*;
pub use outcome::*;
