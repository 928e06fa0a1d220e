//! Renderers shipped with accord.

pub mod manifest;
pub mod rust;

pub use manifest::ManifestRenderer;
pub use rust::{RustClientOptions, RustClientRenderer};
