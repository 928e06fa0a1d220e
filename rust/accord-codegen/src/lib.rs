#![deny(unsafe_code)]

//! Renderers for accord contract descriptions.
//!
//! Analysis produces one immutable
//! [`ContractDescription`](accord_contract::ContractDescription) per root
//! type. Everything in this crate consumes that description and nothing
//! else: a [`Renderer`] turns it into a [`GeneratedArtifact`], typically from
//! a build script.
//!
//! ```ignore
//! let contract = analyzer.analyze_by_name("Demo.DemoServiceImpl")?;
//! for renderer in [&ManifestRenderer as &dyn Renderer, &RustClientRenderer::new()] {
//!     let artifact = renderer.render(&contract)?;
//!     std::fs::write(out_dir.join(&artifact.file_name), artifact.contents)?;
//! }
//! ```
//!
//! Methods the analyzer could not bind still show up in the output: the
//! manifest lists their diagnostics and the Rust client emits a stub that
//! returns the diagnostic.

pub mod code_writer;
mod render;
pub mod targets;

pub use render::*;
pub use targets::{ManifestRenderer, RustClientOptions, RustClientRenderer};
