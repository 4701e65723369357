//! # GdsLift Core
//!
//! In-memory model for GDSII layout libraries, the (layer, datatype) → 3D
//! rule table, and the window/clip engine used to spatially filter
//! extracted geometry.
//!
//! This crate is the heart of the GdsLift extraction kernel. Decoding the
//! binary stream lives in `gdslift-io`; polygon extraction and extrusion
//! live in `gdslift-extrude`.

pub mod diag;
pub mod error;
pub mod geometry;
pub mod layer;
pub mod model;
pub mod window;

pub use diag::Diagnostics;
pub use error::ConfigError;
pub use geometry::{BBox, Point};
pub use layer::{LayerRule, LayerTable};
pub use model::{Element, ElementKind, Library, Structure};
pub use window::Window;
