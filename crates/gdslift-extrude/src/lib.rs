//! # GdsLift Extrude
//!
//! Turns parsed layout structures into 3D geometry: flat polygon outlines
//! are extracted per element, filtered and clipped against an optional
//! window, then extruded along Z into closed prisms using the
//! (layer, datatype) rule table's height range.

pub mod extract;
pub mod pipeline;
pub mod solid;

pub use pipeline::{extract_structure, extrude_all, ExtractOptions, LayerPolygon};
pub use solid::{extrude, GeometryError, Solid3d};
