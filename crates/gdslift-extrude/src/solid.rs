use serde::{Deserialize, Serialize};
use thiserror::Error;

use gdslift_core::geometry::{
    dedup_consecutive, signed_area, simplify_collinear, strip_closing_point, BBox, Point,
};

/// Geometry failures are recoverable: the pipeline skips the offending
/// polygon and counts it, rather than aborting the run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("degenerate polygon: {vertex_count} usable vertices")]
    DegeneratePolygon { vertex_count: usize },
    #[error("invalid z range: bottom {z_bottom} is not below top {z_top}")]
    InvalidZRange { z_bottom: f64, z_top: f64 },
}

/// A closed prism: one polygon extruded straight up along Z.
///
/// Vertices 0..n are the bottom ring (counter-clockwise seen from above),
/// n..2n the top ring in the same order. Faces are index lists into the
/// vertex array: the bottom cap, the top cap, then one quad per edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solid3d {
    pub vertices: Vec<[f64; 3]>,
    pub faces: Vec<Vec<usize>>,
    pub bbox_min: [f64; 3],
    pub bbox_max: [f64; 3],
    pub volume: f64,
}

impl Solid3d {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }
}

const CLEANUP_TOL: f64 = 1e-9;

/// Extrude a polygon ring into a [`Solid3d`] between two Z planes.
///
/// The ring is cleaned first: consecutive duplicates and the repeated
/// closing vertex are dropped, near-collinear interior vertices are
/// removed, and a clockwise ring is reversed so the canonical winding is
/// counter-clockwise. Input winding therefore never changes the result.
pub fn extrude(ring: &[Point], z_bottom: f64, z_top: f64) -> Result<Solid3d, GeometryError> {
    if z_top <= z_bottom {
        return Err(GeometryError::InvalidZRange { z_bottom, z_top });
    }

    let mut ring = dedup_consecutive(ring, CLEANUP_TOL);
    strip_closing_point(&mut ring, CLEANUP_TOL);
    if ring.len() >= 4 {
        ring = simplify_collinear(&ring, CLEANUP_TOL);
    }
    if ring.len() < 3 {
        return Err(GeometryError::DegeneratePolygon {
            vertex_count: ring.len(),
        });
    }

    let area = signed_area(&ring);
    if area.abs() < CLEANUP_TOL {
        return Err(GeometryError::DegeneratePolygon {
            vertex_count: ring.len(),
        });
    }
    if area < 0.0 {
        ring.reverse();
    }

    let n = ring.len();
    let mut vertices = Vec::with_capacity(2 * n);
    for p in &ring {
        vertices.push([p.x, p.y, z_bottom]);
    }
    for p in &ring {
        vertices.push([p.x, p.y, z_top]);
    }

    let mut faces = Vec::with_capacity(n + 2);
    faces.push((0..n).collect::<Vec<_>>());
    faces.push((n..2 * n).collect::<Vec<_>>());
    for i in 0..n {
        let next = (i + 1) % n;
        faces.push(vec![i, next, n + next, n + i]);
    }

    let bb = BBox::from_points(&ring).expect("ring has at least 3 vertices");
    Ok(Solid3d {
        vertices,
        faces,
        bbox_min: [bb.min.x, bb.min.y, z_bottom],
        bbox_max: [bb.max.x, bb.max.y, z_top],
        volume: area.abs() * (z_top - z_bottom),
    })
}
