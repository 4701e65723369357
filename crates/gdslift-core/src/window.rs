use rstar::{RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::geometry::{BBox, Point};

/// An axis-aligned rectangular extraction window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Window {
    pub min: Point,
    pub max: Point,
}

impl Window {
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Result<Self, ConfigError> {
        if xmin >= xmax || ymin >= ymax {
            return Err(ConfigError::InvalidWindow {
                xmin,
                ymin,
                xmax,
                ymax,
            });
        }
        Ok(Self {
            min: Point::new(xmin, ymin),
            max: Point::new(xmax, ymax),
        })
    }

    /// Grow the window by `margin` on all four sides. The result is always
    /// valid because growing cannot invert a valid window.
    pub fn with_margin(&self, margin: f64) -> Self {
        Self {
            min: Point::new(self.min.x - margin, self.min.y - margin),
            max: Point::new(self.max.x + margin, self.max.y + margin),
        }
    }

    pub fn bbox(&self) -> BBox {
        BBox::new(self.min, self.max)
    }

    /// Bounding-box prefilter. Elements without a computable bbox are
    /// conservatively retained.
    pub fn admits(&self, bbox: Option<&BBox>) -> bool {
        match bbox {
            Some(bb) => self.bbox().intersects(bb),
            None => true,
        }
    }
}

// ── Spatial prefilter index ──────────────────────────────────────────

/// An entry in the R-tree prefilter, referencing an element by its index.
#[derive(Debug, Clone)]
pub struct WindowEntry {
    pub element_index: usize,
    pub bbox: BBox,
}

impl RTreeObject for WindowEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.bbox.min.x, self.bbox.min.y],
            [self.bbox.max.x, self.bbox.max.y],
        )
    }
}

/// R-tree over element bounding boxes for bulk window queries. Useful when
/// the same structure is prefiltered against many windows.
pub struct WindowIndex {
    tree: RTree<WindowEntry>,
}

impl WindowIndex {
    pub fn build(entries: Vec<WindowEntry>) -> Self {
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Indices of all elements whose bbox overlaps the window.
    pub fn query(&self, window: &Window) -> Vec<usize> {
        let envelope = AABB::from_corners(
            [window.min.x, window.min.y],
            [window.max.x, window.max.y],
        );
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|e| e.element_index)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

// ── Exact rectangular clip ───────────────────────────────────────────

fn cross(ax: f64, ay: f64, bx: f64, by: f64) -> f64 {
    ax * by - ay * bx
}

/// Inside test against the oriented boundary edge (a, b): the window
/// interior lies to the left of each edge.
fn inside(p: &Point, a: &Point, b: &Point) -> bool {
    cross(b.x - a.x, b.y - a.y, p.x - a.x, p.y - a.y) >= 0.0
}

/// Intersection of segment (s, e) with the infinite line through (a, b);
/// parallel and degenerate cases fall back to the segment midpoint.
fn intersect(s: &Point, e: &Point, a: &Point, b: &Point) -> Point {
    let d1 = cross(b.x - a.x, b.y - a.y, s.x - a.x, s.y - a.y);
    let d2 = cross(b.x - a.x, b.y - a.y, e.x - a.x, e.y - a.y);
    let denom = d1 - d2;
    if denom.abs() < f64::EPSILON {
        return Point::new((s.x + e.x) / 2.0, (s.y + e.y) / 2.0);
    }
    let t = d1 / denom;
    Point::new(s.x + t * (e.x - s.x), s.y + t * (e.y - s.y))
}

/// Sutherland–Hodgman clip of a polygon against the window's four
/// half-planes, in the order left, right, bottom, top.
///
/// The result is exact only when the subject polygon is convex; the window
/// itself is always convex. Concave subjects may yield self-intersecting
/// output - a documented limitation of this clip, not corrected here.
/// Returns an empty vector as soon as any pass drops below 3 vertices.
pub fn clip_to_window(ring: &[Point], window: &Window) -> Vec<Point> {
    if ring.len() < 3 {
        return Vec::new();
    }

    let bl = window.min;
    let br = Point::new(window.max.x, window.min.y);
    let tr = window.max;
    let tl = Point::new(window.min.x, window.max.y);

    // Counter-clockwise boundary edges, applied left, right, bottom, top.
    let edges = [(tl, bl), (br, tr), (bl, br), (tr, tl)];

    let mut subject: Vec<Point> = ring.to_vec();
    for (a, b) in &edges {
        let mut output: Vec<Point> = Vec::with_capacity(subject.len() + 4);
        for i in 0..subject.len() {
            let cur = subject[i];
            let next = subject[(i + 1) % subject.len()];
            let cur_in = inside(&cur, a, b);
            let next_in = inside(&next, a, b);

            if cur_in {
                output.push(cur);
                if !next_in {
                    output.push(intersect(&cur, &next, a, b));
                }
            } else if next_in {
                output.push(intersect(&cur, &next, a, b));
            }
        }
        if output.len() < 3 {
            return Vec::new();
        }
        subject = output;
    }

    subject
}
