use serde::{Deserialize, Serialize};

/// A 2D point in raw database units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub min: Point,
    pub max: Point,
}

impl BBox {
    pub fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    pub fn from_points(points: &[Point]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let mut min_x = f64::MAX;
        let mut min_y = f64::MAX;
        let mut max_x = f64::MIN;
        let mut max_y = f64::MIN;
        for p in points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(Self {
            min: Point::new(min_x, min_y),
            max: Point::new(max_x, max_y),
        })
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
        )
    }

    pub fn contains_point(&self, p: &Point) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    /// Four-comparison overlap test against another box.
    pub fn intersects(&self, other: &BBox) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    pub fn union(&self, other: &BBox) -> Self {
        Self {
            min: Point::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            max: Point::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        }
    }

    /// Grow the box by `margin` on all four sides.
    pub fn expand(&self, margin: f64) -> Self {
        Self {
            min: Point::new(self.min.x - margin, self.min.y - margin),
            max: Point::new(self.max.x + margin, self.max.y + margin),
        }
    }
}

// ── Ring helpers ──────────────────────────────────────────────────────
//
// A "ring" is a polygon vertex list. These operate in place or return a
// cleaned copy; all tolerances are absolute distances in database units.

/// Shoelace signed area. Counter-clockwise rings are positive.
pub fn signed_area(ring: &[Point]) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }
    let mut acc = 0.0;
    for i in 0..ring.len() {
        let a = &ring[i];
        let b = &ring[(i + 1) % ring.len()];
        acc += a.x * b.y - b.x * a.y;
    }
    acc / 2.0
}

/// Remove consecutive points closer than `tol` to their predecessor.
pub fn dedup_consecutive(ring: &[Point], tol: f64) -> Vec<Point> {
    let mut out: Vec<Point> = Vec::with_capacity(ring.len());
    for p in ring {
        match out.last() {
            Some(prev) if prev.distance_to(p) <= tol => {}
            _ => out.push(*p),
        }
    }
    out
}

pub fn is_closed(ring: &[Point], tol: f64) -> bool {
    match (ring.first(), ring.last()) {
        (Some(a), Some(b)) => a.distance_to(b) <= tol,
        _ => false,
    }
}

/// Drop the duplicated closing point so the ring is open for processing.
pub fn strip_closing_point(ring: &mut Vec<Point>, tol: f64) {
    while ring.len() > 1 && is_closed(ring, tol) {
        ring.pop();
    }
}

/// Remove near-collinear interior points. The cross-product threshold is
/// scaled by the adjacent segment lengths so the test is size-independent.
pub fn simplify_collinear(ring: &[Point], tol: f64) -> Vec<Point> {
    if ring.len() < 4 {
        return ring.to_vec();
    }
    let n = ring.len();
    let mut out: Vec<Point> = Vec::with_capacity(n);
    for i in 0..n {
        let prev = &ring[(i + n - 1) % n];
        let cur = &ring[i];
        let next = &ring[(i + 1) % n];
        let ux = cur.x - prev.x;
        let uy = cur.y - prev.y;
        let vx = next.x - cur.x;
        let vy = next.y - cur.y;
        let cross = (ux * vy - uy * vx).abs();
        let scale = (ux.hypot(uy) * vx.hypot(vy)).max(1.0);
        if cross > tol * scale {
            out.push(*cur);
        }
    }
    if out.len() < 3 {
        // Simplification collapsed the ring; keep the original.
        return ring.to_vec();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert!((a.distance_to(&b) - 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_bbox_intersection() {
        let a = BBox::new(Point::new(0.0, 0.0), Point::new(10.0, 10.0));
        let b = BBox::new(Point::new(5.0, 5.0), Point::new(15.0, 15.0));
        let c = BBox::new(Point::new(20.0, 20.0), Point::new(30.0, 30.0));
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn test_bbox_expand() {
        let a = BBox::new(Point::new(0.0, 0.0), Point::new(100.0, 100.0));
        let e = a.expand(10.0);
        assert!((e.min.x + 10.0).abs() < 1e-10);
        assert!((e.min.y + 10.0).abs() < 1e-10);
        assert!((e.max.x - 110.0).abs() < 1e-10);
        assert!((e.max.y - 110.0).abs() < 1e-10);
    }

    #[test]
    fn test_signed_area_orientation() {
        let ccw = vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ];
        let cw: Vec<Point> = ccw.iter().rev().copied().collect();
        assert!((signed_area(&ccw) - 100.0).abs() < 1e-10);
        assert!((signed_area(&cw) + 100.0).abs() < 1e-10);
    }

    #[test]
    fn test_dedup_and_strip() {
        let ring = vec![
            Point::new(0.0, 0.0),
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 0.0),
        ];
        let mut cleaned = dedup_consecutive(&ring, 1e-9);
        assert_eq!(cleaned.len(), 4);
        strip_closing_point(&mut cleaned, 1e-9);
        assert_eq!(cleaned.len(), 3);
    }

    #[test]
    fn test_simplify_collinear() {
        let ring = vec![
            Point::new(0.0, 0.0),
            Point::new(5.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ];
        let out = simplify_collinear(&ring, 1e-9);
        assert_eq!(out.len(), 4);
        assert!(!out.contains(&Point::new(5.0, 0.0)));
    }
}
