//! Per-element outline extraction.
//!
//! Boundary, box, and node elements already carry a polygon ring and pass
//! through as-is. Path elements are widened into an outline by offsetting
//! the centerline. Text, sref, and aref elements produce no geometry.

use gdslift_core::geometry::Point;
use gdslift_core::model::{Element, ElementKind, PathData};

/// Flat outline of one element, if it has any.
///
/// `None` for the kinds that never produce geometry and for paths that
/// fail to convert; callers distinguish the two by matching on the kind.
pub fn element_outline(element: &Element) -> Option<Vec<Point>> {
    match &element.kind {
        ElementKind::Boundary(b) => Some(b.ring.clone()),
        ElementKind::Box(b) => Some(b.ring.clone()),
        ElementKind::Node(n) => Some(n.ring.clone()),
        ElementKind::Path(p) => path_outline(p),
        ElementKind::Text(_) | ElementKind::Sref(_) | ElementKind::Aref(_) => None,
    }
}

fn normalized(dx: f64, dy: f64) -> Option<(f64, f64)> {
    let len = dx.hypot(dy);
    if len < 1e-12 {
        return None;
    }
    Some((dx / len, dy / len))
}

/// Widen a path centerline into a closed outline.
///
/// Each vertex gets a tangent direction - the adjacent segment at the
/// endpoints, the average of both segment directions at interior vertices
/// - and is offset by half the width along the tangent's left and right
/// normals. The outline is the left rail followed by the right rail in
/// reverse. Sharp corners are not miter-corrected, so very acute bends
/// pinch the outline slightly.
///
/// Returns `None` for fewer than 2 distinct points or a non-positive
/// width.
pub fn path_outline(path: &PathData) -> Option<Vec<Point>> {
    if path.width <= 0.0 {
        return None;
    }
    // Coincident consecutive points have no direction; drop them first.
    let pts = gdslift_core::geometry::dedup_consecutive(&path.points, 1e-12);
    if pts.len() < 2 {
        return None;
    }

    let half = path.width / 2.0;
    let n = pts.len();
    let mut left = Vec::with_capacity(n);
    let mut right = Vec::with_capacity(n);

    for i in 0..n {
        let (tx, ty) = if i == 0 {
            normalized(pts[1].x - pts[0].x, pts[1].y - pts[0].y)?
        } else if i == n - 1 {
            normalized(pts[n - 1].x - pts[n - 2].x, pts[n - 1].y - pts[n - 2].y)?
        } else {
            let (ax, ay) = normalized(pts[i].x - pts[i - 1].x, pts[i].y - pts[i - 1].y)?;
            let (bx, by) = normalized(pts[i + 1].x - pts[i].x, pts[i + 1].y - pts[i].y)?;
            // A 180° reversal averages to zero; the path folds back on
            // itself and has no usable outline here.
            normalized(ax + bx, ay + by)?
        };
        // Left normal of (tx, ty).
        let (nx, ny) = (-ty, tx);
        left.push(Point::new(pts[i].x + half * nx, pts[i].y + half * ny));
        right.push(Point::new(pts[i].x - half * nx, pts[i].y - half * ny));
    }

    let mut outline = left;
    outline.extend(right.into_iter().rev());
    Some(outline)
}
