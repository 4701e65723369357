//! The extraction pipeline: element → layer rule → outline → window
//! filter/clip → [`LayerPolygon`] → [`Solid3d`].
//!
//! Parse failures upstream abort; everything that goes wrong here is
//! recoverable and lands in [`Diagnostics`] instead.

use log::debug;
use serde::{Deserialize, Serialize};

use gdslift_core::geometry::Point;
use gdslift_core::model::{ElementKind, Structure};
use gdslift_core::window::clip_to_window;
use gdslift_core::{Diagnostics, LayerRule, LayerTable, Window};

use crate::extract::element_outline;
use crate::solid::{extrude, Solid3d};

/// Knobs for one extraction run.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Spatial filter; `None` extracts the whole structure.
    pub window: Option<Window>,
    /// Extra margin applied to the window before filtering and clipping.
    pub margin: f64,
    /// Clip surviving polygons exactly to the (margined) window. When
    /// false the window is a bbox prefilter only.
    pub clip_exact: bool,
    /// Skip elements whose layer rule is disabled.
    pub enabled_only: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            window: None,
            margin: 0.0,
            clip_exact: true,
            enabled_only: true,
        }
    }
}

/// A flat polygon tagged with its resolved layer rule, ready to extrude.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerPolygon {
    pub ring: Vec<Point>,
    pub layer: u16,
    pub datatype: u16,
    pub z_bottom: f64,
    pub z_top: f64,
    pub name: String,
    pub material: String,
}

impl LayerPolygon {
    fn new(ring: Vec<Point>, rule: &LayerRule) -> Self {
        Self {
            ring,
            layer: rule.layer,
            datatype: rule.datatype,
            z_bottom: rule.z_bottom,
            z_top: rule.z_top,
            name: rule.name.clone(),
            material: rule.material.clone(),
        }
    }
}

/// Extract the flat polygons of one parsed structure.
///
/// Deterministic and side-effect free: the same structure, table, and
/// options always produce the same polygon list, and repeating the call
/// never mutates the inputs. Elements on unmapped layers, disabled
/// layers, or outside the window are counted and skipped; reference and
/// text elements never produce geometry.
pub fn extract_structure(
    structure: &Structure,
    table: &LayerTable,
    options: &ExtractOptions,
) -> (Vec<LayerPolygon>, Diagnostics) {
    let mut polygons = Vec::new();
    let mut diag = Diagnostics::new();
    let window = options.window.map(|w| w.with_margin(options.margin));

    for element in &structure.elements {
        let rule = match table.lookup(i64::from(element.layer), i64::from(element.datatype)) {
            Some(rule) => rule,
            None => {
                diag.skipped_elements += 1;
                continue;
            }
        };
        if options.enabled_only && !rule.enabled {
            diag.skipped_elements += 1;
            continue;
        }

        if let Some(w) = &window {
            if !w.admits(element.bbox().as_ref()) {
                diag.skipped_elements += 1;
                continue;
            }
        }

        let mut ring = match element_outline(element) {
            Some(ring) => ring,
            None => {
                match &element.kind {
                    ElementKind::Path(_) => {
                        diag.failed_path_conversions += 1;
                        diag.note(format!(
                            "path on layer {}/{} did not convert to an outline",
                            element.layer, element.datatype
                        ));
                    }
                    _ => diag.skipped_elements += 1,
                }
                continue;
            }
        };

        if let Some(w) = &window {
            if options.clip_exact {
                ring = clip_to_window(&ring, w);
                if ring.is_empty() {
                    diag.clipped_out += 1;
                    continue;
                }
            }
        }

        if ring.len() < 3 {
            diag.degenerate_polygons += 1;
            continue;
        }
        polygons.push(LayerPolygon::new(ring, rule));
    }

    debug!(
        "structure '{}': {} polygons extracted, {} elements skipped",
        structure.name,
        polygons.len(),
        diag.skipped_elements
    );
    (polygons, diag)
}

/// Extrude every extracted polygon into a prism. Degenerate polygons are
/// counted and dropped; valid ones always succeed because the layer table
/// rejects empty z-ranges at build time.
pub fn extrude_all(polygons: &[LayerPolygon]) -> (Vec<Solid3d>, Diagnostics) {
    let mut solids = Vec::with_capacity(polygons.len());
    let mut diag = Diagnostics::new();

    for polygon in polygons {
        match extrude(&polygon.ring, polygon.z_bottom, polygon.z_top) {
            Ok(solid) => solids.push(solid),
            Err(err) => {
                diag.degenerate_polygons += 1;
                diag.note(format!(
                    "layer {}/{}: {}",
                    polygon.layer, polygon.datatype, err
                ));
            }
        }
    }

    (solids, diag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gdslift_core::model::{BoundaryData, Element, PathData};

    fn boundary(layer: u16, ring: &[(f64, f64)]) -> Element {
        let mut el = Element::new(ElementKind::Boundary(BoundaryData {
            ring: ring.iter().map(|&(x, y)| Point::new(x, y)).collect(),
        }));
        el.layer = layer;
        el
    }

    fn test_table() -> LayerTable {
        LayerTable::build(vec![
            LayerRule::new(1, 0, 0.0, 0.5).with_name("poly"),
            LayerRule::new(2, 0, 0.5, 1.5).with_name("metal1"),
            LayerRule::new(3, 0, 0.0, 1.0).disabled(),
        ])
        .unwrap()
    }

    fn test_structure() -> Structure {
        let mut s = Structure::new("top", 0);
        s.elements
            .push(boundary(1, &[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]));
        s.elements.push(boundary(
            2,
            &[(100.0, 100.0), (110.0, 100.0), (110.0, 110.0), (100.0, 110.0)],
        ));
        s.elements
            .push(boundary(3, &[(0.0, 0.0), (5.0, 0.0), (5.0, 5.0), (0.0, 5.0)]));
        s.elements
            .push(boundary(9, &[(0.0, 0.0), (5.0, 0.0), (5.0, 5.0), (0.0, 5.0)]));
        s
    }

    #[test]
    fn test_extract_filters_unmapped_and_disabled() {
        let (polygons, diag) =
            extract_structure(&test_structure(), &test_table(), &ExtractOptions::default());
        // Layers 1 and 2 survive; 3 is disabled, 9 unmapped.
        assert_eq!(polygons.len(), 2);
        assert_eq!(diag.skipped_elements, 2);
        assert_eq!(polygons[0].name, "poly");
        assert_eq!(polygons[1].z_top, 1.5);
    }

    #[test]
    fn test_disabled_rule_kept_when_not_filtering() {
        let options = ExtractOptions {
            enabled_only: false,
            ..Default::default()
        };
        let (polygons, _) = extract_structure(&test_structure(), &test_table(), &options);
        assert_eq!(polygons.len(), 3);
    }

    #[test]
    fn test_window_prefilter_and_clip() {
        let options = ExtractOptions {
            window: Some(Window::new(0.0, 0.0, 8.0, 8.0).unwrap()),
            ..Default::default()
        };
        let (polygons, diag) =
            extract_structure(&test_structure(), &test_table(), &options);
        // The layer-2 square at (100,100) is outside the window.
        assert_eq!(polygons.len(), 1);
        assert_eq!(diag.skipped_elements, 3);
        // The layer-1 square is clipped from 10×10 down to 8×8.
        let bb = gdslift_core::BBox::from_points(&polygons[0].ring).unwrap();
        assert_eq!(bb.max, Point::new(8.0, 8.0));
    }

    #[test]
    fn test_prefilter_only_leaves_ring_unclipped() {
        let options = ExtractOptions {
            window: Some(Window::new(0.0, 0.0, 8.0, 8.0).unwrap()),
            clip_exact: false,
            ..Default::default()
        };
        let (polygons, _) = extract_structure(&test_structure(), &test_table(), &options);
        let bb = gdslift_core::BBox::from_points(&polygons[0].ring).unwrap();
        assert_eq!(bb.max, Point::new(10.0, 10.0));
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let structure = test_structure();
        let table = test_table();
        let options = ExtractOptions::default();
        let (first, _) = extract_structure(&structure, &table, &options);
        let (second, _) = extract_structure(&structure, &table, &options);
        assert_eq!(first, second);
    }

    #[test]
    fn test_failed_path_conversion_counted() {
        let mut s = Structure::new("top", 0);
        let mut el = Element::new(ElementKind::Path(PathData {
            points: vec![Point::new(0.0, 0.0)],
            width: 2.0,
            path_type: 0,
            begin_extension: 0.0,
            end_extension: 0.0,
        }));
        el.layer = 1;
        s.elements.push(el);

        let (polygons, diag) =
            extract_structure(&s, &test_table(), &ExtractOptions::default());
        assert!(polygons.is_empty());
        assert_eq!(diag.failed_path_conversions, 1);
        assert_eq!(diag.messages.len(), 1);
    }

    #[test]
    fn test_extrude_all_skips_degenerates() {
        let rule = LayerRule::new(1, 0, 0.0, 2.0);
        let good = LayerPolygon::new(
            vec![
                Point::new(0.0, 0.0),
                Point::new(10.0, 0.0),
                Point::new(10.0, 10.0),
                Point::new(0.0, 10.0),
            ],
            &rule,
        );
        let bad = LayerPolygon::new(
            vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0), Point::new(2.0, 2.0)],
            &rule,
        );
        let (solids, diag) = extrude_all(&[good, bad]);
        assert_eq!(solids.len(), 1);
        assert!((solids[0].volume - 200.0).abs() < 1e-9);
        assert_eq!(diag.degenerate_polygons, 1);
    }
}
