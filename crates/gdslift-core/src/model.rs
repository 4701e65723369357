use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::{BBox, Point};

/// Placement transform attached to text and reference elements.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Strans {
    /// Raw STRANS bit flags; bit 15 = mirror about the X axis.
    pub flags: u16,
    /// Uniform magnification (typically 1.0).
    pub magnification: f64,
    /// Rotation in degrees, counter-clockwise.
    pub angle: f64,
}

impl Default for Strans {
    fn default() -> Self {
        Self {
            flags: 0,
            magnification: 1.0,
            angle: 0.0,
        }
    }
}

impl Strans {
    pub fn mirror_x(&self) -> bool {
        self.flags & 0x8000 != 0
    }
}

/// An attribute/value property attached to an element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub attribute: u16,
    pub value: String,
}

/// A filled polygon outline. The stored ring repeats the first vertex as
/// its last, exactly as it appears in the stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryData {
    pub ring: Vec<Point>,
}

/// A rectangle element; the ring is stored like a boundary's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxData {
    pub box_type: u16,
    pub ring: Vec<Point>,
}

/// An electrical-net marker polygon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
    pub node_type: u16,
    pub ring: Vec<Point>,
}

/// A wire: centerline plus width, with optional end extensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathData {
    pub points: Vec<Point>,
    pub width: f64,
    pub path_type: u16,
    pub begin_extension: f64,
    pub end_extension: f64,
}

/// A text label. Produces no geometry during extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextData {
    pub text: String,
    pub position: Point,
    pub text_type: u16,
    /// Raw PRESENTATION bits: font and justification.
    pub presentation: u16,
    pub strans: Strans,
}

/// A single placed instance of another structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SrefData {
    pub structure_name: String,
    pub position: Point,
    pub strans: Strans,
}

/// A regular lattice of instances of another structure.
///
/// `col_step` and `row_step` are per-instance lattice vectors; the stream
/// stores their endpoints scaled by the column/row counts and the decoder
/// divides them back down.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArefData {
    pub structure_name: String,
    pub columns: u16,
    pub rows: u16,
    pub origin: Point,
    pub col_step: Point,
    pub row_step: Point,
    pub strans: Strans,
}

impl ArefData {
    /// Bounding box over every instance origin in the lattice, before any
    /// rotation or magnification is applied.
    pub fn bbox(&self) -> BBox {
        let c = (self.columns.max(1) - 1) as f64;
        let r = (self.rows.max(1) - 1) as f64;
        let corners = [
            self.origin,
            self.origin
                .translate(c * self.col_step.x, c * self.col_step.y),
            self.origin
                .translate(r * self.row_step.x, r * self.row_step.y),
            self.origin.translate(
                c * self.col_step.x + r * self.row_step.x,
                c * self.col_step.y + r * self.row_step.y,
            ),
        ];
        BBox::from_points(&corners).expect("corner list is non-empty")
    }
}

/// Kind-specific payload of an element, dispatched by tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ElementKind {
    Boundary(BoundaryData),
    Path(PathData),
    Box(BoxData),
    Text(TextData),
    Sref(SrefData),
    Aref(ArefData),
    Node(NodeData),
}

/// One element of a structure: common header fields plus the kind payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Element {
    pub kind: ElementKind,
    pub layer: u16,
    pub datatype: u16,
    pub elflags: u16,
    pub plex: i32,
    pub properties: Vec<Property>,
}

impl Element {
    pub fn new(kind: ElementKind) -> Self {
        Self {
            kind,
            layer: 0,
            datatype: 0,
            elflags: 0,
            plex: 0,
            properties: Vec::new(),
        }
    }

    /// Bounding box of the element's own geometry. Reference elements
    /// report the extent of their placement points; the referenced
    /// structure's geometry is not resolved here.
    pub fn bbox(&self) -> Option<BBox> {
        match &self.kind {
            ElementKind::Boundary(b) => BBox::from_points(&b.ring),
            ElementKind::Box(b) => BBox::from_points(&b.ring),
            ElementKind::Node(n) => BBox::from_points(&n.ring),
            ElementKind::Path(p) => {
                let half_w = p.width / 2.0;
                BBox::from_points(&p.points).map(|bb| bb.expand(half_w))
            }
            ElementKind::Text(t) => Some(BBox::new(t.position, t.position)),
            ElementKind::Sref(s) => Some(BBox::new(s.position, s.position)),
            ElementKind::Aref(a) => Some(a.bbox()),
        }
    }
}

/// A named, reusable collection of geometry within a library.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Structure {
    pub name: String,
    /// Byte offset of the structure-begin record in the source buffer.
    pub file_offset: u64,
    pub elements: Vec<Element>,
    /// Set once the element pass has run for this structure.
    pub parsed: bool,
}

impl Structure {
    pub fn new(name: &str, file_offset: u64) -> Self {
        Self {
            name: name.to_string(),
            file_offset,
            elements: Vec::new(),
            parsed: false,
        }
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Bounding box of all element geometry in this structure.
    pub fn local_bbox(&self) -> Option<BBox> {
        let mut boxes = self.elements.iter().filter_map(|e| e.bbox());
        let first = boxes.next()?;
        Some(boxes.fold(first, |acc, bb| acc.union(&bb)))
    }
}

/// A parsed library: metadata plus the structures it exclusively owns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Library {
    pub id: Uuid,
    pub name: String,
    pub user_units_per_db_unit: f64,
    pub meters_per_db_unit: f64,
    pub structures: Vec<Structure>,
}

impl Library {
    pub fn new(name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            user_units_per_db_unit: 1e-3,
            meters_per_db_unit: 1e-9,
            structures: Vec::new(),
        }
    }

    pub fn structure_count(&self) -> usize {
        self.structures.len()
    }

    pub fn find_structure(&self, name: &str) -> Option<&Structure> {
        self.structures.iter().find(|s| s.name == name)
    }

    pub fn structure_names(&self) -> Vec<&str> {
        self.structures.iter().map(|s| s.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aref_bbox_spans_lattice() {
        let aref = ArefData {
            structure_name: "unit".into(),
            columns: 3,
            rows: 2,
            origin: Point::new(0.0, 0.0),
            col_step: Point::new(10.0, 0.0),
            row_step: Point::new(0.0, 10.0),
            strans: Strans::default(),
        };
        let bb = aref.bbox();
        assert!((bb.min.x - 0.0).abs() < 1e-10);
        assert!((bb.min.y - 0.0).abs() < 1e-10);
        assert!((bb.max.x - 20.0).abs() < 1e-10);
        assert!((bb.max.y - 10.0).abs() < 1e-10);
    }

    #[test]
    fn test_single_instance_aref_bbox() {
        let aref = ArefData {
            structure_name: "unit".into(),
            columns: 1,
            rows: 1,
            origin: Point::new(5.0, 5.0),
            col_step: Point::new(10.0, 0.0),
            row_step: Point::new(0.0, 10.0),
            strans: Strans::default(),
        };
        let bb = aref.bbox();
        assert_eq!(bb.min, Point::new(5.0, 5.0));
        assert_eq!(bb.max, Point::new(5.0, 5.0));
    }

    #[test]
    fn test_path_bbox_includes_width() {
        let el = Element::new(ElementKind::Path(PathData {
            points: vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)],
            width: 4.0,
            path_type: 0,
            begin_extension: 0.0,
            end_extension: 0.0,
        }));
        let bb = el.bbox().unwrap();
        assert!((bb.min.y + 2.0).abs() < 1e-10);
        assert!((bb.max.y - 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_structure_local_bbox() {
        let mut s = Structure::new("top", 0);
        s.elements.push(Element::new(ElementKind::Boundary(BoundaryData {
            ring: vec![
                Point::new(0.0, 0.0),
                Point::new(10.0, 0.0),
                Point::new(10.0, 5.0),
                Point::new(0.0, 5.0),
            ],
        })));
        s.elements.push(Element::new(ElementKind::Boundary(BoundaryData {
            ring: vec![
                Point::new(5.0, 2.0),
                Point::new(20.0, 2.0),
                Point::new(20.0, 8.0),
                Point::new(5.0, 8.0),
            ],
        })));
        let bb = s.local_bbox().unwrap();
        assert_eq!(bb.max, Point::new(20.0, 8.0));
    }
}
