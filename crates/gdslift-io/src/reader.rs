use log::{debug, info};
use thiserror::Error;

use gdslift_core::geometry::Point;
use gdslift_core::model::{
    ArefData, BoundaryData, BoxData, Element, ElementKind, Library, NodeData, PathData, Property,
    SrefData, Strans, Structure, TextData,
};
use gdslift_core::Diagnostics;

use crate::cursor::{detect_byte_order, ByteOrder, GdsCursor, RecordHeader, StreamError};
use crate::records;

/// Stream-grammar failures: the records framed correctly but do not form
/// a valid library. Any of these aborts the parse.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GrammarError {
    #[error("missing required record {expected}")]
    MissingRequiredRecord { expected: &'static str },
    #[error("record out of order at offset {offset}: {message}")]
    RecordOutOfOrder { offset: u64, message: String },
    #[error("malformed {record} payload at offset {offset}: expected {expected} bytes, got {actual}")]
    MalformedFixedPayload {
        record: &'static str,
        offset: u64,
        expected: usize,
        actual: usize,
    },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error(transparent)]
    Stream(#[from] StreamError),
    #[error(transparent)]
    Grammar(#[from] GrammarError),
}

/// Two-pass GDSII decoder over an in-memory buffer.
///
/// [`read_library`](Self::read_library) is pass 1: it walks the top level
/// of the stream, validates the opening record sequence, and captures the
/// library name, unit scale factors, and each structure's name and byte
/// offset. No element is decoded.
///
/// [`parse_structure`](Self::parse_structure) is pass 2, run per
/// structure on demand. It seeks to the recorded offset, decodes the
/// element list, and marks the structure parsed; repeat calls are no-ops.
pub struct GdsReader<'a> {
    buf: &'a [u8],
    order: ByteOrder,
    diagnostics: Diagnostics,
}

impl<'a> GdsReader<'a> {
    /// Detects the byte order once; every later read uses it.
    pub fn new(buf: &'a [u8]) -> Result<Self, ParseError> {
        let order = detect_byte_order(buf)?;
        Ok(Self {
            buf,
            order,
            diagnostics: Diagnostics::new(),
        })
    }

    /// Reuse a previously detected byte order, skipping the sniff.
    pub fn with_order(buf: &'a [u8], order: ByteOrder) -> Self {
        Self {
            buf,
            order,
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.order
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Diagnostics {
        std::mem::take(&mut self.diagnostics)
    }

    fn cursor(&self) -> GdsCursor<'a> {
        GdsCursor::with_order(self.buf, self.order)
    }

    fn note_skipped(&mut self, header: &RecordHeader) {
        if records::is_known(header.record_type) {
            debug!(
                "skipping {} record at offset {}",
                records::name(header.record_type),
                header.offset
            );
        } else {
            self.diagnostics.unknown_records += 1;
            self.diagnostics.note(format!(
                "unknown record type {:#06x} at offset {}, skipped {} payload bytes",
                header.record_type,
                header.offset,
                header.payload_len()
            ));
        }
    }

    /// Pass 1. The stream must open HEADER, BGNLIB, LIBNAME; after that
    /// the top level is walked record by record until ENDLIB or the end
    /// of the buffer, collecting UNITS and structure names/offsets.
    pub fn read_library(&mut self) -> Result<Library, ParseError> {
        let mut cursor = self.cursor();

        self.expect(&mut cursor, records::HEADER, "HEADER")?;
        self.expect(&mut cursor, records::BGNLIB, "BGNLIB")?;

        let name_header = self.require_header(&mut cursor, "LIBNAME")?;
        if name_header.record_type != records::LIBNAME {
            return Err(GrammarError::RecordOutOfOrder {
                offset: name_header.offset,
                message: format!(
                    "expected LIBNAME, found {}",
                    records::name(name_header.record_type)
                ),
            }
            .into());
        }
        let name = cursor.read_string(name_header.payload_len())?;
        let mut library = Library::new(&name);

        while !cursor.at_end() {
            let header = cursor.read_header()?;
            let end = header.offset + header.total_length as u64;
            match header.record_type {
                records::ENDLIB => break,
                records::UNITS => {
                    if header.payload_len() != 16 {
                        return Err(GrammarError::MalformedFixedPayload {
                            record: "UNITS",
                            offset: header.offset,
                            expected: 16,
                            actual: header.payload_len(),
                        }
                        .into());
                    }
                    library.user_units_per_db_unit = cursor.read_f64()?;
                    library.meters_per_db_unit = cursor.read_f64()?;
                }
                records::BGNSTR => {
                    let structure = self.scan_structure(&mut cursor, &header, &library)?;
                    library.structures.push(structure);
                    // scan_structure leaves the cursor just past ENDSTR
                    continue;
                }
                _ => self.note_skipped(&header),
            }
            cursor.seek(end);
        }

        info!(
            "library '{}': {} structures, {:?} byte order",
            library.name,
            library.structure_count(),
            self.order
        );
        Ok(library)
    }

    /// Skeleton scan of one structure for pass 1: find its STRNAME, then
    /// skip to ENDSTR without decoding elements. `header` is the already
    /// read BGNSTR header, whose offset becomes the structure's seek
    /// target for pass 2.
    fn scan_structure(
        &mut self,
        cursor: &mut GdsCursor<'a>,
        header: &RecordHeader,
        library: &Library,
    ) -> Result<Structure, ParseError> {
        cursor.seek(header.offset + header.total_length as u64);

        let name = loop {
            let sub = self.require_header(cursor, "STRNAME")?;
            let end = sub.offset + sub.total_length as u64;
            match sub.record_type {
                records::STRNAME => break cursor.read_string(sub.payload_len())?,
                records::ENDSTR => {
                    return Err(GrammarError::RecordOutOfOrder {
                        offset: sub.offset,
                        message: "structure ended before STRNAME".to_string(),
                    }
                    .into());
                }
                _ => {
                    self.note_skipped(&sub);
                    cursor.seek(end);
                }
            }
        };

        if library.find_structure(&name).is_some() {
            return Err(GrammarError::RecordOutOfOrder {
                offset: header.offset,
                message: format!("duplicate structure name '{}'", name),
            }
            .into());
        }

        loop {
            let sub = cursor.read_header()?;
            cursor.seek(sub.offset + sub.total_length as u64);
            if sub.record_type == records::ENDSTR {
                break;
            }
        }

        debug!("structure '{}' at offset {}", name, header.offset);
        Ok(Structure::new(&name, header.offset))
    }

    /// Pass 2: decode the element list of one structure. Idempotent:
    /// a structure already parsed is left untouched.
    pub fn parse_structure(&mut self, structure: &mut Structure) -> Result<(), ParseError> {
        if structure.parsed {
            return Ok(());
        }
        let mut cursor = self.cursor();
        cursor.seek(structure.file_offset);

        let begin = cursor.read_header()?;
        if begin.record_type != records::BGNSTR {
            return Err(GrammarError::RecordOutOfOrder {
                offset: begin.offset,
                message: format!(
                    "expected BGNSTR, found {}",
                    records::name(begin.record_type)
                ),
            }
            .into());
        }
        cursor.seek(begin.offset + begin.total_length as u64);

        loop {
            let header = cursor.read_header()?;
            let end = header.offset + header.total_length as u64;
            match header.record_type {
                records::ENDSTR => break,
                records::BOUNDARY
                | records::PATH
                | records::BOX
                | records::TEXT
                | records::SREF
                | records::AREF
                | records::NODE => {
                    cursor.seek(end);
                    let element = self.parse_element(&mut cursor, header.record_type)?;
                    structure.elements.push(element);
                }
                _ => {
                    self.note_skipped(&header);
                    cursor.seek(end);
                }
            }
        }

        structure.parsed = true;
        debug!(
            "structure '{}': {} elements",
            structure.name,
            structure.element_count()
        );
        Ok(())
    }

    /// Parse every structure in the library. Laziness is an optimization,
    /// not a requirement; hosts that want the whole model call this.
    pub fn parse_all(&mut self, library: &mut Library) -> Result<(), ParseError> {
        for structure in &mut library.structures {
            self.parse_structure(structure)?;
        }
        Ok(())
    }

    /// Decode one element's sub-records up to ENDEL. The cursor sits just
    /// past the element-begin record.
    fn parse_element(
        &mut self,
        cursor: &mut GdsCursor<'a>,
        start_type: u16,
    ) -> Result<Element, ParseError> {
        let kind = match start_type {
            records::BOUNDARY => ElementKind::Boundary(BoundaryData { ring: Vec::new() }),
            records::PATH => ElementKind::Path(PathData {
                points: Vec::new(),
                width: 0.0,
                path_type: 0,
                begin_extension: 0.0,
                end_extension: 0.0,
            }),
            records::BOX => ElementKind::Box(BoxData {
                box_type: 0,
                ring: Vec::new(),
            }),
            records::NODE => ElementKind::Node(NodeData {
                node_type: 0,
                ring: Vec::new(),
            }),
            records::TEXT => ElementKind::Text(TextData {
                text: String::new(),
                position: Point::new(0.0, 0.0),
                text_type: 0,
                presentation: 0,
                strans: Strans::default(),
            }),
            records::SREF => ElementKind::Sref(SrefData {
                structure_name: String::new(),
                position: Point::new(0.0, 0.0),
                strans: Strans::default(),
            }),
            records::AREF => ElementKind::Aref(ArefData {
                structure_name: String::new(),
                columns: 1,
                rows: 1,
                origin: Point::new(0.0, 0.0),
                col_step: Point::new(0.0, 0.0),
                row_step: Point::new(0.0, 0.0),
                strans: Strans::default(),
            }),
            other => {
                return Err(GrammarError::RecordOutOfOrder {
                    offset: cursor.position(),
                    message: format!("{} is not an element record", records::name(other)),
                }
                .into());
            }
        };
        let mut element = Element::new(kind);
        // AREF coordinate payload: origin plus the lattice endpoints
        // scaled by the column/row counts. Held raw until ENDEL because
        // COLROW may arrive after XY.
        let mut aref_corners: Option<[Point; 3]> = None;
        let mut pending_attr: u16 = 0;

        loop {
            let header = cursor.read_header()?;
            let end = header.offset + header.total_length as u64;
            match header.record_type {
                records::ENDEL => break,
                records::LAYER => element.layer = cursor.read_i16()? as u16,
                records::DATATYPE => element.datatype = cursor.read_i16()? as u16,
                records::ELFLAGS => element.elflags = cursor.read_u16()?,
                records::PLEX => element.plex = cursor.read_i32()?,
                records::XY => {
                    let count = header.payload_len() / 8;
                    let mut points = Vec::with_capacity(count);
                    for _ in 0..count {
                        let x = cursor.read_i32()? as f64;
                        let y = cursor.read_i32()? as f64;
                        points.push(Point::new(x, y));
                    }
                    match &mut element.kind {
                        ElementKind::Boundary(b) => b.ring = points,
                        ElementKind::Box(b) => b.ring = points,
                        ElementKind::Node(n) => n.ring = points,
                        ElementKind::Path(p) => p.points = points,
                        ElementKind::Text(t) => {
                            if let Some(p) = points.first() {
                                t.position = *p;
                            }
                        }
                        ElementKind::Sref(s) => {
                            if let Some(p) = points.first() {
                                s.position = *p;
                            }
                        }
                        ElementKind::Aref(_) => {
                            if points.len() >= 3 {
                                aref_corners = Some([points[0], points[1], points[2]]);
                            }
                        }
                    }
                }
                records::WIDTH => {
                    let width = cursor.read_i32()? as f64;
                    if let ElementKind::Path(p) = &mut element.kind {
                        p.width = width;
                    }
                }
                records::PATHTYPE => {
                    let pt = cursor.read_i16()? as u16;
                    if let ElementKind::Path(p) = &mut element.kind {
                        p.path_type = pt;
                    }
                }
                records::BGNEXTN => {
                    let ext = cursor.read_i32()? as f64;
                    if let ElementKind::Path(p) = &mut element.kind {
                        p.begin_extension = ext;
                    }
                }
                records::ENDEXTN => {
                    let ext = cursor.read_i32()? as f64;
                    if let ElementKind::Path(p) = &mut element.kind {
                        p.end_extension = ext;
                    }
                }
                records::SNAME => {
                    let name = cursor.read_string(header.payload_len())?;
                    match &mut element.kind {
                        ElementKind::Sref(s) => s.structure_name = name,
                        ElementKind::Aref(a) => a.structure_name = name,
                        _ => {}
                    }
                }
                records::COLROW => {
                    let cols = cursor.read_i16()? as u16;
                    let rows = cursor.read_i16()? as u16;
                    if let ElementKind::Aref(a) = &mut element.kind {
                        a.columns = cols;
                        a.rows = rows;
                    }
                }
                records::STRANS => {
                    let flags = cursor.read_u16()?;
                    if let Some(s) = strans_mut(&mut element.kind) {
                        s.flags = flags;
                    }
                }
                records::MAG => {
                    let mag = cursor.read_f64()?;
                    if let Some(s) = strans_mut(&mut element.kind) {
                        s.magnification = mag;
                    }
                }
                records::ANGLE => {
                    let angle = cursor.read_f64()?;
                    if let Some(s) = strans_mut(&mut element.kind) {
                        s.angle = angle;
                    }
                }
                records::STRING => {
                    let text = cursor.read_string(header.payload_len())?;
                    if let ElementKind::Text(t) = &mut element.kind {
                        t.text = text;
                    }
                }
                records::TEXTTYPE => {
                    let tt = cursor.read_i16()? as u16;
                    if let ElementKind::Text(t) = &mut element.kind {
                        t.text_type = tt;
                    }
                }
                records::PRESENTATION => {
                    let bits = cursor.read_u16()?;
                    if let ElementKind::Text(t) = &mut element.kind {
                        t.presentation = bits;
                    }
                }
                records::BOXTYPE => {
                    let bt = cursor.read_i16()? as u16;
                    if let ElementKind::Box(b) = &mut element.kind {
                        b.box_type = bt;
                    }
                }
                records::NODETYPE => {
                    let nt = cursor.read_i16()? as u16;
                    if let ElementKind::Node(n) = &mut element.kind {
                        n.node_type = nt;
                    }
                }
                records::PROPATTR => pending_attr = cursor.read_u16()?,
                records::PROPVALUE => {
                    let value = cursor.read_string(header.payload_len())?;
                    element.properties.push(Property {
                        attribute: pending_attr,
                        value,
                    });
                    pending_attr = 0;
                }
                _ => self.note_skipped(&header),
            }
            cursor.seek(end);
        }

        if let ElementKind::Aref(a) = &mut element.kind {
            if let Some([origin, col_end, row_end]) = aref_corners {
                let cols = a.columns.max(1) as f64;
                let rows = a.rows.max(1) as f64;
                a.origin = origin;
                a.col_step = Point::new(
                    (col_end.x - origin.x) / cols,
                    (col_end.y - origin.y) / cols,
                );
                a.row_step = Point::new(
                    (row_end.x - origin.x) / rows,
                    (row_end.y - origin.y) / rows,
                );
            }
        }

        Ok(element)
    }

    /// Read the next header, demanding a specific record type; the payload
    /// is skipped. Used for the fixed opening sequence.
    fn expect(
        &mut self,
        cursor: &mut GdsCursor<'a>,
        record_type: u16,
        name: &'static str,
    ) -> Result<RecordHeader, ParseError> {
        let header = self.require_header(cursor, name)?;
        if header.record_type != record_type {
            return Err(GrammarError::RecordOutOfOrder {
                offset: header.offset,
                message: format!(
                    "expected {}, found {}",
                    name,
                    records::name(header.record_type)
                ),
            }
            .into());
        }
        cursor.seek(header.offset + header.total_length as u64);
        Ok(header)
    }

    /// Read a header where the grammar requires one more record; running
    /// out of buffer here means the record is missing, not truncated.
    fn require_header(
        &mut self,
        cursor: &mut GdsCursor<'a>,
        name: &'static str,
    ) -> Result<RecordHeader, ParseError> {
        if cursor.at_end() {
            return Err(GrammarError::MissingRequiredRecord { expected: name }.into());
        }
        Ok(cursor.read_header()?)
    }
}

fn strans_mut(kind: &mut ElementKind) -> Option<&mut Strans> {
    match kind {
        ElementKind::Text(t) => Some(&mut t.strans),
        ElementKind::Sref(s) => Some(&mut s.strans),
        ElementKind::Aref(a) => Some(&mut a.strans),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Emits well-formed records in a chosen byte order. The inverse of
    /// the reader, kept test-only: writing streams is not part of the
    /// decoder's job.
    struct StreamBuilder {
        order: ByteOrder,
        buf: Vec<u8>,
    }

    impl StreamBuilder {
        fn new(order: ByteOrder) -> Self {
            Self {
                order,
                buf: Vec::new(),
            }
        }

        fn push_u16(&mut self, v: u16) {
            match self.order {
                ByteOrder::Big => self.buf.extend_from_slice(&v.to_be_bytes()),
                ByteOrder::Little => self.buf.extend_from_slice(&v.to_le_bytes()),
            }
        }

        fn push_i32(&mut self, v: i32) {
            match self.order {
                ByteOrder::Big => self.buf.extend_from_slice(&v.to_be_bytes()),
                ByteOrder::Little => self.buf.extend_from_slice(&v.to_le_bytes()),
            }
        }

        fn push_f64(&mut self, v: f64) {
            let bits = v.to_bits();
            match self.order {
                ByteOrder::Big => self.buf.extend_from_slice(&bits.to_be_bytes()),
                ByteOrder::Little => self.buf.extend_from_slice(&bits.to_le_bytes()),
            }
        }

        fn header(&mut self, record_type: u16, payload_len: usize) {
            self.push_u16((payload_len + 4) as u16);
            self.push_u16(record_type);
        }

        fn empty(&mut self, record_type: u16) -> &mut Self {
            self.header(record_type, 0);
            self
        }

        fn i16s(&mut self, record_type: u16, values: &[i16]) -> &mut Self {
            self.header(record_type, values.len() * 2);
            for &v in values {
                self.push_u16(v as u16);
            }
            self
        }

        fn string(&mut self, record_type: u16, s: &str) -> &mut Self {
            let padded = s.len() + s.len() % 2;
            self.header(record_type, padded);
            self.buf.extend_from_slice(s.as_bytes());
            if s.len() % 2 == 1 {
                self.buf.push(0);
            }
            self
        }

        fn units(&mut self, user: f64, meters: f64) -> &mut Self {
            self.header(records::UNITS, 16);
            self.push_f64(user);
            self.push_f64(meters);
            self
        }

        fn xy(&mut self, points: &[(i32, i32)]) -> &mut Self {
            self.header(records::XY, points.len() * 8);
            for &(x, y) in points {
                self.push_i32(x);
                self.push_i32(y);
            }
            self
        }

        fn begin_library(&mut self, name: &str) -> &mut Self {
            self.i16s(records::HEADER, &[3]);
            self.i16s(records::BGNLIB, &[0; 12]);
            self.string(records::LIBNAME, name);
            self.units(1e-3, 1e-9)
        }

        fn begin_structure(&mut self, name: &str) -> &mut Self {
            self.i16s(records::BGNSTR, &[0; 12]);
            self.string(records::STRNAME, name)
        }

        fn finish(&mut self) -> Vec<u8> {
            self.empty(records::ENDLIB);
            std::mem::take(&mut self.buf)
        }
    }

    /// Two structures: TOP with a boundary, a path, an sref, and an
    /// aref; SUB with a single boundary.
    fn fixture(order: ByteOrder) -> Vec<u8> {
        let mut b = StreamBuilder::new(order);
        b.begin_library("LIB");

        b.begin_structure("TOP");
        b.empty(records::BOUNDARY)
            .i16s(records::LAYER, &[5])
            .i16s(records::DATATYPE, &[0])
            .xy(&[(0, 0), (100, 0), (100, 50), (0, 50), (0, 0)])
            .empty(records::ENDEL);
        b.empty(records::PATH)
            .i16s(records::LAYER, &[2])
            .i16s(records::DATATYPE, &[0]);
        b.header(records::WIDTH, 4);
        b.push_i32(4);
        b.xy(&[(0, 0), (50, 0)]).empty(records::ENDEL);
        b.empty(records::SREF)
            .string(records::SNAME, "SUB")
            .xy(&[(10, 10)])
            .empty(records::ENDEL);
        b.empty(records::AREF)
            .string(records::SNAME, "SUB")
            .i16s(records::COLROW, &[3, 2])
            .xy(&[(0, 0), (30, 0), (0, 20)])
            .empty(records::ENDEL);
        b.empty(records::ENDSTR);

        b.begin_structure("SUB");
        b.empty(records::BOUNDARY)
            .i16s(records::LAYER, &[1])
            .i16s(records::DATATYPE, &[0])
            .xy(&[(0, 0), (10, 0), (10, 10), (0, 10), (0, 0)])
            .empty(records::ENDEL);
        b.empty(records::ENDSTR);

        b.finish()
    }

    #[test]
    fn test_pass_one_is_lazy() {
        for order in [ByteOrder::Big, ByteOrder::Little] {
            let buf = fixture(order);
            let mut reader = GdsReader::new(&buf).unwrap();
            assert_eq!(reader.byte_order(), order);

            let library = reader.read_library().unwrap();
            assert_eq!(library.name, "LIB");
            assert_eq!(library.structure_count(), 2);
            assert_eq!(library.user_units_per_db_unit, 1e-3);
            assert_eq!(library.meters_per_db_unit, 1e-9);
            for s in &library.structures {
                assert!(!s.parsed);
                assert!(s.elements.is_empty());
            }
            assert_eq!(library.structure_names(), vec!["TOP", "SUB"]);
        }
    }

    #[test]
    fn test_pass_two_decodes_elements() {
        let buf = fixture(ByteOrder::Big);
        let mut reader = GdsReader::new(&buf).unwrap();
        let mut library = reader.read_library().unwrap();
        reader.parse_structure(&mut library.structures[0]).unwrap();

        let top = &library.structures[0];
        assert!(top.parsed);
        assert_eq!(top.element_count(), 4);

        match &top.elements[0].kind {
            ElementKind::Boundary(b) => {
                assert_eq!(b.ring.len(), 5);
                assert_eq!(b.ring[2], Point::new(100.0, 50.0));
            }
            other => panic!("expected boundary, got {:?}", other),
        }
        assert_eq!(top.elements[0].layer, 5);

        match &top.elements[1].kind {
            ElementKind::Path(p) => {
                assert_eq!(p.width, 4.0);
                assert_eq!(p.points.len(), 2);
            }
            other => panic!("expected path, got {:?}", other),
        }

        match &top.elements[2].kind {
            ElementKind::Sref(s) => {
                assert_eq!(s.structure_name, "SUB");
                assert_eq!(s.position, Point::new(10.0, 10.0));
            }
            other => panic!("expected sref, got {:?}", other),
        }

        match &top.elements[3].kind {
            ElementKind::Aref(a) => {
                assert_eq!((a.columns, a.rows), (3, 2));
                assert_eq!(a.col_step, Point::new(10.0, 0.0));
                assert_eq!(a.row_step, Point::new(0.0, 10.0));
                let bb = a.bbox();
                assert_eq!(bb.max, Point::new(20.0, 10.0));
            }
            other => panic!("expected aref, got {:?}", other),
        }
    }

    #[test]
    fn test_pass_two_is_idempotent() {
        let buf = fixture(ByteOrder::Little);
        let mut reader = GdsReader::new(&buf).unwrap();
        let mut library = reader.read_library().unwrap();
        reader.parse_structure(&mut library.structures[1]).unwrap();
        let count = library.structures[1].element_count();
        reader.parse_structure(&mut library.structures[1]).unwrap();
        assert_eq!(library.structures[1].element_count(), count);
    }

    #[test]
    fn test_parse_all() {
        let buf = fixture(ByteOrder::Big);
        let mut reader = GdsReader::new(&buf).unwrap();
        let mut library = reader.read_library().unwrap();
        reader.parse_all(&mut library).unwrap();
        assert!(library.structures.iter().all(|s| s.parsed));
        assert_eq!(library.find_structure("SUB").unwrap().element_count(), 1);
    }

    #[test]
    fn test_missing_header_record() {
        let mut b = StreamBuilder::new(ByteOrder::Big);
        b.i16s(records::BGNLIB, &[0; 12]);
        let buf = b.finish();
        let mut reader = GdsReader::new(&buf).unwrap();
        assert!(matches!(
            reader.read_library(),
            Err(ParseError::Grammar(GrammarError::RecordOutOfOrder { .. }))
        ));
    }

    #[test]
    fn test_empty_stream_missing_required() {
        // Too short for the sniffer to have anything to reject.
        let mut reader = GdsReader::new(&[]).unwrap();
        assert!(matches!(
            reader.read_library(),
            Err(ParseError::Grammar(GrammarError::MissingRequiredRecord {
                expected: "HEADER"
            }))
        ));
    }

    #[test]
    fn test_units_wrong_size_rejected() {
        let mut b = StreamBuilder::new(ByteOrder::Big);
        b.i16s(records::HEADER, &[3]);
        b.i16s(records::BGNLIB, &[0; 12]);
        b.string(records::LIBNAME, "LIB");
        // UNITS with only one float.
        b.header(records::UNITS, 8);
        b.push_f64(1e-3);
        let buf = b.finish();
        let mut reader = GdsReader::new(&buf).unwrap();
        assert!(matches!(
            reader.read_library(),
            Err(ParseError::Grammar(GrammarError::MalformedFixedPayload {
                record: "UNITS",
                expected: 16,
                actual: 8,
                ..
            }))
        ));
    }

    #[test]
    fn test_duplicate_structure_name_rejected() {
        let mut b = StreamBuilder::new(ByteOrder::Big);
        b.begin_library("LIB");
        b.begin_structure("TOP").empty(records::ENDSTR);
        b.begin_structure("TOP").empty(records::ENDSTR);
        let buf = b.finish();
        let mut reader = GdsReader::new(&buf).unwrap();
        let err = reader.read_library().unwrap_err();
        assert!(matches!(
            err,
            ParseError::Grammar(GrammarError::RecordOutOfOrder { .. })
        ));
    }

    #[test]
    fn test_unknown_records_skipped_and_counted() {
        let mut b = StreamBuilder::new(ByteOrder::Big);
        b.begin_library("LIB");
        b.begin_structure("TOP");
        b.empty(records::BOUNDARY)
            .i16s(records::LAYER, &[1])
            .i16s(0x7F02, &[42]) // no such record type
            .xy(&[(0, 0), (1, 0), (1, 1), (0, 0)])
            .empty(records::ENDEL);
        b.empty(records::ENDSTR);
        let buf = b.finish();

        let mut reader = GdsReader::new(&buf).unwrap();
        let mut library = reader.read_library().unwrap();
        reader.parse_structure(&mut library.structures[0]).unwrap();

        assert_eq!(library.structures[0].element_count(), 1);
        assert_eq!(reader.diagnostics().unknown_records, 1);
        assert_eq!(reader.diagnostics().messages.len(), 1);
    }

    #[test]
    fn test_truncated_structure_aborts() {
        let mut b = StreamBuilder::new(ByteOrder::Big);
        b.begin_library("LIB");
        b.begin_structure("TOP");
        b.empty(records::BOUNDARY);
        let mut buf = std::mem::take(&mut b.buf);
        // Chop mid-element; ENDEL and ENDSTR never arrive.
        buf.truncate(buf.len() - 2);

        let mut reader = GdsReader::new(&buf).unwrap();
        let err = reader.read_library().unwrap_err();
        assert!(matches!(
            err,
            ParseError::Stream(StreamError::TruncatedRecord { .. })
        ));
    }

    #[test]
    fn test_properties_attached_to_element() {
        let mut b = StreamBuilder::new(ByteOrder::Big);
        b.begin_library("LIB");
        b.begin_structure("TOP");
        b.empty(records::BOUNDARY)
            .i16s(records::LAYER, &[1])
            .xy(&[(0, 0), (1, 0), (1, 1), (0, 0)])
            .i16s(records::PROPATTR, &[7])
            .string(records::PROPVALUE, "net:VDD")
            .empty(records::ENDEL);
        b.empty(records::ENDSTR);
        let buf = b.finish();

        let mut reader = GdsReader::new(&buf).unwrap();
        let mut library = reader.read_library().unwrap();
        reader.parse_structure(&mut library.structures[0]).unwrap();

        let props = &library.structures[0].elements[0].properties;
        assert_eq!(props.len(), 1);
        assert_eq!(props[0].attribute, 7);
        assert_eq!(props[0].value, "net:VDD");
    }
}
