//! GDSII record type codes.
//!
//! A type code is two bytes: the record kind in the high byte and the
//! payload data type in the low byte (0x00 none, 0x01 bit array, 0x02
//! two-byte int, 0x03 four-byte int, 0x05 eight-byte real, 0x06 string).

pub const HEADER: u16 = 0x0002;
pub const BGNLIB: u16 = 0x0102;
pub const LIBNAME: u16 = 0x0206;
pub const UNITS: u16 = 0x0305;
pub const ENDLIB: u16 = 0x0400;
pub const BGNSTR: u16 = 0x0502;
pub const STRNAME: u16 = 0x0606;
pub const ENDSTR: u16 = 0x0700;
pub const BOUNDARY: u16 = 0x0800;
pub const PATH: u16 = 0x0900;
pub const SREF: u16 = 0x0A00;
pub const AREF: u16 = 0x0B00;
pub const TEXT: u16 = 0x0C00;
pub const LAYER: u16 = 0x0D02;
pub const DATATYPE: u16 = 0x0E02;
pub const WIDTH: u16 = 0x0F03;
pub const XY: u16 = 0x1003;
pub const ENDEL: u16 = 0x1100;
pub const SNAME: u16 = 0x1206;
pub const COLROW: u16 = 0x1302;
pub const NODE: u16 = 0x1500;
pub const TEXTTYPE: u16 = 0x1602;
pub const PRESENTATION: u16 = 0x1701;
pub const STRING: u16 = 0x1906;
pub const STRANS: u16 = 0x1A01;
pub const MAG: u16 = 0x1B05;
pub const ANGLE: u16 = 0x1C05;
pub const PATHTYPE: u16 = 0x2102;
pub const ELFLAGS: u16 = 0x2601;
pub const NODETYPE: u16 = 0x2A02;
pub const PROPATTR: u16 = 0x2B02;
pub const PROPVALUE: u16 = 0x2C06;
pub const BOX: u16 = 0x2D00;
pub const BOXTYPE: u16 = 0x2E02;
pub const PLEX: u16 = 0x2F03;
pub const BGNEXTN: u16 = 0x3003;
pub const ENDEXTN: u16 = 0x3103;

/// Largest type code this decoder knows about; anything above it is
/// rejected by the endianness sniffer and counted as unknown by the
/// reader.
pub const MAX_KNOWN: u16 = ENDEXTN;

/// Human-readable name for logging and diagnostics.
pub fn name(record_type: u16) -> &'static str {
    match record_type {
        HEADER => "HEADER",
        BGNLIB => "BGNLIB",
        LIBNAME => "LIBNAME",
        UNITS => "UNITS",
        ENDLIB => "ENDLIB",
        BGNSTR => "BGNSTR",
        STRNAME => "STRNAME",
        ENDSTR => "ENDSTR",
        BOUNDARY => "BOUNDARY",
        PATH => "PATH",
        SREF => "SREF",
        AREF => "AREF",
        TEXT => "TEXT",
        LAYER => "LAYER",
        DATATYPE => "DATATYPE",
        WIDTH => "WIDTH",
        XY => "XY",
        ENDEL => "ENDEL",
        SNAME => "SNAME",
        COLROW => "COLROW",
        NODE => "NODE",
        TEXTTYPE => "TEXTTYPE",
        PRESENTATION => "PRESENTATION",
        STRING => "STRING",
        STRANS => "STRANS",
        MAG => "MAG",
        ANGLE => "ANGLE",
        PATHTYPE => "PATHTYPE",
        ELFLAGS => "ELFLAGS",
        NODETYPE => "NODETYPE",
        PROPATTR => "PROPATTR",
        PROPVALUE => "PROPVALUE",
        BOX => "BOX",
        BOXTYPE => "BOXTYPE",
        PLEX => "PLEX",
        BGNEXTN => "BGNEXTN",
        ENDEXTN => "ENDEXTN",
        _ => "UNKNOWN",
    }
}

pub fn is_known(record_type: u16) -> bool {
    name(record_type) != "UNKNOWN"
}
