//! # GdsLift I/O
//!
//! Decoder for the GDSII binary stream format. The stream is a sequence of
//! length-prefixed records - 2-byte total length, 2-byte type code, payload
//! - in either byte order with no self-describing endianness marker, so the
//! cursor sniffs the order once per buffer before any record is read.
//!
//! Decoding is two-pass: pass 1 captures library metadata and structure
//! names/offsets, pass 2 materializes a structure's elements on demand.

pub mod cursor;
pub mod records;
pub mod reader;

pub use cursor::{ByteOrder, GdsCursor, RecordHeader, StreamError};
pub use reader::{GdsReader, GrammarError, ParseError};
