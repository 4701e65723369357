use log::debug;
use thiserror::Error;

use crate::records;

/// Framing-level failures. Any of these aborts the parse of the buffer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StreamError {
    #[error("truncated record at offset {offset}: declared {declared} bytes, {available} available")]
    TruncatedRecord {
        offset: u64,
        declared: usize,
        available: usize,
    },
    #[error("truncated stream at offset {offset}: needed {needed} bytes, {available} available")]
    TruncatedStream {
        offset: u64,
        needed: usize,
        available: usize,
    },
    #[error("byte order could not be determined: no valid records under either interpretation")]
    UndeterminedEndianness,
}

/// Byte order of a GDSII buffer. The format specifies big-endian, but
/// streams written by little-endian tools exist in the wild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Big,
    Little,
}

impl ByteOrder {
    fn u16_from(self, bytes: [u8; 2]) -> u16 {
        match self {
            ByteOrder::Big => u16::from_be_bytes(bytes),
            ByteOrder::Little => u16::from_le_bytes(bytes),
        }
    }

    fn u32_from(self, bytes: [u8; 4]) -> u32 {
        match self {
            ByteOrder::Big => u32::from_be_bytes(bytes),
            ByteOrder::Little => u32::from_le_bytes(bytes),
        }
    }

    fn u64_from(self, bytes: [u8; 8]) -> u64 {
        match self {
            ByteOrder::Big => u64::from_be_bytes(bytes),
            ByteOrder::Little => u64::from_le_bytes(bytes),
        }
    }
}

/// Header of one stream record. `total_length` counts the 4 header bytes,
/// so the payload is `total_length - 4` bytes long.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordHeader {
    /// Buffer offset of the length field.
    pub offset: u64,
    pub total_length: u16,
    pub record_type: u16,
}

impl RecordHeader {
    pub fn payload_len(&self) -> usize {
        self.total_length as usize - 4
    }
}

// Record lengths past this are assumed to be misread under the wrong
// byte order; real streams keep records far smaller.
const MAX_PLAUSIBLE_LENGTH: u16 = 20000;
const PROBE_RECORDS: usize = 5;

fn plausible(total_length: u16, record_type: u16) -> bool {
    total_length >= 4 && total_length <= MAX_PLAUSIBLE_LENGTH && record_type <= records::MAX_KNOWN
}

/// Score one byte-order interpretation by walking up to [`PROBE_RECORDS`]
/// record headers. A record scores 1 when its length and type code are
/// plausible; a leading HEADER record scores 2 extra. The walk stops at
/// the first implausible header since its length cannot be trusted.
fn score_order(buf: &[u8], order: ByteOrder) -> u32 {
    let mut score = 0u32;
    let mut pos = 0usize;
    for i in 0..PROBE_RECORDS {
        if pos + 4 > buf.len() {
            break;
        }
        let total = order.u16_from([buf[pos], buf[pos + 1]]);
        let rtype = order.u16_from([buf[pos + 2], buf[pos + 3]]);
        if !plausible(total, rtype) {
            break;
        }
        score += 1;
        if i == 0 && rtype == records::HEADER {
            score += 2;
        }
        pos += total as usize;
    }
    score
}

/// Sniff the byte order of a buffer by scoring both interpretations.
///
/// Buffers shorter than one record header, and exact ties, default to
/// big-endian (the format's specified order). Fails only when the buffer
/// holds at least one full header but neither interpretation yields a
/// single valid record.
pub fn detect_byte_order(buf: &[u8]) -> Result<ByteOrder, StreamError> {
    if buf.len() < 4 {
        return Ok(ByteOrder::Big);
    }
    let big = score_order(buf, ByteOrder::Big);
    let little = score_order(buf, ByteOrder::Little);
    debug!("byte order probe: big={} little={}", big, little);
    if big == 0 && little == 0 {
        return Err(StreamError::UndeterminedEndianness);
    }
    if little > big {
        Ok(ByteOrder::Little)
    } else {
        Ok(ByteOrder::Big)
    }
}

/// Positioned reader over a GDSII buffer with a fixed byte order.
///
/// The order is detected once per buffer at construction and every
/// multi-byte read goes through it.
pub struct GdsCursor<'a> {
    buf: &'a [u8],
    pos: usize,
    order: ByteOrder,
}

impl<'a> GdsCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Result<Self, StreamError> {
        let order = detect_byte_order(buf)?;
        Ok(Self { buf, pos: 0, order })
    }

    /// Bypass detection; used by tests and by callers that already know
    /// the order.
    pub fn with_order(buf: &'a [u8], order: ByteOrder) -> Self {
        Self { buf, pos: 0, order }
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.order
    }

    pub fn position(&self) -> u64 {
        self.pos as u64
    }

    pub fn seek(&mut self, offset: u64) {
        self.pos = offset as usize;
    }

    pub fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    pub fn at_end(&self) -> bool {
        self.remaining() == 0
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], StreamError> {
        if self.remaining() < n {
            return Err(StreamError::TruncatedStream {
                offset: self.pos as u64,
                needed: n,
                available: self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Read the next record header. The declared length must cover the
    /// header itself and fit inside the buffer.
    pub fn read_header(&mut self) -> Result<RecordHeader, StreamError> {
        let offset = self.pos as u64;
        if self.remaining() < 4 {
            return Err(StreamError::TruncatedRecord {
                offset,
                declared: 4,
                available: self.remaining(),
            });
        }
        let total_length = self
            .order
            .u16_from([self.buf[self.pos], self.buf[self.pos + 1]]);
        let record_type = self
            .order
            .u16_from([self.buf[self.pos + 2], self.buf[self.pos + 3]]);
        let declared = total_length as usize;
        if declared < 4 || self.remaining() < declared {
            return Err(StreamError::TruncatedRecord {
                offset,
                declared,
                available: self.remaining(),
            });
        }
        self.pos += 4;
        Ok(RecordHeader {
            offset,
            total_length,
            record_type,
        })
    }

    /// Skip the payload of a record whose header was just read.
    pub fn skip_payload(&mut self, header: &RecordHeader) -> Result<(), StreamError> {
        self.take(header.payload_len()).map(|_| ())
    }

    pub fn read_u16(&mut self) -> Result<u16, StreamError> {
        let b = self.take(2)?;
        Ok(self.order.u16_from([b[0], b[1]]))
    }

    pub fn read_i16(&mut self) -> Result<i16, StreamError> {
        Ok(self.read_u16()? as i16)
    }

    pub fn read_i32(&mut self) -> Result<i32, StreamError> {
        let b = self.take(4)?;
        Ok(self.order.u32_from([b[0], b[1], b[2], b[3]]) as i32)
    }

    /// Eight-byte IEEE-754 float in the buffer's byte order.
    pub fn read_f64(&mut self) -> Result<f64, StreamError> {
        let b = self.take(8)?;
        Ok(f64::from_bits(self.order.u64_from([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ])))
    }

    /// ASCII string payload; a trailing NUL pad byte is stripped.
    pub fn read_string(&mut self, len: usize) -> Result<String, StreamError> {
        let bytes = self.take(len)?;
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
    }
}
