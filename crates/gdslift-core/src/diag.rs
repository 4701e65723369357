use serde::{Deserialize, Serialize};

/// Accumulated per-run statistics and messages.
///
/// Recoverable problems - an unknown record, a degenerate polygon, a path
/// that would not convert - are counted here and processing continues;
/// they are never surfaced as errors. Returned alongside results so hosts
/// can report what was skipped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Records with an unrecognized type code, skipped by declared length.
    pub unknown_records: usize,
    /// Elements dropped before extraction (unmapped or disabled layer,
    /// window prefilter, unsupported kind).
    pub skipped_elements: usize,
    /// Polygons discarded for having fewer than 3 vertices after cleanup.
    pub degenerate_polygons: usize,
    /// Path elements that could not be converted to an outline.
    pub failed_path_conversions: usize,
    /// Polygons removed entirely by the exact clip.
    pub clipped_out: usize,
    /// Human-readable notes, at most one per skipped item.
    pub messages: Vec<String>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn note(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    /// Fold another diagnostics block into this one.
    pub fn merge(&mut self, other: Diagnostics) {
        self.unknown_records += other.unknown_records;
        self.skipped_elements += other.skipped_elements;
        self.degenerate_polygons += other.degenerate_polygons;
        self.failed_path_conversions += other.failed_path_conversions;
        self.clipped_out += other.clipped_out;
        self.messages.extend(other.messages);
    }

    pub fn is_clean(&self) -> bool {
        self.unknown_records == 0
            && self.skipped_elements == 0
            && self.degenerate_polygons == 0
            && self.failed_path_conversions == 0
            && self.clipped_out == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_accumulates() {
        let mut a = Diagnostics::new();
        a.unknown_records = 2;
        a.note("skipped record 0x2602");

        let mut b = Diagnostics::new();
        b.unknown_records = 1;
        b.degenerate_polygons = 3;

        a.merge(b);
        assert_eq!(a.unknown_records, 3);
        assert_eq!(a.degenerate_polygons, 3);
        assert_eq!(a.messages.len(), 1);
        assert!(!a.is_clean());
    }
}
