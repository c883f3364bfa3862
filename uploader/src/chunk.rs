//! Splitting a payload into the byte ranges of a resumable upload.

use std::fmt;

/// Non-final chunks must be a multiple of this many bytes (256 KiB).
pub const CHUNK_GRANULARITY: u64 = 256 * 1024;

/// One contiguous slice of the payload, `start..=end` in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    /// Inclusive, as in the `Content-Range` header.
    pub end: u64,
    pub total: u64,
}

impl ByteRange {
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    pub fn is_last(&self) -> bool {
        self.end + 1 == self.total
    }

    /// The value of the `Content-Range` header for this chunk.
    pub fn content_range(&self) -> String {
        self.to_string()
    }

    pub(crate) fn as_usize_range(&self) -> std::ops::Range<usize> {
        self.start as usize..(self.end + 1) as usize
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bytes {}-{}/{}", self.start, self.end, self.total)
    }
}

/// Iterator over the chunks of a `total`-byte payload.
///
/// The yielded ranges cover `0..total` exactly once, in order. A zero-byte payload
/// yields nothing.
#[derive(Debug, Clone)]
pub struct ChunkPlan {
    next_start: u64,
    total: u64,
    chunk_size: u64,
}

impl ChunkPlan {
    /// # Panics
    ///
    /// Panics if `chunk_size` is zero.
    pub fn new(total: u64, chunk_size: u64) -> Self {
        assert!(chunk_size > 0, "chunk size must be positive");
        Self {
            next_start: 0,
            total,
            chunk_size,
        }
    }

    /// Starts the plan at `offset` rather than at zero.
    pub fn starting_at(mut self, offset: u64) -> Self {
        self.next_start = offset.min(self.total);
        self
    }

    pub fn chunk_count(&self) -> u64 {
        (self.total - self.next_start).div_ceil(self.chunk_size)
    }
}

impl Iterator for ChunkPlan {
    type Item = ByteRange;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_start >= self.total {
            return None;
        }
        let start = self.next_start;
        let end = (start + self.chunk_size).min(self.total) - 1;
        self.next_start = end + 1;
        Some(ByteRange {
            start,
            end,
            total: self.total,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.chunk_count() as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for ChunkPlan {}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn six_hundred_kb_in_three_chunks() {
        let ranges: Vec<_> = ChunkPlan::new(614400, CHUNK_GRANULARITY)
            .map(|r| r.content_range())
            .collect();
        assert_eq!(
            ranges,
            vec![
                "bytes 0-262143/614400",
                "bytes 262144-524287/614400",
                "bytes 524288-614399/614400",
            ]
        );
    }

    #[test]
    fn covers_payload_exactly_once() {
        for total in [1, 2, 262143, 262144, 262145, 524288, 1_000_000, 3 * 262144 + 17] {
            let mut expected_start = 0;
            let mut sum = 0;
            for range in ChunkPlan::new(total, CHUNK_GRANULARITY) {
                assert_eq!(range.start, expected_start, "gap or overlap for {total}");
                assert!(range.len() <= CHUNK_GRANULARITY);
                sum += range.len();
                expected_start = range.end + 1;
            }
            assert_eq!(sum, total);
            assert_eq!(expected_start, total);
        }
    }

    #[test]
    fn only_final_chunk_is_last() {
        let plan = ChunkPlan::new(600_000, CHUNK_GRANULARITY);
        assert_eq!(plan.len(), 3);
        let lasts: Vec<_> = plan.map(|r| r.is_last()).collect();
        assert_eq!(lasts, vec![false, false, true]);
    }

    #[test]
    fn empty_payload_has_no_chunks() {
        assert_eq!(ChunkPlan::new(0, CHUNK_GRANULARITY).count(), 0);
    }

    #[test]
    fn resumes_from_offset() {
        let ranges: Vec<_> = ChunkPlan::new(614400, CHUNK_GRANULARITY)
            .starting_at(262144)
            .map(|r| r.start)
            .collect();
        assert_eq!(ranges, vec![262144, 524288]);
    }
}
