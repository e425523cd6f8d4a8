use crate::error::{DeltaError, Result};

/// One contiguous slice `[start, stop)` of an index space, tagged with its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub index: usize,
    pub start: usize,
    pub stop: usize,
}

impl Range {
    #[inline]
    pub fn len(&self) -> usize {
        self.stop - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.stop
    }

    #[inline]
    pub fn as_range(&self) -> std::ops::Range<usize> {
        self.start..self.stop
    }

    /// Split `[start, stop)` into `num_ranges` ordered, gap-free ranges.
    ///
    /// Every range holds `count / num_ranges` indices except the last, which
    /// also takes the remainder so that it ends exactly at `stop`.
    pub fn partition(start: usize, stop: usize, num_ranges: usize) -> Result<Vec<Range>> {
        if start > stop {
            return Err(DeltaError::InvalidArgument(format!(
                "range start {} is after stop {}",
                start, stop
            )));
        }
        if num_ranges == 0 {
            return Err(DeltaError::InvalidArgument(
                "cannot partition into zero ranges".to_string(),
            ));
        }
        let size = (stop - start) / num_ranges;
        let ranges = (0..num_ranges)
            .map(|index| {
                let lo = start + index * size;
                let hi = if index + 1 == num_ranges { stop } else { lo + size };
                Range {
                    index,
                    start: lo,
                    stop: hi,
                }
            })
            .collect();
        Ok(ranges)
    }
}
