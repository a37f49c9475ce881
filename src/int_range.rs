use std::fmt;

/// A simple type for integer ranges
///
/// All ranges follow the bed file range convention: half-closed, [start,end)
///
/// This struct is used instead of the native rust Range type just to focus on the specific goals of
/// primarily genomic region intervals.
///
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd)]
pub struct IntRange {
    pub start: i64,
    pub end: i64,
}

impl IntRange {
    pub fn from_int(start: i64) -> Self {
        Self {
            start,
            end: start + 1,
        }
    }

    pub fn from_pair(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    pub fn size(&self) -> i64 {
        self.end - self.start
    }

    /// Return true if the ranges intersect (adjacency does not count)
    ///
    pub fn intersect_range(&self, other: &IntRange) -> bool {
        other.end > self.start && other.start < self.end
    }
}

impl fmt::Debug for IntRange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}-{})", self.start, self.end)
    }
}

/// Get the distance between 2 ranges
///
/// The notion of 'distance' between two ranges here means the gap between two ranges that don't intersect.
///
///    [---------)            [-----------)
///        R1    -------------     R2
///                R1/R2 dist
///
/// The distance is 0 if the ranges intersect or are adjacent
///
pub fn get_int_range_distance(ir1: &IntRange, ir2: &IntRange) -> usize {
    use std::cmp::max;
    max(max(ir2.start - ir1.end, ir1.start - ir2.end), 0) as usize
}

/// Get the distance between the closest positions of 2 ranges
///
/// This differs from [get_int_range_distance] in that adjacent ranges are 1 position apart, so
/// that two single-position ranges report the same distance as their raw positions would.
///
/// The distance is 0 only if the ranges intersect
///
pub fn get_int_range_position_distance(ir1: &IntRange, ir2: &IntRange) -> usize {
    if ir1.intersect_range(ir2) {
        0
    } else {
        get_int_range_distance(ir1, ir2) + 1
    }
}

pub fn get_overlap_range(r1: &IntRange, r2: &IntRange) -> Option<IntRange> {
    if !r1.intersect_range(r2) {
        return None;
    }
    Some(IntRange {
        start: std::cmp::max(r1.start, r2.start),
        end: std::cmp::min(r1.end, r2.end),
    })
}
