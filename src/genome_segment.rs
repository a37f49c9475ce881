use std::fmt;

use simple_error::{SimpleResult, bail};

use crate::int_range::IntRange;

/// The structure represents a contiguous region of the genome on a single chromosome
///
/// When range is None the segment covers the whole chromosome.
///
#[derive(Clone, Eq, PartialEq)]
pub struct GenomeSegment {
    pub chrom: String,

    /// Zero-indexed half-open range
    pub range: Option<IntRange>,
}

impl GenomeSegment {
    pub fn from_chrom(chrom: &str) -> Self {
        Self {
            chrom: chrom.to_string(),
            range: None,
        }
    }

    /// Convert from a string in 'samtools' region format (e.g. chr20:100-200)
    ///
    pub fn from_region_str(region_str: &str) -> SimpleResult<Self> {
        parse_samtools_region_string(region_str)
    }

    /// Convert to a string in 'samtools' region format (e.g. chr20:100-200)
    ///
    pub fn to_region_str(&self) -> String {
        match &self.range {
            Some(range) => format!("{}:{}-{}", self.chrom, range.start + 1, range.end),
            None => self.chrom.clone(),
        }
    }

    /// Return true if the 1-indexed position falls within this segment
    pub fn contains_pos(&self, chrom: &str, pos: i64) -> bool {
        if chrom != self.chrom {
            return false;
        }
        match &self.range {
            Some(range) => range.intersect_range(&IntRange::from_int(pos - 1)),
            None => true,
        }
    }
}

impl fmt::Debug for GenomeSegment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Segment: {}", self.to_region_str())
    }
}

/// Parse position range from samtools-style genomic interval string, return
/// start-end coordinate in bedtools zero-index half-open format.
///
/// In the samtools-style string, "100-300" would return (99,300). Just "100"
/// should return (99, 100)
///
fn parse_samtools_pos_range(region_str: &str, pos_range_str: &str) -> SimpleResult<IntRange> {
    let s2 = pos_range_str.split('-').collect::<Vec<_>>();
    if s2.len() > 2 {
        bail!(
            "Unexpected format in position range '{pos_range_str}' from genome region string '{region_str}'"
        );
    }

    // Strip any commas out of the number field (same as tabix cmdline behavior)
    let mut values = Vec::new();
    for s in s2 {
        let mut s = String::from(s);
        s.retain(|c| c != ',');
        match s.parse::<i64>() {
            Ok(x) => values.push(x),
            Err(_) => {
                bail!("Can't parse position '{s}' from genome region string '{region_str}'");
            }
        }
    }
    let start = values[0] - 1;
    let end = if values.len() == 1 {
        values[0]
    } else {
        values[1]
    };
    if start < 0 || end <= start {
        bail!("Invalid position range in genome region string '{region_str}'");
    }
    Ok(IntRange::from_pair(start, end))
}

/// Convert from a string in 'samtools' region format (e.g. chr20:100-200)
///
/// Start and end are converted to the zero-indexed half-open convention used for bed. Commas will
/// be stripped out of coordinates if present.
///
/// The last ':' separates the chromosome from the position range, so contig names with colons in
/// them, such as HLA alleles like "HLA-DRB1*10:01:01", can be used as long as a range is given.
///
pub fn parse_samtools_region_string(region_str: &str) -> SimpleResult<GenomeSegment> {
    if region_str.is_empty() {
        bail!("Empty genome region string");
    }

    if let Some((chrom, pos_str)) = region_str.rsplit_once(':') {
        let looks_like_range = !pos_str.is_empty()
            && pos_str
                .chars()
                .all(|c| c.is_ascii_digit() || c == ',' || c == '-');
        if looks_like_range && !chrom.is_empty() {
            let range = parse_samtools_pos_range(region_str, pos_str)?;
            return Ok(GenomeSegment {
                chrom: chrom.to_string(),
                range: Some(range),
            });
        }
    }
    Ok(GenomeSegment::from_chrom(region_str))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_region_string() {
        let segment = GenomeSegment {
            chrom: "chr2".to_string(),
            range: Some(IntRange::from_int(10)),
        };
        assert_eq!(segment.to_region_str(), "chr2:11-11".to_string());
    }

    #[test]
    fn test_samtools_region_string_splitter() {
        // A simple case
        let s = "chr2:1000-2000";
        let segment = parse_samtools_region_string(s).unwrap();
        assert_eq!(segment.chrom, "chr2");
        assert_eq!(segment.range, Some(IntRange::from_pair(999, 2000)));

        // Simple case with commas
        let s = "chr2:1,000-2,000";
        let segment = parse_samtools_region_string(s).unwrap();
        assert_eq!(segment.range, Some(IntRange::from_pair(999, 2000)));

        // Chrom only
        let segment = parse_samtools_region_string("chrX").unwrap();
        assert_eq!(segment.chrom, "chrX");
        assert_eq!(segment.range, None);

        // Invalid range
        assert!(parse_samtools_region_string("chr2:2000-1000").is_err());
    }

    #[test]
    fn test_samtools_region_string_splitter_hla() {
        let s = "HLA-DRB1*10:01:01:1000-2000";
        let segment = parse_samtools_region_string(s).unwrap();
        assert_eq!(segment.chrom, "HLA-DRB1*10:01:01");
        assert_eq!(segment.range, Some(IntRange::from_pair(999, 2000)));
    }

    #[test]
    fn test_contains_pos() {
        let segment = parse_samtools_region_string("chr1:100-200").unwrap();
        assert!(segment.contains_pos("chr1", 100));
        assert!(segment.contains_pos("chr1", 200));
        assert!(!segment.contains_pos("chr1", 99));
        assert!(!segment.contains_pos("chr1", 201));
        assert!(!segment.contains_pos("chr2", 150));
    }
}
