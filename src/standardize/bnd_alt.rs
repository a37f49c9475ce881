//! Parsing for VCF breakend ALT notation, such as `N[chr2:500[`
//!

use crate::breakpoint::{Strand, StrandPair};
use crate::errors::StandardizeError;

/// Mate location and junction orientation parsed from a breakend ALT allele
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BreakendAlt {
    pub mate_chrom: String,

    /// 1-indexed mate position
    pub mate_pos: i64,
    pub strands: StrandPair,
}

/// Placement of the reference base relative to the bracketed mate location
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum BasePlacement {
    /// `t[p[` or `t]p]`
    BeforeMate,

    /// `]p]t` or `[p[t`
    AfterMate,
}

/// Strand pair for each of the four breakend forms
///
/// | form   | strands |
/// |--------|---------|
/// | `t[p[` | `+-`    |
/// | `t]p]` | `++`    |
/// | `]p]t` | `-+`    |
/// | `[p[t` | `--`    |
///
const BREAKEND_STRAND_TABLE: [(BasePlacement, char, StrandPair); 4] = {
    use BasePlacement::*;
    use Strand::*;
    [
        (BeforeMate, '[', StrandPair::new(Forward, Reverse)),
        (BeforeMate, ']', StrandPair::new(Forward, Forward)),
        (AfterMate, ']', StrandPair::new(Reverse, Forward)),
        (AfterMate, '[', StrandPair::new(Reverse, Reverse)),
    ]
};

fn lookup_strands(placement: BasePlacement, bracket: char) -> Option<StrandPair> {
    BREAKEND_STRAND_TABLE
        .iter()
        .find(|(p, b, _)| *p == placement && *b == bracket)
        .map(|(_, _, strands)| *strands)
}

/// True if the ALT allele uses bracket notation at all
pub fn is_breakend_alt(alt: &str) -> bool {
    alt.contains('[') || alt.contains(']')
}

/// Parse a breakend ALT allele in one of the four bracket forms
///
/// The record ID is only used to label the error. Single breakends (`t.`, `.t`) and any other
/// allele that does not match one of the four forms are rejected.
///
pub fn parse_breakend_alt(id: &str, alt: &str) -> Result<BreakendAlt, StandardizeError> {
    let malformed = || StandardizeError::MalformedBreakend {
        id: id.to_string(),
        alt: alt.to_string(),
    };

    let bracket = alt.chars().find(|&c| c == '[' || c == ']').ok_or_else(malformed)?;
    let other_bracket = if bracket == '[' { ']' } else { '[' };
    if alt.contains(other_bracket) || alt.matches(bracket).count() != 2 {
        return Err(malformed());
    }

    let mut parts = alt.split(bracket);
    let (prefix, mate_str, suffix) = match (parts.next(), parts.next(), parts.next()) {
        (Some(a), Some(b), Some(c)) => (a, b, c),
        _ => return Err(malformed()),
    };

    let placement = match (prefix.is_empty(), suffix.is_empty()) {
        (false, true) => BasePlacement::BeforeMate,
        (true, false) => BasePlacement::AfterMate,
        _ => return Err(malformed()),
    };

    let (mate_chrom, mate_pos) = mate_str.rsplit_once(':').ok_or_else(malformed)?;
    let mate_pos = mate_pos.parse::<i64>().map_err(|_| malformed())?;
    if mate_chrom.is_empty() || mate_pos < 1 {
        return Err(malformed());
    }

    let strands = lookup_strands(placement, bracket).ok_or_else(malformed)?;

    Ok(BreakendAlt {
        mate_chrom: mate_chrom.to_string(),
        mate_pos,
        strands,
    })
}
