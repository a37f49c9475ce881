//! Fixed karyotype ordering for chromosome names
//!
//! Input files may come from callers with different contig header orders, so record ordering is
//! defined on chromosome names alone rather than any file's header index.
//!

use std::cmp::Ordering;

/// Sort rank of a chromosome name
///
/// Autosomes sort numerically, followed by X, Y and the mitochondrial chromosome, followed by all
/// other contigs in lexicographic order. Any 'chr' prefix is ignored for ranking.
///
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub enum ChromRank {
    Numeric(u32),
    X,
    Y,
    Mito,
    Other(String),
}

fn strip_chrom_prefix(chrom: &str) -> &str {
    chrom
        .strip_prefix("chr")
        .or_else(|| chrom.strip_prefix("Chr"))
        .or_else(|| chrom.strip_prefix("CHR"))
        .unwrap_or(chrom)
}

pub fn get_chrom_rank(chrom: &str) -> ChromRank {
    let base = strip_chrom_prefix(chrom);
    if !base.is_empty() && base.bytes().all(|c| c.is_ascii_digit()) {
        if let Ok(x) = base.parse::<u32>() {
            return ChromRank::Numeric(x);
        }
    }
    match base {
        "X" | "x" => ChromRank::X,
        "Y" | "y" => ChromRank::Y,
        "M" | "MT" | "m" | "mt" => ChromRank::Mito,
        _ => ChromRank::Other(chrom.to_string()),
    }
}

/// Compare two chromosome names in karyotype order
///
/// Names with the same rank (e.g. "1" and "chr1") fall back to string order so that the
/// comparison is a total order.
///
pub fn compare_chroms(chrom1: &str, chrom2: &str) -> Ordering {
    get_chrom_rank(chrom1)
        .cmp(&get_chrom_rank(chrom2))
        .then_with(|| chrom1.cmp(chrom2))
}

/// Sort key for a genomic position in karyotype order
///
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub struct GenomePosKey {
    pub chrom_rank: ChromRank,
    pub chrom: String,
    pub pos: i64,
}

impl GenomePosKey {
    pub fn new(chrom: &str, pos: i64) -> Self {
        Self {
            chrom_rank: get_chrom_rank(chrom),
            chrom: chrom.to_string(),
            pos,
        }
    }
}

impl std::fmt::Display for GenomePosKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.chrom, self.pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_karyotype_order() {
        let mut chroms = vec!["chrM", "chr10", "chrY", "chr2", "chrUn_gl000220", "chrX", "chr1"];
        chroms.sort_by(|a, b| compare_chroms(a, b));
        assert_eq!(
            chroms,
            vec!["chr1", "chr2", "chr10", "chrX", "chrY", "chrM", "chrUn_gl000220"]
        );
    }

    #[test]
    fn test_prefix_free_names() {
        assert_eq!(compare_chroms("2", "10"), Ordering::Less);
        assert_eq!(compare_chroms("X", "MT"), Ordering::Less);
        assert_eq!(compare_chroms("GL000192.1", "MT"), Ordering::Greater);
        assert_eq!(compare_chroms("chr1", "chr1"), Ordering::Equal);
    }

    #[test]
    fn test_pos_key_order() {
        let k1 = GenomePosKey::new("chr2", 500);
        let k2 = GenomePosKey::new("chr10", 100);
        let k3 = GenomePosKey::new("chr2", 501);
        assert!(k1 < k2);
        assert!(k1 < k3);
        assert!(k3 < k2);
    }
}
