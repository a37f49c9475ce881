use std::collections::HashSet;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Args;
use const_format::concatcp;
use regex::Regex;
use serde::{Deserialize, Serialize};
use simple_error::{SimpleResult, bail, map_err_with};
use unwrap::unwrap;

use super::utils::check_required_filename;
use crate::aggregate_cluster::{MergeSettings, MergedPosition};
use crate::breakpoint::SvType;
use crate::cluster_breakpoints::ClusterSettings;
use crate::genome_segment::GenomeSegment;

pub const CLUSTER_SETTINGS_FILENAME: &str = "cluster.settings.json";

#[derive(Args, Default, Deserialize, Serialize)]
pub struct ClusterVcfSettings {
    /// Directory for all cluster command output (must not already exist)
    #[arg(long, value_name = "DIR", default_value = concatcp!(env!("CARGO_PKG_NAME"), "_cluster_output"))]
    pub output_dir: Utf8PathBuf,

    /// Standardized SV calls in VCF or BCF format (required). Can be specified multiple times to
    /// cluster calls from multiple callers or samples.
    ///
    /// Each file must be sorted. Per-chromosome parallel clustering and the --region option
    /// require each file to be indexed.
    ///
    #[arg(long = "vcf", value_name = "FILE", required = true)]
    pub vcf_filenames: Vec<String>,

    /// Maximum distance between matching breakpoints of two clustered calls
    #[arg(long, default_value_t = 500)]
    pub dist: i64,

    /// Minimum reciprocal overlap between intra-chromosomal DEL, DUP and INV calls
    #[arg(long, default_value_t = 0.0)]
    pub frac: f64,

    /// Cluster calls regardless of their breakpoint strands
    #[arg(long)]
    pub ignore_strands: bool,

    /// Maximum distance a confidence interval can extend a breakpoint on either side
    ///
    /// Set to 0 to ignore confidence intervals.
    ///
    #[arg(long, default_value_t = 250)]
    pub max_ci_padding: i64,

    /// Method used to place the breakpoints of a merged call
    #[arg(long, value_enum, default_value_t = MergedPosition::Median)]
    pub merged_position: MergedPosition,

    /// Comma-delimited list of SV types to cluster, all other calls are removed
    #[arg(long, default_value = "DEL,DUP,INV,BND,INS")]
    pub svtypes: String,

    /// Regex used to select the chromosomes of calls to cluster. Both breakpoints of a call must
    /// be on a matching chromosome.
    ///
    #[arg(
        long,
        value_name = "REGEX",
        default_value = r"^(chr)?([1-9]|1[0-9]|2[0-2]|X|Y)$"
    )]
    pub chrom_regex: String,

    /// Restrict clustering to calls with the first breakpoint in the given region, in samtools
    /// format ('chr20' or 'chr20:1000-2000')
    ///
    #[arg(long)]
    pub region: Option<String>,

    /// Prefix of merged call IDs, which are written as PREFIX_SVTYPE_N
    #[arg(long, default_value = env!("CARGO_PKG_NAME"))]
    pub prefix: String,

    /// Report only the first source of each merged call, and no per-source sample fields
    #[arg(long)]
    pub single_source: bool,
}

impl ClusterVcfSettings {
    pub fn cluster_settings(&self) -> ClusterSettings {
        ClusterSettings {
            dist: self.dist,
            frac: self.frac,
            ignore_strands: self.ignore_strands,
            max_ci_padding: self.max_ci_padding,
        }
    }

    pub fn merge_settings(&self) -> MergeSettings {
        MergeSettings {
            merged_position: self.merged_position,
            single_source: self.single_source,
        }
    }
}

/// Parse a comma-delimited SV type list such as "DEL,DUP"
///
pub fn parse_svtypes(svtypes: &str) -> SimpleResult<Vec<SvType>> {
    let mut parsed = Vec::new();
    for word in svtypes.split(',').map(|x| x.trim()).filter(|x| !x.is_empty()) {
        let sv_type = map_err_with!(
            SvType::from_str(&word.to_uppercase()),
            "Unrecognized SV type '{word}' in --svtypes argument"
        )?;
        if !parsed.contains(&sv_type) {
            parsed.push(sv_type);
        }
    }
    if parsed.is_empty() {
        bail!("--svtypes argument must list at least one SV type");
    }
    Ok(parsed)
}

/// Validate settings and update to parameters that can't be processed automatically by clap.
///
/// Assumes that the logger is not setup
///
pub fn validate_and_fix_cluster_settings(
    settings: ClusterVcfSettings,
) -> SimpleResult<ClusterVcfSettings> {
    if settings.vcf_filenames.is_empty() {
        bail!("Must specify at least one input variant file");
    }

    let mut check_filenames = HashSet::new();
    for vcf_filename in settings.vcf_filenames.iter() {
        check_required_filename(vcf_filename, "input variant")?;
        if !check_filenames.insert(vcf_filename.as_str()) {
            bail!("Duplicated input variant file: '{vcf_filename}'");
        }
    }

    if settings.dist < 0 {
        bail!("--dist argument must not be negative");
    }
    if !(0.0..=1.0).contains(&settings.frac) {
        bail!("--frac argument must be in the range [0,1]");
    }
    if settings.max_ci_padding < 0 {
        bail!("--max-ci-padding argument must not be negative");
    }

    parse_svtypes(&settings.svtypes)?;

    // Check that regex is valid
    let _ = map_err_with!(
        Regex::new(&settings.chrom_regex),
        "Invalid regex for --chrom-regex"
    )?;

    if let Some(region) = &settings.region {
        GenomeSegment::from_region_str(region)?;
    }

    if settings.prefix.is_empty() || settings.prefix.contains(char::is_whitespace) {
        bail!("--prefix argument must be non-empty and without whitespace");
    }

    Ok(settings)
}

/// Write cluster settings out in json format
pub fn write_cluster_settings(output_dir: &Utf8Path, settings: &ClusterVcfSettings) {
    use log::info;

    let filename = output_dir.join(CLUSTER_SETTINGS_FILENAME);

    info!("Writing cluster settings to file: '{filename}'");

    let f = unwrap!(
        std::fs::File::create(&filename),
        "Unable to create cluster settings json file: '{filename}'"
    );

    serde_json::to_writer_pretty(&f, &settings).unwrap();
}
