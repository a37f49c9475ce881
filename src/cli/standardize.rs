use camino::{Utf8Path, Utf8PathBuf};
use clap::Args;
use const_format::concatcp;
use serde::{Deserialize, Serialize};
use simple_error::{SimpleResult, bail};
use unwrap::unwrap;

use super::utils::{check_optional_filename, check_required_filename};
use crate::standardize::StandardizerRegistry;

pub const STANDARDIZE_SETTINGS_FILENAME: &str = "standardize.settings.json";

#[derive(Args, Default, Deserialize, Serialize)]
pub struct StandardizeSettings {
    /// Directory for all standardize command output (must not already exist)
    #[arg(long, value_name = "DIR", default_value = concatcp!(env!("CARGO_PKG_NAME"), "_standardize_output"))]
    pub output_dir: Utf8PathBuf,

    /// SV calls from a single caller, in VCF or BCF format
    #[arg(long = "vcf", value_name = "FILE")]
    pub vcf_filename: String,

    /// Caller which produced the input SV calls
    ///
    /// Supported callers are delly, lumpy, manta, wham and melt. Use 'canonical' to re-read
    /// output of this program. If not given, the caller is taken from the '##source' line of the
    /// input header.
    ///
    #[arg(long)]
    pub caller: Option<String>,

    /// If provided, record IDs will be overwritten as PREFIX_CALLER_N
    #[arg(long)]
    pub prefix: Option<String>,

    /// Reference fasta index (.fai). If provided, the contigs of the index are used in the output
    /// header and records on any other contig are removed.
    #[arg(long = "contigs", value_name = "FILE")]
    pub contigs_filename: Option<String>,

    /// Minimum size of deletions, duplications and inversions to report
    #[arg(long, default_value_t = 50)]
    pub min_size: i64,

    /// Include records where all samples are called 0/0 or ./.
    #[arg(long)]
    pub include_reference_sites: bool,

    /// Call sites with null genotypes (./.) as variant sites
    ///
    /// Generally useful when a caller has been run on a single sample and only reports variant
    /// sites.
    ///
    #[arg(long)]
    pub call_null_sites: bool,

    /// Skip records which can't be standardized instead of stopping with an error
    #[arg(long)]
    pub skip_invalid: bool,
}

/// Validate settings and update to parameters that can't be processed automatically by clap.
///
/// Assumes that the logger is not setup
///
pub fn validate_and_fix_standardize_settings(
    settings: StandardizeSettings,
) -> SimpleResult<StandardizeSettings> {
    check_required_filename(&settings.vcf_filename, "input variant")?;
    check_optional_filename(settings.contigs_filename.as_ref(), "contig index")?;

    let mut settings = settings;
    if let Some(caller) = &settings.caller {
        let registry = StandardizerRegistry::default();
        if let Err(e) = registry.get(caller) {
            bail!(
                "{e}. Registered callers are: {}",
                registry.caller_tags().join(", ")
            );
        }
        settings.caller = Some(caller.to_lowercase());
    }

    if settings.min_size < 0 {
        bail!("--min-size argument must not be negative");
    }

    if let Some(prefix) = &settings.prefix {
        if prefix.is_empty() || prefix.contains(char::is_whitespace) || prefix.contains(';') {
            bail!("--prefix argument '{prefix}' must be non-empty, without whitespace or ';'");
        }
    }

    Ok(settings)
}

/// Write standardize settings out in json format
pub fn write_standardize_settings(output_dir: &Utf8Path, settings: &StandardizeSettings) {
    use log::info;

    let filename = output_dir.join(STANDARDIZE_SETTINGS_FILENAME);

    info!("Writing standardize settings to file: '{filename}'");

    let f = unwrap!(
        std::fs::File::create(&filename),
        "Unable to create standardize settings json file: '{filename}'"
    );

    serde_json::to_writer_pretty(&f, &settings).unwrap();
}
