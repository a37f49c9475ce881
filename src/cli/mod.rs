mod cluster;
mod shared;
mod standardize;
mod utils;

use camino::Utf8Path;
use chrono::Datelike;
use clap::{Parser, Subcommand};
use simple_error::{SimpleResult, bail};

use self::cluster::validate_and_fix_cluster_settings;
pub use self::cluster::{ClusterVcfSettings, parse_svtypes, write_cluster_settings};
use self::shared::validate_and_fix_shared_settings;
pub use self::shared::SharedSettings;
use self::standardize::validate_and_fix_standardize_settings;
pub use self::standardize::{StandardizeSettings, write_standardize_settings};

#[derive(Subcommand)]
pub enum Commands {
    /// Convert the SV calls of one caller into the standardized breakpoint format
    Standardize(StandardizeSettings),

    /// Cluster standardized SV calls from one to many files, and merge each cluster into one call
    Cluster(ClusterVcfSettings),
}

#[derive(Parser)]
#[command(
    author,
    version,
    about,
    after_help = format!("Copyright (C) 2004-{}     Pacific Biosciences of California, Inc.
This program comes with ABSOLUTELY NO WARRANTY; it is intended for
Research Use Only and not for use in diagnostic procedures.", chrono::Utc::now().year()),
    help_template = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}"
)]
#[clap(propagate_version = true, rename_all = "kebab_case")]
pub struct Settings {
    #[command(flatten)]
    pub shared: SharedSettings,

    #[command(subcommand)]
    pub command: Commands,
}

impl Settings {
    pub fn get_output_dir(&self) -> &Utf8Path {
        match &self.command {
            Commands::Standardize(x) => &x.output_dir,
            Commands::Cluster(x) => &x.output_dir,
        }
    }
}

/// Checks if a directory does not exist
///
pub fn check_novel_dirname(dirname: &Utf8Path, label: &str) -> SimpleResult<()> {
    if dirname.exists() {
        bail!("{} already exists: \"{}\"", label, dirname);
    }
    Ok(())
}

/// Validate settings and update parameters that can't be processed by clap
///
/// Assumes that the logger is not setup
///
pub fn validate_and_fix_settings_impl(mut settings: Settings) -> SimpleResult<Settings> {
    settings.shared = validate_and_fix_shared_settings(settings.shared)?;

    settings.command = match settings.command {
        Commands::Standardize(x) => {
            let x = validate_and_fix_standardize_settings(x)?;
            Commands::Standardize(x)
        }
        Commands::Cluster(x) => {
            let x = validate_and_fix_cluster_settings(x)?;
            Commands::Cluster(x)
        }
    };

    Ok(settings)
}

/// Validate settings and update to parameters that can't be processed automatically by clap.
///
pub fn validate_and_fix_settings(settings: Settings) -> Settings {
    match validate_and_fix_settings_impl(settings) {
        Ok(x) => x,
        Err(msg) => {
            eprintln!("Invalid command-line setting: {}", msg);
            std::process::exit(exitcode::USAGE);
        }
    }
}

pub fn parse_settings() -> Settings {
    Settings::parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Settings::command().debug_assert();
    }

    #[test]
    fn test_parse_cluster_command() {
        let settings = Settings::parse_from([
            "svcluster",
            "cluster",
            "--vcf",
            "a.vcf.gz",
            "--vcf",
            "b.vcf.gz",
            "--merged-position",
            "mean",
            "--threads",
            "2",
        ]);
        match &settings.command {
            Commands::Cluster(x) => {
                assert_eq!(x.vcf_filenames, vec!["a.vcf.gz", "b.vcf.gz"]);
                assert_eq!(x.dist, 500);
                assert_eq!(x.max_ci_padding, 250);
                assert_eq!(
                    x.merged_position,
                    crate::aggregate_cluster::MergedPosition::Mean
                );
                assert_eq!(x.prefix, "svcluster");
            }
            _ => panic!("unexpected command"),
        }
        assert_eq!(settings.get_output_dir().as_str(), "svcluster_cluster_output");
    }
}
