mod aggregate_cluster;
mod bcf_utils;
mod breakpoint;
mod chrom_order;
mod cli;
mod cluster_breakpoints;
mod cluster_vcf;
mod errors;
mod genome_segment;
mod globals;
mod int_range;
mod large_variant_output;
mod log_utils;
mod logger;
mod os_utils;
mod raw_record;
mod record_source;
mod run_stats;
mod standardize;
mod standardize_vcf;
mod vcf_utils;

use std::{error, process};

use hhmmss::Hhmmss;
use log::info;

use crate::cli::Commands;
use crate::cluster_vcf::run_cluster;
use crate::globals::{PROGRAM_NAME, PROGRAM_VERSION};
use crate::logger::setup_output_dir_and_logger;
use crate::standardize_vcf::run_standardize;

/// Run system configuration steps prior to starting any other program logic
///
fn system_configuration_prelude() {
    os_utils::attempt_max_open_file_limit();
}

fn run(settings: &cli::Settings) -> Result<(), Box<dyn error::Error>> {
    info!("Starting {PROGRAM_NAME} {PROGRAM_VERSION}");
    info!(
        "cmdline: {}",
        std::env::args().collect::<Vec<_>>().join(" ")
    );
    info!("Running on {} threads", settings.shared.thread_count);

    let start = std::time::Instant::now();

    match &settings.command {
        Commands::Standardize(x) => {
            run_standardize(&settings.shared, x)?;
        }
        Commands::Cluster(x) => {
            run_cluster(&settings.shared, x)?;
        }
    }

    info!(
        "{PROGRAM_NAME} completed. Total Runtime: {}",
        start.elapsed().hhmmssxxx()
    );
    Ok(())
}

fn main() {
    system_configuration_prelude();

    let settings = cli::validate_and_fix_settings(cli::parse_settings());

    // Setup logger, including creation of the output directory for the log file:
    setup_output_dir_and_logger(
        settings.get_output_dir(),
        settings.shared.clobber,
        settings.shared.debug,
    );

    if let Err(err) = run(&settings) {
        eprintln!("{err}");
        process::exit(2);
    }
}
