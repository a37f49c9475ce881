//! Error types for standardization, clustering and the overall record pipeline
//!

use thiserror::Error;

/// Failure to convert one raw record into the canonical breakpoint schema
///
/// These errors apply to a single record. The caller of the standardizer decides whether to skip
/// the record or abort the run.
///
#[derive(Debug, Error, PartialEq)]
pub enum StandardizeError {
    #[error("no standardizer is registered for caller '{caller}'")]
    UnregisteredCaller { caller: String },

    #[error("record '{id}' has malformed breakend ALT allele '{alt}'")]
    MalformedBreakend { id: String, alt: String },

    #[error("record '{id}' has unrecognized SV type '{sv_type}'")]
    UnknownSvType { id: String, sv_type: String },

    #[error("record '{id}' has invalid {key} value '{value}'")]
    InvalidField {
        id: String,
        key: String,
        value: String,
    },
}

#[derive(Debug, Error, PartialEq)]
pub enum ClusterError {
    #[error(
        "input records are not sorted: record '{current_id}' at {current} follows a record at {previous}"
    )]
    OrderingViolation {
        previous: String,
        current: String,
        current_id: String,
    },
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Standardize(#[from] StandardizeError),

    #[error(transparent)]
    Cluster(#[from] ClusterError),

    #[error("variant file error: {0}")]
    Htslib(#[from] rust_htslib::errors::Error),

    #[error(transparent)]
    Index(#[from] crate::vcf_utils::BcfBuildError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Input(String),
}
