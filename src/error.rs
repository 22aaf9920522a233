use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum GeoHcaError {
    #[error("{0} is not a valid GEO accession")]
    InvalidGeoAccession(String),

    #[error("invalid SRA study accession: {0}")]
    InvalidStudyAccession(String),

    #[error("missing config file geo-to-hca.json in current directory")]
    MissingConfig,

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("no GEO accessions given on the command line or in the config file")]
    NoAccessions,

    #[error("NCBI request failed: {0}")]
    NcbiHttp(String),

    #[error("NCBI returned status {status}: {message}")]
    NcbiStatus { status: u16, message: String },

    #[error("accessions not found in SRA: {}", .0.join(", "))]
    #[diagnostic(help("check that the accessions are public and spelled correctly"))]
    NotFoundSra(Vec<String>),

    #[error("failed to get SRP accessions for {accession}: {message}")]
    StudyLookup { accession: String, message: String },

    #[error("no SRA study accession found for {0}")]
    #[diagnostic(help("the series may not have raw data deposited in SRA"))]
    NoStudyAccession(String),

    #[error("no runs found in SRA run table for {0}")]
    NoRunInfo(String),

    #[error("failed to parse SRA run table: {0}")]
    RunInfoParse(String),

    #[error("GEO request failed: {0}")]
    GeoHttp(String),

    #[error("GEO returned status {status}: {message}")]
    GeoStatus { status: u16, message: String },

    #[error("failed to scan XML document: {0}")]
    Xml(String),

    #[error("failed to write workbook: {0}")]
    Workbook(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
