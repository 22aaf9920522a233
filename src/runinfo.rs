use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};

use crate::domain::StudyAccession;
use crate::error::GeoHcaError;

/// One row of the SRA run table (`rettype=runinfo`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RunInfo {
    #[serde(rename = "Run")]
    pub run: String,
    #[serde(rename = "Experiment", default)]
    pub experiment: String,
    #[serde(rename = "LibraryName", default)]
    pub library_name: String,
    #[serde(rename = "LibraryStrategy", default)]
    pub library_strategy: String,
    #[serde(rename = "LibrarySelection", default)]
    pub library_selection: String,
    #[serde(rename = "LibrarySource", default)]
    pub library_source: String,
    #[serde(rename = "LibraryLayout", default)]
    pub library_layout: String,
    #[serde(rename = "Platform", default)]
    pub platform: String,
    #[serde(rename = "Model", default)]
    pub model: String,
    #[serde(rename = "SRAStudy", default)]
    pub sra_study: String,
    #[serde(rename = "BioProject", default)]
    pub bioproject: String,
    #[serde(rename = "Study_Pubmed_id", default)]
    pub study_pubmed_id: String,
    #[serde(rename = "Sample", default)]
    pub sample: String,
    #[serde(rename = "BioSample", default)]
    pub biosample: String,
    #[serde(rename = "TaxID", default)]
    pub tax_id: String,
    #[serde(rename = "ScientificName", default)]
    pub scientific_name: String,
    #[serde(rename = "SampleName", default)]
    pub sample_name: String,
    #[serde(rename = "Sex", default)]
    pub sex: String,
    #[serde(rename = "Body_Site", default)]
    pub body_site: String,
}

/// Parses the run table returned for `study`.
///
/// The endpoint answers an unknown study with an empty body or an HTML
/// page; both, and a table without runs, are reported as `NoRunInfo`.
pub fn parse_run_table(study: &StudyAccession, body: &str) -> Result<Vec<RunInfo>, GeoHcaError> {
    let trimmed = body.trim_start();
    if trimmed.is_empty() || trimmed.starts_with('<') || !trimmed.starts_with("Run") {
        return Err(GeoHcaError::NoRunInfo(study.to_string()));
    }

    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(trimmed.as_bytes());

    let headers = reader
        .headers()
        .map_err(|err| GeoHcaError::RunInfoParse(err.to_string()))?
        .clone();

    let mut runs = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|err| GeoHcaError::RunInfoParse(err.to_string()))?;
        let first = record.get(0).unwrap_or("");
        // The table repeats its header between result pages.
        if first.is_empty() || first == "Run" {
            continue;
        }
        let run: RunInfo = record
            .deserialize(Some(&headers))
            .map_err(|err| GeoHcaError::RunInfoParse(err.to_string()))?;
        runs.push(run);
    }

    if runs.is_empty() {
        return Err(GeoHcaError::NoRunInfo(study.to_string()));
    }
    Ok(runs)
}

pub fn distinct<'a, F>(runs: &'a [RunInfo], field: F) -> Vec<String>
where
    F: Fn(&'a RunInfo) -> &'a str,
{
    let mut out: Vec<String> = Vec::new();
    for run in runs {
        let value = field(run).trim();
        if !value.is_empty() && !out.iter().any(|seen| seen == value) {
            out.push(value.to_string());
        }
    }
    out
}
