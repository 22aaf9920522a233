use std::io::Read;
use std::time::Duration;

use flate2::read::GzDecoder;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Serialize;

use crate::domain::{GeoAccession, StudyAccession};
use crate::error::GeoHcaError;

pub trait GeoClient: Send + Sync {
    fn fetch_soft_text(&self, accession: &GeoAccession) -> Result<String, GeoHcaError>;
}

#[derive(Clone)]
pub struct GeoHttpClient {
    client: Client,
}

impl GeoHttpClient {
    pub fn new() -> Result<Self, GeoHcaError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("geo-to-hca/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| GeoHcaError::GeoHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| GeoHcaError::GeoHttp(err.to_string()))?;
        Ok(Self { client })
    }

    fn soft_url(accession: &GeoAccession) -> String {
        let prefix = geo_series_prefix(accession);
        format!(
            "https://ftp.ncbi.nlm.nih.gov/geo/series/{prefix}/{acc}/soft/{acc}_family.soft.gz",
            acc = accession.as_str()
        )
    }
}

impl GeoClient for GeoHttpClient {
    fn fetch_soft_text(&self, accession: &GeoAccession) -> Result<String, GeoHcaError> {
        let url = Self::soft_url(accession);
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| GeoHcaError::GeoHttp(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "GEO request failed".to_string());
            return Err(GeoHcaError::GeoStatus { status, message });
        }
        let bytes = response
            .bytes()
            .map_err(|err| GeoHcaError::GeoHttp(err.to_string()))?;
        let mut decoder = GzDecoder::new(bytes.as_ref());
        let mut text = String::new();
        decoder
            .read_to_string(&mut text)
            .map_err(|err| GeoHcaError::GeoHttp(err.to_string()))?;
        Ok(text)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SoftSample {
    pub accession: String,
    pub title: Option<String>,
    pub organism: Option<String>,
    pub taxon_id: Option<String>,
    pub characteristics: Vec<(String, String)>,
    pub biosample: Option<String>,
    pub experiment: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SoftSeries {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub overall_design: Option<String>,
    pub pubmed_ids: Vec<String>,
    /// `First,Middle,Last` names as GEO stores them.
    pub contributors: Vec<String>,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    pub contact_institute: Option<String>,
    pub bioproject: Option<String>,
    pub study_accessions: Vec<StudyAccession>,
    pub samples: Vec<SoftSample>,
}

impl SoftSeries {
    pub fn sample_for_biosample(&self, biosample: &str) -> Option<&SoftSample> {
        self.samples
            .iter()
            .find(|sample| sample.biosample.as_deref() == Some(biosample))
    }
}

/// Parses the series block and the sample blocks of a SOFT family file.
pub fn parse_soft(soft_text: &str) -> SoftSeries {
    let mut series = SoftSeries::default();
    let mut current: Option<SoftSample> = None;
    let mut in_series = false;

    for line in soft_text.lines() {
        if let Some(rest) = line.strip_prefix('^') {
            if let Some(sample) = current.take() {
                series.samples.push(sample);
            }
            let (kind, value) = split_entry(rest);
            in_series = kind.eq_ignore_ascii_case("SERIES");
            if kind.eq_ignore_ascii_case("SAMPLE") {
                current = Some(SoftSample {
                    accession: value.to_string(),
                    ..SoftSample::default()
                });
            }
            continue;
        }

        let Some(rest) = line.strip_prefix('!') else {
            continue;
        };
        let (key, value) = split_entry(rest);
        if value.is_empty() {
            continue;
        }

        if let Some(sample) = current.as_mut() {
            apply_sample_entry(sample, key, value);
        } else if in_series {
            apply_series_entry(&mut series, key, value);
        }
    }
    if let Some(sample) = current.take() {
        series.samples.push(sample);
    }
    series
}

fn apply_series_entry(series: &mut SoftSeries, key: &str, value: &str) {
    match key {
        "Series_title" => series.title = Some(value.to_string()),
        "Series_summary" => append_paragraph(&mut series.summary, value),
        "Series_overall_design" => append_paragraph(&mut series.overall_design, value),
        "Series_pubmed_id" => push_unique(&mut series.pubmed_ids, value),
        "Series_contributor" => push_unique(&mut series.contributors, value),
        "Series_contact_name" => series.contact_name = Some(value.to_string()),
        "Series_contact_email" => series.contact_email = Some(value.to_string()),
        "Series_contact_institute" => series.contact_institute = Some(value.to_string()),
        "Series_relation" => {
            if let Some(url) = value.strip_prefix("BioProject:") {
                series.bioproject = url.trim().rsplit('/').next().map(|acc| acc.to_string());
            } else if let Some(url) = value.strip_prefix("SRA:") {
                if let Some(study) = term_of(url).and_then(|term| term.parse().ok()) {
                    if !series.study_accessions.contains(&study) {
                        series.study_accessions.push(study);
                    }
                }
            }
        }
        _ => {}
    }
}

fn apply_sample_entry(sample: &mut SoftSample, key: &str, value: &str) {
    match key {
        "Sample_title" => sample.title = Some(value.to_string()),
        "Sample_organism_ch1" => sample.organism = Some(value.to_string()),
        "Sample_taxid_ch1" => sample.taxon_id = Some(value.to_string()),
        "Sample_characteristics_ch1" => {
            if let Some((name, val)) = value.split_once(':') {
                sample
                    .characteristics
                    .push((name.trim().to_string(), val.trim().to_string()));
            }
        }
        "Sample_relation" => {
            if let Some(url) = value.strip_prefix("BioSample:") {
                sample.biosample = url.trim().rsplit('/').next().map(|acc| acc.to_string());
            } else if let Some(url) = value.strip_prefix("SRA:") {
                sample.experiment = term_of(url).map(|term| term.to_string());
            }
        }
        _ => {}
    }
}

fn split_entry(line: &str) -> (&str, &str) {
    match line.split_once('=') {
        Some((key, value)) => (key.trim(), value.trim()),
        None => (line.trim(), ""),
    }
}

fn term_of(url: &str) -> Option<&str> {
    url.split_once("term=")
        .map(|(_, term)| term.split('&').next().unwrap_or(term).trim())
        .filter(|term| !term.is_empty())
}

fn append_paragraph(target: &mut Option<String>, value: &str) {
    match target {
        Some(existing) => {
            existing.push(' ');
            existing.push_str(value);
        }
        None => *target = Some(value.to_string()),
    }
}

fn push_unique(target: &mut Vec<String>, value: &str) {
    if !target.iter().any(|existing| existing == value) {
        target.push(value.to_string());
    }
}

pub fn geo_series_prefix(accession: &GeoAccession) -> String {
    let digits = accession.as_str().trim_start_matches("GSE");
    if digits.len() <= 3 {
        return "GSEnnn".to_string();
    }
    let head = &digits[..digits.len() - 3];
    format!("GSE{}nnn", head)
}
