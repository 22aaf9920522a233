use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;

use crate::config::EutilsSettings;
use crate::domain::{GeoAccession, StudyAccession};
use crate::error::GeoHcaError;
use crate::providers::bioproject::{BioProjectRecord, parse_bioproject};
use crate::providers::biosample::{BioSampleRecord, parse_biosamples};
use crate::providers::pubmed::{PubmedRecord, parse_pubmed};
use crate::providers::sra::{ExperimentPackage, parse_experiment_packages};
use crate::runinfo::{RunInfo, parse_run_table};

pub const EUTILS_BASE: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";
pub const RUNINFO_URL: &str = "https://trace.ncbi.nlm.nih.gov/Traces/sra/sra.cgi";
const NOT_FOUND_STATUS: u16 = 400;

pub trait EutilsClient: Send + Sync {
    fn srp_accessions(&self, accession: &GeoAccession)
    -> Result<Vec<StudyAccession>, GeoHcaError>;
    fn run_info(&self, study: &StudyAccession) -> Result<Vec<RunInfo>, GeoHcaError>;
    fn fetch_experiments(
        &self,
        accessions: &[String],
    ) -> Result<Vec<ExperimentPackage>, GeoHcaError>;
    fn fetch_biosamples(&self, accessions: &[String])
    -> Result<Vec<BioSampleRecord>, GeoHcaError>;
    fn fetch_bioproject(&self, accession: &str) -> Result<Option<BioProjectRecord>, GeoHcaError>;
    fn fetch_pubmed(&self, pmid: &str) -> Result<Option<PubmedRecord>, GeoHcaError>;
}

pub struct EutilsHttpClient {
    client: Client,
    settings: EutilsSettings,
    eutils_base: String,
    runinfo_url: String,
    last_request: Mutex<Option<Instant>>,
}

impl EutilsHttpClient {
    pub fn new(settings: EutilsSettings) -> Result<Self, GeoHcaError> {
        Self::with_endpoints(settings, EUTILS_BASE, RUNINFO_URL)
    }

    /// Points the client at another E-utilities root and run table URL.
    pub fn with_endpoints(
        settings: EutilsSettings,
        eutils_base: &str,
        runinfo_url: &str,
    ) -> Result<Self, GeoHcaError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("geo-to-hca/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| GeoHcaError::NcbiHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| GeoHcaError::NcbiHttp(err.to_string()))?;
        Ok(Self {
            client,
            settings,
            eutils_base: eutils_base.trim_end_matches('/').to_string(),
            runinfo_url: runinfo_url.to_string(),
            last_request: Mutex::new(None),
        })
    }

    /// Keeps at least `request_delay_ms` between two requests; NCBI blocks
    /// clients that exceed its per-second quota.
    fn throttle(&self) {
        let delay = Duration::from_millis(self.settings.request_delay_ms);
        let mut last = self
            .last_request
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < delay {
                thread::sleep(delay - elapsed);
            }
        }
        *last = Some(Instant::now());
    }

    fn get(&self, url: &str, params: &[(&str, &str)]) -> RequestBuilder {
        let mut request = self.client.get(url).query(params);
        if let Some(key) = &self.settings.api_key {
            request = request.query(&[("api_key", key.as_str())]);
        }
        request
    }

    fn send_with_retries<F>(&self, mut make_req: F) -> Result<Response, GeoHcaError>
    where
        F: FnMut() -> RequestBuilder,
    {
        const BASE_DELAY_MS: u64 = 200;
        let max_retries = self.settings.max_retries;
        let mut attempt = 0usize;
        loop {
            self.throttle();
            let response = make_req().send();
            match response {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < max_retries && is_retryable_status(status) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        tracing::debug!(status, attempt, "retrying NCBI request");
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if attempt < max_retries && is_retryable_error(&err) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        tracing::debug!(error = %err, attempt, "retrying NCBI request");
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Err(GeoHcaError::NcbiHttp(err.to_string()));
                }
            }
        }
    }

    fn handle_status(response: Response) -> Result<Response, GeoHcaError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "NCBI request failed".to_string());
        Err(GeoHcaError::NcbiStatus { status, message })
    }

    fn get_json(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<Value, GeoHcaError> {
        let url = format!("{}/{endpoint}", self.eutils_base);
        let response = self.send_with_retries(|| self.get(&url, params))?;
        let response = Self::handle_status(response)?;
        response
            .json()
            .map_err(|err| GeoHcaError::NcbiHttp(err.to_string()))
    }

    fn efetch(
        &self,
        db: &str,
        ids: &[String],
        extra: &[(&str, &str)],
    ) -> Result<String, GeoHcaError> {
        let url = format!("{}/efetch.fcgi", self.eutils_base);
        let id_list = ids.join(",");
        let mut params = vec![("db", db), ("id", id_list.as_str())];
        params.extend_from_slice(extra);
        let response = self.send_with_retries(|| self.get(&url, &params))?;
        if response.status().as_u16() == NOT_FOUND_STATUS {
            return Err(GeoHcaError::NotFoundSra(ids.to_vec()));
        }
        let response = Self::handle_status(response)?;
        response
            .text()
            .map_err(|err| GeoHcaError::NcbiHttp(err.to_string()))
    }

    fn lookup_study_accessions(
        &self,
        accession: &GeoAccession,
    ) -> Result<Vec<StudyAccession>, GeoHcaError> {
        let search = self.get_json(
            "esearch.fcgi",
            &[("db", "gds"), ("retmode", "json"), ("term", accession.as_str())],
        )?;
        let ids = search_ids(&search);
        // Only the first summary carries the series' own relations.
        let Some(summary_id) = ids.first() else {
            return Ok(Vec::new());
        };
        let summary = self.get_json(
            "esummary.fcgi",
            &[("db", "gds"), ("retmode", "json"), ("id", summary_id.as_str())],
        )?;
        Ok(study_accessions_from_summary(&summary))
    }
}

impl EutilsClient for EutilsHttpClient {
    fn srp_accessions(
        &self,
        accession: &GeoAccession,
    ) -> Result<Vec<StudyAccession>, GeoHcaError> {
        self.lookup_study_accessions(accession)
            .map_err(|err| GeoHcaError::StudyLookup {
                accession: accession.to_string(),
                message: err.to_string(),
            })
    }

    fn run_info(&self, study: &StudyAccession) -> Result<Vec<RunInfo>, GeoHcaError> {
        let params = [
            ("save", "efetch"),
            ("db", "sra"),
            ("rettype", "runinfo"),
            ("term", study.as_str()),
        ];
        let response = self.send_with_retries(|| self.get(&self.runinfo_url, &params))?;
        let response = Self::handle_status(response)?;
        let body = response
            .text()
            .map_err(|err| GeoHcaError::NcbiHttp(err.to_string()))?;
        parse_run_table(study, &body)
    }

    fn fetch_experiments(
        &self,
        accessions: &[String],
    ) -> Result<Vec<ExperimentPackage>, GeoHcaError> {
        let mut packages = Vec::new();
        for batch in accessions.chunks(self.settings.batch_size.max(1)) {
            let document = self.efetch("sra", batch, &[])?;
            packages.extend(parse_experiment_packages(&document)?);
        }
        Ok(packages)
    }

    fn fetch_biosamples(
        &self,
        accessions: &[String],
    ) -> Result<Vec<BioSampleRecord>, GeoHcaError> {
        let mut records = Vec::new();
        for batch in accessions.chunks(self.settings.batch_size.max(1)) {
            let document = self.efetch("biosample", batch, &[])?;
            records.extend(parse_biosamples(&document)?);
        }
        Ok(records)
    }

    fn fetch_bioproject(&self, accession: &str) -> Result<Option<BioProjectRecord>, GeoHcaError> {
        let document = self.efetch("bioproject", &[accession.to_string()], &[])?;
        parse_bioproject(&document)
    }

    fn fetch_pubmed(&self, pmid: &str) -> Result<Option<PubmedRecord>, GeoHcaError> {
        let document = self.efetch("pubmed", &[pmid.to_string()], &[("rettype", "xml")])?;
        parse_pubmed(&document)
    }
}

pub fn search_ids(payload: &Value) -> Vec<String> {
    payload["esearchresult"]["idlist"]
        .as_array()
        .map(|list| {
            list.iter()
                .filter_map(|v| v.as_str().map(|s| s.to_string()))
                .collect()
        })
        .unwrap_or_default()
}

/// Collects the `SRP…` targets of every `extrelations` entry in an esummary
/// payload, in document order and without duplicates.
pub fn study_accessions_from_summary(payload: &Value) -> Vec<StudyAccession> {
    let mut out: Vec<StudyAccession> = Vec::new();
    let Some(result) = payload["result"].as_object() else {
        return out;
    };
    for entry in result.values().filter(|value| value.is_object()) {
        let Some(relations) = entry["extrelations"].as_array() else {
            continue;
        };
        for relation in relations {
            let target = relation["targetobject"].as_str().unwrap_or("");
            if !target.contains("SRP") {
                continue;
            }
            if let Ok(study) = target.parse::<StudyAccession>() {
                if !out.contains(&study) {
                    out.push(study);
                }
            }
        }
    }
    out
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}
