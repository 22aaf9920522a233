use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

use crate::convert::{ConversionInput, build_workbook};
use crate::domain::{GeoAccession, StudyAccession};
use crate::error::GeoHcaError;
use crate::eutils::EutilsClient;
use crate::geo::{GeoClient, SoftSeries, parse_soft};
use crate::hca::TabKind;
use crate::providers::bioproject::BioProjectRecord;
use crate::providers::pubmed::PubmedRecord;
use crate::runinfo::{self, RunInfo};
use crate::workbook::write_workbook;

#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub output_dir: Utf8PathBuf,
    pub dry_run: bool,
    pub use_soft: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    pub items: Vec<ConvertResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConvertResult {
    pub accession: String,
    pub study_accessions: Vec<String>,
    pub bioproject: Option<String>,
    pub pubmed_id: Option<String>,
    pub runs: usize,
    pub experiments: usize,
    pub biosamples: usize,
    pub tabs: Vec<TabSummary>,
    pub warnings: Vec<String>,
    pub output_path: Option<String>,
    pub generated_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TabSummary {
    pub name: String,
    pub rows: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct LookupResult {
    pub accession: String,
    pub studies: Vec<StudySummary>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudySummary {
    pub accession: String,
    pub runs: usize,
    pub experiments: usize,
    pub biosamples: usize,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

pub struct App<E: EutilsClient, G: GeoClient> {
    eutils: E,
    geo: G,
}

impl<E: EutilsClient, G: GeoClient> App<E, G> {
    pub fn new(eutils: E, geo: G) -> Self {
        Self { eutils, geo }
    }

    pub fn eutils(&self) -> &E {
        &self.eutils
    }

    /// Converts each accession into its own workbook. Accessions are not
    /// merged even when they belong to the same publication.
    pub fn convert_all(
        &self,
        accessions: &[GeoAccession],
        options: &ConvertOptions,
        sink: &dyn ProgressSink,
    ) -> Result<BatchResult, GeoHcaError> {
        if accessions.is_empty() {
            return Err(GeoHcaError::NoAccessions);
        }
        let mut items = Vec::new();
        for accession in accessions {
            items.push(self.convert(accession, options, sink)?);
        }
        Ok(BatchResult { items })
    }

    pub fn convert(
        &self,
        accession: &GeoAccession,
        options: &ConvertOptions,
        sink: &dyn ProgressSink,
    ) -> Result<ConvertResult, GeoHcaError> {
        let started = Instant::now();
        let mut warnings = Vec::new();

        let soft = if options.use_soft {
            self.load_soft(accession, sink, &mut warnings)
        } else {
            None
        };

        let studies = self.resolve_studies(accession, soft.as_ref(), sink, &mut warnings)?;
        let runs = self.load_runs(accession, &studies, sink, &mut warnings)?;

        let experiment_ids = runinfo::distinct(&runs, |run| run.experiment.as_str());
        emit(
            sink,
            format!("phase=Fetch; {} experiment(s)", experiment_ids.len()),
            None,
        );
        let experiments = self.eutils.fetch_experiments(&experiment_ids)?;

        let biosample_ids = runinfo::distinct(&runs, |run| run.biosample.as_str());
        emit(
            sink,
            format!("phase=Fetch; {} biosample(s)", biosample_ids.len()),
            None,
        );
        let biosamples = self.eutils.fetch_biosamples(&biosample_ids)?;

        let bioproject = self.load_bioproject(&runs, soft.as_ref(), sink, &mut warnings);
        let pubmed_id = select_pubmed_id(bioproject.as_ref(), soft.as_ref(), &runs);
        let publication = match &pubmed_id {
            Some(pmid) => self.load_pubmed(pmid, sink, &mut warnings),
            None => {
                tracing::info!(accession = %accession, "no PubMed id linked to series");
                None
            }
        };

        emit(sink, "phase=Convert; building HCA tabs".to_string(), None);
        let conversion = build_workbook(&ConversionInput {
            accession,
            studies: &studies,
            runs: &runs,
            experiments: &experiments,
            biosamples: &biosamples,
            bioproject: bioproject.as_ref(),
            publication: publication.as_ref(),
            soft: soft.as_ref(),
        });
        warnings.extend(conversion.warnings);

        let output_path = if options.dry_run {
            None
        } else {
            let path = output_path(&options.output_dir, accession);
            emit(sink, format!("phase=Write; {path}"), None);
            write_workbook(&path, &conversion.workbook)?;
            Some(path.to_string())
        };

        emit(
            sink,
            format!("phase=Done; {accession}"),
            Some(started.elapsed()),
        );

        Ok(ConvertResult {
            accession: accession.to_string(),
            study_accessions: studies.iter().map(|study| study.to_string()).collect(),
            bioproject: bioproject.and_then(|project| project.accession),
            pubmed_id,
            runs: runs.len(),
            experiments: experiments.len(),
            biosamples: biosamples.len(),
            tabs: TabKind::ALL
                .iter()
                .map(|kind| TabSummary {
                    name: kind.sheet_name().to_string(),
                    rows: conversion.workbook.tab(*kind).rows.len(),
                })
                .collect(),
            warnings,
            output_path,
            generated_at: chrono::Utc::now().to_rfc3339(),
        })
    }

    /// Resolves study accessions and their run tables without writing
    /// anything.
    pub fn lookup(
        &self,
        accession: &GeoAccession,
        sink: &dyn ProgressSink,
    ) -> Result<LookupResult, GeoHcaError> {
        let mut warnings = Vec::new();
        emit(sink, format!("phase=Resolve; SRA study for {accession}"), None);
        let found = self.eutils.srp_accessions(accession);
        // The SOFT file is only downloaded when E-utilities has no answer.
        let soft = match &found {
            Ok(studies) if !studies.is_empty() => None,
            _ => self.load_soft(accession, sink, &mut warnings),
        };
        let studies = choose_studies(accession, found, soft.as_ref(), &mut warnings)?;
        let mut summaries = Vec::new();
        for study in studies {
            emit(sink, format!("phase=Fetch; run table {study}"), None);
            let summary = match self.eutils.run_info(&study) {
                Ok(runs) => StudySummary {
                    accession: study.to_string(),
                    runs: runs.len(),
                    experiments: runinfo::distinct(&runs, |run| run.experiment.as_str()).len(),
                    biosamples: runinfo::distinct(&runs, |run| run.biosample.as_str()).len(),
                },
                Err(GeoHcaError::NoRunInfo(_)) => StudySummary {
                    accession: study.to_string(),
                    runs: 0,
                    experiments: 0,
                    biosamples: 0,
                },
                Err(err) => return Err(err),
            };
            summaries.push(summary);
        }
        Ok(LookupResult {
            accession: accession.to_string(),
            studies: summaries,
            warnings,
        })
    }

    fn load_soft(
        &self,
        accession: &GeoAccession,
        sink: &dyn ProgressSink,
        warnings: &mut Vec<String>,
    ) -> Option<SoftSeries> {
        emit(sink, format!("phase=Resolve; GEO SOFT {accession}"), None);
        match self.geo.fetch_soft_text(accession) {
            Ok(text) => Some(parse_soft(&text)),
            Err(err) => {
                tracing::warn!(accession = %accession, error = %err, "GEO SOFT file unavailable");
                warnings.push(format!("GEO SOFT file unavailable: {err}"));
                None
            }
        }
    }

    fn resolve_studies(
        &self,
        accession: &GeoAccession,
        soft: Option<&SoftSeries>,
        sink: &dyn ProgressSink,
        warnings: &mut Vec<String>,
    ) -> Result<Vec<StudyAccession>, GeoHcaError> {
        emit(sink, format!("phase=Resolve; SRA study for {accession}"), None);
        let found = self.eutils.srp_accessions(accession);
        choose_studies(accession, found, soft, warnings)
    }

    fn load_runs(
        &self,
        accession: &GeoAccession,
        studies: &[StudyAccession],
        sink: &dyn ProgressSink,
        warnings: &mut Vec<String>,
    ) -> Result<Vec<RunInfo>, GeoHcaError> {
        let mut runs = Vec::new();
        for study in studies {
            emit(sink, format!("phase=Fetch; run table {study}"), None);
            match self.eutils.run_info(study) {
                Ok(found) => runs.extend(found),
                Err(GeoHcaError::NoRunInfo(_)) if studies.len() > 1 => {
                    tracing::warn!(study = %study, "empty SRA run table");
                    warnings.push(format!("no runs found in SRA run table for {study}"));
                }
                Err(err) => return Err(err),
            }
        }
        if runs.is_empty() {
            return Err(GeoHcaError::NoRunInfo(accession.to_string()));
        }
        Ok(runs)
    }

    fn load_bioproject(
        &self,
        runs: &[RunInfo],
        soft: Option<&SoftSeries>,
        sink: &dyn ProgressSink,
        warnings: &mut Vec<String>,
    ) -> Option<BioProjectRecord> {
        let accession = runinfo::distinct(runs, |run| run.bioproject.as_str())
            .into_iter()
            .next()
            .or_else(|| soft.and_then(|series| series.bioproject.clone()))?;
        emit(sink, format!("phase=Fetch; BioProject {accession}"), None);
        match self.eutils.fetch_bioproject(&accession) {
            Ok(Some(mut record)) => {
                if record.accession.is_none() {
                    record.accession = Some(accession);
                }
                Some(record)
            }
            Ok(None) => {
                warnings.push(format!("BioProject {accession} returned no record"));
                None
            }
            Err(err) => {
                tracing::warn!(bioproject = %accession, error = %err, "BioProject lookup failed");
                warnings.push(format!("BioProject {accession} lookup failed: {err}"));
                None
            }
        }
    }

    fn load_pubmed(
        &self,
        pmid: &str,
        sink: &dyn ProgressSink,
        warnings: &mut Vec<String>,
    ) -> Option<PubmedRecord> {
        emit(sink, format!("phase=Fetch; PubMed {pmid}"), None);
        match self.eutils.fetch_pubmed(pmid) {
            Ok(Some(record)) => Some(record),
            Ok(None) => {
                warnings.push(format!("PubMed {pmid} returned no record"));
                None
            }
            Err(err) => {
                tracing::warn!(pmid, error = %err, "PubMed lookup failed");
                warnings.push(format!("PubMed {pmid} lookup failed: {err}"));
                None
            }
        }
    }
}

/// Keeps the E-utilities answer when it names a study, otherwise falls back
/// to the SOFT `SRA:` relation.
fn choose_studies(
    accession: &GeoAccession,
    found: Result<Vec<StudyAccession>, GeoHcaError>,
    soft: Option<&SoftSeries>,
    warnings: &mut Vec<String>,
) -> Result<Vec<StudyAccession>, GeoHcaError> {
    let fallback = soft
        .map(|series| series.study_accessions.clone())
        .unwrap_or_default();

    let studies = match found {
        Ok(studies) if !studies.is_empty() => studies,
        Ok(_) => fallback,
        Err(err) if !fallback.is_empty() => {
            tracing::warn!(error = %err, "using SRA relation from GEO SOFT file");
            warnings.push(err.to_string());
            fallback
        }
        Err(err) => return Err(err),
    };

    if studies.is_empty() {
        return Err(GeoHcaError::NoStudyAccession(accession.to_string()));
    }
    tracing::info!(
        accession = %accession,
        studies = ?studies.iter().map(|s| s.as_str()).collect::<Vec<_>>(),
        "resolved SRA studies"
    );
    Ok(studies)
}

pub fn output_path(output_dir: &Utf8Path, accession: &GeoAccession) -> Utf8PathBuf {
    output_dir.join(format!("{}_hca_metadata.xlsx", accession.as_str()))
}

/// BioProject publications first, then the series' own PubMed ids, then
/// the run table's study PubMed column.
pub fn select_pubmed_id(
    bioproject: Option<&BioProjectRecord>,
    soft: Option<&SoftSeries>,
    runs: &[RunInfo],
) -> Option<String> {
    let from_runs = runinfo::distinct(runs, |run| run.study_pubmed_id.as_str());
    bioproject
        .map(|project| project.publication_ids.clone())
        .unwrap_or_default()
        .into_iter()
        .chain(soft.map(|series| series.pubmed_ids.clone()).unwrap_or_default())
        .chain(from_runs)
        .find(|id| is_pubmed_id(id))
}

fn is_pubmed_id(value: &str) -> bool {
    !value.is_empty()
        && value.chars().all(|ch| ch.is_ascii_digit())
        && !value.trim_start_matches('0').is_empty()
}

fn emit(sink: &dyn ProgressSink, message: String, elapsed: Option<Duration>) {
    tracing::debug!("{message}");
    sink.event(ProgressEvent { message, elapsed });
}
