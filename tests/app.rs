mod common;

use std::sync::Mutex;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use geo_to_hca::app::{App, ConvertOptions, ProgressEvent, ProgressSink};
use geo_to_hca::domain::{GeoAccession, StudyAccession};
use geo_to_hca::error::GeoHcaError;
use geo_to_hca::eutils::EutilsClient;
use geo_to_hca::geo::GeoClient;
use geo_to_hca::output::JsonOutput;
use geo_to_hca::providers::bioproject::{BioProjectRecord, parse_bioproject};
use geo_to_hca::providers::biosample::{BioSampleRecord, parse_biosamples};
use geo_to_hca::providers::pubmed::{PubmedRecord, parse_pubmed};
use geo_to_hca::providers::sra::{ExperimentPackage, parse_experiment_packages};
use geo_to_hca::runinfo::{RunInfo, parse_run_table};

#[derive(Default)]
struct MockEutils {
    studies: Vec<&'static str>,
    lookup_fails: bool,
    supplementary_fails: bool,
    calls: Mutex<Vec<String>>,
}

impl MockEutils {
    fn kidney() -> Self {
        Self {
            studies: vec!["SRP100001"],
            ..Self::default()
        }
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl EutilsClient for MockEutils {
    fn srp_accessions(
        &self,
        accession: &GeoAccession,
    ) -> Result<Vec<StudyAccession>, GeoHcaError> {
        self.record(format!("srp {accession}"));
        if self.lookup_fails {
            return Err(GeoHcaError::StudyLookup {
                accession: accession.to_string(),
                message: "NCBI returned status 502".to_string(),
            });
        }
        Ok(self
            .studies
            .iter()
            .map(|study| study.parse().unwrap())
            .collect())
    }

    fn run_info(&self, study: &StudyAccession) -> Result<Vec<RunInfo>, GeoHcaError> {
        self.record(format!("runinfo {study}"));
        parse_run_table(study, common::RUNINFO)
    }

    fn fetch_experiments(
        &self,
        accessions: &[String],
    ) -> Result<Vec<ExperimentPackage>, GeoHcaError> {
        self.record(format!("sra {}", accessions.join(",")));
        parse_experiment_packages(common::EXPERIMENTS)
    }

    fn fetch_biosamples(
        &self,
        accessions: &[String],
    ) -> Result<Vec<BioSampleRecord>, GeoHcaError> {
        self.record(format!("biosample {}", accessions.join(",")));
        parse_biosamples(common::BIOSAMPLES)
    }

    fn fetch_bioproject(&self, accession: &str) -> Result<Option<BioProjectRecord>, GeoHcaError> {
        self.record(format!("bioproject {accession}"));
        if self.supplementary_fails {
            return Err(GeoHcaError::NcbiStatus {
                status: 500,
                message: "internal error".to_string(),
            });
        }
        parse_bioproject(common::BIOPROJECT)
    }

    fn fetch_pubmed(&self, pmid: &str) -> Result<Option<PubmedRecord>, GeoHcaError> {
        self.record(format!("pubmed {pmid}"));
        if self.supplementary_fails {
            return Err(GeoHcaError::NcbiHttp("connection reset".to_string()));
        }
        parse_pubmed(common::PUBMED)
    }
}

struct MockGeo {
    soft: Option<&'static str>,
}

impl GeoClient for MockGeo {
    fn fetch_soft_text(&self, _accession: &GeoAccession) -> Result<String, GeoHcaError> {
        match self.soft {
            Some(text) => Ok(text.to_string()),
            None => Err(GeoHcaError::GeoStatus {
                status: 404,
                message: "not found".to_string(),
            }),
        }
    }
}

#[derive(Default)]
struct RecordingSink {
    messages: Mutex<Vec<String>>,
}

impl ProgressSink for RecordingSink {
    fn event(&self, event: ProgressEvent) {
        self.messages.lock().unwrap().push(event.message);
    }
}

fn accession() -> GeoAccession {
    "GSE123456".parse().unwrap()
}

fn options(output_dir: Utf8PathBuf, dry_run: bool) -> ConvertOptions {
    ConvertOptions {
        output_dir,
        dry_run,
        use_soft: true,
    }
}

#[test]
fn convert_writes_workbook() {
    let temp = tempfile::tempdir().unwrap();
    let output_dir = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    let app = App::new(
        MockEutils::kidney(),
        MockGeo {
            soft: Some(common::SOFT),
        },
    );
    let sink = RecordingSink::default();

    let result = app
        .convert(&accession(), &options(output_dir.clone(), false), &sink)
        .unwrap();

    assert_eq!(result.accession, "GSE123456");
    assert_eq!(result.study_accessions, vec!["SRP100001"]);
    assert_eq!(result.bioproject.as_deref(), Some("PRJNA400001"));
    assert_eq!(result.pubmed_id.as_deref(), Some("29999999"));
    assert_eq!(result.runs, 3);
    assert_eq!(result.experiments, 2);
    assert_eq!(result.biosamples, 2);

    let sequence_files = result
        .tabs
        .iter()
        .find(|tab| tab.name == "Sequence file")
        .unwrap();
    assert_eq!(sequence_files.rows, 5);

    let expected = output_dir.join("GSE123456_hca_metadata.xlsx");
    assert_eq!(result.output_path.as_deref(), Some(expected.as_str()));
    assert!(expected.exists());

    let messages = sink.messages.lock().unwrap();
    assert!(messages.iter().any(|message| message.starts_with("phase=Write")));
    assert!(messages.last().unwrap().starts_with("phase=Done"));
}

#[test]
fn convert_fetches_each_record_set_once() {
    let app = App::new(MockEutils::kidney(), MockGeo { soft: None });
    app.convert(&accession(), &options(Utf8PathBuf::from("unused"), true), &JsonOutput)
        .unwrap();

    let calls = app.eutils().calls.lock().unwrap().clone();
    assert_eq!(
        calls,
        vec![
            "srp GSE123456".to_string(),
            "runinfo SRP100001".to_string(),
            "sra SRX3000001,SRX3000002".to_string(),
            "biosample SAMN07000001,SAMN07000002".to_string(),
            "bioproject PRJNA400001".to_string(),
            "pubmed 29999999".to_string(),
        ]
    );
}

#[test]
fn dry_run_writes_nothing() {
    let temp = tempfile::tempdir().unwrap();
    let output_dir = Utf8PathBuf::from_path_buf(temp.path().join("out")).unwrap();
    let app = App::new(MockEutils::kidney(), MockGeo { soft: None });

    let result = app
        .convert(&accession(), &options(output_dir.clone(), true), &JsonOutput)
        .unwrap();

    assert_eq!(result.output_path, None);
    assert!(!output_dir.exists());
    assert!(
        result
            .warnings
            .iter()
            .any(|warning| warning.starts_with("GEO SOFT file unavailable"))
    );
}

#[test]
fn soft_relation_used_when_esummary_has_no_study() {
    let app = App::new(
        MockEutils::default(),
        MockGeo {
            soft: Some(common::SOFT),
        },
    );
    let result = app
        .convert(&accession(), &options(Utf8PathBuf::from("unused"), true), &JsonOutput)
        .unwrap();
    assert_eq!(result.study_accessions, vec!["SRP100001"]);
}

#[test]
fn soft_relation_used_when_study_lookup_fails() {
    let eutils = MockEutils {
        lookup_fails: true,
        ..MockEutils::default()
    };
    let app = App::new(
        eutils,
        MockGeo {
            soft: Some(common::SOFT),
        },
    );
    let result = app
        .convert(&accession(), &options(Utf8PathBuf::from("unused"), true), &JsonOutput)
        .unwrap();
    assert_eq!(result.study_accessions, vec!["SRP100001"]);
    assert!(
        result
            .warnings
            .iter()
            .any(|warning| warning.starts_with("failed to get SRP accessions for GSE123456"))
    );
}

#[test]
fn missing_study_is_typed_error() {
    let app = App::new(MockEutils::default(), MockGeo { soft: None });
    let err = app
        .convert(&accession(), &options(Utf8PathBuf::from("unused"), true), &JsonOutput)
        .unwrap_err();
    assert_matches!(err, GeoHcaError::NoStudyAccession(acc) if acc == "GSE123456");
}

#[test]
fn study_lookup_failure_without_fallback_propagates() {
    let eutils = MockEutils {
        lookup_fails: true,
        ..MockEutils::default()
    };
    let app = App::new(eutils, MockGeo { soft: None });
    let err = app.lookup(&accession(), &JsonOutput).unwrap_err();
    assert_matches!(err, GeoHcaError::StudyLookup { .. });
}

#[test]
fn failed_supplementary_lookups_become_warnings() {
    let eutils = MockEutils {
        studies: vec!["SRP100001"],
        supplementary_fails: true,
        ..MockEutils::default()
    };
    let app = App::new(eutils, MockGeo { soft: None });

    let result = app
        .convert(&accession(), &options(Utf8PathBuf::from("unused"), true), &JsonOutput)
        .unwrap();

    assert_eq!(result.bioproject, None);
    // The run table still names the publication.
    assert_eq!(result.pubmed_id.as_deref(), Some("29999999"));
    assert!(
        result
            .warnings
            .iter()
            .any(|warning| warning.starts_with("BioProject PRJNA400001 lookup failed"))
    );
    assert!(
        result
            .warnings
            .iter()
            .any(|warning| warning.starts_with("PubMed 29999999 lookup failed"))
    );
    let contributors = result
        .tabs
        .iter()
        .find(|tab| tab.name == "Contributors")
        .unwrap();
    assert_eq!(contributors.rows, 0);
}

#[test]
fn convert_all_requires_accessions() {
    let app = App::new(MockEutils::kidney(), MockGeo { soft: None });
    let err = app
        .convert_all(&[], &options(Utf8PathBuf::from("unused"), true), &JsonOutput)
        .unwrap_err();
    assert_matches!(err, GeoHcaError::NoAccessions);
}

#[test]
fn lookup_summarises_studies() {
    let app = App::new(MockEutils::kidney(), MockGeo { soft: None });
    let result = app.lookup(&accession(), &JsonOutput).unwrap();

    assert_eq!(result.accession, "GSE123456");
    assert_eq!(result.studies.len(), 1);
    let study = &result.studies[0];
    assert_eq!(study.accession, "SRP100001");
    assert_eq!(study.runs, 3);
    assert_eq!(study.experiments, 2);
    assert_eq!(study.biosamples, 2);
}

#[test]
fn lookup_falls_back_to_soft_relation() {
    let app = App::new(
        MockEutils::default(),
        MockGeo {
            soft: Some(common::SOFT),
        },
    );
    let result = app.lookup(&accession(), &JsonOutput).unwrap();

    assert_eq!(result.studies.len(), 1);
    assert_eq!(result.studies[0].accession, "SRP100001");
    assert_eq!(result.studies[0].runs, 3);
}

#[test]
fn lookup_falls_back_when_study_lookup_fails() {
    let eutils = MockEutils {
        lookup_fails: true,
        ..MockEutils::default()
    };
    let app = App::new(
        eutils,
        MockGeo {
            soft: Some(common::SOFT),
        },
    );
    let result = app.lookup(&accession(), &JsonOutput).unwrap();

    assert_eq!(result.studies[0].accession, "SRP100001");
    assert!(
        result
            .warnings
            .iter()
            .any(|warning| warning.starts_with("failed to get SRP accessions for GSE123456"))
    );
}

#[test]
fn lookup_skips_soft_download_when_esummary_answers() {
    let app = App::new(
        MockEutils::kidney(),
        MockGeo {
            soft: Some(common::SOFT),
        },
    );
    let sink = RecordingSink::default();
    app.lookup(&accession(), &sink).unwrap();

    let messages = sink.messages.lock().unwrap();
    assert!(!messages.iter().any(|message| message.contains("GEO SOFT")));
}
