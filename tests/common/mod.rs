#![allow(dead_code)]

use geo_to_hca::domain::{GeoAccession, StudyAccession};
use geo_to_hca::geo::{SoftSeries, parse_soft};
use geo_to_hca::providers::bioproject::{BioProjectRecord, parse_bioproject};
use geo_to_hca::providers::biosample::{BioSampleRecord, parse_biosamples};
use geo_to_hca::providers::pubmed::{PubmedRecord, parse_pubmed};
use geo_to_hca::providers::sra::{ExperimentPackage, parse_experiment_packages};
use geo_to_hca::runinfo::{RunInfo, parse_run_table};

pub const RUNINFO: &str = include_str!("../fixtures/runinfo.csv");
pub const EXPERIMENTS: &str = include_str!("../fixtures/experiment_package.xml");
pub const BIOSAMPLES: &str = include_str!("../fixtures/biosample.xml");
pub const BIOPROJECT: &str = include_str!("../fixtures/bioproject.xml");
pub const PUBMED: &str = include_str!("../fixtures/pubmed.xml");
pub const SOFT: &str = include_str!("../fixtures/GSE123456_family.soft");

/// Parsed records for the two-donor kidney series in `tests/fixtures`.
pub struct KidneySeries {
    pub accession: GeoAccession,
    pub studies: Vec<StudyAccession>,
    pub runs: Vec<RunInfo>,
    pub experiments: Vec<ExperimentPackage>,
    pub biosamples: Vec<BioSampleRecord>,
    pub bioproject: BioProjectRecord,
    pub publication: PubmedRecord,
    pub soft: SoftSeries,
}

pub fn study() -> StudyAccession {
    "SRP100001".parse().unwrap()
}

pub fn kidney_series() -> KidneySeries {
    KidneySeries {
        accession: "GSE123456".parse().unwrap(),
        studies: vec![study()],
        runs: parse_run_table(&study(), RUNINFO).unwrap(),
        experiments: parse_experiment_packages(EXPERIMENTS).unwrap(),
        biosamples: parse_biosamples(BIOSAMPLES).unwrap(),
        bioproject: parse_bioproject(BIOPROJECT).unwrap().unwrap(),
        publication: parse_pubmed(PUBMED).unwrap().unwrap(),
        soft: parse_soft(SOFT),
    }
}
