use assert_matches::assert_matches;

use geo_to_hca::domain::{GeoAccession, StudyAccession};
use geo_to_hca::error::GeoHcaError;

#[test]
fn parse_geo_accession() {
    let acc: GeoAccession = "GSE123456".parse().unwrap();
    assert_eq!(acc.to_string(), "GSE123456");
}

#[test]
fn reject_sample_and_platform_accessions() {
    assert_matches!(
        "GSM2800001".parse::<GeoAccession>(),
        Err(GeoHcaError::InvalidGeoAccession(_))
    );
    assert_matches!(
        "GPL16791".parse::<GeoAccession>(),
        Err(GeoHcaError::InvalidGeoAccession(_))
    );
    assert_matches!(
        "GSE".parse::<GeoAccession>(),
        Err(GeoHcaError::InvalidGeoAccession(_))
    );
}

#[test]
fn parse_study_accessions_from_all_archives() {
    for value in ["SRP100001", "ERP012345", "drp000001"] {
        let study: StudyAccession = value.parse().unwrap();
        assert_eq!(study.as_str(), value.to_uppercase());
    }
}

#[test]
fn reject_run_accession_as_study() {
    assert_matches!(
        "SRR6000001".parse::<StudyAccession>(),
        Err(GeoHcaError::InvalidStudyAccession(_))
    );
}
