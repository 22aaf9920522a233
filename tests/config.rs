use std::fs;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use geo_to_hca::config::{Config, ConfigLoader, DEFAULT_BATCH_SIZE, EutilsEntry};
use geo_to_hca::error::GeoHcaError;

#[test]
fn resolve_config_file() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("geo-to-hca.json");
    fs::write(
        &path,
        r#"{
            "schema_version": 1,
            "accessions": ["GSE123456", "gse654321"],
            "output_dir": "spreadsheets",
            "eutils": { "request_delay_ms": 120, "batch_size": 50 }
        }"#,
    )
    .unwrap();

    let resolved = ConfigLoader::resolve(path.to_str(), true).unwrap();
    assert_eq!(resolved.schema_version, 1);
    assert_eq!(
        resolved
            .accessions
            .iter()
            .map(|acc| acc.as_str())
            .collect::<Vec<_>>(),
        vec!["GSE123456", "GSE654321"]
    );
    assert_eq!(resolved.output_dir, Utf8PathBuf::from("spreadsheets"));
    assert_eq!(resolved.eutils.request_delay_ms, 120);
    assert_eq!(resolved.eutils.batch_size, 50);
    assert_eq!(resolved.eutils.max_retries, 3);
}

#[test]
fn explicit_missing_path_is_read_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("absent.json");
    let err = ConfigLoader::resolve(path.to_str(), false).unwrap_err();
    assert_matches!(err, GeoHcaError::ConfigRead(_));
}

#[test]
fn malformed_config_is_parse_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("geo-to-hca.json");
    fs::write(&path, r#"{ "accessions": "GSE1" }"#).unwrap();
    let err = ConfigLoader::resolve(path.to_str(), true).unwrap_err();
    assert_matches!(err, GeoHcaError::ConfigParse(_));
}

#[test]
fn invalid_accession_in_config() {
    let config = Config {
        accessions: vec!["SRP100001".to_string()],
        ..Config::default()
    };
    let err = ConfigLoader::resolve_config(config, None).unwrap_err();
    assert_matches!(err, GeoHcaError::InvalidGeoAccession(value) if value == "SRP100001");
}

#[test]
fn environment_key_and_batch_floor() {
    let config = Config {
        eutils: Some(EutilsEntry {
            api_key: Some("  ".to_string()),
            batch_size: Some(0),
            ..EutilsEntry::default()
        }),
        ..Config::default()
    };
    let resolved = ConfigLoader::resolve_config(config, Some("env-key".to_string())).unwrap();
    assert_eq!(resolved.eutils.api_key.as_deref(), Some("env-key"));
    assert_eq!(resolved.eutils.batch_size, 1);

    let defaults = ConfigLoader::resolve_config(Config::default(), None).unwrap();
    assert_eq!(defaults.eutils.batch_size, DEFAULT_BATCH_SIZE);
    assert_eq!(defaults.eutils.api_key, None);
}
