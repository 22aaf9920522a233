mod common;

use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use assert_matches::assert_matches;

use geo_to_hca::config::EutilsSettings;
use geo_to_hca::error::GeoHcaError;
use geo_to_hca::eutils::{
    EutilsClient, EutilsHttpClient, search_ids, study_accessions_from_summary,
};

type Requests = Arc<Mutex<Vec<String>>>;

/// Answers one scripted response per connection and records each request
/// line.
fn serve(responses: Vec<(u16, &'static str)>) -> (String, Requests) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let requests: Requests = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&requests);
    thread::spawn(move || {
        for (status, body) in responses {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            loop {
                let mut header = String::new();
                let read = reader.read_line(&mut header).unwrap();
                if read == 0 || header == "\r\n" {
                    break;
                }
            }
            seen.lock().unwrap().push(request_line.trim().to_string());
            write!(
                stream,
                "HTTP/1.1 {status} Scripted\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            )
            .unwrap();
            stream.flush().unwrap();
        }
    });
    (base, requests)
}

fn client(base: &str, settings: EutilsSettings) -> EutilsHttpClient {
    EutilsHttpClient::with_endpoints(settings, base, &format!("{base}/runinfo")).unwrap()
}

fn quick_settings() -> EutilsSettings {
    EutilsSettings {
        request_delay_ms: 0,
        ..EutilsSettings::default()
    }
}

fn ids(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

#[test]
fn search_ids_from_esearch() {
    let payload = serde_json::json!({
        "esearchresult": { "count": "2", "idlist": ["200123456", "300123456"] }
    });
    assert_eq!(search_ids(&payload), vec!["200123456", "300123456"]);
    assert!(search_ids(&serde_json::json!({ "esearchresult": {} })).is_empty());
}

#[test]
fn study_accessions_from_gds_summary() {
    let payload: serde_json::Value =
        serde_json::from_str(include_str!("fixtures/esummary_gds.json")).unwrap();
    let studies = study_accessions_from_summary(&payload);
    assert_eq!(
        studies.iter().map(|study| study.as_str()).collect::<Vec<_>>(),
        vec!["SRP100001"]
    );
}

#[test]
fn summary_without_sra_relation() {
    let payload = serde_json::json!({
        "result": {
            "uids": ["200000001"],
            "200000001": { "accession": "GSE1", "extrelations": [] }
        }
    });
    assert!(study_accessions_from_summary(&payload).is_empty());
}

#[test]
fn bad_request_names_the_missing_accessions() {
    let (base, _) = serve(vec![(400, "")]);
    let eutils = client(&base, quick_settings());

    let err = eutils
        .fetch_biosamples(&ids(&["SAMN00000001", "SAMN00000002"]))
        .unwrap_err();
    assert_matches!(err, GeoHcaError::NotFoundSra(missing) => {
        assert_eq!(missing, ids(&["SAMN00000001", "SAMN00000002"]));
    });
}

#[test]
fn efetch_is_split_into_batches() {
    let (base, requests) = serve(vec![
        (200, common::EXPERIMENTS),
        (200, common::EXPERIMENTS),
    ]);
    let settings = EutilsSettings {
        batch_size: 2,
        ..quick_settings()
    };
    let eutils = client(&base, settings);

    let packages = eutils
        .fetch_experiments(&ids(&["SRX3000001", "SRX3000002", "SRX3000003"]))
        .unwrap();
    assert_eq!(packages.len(), 4);

    let requests = requests.lock().unwrap();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].starts_with("GET /efetch.fcgi?"));
    assert!(requests[0].contains("db=sra"));
    assert!(requests[0].contains("SRX3000002"));
    assert!(requests[1].contains("id=SRX3000003"));
    assert!(!requests[1].contains("SRX3000001"));
}

#[test]
fn unavailable_service_is_retried() {
    let (base, requests) = serve(vec![(503, ""), (200, common::BIOPROJECT)]);
    let eutils = client(&base, quick_settings());

    let project = eutils.fetch_bioproject("PRJNA400001").unwrap();
    assert!(project.is_some());
    assert_eq!(requests.lock().unwrap().len(), 2);
}

#[test]
fn retries_stop_at_the_configured_limit() {
    let (base, requests) = serve(vec![(503, "busy"), (503, "busy")]);
    let settings = EutilsSettings {
        max_retries: 1,
        ..quick_settings()
    };
    let eutils = client(&base, settings);

    let err = eutils.fetch_pubmed("29999999").unwrap_err();
    assert_matches!(err, GeoHcaError::NcbiStatus { status: 503, .. });
    assert_eq!(requests.lock().unwrap().len(), 2);
}

#[test]
fn requests_are_spaced_by_the_configured_delay() {
    let (base, _) = serve(vec![(200, common::PUBMED), (200, common::PUBMED)]);
    let settings = EutilsSettings {
        request_delay_ms: 300,
        ..EutilsSettings::default()
    };
    let eutils = client(&base, settings);

    let started = Instant::now();
    eutils.fetch_pubmed("29999999").unwrap();
    eutils.fetch_pubmed("29999999").unwrap();
    assert!(started.elapsed() >= Duration::from_millis(300));
}

#[test]
fn study_lookup_walks_esearch_then_esummary() {
    let (base, requests) = serve(vec![
        (
            200,
            r#"{"esearchresult": {"count": "1", "idlist": ["200123456"]}}"#,
        ),
        (200, include_str!("fixtures/esummary_gds.json")),
    ]);
    let eutils = client(&base, quick_settings());

    let studies = eutils
        .srp_accessions(&"GSE123456".parse().unwrap())
        .unwrap();
    assert_eq!(
        studies.iter().map(|study| study.as_str()).collect::<Vec<_>>(),
        vec!["SRP100001"]
    );

    let requests = requests.lock().unwrap();
    assert!(requests[0].starts_with("GET /esearch.fcgi?"));
    assert!(requests[0].contains("term=GSE123456"));
    assert!(requests[1].starts_with("GET /esummary.fcgi?"));
    assert!(requests[1].contains("id=200123456"));
}

#[test]
fn run_table_comes_from_the_runinfo_endpoint() {
    let (base, requests) = serve(vec![(200, common::RUNINFO)]);
    let eutils = client(&base, quick_settings());

    let runs = eutils.run_info(&common::study()).unwrap();
    assert_eq!(runs.len(), 3);

    let requests = requests.lock().unwrap();
    assert!(requests[0].starts_with("GET /runinfo?"));
    assert!(requests[0].contains("rettype=runinfo"));
    assert!(requests[0].contains("term=SRP100001"));
}
