use geo_to_hca::providers::bioproject::parse_bioproject;
use geo_to_hca::providers::biosample::parse_biosamples;
use geo_to_hca::providers::pubmed::parse_pubmed;
use geo_to_hca::providers::sra::{LibraryLayout, parse_experiment_packages};

#[test]
fn experiment_packages() {
    let packages =
        parse_experiment_packages(include_str!("fixtures/experiment_package.xml")).unwrap();
    assert_eq!(packages.len(), 2);

    let first = &packages[0];
    assert_eq!(first.accession, "SRX3000001");
    assert_eq!(
        first.title.as_deref(),
        Some("GSM2800001: Kidney donor 1; Homo sapiens; RNA-Seq")
    );
    assert_eq!(first.library_strategy.as_deref(), Some("RNA-Seq"));
    assert_eq!(first.layout, LibraryLayout::Paired);
    assert_eq!(first.platform.as_deref(), Some("ILLUMINA"));
    assert_eq!(first.instrument_model.as_deref(), Some("Illumina HiSeq 2500"));
    assert_eq!(
        first.construction_protocol.as_deref(),
        Some("Single cells were captured with the 10x Chromium 3' v2 kit.")
    );
    assert_eq!(first.sample_accession.as_deref(), Some("SRS2800001"));
    assert_eq!(first.biosample_accession.as_deref(), Some("SAMN07000001"));
    assert_eq!(first.runs.len(), 1);
    assert_eq!(
        first.runs[0].file_names,
        vec![
            "kidney_d1_S1_L001_I1_001.fastq.gz",
            "kidney_d1_S1_L001_R1_001.fastq.gz",
            "kidney_d1_S1_L001_R2_001.fastq.gz",
        ]
    );

    let second = &packages[1];
    assert_eq!(second.accession, "SRX3000002");
    assert_eq!(second.runs[0].accession, "SRR6000002");
    assert!(second.runs[0].file_names.is_empty());
}

#[test]
fn empty_experiment_set() {
    let packages = parse_experiment_packages("<EXPERIMENT_PACKAGE_SET/>").unwrap();
    assert!(packages.is_empty());
}

#[test]
fn biosamples() {
    let records = parse_biosamples(include_str!("fixtures/biosample.xml")).unwrap();
    assert_eq!(records.len(), 2);

    let first = &records[0];
    assert_eq!(first.accession, "SAMN07000001");
    assert_eq!(first.title.as_deref(), Some("Kidney donor 1"));
    assert_eq!(first.taxon_id.as_deref(), Some("9606"));
    assert_eq!(first.organism.as_deref(), Some("Homo sapiens"));
    assert_eq!(first.geo_sample.as_deref(), Some("GSM2800001"));
    assert_eq!(first.sra_sample.as_deref(), Some("SRS2800001"));
    assert_eq!(first.attribute(&["sex"]), Some("F"));
    assert_eq!(first.attribute(&["disease"]), Some("normal"));
    assert_eq!(first.attribute(&["organism_part", "tissue"]), Some("kidney cortex"));

    let second = &records[1];
    assert_eq!(second.attribute(&["sex"]), None);
    assert_eq!(second.attribute(&["individual"]), Some("donor 2"));
}

#[test]
fn bioproject() {
    let record = parse_bioproject(include_str!("fixtures/bioproject.xml"))
        .unwrap()
        .unwrap();
    assert_eq!(record.accession.as_deref(), Some("PRJNA400001"));
    assert_eq!(record.name.as_deref(), Some("Human kidney single cell atlas"));
    assert_eq!(
        record.title.as_deref(),
        Some("Single-cell transcriptomes of the adult human kidney")
    );
    assert!(record.description.unwrap().contains("10,000"));
    assert_eq!(record.publication_ids, vec!["29999999"]);
    assert_eq!(record.grants.len(), 1);
    assert_eq!(record.grants[0].id, "U01DK000001");
    assert_eq!(
        record.grants[0].agency.as_deref(),
        Some("National Institute of Diabetes and Digestive and Kidney Diseases")
    );
}

#[test]
fn bioproject_without_project() {
    assert_eq!(parse_bioproject("<RecordSet></RecordSet>").unwrap(), None);
}

#[test]
fn pubmed_article() {
    let record = parse_pubmed(include_str!("fixtures/pubmed.xml"))
        .unwrap()
        .unwrap();
    assert_eq!(record.pmid, "29999999");
    assert_eq!(
        record.title.as_deref(),
        Some("A single-cell atlas of the adult human kidney.")
    );
    assert_eq!(
        record.abstract_text.as_deref(),
        Some("Kidney cells are diverse. We describe 12 cell types.")
    );
    assert_eq!(record.doi.as_deref(), Some("10.1000/kidney.2018.001"));
    assert_eq!(record.url(), "https://pubmed.ncbi.nlm.nih.gov/29999999");

    // The collective author has no last name and is skipped.
    assert_eq!(record.authors.len(), 2);
    assert_eq!(record.authors[0].contributor_name(), "Ana,Maria,Rivera");
    assert_eq!(
        record.authors[0].affiliation.as_deref(),
        Some("Department of Medicine, Example University, Boston, USA.")
    );
    assert_eq!(record.authors[1].contributor_name(), "Chidi,,Okafor");
    assert_eq!(record.authors[1].citation_name(), "Okafor C");

    let grants = record
        .grants
        .iter()
        .map(|grant| grant.id.as_str())
        .collect::<Vec<_>>();
    assert_eq!(grants, vec!["U01DK000001", "WT000002"]);
}
