//! Maps fetched GEO/SRA records onto the HCA ingest tabs.

use std::collections::HashSet;

use crate::domain::{GeoAccession, StudyAccession};
use crate::geo::SoftSeries;
use crate::hca::{TabKind, Workbook};
use crate::providers::bioproject::{BioProjectRecord, Grant};
use crate::providers::biosample::{BioSampleRecord, is_missing_value};
use crate::providers::pubmed::PubmedRecord;
use crate::providers::sra::{ExperimentPackage, LibraryLayout};
use crate::runinfo::RunInfo;

/// Separator for multi-value cells in the ingest template.
pub const MULTI_VALUE_SEPARATOR: &str = "||";

const DONOR_ATTRIBUTES: &[&str] = &[
    "individual",
    "donor_id",
    "donor id",
    "donor",
    "subject_id",
    "subject id",
    "patient_id",
    "patient id",
];
const ORGAN_ATTRIBUTES: &[&str] = &[
    "tissue",
    "organism_part",
    "organism part",
    "organ",
    "body_site",
    "body site",
];
const SEX_ATTRIBUTES: &[&str] = &["sex", "gender"];
const AGE_ATTRIBUTES: &[&str] = &["age"];
const STAGE_ATTRIBUTES: &[&str] = &["dev_stage", "development stage", "developmental stage"];
const DISEASE_ATTRIBUTES: &[&str] = &["disease", "disease state", "disease_state"];

pub struct ConversionInput<'a> {
    pub accession: &'a GeoAccession,
    pub studies: &'a [StudyAccession],
    pub runs: &'a [RunInfo],
    pub experiments: &'a [ExperimentPackage],
    pub biosamples: &'a [BioSampleRecord],
    pub bioproject: Option<&'a BioProjectRecord>,
    pub publication: Option<&'a PubmedRecord>,
    pub soft: Option<&'a SoftSeries>,
}

#[derive(Debug, Clone)]
pub struct Conversion {
    pub workbook: Workbook,
    pub warnings: Vec<String>,
}

pub fn build_workbook(input: &ConversionInput<'_>) -> Conversion {
    let mut builder = Builder {
        input,
        workbook: Workbook::new(),
        warnings: Vec::new(),
    };
    builder.project();
    builder.contributors();
    builder.publications();
    builder.funders();
    builder.biomaterials();
    builder.cell_suspensions();
    builder.protocols();
    builder.sequence_files();
    builder.fit_cells();
    Conversion {
        workbook: builder.workbook,
        warnings: builder.warnings,
    }
}

struct Builder<'i, 'a> {
    input: &'i ConversionInput<'a>,
    workbook: Workbook,
    warnings: Vec<String>,
}

impl Builder<'_, '_> {
    fn warn(&mut self, message: String) {
        tracing::warn!("{message}");
        self.warnings.push(message);
    }

    fn fit_cells(&mut self) {
        let notes = self
            .workbook
            .tabs
            .iter_mut()
            .flat_map(|tab| tab.truncate_long_cells())
            .collect::<Vec<_>>();
        for note in notes {
            self.warn(note);
        }
    }

    fn project(&mut self) {
        let input = self.input;
        let soft = input.soft;
        let bioproject = input.bioproject;

        let title = bioproject
            .and_then(|project| project.title.clone())
            .or_else(|| soft.and_then(|series| series.title.clone()))
            .unwrap_or_default();
        let description = bioproject
            .and_then(|project| project.description.clone())
            .or_else(|| soft.and_then(|series| series.summary.clone()))
            .unwrap_or_default();
        let insdc_project = bioproject
            .and_then(|project| project.accession.clone())
            .or_else(|| first_value(input.runs, |run| run.bioproject.as_str()))
            .or_else(|| soft.and_then(|series| series.bioproject.clone()))
            .unwrap_or_default();
        let studies = input
            .studies
            .iter()
            .map(|study| study.as_str())
            .collect::<Vec<_>>()
            .join(MULTI_VALUE_SEPARATOR);

        if title.is_empty() {
            self.warn(format!("no project title found for {}", input.accession));
        }

        self.workbook.tab_mut(TabKind::Project).push(&[
            (
                "project.project_core.project_short_name",
                input.accession.to_string(),
            ),
            ("project.project_core.project_title", title),
            ("project.project_core.project_description", description),
            ("project.geo_series_accessions", input.accession.to_string()),
            ("project.insdc_project_accessions", insdc_project),
            ("project.insdc_study_accessions", studies),
        ]);
    }

    fn contributors(&mut self) {
        let mut people: Vec<Contributor> = Vec::new();
        match self.input.publication {
            Some(publication) if !publication.authors.is_empty() => {
                for author in &publication.authors {
                    people.push(Contributor {
                        name: author.contributor_name(),
                        email: None,
                        institution: author.affiliation.clone(),
                        corresponding: false,
                    });
                }
            }
            _ => {
                if let Some(soft) = self.input.soft {
                    for name in &soft.contributors {
                        people.push(Contributor {
                            name: name.clone(),
                            email: None,
                            institution: None,
                            corresponding: false,
                        });
                    }
                }
            }
        }

        if let Some(soft) = self.input.soft {
            if let Some(contact) = &soft.contact_name {
                let key = name_key(contact);
                match people.iter_mut().find(|person| name_key(&person.name) == key) {
                    Some(person) => {
                        person.corresponding = true;
                        person.email = soft.contact_email.clone();
                        if person.institution.is_none() {
                            person.institution = soft.contact_institute.clone();
                        }
                    }
                    None => people.push(Contributor {
                        name: contact.clone(),
                        email: soft.contact_email.clone(),
                        institution: soft.contact_institute.clone(),
                        corresponding: true,
                    }),
                }
            }
        }

        if people.is_empty() {
            self.warn(format!("no contributors found for {}", self.input.accession));
        }

        let tab = self.workbook.tab_mut(TabKind::Contributors);
        for person in people {
            tab.push(&[
                ("project.contributors.name", person.name),
                ("project.contributors.email", person.email.unwrap_or_default()),
                (
                    "project.contributors.institution",
                    person.institution.unwrap_or_default(),
                ),
                (
                    "project.contributors.corresponding_contributor",
                    yes_no(person.corresponding).to_string(),
                ),
            ]);
        }
    }

    fn publications(&mut self) {
        let Some(publication) = self.input.publication else {
            return;
        };
        let authors = publication
            .authors
            .iter()
            .map(|author| author.citation_name())
            .collect::<Vec<_>>()
            .join(MULTI_VALUE_SEPARATOR);
        self.workbook.tab_mut(TabKind::Publications).push(&[
            ("project.publications.authors", authors),
            (
                "project.publications.title",
                publication.title.clone().unwrap_or_default(),
            ),
            (
                "project.publications.doi",
                publication.doi.clone().unwrap_or_default(),
            ),
            ("project.publications.pmid", publication.pmid.clone()),
            ("project.publications.url", publication.url()),
        ]);
    }

    fn funders(&mut self) {
        let mut grants: Vec<&Grant> = Vec::new();
        let from_publication = self.input.publication.map(|p| p.grants.iter());
        let from_project = self.input.bioproject.map(|p| p.grants.iter());
        for grant in from_publication
            .into_iter()
            .flatten()
            .chain(from_project.into_iter().flatten())
        {
            if !grants.iter().any(|seen| seen.id == grant.id) {
                grants.push(grant);
            }
        }

        let tab = self.workbook.tab_mut(TabKind::Funders);
        for grant in grants {
            tab.push(&[
                ("project.funders.grant_id", grant.id.clone()),
                (
                    "project.funders.organization",
                    grant.agency.clone().unwrap_or_default(),
                ),
            ]);
        }
    }

    fn biomaterials(&mut self) {
        let input = self.input;
        let mut seen_donors = HashSet::new();

        for accession in biosample_order(input) {
            let record = input
                .biosamples
                .iter()
                .find(|record| record.accession == accession);
            let run = input.runs.iter().find(|run| run.biosample == accession);
            let soft_sample = input
                .soft
                .and_then(|series| series.sample_for_biosample(&accession));

            if record.is_none() {
                self.warn(format!("BioSample {accession} returned no record"));
            }

            let attribute = |names: &[&str]| -> Option<String> {
                record
                    .and_then(|record| record.attribute(names))
                    .map(|value| value.to_string())
                    .or_else(|| {
                        soft_sample.and_then(|sample| {
                            sample
                                .characteristics
                                .iter()
                                .find(|(name, value)| {
                                    names.iter().any(|wanted| name.eq_ignore_ascii_case(wanted))
                                        && !is_missing_value(value)
                                })
                                .map(|(_, value)| value.clone())
                        })
                    })
            };

            let taxon_id = record
                .and_then(|record| record.taxon_id.clone())
                .or_else(|| run.map(|run| run.tax_id.clone()))
                .unwrap_or_default();
            let species = record
                .and_then(|record| record.organism.clone())
                .or_else(|| run.map(|run| run.scientific_name.clone()))
                .or_else(|| soft_sample.and_then(|sample| sample.organism.clone()))
                .unwrap_or_default();
            let donor_id = attribute(DONOR_ATTRIBUTES).unwrap_or_else(|| accession.clone());
            let sex = normalize_sex(
                attribute(SEX_ATTRIBUTES)
                    .or_else(|| run.map(|run| run.sex.clone()))
                    .as_deref()
                    .unwrap_or(""),
            );

            if seen_donors.insert(donor_id.clone()) {
                self.workbook.tab_mut(TabKind::DonorOrganism).push(&[
                    ("donor_organism.biomaterial_core.biomaterial_id", donor_id.clone()),
                    ("donor_organism.biomaterial_core.ncbi_taxon_id", taxon_id.clone()),
                    ("donor_organism.genus_species.text", species.clone()),
                    ("donor_organism.sex", sex.to_string()),
                    (
                        "donor_organism.organism_age",
                        attribute(AGE_ATTRIBUTES).unwrap_or_default(),
                    ),
                    (
                        "donor_organism.development_stage.text",
                        attribute(STAGE_ATTRIBUTES).unwrap_or_default(),
                    ),
                    (
                        "donor_organism.diseases.text",
                        attribute(DISEASE_ATTRIBUTES).unwrap_or_default(),
                    ),
                ]);
            }

            let name = record
                .and_then(|record| record.title.clone())
                .or_else(|| soft_sample.and_then(|sample| sample.title.clone()))
                .or_else(|| run.map(|run| run.sample_name.clone()))
                .unwrap_or_default();
            let description = soft_sample
                .map(|sample| {
                    sample
                        .characteristics
                        .iter()
                        .map(|(name, value)| format!("{name}: {value}"))
                        .collect::<Vec<_>>()
                        .join("; ")
                })
                .unwrap_or_default();
            let insdc_sample = record
                .and_then(|record| record.sra_sample.clone())
                .or_else(|| run.map(|run| run.sample.clone()))
                .unwrap_or_default();
            let organ = attribute(ORGAN_ATTRIBUTES)
                .or_else(|| {
                    run.map(|run| run.body_site.clone())
                        .filter(|value| !is_missing_value(value))
                })
                .unwrap_or_default();

            self.workbook.tab_mut(TabKind::SpecimenFromOrganism).push(&[
                (
                    "specimen_from_organism.biomaterial_core.biomaterial_id",
                    accession.clone(),
                ),
                (
                    "specimen_from_organism.biomaterial_core.biomaterial_name",
                    name,
                ),
                (
                    "specimen_from_organism.biomaterial_core.biomaterial_description",
                    description,
                ),
                (
                    "specimen_from_organism.biomaterial_core.ncbi_taxon_id",
                    taxon_id,
                ),
                (
                    "specimen_from_organism.biomaterial_core.biosamples_accession",
                    accession.clone(),
                ),
                (
                    "specimen_from_organism.biomaterial_core.insdc_sample_accession",
                    insdc_sample,
                ),
                ("specimen_from_organism.genus_species.text", species),
                ("specimen_from_organism.organ.text", organ),
                ("donor_organism.biomaterial_core.biomaterial_id", donor_id),
            ]);
        }
    }

    fn cell_suspensions(&mut self) {
        let input = self.input;
        for experiment in experiment_order(input) {
            let package = input
                .experiments
                .iter()
                .find(|package| package.accession == experiment);
            let run = input.runs.iter().find(|run| run.experiment == experiment);
            let specimen = package
                .and_then(|package| package.biosample_accession.clone())
                .or_else(|| run.map(|run| run.biosample.clone()))
                .unwrap_or_default();
            let record = input
                .biosamples
                .iter()
                .find(|record| record.accession == specimen);
            let taxon_id = run
                .map(|run| run.tax_id.trim().to_string())
                .filter(|value| !value.is_empty())
                .or_else(|| record.and_then(|record| record.taxon_id.clone()))
                .unwrap_or_default();
            let species = run
                .map(|run| run.scientific_name.trim().to_string())
                .filter(|value| !value.is_empty())
                .or_else(|| record.and_then(|record| record.organism.clone()))
                .unwrap_or_default();

            self.workbook.tab_mut(TabKind::CellSuspension).push(&[
                (
                    "cell_suspension.biomaterial_core.biomaterial_id",
                    experiment.clone(),
                ),
                (
                    "cell_suspension.biomaterial_core.biomaterial_name",
                    package
                        .and_then(|package| package.title.clone())
                        .unwrap_or_default(),
                ),
                ("cell_suspension.biomaterial_core.ncbi_taxon_id", taxon_id),
                ("cell_suspension.genus_species.text", species),
                (
                    "specimen_from_organism.biomaterial_core.biomaterial_id",
                    specimen,
                ),
            ]);
        }
    }

    fn protocols(&mut self) {
        let input = self.input;
        for experiment in experiment_order(input) {
            let package = input
                .experiments
                .iter()
                .find(|package| package.accession == experiment);
            let run = input.runs.iter().find(|run| run.experiment == experiment);

            let strategy = package
                .and_then(|package| package.library_strategy.clone())
                .or_else(|| run.map(|run| run.library_strategy.clone()))
                .unwrap_or_default();
            let source = package
                .and_then(|package| package.library_source.clone())
                .or_else(|| run.map(|run| run.library_source.clone()))
                .unwrap_or_default();
            let model = package
                .and_then(|package| package.instrument_model.clone())
                .or_else(|| run.map(|run| run.model.clone()))
                .unwrap_or_default();
            let layout = match package.map(|package| package.layout) {
                Some(LibraryLayout::Unknown) | None => run
                    .map(|run| LibraryLayout::parse(&run.library_layout))
                    .unwrap_or(LibraryLayout::Unknown),
                Some(layout) => layout,
            };

            // Protocol ids are not resolved; the id cells stay empty.
            self.workbook
                .tab_mut(TabKind::LibraryPreparationProtocol)
                .push(&[
                    (
                        "library_preparation_protocol.protocol_core.protocol_id",
                        String::new(),
                    ),
                    (
                        "library_preparation_protocol.protocol_core.protocol_description",
                        package
                            .and_then(|package| package.construction_protocol.clone())
                            .unwrap_or_default(),
                    ),
                    (
                        "library_preparation_protocol.library_construction_method.text",
                        strategy.clone(),
                    ),
                    (
                        "library_preparation_protocol.nucleic_acid_source",
                        nucleic_acid_source(&source).to_string(),
                    ),
                ]);

            self.workbook.tab_mut(TabKind::SequencingProtocol).push(&[
                (
                    "sequencing_protocol.protocol_core.protocol_id",
                    String::new(),
                ),
                (
                    "sequencing_protocol.instrument_manufacturer_model.text",
                    model,
                ),
                (
                    "sequencing_protocol.paired_end",
                    layout
                        .is_paired()
                        .map(|paired| yes_no(paired).to_string())
                        .unwrap_or_default(),
                ),
                ("sequencing_protocol.method.text", strategy),
            ]);
        }
    }

    fn sequence_files(&mut self) {
        let input = self.input;
        let mut covered: HashSet<&str> = HashSet::new();
        let mut missing_files = Vec::new();

        for package in input.experiments {
            for run in &package.runs {
                covered.insert(run.accession.as_str());
                if run.file_names.is_empty() {
                    missing_files.push(run.accession.clone());
                    self.push_sequence_file("", &run.accession, &package.accession);
                    continue;
                }
                for file_name in &run.file_names {
                    self.push_sequence_file(file_name, &run.accession, &package.accession);
                }
            }
        }

        for run in input.runs {
            if covered.contains(run.run.as_str()) {
                continue;
            }
            missing_files.push(run.run.clone());
            self.push_sequence_file("", &run.run, &run.experiment);
        }

        if !missing_files.is_empty() {
            self.warn(format!(
                "no FASTQ file names reported for {} run(s): {}",
                missing_files.len(),
                missing_files.join(", ")
            ));
        }
    }

    fn push_sequence_file(&mut self, file_name: &str, run: &str, experiment: &str) {
        self.workbook.tab_mut(TabKind::SequenceFile).push(&[
            ("sequence_file.file_core.file_name", file_name.to_string()),
            (
                "sequence_file.file_core.format",
                file_format(file_name).to_string(),
            ),
            ("sequence_file.read_index", read_index(file_name).to_string()),
            (
                "sequence_file.lane_index",
                lane_index(file_name).map(|lane| lane.to_string()).unwrap_or_default(),
            ),
            ("sequence_file.insdc_run_accessions", run.to_string()),
            (
                "cell_suspension.biomaterial_core.biomaterial_id",
                experiment.to_string(),
            ),
            (
                "library_preparation_protocol.protocol_core.protocol_id",
                String::new(),
            ),
            (
                "sequencing_protocol.protocol_core.protocol_id",
                String::new(),
            ),
            (
                "process.insdc_experiment.insdc_experiment_accession",
                experiment.to_string(),
            ),
        ]);
    }
}

struct Contributor {
    name: String,
    email: Option<String>,
    institution: Option<String>,
    corresponding: bool,
}

/// First and last name of a `First,Middle,Last` string, lower-cased.
fn name_key(name: &str) -> (String, String) {
    let parts = name.split(',').map(|part| part.trim()).collect::<Vec<_>>();
    let first = parts.first().copied().unwrap_or("").to_lowercase();
    let last = parts.last().copied().unwrap_or("").to_lowercase();
    (first, last)
}

fn first_value<F>(runs: &[RunInfo], field: F) -> Option<String>
where
    F: Fn(&RunInfo) -> &str,
{
    runs.iter()
        .map(|run| field(run).trim())
        .find(|value| !value.is_empty())
        .map(|value| value.to_string())
}

/// BioSample accessions in run-table order, then any fetched records the
/// run table does not mention.
fn biosample_order(input: &ConversionInput<'_>) -> Vec<String> {
    let mut order = crate::runinfo::distinct(input.runs, |run| run.biosample.as_str());
    for record in input.biosamples {
        if !order.contains(&record.accession) {
            order.push(record.accession.clone());
        }
    }
    order
}

fn experiment_order(input: &ConversionInput<'_>) -> Vec<String> {
    let mut order = crate::runinfo::distinct(input.runs, |run| run.experiment.as_str());
    for package in input.experiments {
        if !order.contains(&package.accession) {
            order.push(package.accession.clone());
        }
    }
    order
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

pub fn normalize_sex(value: &str) -> &'static str {
    match value.trim().to_ascii_lowercase().as_str() {
        "female" | "f" => "female",
        "male" | "m" => "male",
        "mixed" | "pooled" | "mixed sex" => "mixed",
        _ => "unknown",
    }
}

pub fn nucleic_acid_source(library_source: &str) -> &'static str {
    let upper = library_source.to_ascii_uppercase();
    if upper.contains("SINGLE CELL") {
        "single cell"
    } else if upper.contains("SINGLE NUCLEUS") {
        "single nucleus"
    } else {
        ""
    }
}

fn name_tokens(file_name: &str) -> Vec<&str> {
    let stem = file_name.split('.').next().unwrap_or(file_name);
    stem.split(['_', '-']).filter(|token| !token.is_empty()).collect()
}

/// Infers the read a FASTQ file holds from Illumina naming (`_R1`, `_I1`)
/// or SRA dump naming (`_1`, `_2`).
pub fn read_index(file_name: &str) -> &'static str {
    let tokens = name_tokens(file_name);
    for token in &tokens {
        match token.to_ascii_uppercase().as_str() {
            "R1" => return "read1",
            "R2" => return "read2",
            "I1" => return "index1",
            "I2" => return "index2",
            _ => {}
        }
    }
    match tokens.last().copied() {
        Some("1") if tokens.len() > 1 => "read1",
        Some("2") if tokens.len() > 1 => "read2",
        _ => "",
    }
}

/// Lane number from an Illumina `_L001` token.
pub fn lane_index(file_name: &str) -> Option<u32> {
    name_tokens(file_name).iter().find_map(|token| {
        let digits = token.strip_prefix('L')?;
        if digits.len() == 3 && digits.chars().all(|ch| ch.is_ascii_digit()) {
            digits.parse().ok()
        } else {
            None
        }
    })
}

pub fn file_format(file_name: &str) -> &str {
    file_name
        .split_once('.')
        .map(|(_, ext)| ext)
        .unwrap_or("")
}
