//! In-memory model of the HCA ingest spreadsheet.

use serde::Serialize;

/// Text the ingest service expects in the first cell of the row that
/// precedes the data.
pub const FILL_MARKER: &str = "FILL OUT INFORMATION BELOW THIS ROW";

/// Rows above the data: display name, description, guidance, programmatic
/// name, fill marker.
pub const HEADER_ROWS: u32 = 5;

/// Longest string a spreadsheet cell accepts, in characters.
pub const MAX_CELL_CHARS: usize = 32_767;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Column {
    pub display: &'static str,
    pub description: &'static str,
    pub programmatic: &'static str,
}

const fn col(
    display: &'static str,
    description: &'static str,
    programmatic: &'static str,
) -> Column {
    Column {
        display,
        description,
        programmatic,
    }
}

const PROJECT: &[Column] = &[
    col(
        "Project label",
        "A short name for the project.",
        "project.project_core.project_short_name",
    ),
    col(
        "Project title",
        "An official title for the project.",
        "project.project_core.project_title",
    ),
    col(
        "Project description",
        "A longer description of the project which includes research goals and experimental approach.",
        "project.project_core.project_description",
    ),
    col(
        "GEO series accession",
        "A GEO series accession.",
        "project.geo_series_accessions",
    ),
    col(
        "INSDC project accession",
        "An International Nucleotide Sequence Database Collaboration (INSDC) project accession.",
        "project.insdc_project_accessions",
    ),
    col(
        "INSDC study accession",
        "An International Nucleotide Sequence Database Collaboration (INSDC) study accession.",
        "project.insdc_study_accessions",
    ),
];

const CONTRIBUTORS: &[Column] = &[
    col(
        "Contact name",
        "Name of individual who has contributed to the project.",
        "project.contributors.name",
    ),
    col(
        "Email address",
        "Email address for the individual.",
        "project.contributors.email",
    ),
    col(
        "Institute",
        "Name of primary institute where the individual works.",
        "project.contributors.institution",
    ),
    col(
        "Corresponding contributor",
        "Whether the individual is a primary point of contact for the project.",
        "project.contributors.corresponding_contributor",
    ),
];

const PUBLICATIONS: &[Column] = &[
    col(
        "Publication authors",
        "A list of authors associated with the publication.",
        "project.publications.authors",
    ),
    col(
        "Publication title",
        "The title of the publication.",
        "project.publications.title",
    ),
    col(
        "Publication DOI",
        "The publication digital object identifier (doi) of the publication.",
        "project.publications.doi",
    ),
    col(
        "Publication PMID",
        "The PubMed ID of the publication.",
        "project.publications.pmid",
    ),
    col(
        "Publication URL",
        "A URL for the publication.",
        "project.publications.url",
    ),
];

const FUNDERS: &[Column] = &[
    col(
        "Grant ID",
        "The unique grant identifier or reference.",
        "project.funders.grant_id",
    ),
    col(
        "Funding organization",
        "The name of the funding organization.",
        "project.funders.organization",
    ),
];

const DONOR_ORGANISM: &[Column] = &[
    col(
        "Donor organism ID",
        "A unique ID for the donor organism.",
        "donor_organism.biomaterial_core.biomaterial_id",
    ),
    col(
        "NCBI Taxon ID",
        "A taxonomy ID (taxonID) from NCBI.",
        "donor_organism.biomaterial_core.ncbi_taxon_id",
    ),
    col(
        "Genus species",
        "The scientific binomial name for the species of the organism.",
        "donor_organism.genus_species.text",
    ),
    col(
        "Biological sex",
        "The biological sex of the organism.",
        "donor_organism.sex",
    ),
    col(
        "Age",
        "Age of organism in Age units measured since birth.",
        "donor_organism.organism_age",
    ),
    col(
        "Development stage",
        "A classification of the developmental stage of the organism.",
        "donor_organism.development_stage.text",
    ),
    col(
        "Known disease(s)",
        "Short description of known disease(s) of the organism.",
        "donor_organism.diseases.text",
    ),
];

const SPECIMEN_FROM_ORGANISM: &[Column] = &[
    col(
        "Specimen ID",
        "A unique ID for the specimen.",
        "specimen_from_organism.biomaterial_core.biomaterial_id",
    ),
    col(
        "Specimen name",
        "A short, descriptive name for the specimen that need not be unique.",
        "specimen_from_organism.biomaterial_core.biomaterial_name",
    ),
    col(
        "Specimen description",
        "A general description or abstract of the specimen.",
        "specimen_from_organism.biomaterial_core.biomaterial_description",
    ),
    col(
        "NCBI Taxon ID",
        "A taxonomy ID (taxonID) from NCBI.",
        "specimen_from_organism.biomaterial_core.ncbi_taxon_id",
    ),
    col(
        "Biosamples accession",
        "A BioSamples accession.",
        "specimen_from_organism.biomaterial_core.biosamples_accession",
    ),
    col(
        "INSDC sample accession",
        "An International Nucleotide Sequence Database Collaboration (INSDC) sample accession.",
        "specimen_from_organism.biomaterial_core.insdc_sample_accession",
    ),
    col(
        "Genus species",
        "The scientific binomial name for the species of the specimen.",
        "specimen_from_organism.genus_species.text",
    ),
    col(
        "Organ",
        "The organ that the biomaterial came from.",
        "specimen_from_organism.organ.text",
    ),
    col(
        "Input donor organism ID",
        "ID of the donor organism this specimen was taken from.",
        "donor_organism.biomaterial_core.biomaterial_id",
    ),
];

const CELL_SUSPENSION: &[Column] = &[
    col(
        "Cell suspension ID",
        "A unique ID for the cell suspension.",
        "cell_suspension.biomaterial_core.biomaterial_id",
    ),
    col(
        "Cell suspension name",
        "A short, descriptive name for the cell suspension that need not be unique.",
        "cell_suspension.biomaterial_core.biomaterial_name",
    ),
    col(
        "NCBI Taxon ID",
        "A taxonomy ID (taxonID) from NCBI.",
        "cell_suspension.biomaterial_core.ncbi_taxon_id",
    ),
    col(
        "Genus species",
        "The scientific binomial name for the species of the suspension.",
        "cell_suspension.genus_species.text",
    ),
    col(
        "Input specimen ID",
        "ID of the specimen this suspension was prepared from.",
        "specimen_from_organism.biomaterial_core.biomaterial_id",
    ),
];

const LIBRARY_PREPARATION_PROTOCOL: &[Column] = &[
    col(
        "Library preparation protocol ID",
        "A unique ID for the protocol.",
        "library_preparation_protocol.protocol_core.protocol_id",
    ),
    col(
        "Library preparation protocol description",
        "A general description of the protocol.",
        "library_preparation_protocol.protocol_core.protocol_description",
    ),
    col(
        "Library construction method",
        "The general method for sequencing library construction.",
        "library_preparation_protocol.library_construction_method.text",
    ),
    col(
        "Nucleic acid source",
        "Source cells or organelles from which nucleic acid molecules were collected.",
        "library_preparation_protocol.nucleic_acid_source",
    ),
];

const SEQUENCING_PROTOCOL: &[Column] = &[
    col(
        "Sequencing protocol ID",
        "A unique ID for the protocol.",
        "sequencing_protocol.protocol_core.protocol_id",
    ),
    col(
        "Instrument manufacturer and model",
        "The manufacturer and model of the sequencer.",
        "sequencing_protocol.instrument_manufacturer_model.text",
    ),
    col(
        "Paired end",
        "Whether the sequenced molecule was sequenced from both ends.",
        "sequencing_protocol.paired_end",
    ),
    col(
        "Sequencing method",
        "An experimental method used for the sequencing process.",
        "sequencing_protocol.method.text",
    ),
];

const SEQUENCE_FILE: &[Column] = &[
    col(
        "File name",
        "The name of the file.",
        "sequence_file.file_core.file_name",
    ),
    col(
        "File format",
        "The format of the file.",
        "sequence_file.file_core.format",
    ),
    col(
        "Read index",
        "The sequencing read this file represents.",
        "sequence_file.read_index",
    ),
    col(
        "Lane index",
        "The lane that this file was sequenced from.",
        "sequence_file.lane_index",
    ),
    col(
        "INSDC run accession",
        "An International Nucleotide Sequence Database Collaboration (INSDC) run accession.",
        "sequence_file.insdc_run_accessions",
    ),
    col(
        "Input cell suspension ID",
        "ID of the cell suspension the library was prepared from.",
        "cell_suspension.biomaterial_core.biomaterial_id",
    ),
    col(
        "Library preparation protocol ID",
        "ID of the library preparation protocol used.",
        "library_preparation_protocol.protocol_core.protocol_id",
    ),
    col(
        "Sequencing protocol ID",
        "ID of the sequencing protocol used.",
        "sequencing_protocol.protocol_core.protocol_id",
    ),
    col(
        "INSDC experiment accession",
        "An International Nucleotide Sequence Database Collaboration (INSDC) experiment accession.",
        "process.insdc_experiment.insdc_experiment_accession",
    ),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TabKind {
    Project,
    Contributors,
    Publications,
    Funders,
    DonorOrganism,
    SpecimenFromOrganism,
    CellSuspension,
    LibraryPreparationProtocol,
    SequencingProtocol,
    SequenceFile,
}

impl TabKind {
    pub const ALL: [TabKind; 10] = [
        TabKind::Project,
        TabKind::Contributors,
        TabKind::Publications,
        TabKind::Funders,
        TabKind::DonorOrganism,
        TabKind::SpecimenFromOrganism,
        TabKind::CellSuspension,
        TabKind::LibraryPreparationProtocol,
        TabKind::SequencingProtocol,
        TabKind::SequenceFile,
    ];

    pub fn sheet_name(&self) -> &'static str {
        match self {
            TabKind::Project => "Project",
            TabKind::Contributors => "Contributors",
            TabKind::Publications => "Publications",
            TabKind::Funders => "Funders",
            TabKind::DonorOrganism => "Donor organism",
            TabKind::SpecimenFromOrganism => "Specimen from organism",
            TabKind::CellSuspension => "Cell suspension",
            TabKind::LibraryPreparationProtocol => "Library preparation protocol",
            TabKind::SequencingProtocol => "Sequencing protocol",
            TabKind::SequenceFile => "Sequence file",
        }
    }

    pub fn columns(&self) -> &'static [Column] {
        match self {
            TabKind::Project => PROJECT,
            TabKind::Contributors => CONTRIBUTORS,
            TabKind::Publications => PUBLICATIONS,
            TabKind::Funders => FUNDERS,
            TabKind::DonorOrganism => DONOR_ORGANISM,
            TabKind::SpecimenFromOrganism => SPECIMEN_FROM_ORGANISM,
            TabKind::CellSuspension => CELL_SUSPENSION,
            TabKind::LibraryPreparationProtocol => LIBRARY_PREPARATION_PROTOCOL,
            TabKind::SequencingProtocol => SEQUENCING_PROTOCOL,
            TabKind::SequenceFile => SEQUENCE_FILE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tab {
    pub kind: TabKind,
    pub rows: Vec<Vec<String>>,
}

impl Tab {
    pub fn new(kind: TabKind) -> Self {
        Self {
            kind,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &'static [Column] {
        self.kind.columns()
    }

    pub fn column_index(&self, programmatic: &str) -> Option<usize> {
        self.columns()
            .iter()
            .position(|column| column.programmatic == programmatic)
    }

    /// Lays `fields` out in column order; columns not named stay empty.
    /// Rows identical to an existing row are dropped.
    pub fn push(&mut self, fields: &[(&str, String)]) {
        let mut row = vec![String::new(); self.columns().len()];
        for (name, value) in fields {
            match self.column_index(name) {
                Some(idx) => row[idx] = value.trim().to_string(),
                None => {
                    tracing::warn!(
                        tab = self.kind.sheet_name(),
                        column = *name,
                        "unknown column"
                    );
                }
            }
        }
        if !self.rows.contains(&row) {
            self.rows.push(row);
        }
    }

    pub fn value(&self, row: usize, programmatic: &str) -> Option<&str> {
        let idx = self.column_index(programmatic)?;
        self.rows.get(row).map(|cells| cells[idx].as_str())
    }

    /// Cuts every cell down to [`MAX_CELL_CHARS`] and describes each cut.
    pub fn truncate_long_cells(&mut self) -> Vec<String> {
        let columns = self.columns();
        let sheet = self.kind.sheet_name();
        let mut notes = Vec::new();
        for (row_idx, row) in self.rows.iter_mut().enumerate() {
            for (col_idx, cell) in row.iter_mut().enumerate() {
                let Some((cut, _)) = cell.char_indices().nth(MAX_CELL_CHARS) else {
                    continue;
                };
                let original = cell.chars().count();
                cell.truncate(cut);
                let column = columns
                    .get(col_idx)
                    .map(|column| column.programmatic)
                    .unwrap_or("");
                notes.push(format!(
                    "{sheet} row {} {column} truncated from {original} to {MAX_CELL_CHARS} characters",
                    row_idx + 1
                ));
            }
        }
        notes
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Workbook {
    pub tabs: Vec<Tab>,
}

impl Workbook {
    pub fn new() -> Self {
        Self {
            tabs: TabKind::ALL.iter().map(|kind| Tab::new(*kind)).collect(),
        }
    }

    pub fn tab(&self, kind: TabKind) -> &Tab {
        let idx = TabKind::ALL
            .iter()
            .position(|candidate| *candidate == kind)
            .unwrap_or(0);
        &self.tabs[idx]
    }

    pub fn tab_mut(&mut self, kind: TabKind) -> &mut Tab {
        let idx = TabKind::ALL
            .iter()
            .position(|candidate| *candidate == kind)
            .unwrap_or(0);
        &mut self.tabs[idx]
    }
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn programmatic_names_are_unique_per_tab() {
        for kind in TabKind::ALL {
            let columns = kind.columns();
            for (idx, column) in columns.iter().enumerate() {
                assert!(
                    !columns[idx + 1..]
                        .iter()
                        .any(|other| other.programmatic == column.programmatic),
                    "{} repeats {}",
                    kind.sheet_name(),
                    column.programmatic
                );
            }
        }
    }

    #[test]
    fn push_aligns_and_deduplicates_rows() {
        let mut tab = Tab::new(TabKind::Funders);
        tab.push(&[("project.funders.organization", "Wellcome".to_string())]);
        tab.push(&[("project.funders.organization", " Wellcome ".to_string())]);
        assert_eq!(tab.rows, vec![vec![String::new(), "Wellcome".to_string()]]);
    }

    #[test]
    fn long_cells_are_cut_on_char_boundaries() {
        let mut tab = Tab::new(TabKind::Project);
        let long = "\u{e9}".repeat(MAX_CELL_CHARS + 10);
        tab.push(&[
            ("project.project_core.project_description", long),
            ("project.project_core.project_title", "short".to_string()),
        ]);
        let notes = tab.truncate_long_cells();
        assert_eq!(notes.len(), 1);
        assert!(notes[0].contains("project.project_core.project_description"));
        let kept = tab.value(0, "project.project_core.project_description").unwrap();
        assert_eq!(kept.chars().count(), MAX_CELL_CHARS);
        assert_eq!(tab.value(0, "project.project_core.project_title"), Some("short"));
        assert!(tab.truncate_long_cells().is_empty());
    }
}
