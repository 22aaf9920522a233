use regex::Regex;
use serde::Serialize;

use crate::error::GeoHcaError;
use crate::xml::{self, Element};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LibraryLayout {
    Single,
    Paired,
    Unknown,
}

impl LibraryLayout {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "SINGLE" => LibraryLayout::Single,
            "PAIRED" => LibraryLayout::Paired,
            _ => LibraryLayout::Unknown,
        }
    }

    pub fn is_paired(&self) -> Option<bool> {
        match self {
            LibraryLayout::Single => Some(false),
            LibraryLayout::Paired => Some(true),
            LibraryLayout::Unknown => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SraRun {
    pub accession: String,
    /// Submitted FASTQ file names; empty when SRA only holds normalized data.
    pub file_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExperimentPackage {
    pub accession: String,
    pub title: Option<String>,
    pub library_name: Option<String>,
    pub library_strategy: Option<String>,
    pub library_source: Option<String>,
    pub library_selection: Option<String>,
    pub layout: LibraryLayout,
    pub construction_protocol: Option<String>,
    pub platform: Option<String>,
    pub instrument_model: Option<String>,
    pub sample_accession: Option<String>,
    pub biosample_accession: Option<String>,
    pub runs: Vec<SraRun>,
}

pub fn parse_experiment_packages(document: &str) -> Result<Vec<ExperimentPackage>, GeoHcaError> {
    let mut packages = Vec::new();
    for package in xml::elements(document, "EXPERIMENT_PACKAGE")? {
        if let Some(parsed) = parse_package(&package)? {
            packages.push(parsed);
        }
    }
    Ok(packages)
}

fn parse_package(package: &Element<'_>) -> Result<Option<ExperimentPackage>, GeoHcaError> {
    let Some(experiment) = package.child("EXPERIMENT")? else {
        return Ok(None);
    };
    let Some(accession) = experiment.attr("accession") else {
        return Ok(None);
    };

    let descriptor = experiment.child("LIBRARY_DESCRIPTOR")?;
    let descriptor_text = |tag: &str| -> Result<Option<String>, GeoHcaError> {
        match &descriptor {
            Some(element) => element.child_text(tag),
            None => Ok(None),
        }
    };

    let layout = match &descriptor {
        Some(element) => match element.child("LIBRARY_LAYOUT")? {
            Some(layout) => layout_from_body(layout.body())?,
            None => LibraryLayout::Unknown,
        },
        None => LibraryLayout::Unknown,
    };

    let (platform, instrument_model) = match experiment.child("PLATFORM")? {
        Some(platform) => (
            first_tag_name(platform.body())?,
            platform.child_text("INSTRUMENT_MODEL")?,
        ),
        None => (None, None),
    };

    let sample = package.child("SAMPLE")?;
    let sample_accession = sample.as_ref().and_then(|element| element.attr("accession"));
    let biosample_accession = match &sample {
        Some(element) => biosample_external_id(element)?,
        None => None,
    };

    let mut runs = Vec::new();
    for run in package.children("RUN")? {
        let Some(run_accession) = run.attr("accession") else {
            continue;
        };
        runs.push(SraRun {
            file_names: fastq_file_names(&run, &run_accession)?,
            accession: run_accession,
        });
    }

    Ok(Some(ExperimentPackage {
        accession,
        title: experiment.child_text("TITLE")?,
        library_name: descriptor_text("LIBRARY_NAME")?,
        library_strategy: descriptor_text("LIBRARY_STRATEGY")?,
        library_source: descriptor_text("LIBRARY_SOURCE")?,
        library_selection: descriptor_text("LIBRARY_SELECTION")?,
        layout,
        construction_protocol: descriptor_text("LIBRARY_CONSTRUCTION_PROTOCOL")?,
        platform,
        instrument_model,
        sample_accession,
        biosample_accession,
        runs,
    }))
}

fn layout_from_body(body: &str) -> Result<LibraryLayout, GeoHcaError> {
    Ok(first_tag_name(body)?
        .map(|name| LibraryLayout::parse(&name))
        .unwrap_or(LibraryLayout::Unknown))
}

fn first_tag_name(body: &str) -> Result<Option<String>, GeoHcaError> {
    let re = Regex::new(r"<([A-Za-z_][A-Za-z0-9_]*)")
        .map_err(|err| GeoHcaError::Xml(err.to_string()))?;
    Ok(re
        .captures(body)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string()))
}

fn biosample_external_id(sample: &Element<'_>) -> Result<Option<String>, GeoHcaError> {
    for id in sample.children("EXTERNAL_ID")? {
        let is_biosample = id
            .attr("namespace")
            .map(|value| value.eq_ignore_ascii_case("BioSample"))
            .unwrap_or(false);
        if is_biosample {
            let text = id.text();
            if !text.is_empty() {
                return Ok(Some(text));
            }
        }
    }
    Ok(None)
}

fn fastq_file_names(run: &Element<'_>, run_accession: &str) -> Result<Vec<String>, GeoHcaError> {
    let mut names = Vec::new();
    for file in run.children("SRAFile")? {
        let Some(name) = file.attr("filename") else {
            continue;
        };
        if name == run_accession || !is_fastq_name(&name) {
            continue;
        }
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

pub fn is_fastq_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.contains(".fastq") || lower.contains(".fq")
}
