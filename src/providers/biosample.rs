use serde::Serialize;

use crate::error::GeoHcaError;
use crate::xml;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BioSampleAttribute {
    pub name: String,
    pub harmonized_name: Option<String>,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BioSampleRecord {
    pub accession: String,
    pub title: Option<String>,
    pub taxon_id: Option<String>,
    pub organism: Option<String>,
    pub geo_sample: Option<String>,
    pub sra_sample: Option<String>,
    pub attributes: Vec<BioSampleAttribute>,
}

impl BioSampleRecord {
    /// First non-empty attribute whose harmonized or submitted name matches
    /// one of `names`, in the order the names are given.
    pub fn attribute(&self, names: &[&str]) -> Option<&str> {
        names.iter().find_map(|wanted| {
            self.attributes
                .iter()
                .find(|attr| {
                    attr.harmonized_name
                        .as_deref()
                        .map(|name| name.eq_ignore_ascii_case(wanted))
                        .unwrap_or(false)
                        || attr.name.eq_ignore_ascii_case(wanted)
                })
                .map(|attr| attr.value.as_str())
                .filter(|value| !is_missing_value(value))
        })
    }
}

pub fn is_missing_value(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "" | "na" | "n/a" | "missing" | "not applicable" | "not collected" | "unknown" | "none"
    )
}

pub fn parse_biosamples(document: &str) -> Result<Vec<BioSampleRecord>, GeoHcaError> {
    let mut records = Vec::new();
    for sample in xml::elements(document, "BioSample")? {
        let Some(accession) = sample.attr("accession") else {
            continue;
        };

        let mut geo_sample = None;
        let mut sra_sample = None;
        if let Some(ids) = sample.child("Ids")? {
            for id in ids.children("Id")? {
                match id.attr("db").as_deref() {
                    Some("GEO") => geo_sample = Some(id.text()),
                    Some("SRA") => sra_sample = Some(id.text()),
                    _ => {}
                }
            }
        }

        let (title, taxon_id, organism) = match sample.child("Description")? {
            Some(description) => {
                let organism = description.child("Organism")?;
                (
                    description.child_text("Title")?,
                    organism.as_ref().and_then(|o| o.attr("taxonomy_id")),
                    organism.as_ref().and_then(|o| o.attr("taxonomy_name")),
                )
            }
            None => (None, None, None),
        };

        let mut attributes = Vec::new();
        if let Some(block) = sample.child("Attributes")? {
            for attribute in block.children("Attribute")? {
                let Some(name) = attribute.attr("attribute_name") else {
                    continue;
                };
                attributes.push(BioSampleAttribute {
                    name,
                    harmonized_name: attribute.attr("harmonized_name"),
                    value: attribute.text(),
                });
            }
        }

        records.push(BioSampleRecord {
            accession,
            title,
            taxon_id,
            organism,
            geo_sample,
            sra_sample,
            attributes,
        });
    }
    Ok(records)
}
