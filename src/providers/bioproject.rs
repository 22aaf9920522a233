use serde::Serialize;

use crate::error::GeoHcaError;
use crate::xml;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Grant {
    pub id: String,
    pub agency: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BioProjectRecord {
    pub accession: Option<String>,
    pub name: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub publication_ids: Vec<String>,
    pub grants: Vec<Grant>,
}

/// Parses the first project of a BioProject efetch document.
pub fn parse_bioproject(document: &str) -> Result<Option<BioProjectRecord>, GeoHcaError> {
    let Some(project) = xml::elements(document, "Project")?.into_iter().next() else {
        return Ok(None);
    };

    let accession = match project.child("ArchiveID")? {
        Some(archive) => archive.attr("accession"),
        None => None,
    };

    let mut record = BioProjectRecord {
        accession,
        ..BioProjectRecord::default()
    };

    if let Some(descr) = project.child("ProjectDescr")? {
        record.name = descr.child_text("Name")?;
        record.title = descr.child_text("Title")?;
        record.description = descr.child_text("Description")?;

        for grant in descr.children("Grant")? {
            let Some(id) = grant.attr("GrantId") else {
                continue;
            };
            record.grants.push(Grant {
                id,
                agency: grant.child_text("Agency")?,
            });
        }

        for publication in descr.children("Publication")? {
            let Some(id) = publication.attr("id") else {
                continue;
            };
            let is_pubmed = publication
                .child_text("DbType")?
                .map(|db| db.eq_ignore_ascii_case("ePubmed"))
                .unwrap_or_else(|| id.chars().all(|ch| ch.is_ascii_digit()));
            if is_pubmed && !record.publication_ids.contains(&id) {
                record.publication_ids.push(id);
            }
        }
    }

    Ok(Some(record))
}
