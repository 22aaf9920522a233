use serde::Serialize;

use crate::error::GeoHcaError;
use crate::providers::bioproject::Grant;
use crate::xml;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Author {
    pub last_name: String,
    pub fore_name: Option<String>,
    pub initials: Option<String>,
    pub affiliation: Option<String>,
}

impl Author {
    /// `First,Middle,Last` as the ingest template expects.
    pub fn contributor_name(&self) -> String {
        let mut parts = self
            .fore_name
            .as_deref()
            .unwrap_or("")
            .split_whitespace()
            .map(|part| part.to_string())
            .collect::<Vec<_>>();
        let first = if parts.is_empty() {
            String::new()
        } else {
            parts.remove(0)
        };
        format!("{},{},{}", first, parts.join(" "), self.last_name)
    }

    /// `Last Initials`, the citation style used in the publications tab.
    pub fn citation_name(&self) -> String {
        match self.initials.as_deref() {
            Some(initials) if !initials.is_empty() => format!("{} {}", self.last_name, initials),
            _ => self.last_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PubmedRecord {
    pub pmid: String,
    pub title: Option<String>,
    pub abstract_text: Option<String>,
    pub doi: Option<String>,
    pub authors: Vec<Author>,
    pub grants: Vec<Grant>,
}

impl PubmedRecord {
    pub fn url(&self) -> String {
        format!("https://pubmed.ncbi.nlm.nih.gov/{}", self.pmid)
    }
}

pub fn parse_pubmed(document: &str) -> Result<Option<PubmedRecord>, GeoHcaError> {
    let Some(article) = xml::elements(document, "PubmedArticle")?.into_iter().next() else {
        return Ok(None);
    };
    let Some(citation) = article.child("MedlineCitation")? else {
        return Ok(None);
    };
    let Some(pmid) = citation.child_text("PMID")? else {
        return Ok(None);
    };

    let mut record = PubmedRecord {
        pmid,
        ..PubmedRecord::default()
    };

    if let Some(body) = citation.child("Article")? {
        record.title = body.child_text("ArticleTitle")?;

        if let Some(abstract_block) = body.child("Abstract")? {
            let paragraphs = abstract_block
                .children("AbstractText")?
                .iter()
                .map(|paragraph| paragraph.text())
                .filter(|text| !text.is_empty())
                .collect::<Vec<_>>();
            if !paragraphs.is_empty() {
                record.abstract_text = Some(paragraphs.join(" "));
            }
        }

        if let Some(list) = body.child("AuthorList")? {
            for author in list.children("Author")? {
                let Some(last_name) = author.child_text("LastName")? else {
                    continue;
                };
                let affiliation = match author.child("AffiliationInfo")? {
                    Some(info) => info.child_text("Affiliation")?,
                    None => None,
                };
                record.authors.push(Author {
                    last_name,
                    fore_name: author.child_text("ForeName")?,
                    initials: author.child_text("Initials")?,
                    affiliation,
                });
            }
        }

        if let Some(list) = body.child("GrantList")? {
            for grant in list.children("Grant")? {
                let Some(id) = grant.child_text("GrantID")? else {
                    continue;
                };
                record.grants.push(Grant {
                    id,
                    agency: grant.child_text("Agency")?,
                });
            }
        }

        for location in body.children("ELocationID")? {
            if location.attr("EIdType").as_deref() == Some("doi") {
                record.doi = Some(location.text());
            }
        }
    }

    if let Some(data) = article.child("PubmedData")? {
        if let Some(list) = data.child("ArticleIdList")? {
            for id in list.children("ArticleId")? {
                if id.attr("IdType").as_deref() == Some("doi") {
                    record.doi = Some(id.text());
                }
            }
        }
    }

    Ok(Some(record))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contributor_name_splits_middle_names() {
        let author = Author {
            last_name: "Teichmann".to_string(),
            fore_name: Some("Sarah A".to_string()),
            initials: Some("SA".to_string()),
            affiliation: None,
        };
        assert_eq!(author.contributor_name(), "Sarah,A,Teichmann");
        assert_eq!(author.citation_name(), "Teichmann SA");
    }
}
