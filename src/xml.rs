//! Minimal element scanner for the NCBI efetch documents.
//!
//! The documents handled here (SRA experiment packages, BioSample,
//! BioProject, PubMed) never nest an element inside another element of the
//! same name, so a start tag is paired with the next matching end tag.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::error::GeoHcaError;

static ATTRIBUTE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z_][\w:.-]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).ok()
});

static ENTITY: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"&(?:#([0-9]+)|#[xX]([0-9a-fA-F]+)|(lt|gt|quot|apos|amp));").ok()
});

#[derive(Debug, Clone, Copy)]
pub struct Element<'a> {
    attrs: &'a str,
    body: &'a str,
}

impl<'a> Element<'a> {
    pub fn attr(&self, name: &str) -> Option<String> {
        ATTRIBUTE
            .as_ref()?
            .captures_iter(self.attrs)
            .find(|caps| &caps[1] == name)
            .and_then(|caps| caps.get(2).or_else(|| caps.get(3)))
            .map(|value| unescape(value.as_str()))
    }

    pub fn body(&self) -> &'a str {
        self.body
    }

    /// Text content with nested markup removed.
    pub fn text(&self) -> String {
        strip_tags(self.body)
    }

    pub fn children(&self, tag: &str) -> Result<Vec<Element<'a>>, GeoHcaError> {
        elements(self.body, tag)
    }

    pub fn child(&self, tag: &str) -> Result<Option<Element<'a>>, GeoHcaError> {
        Ok(elements(self.body, tag)?.into_iter().next())
    }

    pub fn child_text(&self, tag: &str) -> Result<Option<String>, GeoHcaError> {
        Ok(self
            .child(tag)?
            .map(|element| element.text())
            .filter(|value| !value.is_empty()))
    }
}

pub fn elements<'a>(text: &'a str, tag: &str) -> Result<Vec<Element<'a>>, GeoHcaError> {
    let open = Regex::new(&format!(r"<{}(\s[^>]*?)?(/?)>", regex::escape(tag)))
        .map_err(|err| GeoHcaError::Xml(err.to_string()))?;
    let close = format!("</{tag}>");

    let mut out = Vec::new();
    let mut pos = 0;
    while let Some(caps) = open.captures_at(text, pos) {
        let Some(whole) = caps.get(0) else {
            break;
        };
        let attrs = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        let self_closing = caps.get(2).map(|m| !m.as_str().is_empty()).unwrap_or(false);
        if self_closing {
            out.push(Element { attrs, body: "" });
            pos = whole.end();
            continue;
        }
        let Some(offset) = text[whole.end()..].find(&close) else {
            break;
        };
        let body_end = whole.end() + offset;
        out.push(Element {
            attrs,
            body: &text[whole.end()..body_end],
        });
        pos = body_end + close.len();
    }
    Ok(out)
}

pub fn strip_tags(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut in_tag = false;
    for ch in value.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    unescape(out.trim())
}

/// Decodes the predefined entities and numeric character references in one
/// pass, so `&amp;#233;` stays `&#233;`. Invalid code points are kept as
/// written.
pub fn unescape(value: &str) -> String {
    let Some(entity) = ENTITY.as_ref().filter(|_| value.contains('&')) else {
        return value.to_string();
    };
    entity
        .replace_all(value, |caps: &Captures<'_>| {
            let decoded = if let Some(dec) = caps.get(1) {
                dec.as_str().parse::<u32>().ok().and_then(char::from_u32)
            } else if let Some(hex) = caps.get(2) {
                u32::from_str_radix(hex.as_str(), 16)
                    .ok()
                    .and_then(char::from_u32)
            } else {
                match caps.get(3).map(|name| name.as_str()) {
                    Some("lt") => Some('<'),
                    Some("gt") => Some('>'),
                    Some("quot") => Some('"'),
                    Some("apos") => Some('\''),
                    Some("amp") => Some('&'),
                    _ => None,
                }
            };
            decoded
                .map(String::from)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}
