//! Popup content for resource markers.
//!
//! [`compose`] is a pure function of a [`Place`] and the [`FieldCatalog`]; the
//! scroll box around the content is added when the document is rendered.

use crate::catalog::FieldCatalog;
use crate::types::Place;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Header {
    Plain(String),
    Linked { title: String, href: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupLine {
    pub alias: String,
    pub value: String,
}

impl fmt::Display for PopupLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.alias, self.value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupContent {
    pub header: Option<Header>,
    pub lines: Vec<PopupLine>,
}

impl PopupContent {
    pub fn to_html(&self) -> String {
        let mut html = String::new();
        match &self.header {
            Some(Header::Linked { title, href }) => {
                html.push_str(&format!(
                    "<div style='text-align:center;'><strong><a href='{}' target='_blank'>{}</a></strong></div><br>",
                    escape_html(href),
                    escape_html(title)
                ));
            }
            Some(Header::Plain(title)) => {
                html.push_str(&format!(
                    "<div style='text-align:center;'><strong>{}</strong></div><br>",
                    escape_html(title)
                ));
            }
            None => {}
        }
        for line in &self.lines {
            html.push_str(&format!(
                "<strong>{}:</strong> {}<br>",
                escape_html(&line.alias),
                escape_html(&line.value)
            ));
        }
        html
    }

    /// Text shown on marker hover: the title, if any.
    pub fn tooltip(&self) -> Option<&str> {
        match &self.header {
            Some(Header::Plain(title)) | Some(Header::Linked { title, .. }) => Some(title.as_str()),
            None => None,
        }
    }
}

pub fn compose(place: &Place, catalog: &FieldCatalog) -> PopupContent {
    let website = place
        .field(catalog.link_column())
        .filter(|w| !w.trim().is_empty());
    let header = place
        .name
        .as_deref()
        .filter(|n| !n.trim().is_empty())
        .map(|title| match website {
            Some(website) => Header::Linked {
                title: title.to_string(),
                href: link_target(website),
            },
            None => Header::Plain(title.to_string()),
        });

    // Catalog fields by rank, then unknown keys in insertion order
    let mut ordered: Vec<(Option<usize>, usize, &str, &str)> = place
        .fields
        .iter()
        .enumerate()
        .filter(|(_, (key, value))| key != catalog.title_column() && !value.trim().is_empty())
        .map(|(pos, (key, value))| (catalog.rank(key), pos, key.as_str(), value.as_str()))
        .collect();
    ordered.sort_by_key(|(rank, pos, _, _)| (rank.is_none(), *rank, *pos));

    let lines = ordered
        .into_iter()
        .map(|(_, _, key, value)| PopupLine {
            alias: catalog.alias(key).to_string(),
            value: value.to_string(),
        })
        .collect();

    PopupContent { header, lines }
}

fn link_target(website: &str) -> String {
    let website = website.trim();
    if website.contains("://") || website.starts_with("mailto:") {
        website.to_string()
    } else {
        format!("https://{}", website)
    }
}

pub(crate) fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
