//! Record construction and text helpers used by the website adapters and the
//! record importer.

use sha2::{Digest, Sha256};

use crate::types::{Meta, Record};

/// Fields that identify a record rather than describe it; never embedded.
const IDENTITY_FIELDS: [&str; 3] = ["_id", "index", "URL"];

/// Hex SHA-256 of the canonical URL, the document-store primary key.
pub fn record_index(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

impl Record {
    pub fn new(url: impl Into<String>, website: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            index: record_index(&url),
            url,
            website: website.into(),
            title: None,
            description: None,
            info: String::new(),
            metadata: Meta::new(),
        }
    }

    /// Text handed to the chunker: every descriptive field as `key: value`
    /// lines, `info` last.
    pub fn context_text(&self) -> String {
        let mut lines = Vec::new();
        if !self.website.is_empty() {
            lines.push(format!("website: {}", self.website));
        }
        if let Some(title) = &self.title {
            lines.push(format!("title: {title}"));
        }
        if let Some(description) = &self.description {
            lines.push(format!("description: {description}"));
        }
        for (key, value) in &self.metadata {
            if IDENTITY_FIELDS.contains(&key.as_str()) {
                continue;
            }
            lines.push(format!("{key}: {}", render_value(value)));
        }
        if !self.info.is_empty() {
            lines.push(format!("info: {}", self.info));
        }
        lines.join("\n")
    }

    /// Fills in what an adapter may have left out: the index from the URL and
    /// `info` from the description and text metadata. Existing values win.
    pub fn normalized(mut self) -> Self {
        if self.index.is_empty() {
            self.index = record_index(&self.url);
        }
        if self.info.trim().is_empty() {
            let mut parts: Vec<String> = self.description.iter().cloned().collect();
            parts.extend(
                self.metadata
                    .iter()
                    .filter(|(k, _)| !IDENTITY_FIELDS.contains(&k.as_str()))
                    .filter_map(|(_, v)| v.as_str().map(str::to_string)),
            );
            self.info = join_content(&parts);
        } else {
            self.info = clean_text(&self.info);
        }
        self
    }
}

fn render_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Replaces non-printable characters with spaces, collapses runs of
/// whitespace and trims.
pub fn clean_text(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Cleans each part and joins them with a space. With more than one part,
/// every non-empty part is terminated with punctuation first.
pub fn join_content<S: AsRef<str>>(parts: &[S]) -> String {
    let cleaned: Vec<String> = parts.iter().map(|p| clean_text(p.as_ref())).collect();
    if cleaned.len() <= 1 {
        return cleaned.into_iter().next().unwrap_or_default();
    }
    cleaned
        .into_iter()
        .filter(|s| !s.is_empty())
        .map(|s| match s.chars().last() {
            Some(c) if c.is_ascii_punctuation() => s,
            _ => format!("{s}."),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_is_sha256_of_url() {
        assert_eq!(
            record_index("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        let rec = Record::new("https://archive.ics.uci.edu/dataset/53/iris", "UCI");
        assert_eq!(rec.index.len(), 64);
    }

    #[test]
    fn clean_text_collapses_whitespace_and_controls() {
        assert_eq!(clean_text("  a\tb\r\n\nc\u{7}d  "), "a b c d");
    }

    #[test]
    fn join_content_adds_punctuation_between_parts() {
        assert_eq!(join_content(&["Iris data", "", "Three classes!"]), "Iris data. Three classes!");
        assert_eq!(join_content(&["single part"]), "single part");
        assert_eq!(join_content::<&str>(&[]), "");
    }

    #[test]
    fn context_skips_identity_fields() {
        let mut rec = Record::new("https://x", "Kaggle");
        rec.title = Some("Titanic".into());
        rec.info = "passenger list".into();
        rec.metadata.insert("_id".into(), serde_json::json!({"$oid": "1"}));
        rec.metadata.insert("License".into(), serde_json::json!("CC0"));
        assert_eq!(rec.context_text(), "website: Kaggle\ntitle: Titanic\nLicense: CC0\ninfo: passenger list");
    }

    #[test]
    fn normalized_derives_info() {
        let mut rec = Record::new("https://x", "UCI");
        rec.index.clear();
        rec.description = Some("Measurements of\n iris flowers".into());
        rec.metadata.insert("Variables".into(), serde_json::json!("sepal length"));
        let rec = rec.normalized();
        assert_eq!(rec.index, record_index("https://x"));
        assert_eq!(rec.info, "Measurements of iris flowers. sepal length.");
    }
}
