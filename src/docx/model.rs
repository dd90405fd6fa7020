use std::fmt;
use std::str::FromStr;

use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

static PARA_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^para_(\d+)$").expect("para id"));

/// Position of a paragraph among all `w:p` nodes of the main document, in
/// document order. Rendered as `para_000`, `para_001`, ...
///
/// Only stable while the document's paragraph structure is unchanged between
/// extraction and reconstruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ParagraphAddress(pub usize);

impl ParagraphAddress {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ParagraphAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "para_{:03}", self.0)
    }
}

impl FromStr for ParagraphAddress {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = PARA_ID_RE
            .captures(s)
            .ok_or_else(|| format!("not a paragraph id: {s}"))?;
        let addr = caps[1]
            .parse::<usize>()
            .map(Self)
            .map_err(|e| format!("paragraph index {s}: {e}"))?;
        // Records are keyed by the exact rendered id; "para_1" names nothing.
        if addr.to_string() != s {
            return Err(format!("non-canonical paragraph id: {s}"));
        }
        Ok(addr)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevisionKind {
    Insert,
    Delete,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionRecord {
    #[serde(rename = "type")]
    pub kind: RevisionKind,
    pub author: Option<String>,
    pub text: String,
    pub id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentRecord {
    pub id: String,
    pub author: Option<String>,
    pub body: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParagraphRecord {
    pub id: String,
    pub text: String,
    pub comments: Vec<CommentRecord>,
    pub revisions: Vec<RevisionRecord>,
}

/// What the extractor hands to the translator.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParagraphModel {
    pub paragraphs: Vec<ParagraphRecord>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationRecord {
    pub id: String,
    #[serde(default)]
    pub translated_text: String,
    #[serde(default)]
    pub ai_generated_comments: Vec<String>,
}

impl TranslationRecord {
    pub fn address(&self) -> Option<ParagraphAddress> {
        self.id.parse().ok()
    }
}

/// What the translator hands back to the reconstructor.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationModel {
    pub paragraphs: Vec<TranslationRecord>,
}

impl TranslationModel {
    /// Interprets an arbitrary JSON value as a translation model.
    ///
    /// Entries without a string `id` are dropped. A missing or non-string
    /// `translated_text` leaves the paragraph untranslated. Annotations may be
    /// plain strings or objects carrying `body` (or `text`) and are kept
    /// verbatim, blank ones included; anything else is ignored. Returns `None`
    /// when there is no `paragraphs` array at all.
    pub fn from_value_lenient(value: &Value) -> Option<Self> {
        let items = value.get("paragraphs")?.as_array()?;
        let mut paragraphs = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let Some(id) = item.get("id").and_then(Value::as_str) else {
                warn!("translation entry #{i} has no string id, ignored");
                continue;
            };
            let translated_text = item
                .get("translated_text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let ai_generated_comments = item
                .get("ai_generated_comments")
                .and_then(Value::as_array)
                .map(|notes| notes.iter().filter_map(annotation_text).collect())
                .unwrap_or_default();
            paragraphs.push(TranslationRecord {
                id: id.to_string(),
                translated_text,
                ai_generated_comments,
            });
        }
        Some(Self { paragraphs })
    }

    pub fn from_json_lenient(text: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(text).ok()?;
        Self::from_value_lenient(&value)
    }
}

fn annotation_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map
            .get("body")
            .or_else(|| map.get("text"))
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{ParagraphAddress, TranslationModel};

    #[test]
    fn address_formats_and_parses() {
        assert_eq!(ParagraphAddress(1).to_string(), "para_001");
        assert_eq!(ParagraphAddress(1234).to_string(), "para_1234");
        assert_eq!("para_042".parse::<ParagraphAddress>(), Ok(ParagraphAddress(42)));
        assert!("p1".parse::<ParagraphAddress>().is_err());
        assert!("para_".parse::<ParagraphAddress>().is_err());
        assert_eq!("para_1234".parse::<ParagraphAddress>(), Ok(ParagraphAddress(1234)));
        for alias in ["para_1", "para_0001", " para_001 ", "para_01"] {
            assert!(alias.parse::<ParagraphAddress>().is_err(), "{alias}");
        }
    }

    #[test]
    fn lenient_parse_tolerates_bad_entries() {
        let v = json!({
            "paragraphs": [
                {"id": "para_000", "translated_text": "Hello", "ai_generated_comments": ["check", {"body": "term X"}, 7, ""]},
                {"id": "para_001", "translated_text": 12},
                {"translated_text": "orphan"},
                {"id": "para_002", "ai_generated_comments": "not a list", "text": "ignored"}
            ]
        });
        let model = TranslationModel::from_value_lenient(&v).expect("model");
        assert_eq!(model.paragraphs.len(), 3);
        assert_eq!(model.paragraphs[0].ai_generated_comments, vec!["check", "term X", ""]);
        assert_eq!(model.paragraphs[1].translated_text, "");
        assert!(model.paragraphs[2].ai_generated_comments.is_empty());
    }

    #[test]
    fn lenient_parse_rejects_shapeless_input() {
        assert!(TranslationModel::from_json_lenient("not json").is_none());
        assert!(TranslationModel::from_json_lenient(r#"{"segments": []}"#).is_none());
        assert!(TranslationModel::from_json_lenient(r#"{"paragraphs": {}}"#).is_none());
    }

    #[test]
    fn paragraph_model_serializes_in_wire_shape() {
        use super::{ParagraphModel, ParagraphRecord, RevisionKind, RevisionRecord};
        let model = ParagraphModel {
            paragraphs: vec![ParagraphRecord {
                id: "para_000".into(),
                text: "a".into(),
                comments: vec![],
                revisions: vec![RevisionRecord {
                    kind: RevisionKind::Delete,
                    author: None,
                    text: "b".into(),
                    id: Some("2".into()),
                }],
            }],
        };
        let v = serde_json::to_value(&model).expect("json");
        assert_eq!(v["paragraphs"][0]["revisions"][0]["type"], "delete");
        assert!(v["paragraphs"][0]["revisions"][0]["author"].is_null());
    }
}
