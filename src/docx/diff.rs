use std::collections::HashSet;
use std::fmt;

use sha2::{Digest, Sha256};

use crate::docx::package::{Package, PartKind};
use crate::docx::xml::{event_hash, read_events};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PartStatus {
    Unchanged,
    /// Bytes differ but the XML event streams are equivalent.
    Reformatted,
    Modified,
    Added,
    Removed,
}

impl fmt::Display for PartStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unchanged => "unchanged",
            Self::Reformatted => "reformatted",
            Self::Modified => "modified",
            Self::Added => "added",
            Self::Removed => "removed",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartDiff {
    pub name: String,
    pub kind: PartKind,
    pub status: PartStatus,
}

fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn is_xml_part(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.ends_with(".xml") || lower.ends_with(".rels")
}

fn compare(name: &str, before: &[u8], after: &[u8]) -> PartStatus {
    if sha256_hex(before) == sha256_hex(after) {
        return PartStatus::Unchanged;
    }
    if is_xml_part(name) {
        if let (Ok(a), Ok(b)) = (read_events(name, before), read_events(name, after)) {
            if event_hash(&a) == event_hash(&b) {
                return PartStatus::Reformatted;
            }
        }
    }
    PartStatus::Modified
}

/// Compares two packages part by part: parts of `before` in archive order,
/// then parts only `after` has.
pub fn diff_packages(before: &Package, after: &Package) -> Vec<PartDiff> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();

    for name in before.part_names() {
        seen.insert(name.to_ascii_lowercase());
        let old = before.part(name).unwrap_or_default();
        let status = match after.part(name) {
            Some(new) => compare(name, old, new),
            None => PartStatus::Removed,
        };
        out.push(PartDiff {
            name: name.to_string(),
            kind: PartKind::of(name),
            status,
        });
    }
    for name in after.part_names() {
        if !seen.contains(&name.to_ascii_lowercase()) {
            out.push(PartDiff {
                name: name.to_string(),
                kind: PartKind::of(name),
                status: PartStatus::Added,
            });
        }
    }
    out
}
