pub mod apply;
pub mod comments;
pub mod diff;
pub mod ensure;
pub mod extract;
pub mod inject;
pub mod model;
pub mod package;
pub mod reconstruct;
pub mod tree;
pub mod xml;

pub const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
pub const PACKAGE_REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
pub const CONTENT_TYPES_NS: &str = "http://schemas.openxmlformats.org/package/2006/content-types";

pub const OFFICE_DOCUMENT_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
pub const COMMENTS_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/comments";
pub const COMMENTS_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.comments+xml";

pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
pub const PACKAGE_RELS_PART: &str = "_rels/.rels";
pub const DEFAULT_DOCUMENT_PART: &str = "word/document.xml";

/// `word/document.xml` -> `word/_rels/document.xml.rels`.
pub fn rels_part_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

/// Resolves a relationship `Target` relative to the part owning the listing.
///
/// Absolute targets (`/word/x.xml`) are taken from the package root; `..`
/// segments are folded.
pub fn resolve_target(source_part: &str, target: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    let joined;
    let path = if let Some(abs) = target.strip_prefix('/') {
        abs
    } else {
        let dir = source_part.rsplit_once('/').map(|(d, _)| d).unwrap_or("");
        joined = if dir.is_empty() {
            target.to_string()
        } else {
            format!("{dir}/{target}")
        };
        joined.as_str()
    };
    for seg in path.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}

/// Inverse of [`resolve_target`] for parts that live in the same directory
/// tree as the source part.
pub fn relative_target(source_part: &str, target_part: &str) -> String {
    let dir = source_part.rsplit_once('/').map(|(d, _)| d).unwrap_or("");
    if dir.is_empty() {
        return target_part.to_string();
    }
    match target_part.strip_prefix(dir).and_then(|r| r.strip_prefix('/')) {
        Some(rel) => rel.to_string(),
        None => format!("/{target_part}"),
    }
}
