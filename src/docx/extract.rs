use std::collections::HashSet;
use std::path::Path;

use log::{debug, info};

use crate::docx::comments::{load_comment_table, CommentTable};
use crate::docx::ensure::comments_part_name;
use crate::docx::model::{
    ParagraphAddress, ParagraphModel, ParagraphRecord, RevisionKind, RevisionRecord,
};
use crate::docx::package::Package;
use crate::docx::tree::{Ns, XmlElement, XmlTree};
use crate::docx::W_NS;
use crate::error::{Result, ReviewError};

/// The main document part of a package, parsed, with its namespace handle.
pub struct MainDocument {
    pub name: String,
    pub tree: XmlTree,
    pub ns: Ns,
}

impl MainDocument {
    pub fn load(pkg: &Package) -> Result<Self> {
        let name = pkg.main_document_name()?;
        let tree = pkg
            .xml_part(&name)?
            .ok_or_else(|| ReviewError::MissingDocumentPart(name.clone()))?;
        let ns = Ns::resolve(&tree.root, W_NS, Some("w"));
        Ok(Self { name, tree, ns })
    }

    /// Every `w:p` in document order, nested paragraphs included.
    pub fn paragraphs(&self) -> Vec<(ParagraphAddress, &XmlElement)> {
        self.tree
            .root
            .descendants(&self.ns.q("p"))
            .into_iter()
            .enumerate()
            .map(|(i, p)| (ParagraphAddress(i), p))
            .collect()
    }
}

pub fn parse_document(path: &Path) -> Result<ParagraphModel> {
    let pkg = Package::open(path)?;
    extract_paragraph_model(&pkg)
}

pub fn extract_paragraph_model(pkg: &Package) -> Result<ParagraphModel> {
    let doc = MainDocument::load(pkg)?;
    let comments_part = comments_part_name(pkg, &doc.name)?;
    let comments = load_comment_table(pkg, &comments_part)?;
    debug!("{} comments in {}", comments.len(), comments_part);

    let mut paragraphs = Vec::new();
    let mut total = 0usize;
    for (addr, p) in doc.paragraphs() {
        total += 1;
        if let Some(rec) = paragraph_record(addr, p, &doc.ns, &comments) {
            paragraphs.push(rec);
        }
    }
    info!(
        "extracted {} of {} paragraphs from {}",
        paragraphs.len(),
        total,
        doc.name
    );
    Ok(ParagraphModel { paragraphs })
}

fn paragraph_record(
    addr: ParagraphAddress,
    p: &XmlElement,
    ns: &Ns,
    comments: &CommentTable,
) -> Option<ParagraphRecord> {
    let t = ns.q("t");
    let text = p.leaf_text(&t);

    let mut revisions = Vec::new();
    for ins in p.descendants(&ns.q("ins")) {
        revisions.push(revision(RevisionKind::Insert, ins, ns, ins.leaf_text(&t)));
    }
    let del_text = ns.q("delText");
    for del in p.descendants(&ns.q("del")) {
        revisions.push(revision(RevisionKind::Delete, del, ns, del.leaf_text(&del_text)));
    }

    let id_attr = ns.a("id");
    let mut seen: HashSet<String> = HashSet::new();
    let mut resolved = Vec::new();
    for reference in p.descendants(&ns.q("commentReference")) {
        let Some(id) = reference.attr(&id_attr) else {
            continue;
        };
        let Some(comment) = comments.get(&id) else {
            continue;
        };
        if seen.insert(id) {
            resolved.push(comment.clone());
        }
    }

    if text.trim().is_empty() && revisions.is_empty() && resolved.is_empty() {
        return None;
    }
    Some(ParagraphRecord {
        id: addr.to_string(),
        text,
        comments: resolved,
        revisions,
    })
}

fn revision(kind: RevisionKind, el: &XmlElement, ns: &Ns, text: String) -> RevisionRecord {
    RevisionRecord {
        kind,
        author: el.attr(&ns.a("author")),
        text,
        id: el.attr(&ns.a("id")),
    }
}
