//! Keeps the comments part, its relationship, and its content-type override
//! consistent with one another.
//!
//! All three structures are parsed and edited in memory first; the package is
//! only written once every edit succeeded, and only for parts that changed.

use std::collections::HashSet;

use log::{debug, warn};

use crate::docx::package::Package;
use crate::docx::tree::{Ns, XmlElement, XmlTree};
use crate::docx::{
    relative_target, rels_part_for, resolve_target, COMMENTS_CONTENT_TYPE, COMMENTS_REL_TYPE,
    CONTENT_TYPES_NS, CONTENT_TYPES_PART, PACKAGE_REL_NS, W_NS,
};
use crate::error::Result;

pub const DEFAULT_RELATIONSHIP_ID_BASE: u32 = 1000;

/// Hands out `rId{n}` identifiers not present in a relationship listing.
#[derive(Clone, Debug)]
pub struct RelIdAllocator {
    used: HashSet<String>,
    next: u32,
}

impl RelIdAllocator {
    pub fn new(used: impl IntoIterator<Item = String>, base: u32) -> Self {
        Self {
            used: used.into_iter().collect(),
            next: base,
        }
    }

    pub fn allocate(&mut self) -> String {
        loop {
            let candidate = format!("rId{}", self.next);
            self.next = self.next.saturating_add(1);
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}

/// The comments part, parsed and ready to receive new entries.
#[derive(Debug)]
pub struct CommentsPart {
    pub name: String,
    pub tree: XmlTree,
    pub ns: Ns,
    /// Comment ids already present in the part.
    pub used_ids: HashSet<String>,
    /// The part did not exist before and was synthesized.
    pub created: bool,
    pub entries_added: usize,
}

impl CommentsPart {
    pub fn append(&mut self, comment: XmlElement) {
        self.tree.root.push(comment);
        self.entries_added += 1;
    }

    pub fn is_dirty(&self) -> bool {
        self.created || self.entries_added > 0
    }

    pub fn persist(&mut self, pkg: &mut Package) {
        self.ns.declare_attr_prefix(&mut self.tree.root);
        pkg.set_part(&self.name, self.tree.to_bytes());
    }
}

fn default_comments_part(document_part: &str) -> String {
    resolve_target(document_part, "comments.xml")
}

fn relationship_listing(pkg: &Package, rels_name: &str) -> Result<(XmlTree, bool)> {
    Ok(match pkg.xml_part(rels_name)? {
        Some(tree) => (tree, false),
        None => {
            let root = XmlElement::new("Relationships").with_attr("xmlns", PACKAGE_REL_NS);
            (XmlTree::new(rels_name, root), true)
        }
    })
}

fn comments_relationships<'a>(rels: &'a XmlTree, ns: &Ns) -> Vec<&'a XmlElement> {
    rels.root
        .elements()
        .filter(|e| ns.is(&e.name, "Relationship"))
        .filter(|e| e.attr("Type").as_deref() == Some(COMMENTS_REL_TYPE))
        .collect()
}

/// Path of the comments part for `document_part`: the target of its comments
/// relationship when there is one, else `comments.xml` next to the document.
pub fn comments_part_name(pkg: &Package, document_part: &str) -> Result<String> {
    let rels_name = rels_part_for(document_part);
    let rels = match pkg.xml_part(&rels_name) {
        Ok(Some(tree)) => tree,
        Ok(None) => return Ok(default_comments_part(document_part)),
        Err(e) => {
            warn!("ignoring unreadable {rels_name}: {e}");
            return Ok(default_comments_part(document_part));
        }
    };
    let ns = Ns::resolve(&rels.root, PACKAGE_REL_NS, None);
    Ok(comments_relationships(&rels, &ns)
        .first()
        .and_then(|r| r.attr("Target"))
        .map(|t| resolve_target(document_part, &t))
        .unwrap_or_else(|| default_comments_part(document_part)))
}

/// Guarantees that `document_part` has exactly one comments relationship,
/// that the target part exists, and that `[Content_Types].xml` declares it.
pub fn ensure_comments_part(
    pkg: &mut Package,
    document_part: &str,
    relationship_id_base: u32,
) -> Result<CommentsPart> {
    let rels_name = rels_part_for(document_part);
    let (mut rels, mut rels_changed) = relationship_listing(pkg, &rels_name)?;
    let rel_ns = Ns::resolve(&rels.root, PACKAGE_REL_NS, None);

    let existing = comments_relationships(&rels, &rel_ns);
    let comments_name = match existing.first().and_then(|r| r.attr("Target")) {
        Some(t) => resolve_target(document_part, &t),
        None => default_comments_part(document_part),
    };
    let existing_count = existing.len();

    if existing_count > 1 {
        warn!("{rels_name}: dropping {} duplicate comments relationships", existing_count - 1);
        let mut kept = false;
        rels.root.remove_where(|e| {
            if !rel_ns.is(&e.name, "Relationship")
                || e.attr("Type").as_deref() != Some(COMMENTS_REL_TYPE)
            {
                return false;
            }
            if kept {
                return true;
            }
            kept = true;
            false
        });
        rels_changed = true;
    } else if existing_count == 0 {
        let used = rels
            .root
            .elements()
            .filter(|e| rel_ns.is(&e.name, "Relationship"))
            .filter_map(|e| e.attr("Id"));
        let rel_id = RelIdAllocator::new(used, relationship_id_base).allocate();
        debug!("{rels_name}: adding comments relationship {rel_id}");
        rels.root.push(
            XmlElement::new(rel_ns.q("Relationship"))
                .with_attr("Id", &rel_id)
                .with_attr("Type", COMMENTS_REL_TYPE)
                .with_attr("Target", &relative_target(document_part, &comments_name)),
        );
        rels_changed = true;
    }

    let (mut types, mut types_changed) = match pkg.xml_part(CONTENT_TYPES_PART)? {
        Some(tree) => (tree, false),
        None => {
            let root = XmlElement::new("Types").with_attr("xmlns", CONTENT_TYPES_NS);
            (XmlTree::new(CONTENT_TYPES_PART, root), true)
        }
    };
    let ct_ns = Ns::resolve(&types.root, CONTENT_TYPES_NS, None);
    let part_name = format!("/{comments_name}");
    let override_el = types.root.elements_mut().find(|e| {
        ct_ns.is(&e.name, "Override")
            && e.attr("PartName")
                .is_some_and(|p| p.eq_ignore_ascii_case(&part_name))
    });
    match override_el {
        Some(el) => {
            if el.attr("ContentType").as_deref() != Some(COMMENTS_CONTENT_TYPE) {
                el.set_attr("ContentType", COMMENTS_CONTENT_TYPE);
                types_changed = true;
            }
        }
        None => {
            types.root.push(
                XmlElement::new(ct_ns.q("Override"))
                    .with_attr("PartName", &part_name)
                    .with_attr("ContentType", COMMENTS_CONTENT_TYPE),
            );
            types_changed = true;
        }
    }

    let (tree, created) = match pkg.xml_part(&comments_name)? {
        Some(tree) => (tree, false),
        None => {
            let root = XmlElement::new("w:comments").with_attr("xmlns:w", W_NS);
            (XmlTree::new(&comments_name, root), true)
        }
    };
    let ns = Ns::resolve(&tree.root, W_NS, Some("w"));
    let id_attr = ns.a("id");
    let used_ids: HashSet<String> = tree
        .root
        .descendants(&ns.q("comment"))
        .into_iter()
        .filter_map(|c| c.attr(&id_attr))
        .collect();

    if rels_changed {
        pkg.set_part(&rels_name, rels.to_bytes());
    }
    if types_changed {
        pkg.set_part(CONTENT_TYPES_PART, types.to_bytes());
    }
    if created {
        pkg.set_part(&comments_name, tree.to_bytes());
    }
    debug!(
        "comments part {comments_name}: {} existing ids, created={created}",
        used_ids.len()
    );

    Ok(CommentsPart {
        name: comments_name,
        tree,
        ns,
        used_ids,
        created,
        entries_added: 0,
    })
}
