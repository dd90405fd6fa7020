use std::collections::HashMap;

use crate::docx::model::CommentRecord;
use crate::docx::package::Package;
use crate::docx::tree::{Ns, XmlTree};
use crate::docx::W_NS;
use crate::error::Result;

/// Comments of a package in declaration order, addressable by id.
#[derive(Clone, Debug, Default)]
pub struct CommentTable {
    entries: Vec<CommentRecord>,
    by_id: HashMap<String, usize>,
}

impl CommentTable {
    pub fn from_tree(tree: &XmlTree) -> Self {
        let ns = Ns::resolve(&tree.root, W_NS, Some("w"));
        let mut table = Self::default();
        for comment in tree.root.descendants(&ns.q("comment")) {
            let Some(id) = comment.attr(&ns.a("id")).filter(|id| !id.is_empty()) else {
                continue;
            };
            table.insert(CommentRecord {
                id,
                author: comment.attr(&ns.a("author")),
                body: comment.leaf_text(&ns.q("t")),
            });
        }
        table
    }

    fn insert(&mut self, record: CommentRecord) {
        // A repeated id keeps its first position but takes the later content.
        match self.by_id.get(&record.id) {
            Some(&i) => self.entries[i] = record,
            None => {
                self.by_id.insert(record.id.clone(), self.entries.len());
                self.entries.push(record);
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&CommentRecord> {
        self.by_id.get(id).map(|&i| &self.entries[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &CommentRecord> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Loads the comments part; a package without one yields an empty table.
pub fn load_comment_table(pkg: &Package, comments_part: &str) -> Result<CommentTable> {
    Ok(match pkg.xml_part(comments_part)? {
        Some(tree) => CommentTable::from_tree(&tree),
        None => CommentTable::default(),
    })
}
