use std::collections::HashMap;
use std::path::Path;

use log::{debug, info, warn};

use crate::docx::apply::apply_text;
use crate::docx::ensure::{ensure_comments_part, DEFAULT_RELATIONSHIP_ID_BASE};
use crate::docx::extract::MainDocument;
use crate::docx::inject::{
    inject_comment, CommentIdAllocator, CommentStyle, DEFAULT_COMMENT_ID_DIGITS,
};
use crate::docx::model::{ParagraphAddress, TranslationModel, TranslationRecord};
use crate::docx::package::Package;
use crate::docx::tree::XmlElement;
use crate::error::Result;

pub const DEFAULT_ALERT_COLOR: &str = "FF0000";

#[derive(Clone, Debug)]
pub struct ReconstructOptions {
    /// Run color (hex RGB) for paragraphs that carry annotations.
    pub alert_color: String,
    pub comment_style: CommentStyle,
    pub comment_id_digits: u32,
    pub relationship_id_base: u32,
    /// Fixed seed for comment ids; random when unset.
    pub comment_id_seed: Option<u64>,
}

impl Default for ReconstructOptions {
    fn default() -> Self {
        Self {
            alert_color: DEFAULT_ALERT_COLOR.to_string(),
            comment_style: CommentStyle::default(),
            comment_id_digits: DEFAULT_COMMENT_ID_DIGITS,
            relationship_id_base: DEFAULT_RELATIONSHIP_ID_BASE,
            comment_id_seed: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReconstructReport {
    pub paragraphs_seen: usize,
    pub translated: usize,
    pub highlighted: usize,
    pub comments_added: usize,
    /// Translated paragraphs that had no text runs to rewrite.
    pub skipped_without_text: usize,
    /// Record ids that matched no paragraph of the document.
    pub unknown_ids: Vec<String>,
}

/// Re-opens `original`, applies `translations`, and writes the result to
/// `output`. Nothing is written when any step fails.
pub fn reconstruct(
    original: &Path,
    translations: &TranslationModel,
    output: &Path,
    opts: &ReconstructOptions,
) -> Result<ReconstructReport> {
    let pkg = Package::open(original)?;
    let (pkg, report) = reconstruct_package(pkg, translations, opts)?;
    pkg.save(output)?;
    info!("wrote {}", output.display());
    Ok(report)
}

pub fn reconstruct_package(
    mut pkg: Package,
    translations: &TranslationModel,
    opts: &ReconstructOptions,
) -> Result<(Package, ReconstructReport)> {
    let mut report = ReconstructReport::default();
    let mut trans_map: HashMap<ParagraphAddress, &TranslationRecord> = HashMap::new();
    for rec in &translations.paragraphs {
        match rec.address() {
            Some(addr) => {
                trans_map.insert(addr, rec);
            }
            None => report.unknown_ids.push(rec.id.clone()),
        }
    }

    let mut doc = MainDocument::load(&pkg)?;
    let mut comments = ensure_comments_part(&mut pkg, &doc.name, opts.relationship_id_base)?;
    let used = comments.used_ids.iter().cloned();
    let mut ids = match opts.comment_id_seed {
        Some(seed) => CommentIdAllocator::seeded(used, opts.comment_id_digits, seed),
        None => CommentIdAllocator::new(used, opts.comment_id_digits),
    };

    let ns = doc.ns.clone();
    let mut index = 0usize;
    let mut touched = false;
    doc.tree.root.visit_mut(&ns.q("p"), &mut |p: &mut XmlElement| {
        let addr = ParagraphAddress(index);
        index += 1;
        let Some(rec) = trans_map.get(&addr) else {
            return;
        };
        if rec.translated_text.is_empty() {
            return;
        }
        let is_warning = !rec.ai_generated_comments.is_empty();
        let color = is_warning.then_some(opts.alert_color.as_str());
        if !apply_text(p, &ns, &rec.translated_text, color) {
            debug!("{addr}: no text runs, left untouched");
            report.skipped_without_text += 1;
            return;
        }
        touched = true;
        report.translated += 1;
        if is_warning {
            report.highlighted += 1;
        }
        for note in &rec.ai_generated_comments {
            let id = inject_comment(p, &ns, &mut comments, &mut ids, note, &opts.comment_style);
            debug!("{addr}: comment {id}");
            report.comments_added += 1;
        }
    });
    report.paragraphs_seen = index;

    let mut unknown: Vec<String> = trans_map
        .iter()
        .filter(|(addr, _)| addr.index() >= index)
        .map(|(_, rec)| rec.id.clone())
        .collect();
    unknown.sort();
    report.unknown_ids.extend(unknown);
    if !report.unknown_ids.is_empty() {
        warn!(
            "ignored {} translation records with unknown ids: {}",
            report.unknown_ids.len(),
            report.unknown_ids.join(", ")
        );
    }

    if touched {
        ns.declare_attr_prefix(&mut doc.tree.root);
        pkg.set_part(&doc.name, doc.tree.to_bytes());
    }
    if comments.is_dirty() {
        comments.persist(&mut pkg);
    }
    info!(
        "translated {}/{} paragraphs, {} highlighted, {} comments added",
        report.translated, report.paragraphs_seen, report.highlighted, report.comments_added
    );
    Ok((pkg, report))
}
