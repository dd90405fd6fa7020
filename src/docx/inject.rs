use std::collections::HashSet;

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::docx::ensure::CommentsPart;
use crate::docx::tree::{Ns, XmlElement};

pub const DEFAULT_COMMENT_ID_DIGITS: u32 = 5;
const MAX_RANDOM_ATTEMPTS: usize = 64;

/// Mints comment ids that collide neither with ids already in the package nor
/// with ids handed out earlier by the same allocator.
#[derive(Debug)]
pub struct CommentIdAllocator {
    used: HashSet<String>,
    digits: u32,
    rng: StdRng,
}

impl CommentIdAllocator {
    pub fn new(used: impl IntoIterator<Item = String>, digits: u32) -> Self {
        Self::with_rng(used, digits, StdRng::from_os_rng())
    }

    pub fn seeded(used: impl IntoIterator<Item = String>, digits: u32, seed: u64) -> Self {
        Self::with_rng(used, digits, StdRng::seed_from_u64(seed))
    }

    fn with_rng(used: impl IntoIterator<Item = String>, digits: u32, rng: StdRng) -> Self {
        let mut set = HashSet::new();
        for id in used {
            // "007" and "7" name the same decimal id.
            if let Ok(n) = id.trim().parse::<u64>() {
                set.insert(n.to_string());
            }
            set.insert(id);
        }
        Self {
            used: set,
            digits: digits.clamp(1, 9),
            rng,
        }
    }

    pub fn is_used(&self, id: &str) -> bool {
        self.used.contains(id)
    }

    /// Random id of up to `digits` digits; after repeated collisions falls
    /// back to the lowest free number.
    pub fn allocate(&mut self) -> String {
        let upper = 10u32.pow(self.digits);
        for _ in 0..MAX_RANDOM_ATTEMPTS {
            let candidate = self.rng.random_range(0..upper).to_string();
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
        }
        let mut n: u64 = 0;
        loop {
            let candidate = n.to_string();
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// Author metadata and body prefix of injected comments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommentStyle {
    pub author: String,
    pub initials: String,
    pub prefix: String,
}

impl Default for CommentStyle {
    fn default() -> Self {
        Self {
            author: "AI".to_string(),
            initials: "AI".to_string(),
            prefix: "[AI] ".to_string(),
        }
    }
}

/// Adds a comment carrying `annotation` to the comments part and anchors it
/// with a reference run appended to the end of `paragraph`.
///
/// The anchor is a point, not a range: no `commentRangeStart`/`End` markers
/// are written.
pub fn inject_comment(
    paragraph: &mut XmlElement,
    doc_ns: &Ns,
    comments: &mut CommentsPart,
    ids: &mut CommentIdAllocator,
    annotation: &str,
    style: &CommentStyle,
) -> String {
    let id = ids.allocate();
    let cns = comments.ns.clone();

    let body = format!("{}{}", style.prefix, annotation);
    let mut t = XmlElement::new(cns.q("t")).with_text(&body);
    if body.starts_with(char::is_whitespace) || body.ends_with(char::is_whitespace) {
        t.set_attr("xml:space", "preserve");
    }
    let mut entry = XmlElement::new(cns.q("comment"))
        .with_attr(&cns.a("id"), &id)
        .with_attr(&cns.a("author"), &style.author);
    if !style.initials.is_empty() {
        entry.set_attr(&cns.a("initials"), &style.initials);
    }
    let entry = entry.with_child(
        XmlElement::new(cns.q("p")).with_child(XmlElement::new(cns.q("r")).with_child(t)),
    );
    comments.append(entry);

    paragraph.push(
        XmlElement::new(doc_ns.q("r"))
            .with_child(XmlElement::new(doc_ns.q("commentReference")).with_attr(&doc_ns.a("id"), &id)),
    );
    debug!("injected comment {id} into {}", comments.name);
    id
}
