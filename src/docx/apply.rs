use crate::docx::tree::{Ns, XmlElement, XmlNode};

/// `w:rPr` children that the schema orders after `w:color`.
const RPR_AFTER_COLOR: &[&str] = &[
    "spacing",
    "w",
    "kern",
    "position",
    "sz",
    "szCs",
    "highlight",
    "u",
    "effect",
    "bdr",
    "shd",
    "fitText",
    "vertAlign",
    "rtl",
    "cs",
    "em",
    "lang",
    "eastAsianLayout",
    "specVanish",
    "oMath",
    "rPrChange",
];

const THEME_COLOR_ATTRS: &[&str] = &["themeColor", "themeShade", "themeTint"];

/// Splits `text` into `n` contiguous slices of `len / n` chars, the first
/// `len % n` slices taking one extra char.
pub fn split_evenly(text: &str, n: usize) -> Vec<String> {
    if n == 0 {
        return Vec::new();
    }
    let chars: Vec<char> = text.chars().collect();
    let base = chars.len() / n;
    let extra = chars.len() % n;
    let mut out = Vec::with_capacity(n);
    let mut pos = 0usize;
    for i in 0..n {
        let take = base + usize::from(i < extra);
        out.push(chars[pos..pos + take].iter().collect());
        pos += take;
    }
    out
}

/// Replaces the visible text of `paragraph` across its existing `w:t` leaves.
///
/// Returns `false` (and changes nothing) when the paragraph has no text
/// leaves. With `color`, every run owning a rewritten leaf gets that color.
pub fn apply_text(paragraph: &mut XmlElement, ns: &Ns, new_text: &str, color: Option<&str>) -> bool {
    let t_name = ns.q("t");
    let leaf_count = paragraph.descendants(&t_name).len();
    if leaf_count == 0 {
        return false;
    }

    let mut slices = split_evenly(new_text, leaf_count).into_iter();
    let mut assigned = 0usize;
    rewrite_leaves(paragraph, ns, &t_name, &mut slices, color, &mut assigned);

    let total = new_text.chars().count();
    if assigned < total {
        let rest: String = new_text.chars().skip(assigned).collect();
        paragraph.push(text_run(ns, &rest, color));
    }
    true
}

fn rewrite_leaves(
    el: &mut XmlElement,
    ns: &Ns,
    t_name: &str,
    slices: &mut dyn Iterator<Item = String>,
    color: Option<&str>,
    assigned: &mut usize,
) {
    let mut owns_leaf = false;
    for child in el.elements_mut() {
        if child.name == t_name {
            let piece = slices.next().unwrap_or_default();
            *assigned += piece.chars().count();
            set_leaf_text(child, &piece);
            owns_leaf = true;
        } else {
            rewrite_leaves(child, ns, t_name, slices, color, assigned);
        }
    }
    if let Some(color) = color {
        if owns_leaf && ns.is(&el.name, "r") {
            set_run_color(el, ns, color);
        }
    }
}

fn set_leaf_text(leaf: &mut XmlElement, text: &str) {
    leaf.set_text(text);
    let edge_space = text.starts_with(char::is_whitespace) || text.ends_with(char::is_whitespace);
    if edge_space {
        leaf.set_attr("xml:space", "preserve");
    }
}

/// Ensures `run` has `w:rPr/w:color` set to `color`, reusing an existing
/// color element.
pub fn set_run_color(run: &mut XmlElement, ns: &Ns, color: &str) {
    let rpr = run.child_or_insert(&ns.q("rPr"), 0);
    let color_name = ns.q("color");
    let val = ns.a("val");

    if let Some(existing) = rpr.child_mut(&color_name) {
        let theme: Vec<String> = THEME_COLOR_ATTRS.iter().map(|a| ns.a(a)).collect();
        existing.attrs.retain(|(k, _)| !theme.contains(k));
        existing.set_attr(&val, color);
        return;
    }

    let pos = rpr
        .children
        .iter()
        .position(|c| {
            matches!(c, XmlNode::Element(e) if RPR_AFTER_COLOR.iter().any(|l| ns.is(&e.name, l)))
        })
        .unwrap_or(rpr.children.len());
    rpr.insert(pos, XmlElement::new(color_name).with_attr(&val, color));
}

fn text_run(ns: &Ns, text: &str, color: Option<&str>) -> XmlElement {
    let mut t = XmlElement::new(ns.q("t"));
    set_leaf_text(&mut t, text);
    let mut run = XmlElement::new(ns.q("r")).with_child(t);
    if let Some(color) = color {
        set_run_color(&mut run, ns, color);
    }
    run
}
