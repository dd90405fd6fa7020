mod common;

use std::collections::HashSet;

use docx_review::docx::diff::{diff_packages, PartStatus};
use docx_review::docx::model::{TranslationModel, TranslationRecord};
use docx_review::docx::package::Package;
use docx_review::{
    extract_paragraph_model, reconstruct, reconstruct_package, ReconstructOptions, ReviewError,
};

use common::{bare_docx, open, part_text, sample_docx, write_fixture, MEDIA};

fn record(id: &str, text: &str, notes: &[&str]) -> TranslationRecord {
    TranslationRecord {
        id: id.to_string(),
        translated_text: text.to_string(),
        ai_generated_comments: notes.iter().map(|s| s.to_string()).collect(),
    }
}

fn model(records: Vec<TranslationRecord>) -> TranslationModel {
    TranslationModel { paragraphs: records }
}

fn seeded() -> ReconstructOptions {
    ReconstructOptions {
        comment_id_seed: Some(2024),
        ..ReconstructOptions::default()
    }
}

fn assert_pass_through(before: &Package, after: &Package) {
    for d in diff_packages(before, after) {
        assert_eq!(d.status, PartStatus::Unchanged, "{} changed", d.name);
    }
    assert_eq!(after.part("word/media/image1.png"), Some(MEDIA));
}

#[test]
fn empty_translation_set_passes_everything_through() {
    let bytes = sample_docx();
    let (out, report) =
        reconstruct_package(open(&bytes), &TranslationModel::default(), &seeded()).expect("reconstruct");
    assert_eq!(report.translated, 0);
    assert_eq!(report.comments_added, 0);

    let reopened = open(&out.to_bytes().expect("serialize"));
    assert_pass_through(&open(&bytes), &reopened);
}

#[test]
fn unknown_paragraph_id_is_ignored() {
    let bytes = sample_docx();
    let translations = model(vec![record("para_999", "Nowhere.", &["never shown"])]);
    let (out, report) = reconstruct_package(open(&bytes), &translations, &seeded()).expect("reconstruct");
    assert_eq!(report.unknown_ids, vec!["para_999".to_string()]);
    assert_eq!(report.paragraphs_seen, 3);

    let reopened = open(&out.to_bytes().expect("serialize"));
    assert_pass_through(&open(&bytes), &reopened);
}

#[test]
fn flagged_paragraph_is_translated_highlighted_and_commented() {
    let body = r#"<w:p><w:r><w:t>Intro</w:t></w:r></w:p><w:p><w:r><w:rPr><w:b/></w:rPr><w:t>原文</w:t></w:r></w:p><w:p><w:r><w:t>Outro</w:t></w:r></w:p>"#;
    let dir = tempfile::tempdir().expect("tempdir");
    let input = write_fixture(dir.path(), "in.docx", &bare_docx(body));
    let output = dir.path().join("out.docx");

    let translations = model(vec![record(
        "para_001",
        "Translated.",
        &["Low confidence on term X"],
    )]);
    let report = reconstruct(&input, &translations, &output, &seeded()).expect("reconstruct");
    assert_eq!(report.translated, 1);
    assert_eq!(report.highlighted, 1);
    assert_eq!(report.comments_added, 1);

    let pkg = Package::open(&output).expect("reopen");
    let doc = part_text(&pkg, "word/document.xml");
    assert!(
        doc.contains(r#"<w:rPr><w:b/><w:color w:val="FF0000"/></w:rPr><w:t>Translated.</w:t>"#),
        "{doc}"
    );

    let extracted = extract_paragraph_model(&pkg).expect("extract");
    let p = extracted
        .paragraphs
        .iter()
        .find(|p| p.id == "para_001")
        .expect("para_001");
    assert_eq!(p.text, "Translated.");
    assert_eq!(p.comments.len(), 1);
    assert_eq!(p.comments[0].body, "[AI] Low confidence on term X");
    assert_eq!(p.comments[0].author.as_deref(), Some("AI"));

    let untouched = extracted
        .paragraphs
        .iter()
        .find(|p| p.id == "para_000")
        .expect("para_000");
    assert_eq!(untouched.text, "Intro");
}

#[test]
fn color_is_applied_only_with_annotations() {
    let bytes = sample_docx();
    let translations = model(vec![
        record("para_000", "Plain translation.", &[]),
        record("para_002", "Flagged translation.", &["check tense"]),
    ]);
    let (out, _) = reconstruct_package(open(&bytes), &translations, &seeded()).expect("reconstruct");
    let doc = part_text(&out, "word/document.xml");

    let first_p_end = doc.find("</w:p>").expect("first paragraph");
    let (first, rest) = doc.split_at(first_p_end);
    assert!(first.contains("Plain translation."), "{first}");
    assert!(!first.contains("w:color"), "{first}");

    let flagged_start = rest.rfind("<w:p>").expect("last paragraph");
    let flagged = &rest[flagged_start..];
    let colored_runs = flagged.matches(r#"<w:color w:val="FF0000"/>"#).count();
    let text_runs = flagged.matches("<w:t").count();
    assert_eq!(colored_runs, text_runs, "{flagged}");
}

#[test]
fn new_comment_ids_avoid_existing_ones() {
    let comments = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:comments xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:comment w:id="0"><w:p/></w:comment><w:comment w:id="1"><w:p/></w:comment><w:comment w:id="2"><w:p/></w:comment></w:comments>"#;
    let doc = common::document_xml(r#"<w:p><w:r><w:t>a</w:t></w:r></w:p><w:p><w:r><w:t>b</w:t></w:r></w:p>"#);
    let bytes = common::zip_parts(&[
        ("[Content_Types].xml", common::CONTENT_TYPES.as_bytes()),
        ("_rels/.rels", common::PACKAGE_RELS.as_bytes()),
        ("word/_rels/document.xml.rels", common::DOC_RELS.as_bytes()),
        ("word/document.xml", doc.as_bytes()),
        ("word/comments.xml", comments.as_bytes()),
    ]);
    let notes: Vec<String> = (0..20).map(|i| format!("note {i}")).collect();
    let note_refs: Vec<&str> = notes.iter().map(String::as_str).collect();
    let translations = model(vec![record("para_000", "A", &note_refs[..10]), record("para_001", "B", &note_refs[10..])]);

    let (out, report) = reconstruct_package(open(&bytes), &translations, &ReconstructOptions::default())
        .expect("reconstruct");
    assert_eq!(report.comments_added, 20);

    let extracted = extract_paragraph_model(&out).expect("extract");
    let mut ids = HashSet::new();
    for p in &extracted.paragraphs {
        for c in &p.comments {
            assert!(!["0", "1", "2"].contains(&c.id.as_str()), "reused id {}", c.id);
            assert!(ids.insert(c.id.clone()), "duplicate id {}", c.id);
        }
    }
    assert_eq!(ids.len(), 20);
}

#[test]
fn missing_comments_infrastructure_is_synthesized() {
    let body = r#"<w:p><w:r><w:t>Hello</w:t></w:r></w:p>"#;
    let translations = model(vec![record("para_000", "Bonjour", &["formal register?"])]);
    let (out, _) = reconstruct_package(open(&bare_docx(body)), &translations, &seeded()).expect("reconstruct");
    let out = open(&out.to_bytes().expect("serialize"));

    let rels = part_text(&out, "word/_rels/document.xml.rels");
    assert!(rels.contains(r#"Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/comments""#), "{rels}");
    assert!(rels.contains(r#"Id="rId1000""#), "{rels}");
    assert!(rels.contains(r#"Target="comments.xml""#), "{rels}");

    let types = part_text(&out, "[Content_Types].xml");
    assert!(types.contains(r#"PartName="/word/comments.xml""#), "{types}");
    assert!(types.contains("wordprocessingml.comments+xml"), "{types}");

    let comments = part_text(&out, "word/comments.xml");
    assert!(comments.contains("[AI] formal register?"), "{comments}");

    let extracted = extract_paragraph_model(&out).expect("extract");
    assert_eq!(extracted.paragraphs[0].comments.len(), 1);
}

#[test]
fn existing_comments_survive_injection() {
    let bytes = sample_docx();
    let translations = model(vec![record("para_001", "Traduit.", &["idiom"])]);
    let (out, _) = reconstruct_package(open(&bytes), &translations, &seeded()).expect("reconstruct");
    let extracted = extract_paragraph_model(&out).expect("extract");
    let p = &extracted.paragraphs[1];
    let bodies: Vec<&str> = p.comments.iter().map(|c| c.body.as_str()).collect();
    assert_eq!(bodies, vec!["This is a test comment.", "[AI] idiom"]);

    let diffs = diff_packages(&open(&bytes), &out);
    let status_of = |name: &str| diffs.iter().find(|d| d.name == name).map(|d| d.status);
    assert_eq!(status_of("word/styles.xml"), Some(PartStatus::Unchanged));
    assert_eq!(status_of("[Content_Types].xml"), Some(PartStatus::Unchanged));
    assert_eq!(status_of("word/_rels/document.xml.rels"), Some(PartStatus::Unchanged));
    assert_eq!(status_of("word/document.xml"), Some(PartStatus::Modified));
    assert_eq!(status_of("word/comments.xml"), Some(PartStatus::Modified));
}

#[test]
fn failed_reconstruction_writes_no_output() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = write_fixture(
        dir.path(),
        "broken.docx",
        &common::zip_parts(&[("word/document.xml", b"<w:document><w:body>".as_slice())]),
    );
    let output = dir.path().join("out.docx");
    let err = reconstruct(&input, &model(vec![record("para_000", "x", &[])]), &output, &seeded()).unwrap_err();
    assert!(matches!(err, ReviewError::Xml { .. }));
    assert!(!output.exists());
}

#[test]
fn blank_and_padded_annotations_are_kept_verbatim() {
    let body = r#"<w:p><w:r><w:t>First</w:t></w:r></w:p><w:p><w:r><w:t>Second</w:t></w:r></w:p>"#;
    let translations = TranslationModel::from_json_lenient(
        r#"{"paragraphs": [
            {"id": "para_000", "translated_text": "Erste", "ai_generated_comments": [""]},
            {"id": "para_001", "translated_text": "Zweite", "ai_generated_comments": ["  term X \n"]}
        ]}"#,
    )
    .expect("model");
    assert_eq!(translations.paragraphs[0].ai_generated_comments, vec![String::new()]);

    let (out, report) = reconstruct_package(open(&bare_docx(body)), &translations, &seeded()).expect("reconstruct");
    assert_eq!(report.highlighted, 2);
    assert_eq!(report.comments_added, 2);

    let doc = part_text(&out, "word/document.xml");
    assert_eq!(doc.matches(r#"<w:color w:val="FF0000"/>"#).count(), 2, "{doc}");

    let out = open(&out.to_bytes().expect("serialize"));
    let extracted = extract_paragraph_model(&out).expect("extract");
    let bodies: Vec<&str> = extracted
        .paragraphs
        .iter()
        .flat_map(|p| p.comments.iter().map(|c| c.body.as_str()))
        .collect();
    assert_eq!(bodies, vec!["[AI] ", "[AI]   term X \n"]);
}

#[test]
fn default_namespace_document_gets_prefixed_attributes() {
    let doc = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><document xmlns="{}"><body><p><r><t>Hello</t></r></p></body></document>"#,
        common::W_NS
    );
    let bytes = common::zip_parts(&[
        ("[Content_Types].xml", common::CONTENT_TYPES_NO_COMMENTS.as_bytes()),
        ("_rels/.rels", common::PACKAGE_RELS.as_bytes()),
        ("word/document.xml", doc.as_bytes()),
    ]);
    let translations = model(vec![record("para_000", "Hallo", &["tone"])]);
    let (out, report) = reconstruct_package(open(&bytes), &translations, &seeded()).expect("reconstruct");
    assert_eq!(report.comments_added, 1);

    let doc = part_text(&out, "word/document.xml");
    assert!(doc.contains(&format!(r#"xmlns:w="{}""#, common::W_NS)), "{doc}");
    assert!(doc.contains(r#"<color w:val="FF0000"/>"#), "{doc}");
    assert!(doc.contains("<commentReference w:id="), "{doc}");
    assert!(!doc.contains(" id="), "{doc}");

    let extracted = extract_paragraph_model(&open(&out.to_bytes().expect("serialize"))).expect("extract");
    assert_eq!(extracted.paragraphs[0].text, "Hallo");
    assert_eq!(extracted.paragraphs[0].comments[0].body, "[AI] tone");
}

#[test]
fn non_canonical_ids_are_unknown() {
    let bytes = sample_docx();
    let translations = model(vec![
        record("para_1", "short", &["x"]),
        record(" para_001 ", "padded", &[]),
        record("para_0001", "long", &[]),
    ]);
    let (out, report) = reconstruct_package(open(&bytes), &translations, &seeded()).expect("reconstruct");
    assert_eq!(report.translated, 0);
    assert_eq!(report.unknown_ids.len(), 3);

    let reopened = open(&out.to_bytes().expect("serialize"));
    assert_pass_through(&open(&bytes), &reopened);
}
