//! Shared fixtures: small .docx packages assembled in memory.
#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use docx_review::docx::package::Package;

pub const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

pub const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
  <Default Extension="png" ContentType="image/png"/>
  <Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
  <Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/>
  <Override PartName="/word/comments.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.comments+xml"/>
</Types>"#;

pub const CONTENT_TYPES_NO_COMMENTS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
  <Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
</Types>"#;

pub const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
</Relationships>"#;

pub const DOC_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/comments" Target="comments.xml"/>
</Relationships>"#;

pub const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:docDefaults><w:rPrDefault><w:rPr><w:lang w:val="en-US"/></w:rPr></w:rPrDefault></w:docDefaults></w:styles>"#;

pub const DOCUMENT: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p>
      <w:r><w:t>This is a standard paragraph.</w:t></w:r>
    </w:p>
    <w:p>
      <w:r><w:t>This paragraph has a comment.</w:t></w:r>
      <w:commentRangeStart w:id="0"/>
      <w:r><w:t>Check this.</w:t></w:r>
      <w:commentRangeEnd w:id="0"/>
      <w:r>
        <w:commentReference w:id="0"/>
      </w:r>
    </w:p>
    <w:p>
      <w:r><w:t>This line has </w:t></w:r>
      <w:ins w:id="1" w:author="Author1" w:date="2023-01-01T10:00:00Z">
        <w:r><w:t>inserted</w:t></w:r>
      </w:ins>
      <w:del w:id="2" w:author="Author2" w:date="2023-01-01T10:00:00Z">
        <w:r><w:delText>deleted</w:delText></w:r>
      </w:del>
      <w:r><w:t> text.</w:t></w:r>
    </w:p>
  </w:body>
</w:document>"#;

pub const COMMENTS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:comments xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:comment w:id="0" w:author="TestAuthor" w:date="2023-01-01T10:00:00Z" w:initials="TA">
    <w:p><w:r><w:t>This is a test comment.</w:t></w:r></w:p>
  </w:comment>
</w:comments>"#;

/// Not a real image; only its bytes matter.
pub const MEDIA: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0, 0, 0, 13, 0xff, 0x00];

/// Zips `parts` in the given order. Media parts are stored, XML deflated.
pub fn zip_parts(parts: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zw = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in parts {
        let method = if name.ends_with(".png") {
            CompressionMethod::Stored
        } else {
            CompressionMethod::Deflated
        };
        let opts = SimpleFileOptions::default().compression_method(method);
        zw.start_file(*name, opts).expect("start entry");
        zw.write_all(data).expect("write entry");
    }
    zw.finish().expect("finish zip").into_inner()
}

/// Three paragraphs (plain, commented, tracked changes), a comments part,
/// styles, and a media part.
pub fn sample_docx() -> Vec<u8> {
    zip_parts(&[
        ("[Content_Types].xml", CONTENT_TYPES.as_bytes()),
        ("_rels/.rels", PACKAGE_RELS.as_bytes()),
        ("word/_rels/document.xml.rels", DOC_RELS.as_bytes()),
        ("word/document.xml", DOCUMENT.as_bytes()),
        ("word/styles.xml", STYLES.as_bytes()),
        ("word/comments.xml", COMMENTS.as_bytes()),
        ("word/media/image1.png", MEDIA),
    ])
}

/// Wraps `body` (the inside of `w:body`) in a minimal document.
pub fn document_xml(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="{W_NS}"><w:body>{body}</w:body></w:document>"#
    )
}

/// A package with only content types, package rels, and the given body: no
/// document rels and no comments part.
pub fn bare_docx(body: &str) -> Vec<u8> {
    let doc = document_xml(body);
    zip_parts(&[
        ("[Content_Types].xml", CONTENT_TYPES_NO_COMMENTS.as_bytes()),
        ("_rels/.rels", PACKAGE_RELS.as_bytes()),
        ("word/document.xml", doc.as_bytes()),
    ])
}

pub fn write_fixture(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).expect("write fixture");
    path
}

pub fn open(bytes: &[u8]) -> Package {
    Package::from_bytes(bytes).expect("open package")
}

pub fn part_text(pkg: &Package, name: &str) -> String {
    let bytes = pkg.part(name).unwrap_or_else(|| panic!("missing part {name}"));
    String::from_utf8(bytes.to_vec()).expect("utf8 part")
}
