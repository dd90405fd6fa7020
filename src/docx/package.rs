use std::fs::File;
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;

use log::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::docx::tree::{Ns, XmlTree};
use crate::docx::{
    resolve_target, CONTENT_TYPES_PART, DEFAULT_DOCUMENT_PART, OFFICE_DOCUMENT_REL_TYPE,
    PACKAGE_RELS_PART, PACKAGE_REL_NS,
};
use crate::error::{Result, ReviewError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PartKind {
    ContentTypes,
    Relationships,
    Content,
}

impl PartKind {
    pub fn of(name: &str) -> Self {
        if name.eq_ignore_ascii_case(CONTENT_TYPES_PART) {
            Self::ContentTypes
        } else if name.to_ascii_lowercase().ends_with(".rels") {
            Self::Relationships
        } else {
            Self::Content
        }
    }
}

/// An OPC package held in memory: every zip entry, in archive order.
#[derive(Clone)]
pub struct Package {
    entries: Vec<PartEntry>,
}

#[derive(Clone)]
struct PartEntry {
    name: String,
    data: Vec<u8>,
    compression: CompressionMethod,
    last_modified: zip::DateTime,
    unix_mode: Option<u32>,
    is_dir: bool,
    modified: bool,
}

impl Package {
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ReviewError::NoInput(path.to_path_buf()));
        }
        let f = File::open(path)?;
        Self::from_reader(f)
            .map_err(|e| ReviewError::CorruptArchive(format!("{}: {e}", path.display())))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_reader(Cursor::new(bytes)).map_err(|e| ReviewError::CorruptArchive(e.to_string()))
    }

    fn from_reader<R: Read + Seek>(reader: R) -> std::result::Result<Self, String> {
        let mut zip = ZipArchive::new(reader).map_err(|e| format!("read zip: {e}"))?;
        let mut entries = Vec::with_capacity(zip.len());
        for i in 0..zip.len() {
            let mut file = zip.by_index(i).map_err(|e| format!("zip entry #{i}: {e}"))?;
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)
                .map_err(|e| format!("read zip entry {}: {e}", file.name()))?;
            entries.push(PartEntry {
                name: file.name().to_string(),
                data,
                compression: file.compression(),
                last_modified: file.last_modified().unwrap_or_default(),
                unix_mode: file.unix_mode(),
                is_dir: file.is_dir(),
                modified: false,
            });
        }
        Ok(Self { entries })
    }

    fn find(&self, name: &str) -> Option<usize> {
        let name = name.trim_start_matches('/');
        self.entries
            .iter()
            .position(|e| e.name == name)
            .or_else(|| {
                self.entries
                    .iter()
                    .position(|e| e.name.eq_ignore_ascii_case(name))
            })
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.find(name)
            .filter(|&i| !self.entries[i].is_dir)
            .map(|i| self.entries[i].data.as_slice())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.part(name).is_some()
    }

    /// Parses a part as XML; `Ok(None)` when the part does not exist.
    pub fn xml_part(&self, name: &str) -> Result<Option<XmlTree>> {
        match self.part(name) {
            Some(bytes) => XmlTree::parse(name, bytes).map(Some),
            None => Ok(None),
        }
    }

    /// Replaces the content of `name`, or appends a new deflated entry.
    pub fn set_part(&mut self, name: &str, data: Vec<u8>) {
        match self.find(name) {
            Some(i) => {
                let ent = &mut self.entries[i];
                ent.data = data;
                ent.modified = true;
            }
            None => self.entries.push(PartEntry {
                name: name.trim_start_matches('/').to_string(),
                data,
                compression: CompressionMethod::Deflated,
                last_modified: zip::DateTime::default(),
                unix_mode: None,
                is_dir: false,
                modified: true,
            }),
        }
    }

    pub fn is_modified(&self, name: &str) -> bool {
        self.find(name).is_some_and(|i| self.entries[i].modified)
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|e| !e.is_dir)
            .map(|e| e.name.as_str())
    }

    /// Name of the main document part, from the package relationships.
    pub fn main_document_name(&self) -> Result<String> {
        let Some(rels) = self.xml_part(PACKAGE_RELS_PART)? else {
            return Ok(DEFAULT_DOCUMENT_PART.to_string());
        };
        let ns = Ns::resolve(&rels.root, PACKAGE_REL_NS, None);
        let target = rels
            .root
            .elements()
            .filter(|e| ns.is(&e.name, "Relationship"))
            .find(|e| e.attr("Type").as_deref() == Some(OFFICE_DOCUMENT_REL_TYPE))
            .and_then(|e| e.attr("Target"));
        Ok(match target {
            Some(t) => resolve_target("", &t),
            None => DEFAULT_DOCUMENT_PART.to_string(),
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::new());
        self.write_to(&mut cursor)?;
        Ok(cursor.into_inner())
    }

    /// Writes the package to `path` through a temporary sibling file, so a
    /// failure never leaves a partial archive at the destination.
    pub fn save(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(d) if !d.as_os_str().is_empty() => d,
            _ => Path::new("."),
        };
        let mut builder = tempfile::Builder::new();
        builder.prefix(".docx-review").suffix(".tmp");
        // Temp files default to 0600; the output gets the mode File::create would give.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            builder.permissions(std::fs::Permissions::from_mode(0o666));
        }
        let mut tmp = builder.tempfile_in(dir)?;
        self.write_to(tmp.as_file_mut())?;
        tmp.as_file_mut().flush()?;
        tmp.persist(path).map_err(|e| ReviewError::Io(e.error))?;
        debug!("saved {} parts to {}", self.entries.len(), path.display());
        Ok(())
    }

    fn write_to<W: Write + Seek>(&self, writer: W) -> Result<()> {
        let mut zout = ZipWriter::new(writer);
        for ent in &self.entries {
            let mut opts = SimpleFileOptions::default()
                .compression_method(ent.compression)
                .last_modified_time(ent.last_modified);
            if let Some(mode) = ent.unix_mode {
                opts = opts.unix_permissions(mode);
            }
            if ent.is_dir || ent.name.ends_with('/') {
                zout.add_directory(ent.name.as_str(), opts)?;
            } else {
                zout.start_file(ent.name.as_str(), opts)?;
                zout.write_all(&ent.data)?;
            }
        }
        zout.finish()?;
        Ok(())
    }
}
