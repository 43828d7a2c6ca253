//! DOCX packages: zip archives of XML parts.

use std::io::{Cursor, Read, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::{Result, TemplateError};

/// The main document part every DOCX must contain.
pub const DOCUMENT_PART: &str = "word/document.xml";

/// Largest total uncompressed size [`DocxPackage::from_bytes`] accepts.
pub const MAX_UNPACKED_BYTES: u64 = 256 * 1024 * 1024;

/// MIME type for DOCX responses.
pub const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

#[derive(Clone, Debug)]
struct Entry {
    name: String,
    data: Vec<u8>,
    is_dir: bool,
}

/// An opened DOCX package.
///
/// Entries keep their original order; rewriting a part replaces its bytes
/// in place.
#[derive(Clone, Debug)]
pub struct DocxPackage {
    entries: Vec<Entry>,
}

impl DocxPackage {
    /// Open a package from raw bytes.
    ///
    /// Fails with [`TemplateError::MissingPart`] if `word/document.xml` is
    /// absent.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_bytes_with_limit(bytes, MAX_UNPACKED_BYTES)
    }

    /// Open a package whose entries together unpack to at most
    /// `max_unpacked` bytes; larger archives fail with
    /// [`TemplateError::TooLarge`].
    pub fn from_bytes_with_limit(bytes: &[u8], max_unpacked: u64) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut entries = Vec::with_capacity(archive.len());
        let mut remaining = max_unpacked;

        for index in 0..archive.len() {
            let mut file = archive.by_index(index)?;
            let name = file.name().to_string();
            let is_dir = file.is_dir();
            let mut data = Vec::new();
            if !is_dir {
                // Declared sizes can lie, so count what is actually inflated.
                let read = file
                    .by_ref()
                    .take(remaining.saturating_add(1))
                    .read_to_end(&mut data)? as u64;
                if read > remaining {
                    return Err(TemplateError::TooLarge {
                        limit: max_unpacked,
                    });
                }
                remaining -= read;
            }
            entries.push(Entry { name, data, is_dir });
        }

        let package = Self { entries };
        if !package.contains(DOCUMENT_PART) {
            return Err(TemplateError::MissingPart(DOCUMENT_PART.to_string()));
        }
        log::debug!("Opened DOCX package with {} entries", package.entries.len());
        Ok(package)
    }

    /// Build a package from `(name, bytes)` pairs.
    pub fn from_parts<I, N>(parts: I) -> Result<Self>
    where
        I: IntoIterator<Item = (N, Vec<u8>)>,
        N: Into<String>,
    {
        let entries: Vec<Entry> = parts
            .into_iter()
            .map(|(name, data)| Entry {
                name: name.into(),
                data,
                is_dir: false,
            })
            .collect();
        let package = Self { entries };
        if !package.contains(DOCUMENT_PART) {
            return Err(TemplateError::MissingPart(DOCUMENT_PART.to_string()));
        }
        Ok(package)
    }

    /// Serialize back into a zip archive.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for entry in &self.entries {
            if entry.is_dir {
                writer.add_directory(entry.name.as_str(), options)?;
            } else {
                writer.start_file(entry.name.as_str(), options)?;
                writer.write_all(&entry.data)?;
            }
        }

        Ok(writer.finish()?.into_inner())
    }

    /// Whether an entry named `name` exists.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }

    /// Entry names in archive order.
    pub fn entry_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// Raw bytes of an entry.
    pub fn raw(&self, name: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|e| e.name == name && !e.is_dir)
            .map(|e| e.data.as_slice())
    }

    /// An XML part decoded as UTF-8.
    pub fn part(&self, name: &str) -> Result<&str> {
        let data = self
            .raw(name)
            .ok_or_else(|| TemplateError::MissingPart(name.to_string()))?;
        std::str::from_utf8(data).map_err(|e| TemplateError::Xml {
            part: name.to_string(),
            message: format!("part is not UTF-8: {e}"),
        })
    }

    /// Replace (or add) an XML part.
    pub fn set_part(&mut self, name: &str, xml: String) {
        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(entry) => {
                entry.data = xml.into_bytes();
                entry.is_dir = false;
            }
            None => self.entries.push(Entry {
                name: name.to_string(),
                data: xml.into_bytes(),
                is_dir: false,
            }),
        }
    }

    /// Parts that may contain template tags, main document first, then
    /// headers, footers, footnotes, and endnotes in name order.
    pub fn template_parts(&self) -> Vec<&str> {
        let mut headers = Vec::new();
        let mut footers = Vec::new();
        let mut notes = Vec::new();

        for name in self.entry_names() {
            let Some(file) = name.strip_prefix("word/") else {
                continue;
            };
            if file.contains('/') || !file.ends_with(".xml") {
                continue;
            }
            if file.starts_with("header") {
                headers.push(name);
            } else if file.starts_with("footer") {
                footers.push(name);
            } else if file == "footnotes.xml" || file == "endnotes.xml" {
                notes.push(name);
            }
        }
        headers.sort_unstable();
        footers.sort_unstable();
        notes.sort_unstable_by(|a, b| b.cmp(a));

        let mut parts = vec![DOCUMENT_PART];
        parts.extend(headers);
        parts.extend(footers);
        parts.extend(notes);
        parts
    }
}
