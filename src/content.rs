//! Content classification by magic bytes.
//!
//! Classification runs once per upload and drives both the extraction
//! dispatch and the `file_type` label stored in the corpus. Filenames are
//! never consulted.

use serde::{Deserialize, Serialize};
use std::io::Cursor;

/// What an upload "is", as far as extraction is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    /// PDF document; fingerprints cover the extracted page text.
    Pdf,
    /// OOXML word-processing document; fingerprints cover paragraph text.
    WordDocument,
    /// ELF or PE binary; fingerprints cover the raw bytes.
    Executable,
    /// Everything else; raw-byte passthrough.
    Generic,
}

impl ContentKind {
    /// Media-type label recorded on corpus entries.
    pub fn media_type(self) -> &'static str {
        match self {
            ContentKind::Pdf => "application/pdf",
            ContentKind::WordDocument => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            ContentKind::Executable => "application/x-executable",
            ContentKind::Generic => "application/octet-stream",
        }
    }
}

const PDF_MAGIC: &[u8] = b"%PDF-";
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const ELF_MAGIC: &[u8] = b"\x7fELF";
const PE_MAGIC: &[u8] = b"MZ";

/// Sniff the content kind from raw bytes.
pub fn classify(bytes: &[u8]) -> ContentKind {
    if bytes.starts_with(PDF_MAGIC) {
        return ContentKind::Pdf;
    }
    if bytes.starts_with(ZIP_MAGIC) && is_word_archive(bytes) {
        return ContentKind::WordDocument;
    }
    if bytes.starts_with(ELF_MAGIC) || bytes.starts_with(PE_MAGIC) {
        return ContentKind::Executable;
    }
    ContentKind::Generic
}

/// A ZIP container is a word-processing document iff it carries the main
/// document part. Plain ZIPs fall through to the generic path.
fn is_word_archive(bytes: &[u8]) -> bool {
    match zip::ZipArchive::new(Cursor::new(bytes)) {
        Ok(mut archive) => archive.by_name("word/document.xml").is_ok(),
        Err(_) => false,
    }
}
