//! Content extraction: the bytes that actually get fingerprinted.
//!
//! Document formats are reduced to their text so that re-saves,
//! metadata churn, and container-level noise do not defeat the fuzzy
//! hashes. Binaries and generic files pass through verbatim.

use crate::content::ContentKind;
use crate::error::ExtractError;
use quick_xml::events::Event;
use quick_xml::Reader as XmlReader;
use std::io::{Cursor, Read};

/// Floor for raw passthrough, matching the smallest fuzzy-hash scheme's
/// minimum viable input.
pub const MIN_RAW_LEN: usize = 50;

/// Produce the byte sequence to fingerprint. Pure function of the input;
/// classification happens before this call.
pub fn extract(bytes: &[u8], kind: ContentKind) -> Result<Vec<u8>, ExtractError> {
    match kind {
        ContentKind::Pdf => extract_pdf(bytes),
        ContentKind::WordDocument => extract_word(bytes),
        ContentKind::Executable | ContentKind::Generic => {
            if bytes.len() < MIN_RAW_LEN {
                return Err(ExtractError::TooSmall {
                    got: bytes.len(),
                    min: MIN_RAW_LEN,
                });
            }
            Ok(bytes.to_vec())
        }
    }
}

/// Concatenated text of every page, UTF-8. A parsable document with no
/// text at all (scanned pages) is reported with its page count.
fn extract_pdf(bytes: &[u8]) -> Result<Vec<u8>, ExtractError> {
    let doc = lopdf::Document::load_mem(bytes)
        .map_err(|err| ExtractError::CorruptOrProtected(err.to_string()))?;
    if doc.is_encrypted() {
        return Err(ExtractError::CorruptOrProtected("document is encrypted".to_string()));
    }
    let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
    let text = doc
        .extract_text(&pages)
        .map_err(|err| ExtractError::CorruptOrProtected(err.to_string()))?;
    if text.trim().is_empty() {
        return Err(ExtractError::NoExtractableText {
            scanned: pages.len(),
            unit: "pages",
        });
    }
    Ok(text.into_bytes())
}

/// Paragraph texts from the main document part, joined by newline.
fn extract_word(bytes: &[u8]) -> Result<Vec<u8>, ExtractError> {
    let corrupt = |detail: String| ExtractError::CorruptOrProtected(detail);

    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|err| corrupt(format!("failed to open document container: {err}")))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|err| corrupt(format!("missing document part: {err}")))?
        .read_to_string(&mut xml)
        .map_err(|err| corrupt(format!("unreadable document part: {err}")))?;

    let paragraphs = parse_paragraphs(&xml)?;
    let scanned = paragraphs.len();
    let joined = paragraphs.join("\n");
    if joined.trim().is_empty() {
        return Err(ExtractError::NoExtractableText {
            scanned,
            unit: "paragraphs",
        });
    }
    Ok(joined.into_bytes())
}

/// Walk `word/document.xml`, collecting the text runs of each `w:p`.
fn parse_paragraphs(xml: &str) -> Result<Vec<String>, ExtractError> {
    let bad_xml = |err: quick_xml::Error| {
        ExtractError::CorruptOrProtected(format!("bad document xml: {err}"))
    };

    let mut reader = XmlReader::from_str(xml);
    let mut buf = Vec::new();
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_paragraph = false;
    let mut in_text_run = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"w:p" => in_paragraph = true,
                b"w:t" if in_paragraph => in_text_run = true,
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"w:p" => {
                    in_paragraph = false;
                    paragraphs.push(std::mem::take(&mut current));
                }
                b"w:t" => in_text_run = false,
                _ => {}
            },
            Ok(Event::Text(ref t)) if in_text_run => {
                let text = t.unescape().map_err(bad_xml)?;
                current.push_str(&text);
            }
            Ok(Event::Eof) => break,
            Err(err) => return Err(bad_xml(err)),
            _ => {}
        }
        buf.clear();
    }
    Ok(paragraphs)
}
