//! Format-specific text and metadata extraction.
//!
//! The engine hands in bytes plus a detected media type; this module returns
//! plain UTF-8 text and adds format metadata under Tika-compatible key names
//! (`dc:title`, `dcterms:created`, `xmpTPg:NPages`, ...). Text extraction
//! failures are errors; metadata extraction is best-effort and only ever
//! omits keys.

use chardetng::EncodingDetector;
use chrono::{FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use encoding_rs::{Encoding, UTF_16BE, UTF_8};
use scraper::{ElementRef, Html, Node};
use std::io::Read;
use tracing::debug;

use crate::error::EngineError;
use crate::media_type;
use crate::models::Metadata;

/// Maximum sheets to process in an xlsx.
const XLSX_MAX_SHEETS: usize = 100;
/// Maximum cells to process per sheet (avoids unbounded memory).
const XLSX_MAX_CELLS_PER_SHEET: usize = 100_000;
/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Elements whose content is never page text.
const HTML_SKIPPED_TAGS: &[&str] = &["head", "script", "style", "noscript", "template"];

/// Tags after which HTML text starts on a new line.
const HTML_BLOCK_TAGS: &[&str] = &[
    "p", "div", "br", "li", "ul", "ol", "h1", "h2", "h3", "h4", "h5", "h6", "tr", "table",
    "section", "article", "header", "footer", "blockquote", "pre", "hr", "dt", "dd",
];

/// Document-info entries copied from a PDF trailer, with their metadata keys.
const PDF_INFO_KEYS: &[(&[u8], &str)] = &[
    (b"Title", "dc:title"),
    (b"Author", "dc:creator"),
    (b"Subject", "dc:subject"),
    (b"Keywords", "meta:keyword"),
    (b"Creator", "xmp:CreatorTool"),
    (b"Producer", "pdf:producer"),
    (b"CreationDate", "dcterms:created"),
    (b"ModDate", "dcterms:modified"),
];

/// `docProps/core.xml` elements and their metadata keys.
const OOXML_CORE_KEYS: &[(&[u8], &str)] = &[
    (b"title", "dc:title"),
    (b"creator", "dc:creator"),
    (b"subject", "dc:subject"),
    (b"description", "dc:description"),
    (b"keywords", "meta:keyword"),
    (b"lastModifiedBy", "meta:last-author"),
    (b"created", "dcterms:created"),
    (b"modified", "dcterms:modified"),
    (b"revision", "cp:revision"),
    (b"category", "cp:category"),
];

/// `docProps/app.xml` elements and their metadata keys.
const OOXML_APP_KEYS: &[(&[u8], &str)] = &[
    (b"Application", "extended-properties:Application"),
    (b"Pages", "meta:page-count"),
    (b"Slides", "meta:slide-count"),
    (b"Words", "meta:word-count"),
];

/// Text decoded from bytes, with the encoding that was used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    pub text: String,
    pub encoding: &'static str,
}

/// Decode text bytes: a BOM wins, then valid UTF-8, then whatever
/// `chardetng` guesses (typically windows-1252 for Western text).
pub fn decode_text(bytes: &[u8]) -> DecodedText {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let (text, _) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        return DecodedText {
            text: text.into_owned(),
            encoding: encoding.name(),
        };
    }
    if let Ok(text) = std::str::from_utf8(bytes) {
        return DecodedText {
            text: text.to_string(),
            encoding: UTF_8.name(),
        };
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let encoding = detector.guess(None, true);
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        debug!(encoding = encoding.name(), "undecodable bytes replaced");
    }
    DecodedText {
        text: text.into_owned(),
        encoding: encoding.name(),
    }
}

/// Name reported in `X-Parsed-By` for a media type.
pub fn parser_name(media_type: &str) -> &'static str {
    let essence = media_type::essence(media_type);
    match essence.as_str() {
        media_type::PDF => "PdfParser",
        media_type::DOCX | media_type::PPTX | media_type::XLSX => "OOXMLParser",
        _ if media_type::is_html(&essence) => "HtmlParser",
        _ if media_type::is_xml(&essence) => "XmlParser",
        _ if media_type::is_textual(&essence) => "TextParser",
        _ => "EmptyParser",
    }
}

/// Extracts plain text. Media types without a text extractor yield `""`.
pub fn extract_text(bytes: &[u8], media_type: &str) -> Result<String, EngineError> {
    let essence = media_type::essence(media_type);
    match essence.as_str() {
        media_type::PDF => extract_pdf(bytes),
        media_type::DOCX => extract_docx(bytes),
        media_type::PPTX => extract_pptx(bytes),
        media_type::XLSX => extract_xlsx(bytes),
        _ if media_type::is_html(&essence) => Ok(extract_html(&decode_text(bytes).text).text),
        _ if media_type::is_xml(&essence) => extract_xml_text(bytes),
        _ if media_type::is_textual(&essence) => Ok(decode_text(bytes).text),
        _ => Ok(String::new()),
    }
}

/// Adds format metadata to `metadata`. Never fails; malformed input just
/// contributes fewer keys.
pub fn extract_metadata(bytes: &[u8], media_type: &str, metadata: &mut Metadata) {
    let essence = media_type::essence(media_type);
    match essence.as_str() {
        media_type::PDF => pdf_metadata(bytes, metadata),
        media_type::DOCX | media_type::PPTX | media_type::XLSX => ooxml_metadata(bytes, metadata),
        _ if media_type::is_html(&essence) => {
            if let Some(title) = extract_html(&decode_text(bytes).text).title {
                metadata.insert("dc:title".to_string(), title);
            }
        }
        _ => {}
    }
}

// ── PDF ───────────────────────────────────────────────────────────────

fn extract_pdf(bytes: &[u8]) -> Result<String, EngineError> {
    // pdf-extract panics on some malformed documents; keep that inside this target.
    match std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes)) {
        Ok(result) => result.map_err(|e| EngineError::Pdf(e.to_string())),
        Err(_) => Err(EngineError::Pdf("malformed PDF".to_string())),
    }
}

fn pdf_metadata(bytes: &[u8], metadata: &mut Metadata) {
    let doc = match lopdf::Document::load_mem(bytes) {
        Ok(doc) => doc,
        Err(e) => {
            debug!(error = %e, "PDF metadata unavailable");
            return;
        }
    };

    metadata.insert("pdf:PDFVersion".to_string(), doc.version.clone());
    metadata.insert(
        "xmpTPg:NPages".to_string(),
        doc.get_pages().len().to_string(),
    );

    let info = match doc.trailer.get(b"Info") {
        Ok(lopdf::Object::Reference(id)) => doc.get_dictionary(*id).ok(),
        Ok(lopdf::Object::Dictionary(dict)) => Some(dict),
        _ => None,
    };
    let Some(info) = info else {
        return;
    };

    for (pdf_key, meta_key) in PDF_INFO_KEYS {
        let value = match info.get(pdf_key) {
            Ok(lopdf::Object::Reference(id)) => doc.get_object(*id).ok(),
            Ok(obj) => Some(obj),
            Err(_) => None,
        };
        let Some(lopdf::Object::String(raw, _)) = value else {
            continue;
        };
        let text = decode_pdf_string(raw);
        let text = if meta_key.starts_with("dcterms:") {
            pdf_date_to_iso(&text).unwrap_or(text)
        } else {
            text
        };
        if !text.trim().is_empty() {
            metadata.insert(meta_key.to_string(), text.trim().to_string());
        }
    }
}

fn decode_pdf_string(raw: &[u8]) -> String {
    match raw.strip_prefix(b"\xFE\xFF") {
        Some(rest) => UTF_16BE.decode_without_bom_handling(rest).0.into_owned(),
        None => raw.iter().map(|&b| b as char).collect(),
    }
}

/// Convert a PDF date (`D:YYYYMMDDHHmmSSOHH'mm'`) to ISO-8601.
///
/// Dates with an offset are normalized to UTC (`...Z`); dates without one
/// are rendered without a zone.
fn pdf_date_to_iso(raw: &str) -> Option<String> {
    let s = raw.trim().trim_start_matches("D:");
    let digits: String = s.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.len() < 4 {
        return None;
    }
    let field = |start: usize, len: usize, default: u32| -> u32 {
        digits
            .get(start..start + len)
            .and_then(|f| f.parse().ok())
            .unwrap_or(default)
    };
    let year: i32 = digits[0..4].parse().ok()?;
    let naive: NaiveDateTime = NaiveDate::from_ymd_opt(year, field(4, 2, 1), field(6, 2, 1))?
        .and_hms_opt(field(8, 2, 0), field(10, 2, 0), field(12, 2, 0))?;

    let zone = &s[digits.len()..];
    let offset_secs = match zone.chars().next() {
        Some('Z') => Some(0),
        Some(sign @ ('+' | '-')) => {
            let tz: String = zone[1..].chars().filter(|c| c.is_ascii_digit()).collect();
            let hours: i32 = tz.get(0..2).and_then(|h| h.parse().ok()).unwrap_or(0);
            let minutes: i32 = tz.get(2..4).and_then(|m| m.parse().ok()).unwrap_or(0);
            let secs = hours * 3600 + minutes * 60;
            Some(if sign == '-' { -secs } else { secs })
        }
        _ => None,
    };

    match offset_secs {
        Some(secs) => {
            let offset = FixedOffset::east_opt(secs)?;
            let local = offset.from_local_datetime(&naive).single()?;
            Some(
                local
                    .with_timezone(&Utc)
                    .format("%Y-%m-%dT%H:%M:%SZ")
                    .to_string(),
            )
        }
        None => Some(naive.format("%Y-%m-%dT%H:%M:%S").to_string()),
    }
}

// ── OOXML ─────────────────────────────────────────────────────────────

type ZipReader<'a> = zip::ZipArchive<std::io::Cursor<&'a [u8]>>;

fn open_zip(bytes: &[u8]) -> Result<ZipReader<'_>, EngineError> {
    zip::ZipArchive::new(std::io::Cursor::new(bytes)).map_err(|e| EngineError::Ooxml(e.to_string()))
}

fn read_zip_entry_bounded(
    archive: &mut ZipReader<'_>,
    name: &str,
    max_bytes: u64,
) -> Result<Vec<u8>, EngineError> {
    let entry = archive
        .by_name(name)
        .map_err(|e| EngineError::Ooxml(format!("{}: {}", name, e)))?;
    let mut out = Vec::new();
    entry
        .take(max_bytes)
        .read_to_end(&mut out)
        .map_err(|e| EngineError::Ooxml(e.to_string()))?;
    if out.len() as u64 >= max_bytes {
        return Err(EngineError::Ooxml(format!(
            "ZIP entry {} exceeds size limit ({} bytes)",
            name, max_bytes
        )));
    }
    Ok(out)
}

fn extract_docx(bytes: &[u8]) -> Result<String, EngineError> {
    let mut archive = open_zip(bytes)?;
    let doc_xml = read_zip_entry_bounded(&mut archive, "word/document.xml", MAX_XML_ENTRY_BYTES)?;
    extract_run_text(&doc_xml)
}

/// Text of `<w:t>`/`<a:t>` runs, one line per `<w:p>`/`<a:p>` paragraph.
fn extract_run_text(xml: &[u8]) -> Result<String, EngineError> {
    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();
    let mut in_t = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                if e.local_name().as_ref() == b"t" {
                    in_t = true;
                }
            }
            Ok(quick_xml::events::Event::Text(te)) if in_t => {
                out.push_str(te.unescape().unwrap_or_default().as_ref());
            }
            Ok(quick_xml::events::Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_t = false,
                b"p" => out.push('\n'),
                _ => {}
            },
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(EngineError::Ooxml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(out.trim_end().to_string())
}

fn extract_pptx(bytes: &[u8]) -> Result<String, EngineError> {
    let mut archive = open_zip(bytes)?;
    let mut slide_names: Vec<String> = archive
        .file_names()
        .filter(|n| n.starts_with("ppt/slides/slide") && n.ends_with(".xml"))
        .map(|s| s.to_string())
        .collect();
    slide_names.sort_by_key(|name| {
        name.trim_start_matches("ppt/slides/slide")
            .trim_end_matches(".xml")
            .parse::<u32>()
            .unwrap_or(u32::MAX)
    });
    let mut out = String::new();
    for name in slide_names {
        let xml = read_zip_entry_bounded(&mut archive, &name, MAX_XML_ENTRY_BYTES)?;
        let text = extract_run_text(&xml)?;
        if !out.is_empty() && !text.is_empty() {
            out.push_str("\n\n");
        }
        out.push_str(&text);
    }
    Ok(out)
}

fn extract_xlsx(bytes: &[u8]) -> Result<String, EngineError> {
    let mut archive = open_zip(bytes)?;
    let shared_strings = read_shared_strings(&mut archive)?;
    let sheet_names = list_worksheet_names(&archive);
    let mut sheets = Vec::new();
    for name in sheet_names.into_iter().take(XLSX_MAX_SHEETS) {
        let sheet_xml = read_zip_entry_bounded(&mut archive, &name, MAX_XML_ENTRY_BYTES)?;
        let cell_texts = extract_xlsx_sheet_cells(&sheet_xml, &shared_strings)?;
        if !cell_texts.is_empty() {
            sheets.push(cell_texts);
        }
    }
    Ok(sheets.join("\n"))
}

fn read_shared_strings(archive: &mut ZipReader<'_>) -> Result<Vec<String>, EngineError> {
    // Workbooks with only numeric cells have no shared-strings part.
    if archive.index_for_name("xl/sharedStrings.xml").is_none() {
        return Ok(Vec::new());
    }
    let xml = read_zip_entry_bounded(archive, "xl/sharedStrings.xml", MAX_XML_ENTRY_BYTES)?;
    let mut strings = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml.as_slice());
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut current: Option<String> = None;
    let mut in_t = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => match e.local_name().as_ref() {
                b"si" => current = Some(String::new()),
                b"t" => in_t = true,
                _ => {}
            },
            Ok(quick_xml::events::Event::Text(te)) if in_t => {
                if let Some(s) = current.as_mut() {
                    s.push_str(te.unescape().unwrap_or_default().as_ref());
                }
            }
            Ok(quick_xml::events::Event::End(e)) => match e.local_name().as_ref() {
                b"si" => strings.extend(current.take()),
                b"t" => in_t = false,
                _ => {}
            },
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(EngineError::Ooxml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

fn list_worksheet_names(archive: &ZipReader<'_>) -> Vec<String> {
    let mut names: Vec<String> = archive
        .file_names()
        .filter(|n| n.starts_with("xl/worksheets/sheet") && n.ends_with(".xml"))
        .map(|s| s.to_string())
        .collect();
    names.sort_by_key(|name| {
        name.trim_start_matches("xl/worksheets/sheet")
            .trim_end_matches(".xml")
            .parse::<u32>()
            .unwrap_or(u32::MAX)
    });
    names
}

fn extract_xlsx_sheet_cells(xml: &[u8], shared_strings: &[String]) -> Result<String, EngineError> {
    let mut cells: Vec<String> = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut in_v = false;
    let mut cell_is_shared_str = false;
    loop {
        if cells.len() >= XLSX_MAX_CELLS_PER_SHEET {
            break;
        }
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                if e.local_name().as_ref() == b"c" {
                    cell_is_shared_str = e.attributes().any(|a| {
                        a.as_ref()
                            .map(|a| a.key.as_ref() == b"t" && a.value.as_ref() == b"s")
                            .unwrap_or(false)
                    });
                } else if e.local_name().as_ref() == b"v" {
                    in_v = true;
                }
            }
            Ok(quick_xml::events::Event::Text(te)) if in_v => {
                let v = te.unescape().unwrap_or_default();
                let s = v.trim();
                if cell_is_shared_str {
                    if let Some(shared) = s.parse::<usize>().ok().and_then(|i| shared_strings.get(i)) {
                        cells.push(shared.clone());
                    }
                } else if !s.is_empty() {
                    cells.push(s.to_string());
                }
                in_v = false;
            }
            Ok(quick_xml::events::Event::End(e)) => {
                if e.local_name().as_ref() == b"v" {
                    in_v = false;
                } else if e.local_name().as_ref() == b"c" {
                    cell_is_shared_str = false;
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(EngineError::Ooxml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(cells.join(" "))
}

fn ooxml_metadata(bytes: &[u8], metadata: &mut Metadata) {
    let Ok(mut archive) = open_zip(bytes) else {
        return;
    };
    for (part, keys) in [
        ("docProps/core.xml", OOXML_CORE_KEYS),
        ("docProps/app.xml", OOXML_APP_KEYS),
    ] {
        if archive.index_for_name(part).is_none() {
            continue;
        }
        match read_zip_entry_bounded(&mut archive, part, MAX_XML_ENTRY_BYTES) {
            Ok(xml) => read_properties(&xml, keys, metadata),
            Err(e) => debug!(part, error = %e, "OOXML properties unavailable"),
        }
    }
}

/// Copy the text of top-level property elements named in `keys`.
fn read_properties(xml: &[u8], keys: &[(&[u8], &str)], metadata: &mut Metadata) {
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut current: Option<&str> = None;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                let name = e.local_name();
                current = keys
                    .iter()
                    .find(|(element, _)| *element == name.as_ref())
                    .map(|(_, key)| *key);
            }
            Ok(quick_xml::events::Event::Text(te)) => {
                if let Some(key) = current {
                    let value = te.unescape().unwrap_or_default();
                    if !value.is_empty() {
                        metadata.insert(key.to_string(), value.into_owned());
                    }
                }
            }
            Ok(quick_xml::events::Event::End(_)) => current = None,
            Ok(quick_xml::events::Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }
}

// ── XML ───────────────────────────────────────────────────────────────

fn extract_xml_text(bytes: &[u8]) -> Result<String, EngineError> {
    let decoded = decode_text(bytes);
    let mut reader = quick_xml::Reader::from_str(&decoded.text);
    reader.config_mut().trim_text(true);
    let mut parts: Vec<String> = Vec::new();
    loop {
        match reader.read_event() {
            Ok(quick_xml::events::Event::Text(te)) => {
                let text = te.unescape().map_err(|e| EngineError::Xml(e.to_string()))?;
                if !text.is_empty() {
                    parts.push(text.into_owned());
                }
            }
            Ok(quick_xml::events::Event::CData(cd)) => {
                let text = String::from_utf8_lossy(&cd).trim().to_string();
                if !text.is_empty() {
                    parts.push(text);
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(EngineError::Xml(e.to_string())),
            _ => {}
        }
    }
    Ok(parts.join("\n"))
}

// ── HTML ──────────────────────────────────────────────────────────────

/// Visible text and `<title>` of an HTML document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HtmlText {
    pub text: String,
    pub title: Option<String>,
}

/// Parsed with `scraper` (html5ever); body text gets a line break at each
/// block element.
pub fn extract_html(html: &str) -> HtmlText {
    let document = Html::parse_document(html);
    let root = document.root_element();

    let title = root
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|element| element.value().name() == "title")
        .map(|element| collapse_whitespace(&element.text().collect::<String>()))
        .filter(|title| !title.is_empty());

    let mut out = String::new();
    push_element_text(root, &mut out);

    HtmlText {
        text: tidy_lines(&out),
        title,
    }
}

fn push_element_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            let name = child_element.value().name();
            if HTML_SKIPPED_TAGS.contains(&name) {
                continue;
            }
            let block = HTML_BLOCK_TAGS.contains(&name);
            if block {
                start_line(out);
            }
            push_element_text(child_element, out);
            if block {
                start_line(out);
            }
        } else if let Node::Text(text) = child.value() {
            push_html_text(out, &text.text);
        }
    }
}

fn start_line(out: &mut String) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

/// Append a text node with whitespace runs collapsed.
fn push_html_text(out: &mut String, raw: &str) {
    if raw.is_empty() {
        return;
    }
    let words: Vec<&str> = raw.split_whitespace().collect();
    let leading_ws = raw.starts_with(char::is_whitespace);
    let trailing_ws = raw.ends_with(char::is_whitespace);
    let at_boundary = out.is_empty() || out.ends_with(char::is_whitespace);

    if words.is_empty() {
        if !at_boundary {
            out.push(' ');
        }
        return;
    }
    if leading_ws && !at_boundary {
        out.push(' ');
    }
    out.push_str(&words.join(" "));
    if trailing_ws {
        out.push(' ');
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Trim every line and collapse runs of blank lines.
fn tidy_lines(text: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    for line in text.lines().map(str::trim) {
        if line.is_empty() && lines.last().map_or(true, |prev| prev.is_empty()) {
            continue;
        }
        lines.push(line);
    }
    while lines.last() == Some(&"") {
        lines.pop();
    }
    lines.join("\n")
}
