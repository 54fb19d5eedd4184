//! Media type detection.
//!
//! Detection order: magic bytes (`infer`), the media type declared by the
//! transport, the resource name's extension (`mime_guess`), then a
//! text/binary sniff of the leading bytes.

pub const PDF: &str = "application/pdf";
pub const DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const PPTX: &str = "application/vnd.openxmlformats-officedocument.presentationml.presentation";
pub const XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const HTML: &str = "text/html";
pub const XHTML: &str = "application/xhtml+xml";
pub const XML: &str = "application/xml";
pub const TEXT_XML: &str = "text/xml";
pub const PLAIN_TEXT: &str = "text/plain";
pub const OCTET_STREAM: &str = "application/octet-stream";
pub const ZIP: &str = "application/zip";

/// Bytes inspected when sniffing for text.
const SNIFF_LEN: usize = 8192;

/// Declared types too generic to trust over other evidence.
const GENERIC_TYPES: &[&str] = &[OCTET_STREAM, "binary/octet-stream", "application/unknown"];

/// Textual `application/*` types whose bytes are the content.
const TEXTUAL_APPLICATION_TYPES: &[&str] = &[
    "application/json",
    "application/ld+json",
    "application/javascript",
    "application/x-javascript",
    "application/x-yaml",
    "application/yaml",
    "application/toml",
    "application/x-sh",
    "application/sql",
    "application/rtf",
];

/// Detect the media type (essence only, lower-case, no parameters).
pub fn detect(bytes: &[u8], declared: Option<&str>, resource_name: Option<&str>) -> String {
    if let Some(kind) = infer::get(bytes) {
        // A bare zip may still be an OOXML package the sniffer did not recognise.
        if kind.mime_type() == ZIP {
            if let Some(ooxml) = ooxml_by_name(resource_name) {
                return ooxml.to_string();
            }
        }
        return kind.mime_type().to_string();
    }

    if let Some(declared) = declared.map(essence).filter(|d| !d.is_empty()) {
        if !GENERIC_TYPES.contains(&declared.as_str()) {
            return declared;
        }
    }

    if let Some(guess) = resource_name.and_then(|name| mime_guess::from_path(name).first_raw()) {
        return guess.to_string();
    }

    if looks_like_text(bytes) {
        PLAIN_TEXT.to_string()
    } else {
        OCTET_STREAM.to_string()
    }
}

/// The `type/subtype` part of a media type string, lower-cased.
pub fn essence(media_type: &str) -> String {
    media_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Whether the bytes of this media type are themselves the text.
pub fn is_textual(media_type: &str) -> bool {
    let essence = essence(media_type);
    essence.starts_with("text/")
        || TEXTUAL_APPLICATION_TYPES.contains(&essence.as_str())
        || essence.ends_with("+json")
}

pub fn is_html(media_type: &str) -> bool {
    matches!(essence(media_type).as_str(), HTML | XHTML)
}

pub fn is_xml(media_type: &str) -> bool {
    let essence = essence(media_type);
    essence == XML || essence == TEXT_XML || (essence.ends_with("+xml") && essence != XHTML)
}

fn ooxml_by_name(resource_name: Option<&str>) -> Option<&'static str> {
    let guess = mime_guess::from_path(resource_name?).first_raw()?;
    [DOCX, PPTX, XLSX].into_iter().find(|t| *t == guess)
}

fn looks_like_text(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(SNIFF_LEN)];
    if head.contains(&0) {
        return false;
    }
    match std::str::from_utf8(head) {
        Ok(_) => true,
        // A multi-byte sequence cut at the sniff boundary is still text.
        Err(e) => e.error_len().is_none(),
    }
}
