//! Hand-rolled `multipart/form-data` body parsing.
//!
//! This deliberately avoids a full MIME stack: upload forms produced by a
//! browser delimit every part with the same boundary token, so splitting the
//! raw body on `--boundary` and slicing each part at the first blank line is
//! enough to recover the one file the form carries. Nested multiparts and
//! RFC 2231 encoded filenames are not supported.

/// A file recovered from a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub filename: String,
    pub content: Vec<u8>,
}

/// Extracts the boundary token from a `Content-Type` header value.
///
/// Returns the text after `boundary=` up to the next `;` (or the end of the
/// value), with any surrounding quotes stripped. An absent or empty token
/// yields `None`.
pub fn boundary(content_type: &str) -> Option<&str> {
    const BOUNDARY: &str = "boundary=";

    let start = content_type.find(BOUNDARY)? + BOUNDARY.len();
    let end = content_type[start..]
        .find(';')
        .map_or(content_type.len(), |end| start + end);

    let token = content_type[start..end].trim_matches('"');

    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Scans a multipart body for the first file-bearing part.
///
/// The body is split on `--boundary`; any segment without a
/// `filename="..."` parameter in its header block is skipped (plain form
/// fields, the preamble, and the closing `--` terminator all fall out this
/// way). Parsing stops at the first match, so at most one file is ever
/// returned even when the form carried several.
pub fn parse(body: &[u8], boundary: &[u8]) -> Option<UploadedFile> {
    let delimiter = [b"--", boundary].concat();

    for part in split(body, &delimiter) {
        // Cheap pre-filter on the raw bytes before decoding anything.
        if find(part, b"filename=\"").is_none() {
            continue;
        }

        // A part whose headers never terminate is malformed; skip it.
        let Some(headers_end) = find(part, b"\r\n\r\n") else {
            continue;
        };

        let Ok(headers) = std::str::from_utf8(&part[..headers_end]) else {
            continue;
        };

        let Some(filename) = filename_param(headers) else {
            continue;
        };

        let content = trim_delimiter_crlf(&part[headers_end + 4..]);

        return Some(UploadedFile {
            filename: filename.to_owned(),
            content: content.to_vec(),
        });
    }

    None
}

/// The `filename="..."` parameter value, without any unquoting of escaped
/// characters.
fn filename_param(headers: &str) -> Option<&str> {
    const MARKER: &str = "filename=\"";

    let start = headers.find(MARKER)? + MARKER.len();
    let end = headers[start..].find('"')? + start;

    Some(&headers[start..end])
}

/// Every part except the trailing epilogue ends with the CRLF that precedes
/// the next boundary delimiter; that CRLF belongs to the framing, not the
/// file.
fn trim_delimiter_crlf(content: &[u8]) -> &[u8] {
    content.strip_suffix(b"\r\n").unwrap_or(content)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn split<'a>(mut bytes: &'a [u8], delimiter: &[u8]) -> Vec<&'a [u8]> {
    let mut parts = Vec::new();

    while let Some(pos) = find(bytes, delimiter) {
        parts.push(&bytes[..pos]);
        bytes = &bytes[pos + delimiter.len()..];
    }

    parts.push(bytes);
    parts
}
