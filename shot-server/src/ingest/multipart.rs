//! Minimal `multipart/form-data` reader
//!
//! Only what the upload endpoint needs: find the single `file` field that
//! carries a JSON attachment and hand back its raw bytes.

use thiserror::Error;

/// Form field carrying the shot document
pub const FILE_FIELD: &str = "file";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MultipartError {
    #[error("No boundary found in content-type")]
    MissingBoundary,

    #[error("No file data found in multipart form")]
    NoFileField,
}

/// `boundary` parameter of a content type, quotes removed
pub fn boundary(content_type: &str) -> Option<&str> {
    content_type
        .split(';')
        .skip(1)
        .filter_map(|param| param.split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("boundary"))
        .map(|(_, value)| value.trim().trim_matches('"'))
        .filter(|value| !value.is_empty())
}

/// One body part
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part<'a> {
    pub headers: String,
    pub body: &'a [u8],
}

impl Part<'_> {
    /// Value of a `Content-Disposition` parameter such as `name`
    pub fn disposition_param(&self, key: &str) -> Option<String> {
        let line = self
            .headers
            .lines()
            .find(|l| l.to_ascii_lowercase().starts_with("content-disposition:"))?;
        line.split(';').skip(1).find_map(|param| {
            let (k, v) = param.split_once('=')?;
            k.trim()
                .eq_ignore_ascii_case(key)
                .then(|| v.trim().trim_matches('"').to_string())
        })
    }

    pub fn content_type(&self) -> Option<String> {
        self.headers.lines().find_map(|l| {
            let (k, v) = l.split_once(':')?;
            k.trim()
                .eq_ignore_ascii_case("content-type")
                .then(|| v.trim().to_ascii_lowercase())
        })
    }

    /// `file` field with a `.json` name or a JSON content type
    pub fn is_json_file(&self) -> bool {
        let named_file = self.disposition_param("name").as_deref() == Some(FILE_FIELD);
        let json_name = self
            .disposition_param("filename")
            .is_some_and(|f| f.to_ascii_lowercase().ends_with(".json"));
        let json_type = self
            .content_type()
            .is_some_and(|t| t.starts_with("application/json"));
        named_file && (json_name || json_type)
    }
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || from >= haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

/// Iterator over the parts of a multipart body
pub struct Parts<'a> {
    body: &'a [u8],
    delimiter: Vec<u8>,
    /// Start of the next delimiter, `None` once the closing one was seen
    cursor: Option<usize>,
}

impl<'a> Parts<'a> {
    pub fn new(body: &'a [u8], boundary: &str) -> Self {
        let delimiter = format!("--{}", boundary).into_bytes();
        let cursor = find(body, &delimiter, 0);
        Self {
            body,
            delimiter,
            cursor,
        }
    }
}

impl<'a> Iterator for Parts<'a> {
    type Item = Part<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let start = self.cursor? + self.delimiter.len();
            let rest = &self.body[start..];
            if rest.starts_with(b"--") {
                self.cursor = None;
                return None;
            }

            // Part runs until the next delimiter or the end of the body
            let end = find(self.body, &self.delimiter, start);
            self.cursor = end;
            let mut raw = &self.body[start..end.unwrap_or(self.body.len())];

            raw = raw.strip_prefix(b"\r\n").or_else(|| raw.strip_prefix(b"\n")).unwrap_or(raw);
            raw = raw.strip_suffix(b"\r\n").or_else(|| raw.strip_suffix(b"\n")).unwrap_or(raw);

            let (header_end, sep_len) = match find(raw, b"\r\n\r\n", 0) {
                Some(pos) => (pos, 4),
                None => match find(raw, b"\n\n", 0) {
                    Some(pos) => (pos, 2),
                    None => continue,
                },
            };

            return Some(Part {
                headers: String::from_utf8_lossy(&raw[..header_end]).into_owned(),
                body: &raw[header_end + sep_len..],
            });
        }
    }
}

/// Bytes of the JSON file field in a multipart body
pub fn extract_json_file<'a>(content_type: &str, body: &'a [u8]) -> Result<&'a [u8], MultipartError> {
    let boundary = boundary(content_type).ok_or(MultipartError::MissingBoundary)?;
    Parts::new(body, boundary)
        .find(|part| part.is_json_file())
        .map(|part| part.body)
        .ok_or(MultipartError::NoFileField)
}
