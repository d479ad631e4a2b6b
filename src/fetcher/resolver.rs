//! Download-link resolution from a FIRDS search response
//!
//! The register answers with a Solr XML document:
//!
//! ```xml
//! <response>
//!   <lst name="responseHeader">...</lst>
//!   <result name="response" numFound="3" start="0">
//!     <doc>
//!       <str name="download_link">http://firds.esma.europa.eu/firds/DLTINS_20210117_01of01.zip</str>
//!       <str name="file_type">DLTINS</str>
//!     </doc>
//!   </result>
//! </response>
//! ```
//!
//! Entries are scanned in document order and the first one whose `file_type`
//! equals the requested marker wins.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::io::BufRead;
use std::path::Path;
use tracing::{debug, info};

use super::{FetcherError, FetcherResult};

const RESULT_TAG: &[u8] = b"result";
const DOC_TAG: &[u8] = b"doc";
const STR_TAG: &[u8] = b"str";
const DOWNLOAD_LINK_ATTR: &str = "download_link";
const FILE_TYPE_ATTR: &str = "file_type";

/// Attributes collected for the entry currently being scanned
#[derive(Debug, Default)]
struct EntryState {
    download_link: Option<String>,
    is_target: bool,
}

/// `<str name="...">` element currently being read
#[derive(Debug)]
struct AttributeCapture {
    name: String,
    text: String,
}

/// Resolve the download link from a stored search response
///
/// # Errors
/// `IoError` if the file cannot be opened, `ParseError` on malformed XML,
/// `NotFound` if no entry carries `file_type`.
pub fn resolve_download_link(path: &Path, file_type: &str) -> FetcherResult<String> {
    let file = std::fs::File::open(path)
        .map_err(|e| FetcherError::IoError(format!("Failed to open {}: {e}", path.display())))?;

    find_download_link(std::io::BufReader::new(file), file_type)?.ok_or_else(|| {
        FetcherError::NotFound(format!(
            "no {file_type} entry in search response {}",
            path.display()
        ))
    })
}

/// Scan search-response XML for the first entry of `file_type`
///
/// Returns `Ok(None)` when no entry qualifies, or when the first qualifying
/// entry carries no `download_link`.
pub fn find_download_link<R: BufRead>(source: R, file_type: &str) -> FetcherResult<Option<String>> {
    let mut reader = Reader::from_reader(source);
    reader.config_mut().expand_empty_elements = true;

    let mut buf = Vec::new();
    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut entry: Option<EntryState> = None;
    let mut capture: Option<AttributeCapture> = None;
    let mut entries_seen = 0usize;

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| parse_error(&reader, e))?;

        match event {
            Event::Start(start) => {
                path.push(start.local_name().as_ref().to_vec());
                if is_entry_path(&path) {
                    entries_seen += 1;
                    entry = Some(EntryState::default());
                } else if is_attribute_path(&path) {
                    capture = Some(AttributeCapture {
                        name: name_attribute(&start)?,
                        text: String::new(),
                    });
                }
            }
            Event::Text(text) => {
                if let Some(capture) = capture.as_mut() {
                    let text = text
                        .unescape()
                        .map_err(|e| FetcherError::ParseError(e.to_string()))?;
                    capture.text.push_str(&text);
                }
            }
            Event::CData(cdata) => {
                if let Some(capture) = capture.as_mut() {
                    let text = reader
                        .decoder()
                        .decode(&cdata)
                        .map_err(|e| FetcherError::ParseError(e.to_string()))?;
                    capture.text.push_str(&text);
                }
            }
            Event::End(_) => {
                if is_attribute_path(&path) {
                    if let (Some(done), Some(state)) = (capture.take(), entry.as_mut()) {
                        record_attribute(state, done, file_type);
                    }
                } else if is_entry_path(&path) {
                    if let Some(state) = entry.take() {
                        if state.is_target {
                            info!(
                                "Found {} entry at position {}: {:?}",
                                file_type, entries_seen, state.download_link
                            );
                            return Ok(state.download_link);
                        }
                    }
                }
                path.pop();
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    debug!("Scanned {} entries, none with file_type {}", entries_seen, file_type);
    Ok(None)
}

fn record_attribute(state: &mut EntryState, capture: AttributeCapture, file_type: &str) {
    match capture.name.as_str() {
        DOWNLOAD_LINK_ATTR => state.download_link = Some(capture.text),
        FILE_TYPE_ATTR if capture.text == file_type => state.is_target = true,
        _ => {}
    }
}

/// `<response><result><doc>`
fn is_entry_path(path: &[Vec<u8>]) -> bool {
    path.len() == 3 && path[1] == RESULT_TAG && path[2] == DOC_TAG
}

/// `<response><result><doc><str>`
fn is_attribute_path(path: &[Vec<u8>]) -> bool {
    path.len() == 4 && path[1] == RESULT_TAG && path[2] == DOC_TAG && path[3] == STR_TAG
}

fn name_attribute(start: &BytesStart<'_>) -> FetcherResult<String> {
    let attr = start
        .try_get_attribute("name")
        .map_err(|e| FetcherError::ParseError(format!("Invalid attribute: {e}")))?;

    match attr {
        Some(attr) => attr
            .unescape_value()
            .map(|value| value.into_owned())
            .map_err(|e| FetcherError::ParseError(format!("Invalid attribute value: {e}"))),
        None => Ok(String::new()),
    }
}

fn parse_error<R>(reader: &Reader<R>, err: quick_xml::Error) -> FetcherError {
    FetcherError::ParseError(format!(
        "malformed search response at byte {}: {err}",
        reader.buffer_position()
    ))
}
