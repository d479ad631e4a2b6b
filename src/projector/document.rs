//! Streaming positional reader for DLTINS documents
//!
//! A DLTINS file has a fixed shape:
//!
//! ```text
//! BizData
//! ├── Hdr                                  (ignored)
//! └── Pyld
//!     └── Document
//!         └── FinInstrmRptgRefDataDltaRpt
//!             ├── RptHdr                   (ignored)
//!             ├── FinInstrm
//!             │   └── TermntdRcrd
//!             │       ├── FinInstrmGnlAttrbts
//!             │       │   ├── Id, FullNm, ShrtNm, ClssfctnTp, NtnlCcy, CmmdtyDerivInd
//!             │       └── Issr
//!             └── FinInstrm ...
//! ```
//!
//! Elements are identified by position, not by name: only the children of the
//! general-attributes group are matched, and those by tag suffix so that any
//! namespace prefix is accepted. Every level is bounds-checked when it closes,
//! so a document of the wrong shape fails with [`ProjectError::ParseError`]
//! instead of yielding partial rows.
//!
//! Files run to hundreds of thousands of records; the reader keeps one event
//! buffer and one row in memory at a time.

use quick_xml::events::Event;
use quick_xml::reader::Reader;
use std::io::BufRead;
use tracing::debug;

use super::{ProjectError, ProjectResult};
use crate::{AttributeField, InstrumentRow};

/// Position-derived meaning of an open element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Root,
    Payload,
    Document,
    Report,
    Entry,
    Record,
    Attributes,
    Field(AttributeField),
    Issuer,
    Skipped,
}

impl Role {
    /// Minimum number of child elements required when the element closes
    fn min_children(&self) -> usize {
        match self {
            Role::Root | Role::Record => 2,
            Role::Payload | Role::Document | Role::Report | Role::Entry => 1,
            _ => 0,
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            Role::Root => "document root (header, payload)",
            Role::Payload => "payload (document)",
            Role::Document => "document wrapper (report)",
            Role::Report => "report (header)",
            Role::Entry => "instrument entry (record)",
            Role::Record => "terminated record (general attributes, issuer)",
            _ => "element",
        }
    }

    fn captures_text(&self) -> bool {
        matches!(self, Role::Field(_) | Role::Issuer)
    }
}

#[derive(Debug)]
struct Frame {
    role: Role,
    children: usize,
}

/// Decoded reader event, detached from the event buffer
enum Step {
    Open(Role),
    Close,
    Text(String),
    Eof,
    Other,
}

/// Iterator over the instrument rows of a DLTINS document, in document order
pub struct RecordReader<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    stack: Vec<Frame>,
    row: Option<InstrumentRow>,
    text: Option<String>,
    root_seen: bool,
    finished: bool,
    records: u64,
}

impl<R: BufRead> RecordReader<R> {
    /// Create a reader over `source`
    pub fn new(source: R) -> Self {
        let mut reader = Reader::from_reader(source);
        reader.config_mut().expand_empty_elements = true;

        Self {
            reader,
            buf: Vec::with_capacity(1024),
            stack: Vec::with_capacity(16),
            row: None,
            text: None,
            root_seen: false,
            finished: false,
            records: 0,
        }
    }

    /// Number of records projected so far
    pub fn records_read(&self) -> u64 {
        self.records
    }

    /// Advance to the next projected row
    ///
    /// Returns `Ok(None)` once the document root has closed.
    pub fn next_row(&mut self) -> ProjectResult<Option<InstrumentRow>> {
        while !self.finished {
            let step = self.read_step()?;
            match step {
                Step::Open(role) => self.open(role),
                Step::Close => {
                    if let Some(row) = self.close()? {
                        self.records += 1;
                        return Ok(Some(row));
                    }
                }
                Step::Text(text) => self.text.get_or_insert_with(String::new).push_str(&text),
                Step::Eof => {
                    if !self.root_seen {
                        return Err(ProjectError::ParseError(
                            "document has no root element".to_string(),
                        ));
                    }
                    return Err(ProjectError::ParseError(format!(
                        "unexpected end of document with {} unclosed element(s)",
                        self.stack.len()
                    )));
                }
                Step::Other => {}
            }
        }
        Ok(None)
    }

    fn read_step(&mut self) -> ProjectResult<Step> {
        let capturing = self.capturing();
        let event = match self.reader.read_event_into(&mut self.buf) {
            Ok(event) => event,
            Err(e) => {
                return Err(ProjectError::ParseError(format!(
                    "malformed XML at byte {}: {e}",
                    self.reader.buffer_position()
                )))
            }
        };

        let step = match event {
            Event::Start(start) => Step::Open(child_role(&mut self.stack, start.name().as_ref())),
            Event::End(_) => Step::Close,
            Event::Text(text) if capturing => {
                let text = text
                    .unescape()
                    .map_err(|e| ProjectError::ParseError(format!("invalid text: {e}")))?;
                Step::Text(text.into_owned())
            }
            Event::CData(cdata) if capturing => {
                let text = self
                    .reader
                    .decoder()
                    .decode(&cdata)
                    .map_err(|e| ProjectError::ParseError(format!("invalid CDATA: {e}")))?;
                Step::Text(text.into_owned())
            }
            Event::Eof => Step::Eof,
            _ => Step::Other,
        };
        self.buf.clear();
        Ok(step)
    }

    /// Text counts only before the first child element, like a DOM's leading text
    fn capturing(&self) -> bool {
        self.stack
            .last()
            .is_some_and(|top| top.role.captures_text() && top.children == 0)
    }

    fn open(&mut self, role: Role) {
        match role {
            Role::Root => self.root_seen = true,
            Role::Record => self.row = Some(InstrumentRow::default()),
            Role::Field(_) | Role::Issuer => self.text = None,
            _ => {}
        }
        self.stack.push(Frame { role, children: 0 });
    }

    fn close(&mut self) -> ProjectResult<Option<InstrumentRow>> {
        let frame = self
            .stack
            .pop()
            .ok_or_else(|| ProjectError::ParseError("unbalanced end tag".to_string()))?;

        if frame.children < frame.role.min_children() {
            return Err(ProjectError::ParseError(format!(
                "{} has {} child element(s), expected at least {}",
                frame.role.describe(),
                frame.children,
                frame.role.min_children()
            )));
        }

        match frame.role {
            Role::Field(field) => {
                let value = self.text.take();
                if let Some(row) = self.row.as_mut() {
                    row.set_attribute(field, value);
                }
            }
            Role::Issuer => {
                let value = self.text.take();
                if let Some(row) = self.row.as_mut() {
                    row.issuer = value;
                }
            }
            Role::Record => return Ok(self.row.take()),
            Role::Root => {
                debug!("Document closed after {} records", self.records);
                self.finished = true;
            }
            _ => {}
        }
        Ok(None)
    }
}

/// Assign a role to a new child of the current top frame
fn child_role(stack: &mut [Frame], name: &[u8]) -> Role {
    let Some(parent) = stack.last_mut() else {
        return Role::Root;
    };
    let index = parent.children;
    parent.children += 1;

    match (parent.role, index) {
        (Role::Root, 1) => Role::Payload,
        (Role::Payload, 0) => Role::Document,
        (Role::Document, 0) => Role::Report,
        (Role::Report, i) if i >= 1 => Role::Entry,
        (Role::Entry, 0) => Role::Record,
        (Role::Record, 0) => Role::Attributes,
        (Role::Record, 1) => Role::Issuer,
        (Role::Attributes, _) => AttributeField::classify(name)
            .map(Role::Field)
            .unwrap_or(Role::Skipped),
        _ => Role::Skipped,
    }
}

impl<R: BufRead> Iterator for RecordReader<R> {
    type Item = ProjectResult<InstrumentRow>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_row() {
            Ok(Some(row)) => Some(Ok(row)),
            Ok(None) => None,
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}
