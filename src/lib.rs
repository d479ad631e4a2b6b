//! # FIRDS ETL Library
//!
//! Pulls the ESMA FIRDS reference-data register, picks the DLTINS delta file out
//! of a publication-date search, downloads and unpacks it, projects every
//! instrument record into a six-column CSV and publishes the CSV to S3.
//!
//! ## Pipeline
//!
//! Stages run strictly one after another; each one writes a file that the next
//! one reads:
//!
//! 1. [`fetcher::search::SearchClient`] - query the file register, persist the XML response
//! 2. [`fetcher::resolver`] - find the first `DLTINS` entry and its download link
//! 3. [`fetcher::archive::ArchiveDownloader`] - stream the ZIP to disk
//! 4. [`fetcher::archive::extract_archive`] - unpack the ZIP
//! 5. [`projector`] - stream the DLTINS XML into [`InstrumentRow`]s written as CSV
//! 6. [`publisher::Publisher`] - upload the CSV to the configured bucket
//!
//! [`pipeline::Pipeline`] wires the stages together.
//!
//! ## Quick Start
//!
//! ```no_run
//! use firds_etl::pipeline::{Pipeline, PipelineConfig};
//! use firds_etl::publisher::{Publisher, PublisherConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let publisher = Publisher::new(PublisherConfig::from_env());
//! let pipeline = Pipeline::new(PipelineConfig::default(), publisher);
//!
//! // Project only the first 100 records
//! let summary = pipeline.run(Some(100)).await?;
//! println!("{} rows, published: {}", summary.rows_written, summary.published);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

use serde::{Deserialize, Serialize};

/// CLI command implementation
pub mod cli;

/// Register search, link resolution, archive download and extraction
pub mod fetcher;

/// CSV output writers
pub mod output;

/// Stage orchestration and configuration
pub mod pipeline;

/// DLTINS document projection
pub mod projector;

/// Object storage upload
pub mod publisher;

/// CSV column headers, in output order
pub const CSV_HEADERS: [&str; 6] = [
    "FinInstrmGnlAttrbts.Id",
    "FinInstrmGnlAttrbts.FullNm",
    "FinInstrmGnlAttrbts.ClssfctnTp",
    "FinInstrmGnlAttrbts.CmmdtyDerivInd",
    "FinInstrmGnlAttrbts.NtnlCcy",
    "Issr",
];

/// One projected instrument record
///
/// Fields are optional: a general-attributes group that lacks one of the
/// target elements produces an empty CSV cell, not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentRow {
    /// Instrument identifier (ISIN)
    #[serde(rename = "FinInstrmGnlAttrbts.Id")]
    pub id: Option<String>,
    /// Full instrument name
    #[serde(rename = "FinInstrmGnlAttrbts.FullNm")]
    pub full_name: Option<String>,
    /// CFI classification code
    #[serde(rename = "FinInstrmGnlAttrbts.ClssfctnTp")]
    pub classification_type: Option<String>,
    /// Commodity derivative indicator
    #[serde(rename = "FinInstrmGnlAttrbts.CmmdtyDerivInd")]
    pub commodity_derivative_indicator: Option<String>,
    /// Notional currency
    #[serde(rename = "FinInstrmGnlAttrbts.NtnlCcy")]
    pub notional_currency: Option<String>,
    /// Issuer LEI
    #[serde(rename = "Issr")]
    pub issuer: Option<String>,
}

/// General-attribute fields captured by tag-name suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeField {
    /// `...Id`
    Id,
    /// `...FullNm`
    FullName,
    /// `...ClssfctnTp`
    ClassificationType,
    /// `...CmmdtyDerivInd`
    CommodityDerivativeIndicator,
    /// `...NtnlCcy`
    NotionalCurrency,
}

impl AttributeField {
    /// Match order for suffix classification; the first hit wins.
    pub const ALL: [AttributeField; 5] = [
        AttributeField::Id,
        AttributeField::FullName,
        AttributeField::ClassificationType,
        AttributeField::CommodityDerivativeIndicator,
        AttributeField::NotionalCurrency,
    ];

    /// Tag-name suffix identifying this field
    pub fn suffix(&self) -> &'static str {
        match self {
            AttributeField::Id => "Id",
            AttributeField::FullName => "FullNm",
            AttributeField::ClassificationType => "ClssfctnTp",
            AttributeField::CommodityDerivativeIndicator => "CmmdtyDerivInd",
            AttributeField::NotionalCurrency => "NtnlCcy",
        }
    }

    /// Classify a (possibly namespace-qualified) tag name by suffix
    pub fn classify(tag: &[u8]) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|field| tag.ends_with(field.suffix().as_bytes()))
    }
}

impl InstrumentRow {
    /// Store a captured general-attribute value, replacing any earlier capture
    pub fn set_attribute(&mut self, field: AttributeField, value: Option<String>) {
        let slot = match field {
            AttributeField::Id => &mut self.id,
            AttributeField::FullName => &mut self.full_name,
            AttributeField::ClassificationType => &mut self.classification_type,
            AttributeField::CommodityDerivativeIndicator => {
                &mut self.commodity_derivative_indicator
            }
            AttributeField::NotionalCurrency => &mut self.notional_currency,
        };
        *slot = value;
    }
}
