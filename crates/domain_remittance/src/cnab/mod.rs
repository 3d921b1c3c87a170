//! CNAB400 remittance file encoding
//!
//! A remittance file is one header record, one detail record per title and
//! one trailer record, each exactly 400 characters and CRLF terminated.
//!
//! Field placement differs per bank, so each bank family implements
//! [`RemittanceCodec`] with its own layout table built from the shared
//! primitives in [`format`]. The [`CodecRegistry`] selects the codec by
//! [`Bank`], and [`ConfigurationWidths::for_bank`] hands configuration
//! validation the columns each layout gives the configuration fields.
//!
//! ```text
//! 0 REMESSA ...                                   000001   header
//! 1 ... title 1 ...                               000002   detail
//! 1 ... title N ...                               00000N+1 detail
//! 9                                               00000N+2 trailer
//! ```

pub mod bradesco;
pub mod format;
pub mod sicoob;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use crate::bank::Bank;
use crate::collaborators::EncodableTitle;
use crate::configuration::{BilletConfiguration, NewBilletConfiguration};
use crate::error::RemittanceError;

pub use bradesco::BradescoCodec;
pub use format::{
    fit, format_currency, format_date, format_field, normalize_text, Align, Field,
    FieldTruncation, Record, RecordBuilder, LINE_TERMINATOR, RECORD_WIDTH,
};
pub use sicoob::SicoobCodec;

/// A generated remittance file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemittanceFile {
    pub file_name: String,
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub line_count: usize,
    pub truncations: Vec<FieldTruncation>,
}

impl RemittanceFile {
    /// File content as text; always ASCII
    pub fn as_text(&self) -> &str {
        std::str::from_utf8(&self.bytes).unwrap_or_default()
    }

    /// Records without their terminators
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.as_text()
            .split(LINE_TERMINATOR)
            .filter(|line| !line.is_empty())
    }
}

/// Columns a layout gives each free-text or digit configuration field
///
/// Values wider than these would be cut inside the file, so configurations
/// are rejected up front instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigurationWidths {
    pub company_code: usize,
    pub company_name: usize,
    pub wallet_number: usize,
    pub agency_number: usize,
    pub account_number: usize,
    pub first_message: usize,
    pub second_message: usize,
}

impl ConfigurationWidths {
    /// Widths of the layout shipped for `bank`, if any
    pub fn for_bank(bank: Bank) -> Option<Self> {
        match bank {
            Bank::Bradesco => Some(bradesco::CONFIGURATION_WIDTHS),
            Bank::Sicoob => Some(sicoob::CONFIGURATION_WIDTHS),
            _ => None,
        }
    }

    /// Rejects the first field wider than its columns
    pub fn check(&self, bank: Bank, request: &NewBilletConfiguration) -> Result<(), RemittanceError> {
        let fields = [
            ("company_code", &request.company_code, self.company_code),
            ("company_name", &request.company_name, self.company_name),
            ("wallet_number", &request.wallet_number, self.wallet_number),
            ("agency_number", &request.agency_number, self.agency_number),
            ("account_number", &request.account_number, self.account_number),
            ("first_message", &request.first_message, self.first_message),
            ("second_message", &request.second_message, self.second_message),
        ];
        for (field, value, width) in fields {
            if value.chars().count() > width {
                return Err(RemittanceError::validation(
                    field,
                    format!("must fit the {width} columns of the {bank} layout"),
                ));
            }
        }
        Ok(())
    }
}

/// Everything one file is generated from
#[derive(Debug, Clone, Copy)]
pub struct EncodeRequest<'a> {
    pub configuration: &'a BilletConfiguration,
    /// Titles in file order
    pub titles: &'a [EncodableTitle],
    pub file_sequence: u32,
    /// Business date written in the header and the file name
    pub generated_on: NaiveDate,
}

/// Header/detail/trailer layout of one bank family
pub trait RemittanceCodec: Send + Sync {
    /// Bank family this layout belongs to
    fn bank(&self) -> Bank;

    /// Name the bank expects for the file
    fn file_name(&self, generated_on: NaiveDate, file_sequence: u32) -> String;

    /// Header record; its register sequence is always 1
    fn header(
        &self,
        configuration: &BilletConfiguration,
        file_sequence: u32,
        generated_on: NaiveDate,
    ) -> Result<Record, RemittanceError>;

    /// Detail record for one title at register `sequence`
    fn detail(
        &self,
        configuration: &BilletConfiguration,
        title: &EncodableTitle,
        sequence: u32,
    ) -> Result<Record, RemittanceError>;

    /// Trailer record; `sequence` is the total number of records
    fn trailer(&self, sequence: u32) -> Result<Record, RemittanceError> {
        RecordBuilder::new("trailer")
            .literal("record_type", "9")
            .blank("filler", 393)
            .number("sequence", 6, sequence)
            .finish()
    }

    /// Detail records for `titles` at registers 2.., checking `cancel`
    /// before each one
    fn detail_records(
        &self,
        configuration: &BilletConfiguration,
        titles: &[EncodableTitle],
        cancel: &AtomicBool,
    ) -> Result<Vec<Record>, RemittanceError> {
        if titles.is_empty() {
            return Err(RemittanceError::validation("titles", "at least one title is required"));
        }

        let mut details = Vec::with_capacity(titles.len());
        for (title, sequence) in titles.iter().zip(2u32..) {
            if cancel.load(Ordering::Relaxed) {
                return Err(RemittanceError::Cancelled);
            }
            details.push(self.detail(configuration, title, sequence)?);
        }
        Ok(details)
    }

    /// Wraps detail records with the header and the trailer
    fn frame(
        &self,
        configuration: &BilletConfiguration,
        details: Vec<Record>,
        file_sequence: u32,
        generated_on: NaiveDate,
    ) -> Result<Vec<Record>, RemittanceError> {
        let total = u32::try_from(details.len() + 2)
            .map_err(|_| RemittanceError::validation("titles", "too many titles for one file"))?;

        let mut records = Vec::with_capacity(details.len() + 2);
        records.push(self.header(configuration, file_sequence, generated_on)?);
        records.extend(details);
        records.push(self.trailer(total)?);
        Ok(records)
    }

    /// Builds every record of the file, checking `cancel` before each
    /// detail record
    fn records_with_cancellation(
        &self,
        request: &EncodeRequest<'_>,
        cancel: &AtomicBool,
    ) -> Result<Vec<Record>, RemittanceError> {
        let details = self.detail_records(request.configuration, request.titles, cancel)?;
        self.frame(request.configuration, details, request.file_sequence, request.generated_on)
    }

    /// Frames already built detail records into the named file
    ///
    /// Lets a caller take the file sequence only once every detail record
    /// has been built.
    fn finish_file(
        &self,
        configuration: &BilletConfiguration,
        details: Vec<Record>,
        file_sequence: u32,
        generated_on: NaiveDate,
    ) -> Result<RemittanceFile, RemittanceError> {
        let records = self.frame(configuration, details, file_sequence, generated_on)?;

        let mut text = String::with_capacity(records.len() * (RECORD_WIDTH + LINE_TERMINATOR.len()));
        let mut truncations = Vec::new();
        for record in &records {
            text.push_str(&record.line());
            text.push_str(LINE_TERMINATOR);
            truncations.extend(record.truncations.iter().cloned());
        }

        let file = RemittanceFile {
            file_name: self.file_name(generated_on, file_sequence),
            bytes: text.into_bytes(),
            line_count: records.len(),
            truncations,
        };
        info!(
            bank = %self.bank(),
            file_name = %file.file_name,
            lines = file.line_count,
            truncated_fields = file.truncations.len(),
            "remittance file encoded"
        );
        Ok(file)
    }

    /// Encodes the whole file, or nothing when cancelled
    fn encode_with_cancellation(
        &self,
        request: &EncodeRequest<'_>,
        cancel: &AtomicBool,
    ) -> Result<RemittanceFile, RemittanceError> {
        let details = self.detail_records(request.configuration, request.titles, cancel)?;
        self.finish_file(request.configuration, details, request.file_sequence, request.generated_on)
    }

    /// Encodes the whole file
    fn encode(&self, request: &EncodeRequest<'_>) -> Result<RemittanceFile, RemittanceError> {
        self.encode_with_cancellation(request, &AtomicBool::new(false))
    }
}

/// Codec lookup by bank
#[derive(Clone, Default)]
pub struct CodecRegistry {
    codecs: HashMap<Bank, Arc<dyn RemittanceCodec>>,
}

impl CodecRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every layout this crate ships
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(BradescoCodec));
        registry.register(Arc::new(SicoobCodec));
        registry
    }

    /// Adds or replaces the codec for its bank
    pub fn register(&mut self, codec: Arc<dyn RemittanceCodec>) {
        self.codecs.insert(codec.bank(), codec);
    }

    /// # Errors
    ///
    /// `RemittanceError::UnsupportedBank` when no layout is registered
    pub fn codec_for(&self, bank: Bank) -> Result<Arc<dyn RemittanceCodec>, RemittanceError> {
        self.codecs
            .get(&bank)
            .cloned()
            .ok_or_else(|| RemittanceError::UnsupportedBank(bank.to_string()))
    }

    /// Banks with a registered codec, in clearing-code order
    pub fn supported_banks(&self) -> Vec<Bank> {
        Bank::ALL
            .into_iter()
            .filter(|bank| self.codecs.contains_key(bank))
            .collect()
    }
}

impl std::fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("banks", &self.supported_banks())
            .finish()
    }
}
