//! Fixed-width field primitives shared by every bank layout
//!
//! All record fields pass through [`fit`]: text is reduced to printable
//! ASCII, cut to the field width when too long and padded otherwise. Amounts
//! and dates are turned into digit strings first and then fitted the same
//! way. Nothing here keeps state.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::warn;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use core_kernel::Money;

use crate::error::RemittanceError;

/// Width of every CNAB400 record, terminator excluded
pub const RECORD_WIDTH: usize = 400;

/// Line terminator between records
pub const LINE_TERMINATOR: &str = "\r\n";

/// Side a value is aligned to before padding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    /// Pad on the left; numeric fields
    Right,
    /// Pad on the right; text fields
    Left,
}

/// Base letter for Latin-1 letters that have no canonical decomposition
fn fold_letter(c: char) -> Option<char> {
    match c {
        'Æ' => Some('A'),
        'æ' => Some('a'),
        'Ð' => Some('D'),
        'ð' => Some('d'),
        'Ø' => Some('O'),
        'ø' => Some('o'),
        'Þ' => Some('T'),
        'þ' => Some('t'),
        'ß' => Some('s'),
        _ => None,
    }
}

/// Strips diacritics and reduces `value` to printable ASCII
///
/// Accented letters become their unaccented base letter with the same case.
/// Any other character outside printable ASCII becomes a space. One input
/// character never yields more than one output character.
pub fn normalize_text(value: &str) -> String {
    value
        .chars()
        .filter_map(|c| {
            if c.is_ascii() {
                return Some(if c.is_ascii_control() { ' ' } else { c });
            }
            if let Some(folded) = fold_letter(c) {
                return Some(folded);
            }
            let mut base = c.nfd().filter(|d| !is_combining_mark(*d));
            match (base.next(), base.next()) {
                (Some(b), None) if b.is_ascii() && !b.is_ascii_control() => Some(b),
                // Lone combining marks vanish like the accents they are
                (None, _) => None,
                _ => Some(' '),
            }
        })
        .collect()
}

/// Result of fitting a value into a fixed-width field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fitted {
    pub value: String,
    /// Normalized length before a cut, when the value was too long
    pub truncated_from: Option<usize>,
}

/// Normalizes `value` and makes it exactly `width` characters long
///
/// Longer values keep their first `width` characters; shorter ones are
/// padded with `pad` on the side opposite to `align`.
pub fn fit(value: &str, width: usize, pad: char, align: Align) -> Fitted {
    let normalized = normalize_text(value);
    let pad = if pad.is_ascii() && !pad.is_ascii_control() { pad } else { ' ' };
    let len = normalized.chars().count();

    if len > width {
        return Fitted {
            value: normalized.chars().take(width).collect(),
            truncated_from: Some(len),
        };
    }

    let padding: String = std::iter::repeat(pad).take(width - len).collect();
    let value = match align {
        Align::Right => padding + &normalized,
        Align::Left => normalized + &padding,
    };
    Fitted {
        value,
        truncated_from: None,
    }
}

/// [`fit`] without the truncation report
pub fn format_field(value: &str, width: usize, pad: char, align: Align) -> String {
    fit(value, width, pad, align).value
}

/// Amount as digits with two implied decimals: `1000.00` becomes `100000`
///
/// The sign is not representable in these fields and is dropped.
pub fn format_currency(amount: &Money) -> String {
    amount
        .to_invariant_string()
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect()
}

/// `ddMMyy`
pub fn format_date(date: NaiveDate) -> String {
    date.format("%d%m%y").to_string()
}

/// A field that did not fit and was cut
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldTruncation {
    pub record: &'static str,
    pub field: &'static str,
    pub width: usize,
    pub original_len: usize,
}

/// One declared field of a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub width: usize,
    pub value: String,
}

/// A finished record: its fields in declared order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub kind: &'static str,
    pub fields: Vec<Field>,
    pub truncations: Vec<FieldTruncation>,
}

impl Record {
    /// Concatenated field values
    pub fn line(&self) -> String {
        self.fields.iter().map(|f| f.value.as_str()).collect()
    }

    /// Sum of declared widths
    pub fn declared_width(&self) -> usize {
        self.fields.iter().map(|f| f.width).sum()
    }

    /// Field by name, first match
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Builds a record field by field
#[derive(Debug)]
pub struct RecordBuilder {
    kind: &'static str,
    fields: Vec<Field>,
    truncations: Vec<FieldTruncation>,
}

impl RecordBuilder {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            fields: Vec::new(),
            truncations: Vec::new(),
        }
    }

    fn push(mut self, name: &'static str, width: usize, value: &str, pad: char, align: Align) -> Self {
        let fitted = fit(value, width, pad, align);
        if let Some(original_len) = fitted.truncated_from {
            warn!(
                record = self.kind,
                field = name,
                width,
                original_len,
                "field truncated to width"
            );
            self.truncations.push(FieldTruncation {
                record: self.kind,
                field: name,
                width,
                original_len,
            });
        }
        self.fields.push(Field {
            name,
            width,
            value: fitted.value,
        });
        self
    }

    /// Fixed text whose width is its own length
    pub fn literal(self, name: &'static str, value: &'static str) -> Self {
        let width = value.chars().count();
        self.push(name, width, value, ' ', Align::Left)
    }

    /// Left-aligned, space padded
    pub fn text(self, name: &'static str, width: usize, value: &str) -> Self {
        self.push(name, width, value, ' ', Align::Left)
    }

    /// Right-aligned, zero padded
    pub fn number(self, name: &'static str, width: usize, value: impl ToString) -> Self {
        self.push(name, width, &value.to_string(), '0', Align::Right)
    }

    pub fn blank(self, name: &'static str, width: usize) -> Self {
        self.push(name, width, "", ' ', Align::Left)
    }

    pub fn zeros(self, name: &'static str, width: usize) -> Self {
        self.push(name, width, "", '0', Align::Right)
    }

    /// Amount with two implied decimals, zero padded
    pub fn currency(self, name: &'static str, width: usize, amount: &Money) -> Self {
        self.push(name, width, &format_currency(amount), '0', Align::Right)
    }

    /// `ddMMyy`, or zeros when absent
    pub fn date(self, name: &'static str, date: Option<NaiveDate>) -> Self {
        match date {
            Some(date) => self.push(name, 6, &format_date(date), '0', Align::Right),
            None => self.zeros(name, 6),
        }
    }

    /// Checks the record adds up to [`RECORD_WIDTH`]
    pub fn finish(self) -> Result<Record, RemittanceError> {
        let record = Record {
            kind: self.kind,
            fields: self.fields,
            truncations: self.truncations,
        };
        let width = record.declared_width();
        if width != RECORD_WIDTH {
            return Err(RemittanceError::Layout {
                record: record.kind,
                width,
            });
        }
        Ok(record)
    }
}
