//! Custom Test Assertions
//!
//! Structural checks for CNAB400 content with messages that point at the
//! offending line and column.

use domain_remittance::cnab::{Record, LINE_TERMINATOR, RECORD_WIDTH};

/// Splits file bytes into records, asserting every record is CRLF
/// terminated
pub fn split_records(bytes: &[u8]) -> Vec<String> {
    let text = std::str::from_utf8(bytes).expect("remittance file is not UTF-8");
    assert!(
        text.ends_with(LINE_TERMINATOR),
        "last record is not CRLF terminated"
    );
    let records: Vec<String> = text
        .strip_suffix(LINE_TERMINATOR)
        .unwrap_or(text)
        .split(LINE_TERMINATOR)
        .map(str::to_string)
        .collect();
    for (index, record) in records.iter().enumerate() {
        assert!(
            !record.contains('\n') && !record.contains('\r'),
            "line {} carries a stray line break",
            index + 1
        );
    }
    records
}

/// Asserts a record is exactly [`RECORD_WIDTH`] printable ASCII characters
pub fn assert_record_shape(line: &str, line_number: usize) {
    assert_eq!(
        line.len(),
        RECORD_WIDTH,
        "line {line_number} is {} characters wide",
        line.len()
    );
    if let Some((column, c)) = line
        .chars()
        .enumerate()
        .find(|(_, c)| !c.is_ascii() || c.is_ascii_control())
    {
        panic!("line {line_number} column {} holds {c:?}", column + 1);
    }
}

/// Asserts the whole file: header, `details` detail records and trailer,
/// with sequence numbers 1..=details+2 in columns 395-400
pub fn assert_cnab_file(bytes: &[u8], details: usize) {
    let records = split_records(bytes);
    assert_eq!(
        records.len(),
        details + 2,
        "expected {} records, found {}",
        details + 2,
        records.len()
    );

    for (index, line) in records.iter().enumerate() {
        let line_number = index + 1;
        assert_record_shape(line, line_number);
        assert_eq!(
            &line[394..400],
            format!("{line_number:06}"),
            "line {line_number} sequence"
        );
    }

    assert!(records[0].starts_with('0'), "first record is not a header");
    assert!(records[records.len() - 1].starts_with('9'), "last record is not a trailer");
    for line in &records[1..records.len() - 1] {
        assert!(
            line.starts_with('1'),
            "detail record starts with {:?}",
            &line[..1]
        );
    }
}

/// Asserts the 1-indexed inclusive column range of a record
pub fn assert_columns(line: &str, from: usize, to: usize, expected: &str) {
    let actual = &line[from - 1..to];
    assert_eq!(actual, expected, "columns {from}-{to}");
}

/// Asserts a record's fields cover the record with no gap or overlap
pub fn assert_fields_tile(record: &Record) {
    assert_eq!(
        record.declared_width(),
        RECORD_WIDTH,
        "{} declares {} columns",
        record.kind,
        record.declared_width()
    );
    let mut column = 1;
    for field in &record.fields {
        assert_eq!(
            field.value.len(),
            field.width,
            "field {} at column {column} rendered {} characters for width {}",
            field.name,
            field.value.len(),
            field.width
        );
        column += field.width;
    }
    assert_eq!(record.line().len(), RECORD_WIDTH);
}
