//! Product table loading with text-encoding fallback

use encoding_rs::{UTF_8, WINDOWS_1252};
use std::borrow::Cow;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::error::DataLoadError;
use crate::types::{ProductRecord, REQUIRED_COLUMNS};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Text encodings the loader knows how to try
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceEncoding {
    Utf8Sig,
    Utf8,
    Latin1,
    Windows1252,
}

impl SourceEncoding {
    /// Tried in this order; the first one that yields a record wins
    pub const FALLBACK_ORDER: [SourceEncoding; 4] = [
        SourceEncoding::Utf8Sig,
        SourceEncoding::Utf8,
        SourceEncoding::Latin1,
        SourceEncoding::Windows1252,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceEncoding::Utf8Sig => "utf-8-sig",
            SourceEncoding::Utf8 => "utf-8",
            SourceEncoding::Latin1 => "latin-1",
            SourceEncoding::Windows1252 => "windows-1252",
        }
    }

    /// Strictly decode `bytes`, returning None if they are not valid in this encoding
    pub fn decode<'a>(&self, bytes: &'a [u8]) -> Option<Cow<'a, str>> {
        match self {
            SourceEncoding::Utf8Sig => {
                let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
                UTF_8.decode_without_bom_handling_and_without_replacement(body)
            }
            SourceEncoding::Utf8 => UTF_8.decode_without_bom_handling_and_without_replacement(bytes),
            SourceEncoding::Latin1 => decode_latin1(bytes),
            SourceEncoding::Windows1252 => {
                WINDOWS_1252.decode_without_bom_handling_and_without_replacement(bytes)
            }
        }
    }
}

impl fmt::Display for SourceEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// ISO-8859-1 maps every byte straight to the code point of the same value.
///
/// encoding_rs treats the "latin1" label as windows-1252, so this one is done
/// by hand. Bytes 0x80-0x9F are C1 controls that real Latin-1 text never
/// contains; they are rejected so windows-1252 gets a chance at them.
fn decode_latin1(bytes: &[u8]) -> Option<Cow<'_, str>> {
    if bytes.iter().any(|b| (0x80..=0x9F).contains(b)) {
        return None;
    }
    if bytes.is_ascii() {
        // ASCII is valid UTF-8 already
        return std::str::from_utf8(bytes).ok().map(Cow::Borrowed);
    }
    Some(Cow::Owned(bytes.iter().map(|&b| char::from(b)).collect()))
}

/// Records loaded from the product table, plus how they were decoded
#[derive(Debug, Clone)]
pub struct LoadedTable {
    pub records: Vec<ProductRecord>,
    pub encoding: SourceEncoding,
}

impl LoadedTable {
    /// Column names as they appear on the first record
    pub fn columns(&self) -> Vec<&str> {
        self.records
            .first()
            .map(|r| r.columns().collect())
            .unwrap_or_default()
    }
}

/// Load product records from a CSV file, trying each encoding in turn
pub fn load_records(path: &Path) -> Result<LoadedTable, DataLoadError> {
    let bytes = fs::read(path).map_err(|source| DataLoadError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;

    for encoding in SourceEncoding::FALLBACK_ORDER {
        let Some(text) = encoding.decode(&bytes) else {
            debug!(%encoding, "input is not valid in this encoding");
            continue;
        };

        match parse_table(&text) {
            Ok(records) if !records.is_empty() => {
                debug!(%encoding, rows = records.len(), "parsed product table");
                let table = LoadedTable { records, encoding };
                check_required_columns(&table, path)?;
                return Ok(table);
            }
            Ok(_) => debug!(%encoding, "decoded but found no data rows"),
            Err(err) => debug!(%encoding, error = %err, "CSV parse failed"),
        }
    }

    let tried = SourceEncoding::FALLBACK_ORDER
        .iter()
        .map(SourceEncoding::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    Err(DataLoadError::NoUsableEncoding {
        path: path.to_path_buf(),
        tried,
    })
}

/// The header names don't depend on which encoding won, so this fails fast
fn check_required_columns(table: &LoadedTable, path: &Path) -> Result<(), DataLoadError> {
    let columns = table.columns();
    for column in REQUIRED_COLUMNS {
        if !columns.contains(&column) {
            return Err(DataLoadError::MissingColumn {
                path: path.to_path_buf(),
                column: column.to_string(),
            });
        }
    }
    Ok(())
}

/// Parse decoded CSV text into records keyed by the header row.
///
/// Short rows are padded with empty strings and cells past the last header
/// column are dropped, so every record carries exactly the header's keys.
fn parse_table(text: &str) -> Result<Vec<ProductRecord>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    let mut records = Vec::new();

    for row in reader.records() {
        let row = row?;
        let record: ProductRecord = headers
            .iter()
            .enumerate()
            .map(|(i, column)| (column, row.get(i).unwrap_or("")))
            .collect();
        records.push(record);
    }

    Ok(records)
}
