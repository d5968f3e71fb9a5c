//! Key sources: where raw key rows come from.
//!
//! The shipped format is a CSV file with a header row naming the columns
//! `system_code`, `node`, `key` and `version`:
//!
//! ```text
//! system_code,node,key,version
//! 0003,FFFF,00112233445566778899AABBCCDDEEFF,1
//! 0003,0000,0123456789ABCDEF,1
//! 0003,1008,FEDCBA9876543210,2
//! ```
//!
//! Column order is free and fields may be quoted. Values are trimmed and
//! blank lines are skipped.

use crate::error::{KeyTableError, KeyTableResult};
use felica_core::{KeyMaterial, KeyRecord, SystemCode, parse_hex_u16};
use serde::Deserialize;
use std::cell::Cell;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const COLUMNS: [&str; 4] = ["system_code", "node", "key", "version"];

/// One parsed row of a key source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRow {
    pub system_code: SystemCode,
    pub record: KeyRecord,
}

/// Repository of key rows.
///
/// This trait defines the contract between the key table and wherever key
/// material is stored, so the table can be exercised against an in-memory
/// source in tests.
pub trait KeySource {
    /// Human-readable name of the source, used in log messages.
    fn describe(&self) -> String;

    /// Read every row of the source.
    ///
    /// # Errors
    /// Any malformed row fails the whole read.
    fn read_rows(&self) -> KeyTableResult<Vec<KeyRow>>;
}

/// Key source backed by a CSV file.
#[derive(Debug, Clone)]
pub struct CsvKeySource {
    path: PathBuf,
}

impl CsvKeySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeySource for CsvKeySource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn read_rows(&self) -> KeyTableResult<Vec<KeyRow>> {
        let text = std::fs::read_to_string(&self.path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => KeyTableError::NotFound {
                path: self.path.clone(),
            },
            _ => KeyTableError::Io(e),
        })?;
        parse_rows(&text)
    }
}

/// Key source over CSV text held in memory.
///
/// Counts how many times it has been read, which is what cache tests need.
#[derive(Debug, Default)]
pub struct MemoryKeySource {
    text: String,
    reads: Cell<usize>,
}

impl MemoryKeySource {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            reads: Cell::new(0),
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.get()
    }
}

impl KeySource for MemoryKeySource {
    fn describe(&self) -> String {
        "<memory>".to_string()
    }

    fn read_rows(&self) -> KeyTableResult<Vec<KeyRow>> {
        self.reads.set(self.reads.get() + 1);
        parse_rows(&self.text)
    }
}

/// Raw CSV row, matched to the header by column name.
#[derive(Debug, Deserialize)]
struct CsvRow<'a> {
    system_code: &'a str,
    node: &'a str,
    key: &'a str,
    version: &'a str,
}

impl CsvRow<'_> {
    fn parse(&self) -> Result<KeyRow, String> {
        let system_code = parse_hex_u16(self.system_code).map_err(|e| e.to_string())?;
        let node = parse_hex_u16(self.node).map_err(|e| e.to_string())?;
        let key = KeyMaterial::from_hex(self.key).map_err(|e| e.to_string())?;
        let version = self
            .version
            .parse::<u32>()
            .map_err(|_| format!("Invalid integer value: {}", self.version))?;

        Ok(KeyRow {
            system_code: SystemCode::new(system_code),
            record: KeyRecord::new(node, version, key),
        })
    }
}

fn record_line(position: Option<&csv::Position>) -> usize {
    position.map_or(0, |pos| pos.line() as usize)
}

/// Parse CSV key rows.
///
/// Fields may be quoted and are trimmed.
///
/// # Errors
/// Returns `KeyTableError::MissingColumn` if the header lacks a column and
/// `KeyTableError::InvalidRow` for the first row that fails to parse.
pub fn parse_rows(text: &str) -> KeyTableResult<Vec<KeyRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    if headers.is_empty() {
        return Ok(Vec::new());
    }
    if let Some(column) = COLUMNS
        .iter()
        .find(|column| !headers.iter().any(|name| name == **column))
    {
        return Err(KeyTableError::MissingColumn((*column).to_string()));
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| KeyTableError::InvalidRow {
            line: record_line(e.position()),
            message: e.to_string(),
        })?;
        let line = record_line(record.position());
        let invalid = |message: String| KeyTableError::InvalidRow { line, message };

        let raw: CsvRow = record
            .deserialize(Some(&headers))
            .map_err(|e| invalid(e.to_string()))?;
        rows.push(raw.parse().map_err(invalid)?);
    }

    Ok(rows)
}
