// src/import/decoder.rs

//! Turns an uploaded file into header-keyed rows.
//!
//! Delimited text is decoded by trying a fixed list of encodings; spreadsheets
//! are read from their first sheet with row 1 as the header. The whole file is
//! held in memory.

use std::borrow::Cow;
use std::fmt;
use std::io::Cursor;

use calamine::{Data, Reader};
use encoding_rs::{Encoding, ISO_8859_15, WINDOWS_1252};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Accepted upload formats, detected from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Xlsx,
    Xls,
}

impl FileFormat {
    pub fn from_filename(filename: &str) -> Option<Self> {
        let (_, ext) = filename.rsplit_once('.')?;
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(FileFormat::Csv),
            "xlsx" => Some(FileFormat::Xlsx),
            "xls" => Some(FileFormat::Xls),
            _ => None,
        }
    }
}

/// Encodings tried in order for delimited text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8WithBom,
    Utf8,
    Windows1252,
    Iso8859_15,
    Latin1,
}

pub const ENCODING_FALLBACKS: [TextEncoding; 5] = [
    TextEncoding::Utf8WithBom,
    TextEncoding::Utf8,
    TextEncoding::Windows1252,
    TextEncoding::Iso8859_15,
    TextEncoding::Latin1,
];

impl TextEncoding {
    /// Strict decode; `None` when the bytes are not valid in this encoding.
    pub fn decode<'a>(&self, bytes: &'a [u8]) -> Option<Cow<'a, str>> {
        match self {
            TextEncoding::Utf8WithBom => {
                let body = bytes.strip_prefix(UTF8_BOM)?;
                std::str::from_utf8(body).ok().map(Cow::Borrowed)
            }
            TextEncoding::Utf8 => std::str::from_utf8(bytes).ok().map(Cow::Borrowed),
            TextEncoding::Windows1252 => decode_single_byte(WINDOWS_1252, bytes),
            TextEncoding::Iso8859_15 => decode_single_byte(ISO_8859_15, bytes),
            TextEncoding::Latin1 => Some(Cow::Owned(bytes.iter().map(|&b| b as char).collect())),
        }
    }
}

fn decode_single_byte<'a>(encoding: &'static Encoding, bytes: &'a [u8]) -> Option<Cow<'a, str>> {
    encoding.decode_without_bom_handling_and_without_replacement(bytes)
}

/// File-level failures. Any of these aborts the whole request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileError {
    Missing,
    UnsupportedFormat(String),
    Undecodable,
    Malformed(String),
    Empty,
}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileError::Missing => write!(f, "No file provided"),
            FileError::UnsupportedFormat(name) => write!(
                f,
                "Unsupported file format for '{}'. Use CSV or Excel (.xlsx, .xls)",
                name
            ),
            FileError::Undecodable => write!(
                f,
                "Could not decode the file with any supported encoding. Save it as UTF-8"
            ),
            FileError::Malformed(msg) => write!(f, "Could not read the file: {}", msg),
            FileError::Empty => write!(f, "The file has no data rows"),
        }
    }
}

impl std::error::Error for FileError {}

/// One data row as (raw header, value) pairs in column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    /// 1-based position in the file; the header is line 1.
    pub line: usize,
    pub cells: Vec<(String, String)>,
}

impl RawRow {
    pub fn new(line: usize) -> Self {
        Self {
            line,
            cells: Vec::new(),
        }
    }

    pub fn with(mut self, header: &str, value: &str) -> Self {
        self.push(header, value);
        self
    }

    pub fn push(&mut self, header: &str, value: &str) {
        self.cells.push((header.to_string(), value.to_string()));
    }

    /// Value of the first column with this exact header.
    pub fn get(&self, header: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(h, _)| h == header)
            .map(|(_, v)| v.as_str())
    }

    fn is_blank(&self) -> bool {
        self.cells.iter().all(|(_, v)| v.trim().is_empty())
    }
}

/// Decodes an uploaded file into rows, rejecting unknown formats and empty files.
pub fn decode_file(filename: &str, bytes: &[u8]) -> Result<Vec<RawRow>, FileError> {
    let format = FileFormat::from_filename(filename)
        .ok_or_else(|| FileError::UnsupportedFormat(filename.to_string()))?;

    let rows = match format {
        FileFormat::Csv => {
            let text = decode_text(bytes)?;
            read_delimited(&text)?
        }
        FileFormat::Xlsx | FileFormat::Xls => read_spreadsheet(bytes)?,
    };

    if rows.is_empty() {
        return Err(FileError::Empty);
    }
    Ok(rows)
}

/// Decodes with the first encoding in `ENCODING_FALLBACKS` that accepts the bytes.
pub fn decode_text(bytes: &[u8]) -> Result<String, FileError> {
    for encoding in ENCODING_FALLBACKS {
        if let Some(text) = encoding.decode(bytes) {
            tracing::debug!("Decoded upload as {:?}", encoding);
            return Ok(text.into_owned());
        }
    }
    Err(FileError::Undecodable)
}

fn read_delimited(text: &str) -> Result<Vec<RawRow>, FileError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .delimiter(sniff_delimiter(text))
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| FileError::Malformed(e.to_string()))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record.map_err(|e| FileError::Malformed(e.to_string()))?;
        let mut row = RawRow::new(idx + 2);
        for (pos, header) in headers.iter().enumerate() {
            row.push(header, record.get(pos).unwrap_or(""));
        }
        if !row.is_blank() {
            rows.push(row);
        }
    }
    Ok(rows)
}

/// Spreadsheet programs in comma-decimal locales export with ';'.
fn sniff_delimiter(text: &str) -> u8 {
    let header = text.lines().next().unwrap_or("");
    let semicolons = header.matches(';').count();
    let commas = header.matches(',').count();
    if semicolons > commas { b';' } else { b',' }
}

fn read_spreadsheet(bytes: &[u8]) -> Result<Vec<RawRow>, FileError> {
    let mut workbook = calamine::open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| FileError::Malformed(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or(FileError::Empty)?
        .map_err(|e| FileError::Malformed(e.to_string()))?;

    let mut sheet_rows = range.rows();
    let headers: Vec<String> = match sheet_rows.next() {
        Some(header_row) => header_row.iter().map(cell_text).collect(),
        None => return Ok(Vec::new()),
    };

    let mut rows = Vec::new();
    for (idx, cells) in sheet_rows.enumerate() {
        let mut row = RawRow::new(idx + 2);
        for (pos, header) in headers.iter().enumerate() {
            if header.trim().is_empty() {
                continue;
            }
            let value = cells.get(pos).map(cell_text).unwrap_or_default();
            row.push(header, &value);
        }
        if !row.is_blank() {
            rows.push(row);
        }
    }
    Ok(rows)
}

/// Renders a spreadsheet cell the way the row parsers expect to read it.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(d) => d.date().format("%Y-%m-%d").to_string(),
            None => cell.to_string(),
        },
        Data::DateTimeIso(s) => s.split('T').next().unwrap_or(s).to_string(),
        other => other.to_string(),
    }
}
