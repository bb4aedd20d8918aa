//! Spreadsheet reader with format, encoding and delimiter auto-detection.
//!
//! Turns an uploaded file into positional rows. No column names are read:
//! the first row is treated as a header and skipped, the rest is data.
//! Workbooks (`xls`, `xlsx`, `xlsm`, `xlsb`, `ods`) are read with calamine,
//! delimited text with the csv crate.

use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, Range, Reader};
use serde::Serialize;
use std::io::Cursor;
use std::path::Path;

use crate::error::{SheetError, SheetResult};
use crate::models::{CellValue, RawRow};

/// Extensions decoded as workbooks.
pub const WORKBOOK_EXTENSIONS: [&str; 5] = ["xls", "xlsx", "xlsm", "xlsb", "ods"];

/// Extensions decoded as delimited text.
pub const DELIMITED_EXTENSIONS: [&str; 3] = ["csv", "txt", "tsv"];

/// Source dialect of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SheetFormat {
    Workbook,
    Delimited,
}

impl SheetFormat {
    /// Pick the dialect from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> SheetResult<Self> {
        let ext = ext.to_lowercase();
        if WORKBOOK_EXTENSIONS.contains(&ext.as_str()) {
            Ok(SheetFormat::Workbook)
        } else if DELIMITED_EXTENSIONS.contains(&ext.as_str()) {
            Ok(SheetFormat::Delimited)
        } else {
            Err(SheetError::UnsupportedFormat(ext))
        }
    }

    /// Pick the dialect from a path or file name.
    pub fn from_path(path: impl AsRef<Path>) -> SheetResult<Self> {
        let ext = path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");
        Self::from_extension(ext)
    }
}

/// Options for reading a table.
#[derive(Debug, Clone, Copy)]
pub struct ReadOptions {
    /// Skip the first row without looking at it.
    pub has_header: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self { has_header: true }
    }
}

/// Decoded table with metadata.
#[derive(Debug, Clone)]
pub struct RawTable {
    /// Data rows, in source order
    pub rows: Vec<RawRow>,
    /// Source dialect
    pub format: SheetFormat,
    /// Detected encoding (delimited text only)
    pub encoding: Option<String>,
    /// Detected delimiter (delimited text only)
    pub delimiter: Option<char>,
}

impl RawTable {
    /// Build a table from in-memory rows (already headerless).
    pub fn from_rows(rows: Vec<RawRow>) -> Self {
        Self {
            rows,
            format: SheetFormat::Delimited,
            encoding: None,
            delimiter: None,
        }
    }
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    match encoding.to_lowercase().as_str() {
        // windows-1252 agrees with Latin-1 on every printable byte
        "iso-8859-1" | "latin-1" | "latin1" | "windows-1252" | "cp1252" => {
            encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned()
        }
        // UTF-8 and anything unknown
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Detect the delimiter by counting occurrences in the first line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [';', ',', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Read a spreadsheet file, choosing the dialect from its extension.
///
/// # Example
/// ```ignore
/// let table = read_sheet_file("uploads/actas.xlsx", ReadOptions::default())?;
/// println!("{} data rows", table.rows.len());
/// ```
pub fn read_sheet_file<P: AsRef<Path>>(path: P, options: ReadOptions) -> SheetResult<RawTable> {
    let path = path.as_ref();
    match SheetFormat::from_path(path)? {
        SheetFormat::Workbook => {
            let mut workbook = open_workbook_auto(path)?;
            let range = workbook
                .worksheet_range_at(0)
                .ok_or(SheetError::NoWorksheet)??;
            Ok(table_from_range(&range, options))
        }
        SheetFormat::Delimited => {
            let bytes = std::fs::read(path)?;
            read_delimited(&bytes, options)
        }
    }
}

/// Read spreadsheet bytes of a known dialect.
pub fn read_sheet_bytes(
    bytes: &[u8],
    format: SheetFormat,
    options: ReadOptions,
) -> SheetResult<RawTable> {
    match format {
        SheetFormat::Workbook => read_workbook(bytes, options),
        SheetFormat::Delimited => read_delimited(bytes, options),
    }
}

/// Read the first worksheet of an in-memory workbook.
pub fn read_workbook(bytes: &[u8], options: ReadOptions) -> SheetResult<RawTable> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(SheetError::NoWorksheet)??;
    Ok(table_from_range(&range, options))
}

fn table_from_range(range: &Range<Data>, options: ReadOptions) -> RawTable {
    let skip = usize::from(options.has_header);
    let rows = range
        .rows()
        .skip(skip)
        .map(|row| row.iter().map(cell_from_data).collect())
        .collect();

    RawTable {
        rows,
        format: SheetFormat::Workbook,
        encoding: None,
        delimiter: None,
    }
}

/// Map a calamine cell onto a [`CellValue`].
///
/// Dates and cell errors keep their displayed text.
fn cell_from_data(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::Int(i) => CellValue::Int(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::String(s) => CellValue::text(s.as_str()),
        other => CellValue::text(other.to_string()),
    }
}

/// Read delimited text with encoding and delimiter auto-detection.
///
/// Rows keep their own width; the normalizer decides whether it is valid.
pub fn read_delimited(bytes: &[u8], options: ReadOptions) -> SheetResult<RawTable> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    let delimiter = detect_delimiter(&content);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let skip = usize::from(options.has_header);
    let mut rows = Vec::new();
    for record in reader.records().skip(skip) {
        let record = record?;
        rows.push(record.iter().map(CellValue::text).collect());
    }

    Ok(RawTable {
        rows,
        format: SheetFormat::Delimited,
        encoding: Some(encoding),
        delimiter: Some(delimiter),
    })
}
