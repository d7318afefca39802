use std::fmt;
use std::str::FromStr;

use chrono::Timelike;
use rust_xlsxwriter::{Format, Workbook as XlsxWorkbook, Worksheet, XlsxError};

use super::model::{parse_datetime, BoksRow, BoksTable, CellValue};
use crate::config::BOKS_SHEET;
use crate::error::ExportError;

pub const CSV_MIME: &str = "text/csv";
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

const EXCEL_DATE_FORMAT: &str = "yyyy-mm-dd";
const EXCEL_DATETIME_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";

// ---------------------------------------------------------------------------
// Formats and download artifacts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Xlsx,
}

impl ExportFormat {
    pub fn file_name(self) -> &'static str {
        match self {
            ExportFormat::Csv => "BIM_boks.csv",
            ExportFormat::Xlsx => "BIM_boks.xlsx",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Csv => CSV_MIME,
            ExportFormat::Xlsx => XLSX_MIME,
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Csv => write!(f, "csv"),
            ExportFormat::Xlsx => write!(f, "xlsx"),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "xlsx" | "excel" => Ok(ExportFormat::Xlsx),
            _ => Err(ExportError::UnknownFormat(s.to_string())),
        }
    }
}

/// Bytes ready to be saved, with the name and MIME type they are offered under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub file_name: &'static str,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Serialize the table as-is. Nothing is validated at this point.
pub fn export(table: &BoksTable, format: ExportFormat) -> Result<Download, ExportError> {
    let bytes = match format {
        ExportFormat::Csv => to_csv_bytes(table)?,
        ExportFormat::Xlsx => to_xlsx_bytes(table)?,
    };
    Ok(Download {
        file_name: format.file_name(),
        mime_type: format.mime_type(),
        bytes,
    })
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

/// UTF-8, comma-separated, header row first, no index column.
pub fn to_csv_bytes(table: &BoksTable) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&table.columns)?;
    for row in &table.rows {
        writer.write_record(table.cells(row).map(|c| c.to_string()))?;
    }
    writer.into_inner().map_err(|e| ExportError::Io(e.into_error()))
}

/// Parse CSV produced by [`to_csv_bytes`] back into a table.
pub fn read_csv_table(bytes: &[u8]) -> Result<BoksTable, ExportError> {
    let mut reader = csv::Reader::from_reader(bytes);
    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let mut table = BoksTable::with_columns(headers.clone());
    for result in reader.records() {
        let record = result?;
        table.push(BoksRow::from_cells(&headers, record.iter().map(CellValue::guess)));
    }
    Ok(table)
}

// ---------------------------------------------------------------------------
// XLSX
// ---------------------------------------------------------------------------

/// A single `BIM_boks` sheet, built entirely in memory.
pub fn to_xlsx_bytes(table: &BoksTable) -> Result<Vec<u8>, ExportError> {
    let mut workbook = XlsxWorkbook::new();
    let worksheet = workbook.add_worksheet().set_name(BOKS_SHEET)?;
    write_sheet(
        worksheet,
        &table.columns,
        table.rows.iter().map(|row| table.cells(row)),
    )?;
    Ok(workbook.save_to_buffer()?)
}

/// Write a bold header row followed by typed data rows.
pub(crate) fn write_sheet<'a, R, C>(
    worksheet: &mut Worksheet,
    headers: &[String],
    rows: R,
) -> Result<(), XlsxError>
where
    R: IntoIterator<Item = C>,
    C: IntoIterator<Item = &'a CellValue>,
{
    let header_format = Format::new().set_bold();
    for (col, label) in headers.iter().enumerate() {
        worksheet.write_string_with_format(0, col_num(col)?, label.as_str(), &header_format)?;
    }
    for (i, cells) in rows.into_iter().enumerate() {
        let row = row_num(i + 1)?;
        for (col, value) in cells.into_iter().enumerate() {
            write_cell(worksheet, row, col_num(col)?, value)?;
        }
    }
    Ok(())
}

fn write_cell(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &CellValue,
) -> Result<(), XlsxError> {
    match value {
        CellValue::String(s) => {
            worksheet.write_string(row, col, s.as_str())?;
        }
        CellValue::Integer(i) => {
            worksheet.write_number(row, col, *i as f64)?;
        }
        CellValue::Float(v) => {
            worksheet.write_number(row, col, *v)?;
        }
        CellValue::Bool(b) => {
            worksheet.write_boolean(row, col, *b)?;
        }
        CellValue::Date(text) => match parse_datetime(text) {
            Some(dt) => {
                let layout = if dt.num_seconds_from_midnight() == 0 {
                    EXCEL_DATE_FORMAT
                } else {
                    EXCEL_DATETIME_FORMAT
                };
                let format = Format::new().set_num_format(layout);
                worksheet.write_datetime_with_format(row, col, &dt, &format)?;
            }
            None => {
                worksheet.write_string(row, col, text.as_str())?;
            }
        },
        CellValue::Null => {}
    }
    Ok(())
}

fn row_num(i: usize) -> Result<u32, XlsxError> {
    u32::try_from(i).map_err(|_| XlsxError::RowColumnLimitError)
}

fn col_num(i: usize) -> Result<u16, XlsxError> {
    u16::try_from(i).map_err(|_| XlsxError::RowColumnLimitError)
}
