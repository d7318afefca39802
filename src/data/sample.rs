//! Builds BOKS workbooks in memory, for the sample generator and for tests.

use rust_xlsxwriter::{Workbook as XlsxWorkbook, XlsxError};

use super::export::write_sheet;
use super::model::CellValue;
use crate::config::{BOKS_SHEET, CATEGORY_SHEET, COURSE_SHEET, TOPIC_SHEET};

/// One worksheet to write: header labels plus rows of cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetData {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl SheetData {
    pub fn new(name: &str, headers: &[&str], rows: Vec<Vec<CellValue>>) -> Self {
        SheetData {
            name: name.to_string(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows,
        }
    }

    /// Rows given as text; empty strings become empty cells.
    pub fn from_text(name: &str, headers: &[&str], rows: &[&[&str]]) -> Self {
        let rows = rows
            .iter()
            .map(|r| r.iter().map(|s| CellValue::guess(s)).collect())
            .collect();
        SheetData::new(name, headers, rows)
    }
}

/// Write the sheets, in order, into an xlsx byte buffer.
pub fn workbook_bytes(sheets: &[SheetData]) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = XlsxWorkbook::new();
    for sheet in sheets {
        let worksheet = workbook.add_worksheet().set_name(sheet.name.as_str())?;
        write_sheet(worksheet, &sheet.headers, sheet.rows.iter())?;
    }
    workbook.save_to_buffer()
}

/// A small but realistic BOKS workbook.
///
/// Reference headers carry stray whitespace, as the hand-edited source
/// workbook does.
pub fn demo_sheets() -> Vec<SheetData> {
    vec![
        SheetData::from_text(
            BOKS_SHEET,
            &["CursusCode", "BOKS categorie", "BOKS onderwerp", "Opmerking"],
            &[
                &["BIM101", "Modelleren", "Parametrisch ontwerpen", ""],
                &["BIM101", "Samenwerken", "IFC uitwisseling", "Practicum week 3"],
                &["BIM201", "Informatiemanagement", "ILS", ""],
                &["BIM201", "Samenwerken", "BCF issues", ""],
                &["BIM301", "Modelleren", "LOD/LOI", "Eindopdracht"],
                &["BIM301", "Informatiemanagement", "NL-SfB classificatie", ""],
            ],
        ),
        SheetData::from_text(
            COURSE_SHEET,
            &["CursusCode ", "Naam"],
            &[
                &["BIM101", "Introductie BIM"],
                &["BIM201", "BIM in de keten"],
                &["BIM301", "BIM regie"],
            ],
        ),
        SheetData::from_text(
            CATEGORY_SHEET,
            &[" BOKS categorie", "Omschrijving"],
            &[
                &["Modelleren", "Opbouw van het informatiemodel"],
                &["Samenwerken", "Uitwisseling tussen partijen"],
                &["Informatiemanagement", "Afspraken en standaarden"],
            ],
        ),
        SheetData::from_text(
            TOPIC_SHEET,
            &["BOKS categorie ", " BOKS onderwerp "],
            &[
                &["Modelleren", "Parametrisch ontwerpen"],
                &["Modelleren", "LOD/LOI"],
                &["Samenwerken", "IFC uitwisseling"],
                &["Samenwerken", "BCF issues"],
                &["Informatiemanagement", "ILS"],
                &["Informatiemanagement", "NL-SfB classificatie"],
            ],
        ),
    ]
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::data::loader::read_workbook;
    use crate::data::model::Workbook;

    /// Courses C1..C3, categories Structural/MEP, three topic definitions and
    /// a BOKS sheet whose course codes are C1, C2, C1.
    pub(crate) fn scenario_sheets() -> Vec<SheetData> {
        vec![
            SheetData::from_text(
                BOKS_SHEET,
                &["CursusCode", "BOKS categorie", "BOKS onderwerp", "Opmerking"],
                &[
                    &["C1", "Structural", "Foundations", "eerste"],
                    &["C2", "MEP", "HVAC", ""],
                    &["C1", "Structural", "Beams", "derde"],
                ],
            ),
            SheetData::from_text(COURSE_SHEET, &[" CursusCode"], &[&["C1"], &["C2"], &["C3"]]),
            SheetData::from_text(
                CATEGORY_SHEET,
                &["BOKS categorie  "],
                &[&["Structural"], &["MEP"]],
            ),
            SheetData::from_text(
                TOPIC_SHEET,
                &[" BOKS categorie", "BOKS onderwerp "],
                &[
                    &["Structural", "Foundations"],
                    &["Structural", "Beams"],
                    &["MEP", "HVAC"],
                ],
            ),
        ]
    }

    pub(crate) fn scenario_bytes() -> Vec<u8> {
        workbook_bytes(&scenario_sheets()).expect("write scenario workbook")
    }

    pub(crate) fn scenario_workbook() -> Workbook {
        read_workbook(std::io::Cursor::new(scenario_bytes())).expect("read scenario workbook")
    }
}
