use std::collections::HashMap;
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use calamine::{open_workbook, Data, DataType, Range, Reader, Xlsx};
use log::{debug, info, warn};

use super::model::{
    format_datetime, BoksTable, CellValue, ReferenceList, Sheet, TopicDefinition,
    TopicDefinitions, Workbook, CATEGORY_COLUMN, COURSE_CODE_COLUMN, TOPIC_COLUMN,
};
use crate::config::{BOKS_SHEET, CATEGORY_SHEET, COURSE_SHEET, TOPIC_SHEET};
use crate::error::LoadError;

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Return the first candidate path that exists.
pub fn resolve_workbook_path(candidates: &[PathBuf]) -> Result<PathBuf, LoadError> {
    candidates
        .iter()
        .find(|p| p.exists())
        .cloned()
        .ok_or_else(|| LoadError::NotFound {
            candidates: candidates.to_vec(),
        })
}

/// Open an xlsx file and extract the four BOKS tables.
pub fn load_workbook(path: &Path) -> Result<Workbook, LoadError> {
    let mut xlsx: Xlsx<_> = open_workbook(path).map_err(|source| LoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let workbook = extract_workbook(&mut xlsx)?;
    info!(
        "loaded {} ({} BOKS rows, {} courses, {} categories, {} topic definitions)",
        path.display(),
        workbook.boks.len(),
        workbook.courses.len(),
        workbook.categories.len(),
        workbook.topics.rows.len(),
    );
    Ok(workbook)
}

/// Same as [`load_workbook`] for an in-memory or already open source.
pub fn read_workbook<R: Read + Seek>(reader: R) -> Result<Workbook, LoadError> {
    let mut xlsx = Xlsx::new(reader).map_err(LoadError::Parse)?;
    extract_workbook(&mut xlsx)
}

/// Read one worksheet verbatim (headers untrimmed).
pub fn read_workbook_sheet<R: Read + Seek>(reader: R, name: &str) -> Result<Sheet, LoadError> {
    let mut xlsx = Xlsx::new(reader).map_err(LoadError::Parse)?;
    read_sheet(&mut xlsx, name)
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// The BOKS sheet keeps its labels as written; the three reference sheets
/// get their labels trimmed before any lookup.
fn extract_workbook<R: Read + Seek>(xlsx: &mut Xlsx<R>) -> Result<Workbook, LoadError> {
    let boks = read_sheet(xlsx, BOKS_SHEET)?;
    let courses = read_sheet(xlsx, COURSE_SHEET)?.trim_headers();
    let categories = read_sheet(xlsx, CATEGORY_SHEET)?.trim_headers();
    let topics = read_sheet(xlsx, TOPIC_SHEET)?.trim_headers();

    Ok(Workbook {
        boks: BoksTable::from_sheet(boks),
        courses: ReferenceList::from_values(require_column(&courses, COURSE_CODE_COLUMN)?),
        categories: ReferenceList::from_values(require_column(&categories, CATEGORY_COLUMN)?),
        topics: topic_definitions(&topics)?,
    })
}

fn read_sheet<R: Read + Seek>(xlsx: &mut Xlsx<R>, name: &str) -> Result<Sheet, LoadError> {
    if !xlsx.sheet_names().iter().any(|s| s == name) {
        return Err(LoadError::MissingSheet(name.to_string()));
    }
    let range = xlsx
        .worksheet_range(name)
        .map_err(|source| LoadError::Sheet {
            sheet: name.to_string(),
            source,
        })?;
    Ok(sheet_from_range(name, &range))
}

/// First row is the header; every later row is data.
fn sheet_from_range(name: &str, range: &Range<Data>) -> Sheet {
    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .map(|r| r.iter().map(|c| cell_value(c).to_string()).collect())
        .unwrap_or_default();
    let data: Vec<Vec<CellValue>> = rows.map(|r| r.iter().map(cell_value).collect()).collect();
    Sheet::new(name, headers, data)
}

fn require_column(sheet: &Sheet, column: &str) -> Result<Vec<CellValue>, LoadError> {
    sheet.column(column).ok_or_else(|| LoadError::MissingColumn {
        sheet: sheet.name.clone(),
        column: column.to_string(),
    })
}

fn topic_definitions(sheet: &Sheet) -> Result<TopicDefinitions, LoadError> {
    let categories = require_column(sheet, CATEGORY_COLUMN)?;
    let topics = require_column(sheet, TOPIC_COLUMN)?;
    let rows = categories
        .into_iter()
        .zip(topics)
        .map(|(category, topic)| TopicDefinition { category, topic })
        .collect();
    Ok(TopicDefinitions { rows })
}

/// Whole-number floats become integers, so `101.0` reads back as `101`.
fn cell_value(cell: &Data) -> CellValue {
    const EXACT: f64 = 9_007_199_254_740_992.0; // 2^53

    match cell {
        Data::Empty => CellValue::Null,
        Data::String(s) if s.is_empty() => CellValue::Null,
        Data::String(s) => CellValue::String(s.clone()),
        Data::Int(i) => CellValue::Integer(*i),
        Data::Float(f) if f.fract() == 0.0 && f.abs() <= EXACT => CellValue::Integer(*f as i64),
        Data::Float(f) => CellValue::Float(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(serial) => match cell.as_datetime() {
            Some(dt) => CellValue::Date(format_datetime(dt)),
            None => {
                warn!("date serial {} out of range, keeping the number", serial.as_f64());
                CellValue::Float(serial.as_f64())
            }
        },
        Data::DateTimeIso(s) => CellValue::Date(s.clone()),
        Data::DurationIso(s) => CellValue::String(s.clone()),
        Data::Error(e) => CellValue::String(e.to_string()),
    }
}

// ---------------------------------------------------------------------------
// WorkbookCache – one load per path for the process lifetime
// ---------------------------------------------------------------------------

/// Loaded workbooks keyed by resolved path.
///
/// Entries are inserted under the lock once fully built, so readers never
/// observe a partial workbook. They live until [`invalidate`](Self::invalidate),
/// [`clear`](Self::clear) or process exit.
#[derive(Debug, Default)]
pub struct WorkbookCache {
    entries: Mutex<HashMap<PathBuf, Arc<Workbook>>>,
}

impl WorkbookCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_load(&self, path: &Path) -> Result<Arc<Workbook>, LoadError> {
        let key = cache_key(path);
        let mut entries = self.lock();
        if let Some(hit) = entries.get(&key) {
            debug!("workbook cache hit for {}", key.display());
            return Ok(Arc::clone(hit));
        }
        let workbook = Arc::new(load_workbook(path)?);
        entries.insert(key, Arc::clone(&workbook));
        Ok(workbook)
    }

    /// Drop the entry for `path`; the next load reads the file again.
    pub fn invalidate(&self, path: &Path) -> bool {
        self.lock().remove(&cache_key(path)).is_some()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, Arc<Workbook>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn cache_key(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io::Cursor;

    use tempfile::TempDir;

    use super::*;
    use crate::data::sample::fixtures::{scenario_bytes, scenario_sheets};
    use crate::data::sample::{workbook_bytes, SheetData};

    fn write_fixture(dir: &TempDir, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, bytes).expect("write fixture");
        path
    }

    #[test]
    fn unconvertible_date_keeps_its_serial_number() {
        use calamine::{ExcelDateTime, ExcelDateTimeType};

        let far = ExcelDateTime::new(1.0e8, ExcelDateTimeType::DateTime, false);
        assert_eq!(cell_value(&Data::DateTime(far)), CellValue::Float(1.0e8));

        let day = ExcelDateTime::new(45536.0, ExcelDateTimeType::DateTime, false);
        assert_eq!(cell_value(&Data::DateTime(day)), CellValue::Date("2024-09-01".into()));
    }

    #[test]
    fn loads_all_four_tables_and_trims_reference_headers() {
        let workbook = read_workbook(Cursor::new(scenario_bytes())).unwrap();

        assert_eq!(workbook.boks.len(), 3);
        assert_eq!(
            workbook.boks.columns,
            vec!["CursusCode", "BOKS categorie", "BOKS onderwerp", "Opmerking"]
        );
        assert_eq!(workbook.boks.rows[1].get("Opmerking"), &CellValue::Null);

        let courses: Vec<String> = workbook
            .courses
            .values()
            .iter()
            .map(|v| v.to_string())
            .collect();
        assert_eq!(courses, vec!["C1", "C2", "C3"]);
        assert_eq!(workbook.categories.len(), 2);
        assert_eq!(workbook.topics.rows.len(), 3);
        assert_eq!(workbook.topics.rows[2].topic, CellValue::from("HVAC"));
    }

    #[test]
    fn boks_headers_are_not_trimmed() {
        let mut sheets = scenario_sheets();
        sheets[0] = SheetData::from_text(BOKS_SHEET, &["Opmerking "], &[&["los"]]);
        let workbook = read_workbook(Cursor::new(workbook_bytes(&sheets).unwrap())).unwrap();

        assert_eq!(
            workbook.boks.columns,
            vec!["Opmerking ", "CursusCode", "BOKS categorie", "BOKS onderwerp"]
        );
        assert_eq!(workbook.boks.rows[0].course_code, CellValue::Null);
    }

    #[test]
    fn missing_sheet_is_reported() {
        let sheets: Vec<SheetData> = scenario_sheets()
            .into_iter()
            .filter(|s| s.name != TOPIC_SHEET)
            .collect();
        let err = read_workbook(Cursor::new(workbook_bytes(&sheets).unwrap())).unwrap_err();
        assert!(matches!(err, LoadError::MissingSheet(ref name) if name == TOPIC_SHEET));
    }

    #[test]
    fn missing_reference_column_is_reported() {
        let mut sheets = scenario_sheets();
        sheets[2] = SheetData::from_text(CATEGORY_SHEET, &["Categorie"], &[&["MEP"]]);
        let err = read_workbook(Cursor::new(workbook_bytes(&sheets).unwrap())).unwrap_err();
        assert!(matches!(
            err,
            LoadError::MissingColumn { ref sheet, ref column }
                if sheet == CATEGORY_SHEET && column == CATEGORY_COLUMN
        ));
    }

    #[test]
    fn garbage_bytes_fail_to_parse() {
        let err = read_workbook(Cursor::new(b"not a workbook".to_vec())).unwrap_err();
        assert!(matches!(err, LoadError::Parse(_)));
    }

    #[test]
    fn unparseable_file_reports_its_path() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(&dir, "broken.xlsx", b"plain text");
        let err = load_workbook(&path).unwrap_err();
        assert!(matches!(err, LoadError::Open { .. }));
        assert!(err.to_string().contains("broken.xlsx"));
    }

    #[test]
    fn resolves_first_existing_candidate() {
        let dir = TempDir::new().unwrap();
        let second = write_fixture(&dir, "BIM_BOKS_V1.xlsx", &scenario_bytes());
        let first = dir.path().join("data").join("BIM_BOKS_V1.xlsx");

        let resolved = resolve_workbook_path(&[first.clone(), second.clone()]).unwrap();
        assert_eq!(resolved, second);

        fs::create_dir_all(first.parent().unwrap()).unwrap();
        fs::write(&first, scenario_bytes()).unwrap();
        assert_eq!(resolve_workbook_path(&[first.clone(), second]).unwrap(), first);
    }

    #[test]
    fn no_existing_candidate_is_not_found() {
        let dir = TempDir::new().unwrap();
        let candidates = vec![dir.path().join("a.xlsx"), dir.path().join("b.xlsx")];
        let err = resolve_workbook_path(&candidates).unwrap_err();
        assert!(matches!(err, LoadError::NotFound { candidates: ref c } if c.len() == 2));
        assert!(err.to_string().contains("b.xlsx"));
    }

    #[test]
    fn cache_returns_same_workbook_without_rereading() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(&dir, "BIM_BOKS_V1.xlsx", &scenario_bytes());
        let cache = WorkbookCache::new();

        let first = cache.get_or_load(&path).unwrap();
        fs::write(&path, b"no longer a workbook").unwrap();
        let second = cache.get_or_load(&path).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn invalidated_entry_is_reloaded() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(&dir, "BIM_BOKS_V1.xlsx", &scenario_bytes());
        let cache = WorkbookCache::new();

        let first = cache.get_or_load(&path).unwrap();
        assert!(cache.invalidate(&path));
        let second = cache.get_or_load(&path).unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(*first, *second);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn failed_load_is_not_cached() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(&dir, "broken.xlsx", b"plain text");
        let cache = WorkbookCache::new();

        assert!(cache.get_or_load(&path).is_err());
        assert!(cache.is_empty());
    }
}
