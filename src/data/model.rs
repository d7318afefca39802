use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, Timelike};

/// Column holding the course code, in the BOKS sheet and in `CursusCode`.
pub const COURSE_CODE_COLUMN: &str = "CursusCode";
/// Column holding the category label.
pub const CATEGORY_COLUMN: &str = "BOKS categorie";
/// Column holding the topic label.
pub const TOPIC_COLUMN: &str = "BOKS onderwerp";

/// Columns every session table carries, even when it has no rows.
pub const KEY_COLUMNS: [&str; 3] = [COURSE_CODE_COLUMN, CATEGORY_COLUMN, TOPIC_COLUMN];

/// Text layout of date-only cells.
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// Text layout of cells carrying a time of day.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

static NULL_CELL: CellValue = CellValue::Null;

/// Render a timestamp, dropping the time part at midnight.
pub fn format_datetime(dt: NaiveDateTime) -> String {
    if dt.num_seconds_from_midnight() == 0 {
        dt.format(DATE_FORMAT).to_string()
    } else {
        dt.format(DATETIME_FORMAT).to_string()
    }
}

/// Inverse of [`format_datetime`].
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, DATETIME_FORMAT)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, DATE_FORMAT)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

// ---------------------------------------------------------------------------
// CellValue – a single spreadsheet cell
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value as read from a worksheet or a CSV field.
/// Downstream code keeps these in `BTreeSet`s, so `CellValue` must be `Ord`.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    /// ISO-8601 date or date-time kept as text.
    Date(String),
    Null,
}

// Total order over all variants; floats compare by `total_cmp`.

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use CellValue::*;
        fn discriminant(v: &CellValue) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                String(_) => 4,
                Date(_) => 5,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (String(a), String(b)) | (Date(a), Date(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

/// Text form used both for display and for CSV fields. `Null` is empty.
impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::String(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Date(d) => write!(f, "{d}"),
            CellValue::Null => Ok(()),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(s.to_string())
    }
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Whether the text form equals `text` exactly (case-sensitive).
    pub fn matches_text(&self, text: &str) -> bool {
        !self.is_null() && self.to_string() == text
    }

    /// Recover a typed value from a CSV field.
    ///
    /// Only finite numbers containing a digit count as floats, so labels
    /// such as `inf` or `NaN` stay strings. Text in [`DATE_FORMAT`] or
    /// [`DATETIME_FORMAT`] becomes a `Date`.
    pub fn guess(s: &str) -> Self {
        if s.is_empty() {
            return CellValue::Null;
        }
        if let Ok(i) = s.parse::<i64>() {
            return CellValue::Integer(i);
        }
        if s.bytes().any(|b| b.is_ascii_digit()) {
            if let Ok(f) = s.parse::<f64>() {
                if f.is_finite() {
                    return CellValue::Float(f);
                }
            }
        }
        if s == "true" || s == "false" {
            return CellValue::Bool(s == "true");
        }
        if parse_datetime(s).is_some() {
            return CellValue::Date(s.to_string());
        }
        CellValue::String(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Sheet – a raw worksheet with unique header labels
// ---------------------------------------------------------------------------

/// A worksheet as read from the workbook: one header row, then data rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl Sheet {
    /// Build a sheet, making header labels unique.
    ///
    /// Blank labels become `Unnamed: N`; repeats get `.1`, `.2`, ... suffixes.
    pub fn new(name: impl Into<String>, headers: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Sheet {
            name: name.into(),
            headers: unique_labels(headers),
            rows,
        }
    }

    /// Strip leading/trailing whitespace from every header label.
    pub fn trim_headers(self) -> Self {
        let trimmed = self.headers.iter().map(|h| h.trim().to_string()).collect();
        Sheet::new(self.name, trimmed, self.rows)
    }

    pub fn column_index(&self, label: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == label)
    }

    /// All values of a column, `Null` where a row is short.
    pub fn column(&self, label: &str) -> Option<Vec<CellValue>> {
        let idx = self.column_index(label)?;
        Some(
            self.rows
                .iter()
                .map(|row| row.get(idx).cloned().unwrap_or(CellValue::Null))
                .collect(),
        )
    }
}

fn unique_labels(raw: Vec<String>) -> Vec<String> {
    let mut seen: BTreeMap<String, usize> = BTreeMap::new();
    let mut out = Vec::with_capacity(raw.len());
    for (i, label) in raw.into_iter().enumerate() {
        let base = if label.is_empty() {
            format!("Unnamed: {i}")
        } else {
            label
        };
        let count = seen.entry(base.clone()).or_insert(0);
        if *count == 0 {
            out.push(base);
        } else {
            out.push(format!("{base}.{count}"));
        }
        *count += 1;
    }
    out
}

// ---------------------------------------------------------------------------
// BoksRow / BoksTable – the association table
// ---------------------------------------------------------------------------

/// One course/category/topic association.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoksRow {
    pub course_code: CellValue,
    pub category: CellValue,
    pub topic: CellValue,
    /// Passthrough columns: column_name → value. Empty cells are omitted.
    pub extra: BTreeMap<String, CellValue>,
}

impl BoksRow {
    pub fn new(course_code: CellValue, category: CellValue, topic: CellValue) -> Self {
        BoksRow {
            course_code,
            category,
            topic,
            extra: BTreeMap::new(),
        }
    }

    /// Build a row from cells aligned with `columns`.
    pub fn from_cells(columns: &[String], cells: impl IntoIterator<Item = CellValue>) -> Self {
        let mut row = BoksRow::new(CellValue::Null, CellValue::Null, CellValue::Null);
        for (col, value) in columns.iter().zip(cells) {
            match col.as_str() {
                COURSE_CODE_COLUMN => row.course_code = value,
                CATEGORY_COLUMN => row.category = value,
                TOPIC_COLUMN => row.topic = value,
                _ if value.is_null() => {}
                _ => {
                    row.extra.insert(col.clone(), value);
                }
            }
        }
        row
    }

    /// Value of any column; missing passthrough columns read as `Null`.
    pub fn get(&self, column: &str) -> &CellValue {
        match column {
            COURSE_CODE_COLUMN => &self.course_code,
            CATEGORY_COLUMN => &self.category,
            TOPIC_COLUMN => &self.topic,
            other => self.extra.get(other).unwrap_or(&NULL_CELL),
        }
    }
}

/// The association table with its column order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoksTable {
    /// Column labels in workbook order; always includes [`KEY_COLUMNS`].
    pub columns: Vec<String>,
    pub rows: Vec<BoksRow>,
}

impl Default for BoksTable {
    fn default() -> Self {
        BoksTable::with_columns(Vec::new())
    }
}

impl BoksTable {
    /// An empty table with the given columns plus any missing key column.
    pub fn with_columns(mut columns: Vec<String>) -> Self {
        for key in KEY_COLUMNS {
            if !columns.iter().any(|c| c == key) {
                columns.push(key.to_string());
            }
        }
        BoksTable {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn from_sheet(sheet: Sheet) -> Self {
        let mut table = BoksTable::with_columns(sheet.headers.clone());
        table.rows = sheet
            .rows
            .into_iter()
            .map(|cells| BoksRow::from_cells(&sheet.headers, cells))
            .collect();
        table
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn push(&mut self, row: BoksRow) {
        self.rows.push(row);
    }

    /// A row's cells in column order.
    pub fn cells<'a>(&'a self, row: &'a BoksRow) -> impl Iterator<Item = &'a CellValue> + 'a {
        self.columns.iter().map(move |c| row.get(c))
    }
}

// ---------------------------------------------------------------------------
// Reference tables
// ---------------------------------------------------------------------------

/// Ordered, de-duplicated, non-null values of one reference column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceList {
    values: Vec<CellValue>,
}

/// Valid course codes (`CursusCode` sheet).
pub type CourseReference = ReferenceList;
/// Valid category labels (`CategorieDefinities` sheet).
pub type CategoryReference = ReferenceList;

impl ReferenceList {
    pub fn from_values(values: impl IntoIterator<Item = CellValue>) -> Self {
        let mut seen = BTreeSet::new();
        let values = values
            .into_iter()
            .filter(|v| !v.is_null())
            .filter(|v| seen.insert(v.clone()))
            .collect();
        ReferenceList { values }
    }

    pub fn values(&self) -> &[CellValue] {
        &self.values
    }

    /// The first value whose text form is exactly `text`.
    pub fn find_text(&self, text: &str) -> Option<&CellValue> {
        self.values.iter().find(|v| v.matches_text(text))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// One allowed (category, topic) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicDefinition {
    pub category: CellValue,
    pub topic: CellValue,
}

/// Rows of the `OnderwerpDefinities` sheet, in workbook order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicDefinitions {
    pub rows: Vec<TopicDefinition>,
}

// ---------------------------------------------------------------------------
// Workbook – everything loaded at startup
// ---------------------------------------------------------------------------

/// The four tables of the BOKS workbook.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Workbook {
    pub boks: BoksTable,
    pub courses: CourseReference,
    pub categories: CategoryReference,
    pub topics: TopicDefinitions,
}
