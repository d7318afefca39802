use std::sync::Arc;

use log::{debug, info, warn};

use crate::data::export::{export, Download, ExportFormat};
use crate::data::filter::{
    filter_options, filtered_indices, FilterField, FilterOptions, FilterSelection, TableView,
};
use crate::data::model::{BoksRow, BoksTable, CellValue, Workbook};
use crate::data::validate::{validate_submission, Submission, ValidatedRow};
use crate::error::{ExportError, ValidationError};

// ---------------------------------------------------------------------------
// SessionTable – the only table that changes during a session
// ---------------------------------------------------------------------------

/// Append-only table owned by one session.
///
/// Moves from `Uninitialized` to `Initialized` once and never back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionTable {
    #[default]
    Uninitialized,
    Initialized(BoksTable),
}

impl SessionTable {
    /// Seed the table with a copy of `seed`.
    ///
    /// Returns `false` and leaves the table alone if it was already seeded,
    /// so rows entered during the session are never discarded.
    pub fn initialize(&mut self, seed: &BoksTable) -> bool {
        match self {
            SessionTable::Uninitialized => {
                *self = SessionTable::Initialized(seed.clone());
                true
            }
            SessionTable::Initialized(_) => {
                debug!("session table already initialized, ignoring re-seed");
                false
            }
        }
    }

    /// Append a validated row at the end.
    ///
    /// Only `initialize` leaves `Uninitialized`: appending to an unseeded
    /// table drops the row and returns `false`.
    #[must_use]
    pub fn append(&mut self, row: ValidatedRow) -> bool {
        match self {
            SessionTable::Initialized(table) => {
                table.push(row.into_row());
                true
            }
            SessionTable::Uninitialized => {
                warn!("session table not initialized, dropping {:?}", row.row());
                false
            }
        }
    }

    /// Read-only access to the current table, if seeded.
    pub fn snapshot(&self) -> Option<&BoksTable> {
        match self {
            SessionTable::Initialized(table) => Some(table),
            SessionTable::Uninitialized => None,
        }
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self, SessionTable::Initialized(_))
    }

    /// Number of rows (0 before initialization).
    pub fn len(&self) -> usize {
        self.snapshot().map_or(0, BoksTable::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// Everything one interactive session owns, independent of rendering.
/// Created when the session starts and dropped when it ends.
pub struct SessionState {
    /// Reference data, shared read-only with the workbook cache.
    workbook: Arc<Workbook>,

    /// Rows loaded from the workbook plus everything appended since.
    table: SessionTable,

    /// Options offered for each filter.
    options: FilterOptions,

    /// Current filter selections.
    pub filters: FilterSelection,

    /// Indices of rows passing the current filters (cached).
    pub visible_indices: Vec<usize>,

    /// Status / error message for the last action.
    pub status_message: Option<String>,
}

impl SessionState {
    /// Start a session seeded from the workbook's BOKS table.
    pub fn new(workbook: Arc<Workbook>) -> Self {
        let mut table = SessionTable::default();
        table.initialize(&workbook.boks);
        let options = filter_options(&workbook);
        let mut state = Self {
            workbook,
            table,
            options,
            filters: FilterSelection::default(),
            visible_indices: Vec::new(),
            status_message: None,
        };
        state.refilter();
        state
    }

    pub fn table(&self) -> &SessionTable {
        &self.table
    }

    pub fn options(&self) -> &FilterOptions {
        &self.options
    }

    /// Swap in freshly loaded reference data. Session rows are kept.
    pub fn replace_workbook(&mut self, workbook: Arc<Workbook>) {
        self.options = filter_options(&workbook);
        self.workbook = workbook;
        self.table.initialize(&self.workbook.boks);
        self.refilter();
    }

    /// Recompute `visible_indices` after a filter or table change.
    pub fn refilter(&mut self) {
        self.visible_indices = match self.table.snapshot() {
            Some(table) => filtered_indices(table, &self.filters),
            None => Vec::new(),
        };
        debug!(
            "{} of {} rows visible",
            self.visible_indices.len(),
            self.table.len()
        );
    }

    /// Set one filter. `None` clears it.
    pub fn set_filter(&mut self, field: FilterField, value: Option<CellValue>) {
        self.filters.set(field, value);
        self.refilter();
    }

    pub fn clear_filters(&mut self) {
        self.filters = FilterSelection::default();
        self.refilter();
    }

    /// The rows currently passing the filters.
    pub fn view(&self) -> Option<TableView<'_>> {
        self.table
            .snapshot()
            .map(|table| TableView::from_indices(table, &self.visible_indices))
    }

    /// Topic choices for a category, for the entry form.
    pub fn topic_choices(&self, category: &str) -> Vec<&CellValue> {
        match self.workbook.categories.find_text(category) {
            Some(cat) => self.workbook.topics.topics_for(cat),
            None => Vec::new(),
        }
    }

    /// Validate a submission and append it. Rejected rows leave the table untouched.
    pub fn submit(&mut self, submission: &Submission) -> Result<BoksRow, ValidationError> {
        let validated = match validate_submission(&self.workbook, submission) {
            Ok(row) => row,
            Err(err) => {
                self.status_message = Some(format!("❌ {err}"));
                return Err(err);
            }
        };
        let row = validated.row().clone();
        let appended = self.table.append(validated);
        debug_assert!(appended, "SessionState::new seeds the table");
        self.refilter();
        self.status_message = Some("✅ Toegevoegd!".to_string());
        info!("appended row, session table now has {} rows", self.table.len());
        Ok(row)
    }

    /// Serialize the whole session table (not just the filtered view).
    pub fn download(&self, format: ExportFormat) -> Result<Download, ExportError> {
        match self.table.snapshot() {
            Some(table) => export(table, format),
            None => export(&BoksTable::default(), format),
        }
    }
}
