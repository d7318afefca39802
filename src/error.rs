use std::path::PathBuf;

use thiserror::Error;

/// Failure to load the workbook. Fatal to the session.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("workbook not found, tried {}", display_paths(candidates))]
    NotFound { candidates: Vec<PathBuf> },

    #[error("cannot open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        source: calamine::XlsxError,
    },

    #[error("cannot parse workbook: {0}")]
    Parse(#[source] calamine::XlsxError),

    #[error("worksheet '{0}' not found")]
    MissingSheet(String),

    #[error("cannot read worksheet '{sheet}': {source}")]
    Sheet {
        sheet: String,
        source: calamine::XlsxError,
    },

    #[error("worksheet '{sheet}' has no column '{column}'")]
    MissingColumn { sheet: String, column: String },
}

/// A submitted row rejected by the reference tables. The session continues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("onbekende cursuscode '{0}'")]
    UnknownCourse(String),

    #[error("onbekende categorie '{0}'")]
    UnknownCategory(String),

    #[error("Combinatie ongeldig: '{category}' / '{topic}'")]
    InvalidCombination { category: String, topic: String },
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("spreadsheet error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown export format '{0}' (expected csv or xlsx)")]
    UnknownFormat(String),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
