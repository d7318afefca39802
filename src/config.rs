use std::path::PathBuf;

/// Worksheet with the course/category/topic associations.
pub const BOKS_SHEET: &str = "BIM_boks";
/// Worksheet listing valid course codes.
pub const COURSE_SHEET: &str = "CursusCode";
/// Worksheet listing valid categories.
pub const CATEGORY_SHEET: &str = "CategorieDefinities";
/// Worksheet mapping categories to their topics.
pub const TOPIC_SHEET: &str = "OnderwerpDefinities";

/// File name of the workbook looked up at startup.
pub const WORKBOOK_FILE: &str = "BIM_BOKS_V1.xlsx";

/// Runtime settings. There is no config file; `Default` is the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Workbook locations tried in order; the first existing one wins.
    pub workbook_candidates: Vec<PathBuf>,
    /// Directory that `export` writes its download files into.
    pub download_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workbook_candidates: vec![
                PathBuf::from("data").join(WORKBOOK_FILE),
                PathBuf::from(WORKBOOK_FILE),
            ],
            download_dir: PathBuf::from("."),
        }
    }
}
