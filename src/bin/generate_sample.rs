use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use boks_manager::config::WORKBOOK_FILE;
use boks_manager::data::sample::{demo_sheets, workbook_bytes};

/// Write a demo `data/BIM_BOKS_V1.xlsx` with all four sheets.
fn main() -> Result<()> {
    let dir = PathBuf::from("data");
    fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;

    let path = dir.join(WORKBOOK_FILE);
    let sheets = demo_sheets();
    let bytes = workbook_bytes(&sheets).context("building sample workbook")?;
    fs::write(&path, &bytes).with_context(|| format!("writing {}", path.display()))?;

    for sheet in &sheets {
        println!("  {:<22} {} rows", sheet.name, sheet.rows.len());
    }
    println!("Wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}
