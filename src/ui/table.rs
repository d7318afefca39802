use std::fmt::Display;

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, ContentArrangement, Table};

use crate::data::filter::{FilterField, FilterSelection, TableView};

// ---------------------------------------------------------------------------
// Overview table
// ---------------------------------------------------------------------------

/// Render a view as a bordered table, one line per row.
pub fn render_view(view: &TableView<'_>) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(view.columns.iter().map(|c| header_cell(c)).collect::<Vec<_>>());
    for row in &view.rows {
        table.add_row(
            view.columns
                .iter()
                .map(|c| Cell::new(row.get(c)))
                .collect::<Vec<_>>(),
        );
    }
    table.to_string()
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label).add_attribute(Attribute::Bold)
}

// ---------------------------------------------------------------------------
// Small text blocks
// ---------------------------------------------------------------------------

/// One line summarising the active filters, e.g. `Cursus: C1 | Categorie: Alle`.
pub fn filter_summary(selection: &FilterSelection) -> String {
    FilterField::ALL
        .iter()
        .map(|&field| match selection.get(field) {
            Some(value) => format!("{field}: {value}"),
            None => format!("{field}: Alle"),
        })
        .collect::<Vec<_>>()
        .join(" | ")
}

/// A titled bullet list.
pub fn render_list<T: Display>(title: &str, values: impl IntoIterator<Item = T>) -> String {
    let mut out = format!("{title}:");
    let mut any = false;
    for value in values {
        out.push_str(&format!("\n  - {value}"));
        any = true;
    }
    if !any {
        out.push_str(" (geen)");
    }
    out
}
