use std::fmt;
use std::str::FromStr;

use super::model::{BoksRow, BoksTable, CellValue, Workbook};

// ---------------------------------------------------------------------------
// Filter predicate: one optional value per key column
// ---------------------------------------------------------------------------

/// The three filterable columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterField {
    Course,
    Category,
    Topic,
}

impl FilterField {
    pub const ALL: [FilterField; 3] = [
        FilterField::Course,
        FilterField::Category,
        FilterField::Topic,
    ];

    /// Label shown to the user.
    pub fn label(self) -> &'static str {
        match self {
            FilterField::Course => "Cursus",
            FilterField::Category => "Categorie",
            FilterField::Topic => "Onderwerp",
        }
    }
}

impl fmt::Display for FilterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for FilterField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "course" | "cursus" | "cursuscode" => Ok(FilterField::Course),
            "category" | "categorie" => Ok(FilterField::Category),
            "topic" | "onderwerp" => Ok(FilterField::Topic),
            other => Err(format!("unknown filter field '{other}'")),
        }
    }
}

/// Active filter values. `None` means "Alle": the column is unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSelection {
    pub course_code: Option<CellValue>,
    pub category: Option<CellValue>,
    pub topic: Option<CellValue>,
}

impl FilterSelection {
    pub fn get(&self, field: FilterField) -> Option<&CellValue> {
        match field {
            FilterField::Course => self.course_code.as_ref(),
            FilterField::Category => self.category.as_ref(),
            FilterField::Topic => self.topic.as_ref(),
        }
    }

    pub fn set(&mut self, field: FilterField, value: Option<CellValue>) {
        match field {
            FilterField::Course => self.course_code = value,
            FilterField::Category => self.category = value,
            FilterField::Topic => self.topic = value,
        }
    }

    /// Whether no filter is active.
    pub fn is_empty(&self) -> bool {
        self.course_code.is_none() && self.category.is_none() && self.topic.is_none()
    }

    /// A row passes when every active filter equals its column exactly.
    pub fn matches(&self, row: &BoksRow) -> bool {
        fn passes(filter: Option<&CellValue>, value: &CellValue) -> bool {
            filter.map_or(true, |wanted| wanted == value)
        }
        passes(self.course_code.as_ref(), &row.course_code)
            && passes(self.category.as_ref(), &row.category)
            && passes(self.topic.as_ref(), &row.topic)
    }
}

/// Return indices of rows that pass all active filters, in table order.
pub fn filtered_indices(table: &BoksTable, selection: &FilterSelection) -> Vec<usize> {
    table
        .rows
        .iter()
        .enumerate()
        .filter(|(_, row)| selection.matches(row))
        .map(|(i, _)| i)
        .collect()
}

// ---------------------------------------------------------------------------
// TableView – borrowed, read-only projection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableView<'a> {
    pub columns: &'a [String],
    pub rows: Vec<&'a BoksRow>,
}

impl<'a> TableView<'a> {
    /// The rows at `indices`, skipping any that are out of range.
    pub fn from_indices(table: &'a BoksTable, indices: &[usize]) -> Self {
        TableView {
            columns: &table.columns,
            rows: indices.iter().filter_map(|&i| table.rows.get(i)).collect(),
        }
    }

    /// Filter this view further. Applying the same selection twice is a no-op.
    pub fn refine(&self, selection: &FilterSelection) -> TableView<'a> {
        TableView {
            columns: self.columns,
            rows: self
                .rows
                .iter()
                .copied()
                .filter(|row| selection.matches(row))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// An owned copy with the same columns.
    pub fn to_table(&self) -> BoksTable {
        BoksTable {
            columns: self.columns.to_vec(),
            rows: self.rows.iter().map(|&row| row.clone()).collect(),
        }
    }
}

pub fn filter_view<'a>(table: &'a BoksTable, selection: &FilterSelection) -> TableView<'a> {
    TableView {
        columns: &table.columns,
        rows: table.rows.iter().filter(|row| selection.matches(row)).collect(),
    }
}

// ---------------------------------------------------------------------------
// Options offered per filter
// ---------------------------------------------------------------------------

/// Values a user can pick for each filter, drawn from the reference tables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOptions {
    pub courses: Vec<CellValue>,
    pub categories: Vec<CellValue>,
    pub topics: Vec<CellValue>,
}

impl FilterOptions {
    pub fn values(&self, field: FilterField) -> &[CellValue] {
        match field {
            FilterField::Course => &self.courses,
            FilterField::Category => &self.categories,
            FilterField::Topic => &self.topics,
        }
    }

    /// The option whose text is exactly `text`.
    pub fn resolve(&self, field: FilterField, text: &str) -> Option<CellValue> {
        self.values(field)
            .iter()
            .find(|v| v.matches_text(text))
            .cloned()
    }
}

pub fn filter_options(workbook: &Workbook) -> FilterOptions {
    FilterOptions {
        courses: workbook.courses.values().to_vec(),
        categories: workbook.categories.values().to_vec(),
        topics: workbook.topics.unique_topics(),
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::data::sample::fixtures::scenario_workbook;

    fn row(course: &str, category: &str, topic: &str) -> BoksRow {
        BoksRow::new(course.into(), category.into(), topic.into())
    }

    fn table(rows: Vec<BoksRow>) -> BoksTable {
        let mut table = BoksTable::default();
        for r in rows {
            table.push(r);
        }
        table
    }

    #[test]
    fn course_filter_keeps_matching_rows_in_order() {
        let t = table(vec![
            row("C1", "Structural", "Foundations"),
            row("C2", "MEP", "HVAC"),
            row("C1", "Structural", "Beams"),
        ]);
        let selection = FilterSelection {
            course_code: Some("C1".into()),
            ..FilterSelection::default()
        };

        assert_eq!(filtered_indices(&t, &selection), vec![0, 2]);
        let view = filter_view(&t, &selection);
        assert_eq!(view.rows, vec![&t.rows[0], &t.rows[2]]);
    }

    #[test]
    fn filters_combine_as_conjunction() {
        let t = table(vec![
            row("C1", "Structural", "Foundations"),
            row("C1", "MEP", "HVAC"),
            row("C2", "MEP", "HVAC"),
        ]);
        let selection = FilterSelection {
            course_code: Some("C1".into()),
            category: Some("MEP".into()),
            topic: Some("HVAC".into()),
        };
        assert_eq!(filtered_indices(&t, &selection), vec![1]);
    }

    #[test]
    fn no_match_is_an_empty_view() {
        let t = table(vec![row("C1", "Structural", "Beams")]);
        let mut selection = FilterSelection::default();
        selection.set(FilterField::Topic, Some("beams".into()));
        assert!(filter_view(&t, &selection).is_empty());
    }

    #[test]
    fn typed_values_compare_exactly() {
        let t = table(vec![BoksRow::new(
            CellValue::Integer(101),
            "MEP".into(),
            "HVAC".into(),
        )]);
        let mut selection = FilterSelection::default();
        selection.set(FilterField::Course, Some("101".into()));
        assert!(filter_view(&t, &selection).is_empty());
        selection.set(FilterField::Course, Some(CellValue::Integer(101)));
        assert_eq!(filter_view(&t, &selection).len(), 1);
    }

    #[test]
    fn from_indices_and_to_table_copy_rows() {
        let t = table(vec![row("C1", "A", "x"), row("C2", "B", "y")]);
        let view = TableView::from_indices(&t, &[1, 7]);
        assert_eq!(view.len(), 1);
        let owned = view.to_table();
        assert_eq!(owned.columns, t.columns);
        assert_eq!(owned.rows, vec![t.rows[1].clone()]);
    }

    #[test]
    fn options_come_from_reference_tables() {
        let workbook = scenario_workbook();
        let options = filter_options(&workbook);
        assert_eq!(options.courses.len(), 3);
        assert_eq!(options.categories, vec![CellValue::from("Structural"), CellValue::from("MEP")]);
        assert_eq!(
            options.topics,
            vec![
                CellValue::from("Foundations"),
                CellValue::from("Beams"),
                CellValue::from("HVAC"),
            ]
        );
        assert_eq!(
            options.resolve(FilterField::Course, "C3"),
            Some(CellValue::from("C3"))
        );
        assert_eq!(options.resolve(FilterField::Course, "C9"), None);
    }

    #[test]
    fn field_names_parse_in_both_languages() {
        assert_eq!("course".parse::<FilterField>(), Ok(FilterField::Course));
        assert_eq!("Onderwerp".parse::<FilterField>(), Ok(FilterField::Topic));
        assert!("colour".parse::<FilterField>().is_err());
    }

    fn arb_row() -> impl Strategy<Value = BoksRow> {
        ("C[1-3]", "(Structural|MEP)", "(Beams|HVAC|Foundations)")
            .prop_map(|(c, cat, t)| row(&c, &cat, &t))
    }

    fn arb_selection() -> impl Strategy<Value = FilterSelection> {
        (
            prop::option::of("C[1-3]"),
            prop::option::of("(Structural|MEP)"),
            prop::option::of("(Beams|HVAC|Foundations)"),
        )
            .prop_map(|(c, cat, t)| FilterSelection {
                course_code: c.map(|s| CellValue::from(s.as_str())),
                category: cat.map(|s| CellValue::from(s.as_str())),
                topic: t.map(|s| CellValue::from(s.as_str())),
            })
    }

    proptest! {
        #[test]
        fn empty_selection_returns_everything(rows in prop::collection::vec(arb_row(), 0..30)) {
            let t = table(rows);
            let view = filter_view(&t, &FilterSelection::default());
            prop_assert_eq!(view.to_table(), t);
        }

        #[test]
        fn filtering_is_idempotent(
            rows in prop::collection::vec(arb_row(), 0..30),
            selection in arb_selection(),
        ) {
            let t = table(rows);
            let once = filter_view(&t, &selection);
            let twice = once.refine(&selection);
            prop_assert_eq!(&once, &twice);
        }

        #[test]
        fn view_preserves_relative_order(
            rows in prop::collection::vec(arb_row(), 0..30),
            selection in arb_selection(),
        ) {
            let t = table(rows);
            let indices = filtered_indices(&t, &selection);
            prop_assert!(indices.windows(2).all(|w| w[0] < w[1]));
            prop_assert_eq!(TableView::from_indices(&t, &indices), filter_view(&t, &selection));
        }
    }
}
