use std::collections::BTreeSet;

use log::warn;

use super::model::{BoksRow, CellValue, TopicDefinitions, Workbook};
use crate::error::ValidationError;

impl TopicDefinitions {
    /// Whether some definition row pairs exactly this category and topic.
    /// Empty cells never form a valid pair.
    pub fn contains(&self, category: &CellValue, topic: &CellValue) -> bool {
        if category.is_null() || topic.is_null() {
            return false;
        }
        self.rows
            .iter()
            .any(|d| &d.category == category && &d.topic == topic)
    }

    /// Topics allowed under `category`, de-duplicated, in workbook order.
    pub fn topics_for(&self, category: &CellValue) -> Vec<&CellValue> {
        let mut seen = BTreeSet::new();
        self.rows
            .iter()
            .filter(|d| &d.category == category && !d.topic.is_null())
            .map(|d| &d.topic)
            .filter(|t| seen.insert(*t))
            .collect()
    }

    /// Every distinct topic, regardless of category.
    pub fn unique_topics(&self) -> Vec<CellValue> {
        let mut seen = BTreeSet::new();
        self.rows
            .iter()
            .map(|d| &d.topic)
            .filter(|t| !t.is_null() && seen.insert(*t))
            .cloned()
            .collect()
    }
}

/// A new row as entered by the user, still unchecked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub course_code: String,
    pub category: String,
    pub topic: String,
}

/// A row that passed [`validate_submission`]. Only this type can be appended
/// to a session table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRow(BoksRow);

impl ValidatedRow {
    pub fn row(&self) -> &BoksRow {
        &self.0
    }

    pub fn into_row(self) -> BoksRow {
        self.0
    }
}

/// Resolve the submitted text against the reference tables and check that
/// the (category, topic) pair is defined.
pub fn validate_submission(
    workbook: &Workbook,
    submission: &Submission,
) -> Result<ValidatedRow, ValidationError> {
    let result = resolve(workbook, submission);
    if let Err(err) = &result {
        warn!("rejected submission {submission:?}: {err}");
    }
    result
}

fn resolve(workbook: &Workbook, submission: &Submission) -> Result<ValidatedRow, ValidationError> {
    let course = workbook
        .courses
        .find_text(&submission.course_code)
        .ok_or_else(|| ValidationError::UnknownCourse(submission.course_code.clone()))?;
    let category = workbook
        .categories
        .find_text(&submission.category)
        .ok_or_else(|| ValidationError::UnknownCategory(submission.category.clone()))?;

    let invalid = || ValidationError::InvalidCombination {
        category: submission.category.clone(),
        topic: submission.topic.clone(),
    };
    let topic = workbook
        .topics
        .topics_for(category)
        .into_iter()
        .find(|t| t.matches_text(&submission.topic))
        .ok_or_else(invalid)?;
    if !workbook.topics.contains(category, topic) {
        return Err(invalid());
    }

    Ok(ValidatedRow(BoksRow::new(
        course.clone(),
        category.clone(),
        topic.clone(),
    )))
}
