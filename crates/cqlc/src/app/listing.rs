//! Filtering and numbering of question listings.

use std::collections::{BTreeMap, HashMap};

use crate::app::generate::student_name;
use crate::app::store::filter_answered;
use crate::domain::model::QuestionRecord;

const LETTERS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Which answer state a listing keeps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Answered,
    Unanswered,
}

/// Criteria for narrowing a listing. Unset criteria match everything.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub status: StatusFilter,
    /// Student folder, compared against the first path segment.
    pub student: Option<String>,
    /// Case-insensitive text looked up in question, answer and file path.
    pub search: Option<String>,
}

impl ListFilter {
    /// Records passing every criterion, in store order.
    pub fn apply<'a>(&self, records: &'a [QuestionRecord]) -> Vec<&'a QuestionRecord> {
        let candidates = match self.status {
            StatusFilter::All => records.iter().collect(),
            StatusFilter::Answered => filter_answered(records).0,
            StatusFilter::Unanswered => filter_answered(records).1,
        };
        let needle = self
            .search
            .as_deref()
            .map(str::to_lowercase)
            .filter(|needle| !needle.is_empty());

        candidates
            .into_iter()
            .filter(|record| {
                self.student
                    .as_deref()
                    .is_none_or(|student| student_name(&record.file_path) == student)
            })
            .filter(|record| needle.as_deref().is_none_or(|needle| mentions(record, needle)))
            .collect()
    }
}

fn mentions(record: &QuestionRecord, needle: &str) -> bool {
    [
        record.question.as_str(),
        record.answer.text().unwrap_or_default(),
        record.file_path.as_str(),
    ]
    .iter()
    .any(|haystack| haystack.to_lowercase().contains(needle))
}

/// Listing labels such as `1A` or `2C`, keyed by record id.
///
/// Students are numbered alphabetically from 1 and their questions lettered
/// in store order. Past `Z` the letter becomes the bracketed position, so the
/// 27th question of the first student is `1(27)`. Labels do not depend on any
/// filter.
pub fn question_numbers(records: &[QuestionRecord]) -> HashMap<&str, String> {
    let mut groups: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for record in records {
        groups
            .entry(student_name(&record.file_path))
            .or_default()
            .push(record.id.as_str());
    }

    let mut numbers = HashMap::with_capacity(records.len());
    for (student_index, ids) in groups.values().enumerate() {
        for (index, id) in ids.iter().enumerate() {
            let letter = match LETTERS.get(index) {
                Some(&letter) => char::from(letter).to_string(),
                None => format!("({})", index + 1),
            };
            numbers.insert(*id, format!("{}{letter}", student_index + 1));
        }
    }
    numbers
}
