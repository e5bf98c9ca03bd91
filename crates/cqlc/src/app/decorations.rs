//! Editor decorations for questions anchored to a file.

use serde::Serialize;

use crate::domain::model::QuestionRecord;
use crate::domain::range::TextRange;

const NOT_ANSWERED: &str = "(not answered)";

/// Highlight for one question inside an open file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decoration {
    pub id: String,
    pub range: TextRange,
    pub answered: bool,
    /// Markdown shown when hovering the range.
    pub hover: String,
}

/// Build decorations for every question anchored to `file_path`.
///
/// Records with an invalid range are skipped so one bad entry does not hide
/// the rest of the file's highlights.
pub fn decorations_for(records: &[QuestionRecord], file_path: &str) -> Vec<Decoration> {
    records
        .iter()
        .filter(|record| record.file_path == file_path)
        .filter_map(|record| match record.range.validate() {
            Ok(range) => Some(Decoration {
                id: record.id.clone(),
                range,
                answered: record.is_answered(),
                hover: hover_text(record),
            }),
            Err(err) => {
                tracing::warn!(id = %record.id, %err, "skipping decoration");
                None
            }
        })
        .collect()
}

pub fn hover_text(record: &QuestionRecord) -> String {
    format!(
        "**Question:** {}\n\n**Answer:** {}",
        escape_markdown(&record.question),
        escape_markdown(record.answer.text().unwrap_or(NOT_ANSWERED))
    )
}

pub fn escape_markdown(text: &str) -> String {
    text.replace('*', "\\*").replace('_', "\\_")
}

pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
