//! Question store persistence.

use std::collections::HashSet;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use crate::domain::errors::StoreError;
use crate::domain::model::{AnswerState, QuestionRecord};
use crate::infra::fs::write_atomic;

/// Hidden directory holding the store document.
pub const STORE_DIR: &str = ".vscode";
/// Store document name inside [`STORE_DIR`].
pub const STORE_FILE: &str = "quiz-questions.json";

pub type StoreResult<T> = Result<T, StoreError>;

/// Owns the question document of a single workspace.
///
/// Records are read from disk on first use and kept in memory. Every mutation
/// validates against the in-memory sequence, writes the full document, and
/// only then commits the change in memory, so a failed call leaves both the
/// file and the cache untouched.
#[derive(Debug, Clone)]
pub struct QuestionStore {
    path: PathBuf,
    records: Option<Vec<QuestionRecord>>,
}

impl QuestionStore {
    /// Create a store for the workspace rooted at `root`.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self::at_path(root.as_ref().join(STORE_DIR).join(STORE_FILE))
    }

    /// Create a store backed by an explicit document path.
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            records: None,
        }
    }

    /// Location of the backing document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the backing document. A missing document is an empty store.
    pub fn load(&mut self) -> StoreResult<&[QuestionRecord]> {
        let records = read_document(&self.path)?;
        tracing::debug!(path = %self.path.display(), count = records.len(), "loaded question store");
        let records = self.records.insert(records);
        Ok(records.as_slice())
    }

    /// Records in insertion order, loading the document on first use.
    pub fn records(&mut self) -> StoreResult<&[QuestionRecord]> {
        if self.records.is_none() {
            self.load()?;
        }
        Ok(self.records.as_deref().unwrap_or_default())
    }

    /// Look up a record by id.
    pub fn get(&mut self, id: &str) -> StoreResult<&QuestionRecord> {
        self.records()?
            .iter()
            .find(|record| record.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_owned()))
    }

    /// Replace the whole document with `records`.
    pub fn save_all(&mut self, records: Vec<QuestionRecord>) -> StoreResult<()> {
        check_records(&records)?;

        let data = serde_json::to_string_pretty(&records)
            .map_err(|err| StoreError::io(&self.path, io::Error::other(err)))?;
        write_atomic(&self.path, data.as_bytes())
            .map_err(|source| StoreError::io(&self.path, source))?;

        tracing::debug!(path = %self.path.display(), count = records.len(), "saved question store");
        self.records = Some(records);
        Ok(())
    }

    /// Append a new question.
    pub fn add_question(&mut self, record: QuestionRecord) -> StoreResult<&QuestionRecord> {
        record.range.validate()?;
        require_text(&record.question, "question")?;

        let mut records = self.records()?.to_vec();
        if records.iter().any(|existing| existing.id == record.id) {
            return Err(StoreError::DuplicateId(record.id));
        }

        let id = record.id.clone();
        records.push(record);
        self.save_all(records)?;
        tracing::info!(%id, "added question");
        self.get(&id)
    }

    /// Replace the question text, keeping the record's position.
    pub fn edit_question(&mut self, id: &str, text: &str) -> StoreResult<&QuestionRecord> {
        require_text(text, "question")?;
        self.update(id, |record| record.question = text.to_owned())?;
        tracing::info!(%id, "edited question");
        self.get(id)
    }

    /// Record an answer, overwriting any previous one.
    pub fn answer_question(
        &mut self,
        id: &str,
        text: &str,
        now: i64,
    ) -> StoreResult<&QuestionRecord> {
        require_text(text, "answer")?;
        self.update(id, |record| {
            record.answer = AnswerState::Answered {
                text: text.to_owned(),
                answered_at: now,
            }
        })?;
        tracing::info!(%id, "answered question");
        self.get(id)
    }

    /// Include or exclude a question from quiz generation.
    pub fn set_excluded(&mut self, id: &str, excluded: bool) -> StoreResult<&QuestionRecord> {
        self.update(id, |record| record.excluded = excluded)?;
        tracing::info!(%id, excluded, "updated exclusion");
        self.get(id)
    }

    /// Remove a question, preserving the order of the rest.
    pub fn delete_question(&mut self, id: &str) -> StoreResult<QuestionRecord> {
        let mut records = self.records()?.to_vec();
        let index = position(&records, id)?;
        let removed = records.remove(index);
        self.save_all(records)?;
        tracing::info!(%id, "deleted question");
        Ok(removed)
    }

    fn update(&mut self, id: &str, apply: impl FnOnce(&mut QuestionRecord)) -> StoreResult<()> {
        let mut records = self.records()?.to_vec();
        let index = position(&records, id)?;
        apply(&mut records[index]);
        self.save_all(records)
    }
}

/// Split records into `(answered, unanswered)`, keeping relative order.
pub fn filter_answered(
    records: &[QuestionRecord],
) -> (Vec<&QuestionRecord>, Vec<&QuestionRecord>) {
    records.iter().partition(|record| record.is_answered())
}

fn read_document(path: &Path) -> StoreResult<Vec<QuestionRecord>> {
    let data = match fs::read_to_string(path) {
        Ok(data) => data,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(StoreError::io(path, err)),
    };
    let records: Vec<QuestionRecord> =
        serde_json::from_str(&data).map_err(|source| StoreError::Corrupt {
            path: path.to_path_buf(),
            source,
        })?;
    check_records(&records).map_err(|err| StoreError::Inconsistent {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })?;
    Ok(records)
}

/// Invariants every stored sequence upholds: unique ids, ordered ranges,
/// non-blank question and answer text.
fn check_records(records: &[QuestionRecord]) -> StoreResult<()> {
    let mut seen = HashSet::new();
    for record in records {
        if !seen.insert(record.id.as_str()) {
            return Err(StoreError::DuplicateId(record.id.clone()));
        }
        record.range.validate()?;
        require_text(&record.question, "question")?;
        if let Some(answer) = record.answer.text() {
            require_text(answer, "answer")?;
        }
    }
    Ok(())
}

fn position(records: &[QuestionRecord], id: &str) -> StoreResult<usize> {
    records
        .iter()
        .position(|record| record.id == id)
        .ok_or_else(|| StoreError::NotFound(id.to_owned()))
}

fn require_text(text: &str, what: &str) -> StoreResult<()> {
    if text.trim().is_empty() {
        return Err(StoreError::Validation(format!("{what} cannot be empty")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::range::{Position, TextRange};

    fn record(id: &str, file: &str) -> QuestionRecord {
        let range = TextRange::new(Position::new(1, 0), Position::new(3, 0)).unwrap();
        QuestionRecord::new(id, file, range, "...", format!("Why {id}?"), 1000)
    }

    fn ids(records: &[QuestionRecord]) -> Vec<&str> {
        records.iter().map(|record| record.id.as_str()).collect()
    }

    #[test]
    fn missing_document_equals_empty_array() -> StoreResult<()> {
        let temp = tempfile::tempdir().unwrap();
        let mut missing = QuestionStore::new(temp.path());
        assert!(missing.load()?.is_empty());

        fs::create_dir_all(temp.path().join(STORE_DIR)).unwrap();
        fs::write(missing.path(), "[]").unwrap();
        let mut empty = QuestionStore::new(temp.path());
        assert!(empty.load()?.is_empty());
        Ok(())
    }

    #[test]
    fn save_and_load_round_trip() -> StoreResult<()> {
        let temp = tempfile::tempdir().unwrap();
        let mut store = QuestionStore::new(temp.path());
        let mut answered = record("b", "x/b.py");
        answered.answer = AnswerState::Answered {
            text: "yes".into(),
            answered_at: 5,
        };
        answered.excluded = true;
        let records = vec![record("a", "x/a.py"), answered, record("c", "y/c.py")];

        store.save_all(records.clone())?;
        let mut fresh = QuestionStore::new(temp.path());
        assert_eq!(fresh.load()?, records.as_slice());
        Ok(())
    }

    #[test]
    fn corrupt_document_is_reported() {
        let temp = tempfile::tempdir().unwrap();
        let mut store = QuestionStore::new(temp.path());
        fs::create_dir_all(temp.path().join(STORE_DIR)).unwrap();
        fs::write(store.path(), "{ not json").unwrap();
        assert!(matches!(store.load(), Err(StoreError::Corrupt { .. })));
    }

    #[test]
    fn duplicate_id_leaves_store_unchanged() -> StoreResult<()> {
        let temp = tempfile::tempdir().unwrap();
        let mut store = QuestionStore::new(temp.path());
        store.add_question(record("q1", "a.py"))?;
        let before = fs::read_to_string(store.path()).unwrap();

        let err = store.add_question(record("q1", "b.py")).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateId(id) if id == "q1"));
        assert_eq!(fs::read_to_string(store.path()).unwrap(), before);
        assert_eq!(ids(store.load()?), vec!["q1"]);
        Ok(())
    }

    #[test]
    fn add_rejects_inverted_range_and_blank_question() {
        let temp = tempfile::tempdir().unwrap();
        let mut store = QuestionStore::new(temp.path());

        let mut inverted = record("q1", "a.py");
        inverted.range = TextRange {
            start: Position::new(5, 0),
            end: Position::new(2, 0),
        };
        assert!(matches!(
            store.add_question(inverted),
            Err(StoreError::InvalidRange(_))
        ));

        let mut blank = record("q2", "a.py");
        blank.question = "   ".into();
        assert!(matches!(
            store.add_question(blank),
            Err(StoreError::Validation(_))
        ));
        assert!(!store.path().exists());
    }

    #[test]
    fn edit_keeps_position() -> StoreResult<()> {
        let temp = tempfile::tempdir().unwrap();
        let mut store = QuestionStore::new(temp.path());
        for id in ["a", "b", "c"] {
            store.add_question(record(id, "a.py"))?;
        }

        store.edit_question("b", "Rewritten?")?;
        let records = store.load()?;
        assert_eq!(ids(records), vec!["a", "b", "c"]);
        assert_eq!(records[1].question, "Rewritten?");

        assert!(matches!(
            store.edit_question("b", ""),
            Err(StoreError::Validation(_))
        ));
        assert!(matches!(
            store.edit_question("zzz", "text"),
            Err(StoreError::NotFound(_))
        ));
        Ok(())
    }

    #[test]
    fn reanswer_overwrites_text_and_timestamp() -> StoreResult<()> {
        let temp = tempfile::tempdir().unwrap();
        let mut store = QuestionStore::new(temp.path());
        store.add_question(record("q1", "a.py"))?;

        store.answer_question("q1", "first", 10)?;
        let updated = store.answer_question("q1", "second", 20)?;
        assert_eq!(updated.answer.text(), Some("second"));
        assert_eq!(updated.answer.answered_at(), Some(20));

        assert!(matches!(
            store.answer_question("q1", " ", 30),
            Err(StoreError::Validation(_))
        ));
        assert_eq!(store.load()?[0].answer.answered_at(), Some(20));
        Ok(())
    }

    #[test]
    fn delete_preserves_remaining_order() -> StoreResult<()> {
        let temp = tempfile::tempdir().unwrap();
        let mut store = QuestionStore::new(temp.path());
        for id in ["r0", "r1", "r2", "r3"] {
            store.add_question(record(id, "a.py"))?;
        }

        let removed = store.delete_question("r1")?;
        assert_eq!(removed.id, "r1");
        assert_eq!(ids(store.load()?), vec!["r0", "r2", "r3"]);
        assert!(matches!(
            store.delete_question("r1"),
            Err(StoreError::NotFound(_))
        ));
        Ok(())
    }

    #[test]
    fn exclusion_is_persisted() -> StoreResult<()> {
        let temp = tempfile::tempdir().unwrap();
        let mut store = QuestionStore::new(temp.path());
        store.add_question(record("q1", "a.py"))?;

        store.set_excluded("q1", true)?;
        assert!(QuestionStore::new(temp.path()).get("q1")?.excluded);
        store.set_excluded("q1", false)?;
        assert!(!QuestionStore::new(temp.path()).get("q1")?.excluded);
        Ok(())
    }

    #[test]
    fn partition_is_stable_and_complete() {
        let mut records: Vec<QuestionRecord> = ["a", "b", "c", "d", "e"]
            .iter()
            .map(|id| record(id, "a.py"))
            .collect();
        for index in [1, 3] {
            records[index].answer = AnswerState::Answered {
                text: "done".into(),
                answered_at: 1,
            };
        }

        let (answered, unanswered) = filter_answered(&records);
        let answered: Vec<&str> = answered.iter().map(|r| r.id.as_str()).collect();
        let unanswered: Vec<&str> = unanswered.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(answered, vec!["b", "d"]);
        assert_eq!(unanswered, vec!["a", "c", "e"]);
    }

    #[test]
    fn save_all_rejects_duplicate_ids() {
        let temp = tempfile::tempdir().unwrap();
        let mut store = QuestionStore::new(temp.path());
        let err = store
            .save_all(vec![record("a", "x.py"), record("a", "y.py")])
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateId(_)));
        assert!(!store.path().exists());
    }

    #[test]
    fn save_all_rejects_invalid_records() {
        let temp = tempfile::tempdir().unwrap();
        let mut store = QuestionStore::new(temp.path());

        let mut inverted = record("a", "x.py");
        inverted.range = TextRange {
            start: Position::new(5, 0),
            end: Position::new(2, 0),
        };
        assert!(matches!(
            store.save_all(vec![inverted]),
            Err(StoreError::InvalidRange(_))
        ));

        let mut blank = record("b", "x.py");
        blank.question = String::new();
        assert!(matches!(
            store.save_all(vec![blank]),
            Err(StoreError::Validation(_))
        ));
        assert!(!store.path().exists());
    }

    fn write_raw(store: &QuestionStore, json: &str) {
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), json).unwrap();
    }

    const RANGE_JSON: &str = r#"{"start":{"line":0,"character":0},"end":{"line":1,"character":0}}"#;

    #[test]
    fn load_rejects_duplicate_ids() {
        let temp = tempfile::tempdir().unwrap();
        let mut store = QuestionStore::new(temp.path());
        let entry = format!(
            r#"{{"id":"dup","filePath":"a.py","range":{RANGE_JSON},"snippet":"x","question":"Why?","askedAt":1}}"#
        );
        write_raw(&store, &format!("[{entry},{entry}]"));

        let err = store.load().unwrap_err();
        assert!(
            matches!(
                &err,
                StoreError::Inconsistent { path, reason }
                    if path == store.path() && reason.contains("dup")
            ),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn load_rejects_blank_question() {
        let temp = tempfile::tempdir().unwrap();
        let mut store = QuestionStore::new(temp.path());
        write_raw(
            &store,
            &format!(
                r#"[{{"id":"q1","filePath":"a.py","range":{RANGE_JSON},"snippet":"x","question":"  ","askedAt":1}}]"#
            ),
        );

        assert!(matches!(
            store.load(),
            Err(StoreError::Inconsistent { .. })
        ));
        assert!(matches!(
            store.add_question(record("fresh", "a.py")),
            Err(StoreError::Inconsistent { .. })
        ));
    }

    #[test]
    fn failed_write_leaves_file_and_cache_unchanged() -> StoreResult<()> {
        let temp = tempfile::tempdir().unwrap();
        let mut store = QuestionStore::new(temp.path());
        store.add_question(record("q1", "a.py"))?;

        // A directory in place of the document makes the final rename fail.
        fs::remove_file(store.path()).unwrap();
        fs::create_dir(store.path()).unwrap();

        let err = store.add_question(record("q2", "a.py")).unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }), "unexpected error: {err}");
        assert_eq!(ids(store.records()?), vec!["q1"]);
        assert!(store.path().is_dir());
        let entries = fs::read_dir(temp.path().join(STORE_DIR)).unwrap().count();
        assert_eq!(entries, 1);
        Ok(())
    }

    #[test]
    fn unknown_ids_are_not_found() -> StoreResult<()> {
        let temp = tempfile::tempdir().unwrap();
        let mut store = QuestionStore::new(temp.path());
        store.add_question(record("q1", "a.py"))?;

        assert!(matches!(
            store.answer_question("missing", "text", 1),
            Err(StoreError::NotFound(id)) if id == "missing"
        ));
        assert!(matches!(
            store.set_excluded("missing", true),
            Err(StoreError::NotFound(id)) if id == "missing"
        ));
        assert!(!store.get("q1")?.excluded);
        Ok(())
    }
}
