//! Quiz configuration consumed by the generator.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::macros::{format_description, time};
use time::{Duration, OffsetDateTime, PrimitiveDateTime};

use super::fs::write_atomic;

/// Config document name at the workspace root.
pub const CONFIG_FILE: &str = "cqlc.config.json";

const DEFAULT_PASSWORD: &str = "letMeIn";

/// Fields that must be present and non-empty.
const REQUIRED_FIELDS: &[&str] = &[
    "title",
    "topic",
    "folder",
    "pl_root",
    "pl_question_root",
    "pl_assessment_root",
    "set",
    "number",
    "points_per_question",
    "startDate",
    "endDate",
    "timeLimitMin",
    "daysForGrading",
    "reviewEndDate",
    "language",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("config is missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),
    #[error("{field} '{value}' is not a valid date")]
    InvalidDate { field: &'static str, value: String },
    #[error("config file already exists at {}", path.display())]
    AlreadyExists { path: PathBuf },
}

/// Describes how stored questions are exported into PrairieLearn assessments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizConfig {
    pub title: String,
    pub topic: String,
    /// Directory name used under both the question and assessment roots.
    pub folder: String,
    pub pl_root: String,
    pub pl_question_root: String,
    pub pl_assessment_root: String,
    pub set: String,
    #[serde(deserialize_with = "string_or_number")]
    pub number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiz_directory_name: Option<String>,
    pub points_per_question: u32,
    #[serde(rename = "startDate")]
    pub start_date: String,
    #[serde(rename = "endDate")]
    pub end_date: String,
    #[serde(rename = "timeLimitMin")]
    pub time_limit_min: u32,
    #[serde(rename = "daysForGrading")]
    pub days_for_grading: u32,
    #[serde(rename = "reviewEndDate")]
    pub review_end_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub language: String,
    #[serde(rename = "studentNameMapping", default)]
    pub student_name_mapping: BTreeMap<String, String>,
}

/// Parsed schedule dates of a config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub start: OffsetDateTime,
    pub end: OffsetDateTime,
    pub review_end: OffsetDateTime,
}

impl QuizConfig {
    /// Read and validate the config at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&data)?;
        tracing::debug!(path = %path.display(), title = %config.title, "loaded quiz config");
        Ok(config)
    }

    /// Parse and validate config JSON.
    pub fn from_json(contents: &str) -> Result<Self, ConfigError> {
        let value: Value = serde_json::from_str(contents)?;

        let missing: Vec<String> = REQUIRED_FIELDS
            .iter()
            .filter(|field| value.get(**field).is_none_or(is_blank))
            .map(|field| (*field).to_owned())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::MissingFields(missing));
        }

        let config: QuizConfig = serde_json::from_value(value)?;
        config.schedule()?;
        Ok(config)
    }

    /// Starter config with dates relative to `now`.
    pub fn template(now: OffsetDateTime) -> Self {
        let at = |days: i64, hour: time::Time| {
            format_naive(now.date().saturating_add(Duration::days(days)).with_time(hour))
        };
        Self {
            title: "Quiz_Title".into(),
            topic: "Quiz_Topic".into(),
            folder: "Quiz_Folder".into(),
            pl_root: "/path/to/pl-course".into(),
            pl_question_root: "PersonalQuiz".into(),
            pl_assessment_root: "courseInstances/TemplateCourseInstance/assessments".into(),
            set: "Custom Quiz".into(),
            number: "1".into(),
            quiz_directory_name: None,
            points_per_question: 10,
            start_date: at(1, time!(10:00:00)),
            end_date: at(7, time!(23:59:59)),
            time_limit_min: 30,
            days_for_grading: 7,
            review_end_date: at(14, time!(23:59:59)),
            password: Some(DEFAULT_PASSWORD.into()),
            language: "python".into(),
            student_name_mapping: BTreeMap::new(),
        }
    }

    /// Write [`QuizConfig::template`] into `root`, returning the written path.
    pub fn write_template(
        root: &Path,
        now: OffsetDateTime,
        force: bool,
    ) -> Result<PathBuf, ConfigError> {
        let path = config_path(root);
        if path.exists() && !force {
            return Err(ConfigError::AlreadyExists { path });
        }
        let data = serde_json::to_string_pretty(&Self::template(now))?;
        write_atomic(&path, data.as_bytes()).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        tracing::info!(path = %path.display(), "wrote starter quiz config");
        Ok(path)
    }

    pub fn schedule(&self) -> Result<Schedule, ConfigError> {
        Ok(Schedule {
            start: parse_date("startDate", &self.start_date)?,
            end: parse_date("endDate", &self.end_date)?,
            review_end: parse_date("reviewEndDate", &self.review_end_date)?,
        })
    }

    pub fn password(&self) -> &str {
        self.password.as_deref().unwrap_or(DEFAULT_PASSWORD)
    }
}

/// Location of the config document for a workspace.
pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

/// Parse `YYYY-MM-DDTHH:MM:SS` (as UTC) or an RFC 3339 timestamp.
pub fn parse_date(field: &'static str, value: &str) -> Result<OffsetDateTime, ConfigError> {
    let naive = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
    PrimitiveDateTime::parse(value, naive)
        .map(PrimitiveDateTime::assume_utc)
        .or_else(|_| OffsetDateTime::parse(value, &Rfc3339))
        .map_err(|_| ConfigError::InvalidDate {
            field,
            value: value.to_owned(),
        })
}

fn format_naive(value: PrimitiveDateTime) -> String {
    let naive = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
    value.format(naive).unwrap_or_default()
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::String(text) => text.is_empty(),
        Value::Number(number) => number.as_f64() == Some(0.0),
        Value::Array(_) | Value::Object(_) => false,
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(text) => text,
        Raw::Number(number) => number.to_string(),
    })
}
