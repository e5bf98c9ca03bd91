//! PrairieLearn question and assessment generation.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use minijinja::Environment;
use serde::Serialize;
use time::macros::format_description;
use time::{Duration, OffsetDateTime, UtcOffset};
use uuid::Uuid;

use crate::app::decorations::escape_html;
use crate::domain::model::QuestionRecord;
use crate::infra::config::QuizConfig;
use crate::infra::fs::write_atomic;

const UNKNOWN_STUDENT: &str = "unknown_student";
const INSTRUCTOR: &str = "instructor";
const COMBINED_DIR: &str = "combined-questions";
const INSTRUCTOR_PASSWORD: &str = "instructorAccess";
const NO_QUESTION: &str = "No question content available.";
const NO_CODE: &str = "// No code highlighted";

/// Summary of a generation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationReport {
    /// Students in first-seen order.
    pub students: Vec<String>,
    pub questions: usize,
    pub excluded: usize,
    pub files: Vec<PathBuf>,
}

/// Renders stored questions into per-student PrairieLearn assessments.
pub struct Generator {
    env: Environment<'static>,
}

impl Generator {
    /// Create a generator with the built-in templates loaded.
    pub fn new() -> Result<Self> {
        Ok(Self {
            env: default_environment()?,
        })
    }

    /// Write every artifact for `records` under the roots named by `config`.
    pub fn generate(
        &self,
        config: &QuizConfig,
        records: &[QuestionRecord],
    ) -> Result<GenerationReport> {
        if records.is_empty() {
            bail!("the question store contains no questions");
        }
        let included: Vec<&QuestionRecord> =
            records.iter().filter(|record| !record.excluded).collect();
        if included.is_empty() {
            bail!("all questions are excluded, nothing to generate");
        }
        let excluded = records.len() - included.len();
        if excluded > 0 {
            tracing::info!(excluded, "skipping excluded questions");
        }

        let schedule = config.schedule()?;
        let review_start = format_instant(shift_days(schedule.review_end, 1)?)?;
        let review_end = format_instant(shift_days(schedule.end, 7)?)?;
        let instructor_end = format_instant(shift_days(schedule.end, 365)?)?;
        let roots = Roots::new(config);
        let groups = group_by_student(&included);
        let mut report = GenerationReport {
            students: groups.iter().map(|group| group.name.to_owned()).collect(),
            questions: included.len(),
            excluded,
            files: Vec::new(),
        };

        for group in &groups {
            let question_dir = roots.questions.join(group.name);
            for (index, record) in group.questions.iter().enumerate() {
                let dir = question_dir.join(format!("question{}", index + 1));
                let html = self.render_question(&config.language, record)?;
                write_artifact(&mut report, &dir.join("question.html"), html)?;
                write_json(
                    &mut report,
                    &dir.join("info.json"),
                    &QuestionInfo::new(config.title.clone(), &config.topic),
                )?;
            }

            let assessment = AssessmentInfo {
                uuid: new_uuid(),
                kind: "Exam",
                title: config.title.clone(),
                set: config.set.clone(),
                number: config.number.clone(),
                allow_access: vec![
                    AccessRule {
                        mode: "Public",
                        uids: Some(vec![group.name.to_owned()]),
                        credit: 100,
                        time_limit_min: Some(config.time_limit_min),
                        start_date: config.start_date.clone(),
                        end_date: config.end_date.clone(),
                        password: Some(config.password().to_owned()),
                        active: None,
                    },
                    AccessRule {
                        mode: "Public",
                        uids: None,
                        credit: 0,
                        time_limit_min: None,
                        start_date: review_start.clone(),
                        end_date: review_end.clone(),
                        password: None,
                        active: Some(false),
                    },
                ],
                zones: vec![Zone {
                    questions: (1..=group.questions.len())
                        .map(|n| ZoneQuestion {
                            id: format!(
                                "{}/{}/{}/question{n}",
                                config.pl_question_root, config.folder, group.name
                            ),
                            points: config.points_per_question,
                        })
                        .collect(),
                }],
            };
            write_json(
                &mut report,
                &roots
                    .assessments
                    .join(group.name)
                    .join("infoAssessment.json"),
                &assessment,
            )?;
            tracing::debug!(student = group.name, questions = group.questions.len(), "generated student quiz");
        }

        self.write_instructor_view(config, &roots, &groups, instructor_end, &mut report)?;

        tracing::info!(
            students = report.students.len(),
            questions = report.questions,
            files = report.files.len(),
            "generated quiz artifacts"
        );
        Ok(report)
    }

    /// Render the question panel for one record.
    pub fn render_question(&self, language: &str, record: &QuestionRecord) -> Result<String> {
        let context = QuestionContext {
            language,
            question: question_text(record),
            code: code_text(record),
        };
        self.render("question", &context)
    }

    fn write_instructor_view(
        &self,
        config: &QuizConfig,
        roots: &Roots,
        groups: &[StudentGroup<'_>],
        end_date: String,
        report: &mut GenerationReport,
    ) -> Result<()> {
        let context = CombinedContext {
            title: &config.title,
            language: &config.language,
            students: groups
                .iter()
                .map(|group| CombinedStudent {
                    name: group.name,
                    questions: group
                        .questions
                        .iter()
                        .map(|record| CombinedQuestion {
                            question: question_text(record),
                            code: code_text(record),
                        })
                        .collect(),
                })
                .collect(),
        };
        let combined_dir = roots.questions.join(INSTRUCTOR).join(COMBINED_DIR);
        let html = self.render("combined", &context)?;
        write_artifact(report, &combined_dir.join("question.html"), html)?;
        write_json(
            report,
            &combined_dir.join("info.json"),
            &QuestionInfo::new(format!("{} - All Questions", config.title), &config.topic),
        )?;

        let assessment = AssessmentInfo {
            uuid: new_uuid(),
            kind: "Exam",
            title: format!("{} - Instructor View", config.title),
            set: config.set.clone(),
            number: config.number.clone(),
            allow_access: vec![AccessRule {
                mode: "Public",
                uids: Some(vec![INSTRUCTOR.to_owned()]),
                credit: 100,
                time_limit_min: Some(0),
                start_date: config.start_date.clone(),
                end_date,
                password: Some(INSTRUCTOR_PASSWORD.to_owned()),
                active: None,
            }],
            zones: vec![Zone {
                questions: vec![ZoneQuestion {
                    id: format!(
                        "{}/{}/{INSTRUCTOR}/{COMBINED_DIR}",
                        config.pl_question_root, config.folder
                    ),
                    points: 1,
                }],
            }],
        };
        write_json(
            report,
            &roots
                .assessments
                .join(INSTRUCTOR)
                .join("infoAssessment.json"),
            &assessment,
        )
    }

    fn render<S: Serialize>(&self, name: &str, context: &S) -> Result<String> {
        self.env
            .get_template(name)
            .and_then(|template| template.render(context))
            .map_err(|err| anyhow!("failed to render template '{name}': {err}"))
    }
}

fn default_environment() -> Result<Environment<'static>> {
    let mut env = Environment::new();
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env.add_template("question", QUESTION_TEMPLATE)
        .map_err(|err| anyhow!("failed to register question template: {err}"))?;
    env.add_template("combined", COMBINED_TEMPLATE)
        .map_err(|err| anyhow!("failed to register combined template: {err}"))?;
    Ok(env)
}

struct Roots {
    questions: PathBuf,
    assessments: PathBuf,
}

impl Roots {
    fn new(config: &QuizConfig) -> Self {
        let pl_root = Path::new(&config.pl_root);
        Self {
            questions: pl_root
                .join("questions")
                .join(&config.pl_question_root)
                .join(&config.folder),
            assessments: pl_root
                .join(&config.pl_assessment_root)
                .join(&config.folder),
        }
    }
}

struct StudentGroup<'a> {
    name: &'a str,
    questions: Vec<&'a QuestionRecord>,
}

/// Group by the first path segment, keeping first-seen student order.
fn group_by_student<'a>(records: &[&'a QuestionRecord]) -> Vec<StudentGroup<'a>> {
    let mut groups: Vec<StudentGroup<'a>> = Vec::new();
    for &record in records {
        let name = student_name(&record.file_path);
        match groups.iter_mut().find(|group| group.name == name) {
            Some(group) => group.questions.push(record),
            None => groups.push(StudentGroup {
                name,
                questions: vec![record],
            }),
        }
    }
    groups
}

pub fn student_name(file_path: &str) -> &str {
    file_path
        .split(['/', '\\'])
        .next()
        .filter(|segment| !segment.is_empty())
        .unwrap_or(UNKNOWN_STUDENT)
}

fn question_text(record: &QuestionRecord) -> &str {
    if record.question.is_empty() {
        NO_QUESTION
    } else {
        &record.question
    }
}

fn code_text(record: &QuestionRecord) -> String {
    if record.snippet.is_empty() {
        NO_CODE.to_owned()
    } else {
        escape_html(&record.snippet)
    }
}

/// `value` moved by whole days, failing past the supported calendar range.
fn shift_days(value: OffsetDateTime, days: i64) -> Result<OffsetDateTime> {
    value
        .checked_add(Duration::days(days))
        .with_context(|| format!("date {value} plus {days} days is out of range"))
}

/// Format as `YYYY-MM-DDTHH:MM:SS.mmmZ`.
fn format_instant(value: OffsetDateTime) -> Result<String> {
    value
        .to_offset(UtcOffset::UTC)
        .format(format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
        ))
        .context("failed to format assessment date")
}

fn new_uuid() -> String {
    Uuid::new_v4().to_string()
}

fn write_artifact(report: &mut GenerationReport, path: &Path, contents: String) -> Result<()> {
    write_atomic(path, contents.as_bytes())
        .with_context(|| format!("failed to write {}", path.display()))?;
    report.files.push(path.to_path_buf());
    Ok(())
}

fn write_json<S: Serialize>(report: &mut GenerationReport, path: &Path, value: &S) -> Result<()> {
    let data = serde_json::to_string_pretty(value)
        .with_context(|| format!("failed to serialize {}", path.display()))?;
    write_artifact(report, path, data)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QuestionInfo {
    uuid: String,
    #[serde(rename = "type")]
    kind: &'static str,
    grading_method: &'static str,
    title: String,
    topic: String,
}

impl QuestionInfo {
    fn new(title: String, topic: &str) -> Self {
        Self {
            uuid: new_uuid(),
            kind: "v3",
            grading_method: "Manual",
            title,
            topic: topic.to_owned(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AssessmentInfo {
    uuid: String,
    #[serde(rename = "type")]
    kind: &'static str,
    title: String,
    set: String,
    number: String,
    allow_access: Vec<AccessRule>,
    zones: Vec<Zone>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AccessRule {
    mode: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    uids: Option<Vec<String>>,
    credit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    time_limit_min: Option<u32>,
    start_date: String,
    end_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    active: Option<bool>,
}

#[derive(Serialize)]
struct Zone {
    questions: Vec<ZoneQuestion>,
}

#[derive(Serialize)]
struct ZoneQuestion {
    id: String,
    points: u32,
}

#[derive(Serialize)]
struct QuestionContext<'a> {
    language: &'a str,
    question: &'a str,
    code: String,
}

#[derive(Serialize)]
struct CombinedContext<'a> {
    title: &'a str,
    language: &'a str,
    students: Vec<CombinedStudent<'a>>,
}

#[derive(Serialize)]
struct CombinedStudent<'a> {
    name: &'a str,
    questions: Vec<CombinedQuestion<'a>>,
}

#[derive(Serialize)]
struct CombinedQuestion<'a> {
    question: &'a str,
    code: String,
}

const QUESTION_TEMPLATE: &str = r#"<pl-question-panel>
<markdown>
{{ question }}
</markdown>
<pl-code language="{{ language }}">
{{ code }}
</pl-code>
</pl-question-panel>
"#;

const COMBINED_TEMPLATE: &str = r#"<pl-question-panel>
<markdown>
# {{ title }} - All Student Questions
<hr><br>
</markdown>
</pl-question-panel>
{% for student in students %}
<pl-question-panel>
<markdown>
## Student: {{ student.name }}
</markdown>
</pl-question-panel>
{% for item in student.questions %}
<pl-question-panel>
<markdown>
### Question {{ loop.index }}
{{ item.question }}
</markdown>
<pl-code language="{{ language }}">
{{ item.code }}
</pl-code>
</pl-question-panel>
<br><hr><br>
{% endfor %}
{% endfor %}
"#;
