//! Command-line surface over the question store and quiz generator.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use time::OffsetDateTime;

use crate::app::decorations::decorations_for;
use crate::app::generate::Generator;
use crate::app::listing::{ListFilter, StatusFilter, question_numbers};
use crate::app::store::QuestionStore;
use crate::domain::model::{QuestionRecord, make_id, now_millis};
use crate::domain::range::TextRange;
use crate::infra::config::{QuizConfig, config_path};

#[derive(Debug, Parser)]
#[command(name = "cqlc", author, version, about = "Code-review quiz questions anchored to source ranges", long_about = None)]
pub struct Cli {
    /// Workspace root holding the question store and quiz config.
    #[arg(long, global = true, default_value = ".")]
    pub workspace: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Ask a question about a range of a workspace file
    Add {
        /// Workspace-relative path of the file
        #[arg(long)]
        file: String,
        #[arg(long, allow_negative_numbers = true)]
        start_line: i64,
        #[arg(long, allow_negative_numbers = true, default_value_t = 0)]
        start_char: i64,
        #[arg(long, allow_negative_numbers = true)]
        end_line: i64,
        #[arg(long, allow_negative_numbers = true, default_value_t = 0)]
        end_char: i64,
        #[arg(long)]
        question: String,
        /// Captured source text; read from the file when omitted
        #[arg(long)]
        snippet: Option<String>,
        /// Explicit id instead of a generated one
        #[arg(long)]
        id: Option<String>,
    },
    /// Replace the text of a question
    Edit { id: String, text: String },
    /// Answer a question, or replace its existing answer
    Answer { id: String, text: String },
    /// Delete a question
    Delete { id: String },
    /// Exclude a question from quiz generation
    Exclude {
        id: String,
        /// Include the question again
        #[arg(long)]
        undo: bool,
    },
    /// List stored questions
    List {
        #[arg(long, conflicts_with = "unanswered")]
        answered: bool,
        #[arg(long)]
        unanswered: bool,
        /// Only questions about this student's folder
        #[arg(long)]
        student: Option<String>,
        /// Case-insensitive text to look for in question, answer and file path
        #[arg(long)]
        search: Option<String>,
        /// Print the records as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the decorations for a workspace file
    Decorations {
        file: String,
        #[arg(long)]
        json: bool,
    },
    /// Write a starter cqlc.config.json
    InitConfig {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },
    /// Generate PrairieLearn questions and assessments
    Generate,
    /// Print shell completions
    Completions { shell: Shell },
}

/// Execute a parsed command line.
pub fn run(cli: Cli) -> Result<()> {
    let root = cli.workspace;
    let mut store = QuestionStore::new(&root);

    match cli.command {
        Command::Add {
            file,
            start_line,
            start_char,
            end_line,
            end_char,
            question,
            snippet,
            id,
        } => {
            let range = TextRange::from_coords(start_line, start_char, end_line, end_char)?;
            if range.is_empty() {
                bail!("select the code you want to ask about: the range {range} is empty");
            }
            let snippet = match snippet {
                Some(snippet) => snippet,
                None => capture_snippet(&root, &file, range)?,
            };
            let now = now_millis();
            let id = id.unwrap_or_else(|| make_id(now));
            let record = QuestionRecord::new(id, file, range, snippet, question.trim(), now);
            let saved = store.add_question(record)?;
            println!("Question saved: {}", saved.id);
        }
        Command::Edit { id, text } => {
            store.edit_question(&id, text.trim())?;
            println!("Question updated.");
        }
        Command::Answer { id, text } => {
            store.answer_question(&id, text.trim(), now_millis())?;
            println!("Answer saved.");
        }
        Command::Delete { id } => {
            store.delete_question(&id)?;
            println!("Question deleted.");
        }
        Command::Exclude { id, undo } => {
            store.set_excluded(&id, !undo)?;
            if undo {
                println!("Question included.");
            } else {
                println!("Question excluded.");
            }
        }
        Command::List {
            answered,
            unanswered,
            student,
            search,
            json,
        } => {
            let records = store.load()?;
            let status = if answered {
                StatusFilter::Answered
            } else if unanswered {
                StatusFilter::Unanswered
            } else {
                StatusFilter::All
            };
            let filter = ListFilter {
                status,
                student,
                search,
            };
            let shown = filter.apply(records);
            if json {
                println!("{}", serde_json::to_string_pretty(&shown)?);
            } else {
                let numbers = question_numbers(records);
                for record in shown {
                    let number = numbers.get(record.id.as_str()).map_or("", String::as_str);
                    println!("{number:<5} {}", summary_line(record));
                }
            }
        }
        Command::Decorations { file, json } => {
            let decorations = decorations_for(store.load()?, &file);
            if json {
                println!("{}", serde_json::to_string_pretty(&decorations)?);
            } else {
                for decoration in decorations {
                    let state = if decoration.answered { "answered" } else { "open" };
                    println!("{} {} [{state}]", decoration.id, decoration.range);
                    println!("{}", decoration.hover);
                }
            }
        }
        Command::InitConfig { force } => {
            let path = QuizConfig::write_template(&root, OffsetDateTime::now_utc(), force)?;
            println!("Created {}", path.display());
        }
        Command::Generate => {
            let path = config_path(&root);
            let config = QuizConfig::load(&path)
                .with_context(|| format!("failed to load quiz config from {}", path.display()))?;
            let records = store.load()?;
            let report = Generator::new()?.generate(&config, records)?;
            if report.excluded > 0 {
                println!("Excluded {} question(s) from generation.", report.excluded);
            }
            println!(
                "Generated {} question(s) for {} student(s), {} file(s) written.",
                report.questions,
                report.students.len(),
                report.files.len()
            );
        }
        Command::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "cqlc", &mut io::stdout());
        }
    }

    Ok(())
}

fn capture_snippet(root: &Path, file: &str, range: TextRange) -> Result<String> {
    let path = root.join(file);
    let contents = fs::read_to_string(&path)
        .with_context(|| format!("failed to read {} to capture the snippet", path.display()))?;
    Ok(range.extract(&contents))
}

fn summary_line(record: &QuestionRecord) -> String {
    let mut state = String::from(if record.is_answered() {
        "answered"
    } else {
        "open"
    });
    if record.excluded {
        state.push_str(", excluded");
    }
    format!(
        "{}  [{state}]  {}:{}  {}",
        record.id, record.file_path, record.range, record.question
    )
}
