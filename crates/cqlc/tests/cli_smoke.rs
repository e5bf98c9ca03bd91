use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;

fn cqlc(workspace: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("cqlc").expect("binary exists");
    cmd.arg("--workspace").arg(workspace);
    cmd
}

#[test]
fn help_displays_usage() {
    Command::cargo_bin("cqlc")
        .expect("binary exists")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn add_answer_and_list() {
    let workspace = tempfile::tempdir().expect("tempdir");
    fs::write(workspace.path().join("a.py"), "x = 1\ny = x + 1\n").expect("source file");

    cqlc(workspace.path())
        .args(["add", "--file", "a.py", "--start-line", "1", "--end-line", "1"])
        .args(["--end-char", "9", "--question", "  What is y?  ", "--id", "q1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Question saved: q1"));

    cqlc(workspace.path())
        .args(["list", "--unanswered"])
        .assert()
        .success()
        .stdout(predicate::str::contains("q1  [open]  a.py:1:0-1:9  What is y?"));

    cqlc(workspace.path())
        .args(["answer", "q1", "2"])
        .assert()
        .success();

    cqlc(workspace.path())
        .args(["list", "--unanswered"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    cqlc(workspace.path())
        .args(["decorations", "a.py"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[answered]"))
        .stdout(predicate::str::contains("**Answer:** 2"));

    let stored = fs::read_to_string(workspace.path().join(".vscode/quiz-questions.json"))
        .expect("store written");
    assert!(stored.contains("\"snippet\": \"y = x + 1\""));
}

#[test]
fn rejects_inverted_range() {
    let workspace = tempfile::tempdir().expect("tempdir");
    cqlc(workspace.path())
        .args(["add", "--file", "a.py", "--start-line", "5", "--end-line", "2"])
        .args(["--question", "Why?", "--snippet", "..."])
        .assert()
        .failure()
        .stderr(predicate::str::contains("after end"));
}

#[test]
fn unknown_id_fails() {
    let workspace = tempfile::tempdir().expect("tempdir");
    cqlc(workspace.path())
        .args(["delete", "missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no question with id 'missing'"));
}

#[test]
fn init_config_then_generate_reports_missing_store() {
    let workspace = tempfile::tempdir().expect("tempdir");
    cqlc(workspace.path())
        .arg("init-config")
        .assert()
        .success()
        .stdout(predicate::str::contains("cqlc.config.json"));

    cqlc(workspace.path())
        .arg("init-config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    cqlc(workspace.path())
        .arg("generate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no questions"));
}

#[test]
fn rejects_empty_selection() {
    let workspace = tempfile::tempdir().expect("tempdir");
    cqlc(workspace.path())
        .args(["add", "--file", "a.py", "--start-line", "2", "--end-line", "2"])
        .args(["--question", "Why?", "--snippet", ""])
        .assert()
        .failure()
        .stderr(predicate::str::contains("select the code"));
    assert!(!workspace.path().join(".vscode").exists());
}

#[test]
fn list_numbers_and_filters_by_student_and_text() {
    let workspace = tempfile::tempdir().expect("tempdir");
    for (id, file, question) in [
        ("z1", "zoe/a.py", "Why a loop?"),
        ("a1", "adam/a.py", "What does it print?"),
        ("a2", "adam/b.py", "Which LOOP ends first?"),
    ] {
        cqlc(workspace.path())
            .args(["add", "--file", file, "--start-line", "0", "--end-line", "1"])
            .args(["--question", question, "--snippet", "x", "--id", id])
            .assert()
            .success();
    }

    cqlc(workspace.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("2A    z1  [open]"))
        .stdout(predicate::str::contains("1A    a1  [open]"))
        .stdout(predicate::str::contains("1B    a2  [open]"));

    cqlc(workspace.path())
        .args(["list", "--student", "adam", "--search", "loop"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1B    a2"))
        .stdout(predicate::str::contains("a1").not())
        .stdout(predicate::str::contains("z1").not());
}
