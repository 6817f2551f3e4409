//! Integration tests for the checkmind binary.
//!
//! Tests the full protocol session flow by spawning the agent process,
//! sending commands via stdin, and verifying stdout responses.

use std::io::{BufRead, Write};
use std::process::{Command, Stdio};

use serde_json::{json, Value};

/// Sends a sequence of commands to the agent and collects stdout lines.
fn run_agent(commands: &[&str]) -> Vec<String> {
    let exe = env!("CARGO_BIN_EXE_checkmind");
    let mut child = Command::new(exe)
        .env("RUST_LOG", "off")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to start checkmind");

    let mut stdin = child.stdin.take().unwrap();
    let stdout = child.stdout.take().unwrap();
    let reader = std::io::BufReader::new(stdout);

    for cmd in commands {
        writeln!(stdin, "{}", cmd).unwrap();
    }
    stdin.flush().unwrap();
    drop(stdin);

    let lines: Vec<String> = reader.lines().map(|l| l.unwrap()).collect();
    let status = child.wait().expect("failed to wait on child");
    assert!(status.success());
    lines
}

/// Standard opening: red on rows 0-3, black on rows 6-9.
fn opening_position() -> String {
    let mut rows = vec![vec![Value::Null; 10]; 10];
    for (r, row) in rows.iter_mut().enumerate() {
        for (c, cell) in row.iter_mut().enumerate() {
            if (r + c) % 2 == 0 {
                continue;
            }
            if r < 4 {
                *cell = json!({"color": "red", "king": false});
            } else if r > 5 {
                *cell = json!({"color": "black", "king": false});
            }
        }
    }
    format!("position {}", serde_json::to_string(&rows).unwrap())
}

fn json_after(lines: &[String], prefix: &str) -> Value {
    let line = lines
        .iter()
        .find(|l| l.starts_with(prefix))
        .unwrap_or_else(|| panic!("no line starting with {:?} in {:?}", prefix, lines));
    serde_json::from_str(&line[prefix.len()..]).unwrap()
}

#[test]
fn isready_response() {
    let lines = run_agent(&["isready", "quit"]);
    assert_eq!(lines, vec!["readyok".to_string()]);
}

#[test]
fn unknown_commands_are_ignored() {
    let lines = run_agent(&["frobnicate", "", "isready", "quit"]);
    assert_eq!(lines, vec!["readyok".to_string()]);
}

#[test]
fn eof_without_quit_exits_cleanly() {
    let lines = run_agent(&["isready"]);
    assert_eq!(lines, vec!["readyok".to_string()]);
}

#[test]
fn go_without_model_returns_first_legal_move() {
    let position = opening_position();
    let lines = run_agent(&[
        &position,
        "go movenumber 1 moves 6,1->5,0 6,1->5,2 6,3->5,2",
        "quit",
    ]);
    assert_eq!(lines, vec!["bestmove 6,1->5,0".to_string()]);
}

#[test]
fn go_with_only_unencodable_moves_still_answers() {
    let position = opening_position();
    let lines = run_agent(&[&position, "go movenumber 1 moves e3-f4 bogus", "quit"]);
    assert_eq!(lines, vec!["bestmove e3-f4".to_string()]);
}

#[test]
fn go_without_moves_reports_none() {
    let lines = run_agent(&["go movenumber 1", "quit"]);
    assert_eq!(lines, vec!["bestmove none".to_string()]);
}

#[test]
fn due_move_reports_defense_before_bestmove() {
    let position = opening_position();
    let lines = run_agent(&[&position, "go movenumber 5 moves 6,1->5,0", "quit"]);
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("info defense "));
    assert_eq!(lines[1], "bestmove 6,1->5,0");

    let snapshot = json_after(&lines, "info defense ");
    assert_eq!(snapshot["move_number"], 5);
    assert_eq!(snapshot["piece_count"], 20);
    assert_eq!(snapshot["threatened_count"], 0);
    assert_eq!(snapshot["back_rank_strength"], 10);
    assert_eq!(snapshot["risk_level"], "low");
    assert_eq!(snapshot["trend"], "stable");
}

#[test]
fn eval_and_history_flow() {
    let position = opening_position();
    let lines = run_agent(&[
        "setoption name Side value red",
        &position,
        "eval movenumber 5",
        "eval movenumber 10",
        "history",
        "newgame",
        "history",
        "quit",
    ]);

    let defenses: Vec<&String> = lines.iter().filter(|l| l.starts_with("defense ")).collect();
    assert_eq!(defenses.len(), 2);
    let first = json_after(&lines, "defense ");
    assert_eq!(first["piece_count"], 20);
    assert_eq!(first["back_rank_strength"], 10);

    let summary = json_after(&lines, "history ");
    assert_eq!(summary["count"], 2);
    assert_eq!(summary["net_trend"], "stable");
    assert_eq!(summary["worst_risk"], "low");
    assert_eq!(lines.last().unwrap(), "history none");
}

#[test]
fn eval_without_position_reports_none() {
    let lines = run_agent(&["eval", "quit"]);
    assert_eq!(lines, vec!["defense none".to_string()]);
}

#[test]
fn load_without_configuration_fails_cleanly() {
    let lines = run_agent(&["load", "isready", "quit"]);
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("loadfailed "));
    assert_eq!(lines[1], "readyok");
}

#[test]
fn bad_position_keeps_previous_board() {
    let position = opening_position();
    let lines = run_agent(&[&position, "position [[1,2]]", "eval movenumber 1", "quit"]);
    let snapshot = json_after(&lines, "defense ");
    assert_eq!(snapshot["piece_count"], 20);
}
