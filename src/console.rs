//! Operator-facing console output.
//!
//! Progress is yellow, questions are blue, success is green, failures are
//! red. Everything here is presentation only; the same events also go to
//! `tracing` for structured logs.

use std::io::Write;

use colored::Colorize;

use crate::errors::ScoutResult;

pub fn info(text: &str) {
    println!("{}", text.yellow());
}

pub fn success(text: &str) {
    println!("{}", text.green());
}

pub fn error(text: &str) {
    println!("{}", text.red());
}

/// Print a blue question and read one trimmed line from stdin.
pub fn ask(question: &str) -> ScoutResult<String> {
    println!("{}", question.blue());
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}
