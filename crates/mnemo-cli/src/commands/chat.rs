use std::io::Write;
use std::time::Instant;

use anyhow::Result;
use colored::Colorize;
use mnemo_ai::{ConversationOrchestrator, TurnReport};
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::cli::OutputFormat;
use crate::output::print_json;

const EXIT_COMMAND: &str = "exit";

fn print_answer(report: &TurnReport, elapsed_secs: f64) {
    println!(
        "{} {}",
        format!("Assistant ({elapsed_secs:.2}s):").green().bold(),
        report.answer
    );
}

/// Interactive chat until `exit` or end of input.
pub async fn run(orchestrator: ConversationOrchestrator) -> Result<()> {
    println!(
        "{}",
        "Mnemo is ready. Type 'exit' to quit.".dimmed()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{} ", "You:".cyan().bold());
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if message.eq_ignore_ascii_case(EXIT_COMMAND) {
            break;
        }

        let started = Instant::now();
        let report = orchestrator.chat_detailed(message).await;
        print_answer(&report, started.elapsed().as_secs_f64());
    }

    orchestrator.close_session(orchestrator.default_session_id());
    Ok(())
}

/// One turn, then exit.
pub async fn ask(orchestrator: ConversationOrchestrator, message: &str, format: OutputFormat) -> Result<()> {
    let started = Instant::now();
    let report = orchestrator.chat_detailed(message).await;
    let elapsed = started.elapsed().as_secs_f64();
    orchestrator.close_session(&report.session_id);

    if format.is_json() {
        return print_json(&json!({
            "session_id": report.session_id,
            "answer": report.answer,
            "path": format!("{:?}", report.path),
            "tool_calls": report.tool_names(),
            "summary": report.summary.to_string(),
            "compaction": report.compaction.to_string(),
            "indexing": report.indexing.to_string(),
            "elapsed_secs": elapsed,
        }));
    }

    print_answer(&report, elapsed);
    Ok(())
}
