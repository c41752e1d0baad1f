//! The interactive operator loop.

use gridops_ai::{available_models, AiError, Session};
use gridops_common::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use crate::cli::{Command, HELP};

pub async fn run(session: &mut Session) -> Result<()> {
    let tools: Vec<&str> = session.tools().iter().map(|t| t.name.as_str()).collect();
    println!("\nConnected to tool server with tools: {}", tools.join(", "));
    println!("Grid Operations client started (model: {}).", session.model());
    println!("Type a query, 'model:<provider>:<model>' to switch models, 'help' for commands, or 'quit' to exit.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print_prompt();

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            break;
        };

        match Command::parse(&line) {
            Command::Empty => continue,
            Command::Quit => break,
            Command::Help => println!("{HELP}"),
            Command::Models => println!("{}", describe_models()),
            Command::Context => match session.context_json() {
                Ok(json) => println!("\nCurrent Operational Context:\n{json}"),
                Err(e) => error!("{e}"),
            },
            Command::ChangeModel(text) => match session.change_model(&text) {
                Ok(model) => println!("Model changed to: {model}"),
                Err(e) => println!("{e}. Type 'models' for the supported list."),
            },
            Command::Query(query) => {
                let answer = run_query(session, &query).await;
                match answer {
                    Ok(text) => println!("\n{text}"),
                    Err(AiError::Cancelled) => println!("\nQuery cancelled."),
                    Err(e) => {
                        warn!(error = %e, "query failed");
                        println!("\nError: {e}");
                    }
                }
            }
        }
    }

    Ok(())
}

/// Run one query; Ctrl-C cancels it and waits for the rollback.
async fn run_query(session: &mut Session, query: &str) -> std::result::Result<String, AiError> {
    let cancel = CancellationToken::new();
    let turn = session.process_query(query, &cancel);
    tokio::pin!(turn);

    tokio::select! {
        result = &mut turn => result,
        _ = tokio::signal::ctrl_c() => {
            cancel.cancel();
            turn.await
        }
    }
}

fn print_prompt() {
    use std::io::Write;
    print!("\nQuery: ");
    let _ = std::io::stdout().flush();
}

pub fn describe_models() -> String {
    let mut out = String::from("Supported models:");
    for (provider, models) in available_models() {
        for model in models {
            out.push_str(&format!("\n  {provider}:{model}"));
        }
    }
    out
}
