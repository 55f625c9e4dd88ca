//! Question answering commands.

use clap::Args;
use coursemate_core::{config::AppConfig, AppResult};
use coursemate_rag::{QueryOutcome, RagSystem};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Ask one question about the indexed courses
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: String,

    /// Continue this session id; history persists in the workspace
    #[arg(short, long)]
    pub session: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");

        let system = RagSystem::from_config(config).await?;
        let outcome = system
            .run_query(&self.question, self.session.as_deref())
            .await?;

        if self.json {
            let output = serde_json::json!({
                "answer": outcome.answer,
                "sources": outcome.citations,
                "sessionId": self.session,
                "provider": config.provider,
                "model": config.model,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            print_outcome(&outcome);
        }

        Ok(())
    }
}

/// Interactive session reading questions from stdin
#[derive(Args, Debug)]
pub struct ChatCommand {}

impl ChatCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing chat command");

        let system = RagSystem::from_config(config).await?;
        let session = system.sessions().create_session().await?;
        tracing::debug!("Chat session: {}", session);

        eprintln!("Ask about your courses. Type 'exit' to quit.");
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            print!("> ");
            std::io::stdout().flush()?;

            let Some(line) = lines.next_line().await? else {
                println!();
                break;
            };
            let question = line.trim();
            if question.is_empty() {
                continue;
            }
            if matches!(question, "exit" | "quit") {
                break;
            }

            // A failed query ends that turn only
            match system.run_query(question, Some(&session)).await {
                Ok(outcome) => print_outcome(&outcome),
                Err(e) => {
                    tracing::error!("Query failed: {}", e);
                    eprintln!("Error: {}", e);
                }
            }
        }

        system.sessions().clear_session(&session).await?;
        Ok(())
    }
}

fn print_outcome(outcome: &QueryOutcome) {
    println!("{}", outcome.answer);

    if !outcome.citations.is_empty() {
        println!();
        println!("Sources:");
        for citation in &outcome.citations {
            println!("- {}", citation);
        }
    }
}
