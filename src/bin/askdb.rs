//! askdb CLI: one-shot questions or an interactive prompt.

use anyhow::Context;
use askdb::otel::{init_telemetry, LogFormat};
use askdb::present::{ConsoleReporter, OutputFormat, OutputFormatter};
use askdb::{build_pipeline, load_env_file, AskError, MySqlPipeline, Settings};
use clap::{Parser, Subcommand};
use colored::*;
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Request failed; the reason was already printed.
const EXIT_FAILED: u8 = 1;

/// Missing or invalid configuration.
const EXIT_CONFIG: u8 = 2;

#[derive(Parser)]
#[command(name = "askdb")]
#[command(version, about = "Ask a MySQL database questions in plain language", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Result format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Load environment variables from this file (default: ./.env if present)
    #[arg(long, global = true)]
    env_file: Option<String>,

    /// Model name (overrides ASKDB_MODEL)
    #[arg(long, global = true)]
    model: Option<String>,

    /// Local tunnel port, 0 for ephemeral (overrides ASKDB_LOCAL_PORT)
    #[arg(long, global = true)]
    local_port: Option<u16>,

    /// Example rows per table in the prompt (overrides ASKDB_SAMPLE_ROWS)
    #[arg(long, global = true)]
    sample_rows: Option<usize>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Only print failures and results
    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer a single question
    Ask {
        /// Natural language question
        #[arg(required = true, num_args = 1.., trailing_var_arg = true)]
        question: Vec<String>,
    },

    /// Read questions from stdin, one per line (default)
    Repl,
}

impl Cli {
    fn overrides(&self) -> HashMap<String, String> {
        let mut overrides = HashMap::new();
        if let Some(model) = &self.model {
            overrides.insert("ASKDB_MODEL".to_string(), model.clone());
        }
        if let Some(port) = self.local_port {
            overrides.insert("ASKDB_LOCAL_PORT".to_string(), port.to_string());
        }
        if let Some(rows) = self.sample_rows {
            overrides.insert("ASKDB_SAMPLE_ROWS".to_string(), rows.to_string());
        }
        overrides
    }

    fn reporter(&self) -> ConsoleReporter {
        if self.quiet {
            ConsoleReporter::quiet()
        } else {
            ConsoleReporter::new()
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "✗".red(), e);
            let config = e
                .downcast_ref::<AskError>()
                .map(AskError::is_config)
                .unwrap_or(false);
            ExitCode::from(if config { EXIT_CONFIG } else { EXIT_FAILED })
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let env_file = cli
        .env_file
        .as_deref()
        .map(|p| PathBuf::from(shellexpand::tilde(p).into_owned()));
    load_env_file(env_file.as_deref())?;

    let _telemetry = init_telemetry("askdb", LogFormat::from_env())?;

    let settings = Settings::from_env_with(&cli.overrides())?;
    let pipeline = Arc::new(build_pipeline(&settings)?);
    let formatter = OutputFormatter::new(cli.format);
    let reporter = cli.reporter();

    match &cli.command {
        Some(Commands::Ask { question }) => {
            let question = question.join(" ");
            Ok(ask_once(&pipeline, question, reporter, formatter).await)
        }
        Some(Commands::Repl) | None => {
            repl(&pipeline, reporter, formatter).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn ask_once(
    pipeline: &Arc<MySqlPipeline>,
    question: String,
    reporter: ConsoleReporter,
    formatter: OutputFormatter,
) -> ExitCode {
    // a panic ends only this question; the tunnel is released on drop
    let task = tokio::spawn({
        let pipeline = Arc::clone(pipeline);
        async move { pipeline.ask(&question, &reporter).await }
    });

    let answer = match task.await {
        Ok(Some(answer)) => answer,
        Ok(None) => return ExitCode::from(EXIT_FAILED),
        Err(e) => {
            tracing::error!(error = %e, "Question task aborted");
            eprintln!("{} {}", "✗".red(), format!("Error: unexpected failure: {}", e).red());
            return ExitCode::from(EXIT_FAILED);
        }
    };

    match formatter.render(&answer.rows) {
        Ok(output) => {
            print!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{} {}", "✗".red(), e);
            ExitCode::from(EXIT_FAILED)
        }
    }
}

async fn repl(
    pipeline: &Arc<MySqlPipeline>,
    reporter: ConsoleReporter,
    formatter: OutputFormatter,
) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        eprint!("{} ", ">".cyan());
        std::io::stderr().flush().context("cannot write prompt")?;

        let Some(line) = lines.next_line().await.context("cannot read stdin")? else {
            break;
        };

        let question = line.trim();
        if matches!(question, "exit" | "quit") {
            break;
        }

        ask_once(pipeline, question.to_string(), reporter, formatter).await;
    }

    Ok(())
}
