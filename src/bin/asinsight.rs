#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use asinsight::{Assistant, Language, Outcome, QueryExecutor, TimeWindow};

#[derive(Parser)]
#[command(name = "asinsight", version, about = "Ask the sales & traffic data a question")]
struct Cli {
    /// The question, in plain language
    question: String,

    /// Reporting window in days (7, 14, 30, 60 or 90)
    #[arg(long, default_value_t = 30)]
    days: i64,

    /// Response language tag (en or ru)
    #[arg(long, default_value = "en")]
    lang: String,

    /// Path to the analytical SQLite database
    #[arg(long, env = "ASSISTANT_DB", default_value = "sales_traffic.sqlite")]
    db: PathBuf,

    /// Print the outcome as JSON instead of text
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();

    let Some(window) = TimeWindow::from_days(cli.days) else {
        eprintln!("unsupported window: {} days (use 7, 14, 30, 60 or 90)", cli.days);
        return ExitCode::FAILURE;
    };
    let Some(language) = Language::from_tag(&cli.lang) else {
        eprintln!("unsupported language: {} (use en or ru)", cli.lang);
        return ExitCode::FAILURE;
    };

    let assistant = match Assistant::from_env(QueryExecutor::new(&cli.db)) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let outcome = assistant.answer(&cli.question, window, language).await;

    if cli.json {
        match serde_json::to_string_pretty(&outcome) {
            Ok(s) => println!("{s}"),
            Err(e) => {
                eprintln!("failed to encode outcome: {e}");
                return ExitCode::FAILURE;
            }
        }
        return if outcome.is_answered() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        };
    }

    match outcome {
        Outcome::Answered {
            explanation,
            model,
            sql,
            row_count,
        } => {
            println!("{explanation}");
            println!();
            println!("-- {sql}");
            match model {
                Some(model) => println!("-- {row_count} rows, explained by {model}"),
                None => println!("-- {row_count} rows"),
            }
            ExitCode::SUCCESS
        }
        Outcome::Failed {
            stage,
            reason,
            sql,
            row_count,
        } => {
            eprintln!("{stage} failed: {reason}");
            if let Some(sql) = sql {
                eprintln!("-- {sql}");
            }
            if let Some(rows) = row_count {
                eprintln!("-- {rows} rows were returned before the failure");
            }
            ExitCode::FAILURE
        }
    }
}
