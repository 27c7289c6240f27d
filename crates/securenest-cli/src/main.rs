mod render;
mod shell;

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use securenest_contracts::events::EventWriter;
use securenest_contracts::runs::bom::write_bom;
use securenest_engine::{
    AnalysisClient, AnalysisConfig, AppState, DryrunService, ImageSource, Session,
};

#[derive(Debug, Parser)]
#[command(
    name = "securenest",
    version,
    about = "Home security planning from photos of your property"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Analyze the given photos once and print the plan.
    Analyze(AnalyzeArgs),
    /// Interactive session: add photos, analyze, export.
    Session(SessionArgs),
}

#[derive(Debug, Parser)]
struct AnalyzeArgs {
    #[arg(required = true)]
    images: Vec<PathBuf>,
    #[arg(long)]
    model: Option<String>,
    #[arg(long)]
    events: Option<PathBuf>,
    #[arg(long)]
    json: bool,
    #[arg(long)]
    export_bom: Option<PathBuf>,
    #[arg(long)]
    dryrun: bool,
}

#[derive(Debug, Parser)]
struct SessionArgs {
    #[arg(long)]
    model: Option<String>,
    #[arg(long)]
    events: Option<PathBuf>,
    #[arg(long)]
    dryrun: bool,
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("securenest error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter())
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Analyze(args) => run_analyze(args),
        Command::Session(args) => {
            let mut client = build_client(args.model, args.dryrun);
            let mut session = open_session(args.events.as_deref());
            shell::run_shell(&mut session, &mut client)?;
            Ok(0)
        }
    }
}

fn log_filter() -> tracing_subscriber::EnvFilter {
    let level = if let Ok(v) = std::env::var("RUST_LOG") {
        v
    } else if let Ok(v) = std::env::var("SECURENEST_LOG_LEVEL") {
        match v.as_str() {
            "silent" => "off".to_string(),
            other => other.to_string(),
        }
    } else {
        "warn".to_string()
    };

    tracing_subscriber::EnvFilter::try_new(level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
}

fn build_client(model: Option<String>, dryrun: bool) -> AnalysisClient {
    let mut config = AnalysisConfig::from_env().with_model(model);
    if dryrun {
        if config.api_key.is_none() {
            config.api_key = Some("dryrun".to_string());
        }
        return AnalysisClient::new(config, DryrunService);
    }
    AnalysisClient::gemini(config)
}

fn open_session(events: Option<&Path>) -> Session {
    let session = Session::new();
    let Some(path) = events else {
        return session;
    };
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default();
    let session_id = format!("session-{millis}");
    tracing::debug!(path = %path.display(), session_id, "writing session events");
    session.with_events(EventWriter::new(path, session_id))
}

fn run_analyze(args: AnalyzeArgs) -> Result<i32> {
    let client = build_client(args.model, args.dryrun);
    let mut session = open_session(args.events.as_deref());

    let sources = args
        .images
        .iter()
        .map(|path| ImageSource::from_path(path))
        .collect::<Result<Vec<_>>>()?;
    session.add_images(sources)?;

    if !args.json {
        eprintln!(
            "Analyzing {} image(s) with {} ({})...",
            session.images().len(),
            client.config().model,
            client.service_name()
        );
    }
    session.analyze(&client);

    match session.state() {
        AppState::Results(plan) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(plan)?);
            } else {
                print!("{}", render::render_plan(plan));
            }
            if let Some(path) = args.export_bom.as_deref() {
                write_bom(path, plan, Some(&shell::bom_metadata(&client)))
                    .with_context(|| format!("failed exporting BOM to {}", path.display()))?;
                eprintln!("Exported bill of materials to {}", path.display());
            }
            Ok(0)
        }
        AppState::Error(message) => {
            eprintln!("Analysis failed: {message}");
            Ok(1)
        }
        other => {
            eprintln!("Analysis did not complete (state: {})", other.tag());
            Ok(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Command};

    #[test]
    fn analyze_flags_parse() {
        let cli = Cli::parse_from([
            "securenest",
            "analyze",
            "front.jpg",
            "back.png",
            "--model",
            "gemini-2.5-pro",
            "--json",
            "--export-bom",
            "out/bom.json",
            "--dryrun",
        ]);
        let Command::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        assert_eq!(args.images.len(), 2);
        assert_eq!(args.model.as_deref(), Some("gemini-2.5-pro"));
        assert!(args.json);
        assert!(args.dryrun);
        assert_eq!(
            args.export_bom.as_deref(),
            Some(std::path::Path::new("out/bom.json"))
        );
    }

    #[test]
    fn analyze_requires_an_image() {
        assert!(Cli::try_parse_from(["securenest", "analyze"]).is_err());
    }

    #[test]
    fn session_flags_parse() {
        let cli = Cli::parse_from(["securenest", "session", "--events", "events.jsonl"]);
        let Command::Session(args) = cli.command else {
            panic!("expected session");
        };
        assert_eq!(
            args.events.as_deref(),
            Some(std::path::Path::new("events.jsonl"))
        );
        assert!(!args.dryrun);
        assert!(args.model.is_none());
    }
}
