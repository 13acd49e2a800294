use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rjb_core::{Filter, FilterKey, Job, JobId, Theme};
use rjb_engine::{
    BoardConfig, Engine, ErrorNotice, RenderMode, RenderUpdate, SearchEvent, SearchOutcome,
    SearchSource, SuccessNotice, UiCollaborator,
};
use rjb_storage::{FileKeyValueStore, Preferences};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

#[derive(Debug, Parser)]
#[command(name = "rjb-cli")]
#[command(about = "Remote job board in the terminal")]
struct Cli {
    /// YAML config file (defaults to ./rjb.yaml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Serve jobs from a fixtures directory instead of the live API
    #[arg(long, global = true)]
    fixtures: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Interactive filtering and search
    Browse,
    /// List stored seen jobs
    Seen,
    /// List stored favorite filters
    Favorites,
    /// Remove one stored preference key, or all of them
    Clear { key: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum BrowseCommand {
    Chip(String),
    Filter(FilterKey, String),
    Search(String),
    Seen(JobId),
    Favorite(FilterKey, String),
    Count(String),
    Theme,
    Jobs,
    Filters,
    Help,
    Quit,
}

const HELP: &str = "commands: chip <name> | filter <key> <value> | search <term> | seen <id> | \
fav <key> <value> | count <n> | theme | jobs | filters | help | quit";

fn parse_command(line: &str) -> Result<BrowseCommand, String> {
    let line = line.trim();
    let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();
    let key_value = |rest: &str| -> Result<(FilterKey, String), String> {
        let (key, value) = rest
            .split_once(char::is_whitespace)
            .ok_or_else(|| "expected <key> <value>".to_string())?;
        let key = key.parse::<FilterKey>().map_err(|err| err.to_string())?;
        Ok((key, value.trim().to_string()))
    };
    let needs_arg = |what: &str| -> Result<String, String> {
        if rest.is_empty() {
            Err(format!("expected {what}"))
        } else {
            Ok(rest.to_string())
        }
    };

    match verb.to_ascii_lowercase().as_str() {
        "chip" => needs_arg("<name>").map(BrowseCommand::Chip),
        "filter" => key_value(rest).map(|(k, v)| BrowseCommand::Filter(k, v)),
        "search" => needs_arg("<term>").map(BrowseCommand::Search),
        "seen" => rest
            .parse()
            .map(BrowseCommand::Seen)
            .map_err(|_| format!("`{rest}` is not a job id")),
        "fav" => key_value(rest).map(|(k, v)| BrowseCommand::Favorite(k, v)),
        "count" => needs_arg("<n>").map(BrowseCommand::Count),
        "theme" => Ok(BrowseCommand::Theme),
        "jobs" => Ok(BrowseCommand::Jobs),
        "filters" => Ok(BrowseCommand::Filters),
        "help" | "?" => Ok(BrowseCommand::Help),
        "quit" | "exit" => Ok(BrowseCommand::Quit),
        other => Err(format!("unknown command `{other}`")),
    }
}

fn format_job(job: &Job) -> String {
    format!(
        "{} [{}] {} | {} | {} | {} | {}",
        if job.is_seen { "✓" } else { " " },
        job.id_job,
        job.title,
        job.company.as_deref().unwrap_or("-"),
        job.location.as_deref().unwrap_or("-"),
        job.salary.as_deref().unwrap_or("-"),
        job.formatted_posting_date().unwrap_or_default(),
    )
}

fn format_filter(filter: &Filter) -> String {
    format!("#{} {}={}", filter.id_filter, filter.key, filter.value)
}

/// Prints render updates and notices to stdout.
struct TerminalUi;

impl UiCollaborator for TerminalUi {
    fn update_ui(&self, update: &RenderUpdate) {
        let header = match update.mode {
            RenderMode::Replace => "showing",
            RenderMode::Adding => "added",
            RenderMode::Display => "remaining",
        };
        println!("-- {header} {} job(s)", update.jobs.len());
        for job in &update.jobs {
            println!("{}", format_job(job));
        }
    }

    fn display_error(&self, notice: &ErrorNotice) {
        let prefix = if notice.blocking { "error" } else { "note" };
        println!("!! {prefix} ({}): {}", notice.kind, notice.message);
    }

    fn display_success(&self, notice: &SuccessNotice) {
        println!("** {}", notice.message);
    }

    fn favorite_filters_changed(&self, filters: &[Filter]) {
        println!("-- {} favorite filter(s)", filters.len());
    }

    fn theme_changed(&self, theme: Theme) {
        println!("-- theme: {}", theme.as_str());
    }
}

fn init_tracing() {
    Registry::default()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rjb=info,warn")))
        .init();
}

fn load_config(cli: &Cli) -> Result<BoardConfig> {
    let mut config = BoardConfig::load(cli.config.as_deref())?;
    if let Some(dir) = &cli.fixtures {
        config.fixtures_dir = Some(dir.clone());
    }
    Ok(config)
}

async fn browse(config: &BoardConfig) -> Result<()> {
    let engine = Engine::from_config(config, Arc::new(TerminalUi))?;
    if engine.initialize().await.is_err() {
        anyhow::bail!("board failed to start");
    }
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("reading stdin")? {
        if line.trim().is_empty() {
            continue;
        }
        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(msg) => {
                println!("{msg}");
                continue;
            }
        };
        // Failures were already shown through the UI; keep the session alive.
        match command {
            BrowseCommand::Chip(name) => {
                let event = SearchEvent::new(SearchSource::Chip, FilterKey::Category, name);
                let _ = engine.handle_search_event(event).await;
            }
            BrowseCommand::Filter(key, value) => {
                let event = SearchEvent::new(SearchSource::Filter, key, value);
                let _ = engine.handle_search_event(event).await;
            }
            BrowseCommand::Search(term) => {
                if let Ok(SearchOutcome::Discarded { .. }) = engine.search(&term).await {
                    println!("-- result superseded");
                }
            }
            BrowseCommand::Seen(id) => match engine.toggle_seen(id).await {
                Ok(outcome) => println!("-- job {id}: {outcome:?}"),
                Err(err) => println!("{err}"),
            },
            BrowseCommand::Favorite(key, value) => {
                if let Ok(outcome) = engine.toggle_favorite(None, key, &value).await {
                    println!("-- favorite {key}={value}: {outcome:?}");
                }
            }
            BrowseCommand::Count(n) => {
                let count = engine.set_job_count(&n).await;
                println!("-- job count: {}", count.get());
            }
            BrowseCommand::Theme => {
                let _ = engine.toggle_theme().await;
            }
            BrowseCommand::Jobs => {
                for job in engine.visible_jobs().await {
                    println!("{}", format_job(&job));
                }
            }
            BrowseCommand::Filters => {
                for filter in engine.active_filters().await {
                    println!("active   {}", format_filter(&filter));
                }
                for filter in engine.favorite_filters().await {
                    println!("favorite {}", format_filter(&filter));
                }
            }
            BrowseCommand::Help => println!("{HELP}"),
            BrowseCommand::Quit => break,
        }
    }
    Ok(())
}

fn preferences(config: &BoardConfig) -> Preferences {
    Preferences::new(Arc::new(FileKeyValueStore::new(config.storage_dir.clone())))
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match cli.command.unwrap_or(Commands::Browse) {
        Commands::Browse => browse(&config).await?,
        Commands::Seen => {
            for job in preferences(&config).load_seen_jobs().await? {
                println!("{}", format_job(&job));
            }
        }
        Commands::Favorites => {
            for filter in preferences(&config).load_favorite_filters().await? {
                println!("{}", format_filter(&filter));
            }
        }
        Commands::Clear { key } => {
            preferences(&config).clear(key.as_deref()).await?;
            println!("cleared {}", key.as_deref().unwrap_or("all preferences"));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_browse_commands() {
        assert_eq!(
            parse_command("chip DevOps / Sysadmin"),
            Ok(BrowseCommand::Chip("DevOps / Sysadmin".into()))
        );
        assert_eq!(
            parse_command("filter location  USA"),
            Ok(BrowseCommand::Filter(FilterKey::CandidateRequiredLocation, "USA".into()))
        );
        assert_eq!(parse_command("seen 1004"), Ok(BrowseCommand::Seen(1004)));
        assert_eq!(parse_command("QUIT"), Ok(BrowseCommand::Quit));
    }

    #[test]
    fn rejects_malformed_commands() {
        assert!(parse_command("filter colour red").is_err());
        assert!(parse_command("filter tags").is_err());
        assert!(parse_command("seen abc").is_err());
        assert!(parse_command("search").is_err());
        assert!(parse_command("dance").is_err());
    }

    #[test]
    fn job_lines_show_seen_marker_and_date() {
        let job = Job {
            id_job: 7,
            title: "QA Lead".into(),
            is_seen: true,
            posting_date: Some("2024-03-07T13:00:00".into()),
            ..Job::default()
        };
        let line = format_job(&job);
        assert!(line.starts_with("✓ [7] QA Lead"));
        assert!(line.ends_with("07 March 2024"));
    }

    #[test]
    fn cli_defaults_to_browse() {
        let cli = Cli::parse_from(["rjb-cli", "--fixtures", "fixtures/remotive"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.fixtures, Some(PathBuf::from("fixtures/remotive")));
        let cli = Cli::parse_from(["rjb-cli", "clear", "theme"]);
        assert!(matches!(cli.command, Some(Commands::Clear { key: Some(ref k) }) if k == "theme"));
    }
}
