//! schedule-server: timetable conflict analysis from the command line.
//!
//! Reads events from a JSON export or a paged remote feed, keeps the analysed
//! issue set in SurrealDB and prints results as JSON on stdout.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{ArgGroup, Parser, Subcommand};
use tracing::info;

use api::dto::{IssueQuery, TaskStatus};
use api::{
    EventSource, IssueFilter, JsonFileEventSource, RemoteEventSource, ServiceConfig,
    init_schedule_service,
};

const POLL_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Parser, Debug)]
#[command(name = "schedule-server", version, about)]
#[command(group(ArgGroup::new("source").required(true).args(["events_file", "feed_url"])))]
struct Cli {
    /// JSON file with the timetable events.
    #[arg(long, env = "SCHEDULE_EVENTS_FILE")]
    events_file: Option<PathBuf>,

    /// Index URL of the remote timetable feed.
    #[arg(long, env = "SCHEDULE_FEED_URL")]
    feed_url: Option<String>,

    /// Only report issues for groups containing this text.
    #[arg(long, global = true)]
    group: Option<String>,

    /// Only report issues for teachers containing this text.
    #[arg(long, global = true)]
    teacher: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// List issues, refreshing them first when stale.
    List,
    /// Run a processing task and print its final status.
    Process,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ServiceConfig::from_env()?;
    let source: Arc<dyn EventSource> = match (cli.events_file, cli.feed_url) {
        (Some(path), _) => Arc::new(JsonFileEventSource::new(path)),
        (None, Some(url)) => {
            info!("Reading timetable feed from {}", url);
            Arc::new(RemoteEventSource::http(url))
        }
        (None, None) => return Err("either --events-file or --feed-url is required".into()),
    };
    let service = init_schedule_service(&config, source).await?;

    let filter: IssueFilter = IssueQuery {
        group: cli.group,
        teacher: cli.teacher,
    }
    .into();

    match cli.command.unwrap_or(Command::List) {
        Command::List => {
            let issues = service.list_issues(&filter).await?;
            info!("{} issues", issues.len());
            println!("{}", serde_json::to_string_pretty(&issues)?);
        }
        Command::Process => {
            let response = service.submit_processing(filter).await?;
            info!("Task {} {}", response.task_id, response.status);

            let status = loop {
                let status = service.processing_status(&response.task_id).await?;
                if matches!(status.status, TaskStatus::Success | TaskStatus::Failure) {
                    break status;
                }
                tokio::time::sleep(POLL_INTERVAL).await;
            };
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
    }

    service.shutdown();
    Ok(())
}
