use std::{env, io, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fern::colors::{Color, ColoredLevelConfig};
use log::LevelFilter;
use toggl_accounting::config::API_TOKEN_ENV;
use toggl_accounting::Config;

mod cli;

use cli::client::TogglClient;
use cli::console::{ConsoleMarkdownList, ConsolePresenter};
use cli::report_command::{ReportArgs, ReportCommand};
use cli::tag_command::{TagArgs, TagCommand};
use cli::timer_command::{StartArgs, TimerCommand};

/// Toggl Trackのタイマーとレポートを扱うCLIアプリケーション。
///
/// # Examples
/// ```text
/// $ cargo run -- login
/// $ cargo run -- report --from 2024-01-01 --to 2024-01-31
/// $ cargo run -- start "Writing" --tag billable --offset 10
/// ```
#[derive(Debug, Parser)]
#[clap(version, about)]
struct Args {
    #[clap(short, long, global = true, help = "Print debug logs")]
    verbose: bool,

    #[clap(long, global = true, help = "Path to a JSON config file")]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    subcommand: SubCommands,
}

/// サブコマンドを表す列挙型。
#[derive(Debug, Subcommand)]
enum SubCommands {
    /// Check the API key and show cached reference data
    Login,
    /// List time entries of a date range
    Report(ReportArgs),
    /// Show the running time entry
    Current,
    /// Start a new time entry
    Start(StartArgs),
    /// Stop the running time entry
    Stop,
    /// Add or remove a tag on several time entries
    Tag(TagArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    setup_logger(args.verbose)?;

    let config = match &args.config {
        Some(path) => Config::load_from(path)?.with_api_token(env::var(API_TOKEN_ENV).ok()),
        None => Config::load()?,
    };
    let client = TogglClient::connect(&config)
        .await
        .context("Failed to new toggl client")?;

    let mut stdout = io::stdout();
    let mut presenter = ConsoleMarkdownList::new(&mut stdout);
    match args.subcommand {
        SubCommands::Login => {
            let session = client.session();
            if let Some(me) = session.profile() {
                println!("Logged in as {} ({})", me.fullname, me.email);
            }
            println!(
                "{} projects, {} tags",
                session.projects().len(),
                session.tags().len()
            );
        }
        SubCommands::Report(report) => {
            let time_entries = ReportCommand::new(&client).run(report).await?;
            presenter.show_time_entries(&time_entries)?;
        }
        SubCommands::Current => {
            let running = TimerCommand::new(&client, config.default_tags).current().await?;
            presenter.show_running_entry(running.as_ref())?;
        }
        SubCommands::Start(start) => {
            let running = TimerCommand::new(&client, config.default_tags).start(start).await?;
            presenter.show_running_entry(Some(&running))?;
        }
        SubCommands::Stop => {
            TimerCommand::new(&client, config.default_tags).stop().await?;
        }
        SubCommands::Tag(tag) => TagCommand::new(&client).run(tag).await?,
    }

    Ok(())
}

/// 標準エラー出力にログを出す。
fn setup_logger(verbose: bool) -> Result<()> {
    let colors = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue);
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{} {}] {}",
                colors.color(record.level()),
                record.target(),
                message
            ))
        })
        .level(level)
        .level_for("hyper", LevelFilter::Warn)
        .level_for("reqwest", LevelFilter::Warn)
        .chain(io::stderr())
        .apply()
        .context("Failed to set up logger")?;

    Ok(())
}
