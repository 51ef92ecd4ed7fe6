use anyhow::{Context, Result};
use log::info;
use toggl_accounting::{RunningEntry, StartEntry};

use crate::cli::repository::TogglRepository;

/// `start`サブコマンドの引数。
#[derive(Debug, Default, clap::Args)]
pub struct StartArgs {
    #[clap(help = "Description of the new time entry")]
    description: String,

    #[clap(long = "tag", help = "Tag name, may be repeated. Defaults to default_tags")]
    tags: Vec<String>,

    #[clap(short = 'p', long = "project", help = "Project id")]
    project: Option<i64>,

    #[clap(
        short = 'o',
        long = "offset",
        help = "Start this many minutes ago instead of now"
    )]
    offset: Option<i64>,
}

/// 実行中のタイマーを操作する。
pub struct TimerCommand<'a, T: TogglRepository> {
    toggl_client: &'a T,
    default_tags: Vec<String>,
}

impl<'a, T: TogglRepository> TimerCommand<'a, T> {
    /// 新しい`TimerCommand`を返す。
    ///
    /// # Arguments
    /// * `toggl_client` - Toggl APIと通信するためのリポジトリ
    /// * `default_tags` - タグが指定されなかった場合に付けるタグ
    pub fn new(toggl_client: &'a T, default_tags: Vec<String>) -> Self {
        Self {
            toggl_client,
            default_tags,
        }
    }

    /// `current`サブコマンドの処理を行う。
    pub async fn current(&self) -> Result<Option<RunningEntry>> {
        self.toggl_client
            .running_entry()
            .await
            .context("Failed to retrieve the running time entry")
    }

    /// `start`サブコマンドの処理を行う。
    pub async fn start(&self, start: StartArgs) -> Result<RunningEntry> {
        let tags = if start.tags.is_empty() {
            self.default_tags.clone()
        } else {
            start.tags
        };
        let entry = StartEntry {
            description: start.description,
            tags,
            project_id: start.project,
            start_offset_minutes: start.offset,
        };

        let running = self
            .toggl_client
            .start_entry(&entry)
            .await
            .context("Failed to start time entry")?;
        info!("Time entry {} started.", running.id);

        Ok(running)
    }

    /// `stop`サブコマンドの処理を行う。実行中のものがなければ`None`を返す。
    pub async fn stop(&self) -> Result<Option<RunningEntry>> {
        let stopped = self
            .toggl_client
            .stop_entry()
            .await
            .context("Failed to stop time entry")?;
        match &stopped {
            Some(entry) => info!("Time entry {} stopped.", entry.id),
            None => info!("No time entry was running."),
        }

        Ok(stopped)
    }
}
