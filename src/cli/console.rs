use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use toggl_accounting::{RunningEntry, TimeEntry};

/// Consoleにtime entryを表示するためのtrait。
pub trait ConsolePresenter {
    /// タイムエントリーを日付ごとに表示する。
    ///
    /// # Arguments
    ///
    /// * `time_entries` - 表示するタイムエントリー
    fn show_time_entries(&mut self, time_entries: &[TimeEntry]) -> Result<()>;

    /// 実行中のタイムエントリーを表示する。
    fn show_running_entry(&mut self, entry: Option<&RunningEntry>) -> Result<()>;
}

/// タイムエントリーをMarkdownのlist形式で表示する。
pub struct ConsoleMarkdownList<'a, W: Write> {
    writer: &'a mut W,
}

impl<'a, W: Write> ConsoleMarkdownList<'a, W> {
    /// 新しい`ConsoleMarkdownList`を返す。
    pub fn new(writer: &'a mut W) -> Self {
        Self { writer }
    }
}

impl<'a, W: Write> ConsolePresenter for ConsoleMarkdownList<'a, W> {
    // 開始時刻順に並べ、Localタイムゾーンの日付が変わるたびに見出しを出す。
    fn show_time_entries(&mut self, time_entries: &[TimeEntry]) -> Result<()> {
        let mut sorted_entries = time_entries.to_vec();
        sorted_entries.sort_by_key(|entry| entry.start);

        let mut current_date = None;
        for entry in sorted_entries {
            let date = entry.start.with_timezone(&Local).date_naive();
            if current_date != Some(date) {
                writeln!(self.writer, "## {}", date)
                    .with_context(|| format!("Failed to write date: {}", date))?;
                current_date = Some(date);
            }
            writeln!(
                self.writer,
                "- {} ~ {}: {} (#{})",
                clock_time(&entry.start),
                entry
                    .stop
                    .map(|stop| clock_time(&stop))
                    .unwrap_or_else(|| "now".to_string()),
                entry.description,
                entry.id
            )
            .with_context(|| format!("Failed to write time entry: {:?}", entry))?;
        }

        Ok(())
    }

    fn show_running_entry(&mut self, entry: Option<&RunningEntry>) -> Result<()> {
        let written = match entry {
            Some(entry) => writeln!(
                self.writer,
                "- {} ~ now: {}",
                clock_time(&entry.start),
                entry.description
            ),
            None => writeln!(self.writer, "No time entry is running."),
        };
        written.context("Failed to write running entry")
    }
}

fn clock_time(time: &DateTime<Utc>) -> String {
    time.with_timezone(&Local).format("%H:%M").to_string()
}
