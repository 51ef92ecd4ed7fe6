use anyhow::Result;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use toggl_accounting::{ReportQuery, RunningEntry, StartEntry, TagAction, TimeEntry};

/// コマンドがToggl APIを利用するためのtrait。
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TogglRepository: Send + Sync {
    /// 期間内のタイムエントリーを取得する。
    async fn read_time_entries(&self, query: &ReportQuery) -> Result<Vec<TimeEntry>>;

    /// 実行中のタイムエントリーを取得する。
    async fn running_entry(&self) -> Result<Option<RunningEntry>>;

    /// タイムエントリーを開始する。
    async fn start_entry(&self, entry: &StartEntry) -> Result<RunningEntry>;

    /// 実行中のタイムエントリーを停止し、停止したエントリーを返す。
    async fn stop_entry(&self) -> Result<Option<RunningEntry>>;

    /// タイムエントリーにタグを付ける、または外す。
    ///
    /// # Arguments
    ///
    /// * `entry_ids` - 対象のタイムエントリー
    /// * `tag_id` - キャッシュ済みのタグのID
    /// * `action` - 付けるか外すか
    async fn tag_entries(&self, entry_ids: &[i64], tag_id: i64, action: TagAction) -> Result<()>;
}
