//! Toggl Track APIとのセッションと同期を扱うエンジン。
//!
//! ログイン、プロジェクトとタグのキャッシュ、詳細レポートのページ送り、
//! 実行中タイマーの操作、タグの一括付け外しを提供する。

pub mod cell;
pub mod clock;
pub mod config;
pub mod error;
pub mod guard;
pub mod models;
pub mod mutation;
pub mod report;
pub mod session;
pub mod time_entry;
pub mod tracker;
pub mod transport;

pub use config::{ApiGeneration, Config};
pub use error::{Error, Result};
pub use models::{Me, Project, Tag, TagAction};
pub use mutation::BulkTagMutator;
pub use report::{ReportFetcher, ReportPages, ReportQuery, ReportRow, TimeEntryInterval};
pub use session::{LoginState, Session};
pub use time_entry::{TimeEntry, TimeEntryUpdate};
pub use tracker::{normalize_entry, ActiveTimer, EntryReply, RunningEntry, StartEntry};
