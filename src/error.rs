use std::path::PathBuf;

use thiserror::Error;

/// エンジン全体で利用するエラー。
#[derive(Debug, Error)]
pub enum Error {
    /// 接続失敗、タイムアウトなどネットワーク層でのエラー。
    #[error("Toggl API call failed with error {0}")]
    Transport(#[from] reqwest::Error),

    /// APIが2xx以外のステータスコードを返した。
    #[error("Toggl API returned status code {status}!")]
    Api { status: u16, body: String },

    /// キャッシュに存在しないIDを参照した。
    #[error("{kind} {id} is not cached")]
    NotFound { kind: &'static str, id: i64 },

    /// レポートのページ数が上限を超えた。
    #[error("report pagination stopped after {pages} pages")]
    PaginationLimitExceeded { pages: usize },

    /// 開始時刻のずらしが表現できる範囲を超えている。
    #[error("start offset of {minutes} minutes is out of range")]
    InvalidOffset { minutes: i64 },

    #[error("not logged into Toggl")]
    NotAuthenticated,

    #[error("failed to decode Toggl response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid Toggl response: {0}")]
    InvalidResponse(String),

    #[error("failed to read config {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
