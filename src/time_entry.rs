use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// レポートの1行を時間区間ごとに展開したタイムエントリー。
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeEntry {
    pub id: i64,
    pub description: String,
    pub project_id: Option<i64>,
    pub tag_ids: Vec<i64>,
    pub billable: bool,
    pub user_id: i64,
    pub start: DateTime<Utc>,
    pub stop: Option<DateTime<Utc>>,
    pub seconds: i64,
    pub row_number: u64,
}

/// 1件のタイムエントリーを丸ごと更新するための内容。
///
/// 部分更新はできないため、全ての項目に更新後の値を入れる。タグはIDではなく名前で指定する。
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TimeEntryUpdate {
    #[serde(skip_serializing)]
    pub id: i64,
    pub description: String,
    pub start: DateTime<Utc>,
    pub stop: Option<DateTime<Utc>>,
    pub project_id: Option<i64>,
    pub tags: Vec<String>,
}
