use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use log::{debug, info};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::cell::VersionedCell;
use crate::clock;
use crate::config::{ApiGeneration, Config};
use crate::error::{Error, Result};
use crate::models::{self, Tag};
use crate::session::Session;
use crate::transport::Request;

const CURRENT_PATH: &str = "/api/v9/me/time_entries/current";
const START_PATH: &str = "/api/v9/time_entries";
const LEGACY_START_PATH: &str = "/api/v8/time_entries/start";

/// `/api/v9`が返すタイムエントリー。
///
/// 旧フィールド名の`pid`と`wid`が併記されることがある。
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntryRecord {
    pub id: i64,
    #[serde(default)]
    pub workspace_id: Option<i64>,
    #[serde(default)]
    pub wid: Option<i64>,
    #[serde(default)]
    pub project_id: Option<i64>,
    #[serde(default)]
    pub pid: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    #[serde(default)]
    pub stop: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration: i64,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub tag_ids: Option<Vec<i64>>,
}

/// `/api/v8`が`data`の中に返すタイムエントリー。
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LegacyEntryRecord {
    pub id: i64,
    #[serde(default)]
    pub wid: Option<i64>,
    #[serde(default)]
    pub pid: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    #[serde(default)]
    pub duration: i64,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct LegacyEnvelope {
    data: LegacyEntryRecord,
}

/// APIの世代ごとに形の異なる応答。
#[derive(Clone, Debug, PartialEq)]
pub enum EntryReply {
    Current(EntryRecord),
    Legacy(LegacyEntryRecord),
}

/// 実行中のタイムエントリー。
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunningEntry {
    pub id: i64,
    pub workspace_id: Option<i64>,
    pub project_id: Option<i64>,
    pub description: String,
    pub start: DateTime<Utc>,
    pub tags: Vec<String>,
    pub tag_ids: Vec<i64>,
}

/// タイマーを開始する時の内容。
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StartEntry {
    pub description: String,
    /// タグ名
    pub tags: Vec<String>,
    pub project_id: Option<i64>,
    /// 開始時刻を現在から遡らせる分数。
    pub start_offset_minutes: Option<i64>,
}

/// どちらの形の応答も`RunningEntry`に揃える。
///
/// タグIDが含まれていない場合は、タグ名からキャッシュ済みのタグを引いて補う。
///
/// # Arguments
///
/// * `reply` - 作成または取得の応答
/// * `tags` - キャッシュ済みのタグ
pub fn normalize_entry(reply: EntryReply, tags: &[Tag]) -> RunningEntry {
    let (id, workspace_id, project_id, description, start, names, tag_ids) = match reply {
        EntryReply::Current(record) => (
            record.id,
            record.workspace_id.or(record.wid),
            record.project_id.or(record.pid),
            record.description,
            record.start,
            record.tags,
            record.tag_ids,
        ),
        EntryReply::Legacy(record) => (
            record.id,
            record.wid,
            record.pid,
            record.description,
            record.start,
            record.tags,
            None,
        ),
    };
    let names = names.unwrap_or_default();
    let tag_ids = tag_ids.unwrap_or_else(|| models::tag_ids_for_names(tags, &names));

    RunningEntry {
        id,
        workspace_id,
        project_id,
        description: description.unwrap_or_default(),
        start,
        tags: names,
        tag_ids,
    }
}

/// 実行中のタイムエントリーを1件だけ追跡する。
///
/// 定期的な`refresh_current`の呼び出しは外側が行う。同時に呼ばれた場合は最後に完了したものが残る。
pub struct ActiveTimer {
    session: Arc<Session>,
    generation: ApiGeneration,
    created_with: String,
    current: VersionedCell<Option<RunningEntry>>,
}

impl ActiveTimer {
    /// 新しい`ActiveTimer`を返す。
    pub fn new(session: Arc<Session>, config: &Config) -> Self {
        Self {
            session,
            generation: config.api_generation,
            created_with: config.created_with.clone(),
            current: VersionedCell::default(),
        }
    }

    /// 追跡中のタイムエントリー。
    pub fn current(&self) -> Option<RunningEntry> {
        self.current.get()
    }

    /// 実行中のタイムエントリーを取得して追跡する。ログインしていない場合は`None`にする。
    pub async fn refresh_current(&self) -> Result<Option<RunningEntry>> {
        if !self.session.is_authenticated() {
            self.current.set(None);
            return Ok(None);
        }

        let response = self.session.request(CURRENT_PATH, Request::get()).await?;
        let record: Option<EntryRecord> = response.json()?;
        let entry = record.map(|record| normalize_entry(EntryReply::Current(record), &self.session.tags()));
        debug!("Running entry: {:?}", entry.as_ref().map(|entry| entry.id));

        self.current.set(entry.clone());
        Ok(entry)
    }

    /// 新しいタイムエントリーを開始して追跡する。
    ///
    /// # Arguments
    ///
    /// * `entry` - 説明、タグ名、プロジェクト、開始時刻のずらし
    pub async fn start_current(&self, entry: &StartEntry) -> Result<RunningEntry> {
        if !self.session.is_authenticated() {
            return Err(Error::NotAuthenticated);
        }

        let start = clock::backdated(entry.start_offset_minutes)?;
        let reply = match self.generation {
            ApiGeneration::Current => {
                let body = self.start_body(entry, start);
                let response = self
                    .session
                    .request(START_PATH, Request::new(Method::POST).with_body(body))
                    .await?;
                EntryReply::Current(response.json()?)
            }
            ApiGeneration::Legacy => {
                let body = self.legacy_start_body(entry, start);
                let response = self
                    .session
                    .request(LEGACY_START_PATH, Request::new(Method::POST).with_body(body))
                    .await?;
                EntryReply::Legacy(response.json::<LegacyEnvelope>()?.data)
            }
        };
        let running = normalize_entry(reply, &self.session.tags());
        info!("Started time entry {}", running.id);

        self.current.set(Some(running.clone()));
        Ok(running)
    }

    /// 追跡中のタイムエントリーを停止する。追跡していない場合は何もしない。
    pub async fn stop_current(&self) -> Result<()> {
        let Some(entry) = self.current() else {
            debug!("No running entry to stop");
            return Ok(());
        };
        if !self.session.is_authenticated() {
            return Err(Error::NotAuthenticated);
        }

        let request = match self.generation {
            ApiGeneration::Current => (
                format!(
                    "/api/v9/workspaces/{{workspace_id}}/time_entries/{}/stop",
                    entry.id
                ),
                Request::new(Method::PATCH),
            ),
            ApiGeneration::Legacy => (
                format!("/api/v8/time_entries/{}/stop", entry.id),
                Request::new(Method::PUT),
            ),
        };
        self.session.request(&request.0, request.1).await?;
        info!("Stopped time entry {}", entry.id);

        self.current.set(None);
        Ok(())
    }

    fn start_body(&self, entry: &StartEntry, start: DateTime<Utc>) -> Value {
        json!({
            "created_with": self.created_with,
            "description": entry.description,
            "project_id": entry.project_id,
            "tags": entry.tags,
            "workspace_id": self.session.workspace_id(),
            "start": start.to_rfc3339_opts(SecondsFormat::Secs, true),
            "duration": -start.timestamp(),
            "stop": null,
        })
    }

    fn legacy_start_body(&self, entry: &StartEntry, start: DateTime<Utc>) -> Value {
        let mut time_entry = json!({
            "description": entry.description,
            "pid": entry.project_id,
            "tags": entry.tags,
            "created_with": self.created_with,
        });
        if entry.start_offset_minutes.is_some() {
            time_entry["start"] = json!(start.to_rfc3339_opts(SecondsFormat::Secs, true));
        }
        json!({ "time_entry": time_entry })
    }
}
