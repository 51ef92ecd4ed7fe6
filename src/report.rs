use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use log::{debug, info, warn};
use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::session::Session;
use crate::time_entry::TimeEntry;
use crate::transport::Request;

const SEARCH_PATH: &str = "/reports/api/v3/workspace/{workspace_id}/search/time_entries";

/// 次のページの開始行を示すレスポンスヘッダー。
pub const NEXT_ROW_HEADER: &str = "x-next-row-number";

/// 詳細レポートの検索条件。
#[derive(Clone, Debug, PartialEq)]
pub struct ReportQuery {
    /// 開始日（この日を含む）
    pub from: NaiveDate,
    /// 終了日（この日を含む）
    pub to: NaiveDate,
    pub project_id: Option<i64>,
    /// 空の場合はタグで絞り込まない。
    pub tag_ids: Vec<i64>,
    /// 取得を始める行番号。
    pub from_row: Option<u64>,
}

impl ReportQuery {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            from,
            to,
            project_id: None,
            tag_ids: vec![],
            from_row: None,
        }
    }

    fn search_request(&self, first_row_number: Option<u64>) -> SearchRequest {
        SearchRequest {
            start_date: self.from,
            end_date: self.to,
            first_row_number,
            project_ids: self.project_id.map(|id| vec![id]),
            tag_ids: self.tag_ids.clone(),
        }
    }
}

/// `search/time_entries`に送信する本文。
#[derive(Debug, Serialize)]
struct SearchRequest {
    start_date: NaiveDate,
    end_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    first_row_number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    project_ids: Option<Vec<i64>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tag_ids: Vec<i64>,
}

/// 説明文ごとに集約されたレポートの1行。
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub user_id: i64,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub project_id: Option<i64>,
    #[serde(default)]
    pub task_id: Option<i64>,
    #[serde(default)]
    pub billable: bool,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tag_ids: Vec<i64>,
    pub time_entries: Vec<TimeEntryInterval>,
    pub row_number: u64,
}

/// レポートの行に含まれる時間区間。
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeEntryInterval {
    pub id: i64,
    pub seconds: i64,
    pub start: DateTime<Utc>,
    pub stop: Option<DateTime<Utc>>,
    #[serde(default)]
    pub at: Option<DateTime<Utc>>,
}

impl ReportRow {
    /// 時間区間ごとに、行の情報を持ったタイムエントリーへ展開する。
    pub fn flatten(&self) -> Vec<TimeEntry> {
        self.time_entries
            .iter()
            .map(|interval| TimeEntry {
                id: interval.id,
                description: self.description.clone(),
                project_id: self.project_id,
                tag_ids: self.tag_ids.clone(),
                billable: self.billable,
                user_id: self.user_id,
                start: interval.start,
                stop: interval.stop,
                seconds: interval.seconds,
                row_number: self.row_number,
            })
            .collect()
    }
}

/// ページを辿った結果。
#[derive(Clone, Debug, PartialEq)]
pub struct ReportPages {
    pub rows: Vec<ReportRow>,
    pub pages: usize,
    /// 最後のページまで辿れた場合は`true`。
    pub complete: bool,
}

/// 詳細レポートを、続きのページがなくなるまで取得する。
pub struct ReportFetcher {
    session: Arc<Session>,
    max_pages: usize,
}

impl ReportFetcher {
    /// 新しい`ReportFetcher`を返す。
    ///
    /// # Arguments
    ///
    /// * `session` - リクエストに利用するセッション
    /// * `max_pages` - 辿るページ数の上限
    pub fn new(session: Arc<Session>, max_pages: usize) -> Self {
        Self {
            session,
            max_pages: max_pages.max(1),
        }
    }

    /// 全てのページの行をサーバーが返した順に返す。
    ///
    /// 途中のページが失敗した場合は、取得済みの行も捨ててエラーを返す。
    /// 上限までに最後のページへ到達しなかった場合は`PaginationLimitExceeded`を返す。
    pub async fn fetch_report(&self, query: &ReportQuery) -> Result<Vec<ReportRow>> {
        let pages = self.fetch_pages(query).await?;
        if !pages.complete {
            return Err(Error::PaginationLimitExceeded { pages: pages.pages });
        }

        Ok(pages.rows)
    }

    /// `fetch_report`の結果をタイムエントリーに展開して返す。
    pub async fn fetch_time_entries(&self, query: &ReportQuery) -> Result<Vec<TimeEntry>> {
        let rows = self.fetch_report(query).await?;
        Ok(rows.iter().flat_map(ReportRow::flatten).collect())
    }

    /// 上限に達するまでページを辿る。
    pub async fn fetch_pages(&self, query: &ReportQuery) -> Result<ReportPages> {
        let mut rows = vec![];
        let mut cursor = query.from_row;
        let mut pages = 0;

        loop {
            let body = serde_json::to_value(query.search_request(cursor))?;
            let response = self
                .session
                .request(SEARCH_PATH, Request::new(Method::POST).with_body(body))
                .await?;
            pages += 1;

            let page: Option<Vec<ReportRow>> = response.json()?;
            let page = page.unwrap_or_default();
            debug!("Report page {} has {} rows", pages, page.len());
            rows.extend(page);

            let next = match response.header(NEXT_ROW_HEADER).map(str::trim) {
                Some(next) if !next.is_empty() => next,
                _ => break,
            };
            if pages >= self.max_pages {
                warn!("Report has more rows after {} pages, giving up", pages);
                return Ok(ReportPages {
                    rows,
                    pages,
                    complete: false,
                });
            }
            cursor = Some(next.parse().map_err(|_| {
                Error::InvalidResponse(format!("{} is not a row number: {}", NEXT_ROW_HEADER, next))
            })?);
        }

        info!("Fetched {} report rows in {} pages", rows.len(), pages);
        Ok(ReportPages {
            rows,
            pages,
            complete: true,
        })
    }
}
