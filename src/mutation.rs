use std::sync::Arc;

use log::{debug, info};
use reqwest::Method;
use serde_json::json;

use crate::error::Result;
use crate::models::{Tag, TagAction};
use crate::session::Session;
use crate::time_entry::TimeEntryUpdate;
use crate::tracker::EntryRecord;
use crate::transport::Request;

/// 複数のタイムエントリーへのタグの付け外しと、1件ずつの更新を行う。
pub struct BulkTagMutator {
    session: Arc<Session>,
}

impl BulkTagMutator {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    /// 全てのタイムエントリーにタグを付ける。
    pub async fn add_tag(&self, entry_ids: &[i64], tag: &Tag) -> Result<()> {
        self.apply(entry_ids, tag, TagAction::Add).await
    }

    /// 全てのタイムエントリーからタグを外す。
    pub async fn remove_tag(&self, entry_ids: &[i64], tag: &Tag) -> Result<()> {
        self.apply(entry_ids, tag, TagAction::Remove).await
    }

    /// 1回のリクエストで全てのIDを更新する。失敗した場合、どのIDも変更されなかったものとして扱う。
    async fn apply(&self, entry_ids: &[i64], tag: &Tag, action: TagAction) -> Result<()> {
        if entry_ids.is_empty() {
            debug!("No time entries selected, skipping {:?} of tag {}", action, tag.name);
            return Ok(());
        }

        let ids = entry_ids
            .iter()
            .map(i64::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let body = json!({
            "time_entry": {
                "tags": [tag.name],
                "tag_action": action,
            }
        });
        self.session
            .request(
                &format!("/api/v8/time_entries/{}", ids),
                Request::new(Method::PUT).with_body(body),
            )
            .await?;
        info!(
            "Applied {:?} of tag {} to {} time entries",
            action,
            tag.name,
            entry_ids.len()
        );

        Ok(())
    }

    /// タイムエントリーを渡された内容で丸ごと置き換え、サーバー側の結果を返す。
    pub async fn update_time_entry(&self, update: &TimeEntryUpdate) -> Result<EntryRecord> {
        let body = serde_json::to_value(update)?;
        let response = self
            .session
            .request(
                &format!("/api/v9/workspaces/{{workspace_id}}/time_entries/{}", update.id),
                Request::new(Method::PUT).with_body(body),
            )
            .await?;
        info!("Updated time entry {}", update.id);

        response.json()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};
    use mockito::{Matcher, Server};
    use rstest::rstest;
    use serde_json::json;

    use super::BulkTagMutator;
    use crate::error::Error;
    use crate::models::Tag;
    use crate::session::tests::logged_in;
    use crate::time_entry::TimeEntryUpdate;

    fn billable() -> Tag {
        Tag {
            id: 3,
            workspace_id: 42,
            name: "billable".to_string(),
        }
    }

    /// 全てのIDを1回のリクエストで送ることを確認する。
    #[rstest]
    #[case::add("add")]
    #[case::remove("remove")]
    #[tokio::test]
    async fn test_tag_action_single_request(#[case] action: &str) {
        let mut server = Server::new_async().await;
        let mutator = BulkTagMutator::new(Arc::new(logged_in(&mut server).await));
        let mock = server
            .mock("PUT", "/api/v8/time_entries/10,11")
            .match_body(Matcher::Json(json!({
                "time_entry": {"tags": ["billable"], "tag_action": action}
            })))
            .with_status(200)
            .expect(1)
            .create_async()
            .await;

        let result = match action {
            "add" => mutator.add_tag(&[10, 11], &billable()).await,
            _ => mutator.remove_tag(&[10, 11], &billable()).await,
        };

        mock.assert_async().await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_tag_action_failure_fails_batch() {
        let mut server = Server::new_async().await;
        let session = Arc::new(logged_in(&mut server).await);
        let mutator = BulkTagMutator::new(session.clone());
        let mock = server
            .mock("PUT", "/api/v8/time_entries/10,11")
            .with_status(500)
            .expect(1)
            .create_async()
            .await;

        let result = mutator.add_tag(&[10, 11], &billable()).await;

        mock.assert_async().await;
        assert!(matches!(result, Err(Error::Api { status: 500, .. })));
        assert!(session.last_error().is_some());
    }

    #[tokio::test]
    async fn test_tag_action_without_ids() {
        let mut server = Server::new_async().await;
        let mutator = BulkTagMutator::new(Arc::new(logged_in(&mut server).await));
        let mock = server
            .mock("PUT", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        mutator.remove_tag(&[], &billable()).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_update_time_entry() {
        let mut server = Server::new_async().await;
        let mutator = BulkTagMutator::new(Arc::new(logged_in(&mut server).await));
        let mock = server
            .mock("PUT", "/api/v9/workspaces/42/time_entries/10")
            .match_body(Matcher::Json(json!({
                "description": "review",
                "start": "2024-01-02T09:00:00Z",
                "stop": "2024-01-02T10:00:00Z",
                "project_id": 7,
                "tags": ["billable"]
            })))
            .with_status(200)
            .with_body(
                json!({
                    "id": 10,
                    "workspace_id": 42,
                    "project_id": 7,
                    "description": "review",
                    "start": "2024-01-02T09:00:00+00:00",
                    "stop": "2024-01-02T10:00:00+00:00",
                    "duration": 3600,
                    "tags": ["billable"],
                    "tag_ids": [3]
                })
                .to_string(),
            )
            .create_async()
            .await;
        let update = TimeEntryUpdate {
            id: 10,
            description: "review".to_string(),
            start: Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap(),
            stop: Some(Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap()),
            project_id: Some(7),
            tags: vec!["billable".to_string()],
        };

        let record = mutator.update_time_entry(&update).await.unwrap();

        mock.assert_async().await;
        assert_eq!(record.id, 10);
        assert_eq!(record.duration, 3600);
        assert_eq!(record.tag_ids, Some(vec![3]));
    }
}
