use std::sync::Arc;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use log::info;
use toggl_accounting::config::API_TOKEN_ENV;
use toggl_accounting::{
    ActiveTimer, BulkTagMutator, Config, LoginState, ReportFetcher, ReportQuery, RunningEntry,
    Session, StartEntry, TagAction, TimeEntry,
};

use crate::cli::repository::TogglRepository;

/// エンジンを利用して`TogglRepository`を実装するクライアント。
///
/// # Examples
///
/// ```ignore
/// let client = TogglClient::connect(&config).await?;
/// let time_entries = client.read_time_entries(&query).await?;
/// ```
pub struct TogglClient {
    session: Arc<Session>,
    fetcher: ReportFetcher,
    timer: ActiveTimer,
    mutator: BulkTagMutator,
}

impl TogglClient {
    /// 設定のAPIキーでログインした`TogglClient`を返す。
    ///
    /// APIキーが未設定、または認証に失敗した場合はエラーを返す。
    pub async fn connect(config: &Config) -> Result<Self> {
        let session = Arc::new(Session::new(config).context("Failed to build Toggl session")?);
        let state = session
            .login(&config.api_key)
            .await
            .context("Logged in, but failed to load projects and tags")?;
        match state {
            LoginState::Authenticated => {}
            LoginState::LoggedOut => bail!(
                "No API key configured, set {} or api_key in the config file",
                API_TOKEN_ENV
            ),
            LoginState::InvalidCredentials => bail!("Toggl rejected the API key"),
            _ => bail!(
                "Failed to log into Toggl: {}",
                session.last_error().unwrap_or_else(|| state.to_string())
            ),
        }
        info!("Logged into Toggl successfully.");

        Ok(Self {
            fetcher: ReportFetcher::new(session.clone(), config.max_report_pages),
            timer: ActiveTimer::new(session.clone(), config),
            mutator: BulkTagMutator::new(session.clone()),
            session,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }
}

#[async_trait]
impl TogglRepository for TogglClient {
    async fn read_time_entries(&self, query: &ReportQuery) -> Result<Vec<TimeEntry>> {
        let time_entries = self
            .fetcher
            .fetch_time_entries(query)
            .await
            .with_context(|| format!("Failed to fetch report from {} to {}", query.from, query.to))?;
        info!("length of time entries: {}", time_entries.len());

        Ok(time_entries)
    }

    async fn running_entry(&self) -> Result<Option<RunningEntry>> {
        self.timer
            .refresh_current()
            .await
            .context("Failed to fetch the running time entry")
    }

    async fn start_entry(&self, entry: &StartEntry) -> Result<RunningEntry> {
        self.timer
            .start_current(entry)
            .await
            .with_context(|| format!("Failed to start time entry: {}", entry.description))
    }

    async fn stop_entry(&self) -> Result<Option<RunningEntry>> {
        // 新しいプロセスでは追跡中のエントリーがないため、先に取得する
        let running = self.running_entry().await?;
        self.timer
            .stop_current()
            .await
            .context("Failed to stop the running time entry")?;

        Ok(running)
    }

    async fn tag_entries(&self, entry_ids: &[i64], tag_id: i64, action: TagAction) -> Result<()> {
        let tag = self
            .session
            .resolve_tag(tag_id)
            .with_context(|| format!("Unknown tag id: {}", tag_id))?;
        let result = match action {
            TagAction::Add => self.mutator.add_tag(entry_ids, &tag).await,
            TagAction::Remove => self.mutator.remove_tag(entry_ids, &tag).await,
        };

        result.with_context(|| format!("Failed to {:?} tag {} on {:?}", action, tag.name, entry_ids))
    }
}

#[cfg(test)]
mod tests {
    use mockito::{Server, ServerGuard};
    use serde_json::json;
    use toggl_accounting::{Config, TagAction};

    use super::TogglClient;
    use crate::cli::repository::TogglRepository;

    fn config(server: &ServerGuard, api_key: &str) -> Config {
        Config {
            api_key: api_key.to_string(),
            base_url: server.url(),
            ..Config::default()
        }
    }

    async fn mock_login(server: &mut ServerGuard) {
        server
            .mock("GET", "/api/v9/me")
            .with_status(200)
            .with_body(json!({"id": 5, "default_workspace_id": 42}).to_string())
            .create_async()
            .await;
        server
            .mock("GET", "/api/v9/workspaces/42/projects")
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;
        server
            .mock("GET", "/api/v9/workspaces/42/tags")
            .with_status(200)
            .with_body(json!([{"id": 3, "workspace_id": 42, "name": "billable"}]).to_string())
            .create_async()
            .await;
    }

    #[tokio::test]
    async fn test_connect() {
        let mut server = Server::new_async().await;
        mock_login(&mut server).await;

        let client = TogglClient::connect(&config(&server, "key")).await.unwrap();

        assert_eq!(client.session().workspace_id(), Some(42));
    }

    #[tokio::test]
    async fn test_connect_without_key() {
        let server = Server::new_async().await;

        let result = TogglClient::connect(&config(&server, "")).await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_connect_invalid_key() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/v9/me")
            .with_status(403)
            .create_async()
            .await;

        let result = TogglClient::connect(&config(&server, "key")).await;

        assert_eq!(
            result.err().map(|error| error.to_string()),
            Some("Toggl rejected the API key".to_string())
        );
    }

    /// 停止の前に実行中のエントリーを取得することを確認する。
    #[tokio::test]
    async fn test_stop_entry_fetches_running_entry_first() {
        let mut server = Server::new_async().await;
        mock_login(&mut server).await;
        server
            .mock("GET", "/api/v9/me/time_entries/current")
            .with_status(200)
            .with_body(json!({"id": 100, "workspace_id": 42, "description": "desc", "start": "2024-01-02T09:00:00Z"}).to_string())
            .create_async()
            .await;
        let stop = server
            .mock("PATCH", "/api/v9/workspaces/42/time_entries/100/stop")
            .with_status(200)
            .create_async()
            .await;
        let client = TogglClient::connect(&config(&server, "key")).await.unwrap();

        let stopped = client.stop_entry().await.unwrap();

        stop.assert_async().await;
        assert_eq!(stopped.map(|entry| entry.id), Some(100));
    }

    #[tokio::test]
    async fn test_tag_entries_unknown_tag() {
        let mut server = Server::new_async().await;
        mock_login(&mut server).await;
        let client = TogglClient::connect(&config(&server, "key")).await.unwrap();

        let result = client.tag_entries(&[1], 99, TagAction::Add).await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_tag_entries() {
        let mut server = Server::new_async().await;
        mock_login(&mut server).await;
        let mutation = server
            .mock("PUT", "/api/v8/time_entries/1,2")
            .with_status(200)
            .create_async()
            .await;
        let client = TogglClient::connect(&config(&server, "key")).await.unwrap();

        client.tag_entries(&[1, 2], 3, TagAction::Remove).await.unwrap();

        mutation.assert_async().await;
    }
}
