use std::fmt;

use log::{debug, info, warn};
use serde::de::DeserializeOwned;

use crate::cell::VersionedCell;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::guard::{self, LastError};
use crate::models::{self, Me, Project, Tag};
use crate::transport::{Credential, Identity, Request, Response, Transport};

const ME_PATH: &str = "/api/v9/me";
const PROJECTS_PATH: &str = "/api/v9/workspaces/{workspace_id}/projects";
const TAGS_PATH: &str = "/api/v9/workspaces/{workspace_id}/tags";

/// ログイン処理の状態。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoginState {
    #[default]
    LoggedOut,
    InProgress,
    InvalidCredentials,
    Authenticated,
    Error,
}

impl fmt::Display for LoginState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            LoginState::LoggedOut => "logged out",
            LoginState::InProgress => "logging in",
            LoginState::InvalidCredentials => "invalid credentials",
            LoginState::Authenticated => "logged in",
            LoginState::Error => "login failed",
        };
        f.write_str(text)
    }
}

/// Toggl APIとのセッション。
///
/// APIキー、ログイン状態、ユーザー情報、プロジェクトとタグのキャッシュを保持する。
/// 他のコンポーネントは全てのリクエストをこのセッション経由で送信する。
///
/// 認証情報とワークスペースIDは送信時点の値が使われるため、ログイン中に送信済みのリクエストは
/// 古いキーと新しいキーのどちらで完了してもよい。
///
/// # Examples
///
/// ```no_run
/// # async fn run() -> toggl_accounting::Result<()> {
/// use toggl_accounting::{Config, LoginState, Session};
///
/// let session = Session::new(&Config::default())?;
/// if session.login("api key").await? == LoginState::Authenticated {
///     println!("{} projects", session.projects().len());
/// }
/// # Ok(())
/// # }
/// ```
pub struct Session {
    transport: Transport,
    state: VersionedCell<LoginState>,
    credential: VersionedCell<Option<Credential>>,
    profile: VersionedCell<Option<Me>>,
    projects: VersionedCell<Vec<Project>>,
    tags: VersionedCell<Vec<Tag>>,
    last_error: LastError,
}

impl Session {
    /// 未ログイン状態の`Session`を返す。
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            transport: Transport::new(config)?,
            state: VersionedCell::default(),
            credential: VersionedCell::default(),
            profile: VersionedCell::default(),
            projects: VersionedCell::default(),
            tags: VersionedCell::default(),
            last_error: LastError::default(),
        })
    }

    pub fn login_state(&self) -> LoginState {
        self.state.get()
    }

    pub fn is_authenticated(&self) -> bool {
        self.login_state() == LoginState::Authenticated
    }

    /// 最後に発生したエラー。直近のリクエストが成功していれば`None`。
    pub fn last_error(&self) -> Option<String> {
        self.last_error.get()
    }

    pub fn profile(&self) -> Option<Me> {
        self.profile.get()
    }

    /// ユーザーの既定のワークスペースID。
    pub fn workspace_id(&self) -> Option<i64> {
        self.profile().map(|me| me.default_workspace_id)
    }

    /// キャッシュ済みのプロジェクト。ログインしていない場合は空。
    pub fn projects(&self) -> Vec<Project> {
        if self.is_authenticated() {
            self.projects.get()
        } else {
            vec![]
        }
    }

    /// キャッシュ済みのタグ。ログインしていない場合は空。
    pub fn tags(&self) -> Vec<Tag> {
        if self.is_authenticated() {
            self.tags.get()
        } else {
            vec![]
        }
    }

    /// IDからプロジェクトを引く。
    ///
    /// ログイン直後はキャッシュがまだ空のため、`NotFound`は一時的なものとして扱うこと。
    pub fn resolve_project(&self, id: i64) -> Result<Project> {
        self.projects()
            .into_iter()
            .find(|project| project.id == id)
            .ok_or(Error::NotFound {
                kind: "project",
                id,
            })
    }

    /// IDからタグを引く。
    pub fn resolve_tag(&self, id: i64) -> Result<Tag> {
        self.tags()
            .into_iter()
            .find(|tag| tag.id == id)
            .ok_or(Error::NotFound { kind: "tag", id })
    }

    /// タグ名に一致するキャッシュ済みタグのIDを、キャッシュの順序で返す。
    pub fn tag_ids_for_names(&self, names: &[String]) -> Vec<i64> {
        models::tag_ids_for_names(&self.tags(), names)
    }

    /// 最後にログインに使ったキーと異なるかどうか。
    pub fn credential_changed(&self, api_key: &str) -> bool {
        self.credential
            .get()
            .map_or(true, |credential| !credential.matches(api_key))
    }

    /// Togglにログインし、成功した場合はプロジェクトとタグを取得する。
    ///
    /// ログインの結果は状態として返す。`Err`になるのは、ログイン後のキャッシュ更新に失敗した場合だけで、
    /// その時の状態は`Authenticated`のまま残る。
    ///
    /// # Arguments
    ///
    /// * `api_key` - APIキー。空白のみの場合はログアウトする
    pub async fn login(&self, api_key: &str) -> Result<LoginState> {
        if api_key.trim().is_empty() {
            info!("Blank API key, logging out of Toggl");
            self.credential.set(None);
            self.clear_reference_data();
            self.state.set(LoginState::LoggedOut);
            return Ok(LoginState::LoggedOut);
        }

        let state = self.login_state();
        if !self.credential_changed(api_key)
            && matches!(state, LoginState::InProgress | LoginState::Authenticated)
        {
            debug!("API key unchanged, staying {}", state);
            return Ok(state);
        }

        self.credential.set(Some(Credential::new(api_key)));
        self.clear_reference_data();
        self.state.set(LoginState::InProgress);
        info!("Logging into Toggl");

        let profile = match self.request(ME_PATH, Request::get()).await {
            Ok(response) => response.json::<Me>(),
            Err(error) => Err(error),
        };
        match profile {
            Ok(me) => {
                info!(
                    "Logged in as {} (workspace {})",
                    me.email, me.default_workspace_id
                );
                self.profile.set(Some(me));
                self.state.set(LoginState::Authenticated);
                self.refresh().await?;
                Ok(LoginState::Authenticated)
            }
            Err(Error::Api { status: 403, .. }) => {
                warn!("Toggl rejected the API key");
                self.state.set(LoginState::InvalidCredentials);
                Ok(LoginState::InvalidCredentials)
            }
            Err(error) => {
                // 通信とステータスのエラーは`request`の中で記録済み
                if let Error::Decode(_) = error {
                    self.last_error.record(&error);
                }
                warn!("Error logging user into Toggl: {}", error);
                self.state.set(LoginState::Error);
                Ok(LoginState::Error)
            }
        }
    }

    /// プロジェクトとタグを同時に取得し、キャッシュを置き換える。
    ///
    /// ログインしていない場合は何もしない。どちらかが失敗した場合は、どちらのキャッシュも変更しない。
    pub async fn refresh(&self) -> Result<()> {
        if !self.is_authenticated() {
            debug!("Not logged in, skipping refresh");
            return Ok(());
        }

        let (projects, tags) = tokio::join!(
            self.fetch_list::<Project>(PROJECTS_PATH),
            self.fetch_list::<Tag>(TAGS_PATH),
        );
        match (projects, tags) {
            (Ok(projects), Ok(tags)) => {
                info!("Cached {} projects and {} tags", projects.len(), tags.len());
                self.projects.set(projects);
                self.tags.set(tags);
                Ok(())
            }
            (Err(error), _) | (_, Err(error)) => {
                // 後から完了した成功レスポンスがエラーを消している場合がある
                self.last_error.record(&error);
                Err(error)
            }
        }
    }

    /// 現在の認証情報でリクエストを送信し、2xxであることを確認する。
    pub async fn request(&self, path: &str, request: Request) -> Result<Response> {
        let response = match self.transport.send(path, request, &self.identity()).await {
            Ok(response) => response,
            Err(error) => {
                self.last_error.record(&error);
                return Err(error);
            }
        };

        guard::assert_ok(response, &self.last_error)
    }

    fn identity(&self) -> Identity {
        Identity {
            credential: self.credential.get(),
            workspace_id: self.workspace_id(),
        }
    }

    async fn fetch_list<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        let response = self.request(path, Request::get()).await?;
        // 空のワークスペースでは`null`が返る
        let items: Option<Vec<T>> = response.json()?;
        Ok(items.unwrap_or_default())
    }

    fn clear_reference_data(&self) {
        self.profile.set(None);
        self.projects.set(vec![]);
        self.tags.set(vec![]);
    }
}
