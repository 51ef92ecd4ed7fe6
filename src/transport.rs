use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine};
use log::debug;
use reqwest::{
    header::{HeaderMap, AUTHORIZATION, CONTENT_TYPE},
    Client, Method,
};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::Config;
use crate::error::Result;

/// パス中でワークスペースIDに置換されるプレースホルダー。
pub const WORKSPACE_PLACEHOLDER: &str = "{workspace_id}";

/// Toggl APIのAPIキー。
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self(api_key.into())
    }

    /// `Authorization`ヘッダーの値を返す。
    pub fn authorization(&self) -> String {
        format!("Basic {}", STANDARD.encode(format!("{}:api_token", self.0)))
    }

    pub fn matches(&self, api_key: &str) -> bool {
        self.0 == api_key
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential([REDACTED])")
    }
}

/// リクエスト送信時点の認証情報とワークスペース。
#[derive(Clone, Debug, Default)]
pub struct Identity {
    pub credential: Option<Credential>,
    pub workspace_id: Option<i64>,
}

/// 1回分のリクエスト内容。
#[derive(Clone, Debug)]
pub struct Request {
    pub method: Method,
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
}

impl Request {
    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    pub fn new(method: Method) -> Self {
        Self {
            method,
            body: None,
            headers: vec![],
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// ステータスコードを問わず、受信したレスポンス。
#[derive(Clone, Debug)]
pub struct Response {
    pub status: u16,
    pub headers: HeaderMap,
    pub text: String,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 本文をJSONとしてデシリアライズする。
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.text)?)
    }

    /// ヘッダーの値を文字列で返す。
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(name)
            .and_then(|value| value.to_str().ok())
    }
}

/// Toggl APIへリクエストを1回送信する。
///
/// 2xx以外のステータスはエラーにせず、そのまま呼び出し元に返す。
/// ネットワーク層の失敗だけが`Error::Transport`になる。
pub struct Transport {
    client: Client,
    base_url: String,
}

impl Transport {
    /// 新しい`Transport`を返す。
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// リクエストを送信する。
    ///
    /// # Arguments
    ///
    /// * `path` - `{workspace_id}`を含みうるパス
    /// * `request` - メソッド、本文、追加ヘッダー
    /// * `identity` - 送信時点の認証情報。未ログインでもそのまま送信する
    pub async fn send(&self, path: &str, request: Request, identity: &Identity) -> Result<Response> {
        let path = resolve_path(path, identity.workspace_id);
        debug!("Firing a {} request to {}", request.method, path);

        let mut builder = self
            .client
            .request(request.method, format!("{}{}", self.base_url, path))
            .header(CONTENT_TYPE, "application/json");
        if let Some(credential) = &identity.credential {
            builder = builder.header(AUTHORIZATION, credential.authorization());
        }
        for (name, value) in request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.json(&body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let text = response.text().await?;
        debug!("{} answered with status {}", path, status);

        Ok(Response {
            status,
            headers,
            text,
        })
    }
}

/// プレースホルダーをワークスペースIDで置換する。未確定の場合は空文字列にする。
fn resolve_path(path: &str, workspace_id: Option<i64>) -> String {
    let workspace = workspace_id.map(|id| id.to_string()).unwrap_or_default();
    path.replace(WORKSPACE_PLACEHOLDER, &workspace)
}

#[cfg(test)]
mod tests {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use mockito::{Matcher, Server};
    use reqwest::Method;
    use rstest::rstest;
    use serde_json::json;

    use super::{resolve_path, Credential, Identity, Request, Transport};
    use crate::config::Config;

    fn transport(url: String) -> Transport {
        Transport::new(&Config {
            base_url: url,
            ..Config::default()
        })
        .unwrap()
    }

    #[rstest]
    #[case::known("/api/v9/workspaces/{workspace_id}/tags", Some(42), "/api/v9/workspaces/42/tags")]
    #[case::unknown("/api/v9/workspaces/{workspace_id}/tags", None, "/api/v9/workspaces//tags")]
    #[case::no_placeholder("/api/v9/me", Some(42), "/api/v9/me")]
    fn test_resolve_path(#[case] path: &str, #[case] workspace: Option<i64>, #[case] expected: &str) {
        assert_eq!(resolve_path(path, workspace), expected);
    }

    #[test]
    fn test_authorization() {
        let credential = Credential::new("abc");

        assert_eq!(
            credential.authorization(),
            format!("Basic {}", STANDARD.encode("abc:api_token"))
        );
        assert!(!format!("{:?}", credential).contains("abc"));
    }

    /// 認証ヘッダー、ワークスペースID、本文が送信されることを確認する。
    #[tokio::test]
    async fn test_send_with_identity() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v9/workspaces/7/things")
            .match_header(
                "authorization",
                format!("Basic {}", STANDARD.encode("key:api_token")).as_str(),
            )
            .match_header("x-extra", "1")
            .match_body(Matcher::Json(json!({"name": "thing"})))
            .with_status(201)
            .with_header("x-next-row-number", "51")
            .with_body(r#"{"id": 1}"#)
            .create_async()
            .await;
        let identity = Identity {
            credential: Some(Credential::new("key")),
            workspace_id: Some(7),
        };

        let response = transport(server.url())
            .send(
                "/api/v9/workspaces/{workspace_id}/things",
                Request::new(Method::POST)
                    .with_body(json!({"name": "thing"}))
                    .with_header("x-extra", "1"),
                &identity,
            )
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.status, 201);
        assert_eq!(response.header("x-next-row-number"), Some("51"));
        assert_eq!(response.json::<serde_json::Value>().unwrap(), json!({"id": 1}));
    }

    /// 未ログイン時は認証ヘッダーなしで送信され、エラーステータスもそのまま返ることを確認する。
    #[tokio::test]
    async fn test_send_without_credential() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v9/me")
            .match_header("authorization", Matcher::Missing)
            .with_status(403)
            .create_async()
            .await;

        let response = transport(server.url())
            .send("/api/v9/me", Request::get(), &Identity::default())
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.status, 403);
        assert!(!response.is_success());
    }

    #[tokio::test]
    async fn test_send_connection_refused() {
        let result = transport("http://127.0.0.1:1".to_string())
            .send("/api/v9/me", Request::get(), &Identity::default())
            .await;

        assert!(matches!(result, Err(crate::Error::Transport(_))));
    }
}
