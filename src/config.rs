use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// APIキーを上書きする環境変数。
pub const API_TOKEN_ENV: &str = "TOGGL_API_TOKEN";

/// 開始・停止に利用するAPIの世代。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApiGeneration {
    /// `/api/v9`のエンドポイント。
    #[default]
    #[serde(rename = "v9")]
    Current,
    /// `/api/v8`のエンドポイント。
    #[serde(rename = "v8")]
    Legacy,
}

/// エンジンの設定。
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_key: String,
    /// タグを指定せずにタイマーを開始した時に付与するタグ。
    pub default_tags: Vec<String>,
    pub base_url: String,
    pub api_generation: ApiGeneration,
    /// レポート取得時に辿るページ数の上限。
    pub max_report_pages: usize,
    pub timeout_secs: u64,
    /// タイムエントリー作成時に送るクライアント名。
    pub created_with: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"[REDACTED]")
            .field("default_tags", &self.default_tags)
            .field("base_url", &self.base_url)
            .field("api_generation", &self.api_generation)
            .field("max_report_pages", &self.max_report_pages)
            .field("timeout_secs", &self.timeout_secs)
            .field("created_with", &self.created_with)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            default_tags: vec![],
            base_url: "https://api.track.toggl.com".to_string(),
            api_generation: ApiGeneration::default(),
            max_report_pages: 100,
            timeout_secs: 30,
            created_with: "toggl-accounting".to_string(),
        }
    }
}

impl Config {
    /// 既定の場所から設定を読み込み、環境変数`TOGGL_API_TOKEN`で上書きする。
    pub fn load() -> Result<Self> {
        let config = match default_path() {
            Some(path) => Self::load_from(&path)?,
            None => Self::default(),
        };

        Ok(config.with_api_token(std::env::var(API_TOKEN_ENV).ok()))
    }

    /// 指定されたJSONファイルから設定を読み込む。
    ///
    /// ファイルが存在しない場合は既定値を返す。
    ///
    /// # Arguments
    ///
    /// * `path` - 設定ファイルのパス
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let text = fs::read_to_string(path).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })?;
        let config = serde_json::from_str(&text)?;
        debug!("Loaded config from {}", path.display());

        Ok(config)
    }

    /// 空でないトークンが与えられた場合、APIキーを置き換える。
    pub fn with_api_token(mut self, token: Option<String>) -> Self {
        if let Some(token) = token.filter(|token| !token.trim().is_empty()) {
            self.api_key = token;
        }
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// 設定ファイルの既定のパス。
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("toggl-accounting").join("config.json"))
}
