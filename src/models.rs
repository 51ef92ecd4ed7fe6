use serde::{Deserialize, Serialize};

/// `GET /api/v9/me`で取得するユーザー情報。
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Me {
    pub id: i64,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub fullname: String,
    #[serde(default)]
    pub timezone: String,
    pub default_workspace_id: i64,
    #[serde(default)]
    pub beginning_of_week: u8,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// ワークスペースのプロジェクト。
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub workspace_id: i64,
    #[serde(default)]
    pub client_id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub billable: Option<bool>,
}

/// ワークスペースのタグ。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub workspace_id: i64,
    pub name: String,
}

/// 名前に一致するタグのIDを、`tags`の順序で返す。一致しない名前は無視する。
pub fn tag_ids_for_names(tags: &[Tag], names: &[String]) -> Vec<i64> {
    tags.iter()
        .filter(|tag| names.contains(&tag.name))
        .map(|tag| tag.id)
        .collect()
}

/// 一括タグ操作の種類。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagAction {
    Add,
    Remove,
}
