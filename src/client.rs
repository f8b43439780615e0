use crate::error::{Error, Result};
use crate::models::{SearchPage, SearchRequest, WorklogPage, WorklogQuery};
use async_trait::async_trait;
use base64::Engine;
use reqwest::{Client, header};
use serde::Deserialize;
use std::sync::Arc;
use url::Url;

pub const AUTH_USER_ENV: &str = "AUTH_USER";
pub const AUTH_TOKEN_ENV: &str = "AUTH_TOKEN";

#[derive(Debug, Clone)]
pub enum Auth {
    Basic { username: String, api_token: String },
}

impl Auth {
    /// 環境変数 AUTH_USER / AUTH_TOKEN からBasic認証情報を読み込む
    pub fn from_env() -> Result<Self> {
        let username = non_empty_env(AUTH_USER_ENV)?;
        let api_token = non_empty_env(AUTH_TOKEN_ENV)?;

        Ok(Auth::Basic { username, api_token })
    }

    fn header_value(&self) -> String {
        match self {
            Auth::Basic { username, api_token } => {
                let auth_value = format!("{}:{}", username, api_token);
                let encoded =
                    base64::engine::general_purpose::STANDARD.encode(auth_value.as_bytes());
                format!("Basic {}", encoded)
            }
        }
    }
}

fn non_empty_env(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(Error::ConfigurationMissing(format!(
            "環境変数 {} が未定義",
            name
        ))),
    }
}

#[derive(Debug, Clone)]
pub struct JiraConfig {
    pub base_url: String,
    pub api_version: String,
    pub auth: Auth,
}

impl JiraConfig {
    pub fn new(base_url: impl Into<String>, api_version: impl Into<String>, auth: Auth) -> Result<Self> {
        let base_url = base_url.into();

        // Validate URL
        let _ = Url::parse(&base_url)
            .map_err(|_| Error::InvalidConfiguration("Invalid base URL".to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_version: api_version.into(),
            auth,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/rest/api/{}{}", self.base_url, self.api_version, path)
    }
}

/// レポート作成に必要なJira REST APIの操作
#[async_trait]
pub trait JiraApi: Send + Sync {
    /// 課題検索（1ページ分）
    async fn search(&self, request: &SearchRequest) -> Result<SearchPage>;

    /// 保存済み検索フィルターのJQLを取得
    async fn filter_jql(&self, filter_id: &str) -> Result<String>;

    /// 課題の作業ログを取得
    async fn worklogs(&self, issue_key: &str, query: &WorklogQuery) -> Result<WorklogPage>;
}

#[derive(Debug, Deserialize)]
struct FilterResponse {
    #[serde(default)]
    jql: String,
}

#[derive(Debug, Clone)]
pub struct JiraClient {
    pub(crate) client: Client,
    pub(crate) config: Arc<JiraConfig>,
}

impl JiraClient {
    pub fn new(config: JiraConfig) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        // 認証ヘッダーを追加
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&config.auth.header_value())
                .map_err(|_| Error::InvalidConfiguration("Invalid auth header".to_string()))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Unexpected(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &JiraConfig {
        &self.config
    }

    async fn parse_response<T>(response: reqwest::Response) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Error::ApiError { status, message });
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    pub(crate) async fn get<T, Q>(&self, path: &str, query: &Q) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
        Q: serde::Serialize + ?Sized,
    {
        let url = self.config.endpoint(path);

        let response = self.client.get(&url).query(query).send().await?;

        Self::parse_response(response).await
    }

    pub(crate) async fn post<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
        B: serde::Serialize,
    {
        let url = self.config.endpoint(path);

        let response = self.client.post(&url).json(body).send().await?;

        Self::parse_response(response).await
    }
}

#[async_trait]
impl JiraApi for JiraClient {
    async fn search(&self, request: &SearchRequest) -> Result<SearchPage> {
        self.post("/search", request).await
    }

    async fn filter_jql(&self, filter_id: &str) -> Result<String> {
        let path = format!("/filter/{}", urlencoding::encode(filter_id));
        let response: FilterResponse = self.get(&path, &[] as &[(&str, &str)]).await?;
        Ok(response.jql)
    }

    async fn worklogs(&self, issue_key: &str, query: &WorklogQuery) -> Result<WorklogPage> {
        let path = format!("/issue/{}/worklog", urlencoding::encode(issue_key));
        self.get(&path, query).await
    }
}
