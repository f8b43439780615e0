use serde::{Deserialize, Serialize};

/// 作業ログの記録者
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorklogAuthor {
    #[serde(rename = "displayName", default)]
    pub display_name: String,
    #[serde(rename = "emailAddress", default)]
    pub email_address: String,
}

/// 作業ログ1件
///
/// APIレスポンスには親課題のキーが含まれないため、取得後に `issue_key` を埋める。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Worklog {
    #[serde(skip_deserializing, default)]
    pub issue_key: String,
    #[serde(default)]
    pub author: WorklogAuthor,
    #[serde(default)]
    pub started: String,
    #[serde(rename = "timeSpentSeconds", default)]
    pub time_spent_seconds: i64,
}

/// 作業ログ取得結果の1ページ
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorklogPage {
    #[serde(rename = "startAt", default)]
    pub start_at: u32,
    #[serde(rename = "maxResults", default)]
    pub max_results: u32,
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub worklogs: Vec<Worklog>,
}

impl WorklogPage {
    pub fn is_not_empty(&self) -> bool {
        self.total > 0 && !self.worklogs.is_empty()
    }

    /// 全作業ログに親課題のキーを設定する
    pub fn stamp_issue_key(&mut self, key: &str) {
        for worklog in &mut self.worklogs {
            worklog.issue_key = key.to_string();
        }
    }
}

/// 作業ログエンドポイントのクエリパラメータ
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorklogQuery {
    #[serde(rename = "startAt")]
    pub start_at: u32,
    #[serde(rename = "maxResults")]
    pub max_results: u32,
    /// 対象月初日のエポックミリ秒
    #[serde(rename = "startedAfter")]
    pub started_after: i64,
}

impl WorklogQuery {
    /// 1リクエストで全件を取得するための上限値
    pub const MAX_RESULTS: u32 = 1_048_576;

    pub fn started_after(started_after: i64) -> Self {
        Self {
            start_at: 0,
            max_results: Self::MAX_RESULTS,
            started_after,
        }
    }
}
