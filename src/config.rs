use std::collections::HashMap;
use tracing::warn;
use url::Url;

use crate::error::{Error, Result};
use crate::projection::DurationFormat;

pub const DEFAULT_BASE_URL: &str = "https://your-jira.atlassian.net";
pub const DEFAULT_QUERY: &str =
    "status = Closed AND updated >= startOfMonth(-1) AND updated <= endOfMonth(-1)";
pub const DEFAULT_FIELDS: &str = "summary,status,timespent,timeoriginalestimate,aggregatetimespent,aggregatetimeoriginalestimate";
pub const DEFAULT_MAX_RESULTS: u32 = 50;
pub const DEFAULT_API_VERSION: &str = "3";
pub const DEFAULT_TIME_UNIT: &str = "dd";
pub const DEFAULT_HOURS_PER_DAY: u32 = 8;
pub const DEFAULT_DAYS_PER_MONTH: u32 = 24;

/// 作業ログモードで出力するフィールド
pub const WORKLOG_FIELDS: [&str; 4] = [
    "started",
    "author.displayname",
    "author.emailaddress",
    "timespentseconds",
];

/// レポート作成の設定
///
/// 検索開始前にすべての値が揃っている必要がある。各コンポーネントへは値として渡す。
#[derive(Debug, Clone, PartialEq)]
pub struct ReportConfig {
    /// JiraのベースURL
    pub base_url: String,
    /// JQL
    pub query: String,
    /// 検索フィルターID（指定時はこちらのJQLが優先される）
    pub filter: Option<String>,
    /// 出力するフィールド名
    pub field_names: Vec<String>,
    /// 1ページの取得件数
    pub max_results: u32,
    /// REST APIのバージョン
    pub api_version: String,
    /// 時間の表示単位（hh / dd / mm）
    pub time_unit: String,
    /// 1日あたりの稼働時間
    pub hours_per_day: u32,
    /// 1ヶ月あたりの稼働日数
    pub days_per_month: u32,
    /// 作業ログを収集するかどうか
    pub worklog: bool,
    /// 対象年月（yyyy-MM）
    pub target_year_month: Option<String>,
}

impl ReportConfig {
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            query: DEFAULT_QUERY.to_string(),
            filter: None,
            field_names: split_field_names(DEFAULT_FIELDS),
            max_results: DEFAULT_MAX_RESULTS,
            api_version: DEFAULT_API_VERSION.to_string(),
            time_unit: DEFAULT_TIME_UNIT.to_string(),
            hours_per_day: DEFAULT_HOURS_PER_DAY,
            days_per_month: DEFAULT_DAYS_PER_MONTH,
            worklog: false,
            target_year_month: None,
        }
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = non_empty(filter.into());
        self
    }

    /// カンマ区切りのフィールド名を設定
    pub fn field_names(mut self, field_names: &str) -> Self {
        self.field_names = split_field_names(field_names);
        self
    }

    pub fn max_results(mut self, max_results: u32) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    pub fn time_unit(mut self, time_unit: impl Into<String>) -> Self {
        self.time_unit = time_unit.into();
        self
    }

    pub fn hours_per_day(mut self, hours: u32) -> Self {
        self.hours_per_day = hours;
        self
    }

    pub fn days_per_month(mut self, days: u32) -> Self {
        self.days_per_month = days;
        self
    }

    pub fn worklog(mut self, enabled: bool) -> Self {
        self.worklog = enabled;
        self
    }

    pub fn target_year_month(mut self, year_month: impl Into<String>) -> Self {
        self.target_year_month = non_empty(year_month.into());
        self
    }

    /// 実際に出力するフィールド
    ///
    /// 作業ログモードでは固定のフィールドになる。
    pub fn fields(&self) -> Vec<String> {
        if self.worklog {
            return WORKLOG_FIELDS.iter().map(|f| f.to_string()).collect();
        }
        self.field_names.clone()
    }

    /// 接続先（キャッシュキーの区別に使う）
    pub fn endpoint(&self) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), self.api_version)
    }

    pub fn duration_format(&self) -> DurationFormat {
        DurationFormat::new(&self.time_unit, self.hours_per_day, self.days_per_month)
    }

    /// 検索前の妥当性チェック
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.base_url).map_err(|e| {
            Error::InvalidConfiguration(format!("Invalid base URL [{}]: {}", self.base_url, e))
        })?;

        if self.max_results == 0 {
            return Err(Error::InvalidConfiguration(
                "maxresult must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// HTTPのクエリパラメータで設定を上書きする
    ///
    /// キーは大文字小文字を区別しない。解釈できない数値・真偽値は無視する。
    pub fn apply_query_params(&mut self, params: &HashMap<String, String>) {
        for (key, value) in params {
            match key.to_lowercase().as_str() {
                "baseurl" => self.base_url = value.clone(),
                "query" => self.query = value.clone(),
                "filter" => self.filter = non_empty(value.clone()),
                "fieldnames" => self.field_names = split_field_names(value),
                "maxresult" => parse_into(key, value, &mut self.max_results),
                "apiversion" => self.api_version = value.clone(),
                "timeunit" => self.time_unit = value.clone(),
                "hoursperday" => parse_into(key, value, &mut self.hours_per_day),
                "dayspermonth" => parse_into(key, value, &mut self.days_per_month),
                "worklog" => match parse_flag(value) {
                    Some(enabled) => self.worklog = enabled,
                    None => {
                        warn!(key = %key, value = %value, "ignoring unparsable query parameter")
                    }
                },
                "targetyearmonth" => self.target_year_month = non_empty(value.clone()),
                _ => {}
            }
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn split_field_names(field_names: &str) -> Vec<String> {
    field_names
        .split(',')
        .map(|f| f.trim())
        .filter(|f| !f.is_empty())
        .map(|f| f.to_string())
        .collect()
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

/// `1`/`t`/`true` 系と `0`/`f`/`false` 系を真偽値として解釈する
fn parse_flag(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

fn parse_into<T: std::str::FromStr>(key: &str, value: &str, target: &mut T) {
    match value.parse::<T>() {
        Ok(parsed) => *target = parsed,
        Err(_) => warn!(key, value, "ignoring unparsable query parameter"),
    }
}
