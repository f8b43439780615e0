//! 検索の全体制御
//!
//! 1ページ目で総件数を確定し、残りのページを並行取得する。作業ログモードでは
//! 取得した全課題について作業ログを並行取得する。

use chrono::{Local, NaiveDate};
use std::io::Write;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::cache::ResponseCache;
use crate::client::JiraApi;
use crate::config::ReportConfig;
use crate::error::{Error, Result};
use crate::fan_out::{Aggregated, MAX_WORKERS, fan_out};
use crate::models::{SearchPage, SearchRequest, WorklogPage, WorklogQuery};
use crate::query::{compose_jql, date_condition, started_after_millis};
use crate::render::{render_issues, render_worklogs};

/// ページの開始オフセット（エラー表示用）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageOffset(pub u32);

impl std::fmt::Display for PageOffset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "startAt={}", self.0)
    }
}

/// 検索結果一式
#[derive(Debug, Default)]
pub struct SearchOutcome {
    pub issues: Vec<SearchPage>,
    /// 作業ログモードでのみ `Some`
    pub worklogs: Option<Vec<WorklogPage>>,
    pub errors: Vec<Error>,
}

impl SearchOutcome {
    pub fn issue_count(&self) -> usize {
        self.issues.iter().map(|p| p.issues.len()).sum()
    }

    pub fn worklog_count(&self) -> usize {
        self.worklogs
            .iter()
            .flatten()
            .map(|p| p.worklogs.len())
            .sum()
    }
}

/// 消費時間レポートの検索と出力
///
/// キャッシュは複製したインスタンス間で共有され、同じリクエストの再取得を防ぐ。
/// 複数のレポートで共有する場合は `with_cache` で渡す。
#[derive(Clone)]
pub struct TimespentReport {
    api: Arc<dyn JiraApi>,
    config: Arc<ReportConfig>,
    cache: Arc<ResponseCache>,
    today: NaiveDate,
}

impl TimespentReport {
    pub fn new(api: Arc<dyn JiraApi>, config: ReportConfig) -> Self {
        Self {
            api,
            config: Arc::new(config),
            cache: ResponseCache::new(),
            today: Local::now().date_naive(),
        }
    }

    /// 基準日を差し替える（対象年月の計算に使う）
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// 外部で保持しているキャッシュを使う
    pub fn with_cache(mut self, cache: Arc<ResponseCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    /// 課題を検索し、作業ログモードなら作業ログも取得する
    pub async fn search(&self) -> SearchOutcome {
        info!(worklog = self.config.worklog, "search start");

        let issues = self.search_issues().await;
        let mut outcome = SearchOutcome {
            issues: issues.results,
            worklogs: None,
            errors: issues.errors,
        };

        if self.config.worklog {
            let worklogs = self.search_worklogs(&outcome.issues).await;
            outcome.worklogs = Some(worklogs.results);
            outcome.errors.extend(worklogs.errors);
        }

        info!(
            issues = outcome.issue_count(),
            worklogs = outcome.worklog_count(),
            errors = outcome.errors.len(),
            "search end"
        );
        outcome
    }

    /// 全ページの課題を取得する
    ///
    /// 1ページ目の取得エラーも他のページと同じエラー一覧に入る。1ページ目が
    /// 得られなければ空の検索結果として扱う。
    pub async fn search_issues(&self) -> Aggregated<SearchPage> {
        let mut aggregated = Aggregated::new();

        let first = match self.fetch_page(0).await {
            Ok(first) => first,
            Err(e) => {
                warn!(error = %e, "first page fetch failed");
                aggregated.errors.push(e);
                None
            }
        };
        let Some(first) = first else {
            return aggregated;
        };

        let offsets: Vec<PageOffset> = first.rest_offsets().into_iter().map(PageOffset).collect();
        debug!(
            total = first.total,
            max_results = first.max_results,
            rest_pages = offsets.len(),
            "first page fetched"
        );
        aggregated.results.push(first);

        let this = self.clone();
        let rest = fan_out(offsets, MAX_WORKERS, move |offset: PageOffset| {
            let this = this.clone();
            async move { this.fetch_page(offset.0).await }
        })
        .await;
        aggregated.extend(rest);

        aggregated
    }

    /// 取得済みの全課題について作業ログを取得する
    pub async fn search_worklogs(&self, issues: &[SearchPage]) -> Aggregated<WorklogPage> {
        let keys: Vec<String> = issues
            .iter()
            .flat_map(|page| page.issues.iter().map(|issue| issue.key.clone()))
            .collect();

        let query = WorklogQuery::started_after(started_after_millis(
            self.config.target_year_month.as_deref(),
            self.today,
        ));

        let this = self.clone();
        fan_out(keys, MAX_WORKERS, move |key: String| {
            let this = this.clone();
            let query = query.clone();
            async move { this.fetch_worklogs(&key, &query).await }
        })
        .await
    }

    /// 1課題の作業ログを取得する。作業ログが無ければ `None`
    async fn fetch_worklogs(&self, issue_key: &str, query: &WorklogQuery) -> Result<Option<WorklogPage>> {
        let mut page = self.api.worklogs(issue_key, query).await?;
        if !page.is_not_empty() {
            return Ok(None);
        }
        page.stamp_issue_key(issue_key);
        Ok(Some(page))
    }

    /// 検索結果をCSVで出力する
    ///
    /// 作業ログモードでは作業ログの表、それ以外は課題の表を出力する。
    pub fn render<W: Write>(&self, outcome: &SearchOutcome, sink: W) -> Result<()> {
        let fields = self.config.fields();
        let format = self.config.duration_format();

        match &outcome.worklogs {
            Some(worklogs) => render_worklogs(worklogs, &fields, &format, sink),
            None => render_issues(&outcome.issues, &fields, &format, sink),
        }
    }

    /// 実際に送るJQL
    ///
    /// フィルターIDが指定されていれば、そのJQLで置き換える（合成はしない）。
    pub async fn effective_jql(&self) -> Option<String> {
        let mut jql = Some(self.config.query.clone()).filter(|q| !q.is_empty());

        if let Some(target) = &self.config.target_year_month {
            if let Some(condition) = date_condition(target, self.config.worklog, self.today) {
                jql = Some(compose_jql(jql.as_deref().unwrap_or(""), &condition));
            }
        }

        if let Some(filter_id) = &self.config.filter {
            match self.filter_jql(filter_id).await {
                Ok(filter_jql) => jql = Some(filter_jql),
                Err(e) => warn!(filter_id = %filter_id, error = %e, "filter lookup failed"),
            }
        }

        jql
    }

    async fn filter_jql(&self, filter_id: &str) -> Result<String> {
        let key = ResponseCache::filter_key(&self.config.endpoint(), filter_id);
        if let Some(jql) = self.cache.filters().get(&key) {
            debug!(key = %key, "cache hit");
            return Ok(jql);
        }

        let jql = self.api.filter_jql(filter_id).await?;
        self.cache.filters().put(key, jql.clone());
        Ok(jql)
    }

    /// 1ページ取得する。空のページは `None`
    async fn fetch_page(&self, start_at: u32) -> Result<Option<SearchPage>> {
        let request = SearchRequest {
            fields: self.config.fields(),
            start_at,
            max_results: self.config.max_results,
            jql: self.effective_jql().await,
        };
        debug!(start_at, jql = ?request.jql, "search");

        let key = ResponseCache::search_key(
            &self.config.endpoint(),
            &serde_json::to_string(&request)?,
        );
        let page = match self.cache.searches().get(&key) {
            Some(page) => {
                debug!(key = %key, "cache hit");
                page
            }
            None => {
                let page = self.api.search(&request).await?;
                self.cache.searches().put(key, page.clone());
                page
            }
        };

        Ok(page.is_not_empty().then_some(page))
    }
}
