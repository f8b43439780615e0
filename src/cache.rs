use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::models::SearchPage;

/// プロセス内メモ化キャッシュ
///
/// マップ全体を1つのMutexで保護する。期限切れや追い出しは行わない。
#[derive(Debug)]
pub struct MemoCache<V> {
    memo: Mutex<HashMap<String, V>>,
}

impl<V: Clone> MemoCache<V> {
    pub fn new() -> Self {
        Self {
            memo: Mutex::new(HashMap::new()),
        }
    }

    /// 値を保存する（既存の値は上書き）
    pub fn put(&self, key: impl Into<String>, value: V) {
        let mut memo = self.memo.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        memo.insert(key.into(), value);
    }

    /// 保存済みの値を取得する
    pub fn get(&self, key: &str) -> Option<V> {
        let memo = self.memo.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        memo.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.memo
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V: Clone> Default for MemoCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// プロセス内で共有するレスポンスキャッシュ
///
/// フィルターIDごとのJQLと、リクエストボディごとの検索結果を保持する。
/// キーは接続先（ベースURLとAPIバージョン）ごとに分かれる。
#[derive(Debug, Default)]
pub struct ResponseCache {
    filters: MemoCache<String>,
    searches: MemoCache<SearchPage>,
}

impl ResponseCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn filter_key(endpoint: &str, filter_id: &str) -> String {
        format!("filter:{}:{}", endpoint, filter_id)
    }

    pub fn search_key(endpoint: &str, request_body: &str) -> String {
        format!("search:{}:{}", endpoint, request_body)
    }

    pub fn filters(&self) -> &MemoCache<String> {
        &self.filters
    }

    pub fn searches(&self) -> &MemoCache<SearchPage> {
        &self.searches
    }
}
