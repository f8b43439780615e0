//! 上限付きワーカープールによる並行取得
//!
//! ページ取得と作業ログ取得の両方で使う共通の骨格。作業キューを全ワーカーで共有し、
//! キューが閉じられたらワーカーは終了する。結果の順序は保証しない。

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// 同時に動かすワーカー数の上限
pub const MAX_WORKERS: usize = 10;

/// 並行取得の集約結果
///
/// 一部の取得が失敗しても、成功した分の結果とエラー一覧の両方を返す。
#[derive(Debug)]
pub struct Aggregated<T> {
    pub results: Vec<T>,
    pub errors: Vec<Error>,
}

impl<T> Aggregated<T> {
    pub fn new() -> Self {
        Self {
            results: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn extend(&mut self, other: Aggregated<T>) {
        self.results.extend(other.results);
        self.errors.extend(other.errors);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

impl<T> Default for Aggregated<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// 作業項目数とワーカー上限から実際のワーカー数を決める
pub fn worker_count(item_count: usize, max_workers: usize) -> usize {
    item_count.min(max_workers.max(1))
}

/// 作業項目ごとに `fetch` を上限付きの並行度で実行する
///
/// `fetch` が `Ok(None)` を返した項目は空の結果として集約から除外する。
/// エラーはワーカー番号と作業項目を付けて収集し、他の取得は継続する。
pub async fn fan_out<T, R, F, Fut>(items: Vec<T>, max_workers: usize, fetch: F) -> Aggregated<R>
where
    T: Display + Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<R>>> + Send + 'static,
{
    let mut aggregated = Aggregated::new();
    if items.is_empty() {
        return aggregated;
    }

    let workers = worker_count(items.len(), max_workers);
    debug!(items = items.len(), workers, "dispatching fan-out");

    let (work_tx, work_rx) = mpsc::channel::<T>(items.len());
    let work_rx = Arc::new(Mutex::new(work_rx));
    let (result_tx, mut result_rx) = mpsc::unbounded_channel::<R>();
    let (error_tx, mut error_rx) = mpsc::unbounded_channel::<Error>();
    let fetch = Arc::new(fetch);

    let mut join_set = JoinSet::new();
    for worker in 0..workers {
        let work_rx = Arc::clone(&work_rx);
        let result_tx = result_tx.clone();
        let error_tx = error_tx.clone();
        let fetch = Arc::clone(&fetch);

        join_set.spawn(async move {
            loop {
                let next = work_rx.lock().await.recv().await;
                let Some(item) = next else {
                    break;
                };

                let label = item.to_string();
                match fetch(item).await {
                    // 受信側はすべてのワーカーの終了後まで生きているので送信は失敗しない
                    Ok(Some(result)) => {
                        result_tx.send(result).ok();
                    }
                    Ok(None) => debug!(worker, item = %label, "empty result"),
                    Err(e) => {
                        warn!(worker, item = %label, error = %e, "fetch failed");
                        error_tx
                            .send(Error::WorkerFailed {
                                worker,
                                item: label,
                                source: Box::new(e),
                            })
                            .ok();
                    }
                }
            }
        });
    }
    drop(result_tx);
    drop(error_tx);

    for item in items {
        if work_tx.send(item).await.is_err() {
            break;
        }
    }
    drop(work_tx);

    while let Some(joined) = join_set.join_next().await {
        if let Err(e) = joined {
            aggregated
                .errors
                .push(Error::Unexpected(format!("worker task failed: {}", e)));
        }
    }

    while let Some(result) = result_rx.recv().await {
        aggregated.results.push(result);
    }
    while let Some(error) = error_rx.recv().await {
        aggregated.errors.push(error);
    }

    aggregated
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_worker_count() {
        assert_eq!(worker_count(2, MAX_WORKERS), 2);
        assert_eq!(worker_count(37, MAX_WORKERS), 10);
        assert_eq!(worker_count(0, MAX_WORKERS), 0);
        assert_eq!(worker_count(5, 0), 1);
    }

    #[tokio::test]
    async fn test_fan_out_empty_items() {
        let aggregated: Aggregated<u32> =
            fan_out(Vec::<u32>::new(), MAX_WORKERS, |n| async move { Ok::<_, Error>(Some(n)) }).await;

        assert!(aggregated.results.is_empty());
        assert!(!aggregated.has_errors());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_fan_out_collects_all_results() {
        // Given: 25件の作業項目
        let items: Vec<u32> = (0..25).collect();

        // When: 2倍にして返す
        let aggregated = fan_out(items, MAX_WORKERS, |n| async move { Ok::<_, Error>(Some(n * 2)) }).await;

        // Then: 順不同ですべての結果が揃う
        let mut results = aggregated.results;
        results.sort();
        assert_eq!(results, (0..25).map(|n| n * 2).collect::<Vec<_>>());
        assert!(aggregated.errors.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_fan_out_never_exceeds_worker_ceiling() {
        // Given: 同時実行数を計測する取得関数
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let items: Vec<u32> = (0..37).collect();

        let (f, p) = (Arc::clone(&in_flight), Arc::clone(&peak));
        let aggregated = fan_out(items, MAX_WORKERS, move |n| {
            let (in_flight, peak) = (Arc::clone(&f), Arc::clone(&p));
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, Error>(Some(n))
            }
        })
        .await;

        // Then: 37件すべて処理され、同時実行は10を超えない
        assert_eq!(aggregated.results.len(), 37);
        assert!(peak.load(Ordering::SeqCst) <= MAX_WORKERS);
        assert!(peak.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_fan_out_errors_carry_worker_and_item() {
        // Given: すべて失敗する取得関数
        let items: Vec<u32> = (0..37).collect();

        // When: 実行
        let aggregated: Aggregated<u32> = fan_out(items, MAX_WORKERS, |n| async move {
            Err(Error::ApiError {
                status: 500,
                message: format!("bad {}", n),
            })
        })
        .await;

        // Then: 全件がエラーとして集約され、ワーカー番号は上限未満
        assert!(aggregated.results.is_empty());
        assert_eq!(aggregated.errors.len(), 37);

        let mut items_seen = HashSet::new();
        for error in &aggregated.errors {
            match error {
                Error::WorkerFailed { worker, item, .. } => {
                    assert!(*worker < MAX_WORKERS);
                    items_seen.insert(item.clone());
                }
                other => panic!("Expected WorkerFailed, got {:?}", other),
            }
        }
        assert_eq!(items_seen.len(), 37);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_fan_out_partial_failure_and_empty_results() {
        // Given: 3の倍数は失敗、5の倍数は空、それ以外は成功
        let items: Vec<u32> = (1..=15).collect();

        let aggregated = fan_out(items, MAX_WORKERS, |n| async move {
            if n % 3 == 0 {
                Err(Error::ApiError {
                    status: 500,
                    message: n.to_string(),
                })
            } else if n % 5 == 0 {
                Ok(None)
            } else {
                Ok(Some(n))
            }
        })
        .await;

        // Then: 失敗は兄弟の取得を止めず、空の結果は除外される
        let mut results = aggregated.results;
        results.sort();
        assert_eq!(results, vec![1, 2, 4, 7, 8, 11, 13, 14]);
        assert_eq!(aggregated.errors.len(), 5);
    }
}
