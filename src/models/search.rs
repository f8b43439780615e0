use super::Issue;
use serde::{Deserialize, Serialize};

/// 検索エンドポイントへのリクエストボディ
///
/// シリアライズ結果はキャッシュキーにもなるため、フィールド順は固定。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub fields: Vec<String>,

    #[serde(rename = "startAt")]
    pub start_at: u32,

    #[serde(rename = "maxResults")]
    pub max_results: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub jql: Option<String>,
}

/// 検索結果の1ページ
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchPage {
    #[serde(rename = "startAt", default)]
    pub start_at: u32,

    #[serde(rename = "maxResults", default)]
    pub max_results: u32,

    #[serde(default)]
    pub total: u32,

    #[serde(default)]
    pub issues: Vec<Issue>,
}

impl SearchPage {
    pub fn is_not_empty(&self) -> bool {
        self.total > 0 && !self.issues.is_empty()
    }

    /// このページ以降に残っているページ番号（1始まり）
    ///
    /// `total` は1ページ目の値を信頼する前提。
    pub fn rest_pages(&self) -> Vec<u32> {
        if self.max_results == 0 {
            return Vec::new();
        }

        let current = self.start_at / self.max_results + 1;
        let last = self.total / self.max_results + 1;

        (current + 1..=last).collect()
    }

    /// 残りページの開始オフセット
    pub fn rest_offsets(&self) -> Vec<u32> {
        self.rest_pages()
            .into_iter()
            .map(|page| (page - 1) * self.max_results)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page(start_at: u32, max_results: u32, total: u32) -> SearchPage {
        SearchPage {
            start_at,
            max_results,
            total,
            issues: Vec::new(),
        }
    }

    #[test]
    fn test_search_request_serialization() {
        let request = SearchRequest {
            fields: vec!["summary".to_string(), "status".to_string()],
            start_at: 50,
            max_results: 50,
            jql: None,
        };

        let body = serde_json::to_string(&request).unwrap();

        assert_eq!(
            body,
            r#"{"fields":["summary","status"],"startAt":50,"maxResults":50}"#
        );
    }

    #[test]
    fn test_search_request_with_jql() {
        let request = SearchRequest {
            fields: vec![],
            start_at: 0,
            max_results: 10,
            jql: Some("status = Closed".to_string()),
        };

        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["jql"], "status = Closed");
        assert_eq!(json["startAt"], 0);
    }

    #[test]
    fn test_rest_pages_from_first_page() {
        // Given: total=125, maxResults=50 の1ページ目
        let first = page(0, 50, 125);

        // Then: 残りは2,3ページ目（オフセット50,100）
        assert_eq!(first.rest_pages(), vec![2, 3]);
        assert_eq!(first.rest_offsets(), vec![50, 100]);
    }

    #[test]
    fn test_rest_pages_with_zero_total() {
        assert!(page(0, 50, 0).rest_pages().is_empty());
    }

    #[test]
    fn test_rest_pages_single_page() {
        assert!(page(0, 50, 3).rest_pages().is_empty());
    }

    #[test]
    fn test_rest_pages_from_middle_page() {
        // Given: 2ページ目から数える
        let second = page(50, 50, 180);

        // Then: 3,4ページ目が残る
        assert_eq!(second.rest_pages(), vec![3, 4]);
    }

    #[test]
    fn test_rest_pages_exact_multiple() {
        // 割り切れる場合も末尾に空ページを1つ含む
        assert_eq!(page(0, 50, 100).rest_offsets(), vec![50, 100]);
    }

    #[test]
    fn test_rest_pages_zero_page_size() {
        assert!(page(0, 0, 100).rest_pages().is_empty());
    }

    #[test]
    fn test_search_page_deserialization() {
        let json_data = json!({
            "expand": "names,schema",
            "startAt": 0,
            "maxResults": 50,
            "total": 1,
            "issues": [{
                "id": "10000",
                "key": "TEST-1",
                "fields": { "summary": "Test Issue" }
            }]
        });

        let result: SearchPage = serde_json::from_value(json_data).unwrap();

        assert_eq!(result.start_at, 0);
        assert_eq!(result.max_results, 50);
        assert_eq!(result.total, 1);
        assert!(result.is_not_empty());
        assert_eq!(result.issues[0].key, "TEST-1");
    }

    #[test]
    fn test_is_not_empty_requires_issues() {
        // total>0 でも課題が無ければ空扱い
        assert!(!page(0, 50, 10).is_not_empty());
    }
}
