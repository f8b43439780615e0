use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::Status;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Issue {
    #[serde(default)]
    pub id: String,
    pub key: String,
    #[serde(default)]
    pub fields: IssueFields,
}

/// 課題のフィールド
///
/// 時間系フィールドは秒単位。Jiraは未設定の場合 `null` を返すので `Option` で受ける。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssueFields {
    #[serde(default)]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timespent: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeoriginalestimate: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregatetimespent: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregatetimeoriginalestimate: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,

    // 上記以外のフィールドは動的に保持
    #[serde(flatten)]
    pub other_fields: HashMap<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_issue_deserialization() {
        let json_data = json!({
            "id": "10000",
            "key": "TEST-1",
            "self": "https://example.atlassian.net/rest/api/3/issue/10000",
            "fields": {
                "summary": "サマリ",
                "timespent": 7200,
                "timeoriginalestimate": null,
                "aggregatetimespent": 7200,
                "status": {
                    "name": "Closed",
                    "description": "done"
                },
                "customfield_10001": "Custom Value"
            }
        });

        let issue: Issue = serde_json::from_value(json_data).unwrap();

        assert_eq!(issue.id, "10000");
        assert_eq!(issue.key, "TEST-1");
        assert_eq!(issue.fields.summary, "サマリ");
        assert_eq!(issue.fields.timespent, Some(7200));
        assert_eq!(issue.fields.timeoriginalestimate, None);
        assert_eq!(issue.fields.status.as_ref().unwrap().name, "Closed");
        assert_eq!(
            issue.fields.other_fields.get("customfield_10001").unwrap(),
            "Custom Value"
        );
    }

    #[test]
    fn test_issue_without_fields() {
        // Given: fieldsを含まないレスポンス
        let json_data = json!({ "id": "1", "key": "TEST-2" });

        // When: デシリアライズ
        let issue: Issue = serde_json::from_value(json_data).unwrap();

        // Then: フィールドは既定値になる
        assert_eq!(issue.fields.summary, "");
        assert!(issue.fields.status.is_none());
    }
}
