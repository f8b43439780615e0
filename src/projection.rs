//! エンティティを出力用の文字列の行に変換する
//!
//! フィールド名からアクセサ関数への対応表をエンティティ種別ごとに1度だけ作り、
//! 名前で引いて値を取り出す。対応の無いフィールドは空文字になる。

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::models::{Issue, Worklog};

const SECONDS_PER_HOUR: f64 = 60.0 * 60.0;

/// 時間の表示単位
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Hours,
    Days,
    Months,
}

impl TimeUnit {
    /// `h`/`hh`、`d`/`dd`、`m`/`mm` を解釈する（大文字小文字は問わない）
    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_lowercase().as_str() {
            "h" | "hh" => Some(Self::Hours),
            "d" | "dd" => Some(Self::Days),
            "m" | "mm" => Some(Self::Months),
            _ => None,
        }
    }
}

/// 秒数を表示単位に換算して小数2桁で整形する
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DurationFormat {
    unit: Option<TimeUnit>,
    hours_per_day: u32,
    days_per_month: u32,
}

impl DurationFormat {
    pub fn new(unit_code: &str, hours_per_day: u32, days_per_month: u32) -> Self {
        Self {
            unit: TimeUnit::from_code(unit_code),
            hours_per_day,
            days_per_month,
        }
    }

    fn seconds_per_unit(&self) -> Option<f64> {
        let per_day = SECONDS_PER_HOUR * self.hours_per_day as f64;
        let seconds = match self.unit? {
            TimeUnit::Hours => SECONDS_PER_HOUR,
            TimeUnit::Days => per_day,
            TimeUnit::Months => per_day * self.days_per_month as f64,
        };
        (seconds > 0.0).then_some(seconds)
    }

    pub fn format(&self, seconds: i64) -> String {
        let value = match self.seconds_per_unit() {
            Some(per_unit) => seconds as f64 / per_unit,
            None => 0.0,
        };
        format!("{:.2}", value)
    }
}

pub type Accessor<E> = fn(&E, &DurationFormat) -> String;

/// フィールド名 → アクセサの対応表
pub struct FieldRegistry<E> {
    accessors: HashMap<&'static str, Accessor<E>>,
}

impl<E> FieldRegistry<E> {
    fn new(entries: &[(&'static str, Accessor<E>)]) -> Self {
        Self {
            accessors: entries.iter().copied().collect(),
        }
    }

    pub fn get(&self, field_name: &str) -> Option<Accessor<E>> {
        self.accessors.get(field_name.to_lowercase().as_str()).copied()
    }
}

/// 行として出力できるエンティティ
pub trait Projectable: Sized + 'static {
    fn primary_key(&self) -> &str;

    fn registry() -> &'static FieldRegistry<Self>;

    /// 対応表に無いフィールドの値
    fn fallback(&self, _field_name: &str) -> Option<String> {
        None
    }

    /// 先頭列を主キー、以降を指定フィールドの順に並べた行を作る
    fn to_row(&self, field_names: &[String], format: &DurationFormat) -> Vec<String> {
        let registry = Self::registry();

        let mut row = Vec::with_capacity(field_names.len() + 1);
        row.push(self.primary_key().to_string());
        for field_name in field_names {
            let value = match registry.get(field_name) {
                Some(accessor) => accessor(self, format),
                None => self.fallback(field_name).unwrap_or_default(),
            };
            row.push(value);
        }
        row
    }
}

fn format_seconds(seconds: Option<i64>, format: &DurationFormat) -> String {
    format.format(seconds.unwrap_or(0))
}

static ISSUE_FIELDS: LazyLock<FieldRegistry<Issue>> = LazyLock::new(|| {
    let entries: [(&'static str, Accessor<Issue>); 6] = [
        ("summary", |i, _| i.fields.summary.clone()),
        ("timespent", |i, f| format_seconds(i.fields.timespent, f)),
        ("timeoriginalestimate", |i, f| {
            format_seconds(i.fields.timeoriginalestimate, f)
        }),
        ("aggregatetimespent", |i, f| {
            format_seconds(i.fields.aggregatetimespent, f)
        }),
        ("aggregatetimeoriginalestimate", |i, f| {
            format_seconds(i.fields.aggregatetimeoriginalestimate, f)
        }),
        ("status", |i, _| {
            i.fields
                .status
                .as_ref()
                .map(|s| s.name.clone())
                .unwrap_or_default()
        }),
    ];
    FieldRegistry::new(&entries)
});

static WORKLOG_FIELDS: LazyLock<FieldRegistry<Worklog>> = LazyLock::new(|| {
    let entries: [(&'static str, Accessor<Worklog>); 5] = [
        ("key", |w, _| w.issue_key.clone()),
        ("started", |w, _| w.started.clone()),
        ("timespentseconds", |w, f| f.format(w.time_spent_seconds)),
        ("author.displayname", |w, _| w.author.display_name.clone()),
        ("author.emailaddress", |w, _| w.author.email_address.clone()),
    ];
    FieldRegistry::new(&entries)
});

impl Projectable for Issue {
    fn primary_key(&self) -> &str {
        &self.key
    }

    fn registry() -> &'static FieldRegistry<Self> {
        &ISSUE_FIELDS
    }

    /// 固定フィールド以外は、レスポンスに含まれるスカラー値をそのまま出す
    ///
    /// レスポンスのキーは `lastViewed` のようなキャメルケースのまま保持されるため、
    /// 大文字小文字を区別せずに照合する。
    fn fallback(&self, field_name: &str) -> Option<String> {
        let (_, value) = self
            .fields
            .other_fields
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(field_name))?;
        match value {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            serde_json::Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

impl Projectable for Worklog {
    fn primary_key(&self) -> &str {
        &self.issue_key
    }

    fn registry() -> &'static FieldRegistry<Self> {
        &WORKLOG_FIELDS
    }
}
