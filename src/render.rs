use std::cmp::Ordering;
use std::io::Write;

use crate::error::Result;
use crate::models::{Issue, SearchPage, Worklog, WorklogPage};
use crate::projection::{DurationFormat, Projectable};

/// 先頭列（主キー）の見出し
pub const KEY_LABEL: &str = "キー";

const FIELD_LABELS: [(&str, &str); 10] = [
    ("summary", "概要"),
    ("status", "ステータス"),
    ("timeoriginalestimate", "初期見積もり"),
    ("timespent", "消費時間"),
    ("aggregatetimeoriginalestimate", "Σ初期見積もり"),
    ("aggregatetimespent", "Σ消費時間"),
    ("started", "開始日時"),
    ("author.displayname", "表示名"),
    ("author.emailaddress", "メールアドレス"),
    ("timespentseconds", "消費時間"),
];

/// フィールド名の表示ラベル（無ければフィールド名のまま）
pub fn field_label(field_name: &str) -> &str {
    let lower = field_name.to_lowercase();
    FIELD_LABELS
        .iter()
        .find(|(name, _)| *name == lower)
        .map(|(_, label)| *label)
        .unwrap_or(field_name)
}

pub fn header_row(field_names: &[String]) -> Vec<String> {
    std::iter::once(KEY_LABEL.to_string())
        .chain(field_names.iter().map(|f| field_label(f).to_string()))
        .collect()
}

/// 課題の並び順（キーの文字列順）
pub fn compare_issues(a: &Issue, b: &Issue) -> Ordering {
    a.key.cmp(&b.key)
}

/// 作業ログの並び順（課題キー、同じなら開始日時の文字列順）
pub fn compare_worklogs(a: &Worklog, b: &Worklog) -> Ordering {
    a.issue_key
        .cmp(&b.issue_key)
        .then_with(|| a.started.cmp(&b.started))
}

/// 見出し行と並び替え済みの各行をCSVとして書き出す
///
/// 書き込みに失敗した時点で中断してエラーを返す。
pub fn render_rows<E, W>(
    mut entities: Vec<&E>,
    compare: fn(&E, &E) -> Ordering,
    field_names: &[String],
    format: &DurationFormat,
    sink: W,
) -> Result<()>
where
    E: Projectable,
    W: Write,
{
    entities.sort_by(|a, b| compare(a, b));

    let mut writer = csv::Writer::from_writer(sink);
    writer.write_record(header_row(field_names))?;
    for entity in entities {
        writer.write_record(entity.to_row(field_names, format))?;
    }
    writer.flush()?;

    Ok(())
}

pub fn render_issues<W: Write>(
    pages: &[SearchPage],
    field_names: &[String],
    format: &DurationFormat,
    sink: W,
) -> Result<()> {
    let issues: Vec<&Issue> = pages.iter().flat_map(|p| p.issues.iter()).collect();
    render_rows(issues, compare_issues, field_names, format, sink)
}

pub fn render_worklogs<W: Write>(
    pages: &[WorklogPage],
    field_names: &[String],
    format: &DurationFormat,
    sink: W,
) -> Result<()> {
    let worklogs: Vec<&Worklog> = pages.iter().flat_map(|p| p.worklogs.iter()).collect();
    render_rows(worklogs, compare_worklogs, field_names, format, sink)
}
