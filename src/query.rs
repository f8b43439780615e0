use chrono::{Datelike, Months, NaiveDate, TimeZone, Utc};

/// 対象年月（yyyy-MM）をその月の1日として解釈する
pub fn parse_year_month(year_month: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{}-01", year_month.trim()), "%Y-%m-%d").ok()
}

/// `target` の月から `current` の月までの暦月差（過去なら負数）
pub fn month_offset(target: NaiveDate, current: NaiveDate) -> i32 {
    (target.year() * 12 + target.month0() as i32) - (current.year() * 12 + current.month0() as i32)
}

/// 対象年月の期間条件を生成する
///
/// 対象月が今月より後の場合は `None`（丸めずに拒否する）。
pub fn date_condition(target_year_month: &str, worklog: bool, today: NaiveDate) -> Option<String> {
    let target = parse_year_month(target_year_month)?;

    let offset = month_offset(target, today);
    if offset > 0 {
        return None;
    }

    let field = if worklog { "worklogDate" } else { "updated" };
    Some(format!(
        "{field} >= startOfMonth({offset}) AND {field} <= endOfMonth({offset})"
    ))
}

/// 元のJQLに期間条件を合成する
///
/// 元のJQLに既に期間条件（worklogDate / updated）がある場合は何もしない。
/// `order by` がある場合はその直前に条件を差し込む。
pub fn compose_jql(base_query: &str, condition: &str) -> String {
    if condition.is_empty() {
        return base_query.to_string();
    }

    // 探す語はすべてASCIIなので、バイト位置が変わらない ASCII 小文字化で照合する
    let lower = base_query.to_ascii_lowercase();
    if lower.contains("worklogdate") || lower.contains("updated") {
        return base_query.to_string();
    }

    if base_query.trim().is_empty() {
        return condition.to_string();
    }

    if let Some(i) = lower.find("order by") {
        return format!(
            "{} AND ({}) {}",
            &base_query[..i],
            condition,
            &base_query[i..]
        );
    }

    format!("{} AND ({})", base_query, condition)
}

/// 作業ログ取得の `startedAfter` に使う月初のエポックミリ秒（UTC）
///
/// 対象年月が無い、または解釈できない場合は前月を使う。
pub fn started_after_millis(target_year_month: Option<&str>, today: NaiveDate) -> i64 {
    let month = target_year_month
        .and_then(parse_year_month)
        .unwrap_or_else(|| previous_month(today));

    let first_day = month.with_day(1).unwrap_or(month);
    Utc.from_utc_datetime(&first_day.and_time(chrono::NaiveTime::MIN))
        .timestamp_millis()
}

fn previous_month(today: NaiveDate) -> NaiveDate {
    today
        .with_day(1)
        .and_then(|d| d.checked_sub_months(Months::new(1)))
        .unwrap_or(today)
}
