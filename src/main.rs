use clap::Parser;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use jira_timespent_report::config::{
    DEFAULT_API_VERSION, DEFAULT_BASE_URL, DEFAULT_DAYS_PER_MONTH, DEFAULT_FIELDS,
    DEFAULT_HOURS_PER_DAY, DEFAULT_MAX_RESULTS, DEFAULT_QUERY, DEFAULT_TIME_UNIT,
};
use jira_timespent_report::server::{self, AppState, DEFAULT_HOST, DEFAULT_PORT};
use jira_timespent_report::{
    Auth, Error, JiraClient, JiraConfig, ReportConfig, Result, TimespentReport,
};

#[derive(Parser, Debug)]
#[command(name = "jira-timespent-report")]
#[command(about = "Jiraの課題・作業ログの消費時間をCSVで出力する")]
#[command(version)]
struct Args {
    /// JiraのベースURL
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    url: String,

    /// 検索に使うJQL
    #[arg(long, default_value = DEFAULT_QUERY)]
    query: String,

    /// 検索フィルターID（指定時はJQLより優先）
    #[arg(long, default_value = "")]
    filter: String,

    /// 出力するフィールド（カンマ区切り）
    #[arg(long, default_value = DEFAULT_FIELDS)]
    fields: String,

    /// 1ページの取得件数
    #[arg(long, default_value_t = DEFAULT_MAX_RESULTS)]
    maxresult: u32,

    /// REST APIのバージョン
    #[arg(long, default_value = DEFAULT_API_VERSION)]
    api: String,

    /// 時間の表示単位（hh / dd / mm）
    #[arg(long, default_value = DEFAULT_TIME_UNIT)]
    unit: String,

    /// 1日あたりの稼働時間
    #[arg(long, default_value_t = DEFAULT_HOURS_PER_DAY)]
    hours: u32,

    /// 1ヶ月あたりの稼働日数
    #[arg(long, default_value_t = DEFAULT_DAYS_PER_MONTH)]
    days: u32,

    /// 作業ログを出力する
    #[arg(long)]
    worklog: bool,

    /// 対象年月（yyyy-MM）
    #[arg(long, default_value = "")]
    targetym: String,

    /// 出力先ファイル（省略時は標準出力）
    #[arg(long)]
    output: Option<PathBuf>,

    /// HTTPサーバーとして起動する
    #[arg(long)]
    server: bool,

    #[arg(long, env = server::SERVER_HOST_ENV, default_value = DEFAULT_HOST)]
    host: String,

    #[arg(long, env = server::SERVER_PORT_ENV, default_value_t = DEFAULT_PORT)]
    port: u16,
}

impl Args {
    fn report_config(&self) -> ReportConfig {
        ReportConfig::new()
            .base_url(&self.url)
            .query(&self.query)
            .filter(&self.filter)
            .field_names(&self.fields)
            .max_results(self.maxresult)
            .api_version(&self.api)
            .time_unit(&self.unit)
            .hours_per_day(self.hours)
            .days_per_month(self.days)
            .worklog(self.worklog)
            .target_year_month(&self.targetym)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();

    // CSVを標準出力に出すため、ログは標準エラーへ
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "fatal");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<ExitCode> {
    let auth = Auth::from_env()?;
    let config = args.report_config();
    config.validate()?;

    if args.server {
        server::serve(AppState::new(config, auth), &args.host, args.port).await?;
        return Ok(ExitCode::SUCCESS);
    }

    let client = JiraClient::new(JiraConfig::new(&config.base_url, &config.api_version, auth)?)?;
    let report = TimespentReport::new(Arc::new(client), config);

    let outcome = report.search().await;
    for e in &outcome.errors {
        error!(error = %e, "search error");
    }

    // 取得できた分は出力する
    let rendered = match &args.output {
        Some(path) => File::create(path)
            .map_err(Error::from)
            .and_then(|file| report.render(&outcome, BufWriter::new(file))),
        None => report.render(&outcome, io::stdout().lock()),
    };
    if let Err(e) = rendered {
        error!(error = %e, "render error");
        return Ok(ExitCode::FAILURE);
    }

    info!(
        issues = outcome.issue_count(),
        worklogs = outcome.worklog_count(),
        "report written"
    );

    if outcome.errors.is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
