use anyhow::{Context, Result};
use chrono::{Duration, Local, NaiveDate};
use log::info;
use toggl_accounting::{ReportQuery, TimeEntry};

use crate::cli::repository::TogglRepository;

/// 期間内のタイムエントリーを出力するためのサブコマンド。
#[derive(Debug, Default, clap::Args)]
pub struct ReportArgs {
    #[clap(
        short = 'f',
        long = "from",
        help = "First day of the report in the format YYYY-MM-DD",
        parse(try_from_str = parse_date),
    )]
    from: Option<NaiveDate>,

    #[clap(
        short = 't',
        long = "to",
        help = "Last day of the report in the format YYYY-MM-DD",
        parse(try_from_str = parse_date),
    )]
    to: Option<NaiveDate>,

    #[clap(short = 'p', long = "project", help = "Only entries of this project id")]
    project: Option<i64>,

    #[clap(long = "tag", help = "Only entries with this tag id, may be repeated")]
    tags: Vec<i64>,
}

pub struct ReportCommand<'a, T: TogglRepository> {
    toggl_client: &'a T,
}

impl<'a, T: TogglRepository> ReportCommand<'a, T> {
    /// 新しい`ReportCommand`を返す。
    ///
    /// # Arguments
    /// * `toggl_client` - Toggl APIと通信するためのリポジトリ
    pub fn new(toggl_client: &'a T) -> Self {
        Self { toggl_client }
    }

    /// `report`サブコマンドの処理を行う。
    ///
    /// 期間が指定されていない場合は、Localタイムゾーンの今日から2ヶ月前から2日後までとする。
    ///
    /// # Arguments
    ///
    /// * `report` - `report`サブコマンドの引数
    pub async fn run(&self, report: ReportArgs) -> Result<Vec<TimeEntry>> {
        let query = build_query(report, Local::now().date_naive())?;
        info!("From: {}, To: {}", query.from, query.to);

        let time_entries = self
            .toggl_client
            .read_time_entries(&query)
            .await
            .context("Failed to retrieve time entries")?;

        info!("Time entries retrieved successfully.");

        Ok(time_entries)
    }
}

/// 引数から検索条件を作る。
fn build_query(report: ReportArgs, today: NaiveDate) -> Result<ReportQuery> {
    let from = match report.from {
        Some(from) => from,
        None => today
            .checked_sub_months(chrono::Months::new(2))
            .context("Failed to go back two months")?,
    };
    let to = report.to.unwrap_or(today + Duration::days(2));
    anyhow::ensure!(from <= to, "--from {} is after --to {}", from, to);

    Ok(ReportQuery {
        project_id: report.project,
        tag_ids: report.tags,
        ..ReportQuery::new(from, to)
    })
}

/// 日付をパースする。
fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("Failed to parse date: {}", s))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use mockall::predicate::function;
    use rstest::rstest;
    use toggl_accounting::ReportQuery;

    use super::{build_query, parse_date, ReportArgs, ReportCommand};
    use crate::cli::repository::MockTogglRepository;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[tokio::test]
    async fn test_report_command_no_date() {
        let mut toggl = MockTogglRepository::new();
        toggl
            .expect_read_time_entries()
            .times(1)
            .returning(|_| Ok(vec![]));

        let command = ReportCommand::new(&toggl);
        let result = command.run(ReportArgs::default()).await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_report_command_passes_filters() {
        let args = ReportArgs {
            from: Some(date(2024, 1, 1)),
            to: Some(date(2024, 1, 31)),
            project: Some(7),
            tags: vec![1, 3],
        };
        let mut toggl = MockTogglRepository::new();
        toggl
            .expect_read_time_entries()
            .with(function(|query: &ReportQuery| {
                query.from == date(2024, 1, 1)
                    && query.to == date(2024, 1, 31)
                    && query.project_id == Some(7)
                    && query.tag_ids == vec![1, 3]
                    && query.from_row.is_none()
            }))
            .times(1)
            .returning(|_| Ok(vec![]));

        let command = ReportCommand::new(&toggl);
        let result = command.run(args).await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_report_command_error() {
        let mut toggl = MockTogglRepository::new();
        toggl
            .expect_read_time_entries()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("Toggl API returned status code 500!")));

        let command = ReportCommand::new(&toggl);
        let result = command.run(ReportArgs::default()).await;

        assert!(result.is_err());
    }

    #[rstest]
    #[case::defaults(None, None, date(2024, 1, 3), date(2024, 3, 5))]
    #[case::only_from(Some(date(2024, 2, 1)), None, date(2024, 2, 1), date(2024, 3, 5))]
    #[case::both(Some(date(2024, 2, 1)), Some(date(2024, 2, 29)), date(2024, 2, 1), date(2024, 2, 29))]
    fn test_build_query(
        #[case] from: Option<NaiveDate>,
        #[case] to: Option<NaiveDate>,
        #[case] expected_from: NaiveDate,
        #[case] expected_to: NaiveDate,
    ) {
        let args = ReportArgs {
            from,
            to,
            ..ReportArgs::default()
        };

        let query = build_query(args, date(2024, 3, 3)).unwrap();

        assert_eq!(query.from, expected_from);
        assert_eq!(query.to, expected_to);
    }

    #[test]
    fn test_build_query_reversed_range() {
        let args = ReportArgs {
            from: Some(date(2024, 2, 1)),
            to: Some(date(2024, 1, 1)),
            ..ReportArgs::default()
        };

        assert!(build_query(args, date(2024, 3, 3)).is_err());
    }

    #[rstest]
    #[case::valid("2024-02-29", Some(date(2024, 2, 29)))]
    #[case::invalid_day("2023-02-29", None)]
    #[case::wrong_format("29.02.2024", None)]
    fn test_parse_date(#[case] input: &str, #[case] expected: Option<NaiveDate>) {
        assert_eq!(parse_date(input).ok(), expected);
    }
}
