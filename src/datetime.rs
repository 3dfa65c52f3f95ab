use chrono::{DateTime, FixedOffset, Local, Locale, NaiveDateTime, TimeZone, Utc};

/// 画面表示で利用するロケール。
pub const DISPLAY_LOCALE: Locale = Locale::nb_NO;

/// `datetime-local`形式で受け付ける書式。秒なし、秒ありの順に試す。
const LOCAL_INPUT_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S"];

#[cfg(not(test))]
/// 現在のUTC時間を取得する。
pub fn now() -> DateTime<Utc> {
    Utc::now()
}


#[cfg(test)]
pub use mock_datetime::now;

/// 入力された日時文字列をUTCの日時に変換する。
///
/// RFC 3339形式であればそのオフセットを利用し、`2024-01-08T08:00`のような
/// オフセットを持たない形式はLocalタイムゾーンの日時として解釈する。
/// 夏時間の切り替えで存在しない、または曖昧な日時は`None`を返す。
///
/// # Arguments
///
/// * `s` - 変換する日時文字列
pub fn parse_instant(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(datetime) = DateTime::parse_from_rfc3339(s) {
        return Some(datetime.to_utc());
    }

    LOCAL_INPUT_FORMATS.iter().find_map(|format| {
        let naive = NaiveDateTime::parse_from_str(s, format).ok()?;
        Local
            .from_local_datetime(&naive)
            .single()
            .map(|datetime| datetime.to_utc())
    })
}

/// 保存されているRFC 3339形式の日時文字列を読み込む。
pub fn parse_stored(s: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(s).ok()
}

/// 日時をLocalタイムゾーンで表示用の文字列に変換する。
///
/// 例: `mandag 8. januar 2024 kl. 08:00`
pub fn format_local<Tz: TimeZone>(datetime: &DateTime<Tz>) -> String {
    datetime
        .with_timezone(&Local)
        .format_localized("%A %-d. %B %Y kl. %H:%M", DISPLAY_LOCALE)
        .to_string()
}

/// 保存されている日時文字列を表示用に変換する。
///
/// RFC 3339形式でない値は、過去に表示用文字列のまま保存されたものとしてそのまま返す。
pub fn display_stored(s: &str) -> String {
    match parse_stored(s) {
        Some(datetime) => format_local(&datetime),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Local, SecondsFormat, TimeZone, Utc};
    use rstest::rstest;

    use super::{display_stored, format_local, mock_datetime, parse_instant};

    /// 何も設定しない場合は、現在時間が取得できることを確認する。
    ///
    ///  - 現在時刻での比較を行なっているため、ミリ秒単位まで比較するとテストが失敗する可能性があり、秒単位で比較している。
    #[test]
    fn test_now() {
        assert_eq!(
            mock_datetime::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
        );
    }

    /// モック時間を設定した時に、その時間が取得できることを確認する。
    #[test]
    fn test_now_specific_datetime() {
        let datetime = String::from("2024-01-01T00:00:00+00:00");
        mock_datetime::set_mock_time(
            DateTime::parse_from_rfc3339(datetime.as_str())
                .unwrap()
                .to_utc(),
        );

        assert_eq!(mock_datetime::now().to_rfc3339(), datetime);
        mock_datetime::clear_mock_time();
    }

    /// Localタイムゾーンの`datetime-local`形式を解釈できることを確認する。
    #[rstest]
    #[case::minutes("2024-01-08T08:00", Local.with_ymd_and_hms(2024, 1, 8, 8, 0, 0).unwrap())]
    #[case::seconds("2024-01-08T08:00:30", Local.with_ymd_and_hms(2024, 1, 8, 8, 0, 30).unwrap())]
    #[case::surrounding_spaces(
        " 2024-01-08T16:00 ",
        Local.with_ymd_and_hms(2024, 1, 8, 16, 0, 0).unwrap(),
    )]
    fn test_parse_instant_local(#[case] input: &str, #[case] expected: DateTime<Local>) {
        assert_eq!(parse_instant(input), Some(expected.to_utc()));
    }

    /// オフセット付きの日時はそのオフセットで解釈されることを確認する。
    #[test]
    fn test_parse_instant_rfc3339() {
        assert_eq!(
            parse_instant("2024-01-08T08:00:00+01:00"),
            Some(Utc.with_ymd_and_hms(2024, 1, 8, 7, 0, 0).unwrap())
        );
    }

    /// 日時として解釈できない文字列は`None`になることを確認する。
    #[rstest]
    #[case::empty("")]
    #[case::text("i morgen")]
    #[case::date_only("2024-01-08")]
    #[case::invalid_month("2024-13-08T08:00")]
    fn test_parse_instant_invalid(#[case] input: &str) {
        assert_eq!(parse_instant(input), None);
    }

    /// ノルウェー語の曜日と月名で表示されることを確認する。
    #[test]
    fn test_format_local() {
        let datetime = Local.with_ymd_and_hms(2024, 1, 8, 8, 0, 0).unwrap();

        assert_eq!(format_local(&datetime), "mandag 8. januar 2024 kl. 08:00");
    }

    /// RFC 3339形式でない保存値はそのまま表示されることを確認する。
    #[test]
    fn test_display_stored_passthrough() {
        assert_eq!(
            display_stored("mandag 8. januar 2024 kl. 10:40"),
            "mandag 8. januar 2024 kl. 10:40"
        );
    }
}
