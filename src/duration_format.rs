/// 分単位の時間をノルウェー語の表示用文字列に変換する。
///
/// 時間、分ともに0の場合は`0 minutter`を返す。
///
/// # Arguments
///
/// * `total_minutes` - 変換する時間(分)
///
/// # Examples
///
/// ```
/// assert_eq!(format_duration(90), "1 time og 30 minutter");
/// ```
pub fn format_duration(total_minutes: u64) -> String {
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;
    let mut parts = Vec::with_capacity(2);

    if hours > 0 {
        parts.push(format!("{} {}", hours, if hours == 1 { "time" } else { "timer" }));
    }
    if minutes > 0 {
        parts.push(format!(
            "{} {}",
            minutes,
            if minutes == 1 { "minutt" } else { "minutter" }
        ));
    }

    if parts.is_empty() {
        return "0 minutter".to_string();
    }

    parts.join(" og ")
}
