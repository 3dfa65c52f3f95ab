use std::{fmt, str::FromStr};

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::datetime;

const MILLIS_PER_MINUTE: i128 = 60_000;

/// 選択可能なアンデル(割合)の一覧。先頭がデフォルト。
pub const FRACTION_OPTIONS: [(u32, u32, &str); 4] =
    [(1, 3, "1/3"), (1, 2, "1/2"), (2, 3, "2/3"), (1, 1, "1/1")];

/// 計算時に発生するエラー。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalculationError {
    #[error("invalid instant: {0:?}")]
    InvalidInstant(String),
    #[error("departure {departure} is not after arrival {arrival}")]
    OrderingViolation {
        arrival: DateTime<Utc>,
        departure: DateTime<Utc>,
    },
    #[error("calculated duration is not positive")]
    DegenerateResult,
    #[error("invalid fraction: {0:?}")]
    InvalidFraction(String),
}

/// 移動時間のうちアヴスパセリングとして扱う割合。
///
/// 常に(0, 1]の範囲の有理数であり、表示用のラベルを持つ。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fraction {
    numerator: u32,
    denominator: u32,
    label: String,
}

impl Fraction {
    /// 新しい`Fraction`を返す。
    ///
    /// 0以下、または1より大きい割合はエラーとする。
    pub fn new(numerator: u32, denominator: u32, label: &str) -> Result<Self, CalculationError> {
        if numerator == 0 || denominator == 0 || numerator > denominator {
            return Err(CalculationError::InvalidFraction(format!(
                "{}/{}",
                numerator, denominator
            )));
        }

        Ok(Self {
            numerator,
            denominator,
            label: label.to_string(),
        })
    }

    /// 選択肢の先頭にあるデフォルトの割合を返す。
    pub fn default_option() -> Self {
        let (numerator, denominator, label) = FRACTION_OPTIONS[0];
        Self {
            numerator,
            denominator,
            label: label.to_string(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

impl FromStr for Fraction {
    type Err = CalculationError;

    /// `1/3`のような分数、または`0.5`のような小数を解釈する。
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || CalculationError::InvalidFraction(s.to_string());

        if let Some((numerator, denominator, label)) = FRACTION_OPTIONS
            .iter()
            .find(|(_, _, label)| *label == s)
        {
            return Fraction::new(*numerator, *denominator, label);
        }

        if let Some((numerator, denominator)) = s.split_once('/') {
            let numerator = numerator.trim().parse::<u32>().map_err(|_| invalid())?;
            let denominator = denominator.trim().parse::<u32>().map_err(|_| invalid())?;
            return Fraction::new(numerator, denominator, s);
        }

        // 小数は10のべき乗を分母とする分数として扱う
        let (integer, decimals) = s.split_once('.').unwrap_or((s, ""));
        if (integer.is_empty() && decimals.is_empty())
            || decimals.len() > 9
            || !integer.chars().chain(decimals.chars()).all(|c| c.is_ascii_digit())
        {
            return Err(invalid());
        }
        let denominator = 10u32.pow(decimals.len() as u32);
        let numerator = format!("{}{}", integer, decimals)
            .parse::<u64>()
            .map_err(|_| invalid())?;
        let numerator = u32::try_from(numerator).map_err(|_| invalid())?;

        Fraction::new(numerator, denominator, s)
    }
}

/// 完了時刻を計算する際の基準時刻。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompletionReference {
    #[default]
    Arrival,
    Departure,
}

impl FromStr for CompletionReference {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "arrival" | "ankomst" => Ok(Self::Arrival),
            "departure" | "avgang" => Ok(Self::Departure),
            other => anyhow::bail!("Unknown completion reference: {}", other),
        }
    }
}

/// アヴスパセリングの計算結果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Calculation {
    pub arrival: DateTime<Utc>,
    pub departure: DateTime<Utc>,
    pub duration_minutes: u64,
    pub completion: DateTime<Utc>,
}

/// 入力文字列からアヴスパセリングを計算する。
///
/// # Arguments
///
/// * `arrival` - 到着日時
/// * `departure` - 出発日時
/// * `fraction` - アヴスパセリングとして扱う割合
/// * `reference` - 完了時刻の基準
pub fn calculate(
    arrival: &str,
    departure: &str,
    fraction: &Fraction,
    reference: CompletionReference,
) -> Result<Calculation, CalculationError> {
    let arrival_at = datetime::parse_instant(arrival)
        .ok_or_else(|| CalculationError::InvalidInstant(arrival.to_string()))?;
    let departure_at = datetime::parse_instant(departure)
        .ok_or_else(|| CalculationError::InvalidInstant(departure.to_string()))?;

    calculate_between(arrival_at, departure_at, fraction, reference)
}

/// 到着から出発までの時間に割合をかけ、分単位で切り上げた時間を計算する。
///
/// 1分未満の端数は常に切り上げる。
pub fn calculate_between(
    arrival: DateTime<Utc>,
    departure: DateTime<Utc>,
    fraction: &Fraction,
    reference: CompletionReference,
) -> Result<Calculation, CalculationError> {
    if departure <= arrival {
        return Err(CalculationError::OrderingViolation { arrival, departure });
    }

    let total_millis = (departure - arrival).num_milliseconds() as i128;
    let scaled = total_millis * fraction.numerator as i128;
    let divisor = fraction.denominator as i128 * MILLIS_PER_MINUTE;
    let minutes = (scaled + divisor - 1).div_euclid(divisor);
    if minutes <= 0 {
        return Err(CalculationError::DegenerateResult);
    }
    let duration_minutes =
        u64::try_from(minutes).map_err(|_| CalculationError::DegenerateResult)?;

    let base = match reference {
        CompletionReference::Arrival => arrival,
        CompletionReference::Departure => departure,
    };
    let completion = i64::try_from(duration_minutes)
        .ok()
        .and_then(Duration::try_minutes)
        .and_then(|duration| base.checked_add_signed(duration))
        .ok_or(CalculationError::DegenerateResult)?;

    Ok(Calculation {
        arrival,
        departure,
        duration_minutes,
        completion,
    })
}
