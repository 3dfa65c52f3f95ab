use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::calculator::{Calculation, Fraction};

/// 保存されるアヴスパセリングの計算結果。
///
/// 古い形式のデータでは`periodStart`、`periodEnd`が存在せず、
/// 時間が`durationMinutes`ではなく表示用文字列の`duration`として保存されている。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u64>,
    #[serde(default, rename = "duration", skip_serializing_if = "Option::is_none")]
    pub duration_text: Option<String>,
    pub completion: String,
    #[serde(default)]
    pub fraction_label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl Entry {
    /// 計算結果から新しい`Entry`を作成する。
    ///
    /// # Arguments
    ///
    /// * `calculation` - 計算結果
    /// * `fraction` - 計算に利用した割合
    /// * `description` - 説明
    /// * `created_at` - 作成日時
    pub fn from_calculation(
        calculation: &Calculation,
        fraction: &Fraction,
        description: &str,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: new_id(),
            period_start: Some(to_stored(&calculation.arrival)),
            period_end: Some(to_stored(&calculation.departure)),
            duration_minutes: Some(calculation.duration_minutes),
            duration_text: None,
            completion: to_stored(&calculation.completion),
            fraction_label: fraction.label().to_string(),
            description: description.to_string(),
            created_at: Some(to_stored(&created_at)),
        }
    }
}

/// 新しいエントリーIDを生成する。
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// 日時を保存用のRFC 3339形式に変換する。
pub fn to_stored(datetime: &DateTime<Utc>) -> String {
    datetime.to_rfc3339_opts(SecondsFormat::Secs, true)
}
