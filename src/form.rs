use log::{debug, info};
use thiserror::Error;

use crate::calculator::{calculate, CalculationError, CompletionReference, Fraction};
use crate::datetime;
use crate::entry::Entry;
use crate::entry_store::EntryStore;
use crate::storage::KeyValueSlot;

/// 入力フォームの内容。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    pub arrival: String,
    pub departure: String,
    /// 空の場合はデフォルトの割合を利用する。
    pub fraction: String,
    pub description: String,
}

/// 入力の検証で発生するエラー。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("{0} is missing")]
    MissingField(&'static str),
    #[error(transparent)]
    Calculation(#[from] CalculationError),
}

impl FormError {
    /// 利用者に表示するメッセージを返す。
    pub fn user_message(&self) -> &'static str {
        match self {
            FormError::MissingField(_) => "Fyll inn både ankomst og avgang.",
            FormError::Calculation(CalculationError::InvalidInstant(_)) => {
                "Ugyldig dato eller klokkeslett."
            }
            FormError::Calculation(CalculationError::OrderingViolation { .. }) => {
                "Avgang må være etter ankomst."
            }
            FormError::Calculation(CalculationError::DegenerateResult) => {
                "Tidsintervallet er for kort til å beregne avspasering."
            }
            FormError::Calculation(CalculationError::InvalidFraction(_)) => "Ugyldig andel.",
        }
    }
}

/// フォームの送信を1件ずつ処理する。
///
/// 表示するメッセージは常に最大1件で、送信が成功するとクリアされる。
pub struct FormController {
    default_fraction: Fraction,
    reference: CompletionReference,
    form: FormData,
    message: Option<String>,
}

impl FormController {
    /// 新しい`FormController`を返す。
    ///
    /// # Arguments
    ///
    /// * `default_fraction` - フォームの初期値として選択される割合
    /// * `reference` - 完了時刻の基準
    pub fn new(default_fraction: Fraction, reference: CompletionReference) -> Self {
        let form = Self::blank_form(&default_fraction);
        Self {
            default_fraction,
            reference,
            form,
            message: None,
        }
    }

    /// 現在のフォームの内容を返す。
    pub fn form(&self) -> &FormData {
        &self.form
    }

    /// 表示中のメッセージを返す。
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// フォームを送信する。
    ///
    /// 成功した場合はエントリーを追加してフォームを初期化し、追加したエントリーのIDを返す。
    /// 失敗した場合はメッセージを設定し、フォームの内容は保持する。
    pub fn submit<S: KeyValueSlot>(
        &mut self,
        data: FormData,
        store: &mut EntryStore<S>,
    ) -> Option<String> {
        self.form = data;

        match self.build_entry() {
            Ok(entry) => {
                let id = entry.id.clone();
                info!("Calculated {:?} minutes for entry {}", entry.duration_minutes, id);
                store.append(entry);
                self.message = None;
                self.form = Self::blank_form(&self.default_fraction);
                Some(id)
            }
            Err(err) => {
                debug!("Rejected submission: {}", err);
                self.message = Some(err.user_message().to_string());
                None
            }
        }
    }

    fn build_entry(&self) -> Result<Entry, FormError> {
        let arrival = self.form.arrival.trim();
        let departure = self.form.departure.trim();
        if arrival.is_empty() {
            return Err(FormError::MissingField("arrival"));
        }
        if departure.is_empty() {
            return Err(FormError::MissingField("departure"));
        }

        let fraction = match self.form.fraction.trim() {
            "" => self.default_fraction.clone(),
            fraction => fraction.parse::<Fraction>()?,
        };
        let calculation = calculate(arrival, departure, &fraction, self.reference)?;

        Ok(Entry::from_calculation(
            &calculation,
            &fraction,
            self.form.description.trim(),
            datetime::now(),
        ))
    }

    fn blank_form(default_fraction: &Fraction) -> FormData {
        FormData {
            fraction: default_fraction.label().to_string(),
            ..FormData::default()
        }
    }
}
