use std::{env, path::PathBuf};

use anyhow::{Context, Result};

use crate::calculator::{CompletionReference, Fraction};

/// アプリケーション名。データディレクトリ名に利用する。
pub const APP_NAME: &str = "avspasering";

/// エントリー一覧を保存するファイル名。
pub const ENTRIES_FILE: &str = "entries.json";

const ENV_DATA_DIR: &str = "AVSPASERING_DATA_DIR";
const ENV_COMPLETION_FROM: &str = "AVSPASERING_COMPLETION_FROM";
const ENV_DEFAULT_FRACTION: &str = "AVSPASERING_DEFAULT_FRACTION";

/// 実行時の設定。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// データを保存するディレクトリ。利用できない場合は`None`。
    pub data_dir: Option<PathBuf>,
    pub completion_reference: CompletionReference,
    pub default_fraction: Fraction,
}

impl Config {
    /// 環境変数から設定を読み込む。
    ///
    /// # Arguments
    ///
    /// * `data_dir` - コマンドラインで指定されたデータディレクトリ。環境変数より優先する。
    pub fn from_env(data_dir: Option<PathBuf>) -> Result<Self> {
        Self::from_lookup(data_dir, |key| env::var(key).ok(), dirs::data_dir())
    }

    /// 指定された関数で値を参照して設定を作成する。
    fn from_lookup(
        data_dir: Option<PathBuf>,
        lookup: impl Fn(&str) -> Option<String>,
        platform_data_dir: Option<PathBuf>,
    ) -> Result<Self> {
        let data_dir = data_dir
            .or_else(|| lookup(ENV_DATA_DIR).filter(|dir| !dir.is_empty()).map(PathBuf::from))
            .or_else(|| platform_data_dir.map(|dir| dir.join(APP_NAME)));

        let completion_reference = match lookup(ENV_COMPLETION_FROM) {
            Some(value) => value
                .parse::<CompletionReference>()
                .with_context(|| format!("Invalid {}: {}", ENV_COMPLETION_FROM, value))?,
            None => CompletionReference::default(),
        };

        let default_fraction = match lookup(ENV_DEFAULT_FRACTION) {
            Some(value) => value
                .parse::<Fraction>()
                .with_context(|| format!("Invalid {}: {}", ENV_DEFAULT_FRACTION, value))?,
            None => Fraction::default_option(),
        };

        Ok(Self {
            data_dir,
            completion_reference,
            default_fraction,
        })
    }

    /// エントリー一覧を保存するファイルのパスを返す。
    pub fn entries_file(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|dir| dir.join(ENTRIES_FILE))
    }
}
