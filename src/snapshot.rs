use std::{cell::RefCell, collections::HashSet};

use chrono::{Local, NaiveDate};
use log::debug;
use thiserror::Error;
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

use crate::datetime;
use crate::entry::Entry;
use crate::view::duration_text;

/// 説明、アンデルがともに空の場合にファイル名に利用する語。
const FALLBACK_SLUG: &str = "avspasering";

const CARD_WIDTH: f32 = 480.0;
const CARD_PADDING: f32 = 24.0;
const LINE_HEIGHT: f32 = 28.0;
const FONT_SIZE: f32 = 16.0;

/// スナップショットの出力で発生するエラー。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExportError {
    #[error("snapshot export is not available")]
    Unavailable,
    #[error("snapshot export failed: {0}")]
    Failed(String),
}

/// 画像として出力するカード。
///
/// エントリーの項目から作成した文字列のみを持ち、元のエントリーは参照しない。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotCard {
    pub title: String,
    pub lines: Vec<String>,
}

impl SnapshotCard {
    pub fn from_entry(entry: &Entry) -> Self {
        let mut lines = vec![
            duration_text(entry),
            format!("Ferdig: {}", datetime::display_stored(&entry.completion)),
        ];
        if let Some(arrival) = &entry.period_start {
            lines.push(format!("Ankomst: {}", datetime::display_stored(arrival)));
        }
        if let Some(departure) = &entry.period_end {
            lines.push(format!("Avgang: {}", datetime::display_stored(departure)));
        }
        if !entry.fraction_label.is_empty() {
            lines.push(format!("Valgt andel: {}", entry.fraction_label));
        }
        if !entry.description.is_empty() {
            lines.push(entry.description.clone());
        }

        Self {
            title: "Avspasering".to_string(),
            lines,
        }
    }
}

/// カードを画像に変換する外部機能を表すtrait。
pub trait SnapshotExporter {
    /// カードを画像に変換し、エンコード済みのバイト列を返す。
    ///
    /// # Arguments
    ///
    /// * `card` - 出力するカード
    /// * `scale` - 拡大率
    async fn export(&self, card: &SnapshotCard, scale: f32) -> Result<Vec<u8>, ExportError>;

    /// 出力するファイルの拡張子。
    fn extension(&self) -> &'static str;
}

/// カードの各要素の配置。
#[derive(Debug, Clone)]
struct Layout {
    width: f32,
    height: f32,
    font_size: f32,
    texts: Vec<(f32, f32, bool, String)>,
}

/// カードをSVG画像として出力する。
#[derive(Debug, Clone, Copy, Default)]
pub struct SvgSnapshotExporter;

impl SvgSnapshotExporter {
    fn layout(card: SnapshotCard, scale: f32) -> Layout {
        let line_height = LINE_HEIGHT * scale;
        let padding = CARD_PADDING * scale;
        let texts = std::iter::once((true, card.title))
            .chain(card.lines.into_iter().map(|line| (false, line)))
            .enumerate()
            .map(|(index, (bold, text))| {
                (padding, padding + line_height * (index as f32 + 0.75), bold, text)
            })
            .collect::<Vec<_>>();

        Layout {
            width: CARD_WIDTH * scale,
            height: padding * 2.0 + line_height * texts.len() as f32,
            font_size: FONT_SIZE * scale,
            texts,
        }
    }

    fn encode(layout: Layout) -> Vec<u8> {
        let mut svg = format!(
            concat!(
                r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w:.0}" height="{h:.0}" viewBox="0 0 {w:.0} {h:.0}">"#,
                r##"<rect width="100%" height="100%" rx="12" fill="#ffffff" stroke="#d0d7de"/>"##,
            ),
            w = layout.width,
            h = layout.height,
        );
        for (x, y, bold, text) in &layout.texts {
            svg.push_str(&format!(
                r#"<text x="{:.1}" y="{:.1}" font-family="sans-serif" font-size="{:.1}" font-weight="{}">{}</text>"#,
                x,
                y,
                layout.font_size,
                if *bold { "bold" } else { "normal" },
                escape_xml(text)
            ));
        }
        svg.push_str("</svg>\n");

        svg.into_bytes()
    }
}

impl SnapshotExporter for SvgSnapshotExporter {
    async fn export(&self, card: &SnapshotCard, scale: f32) -> Result<Vec<u8>, ExportError> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(ExportError::Failed(format!("invalid scale {}", scale)));
        }

        let card = card.clone();
        let layout = tokio::task::spawn_blocking(move || Self::layout(card, scale))
            .await
            .map_err(|err| ExportError::Failed(format!("layout step failed: {}", err)))?;
        debug!("Laid out snapshot card: {}x{}", layout.width, layout.height);
        let encoded = tokio::task::spawn_blocking(move || Self::encode(layout))
            .await
            .map_err(|err| ExportError::Failed(format!("encoding step failed: {}", err)))?;

        Ok(encoded)
    }

    fn extension(&self) -> &'static str {
        "svg"
    }
}

fn escape_xml(s: &str) -> String {
    s.chars().fold(String::with_capacity(s.len()), |mut escaped, c| {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c => escaped.push(c),
        }
        escaped
    })
}

/// 出力中のエントリーの出力操作を無効にする。
///
/// 同じエントリーの出力が完了する前に再度出力されることを防ぐ。
#[derive(Debug, Default)]
pub struct ExportControls {
    disabled: RefCell<HashSet<String>>,
}

impl ExportControls {
    /// 出力操作を無効にする。既に無効な場合は`None`を返す。
    ///
    /// 返された`ControlGuard`が破棄されると再び有効になる。
    pub fn disable(&self, id: &str) -> Option<ControlGuard<'_>> {
        if !self.disabled.borrow_mut().insert(id.to_string()) {
            return None;
        }

        Some(ControlGuard {
            controls: self,
            id: id.to_string(),
        })
    }

    #[cfg(test)]
    pub fn is_disabled(&self, id: &str) -> bool {
        self.disabled.borrow().contains(id)
    }
}

/// 破棄時に出力操作を有効に戻す。
pub struct ControlGuard<'a> {
    controls: &'a ExportControls,
    id: String,
}

impl Drop for ControlGuard<'_> {
    fn drop(&mut self) {
        self.controls.disabled.borrow_mut().remove(&self.id);
    }
}

/// 出力するファイル名を作成する。
///
/// 日付は到着日時、作成日時、`today`の順に利用し、
/// 名前は説明、アンデル、固定の語の順に空でないものを利用する。
///
/// # Examples
///
/// ```
/// // avspasering-2024-01-08-tur-til-tromso.svg
/// let filename = snapshot_filename(&entry, "svg", today);
/// ```
pub fn snapshot_filename(entry: &Entry, extension: &str, today: NaiveDate) -> String {
    let date = entry
        .period_start
        .as_deref()
        .or(entry.created_at.as_deref())
        .and_then(datetime::parse_stored)
        .map(|datetime| datetime.with_timezone(&Local).date_naive())
        .unwrap_or(today);
    let slug = [entry.description.as_str(), entry.fraction_label.as_str()]
        .iter()
        .map(|candidate| slugify(candidate))
        .find(|slug| !slug.is_empty())
        .unwrap_or_else(|| FALLBACK_SLUG.to_string());

    format!("avspasering-{}-{}.{}", date.format("%Y-%m-%d"), slug, extension)
}

/// 文字列をファイル名に利用できる形式に変換する。
///
/// 発音区別符号を取り除いて小文字にし、英数字以外の連続を1つの`-`にまとめ、前後の`-`を取り除く。
pub fn slugify(s: &str) -> String {
    let mut slug = String::with_capacity(s.len());
    let transliterated = s.chars().flat_map(transliterate).collect::<String>();

    for c in transliterated.nfd().filter(|c| !is_combining_mark(*c)) {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }

    slug.trim_matches('-').to_string()
}

// 分解しても基本文字にならない文字を置き換える。
fn transliterate(c: char) -> Vec<char> {
    match c {
        'æ' => vec!['a', 'e'],
        'Æ' => vec!['A', 'E'],
        'ø' => vec!['o'],
        'Ø' => vec!['O'],
        'œ' => vec!['o', 'e'],
        'Œ' => vec!['O', 'E'],
        'ß' => vec!['s', 's'],
        'đ' => vec!['d'],
        'Đ' => vec!['D'],
        'ł' => vec!['l'],
        'Ł' => vec!['L'],
        c => vec![c],
    }
}
