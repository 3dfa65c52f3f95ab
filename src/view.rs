use crate::app::Command;
use crate::datetime;
use crate::duration_format::format_duration;
use crate::entry::Entry;

/// 一覧が空の場合に表示する文言。
pub const EMPTY_STATE: &str = "Ingen lagrede beregninger ennå.";

/// 画面に表示する内容。エントリー一覧から毎回作り直す。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    /// 最後に追加されたエントリーのアンデル。一覧が空の場合は`None`。
    pub summary: Option<String>,
    pub rows: Vec<RowView>,
}

impl View {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// 1エントリー分の表示内容と、その行から発行できるコマンド。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowView {
    pub id: String,
    pub duration: String,
    pub completion: String,
    pub arrival: Option<String>,
    pub departure: Option<String>,
    pub fraction_label: String,
    pub description: String,
    export_enabled: bool,
}

impl RowView {
    pub fn edit_description(&self, text: &str) -> Command {
        Command::EditDescription {
            id: self.id.clone(),
            text: text.to_string(),
        }
    }

    pub fn remove(&self) -> Command {
        Command::Remove {
            id: self.id.clone(),
        }
    }

    /// スナップショットの出力が利用できない場合は`None`を返す。
    pub fn export(&self) -> Option<Command> {
        self.export_enabled.then(|| Command::Export {
            id: self.id.clone(),
        })
    }
}

/// エントリー一覧を`View`に変換する。
#[derive(Debug, Clone, Copy, Default)]
pub struct Renderer {
    export_enabled: bool,
}

impl Renderer {
    /// 新しい`Renderer`を返す。
    ///
    /// # Arguments
    ///
    /// * `export_enabled` - 行ごとのスナップショット出力を有効にするか
    pub fn new(export_enabled: bool) -> Self {
        Self { export_enabled }
    }

    /// 新しい順のエントリー一覧から表示内容を作成する。
    pub fn render(&self, entries: &[Entry]) -> View {
        View {
            summary: entries
                .first()
                .filter(|entry| !entry.fraction_label.is_empty())
                .map(|entry| format!("Valgt andel: {}", entry.fraction_label)),
            rows: entries.iter().map(|entry| self.render_row(entry)).collect(),
        }
    }

    fn render_row(&self, entry: &Entry) -> RowView {
        RowView {
            id: entry.id.clone(),
            duration: duration_text(entry),
            completion: datetime::display_stored(&entry.completion),
            arrival: entry.period_start.as_deref().map(datetime::display_stored),
            departure: entry.period_end.as_deref().map(datetime::display_stored),
            fraction_label: entry.fraction_label.clone(),
            description: entry.description.clone(),
            export_enabled: self.export_enabled,
        }
    }
}

/// 表示用の時間。古い形式で保存された文字列はそのまま利用する。
pub fn duration_text(entry: &Entry) -> String {
    match (entry.duration_minutes, &entry.duration_text) {
        (Some(minutes), _) => format_duration(minutes),
        (None, Some(text)) => text.clone(),
        (None, None) => format_duration(0),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Local, TimeZone};

    use super::{Renderer, View};
    use crate::app::Command;
    use crate::datetime::format_local;
    use crate::entry::{to_stored, Entry};

    fn dummy_entry(id: &str, fraction_label: &str) -> Entry {
        let arrival = Local.with_ymd_and_hms(2024, 1, 8, 8, 0, 0).unwrap().to_utc();
        let departure = Local.with_ymd_and_hms(2024, 1, 8, 16, 0, 0).unwrap().to_utc();
        let completion = Local.with_ymd_and_hms(2024, 1, 8, 10, 40, 0).unwrap().to_utc();
        Entry {
            id: id.to_string(),
            period_start: Some(to_stored(&arrival)),
            period_end: Some(to_stored(&departure)),
            duration_minutes: Some(160),
            duration_text: None,
            completion: to_stored(&completion),
            fraction_label: fraction_label.to_string(),
            description: "Oslo - Trondheim".to_string(),
            created_at: None,
        }
    }

    #[test]
    fn test_render_empty() {
        let view = Renderer::new(true).render(&[]);

        assert_eq!(
            view,
            View {
                summary: None,
                rows: vec![],
            }
        );
        assert!(view.is_empty());
    }

    /// 概要には最後に追加されたエントリーのアンデルが表示されることを確認する。
    #[test]
    fn test_render_rows() {
        let entries = vec![dummy_entry("2", "1/2"), dummy_entry("1", "1/3")];

        let view = Renderer::new(false).render(&entries);

        assert_eq!(view.summary.as_deref(), Some("Valgt andel: 1/2"));
        assert_eq!(view.rows.len(), 2);
        let row = &view.rows[0];
        assert_eq!(row.id, "2");
        assert_eq!(row.duration, "2 timer og 40 minutter");
        assert_eq!(
            row.completion,
            format_local(&Local.with_ymd_and_hms(2024, 1, 8, 10, 40, 0).unwrap())
        );
        assert_eq!(
            row.arrival.as_deref(),
            Some(format_local(&Local.with_ymd_and_hms(2024, 1, 8, 8, 0, 0).unwrap()).as_str())
        );
        assert_eq!(row.description, "Oslo - Trondheim");
    }

    /// 古い形式のエントリーは保存された文字列をそのまま表示することを確認する。
    #[test]
    fn test_render_legacy_entry() {
        let entry = Entry {
            id: "old".to_string(),
            period_start: None,
            period_end: None,
            duration_minutes: None,
            duration_text: Some("1 time".to_string()),
            completion: "mandag 8. januar 2024 kl. 09:00".to_string(),
            fraction_label: String::new(),
            description: String::new(),
            created_at: None,
        };

        let view = Renderer::default().render(&[entry]);

        let row = &view.rows[0];
        assert_eq!(row.duration, "1 time");
        assert_eq!(row.completion, "mandag 8. januar 2024 kl. 09:00");
        assert_eq!(row.arrival, None);
        assert_eq!(row.departure, None);
        assert_eq!(view.summary, None);
        assert!(!view.is_empty());
    }

    /// 行から発行されるコマンドがその行のIDを持つことを確認する。
    #[test]
    fn test_row_commands() {
        let entries = vec![dummy_entry("abc", "1/3")];

        let with_export = Renderer::new(true).render(&entries);
        let without_export = Renderer::new(false).render(&entries);

        let row = &with_export.rows[0];
        assert_eq!(
            row.edit_description("Bergen"),
            Command::EditDescription {
                id: "abc".to_string(),
                text: "Bergen".to_string(),
            }
        );
        assert_eq!(
            row.remove(),
            Command::Remove {
                id: "abc".to_string()
            }
        );
        assert_eq!(
            row.export(),
            Some(Command::Export {
                id: "abc".to_string()
            })
        );
        assert_eq!(without_export.rows[0].export(), None);
    }
}
