use std::io::Write;

use anyhow::{Context, Result};

use crate::view::{RowView, View, EMPTY_STATE};

/// Consoleに画面の内容を表示するためのtrait。
pub trait ConsolePresenter {
    /// エントリー一覧を表示する。
    ///
    /// # Arguments
    ///
    /// * `view` - 表示する内容
    fn show_view(&mut self, view: &View) -> Result<()>;

    /// 利用者向けのメッセージを1件表示する。
    fn show_message(&mut self, message: &str) -> Result<()>;
}

/// エントリー一覧をMarkdownのlist形式で表示する。
pub struct ConsoleMarkdownList<'a, W: Write> {
    writer: &'a mut W,
}

impl<'a, W: Write> ConsoleMarkdownList<'a, W> {
    /// 新しい`ConsoleMarkdownList`を返す。
    pub fn new(writer: &'a mut W) -> Self {
        Self { writer }
    }

    fn show_row(&mut self, position: usize, row: &RowView) -> Result<()> {
        writeln!(
            self.writer,
            "{}. {} (ferdig {})",
            position, row.duration, row.completion
        )?;
        writeln!(self.writer, "   - id: {}", row.id)?;
        if let Some(arrival) = &row.arrival {
            writeln!(self.writer, "   - ankomst: {}", arrival)?;
        }
        if let Some(departure) = &row.departure {
            writeln!(self.writer, "   - avgang: {}", departure)?;
        }
        if !row.fraction_label.is_empty() {
            writeln!(self.writer, "   - andel: {}", row.fraction_label)?;
        }
        writeln!(self.writer, "   - beskrivelse: {}", row.description)?;

        Ok(())
    }
}

impl<'a, W: Write> ConsolePresenter for ConsoleMarkdownList<'a, W> {
    // 表示領域は毎回全体を出力し直す。
    fn show_view(&mut self, view: &View) -> Result<()> {
        if view.is_empty() {
            writeln!(self.writer, "{}", EMPTY_STATE).context("Failed to write empty state")?;
            return Ok(());
        }

        if let Some(summary) = &view.summary {
            writeln!(self.writer, "{}", summary).context("Failed to write summary")?;
            writeln!(self.writer).context("Failed to write summary")?;
        }
        // 行の位置は1から数え、サブコマンドで行を指定する際に利用できる
        for (index, row) in view.rows.iter().enumerate() {
            self.show_row(index + 1, row)
                .with_context(|| format!("Failed to write entry: {:?}", row))?;
        }

        Ok(())
    }

    fn show_message(&mut self, message: &str) -> Result<()> {
        writeln!(self.writer, "{}", message)
            .with_context(|| format!("Failed to write message: {}", message))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{ConsoleMarkdownList, ConsolePresenter};
    use crate::entry::Entry;
    use crate::view::{Renderer, EMPTY_STATE};

    /// テスト用にダミーのEntryを作成する。
    fn dummy_entry(pattern: u8) -> Entry {
        match pattern {
            1 => Entry {
                id: "entry1".to_string(),
                period_start: None,
                period_end: None,
                duration_minutes: Some(90),
                duration_text: None,
                completion: "tirsdag 9. januar 2024 kl. 12:00".to_string(),
                fraction_label: "1/2".to_string(),
                description: "Kristiansand".to_string(),
                created_at: None,
            },
            2 => Entry {
                id: "entry2".to_string(),
                period_start: None,
                period_end: None,
                duration_minutes: None,
                duration_text: Some("1 time".to_string()),
                completion: "mandag 8. januar 2024 kl. 09:00".to_string(),
                fraction_label: String::new(),
                description: String::new(),
                created_at: None,
            },
            _ => panic!("Invalid pattern: {}", pattern),
        }
    }

    #[rstest]
    #[case::no_entry(&[], &format!("{}\n", EMPTY_STATE))]
    #[case::single(
        &[dummy_entry(1)],
        concat!(
            "Valgt andel: 1/2\n",
            "\n",
            "1. 1 time og 30 minutter (ferdig tirsdag 9. januar 2024 kl. 12:00)\n",
            "   - id: entry1\n",
            "   - andel: 1/2\n",
            "   - beskrivelse: Kristiansand\n",
        ),
    )]
    #[case::legacy_without_fraction(
        &[dummy_entry(1), dummy_entry(2)],
        concat!(
            "Valgt andel: 1/2\n",
            "\n",
            "1. 1 time og 30 minutter (ferdig tirsdag 9. januar 2024 kl. 12:00)\n",
            "   - id: entry1\n",
            "   - andel: 1/2\n",
            "   - beskrivelse: Kristiansand\n",
            "2. 1 time (ferdig mandag 8. januar 2024 kl. 09:00)\n",
            "   - id: entry2\n",
            "   - beskrivelse: \n",
        ),
    )]
    fn test_show_view(#[case] input: &[Entry], #[case] expected: &str) {
        let mut writer = Vec::new();
        let mut presenter = ConsoleMarkdownList::new(&mut writer);

        presenter.show_view(&Renderer::new(false).render(input)).unwrap();

        assert_eq!(String::from_utf8(writer).unwrap(), expected);
    }

    #[test]
    fn test_show_message() {
        let mut writer = Vec::new();
        let mut presenter = ConsoleMarkdownList::new(&mut writer);

        presenter.show_message("Avgang må være etter ankomst.").unwrap();

        assert_eq!(
            String::from_utf8(writer).unwrap(),
            "Avgang må være etter ankomst.\n"
        );
    }
}
