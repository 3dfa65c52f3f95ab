use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::app::Command;
use crate::view::{RowView, View};

/// 保存済みエントリーの説明を変更するサブコマンド。
#[derive(Debug, clap::Args)]
pub struct DescribeArgs {
    #[clap(help = "Id of the entry, or its position in the list starting at 1")]
    id: String,

    #[clap(help = "New description, empty to clear it", default_value = "")]
    text: String,
}

impl DescribeArgs {
    /// 一覧の行に対する説明の変更コマンドに変換する。
    pub fn into_command(self, view: &View) -> Command {
        match find_row(view, &self.id) {
            Some(row) => row.edit_description(&self.text),
            None => Command::EditDescription {
                id: self.id,
                text: self.text,
            },
        }
    }
}

/// 保存済みエントリーを削除するサブコマンド。
#[derive(Debug, clap::Args)]
pub struct RemoveArgs {
    #[clap(help = "Id of the entry, or its position in the list starting at 1")]
    id: String,
}

impl RemoveArgs {
    pub fn into_command(self, view: &View) -> Command {
        match find_row(view, &self.id) {
            Some(row) => row.remove(),
            None => Command::Remove { id: self.id },
        }
    }
}

/// 保存済みエントリーを画像として出力するサブコマンド。
#[derive(Debug, clap::Args)]
pub struct ExportArgs {
    #[clap(help = "Id of the entry, or its position in the list starting at 1")]
    id: String,

    #[clap(
        short = 's',
        long = "scale",
        help = "Scale factor of the image",
        default_value = "2",
        parse(try_from_str = parse_scale),
    )]
    pub scale: f32,

    #[clap(
        short = 'o',
        long = "output",
        help = "Directory to save the image in",
        default_value = "."
    )]
    pub output: PathBuf,
}

impl ExportArgs {
    pub fn into_command(self, view: &View) -> Command {
        find_row(view, &self.id)
            .and_then(RowView::export)
            .unwrap_or(Command::Export { id: self.id })
    }
}

/// IDまたは1から始まる一覧上の位置で行を探す。
///
/// 該当する行がない場合は`None`を返し、指定された値をIDとしてそのまま扱う。
fn find_row<'a>(view: &'a View, target: &str) -> Option<&'a RowView> {
    view.rows.iter().find(|row| row.id == target).or_else(|| {
        target
            .parse::<usize>()
            .ok()
            .and_then(|position| position.checked_sub(1))
            .and_then(|index| view.rows.get(index))
    })
}

/// 拡大率をパースする。
fn parse_scale(s: &str) -> Result<f32> {
    let scale = s
        .parse::<f32>()
        .with_context(|| format!("Failed to parse scale: {}", s))?;
    if !scale.is_finite() || scale <= 0.0 {
        anyhow::bail!("Scale must be a positive number: {}", s);
    }

    Ok(scale)
}
