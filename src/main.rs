use std::{io, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fern::colors::{Color, ColoredLevelConfig};
use log::{info, warn, LevelFilter};

mod add_command;
mod app;
mod calculator;
mod config;
mod console;
mod datetime;
mod duration_format;
mod entry;
mod entry_command;
mod entry_store;
mod form;
mod snapshot;
mod storage;
mod view;

use add_command::AddArgs;
use app::{App, Outcome};
use config::Config;
use console::{ConsoleMarkdownList, ConsolePresenter};
use entry_command::{DescribeArgs, ExportArgs, RemoveArgs};
use entry_store::EntryStore;
use form::FormController;
use snapshot::SvgSnapshotExporter;
use storage::{FileSlot, KeyValueSlot, MemorySlot};
use view::Renderer;

/// 移動時間からアヴスパセリングを計算し、記録するためのCLIアプリケーション。
///
/// # Examples
/// ```
/// $ cargo run -- add --arrival 2024-01-08T08:00 --departure 2024-01-08T16:00 --fraction 1/3
/// $ cargo run -- list
/// ```
#[derive(Debug, Parser)]
#[clap(version, about)]
struct Args {
    #[clap(
        long = "data-dir",
        help = "Directory to store entries in",
        global = true
    )]
    data_dir: Option<PathBuf>,

    #[clap(short = 'v', long = "verbose", help = "Show debug logs", global = true)]
    verbose: bool,

    #[clap(subcommand)]
    subcommand: SubCommands,
}

/// サブコマンドを表す列挙型。
#[derive(Debug, Subcommand)]
enum SubCommands {
    /// Calculate avspasering for a trip and save it
    Add(AddArgs),
    /// Show saved entries
    List,
    /// Change the description of an entry
    Describe(DescribeArgs),
    /// Remove an entry
    Remove(RemoveArgs),
    /// Save an entry as an image
    Export(ExportArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logger(args.verbose).context("Failed to set up logger")?;
    let config = Config::from_env(args.data_dir).context("Failed to load configuration")?;

    match config.entries_file() {
        Some(path) => {
            info!("Entries file: {}", path.display());
            run(FileSlot::new(path), &config, args.subcommand).await
        }
        None => {
            warn!("No data directory available, entries are kept for this run only");
            run(MemorySlot::new(), &config, args.subcommand).await
        }
    }
}

/// サブコマンドを処理し、結果と一覧を表示する。
async fn run<S: KeyValueSlot>(slot: S, config: &Config, subcommand: SubCommands) -> Result<()> {
    let store = EntryStore::load(slot);
    let form = FormController::new(config.default_fraction.clone(), config.completion_reference);

    let mut download_dir = PathBuf::from(".");
    let mut scale = 2.0;
    let view = Renderer::new(true).render(store.entries());
    let command = match subcommand {
        SubCommands::Add(add) => Some(add.into_command()),
        SubCommands::List => None,
        SubCommands::Describe(describe) => Some(describe.into_command(&view)),
        SubCommands::Remove(remove) => Some(remove.into_command(&view)),
        SubCommands::Export(export) => {
            download_dir = export.output.clone();
            scale = export.scale;
            Some(export.into_command(&view))
        }
    };
    let mut app =
        App::new(store, form, Some(SvgSnapshotExporter), download_dir).with_scale(scale);

    let outcome = match command {
        Some(command) => app.dispatch(command).await,
        None => Outcome::from_view(app.view()),
    };

    let stdout = io::stdout();
    let mut writer = stdout.lock();
    let mut presenter = ConsoleMarkdownList::new(&mut writer);
    if let Some(message) = &outcome.message {
        presenter.show_message(message)?;
    }
    if let Some(notification) = &outcome.notification {
        presenter.show_message(notification)?;
    }
    if let Some(path) = &outcome.exported {
        presenter.show_message(&format!("Lagret bilde: {}", path.display()))?;
    }
    presenter
        .show_view(&outcome.view)
        .context("Failed to show entries")?;

    Ok(())
}

/// ログの出力を設定する。
///
/// ログは標準エラー出力に書き込み、一覧の出力と混ざらないようにする。
fn setup_logger(verbose: bool) -> Result<(), fern::InitError> {
    let colors = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue);

    fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                chrono::Local::now().format("%H:%M:%S"),
                colors.color(record.level()),
                record.target(),
                message
            ))
        })
        .level(if verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .chain(io::stderr())
        .apply()?;

    Ok(())
}
