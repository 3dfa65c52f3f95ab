use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::datetime;
use crate::entry_store::EntryStore;
use crate::form::{FormController, FormData};
use crate::snapshot::{
    snapshot_filename, ExportControls, ExportError, SnapshotCard, SnapshotExporter,
};
use crate::storage::KeyValueSlot;
use crate::view::{Renderer, View};

/// 画面の操作から発行されるコマンド。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Submit(FormData),
    EditDescription { id: String, text: String },
    Remove { id: String },
    Export { id: String },
}

/// コマンドを処理した結果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// 処理後の一覧。
    pub view: View,
    /// フォームに表示するメッセージ。
    pub message: Option<String>,
    /// 利用者に通知する内容。
    pub notification: Option<String>,
    /// 出力したスナップショットのパス。
    pub exported: Option<PathBuf>,
}

impl Outcome {
    /// 一覧のみを持つ結果を返す。
    pub fn from_view(view: View) -> Self {
        Self {
            view,
            message: None,
            notification: None,
            exported: None,
        }
    }
}

/// エントリー一覧、フォーム、表示、スナップショット出力をまとめる。
///
/// 一覧を変更するコマンドは必ずストアを経由し、表示は処理のたびにストアから作り直す。
pub struct App<S: KeyValueSlot, E: SnapshotExporter> {
    store: EntryStore<S>,
    form: FormController,
    renderer: Renderer,
    exporter: Option<E>,
    controls: ExportControls,
    download_dir: PathBuf,
    scale: f32,
}

impl<S: KeyValueSlot, E: SnapshotExporter> App<S, E> {
    /// 新しい`App`を返す。
    ///
    /// # Arguments
    ///
    /// * `store` - エントリー一覧
    /// * `form` - フォーム
    /// * `exporter` - スナップショットの出力機能。利用できない場合は`None`
    /// * `download_dir` - スナップショットの保存先
    pub fn new(
        store: EntryStore<S>,
        form: FormController,
        exporter: Option<E>,
        download_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            renderer: Renderer::new(exporter.is_some()),
            store,
            form,
            exporter,
            controls: ExportControls::default(),
            download_dir: download_dir.into(),
            scale: 2.0,
        }
    }

    /// スナップショットの拡大率を設定する。
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    /// 現在の一覧から表示内容を作成する。
    pub fn view(&self) -> View {
        self.renderer.render(self.store.entries())
    }

    /// コマンドを処理し、処理後の表示内容を返す。
    pub async fn dispatch(&mut self, command: Command) -> Outcome {
        let mut message = None;
        let mut notification = None;
        let mut exported = None;

        match command {
            Command::Submit(data) => {
                self.form.submit(data, &mut self.store);
                message = self.form.message().map(str::to_string);
            }
            Command::EditDescription { id, text } => {
                if !self.store.update_description(&id, &text) {
                    warn!("No entry to describe: {}", id);
                    notification = Some(not_found(&id));
                }
            }
            Command::Remove { id } => {
                if self.store.remove(&id) {
                    info!("Removed entry {}", id);
                } else {
                    warn!("No entry to remove: {}", id);
                    notification = Some(not_found(&id));
                }
            }
            Command::Export { id } => match self.export(&id).await {
                Ok(Some(path)) => exported = Some(path),
                Ok(None) if self.store.get(&id).is_none() => {
                    notification = Some(not_found(&id));
                }
                Ok(None) => {}
                Err(err) => {
                    warn!("Export of {} failed: {}", id, err);
                    notification = Some(format!("Kunne ikke lage bilde: {}", err));
                }
            },
        }

        Outcome {
            view: self.view(),
            message,
            notification,
            exported,
        }
    }

    /// エントリーをスナップショットとして出力し、保存したパスを返す。
    ///
    /// 出力中の同じエントリーに対しては何もせず`None`を返す。
    async fn export(&self, id: &str) -> Result<Option<PathBuf>, ExportError> {
        let exporter = self.exporter.as_ref().ok_or(ExportError::Unavailable)?;
        let Some(entry) = self.store.get(id) else {
            warn!("No entry to export: {}", id);
            return Ok(None);
        };
        let Some(_guard) = self.controls.disable(id) else {
            info!("Export of {} is already running", id);
            return Ok(None);
        };

        let card = SnapshotCard::from_entry(entry);
        let result = exporter.export(&card, self.scale).await;
        drop(card);
        let bytes = result?;

        let filename = snapshot_filename(
            entry,
            exporter.extension(),
            datetime::now().date_naive(),
        );
        let path = download(&self.download_dir, &filename, &bytes).await?;
        info!("Exported {} to {}", id, path.display());

        Ok(Some(path))
    }
}

/// 指定されたIDのエントリーがない場合の通知。
fn not_found(id: &str) -> String {
    format!("Fant ingen beregning med id {}.", id)
}

/// 画像をダウンロード先に保存する。
async fn download(dir: &Path, filename: &str, bytes: &[u8]) -> Result<PathBuf, ExportError> {
    let path = dir.join(filename);
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|err| ExportError::Failed(format!("{}: {}", dir.display(), err)))?;
    tokio::fs::write(&path, bytes)
        .await
        .map_err(|err| ExportError::Failed(format!("{}: {}", path.display(), err)))?;

    Ok(path)
}
