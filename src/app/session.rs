use crate::config::form::ParameterForm;
use crate::core::cell_editor::{Activation, CellEditor, CommitOutcome};
use crate::core::conversion::{ConversionClient, ConversionOutcome};
use crate::core::extraction::{self, ExtractionClient, PreviewArea, RequestTicket};
use crate::core::hierarchy::{PreviewTree, SectionKey, Toggle};
use crate::core::overlay::EditOverlay;
use crate::core::resolver::ValueResolver;
use crate::domain::model::{CellAddress, ConfigParameters, ExtractionResult, UploadFile};
use crate::domain::ports::{ConversionBackend, Storage};
use crate::utils::error::{ReviewError, Result};
use crate::utils::validation;
use std::path::Path;

/// 目前選擇的上傳檔案
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSelection {
    files: Vec<UploadFile>,
}

impl FileSelection {
    pub fn new(files: Vec<UploadFile>) -> Self {
        Self { files }
    }

    pub fn files(&self) -> &[UploadFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.files.iter().map(|f| f.name.as_str()).collect()
    }

    /// 檔案選擇器旁的說明文字
    pub fn info(&self) -> String {
        if self.files.is_empty() {
            "Keine Dateien ausgewählt".to_string()
        } else {
            format!("{} Datei(en) ausgewählt", self.files.len())
        }
    }
}

/// 讀取上傳檔案；`allowed_extensions` 為空時不檢查副檔名
pub async fn read_uploads<S: Storage>(
    storage: &S,
    paths: &[String],
    allowed_extensions: &[String],
) -> Result<Vec<UploadFile>> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let name = Path::new(path)
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ReviewError::validation(format!("Ungültiger Pfad: {}", path)))?
            .to_string();
        files.push(name);
    }

    if !allowed_extensions.is_empty() {
        validation::validate_file_extensions("files", &files, allowed_extensions)?;
    }

    let mut uploads = Vec::with_capacity(paths.len());
    for (path, name) in paths.iter().zip(files) {
        let bytes = storage.read_file(path).await?;
        tracing::debug!("Read {} ({} bytes)", name, bytes.len());
        uploads.push(UploadFile { name, bytes });
    }
    Ok(uploads)
}

/// 一次審閱工作階段：表單、選檔、預覽、編輯與轉換狀態都在這裡，
/// 互動只透過方法呼叫進來。
pub struct ReviewSession<B> {
    backend: B,
    form: ParameterForm,
    selection: FileSelection,
    extraction: ExtractionClient,
    preview: PreviewArea,
    overlay: EditOverlay,
    editor: CellEditor,
    conversion: ConversionClient,
    allowed_extensions: Vec<String>,
}

impl<B: ConversionBackend> ReviewSession<B> {
    pub fn new(backend: B, form: ParameterForm, resolver: ValueResolver, include_edits: bool) -> Self {
        Self {
            backend,
            form,
            selection: FileSelection::default(),
            extraction: ExtractionClient::new(resolver),
            preview: PreviewArea::Empty,
            overlay: EditOverlay::new(),
            editor: CellEditor::new(),
            conversion: ConversionClient::new(include_edits),
            allowed_extensions: Vec::new(),
        }
    }

    /// 限制可選的副檔名（空清單表示不限制）
    pub fn with_allowed_extensions(mut self, extensions: Vec<String>) -> Self {
        self.allowed_extensions = extensions;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn form(&self) -> &ParameterForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut ParameterForm {
        &mut self.form
    }

    pub fn selection(&self) -> &FileSelection {
        &self.selection
    }

    pub fn preview(&self) -> &PreviewArea {
        &self.preview
    }

    pub fn overlay(&self) -> &EditOverlay {
        &self.overlay
    }

    pub fn editor(&self) -> &CellEditor {
        &self.editor
    }

    pub fn conversion(&self) -> &ConversionClient {
        &self.conversion
    }

    pub fn parameters(&self) -> ConfigParameters {
        self.form.collect()
    }

    /// 從 storage 讀取檔案後替換選擇，並重新擷取預覽
    pub async fn select_paths<S: Storage>(&mut self, storage: &S, paths: &[String]) -> Result<()> {
        let files = read_uploads(storage, paths, &self.allowed_extensions).await?;
        self.select(files).await;
        Ok(())
    }

    /// 選擇變更即觸發擷取；空選擇清除預覽
    pub async fn select(&mut self, files: Vec<UploadFile>) {
        self.selection = FileSelection::new(files);
        tracing::info!("{}", self.selection.info());

        match self.begin_extraction() {
            Some((ticket, files, parameters)) => {
                let outcome = extraction::extract(&self.backend, &files, &parameters).await;
                self.finish_extraction(ticket, outcome);
            }
            None => self.replace_preview(PreviewArea::Empty),
        }
    }

    /// 發出新號並進入載入狀態；沒有檔案時回傳 `None`
    pub fn begin_extraction(&mut self) -> Option<(RequestTicket, Vec<UploadFile>, ConfigParameters)> {
        let ticket = self.extraction.issue_ticket();
        if self.selection.is_empty() {
            return None;
        }
        self.replace_preview(PreviewArea::Loading);
        Some((ticket, self.selection.files().to_vec(), self.form.collect()))
    }

    /// 套用擷取結果；過期號碼的結果直接丟棄，回傳是否已套用
    pub fn finish_extraction(&mut self, ticket: RequestTicket, outcome: Result<ExtractionResult>) -> bool {
        match self.extraction.resolve(ticket, outcome) {
            Some(area) => {
                self.replace_preview(area);
                true
            }
            None => false,
        }
    }

    /// 預覽被替換時，舊的編輯紀錄與進行中的編輯一併作廢
    fn replace_preview(&mut self, area: PreviewArea) {
        if !self.overlay.is_empty() {
            self.overlay.clear();
        }
        self.editor.reset();
        self.preview = area;
    }

    fn tree_mut(&mut self) -> Result<&mut PreviewTree> {
        self.preview
            .tree_mut()
            .ok_or_else(|| ReviewError::validation("Keine Vorschau vorhanden"))
    }

    pub fn toggle(&mut self, key: &SectionKey) -> Result<Toggle> {
        self.tree_mut()?
            .toggle(key)
            .ok_or_else(|| ReviewError::validation(format!("Unbekannter Abschnitt: {}", key)))
    }

    pub fn set_all(&mut self, toggle: Toggle) -> Result<()> {
        self.tree_mut()?.set_all(toggle);
        Ok(())
    }

    pub fn edit(&mut self, address: CellAddress) -> Result<Activation> {
        let tree = self
            .preview
            .tree_mut()
            .ok_or_else(|| ReviewError::validation("Keine Vorschau vorhanden"))?;
        self.editor.activate(address, tree, &mut self.overlay)
    }

    pub fn input(&mut self, text: impl Into<String>) -> Result<()> {
        self.editor.input(text)
    }

    pub fn commit(&mut self) -> CommitOutcome {
        match self.preview.tree_mut() {
            Some(tree) => self.editor.commit(tree, &mut self.overlay),
            None => {
                self.editor.reset();
                CommitOutcome::Idle
            }
        }
    }

    pub fn cancel(&mut self) -> Option<CellAddress> {
        self.editor.cancel()
    }

    pub fn set_parameter(&mut self, field: &str, value: impl Into<String>) -> Result<()> {
        self.form.set(field, value)
    }

    pub fn set_colorize(&mut self, enabled: bool) {
        self.form.set_colorize(enabled);
    }

    /// 按下轉換：進行中的編輯先失焦提交，再送出請求
    pub async fn convert(&mut self) -> ConversionOutcome {
        if self.editor.is_editing() {
            self.commit();
        }
        let parameters = self.form.collect();
        self.conversion
            .submit(&self.backend, self.selection.files(), parameters, &self.overlay)
            .await
    }
}
