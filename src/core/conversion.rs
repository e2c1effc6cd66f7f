use crate::core::overlay::EditOverlay;
use crate::domain::model::{
    ConfigParameters, ConversionReply, ConversionRequest, DownloadLink, UploadFile,
};
use crate::domain::ports::ConversionBackend;
use crate::utils::error::{ReviewError, Result};

pub const DEFAULT_LABEL: &str = "Convert to IFC";
pub const BUSY_LABEL: &str = "Converting...";
pub const NO_FILES_MESSAGE: &str = "Bitte wählen Sie mindestens eine XTF-Datei aus.";
pub const GENERIC_ERROR: &str = "Ein Fehler ist aufgetreten. Bitte versuchen Sie es erneut.";
const FALLBACK_SUCCESS: &str = "Konvertierung abgeschlossen.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConversionState {
    #[default]
    Idle,
    Submitting,
    Success,
    Failure,
}

/// 轉換按鈕的狀態
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitControl {
    pub enabled: bool,
    pub label: String,
}

impl Default for SubmitControl {
    fn default() -> Self {
        Self {
            enabled: true,
            label: DEFAULT_LABEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionOutcome {
    /// 沒有送出請求（例如未選擇檔案）
    Rejected,
    Succeeded { links: usize },
    Failed,
}

#[derive(Debug, Default)]
struct Lifecycle {
    state: ConversionState,
    control: SubmitControl,
    transitions: Vec<ConversionState>,
}

impl Lifecycle {
    fn transition(&mut self, to: ConversionState) {
        tracing::debug!("Conversion state {:?} -> {:?}", self.state, to);
        self.state = to;
        self.transitions.push(to);
    }
}

/// 提交期間持有按鈕狀態；離開作用域時一定恢復按鈕並回到 Idle，
/// 包含結果渲染失敗或 future 被丟棄的情況。
struct SubmitGuard<'a> {
    lifecycle: &'a mut Lifecycle,
}

impl<'a> SubmitGuard<'a> {
    fn enter(lifecycle: &'a mut Lifecycle) -> Self {
        lifecycle.transitions.clear();
        lifecycle.control.enabled = false;
        lifecycle.control.label = BUSY_LABEL.to_string();
        lifecycle.transition(ConversionState::Submitting);
        Self { lifecycle }
    }

    fn settle(&mut self, state: ConversionState) {
        self.lifecycle.transition(state);
    }
}

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        self.lifecycle.control = SubmitControl::default();
        self.lifecycle.transition(ConversionState::Idle);
    }
}

/// 轉換請求的狀態機：Idle → Submitting → (Success | Failure) → Idle
#[derive(Debug, Default)]
pub struct ConversionClient {
    lifecycle: Lifecycle,
    notices: Vec<Notice>,
    downloads: Vec<DownloadLink>,
    include_edits: bool,
}

impl ConversionClient {
    pub fn new(include_edits: bool) -> Self {
        Self {
            include_edits,
            ..Self::default()
        }
    }

    pub fn state(&self) -> ConversionState {
        self.lifecycle.state
    }

    pub fn control(&self) -> &SubmitControl {
        &self.lifecycle.control
    }

    /// 最近一次提交經過的狀態
    pub fn transitions(&self) -> &[ConversionState] {
        &self.lifecycle.transitions
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn downloads(&self) -> &[DownloadLink] {
        &self.downloads
    }

    /// 送出轉換請求。`&mut self` 保證同一時間只有一個請求在進行。
    pub async fn submit<B>(
        &mut self,
        backend: &B,
        files: &[UploadFile],
        parameters: ConfigParameters,
        overlay: &EditOverlay,
    ) -> ConversionOutcome
    where
        B: ConversionBackend + ?Sized,
    {
        if files.is_empty() {
            tracing::warn!("Conversion rejected: no files selected");
            self.notices = vec![Notice::new(NoticeLevel::Error, NO_FILES_MESSAGE)];
            return ConversionOutcome::Rejected;
        }

        let edits = if self.include_edits {
            overlay.entries()
        } else {
            Vec::new()
        };
        let request = ConversionRequest {
            files: files.to_vec(),
            parameters,
            edits,
        };

        let mut guard = SubmitGuard::enter(&mut self.lifecycle);
        tracing::info!("🚀 Submitting {} file(s) for conversion", files.len());

        let reply = backend.convert(&request).await;
        let (state, outcome) = render_reply(reply, &mut self.notices, &mut self.downloads);
        guard.settle(state);

        outcome
    }
}

fn render_reply(
    reply: Result<ConversionReply>,
    notices: &mut Vec<Notice>,
    downloads: &mut Vec<DownloadLink>,
) -> (ConversionState, ConversionOutcome) {
    // 成功狀態但帶 `error` 欄位：後端自行回報的錯誤，原文顯示
    let reply = reply.and_then(|reply| match reply.reported_error() {
        Some(message) => Err(ReviewError::ServerReported {
            message: message.to_string(),
        }),
        None => Ok(reply),
    });

    match reply {
        Err(error @ ReviewError::ServerReported { .. }) => {
            tracing::error!("❌ Backend rejected conversion: {}", error);
            *notices = vec![Notice::new(NoticeLevel::Error, error.user_friendly_message())];
            (ConversionState::Failure, ConversionOutcome::Failed)
        }
        Err(error) => {
            tracing::error!("❌ Conversion request failed: {}", error);
            *notices = vec![Notice::new(NoticeLevel::Error, GENERIC_ERROR)];
            (ConversionState::Failure, ConversionOutcome::Failed)
        }
        Ok(reply) => {
            let message = reply
                .message
                .clone()
                .unwrap_or_else(|| FALLBACK_SUCCESS.to_string());
            tracing::info!("✅ {}", message);

            let mut rendered = vec![Notice::new(NoticeLevel::Success, message)];
            if let Some(partial) = reply.partial_errors() {
                tracing::warn!("⚠️ Partial conversion errors: {}", partial);
                rendered.push(Notice::new(NoticeLevel::Warning, partial));
            }
            *notices = rendered;

            let links = reply.download_links.len();
            *downloads = reply.download_links;
            (ConversionState::Success, ConversionOutcome::Succeeded { links })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::CellAddress;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    struct MockBackend {
        reply: Mutex<Option<Result<ConversionReply>>>,
        requests: Mutex<Vec<ConversionRequest>>,
    }

    impl MockBackend {
        fn replying(reply: Result<ConversionReply>) -> Self {
            Self {
                reply: Mutex::new(Some(reply)),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn json(body: serde_json::Value) -> Self {
            Self::replying(Ok(serde_json::from_value(body).unwrap()))
        }

        fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ConversionBackend for MockBackend {
        async fn extract(
            &self,
            _files: &[UploadFile],
            _parameters: &ConfigParameters,
        ) -> Result<serde_json::Value> {
            unreachable!("conversion tests never extract")
        }

        async fn convert(&self, request: &ConversionRequest) -> Result<ConversionReply> {
            self.requests.lock().unwrap().push(request.clone());
            self.reply.lock().unwrap().take().expect("single call")
        }
    }

    fn parameters() -> ConfigParameters {
        ConfigParameters {
            default_sohlenkote: "100.0".into(),
            default_durchmesser: "0.8".into(),
            default_hoehe: "0.8".into(),
            default_wanddicke: "0.04".into(),
            default_bodendicke: "0.02".into(),
            default_rohrdicke: "0.02".into(),
            einfaerben: true,
        }
    }

    fn files() -> Vec<UploadFile> {
        vec![UploadFile {
            name: "a.xtf".to_string(),
            bytes: b"<TRANSFER/>".to_vec(),
        }]
    }

    #[tokio::test]
    async fn test_success_renders_links_and_restores_control() {
        let backend = MockBackend::json(json!({
            "message": "OK",
            "downloadLinks": [{"url": "/f/a.ifc", "filename": "a.ifc"}]
        }));
        let mut client = ConversionClient::default();

        let outcome = client
            .submit(&backend, &files(), parameters(), &EditOverlay::new())
            .await;

        assert_eq!(outcome, ConversionOutcome::Succeeded { links: 1 });
        assert_eq!(client.control(), &SubmitControl::default());
        assert_eq!(client.control().label, "Convert to IFC");
        assert_eq!(client.downloads().len(), 1);
        assert_eq!(client.downloads()[0].filename, "a.ifc");
        assert_eq!(client.notices(), &[Notice::new(NoticeLevel::Success, "OK")]);
        assert_eq!(
            client.transitions(),
            &[
                ConversionState::Submitting,
                ConversionState::Success,
                ConversionState::Idle
            ]
        );
    }

    #[tokio::test]
    async fn test_reported_error_is_shown_verbatim() {
        let backend = MockBackend::json(json!({"error": "bad input"}));
        let mut client = ConversionClient::default();

        let outcome = client
            .submit(&backend, &files(), parameters(), &EditOverlay::new())
            .await;

        assert_eq!(outcome, ConversionOutcome::Failed);
        assert!(client.downloads().is_empty());
        assert_eq!(
            client.notices(),
            &[Notice::new(NoticeLevel::Error, "bad input")]
        );
        assert!(client.control().enabled);
        assert_eq!(client.control().label, DEFAULT_LABEL);
        assert_eq!(client.state(), ConversionState::Idle);
        assert_eq!(client.transitions()[1], ConversionState::Failure);
    }

    #[tokio::test]
    async fn test_transport_failure_uses_generic_message() {
        let backend = MockBackend::replying(Err(ReviewError::Network {
            status: 502,
            message: "Bad Gateway".to_string(),
        }));
        let mut client = ConversionClient::default();

        client
            .submit(&backend, &files(), parameters(), &EditOverlay::new())
            .await;

        assert_eq!(
            client.notices(),
            &[Notice::new(NoticeLevel::Error, GENERIC_ERROR)]
        );
        assert!(client.control().enabled);
    }

    #[tokio::test]
    async fn test_no_files_is_rejected_without_request() {
        let backend = MockBackend::json(json!({"message": "unused"}));
        let mut client = ConversionClient::default();

        let outcome = client
            .submit(&backend, &[], parameters(), &EditOverlay::new())
            .await;

        assert_eq!(outcome, ConversionOutcome::Rejected);
        assert_eq!(backend.request_count(), 0);
        assert_eq!(client.notices()[0].message, NO_FILES_MESSAGE);
        assert!(client.transitions().is_empty());
        assert!(client.control().enabled);
    }

    #[tokio::test]
    async fn test_failure_keeps_previous_downloads() {
        let mut client = ConversionClient::default();
        let first = MockBackend::json(json!({
            "message": "OK",
            "downloadLinks": [{"url": "/f/a.ifc", "filename": "a.ifc"}]
        }));
        client
            .submit(&first, &files(), parameters(), &EditOverlay::new())
            .await;

        let second = MockBackend::json(json!({"error": "kaputt"}));
        client
            .submit(&second, &files(), parameters(), &EditOverlay::new())
            .await;

        assert_eq!(client.downloads().len(), 1);
    }

    #[tokio::test]
    async fn test_partial_errors_add_warning() {
        let backend = MockBackend::json(json!({
            "message": "Erfolgreich konvertierte Dateien: a.ifc",
            "errors": "Fehler bei der Konvertierung von b.xtf: leer",
            "downloadLinks": [{"url": "/download/a.ifc", "filename": "a.ifc"}]
        }));
        let mut client = ConversionClient::default();
        client
            .submit(&backend, &files(), parameters(), &EditOverlay::new())
            .await;

        assert_eq!(client.notices().len(), 2);
        assert_eq!(client.notices()[1].level, NoticeLevel::Warning);
    }

    #[tokio::test]
    async fn test_edits_are_only_sent_when_enabled() {
        let mut overlay = EditOverlay::new();
        overlay.set(CellAddress::new("M", "k", 0, "kote"), "412".to_string());

        let backend = MockBackend::json(json!({"message": "OK", "downloadLinks": []}));
        let mut client = ConversionClient::default();
        client.submit(&backend, &files(), parameters(), &overlay).await;
        assert!(backend.requests.lock().unwrap()[0].edits.is_empty());

        let backend = MockBackend::json(json!({"message": "OK", "downloadLinks": []}));
        let mut client = ConversionClient::new(true);
        client.submit(&backend, &files(), parameters(), &overlay).await;
        assert_eq!(backend.requests.lock().unwrap()[0].edits.len(), 1);
    }

    #[test]
    fn test_guard_restores_control_on_early_drop() {
        let mut lifecycle = Lifecycle::default();
        {
            let _guard = SubmitGuard::enter(&mut lifecycle);
        }
        assert_eq!(lifecycle.control, SubmitControl::default());
        assert_eq!(lifecycle.state, ConversionState::Idle);
        assert_eq!(
            lifecycle.transitions,
            vec![ConversionState::Submitting, ConversionState::Idle]
        );
    }
}
