use crate::core::hierarchy::{render, PreviewTree};
use crate::core::resolver::ValueResolver;
use crate::domain::model::{ConfigParameters, ExtractionResult, UploadFile, UNKNOWN_STRUCTURE};
use crate::domain::ports::ConversionBackend;
use crate::utils::error::{ReviewError, Result};

pub const EXTRACTION_FAILED: &str = "Fehler beim Extrahieren der Daten";
pub const NO_DATA: &str = "Keine Daten extrahiert.";
pub const BACKEND_UNREACHABLE: &str = "Server nicht erreichbar";
pub const BACKEND_TIMEOUT: &str = "Zeitüberschreitung bei der Anfrage an den Server";

/// 擷取請求的序號；只有最新的請求結果會套用到預覽區
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RequestTicket(u64);

/// 預覽區目前的內容
#[derive(Debug, Clone, Default, PartialEq)]
pub enum PreviewArea {
    #[default]
    Empty,
    Loading,
    Tree(PreviewTree),
    Message(String),
}

impl PreviewArea {
    pub fn tree(&self) -> Option<&PreviewTree> {
        match self {
            Self::Tree(tree) => Some(tree),
            _ => None,
        }
    }

    pub fn tree_mut(&mut self) -> Option<&mut PreviewTree> {
        match self {
            Self::Tree(tree) => Some(tree),
            _ => None,
        }
    }
}

/// 上傳檔案並取得擷取結果。單檔平面格式以第一個檔名作為模型名稱。
pub async fn extract<B>(
    backend: &B,
    files: &[UploadFile],
    parameters: &ConfigParameters,
) -> Result<ExtractionResult>
where
    B: ConversionBackend + ?Sized,
{
    let Some(first) = files.first() else {
        return Err(ReviewError::validation("Keine Dateien ausgewählt"));
    };

    tracing::info!("📤 Extracting data from {} file(s)", files.len());
    let body = backend.extract(files, parameters).await?;
    let result = ExtractionResult::from_json(body, &first.name)?;
    tracing::info!("📥 Extraction returned {} model(s)", result.models.len());
    Ok(result)
}

/// 擷取失敗時預覽區顯示的在地化訊息
pub fn failure_message(error: &ReviewError) -> String {
    match error {
        ReviewError::EmptyResult => NO_DATA.to_string(),
        ReviewError::Decode { message } if message == UNKNOWN_STRUCTURE => message.clone(),
        ReviewError::Network { message, .. }
        | ReviewError::ServerReported { message }
        | ReviewError::Decode { message }
        | ReviewError::ValidationError { message } => {
            format!("{}: {}", EXTRACTION_FAILED, message)
        }
        ReviewError::Transport(e) if e.is_timeout() => {
            format!("{}: {}", EXTRACTION_FAILED, BACKEND_TIMEOUT)
        }
        ReviewError::Transport(e) if e.is_connect() => {
            format!("{}: {}", EXTRACTION_FAILED, BACKEND_UNREACHABLE)
        }
        // 其餘錯誤的英文細節只寫進日誌
        other => format!("{}: {}", EXTRACTION_FAILED, other.user_friendly_message()),
    }
}

/// 擷取流程控制：發號、過濾過期回應、把結果渲染成預覽
#[derive(Debug, Clone, Default)]
pub struct ExtractionClient {
    latest: u64,
    resolver: ValueResolver,
}

impl ExtractionClient {
    pub fn new(resolver: ValueResolver) -> Self {
        Self { latest: 0, resolver }
    }

    /// 每次選檔都發新號，舊號的回應之後一律忽略
    pub fn issue_ticket(&mut self) -> RequestTicket {
        self.latest += 1;
        RequestTicket(self.latest)
    }

    pub fn is_current(&self, ticket: RequestTicket) -> bool {
        ticket.0 == self.latest
    }

    /// 將回應轉為新的預覽區內容；過期的回應回傳 `None`
    pub fn resolve(
        &self,
        ticket: RequestTicket,
        outcome: Result<ExtractionResult>,
    ) -> Option<PreviewArea> {
        if !self.is_current(ticket) {
            tracing::info!(
                "Ignoring superseded extraction response #{} (latest #{})",
                ticket.0,
                self.latest
            );
            return None;
        }

        Some(match outcome {
            Ok(result) => PreviewArea::Tree(render(&result, &self.resolver)),
            Err(error) => {
                tracing::error!("❌ Extraction failed: {}", error);
                PreviewArea::Message(failure_message(&error))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{ConversionReply, ConversionRequest};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    struct MockBackend {
        body: Mutex<Option<Result<serde_json::Value>>>,
        seen_files: Mutex<Vec<String>>,
    }

    impl MockBackend {
        fn returning(body: Result<serde_json::Value>) -> Self {
            Self {
                body: Mutex::new(Some(body)),
                seen_files: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ConversionBackend for MockBackend {
        async fn extract(
            &self,
            files: &[UploadFile],
            _parameters: &ConfigParameters,
        ) -> Result<serde_json::Value> {
            self.seen_files
                .lock()
                .unwrap()
                .extend(files.iter().map(|f| f.name.clone()));
            self.body.lock().unwrap().take().expect("single call")
        }

        async fn convert(&self, _request: &ConversionRequest) -> Result<ConversionReply> {
            unreachable!("extraction tests never convert")
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
            einfaerben: false,
        }
    }

    fn file(name: &str) -> UploadFile {
        UploadFile {
            name: name.to_string(),
            bytes: b"<TRANSFER/>".to_vec(),
        }
    }

    #[tokio::test]
    async fn test_extract_multi_model_response() {
        let backend = MockBackend::returning(Ok(json!({"models": {
            "Netz1": {"kanale": [{"id": 1}]}
        }})));

        let result = extract(&backend, &[file("a.xtf"), file("b.xtf")], &parameters())
            .await
            .unwrap();

        assert!(result.model("Netz1").is_some());
        assert_eq!(*backend.seen_files.lock().unwrap(), vec!["a.xtf", "b.xtf"]);
    }

    #[tokio::test]
    async fn test_extract_flat_response_named_after_first_file() {
        let backend = MockBackend::returning(Ok(json!({"kanale": [{"id": 1}]})));
        let result = extract(&backend, &[file("netz.xtf")], &parameters())
            .await
            .unwrap();
        assert!(result.model("netz.xtf").is_some());
    }

    #[tokio::test]
    async fn test_extract_without_files_sends_nothing() {
        let backend = MockBackend::returning(Ok(json!({})));
        let err = extract(&backend, &[], &parameters()).await.unwrap_err();
        assert!(matches!(err, ReviewError::ValidationError { .. }));
        assert!(backend.seen_files.lock().unwrap().is_empty());
    }

    #[test]
    fn test_superseded_response_is_ignored() {
        let mut client = ExtractionClient::default();
        let first = client.issue_ticket();
        let second = client.issue_ticket();

        let fresh = ExtractionResult::from_json(json!({"models": {"Neu": {"k": [{"id": 1}]}}}), "m")
            .unwrap();
        let stale = ExtractionResult::from_json(json!({"models": {"Alt": {"k": [{"id": 1}]}}}), "m")
            .unwrap();

        let applied = client.resolve(second, Ok(fresh)).unwrap();
        assert_eq!(applied.tree().unwrap().sections[0].label, "Neu");
        assert_eq!(client.resolve(first, Ok(stale)), None);
    }

    #[test]
    fn test_failure_messages() {
        let client = ExtractionClient::default();

        let ticket = RequestTicket(0);
        assert_eq!(
            client.resolve(ticket, Err(ReviewError::EmptyResult)),
            Some(PreviewArea::Message(NO_DATA.to_string()))
        );

        assert_eq!(
            failure_message(&ReviewError::decode(UNKNOWN_STRUCTURE)),
            "Unbekannte Datenstruktur"
        );
        assert_eq!(
            failure_message(&ReviewError::Network {
                status: 400,
                message: "Keine Dateien ausgewählt".to_string()
            }),
            "Fehler beim Extrahieren der Daten: Keine Dateien ausgewählt"
        );
        assert_eq!(
            failure_message(&ReviewError::ServerReported {
                message: "Keine Dateien hochgeladen".to_string()
            }),
            "Fehler beim Extrahieren der Daten: Keine Dateien hochgeladen"
        );
    }

    #[tokio::test]
    async fn test_connection_failure_message_is_localized() {
        // nothing listens on port 9 on the loopback interface
        let err = reqwest::get("http://127.0.0.1:9/extract").await.unwrap_err();
        let message = failure_message(&ReviewError::from(err));

        assert_eq!(
            message,
            format!("{}: {}", EXTRACTION_FAILED, BACKEND_UNREACHABLE)
        );
        assert!(!message.contains("Request failed"));
    }

    #[test]
    fn test_remaining_errors_use_localized_text() {
        let err = ReviewError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "netz.xtf",
        ));
        assert!(failure_message(&err).starts_with("Fehler beim Extrahieren der Daten: Dateifehler"));
    }
}
