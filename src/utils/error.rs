use thiserror::Error;

/// 錯誤分類，對應預覽/轉換流程中的失敗點
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Decode,
    Server,
    EmptyResult,
    Validation,
    Configuration,
    FileSystem,
}

/// 錯誤嚴重程度，CLI 依此決定結束代碼
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Error, Debug)]
pub enum ReviewError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Backend returned HTTP {status}: {message}")]
    Network { status: u16, message: String },

    #[error("Response could not be decoded: {message}")]
    Decode { message: String },

    #[error("Backend reported an error: {message}")]
    ServerReported { message: String },

    #[error("Extraction returned no data")]
    EmptyResult,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

pub type Result<T> = std::result::Result<T, ReviewError>;

impl ReviewError {
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Transport(e) if e.is_decode() => ErrorCategory::Decode,
            Self::Transport(_) | Self::Network { .. } => ErrorCategory::Network,
            Self::Decode { .. } | Self::SerializationError(_) => ErrorCategory::Decode,
            Self::ServerReported { .. } => ErrorCategory::Server,
            Self::EmptyResult => ErrorCategory::EmptyResult,
            Self::ValidationError { .. } => ErrorCategory::Validation,
            Self::ConfigError { .. } | Self::InvalidConfigValueError { .. } => {
                ErrorCategory::Configuration
            }
            Self::IoError(_) => ErrorCategory::FileSystem,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::EmptyResult | ErrorCategory::Validation => ErrorSeverity::Low,
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Decode | ErrorCategory::Server | ErrorCategory::FileSystem => {
                ErrorSeverity::High
            }
            ErrorCategory::Configuration => ErrorSeverity::Critical,
        }
    }

    /// 顯示給使用者的在地化訊息
    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::Transport(_) | Self::Network { .. } => {
                "Ein Fehler ist aufgetreten. Bitte versuchen Sie es erneut.".to_string()
            }
            Self::Decode { .. } | Self::SerializationError(_) => {
                "Die Antwort des Servers konnte nicht gelesen werden.".to_string()
            }
            Self::ServerReported { message } => message.clone(),
            Self::EmptyResult => "Keine Daten extrahiert.".to_string(),
            Self::ValidationError { message } => message.clone(),
            Self::ConfigError { message } => format!("Ungültige Konfiguration: {}", message),
            Self::InvalidConfigValueError { field, reason, .. } => {
                format!("Ungültiger Wert für {}: {}", field, reason)
            }
            Self::IoError(e) => format!("Dateifehler: {}", e),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => "Check that the backend is reachable and retry the action",
            ErrorCategory::Decode => "The backend answered with an unexpected body; check its version",
            ErrorCategory::Server => "Fix the reported input problem and submit again",
            ErrorCategory::EmptyResult => "Select files that contain records",
            ErrorCategory::Validation => "Check the input and try again",
            ErrorCategory::Configuration => "Review the configuration file and CLI overrides",
            ErrorCategory::FileSystem => "Check that the file exists and is readable",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_reported_message_is_verbatim() {
        let err = ReviewError::ServerReported {
            message: "bad input".to_string(),
        };
        assert_eq!(err.user_friendly_message(), "bad input");
        assert_eq!(err.category(), ErrorCategory::Server);
    }

    #[test]
    fn test_network_error_uses_generic_message() {
        let err = ReviewError::Network {
            status: 500,
            message: "Internal Server Error".to_string(),
        };
        assert_eq!(
            err.user_friendly_message(),
            "Ein Fehler ist aufgetreten. Bitte versuchen Sie es erneut."
        );
        assert_eq!(err.severity(), ErrorSeverity::Medium);
    }

    #[test]
    fn test_config_errors_are_critical() {
        assert_eq!(ReviewError::config("x").severity(), ErrorSeverity::Critical);
        assert_eq!(ReviewError::EmptyResult.severity(), ErrorSeverity::Low);
    }
}
