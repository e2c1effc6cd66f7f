use crate::core::resolver::{NumberFormat, ValueResolver, DEFAULT_MAX_DEPTH};
use crate::utils::error::{ReviewError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use url::Url;

pub const DEFAULT_CONFIG_PATH: &str = "xtf-review.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReviewConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub conversion: ConversionConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    pub extract_path: String,
    pub convert_path: String,
    pub config_path: String,
    /// multipart 檔案欄位名稱（兩個端點共用）
    pub files_field: String,
    pub timeout_seconds: u64,
    pub allowed_extensions: Vec<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            extract_path: "/extract".to_string(),
            convert_path: "/convert".to_string(),
            config_path: "/config".to_string(),
            files_field: "xtfFiles".to_string(),
            timeout_seconds: 120,
            allowed_extensions: vec!["xtf".to_string()],
        }
    }
}

/// 表單的初始值；數字也可寫成字串，一律以原始文字保存
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    #[serde(deserialize_with = "raw_text")]
    pub sohlenkote: String,
    #[serde(deserialize_with = "raw_text")]
    pub durchmesser: String,
    #[serde(deserialize_with = "raw_text")]
    pub hoehe: String,
    #[serde(deserialize_with = "raw_text")]
    pub wanddicke: String,
    #[serde(deserialize_with = "raw_text")]
    pub bodendicke: String,
    #[serde(deserialize_with = "raw_text")]
    pub rohrdicke: String,
    pub einfaerben: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            sohlenkote: "100.0".to_string(),
            durchmesser: "0.8".to_string(),
            hoehe: "0.8".to_string(),
            wanddicke: "0.04".to_string(),
            bodendicke: "0.02".to_string(),
            rohrdicke: "0.02".to_string(),
            einfaerben: false,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawText {
    Text(String),
    Integer(i64),
    Float(f64),
}

fn raw_text<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RawText::deserialize(deserializer)? {
        RawText::Text(text) => text,
        RawText::Integer(i) => i.to_string(),
        RawText::Float(f) => format!("{:?}", f),
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub number_format: NumberFormat,
    pub max_depth: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            number_format: NumberFormat::Raw,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// 轉換時附上本地編輯（`edits` 欄位）
    pub include_edits: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub log_format: Option<String>,
    pub verbose: Option<bool>,
}

impl ReviewConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ReviewError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 檔案不存在且為預設路徑時使用內建預設值
    pub fn load_or_default(path: &str) -> Result<Self> {
        if path == DEFAULT_CONFIG_PATH && !Path::new(path).exists() {
            tracing::debug!("No {} found, using built-in defaults", path);
            return Ok(Self::default());
        }
        Self::from_file(path)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content)
            .map_err(|e| ReviewError::config(format!("TOML parsing error: {}", e)))
    }

    /// 替換環境變數 (例如 ${XTF_BACKEND_URL})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}")
            .map_err(|e| ReviewError::config(format!("Invalid substitution pattern: {}", e)))?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_url("backend.base_url", &self.backend.base_url)?;
        validation::validate_endpoint_path("backend.extract_path", &self.backend.extract_path)?;
        validation::validate_endpoint_path("backend.convert_path", &self.backend.convert_path)?;
        validation::validate_endpoint_path("backend.config_path", &self.backend.config_path)?;
        validation::validate_non_empty_string("backend.files_field", &self.backend.files_field)?;
        validation::validate_positive_number(
            "backend.timeout_seconds",
            self.backend.timeout_seconds as usize,
            1,
        )?;
        validation::validate_positive_number("display.max_depth", self.display.max_depth, 1)?;

        if let Some(format) = self
            .monitoring
            .as_ref()
            .and_then(|m| m.log_format.as_deref())
        {
            if !["compact", "json"].contains(&format) {
                return Err(ReviewError::InvalidConfigValueError {
                    field: "monitoring.log_format".to_string(),
                    value: format.to_string(),
                    reason: "Valid formats: compact, json".to_string(),
                });
            }
        }

        Ok(())
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        let base = Url::parse(&self.backend.base_url)
            .map_err(|e| ReviewError::config(format!("backend.base_url: {}", e)))?;
        base.join(path)
            .map_err(|e| ReviewError::config(format!("{}: {}", path, e)))
    }

    pub fn extract_url(&self) -> Result<Url> {
        self.endpoint(&self.backend.extract_path)
    }

    pub fn convert_url(&self) -> Result<Url> {
        self.endpoint(&self.backend.convert_path)
    }

    pub fn config_url(&self) -> Result<Url> {
        self.endpoint(&self.backend.config_path)
    }

    pub fn base_url(&self) -> Result<Url> {
        self.endpoint("/")
    }

    pub fn resolver(&self) -> ValueResolver {
        ValueResolver::new(self.display.number_format, self.display.max_depth)
    }

    pub fn json_logs(&self) -> bool {
        self.monitoring
            .as_ref()
            .and_then(|m| m.log_format.as_deref())
            == Some("json")
    }

    pub fn verbose(&self) -> bool {
        self.monitoring
            .as_ref()
            .and_then(|m| m.verbose)
            .unwrap_or(false)
    }
}

impl Validate for ReviewConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = ReviewConfig::from_toml_str("").unwrap();
        assert_eq!(config.backend.files_field, "xtfFiles");
        assert_eq!(config.defaults.sohlenkote, "100.0");
        assert_eq!(config.display.number_format, NumberFormat::Raw);
        assert!(!config.conversion.include_edits);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[backend]
base_url = "https://converter.example.com/app/"
files_field = "xtfFile"
timeout_seconds = 30

[defaults]
sohlenkote = 412.5
durchmesser = "1.0"
hoehe = 2
einfaerben = true

[display]
number_format = "fixed3"
max_depth = 8

[conversion]
include_edits = true

[monitoring]
log_format = "json"
"#;

        let config = ReviewConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.backend.files_field, "xtfFile");
        assert_eq!(config.defaults.sohlenkote, "412.5");
        assert_eq!(config.defaults.durchmesser, "1.0");
        assert_eq!(config.defaults.hoehe, "2");
        assert_eq!(config.defaults.wanddicke, "0.04");
        assert!(config.defaults.einfaerben);
        assert_eq!(config.display.number_format, NumberFormat::Fixed3);
        assert!(config.conversion.include_edits);
        assert!(config.json_logs());
        assert_eq!(
            config.extract_url().unwrap().as_str(),
            "https://converter.example.com/extract"
        );
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("XTF_REVIEW_TEST_BACKEND", "https://backend.test");

        let toml_content = r#"
[backend]
base_url = "${XTF_REVIEW_TEST_BACKEND}"
"#;

        let config = ReviewConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.backend.base_url, "https://backend.test");

        std::env::remove_var("XTF_REVIEW_TEST_BACKEND");
    }

    #[test]
    fn test_config_validation() {
        let invalid_url = ReviewConfig::from_toml_str("[backend]\nbase_url = \"invalid-url\"").unwrap();
        assert!(invalid_url.validate().is_err());

        let bad_path = ReviewConfig::from_toml_str("[backend]\nconvert_path = \"convert\"").unwrap();
        assert!(bad_path.validate().is_err());

        let bad_depth = ReviewConfig::from_toml_str("[display]\nmax_depth = 0").unwrap();
        assert!(bad_depth.validate().is_err());

        let bad_logs = ReviewConfig::from_toml_str("[monitoring]\nlog_format = \"xml\"").unwrap();
        assert!(bad_logs.validate().is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[backend]\nbase_url = \"http://127.0.0.1:9000\"\n")
            .unwrap();

        let config = ReviewConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(
            config.convert_url().unwrap().as_str(),
            "http://127.0.0.1:9000/convert"
        );
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        assert!(ReviewConfig::load_or_default("/definitely/not/here.toml").is_err());
    }
}
