use crate::config::toml_config::DefaultsConfig;
use crate::domain::model::{
    ConfigParameters, FIELD_BODENDICKE, FIELD_DURCHMESSER, FIELD_EINFAERBEN, FIELD_HOEHE,
    FIELD_ROHRDICKE, FIELD_SOHLENKOTE, FIELD_WANDDICKE, PARAMETER_FIELDS,
};
use crate::utils::error::{ReviewError, Result};

/// 預設參數表單。只保存使用者輸入的原始文字，不驗證也不轉型，
/// 值是否合理由後端判斷。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterForm {
    values: ConfigParameters,
}

impl From<&DefaultsConfig> for ParameterForm {
    fn from(defaults: &DefaultsConfig) -> Self {
        Self {
            values: ConfigParameters {
                default_sohlenkote: defaults.sohlenkote.clone(),
                default_durchmesser: defaults.durchmesser.clone(),
                default_hoehe: defaults.hoehe.clone(),
                default_wanddicke: defaults.wanddicke.clone(),
                default_bodendicke: defaults.bodendicke.clone(),
                default_rohrdicke: defaults.rohrdicke.clone(),
                einfaerben: defaults.einfaerben,
            },
        }
    }
}

impl Default for ParameterForm {
    fn default() -> Self {
        Self::from(&DefaultsConfig::default())
    }
}

impl ParameterForm {
    /// 讀取目前的表單值
    pub fn collect(&self) -> ConfigParameters {
        self.values.clone()
    }

    fn slot(&mut self, field: &str) -> Option<&mut String> {
        let values = &mut self.values;
        match field {
            FIELD_SOHLENKOTE => Some(&mut values.default_sohlenkote),
            FIELD_DURCHMESSER => Some(&mut values.default_durchmesser),
            FIELD_HOEHE => Some(&mut values.default_hoehe),
            FIELD_WANDDICKE => Some(&mut values.default_wanddicke),
            FIELD_BODENDICKE => Some(&mut values.default_bodendicke),
            FIELD_ROHRDICKE => Some(&mut values.default_rohrdicke),
            _ => None,
        }
    }

    /// 以表單欄位名稱或省略 `default_` 的短名設定文字值
    pub fn set(&mut self, field: &str, value: impl Into<String>) -> Result<()> {
        let canonical = canonical_field(field);
        match self.slot(&canonical) {
            Some(slot) => {
                *slot = value.into();
                Ok(())
            }
            None => Err(ReviewError::validation(format!(
                "Unbekanntes Feld '{}' (erlaubt: {})",
                field,
                PARAMETER_FIELDS.join(", ")
            ))),
        }
    }

    pub fn set_colorize(&mut self, enabled: bool) {
        self.values.einfaerben = enabled;
    }

    /// 以後端 `/config` 回傳的值更新表單；未知鍵略過
    pub fn apply_remote(&mut self, remote: &serde_json::Map<String, serde_json::Value>) -> usize {
        let mut applied = 0;
        for (key, value) in remote {
            if key == FIELD_EINFAERBEN {
                if let Some(flag) = value.as_bool() {
                    self.set_colorize(flag);
                    applied += 1;
                }
                continue;
            }
            let text = match value {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Number(n) => n.to_string(),
                _ => continue,
            };
            if let Some(slot) = self.slot(key) {
                *slot = text;
                applied += 1;
            } else {
                tracing::debug!("Ignoring remote config key {}", key);
            }
        }
        applied
    }
}

fn canonical_field(field: &str) -> String {
    if field.starts_with("default_") {
        field.to_string()
    } else {
        format!("default_{}", field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_collect_returns_raw_text() {
        let mut form = ParameterForm::default();
        form.set("default_hoehe", "abc").unwrap();
        form.set("durchmesser", " 1,5 ").unwrap();
        form.set_colorize(true);

        let params = form.collect();
        assert_eq!(params.default_hoehe, "abc");
        assert_eq!(params.default_durchmesser, " 1,5 ");
        assert_eq!(params.default_sohlenkote, "100.0");
        assert!(params.einfaerben);
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let mut form = ParameterForm::default();
        assert!(form.set("farbe", "rot").is_err());
        assert_eq!(form, ParameterForm::default());
    }

    #[test]
    fn test_apply_remote_config() {
        let mut form = ParameterForm::default();
        let remote = json!({
            "default_sohlenkote": 98.5,
            "default_rohrdicke": "0.03",
            "einfaerben": true,
            "unknown": 1
        });

        let applied = form.apply_remote(remote.as_object().unwrap());

        assert_eq!(applied, 3);
        let params = form.collect();
        assert_eq!(params.default_sohlenkote, "98.5");
        assert_eq!(params.default_rohrdicke, "0.03");
        assert!(params.einfaerben);
    }
}
