use crate::utils::error::{ReviewError, Result};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// 標量欄位值，數字保留伺服器傳來的原始表示
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Text(String),
    Number(serde_json::Number),
    Bool(bool),
}

/// 擷取結果中的單一欄位值
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// JSON `null` 或欄位不存在
    Absent,
    Scalar(Scalar),
    /// 平面座標（`c1`/`c2`），顯示時拆成兩欄
    CoordinatePair {
        c1: serde_json::Number,
        c2: serde_json::Number,
    },
    Nested(IndexMap<String, Value>),
}

impl Value {
    pub fn is_coordinate_pair(&self) -> bool {
        matches!(self, Value::CoordinatePair { .. })
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Absent,
            serde_json::Value::Bool(b) => Value::Scalar(Scalar::Bool(b)),
            serde_json::Value::Number(n) => Value::Scalar(Scalar::Number(n)),
            serde_json::Value::String(s) => Value::Scalar(Scalar::Text(s)),
            serde_json::Value::Array(items) => Value::Nested(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(index, item)| (index.to_string(), Value::from(item)))
                    .collect(),
            ),
            serde_json::Value::Object(map) => {
                // 只要同時帶有數值 c1、c2 就視為座標，其餘欄位忽略
                if let (Some(serde_json::Value::Number(c1)), Some(serde_json::Value::Number(c2))) =
                    (map.get("c1"), map.get("c2"))
                {
                    return Value::CoordinatePair {
                        c1: c1.clone(),
                        c2: c2.clone(),
                    };
                }
                Value::Nested(
                    map.into_iter()
                        .map(|(key, item)| (key, Value::from(item)))
                        .collect(),
                )
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    pub data: IndexMap<String, Value>,
}

impl Record {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for Record {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            data: map
                .into_iter()
                .map(|(key, value)| (key, Value::from(value)))
                .collect(),
        }
    }
}

/// 一個模型內各類別的記錄，保持伺服器順序
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelRecordSet {
    pub categories: IndexMap<String, Vec<Record>>,
}

impl ModelRecordSet {
    fn from_object(model: &str, map: serde_json::Map<String, serde_json::Value>) -> Self {
        let mut categories = IndexMap::new();
        for (category, value) in map {
            let serde_json::Value::Array(items) = value else {
                tracing::debug!("Skipping non-list category {}/{}", model, category);
                continue;
            };
            let records = items
                .into_iter()
                .filter_map(|item| match item {
                    serde_json::Value::Object(obj) => Some(Record::from(obj)),
                    other => {
                        tracing::warn!(
                            "Ignoring non-object record in {}/{}: {}",
                            model,
                            category,
                            other
                        );
                        None
                    }
                })
                .collect();
            categories.insert(category, records);
        }
        Self { categories }
    }

    /// 只回傳有記錄的類別
    pub fn non_empty_categories(&self) -> impl Iterator<Item = (&String, &Vec<Record>)> {
        self.categories
            .iter()
            .filter(|(_, records)| !records.is_empty())
    }
}

/// 回應既非多模型格式也非平面格式
pub const UNKNOWN_STRUCTURE: &str = "Unbekannte Datenstruktur";

/// 一次擷取請求的完整結果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractionResult {
    pub models: IndexMap<String, ModelRecordSet>,
}

impl ExtractionResult {
    /// 解析擷取端點的回應。支援 `{"models": {...}}` 多模型格式，
    /// 以及單檔預覽的平面格式（以 `fallback_model` 為模型名稱）。
    pub fn from_json(body: serde_json::Value, fallback_model: &str) -> Result<Self> {
        let serde_json::Value::Object(mut root) = body else {
            return Err(ReviewError::decode(UNKNOWN_STRUCTURE));
        };

        if root.is_empty() {
            return Err(ReviewError::EmptyResult);
        }

        if let Some(models) = root.remove("models") {
            let serde_json::Value::Object(models) = models else {
                return Err(ReviewError::decode(UNKNOWN_STRUCTURE));
            };
            if models.is_empty() {
                return Err(ReviewError::EmptyResult);
            }
            let models = models
                .into_iter()
                .map(|(name, value)| {
                    let set = match value {
                        serde_json::Value::Object(map) => ModelRecordSet::from_object(&name, map),
                        _ => ModelRecordSet::default(),
                    };
                    (name, set)
                })
                .collect();
            return Ok(Self { models });
        }

        let flat = root
            .values()
            .all(|value| value.is_array() || value.is_null());
        if !flat {
            return Err(ReviewError::decode(UNKNOWN_STRUCTURE));
        }

        let mut models = IndexMap::new();
        models.insert(
            fallback_model.to_string(),
            ModelRecordSet::from_object(fallback_model, root),
        );
        Ok(Self { models })
    }

    pub fn model(&self, name: &str) -> Option<&ModelRecordSet> {
        self.models.get(name)
    }
}

/// 轉換參數的表單欄位名稱（與後端約定）
pub const FIELD_SOHLENKOTE: &str = "default_sohlenkote";
pub const FIELD_DURCHMESSER: &str = "default_durchmesser";
pub const FIELD_HOEHE: &str = "default_hoehe";
pub const FIELD_WANDDICKE: &str = "default_wanddicke";
pub const FIELD_BODENDICKE: &str = "default_bodendicke";
pub const FIELD_ROHRDICKE: &str = "default_rohrdicke";
pub const FIELD_EINFAERBEN: &str = "einfaerben";

pub const PARAMETER_FIELDS: [&str; 6] = [
    FIELD_SOHLENKOTE,
    FIELD_DURCHMESSER,
    FIELD_HOEHE,
    FIELD_WANDDICKE,
    FIELD_BODENDICKE,
    FIELD_ROHRDICKE,
];

/// 使用者輸入的預設值，原樣轉交後端，不做型別轉換
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigParameters {
    pub default_sohlenkote: String,
    pub default_durchmesser: String,
    pub default_hoehe: String,
    pub default_wanddicke: String,
    pub default_bodendicke: String,
    pub default_rohrdicke: String,
    pub einfaerben: bool,
}

impl ConfigParameters {
    /// 依表單順序展開成 multipart 文字欄位
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            (FIELD_SOHLENKOTE, self.default_sohlenkote.clone()),
            (FIELD_DURCHMESSER, self.default_durchmesser.clone()),
            (FIELD_HOEHE, self.default_hoehe.clone()),
            (FIELD_WANDDICKE, self.default_wanddicke.clone()),
            (FIELD_BODENDICKE, self.default_bodendicke.clone()),
            (FIELD_ROHRDICKE, self.default_rohrdicke.clone()),
            (FIELD_EINFAERBEN, self.einfaerben.to_string()),
        ]
    }
}

/// 待上傳的檔案
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadLink {
    pub url: String,
    pub filename: String,
}

/// 轉換端點的回應本體
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ConversionReply {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, rename = "downloadLinks")]
    pub download_links: Vec<DownloadLink>,
    #[serde(default)]
    pub error: Option<String>,
    /// 部分檔案失敗時的說明（換行分隔）
    #[serde(default)]
    pub errors: Option<String>,
}

impl ConversionReply {
    /// 空字串與缺少欄位同樣視為沒有錯誤
    pub fn reported_error(&self) -> Option<&str> {
        self.error.as_deref().filter(|e| !e.is_empty())
    }

    pub fn partial_errors(&self) -> Option<&str> {
        self.errors
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
    }
}

/// 單一儲存格的位址：模型、類別、列索引、欄位
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellAddress {
    pub model: String,
    pub category: String,
    pub row: usize,
    pub field: String,
}

impl CellAddress {
    pub fn new(
        model: impl Into<String>,
        category: impl Into<String>,
        row: usize,
        field: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            category: category.into(),
            row,
            field: field.into(),
        }
    }
}

impl std::fmt::Display for CellAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}[{}].{}",
            self.model, self.category, self.row, self.field
        )
    }
}

/// 解析 `模型/類別[列].欄位`
impl std::str::FromStr for CellAddress {
    type Err = ReviewError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || {
            ReviewError::validation(format!(
                "Ungültige Zellenadresse '{}' (Format: Modell/Kategorie[Zeile].Feld)",
                s
            ))
        };
        let (model, rest) = s.split_once('/').ok_or_else(invalid)?;
        let (category, rest) = rest.split_once('[').ok_or_else(invalid)?;
        let (row, field) = rest.split_once("].").ok_or_else(invalid)?;
        let row = row.trim().parse::<usize>().map_err(|_| invalid())?;
        if model.is_empty() || category.is_empty() || field.is_empty() {
            return Err(invalid());
        }
        Ok(Self::new(model, category, row, field))
    }
}

/// 使用者編輯的匯出格式
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditEntry {
    #[serde(flatten)]
    pub address: CellAddress,
    pub value: String,
    pub edited_at: DateTime<Utc>,
}

/// 送往轉換端點的請求
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    pub files: Vec<UploadFile>,
    pub parameters: ConfigParameters,
    /// 為空時不送出 `edits` 欄位
    pub edits: Vec<EditEntry>,
}
