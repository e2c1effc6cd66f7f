use crate::domain::model::{Scalar, Value};
use serde::{Deserialize, Serialize};

/// 缺值時顯示的固定字串
pub const MISSING_VALUE: &str = "N/A";
/// 超過巢狀深度上限時的截斷標記
pub const TRUNCATION_MARKER: &str = "…";
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// 數字顯示策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumberFormat {
    /// 原樣顯示（可編輯模式）
    #[default]
    Raw,
    /// 數值與座標分量固定三位小數
    Fixed3,
}

impl std::str::FromStr for NumberFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "raw" => Ok(Self::Raw),
            "fixed3" => Ok(Self::Fixed3),
            other => Err(format!("unknown number format '{}' (raw, fixed3)", other)),
        }
    }
}

/// 將欄位值轉成顯示文字；純函式，不依賴任何畫面
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueResolver {
    number_format: NumberFormat,
    max_depth: usize,
}

impl Default for ValueResolver {
    fn default() -> Self {
        Self::new(NumberFormat::Raw, DEFAULT_MAX_DEPTH)
    }
}

impl ValueResolver {
    pub fn new(number_format: NumberFormat, max_depth: usize) -> Self {
        Self {
            number_format,
            max_depth,
        }
    }

    pub fn resolve(&self, value: &Value) -> String {
        self.resolve_at(value, 0)
    }

    /// 座標值拆成 X/Y 兩個顯示欄；其他值回傳 `None`
    pub fn coordinate_components(&self, value: &Value) -> Option<(String, String)> {
        match value {
            Value::CoordinatePair { c1, c2 } => Some((self.number(c1), self.number(c2))),
            _ => None,
        }
    }

    fn resolve_at(&self, value: &Value, depth: usize) -> String {
        match value {
            Value::CoordinatePair { c1, c2 } => {
                format!("X: {}, Y: {}", self.number(c1), self.number(c2))
            }
            Value::Nested(_) if depth >= self.max_depth => TRUNCATION_MARKER.to_string(),
            Value::Nested(fields) => fields
                .iter()
                .map(|(field, inner)| format!("{}: {}", field, self.resolve_at(inner, depth + 1)))
                .collect::<Vec<_>>()
                .join(", "),
            Value::Absent => MISSING_VALUE.to_string(),
            Value::Scalar(scalar) => self.scalar(scalar),
        }
    }

    fn scalar(&self, scalar: &Scalar) -> String {
        match scalar {
            Scalar::Text(text) => text.clone(),
            Scalar::Number(n) => self.number(n),
            Scalar::Bool(b) => b.to_string(),
        }
    }

    fn number(&self, n: &serde_json::Number) -> String {
        match self.number_format {
            NumberFormat::Raw => n.to_string(),
            NumberFormat::Fixed3 => n
                .as_f64()
                .map(|f| format!("{:.3}", f))
                .unwrap_or_else(|| n.to_string()),
        }
    }
}
