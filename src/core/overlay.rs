use crate::domain::model::{CellAddress, EditEntry};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;

#[derive(Debug, Clone, PartialEq, Eq)]
struct OverlayValue {
    value: String,
    edited_at: DateTime<Utc>,
}

/// 使用者在本次工作階段的編輯紀錄。
///
/// 只記錄實際改過的儲存格；同一位址後寫覆蓋先寫。不會自動回傳伺服器，
/// 擷取結果本身也不會被改動。
#[derive(Debug, Clone, Default)]
pub struct EditOverlay {
    entries: IndexMap<CellAddress, OverlayValue>,
}

impl EditOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, address: &CellAddress) -> Option<&str> {
        self.entries.get(address).map(|entry| entry.value.as_str())
    }

    /// 寫入一筆編輯，回傳同一位址先前的值
    pub fn set(&mut self, address: CellAddress, value: String) -> Option<String> {
        tracing::debug!("Overlay write at {}", address);
        self.entries
            .insert(
                address,
                OverlayValue {
                    value,
                    edited_at: Utc::now(),
                },
            )
            .map(|previous| previous.value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        if !self.entries.is_empty() {
            tracing::info!("Discarding {} edit(s) of the replaced preview", self.entries.len());
        }
        self.entries.clear();
    }

    /// 依首次編輯順序匯出
    pub fn entries(&self) -> Vec<EditEntry> {
        self.entries
            .iter()
            .map(|(address, entry)| EditEntry {
                address: address.clone(),
                value: entry.value.clone(),
                edited_at: entry.edited_at,
            })
            .collect()
    }
}
