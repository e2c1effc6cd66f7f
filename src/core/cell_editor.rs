use crate::core::hierarchy::PreviewTree;
use crate::core::overlay::EditOverlay;
use crate::domain::model::CellAddress;
use crate::utils::error::{ReviewError, Result};

/// 單一儲存格的編輯狀態：顯示 → 編輯中 → (提交) → 顯示
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CellState {
    #[default]
    Display,
    Editing {
        address: CellAddress,
        original: String,
        buffer: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// 沒有正在編輯的儲存格
    Idle,
    /// 內容未變，還原原文，不寫入編輯紀錄
    Unchanged { address: CellAddress },
    Changed {
        address: CellAddress,
        previous: String,
        value: String,
    },
    /// 編輯期間預覽已被替換，儲存格不存在
    Stale { address: CellAddress },
    /// 座標格輸入不是 `X: a, Y: b`，保留原值
    Rejected { address: CellAddress, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    Started {
        seed: String,
        /// 切換儲存格時，先前的編輯視同失焦而提交
        committed: Option<CommitOutcome>,
    },
    AlreadyEditing,
}

/// 點擊即編輯的控制器。同一時間只會有一個儲存格處於編輯中。
#[derive(Debug, Clone, Default)]
pub struct CellEditor {
    state: CellState,
}

impl CellEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &CellState {
        &self.state
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.state, CellState::Editing { .. })
    }

    pub fn editing_address(&self) -> Option<&CellAddress> {
        match &self.state {
            CellState::Editing { address, .. } => Some(address),
            CellState::Display => None,
        }
    }

    pub fn activate(
        &mut self,
        address: CellAddress,
        tree: &mut PreviewTree,
        overlay: &mut EditOverlay,
    ) -> Result<Activation> {
        if self.editing_address() == Some(&address) {
            return Ok(Activation::AlreadyEditing);
        }

        if tree.cell(&address).is_none() {
            return Err(ReviewError::validation(format!(
                "Unbekannte Zelle: {}",
                address
            )));
        }

        let committed = if self.is_editing() {
            Some(self.commit(tree, overlay))
        } else {
            None
        };

        let seed = tree
            .cell(&address)
            .map(|cell| cell.text())
            .unwrap_or_default();

        tracing::debug!("Editing {}", address);
        self.state = CellState::Editing {
            address,
            original: seed.clone(),
            buffer: seed.clone(),
        };
        Ok(Activation::Started { seed, committed })
    }

    /// 更新輸入框內容
    pub fn input(&mut self, text: impl Into<String>) -> Result<()> {
        match &mut self.state {
            CellState::Editing { buffer, .. } => {
                *buffer = text.into();
                Ok(())
            }
            CellState::Display => Err(ReviewError::validation(
                "Keine Zelle im Bearbeitungsmodus",
            )),
        }
    }

    /// 失焦或確認：有變更時更新顯示並寫入編輯紀錄
    pub fn commit(&mut self, tree: &mut PreviewTree, overlay: &mut EditOverlay) -> CommitOutcome {
        let CellState::Editing {
            address,
            original,
            buffer,
        } = std::mem::take(&mut self.state)
        else {
            return CommitOutcome::Idle;
        };

        let Some(cell) = tree.cell_mut(&address) else {
            tracing::warn!("Dropping edit of {}: cell no longer exists", address);
            return CommitOutcome::Stale { address };
        };

        if buffer == original {
            return CommitOutcome::Unchanged { address };
        }

        if !cell.apply_text(&buffer) {
            tracing::warn!("Rejected edit of {}: '{}' is not a coordinate", address, buffer);
            return CommitOutcome::Rejected {
                address,
                value: buffer,
            };
        }
        overlay.set(address.clone(), buffer.clone());
        tracing::info!("Edited {}: '{}' -> '{}'", address, original, buffer);
        CommitOutcome::Changed {
            address,
            previous: original,
            value: buffer,
        }
    }

    /// 放棄編輯，儲存格維持原文
    pub fn cancel(&mut self) -> Option<CellAddress> {
        match std::mem::take(&mut self.state) {
            CellState::Editing { address, .. } => Some(address),
            CellState::Display => None,
        }
    }

    /// 預覽被替換時呼叫
    pub fn reset(&mut self) {
        if let Some(address) = self.cancel() {
            tracing::debug!("Abandoning edit of {} after preview refresh", address);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::hierarchy::{render, ColumnKind};
    use crate::core::resolver::ValueResolver;
    use crate::domain::model::ExtractionResult;
    use serde_json::json;

    fn tree() -> PreviewTree {
        let result = ExtractionResult::from_json(
            json!({"models": {"Netz1": {"kanale": [
                {"id": 1, "bezeichnung": "K1", "lage": {"c1": 10.5, "c2": 20.25}},
                {"id": 2, "bezeichnung": "K2", "lage": {"c1": 1, "c2": 2}}
            ]}}}),
            "preview",
        )
        .unwrap();
        render(&result, &ValueResolver::default())
    }

    fn address(row: usize, field: &str) -> CellAddress {
        CellAddress::new("Netz1", "kanale", row, field)
    }

    #[test]
    fn test_unchanged_commit_leaves_everything_untouched() {
        let mut tree = tree();
        let mut overlay = EditOverlay::new();
        let mut editor = CellEditor::new();
        let before = tree.clone();

        let activation = editor
            .activate(address(0, "bezeichnung"), &mut tree, &mut overlay)
            .unwrap();
        assert_eq!(
            activation,
            Activation::Started {
                seed: "K1".to_string(),
                committed: None
            }
        );

        let outcome = editor.commit(&mut tree, &mut overlay);
        assert_eq!(
            outcome,
            CommitOutcome::Unchanged {
                address: address(0, "bezeichnung")
            }
        );
        assert_eq!(tree, before);
        assert!(overlay.is_empty());
        assert!(!editor.is_editing());
    }

    #[test]
    fn test_changed_commit_writes_exactly_one_entry() {
        let mut tree = tree();
        let mut overlay = EditOverlay::new();
        overlay.set(address(1, "bezeichnung"), "older".to_string());
        let mut editor = CellEditor::new();

        editor
            .activate(address(1, "bezeichnung"), &mut tree, &mut overlay)
            .unwrap();
        editor.input("Kanal 2").unwrap();
        let outcome = editor.commit(&mut tree, &mut overlay);

        assert!(matches!(outcome, CommitOutcome::Changed { ref value, .. } if value == "Kanal 2"));
        assert_eq!(overlay.len(), 1);
        assert_eq!(overlay.get(&address(1, "bezeichnung")), Some("Kanal 2"));
        assert_eq!(
            tree.cell(&address(1, "bezeichnung")).unwrap().text(),
            "Kanal 2"
        );
        assert_eq!(tree.cell(&address(0, "bezeichnung")).unwrap().text(), "K1");
    }

    #[test]
    fn test_coordinate_cell_seeds_combined_text() {
        let mut tree = tree();
        let mut overlay = EditOverlay::new();
        let mut editor = CellEditor::new();

        let activation = editor
            .activate(address(0, "lage"), &mut tree, &mut overlay)
            .unwrap();
        assert!(matches!(activation, Activation::Started { ref seed, .. } if seed == "X: 10.5, Y: 20.25"));
    }

    #[test]
    fn test_activating_same_cell_twice_is_noop() {
        let mut tree = tree();
        let mut overlay = EditOverlay::new();
        let mut editor = CellEditor::new();

        editor.activate(address(0, "id"), &mut tree, &mut overlay).unwrap();
        editor.input("7").unwrap();
        let again = editor.activate(address(0, "id"), &mut tree, &mut overlay).unwrap();

        assert_eq!(again, Activation::AlreadyEditing);
        match editor.state() {
            CellState::Editing { buffer, .. } => assert_eq!(buffer, "7"),
            CellState::Display => panic!("editor should still be editing"),
        }
    }

    #[test]
    fn test_switching_cells_commits_pending_edit() {
        let mut tree = tree();
        let mut overlay = EditOverlay::new();
        let mut editor = CellEditor::new();

        editor.activate(address(0, "id"), &mut tree, &mut overlay).unwrap();
        editor.input("10").unwrap();
        let activation = editor
            .activate(address(1, "id"), &mut tree, &mut overlay)
            .unwrap();

        match activation {
            Activation::Started { seed, committed } => {
                assert_eq!(seed, "2");
                assert!(matches!(committed, Some(CommitOutcome::Changed { .. })));
            }
            Activation::AlreadyEditing => panic!("expected a new edit"),
        }
        assert_eq!(overlay.get(&address(0, "id")), Some("10"));
        assert_eq!(editor.editing_address(), Some(&address(1, "id")));
    }

    #[test]
    fn test_cancel_reverts_without_overlay_write() {
        let mut tree = tree();
        let mut overlay = EditOverlay::new();
        let mut editor = CellEditor::new();

        editor.activate(address(0, "id"), &mut tree, &mut overlay).unwrap();
        editor.input("99").unwrap();
        assert_eq!(editor.cancel(), Some(address(0, "id")));

        assert!(overlay.is_empty());
        assert_eq!(tree.cell(&address(0, "id")).unwrap().text(), "1");
        assert_eq!(editor.commit(&mut tree, &mut overlay), CommitOutcome::Idle);
    }

    #[test]
    fn test_unknown_cell_and_input_without_edit() {
        let mut tree = tree();
        let mut overlay = EditOverlay::new();
        let mut editor = CellEditor::new();

        assert!(editor
            .activate(address(5, "id"), &mut tree, &mut overlay)
            .is_err());
        assert!(editor.input("x").is_err());
    }

    #[test]
    fn test_stale_commit_after_tree_replacement() {
        let mut tree = tree();
        let mut overlay = EditOverlay::new();
        let mut editor = CellEditor::new();

        editor.activate(address(1, "id"), &mut tree, &mut overlay).unwrap();
        editor.input("x").unwrap();
        let mut replaced = PreviewTree::default();

        assert_eq!(
            editor.commit(&mut replaced, &mut overlay),
            CommitOutcome::Stale {
                address: address(1, "id")
            }
        );
        assert!(overlay.is_empty());
    }

    #[test]
    fn test_coordinate_edit_stays_split() {
        let mut tree = tree();
        let mut overlay = EditOverlay::new();
        let mut editor = CellEditor::new();

        editor.activate(address(0, "lage"), &mut tree, &mut overlay).unwrap();
        editor.input("X: 11, Y: 20.25").unwrap();
        let outcome = editor.commit(&mut tree, &mut overlay);

        assert!(matches!(outcome, CommitOutcome::Changed { .. }));
        let cell = tree.cell(&address(0, "lage")).unwrap();
        assert_eq!(
            cell.display_columns(ColumnKind::Coordinate),
            vec!["11".to_string(), "20.25".to_string()]
        );
        assert_eq!(overlay.get(&address(0, "lage")), Some("X: 11, Y: 20.25"));
    }

    #[test]
    fn test_malformed_coordinate_edit_is_rejected() {
        let mut tree = tree();
        let mut overlay = EditOverlay::new();
        let mut editor = CellEditor::new();
        let before = tree.clone();

        editor.activate(address(1, "lage"), &mut tree, &mut overlay).unwrap();
        editor.input("2600000 / 1200000").unwrap();
        let outcome = editor.commit(&mut tree, &mut overlay);

        assert_eq!(
            outcome,
            CommitOutcome::Rejected {
                address: address(1, "lage"),
                value: "2600000 / 1200000".to_string()
            }
        );
        assert_eq!(tree, before);
        assert!(overlay.is_empty());
        assert!(!editor.is_editing());
    }
}
