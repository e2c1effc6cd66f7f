//! Pure transform from an [`ExtractionResult`] into a tree of collapsible
//! sections and tables. Interaction handling lives in `app::session`; the
//! only mutations offered here are toggling a single section and replacing
//! the text of a single cell.

use crate::core::labels::translate_header;
use crate::core::resolver::{ValueResolver, MISSING_VALUE};
use crate::domain::model::{CellAddress, ExtractionResult, Record, Value};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SectionKey {
    Model(String),
    Category { model: String, category: String },
}

impl SectionKey {
    pub fn model(name: impl Into<String>) -> Self {
        Self::Model(name.into())
    }

    pub fn category(model: impl Into<String>, category: impl Into<String>) -> Self {
        Self::Category {
            model: model.into(),
            category: category.into(),
        }
    }
}

impl std::fmt::Display for SectionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Model(model) => write!(f, "{}", model),
            Self::Category { model, category } => write!(f, "{}/{}", model, category),
        }
    }
}

impl From<&str> for SectionKey {
    fn from(path: &str) -> Self {
        match path.split_once('/') {
            Some((model, category)) => Self::category(model, category),
            None => Self::model(path),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Toggle {
    #[default]
    Closed,
    Open,
}

impl Toggle {
    pub fn flipped(self) -> Self {
        match self {
            Self::Closed => Self::Open,
            Self::Open => Self::Closed,
        }
    }

    pub fn is_open(self) -> bool {
        self == Self::Open
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub key: SectionKey,
    pub label: String,
    pub toggle: Toggle,
    pub body: SectionBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SectionBody {
    Sections(Vec<Section>),
    Table(Table),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Plain,
    /// 座標欄，顯示為 X、Y 兩欄
    Coordinate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub field: String,
    pub header: String,
    pub kind: ColumnKind,
}

impl Column {
    pub fn display_headers(&self) -> Vec<String> {
        match self.kind {
            ColumnKind::Plain => vec![self.header.clone()],
            ColumnKind::Coordinate => vec![
                format!("{} X", self.header),
                format!("{} Y", self.header),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellContent {
    Text(String),
    Coordinate { x: String, y: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub field: String,
    pub content: CellContent,
}

impl Cell {
    /// 儲存格目前顯示的完整文字（編輯時作為初始值）
    pub fn text(&self) -> String {
        match &self.content {
            CellContent::Text(text) => text.clone(),
            CellContent::Coordinate { x, y } => format!("X: {}, Y: {}", x, y),
        }
    }

    /// 以編輯後的文字更新儲存格。座標格只接受 `X: a, Y: b`，
    /// 維持兩欄顯示；格式不符時回傳 `false` 且不改動。
    pub fn apply_text(&mut self, text: &str) -> bool {
        match &self.content {
            CellContent::Text(_) => {
                self.content = CellContent::Text(text.to_string());
                true
            }
            CellContent::Coordinate { .. } => match parse_coordinate(text) {
                Some((x, y)) => {
                    self.content = CellContent::Coordinate { x, y };
                    true
                }
                None => false,
            },
        }
    }

    /// 依欄位型態展開成一或兩個顯示欄
    pub fn display_columns(&self, kind: ColumnKind) -> Vec<String> {
        match (&self.content, kind) {
            (CellContent::Coordinate { x, y }, _) => vec![x.clone(), y.clone()],
            (CellContent::Text(text), ColumnKind::Plain) => vec![text.clone()],
            (CellContent::Text(text), ColumnKind::Coordinate) => vec![text.clone(), String::new()],
        }
    }
}

fn parse_coordinate(text: &str) -> Option<(String, String)> {
    let (x, y) = text.trim().strip_prefix("X:")?.split_once(',')?;
    let (x, y) = (x.trim(), y.trim().strip_prefix("Y:")?.trim());
    if x.is_empty() || y.is_empty() {
        return None;
    }
    Some((x.to_string(), y.to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub index: usize,
    pub cells: Vec<Cell>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub columns: Vec<Column>,
    pub rows: Vec<Row>,
}

impl Table {
    fn from_records(records: &[Record], resolver: &ValueResolver) -> Self {
        let fields: Vec<&String> = records
            .first()
            .map(|first| first.data.keys().collect())
            .unwrap_or_default();

        let columns = fields
            .iter()
            .map(|field| {
                let is_coordinate = records
                    .iter()
                    .any(|record| record.get(field).is_some_and(Value::is_coordinate_pair));
                Column {
                    field: (*field).clone(),
                    header: translate_header(field),
                    kind: if is_coordinate {
                        ColumnKind::Coordinate
                    } else {
                        ColumnKind::Plain
                    },
                }
            })
            .collect();

        let rows = records
            .iter()
            .enumerate()
            .map(|(index, record)| Row {
                index,
                cells: fields
                    .iter()
                    .map(|field| Cell {
                        field: (*field).clone(),
                        content: cell_content(record.get(field), resolver),
                    })
                    .collect(),
            })
            .collect();

        Self { columns, rows }
    }

    pub fn column(&self, field: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.field == field)
    }
}

fn cell_content(value: Option<&Value>, resolver: &ValueResolver) -> CellContent {
    let Some(value) = value else {
        return CellContent::Text(MISSING_VALUE.to_string());
    };
    match resolver.coordinate_components(value) {
        Some((x, y)) => CellContent::Coordinate { x, y },
        None => CellContent::Text(resolver.resolve(value)),
    }
}

/// 渲染後的預覽樹；與原始擷取結果分離，編輯只會改動這裡的顯示文字
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreviewTree {
    pub sections: Vec<Section>,
}

pub fn render(result: &ExtractionResult, resolver: &ValueResolver) -> PreviewTree {
    let sections = result
        .models
        .iter()
        .map(|(model, record_set)| {
            let categories = record_set
                .non_empty_categories()
                .map(|(category, records)| Section {
                    key: SectionKey::category(model.as_str(), category.as_str()),
                    label: format!("{} ({})", translate_header(category), records.len()),
                    toggle: Toggle::Closed,
                    body: SectionBody::Table(Table::from_records(records, resolver)),
                })
                .collect();

            Section {
                key: SectionKey::model(model.as_str()),
                label: model.clone(),
                toggle: Toggle::Closed,
                body: SectionBody::Sections(categories),
            }
        })
        .collect();

    tracing::debug!("Rendered {} model section(s)", result.models.len());
    PreviewTree { sections }
}

impl PreviewTree {
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn section(&self, key: &SectionKey) -> Option<&Section> {
        let model = self.model_section(key)?;
        match key {
            SectionKey::Model(_) => Some(model),
            SectionKey::Category { .. } => model.children().iter().find(|s| &s.key == key),
        }
    }

    fn section_mut(&mut self, key: &SectionKey) -> Option<&mut Section> {
        let model_name = match key {
            SectionKey::Model(model) | SectionKey::Category { model, .. } => model,
        };
        let model = self
            .sections
            .iter_mut()
            .find(|s| matches!(&s.key, SectionKey::Model(m) if m == model_name))?;
        match key {
            SectionKey::Model(_) => Some(model),
            SectionKey::Category { .. } => match &mut model.body {
                SectionBody::Sections(children) => children.iter_mut().find(|s| &s.key == key),
                SectionBody::Table(_) => None,
            },
        }
    }

    fn model_section(&self, key: &SectionKey) -> Option<&Section> {
        let model_name = match key {
            SectionKey::Model(model) | SectionKey::Category { model, .. } => model,
        };
        self.sections
            .iter()
            .find(|s| matches!(&s.key, SectionKey::Model(m) if m == model_name))
    }

    /// 只切換指定節點，不影響兄弟或上層節點
    pub fn toggle(&mut self, key: &SectionKey) -> Option<Toggle> {
        let section = self.section_mut(key)?;
        section.toggle = section.toggle.flipped();
        Some(section.toggle)
    }

    pub fn set_all(&mut self, toggle: Toggle) {
        for model in &mut self.sections {
            model.toggle = toggle;
            if let SectionBody::Sections(children) = &mut model.body {
                for child in children {
                    child.toggle = toggle;
                }
            }
        }
    }

    pub fn table(&self, model: &str, category: &str) -> Option<&Table> {
        match &self.section(&SectionKey::category(model, category))?.body {
            SectionBody::Table(table) => Some(table),
            SectionBody::Sections(_) => None,
        }
    }

    fn table_mut(&mut self, model: &str, category: &str) -> Option<&mut Table> {
        match &mut self.section_mut(&SectionKey::category(model, category))?.body {
            SectionBody::Table(table) => Some(table),
            SectionBody::Sections(_) => None,
        }
    }

    pub fn cell(&self, address: &CellAddress) -> Option<&Cell> {
        self.table(&address.model, &address.category)?
            .rows
            .get(address.row)?
            .cells
            .iter()
            .find(|c| c.field == address.field)
    }

    pub fn cell_mut(&mut self, address: &CellAddress) -> Option<&mut Cell> {
        self.table_mut(&address.model, &address.category)?
            .rows
            .get_mut(address.row)?
            .cells
            .iter_mut()
            .find(|c| c.field == address.field)
    }
}

impl Section {
    pub fn children(&self) -> &[Section] {
        match &self.body {
            SectionBody::Sections(children) => children,
            SectionBody::Table(_) => &[],
        }
    }
}
