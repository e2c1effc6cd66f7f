//! Plain-text rendering of the review session for the terminal.

use crate::app::session::ReviewSession;
use crate::core::conversion::{Notice, NoticeLevel, SubmitControl};
use crate::core::extraction::PreviewArea;
use crate::core::hierarchy::{PreviewTree, Section, SectionBody, Table};
use crate::domain::model::{DownloadLink, EditEntry};
use crate::domain::ports::ConversionBackend;
use tabled::builder::Builder;
use tabled::settings::Style;
use tabled::Tabled;

const LOADING: &str = "Lade Daten...";

/// 預覽區文字
pub fn render_preview(area: &PreviewArea) -> String {
    match area {
        PreviewArea::Empty => String::new(),
        PreviewArea::Loading => LOADING.to_string(),
        PreviewArea::Message(message) => message.clone(),
        PreviewArea::Tree(tree) => render_tree(tree),
    }
}

/// 大綱：關閉的節點只顯示標題，開啟的類別展開成表格
pub fn render_tree(tree: &PreviewTree) -> String {
    let mut out = Vec::new();
    for model in &tree.sections {
        out.push(heading(model, 0));
        if !model.toggle.is_open() {
            continue;
        }
        for category in model.children() {
            out.push(heading(category, 1));
            if let (true, SectionBody::Table(table)) = (category.toggle.is_open(), &category.body) {
                out.extend(render_table(table).lines().map(|line| format!("    {}", line)));
            }
        }
    }
    out.join("\n")
}

fn heading(section: &Section, depth: usize) -> String {
    let marker = if section.toggle.is_open() { "▾" } else { "▸" };
    format!("{}{} {}", "  ".repeat(depth), marker, section.label)
}

/// 資料表；第一欄為列索引，供編輯指令定位
pub fn render_table(table: &Table) -> String {
    let mut builder = Builder::default();

    let mut header = vec!["#".to_string()];
    header.extend(table.columns.iter().flat_map(|c| c.display_headers()));
    builder.push_record(header);

    for row in &table.rows {
        let mut record = vec![row.index.to_string()];
        for (column, cell) in table.columns.iter().zip(&row.cells) {
            record.extend(cell.display_columns(column.kind));
        }
        builder.push_record(record);
    }

    let mut rendered = builder.build();
    rendered.with(Style::sharp());
    rendered.to_string()
}

pub fn render_notices(notices: &[Notice]) -> String {
    notices
        .iter()
        .map(|notice| {
            let icon = match notice.level {
                NoticeLevel::Success => "✅",
                NoticeLevel::Warning => "⚠️",
                NoticeLevel::Error => "❌",
            };
            format!("{} {}", icon, notice.message)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_control(control: &SubmitControl) -> String {
    if control.enabled {
        format!("[ {} ]", control.label)
    } else {
        format!("[ {} ] (deaktiviert)", control.label)
    }
}

#[derive(Tabled)]
struct DownloadRow<'a> {
    #[tabled(rename = "Datei")]
    filename: &'a str,
    #[tabled(rename = "Link")]
    url: &'a str,
}

pub fn render_downloads(links: &[DownloadLink]) -> String {
    if links.is_empty() {
        return String::new();
    }
    let rows = links.iter().map(|link| DownloadRow {
        filename: &link.filename,
        url: &link.url,
    });
    let mut table = tabled::Table::new(rows);
    table.with(Style::sharp());
    table.to_string()
}

#[derive(Tabled)]
struct EditRow {
    #[tabled(rename = "Zelle")]
    cell: String,
    #[tabled(rename = "Wert")]
    value: String,
    #[tabled(rename = "Geändert")]
    edited_at: String,
}

pub fn render_edits(entries: &[EditEntry]) -> String {
    if entries.is_empty() {
        return "Keine Änderungen".to_string();
    }
    let rows = entries.iter().map(|entry| EditRow {
        cell: entry.address.to_string(),
        value: entry.value.clone(),
        edited_at: entry.edited_at.format("%H:%M:%S").to_string(),
    });
    let mut table = tabled::Table::new(rows);
    table.with(Style::sharp());
    table.to_string()
}

/// 整個畫面：選檔資訊、預覽、轉換按鈕、訊息與下載連結
pub fn render_session<B: ConversionBackend>(session: &ReviewSession<B>) -> String {
    let conversion = session.conversion();
    let mut parts = vec![session.selection().info()];

    let preview = render_preview(session.preview());
    if !preview.is_empty() {
        parts.push(preview);
    }
    if let Some(address) = session.editor().editing_address() {
        parts.push(format!("✏️ Bearbeite {}", address));
    }

    parts.push(render_control(conversion.control()));

    let notices = render_notices(conversion.notices());
    if !notices.is_empty() {
        parts.push(notices);
    }
    let downloads = render_downloads(conversion.downloads());
    if !downloads.is_empty() {
        parts.push(downloads);
    }
    parts.join("\n\n")
}
