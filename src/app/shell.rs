use crate::app::session::ReviewSession;
use crate::app::view;
use crate::core::cell_editor::{Activation, CommitOutcome};
use crate::core::conversion::ConversionOutcome;
use crate::core::hierarchy::{SectionKey, Toggle};
use crate::domain::model::CellAddress;
use crate::domain::ports::{ConversionBackend, Storage};
use crate::utils::error::{ReviewError, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

pub const HELP: &str = "\
Befehle:
  files <pfad>...            Dateien auswählen (ohne Pfad: Auswahl leeren)
  toggle <modell>[/<kat>]    Abschnitt auf-/zuklappen
  expand | collapse          Alle Abschnitte öffnen / schließen
  edit <modell>/<kat>[<zeile>].<feld>
                             Zelle bearbeiten
  input <text>               Text der bearbeiteten Zelle setzen
  commit | cancel            Bearbeitung übernehmen / verwerfen
  set <feld> <wert>          Konfigurationswert setzen
  colorize on|off            Einfärben umschalten
  convert                    Dateien in IFC konvertieren
  show                       Ansicht anzeigen
  edits                      Änderungen auflisten
  help | quit";

/// 一行指令解析後的互動
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interaction {
    Files(Vec<String>),
    Toggle(SectionKey),
    SetAll(Toggle),
    Edit(CellAddress),
    Input(String),
    Commit,
    Cancel,
    Set { field: String, value: String },
    Colorize(bool),
    Convert,
    Show,
    Edits,
    Help,
    Quit,
}

/// 空白行回傳 `None`
pub fn parse_command(line: &str) -> Result<Option<Interaction>> {
    let trimmed = line.trim_start();
    let (command, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest),
        None => (trimmed.trim_end(), ""),
    };
    let args: Vec<&str> = rest.split_whitespace().collect();

    let interaction = match command {
        "" => return Ok(None),
        "files" => Interaction::Files(args.iter().map(|a| a.to_string()).collect()),
        // 模型名稱來自檔名，可能含空白：整段視為一個位址
        "toggle" => match rest.trim() {
            "" => return Err(usage("toggle <modell>[/<kategorie>]")),
            path => Interaction::Toggle(SectionKey::from(path)),
        },
        "expand" => Interaction::SetAll(Toggle::Open),
        "collapse" => Interaction::SetAll(Toggle::Closed),
        "edit" => match rest.trim() {
            "" => return Err(usage("edit <modell>/<kategorie>[<zeile>].<feld>")),
            address => Interaction::Edit(address.parse()?),
        },
        // 保留內部空白
        "input" => Interaction::Input(rest.trim_end_matches(['\r', '\n']).to_string()),
        "commit" => Interaction::Commit,
        "cancel" => Interaction::Cancel,
        "set" => match args.as_slice() {
            [field, value] => Interaction::Set {
                field: field.to_string(),
                value: value.to_string(),
            },
            [field] => Interaction::Set {
                field: field.to_string(),
                value: String::new(),
            },
            _ => return Err(usage("set <feld> <wert>")),
        },
        "colorize" => match args.as_slice() {
            ["on" | "true" | "ja"] => Interaction::Colorize(true),
            ["off" | "false" | "nein"] => Interaction::Colorize(false),
            _ => return Err(usage("colorize on|off")),
        },
        "convert" => Interaction::Convert,
        "show" => Interaction::Show,
        "edits" => Interaction::Edits,
        "help" | "?" => Interaction::Help,
        "quit" | "exit" => Interaction::Quit,
        other => {
            return Err(ReviewError::validation(format!(
                "Unbekannter Befehl '{}' (help für Hilfe)",
                other
            )))
        }
    };
    Ok(Some(interaction))
}

fn usage(text: &str) -> ReviewError {
    ReviewError::validation(format!("Verwendung: {}", text))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    Continue(String),
    Quit,
}

/// 執行一個互動並回傳要顯示的文字
pub async fn dispatch<B, S>(
    session: &mut ReviewSession<B>,
    storage: &S,
    interaction: Interaction,
) -> Result<Flow>
where
    B: ConversionBackend,
    S: Storage,
{
    let output = match interaction {
        Interaction::Files(paths) => {
            session.select_paths(storage, &paths).await?;
            view::render_session(session)
        }
        Interaction::Toggle(key) => {
            session.toggle(&key)?;
            view::render_preview(session.preview())
        }
        Interaction::SetAll(toggle) => {
            session.set_all(toggle)?;
            view::render_preview(session.preview())
        }
        Interaction::Edit(address) => match session.edit(address)? {
            Activation::AlreadyEditing => "Zelle wird bereits bearbeitet".to_string(),
            Activation::Started { seed, committed } => {
                let mut lines = Vec::new();
                if let Some(outcome) = committed {
                    lines.push(describe_commit(&outcome));
                }
                lines.push(format!("Aktueller Wert: {}", seed));
                lines.join("\n")
            }
        },
        Interaction::Input(text) => {
            session.input(text)?;
            String::new()
        }
        Interaction::Commit => describe_commit(&session.commit()),
        Interaction::Cancel => match session.cancel() {
            Some(address) => format!("Bearbeitung von {} verworfen", address),
            None => "Keine Bearbeitung aktiv".to_string(),
        },
        Interaction::Set { field, value } => {
            session.set_parameter(&field, value)?;
            String::new()
        }
        Interaction::Colorize(enabled) => {
            session.set_colorize(enabled);
            String::new()
        }
        Interaction::Convert => {
            let outcome = session.convert().await;
            tracing::debug!("Conversion outcome: {:?}", outcome);
            let mut text = view::render_notices(session.conversion().notices());
            if let ConversionOutcome::Succeeded { .. } = outcome {
                let downloads = view::render_downloads(session.conversion().downloads());
                if !downloads.is_empty() {
                    text = format!("{}\n{}", text, downloads);
                }
            }
            text
        }
        Interaction::Show => view::render_session(session),
        Interaction::Edits => view::render_edits(&session.overlay().entries()),
        Interaction::Help => HELP.to_string(),
        Interaction::Quit => return Ok(Flow::Quit),
    };
    Ok(Flow::Continue(output))
}

fn describe_commit(outcome: &CommitOutcome) -> String {
    match outcome {
        CommitOutcome::Idle => "Keine Bearbeitung aktiv".to_string(),
        CommitOutcome::Unchanged { address } => format!("{} unverändert", address),
        CommitOutcome::Changed {
            address,
            previous,
            value,
        } => format!("{}: '{}' → '{}'", address, previous, value),
        CommitOutcome::Stale { address } => format!("{} existiert nicht mehr", address),
        CommitOutcome::Rejected { address, value } => format!(
            "'{}' ist keine Koordinate (Format: X: <wert>, Y: <wert>); {} unverändert",
            value, address
        ),
    }
}

/// 從 stdin 逐行讀取指令直到 `quit` 或輸入結束；單一指令失敗不會結束工作階段
pub async fn run<B, S>(session: &mut ReviewSession<B>, storage: &S) -> Result<()>
where
    B: ConversionBackend,
    S: Storage,
{
    println!("{}", view::render_session(session));
    println!("\n{}", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let interaction = match parse_command(&line) {
            Ok(Some(interaction)) => interaction,
            Ok(None) => continue,
            Err(e) => {
                eprintln!("❌ {}", e.user_friendly_message());
                continue;
            }
        };

        match dispatch(session, storage, interaction).await {
            Ok(Flow::Continue(output)) => {
                if !output.is_empty() {
                    println!("{}", output);
                }
            }
            Ok(Flow::Quit) => break,
            Err(e) => {
                tracing::warn!("Command failed: {}", e);
                eprintln!("❌ {}", e.user_friendly_message());
            }
        }
    }

    tracing::info!("Review session closed with {} pending edit(s)", session.overlay().len());
    Ok(())
}
