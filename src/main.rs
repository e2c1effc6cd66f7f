use clap::Parser;
use xtf_review::app::session::read_uploads;
use xtf_review::app::{shell, view};
use xtf_review::config::cli::{
    parse_assignments, parse_remote_value, Command, RemoteConfigAction,
};
use xtf_review::core::conversion::{ConversionClient, ConversionOutcome};
use xtf_review::core::hierarchy::Toggle;
use xtf_review::core::overlay::EditOverlay;
use xtf_review::utils::error::ErrorSeverity;
use xtf_review::utils::{logger, validation::Validate};
use xtf_review::{
    CliConfig, HttpBackend, LocalStorage, ParameterForm, ReviewConfig, ReviewError, ReviewSession,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    let mut config = match ReviewConfig::load_or_default(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            logger::init_cli_logger(cli.verbose);
            exit_with(&e);
        }
    };

    // 初始化日誌
    let verbose = cli.verbose || config.verbose();
    if cli.json_logs || config.json_logs() {
        logger::init_json_logger(verbose);
    } else {
        logger::init_cli_logger(verbose);
    }

    tracing::info!("Starting xtf-review");
    cli.apply_overrides(&mut config);
    if verbose {
        tracing::debug!("Effective config: {:?}", config);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        exit_with(&e);
    }

    if let Err(e) = run(cli.command, config).await {
        exit_with(&e);
    }

    Ok(())
}

async fn run(command: Command, config: ReviewConfig) -> xtf_review::Result<()> {
    let backend = HttpBackend::from_config(&config)?;
    let inputs = LocalStorage::new(".");
    let form = ParameterForm::from(&config.defaults);

    match command {
        Command::Preview { files, expand } => {
            let mut session = new_session(backend, form, &config);
            session.select_paths(&inputs, &files).await?;
            if expand && session.preview().tree().is_some() {
                session.set_all(Toggle::Open)?;
            }
            println!("{}", session.selection().info());
            println!("{}", view::render_preview(session.preview()));
        }
        Command::Convert {
            files,
            download_dir,
        } => {
            let uploads =
                read_uploads(&inputs, &files, &config.backend.allowed_extensions).await?;
            let mut client = ConversionClient::new(false);
            let outcome = client
                .submit(&backend, &uploads, form.collect(), &EditOverlay::new())
                .await;

            println!("{}", view::render_notices(client.notices()));
            match outcome {
                ConversionOutcome::Succeeded { .. } => {
                    println!("{}", view::render_downloads(client.downloads()));
                    if let Some(dir) = download_dir {
                        let target = LocalStorage::new(dir.clone());
                        for link in client.downloads() {
                            let name = backend.download(link, &target).await?;
                            println!("📁 {}", target.resolve(&name).display());
                        }
                    }
                }
                ConversionOutcome::Rejected | ConversionOutcome::Failed => {
                    std::process::exit(1);
                }
            }
        }
        Command::Review {
            files,
            remote_defaults,
        } => {
            let mut session = new_session(backend, form, &config);
            if remote_defaults {
                match session.backend().fetch_remote_config().await {
                    Ok(remote) => {
                        let applied = session.form_mut().apply_remote(&remote);
                        tracing::info!("🔧 Applied {} value(s) from backend config", applied);
                    }
                    Err(e) => tracing::warn!("⚠️ Could not load backend config: {}", e),
                }
            }
            if !files.is_empty() {
                session.select_paths(&inputs, &files).await?;
            }
            shell::run(&mut session, &inputs).await?;
        }
        Command::RemoteConfig { action } => {
            let output = match action {
                RemoteConfigAction::Show => {
                    serde_json::Value::Object(backend.fetch_remote_config().await?)
                }
                RemoteConfigAction::Get { key } => {
                    let value = backend.fetch_remote_value(&key).await?;
                    serde_json::json!({ key: value })
                }
                RemoteConfigAction::Set { key, value } => {
                    let value = parse_remote_value(&value);
                    serde_json::Value::Object(backend.update_remote_value(&key, value).await?)
                }
                RemoteConfigAction::Update { assignments } => {
                    let values = parse_assignments(&assignments)?;
                    tracing::info!("🔧 Updating {} backend default(s)", values.len());
                    serde_json::Value::Object(backend.update_remote_config(&values).await?)
                }
                RemoteConfigAction::Reset => {
                    serde_json::Value::Object(backend.reset_remote_config().await?)
                }
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

fn new_session(
    backend: HttpBackend,
    form: ParameterForm,
    config: &ReviewConfig,
) -> ReviewSession<HttpBackend> {
    ReviewSession::new(
        backend,
        form,
        config.resolver(),
        config.conversion.include_edits,
    )
    .with_allowed_extensions(config.backend.allowed_extensions.clone())
}

fn exit_with(e: &ReviewError) -> ! {
    // 記錄詳細錯誤信息
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    // 根據錯誤嚴重程度決定退出碼
    let exit_code = match e.severity() {
        ErrorSeverity::Low => 1,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code)
}
