// ============================================
// src/main.rs (メインファイル)
// ============================================

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

mod cli;
mod config;
mod distractor;
mod logging;
mod quiz;
mod services;
mod store;
mod tui;

use cli::{Cli, CliError};
use config::{AppConfig, AppPaths};
use quiz::QuizError;
use services::Capabilities;
use services::translate::TranslateError;
use store::{Store, StoreError};

// --------------------------------------------------
// メイン関数
// --------------------------------------------------

fn main() -> ExitCode {
    let cli = Cli::parse();
    let paths = resolve_paths(&cli);

    match run(cli, &paths) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_failure(&e, &paths.crash_log_file());
            ExitCode::FAILURE
        }
    }
}

/// 入力ミスや翻訳の失敗など、利用者に伝えれば済むエラーか
fn is_expected_failure(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        if let Some(e) = cause.downcast_ref::<StoreError>() {
            return !matches!(e, StoreError::Database(_));
        }
        if let Some(e) = cause.downcast_ref::<QuizError>() {
            return !matches!(e, QuizError::Store(StoreError::Database(_)));
        }
        cause.is::<TranslateError>() || cause.is::<CliError>()
    })
}

/// 想定内のエラーはメッセージだけ、それ以外はクラッシュログにも残す
fn report_failure(err: &anyhow::Error, crash_log: &Path) {
    log::error!("{err:#}");
    eprintln!("エラー: {err:#}");
    if is_expected_failure(err) {
        return;
    }
    let detail = format!("{err:?}");
    if let Err(e) = logging::append_crash_record(crash_log, &detail) {
        eprintln!("クラッシュログを書けませんでした ({}): {e}", crash_log.display());
        eprintln!("{detail}");
    }
    eprintln!(
        "予期せぬエラーが発生しました。詳細は {} を確認してください。",
        crash_log.display()
    );
}

/// --config が指定されていれば、そのディレクトリに全部置く
fn resolve_paths(cli: &Cli) -> AppPaths {
    match cli.config.as_ref().and_then(|p| p.parent()) {
        Some(dir) if !dir.as_os_str().is_empty() => AppPaths::in_dir(dir.to_path_buf()),
        Some(_) => AppPaths::in_dir(PathBuf::from(".")),
        None => AppPaths::resolve(),
    }
}

fn run(cli: Cli, paths: &AppPaths) -> Result<()> {
    paths
        .ensure()
        .with_context(|| format!("保存先 {} を作成できません", paths.data_dir.display()))?;
    if let Err(e) = logging::init_logger(&paths.log_file()) {
        eprintln!("ログファイルを開けません: {e}");
    }

    let config_file = cli.config.clone().unwrap_or_else(|| paths.config_file());
    let config = AppConfig::load(&config_file);

    let db_path = cli
        .db
        .clone()
        .unwrap_or_else(|| config.resolve_db_path(paths));
    let store = Store::open(&db_path)
        .with_context(|| format!("データベース {} を開けません", db_path.display()))?;
    log::info!("データベース: {}", db_path.display());

    match cli.command {
        Some(command) => cli::run(command, &store, &config),
        None => {
            logging::install_panic_hook(paths.crash_log_file(), tui::restore_terminal_quietly);
            let caps = Capabilities::detect(&config.deepl_api_key);
            let mut app = tui::App::new(store, config, caps)?;
            app.config_path = Some(config_file.clone());
            let config = tui::run(app).context("画面の表示に失敗しました")?;
            config
                .save(&config_file)
                .with_context(|| format!("設定 {} を保存できません", config_file.display()))?;
            Ok(())
        }
    }
}
