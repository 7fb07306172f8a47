// ============================================
// src/logging.rs
// ログファイルとクラッシュログ
// ============================================

use chrono::Local;
use env_logger::{Builder, Env, Target};

use std::backtrace::Backtrace;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::panic::PanicHookInfo;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

static CRASH_LOG_PATH: OnceLock<PathBuf> = OnceLock::new();

/// TUI が画面を使うので、ログはファイルに書く（RUST_LOG で絞れる、既定は info）
pub fn init_logger(path: &Path) -> io::Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let _ = Builder::from_env(Env::default().default_filter_or("info"))
        .target(Target::Pipe(Box::new(file)))
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] {}: {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .try_init();
    Ok(())
}

/// クラッシュログに1件追記する（時刻 + 内容 + バックトレース）
pub fn append_crash_record(path: &Path, detail: &str) -> io::Result<()> {
    let mut buffer = String::new();
    buffer.push_str(&format!(
        "\n--- TANGO WiZ Error at {} ---\n",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    ));
    buffer.push_str(detail.trim_end());
    buffer.push('\n');
    buffer.push_str("Backtrace:\n");
    buffer.push_str(&format!("{}\n", Backtrace::force_capture()));

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(buffer.as_bytes())
}

fn describe_panic(info: &PanicHookInfo<'_>) -> String {
    let location = info
        .location()
        .map(|loc| format!("{}:{}:{}", loc.file(), loc.line(), loc.column()))
        .unwrap_or_else(|| "不明".to_string());
    let message = if let Some(s) = info.payload().downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = info.payload().downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    };
    format!("panic at {location}: {message}")
}

/// panic したら画面を元に戻してからクラッシュログに書く
pub fn install_panic_hook(crash_log: PathBuf, restore_terminal: fn()) {
    if CRASH_LOG_PATH.set(crash_log).is_err() {
        return;
    }
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        restore_terminal();
        let detail = describe_panic(info);
        log::error!("{detail}");
        if let Some(path) = CRASH_LOG_PATH.get() {
            if let Err(e) = append_crash_record(path, &detail) {
                eprintln!("クラッシュログを書けませんでした: {e}");
            }
        }
        previous(info);
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crash_records_are_appended() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("error_log.txt");
        append_crash_record(&path, "first failure").unwrap();
        append_crash_record(&path, "second failure\n").unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.matches("--- TANGO WiZ Error at").count(), 2);
        assert!(text.contains("first failure\nBacktrace:"));
        assert!(text.contains("second failure\nBacktrace:"));
    }

    #[test]
    fn logger_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("tangowiz.log");
        init_logger(&path).unwrap();
        assert!(path.exists());
    }
}
