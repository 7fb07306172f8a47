// ============================================
// src/config.rs
// 設定ファイル（JSON）と保存先ディレクトリ
// ============================================

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "config.json";
const DEFAULT_DB_FILE: &str = "learning.sqlite3";
const LOG_FILE: &str = "tangowiz.log";
const CRASH_LOG_FILE: &str = "error_log.txt";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("設定ファイルを書き込めません: {0}")]
    Io(#[from] std::io::Error),

    #[error("設定をJSONにできません: {0}")]
    Json(#[from] serde_json::Error),
}

/// 設定の中身。無いキーは既定値で埋める
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub deepl_api_key: String,
    /// 空なら data ディレクトリの learning.sqlite3
    pub db_path: Option<PathBuf>,
    /// espeak / say に渡す声の名前
    pub tts_voice: String,
    pub word_quiz_count: usize,
    pub sentence_quiz_count: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            deepl_api_key: String::new(),
            db_path: None,
            tts_voice: "en-us".to_string(),
            word_quiz_count: 10,
            sentence_quiz_count: 5,
        }
    }
}

impl AppConfig {
    /// MARK:ファイルから読み込む（無い・壊れている場合は既定値）
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        let parsed = File::open(path)
            .map_err(ConfigError::from)
            .and_then(|file| Ok(serde_json::from_reader(BufReader::new(file))?));
        match parsed {
            Ok(config) => config,
            Err(e) => {
                log::warn!("設定ファイル {} を読めないため既定値を使います: {e}", path.display());
                Self::default()
            }
        }
    }

    /// MARK:ファイルに保存する
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        log::info!("設定を保存しました: {}", path.display());
        Ok(())
    }

    /// 実際に開くDBファイル
    pub fn resolve_db_path(&self, paths: &AppPaths) -> PathBuf {
        match &self.db_path {
            Some(p) if !p.as_os_str().is_empty() => p.clone(),
            _ => paths.data_dir.join(DEFAULT_DB_FILE),
        }
    }
}

/// OSごとの保存先
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
}

impl AppPaths {
    /// ProjectDirs から決める。取れなければカレントディレクトリ
    pub fn resolve() -> Self {
        match ProjectDirs::from("jp", "Fukumoto0141", "TANGO_WIZ") {
            Some(dirs) => Self {
                config_dir: dirs.config_dir().to_path_buf(),
                data_dir: dirs.data_dir().to_path_buf(),
            },
            None => Self::in_dir(PathBuf::from(".")),
        }
    }

    /// 1つのディレクトリに全部置く
    pub fn in_dir(dir: PathBuf) -> Self {
        Self {
            config_dir: dir.clone(),
            data_dir: dir,
        }
    }

    /// ディレクトリがまだなければ作成する
    pub fn ensure(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.config_dir)?;
        fs::create_dir_all(&self.data_dir)
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }

    pub fn log_file(&self) -> PathBuf {
        self.data_dir.join(LOG_FILE)
    }

    pub fn crash_log_file(&self) -> PathBuf {
        self.data_dir.join(CRASH_LOG_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(&dir.path().join("config.json"));
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.word_quiz_count, 10);
        assert_eq!(config.sentence_quiz_count, 5);
    }

    #[test]
    fn corrupt_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(AppConfig::load(&path), AppConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "deepl_api_key": "abc:fx", "unknown": 1 }"#).unwrap();
        let config = AppConfig::load(&path);
        assert_eq!(config.deepl_api_key, "abc:fx");
        assert_eq!(config.tts_voice, "en-us");
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = AppConfig {
            deepl_api_key: "key".into(),
            db_path: Some(PathBuf::from("/tmp/other.sqlite3")),
            tts_voice: "en-gb".into(),
            word_quiz_count: 20,
            sentence_quiz_count: 3,
        };
        config.save(&path).unwrap();
        assert_eq!(AppConfig::load(&path), config);
    }

    #[test]
    fn db_path_defaults_to_data_dir() {
        let paths = AppPaths::in_dir(PathBuf::from("/data"));
        let mut config = AppConfig::default();
        assert_eq!(config.resolve_db_path(&paths), PathBuf::from("/data/learning.sqlite3"));
        config.db_path = Some(PathBuf::new());
        assert_eq!(config.resolve_db_path(&paths), PathBuf::from("/data/learning.sqlite3"));
        config.db_path = Some(PathBuf::from("mine.db"));
        assert_eq!(config.resolve_db_path(&paths), PathBuf::from("mine.db"));
        assert_eq!(paths.crash_log_file(), PathBuf::from("/data/error_log.txt"));
    }
}
