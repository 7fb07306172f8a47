// ============================================
// src/store/mod.rs
// SQLite による単語・例文・間違い問題の保存
// ============================================

mod cards;
mod models;
mod wrong;

pub use cards::CHOICE_POOL_SIZE;
pub use wrong::MASTERY_STREAK;
pub use models::*;

use chrono::{Local, MappedLocalTime, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone};
use rusqlite::{Connection, ErrorCode};
use std::path::Path;
use thiserror::Error;

// --------------------------------------------------
// エラー
// --------------------------------------------------

#[derive(Error, Debug)]
pub enum StoreError {
    /// 英語が重複している（致命的ではない）
    #[error("「{0}」は既に登録されています")]
    AlreadyExists(String),

    #[error("ID {0} のデータが見つかりません")]
    NotFound(i64),

    #[error("データベースエラー: {0}")]
    Database(#[from] rusqlite::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// UNIQUE 制約違反かどうか
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

// --------------------------------------------------
// 日付フィルタ
// --------------------------------------------------

/// 登録日の範囲（両端を含む）。`None` はその側を制限しない
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    /// 全期間
    pub fn all() -> Self {
        Self::default()
    }

    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn is_all(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// 日付を1日分のタイムスタンプ範囲に広げる（開始日 00:00:00 〜 終了日 23:59:59）
    pub fn timestamp_bounds(&self) -> (Option<i64>, Option<i64>) {
        let start = self
            .start
            .map(|d| local_timestamp(d.and_time(NaiveTime::MIN), false));
        let end = self
            .end
            .and_then(|d| d.and_hms_opt(23, 59, 59))
            .map(|dt| local_timestamp(dt, true));
        (start, end)
    }

    /// `WHERE 1=1` の後ろに付ける条件とパラメータ
    pub(crate) fn sql_filter(&self) -> (String, Vec<i64>) {
        let (start, end) = self.timestamp_bounds();
        let mut sql = String::new();
        let mut params = Vec::new();
        if let Some(ts) = start {
            sql.push_str(" AND created_at >= ?");
            params.push(ts);
        }
        if let Some(ts) = end {
            sql.push_str(" AND created_at <= ?");
            params.push(ts);
        }
        (sql, params)
    }

    /// 画面表示用（例: 2024/05/01 ～ 2024/05/07）
    pub fn describe(&self) -> String {
        match (self.start, self.end) {
            (None, None) => "全期間".to_string(),
            (Some(s), Some(e)) if s == e => s.format("%Y/%m/%d").to_string(),
            (Some(s), Some(e)) => format!("{} ～ {}", s.format("%Y/%m/%d"), e.format("%Y/%m/%d")),
            (Some(s), None) => format!("{} ～", s.format("%Y/%m/%d")),
            (None, Some(e)) => format!("～ {}", e.format("%Y/%m/%d")),
        }
    }
}

/// 夏時間の切り替えで飛ぶ時刻を探す幅（分）
const MAX_GAP_MINUTES: u32 = 24 * 60;

/// ローカル時刻をUNIX秒に変換（夏時間の重なりは `latest` で端を広げる）
pub(crate) fn local_timestamp(dt: NaiveDateTime, latest: bool) -> i64 {
    resolve_timestamp(dt, latest, |t| {
        Local.from_local_datetime(t).map(|d| d.timestamp())
    })
}

/// 存在しない時刻なら、開始側は後ろへ・終了側は前へ1分ずつずらして最初の有効な時刻を使う
fn resolve_timestamp<F>(dt: NaiveDateTime, latest: bool, map: F) -> i64
where
    F: Fn(&NaiveDateTime) -> MappedLocalTime<i64>,
{
    let step = if latest {
        TimeDelta::minutes(-1)
    } else {
        TimeDelta::minutes(1)
    };
    let mut candidate = dt;
    for _ in 0..MAX_GAP_MINUTES {
        let mapped = map(&candidate);
        let picked = if latest {
            mapped.latest()
        } else {
            mapped.earliest()
        };
        if let Some(ts) = picked {
            return ts;
        }
        candidate += step;
    }
    dt.and_utc().timestamp()
}

// --------------------------------------------------
// Store 本体
// --------------------------------------------------

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS sentences (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    english_sentence TEXT NOT NULL UNIQUE,
    japanese_translation TEXT NOT NULL,
    created_at INTEGER
);

CREATE TABLE IF NOT EXISTS words (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    english_word TEXT NOT NULL UNIQUE,
    japanese_meaning TEXT NOT NULL,
    created_at INTEGER
);

CREATE TABLE IF NOT EXISTS wrong_questions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    question_type TEXT NOT NULL,
    question_content TEXT NOT NULL,
    correct_answer TEXT NOT NULL,
    consecutive_correct INTEGER DEFAULT 0,
    created_at INTEGER,
    UNIQUE(question_type, question_content)
);
"#;

/// 学習データのストア。UIスレッドだけが触るので Mutex は持たない
pub struct Store {
    conn: Connection,
}

impl Store {
    /// ファイルを開く（なければ作成）してテーブルを用意する
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        log::info!("opened store at {}", path.as_ref().display());
        Self::init(conn)
    }

    /// テスト用のメモリDB
    #[cfg(test)]
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    /// 単語・例文を通した最古と最新の登録日時
    pub fn created_at_bounds(&self) -> StoreResult<(Option<i64>, Option<i64>)> {
        let (oldest, newest) = self.conn.query_row(
            "SELECT MIN(created_at), MAX(created_at) FROM (
                SELECT created_at FROM words
                UNION ALL
                SELECT created_at FROM sentences
            )",
            [],
            |row| Ok((row.get::<_, Option<i64>>(0)?, row.get::<_, Option<i64>>(1)?)),
        )?;
        Ok((oldest, newest))
    }

    /// ホーム画面用の集計
    pub fn stats(&self) -> StoreResult<Stats> {
        Ok(Stats {
            words: self.count_cards(CardKind::Word, &DateRange::all())?,
            sentences: self.count_cards(CardKind::Sentence, &DateRange::all())?,
            wrong_word_choice: self.count_wrong(QuestionType::WordChoice)?,
            wrong_word_listening: self.count_wrong(QuestionType::WordListening)?,
            wrong_sentence: self.count_wrong(QuestionType::Sentence)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("learning.sqlite3");

        let store = Store::open(&path).unwrap();
        store.add_card(CardKind::Word, "apple", "りんご", 100).unwrap();
        drop(store);

        // 二回目のオープンでもデータは残る
        let store = Store::open(&path).unwrap();
        assert_eq!(store.count_cards(CardKind::Word, &DateRange::all()).unwrap(), 1);
    }

    #[test]
    fn date_range_expands_to_full_days() {
        let day = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let range = DateRange::between(day, day);
        let (start, end) = range.timestamp_bounds();
        let (start, end) = (start.unwrap(), end.unwrap());
        assert_eq!(end - start, 24 * 60 * 60 - 1);
    }

    /// 02:00〜02:59 が存在しない日を模した変換
    fn spring_forward(t: &NaiveDateTime) -> MappedLocalTime<i64> {
        let day = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let gap_start = day.and_hms_opt(2, 0, 0).unwrap();
        let gap_end = day.and_hms_opt(3, 0, 0).unwrap();
        if *t >= gap_start && *t < gap_end {
            MappedLocalTime::None
        } else {
            MappedLocalTime::Single(t.and_utc().timestamp())
        }
    }

    #[test]
    fn missing_local_time_moves_to_nearest_valid_minute() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let in_gap = day.and_hms_opt(2, 0, 0).unwrap();

        // 開始側は 03:00 へ、終了側は 01:59 へ寄せる
        let start = resolve_timestamp(in_gap, false, spring_forward);
        assert_eq!(start, day.and_hms_opt(3, 0, 0).unwrap().and_utc().timestamp());
        let end = resolve_timestamp(in_gap, true, spring_forward);
        assert_eq!(end, day.and_hms_opt(1, 59, 0).unwrap().and_utc().timestamp());

        // 普通の時刻はそのまま
        let noon = day.and_hms_opt(12, 0, 0).unwrap();
        assert_eq!(resolve_timestamp(noon, false, spring_forward), noon.and_utc().timestamp());
    }

    #[test]
    fn date_range_always_has_both_bounds() {
        let a = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let (start, end) = DateRange::between(a, a).timestamp_bounds();
        assert!(start.is_some() && end.is_some());
        let (start, end) = DateRange {
            start: Some(a),
            end: None,
        }
        .timestamp_bounds();
        assert!(start.is_some() && end.is_none());
    }

    #[test]
    fn describe_ranges() {
        let a = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let b = NaiveDate::from_ymd_opt(2024, 5, 7).unwrap();
        assert_eq!(DateRange::all().describe(), "全期間");
        assert_eq!(DateRange::between(a, a).describe(), "2024/05/01");
        assert_eq!(DateRange::between(a, b).describe(), "2024/05/01 ～ 2024/05/07");
    }

    #[test]
    fn bounds_and_stats() {
        let store = Store::open_in_memory().unwrap();
        assert_eq!(store.created_at_bounds().unwrap(), (None, None));

        store.add_card(CardKind::Word, "apple", "りんご", 200).unwrap();
        store.add_card(CardKind::Sentence, "I like dogs.", "犬が好きです。", 50).unwrap();
        store.record_miss(QuestionType::Sentence, "I like dogs.", "犬が好きです。").unwrap();

        assert_eq!(store.created_at_bounds().unwrap(), (Some(50), Some(200)));
        let stats = store.stats().unwrap();
        assert_eq!(stats.words, 1);
        assert_eq!(stats.sentences, 1);
        assert_eq!(stats.wrong_count(QuestionType::Sentence), 1);
        assert_eq!(stats.wrong_count(QuestionType::WordChoice), 0);
    }
}
