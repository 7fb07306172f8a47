// ============================================
// src/store/models.rs
// テーブルに対応するデータ構造
// ============================================

use chrono::{DateTime, Local, TimeZone};
use rusqlite::Row;
use serde::{Deserialize, Serialize};

/// 単語帳と例文帳のどちらを扱うか
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CardKind {
    Word,
    Sentence,
}

impl CardKind {
    pub(crate) fn table(self) -> &'static str {
        match self {
            CardKind::Word => "words",
            CardKind::Sentence => "sentences",
        }
    }

    pub(crate) fn english_column(self) -> &'static str {
        match self {
            CardKind::Word => "english_word",
            CardKind::Sentence => "english_sentence",
        }
    }

    pub(crate) fn japanese_column(self) -> &'static str {
        match self {
            CardKind::Word => "japanese_meaning",
            CardKind::Sentence => "japanese_translation",
        }
    }

    /// 画面表示用の名前
    pub fn label(self) -> &'static str {
        match self {
            CardKind::Word => "単語",
            CardKind::Sentence => "例文",
        }
    }
}

/// 単語 or 例文の1行
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: i64,
    pub english: String,
    /// 日本語の意味（単語は `;` 区切りで複数の意味を持てる）
    pub japanese: String,
    /// 登録日時 (UNIX秒)
    pub created_at: i64,
}

impl Card {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            english: row.get(1)?,
            japanese: row.get(2)?,
            created_at: row.get(3)?,
        })
    }

    pub fn created_at_local(&self) -> Option<DateTime<Local>> {
        Local.timestamp_opt(self.created_at, 0).single()
    }
}

/// 間違い問題の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuestionType {
    WordChoice,
    WordListening,
    Sentence,
}

impl QuestionType {
    pub const ALL: [QuestionType; 3] = [
        QuestionType::WordChoice,
        QuestionType::WordListening,
        QuestionType::Sentence,
    ];

    /// DBに保存するタグ
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionType::WordChoice => "word_choice",
            QuestionType::WordListening => "word_listening",
            QuestionType::Sentence => "sentence",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            QuestionType::WordChoice => "単語4択",
            QuestionType::WordListening => "単語リスニング",
            QuestionType::Sentence => "例文リスニング",
        }
    }

    /// 出題元のテーブル
    pub fn card_kind(self) -> CardKind {
        match self {
            QuestionType::WordChoice | QuestionType::WordListening => CardKind::Word,
            QuestionType::Sentence => CardKind::Sentence,
        }
    }
}

/// 間違えた問題の1行
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrongQuestion {
    pub question_type: QuestionType,
    /// 英単語または英文
    pub content: String,
    pub correct_answer: String,
    pub consecutive_correct: u32,
    pub created_at: i64,
}

/// `save_card` の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Created(i64),
    Updated(i64),
}

impl SaveOutcome {
    pub fn id(self) -> i64 {
        match self {
            SaveOutcome::Created(id) | SaveOutcome::Updated(id) => id,
        }
    }

    pub fn verb(self) -> &'static str {
        match self {
            SaveOutcome::Created(_) => "保存",
            SaveOutcome::Updated(_) => "更新",
        }
    }
}

/// 復習で採点したあとの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreOutcome {
    /// 連続正解数が増えた（まだ残る）
    Streak(u32),
    /// 3回連続正解で削除された
    Mastered,
    /// 不正解で 0 に戻った
    Reset,
    /// 対象の行がなかった
    Missing,
}

/// ホーム画面に出す集計
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stats {
    pub words: u64,
    pub sentences: u64,
    pub wrong_word_choice: u64,
    pub wrong_word_listening: u64,
    pub wrong_sentence: u64,
}

impl Stats {
    pub fn wrong_count(&self, question_type: QuestionType) -> u64 {
        match question_type {
            QuestionType::WordChoice => self.wrong_word_choice,
            QuestionType::WordListening => self.wrong_word_listening,
            QuestionType::Sentence => self.wrong_sentence,
        }
    }
}
