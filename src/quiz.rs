// ============================================
// src/quiz.rs
// クイズの進行（出題 → 回答 → 次へ / 終了）
// ============================================

use rand::Rng;
use rand::seq::SliceRandom;
use thiserror::Error;

use crate::store::{DateRange, QuestionType, ScoreOutcome, Store, StoreError};

/// 4択の選択肢の数
pub const CHOICE_COUNT: usize = 4;

// --------------------------------------------------
// エラー
// --------------------------------------------------

#[derive(Error, Debug)]
pub enum QuizError {
    #[error("問題数は1以上で指定してください")]
    InvalidCount,

    #[error("指定した期間にクイズに出題できる{0}がありません")]
    NoItemsInRange(&'static str),

    #[error("4択クイズには最低{needed}つの単語が必要です（出題できるのは{available}つ）")]
    InsufficientItems { needed: usize, available: usize },

    #[error("復習対象の{0}問題がありません")]
    EmptyBacklog(&'static str),

    #[error("今は「{0}」できません")]
    InvalidState(&'static str),

    #[error(transparent)]
    Store(#[from] StoreError),
}

// --------------------------------------------------
// データ構造
// --------------------------------------------------

/// 通常クイズか、間違い問題の復習か
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    Normal,
    Review,
}

/// 回答のしかた
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerStyle {
    /// 4つから1つ選ぶ
    Choice,
    /// 答えを見てから自己申告
    Reveal,
}

impl AnswerStyle {
    pub fn for_type(question_type: QuestionType) -> Self {
        match question_type {
            QuestionType::WordChoice => AnswerStyle::Choice,
            QuestionType::WordListening | QuestionType::Sentence => AnswerStyle::Reveal,
        }
    }
}

/// 1問分（英語 → 日本語）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizItem {
    pub prompt: String,
    pub answer: String,
    /// 復習のときだけ、DB上の連続正解数
    pub streak: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// 出題中（答えは隠れている）
    Presenting,
    /// 回答済み（正解を表示中）
    Answered {
        correct: bool,
        outcome: Option<ScoreOutcome>,
    },
    Finished,
}

/// 終了時の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizSummary {
    pub question_type: QuestionType,
    pub kind: SessionKind,
    pub total: usize,
    pub asked: usize,
    pub score: usize,
    pub wrongs: Vec<QuizItem>,
}

impl QuizSummary {
    pub fn message(&self) -> String {
        match self.kind {
            SessionKind::Normal => {
                format!("最終結果: {} 問中 {} 問正解！", self.total, self.score)
            }
            SessionKind::Review => {
                format!("復習終了：{} 問取り組み、{} 問正解", self.asked, self.score)
            }
        }
    }
}

/// クイズ1回分の状態
#[derive(Debug)]
pub struct QuizSession {
    question_type: QuestionType,
    kind: SessionKind,
    style: AnswerStyle,
    /// 開始時点のスナップショット
    items: Vec<QuizItem>,
    /// まだ出していない問題のインデックス
    remaining: Vec<usize>,
    current: Option<usize>,
    options: Vec<String>,
    revealed: bool,
    phase: Phase,
    asked: usize,
    score: usize,
    wrongs: Vec<QuizItem>,
}

impl QuizSession {
    // MARK: 開始

    /// 通常クイズ: 期間内から `count` 問をランダムに取り出して始める
    pub fn start(
        store: &Store,
        question_type: QuestionType,
        count: usize,
        range: &DateRange,
    ) -> Result<Self, QuizError> {
        if count == 0 {
            return Err(QuizError::InvalidCount);
        }
        let kind = question_type.card_kind();
        let items: Vec<QuizItem> = store
            .random_cards(kind, count, range)?
            .into_iter()
            .map(|card| QuizItem {
                prompt: card.english,
                answer: card.japanese,
                streak: None,
            })
            .collect();

        if items.is_empty() {
            return Err(QuizError::NoItemsInRange(kind.label()));
        }
        if AnswerStyle::for_type(question_type) == AnswerStyle::Choice && items.len() < CHOICE_COUNT {
            return Err(QuizError::InsufficientItems {
                needed: CHOICE_COUNT,
                available: items.len(),
            });
        }

        log::info!(
            "クイズ開始: [{}] {}問 ({})",
            question_type.as_str(),
            items.len(),
            range.describe()
        );
        Self::with_items(store, question_type, SessionKind::Normal, items)
    }

    /// 間違い問題の復習: 溜まっている問題を全部1回ずつ出す
    pub fn start_review(store: &Store, question_type: QuestionType) -> Result<Self, QuizError> {
        let items: Vec<QuizItem> = store
            .wrong_questions(question_type, None)?
            .into_iter()
            .map(|w| QuizItem {
                prompt: w.content,
                answer: w.correct_answer,
                streak: Some(w.consecutive_correct),
            })
            .collect();

        if items.is_empty() {
            return Err(QuizError::EmptyBacklog(question_type.label()));
        }

        log::info!("復習開始: [{}] {}問", question_type.as_str(), items.len());
        Self::with_items(store, question_type, SessionKind::Review, items)
    }

    fn with_items(
        store: &Store,
        question_type: QuestionType,
        kind: SessionKind,
        items: Vec<QuizItem>,
    ) -> Result<Self, QuizError> {
        // 通常は先頭から順に出すので、末尾から pop できるよう逆順に積む
        let remaining: Vec<usize> = (0..items.len()).rev().collect();
        let mut session = Self {
            question_type,
            kind,
            style: AnswerStyle::for_type(question_type),
            items,
            remaining,
            current: None,
            options: Vec::new(),
            revealed: false,
            phase: Phase::Presenting,
            asked: 0,
            score: 0,
            wrongs: Vec::new(),
        };
        session.present_next(store, &mut rand::rng())?;
        Ok(session)
    }

    // MARK: 参照

    pub fn question_type(&self) -> QuestionType {
        self.question_type
    }

    pub fn kind(&self) -> SessionKind {
        self.kind
    }

    pub fn style(&self) -> AnswerStyle {
        self.style
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn current(&self) -> Option<&QuizItem> {
        self.current.map(|i| &self.items[i])
    }

    /// 4択の選択肢（リビール形式では空）
    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn is_revealed(&self) -> bool {
        self.revealed || matches!(self.phase, Phase::Answered { .. })
    }

    pub fn total(&self) -> usize {
        self.items.len()
    }

    /// 出題済みの数（表示中の問題を含む）
    pub fn asked(&self) -> usize {
        self.asked
    }

    pub fn score(&self) -> usize {
        self.score
    }

    /// 復習で残っている問題数（表示中の問題は含まない）
    pub fn remaining(&self) -> usize {
        self.remaining.len()
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    // MARK: 回答

    /// 4択の選択。`index` は `options()` の位置
    pub fn choose(&mut self, store: &Store, index: usize) -> Result<bool, QuizError> {
        if self.style != AnswerStyle::Choice || self.phase != Phase::Presenting {
            return Err(QuizError::InvalidState("選択"));
        }
        let chosen = self
            .options
            .get(index)
            .ok_or(QuizError::InvalidState("選択"))?;
        let correct = self.current().is_some_and(|item| &item.answer == chosen);
        self.record(store, correct)?;
        Ok(correct)
    }

    /// 答えを見る（リビール形式）
    pub fn reveal(&mut self) -> Result<&str, QuizError> {
        if self.style != AnswerStyle::Reveal || self.phase != Phase::Presenting {
            return Err(QuizError::InvalidState("答えを見る"));
        }
        self.revealed = true;
        self.current()
            .map(|item| item.answer.as_str())
            .ok_or(QuizError::InvalidState("答えを見る"))
    }

    /// 自己申告で正誤を付ける（答えを見た後だけ）
    pub fn judge(&mut self, store: &Store, correct: bool) -> Result<(), QuizError> {
        if self.style != AnswerStyle::Reveal || self.phase != Phase::Presenting || !self.revealed {
            return Err(QuizError::InvalidState("判定"));
        }
        self.record(store, correct)
    }

    fn record(&mut self, store: &Store, correct: bool) -> Result<(), QuizError> {
        let item = self
            .current()
            .cloned()
            .ok_or(QuizError::InvalidState("回答"))?;

        let outcome = match self.kind {
            SessionKind::Normal => {
                if !correct {
                    store.record_miss(self.question_type, &item.prompt, &item.answer)?;
                }
                None
            }
            SessionKind::Review => {
                Some(store.update_wrong_score(self.question_type, &item.prompt, correct)?)
            }
        };

        if correct {
            self.score += 1;
        } else {
            self.wrongs.push(item);
        }
        self.phase = Phase::Answered { correct, outcome };
        Ok(())
    }

    // MARK: 次へ

    /// 次の問題へ。もう無ければ `Finished`
    pub fn advance(&mut self, store: &Store) -> Result<(), QuizError> {
        if !matches!(self.phase, Phase::Answered { .. }) {
            return Err(QuizError::InvalidState("次へ"));
        }
        self.present_next(store, &mut rand::rng())
    }

    fn present_next<R: Rng + ?Sized>(&mut self, store: &Store, rng: &mut R) -> Result<(), QuizError> {
        self.revealed = false;
        self.options.clear();

        let next = match self.kind {
            SessionKind::Normal => self.remaining.pop(),
            // 復習は未出題の中からランダムに1つ
            SessionKind::Review if !self.remaining.is_empty() => {
                let pick = rng.random_range(0..self.remaining.len());
                Some(self.remaining.swap_remove(pick))
            }
            SessionKind::Review => None,
        };

        let Some(index) = next else {
            self.current = None;
            self.phase = Phase::Finished;
            log::info!(
                "クイズ終了: [{}] {}/{}",
                self.question_type.as_str(),
                self.score,
                self.items.len()
            );
            return Ok(());
        };

        self.current = Some(index);
        self.asked += 1;
        self.phase = Phase::Presenting;

        if self.style == AnswerStyle::Choice {
            let answer = self.items[index].answer.clone();
            let mut options = vec![answer.clone()];
            options.extend(store.distractors_for(&answer, CHOICE_COUNT - 1)?);
            options.shuffle(rng);
            self.options = options;
        }
        Ok(())
    }

    // MARK: 終了

    pub fn summary(&self) -> Option<QuizSummary> {
        if !self.is_finished() {
            return None;
        }
        Some(QuizSummary {
            question_type: self.question_type,
            kind: self.kind,
            total: self.items.len(),
            asked: self.asked,
            score: self.score,
            wrongs: self.wrongs.clone(),
        })
    }

    /// 間違えた問題だけのおさらい（間違いが無ければ `None`）
    pub fn review_walk(&self) -> Option<ReviewWalk> {
        ReviewWalk::new(self.wrongs.clone())
    }
}

// --------------------------------------------------
// おさらい（採点なし・最後まで行くと最初に戻る）
// --------------------------------------------------

#[derive(Debug, Clone)]
pub struct ReviewWalk {
    items: Vec<QuizItem>,
    index: usize,
    revealed: bool,
}

impl ReviewWalk {
    pub fn new(items: Vec<QuizItem>) -> Option<Self> {
        if items.is_empty() {
            return None;
        }
        Some(Self {
            items,
            index: 0,
            revealed: false,
        })
    }

    pub fn current(&self) -> &QuizItem {
        &self.items[self.index]
    }

    /// (何問目, 全体) 1始まり
    pub fn position(&self) -> (usize, usize) {
        (self.index + 1, self.items.len())
    }

    pub fn reveal(&mut self) -> &str {
        self.revealed = true;
        &self.items[self.index].answer
    }

    pub fn is_revealed(&self) -> bool {
        self.revealed
    }

    /// 次へ。最後の次は最初に戻る
    pub fn next(&mut self) {
        self.index = (self.index + 1) % self.items.len();
        self.revealed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::CardKind;
    use chrono::NaiveDate;
    use std::collections::HashSet;

    fn seeded_store() -> Store {
        let store = Store::open_in_memory().unwrap();
        for (en, ja) in [("apple", "りんご"), ("dog", "犬"), ("cat", "猫"), ("bird", "鳥")] {
            store.add_card(CardKind::Word, en, ja, 1_700_000_000).unwrap();
        }
        store
    }

    fn answer_choice(session: &mut QuizSession, store: &Store, want_correct: bool) -> bool {
        let answer = session.current().unwrap().answer.clone();
        let index = session
            .options()
            .iter()
            .position(|o| (o == &answer) == want_correct)
            .unwrap();
        session.choose(store, index).unwrap()
    }

    #[test]
    fn all_correct_choice_quiz_scores_full() {
        let store = seeded_store();
        let mut session =
            QuizSession::start(&store, QuestionType::WordChoice, 4, &DateRange::all()).unwrap();

        while !session.is_finished() {
            assert_eq!(session.options().len(), CHOICE_COUNT);
            assert!(answer_choice(&mut session, &store, true));
            session.advance(&store).unwrap();
        }

        let summary = session.summary().unwrap();
        assert_eq!((summary.score, summary.total), (4, 4));
        assert!(summary.wrongs.is_empty());
        assert_eq!(store.count_wrong(QuestionType::WordChoice).unwrap(), 0);
        assert!(session.review_walk().is_none());
    }

    #[test]
    fn choice_options_are_distinct_and_include_answer() {
        let store = seeded_store();
        let session =
            QuizSession::start(&store, QuestionType::WordChoice, 4, &DateRange::all()).unwrap();
        let answer = &session.current().unwrap().answer;
        let options = session.options();
        assert!(options.contains(answer));
        let unique: HashSet<_> = options.iter().map(|o| crate::distractor::normalize(o)).collect();
        assert_eq!(unique.len(), CHOICE_COUNT);
    }

    #[test]
    fn miss_then_review_lifecycle() {
        let store = seeded_store();
        let mut session =
            QuizSession::start(&store, QuestionType::WordChoice, 4, &DateRange::all()).unwrap();

        // apple だけ間違える
        while !session.is_finished() {
            let is_apple = session.current().unwrap().prompt == "apple";
            answer_choice(&mut session, &store, !is_apple);
            session.advance(&store).unwrap();
        }
        let summary = session.summary().unwrap();
        assert_eq!(summary.score, 3);
        assert_eq!(summary.wrongs.len(), 1);

        let row = store.get_wrong(QuestionType::WordChoice, "apple").unwrap().unwrap();
        assert_eq!(row.correct_answer, "りんご");
        assert_eq!(row.consecutive_correct, 0);

        // 復習で3回続けて正解すると消える
        for round in 1..=3 {
            let mut review = QuizSession::start_review(&store, QuestionType::WordChoice).unwrap();
            assert_eq!(review.current().unwrap().streak, Some(round - 1));
            assert!(answer_choice(&mut review, &store, true));
            let expected = if round == 3 {
                ScoreOutcome::Mastered
            } else {
                ScoreOutcome::Streak(round)
            };
            assert_eq!(
                review.phase(),
                Phase::Answered {
                    correct: true,
                    outcome: Some(expected)
                }
            );
            review.advance(&store).unwrap();
            assert!(review.is_finished());
        }
        assert!(store.get_wrong(QuestionType::WordChoice, "apple").unwrap().is_none());
        assert!(matches!(
            QuizSession::start_review(&store, QuestionType::WordChoice).unwrap_err(),
            QuizError::EmptyBacklog(_)
        ));
    }

    #[test]
    fn review_miss_after_two_correct_resets() {
        let store = seeded_store();
        store.record_miss(QuestionType::WordChoice, "apple", "りんご").unwrap();

        for correct in [true, true, false] {
            let mut review = QuizSession::start_review(&store, QuestionType::WordChoice).unwrap();
            answer_choice(&mut review, &store, correct);
        }
        let row = store.get_wrong(QuestionType::WordChoice, "apple").unwrap().unwrap();
        assert_eq!(row.consecutive_correct, 0);
    }

    #[test]
    fn empty_range_is_refused_distinctly() {
        let store = seeded_store();
        let day = NaiveDate::from_ymd_opt(2001, 1, 1).unwrap();
        let err = QuizSession::start(
            &store,
            QuestionType::WordChoice,
            4,
            &DateRange::between(day, day),
        )
        .unwrap_err();
        assert!(matches!(err, QuizError::NoItemsInRange(_)));

        let err = QuizSession::start(&store, QuestionType::WordChoice, 3, &DateRange::all()).unwrap_err();
        assert!(matches!(
            err,
            QuizError::InsufficientItems {
                needed: 4,
                available: 3
            }
        ));
    }

    #[test]
    fn choice_needs_four_words() {
        let store = Store::open_in_memory().unwrap();
        for (en, ja) in [("a", "あ"), ("b", "い"), ("c", "う")] {
            store.add_card(CardKind::Word, en, ja, 0).unwrap();
        }
        assert!(matches!(
            QuizSession::start(&store, QuestionType::WordChoice, 10, &DateRange::all()),
            Err(QuizError::InsufficientItems { .. })
        ));
        // リスニングなら3語でも始められる
        assert!(QuizSession::start(&store, QuestionType::WordListening, 10, &DateRange::all()).is_ok());
        assert!(matches!(
            QuizSession::start(&store, QuestionType::WordListening, 0, &DateRange::all()),
            Err(QuizError::InvalidCount)
        ));
    }

    #[test]
    fn reveal_flow_requires_reveal_before_judge() {
        let store = Store::open_in_memory().unwrap();
        store.add_card(CardKind::Sentence, "I like dogs.", "犬が好きです。", 0).unwrap();
        store.add_card(CardKind::Sentence, "It is sunny.", "晴れです。", 0).unwrap();

        let mut session =
            QuizSession::start(&store, QuestionType::Sentence, 5, &DateRange::all()).unwrap();
        assert_eq!(session.total(), 2);
        assert!(session.options().is_empty());
        assert!(matches!(session.judge(&store, true), Err(QuizError::InvalidState(_))));
        assert!(matches!(session.choose(&store, 0), Err(QuizError::InvalidState(_))));
        assert!(matches!(session.advance(&store), Err(QuizError::InvalidState(_))));

        let answer = session.reveal().unwrap().to_string();
        assert_eq!(answer, session.current().unwrap().answer);
        session.judge(&store, false).unwrap();
        assert!(matches!(session.judge(&store, true), Err(QuizError::InvalidState(_))));
        session.advance(&store).unwrap();

        session.reveal().unwrap();
        session.judge(&store, true).unwrap();
        session.advance(&store).unwrap();

        let summary = session.summary().unwrap();
        assert_eq!(summary.score, 1);
        assert!(summary.score <= summary.total);
        assert_eq!(store.count_wrong(QuestionType::Sentence).unwrap(), 1);
    }

    #[test]
    fn review_sweeps_each_item_once() {
        let store = Store::open_in_memory().unwrap();
        let words = ["one", "two", "three", "four", "five"];
        for w in words {
            store.record_miss(QuestionType::WordListening, w, "数").unwrap();
        }

        let mut review = QuizSession::start_review(&store, QuestionType::WordListening).unwrap();
        let mut seen = HashSet::new();
        while !review.is_finished() {
            assert!(seen.insert(review.current().unwrap().prompt.clone()));
            review.reveal().unwrap();
            review.judge(&store, false).unwrap();
            review.advance(&store).unwrap();
        }
        assert_eq!(seen.len(), words.len());
        let summary = review.summary().unwrap();
        assert_eq!(summary.asked, words.len());
        assert_eq!(summary.score, 0);
        // 不正解でも行は残る
        assert_eq!(store.count_wrong(QuestionType::WordListening).unwrap(), 5);
    }

    #[test]
    fn snapshot_ignores_later_store_changes() {
        let store = seeded_store();
        let mut session =
            QuizSession::start(&store, QuestionType::WordListening, 4, &DateRange::all()).unwrap();
        for card in store.list_cards(CardKind::Word).unwrap() {
            store.delete_card(CardKind::Word, card.id).unwrap();
        }
        let mut asked = 0;
        while !session.is_finished() {
            session.reveal().unwrap();
            session.judge(&store, true).unwrap();
            session.advance(&store).unwrap();
            asked += 1;
        }
        assert_eq!(asked, 4);
    }

    #[test]
    fn review_walk_cycles() {
        let items = vec![
            QuizItem { prompt: "a".into(), answer: "あ".into(), streak: None },
            QuizItem { prompt: "b".into(), answer: "い".into(), streak: None },
        ];
        let mut walk = ReviewWalk::new(items).unwrap();
        assert_eq!(walk.position(), (1, 2));
        assert!(!walk.is_revealed());
        assert_eq!(walk.reveal(), "あ");
        walk.next();
        assert_eq!(walk.current().prompt, "b");
        assert!(!walk.is_revealed());
        walk.next();
        assert_eq!(walk.position(), (1, 2));
        assert!(ReviewWalk::new(Vec::new()).is_none());
    }
}
