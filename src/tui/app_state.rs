// ============================================
// src/tui/app_state.rs
// 画面ごとの状態と操作
// ============================================

use std::path::PathBuf;

use chrono::{Days, Local, NaiveDate, Utc};

use crate::config::AppConfig;
use crate::quiz::{AnswerStyle, QuizError, QuizSession, ReviewWalk};
use crate::services::Capabilities;
use crate::services::task::BackgroundTask;
use crate::services::translate::{Engine, translator_for};
use crate::store::{Card, CardKind, DateRange, QuestionType, Stats, Store, StoreError};

// --------------------------------------------------
// 共通
// --------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Home,
    Library,
    Quiz,
    Walk,
    Settings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashKind {
    Info,
    Warn,
    Error,
}

/// 画面下に1回だけ出すメッセージ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    pub kind: FlashKind,
    pub text: String,
}

// --------------------------------------------------
// ホーム
// --------------------------------------------------

/// 日付フィルタのプリセット
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePreset {
    All,
    LastWeek,
    LastMonth,
    Today,
    Custom,
}

impl DatePreset {
    const CYCLE: [DatePreset; 5] = [
        DatePreset::All,
        DatePreset::LastWeek,
        DatePreset::LastMonth,
        DatePreset::Today,
        DatePreset::Custom,
    ];

    pub fn label(self) -> &'static str {
        match self {
            DatePreset::All => "全期間",
            DatePreset::LastWeek => "最近1週間",
            DatePreset::LastMonth => "最近1ヶ月",
            DatePreset::Today => "今日",
            DatePreset::Custom => "期間指定",
        }
    }

    fn step(self, forward: bool) -> Self {
        let len = Self::CYCLE.len();
        let idx = Self::CYCLE.iter().position(|p| *p == self).unwrap_or(0);
        let next = if forward { (idx + 1) % len } else { (idx + len - 1) % len };
        Self::CYCLE[next]
    }

    /// プリセットを日付範囲にする（期間指定は `None`）
    pub fn range(self, today: NaiveDate) -> Option<DateRange> {
        let back = |days| today.checked_sub_days(Days::new(days)).unwrap_or(today);
        match self {
            DatePreset::All => Some(DateRange::all()),
            DatePreset::LastWeek => Some(DateRange::between(back(7), today)),
            DatePreset::LastMonth => Some(DateRange::between(back(30), today)),
            DatePreset::Today => Some(DateRange::between(today, today)),
            DatePreset::Custom => None,
        }
    }
}

/// ホームのメニュー行
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomeItem {
    Period,
    WordCount,
    SentenceCount,
    Quiz(QuestionType),
    Review(QuestionType),
    Library(CardKind),
    Settings,
    Quit,
}

pub const HOME_ITEMS: [HomeItem; 13] = [
    HomeItem::Period,
    HomeItem::WordCount,
    HomeItem::SentenceCount,
    HomeItem::Quiz(QuestionType::WordChoice),
    HomeItem::Quiz(QuestionType::WordListening),
    HomeItem::Quiz(QuestionType::Sentence),
    HomeItem::Review(QuestionType::WordChoice),
    HomeItem::Review(QuestionType::WordListening),
    HomeItem::Review(QuestionType::Sentence),
    HomeItem::Library(CardKind::Word),
    HomeItem::Library(CardKind::Sentence),
    HomeItem::Settings,
    HomeItem::Quit,
];

pub struct HomeState {
    pub stats: Stats,
    pub preset: DatePreset,
    pub range: DateRange,
    /// 期間内の件数 (単語, 例文)
    pub range_counts: (u64, u64),
    /// 最古と最新の登録日時
    pub bounds: (Option<i64>, Option<i64>),
    pub selected: usize,
    pub word_count: String,
    pub sentence_count: String,
    /// 期間指定の入力中
    pub custom_input: Option<String>,
}

impl HomeState {
    fn new(config: &AppConfig) -> Self {
        Self {
            stats: Stats::default(),
            preset: DatePreset::All,
            range: DateRange::all(),
            range_counts: (0, 0),
            bounds: (None, None),
            selected: 0,
            word_count: config.word_quiz_count.to_string(),
            sentence_count: config.sentence_quiz_count.to_string(),
            custom_input: None,
        }
    }

    pub fn selected_item(&self) -> HomeItem {
        HOME_ITEMS[self.selected.min(HOME_ITEMS.len() - 1)]
    }

    pub fn move_selection(&mut self, down: bool) {
        let len = HOME_ITEMS.len();
        self.selected = if down {
            (self.selected + 1) % len
        } else {
            (self.selected + len - 1) % len
        };
    }
}

/// "2024-05-01 2024-05-07" のような入力を日付範囲にする
pub fn parse_custom_range(input: &str) -> Result<DateRange, String> {
    let parse = |s: &str| {
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .or_else(|_| NaiveDate::parse_from_str(s, "%Y/%m/%d"))
            .map_err(|_| format!("日付が読めません: {s}（YYYY-MM-DD）"))
    };
    let parts: Vec<&str> = input
        .split(|c: char| c.is_whitespace() || c == '~' || c == '～')
        .filter(|s| !s.is_empty())
        .collect();
    let (start, end) = match parts.as_slice() {
        [day] => (parse(day)?, parse(day)?),
        [start, end] => (parse(start)?, parse(end)?),
        _ => return Err("開始日と終了日を空白で区切って入力してください".to_string()),
    };
    if start > end {
        return Err("開始日は終了日より前に設定してください".to_string());
    }
    Ok(DateRange::between(start, end))
}

fn parse_count(input: &str) -> Result<usize, String> {
    input
        .trim()
        .parse::<usize>()
        .map_err(|_| "問題数が正しく入力されていません".to_string())
}

// --------------------------------------------------
// 単語帳・例文帳
// --------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibraryMode {
    Browse,
    Edit,
    ConfirmDelete(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorField {
    English,
    Japanese,
}

/// 入力フォーム。`editing_id` があるときは既存の行を直す
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorState {
    pub english: String,
    pub japanese: String,
    pub focus: EditorField,
    pub editing_id: Option<i64>,
}

impl EditorState {
    fn blank() -> Self {
        Self {
            english: String::new(),
            japanese: String::new(),
            focus: EditorField::English,
            editing_id: None,
        }
    }

    pub fn focused_mut(&mut self) -> &mut String {
        match self.focus {
            EditorField::English => &mut self.english,
            EditorField::Japanese => &mut self.japanese,
        }
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            EditorField::English => EditorField::Japanese,
            EditorField::Japanese => EditorField::English,
        };
    }
}

pub struct LibraryState {
    pub kind: CardKind,
    pub cards: Vec<Card>,
    pub selected: usize,
    pub mode: LibraryMode,
    pub editor: EditorState,
    pub translate: BackgroundTask<String>,
    pub translate_engine: Engine,
}

impl LibraryState {
    pub fn selected_card(&self) -> Option<&Card> {
        self.cards.get(self.selected)
    }

    pub fn move_selection(&mut self, down: bool) {
        if self.cards.is_empty() {
            self.selected = 0;
        } else if down {
            self.selected = (self.selected + 1).min(self.cards.len() - 1);
        } else {
            self.selected = self.selected.saturating_sub(1);
        }
    }
}

// --------------------------------------------------
// 設定
// --------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsField {
    DeeplKey,
    Voice,
}

pub struct SettingsState {
    pub deepl_api_key: String,
    pub tts_voice: String,
    pub focus: SettingsField,
}

// --------------------------------------------------
// アプリ全体
// --------------------------------------------------

pub struct App {
    pub store: Store,
    pub config: AppConfig,
    pub caps: Capabilities,
    pub screen: Screen,
    pub home: HomeState,
    pub library: Option<LibraryState>,
    pub quiz: Option<QuizSession>,
    pub walk: Option<ReviewWalk>,
    pub settings: SettingsState,
    /// 読み上げ中はほかの読み上げを受け付けない
    pub speech: BackgroundTask<()>,
    pub flash: Option<Flash>,
    pub quit: bool,
    /// 設定画面で保存したときの書き込み先
    pub config_path: Option<PathBuf>,
}

impl App {
    pub fn new(store: Store, config: AppConfig, caps: Capabilities) -> Result<Self, StoreError> {
        let home = HomeState::new(&config);
        let settings = SettingsState {
            deepl_api_key: config.deepl_api_key.clone(),
            tts_voice: config.tts_voice.clone(),
            focus: SettingsField::DeeplKey,
        };
        let mut app = Self {
            store,
            config,
            caps,
            screen: Screen::Home,
            home,
            library: None,
            quiz: None,
            walk: None,
            settings,
            speech: BackgroundTask::new(),
            flash: None,
            quit: false,
            config_path: None,
        };
        app.refresh_home()?;
        Ok(app)
    }

    /// 終了時に保存する設定（ホームで入力した問題数も反映）
    pub fn into_config(self) -> AppConfig {
        let mut config = self.config;
        if let Ok(n) = parse_count(&self.home.word_count) {
            if n > 0 {
                config.word_quiz_count = n;
            }
        }
        if let Ok(n) = parse_count(&self.home.sentence_count) {
            if n > 0 {
                config.sentence_quiz_count = n;
            }
        }
        config
    }

    // MARK: メッセージ

    pub fn info(&mut self, text: impl Into<String>) {
        self.flash = Some(Flash {
            kind: FlashKind::Info,
            text: text.into(),
        });
    }

    pub fn warn(&mut self, text: impl Into<String>) {
        self.flash = Some(Flash {
            kind: FlashKind::Warn,
            text: text.into(),
        });
    }

    pub fn error(&mut self, text: impl Into<String>) {
        let text = text.into();
        log::error!("{text}");
        self.flash = Some(Flash {
            kind: FlashKind::Error,
            text,
        });
    }

    /// ストアのエラーを表示に振り分ける（重複は注意、それ以外はエラー）
    fn report_store(&mut self, err: StoreError) {
        if matches!(err, StoreError::AlreadyExists(_)) {
            self.warn(err.to_string());
        } else {
            self.error(err.to_string());
        }
    }

    fn report_quiz(&mut self, err: QuizError) {
        match err {
            QuizError::Store(e) => self.report_store(e),
            other => self.warn(other.to_string()),
        }
    }

    // MARK: ホーム

    /// 集計と期間内の件数を取り直す
    pub fn refresh_home(&mut self) -> Result<(), StoreError> {
        self.home.stats = self.store.stats()?;
        self.home.bounds = self.store.created_at_bounds()?;
        self.home.range_counts = (
            self.store.count_cards(CardKind::Word, &self.home.range)?,
            self.store.count_cards(CardKind::Sentence, &self.home.range)?,
        );
        Ok(())
    }

    fn refresh_home_or_report(&mut self) {
        if let Err(e) = self.refresh_home() {
            self.report_store(e);
        }
    }

    pub fn go_home(&mut self) {
        self.screen = Screen::Home;
        self.library = None;
        self.quiz = None;
        self.walk = None;
        // 裏で走っている読み上げの結果は捨てる
        self.speech = BackgroundTask::new();
        self.refresh_home_or_report();
    }

    /// プリセットを切り替える（期間指定は入力欄を開く）
    pub fn cycle_preset(&mut self, forward: bool) {
        let preset = self.home.preset.step(forward);
        self.apply_preset(preset);
    }

    pub fn apply_preset(&mut self, preset: DatePreset) {
        match preset.range(Local::now().date_naive()) {
            Some(range) => {
                self.home.preset = preset;
                self.home.range = range;
                self.home.custom_input = None;
                self.refresh_home_or_report();
            }
            None => {
                self.home.preset = preset;
                let seed = match (self.home.range.start, self.home.range.end) {
                    (Some(s), Some(e)) => format!("{} {}", s.format("%Y-%m-%d"), e.format("%Y-%m-%d")),
                    _ => String::new(),
                };
                self.home.custom_input = Some(seed);
            }
        }
    }

    /// 期間指定の入力を確定する。不正なら何も変えない
    pub fn submit_custom_range(&mut self) {
        let Some(input) = self.home.custom_input.clone() else {
            return;
        };
        match parse_custom_range(&input) {
            Ok(range) => {
                self.home.preset = DatePreset::Custom;
                self.home.range = range;
                self.home.custom_input = None;
                self.refresh_home_or_report();
                self.info(format!("対象期間：{}", self.home.range.describe()));
            }
            Err(msg) => self.warn(msg),
        }
    }

    pub fn activate_home_item(&mut self) {
        match self.home.selected_item() {
            HomeItem::Period => {
                if self.home.preset == DatePreset::Custom {
                    self.apply_preset(DatePreset::Custom);
                } else {
                    self.cycle_preset(true);
                }
            }
            HomeItem::WordCount | HomeItem::SentenceCount => {}
            HomeItem::Quiz(qt) => self.start_quiz(qt),
            HomeItem::Review(qt) => self.start_review(qt),
            HomeItem::Library(kind) => self.open_library(kind),
            HomeItem::Settings => self.open_settings(),
            HomeItem::Quit => self.quit = true,
        }
    }

    /// ←→ で問題数を1ずつ増減
    pub fn adjust_count(&mut self, up: bool) {
        let field = match self.home.selected_item() {
            HomeItem::WordCount => &mut self.home.word_count,
            HomeItem::SentenceCount => &mut self.home.sentence_count,
            _ => return,
        };
        let current = parse_count(field).unwrap_or(1);
        let next = if up {
            current.saturating_add(1)
        } else {
            current.saturating_sub(1).max(1)
        };
        *field = next.to_string();
    }

    pub fn count_field_mut(&mut self) -> Option<&mut String> {
        match self.home.selected_item() {
            HomeItem::WordCount => Some(&mut self.home.word_count),
            HomeItem::SentenceCount => Some(&mut self.home.sentence_count),
            _ => None,
        }
    }

    // MARK: クイズ

    pub fn start_quiz(&mut self, question_type: QuestionType) {
        let input = match question_type.card_kind() {
            CardKind::Word => &self.home.word_count,
            CardKind::Sentence => &self.home.sentence_count,
        };
        let count = match parse_count(input) {
            Ok(n) => n,
            Err(msg) => return self.warn(msg),
        };
        match QuizSession::start(&self.store, question_type, count, &self.home.range) {
            Ok(session) => self.enter_quiz(session),
            Err(e) => self.report_quiz(e),
        }
    }

    pub fn start_review(&mut self, question_type: QuestionType) {
        match QuizSession::start_review(&self.store, question_type) {
            Ok(session) => self.enter_quiz(session),
            Err(e) => self.report_quiz(e),
        }
    }

    fn enter_quiz(&mut self, session: QuizSession) {
        self.quiz = Some(session);
        self.walk = None;
        self.screen = Screen::Quiz;
        self.auto_speak();
    }

    /// 出題と同時に英語を読み上げる（読み上げが使えるときだけ）
    fn auto_speak(&mut self) {
        if !self.caps.can_speak() {
            return;
        }
        let prompt = match self.screen {
            Screen::Walk => self.walk.as_ref().map(|w| w.current().prompt.clone()),
            _ => self
                .quiz
                .as_ref()
                .and_then(|s| s.current())
                .map(|item| item.prompt.clone()),
        };
        if let Some(text) = prompt {
            self.speak(text);
        }
    }

    /// 問題文を隠すか（リスニングで、まだ答えを見ていない）
    pub fn hide_prompt(&self) -> bool {
        match &self.quiz {
            Some(session) => {
                session.style() == AnswerStyle::Reveal && self.caps.can_speak() && !session.is_revealed()
            }
            None => false,
        }
    }

    pub fn quiz_choose(&mut self, index: usize) {
        let Some(session) = self.quiz.as_mut() else {
            return;
        };
        if index >= session.options().len() {
            return;
        }
        if let Err(e) = session.choose(&self.store, index) {
            self.report_quiz(e);
        }
    }

    pub fn quiz_reveal(&mut self) {
        let Some(session) = self.quiz.as_mut() else {
            return;
        };
        if let Err(e) = session.reveal() {
            self.report_quiz(e);
        }
    }

    pub fn quiz_judge(&mut self, correct: bool) {
        let Some(session) = self.quiz.as_mut() else {
            return;
        };
        if !session.is_revealed() {
            return self.warn("先に答えを確認してください");
        }
        if let Err(e) = session.judge(&self.store, correct) {
            self.report_quiz(e);
        }
    }

    pub fn quiz_next(&mut self) {
        let Some(session) = self.quiz.as_mut() else {
            return;
        };
        if let Err(e) = session.advance(&self.store) {
            return self.report_quiz(e);
        }
        if session.is_finished() {
            // 復習待ちの数が変わっている
            self.refresh_home_or_report();
        } else {
            self.auto_speak();
        }
    }

    /// 間違えた問題のおさらいへ
    pub fn open_walk(&mut self) {
        let walk = self.quiz.as_ref().and_then(|s| s.review_walk());
        match walk {
            Some(walk) => {
                self.walk = Some(walk);
                self.screen = Screen::Walk;
                self.auto_speak();
            }
            None => self.info("間違えた問題はありません"),
        }
    }

    /// 次の問題へ（最後まで行ったら最初に戻る）
    pub fn walk_next(&mut self) {
        if let Some(walk) = self.walk.as_mut() {
            walk.next();
            self.auto_speak();
        }
    }

    pub fn close_walk(&mut self) {
        self.walk = None;
        self.screen = if self.quiz.is_some() {
            Screen::Quiz
        } else {
            Screen::Home
        };
    }

    // MARK: 読み上げ

    pub fn speak(&mut self, text: String) {
        if self.speech.is_running() {
            return;
        }
        let speaker = match self.caps.speaker(&self.config.tts_voice) {
            Ok(speaker) => speaker,
            Err(e) => return self.warn(e.to_string()),
        };
        self.speech.spawn(move || speaker.speak(&text));
    }

    /// 今の画面で英語を読み上げる
    pub fn speak_current(&mut self) {
        let text = match self.screen {
            Screen::Quiz => self
                .quiz
                .as_ref()
                .and_then(|s| s.current())
                .map(|item| item.prompt.clone()),
            Screen::Walk => self.walk.as_ref().map(|w| w.current().prompt.clone()),
            Screen::Library => self
                .library
                .as_ref()
                .and_then(|l| match l.mode {
                    LibraryMode::Edit => Some(l.editor.english.trim().to_string()),
                    _ => l.selected_card().map(|c| c.english.clone()),
                })
                .filter(|t| !t.is_empty()),
            _ => None,
        };
        if let Some(text) = text {
            self.speak(text);
        }
    }

    // MARK: 単語帳・例文帳

    pub fn open_library(&mut self, kind: CardKind) {
        let cards = match self.store.list_cards(kind) {
            Ok(cards) => cards,
            Err(e) => return self.report_store(e),
        };
        self.library = Some(LibraryState {
            kind,
            cards,
            selected: 0,
            mode: LibraryMode::Browse,
            editor: EditorState::blank(),
            translate: BackgroundTask::new(),
            translate_engine: Engine::Deepl,
        });
        self.screen = Screen::Library;
    }

    fn reload_library(&mut self) {
        let Some(kind) = self.library.as_ref().map(|l| l.kind) else {
            return;
        };
        match self.store.list_cards(kind) {
            Ok(cards) => {
                if let Some(lib) = self.library.as_mut() {
                    lib.selected = lib.selected.min(cards.len().saturating_sub(1));
                    lib.cards = cards;
                }
            }
            Err(e) => self.report_store(e),
        }
    }

    pub fn library_new_entry(&mut self) {
        if let Some(lib) = self.library.as_mut() {
            lib.editor = EditorState::blank();
            lib.mode = LibraryMode::Edit;
        }
    }

    pub fn library_edit_selected(&mut self) {
        if let Some(lib) = self.library.as_mut() {
            if let Some(card) = lib.selected_card().cloned() {
                lib.editor = EditorState {
                    english: card.english,
                    japanese: card.japanese,
                    focus: EditorField::English,
                    editing_id: Some(card.id),
                };
                lib.mode = LibraryMode::Edit;
            }
        }
    }

    pub fn library_cancel(&mut self) {
        if let Some(lib) = self.library.as_mut() {
            lib.mode = LibraryMode::Browse;
            lib.editor = EditorState::blank();
            // 翻訳が返ってきても入れる先が無い
            lib.translate = BackgroundTask::new();
        }
    }

    /// フォームの内容を保存（新規は英語が同じなら上書き、編集はIDで更新）
    pub fn library_save(&mut self) {
        let Some(lib) = self.library.as_ref() else {
            return;
        };
        let kind = lib.kind;
        let english = lib.editor.english.trim().to_string();
        let japanese = lib.editor.japanese.trim().to_string();
        let editing_id = lib.editor.editing_id;

        if english.is_empty() || japanese.is_empty() {
            return self.warn(format!("英語と日本語の両方を入力してください（{}）", kind.label()));
        }

        let result = match editing_id {
            Some(id) => self
                .store
                .update_card(kind, id, &english, &japanese)
                .map(|_| format!("{}を更新しました: {english}", kind.label())),
            None => self
                .store
                .save_card(kind, &english, &japanese, Utc::now().timestamp())
                .map(|outcome| format!("{}を{}しました: {english}", kind.label(), outcome.verb())),
        };

        match result {
            Ok(message) => {
                self.library_cancel();
                self.reload_library();
                if let Some(lib) = self.library.as_mut() {
                    if let Some(pos) = lib.cards.iter().position(|c| c.english == english) {
                        lib.selected = pos;
                    }
                }
                self.info(message);
            }
            Err(e) => self.report_store(e),
        }
    }

    pub fn library_request_delete(&mut self) {
        if let Some(lib) = self.library.as_mut() {
            if let Some(id) = lib.selected_card().map(|c| c.id) {
                lib.mode = LibraryMode::ConfirmDelete(id);
            }
        }
    }

    pub fn library_confirm_delete(&mut self, yes: bool) {
        let Some(lib) = self.library.as_mut() else {
            return;
        };
        let LibraryMode::ConfirmDelete(id) = lib.mode else {
            return;
        };
        lib.mode = LibraryMode::Browse;
        if !yes {
            return;
        }
        let kind = lib.kind;
        match self.store.delete_card(kind, id) {
            Ok(true) => {
                self.reload_library();
                self.info(format!("{}を削除しました", kind.label()));
            }
            Ok(false) => self.warn(StoreError::NotFound(id).to_string()),
            Err(e) => self.report_store(e),
        }
    }

    /// 英語欄を裏スレッドで翻訳して日本語欄に入れる
    pub fn library_translate(&mut self, engine: Engine) {
        let Some(lib) = self.library.as_mut() else {
            return;
        };
        let text = lib.editor.english.trim().to_string();
        if text.is_empty() {
            return self.warn("翻訳する英語を入力してください");
        }
        if engine == Engine::Deepl && !self.caps.deepl {
            return self.warn("DeepL APIキーが未設定です。設定画面で入力するか ^G でGoogle翻訳を使ってください");
        }
        if lib.translate.is_running() {
            return;
        }
        let translator = translator_for(engine, &self.config.deepl_api_key);
        lib.translate_engine = engine;
        lib.translate.spawn(move || translator.translate(&text));
    }

    // MARK: 設定

    pub fn open_settings(&mut self) {
        self.settings = SettingsState {
            deepl_api_key: self.config.deepl_api_key.clone(),
            tts_voice: self.config.tts_voice.clone(),
            focus: SettingsField::DeeplKey,
        };
        self.screen = Screen::Settings;
    }

    pub fn save_settings(&mut self) {
        self.config.deepl_api_key = self.settings.deepl_api_key.trim().to_string();
        self.config.tts_voice = self.settings.tts_voice.trim().to_string();
        self.caps.deepl = !self.config.deepl_api_key.is_empty();
        self.screen = Screen::Home;
        let Some(path) = self.config_path.clone() else {
            self.info("設定を反映しました");
            return;
        };
        match self.config.save(&path) {
            Ok(()) => self.info("設定を保存しました"),
            Err(e) => self.error(format!("設定を保存できません: {e}")),
        }
    }

    // MARK: 毎フレーム

    /// 裏スレッドの結果を拾う
    pub fn tick(&mut self) {
        if let Some(Err(e)) = self.speech.poll() {
            self.warn(format!("読み上げに失敗しました: {e}"));
        }

        let translated = self.library.as_mut().and_then(|lib| {
            let result = lib.translate.poll()?;
            let engine = lib.translate_engine;
            if let Ok(text) = &result {
                lib.editor.japanese = text.clone();
                lib.editor.focus = EditorField::Japanese;
            }
            Some((engine, result))
        });
        match translated {
            Some((engine, Ok(_))) => self.info(format!("{}翻訳しました", engine.label())),
            Some((_, Err(e))) => self.warn(e),
            None => {}
        }
    }
}
