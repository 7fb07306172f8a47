// ============================================
// src/tui/ui.rs
// 画面描画
// ============================================

use chrono::{Local, TimeZone};
use ratatui::{
    prelude::*,
    style::{Color, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, List, ListItem, ListState, Paragraph, Wrap},
};

use super::app_state::{
    App, EditorField, FlashKind, HOME_ITEMS, HomeItem, LibraryMode, Screen, SettingsField,
};
use crate::quiz::{AnswerStyle, Phase, SessionKind};
use crate::services::task::TaskStatus;
use crate::store::{CardKind, MASTERY_STREAK, ScoreOutcome};

pub fn draw(f: &mut Frame, app: &App) {
    let size = f.area();
    let block = Block::default().borders(Borders::ALL).title(title(app));
    let inner_area = block.inner(size);
    f.render_widget(block, size);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // [0] 本体
            Constraint::Length(1), // [1] ステータスバー
        ])
        .split(inner_area);

    match app.screen {
        Screen::Home => draw_home(f, chunks[0], app),
        Screen::Library => draw_library(f, chunks[0], app),
        Screen::Quiz => draw_quiz(f, chunks[0], app),
        Screen::Walk => draw_walk(f, chunks[0], app),
        Screen::Settings => draw_settings(f, chunks[0], app),
    }
    draw_status(f, chunks[1], app);
}

fn title(app: &App) -> String {
    let sub = match app.screen {
        Screen::Home => "ホーム".to_string(),
        Screen::Library => app
            .library
            .as_ref()
            .map(|l| format!("{}帳", l.kind.label()))
            .unwrap_or_default(),
        Screen::Quiz => app
            .quiz
            .as_ref()
            .map(|s| match s.kind() {
                SessionKind::Normal => s.question_type().label().to_string(),
                SessionKind::Review => format!("間違い復習 ({})", s.question_type().label()),
            })
            .unwrap_or_default(),
        Screen::Walk => "おさらい".to_string(),
        Screen::Settings => "設定".to_string(),
    };
    format!("TANGO WiZ ! - {sub}")
}

fn format_date(ts: Option<i64>) -> String {
    ts.and_then(|t| Local.timestamp_opt(t, 0).single())
        .map(|d| d.format("%Y/%m/%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}

// --------------------------------------------------
// MARK: ステータスバー
// --------------------------------------------------

fn draw_status(f: &mut Frame, area: Rect, app: &App) {
    if let Some(flash) = &app.flash {
        let style = match flash.kind {
            FlashKind::Info => Style::default().bg(Color::Green).fg(Color::Black),
            FlashKind::Warn => Style::default().bg(Color::Yellow).fg(Color::Black),
            FlashKind::Error => Style::default().bg(Color::Red).fg(Color::White),
        };
        f.render_widget(Paragraph::new(format!(" {}", flash.text)).style(style), area);
        return;
    }

    let hints = match app.screen {
        Screen::Home if app.home.custom_input.is_some() => " Enter: 決定  Esc: 取り消し ",
        Screen::Home => " j/k: 移動  ←→: 変更  Enter: 決定  q: 終了 ",
        Screen::Library => match app.library.as_ref().map(|l| l.mode) {
            Some(LibraryMode::Edit) => {
                " Tab: 欄切替  Enter/^S: 保存  ^T: DeepL翻訳  ^G: Google翻訳  ^P: 読み上げ  Esc: 戻る "
            }
            Some(LibraryMode::ConfirmDelete(_)) => " y: 削除する  n: やめる ",
            _ => " a: 追加  e: 編集  d: 削除  p: 読み上げ  Esc: 戻る ",
        },
        Screen::Quiz => match app.quiz.as_ref().map(|s| (s.phase(), s.style())) {
            Some((Phase::Presenting, AnswerStyle::Choice)) => " 1-4: 回答  p: 読み上げ  Esc: 中断 ",
            Some((Phase::Presenting, AnswerStyle::Reveal)) => {
                " Space: 答えを見る  y: 正解  n: 不正解  p: 読み上げ  Esc: 中断 "
            }
            Some((Phase::Answered { .. }, _)) => " Enter: 次へ  p: 読み上げ  Esc: 中断 ",
            _ => " r: 間違えた問題をおさらい  Enter: ホームへ ",
        },
        Screen::Walk => " Space: 答えを見る  Enter: 次へ  p: 読み上げ  Esc: 戻る ",
        Screen::Settings => " Tab: 欄切替  Enter: 保存  Esc: 戻る ",
    };
    let busy = if app.speech.is_running() { "♪ " } else { "" };
    f.render_widget(
        Paragraph::new(format!("{busy}{hints}")).style(Style::default().bg(Color::DarkGray).fg(Color::White)),
        area,
    );
}

// --------------------------------------------------
// MARK: ホーム
// --------------------------------------------------

fn draw_home(f: &mut Frame, area: Rect, app: &App) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);

    let home = &app.home;
    let items: Vec<ListItem> = HOME_ITEMS
        .iter()
        .map(|item| {
            let text = match item {
                HomeItem::Period => format!("期間: < {} >", home.preset.label()),
                HomeItem::WordCount => format!("単語の問題数: < {} >", home.word_count),
                HomeItem::SentenceCount => format!("例文の問題数: < {} >", home.sentence_count),
                HomeItem::Quiz(qt) => format!("{}クイズを開始", qt.label()),
                HomeItem::Review(qt) => format!(
                    "間違い復習: {} ({})",
                    qt.label(),
                    home.stats.wrong_count(*qt)
                ),
                HomeItem::Library(kind) => format!("{}帳を開く", kind.label()),
                HomeItem::Settings => "設定".to_string(),
                HomeItem::Quit => "終了".to_string(),
            };
            let dim = matches!(item, HomeItem::Review(qt) if home.stats.wrong_count(*qt) == 0);
            let style = if dim {
                Style::default().fg(Color::DarkGray)
            } else {
                Style::default()
            };
            ListItem::new(text).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("メニュー"))
        .highlight_style(Style::default().fg(Color::Black).bg(Color::Cyan).bold())
        .highlight_symbol("> ");
    let mut state = ListState::default().with_selected(Some(home.selected));
    f.render_stateful_widget(list, cols[0], &mut state);

    // 右: 統計
    let (range_words, range_sentences) = home.range_counts;
    let mut lines = vec![
        Line::from("全体統計").bold(),
        Line::from(format!("・登録済み単語: {}個", home.stats.words)),
        Line::from(format!("・登録済み例文: {}個", home.stats.sentences)),
        Line::from(""),
        Line::from("復習待ち問題").bold(),
    ];
    for qt in crate::store::QuestionType::ALL {
        lines.push(Line::from(format!("・{}: {}問", qt.label(), home.stats.wrong_count(qt))));
    }
    lines.push(Line::from(""));
    lines.push(Line::from("日付フィルタ").bold());
    lines.push(Line::from(format!("対象期間：{}", home.range.describe())));
    if home.range.is_all() {
        lines.push(
            Line::from(format!(
                "（登録: {} ～ {}）",
                format_date(home.bounds.0),
                format_date(home.bounds.1)
            ))
            .fg(Color::Gray),
        );
    }
    lines.push(Line::from(format!("単語：{range_words}個　例文：{range_sentences}個")).fg(Color::Yellow));

    f.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("学習状況")),
        cols[1],
    );

    if let Some(input) = &home.custom_input {
        let popup = centered(area, 60, 5);
        f.render_widget(Clear, popup);
        f.render_widget(
            Paragraph::new(vec![
                Line::from("開始日 終了日 (YYYY-MM-DD YYYY-MM-DD)").fg(Color::Gray),
                Line::from(format!("{input}█")),
            ])
            .block(Block::default().borders(Borders::ALL).title("期間指定")),
            popup,
        );
    }
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

// --------------------------------------------------
// MARK: 単語帳・例文帳
// --------------------------------------------------

fn draw_library(f: &mut Frame, area: Rect, app: &App) {
    let Some(lib) = app.library.as_ref() else {
        return;
    };
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6), // [0] 入力フォーム
            Constraint::Min(3),    // [1] 一覧
        ])
        .split(area);

    // 0. フォーム
    let editing = lib.mode == LibraryMode::Edit;
    let (en_label, ja_label) = match lib.kind {
        CardKind::Word => ("英単語", "日本語の意味（; 区切りで複数）"),
        CardKind::Sentence => ("英文", "日本語訳"),
    };
    let field = |label: &str, value: &str, focused: bool| {
        let cursor = if editing && focused { "█" } else { "" };
        let style = if editing && focused {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };
        vec![
            Line::from(label.to_string()).fg(Color::Gray),
            Line::from(format!(" {value}{cursor}")).style(style),
        ]
    };
    let mut form = field(en_label, &lib.editor.english, lib.editor.focus == EditorField::English);
    form.extend(field(ja_label, &lib.editor.japanese, lib.editor.focus == EditorField::Japanese));
    let form_title = match (editing, lib.editor.editing_id) {
        (true, Some(id)) => format!("編集 (ID {id})"),
        (true, None) => "新規登録".to_string(),
        (false, _) => "a で追加 / e で編集".to_string(),
    };
    let form_title = match lib.translate.status() {
        TaskStatus::Running => format!("{form_title} - {}翻訳中...", lib.translate_engine.label()),
        TaskStatus::Failed => format!("{form_title} - {}翻訳失敗", lib.translate_engine.label()),
        TaskStatus::Idle | TaskStatus::Done => form_title,
    };
    f.render_widget(
        Paragraph::new(form)
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title(form_title)),
        rows[0],
    );

    // 1. 一覧
    let items: Vec<ListItem> = lib
        .cards
        .iter()
        .map(|card| {
            let date = format_date(Some(card.created_at));
            ListItem::new(Line::from(vec![
                Span::styled(format!("{date}  "), Style::default().fg(Color::DarkGray)),
                Span::styled(card.english.clone(), Style::default().bold()),
                Span::raw("  "),
                Span::styled(card.japanese.clone(), Style::default().fg(Color::Gray)),
            ]))
        })
        .collect();
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("{}一覧 ({}件)", lib.kind.label(), lib.cards.len())),
        )
        .highlight_style(Style::default().fg(Color::Black).bg(Color::Cyan))
        .highlight_symbol("> ");
    let mut state = ListState::default().with_selected((!lib.cards.is_empty()).then_some(lib.selected));
    f.render_stateful_widget(list, rows[1], &mut state);

    if let LibraryMode::ConfirmDelete(_) = lib.mode {
        let target = lib.selected_card().map(|c| c.english.as_str()).unwrap_or("");
        let popup = centered(area, 50, 4);
        f.render_widget(Clear, popup);
        f.render_widget(
            Paragraph::new(format!("「{target}」を削除しますか？ (y/n)"))
                .wrap(Wrap { trim: true })
                .block(Block::default().borders(Borders::ALL).title("削除の確認").fg(Color::Red)),
            popup,
        );
    }
}

// --------------------------------------------------
// MARK: クイズ
// --------------------------------------------------

fn draw_quiz(f: &mut Frame, area: Rect, app: &App) {
    let Some(session) = app.quiz.as_ref() else {
        return;
    };

    if let Some(summary) = session.summary() {
        let mut lines = vec![
            Line::from(""),
            Line::from(summary.message()).bold().centered(),
            Line::from(""),
        ];
        if summary.wrongs.is_empty() {
            lines.push(Line::from("間違えた問題はありません").fg(Color::Green).centered());
        } else {
            lines.push(Line::from(format!("間違えた問題: {}問", summary.wrongs.len())).fg(Color::Red).centered());
            for item in summary.wrongs.iter().take(area.height.saturating_sub(6) as usize) {
                lines.push(Line::from(format!("{}  →  {}", item.prompt, item.answer)).centered());
            }
        }
        f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), area);
        return;
    }

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // [0] 進み具合
            Constraint::Length(1), // [1] 空白
            Constraint::Length(3), // [2] 問題
            Constraint::Min(4),    // [3] 回答
            Constraint::Length(2), // [4] 判定
        ])
        .split(area);

    // 0. 進み具合
    let (label, ratio) = match session.kind() {
        SessionKind::Normal => (
            format!("{} / {} 問  正解 {}", session.asked(), session.total(), session.score()),
            session.asked() as f64 / session.total().max(1) as f64,
        ),
        SessionKind::Review => (
            format!("残り {} 問  正解 {}", session.remaining(), session.score()),
            session.asked() as f64 / session.total().max(1) as f64,
        ),
    };
    f.render_widget(
        Gauge::default()
            .gauge_style(Style::default().fg(Color::Magenta).bg(Color::Black))
            .ratio(ratio.min(1.0))
            .label(label),
        rows[0],
    );

    let Some(item) = session.current() else {
        return;
    };

    // 2. 問題
    let mut prompt = Vec::new();
    if app.hide_prompt() {
        prompt.push(Line::from("♪ 音声を聞いて意味を答えてください（p でもう一度）").fg(Color::Cyan).centered());
    } else {
        prompt.push(Line::from(item.prompt.clone()).bold().centered());
    }
    if let Some(streak) = item.streak {
        prompt.push(Line::from(format!("連続正解: {streak} / {MASTERY_STREAK}")).fg(Color::Gray).centered());
    }
    f.render_widget(Paragraph::new(prompt).wrap(Wrap { trim: true }), rows[2]);

    // 3. 回答
    let answered = matches!(session.phase(), Phase::Answered { .. });
    match session.style() {
        AnswerStyle::Choice => {
            let lines: Vec<Line> = session
                .options()
                .iter()
                .enumerate()
                .map(|(i, option)| {
                    let text = format!("{}. {}", i + 1, option);
                    if answered && *option == item.answer {
                        Line::from(text).fg(Color::Green).bold()
                    } else {
                        Line::from(text)
                    }
                })
                .collect();
            f.render_widget(Paragraph::new(lines).block(Block::default().borders(Borders::TOP)), rows[3]);
        }
        AnswerStyle::Reveal => {
            let body = if session.is_revealed() {
                vec![
                    Line::from(item.prompt.clone()).fg(Color::Gray).centered(),
                    Line::from(item.answer.clone()).fg(Color::Yellow).bold().centered(),
                ]
            } else {
                vec![Line::from("Space で答えを見る").fg(Color::DarkGray).centered()]
            };
            f.render_widget(
                Paragraph::new(body)
                    .wrap(Wrap { trim: true })
                    .block(Block::default().borders(Borders::TOP)),
                rows[3],
            );
        }
    }

    // 4. 判定
    if let Phase::Answered { correct, outcome } = session.phase() {
        let mut spans = vec![if correct {
            Span::styled("正解！", Style::default().fg(Color::Green).bold())
        } else {
            Span::styled(format!("不正解… 正解は「{}」", item.answer), Style::default().fg(Color::Red).bold())
        }];
        let note = match outcome {
            Some(ScoreOutcome::Streak(n)) => Some(format!("  連続正解 {n} / {MASTERY_STREAK}")),
            Some(ScoreOutcome::Mastered) => Some(format!("  {MASTERY_STREAK}回連続正解！復習リストから外しました")),
            Some(ScoreOutcome::Reset) => Some("  連続正解数がリセットされました".to_string()),
            Some(ScoreOutcome::Missing) | None => None,
        };
        if let Some(note) = note {
            spans.push(Span::styled(note, Style::default().fg(Color::Gray)));
        }
        f.render_widget(Paragraph::new(Line::from(spans)).centered(), rows[4]);
    }
}

// --------------------------------------------------
// MARK: おさらい
// --------------------------------------------------

fn draw_walk(f: &mut Frame, area: Rect, app: &App) {
    let Some(walk) = app.walk.as_ref() else {
        return;
    };
    let (pos, total) = walk.position();
    let item = walk.current();
    let mut lines = vec![
        Line::from(format!("{pos} / {total}")).fg(Color::Gray).centered(),
        Line::from(""),
        Line::from(item.prompt.clone()).bold().centered(),
        Line::from(""),
    ];
    if walk.is_revealed() {
        lines.push(Line::from(item.answer.clone()).fg(Color::Yellow).centered());
    } else {
        lines.push(Line::from("Space で答えを見る").fg(Color::DarkGray).centered());
    }
    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), area);
}

// --------------------------------------------------
// MARK: 設定
// --------------------------------------------------

fn draw_settings(f: &mut Frame, area: Rect, app: &App) {
    let s = &app.settings;
    let field = |label: &str, value: &str, focused: bool| {
        let style = if focused {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };
        let cursor = if focused { "█" } else { "" };
        vec![
            Line::from(label.to_string()).fg(Color::Gray),
            Line::from(format!(" {value}{cursor}")).style(style),
            Line::from(""),
        ]
    };
    let mut lines = field("DeepL API キー", &s.deepl_api_key, s.focus == SettingsField::DeeplKey);
    lines.extend(field("読み上げの声 (espeak / say の -v)", &s.tts_voice, s.focus == SettingsField::Voice));
    let speech = if app.caps.can_speak() { "使えます" } else { "見つかりません" };
    lines.push(Line::from(format!("読み上げコマンド: {speech}")).fg(Color::Gray));
    let deepl = if app.caps.deepl { "使えます" } else { "APIキー未設定（Google翻訳のみ）" };
    lines.push(Line::from(format!("DeepL翻訳: {deepl}")).fg(Color::Gray));
    lines.push(Line::from("DeepL APIキーは https://www.deepl.com/pro-api で取得できます").fg(Color::DarkGray));

    f.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title("翻訳・読み上げの設定")),
        area,
    );
}
