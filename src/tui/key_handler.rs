// ============================================
// src/tui/key_handler.rs
// キー入力 → 画面ごとの操作
// ============================================

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::app_state::{App, EditorField, HomeItem, LibraryMode, Screen, SettingsField};
use crate::quiz::{AnswerStyle, Phase};
use crate::services::translate::Engine;

pub fn handle_key(app: &mut App, key: KeyEvent) {
    // キーを押したらメッセージは消す
    app.flash = None;

    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        app.quit = true;
        return;
    }

    match app.screen {
        Screen::Home => handle_home_key(app, key),
        Screen::Library => handle_library_key(app, key),
        Screen::Quiz => handle_quiz_key(app, key),
        Screen::Walk => handle_walk_key(app, key),
        Screen::Settings => handle_settings_key(app, key),
    }
}

// MARK: ホーム

fn handle_home_key(app: &mut App, key: KeyEvent) {
    // 期間指定の入力中
    if let Some(input) = app.home.custom_input.as_mut() {
        match key.code {
            KeyCode::Esc => app.home.custom_input = None,
            KeyCode::Enter => app.submit_custom_range(),
            KeyCode::Backspace => {
                input.pop();
            }
            KeyCode::Char(c) => input.push(c),
            _ => {}
        }
        return;
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.quit = true,
        KeyCode::Char('j') | KeyCode::Down => app.home.move_selection(true),
        KeyCode::Char('k') | KeyCode::Up => app.home.move_selection(false),
        KeyCode::Left | KeyCode::Right => {
            let forward = key.code == KeyCode::Right;
            match app.home.selected_item() {
                HomeItem::Period => app.cycle_preset(forward),
                HomeItem::WordCount | HomeItem::SentenceCount => app.adjust_count(forward),
                _ => {}
            }
        }
        KeyCode::Char(c) if c.is_ascii_digit() => {
            if let Some(field) = app.count_field_mut() {
                if field.len() < 4 {
                    field.push(c);
                }
            }
        }
        KeyCode::Backspace => {
            if let Some(field) = app.count_field_mut() {
                field.pop();
            }
        }
        KeyCode::Enter => app.activate_home_item(),
        _ => {}
    }
}

// MARK: 単語帳・例文帳

fn handle_library_key(app: &mut App, key: KeyEvent) {
    let Some(mode) = app.library.as_ref().map(|l| l.mode) else {
        app.go_home();
        return;
    };

    match mode {
        LibraryMode::Browse => match key.code {
            KeyCode::Esc | KeyCode::Char('q') => app.go_home(),
            KeyCode::Char('j') | KeyCode::Down => {
                if let Some(lib) = app.library.as_mut() {
                    lib.move_selection(true);
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                if let Some(lib) = app.library.as_mut() {
                    lib.move_selection(false);
                }
            }
            KeyCode::Char('a') | KeyCode::Char('n') => app.library_new_entry(),
            KeyCode::Char('e') | KeyCode::Enter => app.library_edit_selected(),
            KeyCode::Char('d') | KeyCode::Delete => app.library_request_delete(),
            KeyCode::Char('p') => app.speak_current(),
            _ => {}
        },
        LibraryMode::ConfirmDelete(_) => match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => app.library_confirm_delete(true),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => app.library_confirm_delete(false),
            _ => {}
        },
        LibraryMode::Edit => handle_editor_key(app, key),
    }
}

fn handle_editor_key(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Esc => app.library_cancel(),
        KeyCode::Char('s') if ctrl => app.library_save(),
        KeyCode::Char('t') if ctrl => app.library_translate(Engine::Deepl),
        KeyCode::Char('g') if ctrl => app.library_translate(Engine::Google),
        KeyCode::Char('p') if ctrl => app.speak_current(),
        KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
            if let Some(lib) = app.library.as_mut() {
                lib.editor.toggle_focus();
            }
        }
        KeyCode::Enter => {
            let on_english = app
                .library
                .as_ref()
                .is_some_and(|l| l.editor.focus == EditorField::English);
            if on_english {
                if let Some(lib) = app.library.as_mut() {
                    lib.editor.toggle_focus();
                }
            } else {
                app.library_save();
            }
        }
        KeyCode::Backspace => {
            if let Some(lib) = app.library.as_mut() {
                lib.editor.focused_mut().pop();
            }
        }
        KeyCode::Char(c) if !ctrl => {
            if let Some(lib) = app.library.as_mut() {
                lib.editor.focused_mut().push(c);
            }
        }
        _ => {}
    }
}

// MARK: クイズ

fn handle_quiz_key(app: &mut App, key: KeyEvent) {
    let Some((phase, style)) = app.quiz.as_ref().map(|s| (s.phase(), s.style())) else {
        app.go_home();
        return;
    };

    if key.code == KeyCode::Esc {
        app.go_home();
        return;
    }
    if key.code == KeyCode::Char('p') {
        app.speak_current();
        return;
    }

    match phase {
        Phase::Presenting => match (style, key.code) {
            (AnswerStyle::Choice, KeyCode::Char(c @ '1'..='4')) => {
                let index = c as usize - '1' as usize;
                app.quiz_choose(index);
            }
            (AnswerStyle::Reveal, KeyCode::Char(' ') | KeyCode::Enter) => {
                if app.quiz.as_ref().is_some_and(|s| s.is_revealed()) {
                    return;
                }
                app.quiz_reveal();
            }
            (AnswerStyle::Reveal, KeyCode::Char('y') | KeyCode::Char('o')) => app.quiz_judge(true),
            (AnswerStyle::Reveal, KeyCode::Char('n') | KeyCode::Char('x')) => app.quiz_judge(false),
            _ => {}
        },
        Phase::Answered { .. } => {
            if matches!(key.code, KeyCode::Enter | KeyCode::Char(' ') | KeyCode::Right) {
                app.quiz_next();
            }
        }
        Phase::Finished => match key.code {
            KeyCode::Char('r') => app.open_walk(),
            KeyCode::Enter | KeyCode::Char('q') => app.go_home(),
            _ => {}
        },
    }
}

// MARK: おさらい

fn handle_walk_key(app: &mut App, key: KeyEvent) {
    let Some(revealed) = app.walk.as_ref().map(|w| w.is_revealed()) else {
        app.close_walk();
        return;
    };
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => app.close_walk(),
        KeyCode::Char(' ') => {
            if let Some(walk) = app.walk.as_mut() {
                walk.reveal();
            }
        }
        KeyCode::Enter | KeyCode::Right | KeyCode::Char('l') => {
            if revealed {
                app.walk_next();
            } else if let Some(walk) = app.walk.as_mut() {
                walk.reveal();
            }
        }
        KeyCode::Char('p') => app.speak_current(),
        _ => {}
    }
}

// MARK: 設定

fn handle_settings_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.screen = Screen::Home,
        KeyCode::Enter => app.save_settings(),
        KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
            app.settings.focus = match app.settings.focus {
                SettingsField::DeeplKey => SettingsField::Voice,
                SettingsField::Voice => SettingsField::DeeplKey,
            };
        }
        KeyCode::Backspace => {
            field_mut(app).pop();
        }
        KeyCode::Char(c) => field_mut(app).push(c),
        _ => {}
    }
}

fn field_mut(app: &mut App) -> &mut String {
    match app.settings.focus {
        SettingsField::DeeplKey => &mut app.settings.deepl_api_key,
        SettingsField::Voice => &mut app.settings.tts_voice,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::services::Capabilities;
    use crate::store::{CardKind, Store};

    fn press(app: &mut App, code: KeyCode) {
        handle_key(app, KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn ctrl(app: &mut App, c: char) {
        handle_key(app, KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL));
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    fn new_app() -> App {
        let store = Store::open_in_memory().unwrap();
        for (en, ja) in [("sun", "太陽"), ("moon", "月"), ("star", "星"), ("sky", "空")] {
            store.add_card(CardKind::Word, en, ja, chrono::Utc::now().timestamp()).unwrap();
        }
        App::new(store, AppConfig::default(), Capabilities::default()).unwrap()
    }

    #[test]
    fn add_word_through_keys() {
        let mut app = new_app();
        app.open_library(CardKind::Word);
        press(&mut app, KeyCode::Char('a'));
        type_text(&mut app, "cloud");
        press(&mut app, KeyCode::Enter);
        type_text(&mut app, "雲");
        press(&mut app, KeyCode::Enter);

        let lib = app.library.as_ref().unwrap();
        assert_eq!(lib.mode, LibraryMode::Browse);
        assert!(lib.cards.iter().any(|c| c.english == "cloud" && c.japanese == "雲"));
    }

    #[test]
    fn ctrl_s_saves_and_esc_cancels() {
        let mut app = new_app();
        app.open_library(CardKind::Word);
        press(&mut app, KeyCode::Char('a'));
        type_text(&mut app, "rain");
        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "雨");
        ctrl(&mut app, 's');
        assert_eq!(app.library.as_ref().unwrap().cards.len(), 5);

        press(&mut app, KeyCode::Char('a'));
        type_text(&mut app, "snow");
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.library.as_ref().unwrap().cards.len(), 5);
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.screen, Screen::Home);
        assert_eq!(app.home.stats.words, 5);
    }

    #[test]
    fn choice_quiz_by_number_keys() {
        let mut app = new_app();
        app.home.word_count = "4".into();
        app.start_quiz(crate::store::QuestionType::WordChoice);

        while app.quiz.as_ref().is_some_and(|s| !s.is_finished()) {
            let session = app.quiz.as_ref().unwrap();
            let answer = session.current().unwrap().answer.clone();
            let pos = session.options().iter().position(|o| *o == answer).unwrap();
            press(&mut app, KeyCode::Char(char::from(b'1' + pos as u8)));
            press(&mut app, KeyCode::Enter);
        }
        let summary = app.quiz.as_ref().unwrap().summary().unwrap();
        assert_eq!(summary.score, 4);
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.screen, Screen::Home);
    }

    #[test]
    fn home_digits_edit_count() {
        let mut app = new_app();
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Backspace);
        press(&mut app, KeyCode::Backspace);
        type_text(&mut app, "7");
        assert_eq!(app.home.word_count, "7");
        press(&mut app, KeyCode::Right);
        assert_eq!(app.home.word_count, "8");
    }

    #[test]
    fn custom_period_input() {
        let mut app = new_app();
        // 期間の行で左に回すと期間指定
        press(&mut app, KeyCode::Left);
        assert!(app.home.custom_input.is_some());
        type_text(&mut app, "2001-01-01 2001-01-31");
        press(&mut app, KeyCode::Enter);
        assert!(app.home.custom_input.is_none());
        assert_eq!(app.home.range_counts, (0, 0));
    }
}
