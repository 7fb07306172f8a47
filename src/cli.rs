// ============================================
// src/cli.rs
// コマンドライン（TUIを使わない操作）
// ============================================

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use console::style;
use dialoguer::Confirm;
use thiserror::Error;

use crate::config::AppConfig;
use crate::services::translate::{Engine, translator_for};
use crate::store::{CardKind, DateRange, MASTERY_STREAK, QuestionType, Store, StoreError};

/// 入力の誤り（クラッシュログには残さない）
#[derive(Error, Debug)]
pub enum CliError {
    #[error("英語を入力してください")]
    EmptyEnglish,

    #[error("開始日が終了日より後になっています")]
    ReversedRange,
}

#[derive(Parser, Debug)]
#[command(name = "tangowiz", about = "TANGO WiZ. 英単語・例文の暗記クイズ", version)]
pub struct Cli {
    /// 使うデータベースファイル（設定の db_path より優先）
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// 設定ファイルの場所
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// 単語帳の操作
    #[command(subcommand)]
    Word(CardCommand),

    /// 例文帳の操作
    #[command(subcommand)]
    Sentence(CardCommand),

    /// 登録数と復習待ちの数
    Stats,

    /// 英語を日本語に翻訳する
    Translate {
        text: String,
        #[arg(long, value_enum, default_value_t = Engine::Deepl)]
        engine: Engine,
    },
}

#[derive(Subcommand, Debug)]
pub enum CardCommand {
    /// 登録（同じ英語があれば意味を更新）
    Add {
        english: String,
        /// 省略すると翻訳した結果を使う
        japanese: Option<String>,
        #[arg(long, value_enum, default_value_t = Engine::Deepl)]
        engine: Engine,
    },

    /// 一覧（新しい順）
    List(ListArgs),

    /// 削除
    Delete {
        id: i64,
        /// 確認しない
        #[arg(long, short)]
        yes: bool,
    },

    /// 1件表示
    Show { id: i64 },
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// この日以降に登録したもの (YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<NaiveDate>,
    /// この日までに登録したもの (YYYY-MM-DD)
    #[arg(long)]
    pub to: Option<NaiveDate>,
}

impl ListArgs {
    fn range(&self) -> Result<DateRange> {
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                return Err(CliError::ReversedRange.into());
            }
        }
        Ok(DateRange {
            start: self.from,
            end: self.to,
        })
    }
}

// --------------------------------------------------
// 実行
// --------------------------------------------------

pub fn run(command: Command, store: &Store, config: &AppConfig) -> Result<()> {
    match command {
        Command::Word(cmd) => run_card(CardKind::Word, cmd, store, config),
        Command::Sentence(cmd) => run_card(CardKind::Sentence, cmd, store, config),
        Command::Stats => print_stats(store),
        Command::Translate { text, engine } => {
            let translator = translator_for(engine, &config.deepl_api_key);
            let translated = translator
                .translate(&text)
                .with_context(|| format!("{}翻訳に失敗しました", translator.name()))?;
            println!("{translated}");
            Ok(())
        }
    }
}

fn run_card(kind: CardKind, cmd: CardCommand, store: &Store, config: &AppConfig) -> Result<()> {
    match cmd {
        CardCommand::Add {
            english,
            japanese,
            engine,
        } => {
            let english = english.trim();
            if english.is_empty() {
                return Err(CliError::EmptyEnglish.into());
            }
            let japanese = match japanese.filter(|j| !j.trim().is_empty()) {
                Some(j) => j.trim().to_string(),
                None => {
                    let translator = translator_for(engine, &config.deepl_api_key);
                    translator.translate(english).with_context(|| {
                        format!("「{english}」を{}で翻訳できませんでした", translator.name())
                    })?
                }
            };
            let outcome = store.save_card(kind, english, &japanese, chrono::Utc::now().timestamp())?;
            println!(
                "{} {}を{}しました (ID {}): {} → {}",
                style("✔").green(),
                kind.label(),
                outcome.verb(),
                outcome.id(),
                style(english).bold(),
                japanese
            );
            Ok(())
        }
        CardCommand::List(args) => {
            let range = args.range()?;
            let shown = store.list_cards_in_range(kind, &range)?;
            for card in &shown {
                let date = card
                    .created_at_local()
                    .map(|d| d.format("%Y/%m/%d").to_string())
                    .unwrap_or_default();
                println!(
                    "{:>5}  {}  {}  {}",
                    style(card.id).dim(),
                    style(date).dim(),
                    style(&card.english).bold(),
                    card.japanese
                );
            }
            println!(
                "{}",
                style(format!("{}件 ({})", shown.len(), range.describe())).cyan()
            );
            Ok(())
        }
        CardCommand::Delete { id, yes } => {
            let card = store
                .get_card(kind, id)?
                .ok_or(StoreError::NotFound(id))?;
            if !yes {
                let confirmed = Confirm::new()
                    .with_prompt(format!("「{}」を削除しますか？", card.english))
                    .default(false)
                    .interact()?;
                if !confirmed {
                    println!("削除を取り消しました");
                    return Ok(());
                }
            }
            store.delete_card(kind, id)?;
            println!("{} 「{}」を削除しました", style("✔").green(), card.english);
            Ok(())
        }
        CardCommand::Show { id } => {
            let card = store
                .get_card(kind, id)?
                .ok_or(StoreError::NotFound(id))?;
            println!("{}", style(&card.english).bold());
            println!("{}", card.japanese);
            if let Some(date) = card.created_at_local() {
                println!("{}", style(date.format("登録日: %Y/%m/%d %H:%M")).dim());
            }
            for line in backlog_lines(store, kind, &card.english)? {
                println!("{}", style(line).yellow());
            }
            Ok(())
        }
    }
}

/// 復習待ちに入っていれば、問題の種類ごとの連続正解数
fn backlog_lines(store: &Store, kind: CardKind, english: &str) -> Result<Vec<String>> {
    let mut lines = Vec::new();
    for qt in QuestionType::ALL.into_iter().filter(|qt| qt.card_kind() == kind) {
        if let Some(wrong) = store.get_wrong(qt, english)? {
            lines.push(format!(
                "復習待ち ({}): 連続正解 {} / {}",
                qt.label(),
                wrong.consecutive_correct,
                MASTERY_STREAK
            ));
        }
    }
    Ok(lines)
}

fn print_stats(store: &Store) -> Result<()> {
    let stats = store.stats()?;
    println!("{} {}", style("単語").bold(), stats.words);
    println!("{} {}", style("例文").bold(), stats.sentences);
    println!("{}", style("復習待ち").yellow());
    for qt in QuestionType::ALL {
        println!("  {:<14} {}", qt.label(), stats.wrong_count(qt));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_card_subcommands() {
        let cli = Cli::try_parse_from(["tangowiz", "--db", "x.db", "word", "add", "apple", "りんご"]).unwrap();
        assert_eq!(cli.db, Some(PathBuf::from("x.db")));
        match cli.command {
            Some(Command::Word(CardCommand::Add {
                english, japanese, ..
            })) => {
                assert_eq!(english, "apple");
                assert_eq!(japanese.as_deref(), Some("りんご"));
            }
            other => panic!("unexpected {other:?}"),
        }

        let cli = Cli::try_parse_from(["tangowiz", "translate", "hello", "--engine", "google"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Command::Translate {
                engine: Engine::Google,
                ..
            })
        ));

        let cli = Cli::try_parse_from(["tangowiz"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn list_range_rejects_reversed_dates() {
        let args = ListArgs {
            from: NaiveDate::from_ymd_opt(2024, 5, 2),
            to: NaiveDate::from_ymd_opt(2024, 5, 1),
        };
        assert!(args.range().is_err());
    }

    #[test]
    fn add_with_meaning_saves_without_network() {
        let store = Store::open_in_memory().unwrap();
        let config = AppConfig::default();
        let add = |ja: &str| CardCommand::Add {
            english: "apple".into(),
            japanese: Some(ja.into()),
            engine: Engine::Deepl,
        };
        run_card(CardKind::Word, add("りんご"), &store, &config).unwrap();
        run_card(CardKind::Word, add("林檎"), &store, &config).unwrap();

        let cards = store.list_cards(CardKind::Word).unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].japanese, "林檎");

        // 訳が無く DeepL キーも無ければ失敗する
        let err = run_card(
            CardKind::Word,
            CardCommand::Add {
                english: "dog".into(),
                japanese: None,
                engine: Engine::Deepl,
            },
            &store,
            &config,
        )
        .unwrap_err();
        assert!(err.to_string().contains("dog"));
        assert!(err.to_string().contains("DeepL"));
    }

    #[test]
    fn show_lists_backlog_streaks() {
        let store = Store::open_in_memory().unwrap();
        store.add_card(CardKind::Word, "apple", "りんご", 0).unwrap();
        assert!(backlog_lines(&store, CardKind::Word, "apple").unwrap().is_empty());

        store.record_miss(QuestionType::WordListening, "apple", "りんご").unwrap();
        store.update_wrong_score(QuestionType::WordListening, "apple", true).unwrap();
        let lines = backlog_lines(&store, CardKind::Word, "apple").unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("連続正解 1 / 3"));

        // 例文帳の問題種別は見ない
        assert!(backlog_lines(&store, CardKind::Sentence, "apple").unwrap().is_empty());
    }
}
