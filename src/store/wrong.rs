// ============================================
// src/store/wrong.rs
// 間違えた問題の記録（3回連続正解で卒業）
// ============================================

use chrono::Utc;
use rusqlite::{OptionalExtension, Row, params};

use super::{QuestionType, ScoreOutcome, Store, StoreResult, WrongQuestion};

/// この回数だけ連続で正解すると復習リストから消える
pub const MASTERY_STREAK: u32 = 3;

fn wrong_from_row(question_type: QuestionType, row: &Row<'_>) -> rusqlite::Result<WrongQuestion> {
    let streak: i64 = row.get(2)?;
    Ok(WrongQuestion {
        question_type,
        content: row.get(0)?,
        correct_answer: row.get(1)?,
        consecutive_correct: streak.max(0) as u32,
        created_at: row.get::<_, Option<i64>>(3)?.unwrap_or_default(),
    })
}

impl Store {
    /// 通常クイズで間違えたとき。既存の行も連続正解 0 で上書きする
    pub fn record_miss(
        &self,
        question_type: QuestionType,
        content: &str,
        correct_answer: &str,
    ) -> StoreResult<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO wrong_questions
                (question_type, question_content, correct_answer, consecutive_correct, created_at)
             VALUES (?1, ?2, ?3, 0, ?4)",
            params![
                question_type.as_str(),
                content,
                correct_answer,
                Utc::now().timestamp()
            ],
        )?;
        log::info!("間違いを記録: [{}] {}", question_type.as_str(), content);
        Ok(())
    }

    /// 復習で採点したとき
    ///
    /// 正解なら連続正解数を +1 し、3 以上になった行は削除する。
    /// 不正解なら 0 に戻す（行は残る）。
    pub fn update_wrong_score(
        &self,
        question_type: QuestionType,
        content: &str,
        is_correct: bool,
    ) -> StoreResult<ScoreOutcome> {
        let tx = self.conn().unchecked_transaction()?;
        let tag = question_type.as_str();

        let outcome = if is_correct {
            let changed = tx.execute(
                "UPDATE wrong_questions SET consecutive_correct = consecutive_correct + 1
                 WHERE question_type = ?1 AND question_content = ?2",
                params![tag, content],
            )?;
            if changed == 0 {
                ScoreOutcome::Missing
            } else {
                let removed = tx.execute(
                    "DELETE FROM wrong_questions
                     WHERE question_type = ?1 AND question_content = ?2 AND consecutive_correct >= ?3",
                    params![tag, content, MASTERY_STREAK],
                )?;
                if removed > 0 {
                    ScoreOutcome::Mastered
                } else {
                    let streak: i64 = tx.query_row(
                        "SELECT consecutive_correct FROM wrong_questions
                         WHERE question_type = ?1 AND question_content = ?2",
                        params![tag, content],
                        |row| row.get(0),
                    )?;
                    ScoreOutcome::Streak(streak.max(0) as u32)
                }
            }
        } else {
            let changed = tx.execute(
                "UPDATE wrong_questions SET consecutive_correct = 0
                 WHERE question_type = ?1 AND question_content = ?2",
                params![tag, content],
            )?;
            if changed == 0 {
                ScoreOutcome::Missing
            } else {
                ScoreOutcome::Reset
            }
        };

        tx.commit()?;
        log::info!("復習結果: [{}] {} -> {:?}", tag, content, outcome);
        Ok(outcome)
    }

    /// 種類ごとの間違い問題（ランダム順）。`limit` が `None` なら全件
    pub fn wrong_questions(
        &self,
        question_type: QuestionType,
        limit: Option<usize>,
    ) -> StoreResult<Vec<WrongQuestion>> {
        let limit = limit
            .map(|n| i64::try_from(n).unwrap_or(i64::MAX))
            .unwrap_or(-1);
        let mut stmt = self.conn().prepare(
            "SELECT question_content, correct_answer, consecutive_correct, created_at
             FROM wrong_questions
             WHERE question_type = ?1
             ORDER BY RANDOM()
             LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![question_type.as_str(), limit], |row| {
                wrong_from_row(question_type, row)
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn get_wrong(
        &self,
        question_type: QuestionType,
        content: &str,
    ) -> StoreResult<Option<WrongQuestion>> {
        Ok(self
            .conn()
            .query_row(
                "SELECT question_content, correct_answer, consecutive_correct, created_at
                 FROM wrong_questions
                 WHERE question_type = ?1 AND question_content = ?2",
                params![question_type.as_str(), content],
                |row| wrong_from_row(question_type, row),
            )
            .optional()?)
    }

    pub fn count_wrong(&self, question_type: QuestionType) -> StoreResult<u64> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM wrong_questions WHERE question_type = ?1",
            params![question_type.as_str()],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }
}
