// ============================================
// src/store/cards.rs
// 単語・例文の CRUD とランダム取得
// ============================================

use rusqlite::{OptionalExtension, params, params_from_iter};

use super::{Card, CardKind, DateRange, SaveOutcome, Store, StoreError, StoreResult, is_unique_violation};

/// 4択の誤答候補を引くときの母集団の上限
pub const CHOICE_POOL_SIZE: usize = 50;

impl Store {
    /// 新規追加。英語が重複していれば `AlreadyExists`
    pub fn add_card(
        &self,
        kind: CardKind,
        english: &str,
        japanese: &str,
        created_at: i64,
    ) -> StoreResult<i64> {
        let sql = format!(
            "INSERT INTO {} ({}, {}, created_at) VALUES (?1, ?2, ?3)",
            kind.table(),
            kind.english_column(),
            kind.japanese_column()
        );
        match self.conn().execute(&sql, params![english, japanese, created_at]) {
            Ok(_) => {
                let id = self.conn().last_insert_rowid();
                log::info!("{} を追加: {} (id={})", kind.label(), english, id);
                Ok(id)
            }
            Err(e) if is_unique_violation(&e) => Err(StoreError::AlreadyExists(english.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    /// 保存ボタンの処理。同じ英語があれば上書き、なければ追加
    pub fn save_card(
        &self,
        kind: CardKind,
        english: &str,
        japanese: &str,
        now: i64,
    ) -> StoreResult<SaveOutcome> {
        match self.find_card_id(kind, english)? {
            Some(id) => {
                self.update_card(kind, id, english, japanese)?;
                Ok(SaveOutcome::Updated(id))
            }
            None => self
                .add_card(kind, english, japanese, now)
                .map(SaveOutcome::Created),
        }
    }

    /// IDを指定して編集。別の行と英語がぶつかれば `AlreadyExists`
    pub fn update_card(
        &self,
        kind: CardKind,
        id: i64,
        english: &str,
        japanese: &str,
    ) -> StoreResult<()> {
        let sql = format!(
            "UPDATE {} SET {} = ?1, {} = ?2 WHERE id = ?3",
            kind.table(),
            kind.english_column(),
            kind.japanese_column()
        );
        match self.conn().execute(&sql, params![english, japanese, id]) {
            Ok(0) => Err(StoreError::NotFound(id)),
            Ok(_) => {
                log::info!("{} を更新: {} (id={})", kind.label(), english, id);
                Ok(())
            }
            Err(e) if is_unique_violation(&e) => Err(StoreError::AlreadyExists(english.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    /// 削除。存在しないIDでもエラーにしない
    pub fn delete_card(&self, kind: CardKind, id: i64) -> StoreResult<bool> {
        let sql = format!("DELETE FROM {} WHERE id = ?1", kind.table());
        let deleted = self.conn().execute(&sql, params![id])? > 0;
        if deleted {
            log::info!("{} を削除 (id={})", kind.label(), id);
        }
        Ok(deleted)
    }

    /// 新しい順の一覧
    pub fn list_cards(&self, kind: CardKind) -> StoreResult<Vec<Card>> {
        self.list_cards_in_range(kind, &DateRange::all())
    }

    /// 期間内に登録したものを新しい順で
    pub fn list_cards_in_range(&self, kind: CardKind, range: &DateRange) -> StoreResult<Vec<Card>> {
        let (filter, values) = range.sql_filter();
        let sql = format!(
            "SELECT id, {}, {}, created_at FROM {} WHERE 1=1{} ORDER BY created_at DESC, id DESC",
            kind.english_column(),
            kind.japanese_column(),
            kind.table(),
            filter
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let cards = stmt
            .query_map(params_from_iter(values), Card::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(cards)
    }

    pub fn get_card(&self, kind: CardKind, id: i64) -> StoreResult<Option<Card>> {
        let sql = format!(
            "SELECT id, {}, {}, created_at FROM {} WHERE id = ?1",
            kind.english_column(),
            kind.japanese_column(),
            kind.table()
        );
        Ok(self
            .conn()
            .query_row(&sql, params![id], Card::from_row)
            .optional()?)
    }

    /// 英語の完全一致でIDを探す
    pub fn find_card_id(&self, kind: CardKind, english: &str) -> StoreResult<Option<i64>> {
        let sql = format!(
            "SELECT id FROM {} WHERE {} = ?1",
            kind.table(),
            kind.english_column()
        );
        Ok(self
            .conn()
            .query_row(&sql, params![english], |row| row.get(0))
            .optional()?)
    }

    /// 期間内からランダムに `count` 件。足りなければあるだけ返す
    pub fn random_cards(
        &self,
        kind: CardKind,
        count: usize,
        range: &DateRange,
    ) -> StoreResult<Vec<Card>> {
        let (filter, mut values) = range.sql_filter();
        let sql = format!(
            "SELECT id, {}, {}, created_at FROM {} WHERE 1=1{} ORDER BY RANDOM() LIMIT ?",
            kind.english_column(),
            kind.japanese_column(),
            kind.table(),
            filter
        );
        values.push(i64::try_from(count).unwrap_or(i64::MAX));
        let mut stmt = self.conn().prepare(&sql)?;
        let cards = stmt
            .query_map(params_from_iter(values), Card::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(cards)
    }

    /// 期間内の件数
    pub fn count_cards(&self, kind: CardKind, range: &DateRange) -> StoreResult<u64> {
        let (filter, values) = range.sql_filter();
        let sql = format!("SELECT COUNT(*) FROM {} WHERE 1=1{}", kind.table(), filter);
        let count: i64 = self
            .conn()
            .query_row(&sql, params_from_iter(values), |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    /// 誤答候補の母集団: 正解と完全一致しない日本語の意味をランダムに
    pub fn random_meanings_excluding(&self, exclude: &str, limit: usize) -> StoreResult<Vec<String>> {
        let mut stmt = self.conn().prepare(
            "SELECT japanese_meaning FROM words WHERE japanese_meaning != ?1 ORDER BY RANDOM() LIMIT ?2",
        )?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let meanings = stmt
            .query_map(params![exclude, limit], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(meanings)
    }
}
