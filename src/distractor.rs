// ============================================
// src/distractor.rs
// 4択クイズの誤答（ダミー選択肢）選び
// ============================================

use std::collections::HashSet;

use crate::store::{CHOICE_POOL_SIZE, Store, StoreResult};

/// 比較のときに取り除く文字（空白・中黒・読点・句点）
pub const IGNORED_CHARS: [char; 4] = [' ', '・', '、', '。'];

/// 候補が足りないときの埋め草
pub const FILLER_OPTIONS: [&str; 4] = ["該当なし", "不明", "その他", "関連語なし"];

/// 誤答として認める正規化後の最小文字数
const MIN_CHARS: usize = 2;

/// 比較用の正規化: 小文字化して `IGNORED_CHARS` を消す
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| !IGNORED_CHARS.contains(c))
        .collect()
}

/// `;` 区切りの最初の意味
pub fn primary_sense(meaning: &str) -> &str {
    meaning.split(';').next().unwrap_or("").trim()
}

/// `a` と `b` の片方がもう片方を含むか
fn overlaps(a: &str, b: &str) -> bool {
    a.contains(b) || b.contains(a)
}

/// 候補の並び（すでにランダム順）から誤答を `n` 個選ぶ
///
/// 正解と正規化後に一致するもの・包含関係にあるもの・1文字以下のもの・
/// 既に選んだものと重なるものは捨てる。足りなければ埋め草で `n` 個にそろえる。
pub fn pick_distractors<'a, I>(correct: &str, candidates: I, n: usize) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let base = normalize(primary_sense(correct));
    let mut picked: Vec<String> = Vec::with_capacity(n);
    let mut seen: HashSet<String> = HashSet::new();

    for meaning in candidates {
        if picked.len() >= n {
            break;
        }
        let cand = primary_sense(meaning);
        if cand.is_empty() {
            continue;
        }
        let norm = normalize(cand);
        if norm.is_empty() || norm == base || seen.contains(&norm) {
            continue;
        }
        if overlaps(&norm, &base) {
            continue;
        }
        if norm.chars().count() < MIN_CHARS {
            continue;
        }
        seen.insert(norm);
        picked.push(cand.to_string());
    }

    pad_with_fillers(&mut picked, &mut seen, &base, n);
    picked
}

/// 埋め草を足す。定型句を使い切ったら「その他2」「その他3」… と続ける
fn pad_with_fillers(picked: &mut Vec<String>, seen: &mut HashSet<String>, base: &str, n: usize) {
    let numbered = (2..).map(|i| format!("その他{i}"));
    let fillers = FILLER_OPTIONS.iter().map(|s| s.to_string()).chain(numbered);

    for filler in fillers {
        if picked.len() >= n {
            break;
        }
        let norm = normalize(&filler);
        if seen.contains(&norm) || (!base.is_empty() && overlaps(&norm, base)) {
            continue;
        }
        seen.insert(norm);
        picked.push(filler);
    }
}

impl Store {
    /// DBの単語の意味から誤答を `n` 個選ぶ
    pub fn distractors_for(&self, correct: &str, n: usize) -> StoreResult<Vec<String>> {
        let pool = self.random_meanings_excluding(correct, CHOICE_POOL_SIZE.max(n))?;
        Ok(pick_distractors(
            correct,
            pool.iter().map(String::as_str),
            n,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::CardKind;

    fn assert_guarantees(correct: &str, picked: &[String], n: usize) {
        assert_eq!(picked.len(), n);
        let base = normalize(primary_sense(correct));
        let mut seen = HashSet::new();
        for p in picked {
            let norm = normalize(p);
            assert!(seen.insert(norm.clone()), "duplicate option {p}");
            assert_ne!(norm, base);
            assert!(!norm.contains(&base) && !base.contains(&norm), "{p} overlaps {correct}");
        }
    }

    #[test]
    fn normalize_strips_fixed_punctuation() {
        assert_eq!(normalize("Ice Cream"), "icecream");
        assert_eq!(normalize("アイス・クリーム、です。"), "アイスクリームです");
        // 全角スペースは対象外
        assert_eq!(normalize("ア\u{3000}イ"), "ア\u{3000}イ");
    }

    #[test]
    fn primary_sense_takes_first() {
        assert_eq!(primary_sense("走る; 経営する"), "走る");
        assert_eq!(primary_sense(" 犬 "), "犬");
        assert_eq!(primary_sense(""), "");
    }

    #[test]
    fn rejects_overlaps_duplicates_and_short() {
        let pool = [
            "りんごの木",   // 正解を含む
            "ご",           // 正解に含まれる & 短い
            "猫",           // 1文字
            "バナナ",
            "バ・ナナ",     // 正規化すると重複
            "ぶどう; 葡萄",
            "みかん",
        ];
        let picked = pick_distractors("りんご; 林檎", pool, 3);
        assert_eq!(picked, vec!["バナナ", "ぶどう", "みかん"]);
        assert_guarantees("りんご; 林檎", &picked, 3);
    }

    #[test]
    fn pads_with_fillers_when_short() {
        let picked = pick_distractors("りんご", ["バナナ"], 3);
        assert_eq!(picked, vec!["バナナ", "該当なし", "不明"]);
    }

    #[test]
    fn filler_skips_answer_clash() {
        let picked = pick_distractors("不明", Vec::<&str>::new(), 3);
        assert_eq!(picked, vec!["該当なし", "その他", "関連語なし"]);
        assert_guarantees("不明", &picked, 3);
    }

    #[test]
    fn always_exactly_n() {
        let picked = pick_distractors("x", Vec::<&str>::new(), 7);
        assert_guarantees("x", &picked, 7);
        assert!(picked.contains(&"その他2".to_string()));
    }

    #[test]
    fn store_backed_selection() {
        let store = Store::open_in_memory().unwrap();
        for (en, ja) in [("apple", "りんご"), ("dog", "犬です"), ("cat", "ねこ"), ("bird", "小鳥")] {
            store.add_card(CardKind::Word, en, ja, 0).unwrap();
        }
        let picked = store.distractors_for("りんご", 3).unwrap();
        assert_guarantees("りんご", &picked, 3);
        let mut sorted = picked.clone();
        sorted.sort();
        let mut expected = vec!["ねこ".to_string(), "小鳥".to_string(), "犬です".to_string()];
        expected.sort();
        assert_eq!(sorted, expected);
    }
}
