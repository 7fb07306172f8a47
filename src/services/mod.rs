// ============================================
// src/services/mod.rs
// 外部の機能（翻訳・読み上げ）と裏スレッド
// ============================================

pub mod speech;
pub mod task;
pub mod translate;

use std::sync::Arc;

use speech::{AudioPlayer, CommandPlayer, CommandSynthesizer, Speaker, SpeechError, SpeechSynthesizer};

/// 起動時に一度だけ調べる「使える機能」の一覧
#[derive(Clone, Default)]
pub struct Capabilities {
    pub synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
    pub player: Option<Arc<dyn AudioPlayer>>,
    /// DeepL のキーが設定されているか
    pub deepl: bool,
}

impl Capabilities {
    pub fn detect(deepl_api_key: &str) -> Self {
        let synthesizer = CommandSynthesizer::detect()
            .map(|s| Arc::new(s) as Arc<dyn SpeechSynthesizer>);
        let player = CommandPlayer::detect().map(|p| Arc::new(p) as Arc<dyn AudioPlayer>);

        match (&synthesizer, &player) {
            (Some(s), Some(p)) => log::info!("読み上げ: {} + {}", s.name(), p.name()),
            _ => log::warn!("読み上げコマンドが見つからないため、読み上げは無効です"),
        }

        Self {
            synthesizer,
            player,
            deepl: !deepl_api_key.trim().is_empty(),
        }
    }

    pub fn can_speak(&self) -> bool {
        self.synthesizer.is_some() && self.player.is_some()
    }

    /// 読み上げ器を作る。どちらかのコマンドが無ければエラー
    pub fn speaker(&self, voice: &str) -> Result<Speaker, SpeechError> {
        let synthesizer = self.synthesizer.clone().ok_or(SpeechError::NoSynthesizer)?;
        let player = self.player.clone().ok_or(SpeechError::NoPlayer)?;
        let voice = Some(voice.trim().to_string()).filter(|v| !v.is_empty());
        Ok(Speaker::new(synthesizer, player, voice))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_capabilities_refuse_speech() {
        let caps = Capabilities::default();
        assert!(!caps.can_speak());
        assert!(!caps.deepl);
        assert!(matches!(caps.speaker("en-us"), Err(SpeechError::NoSynthesizer)));
    }
}
