// ============================================
// src/services/speech.rs
// 音声合成と再生（OSのコマンドを呼ぶ）
// ============================================

use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::Arc;

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpeechError {
    #[error("音声合成のコマンドが見つかりません（espeak-ng / espeak / say）")]
    NoSynthesizer,

    #[error("音声再生のコマンドが見つかりません（aplay / paplay / afplay）")]
    NoPlayer,

    #[error("{program} を実行できませんでした: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} が失敗しました: {stderr}")]
    Failed { program: String, stderr: String },

    #[error("一時音声ファイルを作れません: {0}")]
    TempFile(#[from] std::io::Error),
}

/// テキストを音声ファイルにする
pub trait SpeechSynthesizer: Send + Sync {
    fn name(&self) -> &str;
    /// 出力ファイルの拡張子
    fn extension(&self) -> &'static str;
    fn synthesize(&self, text: &str, voice: Option<&str>, out: &Path) -> Result<(), SpeechError>;
}

/// 音声ファイルを鳴らす（鳴り終わるまで戻らない）
pub trait AudioPlayer: Send + Sync {
    fn name(&self) -> &str;
    fn play(&self, path: &Path) -> Result<(), SpeechError>;
}

fn run(program: &str, cmd: &mut Command) -> Result<(), SpeechError> {
    let output = cmd
        .stdin(Stdio::null())
        .output()
        .map_err(|source| SpeechError::Spawn {
            program: program.to_string(),
            source,
        })?;
    if output.status.success() {
        Ok(())
    } else {
        Err(SpeechError::Failed {
            program: program.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

/// PATH 上にコマンドがあるか
pub fn command_exists(program: &str) -> bool {
    Command::new("which")
        .arg(program)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

// --------------------------------------------------
// 合成
// --------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SynthStyle {
    /// espeak-ng / espeak: `-v voice -w out.wav text`
    Espeak,
    /// macOS say: `-v voice -o out.aiff text`
    Say,
}

pub struct CommandSynthesizer {
    program: String,
    style: SynthStyle,
}

impl CommandSynthesizer {
    /// 使えるものを順に探す
    pub fn detect() -> Option<Self> {
        let candidates = [
            ("espeak-ng", SynthStyle::Espeak),
            ("espeak", SynthStyle::Espeak),
            ("say", SynthStyle::Say),
        ];
        candidates
            .into_iter()
            .find(|(program, _)| command_exists(program))
            .map(|(program, style)| Self {
                program: program.to_string(),
                style,
            })
    }

    fn args(&self, text: &str, voice: Option<&str>, out: &Path) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(voice) = voice.filter(|v| !v.trim().is_empty()) {
            args.push("-v".to_string());
            args.push(voice.trim().to_string());
        }
        match self.style {
            SynthStyle::Espeak => args.push("-w".to_string()),
            SynthStyle::Say => args.push("-o".to_string()),
        }
        args.push(out.display().to_string());
        args.push(text.to_string());
        args
    }
}

impl SpeechSynthesizer for CommandSynthesizer {
    fn name(&self) -> &str {
        &self.program
    }

    fn extension(&self) -> &'static str {
        match self.style {
            SynthStyle::Espeak => "wav",
            SynthStyle::Say => "aiff",
        }
    }

    fn synthesize(&self, text: &str, voice: Option<&str>, out: &Path) -> Result<(), SpeechError> {
        run(
            &self.program,
            Command::new(&self.program).args(self.args(text, voice, out)),
        )
    }
}

// --------------------------------------------------
// 再生
// --------------------------------------------------

pub struct CommandPlayer {
    program: String,
}

impl CommandPlayer {
    pub fn detect() -> Option<Self> {
        ["aplay", "paplay", "afplay"]
            .into_iter()
            .find(|program| command_exists(program))
            .map(|program| Self {
                program: program.to_string(),
            })
    }
}

impl AudioPlayer for CommandPlayer {
    fn name(&self) -> &str {
        &self.program
    }

    fn play(&self, path: &Path) -> Result<(), SpeechError> {
        let mut cmd = Command::new(&self.program);
        if self.program == "aplay" {
            cmd.arg("-q");
        }
        run(&self.program, cmd.arg(path))
    }
}

// --------------------------------------------------
// 合成 + 再生
// --------------------------------------------------

/// 読み上げ（合成してから鳴らす）。裏スレッドに渡せるよう Clone できる
#[derive(Clone)]
pub struct Speaker {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    player: Arc<dyn AudioPlayer>,
    voice: Option<String>,
}

impl Speaker {
    pub fn new(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        player: Arc<dyn AudioPlayer>,
        voice: Option<String>,
    ) -> Self {
        Self {
            synthesizer,
            player,
            voice,
        }
    }

    /// 一時ファイル（drop で消える）
    fn output_file(&self) -> Result<NamedTempFile, SpeechError> {
        let suffix = format!(".{}", self.synthesizer.extension());
        Ok(tempfile::Builder::new()
            .prefix("tangowiz_tts_")
            .suffix(&suffix)
            .tempfile()?)
    }

    pub fn speak(&self, text: &str) -> Result<(), SpeechError> {
        let out = self.output_file()?;
        self.synthesizer
            .synthesize(text, self.voice.as_deref(), out.path())?;
        self.player.play(out.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
        written: Mutex<Vec<PathBuf>>,
        fail_synth: bool,
        fail_play: bool,
    }

    impl SpeechSynthesizer for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }
        fn extension(&self) -> &'static str {
            "wav"
        }
        fn synthesize(&self, text: &str, voice: Option<&str>, out: &Path) -> Result<(), SpeechError> {
            std::fs::write(out, b"RIFF").unwrap();
            self.written.lock().unwrap().push(out.to_path_buf());
            if self.fail_synth {
                return Err(SpeechError::Failed {
                    program: "recorder".into(),
                    stderr: "unknown voice".into(),
                });
            }
            self.calls
                .lock()
                .unwrap()
                .push(format!("synth:{text}:{}", voice.unwrap_or("-")));
            Ok(())
        }
    }

    impl AudioPlayer for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }
        fn play(&self, path: &Path) -> Result<(), SpeechError> {
            assert!(path.exists());
            self.calls.lock().unwrap().push("play".to_string());
            if self.fail_play {
                Err(SpeechError::Failed {
                    program: "recorder".into(),
                    stderr: "device busy".into(),
                })
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn speak_synthesizes_then_plays_and_cleans_up() {
        let rec = Arc::new(Recorder::default());
        let speaker = Speaker::new(rec.clone(), rec.clone(), Some("en-us".into()));
        speaker.speak("apple").unwrap();
        assert_eq!(*rec.calls.lock().unwrap(), vec!["synth:apple:en-us", "play"]);
        let written = rec.written.lock().unwrap();
        assert_eq!(written.len(), 1);
        assert!(!written[0].exists());
    }

    #[test]
    fn failed_synthesis_removes_partial_file() {
        let rec = Arc::new(Recorder {
            fail_synth: true,
            ..Default::default()
        });
        let speaker = Speaker::new(rec.clone(), rec.clone(), None);
        let err = speaker.speak("cat").unwrap_err();
        assert!(err.to_string().contains("unknown voice"));

        let written = rec.written.lock().unwrap();
        assert_eq!(written.len(), 1);
        assert!(!written[0].exists());
        // 再生までは進まない
        assert_eq!(rec.calls.lock().unwrap().len(), 0);
    }

    #[test]
    fn playback_failure_is_reported() {
        let rec = Arc::new(Recorder {
            fail_play: true,
            ..Default::default()
        });
        let speaker = Speaker::new(rec.clone(), rec.clone(), None);
        let err = speaker.speak("dog").unwrap_err();
        assert!(err.to_string().contains("device busy"));
        assert!(rec.written.lock().unwrap().iter().all(|p| !p.exists()));
    }

    #[test]
    fn espeak_and_say_arguments() {
        let espeak = CommandSynthesizer {
            program: "espeak-ng".into(),
            style: SynthStyle::Espeak,
        };
        let out = Path::new("/tmp/out.wav");
        assert_eq!(
            espeak.args("hello", Some("en-us"), out),
            vec!["-v", "en-us", "-w", "/tmp/out.wav", "hello"]
        );
        // 空の声指定は付けない
        assert_eq!(espeak.args("hi", Some(" "), out), vec!["-w", "/tmp/out.wav", "hi"]);

        let say = CommandSynthesizer {
            program: "say".into(),
            style: SynthStyle::Say,
        };
        assert_eq!(say.extension(), "aiff");
        assert_eq!(say.args("hi", None, Path::new("/tmp/o.aiff")), vec!["-o", "/tmp/o.aiff", "hi"]);
    }
}
