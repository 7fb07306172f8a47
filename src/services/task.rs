// ============================================
// src/services/task.rs
// UIを止めないための裏スレッド実行
// ============================================

use std::fmt::Display;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

/// 裏の処理の状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Idle,
    Running,
    Done,
    Failed,
}

/// 1つずつしか走らない裏スレッドの処理。毎フレーム `poll` で結果を拾う
///
/// 取り消しはできない。画面を離れて `BackgroundTask` を捨てると、
/// スレッドは最後まで走り、結果は捨てられる。
pub struct BackgroundTask<T> {
    status: TaskStatus,
    rx: Option<Receiver<Result<T, String>>>,
}

impl<T: Send + 'static> BackgroundTask<T> {
    pub fn new() -> Self {
        Self {
            status: TaskStatus::Idle,
            rx: None,
        }
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == TaskStatus::Running
    }

    /// 処理を開始する。走っている間は何もせず `false` を返す
    pub fn spawn<F, E>(&mut self, job: F) -> bool
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        E: Display,
    {
        if self.is_running() {
            return false;
        }
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let result = job().map_err(|e| e.to_string());
            // 受け手が居なくなっていたら捨てる
            let _ = tx.send(result);
        });
        self.rx = Some(rx);
        self.status = TaskStatus::Running;
        true
    }

    /// 終わっていれば結果を1回だけ返す
    pub fn poll(&mut self) -> Option<Result<T, String>> {
        let rx = self.rx.as_ref()?;
        let result = match rx.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => Err("処理が途中で終了しました".to_string()),
        };
        self.rx = None;
        self.status = if result.is_ok() {
            TaskStatus::Done
        } else {
            TaskStatus::Failed
        };
        Some(result)
    }
}

impl<T: Send + 'static> Default for BackgroundTask<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::channel;
    use std::time::{Duration, Instant};

    fn wait<T: Send + 'static>(task: &mut BackgroundTask<T>) -> Result<T, String> {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(result) = task.poll() {
                return result;
            }
            assert!(Instant::now() < deadline, "task did not finish");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn runs_to_done() {
        let mut task = BackgroundTask::new();
        assert_eq!(task.status(), TaskStatus::Idle);
        assert!(task.poll().is_none());

        assert!(task.spawn(|| Ok::<_, String>(21 * 2)));
        assert_eq!(wait(&mut task), Ok(42));
        assert_eq!(task.status(), TaskStatus::Done);
        // 結果は1回だけ
        assert!(task.poll().is_none());
    }

    #[test]
    fn failure_carries_message() {
        let mut task: BackgroundTask<()> = BackgroundTask::new();
        task.spawn(|| Err("espeak が見つかりません"));
        assert_eq!(wait(&mut task), Err("espeak が見つかりません".to_string()));
        assert_eq!(task.status(), TaskStatus::Failed);
    }

    #[test]
    fn busy_task_rejects_second_job() {
        let (release_tx, release_rx) = channel::<()>();
        let mut task = BackgroundTask::new();
        assert!(task.spawn(move || {
            let _ = release_rx.recv();
            Ok::<_, String>("first")
        }));
        assert!(task.is_running());
        assert!(!task.spawn(|| Ok::<_, String>("second")));

        release_tx.send(()).unwrap();
        assert_eq!(wait(&mut task), Ok("first"));
        assert!(task.spawn(|| Ok::<_, String>("third")));
        assert_eq!(wait(&mut task), Ok("third"));
    }
}
