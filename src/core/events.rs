// ─── Event Channel ───
// Single typed channel every component sends into. The UI collaborator
// subscribes once to the receiving end.

use serde::Serialize;
use tokio::sync::mpsc;

/// Payload emitted while a batch fetch is in flight.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressPayload {
    pub task: u64,
    pub total: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LauncherEvent {
    /// Free-form diagnostic line (installer output, game stdout/stderr, notes).
    Log { line: String },
    /// Numeric task progress forwarded from batch downloads.
    Progress { task: u64, total: u64 },
    /// The game process has spawned.
    Launched,
    /// The game process ended and the session was cleared.
    Stopped { code: i32 },
}

/// Cloneable sending half handed to every component.
///
/// A disabled sink (no subscriber) swallows events, which keeps unit tests
/// free of channel plumbing.
#[derive(Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<LauncherEvent>>,
}

impl EventSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<LauncherEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn emit(&self, event: LauncherEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }

    pub fn log(&self, line: impl Into<String>) {
        self.emit(LauncherEvent::Log { line: line.into() });
    }

    pub fn progress(&self, task: u64, total: u64) {
        self.emit(LauncherEvent::Progress { task, total });
    }

    pub fn launched(&self) {
        self.emit(LauncherEvent::Launched);
    }

    pub fn stopped(&self, code: i32) {
        self.emit(LauncherEvent::Stopped { code });
    }

    /// Stream a child process pipe into `Log` events, line by line.
    pub fn forward_lines<R>(&self, reader: R)
    where
        R: tokio::io::AsyncRead + Unpin + Send + 'static,
    {
        use tokio::io::AsyncBufReadExt;

        let sink = self.clone();
        tokio::spawn(async move {
            let mut lines = tokio::io::BufReader::new(reader).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                sink.log(line);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn channel_delivers_events_in_order() {
        let (sink, mut rx) = EventSink::channel();
        sink.log("hello");
        sink.progress(1, 10);
        sink.launched();
        sink.stopped(0);

        assert!(matches!(rx.recv().await, Some(LauncherEvent::Log { line }) if line == "hello"));
        assert!(
            matches!(rx.recv().await, Some(LauncherEvent::Progress { task: 1, total: 10 }))
        );
        assert!(matches!(rx.recv().await, Some(LauncherEvent::Launched)));
        assert!(matches!(rx.recv().await, Some(LauncherEvent::Stopped { code: 0 })));
    }

    #[test]
    fn disabled_sink_swallows_events() {
        let sink = EventSink::disabled();
        sink.log("nobody listens");
        sink.stopped(1);
    }
}
