// ─── Process Spawning ───
// Spawns the game with both pipes captured. Each pipe gets a reader task
// that forwards lines to the event channel and runs them through the
// failure-signature scan.

use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tracing::debug;

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::events::EventSink;

use super::signatures::SignatureFlags;

pub struct SpawnedChild {
    pub child: Child,
    pub signatures: Arc<SignatureFlags>,
}

pub fn spawn_game(
    java_bin: &Path,
    args: &[String],
    working_dir: &Path,
    events: &EventSink,
) -> LauncherResult<SpawnedChild> {
    std::fs::create_dir_all(working_dir).map_err(|e| LauncherError::Io {
        path: working_dir.to_path_buf(),
        source: e,
    })?;

    debug!("Spawning {:?} with {} argument(s)", java_bin, args.len());
    let mut child = Command::new(java_bin)
        .args(args)
        .current_dir(working_dir)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| LauncherError::ProcessSpawnFailed(e.to_string()))?;

    let signatures = Arc::new(SignatureFlags::default());
    if let Some(out) = child.stdout.take() {
        forward_and_scan(out, events.clone(), Arc::clone(&signatures));
    }
    if let Some(err) = child.stderr.take() {
        forward_and_scan(err, events.clone(), Arc::clone(&signatures));
    }

    Ok(SpawnedChild { child, signatures })
}

fn forward_and_scan<R>(reader: R, events: EventSink, signatures: Arc<SignatureFlags>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            signatures.scan(&line);
            events.log(line);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::events::LauncherEvent;

    #[cfg(unix)]
    #[tokio::test]
    async fn output_is_forwarded_and_scanned() {
        let dir = tempfile::tempdir().unwrap();
        let (events, mut rx) = EventSink::channel();

        let args: Vec<String> = vec![
            "-c".into(),
            "echo hello; echo 'Error: Could not find or load main class KnotClient' 1>&2".into(),
        ];
        let mut spawned =
            spawn_game(Path::new("/bin/sh"), &args, dir.path(), &events).unwrap();
        let status = spawned.child.wait().await.unwrap();
        assert!(status.success());

        // Reader tasks drain the pipes after exit; wait for both lines.
        let mut seen = Vec::new();
        while seen.len() < 2 {
            match rx.recv().await {
                Some(LauncherEvent::Log { line }) => seen.push(line),
                Some(_) => {}
                None => break,
            }
        }
        assert!(seen.iter().any(|l| l == "hello"));
        assert!(spawned.signatures.any());
    }

    #[tokio::test]
    async fn missing_binary_reports_spawn_failure() {
        let dir = tempfile::tempdir().unwrap();
        let result = spawn_game(
            &dir.path().join("no-such-java"),
            &[],
            dir.path(),
            &EventSink::disabled(),
        );
        assert!(matches!(result, Err(LauncherError::ProcessSpawnFailed(_))));
    }
}
