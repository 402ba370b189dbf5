//! # Follow stage: offset-tracked tailing of the configured log files.
//!
//! First stage of the log aggregator's pipeline. Ensures every configured
//! path exists (created empty, parents included), then forwards each
//! complete appended line — tagged with its source — to the transform
//! stage over an in-process stream.
//!
//! ## Architecture
//! ```text
//! notify callback (sync) ──► unbounded mpsc ──► async follow loop
//!                                                   │ per-file offsets
//!                                                   ▼
//!                                        mpsc<SourcedLine> ──► transform
//! ```
//!
//! ## Rules
//! - Reads start at each file's current end: only lines appended after
//!   startup are forwarded.
//! - Truncation (`len < offset`) resets the offset to zero, so rotated or
//!   rewritten files are picked up from their new beginning.
//! - Partial trailing bytes are buffered per file until their newline
//!   arrives; a line is never forwarded in pieces.
//! - Cancelling the stage token stops all reads; dropping the line sender
//!   closes the downstream stream.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// One line read from a followed file, tagged with the file's stem.
#[derive(Clone, Debug)]
pub(crate) struct SourcedLine {
    /// File stem of the originating log file.
    pub(crate) source: Arc<str>,
    /// Line content, newline stripped.
    pub(crate) line: String,
}

/// Per-file tail bookkeeping.
struct TailState {
    path: PathBuf,
    source: Arc<str>,
    offset: u64,
    partial: Vec<u8>,
}

/// Starts the follow stage.
///
/// Creates missing files, arms the filesystem watcher on their parent
/// directories, and spawns the async loop. The returned handle completes
/// once the token is cancelled (or the watcher channel closes).
pub(crate) fn spawn(
    paths: Vec<PathBuf>,
    lines: mpsc::UnboundedSender<SourcedLine>,
    token: CancellationToken,
) -> std::io::Result<JoinHandle<()>> {
    let mut tails = Vec::with_capacity(paths.len());
    for path in &paths {
        tails.push(open_tail(path)?);
    }

    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<notify::Event>();
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<notify::Event>| match res {
            Ok(event) => {
                let _ = event_tx.send(event);
            }
            Err(err) => {
                eprintln!("procvisor: log watch error: {err}");
            }
        },
        notify::Config::default(),
    )
    .map_err(std::io::Error::other)?;

    // Watch parent directories, not the files themselves, so rotation and
    // recreation of a watched path keeps producing events.
    let mut dirs: Vec<PathBuf> = paths.iter().map(|p| parent_dir(p)).collect();
    dirs.sort();
    dirs.dedup();
    for dir in &dirs {
        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(std::io::Error::other)?;
    }

    Ok(tokio::spawn(async move {
        // The watcher must stay alive for the lifetime of the stage.
        let _watcher = watcher;
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                ev = event_rx.recv() => match ev {
                    Some(_) => {
                        for tail in tails.iter_mut() {
                            poll_tail(tail, &lines).await;
                        }
                    }
                    None => break,
                },
            }
        }
    }))
}

/// Parent directory of a watched path; a bare file name maps to `.`.
fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Ensures the file exists and records its current length as the starting
/// offset.
fn open_tail(path: &Path) -> std::io::Result<TailState> {
    std::fs::create_dir_all(parent_dir(path))?;
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    let offset = file.metadata()?.len();

    let source: Arc<str> = Arc::from(
        path.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned())
            .as_str(),
    );

    Ok(TailState {
        path: path.to_path_buf(),
        source,
        offset,
        partial: Vec::new(),
    })
}

/// Reads newly appended bytes for one file and forwards complete lines.
///
/// A file that momentarily disappears (rotation in progress) is skipped
/// until it reappears; a file shorter than the stored offset was
/// truncated and is re-read from the start.
async fn poll_tail(tail: &mut TailState, lines: &mpsc::UnboundedSender<SourcedLine>) {
    let len = match fs::metadata(&tail.path).await {
        Ok(meta) => meta.len(),
        Err(_) => return,
    };
    if len < tail.offset {
        tail.offset = 0;
        tail.partial.clear();
    }
    if len == tail.offset {
        return;
    }

    let mut file = match fs::File::open(&tail.path).await {
        Ok(f) => f,
        Err(_) => return,
    };
    if file.seek(SeekFrom::Start(tail.offset)).await.is_err() {
        return;
    }

    let mut buf = Vec::with_capacity((len - tail.offset) as usize);
    let mut taker = file.take(len - tail.offset);
    let read = match taker.read_to_end(&mut buf).await {
        Ok(n) => n,
        Err(_) => return,
    };
    tail.offset += read as u64;
    tail.partial.extend_from_slice(&buf);

    while let Some(pos) = tail.partial.iter().position(|b| *b == b'\n') {
        let raw: Vec<u8> = tail.partial.drain(..=pos).collect();
        let mut text = String::from_utf8_lossy(&raw[..raw.len() - 1]).into_owned();
        if text.ends_with('\r') {
            text.pop();
        }
        let _ = lines.send(SourcedLine {
            source: Arc::clone(&tail.source),
            line: text,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;
    use tokio::time::{sleep, timeout};

    const WAIT: Duration = Duration::from_secs(5);

    fn append(path: &Path, text: &str) {
        let mut f = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .expect("open for append");
        write!(f, "{text}").expect("append");
    }

    #[tokio::test]
    async fn test_missing_path_is_created_and_followed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("app.log");
        let (tx, mut rx) = mpsc::unbounded_channel();
        let token = CancellationToken::new();

        let handle = spawn(vec![path.clone()], tx, token.clone()).expect("follow stage");
        assert!(path.exists(), "path created empty at startup");

        // Let the watcher arm before producing.
        sleep(Duration::from_millis(100)).await;
        append(&path, "hello\n");

        let line = timeout(WAIT, rx.recv()).await.expect("line within bound");
        let line = line.expect("stream open");
        assert_eq!(line.line, "hello");
        assert_eq!(&*line.source, "app");

        token.cancel();
        let _ = handle.await;
    }

    #[tokio::test]
    async fn test_partial_lines_wait_for_their_newline() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("web.log");
        let (tx, mut rx) = mpsc::unbounded_channel();
        let token = CancellationToken::new();

        let handle = spawn(vec![path.clone()], tx, token.clone()).expect("follow stage");
        sleep(Duration::from_millis(100)).await;

        append(&path, "first ha");
        append(&path, "lf\nsecond\n");

        let a = timeout(WAIT, rx.recv()).await.expect("line").expect("open");
        assert_eq!(a.line, "first half");
        let b = timeout(WAIT, rx.recv()).await.expect("line").expect("open");
        assert_eq!(b.line, "second");

        token.cancel();
        let _ = handle.await;
    }

    #[tokio::test]
    async fn test_truncation_resets_the_offset() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("api.log");
        let (tx, mut rx) = mpsc::unbounded_channel();
        let token = CancellationToken::new();

        let handle = spawn(vec![path.clone()], tx, token.clone()).expect("follow stage");
        sleep(Duration::from_millis(100)).await;

        append(&path, "before rotation\n");
        let first = timeout(WAIT, rx.recv()).await.expect("line").expect("open");
        assert_eq!(first.line, "before rotation");

        // Truncate in place, as logrotate's copytruncate would.
        std::fs::File::create(&path).expect("truncate");
        append(&path, "fresh\n");

        let fresh = timeout(WAIT, rx.recv()).await.expect("line").expect("open");
        assert_eq!(fresh.line, "fresh");

        token.cancel();
        let _ = handle.await;
    }

    #[tokio::test]
    async fn test_cancellation_closes_the_line_stream() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("quiet.log");
        let (tx, mut rx) = mpsc::unbounded_channel();
        let token = CancellationToken::new();

        let handle = spawn(vec![path], tx, token.clone()).expect("follow stage");
        token.cancel();
        let _ = handle.await;

        // Sender dropped with the stage: the stream ends.
        assert!(timeout(WAIT, rx.recv()).await.expect("closed").is_none());
    }
}
