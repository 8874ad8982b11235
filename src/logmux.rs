//! 日志多路复用
//!
//! Merges both children's output into one stream. Each complete line is
//! prefixed with its source tag; the shared sink is locked per whole line so
//! concurrent sources can interleave lines but never splice one.

use std::io;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

/// Shared line sink. Multiple forwarding tasks write through the same lock.
pub type LogSink = Arc<Mutex<dyn AsyncWrite + Send + Unpin>>;

pub fn stdout_sink() -> LogSink {
    Arc::new(Mutex::new(tokio::io::stdout()))
}

/// Assembles tagged lines out of raw child output. Partial lines are carried
/// across reads; a line is only emitted once its terminator is seen.
pub struct LineTagger {
    tag: String,
    carry: String,
}

impl LineTagger {
    pub fn new(name: &str) -> Self {
        Self {
            tag: format!("[{name}] "),
            carry: String::new(),
        }
    }

    /// Feed one chunk of output; returns the complete lines it closed, each
    /// already tagged and newline-terminated.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for ch in String::from_utf8_lossy(chunk).chars() {
            if ch == '\n' {
                // CRLF terminators lose the CR
                if self.carry.ends_with('\r') {
                    self.carry.pop();
                }
                lines.push(self.render_line());
            } else {
                self.carry.push(ch);
            }
        }
        lines
    }

    /// Stream closed: whatever is still buffered becomes a final line.
    pub fn finish(mut self) -> Option<String> {
        if self.carry.is_empty() {
            None
        } else {
            Some(self.render_line())
        }
    }

    fn render_line(&mut self) -> String {
        let mut line = String::with_capacity(self.tag.len() + self.carry.len() + 1);
        line.push_str(&self.tag);
        line.push_str(&self.carry);
        line.push('\n');
        self.carry.clear();
        line
    }
}

/// Copy one child stream into the shared sink, line by line, until EOF.
/// EOF ends the attachment silently; the liveness probe, not stream closure,
/// decides that a process has exited.
pub async fn forward<R>(name: &str, mut reader: R, sink: LogSink) -> io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut tagger = LineTagger::new(name);
    let mut buffer = [0u8; 8192];
    loop {
        let read = reader.read(&mut buffer).await?;
        if read == 0 {
            break;
        }
        for line in tagger.feed(&buffer[..read]) {
            write_line(&sink, &line).await?;
        }
    }
    if let Some(line) = tagger.finish() {
        write_line(&sink, &line).await?;
    }
    Ok(())
}

async fn write_line(sink: &LogSink, line: &str) -> io::Result<()> {
    let mut guard = sink.lock().await;
    guard.write_all(line.as_bytes()).await?;
    guard.flush().await
}
