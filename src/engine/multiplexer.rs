//! Stream multiplexer
//!
//! Drains a child's stdout and stderr concurrently. Each pipe gets its own reader task, so neither stream can stall
//! the other no matter which one the child fills first. Readers send chunks over one unbounded channel to the
//! collector in [`StreamMultiplexer::drain`], which appends each chunk to its stream's accumulator before handing a
//! copy to the observer.
//!
//! ## Guarantees
//!
//! - Each accumulator holds exactly the bytes written to that stream, in write order.
//! - Ordering *between* the two streams is arrival order at the collector and carries no guarantee.
//! - Readers never wait on the observer: the channel is unbounded, so a slow observer only delays the collector.

use std::future::Future;

use testmaster_core::StreamKind;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const CHUNK_SIZE: usize = 8 * 1024;

struct Chunk {
    stream: StreamKind,
    bytes: Vec<u8>,
}

/// Everything captured from both streams.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Captured {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// `false` when draining was cut off before both streams reached end-of-stream
    pub complete: bool,
}

impl Captured {
    fn push(&mut self, chunk: &Chunk) {
        match chunk.stream {
            StreamKind::Stdout => self.stdout.extend_from_slice(&chunk.bytes),
            StreamKind::Stderr => self.stderr.extend_from_slice(&chunk.bytes),
        }
    }
}

/// Concurrent reader for the output streams of one process.
pub struct StreamMultiplexer {
    tx: Option<mpsc::UnboundedSender<Chunk>>,
    rx: mpsc::UnboundedReceiver<Chunk>,
    readers: Vec<JoinHandle<()>>,
}

impl Default for StreamMultiplexer {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamMultiplexer {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx: Some(tx),
            rx,
            readers: Vec::new(),
        }
    }

    /// Start draining `reader` as `stream` on its own task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn attach<R>(&mut self, stream: StreamKind, reader: R)
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        if let Some(tx) = &self.tx {
            self.readers.push(tokio::spawn(read_stream(stream, reader, tx.clone())));
        }
    }

    /// Collect both streams to end-of-stream with no observer and no cutoff.
    pub async fn collect(self) -> Captured {
        self.drain(std::future::pending(), |_, _| {}).await
    }

    /// Collect chunks until every attached stream reaches end-of-stream or `cutoff` resolves.
    ///
    /// ## Parameters
    /// - `cutoff`: resolves when the collector should stop waiting for end-of-stream. The executor uses "child exited
    ///   plus a grace period" so a grandchild holding a pipe open cannot hang the suite.
    /// - `observe`: called with every chunk after it has been appended to its accumulator.
    ///
    /// ## Returns
    /// - (`Captured`): both accumulations. `complete` is `false` if `cutoff` fired first; chunks already queued at
    ///   that point are still included.
    pub async fn drain<C, F>(mut self, cutoff: C, mut observe: F) -> Captured
    where
        C: Future<Output = ()>,
        F: FnMut(StreamKind, &[u8]),
    {
        // Only reader tasks may keep the channel open from here on.
        self.tx = None;

        let mut captured = Captured {
            complete: true,
            ..Captured::default()
        };
        tokio::pin!(cutoff);

        loop {
            // The cutoff is polled first: a stream that never goes idle must not starve it.
            tokio::select! {
                biased;
                () = &mut cutoff => {
                    tracing::warn!("output streams still open after process exit; abandoning readers");
                    captured.complete = false;
                    break;
                }
                chunk = self.rx.recv() => match chunk {
                    Some(chunk) => {
                        captured.push(&chunk);
                        observe(chunk.stream, &chunk.bytes);
                    }
                    None => break,
                },
            }
        }

        // Stop the readers before taking leftovers so the queue is finite.
        for reader in self.readers.drain(..) {
            reader.abort();
            let _ = reader.await;
        }
        while let Ok(chunk) = self.rx.try_recv() {
            captured.push(&chunk);
            observe(chunk.stream, &chunk.bytes);
        }
        captured
    }
}

async fn read_stream<R>(stream: StreamKind, mut reader: R, tx: mpsc::UnboundedSender<Chunk>)
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                tracing::trace!(%stream, bytes = n, "chunk");
                let chunk = Chunk {
                    stream,
                    bytes: buf[..n].to_vec(),
                };
                if tx.send(chunk).is_err() {
                    break;
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                tracing::warn!(%stream, error = %e, "read failed; closing stream");
                break;
            }
        }
    }
}
