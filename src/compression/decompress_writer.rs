//! `Write` adapter that decompresses the bytes written to it.
//!
//! The stream parser pulls its input, so it runs on a thread of its own. Written chunks go to
//! it over a bounded channel and decoded batches come back over a second one. Decoded data is
//! passed to the inner writer whenever the caller writes, flushes or finishes.

use std::io::{self, Read, Write};
use std::sync::mpsc::{self, Receiver, Sender, SyncSender};
use std::thread::{self, JoinHandle};

use log::debug;

use super::decompress::{log_bad_input, StreamDecoder};
use crate::error::Result;

/// Written chunks that may wait for the decoding thread before `write` blocks.
const QUEUE_DEPTH: usize = 16;

/// The input side of the decoding thread. Input ends when the sending side is dropped.
struct ChunkReader {
    rx: Receiver<Vec<u8>>,
    chunk: Vec<u8>,
    cursor: usize,
}

impl Read for ChunkReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.cursor == self.chunk.len() {
            match self.rx.recv() {
                Ok(chunk) => {
                    self.chunk = chunk;
                    self.cursor = 0;
                }
                Err(_) => return Ok(0),
            }
        }
        let n = buf.len().min(self.chunk.len() - self.cursor);
        buf[..n].copy_from_slice(&self.chunk[self.cursor..self.cursor + n]);
        self.cursor += n;
        Ok(n)
    }
}

/// Decode until the input ends or goes bad. The first error is the last message sent.
fn decode_chunks(mut decoder: StreamDecoder<ChunkReader>, tx: Sender<Result<Vec<u8>>>) {
    loop {
        let mut data = Vec::new();
        match decoder.fill(&mut data) {
            Ok(true) => {
                if tx.send(Ok(data)).is_err() {
                    return;
                }
            }
            Ok(false) => {
                debug!("Decoding thread done after {} blocks", decoder.blocks_read());
                return;
            }
            Err(e) => {
                let _ = tx.send(Err(e));
                return;
            }
        }
    }
}

/// Takes compressed bytes through `Write` and writes the decompressed data to the inner
/// writer. Concatenated streams are accepted; anything else after the last stream is an error.
///
/// Call [`finish`](BzDecompressWriter::finish) to check that the input was complete and get
/// the writer back. Dropping an unfinished decoder finishes it too, but any error is lost.
pub struct BzDecompressWriter<W: Write> {
    inner: Option<W>,
    /// None once the input has been closed.
    input: Option<SyncSender<Vec<u8>>>,
    output: Receiver<Result<Vec<u8>>>,
    worker: Option<JoinHandle<()>>,
    total_in: u64,
    total_out: u64,
}

impl<W: Write> BzDecompressWriter<W> {
    /// Create a decoder writing to `writer` that uses one worker per core.
    pub fn new(writer: W) -> Result<Self> {
        Self::with_workers(writer, rayon::current_num_threads())
    }

    /// Create a decoder that decodes up to `workers` blocks at a time.
    pub fn with_workers(writer: W, workers: usize) -> Result<Self> {
        let (input, rx) = mpsc::sync_channel(QUEUE_DEPTH);
        let (tx, output) = mpsc::channel();
        let reader = ChunkReader {
            rx,
            chunk: Vec::new(),
            cursor: 0,
        };
        let decoder = StreamDecoder::new(reader, workers, true)?;
        let worker = thread::Builder::new()
            .name("bzip2-decoder".to_string())
            .spawn(move || decode_chunks(decoder, tx))?;
        Ok(Self {
            inner: Some(writer),
            input: Some(input),
            output,
            worker: Some(worker),
            total_in: 0,
            total_out: 0,
        })
    }

    /// Compressed bytes accepted so far.
    pub fn total_in(&self) -> u64 {
        self.total_in
    }

    /// Decompressed bytes handed to the inner writer so far.
    pub fn total_out(&self) -> u64 {
        self.total_out
    }

    fn write_chunk(&mut self, buf: &[u8]) -> Result<()> {
        let input = self
            .input
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "decoder already finished"))?;
        if input.send(buf.to_vec()).is_err() {
            // The decoding thread has stopped, so its error is waiting.
            self.input = None;
            self.drain(true)?;
            return Err(io::Error::new(io::ErrorKind::Other, "decoding thread stopped").into());
        }
        self.total_in += buf.len() as u64;
        self.drain(false)
    }

    /// Write out decoded batches. With `wait`, keep going until the decoding thread is done.
    fn drain(&mut self, wait: bool) -> Result<()> {
        loop {
            let next = if wait {
                self.output.recv().ok()
            } else {
                self.output.try_recv().ok()
            };
            let Some(data) = next else {
                return Ok(());
            };
            let data = data?;
            if let Some(inner) = self.inner.as_mut() {
                inner.write_all(&data)?;
                self.total_out += data.len() as u64;
            }
        }
    }

    /// Close the input, write out the rest of the data and check how the stream ended.
    fn finish_stream(&mut self) -> Result<()> {
        self.input = None;
        self.drain(true)?;
        if let Some(worker) = self.worker.take() {
            worker
                .join()
                .map_err(|_| io::Error::new(io::ErrorKind::Other, "decoding thread panicked"))?;
        }
        if let Some(inner) = self.inner.as_mut() {
            inner.flush()?;
        }
        Ok(())
    }

    /// Check that the input ended with a complete stream and return the inner writer.
    pub fn finish(mut self) -> Result<W> {
        let result = self.finish_stream();
        let inner = self.inner.take();
        if let Err(e) = result {
            log_bad_input(&e);
            return Err(e);
        }
        inner.ok_or_else(|| {
            io::Error::new(io::ErrorKind::Other, "decoder already finished").into()
        })
    }
}

impl<W: Write> Write for BzDecompressWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_chunk(buf).map_err(|e| {
            log_bad_input(&e);
            io::Error::from(e)
        })?;
        Ok(buf.len())
    }

    /// Writes out whatever has been decoded so far. Blocks still being decoded follow on
    /// the next write or at `finish`.
    fn flush(&mut self) -> io::Result<()> {
        self.drain(false).map_err(io::Error::from)?;
        match self.inner.as_mut() {
            Some(inner) => inner.flush(),
            None => Ok(()),
        }
    }
}

impl<W: Write> Drop for BzDecompressWriter<W> {
    fn drop(&mut self) {
        if self.inner.is_some() {
            if let Err(e) = self.finish_stream() {
                log_bad_input(&e);
            }
        }
    }
}
