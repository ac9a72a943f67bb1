//! Decoder for the runtime's multiplexed stream framing
//!
//! Non-TTY log and attach streams interleave stdout and stderr as frames:
//!
//! ```text
//! [stream: u8][0u8; 3][length: u32 big-endian][payload; length]
//! ```
//!
//! [`Demuxer`] strips the headers and yields the concatenated payloads. A
//! stream whose first bytes do not look like a header (TTY sessions are not
//! framed) is passed through untouched.

use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use tokio::io::{AsyncRead, ReadBuf};

pub const HEADER_LEN: usize = 8;

const SCRATCH_LEN: usize = 8 * 1024;

/// Which output a frame belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdin,
    Stdout,
    Stderr,
}

/// Parse a frame header into its stream kind and payload length
pub fn parse_header(header: &[u8; HEADER_LEN]) -> Option<(StreamKind, usize)> {
    let kind = match header[0] {
        0 => StreamKind::Stdin,
        1 => StreamKind::Stdout,
        2 => StreamKind::Stderr,
        _ => return None,
    };
    if header[1..4] != [0, 0, 0] {
        return None;
    }
    let len = u32::from_be_bytes([header[4], header[5], header[6], header[7]]);
    Some((kind, len as usize))
}

/// AsyncRead adapter that removes frame headers from an inner reader
pub struct Demuxer<R> {
    inner: R,
    header: [u8; HEADER_LEN],
    header_filled: usize,
    remaining: usize,
    passthrough: bool,
    replay: Vec<u8>,
    replay_pos: usize,
    scratch: Vec<u8>,
    last_kind: Option<StreamKind>,
}

impl<R> Demuxer<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            header: [0; HEADER_LEN],
            header_filled: 0,
            remaining: 0,
            passthrough: false,
            replay: Vec::new(),
            replay_pos: 0,
            scratch: Vec::new(),
            last_kind: None,
        }
    }

    /// Stream of the most recent frame, `None` before the first header or
    /// when the input turned out not to be framed
    pub fn last_kind(&self) -> Option<StreamKind> {
        self.last_kind
    }

    fn fall_back_to_passthrough(&mut self) {
        self.passthrough = true;
        self.replay = self.header[..self.header_filled].to_vec();
        self.replay_pos = 0;
        self.header_filled = 0;
        self.last_kind = None;
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for Demuxer<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if buf.remaining() == 0 {
            return Poll::Ready(Ok(()));
        }

        loop {
            if this.replay_pos < this.replay.len() {
                let pending = &this.replay[this.replay_pos..];
                let n = pending.len().min(buf.remaining());
                buf.put_slice(&pending[..n]);
                this.replay_pos += n;
                return Poll::Ready(Ok(()));
            }

            if this.passthrough {
                return Pin::new(&mut this.inner).poll_read(cx, buf);
            }

            if this.remaining > 0 {
                let want = this.remaining.min(buf.remaining()).min(SCRATCH_LEN);
                this.scratch.resize(want, 0);
                let mut chunk = ReadBuf::new(&mut this.scratch);
                ready!(Pin::new(&mut this.inner).poll_read(cx, &mut chunk))?;
                let got = chunk.filled().len();
                if got == 0 {
                    // truncated frame; surface what we have as end of stream
                    this.remaining = 0;
                    return Poll::Ready(Ok(()));
                }
                buf.put_slice(chunk.filled());
                this.remaining -= got;
                return Poll::Ready(Ok(()));
            }

            let mut header = ReadBuf::new(&mut this.header[this.header_filled..]);
            ready!(Pin::new(&mut this.inner).poll_read(cx, &mut header))?;
            let got = header.filled().len();
            if got == 0 {
                if this.header_filled == 0 {
                    return Poll::Ready(Ok(()));
                }
                this.fall_back_to_passthrough();
                continue;
            }
            this.header_filled += got;
            if this.header_filled < HEADER_LEN {
                continue;
            }

            match parse_header(&this.header) {
                Some((kind, len)) => {
                    this.last_kind = Some(kind);
                    this.remaining = len;
                    this.header_filled = 0;
                }
                None => {
                    tracing::trace!("stream is not multiplexed, passing bytes through");
                    this.fall_back_to_passthrough();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    fn frame(kind: u8, payload: &[u8]) -> Vec<u8> {
        let mut out = vec![kind, 0, 0, 0];
        out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn test_parse_header() {
        let header = [2, 0, 0, 0, 0, 0, 1, 0];
        assert_eq!(parse_header(&header), Some((StreamKind::Stderr, 256)));
        assert_eq!(parse_header(&[b'h', b'e', b'l', b'l', b'o', 0, 0, 0]), None);
        assert_eq!(parse_header(&[1, 0, 1, 0, 0, 0, 0, 0]), None);
    }

    #[tokio::test]
    async fn test_strips_headers() {
        let mut input = frame(1, b"hello ");
        input.extend(frame(2, b"world\n"));
        input.extend(frame(1, b""));
        input.extend(frame(1, b"done\n"));

        let mut demux = Demuxer::new(std::io::Cursor::new(input));
        let mut out = String::new();
        demux.read_to_string(&mut out).await.unwrap();
        assert_eq!(out, "hello world\ndone\n");
        assert_eq!(demux.last_kind(), Some(StreamKind::Stdout));
    }

    #[tokio::test]
    async fn test_frames_split_across_reads() {
        let mut input = frame(1, b"split payload\n");
        input.extend(frame(2, b"second\n"));

        // deliver the bytes three at a time so headers straddle reads
        let (mut tx, rx) = tokio::io::duplex(3);
        let writer = tokio::spawn(async move {
            use tokio::io::AsyncWriteExt;
            for chunk in input.chunks(3) {
                tx.write_all(chunk).await.unwrap();
            }
        });

        let mut demux = Demuxer::new(rx);
        let mut out = String::new();
        demux.read_to_string(&mut out).await.unwrap();
        writer.await.unwrap();
        assert_eq!(out, "split payload\nsecond\n");
    }

    #[tokio::test]
    async fn test_unframed_passthrough() {
        let input = b"plain tty output\r\nnext line\n".to_vec();
        let mut demux = Demuxer::new(std::io::Cursor::new(input.clone()));
        let mut out = Vec::new();
        demux.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, input);
        assert_eq!(demux.last_kind(), None);
    }

    #[tokio::test]
    async fn test_short_unframed_input() {
        let mut demux = Demuxer::new(std::io::Cursor::new(b"hi\n".to_vec()));
        let mut out = String::new();
        demux.read_to_string(&mut out).await.unwrap();
        assert_eq!(out, "hi\n");
    }
}
