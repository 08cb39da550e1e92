//! Server-sent event decoding and the two-channel delivery pipeline.
//!
//! Every streaming call produces a [`ChatStream`]: a bounded queue of text
//! fragments plus a queue that carries at most one error. A single background
//! task owns both senders. When it finishes, for any reason, both senders are
//! dropped together, so "both channels closed and the error queue empty" is
//! the success signal.

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::LLMError;
use crate::http::HttpBodyStream;
use crate::types::{ProviderKind, StreamChunk};

/// Capacity of the fragment queue. A caller that stops draining blocks the producer.
pub const CHUNK_CHANNEL_CAPACITY: usize = 16;

/// Standardized SSE event yielded by [`StreamDecoder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Raw `data:` payload emitted by the provider.
    Data(String),
    /// Terminal marker reported via `[DONE]`.
    Done,
}

/// Normalizes provider SSE feeds into [`StreamEvent`] values.
///
/// Frames are blank-line terminated; multi-line `data:` fields are joined with
/// `\n`. Comment lines and other fields are ignored. Frames that are not valid
/// UTF-8 are dropped instead of failing the stream.
pub struct StreamDecoder {
    body: HttpBodyStream,
    buffer: Vec<u8>,
    data_lines: Vec<Vec<u8>>,
    pending: VecDeque<Result<StreamEvent, LLMError>>,
    provider: ProviderKind,
    stream_closed: bool,
    done_received: bool,
}

impl StreamDecoder {
    /// Wraps a raw HTTP body stream and prepares it for SSE decoding.
    pub fn new(body: HttpBodyStream, provider: ProviderKind) -> Self {
        Self {
            body,
            buffer: Vec::new(),
            data_lines: Vec::new(),
            pending: VecDeque::new(),
            provider,
            stream_closed: false,
            done_received: false,
        }
    }

    fn handle_line(&mut self, line: Vec<u8>) {
        if let Some(rest) = line.strip_prefix(b"data:") {
            let data = rest.strip_prefix(b" ").unwrap_or(rest);
            self.data_lines.push(data.to_vec());
        }
    }

    fn flush_event(&mut self) {
        if self.data_lines.is_empty() {
            return;
        }

        let joined = self.data_lines.drain(..).collect::<Vec<_>>().join(&b'\n');
        if joined.is_empty() {
            return;
        }

        let data = match String::from_utf8(joined) {
            Ok(data) => data,
            Err(err) => {
                tracing::debug!(provider = %self.provider, error = %err, "skipping non UTF-8 frame");
                return;
            }
        };

        if data.trim() == "[DONE]" {
            if !self.done_received {
                self.done_received = true;
                self.pending.push_back(Ok(StreamEvent::Done));
            }
        } else {
            self.pending.push_back(Ok(StreamEvent::Data(data)));
        }
    }

    fn drain_line(buffer: &mut Vec<u8>) -> Option<Vec<u8>> {
        buffer.iter().position(|b| *b == b'\n').map(|pos| {
            let mut line: Vec<u8> = buffer.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            line
        })
    }
}

impl Stream for StreamDecoder {
    type Item = Result<StreamEvent, LLMError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if let Some(event) = this.pending.pop_front() {
            return Poll::Ready(Some(event));
        }

        if this.done_received {
            return Poll::Ready(None);
        }

        loop {
            if this.stream_closed {
                if !this.buffer.is_empty() {
                    let line = std::mem::take(&mut this.buffer);
                    this.handle_line(line);
                }
                this.flush_event();
                return Poll::Ready(this.pending.pop_front());
            }

            match this.body.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    this.buffer.extend_from_slice(&bytes);
                    while let Some(line) = Self::drain_line(&mut this.buffer) {
                        if line.is_empty() {
                            this.flush_event();
                        } else {
                            this.handle_line(line);
                        }
                    }
                    if let Some(event) = this.pending.pop_front() {
                        return Poll::Ready(Some(event));
                    }
                }
                Poll::Ready(Some(Err(err))) => return Poll::Ready(Some(Err(err))),
                Poll::Ready(None) => this.stream_closed = true,
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Result of decoding one frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Decoded {
    /// Text delta carried by the frame; empty for bookkeeping frames.
    pub text: String,
    /// Whether the vendor signalled completion.
    pub terminal: bool,
}

impl Decoded {
    /// A frame with nothing to forward.
    pub fn skip() -> Self {
        Self::default()
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            terminal: false,
        }
    }

    pub fn terminal() -> Self {
        Self {
            text: String::new(),
            terminal: true,
        }
    }
}

/// Vendor-specific frame decoder.
///
/// Implementations must return [`Decoded::skip`] for frames that are not valid
/// JSON, and reserve errors for vendor-reported failures that end the stream.
pub type DecodeFn = fn(&str) -> Result<Decoded, LLMError>;

/// Receiving half of a streaming chat call.
///
/// `chunks` yields fragments in emission order and closes when the stream ends.
/// `errors` yields at most one error and closes at the same time. Text received
/// before an error remains valid output.
#[derive(Debug)]
pub struct ChatStream {
    pub chunks: mpsc::Receiver<StreamChunk>,
    pub errors: mpsc::Receiver<LLMError>,
}

/// Sending half owned by the background task.
#[derive(Debug)]
pub(crate) struct StreamSender {
    pub(crate) chunks: mpsc::Sender<StreamChunk>,
    pub(crate) errors: mpsc::Sender<LLMError>,
}

impl StreamSender {
    /// Publishes the task outcome and closes both channels.
    pub(crate) async fn finish(self, result: Result<(), LLMError>) {
        let StreamSender { chunks, errors } = self;
        drop(chunks);
        if let Err(err) = result {
            // The caller may have dropped the receiver; nothing left to notify.
            let _ = errors.send(err).await;
        }
    }
}

impl ChatStream {
    /// Creates a connected sender/receiver pair.
    pub(crate) fn channel() -> (StreamSender, ChatStream) {
        let (chunk_tx, chunk_rx) = mpsc::channel(CHUNK_CHANNEL_CAPACITY);
        let (error_tx, error_rx) = mpsc::channel(1);
        (
            StreamSender {
                chunks: chunk_tx,
                errors: error_tx,
            },
            ChatStream {
                chunks: chunk_rx,
                errors: error_rx,
            },
        )
    }

    /// A stream that fails immediately, used when the request cannot be built.
    pub(crate) fn failed(err: LLMError) -> ChatStream {
        let (sender, stream) = ChatStream::channel();
        drop(sender.chunks);
        // Capacity is one and nothing else has sent yet.
        let _ = sender.errors.try_send(err);
        stream
    }

    /// Drains both channels, concatenating every fragment.
    ///
    /// # Errors
    ///
    /// Returns the stream's error, if any. Text received before it is discarded
    /// by this helper; read `chunks` directly to keep partial output.
    pub async fn collect_text(mut self) -> Result<String, LLMError> {
        let mut text = String::new();
        while let Some(chunk) = self.chunks.recv().await {
            text.push_str(&chunk.content);
        }
        match self.errors.recv().await {
            Some(err) => Err(err),
            None => Ok(text),
        }
    }
}

/// Reads frames from `body` and forwards decoded text into `chunks`.
///
/// Stops at the first terminal frame, `[DONE]` marker, end of body, decode
/// error or cancellation. A closed receiver ends the loop quietly.
pub(crate) async fn forward_frames(
    body: HttpBodyStream,
    provider: ProviderKind,
    decode: DecodeFn,
    chunks: &mpsc::Sender<StreamChunk>,
    cancel: &CancellationToken,
) -> Result<(), LLMError> {
    let mut decoder = StreamDecoder::new(body, provider);

    loop {
        let event = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(LLMError::Cancelled),
            event = decoder.next() => event,
        };

        let data = match event {
            None | Some(Ok(StreamEvent::Done)) => return Ok(()),
            Some(Err(err)) => return Err(err),
            Some(Ok(StreamEvent::Data(data))) => data,
        };

        let decoded = decode(&data)?;
        if !decoded.text.is_empty() {
            let sent = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(LLMError::Cancelled),
                sent = chunks.send(StreamChunk::new(decoded.text)) => sent,
            };
            if sent.is_err() {
                tracing::debug!(provider = %provider, "stream receiver dropped, stopping");
                return Ok(());
            }
        }
        if decoded.terminal {
            return Ok(());
        }
    }
}

/// Event-stream reader: spawns a task that decodes `body` into a [`ChatStream`].
///
/// # Examples
///
/// ```
/// # use futures_util::stream;
/// # use kotoba_gateway::http::HttpBodyStream;
/// # use kotoba_gateway::stream::{parse, Decoded};
/// # use kotoba_gateway::ProviderKind;
/// # use tokio_util::sync::CancellationToken;
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let body: HttpBodyStream = Box::pin(stream::iter(vec![
///     Ok(b"data: hello\n\ndata: [DONE]\n\n".to_vec()),
/// ]));
/// let stream = parse(CancellationToken::new(), body, ProviderKind::OpenAi, |frame| {
///     Ok(Decoded::text(frame))
/// });
/// assert_eq!(stream.collect_text().await.unwrap(), "hello");
/// # });
/// ```
pub fn parse(
    cancel: CancellationToken,
    body: HttpBodyStream,
    provider: ProviderKind,
    decode: DecodeFn,
) -> ChatStream {
    let (sender, stream) = ChatStream::channel();
    tokio::spawn(async move {
        let result = forward_frames(body, provider, decode, &sender.chunks, &cancel).await;
        sender.finish(result).await;
    });
    stream
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures_util::stream;

    use super::*;

    fn build_body(chunks: Vec<Result<Vec<u8>, LLMError>>) -> HttpBodyStream {
        Box::pin(stream::iter(chunks))
    }

    fn passthrough(frame: &str) -> Result<Decoded, LLMError> {
        match frame {
            "stop" => Ok(Decoded::terminal()),
            "boom" => Err(LLMError::Stream {
                provider: ProviderKind::Anthropic,
                message: "overloaded".to_string(),
            }),
            "{not json" => Ok(Decoded::skip()),
            text => Ok(Decoded::text(text)),
        }
    }

    #[tokio::test]
    async fn decoder_emits_data_and_done_events() {
        let chunks = vec![
            Ok(b"data: {\"text\":\"hi\"}\n\n".to_vec()),
            Ok(b"data: [DONE]\n\n".to_vec()),
        ];
        let mut decoder = StreamDecoder::new(build_body(chunks), ProviderKind::OpenAi);

        let first = decoder.next().await.expect("event").expect("ok");
        assert_eq!(first, StreamEvent::Data("{\"text\":\"hi\"}".to_string()));

        let second = decoder.next().await.expect("event").expect("ok");
        assert_eq!(second, StreamEvent::Done);

        assert!(decoder.next().await.is_none());
    }

    #[tokio::test]
    async fn decoder_combines_multiline_payloads_and_split_chunks() {
        let chunks = vec![
            Ok(b"event: ping\r\ndata: line one\n".to_vec()),
            Ok(b"data: line".to_vec()),
            Ok(b" two\n\n: keep-alive comment\n\n".to_vec()),
        ];
        let mut decoder = StreamDecoder::new(build_body(chunks), ProviderKind::Gemini);
        let event = decoder.next().await.expect("event").expect("ok");
        assert_eq!(event, StreamEvent::Data("line one\nline two".to_string()));
        assert!(decoder.next().await.is_none());
    }

    #[tokio::test]
    async fn decoder_skips_invalid_utf8_frames() {
        let chunks = vec![Ok(b"data: \xff\n\ndata: ok\n\n".to_vec())];
        let mut decoder = StreamDecoder::new(build_body(chunks), ProviderKind::Anthropic);
        let event = decoder.next().await.expect("event").expect("ok");
        assert_eq!(event, StreamEvent::Data("ok".to_string()));
        assert!(decoder.next().await.is_none());
    }

    #[tokio::test]
    async fn decoder_flushes_trailing_frame_without_blank_line() {
        let chunks = vec![Ok(b"data: tail".to_vec())];
        let mut decoder = StreamDecoder::new(build_body(chunks), ProviderKind::OpenAi);
        let event = decoder.next().await.expect("event").expect("ok");
        assert_eq!(event, StreamEvent::Data("tail".to_string()));
        assert!(decoder.next().await.is_none());
    }

    #[tokio::test]
    async fn parse_delivers_fragments_in_order_and_stops_at_terminal() {
        let body = build_body(vec![Ok(
            b"data: one\n\ndata: {not json\n\ndata: two\n\ndata: three\n\ndata: stop\n\ndata: never\n\n"
                .to_vec(),
        )]);
        let mut stream = parse(CancellationToken::new(), body, ProviderKind::OpenAi, passthrough);

        let mut received = Vec::new();
        while let Some(chunk) = stream.chunks.recv().await {
            received.push(chunk.content);
        }
        assert_eq!(received, vec!["one", "two", "three"]);
        assert!(stream.errors.recv().await.is_none());
    }

    #[tokio::test]
    async fn decode_error_is_reported_once_after_earlier_text() {
        let body = build_body(vec![Ok(b"data: kept\n\ndata: boom\n\ndata: lost\n\n".to_vec())]);
        let mut stream = parse(CancellationToken::new(), body, ProviderKind::Anthropic, passthrough);

        assert_eq!(stream.chunks.recv().await.expect("chunk").content, "kept");
        assert!(stream.chunks.recv().await.is_none());
        let err = stream.errors.recv().await.expect("error");
        assert!(matches!(err, LLMError::Stream { .. }));
        assert!(stream.errors.recv().await.is_none());
    }

    #[tokio::test]
    async fn transport_error_terminates_the_stream() {
        let body = build_body(vec![
            Ok(b"data: partial\n\n".to_vec()),
            Err(LLMError::transport("connection reset")),
        ]);
        let result = parse(CancellationToken::new(), body, ProviderKind::OpenAi, passthrough)
            .collect_text()
            .await;
        assert!(matches!(result, Err(LLMError::Transport { .. })));
    }

    #[tokio::test]
    async fn cancellation_closes_both_channels() {
        let body: HttpBodyStream = Box::pin(
            stream::iter(vec![Ok(b"data: first\n\n".to_vec())]).chain(stream::pending()),
        );
        let cancel = CancellationToken::new();
        let mut stream = parse(cancel.clone(), body, ProviderKind::Gemini, passthrough);

        assert_eq!(stream.chunks.recv().await.expect("chunk").content, "first");
        cancel.cancel();

        let err = tokio::time::timeout(Duration::from_secs(1), stream.errors.recv())
            .await
            .expect("error channel should resolve")
            .expect("cancellation error");
        assert!(matches!(err, LLMError::Cancelled));
        let closed = tokio::time::timeout(Duration::from_secs(1), stream.chunks.recv())
            .await
            .expect("chunk channel should close");
        assert!(closed.is_none());
    }

    #[tokio::test]
    async fn failed_stream_yields_error_and_no_chunks() {
        let mut stream = ChatStream::failed(LLMError::Validation {
            message: "no messages".to_string(),
        });
        assert!(stream.chunks.recv().await.is_none());
        assert!(matches!(
            stream.errors.recv().await,
            Some(LLMError::Validation { .. })
        ));
    }
}
