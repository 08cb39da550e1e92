//! In-memory transport used by unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use futures_util::{StreamExt, stream};
use serde_json::Value;

use crate::error::LLMError;

use super::{HttpBodyStream, HttpRequest, HttpResponse, HttpStreamResponse, HttpTransport};

enum Scripted {
    Body {
        status: u16,
        headers: HashMap<String, String>,
        chunks: Vec<Vec<u8>>,
        hang: bool,
    },
    Fail(String),
}

/// Replays scripted responses in FIFO order and records every request.
pub(crate) struct MockTransport {
    responses: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn push_json(&self, status: u16, body: Value) {
        self.push_raw(status, HashMap::new(), body.to_string().into_bytes());
    }

    pub(crate) fn push_raw(&self, status: u16, headers: HashMap<String, String>, body: Vec<u8>) {
        self.push(Scripted::Body {
            status,
            headers,
            chunks: vec![body],
            hang: false,
        });
    }

    /// Scripts an SSE body delivered as the given raw chunks.
    pub(crate) fn push_sse(&self, chunks: &[&str]) {
        self.push(Scripted::Body {
            status: 200,
            headers: HashMap::new(),
            chunks: chunks.iter().map(|c| c.as_bytes().to_vec()).collect(),
            hang: false,
        });
    }

    /// Like [`push_sse`](Self::push_sse) but the body never ends after the last chunk.
    pub(crate) fn push_sse_then_hang(&self, chunks: &[&str]) {
        self.push(Scripted::Body {
            status: 200,
            headers: HashMap::new(),
            chunks: chunks.iter().map(|c| c.as_bytes().to_vec()).collect(),
            hang: true,
        });
    }

    pub(crate) fn push_failure(&self, message: &str) {
        self.push(Scripted::Fail(message.to_string()));
    }

    pub(crate) fn request_count(&self) -> usize {
        self.requests.lock().expect("requests lock").len()
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub(crate) fn last_json_body(&self) -> Value {
        let requests = self.requests.lock().expect("requests lock");
        let body = requests
            .last()
            .and_then(|request| request.body.clone())
            .expect("a request with a body");
        serde_json::from_slice(&body).expect("JSON body")
    }

    fn push(&self, scripted: Scripted) {
        self.responses
            .lock()
            .expect("responses lock")
            .push_back(scripted);
    }

    fn next(&self, request: HttpRequest) -> Scripted {
        self.requests.lock().expect("requests lock").push(request);
        self.responses
            .lock()
            .expect("responses lock")
            .pop_front()
            .expect("no scripted response left")
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, LLMError> {
        match self.next(request) {
            Scripted::Body {
                status,
                headers,
                chunks,
                ..
            } => Ok(HttpResponse {
                status,
                headers,
                body: chunks.concat(),
            }),
            Scripted::Fail(message) => Err(LLMError::transport(message)),
        }
    }

    async fn send_stream(&self, request: HttpRequest) -> Result<HttpStreamResponse, LLMError> {
        match self.next(request) {
            Scripted::Body {
                status,
                headers,
                chunks,
                hang,
            } => {
                let items = stream::iter(chunks.into_iter().map(Ok));
                let body: HttpBodyStream = if hang {
                    Box::pin(items.chain(stream::pending()))
                } else {
                    Box::pin(items)
                };
                Ok(HttpStreamResponse {
                    status,
                    headers,
                    body,
                })
            }
            Scripted::Fail(message) => Err(LLMError::transport(message)),
        }
    }
}
