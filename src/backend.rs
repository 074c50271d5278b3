/*!
Client for the remote conversational backend.

Requests run on a worker thread so the cooperative pump never blocks on the
network; the orchestrator picks the result up through [ChatBackend::poll].
*/

use std::fmt::Display;
use std::sync::mpsc::{self, Receiver};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::model::chat::{parse_response, ChatRequest, ChatResponse};
use crate::Logger;

#[derive(Debug, Clone)]
pub enum BackendError {
    /// Transport-level failure: refused connection, TLS, timeout.
    RequestFailed(String),
    /// The backend answered with a non-success status.
    BadStatus(u16),
    /// The body was not the expected JSON shape.
    MalformedPayload(String),
    /// The worker thread died without reporting a result.
    Disconnected,
}

impl Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RequestFailed(v) => write!(f, "Request failed: {v}"),
            Self::BadStatus(v) => write!(f, "Backend answered with status {v}"),
            Self::MalformedPayload(v) => write!(f, "Malformed payload: {v}"),
            Self::Disconnected => write!(f, "Backend worker disconnected"),
        }
    }
}

impl std::error::Error for BackendError {}

pub type BackendResult = std::result::Result<ChatResponse, BackendError>;

/// The conversational backend as the orchestrator sees it: submit a
/// request, poll for the outcome.
pub trait ChatBackend {
    fn submit(&mut self, request: ChatRequest) -> Result<(), BackendError>;

    /// The outcome of the in-flight request, once available. There is no
    /// request timeout: a hung backend simply never yields a result here.
    fn poll(&mut self) -> Option<BackendResult>;
}

/// HTTP implementation posting JSON to a single endpoint.
pub struct HttpChatBackend {
    logger: Logger,
    url: String,
    client: reqwest::blocking::Client,
    receiver: Option<Receiver<BackendResult>>,
    worker: Option<JoinHandle<()>>,
}

impl HttpChatBackend {
    pub fn new(url: impl Into<String>) -> Result<Self, BackendError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| BackendError::RequestFailed(e.to_string()))?;

        Ok(Self {
            logger: Logger::create("HttpChatBackend"),
            url: url.into(),
            client,
            receiver: None,
            worker: None,
        })
    }
}

impl ChatBackend for HttpChatBackend {
    fn submit(&mut self, request: ChatRequest) -> Result<(), BackendError> {
        if self.receiver.is_some() {
            self.logger
                .debug("Replacing an in-flight request, its reply will be dropped");
        }

        let (sender, receiver) = mpsc::channel();
        let client = self.client.clone();
        let url = self.url.clone();
        let logger = self.logger.clone();

        let handle = std::thread::spawn(move || {
            let result = match client.post(&url).json(&request).send() {
                Ok(response) => {
                    let status = response.status();
                    if !status.is_success() {
                        Err(BackendError::BadStatus(status.as_u16()))
                    } else {
                        match response.bytes() {
                            Ok(body) => parse_response(&body)
                                .map_err(|e| BackendError::MalformedPayload(e.to_string())),
                            Err(e) => Err(BackendError::RequestFailed(e.to_string())),
                        }
                    }
                }
                Err(e) => Err(BackendError::RequestFailed(e.to_string())),
            };

            if sender.send(result).is_err() {
                logger.debug("Reply arrived after the session moved on, dropping it");
            }
        });

        self.receiver = Some(receiver);
        self.worker = Some(handle);

        Ok(())
    }

    fn poll(&mut self) -> Option<BackendResult> {
        let receiver = self.receiver.as_ref()?;

        match receiver.try_recv() {
            Ok(result) => {
                self.receiver = None;
                if let Some(handle) = self.worker.take() {
                    let _ = handle.join();
                }
                Some(result)
            }
            Err(mpsc::TryRecvError::Empty) => None,
            Err(mpsc::TryRecvError::Disconnected) => {
                self.receiver = None;
                self.worker = None;
                Some(Err(BackendError::Disconnected))
            }
        }
    }
}
