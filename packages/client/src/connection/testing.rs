//! Scripted transport for unit tests.

use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use url::Url;

use crate::error::ConnectionError;

use super::transport::{Frame, StatusStream, Transport};

/// What one `open` call does.
#[derive(Debug, Clone)]
pub(crate) struct Script {
    delay: Option<Duration>,
    frames: Option<Vec<Frame>>,
}

impl Script {
    /// Open succeeds and yields `frames`, then stays idle
    pub fn frames(frames: Vec<Frame>) -> Self {
        Self {
            delay: None,
            frames: Some(frames),
        }
    }

    /// Open succeeds after `delay`
    pub fn delayed(delay: Duration, frames: Vec<Frame>) -> Self {
        Self {
            delay: Some(delay),
            frames: Some(frames),
        }
    }

    /// Open fails
    pub fn refuse() -> Self {
        Self {
            delay: None,
            frames: None,
        }
    }
}

#[derive(Default)]
struct Shared {
    scripts: Mutex<VecDeque<Script>>,
    opened_urls: Mutex<Vec<String>>,
    closed_streams: AtomicUsize,
}

/// Transport that plays back one [`Script`] per `open` call.
///
/// Once the scripts run out, every further `open` is refused.
#[derive(Clone, Default)]
pub(crate) struct ScriptedTransport {
    shared: Arc<Shared>,
}

impl ScriptedTransport {
    pub fn new(scripts: Vec<Script>) -> Self {
        let shared = Shared {
            scripts: Mutex::new(scripts.into()),
            ..Shared::default()
        };
        Self {
            shared: Arc::new(shared),
        }
    }

    pub fn open_count(&self) -> usize {
        self.shared.opened_urls.lock().unwrap().len()
    }

    pub fn opened_urls(&self) -> Vec<String> {
        self.shared.opened_urls.lock().unwrap().clone()
    }

    pub fn closed_streams(&self) -> usize {
        self.shared.closed_streams.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn open(&self, url: &Url) -> Result<Box<dyn StatusStream>, ConnectionError> {
        self.shared
            .opened_urls
            .lock()
            .unwrap()
            .push(url.to_string());
        let script = self.shared.scripts.lock().unwrap().pop_front();

        let Some(script) = script else {
            return Err(ConnectionError::Transport("no script left".to_string()));
        };
        if let Some(delay) = script.delay {
            tokio::time::sleep(delay).await;
        }
        match script.frames {
            Some(frames) => Ok(Box::new(ScriptedStream {
                frames: frames.into(),
                shared: self.shared.clone(),
            })),
            None => Err(ConnectionError::Transport("connection refused".to_string())),
        }
    }
}

struct ScriptedStream {
    frames: VecDeque<Frame>,
    shared: Arc<Shared>,
}

#[async_trait]
impl StatusStream for ScriptedStream {
    async fn next_frame(&mut self) -> Frame {
        match self.frames.pop_front() {
            Some(frame) => frame,
            None => std::future::pending().await,
        }
    }

    async fn close(&mut self) {
        self.shared.closed_streams.fetch_add(1, Ordering::SeqCst);
    }
}
