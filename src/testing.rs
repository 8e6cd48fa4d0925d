//! Scripted renderer used by the unit tests.
//!
//! [`StubFactory`] hands out [`StubRenderer`]s whose behavior is scripted per
//! URL. It counts constructed, disposed and concurrently live clients, and
//! records when each attempt started.

use crate::error::FetchError;
use crate::renderer::{PageRenderer, RendererFactory};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;

/// What one `load()` call does. The last step of a script repeats.
#[derive(Debug, Clone)]
pub(crate) enum Step {
    Ok(&'static str),
    Transient,
    Fatal,
    Delay(Duration, &'static str),
    Panic,
}

#[derive(Default)]
struct StubState {
    scripts: HashMap<String, Vec<Step>>,
    attempts: Mutex<HashMap<String, Vec<Instant>>>,
    created: AtomicUsize,
    disposed: AtomicUsize,
    live: AtomicUsize,
    max_live: AtomicUsize,
    started: AtomicUsize,
    failing_creations: AtomicUsize,
    load_delay: Duration,
    hanging_overlays: bool,
    cancel_after: Option<(usize, CancellationToken)>,
}

impl StubState {
    fn next_step(&self, url: &str) -> Step {
        let mut attempts = self.attempts.lock().unwrap();
        let starts = attempts.entry(url.to_string()).or_default();
        starts.push(Instant::now());
        let index = starts.len() - 1;
        match self.scripts.get(url) {
            Some(script) if !script.is_empty() => script[index.min(script.len() - 1)].clone(),
            _ => Step::Ok(""),
        }
    }
}

pub(crate) struct StubFactory {
    state: Arc<StubState>,
}

impl StubFactory {
    pub(crate) fn new() -> Self {
        Self {
            state: Arc::new(StubState::default()),
        }
    }

    fn state_mut(&mut self) -> &mut StubState {
        Arc::get_mut(&mut self.state).expect("configure the stub before sharing it")
    }

    pub(crate) fn script(mut self, url: &str, steps: Vec<Step>) -> Self {
        self.state_mut().scripts.insert(url.to_string(), steps);
        self
    }

    pub(crate) fn load_delay(mut self, delay: Duration) -> Self {
        self.state_mut().load_delay = delay;
        self
    }

    pub(crate) fn failing_creations(mut self, count: usize) -> Self {
        self.state_mut().failing_creations = AtomicUsize::new(count);
        self
    }

    pub(crate) fn hanging_overlays(mut self) -> Self {
        self.state_mut().hanging_overlays = true;
        self
    }

    /// Cancel `token` as soon as `started` loads have begun.
    pub(crate) fn cancel_after_started(mut self, started: usize, token: CancellationToken) -> Self {
        self.state_mut().cancel_after = Some((started, token));
        self
    }

    pub(crate) fn created(&self) -> usize {
        self.state.created.load(Ordering::SeqCst)
    }

    pub(crate) fn disposed(&self) -> usize {
        self.state.disposed.load(Ordering::SeqCst)
    }

    pub(crate) fn max_live(&self) -> usize {
        self.state.max_live.load(Ordering::SeqCst)
    }

    pub(crate) fn attempts(&self, url: &str) -> usize {
        self.attempt_starts(url).len()
    }

    pub(crate) fn attempt_starts(&self, url: &str) -> Vec<Instant> {
        self.state
            .attempts
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_default()
    }
}

impl RendererFactory for StubFactory {
    type Renderer = StubRenderer;

    async fn create(&self) -> Result<StubRenderer, FetchError> {
        let remaining = self.state.failing_creations.load(Ordering::SeqCst);
        if remaining > 0 {
            self.state.failing_creations.store(remaining - 1, Ordering::SeqCst);
            return Err(FetchError::transient("browser failed to start"));
        }
        self.state.created.fetch_add(1, Ordering::SeqCst);
        let live = self.state.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.max_live.fetch_max(live, Ordering::SeqCst);
        Ok(StubRenderer {
            state: self.state.clone(),
            disposed: false,
        })
    }
}

pub(crate) struct StubRenderer {
    state: Arc<StubState>,
    disposed: bool,
}

impl PageRenderer for StubRenderer {
    async fn load(&mut self, url: &str) -> Result<String, FetchError> {
        let step = self.state.next_step(url);
        let started = self.state.started.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((threshold, token)) = &self.state.cancel_after {
            if started >= *threshold {
                token.cancel();
            }
        }
        if !self.state.load_delay.is_zero() {
            sleep(self.state.load_delay).await;
        }
        match step {
            Step::Ok("") => Ok(format!("<html>{url}</html>")),
            Step::Ok(content) => Ok(content.to_string()),
            Step::Transient => Err(FetchError::transient("net::ERR_CONNECTION_RESET")),
            Step::Fatal => Err(FetchError::fatal("invalid argument: malformed url")),
            Step::Delay(delay, content) => {
                sleep(delay).await;
                Ok(content.to_string())
            }
            Step::Panic => panic!("renderer exploded"),
        }
    }

    async fn accept_overlays(&mut self) -> Result<(), FetchError> {
        if self.state.hanging_overlays {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    fn dispose(&mut self) {
        assert!(!self.disposed, "renderer disposed twice");
        self.disposed = true;
        self.state.disposed.fetch_add(1, Ordering::SeqCst);
        self.state.live.fetch_sub(1, Ordering::SeqCst);
    }
}
