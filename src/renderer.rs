//! The page-rendering capability consumed by the fetch pool.
//!
//! The pool never talks to a browser or HTTP stack directly. It only needs:
//! - [`RendererFactory`]: builds a fresh, heavyweight client for one attempt
//! - [`PageRenderer`]: loads a URL, optionally dismisses overlays, and is
//!   disposed after the attempt
//!
//! Clients are wrapped in a [`ClientGuard`] so `dispose()` runs on every exit
//! path of an attempt, including errors, panics and dropped futures.

use crate::error::FetchError;
use std::future::Future;
use std::ops::{Deref, DerefMut};

/// A stateful, single-owner client that renders one URL at a time.
///
/// Implementors are not expected to be usable from several tasks at once;
/// the pool hands each instance to exactly one worker.
pub trait PageRenderer: Send + 'static {
    /// Load `url` and return its rendered content.
    fn load(&mut self, url: &str) -> impl Future<Output = Result<String, FetchError>> + Send;

    /// Auxiliary accept/dismiss step (cookie banners, login modals) run after
    /// a successful load. Its failure never fails the attempt.
    fn accept_overlays(&mut self) -> impl Future<Output = Result<(), FetchError>> + Send {
        async { Ok(()) }
    }

    /// Release the underlying resources. Called exactly once per client.
    fn dispose(&mut self);
}

/// Creates a fresh [`PageRenderer`] for every attempt.
pub trait RendererFactory: Send + Sync + 'static {
    type Renderer: PageRenderer;

    /// Construct a client. Errors are treated as transient unless the
    /// factory returns [`FetchError::Fatal`].
    fn create(&self) -> impl Future<Output = Result<Self::Renderer, FetchError>> + Send;
}

/// Owns a renderer for the duration of one attempt and disposes it on drop.
pub struct ClientGuard<R: PageRenderer> {
    renderer: R,
}

impl<R: PageRenderer> ClientGuard<R> {
    pub fn new(renderer: R) -> Self {
        Self { renderer }
    }
}

impl<R: PageRenderer> Deref for ClientGuard<R> {
    type Target = R;

    fn deref(&self) -> &R {
        &self.renderer
    }
}

impl<R: PageRenderer> DerefMut for ClientGuard<R> {
    fn deref_mut(&mut self) -> &mut R {
        &mut self.renderer
    }
}

impl<R: PageRenderer> Drop for ClientGuard<R> {
    fn drop(&mut self) {
        self.renderer.dispose();
    }
}
