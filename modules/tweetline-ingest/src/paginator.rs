//! Cursor-driven pagination.
//!
//! A [`Session`] is an explicit state machine:
//!
//! ```text
//! Idle → Fetching → Emitting → (Fetching | Done | Failed)
//! ```
//!
//! It fetches one page at a time, normalizes each record and pushes one
//! entry per record into a sink before fetching again. A sink that waits for
//! its consumer throttles the session. [`Paginator::stream`] runs a session
//! on its own task behind a bounded channel and hands back a `Stream`.

use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::Stream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use typed_builder::TypedBuilder;

use tweetline_common::config::{DEFAULT_MAX_EMPTY_PAGES, DEFAULT_STREAM_CAPACITY};
use tweetline_common::{Config, Post, Profile};

use crate::error::EntryError;
use crate::fetcher::{PageFetcher, RawPage};
use crate::normalize::{Normalize, NormalizeOptions};

/// One result entry: a canonical entity, or the error that stopped it.
pub type Entry<E> = Result<E, EntryError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Fetching,
    Emitting,
    Done(DoneReason),
    Failed(FailReason),
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Done(_) | SessionState::Failed(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoneReason {
    /// The requested number of entities has been emitted.
    MaxReached,
    /// The platform returned an empty or unchanged cursor.
    CursorExhausted,
    /// Too many consecutive pages came back empty.
    EmptyPages,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailReason {
    /// The fetcher failed; a session-level entry was emitted.
    Fetch,
    /// The caller cancelled or stopped consuming.
    Cancelled,
    /// The session task ended without reporting a state.
    Aborted,
}

#[derive(Debug, Clone, PartialEq, Eq, TypedBuilder)]
pub struct PaginatorConfig {
    #[builder(default)]
    pub normalize: NormalizeOptions,
    #[builder(default = DEFAULT_STREAM_CAPACITY)]
    pub stream_capacity: usize,
    #[builder(default = DEFAULT_MAX_EMPTY_PAGES)]
    pub max_empty_pages: usize,
}

impl Default for PaginatorConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl From<&Config> for PaginatorConfig {
    fn from(config: &Config) -> Self {
        Self {
            normalize: NormalizeOptions::from(config),
            stream_capacity: config.stream_capacity,
            max_empty_pages: config.max_empty_pages,
        }
    }
}

/// Where a session pushes its entries. `push` returns false once the
/// consumer is gone, which ends the session as cancelled.
#[async_trait]
pub trait EntrySink<E: Send>: Send {
    async fn push(&mut self, entry: Entry<E>) -> bool;
}

#[async_trait]
impl<E: Send + 'static> EntrySink<E> for mpsc::Sender<Entry<E>> {
    async fn push(&mut self, entry: Entry<E>) -> bool {
        self.send(entry).await.is_ok()
    }
}

#[async_trait]
impl<E: Send + 'static> EntrySink<E> for Vec<Entry<E>> {
    async fn push(&mut self, entry: Entry<E>) -> bool {
        Vec::push(self, entry);
        true
    }
}

/// One pagination run over a single query. Owns its cursor and counters.
pub struct Session<E> {
    query: String,
    max_count: usize,
    fetcher: Arc<dyn PageFetcher>,
    config: PaginatorConfig,
    cancel: CancellationToken,

    state: SessionState,
    cursor: String,
    pending: Option<RawPage>,
    emitted: usize,
    pages: usize,
    empty_streak: usize,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Normalize> Session<E> {
    pub fn new(
        query: impl Into<String>,
        max_count: usize,
        fetcher: Arc<dyn PageFetcher>,
        config: PaginatorConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            query: query.into(),
            max_count,
            fetcher,
            config,
            cancel,
            state: SessionState::Idle,
            cursor: String::new(),
            pending: None,
            emitted: 0,
            pages: 0,
            empty_streak: 0,
            _entity: PhantomData,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn emitted(&self) -> usize {
        self.emitted
    }

    pub fn cursor(&self) -> &str {
        &self.cursor
    }

    /// Drive the session to a terminal state.
    pub async fn run<S: EntrySink<E>>(mut self, sink: &mut S) -> SessionState {
        info!(
            query = self.query.as_str(),
            max = self.max_count,
            kind = E::KIND,
            "Pagination session started"
        );
        while !self.state.is_terminal() {
            self.step(sink).await;
        }
        info!(
            query = self.query.as_str(),
            emitted = self.emitted,
            pages = self.pages,
            state = ?self.state,
            "Pagination session finished"
        );
        self.state
    }

    /// Perform one transition and return the new state.
    pub async fn step<S: EntrySink<E>>(&mut self, sink: &mut S) -> SessionState {
        self.state = match self.state {
            SessionState::Idle => self.begin(),
            SessionState::Fetching => self.fetch(sink).await,
            SessionState::Emitting => self.emit(sink).await,
            terminal => terminal,
        };
        self.state
    }

    fn begin(&self) -> SessionState {
        if self.max_count == 0 {
            SessionState::Done(DoneReason::MaxReached)
        } else {
            SessionState::Fetching
        }
    }

    async fn fetch<S: EntrySink<E>>(&mut self, sink: &mut S) -> SessionState {
        if self.cancel.is_cancelled() {
            info!(query = self.query.as_str(), emitted = self.emitted, "Pagination cancelled");
            return SessionState::Failed(FailReason::Cancelled);
        }

        let remaining = self.max_count - self.emitted;
        debug!(
            query = self.query.as_str(),
            cursor = self.cursor.as_str(),
            remaining,
            page = self.pages,
            "Fetching page"
        );

        match self.fetcher.fetch_page(&self.query, remaining, &self.cursor).await {
            Ok(page) => {
                self.pending = Some(page);
                SessionState::Emitting
            }
            Err(source) => {
                warn!(
                    query = self.query.as_str(),
                    cursor = self.cursor.as_str(),
                    error = %source,
                    "Page fetch failed, ending session"
                );
                let entry = Err(EntryError::Session {
                    page: self.pages,
                    cursor: self.cursor.clone(),
                    source,
                });
                sink.push(entry).await;
                SessionState::Failed(FailReason::Fetch)
            }
        }
    }

    async fn emit<S: EntrySink<E>>(&mut self, sink: &mut S) -> SessionState {
        let Some(page) = self.pending.take() else {
            return SessionState::Fetching;
        };
        let page_index = self.pages;
        self.pages += 1;

        for (index, raw) in page.items.iter().enumerate() {
            if self.emitted >= self.max_count {
                break;
            }
            let entry = match E::normalize(raw, &self.config.normalize) {
                Ok(entity) => {
                    self.emitted += 1;
                    Ok(entity)
                }
                Err(source) => {
                    warn!(page = page_index, index, error = %source, kind = E::KIND, "Record failed to normalize");
                    Err(EntryError::Item {
                        page: page_index,
                        index,
                        cursor: self.cursor.clone(),
                        source,
                    })
                }
            };
            if !sink.push(entry).await {
                info!(query = self.query.as_str(), "Consumer went away, stopping");
                return SessionState::Failed(FailReason::Cancelled);
            }
        }

        if self.emitted >= self.max_count {
            return SessionState::Done(DoneReason::MaxReached);
        }
        if page.next_cursor.is_empty() || page.next_cursor == self.cursor {
            return SessionState::Done(DoneReason::CursorExhausted);
        }

        if page.items.is_empty() {
            self.empty_streak += 1;
            if self.empty_streak > self.config.max_empty_pages {
                debug!(streak = self.empty_streak, "Too many empty pages in a row");
                return SessionState::Done(DoneReason::EmptyPages);
            }
        } else {
            self.empty_streak = 0;
        }

        self.cursor = page.next_cursor;
        SessionState::Fetching
    }
}

/// Entry point: binds a fetcher and configuration, starts sessions.
#[derive(Clone)]
pub struct Paginator {
    fetcher: Arc<dyn PageFetcher>,
    config: PaginatorConfig,
}

impl Paginator {
    pub fn new(fetcher: Arc<dyn PageFetcher>, config: PaginatorConfig) -> Self {
        Self { fetcher, config }
    }

    pub fn config(&self) -> &PaginatorConfig {
        &self.config
    }

    pub fn session<E: Normalize>(
        &self,
        query: &str,
        max_count: usize,
        cancel: CancellationToken,
    ) -> Session<E> {
        Session::new(query, max_count, self.fetcher.clone(), self.config.clone(), cancel)
    }

    /// Start a session on a new task and stream its entries.
    pub fn stream<E: Normalize>(&self, query: &str, max_count: usize) -> EntryStream<E> {
        self.stream_with_cancel(query, max_count, CancellationToken::new())
    }

    pub fn stream_with_cancel<E: Normalize>(
        &self,
        query: &str,
        max_count: usize,
        cancel: CancellationToken,
    ) -> EntryStream<E> {
        let (mut tx, rx) = mpsc::channel(self.config.stream_capacity.max(1));
        let session = self.session::<E>(query, max_count, cancel.clone());
        let handle = tokio::spawn(async move { session.run(&mut tx).await });
        EntryStream {
            rx,
            handle: Some(handle),
            cancel,
        }
    }

    pub fn posts(&self, query: &str, max_count: usize) -> EntryStream<Post> {
        self.stream(query, max_count)
    }

    pub fn profiles(&self, query: &str, max_count: usize) -> EntryStream<Profile> {
        self.stream(query, max_count)
    }
}

/// Entries of a running session, in page order and, within a page, in the
/// platform's order. Ends when the session reaches a terminal state.
pub struct EntryStream<E> {
    rx: mpsc::Receiver<Entry<E>>,
    handle: Option<JoinHandle<SessionState>>,
    cancel: CancellationToken,
}

impl<E> EntryStream<E> {
    /// Stop before the next page fetch. Entries already produced stay valid.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub async fn next_entry(&mut self) -> Option<Entry<E>> {
        self.rx.recv().await
    }

    /// Wait for the session and return its terminal state. Entries not yet
    /// received are discarded.
    pub async fn finish(mut self) -> SessionState {
        self.rx.close();
        let Some(handle) = self.handle.take() else {
            return SessionState::Failed(FailReason::Aborted);
        };
        match handle.await {
            Ok(state) => state,
            Err(err) => {
                warn!(error = %err, "Pagination task did not complete");
                SessionState::Failed(FailReason::Aborted)
            }
        }
    }
}

impl<E> Stream for EntryStream<E> {
    type Item = Entry<E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

impl<E> Drop for EntryStream<E> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
