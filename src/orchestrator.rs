//! Per-session search state machine.
//!
//! A [`SearchSession`] drives one user's "select image, pick engine, search"
//! flow. Inline engines go `Idle -> Searching -> Succeeded`, redirect engines
//! go `Idle -> Uploading -> Redirecting -> Succeeded`, and any stage may end
//! in `Failed`. Selecting a new image preempts whatever is in flight: the old
//! operation keeps running but its result is dropped when it arrives.

use crate::engines::ImageSearch;
use crate::error::{Error, Result};
use crate::registry::{build_redirect_target, EngineRegistry};
use crate::types::{EngineMode, ImagePayload, SearchEngineDescriptor, SearchMatch};
use crate::upload::UploadChain;
use log::{info, warn};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Receives the finished redirect target. Opening it is up to the caller.
pub trait Navigator: Send + Sync {
    fn open(&self, target: &str) -> Result<()>;
}

/// Navigator that only logs the target.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn open(&self, target: &str) -> Result<()> {
        info!("Search target ready: {}", target);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// Best inline match (the first one returned upstream).
    Match(SearchMatch),
    NoMatch,
    Redirected { target: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum OrchestrationState {
    Idle,
    Uploading,
    Searching,
    Redirecting,
    Succeeded(Completion),
    Failed(String),
}

impl OrchestrationState {
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            OrchestrationState::Uploading
                | OrchestrationState::Searching
                | OrchestrationState::Redirecting
        )
    }

    pub fn status_message(&self) -> String {
        match self {
            OrchestrationState::Idle => String::new(),
            OrchestrationState::Uploading => "1/2 uploading image".to_string(),
            OrchestrationState::Searching => "searching".to_string(),
            OrchestrationState::Redirecting => "2/2 opening search engine".to_string(),
            OrchestrationState::Succeeded(Completion::Match(_)) => "search complete".to_string(),
            OrchestrationState::Succeeded(Completion::NoMatch) => "no match found".to_string(),
            OrchestrationState::Succeeded(Completion::Redirected { .. }) => {
                "search engine opened".to_string()
            }
            OrchestrationState::Failed(message) => message.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Completed(Completion),
    /// A newer image was selected before this run finished.
    Stale,
}

/// Components shared by every session.
#[derive(Clone)]
pub struct Services {
    pub registry: Arc<EngineRegistry>,
    pub uploader: Arc<UploadChain>,
    pub searcher: Arc<dyn ImageSearch>,
    pub navigator: Arc<dyn Navigator>,
}

struct SessionState {
    // Bumped on every selection; tags in-flight runs.
    generation: u64,
    payload: Option<Arc<ImagePayload>>,
    state: OrchestrationState,
    in_flight: bool,
}

pub struct SearchSession {
    services: Services,
    inner: Mutex<SessionState>,
}

impl SearchSession {
    pub fn new(services: Services) -> Self {
        Self {
            services,
            inner: Mutex::new(SessionState {
                generation: 0,
                payload: None,
                state: OrchestrationState::Idle,
                in_flight: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> OrchestrationState {
        self.lock().state.clone()
    }

    pub fn status_message(&self) -> String {
        self.lock().state.status_message()
    }

    pub fn current_payload(&self) -> Option<Arc<ImagePayload>> {
        self.lock().payload.clone()
    }

    /// The match to display, if the last inline search found one.
    pub fn display_match(&self) -> Option<SearchMatch> {
        match &self.lock().state {
            OrchestrationState::Succeeded(Completion::Match(m)) => Some(m.clone()),
            _ => None,
        }
    }

    /// Make `payload` the active image. Clears any result or error and
    /// orphans an in-flight run.
    pub fn select_file(&self, payload: ImagePayload) {
        let mut session = self.lock();
        if session.in_flight {
            info!("Selection replaced while a search was running; its result will be dropped");
        }
        session.generation += 1;
        session.payload = Some(Arc::new(payload));
        session.state = OrchestrationState::Idle;
        session.in_flight = false;
    }

    pub async fn trigger_search(&self, engine_id: &str) -> Result<SearchOutcome> {
        let (generation, payload, descriptor) = {
            let mut session = self.lock();
            let payload = session.payload.clone().ok_or(Error::NoImageSelected)?;
            if session.in_flight {
                return Err(Error::SearchInProgress);
            }
            let descriptor = match self.services.registry.resolve(engine_id) {
                Ok(descriptor) => descriptor.clone(),
                Err(e) => {
                    session.state = OrchestrationState::Failed(e.user_message().to_string());
                    return Err(e);
                }
            };
            session.in_flight = true;
            session.state = match descriptor.mode {
                EngineMode::Inline => OrchestrationState::Searching,
                EngineMode::Redirect => OrchestrationState::Uploading,
            };
            (session.generation, payload, descriptor)
        };
        info!(
            "Searching {} with {} ({})",
            payload.file_name(),
            descriptor.id,
            descriptor.mode
        );

        let result = match descriptor.mode {
            EngineMode::Inline => self.run_inline(&payload).await.map(Some),
            EngineMode::Redirect => self.run_redirect(generation, &payload, &descriptor).await,
        };
        self.finish(generation, result)
    }

    async fn run_inline(&self, payload: &ImagePayload) -> Result<Completion> {
        let matches = self.services.searcher.search(payload).await?;
        Ok(match matches.into_iter().next() {
            Some(best) => Completion::Match(best),
            None => Completion::NoMatch,
        })
    }

    /// `Ok(None)` when the selection changed while uploading.
    async fn run_redirect(
        &self,
        generation: u64,
        payload: &ImagePayload,
        descriptor: &SearchEngineDescriptor,
    ) -> Result<Option<Completion>> {
        let upload = self.services.uploader.resolve_url(payload).await?;

        // Held through the hand-off so a newer selection cannot slip in
        // between the generation check and `open`.
        let mut session = self.lock();
        if session.generation != generation {
            return Ok(None);
        }
        session.state = OrchestrationState::Redirecting;

        let target = build_redirect_target(descriptor, &upload.url)?;
        self.services.navigator.open(&target)?;
        Ok(Some(Completion::Redirected { target }))
    }

    fn finish(&self, generation: u64, result: Result<Option<Completion>>) -> Result<SearchOutcome> {
        let mut session = self.lock();
        if session.generation != generation {
            match &result {
                Ok(_) => warn!("Discarding result of a superseded search"),
                Err(e) => warn!("Discarding failure of a superseded search: {}", e),
            }
            return Ok(SearchOutcome::Stale);
        }
        session.in_flight = false;

        match result {
            Ok(Some(completion)) => {
                session.state = OrchestrationState::Succeeded(completion.clone());
                Ok(SearchOutcome::Completed(completion))
            }
            Ok(None) => Ok(SearchOutcome::Stale),
            Err(e) => {
                warn!("Search failed: {}", e);
                session.state = OrchestrationState::Failed(e.user_message().to_string());
                Err(e)
            }
        }
    }
}
