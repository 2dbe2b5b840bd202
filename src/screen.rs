use tracing::{error, warn};

use crate::error::Error;

/// What a screen currently shows.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadState<T> {
    Idle,
    Loading,
    Ready(T),
    /// User-visible message; the screen offers a retry while in this state.
    Failed(String),
}

/// Ties one visit of a screen to the fetch it started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Activation {
    generation: u64,
}

/// Load state of one screen plus the bookkeeping that keeps late results from
/// landing on a screen that has moved on.
#[derive(Debug)]
pub struct Screen<T> {
    name: &'static str,
    generation: u64,
    alive: bool,
    state: LoadState<T>,
}

impl<T> Screen<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            generation: 0,
            alive: false,
            state: LoadState::Idle,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Starts a visit. Any fetch from an earlier visit becomes stale.
    pub fn activate(&mut self) -> Activation {
        self.generation += 1;
        self.alive = true;
        self.state = LoadState::Loading;
        Activation {
            generation: self.generation,
        }
    }

    /// Manual retry, only offered after a failure.
    pub fn retry(&mut self) -> Option<Activation> {
        self.can_retry().then(|| self.activate())
    }

    /// Ends the visit; results still in flight will be discarded.
    pub fn dismantle(&mut self) {
        self.alive = false;
        self.state = LoadState::Idle;
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Applies a fetch result. Returns false when the result was discarded
    /// because the screen was dismantled or re-activated since.
    pub fn resolve(&mut self, activation: Activation, result: Result<T, Error>) -> bool {
        if !self.alive || activation.generation != self.generation {
            warn!(
                screen = self.name,
                generation = activation.generation,
                current = self.generation,
                "discarding stale result"
            );
            return false;
        }
        self.state = match result {
            Ok(data) => LoadState::Ready(data),
            Err(err) => {
                error!(screen = self.name, error = %err, "load failed");
                LoadState::Failed(failure_message(self.name, &err))
            }
        };
        true
    }

    pub fn state(&self) -> &LoadState<T> {
        &self.state
    }

    pub fn ready(&self) -> Option<&T> {
        match &self.state {
            LoadState::Ready(data) => Some(data),
            _ => None,
        }
    }

    pub fn can_retry(&self) -> bool {
        matches!(self.state, LoadState::Failed(_))
    }
}

fn failure_message(name: &str, err: &Error) -> String {
    match err {
        Error::Network(_) => format!("Failed to load {name}: {err}. Press r to retry."),
        Error::FeedParse(_) => format!("Failed to read {name}: {err}. Press r to retry."),
        Error::Validation(_) => format!("{err}"),
    }
}
