use std::cell::Cell;
use std::fmt;

use honest_common::ValidationConfig;

use crate::document::{DocumentState, Post, PostField};
use crate::error::{EditorError, PersistenceError, ValidationRejection};
use crate::events::{EditorEvent, EventBus};
use crate::services::{Notifier, PostStore};

use super::{SAVE_FAILED, SAVED, SAVING};

/// Where the most recent save is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SaveState {
    #[default]
    Idle,
    Validating,
    Rejected,
    SavingTitle,
    SavingBody,
    Saved,
    Failed,
}

impl SaveState {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Validating => "validating",
            Self::Rejected => "rejected",
            Self::SavingTitle => "saving-title",
            Self::SavingBody => "saving-body",
            Self::Saved => "saved",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for SaveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub enum SaveOutcome {
    Saved,
    Rejected(ValidationRejection),
    Failed(PersistenceError),
}

impl SaveOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, Self::Saved)
    }

    pub fn rejection(&self) -> Option<&ValidationRejection> {
        match self {
            Self::Rejected(rejection) => Some(rejection),
            _ => None,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Saved => "saved",
            Self::Rejected(_) => "rejected",
            Self::Failed(_) => "failed",
        }
    }
}

/// Check `post` against the save gates, in order, stopping at the first
/// failure.
pub fn validate(post: &Post, limits: ValidationConfig) -> Result<(), ValidationRejection> {
    let body_chars = post.body_md.chars().count();
    if body_chars < limits.min_body_chars {
        return Err(ValidationRejection::BodyTooShort {
            min: limits.min_body_chars,
            actual: body_chars,
        });
    }

    let Some(title) = post.title.as_deref().filter(|t| !t.is_empty()) else {
        return Err(ValidationRejection::MissingTitle);
    };

    let title_chars = title.chars().count();
    if title_chars < limits.min_title_chars {
        return Err(ValidationRejection::TitleTooShort {
            min: limits.min_title_chars,
            actual: title_chars,
        });
    }

    Ok(())
}

/// Validate the attached post, then persist its title and its body.
pub struct SaveWorkflow<'a, P, N> {
    document: &'a DocumentState,
    bus: &'a EventBus,
    store: &'a P,
    notifier: &'a N,
    limits: ValidationConfig,
    state: Option<&'a Cell<SaveState>>,
}

impl<'a, P: PostStore, N: Notifier> SaveWorkflow<'a, P, N> {
    pub fn new(document: &'a DocumentState, bus: &'a EventBus, store: &'a P, notifier: &'a N) -> Self {
        Self {
            document,
            bus,
            store,
            notifier,
            limits: ValidationConfig::default(),
            state: None,
        }
    }

    pub fn with_limits(mut self, limits: ValidationConfig) -> Self {
        self.limits = limits;
        self
    }

    /// Report state transitions into `state`.
    pub fn tracking(mut self, state: &'a Cell<SaveState>) -> Self {
        self.state = Some(state);
        self
    }

    pub(crate) fn document(&self) -> &'a DocumentState {
        self.document
    }

    pub(crate) fn bus(&self) -> &'a EventBus {
        self.bus
    }

    pub(crate) fn store(&self) -> &'a P {
        self.store
    }

    pub(crate) fn notifier(&self) -> &'a N {
        self.notifier
    }

    /// Run the save.
    ///
    /// Only fails when no post is attached; rejections and persistence
    /// failures are outcomes.
    pub async fn run(&self) -> Result<SaveOutcome, EditorError> {
        let outcome = self.run_inner().await?;
        metrics::counter!("honest_editor_saves_total", "outcome" => outcome.label()).increment(1);
        Ok(outcome)
    }

    /// Run the save, then call exactly one of `on_saved` or `on_failed`.
    pub async fn run_with(
        &self,
        on_saved: impl FnOnce(),
        on_failed: impl FnOnce(),
    ) -> Result<SaveOutcome, EditorError> {
        let result = self.run().await;
        match &result {
            Ok(SaveOutcome::Saved) => on_saved(),
            _ => on_failed(),
        }
        result
    }

    async fn run_inner(&self) -> Result<SaveOutcome, EditorError> {
        self.set_state(SaveState::Validating);
        let Some(post) = self.document.current() else {
            self.set_state(SaveState::Idle);
            return Err(EditorError::NoPost);
        };

        if let Err(rejection) = validate(&post, self.limits) {
            tracing::info!(reason = %rejection, "save rejected");
            self.set_state(SaveState::Rejected);
            self.bus.post_changed().next(EditorEvent::PublishCancelled);
            self.notifier.error(&rejection.to_string());
            return Ok(SaveOutcome::Rejected(rejection));
        }

        self.notifier.info(SAVING);

        self.set_state(SaveState::SavingTitle);
        let titled = post;
        if let Err(err) = self.store.save_post_property(&titled, PostField::Title).await {
            return Ok(SaveOutcome::Failed(self.fail(err)));
        }

        // Edits made while the title was in flight go out with the body.
        self.set_state(SaveState::SavingBody);
        let bodied = self.document.current().ok_or(EditorError::NoPost)?;
        if let Err(err) = self.store.save_post_property(&bodied, PostField::Body).await {
            return Ok(SaveOutcome::Failed(self.fail(err)));
        }

        self.document.mark_clean(&Post {
            title: titled.title,
            ..bodied
        });
        self.set_state(SaveState::Saved);
        tracing::info!("post saved");
        self.notifier.success(SAVED);
        self.bus.post_changed().next(EditorEvent::PostSaved);
        Ok(SaveOutcome::Saved)
    }

    fn fail(&self, err: PersistenceError) -> PersistenceError {
        tracing::warn!(error = %err, "save failed");
        self.set_state(SaveState::Failed);
        self.bus.post_changed().next(EditorEvent::PublishCancelled);
        self.notifier.error(SAVE_FAILED);
        err
    }

    fn set_state(&self, next: SaveState) {
        if let Some(state) = self.state {
            tracing::debug!(from = %state.get(), to = %next, "save state");
            state.set(next);
        }
    }
}
