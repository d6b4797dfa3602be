use crate::document::{PostField, PostStatus};
use crate::error::{EditorError, PersistenceError};
use crate::events::EditorEvent;
use crate::services::{ConfirmDialog, Notifier, PostStore};

use super::save::{SaveOutcome, SaveWorkflow};
use super::{PUBLISH_CANCELLED, PUBLISHED, PUBLISHING, SAVE_FAILED};

#[derive(Debug)]
pub enum PublishOutcome {
    Published,
    /// The author closed the confirmation.
    Dismissed,
    /// The save that precedes publishing did not go through.
    NotSaved(SaveOutcome),
    Failed(PersistenceError),
}

impl PublishOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, Self::Published)
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Published => "published",
            Self::Dismissed => "dismissed",
            Self::NotSaved(_) => "not_saved",
            Self::Failed(_) => "failed",
        }
    }
}

/// Save, confirm with the author, then publish.
pub struct PublishWorkflow<'a, P, N, D> {
    save: SaveWorkflow<'a, P, N>,
    dialog: &'a D,
}

impl<'a, P: PostStore, N: Notifier, D: ConfirmDialog> PublishWorkflow<'a, P, N, D> {
    pub fn new(save: SaveWorkflow<'a, P, N>, dialog: &'a D) -> Self {
        Self { save, dialog }
    }

    pub async fn run(&self) -> Result<PublishOutcome, EditorError> {
        let outcome = self.run_inner().await?;
        metrics::counter!("honest_editor_publishes_total", "outcome" => outcome.label())
            .increment(1);
        Ok(outcome)
    }

    async fn run_inner(&self) -> Result<PublishOutcome, EditorError> {
        let document = self.save.document();
        let bus = self.save.bus();
        let store = self.save.store();
        let notifier = self.save.notifier();

        let saved = self.save.run().await?;
        if !saved.is_saved() {
            tracing::info!("publish stopped, post not saved");
            notifier.info(PUBLISH_CANCELLED);
            return Ok(PublishOutcome::NotSaved(saved));
        }

        let post = document
            .update(|post| {
                post.ensure_paid_section_linebreak();
                post.clone()
            })
            .ok_or(EditorError::NoPost)?;

        tracing::debug!(post_id = ?post.id, "awaiting publish confirmation");
        let options = match self.dialog.open(&post).result().await {
            Ok(options) => options,
            Err(_) => {
                tracing::info!(post_id = ?post.id, "publish dismissed");
                bus.post_changed().next(EditorEvent::PublishCancelled);
                return Ok(PublishOutcome::Dismissed);
            }
        };

        let post = document
            .update(|post| {
                post.apply_publish_options(options);
                post.clone()
            })
            .ok_or(EditorError::NoPost)?;

        if let Err(err) = store.save_post_property(&post, PostField::PaidSection).await {
            return Ok(self.fail(err));
        }

        notifier.info(PUBLISHING);
        let post = document.current().ok_or(EditorError::NoPost)?;
        if let Err(err) = store.publish_post(&post).await {
            return Ok(self.fail(err));
        }

        document.mark_clean(&post);
        document.update(|post| post.status = PostStatus::Published);
        tracing::info!(post_id = ?post.id, "post published");
        notifier.success(PUBLISHED);
        bus.post_changed().next(EditorEvent::PostPublished);
        Ok(PublishOutcome::Published)
    }

    fn fail(&self, err: PersistenceError) -> PublishOutcome {
        tracing::warn!(error = %err, "publish failed");
        self.save.bus().post_changed().next(EditorEvent::PublishCancelled);
        self.save.notifier().error(SAVE_FAILED);
        PublishOutcome::Failed(err)
    }
}
