//! Save and publish workflows.
//!
//! Both run against the session's [`DocumentState`](crate::DocumentState) and
//! report through the bus and the notifier. Neither lets a persistence error
//! escape: every run ends in an outcome, and the post stays attached and
//! editable so the author can try again.

mod publish;
mod save;


pub use publish::{PublishOutcome, PublishWorkflow};
pub use save::{SaveOutcome, SaveState, SaveWorkflow, validate};

pub(crate) const SAVING: &str = "Saving...";
pub(crate) const SAVED: &str = "Saved.";
pub(crate) const SAVE_FAILED: &str = "There was a problem with saving.";
pub(crate) const PUBLISHING: &str = "Publishing...";
pub(crate) const PUBLISHED: &str = "Published.";
pub(crate) const PUBLISH_CANCELLED: &str = "Publishing was cancelled.";
