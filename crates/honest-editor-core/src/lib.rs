//! Editor state synchronization for honest posts.
//!
//! An [`EditorSession`] mounts an external markdown editor engine, loads a
//! post into it, and keeps the post's body and title in step with what the
//! author types. Progress is broadcast on an [`EventBus`]. The session saves
//! drafts (validated, then title and body in that order) and publishes them
//! after the author confirms the publish options.
//!
//! Everything here is single-threaded. Collaborators ([`PostStore`],
//! [`Notifier`], [`ConfirmDialog`]) are traits so hosts can bring their own.

pub mod adapter;
pub mod document;
pub mod engine;
pub mod error;
pub mod events;
pub mod services;
pub mod session;
pub mod title;
pub mod workflow;

pub use adapter::EditorAdapter;
pub use document::{DocumentState, Post, PostField, PostStatus, PublishOptions};
pub use engine::{
    EditorEngine, EngineFactory, HeadlessEngine, HeadlessFactory, Store, StoreRecord, UploadConfig,
};
pub use error::{Dismissed, EditorError, PersistenceError, ValidationRejection};
pub use events::{ChangeChannel, EditorEvent, EventBus, LoadChannel, LoadState, SubscriptionId};
pub use services::{
    ConfirmDialog, ConfirmHandle, ConfirmResolver, MemoryPostStore, Notice, NoticeLevel, NoticeLog,
    Notifier, PostStore, StoreCall, StoreOp, TracingNotifier,
};
pub use session::EditorSession;
pub use title::{extract_heading, reconcile};
pub use workflow::{PublishOutcome, PublishWorkflow, SaveOutcome, SaveState, SaveWorkflow};
