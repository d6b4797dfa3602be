//! Collaborators the workflows call out to: persistence, notices, and the
//! publish confirmation.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use tokio::sync::oneshot;

use crate::document::{Post, PostField, PublishOptions};
use crate::error::{Dismissed, PersistenceError};

/// Persistence service for posts.
pub trait PostStore {
    /// Persist a single field of `post`.
    fn save_post_property(
        &self,
        post: &Post,
        field: PostField,
    ) -> impl Future<Output = Result<(), PersistenceError>>;

    /// Persist the whole post and flip it to published.
    fn publish_post(&self, post: &Post) -> impl Future<Output = Result<(), PersistenceError>>;
}

/// Fire-and-forget user notices.
pub trait Notifier {
    fn info(&self, message: &str);
    fn success(&self, message: &str);
    fn error(&self, message: &str);
}

/// Opens the publish confirmation for a post.
pub trait ConfirmDialog {
    fn open(&self, post: &Post) -> ConfirmHandle;
}

/// Pending result of a publish confirmation.
///
/// Resolves to the chosen options, or [`Dismissed`] if the resolver is
/// dismissed or dropped.
#[derive(Debug)]
pub struct ConfirmHandle {
    rx: oneshot::Receiver<PublishOptions>,
}

/// The dialog's side of a [`ConfirmHandle`].
#[derive(Debug)]
pub struct ConfirmResolver {
    tx: oneshot::Sender<PublishOptions>,
}

impl ConfirmHandle {
    pub fn channel() -> (ConfirmResolver, ConfirmHandle) {
        let (tx, rx) = oneshot::channel();
        (ConfirmResolver { tx }, ConfirmHandle { rx })
    }

    /// A handle that is already confirmed with `options`.
    pub fn confirmed(options: PublishOptions) -> Self {
        let (resolver, handle) = Self::channel();
        resolver.confirm(options);
        handle
    }

    /// A handle that is already dismissed.
    pub fn dismissed() -> Self {
        let (resolver, handle) = Self::channel();
        resolver.dismiss();
        handle
    }

    pub async fn result(self) -> Result<PublishOptions, Dismissed> {
        self.rx.await.map_err(|_| Dismissed)
    }
}

impl ConfirmResolver {
    /// Returns false if the handle was already dropped.
    pub fn confirm(self, options: PublishOptions) -> bool {
        self.tx.send(options).is_ok()
    }

    pub fn dismiss(self) {
        drop(self.tx);
    }
}

/// Notifier that writes notices to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn info(&self, message: &str) {
        tracing::info!(target: "honest::notice", "{message}");
    }

    fn success(&self, message: &str) {
        tracing::info!(target: "honest::notice", success = true, "{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "honest::notice", "{message}");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.level {
            NoticeLevel::Info => "info",
            NoticeLevel::Success => "success",
            NoticeLevel::Error => "error",
        };
        write!(f, "{level}: {}", self.message)
    }
}

/// Notifier that keeps every notice, for hosts that render them later.
///
/// Clones share the log.
#[derive(Debug, Clone, Default)]
pub struct NoticeLog {
    notices: Rc<RefCell<Vec<Notice>>>,
}

impl NoticeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.borrow().clone()
    }

    /// Remove and return everything logged so far.
    pub fn drain(&self) -> Vec<Notice> {
        std::mem::take(&mut *self.notices.borrow_mut())
    }

    /// One notice per line, `level: message`.
    pub fn transcript(&self) -> String {
        self.notices
            .borrow()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn push(&self, level: NoticeLevel, message: &str) {
        self.notices.borrow_mut().push(Notice {
            level,
            message: message.to_owned(),
        });
    }
}

impl Notifier for NoticeLog {
    fn info(&self, message: &str) {
        self.push(NoticeLevel::Info, message);
    }

    fn success(&self, message: &str) {
        self.push(NoticeLevel::Success, message);
    }

    fn error(&self, message: &str) {
        self.push(NoticeLevel::Error, message);
    }
}

/// A persistence operation, for scripting failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    SaveProperty(PostField),
    Publish,
}

/// A call received by [`MemoryPostStore`], with the post as it was passed.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreCall {
    pub op: StoreOp,
    pub post: Post,
}

type CallHook = dyn Fn(&StoreCall);

/// In-memory persistence service.
///
/// Records every call and fails the operations it was told to fail. Clones
/// share state.
#[derive(Clone, Default)]
pub struct MemoryPostStore {
    calls: Rc<RefCell<Vec<StoreCall>>>,
    failing: Rc<RefCell<HashSet<StoreOp>>>,
    hook: Rc<RefCell<Option<Rc<CallHook>>>>,
}

impl MemoryPostStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later `op` call fail.
    pub fn fail(&self, op: StoreOp) {
        self.failing.borrow_mut().insert(op);
    }

    pub fn recover(&self, op: StoreOp) {
        self.failing.borrow_mut().remove(&op);
    }

    /// Run `hook` on every call, after it is recorded and before it settles.
    pub fn on_call(&self, hook: impl Fn(&StoreCall) + 'static) {
        *self.hook.borrow_mut() = Some(Rc::new(hook));
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.borrow().clone()
    }

    pub fn ops(&self) -> Vec<StoreOp> {
        self.calls.borrow().iter().map(|c| c.op).collect()
    }

    fn record(&self, op: StoreOp, post: &Post) -> bool {
        let call = StoreCall {
            op,
            post: post.clone(),
        };
        self.calls.borrow_mut().push(call.clone());
        let hook = self.hook.borrow().clone();
        if let Some(hook) = hook {
            hook(&call);
        }
        !self.failing.borrow().contains(&op)
    }
}

impl fmt::Debug for MemoryPostStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryPostStore")
            .field("calls", &self.calls.borrow().len())
            .field("failing", &self.failing.borrow())
            .finish()
    }
}

impl PostStore for MemoryPostStore {
    async fn save_post_property(&self, post: &Post, field: PostField) -> Result<(), PersistenceError> {
        if self.record(StoreOp::SaveProperty(field), post) {
            Ok(())
        } else {
            Err(PersistenceError::save_property(field, "memory store told to fail"))
        }
    }

    async fn publish_post(&self, post: &Post) -> Result<(), PersistenceError> {
        if self.record(StoreOp::Publish, post) {
            Ok(())
        } else {
            Err(PersistenceError::publish("memory store told to fail"))
        }
    }
}
