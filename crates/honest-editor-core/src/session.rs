//! The editor service: one post, one editor, and the workflows over them.

use std::cell::Cell;

use honest_common::{Config, CredentialStore, EnvCredentialStore};

use crate::adapter::EditorAdapter;
use crate::document::{DocumentState, Post};
use crate::engine::EngineFactory;
use crate::error::EditorError;
use crate::events::EventBus;
use crate::services::{ConfirmDialog, Notifier, PostStore};
use crate::workflow::{PublishOutcome, PublishWorkflow, SaveOutcome, SaveState, SaveWorkflow};

/// An editing session.
///
/// Call [`set_editor`](Self::set_editor) to mount the engine, then
/// [`set_post`](Self::set_post) to load the post into it. The session is not
/// `Send`; drive it from a current-thread runtime.
pub struct EditorSession<F: EngineFactory, P, N, D> {
    config: Config,
    credentials: Box<dyn CredentialStore>,
    bus: EventBus,
    document: DocumentState,
    editor: EditorAdapter<F>,
    store: P,
    notifier: N,
    dialog: D,
    save_state: Cell<SaveState>,
}

impl<F, P, N, D> EditorSession<F, P, N, D>
where
    F: EngineFactory,
    P: PostStore,
    N: Notifier,
    D: ConfirmDialog,
{
    /// Credentials come from the environment until
    /// [`with_credentials`](Self::with_credentials) says otherwise.
    pub fn new(config: Config, factory: F, store: P, notifier: N, dialog: D) -> Self {
        let bus = EventBus::new();
        let document = DocumentState::new(bus.clone());
        let editor = EditorAdapter::new(factory, bus.clone(), document.clone());
        Self {
            config,
            credentials: Box::new(EnvCredentialStore),
            bus,
            document,
            editor,
            store,
            notifier,
            dialog,
            save_state: Cell::new(SaveState::Idle),
        }
    }

    pub fn with_credentials(mut self, credentials: impl CredentialStore + 'static) -> Self {
        self.credentials = Box::new(credentials);
        self
    }

    /// Mount the editor on `target_id`. Later calls do nothing and return
    /// false.
    pub fn set_editor(&mut self, target_id: &str) -> bool {
        if self.editor.is_mounted() {
            tracing::debug!(target_id, "editor already initialized");
            return false;
        }
        let token = self.credentials.user_token();
        self.editor.initialize(target_id, &self.config.upload, token)
    }

    /// Mount the editor on the configured mount id.
    pub fn set_editor_default(&mut self) -> bool {
        let target_id = self.config.editor.mount_id.clone();
        self.set_editor(&target_id)
    }

    /// Load `post` into the session. Only the first post is taken.
    pub fn set_post(&mut self, post: Post) -> Result<bool, EditorError> {
        self.document.attach(post, &mut self.editor)
    }

    pub fn post(&self) -> Option<Post> {
        self.document.current()
    }

    pub fn original_title(&self) -> Option<String> {
        self.document.original_title()
    }

    pub fn is_dirty(&self) -> bool {
        self.document.is_dirty()
    }

    pub fn document(&self) -> &DocumentState {
        &self.document
    }

    pub fn editor(&self) -> &EditorAdapter<F> {
        &self.editor
    }

    pub fn event_streams(&self) -> &EventBus {
        &self.bus
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &P {
        &self.store
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn dialog(&self) -> &D {
        &self.dialog
    }

    pub fn content(&self) -> Option<String> {
        self.editor.content()
    }

    pub fn set_content(&mut self, markdown: &str) -> Result<(), EditorError> {
        self.editor.set_content(markdown)
    }

    pub fn save_state(&self) -> SaveState {
        self.save_state.get()
    }

    pub async fn save_draft(&self) -> Result<SaveOutcome, EditorError> {
        self.save_workflow().run().await
    }

    /// [`save_draft`](Self::save_draft), calling exactly one of the two
    /// continuations when it settles.
    pub async fn save_draft_with(
        &self,
        on_saved: impl FnOnce(),
        on_failed: impl FnOnce(),
    ) -> Result<SaveOutcome, EditorError> {
        self.save_workflow().run_with(on_saved, on_failed).await
    }

    pub async fn publish_post(&self) -> Result<PublishOutcome, EditorError> {
        PublishWorkflow::new(self.save_workflow(), &self.dialog)
            .run()
            .await
    }

    fn save_workflow(&self) -> SaveWorkflow<'_, P, N> {
        SaveWorkflow::new(&self.document, &self.bus, &self.store, &self.notifier)
            .with_limits(self.config.validation)
            .tracking(&self.save_state)
    }
}
