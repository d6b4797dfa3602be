//! Bridge from the editor engine's record store to the session.

use std::cell::Cell;
use std::rc::Rc;

use crate::document::DocumentState;
use crate::engine::{EditorEngine, EngineFactory, RecordKind, StoreRecord, UploadConfig};
use crate::error::EditorError;
use crate::events::{EditorEvent, EventBus};

/// Owns the editor engine and translates its records into bus events.
pub struct EditorAdapter<F: EngineFactory> {
    factory: F,
    engine: Option<F::Engine>,
    /// Set once the engine reports its discussion is selected.
    loaded: Rc<Cell<bool>>,
    bus: EventBus,
    document: DocumentState,
}

impl<F: EngineFactory> EditorAdapter<F> {
    pub fn new(factory: F, bus: EventBus, document: DocumentState) -> Self {
        Self {
            factory,
            engine: None,
            loaded: Rc::new(Cell::new(false)),
            bus,
            document,
        }
    }

    /// Mount the engine and subscribe to its store.
    ///
    /// Returns false, doing nothing, if the engine is already mounted.
    pub fn initialize(
        &mut self,
        target_id: &str,
        upload: &honest_common::UploadConfig,
        token: Option<String>,
    ) -> bool {
        if self.engine.is_some() {
            tracing::debug!(target_id, "editor already initialized");
            return false;
        }

        if upload.require_auth && token.is_none() {
            tracing::warn!(target_id, "no upload token available, image uploads will be rejected");
        }

        let engine = self
            .factory
            .mount(target_id, UploadConfig::from_config(upload, token));

        let loaded = self.loaded.clone();
        let document = self.document.clone();
        let bus = self.bus.clone();
        engine
            .store()
            .subscribe(move |record| handle_record(record, &loaded, &document, &bus));

        tracing::debug!(target_id, "editor mounted");
        self.engine = Some(engine);
        true
    }

    pub fn is_mounted(&self) -> bool {
        self.engine.is_some()
    }

    /// Whether the engine has finished loading.
    pub fn is_loaded(&self) -> bool {
        self.loaded.get()
    }

    pub fn set_content(&mut self, markdown: &str) -> Result<(), EditorError> {
        let engine = self.engine.as_mut().ok_or(EditorError::NotInitialized)?;
        engine.set_content(markdown);
        Ok(())
    }

    pub fn content(&self) -> Option<String> {
        self.engine.as_ref().map(EditorEngine::content)
    }

    pub fn engine(&self) -> Option<&F::Engine> {
        self.engine.as_ref()
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }
}

fn handle_record(
    record: &StoreRecord,
    loaded: &Cell<bool>,
    document: &DocumentState,
    bus: &EventBus,
) {
    let kind = record.classify();
    metrics::counter!("honest_editor_records_total", "kind" => kind.as_str()).increment(1);

    match kind {
        // Always the last record of the load sequence.
        RecordKind::DiscussionReady => {
            if loaded.get() {
                return;
            }
            loaded.set(true);
            tracing::debug!("editor loaded");
            bus.editor_loaded().complete();
        }
        RecordKind::ContentPatched => {
            if !loaded.get() {
                tracing::trace!("content patch before load, ignoring");
                return;
            }
            let Some(markdown) = record.text() else {
                tracing::warn!(kind = %record.kind, "content patch without text payload");
                return;
            };
            if document.apply_markdown(markdown) {
                bus.editor_changed().next(EditorEvent::EditorChanged);
            }
        }
        RecordKind::Other => {
            tracing::trace!(kind = %record.kind, "ignoring record");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Post;
    use crate::engine::{HeadlessFactory, Store};

    struct Fixture {
        bus: EventBus,
        document: DocumentState,
        editor: EditorAdapter<HeadlessFactory>,
        store: Store,
    }

    fn fixture() -> Fixture {
        let bus = EventBus::new();
        let document = DocumentState::new(bus.clone());
        let factory = HeadlessFactory::new();
        let mut editor = EditorAdapter::new(factory.clone(), bus.clone(), document.clone());
        assert!(editor.initialize(
            "honest-editor",
            &honest_common::UploadConfig::default(),
            Some("t0k".into())
        ));
        let store = factory.store().unwrap();
        Fixture {
            bus,
            document,
            editor,
            store,
        }
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let mut f = fixture();
        assert!(!f.editor.initialize(
            "other",
            &honest_common::UploadConfig::default(),
            None
        ));
        assert_eq!(f.editor.factory().mounted_target().as_deref(), Some("honest-editor"));
        assert_eq!(f.store.subscriber_count(), 1);
    }

    #[test]
    fn test_engine_receives_upload_token() {
        let f = fixture();
        let upload = f.editor.engine().unwrap().upload();
        assert_eq!(upload.auth_header(), Some(("x-auth-token", "t0k")));
    }

    #[test]
    fn test_discussion_record_completes_editor_loaded_once() {
        let f = fixture();
        assert!(!f.editor.is_loaded());

        f.store.dispatch(&StoreRecord::discussion_ready("a"));
        f.store.dispatch(&StoreRecord::discussion_ready("b"));

        assert!(f.editor.is_loaded());
        assert!(f.bus.editor_loaded().is_completed());
    }

    #[test]
    fn test_patch_before_load_is_ignored() {
        let mut f = fixture();
        f.document
            .attach(Post::new(Some("Title".into()), "body"), &mut f.editor)
            .unwrap();

        f.store.dispatch(&StoreRecord::patch_item("# Early"));

        assert_eq!(f.bus.editor_changed().emitted(), 0);
        assert_eq!(f.document.current().unwrap().body_md, "body");
    }

    #[test]
    fn test_patch_without_post_is_ignored() {
        let f = fixture();
        f.store.dispatch(&StoreRecord::discussion_ready("a"));
        f.store.dispatch(&StoreRecord::patch_item("# Nobody"));
        assert_eq!(f.bus.editor_changed().emitted(), 0);
    }

    #[test]
    fn test_patch_updates_post_and_broadcasts() {
        let mut f = fixture();
        f.store.dispatch(&StoreRecord::discussion_ready("a"));
        f.document
            .attach(Post::new(Some("Hello".into()), "# Hello"), &mut f.editor)
            .unwrap();

        f.store.dispatch(&StoreRecord::patch_item("no heading here"));

        let post = f.document.current().unwrap();
        assert_eq!(post.title.as_deref(), Some("Hello"));
        assert_eq!(post.body, "no heading here");
        assert_eq!(post.body_md, "no heading here");
        assert_eq!(
            f.bus.editor_changed().current(),
            Some(EditorEvent::EditorChanged)
        );
    }

    #[test]
    fn test_malformed_and_foreign_records_are_ignored() {
        let mut f = fixture();
        f.store.dispatch(&StoreRecord::discussion_ready("a"));
        f.document
            .attach(Post::new(None, "body"), &mut f.editor)
            .unwrap();

        f.store
            .dispatch(&StoreRecord::new(crate::engine::PATCH_ITEM, serde_json::Value::Null));
        f.store
            .dispatch(&StoreRecord::new("layout/setFocusMode", serde_json::json!({"text": "# x"})));

        assert_eq!(f.bus.editor_changed().emitted(), 0);
        assert_eq!(f.document.current().unwrap().body_md, "body");
    }

    #[test]
    fn test_listener_can_read_post_on_change() {
        let mut f = fixture();
        f.store.dispatch(&StoreRecord::discussion_ready("a"));
        f.document
            .attach(Post::new(None, ""), &mut f.editor)
            .unwrap();

        let seen = Rc::new(std::cell::RefCell::new(None));
        let s = seen.clone();
        let document = f.document.clone();
        f.bus.editor_changed().subscribe(move |_| {
            *s.borrow_mut() = document.current().and_then(|p| p.title);
        });

        f.store.dispatch(&StoreRecord::patch_item("#Fresh"));
        assert_eq!(seen.borrow().as_deref(), Some("Fresh"));
    }

    #[test]
    fn test_content_passthrough() {
        let mut f = fixture();
        f.editor.set_content("raw").unwrap();
        assert_eq!(f.editor.content().as_deref(), Some("raw"));

        let bus = EventBus::new();
        let mut bare = EditorAdapter::new(
            HeadlessFactory::new(),
            bus.clone(),
            DocumentState::new(bus),
        );
        assert_eq!(bare.set_content("x"), Err(EditorError::NotInitialized));
        assert_eq!(bare.content(), None);
    }
}
