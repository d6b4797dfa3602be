//! Editor engine seam.
//!
//! The rich-text editor is an external component. The core talks to it through
//! [`EditorEngine`] (content access plus a record [`Store`]) and builds it with
//! an [`EngineFactory`]. [`HeadlessEngine`] is the in-process implementation
//! used for replaying record logs.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Record type the engine dispatches once its discussion is selected. It is
/// always the last record of the load sequence.
pub const SET_CURRENT_DISCUSSION_ID: &str = "discussion/setCurrentDiscussionId";

/// Record type dispatched whenever the content item is patched.
pub const PATCH_ITEM: &str = "content/patchItem";

/// A typed state-change record from the engine's store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreRecord {
    #[serde(rename = "type")]
    pub kind: SmolStr,
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Classification of a record for the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// The editor finished loading.
    DiscussionReady,
    /// Content changed.
    ContentPatched,
    Other,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DiscussionReady => "discussion_ready",
            Self::ContentPatched => "content_patched",
            Self::Other => "other",
        }
    }
}

impl StoreRecord {
    pub fn new(kind: impl Into<SmolStr>, payload: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }

    pub fn discussion_ready(discussion_id: impl Into<String>) -> Self {
        Self::new(
            SET_CURRENT_DISCUSSION_ID,
            serde_json::Value::String(discussion_id.into()),
        )
    }

    pub fn patch_item(text: impl Into<String>) -> Self {
        Self::new(PATCH_ITEM, serde_json::json!({ "text": text.into() }))
    }

    pub fn classify(&self) -> RecordKind {
        match self.kind.as_str() {
            SET_CURRENT_DISCUSSION_ID => RecordKind::DiscussionReady,
            PATCH_ITEM => RecordKind::ContentPatched,
            _ => RecordKind::Other,
        }
    }

    /// The `text` field of the payload, for content patches.
    pub fn text(&self) -> Option<&str> {
        self.payload.get("text").and_then(serde_json::Value::as_str)
    }
}

type StoreListener = dyn FnMut(&StoreRecord);

/// Subscribable record store.
///
/// `dispatch` hands the record to every subscriber before returning. Records
/// are never queued, so subscribers observe them in dispatch order.
#[derive(Clone, Default)]
pub struct Store {
    listeners: Rc<RefCell<Vec<Rc<RefCell<StoreListener>>>>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: impl FnMut(&StoreRecord) + 'static) {
        self.listeners
            .borrow_mut()
            .push(Rc::new(RefCell::new(listener)));
    }

    pub fn dispatch(&self, record: &StoreRecord) {
        let listeners = self.listeners.borrow().clone();
        for listener in listeners {
            match listener.try_borrow_mut() {
                Ok(mut f) => (&mut *f)(record),
                Err(_) => tracing::warn!(kind = %record.kind, "dropping re-entrant dispatch"),
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners.borrow().len()
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Upload settings the engine is constructed with.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadConfig {
    pub url: String,
    pub require_auth: bool,
    /// Header carrying the token.
    pub token_key: String,
    pub token: Option<String>,
}

impl UploadConfig {
    pub fn from_config(config: &honest_common::UploadConfig, token: Option<String>) -> Self {
        Self {
            url: config.url.clone(),
            require_auth: config.require_auth,
            token_key: config.token_key.clone(),
            token,
        }
    }

    /// Headers to attach to an upload request. Empty if auth is required but
    /// no token is available.
    pub fn auth_header(&self) -> Option<(&str, &str)> {
        if !self.require_auth {
            return None;
        }
        self.token
            .as_deref()
            .map(|token| (self.token_key.as_str(), token))
    }
}

/// The external rich-text editor.
pub trait EditorEngine {
    /// The engine's record store.
    fn store(&self) -> &Store;

    fn set_content(&mut self, markdown: &str);

    fn content(&self) -> String;
}

/// Constructs an engine bound to a mount point.
pub trait EngineFactory {
    type Engine: EditorEngine;

    fn mount(&self, target_id: &str, upload: UploadConfig) -> Self::Engine;
}

/// Engine without a UI. Records are fed in through its store.
#[derive(Debug, Clone)]
pub struct HeadlessEngine {
    target_id: String,
    upload: UploadConfig,
    content: String,
    store: Store,
}

impl HeadlessEngine {
    pub fn new(target_id: impl Into<String>, upload: UploadConfig) -> Self {
        Self {
            target_id: target_id.into(),
            upload,
            content: String::new(),
            store: Store::new(),
        }
    }

    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    pub fn upload(&self) -> &UploadConfig {
        &self.upload
    }
}

impl EditorEngine for HeadlessEngine {
    fn store(&self) -> &Store {
        &self.store
    }

    // Programmatic content changes do not echo a patch record.
    fn set_content(&mut self, markdown: &str) {
        self.content = markdown.to_owned();
    }

    fn content(&self) -> String {
        self.content.clone()
    }
}

/// Builds [`HeadlessEngine`]s and remembers the last mounted engine's store so
/// a driver can dispatch records into it.
#[derive(Debug, Clone, Default)]
pub struct HeadlessFactory {
    mounted: Rc<RefCell<Option<Mounted>>>,
}

#[derive(Debug, Clone)]
struct Mounted {
    target_id: String,
    upload: UploadConfig,
    store: Store,
}

impl HeadlessFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store of the most recently mounted engine.
    pub fn store(&self) -> Option<Store> {
        self.mounted.borrow().as_ref().map(|m| m.store.clone())
    }

    pub fn mounted_target(&self) -> Option<String> {
        self.mounted.borrow().as_ref().map(|m| m.target_id.clone())
    }

    pub fn mounted_upload(&self) -> Option<UploadConfig> {
        self.mounted.borrow().as_ref().map(|m| m.upload.clone())
    }
}

impl EngineFactory for HeadlessFactory {
    type Engine = HeadlessEngine;

    fn mount(&self, target_id: &str, upload: UploadConfig) -> HeadlessEngine {
        let engine = HeadlessEngine::new(target_id, upload.clone());
        *self.mounted.borrow_mut() = Some(Mounted {
            target_id: target_id.to_owned(),
            upload,
            store: engine.store.clone(),
        });
        engine
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_classification() {
        assert_eq!(
            StoreRecord::discussion_ready("d1").classify(),
            RecordKind::DiscussionReady
        );
        assert_eq!(
            StoreRecord::patch_item("x").classify(),
            RecordKind::ContentPatched
        );
        assert_eq!(
            StoreRecord::new("layout/toggleSidePreview", serde_json::Value::Null).classify(),
            RecordKind::Other
        );
    }

    #[test]
    fn test_record_from_json() {
        let record: StoreRecord =
            serde_json::from_str(r##"{"type":"content/patchItem","payload":{"text":"# Hi"}}"##)
                .unwrap();
        assert_eq!(record.classify(), RecordKind::ContentPatched);
        assert_eq!(record.text(), Some("# Hi"));

        let bare: StoreRecord = serde_json::from_str(r#"{"type":"content/patchItem"}"#).unwrap();
        assert_eq!(bare.text(), None);
    }

    #[test]
    fn test_store_dispatch_in_order() {
        let store = Store::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        store.subscribe(move |r| s.borrow_mut().push(r.kind.clone()));

        store.dispatch(&StoreRecord::patch_item("a"));
        store.dispatch(&StoreRecord::discussion_ready("d"));

        assert_eq!(
            *seen.borrow(),
            vec![SmolStr::new(PATCH_ITEM), SmolStr::new(SET_CURRENT_DISCUSSION_ID)]
        );
    }

    #[test]
    fn test_headless_factory_exposes_mounted_store() {
        let factory = HeadlessFactory::new();
        assert!(factory.store().is_none());

        let upload = UploadConfig::from_config(
            &honest_common::UploadConfig::default(),
            Some("t0k".into()),
        );
        let mut engine = factory.mount("honest-editor", upload);
        engine.set_content("body");

        assert_eq!(engine.content(), "body");
        assert_eq!(factory.mounted_target().as_deref(), Some("honest-editor"));
        let store = factory.store().unwrap();
        store.subscribe(|_| {});
        assert_eq!(engine.store().subscriber_count(), 1);
    }

    #[test]
    fn test_auth_header() {
        let upload = UploadConfig::from_config(
            &honest_common::UploadConfig::default(),
            Some("t0k".into()),
        );
        assert_eq!(upload.auth_header(), Some(("x-auth-token", "t0k")));

        let anonymous = UploadConfig {
            token: None,
            ..upload.clone()
        };
        assert_eq!(anonymous.auth_header(), None);

        let open = UploadConfig {
            require_auth: false,
            ..upload
        };
        assert_eq!(open.auth_header(), None);
    }
}
