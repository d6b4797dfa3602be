//! The post being edited and the session's handle on it.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::adapter::EditorAdapter;
use crate::engine::EngineFactory;
use crate::error::EditorError;
use crate::events::EventBus;
use crate::title::reconcile;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    #[default]
    Draft,
    Published,
}

/// A post as the upstream service sees it.
///
/// `body_md` is the source of truth; `body` is kept equal to it on every
/// content change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: String,
    #[serde(rename = "bodyMD", default)]
    pub body_md: String,
    #[serde(default)]
    pub hashtags: BTreeSet<String>,
    #[serde(default)]
    pub has_paid_section: bool,
    /// Paragraph after which the paid section starts. `None` until publish.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_section_linebreak: Option<u32>,
    #[serde(default)]
    pub paid_section_cost: f64,
    #[serde(default)]
    pub status: PostStatus,
}

impl Post {
    pub fn new(title: Option<String>, markdown: impl Into<String>) -> Self {
        let markdown = markdown.into();
        Self {
            title,
            body: markdown.clone(),
            body_md: markdown,
            ..Default::default()
        }
    }

    pub fn is_published(&self) -> bool {
        self.status == PostStatus::Published
    }

    /// Set the paid section linebreak to 1 when unset or zero.
    pub fn ensure_paid_section_linebreak(&mut self) -> u32 {
        let linebreak = match self.paid_section_linebreak {
            Some(n) if n >= 1 => n,
            _ => 1,
        };
        self.paid_section_linebreak = Some(linebreak);
        linebreak
    }

    pub fn apply_publish_options(&mut self, options: PublishOptions) {
        self.hashtags = options.hashtags;
        self.has_paid_section = options.has_paid_section;
        self.paid_section_linebreak = Some(options.paid_section_linebreak.max(1));
        self.paid_section_cost = options.paid_section_cost;
    }
}

/// Fields the persistence service can save on their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PostField {
    Title,
    Body,
    PaidSection,
}

impl PostField {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Body => "body",
            Self::PaidSection => "paidSection",
        }
    }
}

impl fmt::Display for PostField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the publish confirmation hands back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishOptions {
    #[serde(default)]
    pub hashtags: BTreeSet<String>,
    #[serde(default)]
    pub has_paid_section: bool,
    #[serde(default = "default_linebreak")]
    pub paid_section_linebreak: u32,
    #[serde(default)]
    pub paid_section_cost: f64,
}

fn default_linebreak() -> u32 {
    1
}

struct Attached {
    live: Post,
    /// Deep copy taken at attach. Never written afterwards.
    original: Post,
    clean_title: Option<String>,
    clean_markdown: String,
}

/// Single-assignment holder for the session's post.
///
/// Clones share the same post.
#[derive(Clone)]
pub struct DocumentState {
    bus: EventBus,
    inner: Rc<RefCell<Option<Attached>>>,
}

impl DocumentState {
    pub fn new(bus: EventBus) -> Self {
        Self {
            bus,
            inner: Rc::default(),
        }
    }

    pub fn is_attached(&self) -> bool {
        self.inner.borrow().is_some()
    }

    /// Attach `post` to the session and push its markdown into the editor.
    ///
    /// Returns `Ok(false)` without touching anything if a post is already
    /// attached. Fails, leaving the session unattached, if the editor has not
    /// been initialized.
    pub fn attach<F: EngineFactory>(
        &self,
        post: Post,
        editor: &mut EditorAdapter<F>,
    ) -> Result<bool, EditorError> {
        if self.is_attached() {
            tracing::debug!(post_id = ?post.id, "post already attached, ignoring");
            return Ok(false);
        }
        if !editor.is_mounted() {
            return Err(EditorError::NotInitialized);
        }

        let markdown = post.body_md.clone();
        tracing::debug!(post_id = ?post.id, chars = markdown.chars().count(), "attaching post");
        *self.inner.borrow_mut() = Some(Attached {
            original: post.clone(),
            clean_title: post.title.clone(),
            clean_markdown: post.body_md.clone(),
            live: post,
        });

        editor.set_content(&markdown)?;
        self.bus.post_loaded().complete();
        Ok(true)
    }

    /// A copy of the live post.
    pub fn current(&self) -> Option<Post> {
        self.inner.borrow().as_ref().map(|a| a.live.clone())
    }

    pub fn with_current<R>(&self, f: impl FnOnce(&Post) -> R) -> Option<R> {
        self.inner.borrow().as_ref().map(|a| f(&a.live))
    }

    /// A copy of the post as it was attached.
    pub fn original(&self) -> Option<Post> {
        self.inner.borrow().as_ref().map(|a| a.original.clone())
    }

    pub fn original_title(&self) -> Option<String> {
        self.inner
            .borrow()
            .as_ref()
            .and_then(|a| a.original.title.clone())
    }

    /// True when title or markdown moved since attach or the last successful
    /// save.
    pub fn is_dirty(&self) -> bool {
        self.inner.borrow().as_ref().is_some_and(|a| {
            a.live.title != a.clean_title || a.live.body_md != a.clean_markdown
        })
    }

    /// Take new markdown from the editor and re-derive the title.
    ///
    /// Returns false when no post is attached.
    pub(crate) fn apply_markdown(&self, markdown: &str) -> bool {
        let mut inner = self.inner.borrow_mut();
        let Some(attached) = inner.as_mut() else {
            return false;
        };
        let title = reconcile(markdown, attached.original.title.as_deref());
        attached.live.body = markdown.to_owned();
        attached.live.body_md = markdown.to_owned();
        if attached.live.title != title {
            tracing::debug!(title = ?title, "title reconciled");
        }
        attached.live.title = title;
        true
    }

    pub(crate) fn update<R>(&self, f: impl FnOnce(&mut Post) -> R) -> Option<R> {
        self.inner.borrow_mut().as_mut().map(|a| f(&mut a.live))
    }

    /// Record `saved` as the persisted baseline for dirty tracking.
    pub(crate) fn mark_clean(&self, saved: &Post) {
        if let Some(attached) = self.inner.borrow_mut().as_mut() {
            attached.clean_title = saved.title.clone();
            attached.clean_markdown = saved.body_md.clone();
        }
    }
}

impl fmt::Debug for DocumentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentState")
            .field("attached", &self.is_attached())
            .field("dirty", &self.is_dirty())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::HeadlessFactory;

    fn mounted_editor(bus: &EventBus, document: &DocumentState) -> EditorAdapter<HeadlessFactory> {
        let mut editor = EditorAdapter::new(HeadlessFactory::new(), bus.clone(), document.clone());
        editor.initialize(
            "honest-editor",
            &honest_common::UploadConfig::default(),
            None,
        );
        editor
    }

    #[test]
    fn test_post_wire_shape() {
        let json = r#"{
            "id": 7,
            "title": "Hello world!",
            "body": "<p>x</p>",
            "bodyMD": "x",
            "hashtags": ["rust"],
            "hasPaidSection": true,
            "paidSectionCost": 0.5,
            "status": "draft"
        }"#;
        let post: Post = serde_json::from_str(json).unwrap();
        assert_eq!(post.id, Some(7));
        assert_eq!(post.body_md, "x");
        assert_eq!(post.paid_section_linebreak, None);
        assert!(post.has_paid_section);

        let back = serde_json::to_value(&post).unwrap();
        assert_eq!(back["bodyMD"], "x");
        assert_eq!(back["status"], "draft");
        assert!(back.get("paidSectionLinebreak").is_none());
    }

    #[test]
    fn test_linebreak_defaults_to_one() {
        let mut post = Post::default();
        assert_eq!(post.ensure_paid_section_linebreak(), 1);

        post.paid_section_linebreak = Some(0);
        assert_eq!(post.ensure_paid_section_linebreak(), 1);

        post.paid_section_linebreak = Some(4);
        assert_eq!(post.ensure_paid_section_linebreak(), 4);
    }

    #[test]
    fn test_publish_options_clamp_linebreak() {
        let mut post = Post::default();
        post.apply_publish_options(PublishOptions {
            paid_section_linebreak: 0,
            ..Default::default()
        });
        assert_eq!(post.paid_section_linebreak, Some(1));
    }

    #[test]
    fn test_attach_is_single_assignment() {
        let bus = EventBus::new();
        let document = DocumentState::new(bus.clone());
        let mut editor = mounted_editor(&bus, &document);

        let first = Post::new(Some("First post title".into()), "first body");
        let second = Post::new(Some("Second".into()), "second body");

        assert_eq!(document.attach(first.clone(), &mut editor), Ok(true));
        assert_eq!(document.attach(second, &mut editor), Ok(false));

        assert_eq!(document.current(), Some(first));
        assert_eq!(editor.content().as_deref(), Some("first body"));
        assert!(bus.post_loaded().is_completed());
    }

    #[test]
    fn test_attach_before_editor_fails_without_consuming() {
        let bus = EventBus::new();
        let document = DocumentState::new(bus.clone());
        let mut editor = EditorAdapter::new(HeadlessFactory::new(), bus.clone(), document.clone());

        let post = Post::new(None, "body");
        assert_eq!(
            document.attach(post.clone(), &mut editor),
            Err(EditorError::NotInitialized)
        );
        assert!(!document.is_attached());
        assert!(!bus.post_loaded().is_completed());

        editor.initialize("honest-editor", &honest_common::UploadConfig::default(), None);
        assert_eq!(document.attach(post, &mut editor), Ok(true));
    }

    #[test]
    fn test_snapshot_does_not_alias_live_post() {
        let bus = EventBus::new();
        let document = DocumentState::new(bus.clone());
        let mut editor = mounted_editor(&bus, &document);
        document
            .attach(Post::new(Some("Original".into()), "old"), &mut editor)
            .unwrap();

        assert!(document.apply_markdown("# Replaced"));
        document.update(|post| post.hashtags.insert("x".into()));

        let original = document.original().unwrap();
        assert_eq!(original.title.as_deref(), Some("Original"));
        assert_eq!(original.body_md, "old");
        assert!(original.hashtags.is_empty());
        assert_eq!(
            document.current().unwrap().title.as_deref(),
            Some(" Replaced")
        );
    }

    #[test]
    fn test_apply_markdown_without_post() {
        let document = DocumentState::new(EventBus::new());
        assert!(!document.apply_markdown("# Orphan"));
    }

    #[test]
    fn test_dirty_tracking() {
        let bus = EventBus::new();
        let document = DocumentState::new(bus.clone());
        let mut editor = mounted_editor(&bus, &document);
        assert!(!document.is_dirty());

        document
            .attach(Post::new(Some(" Same".into()), "# Same"), &mut editor)
            .unwrap();
        assert!(!document.is_dirty());

        document.apply_markdown("# Same\n\nmore");
        assert!(document.is_dirty());

        let saved = document.current().unwrap();
        document.mark_clean(&saved);
        assert!(!document.is_dirty());
    }
}
