//! Error types for the editor core.

use miette::Diagnostic;
use thiserror::Error;

use crate::document::PostField;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Misuse of the session API.
#[derive(Debug, Error, Diagnostic, PartialEq, Eq)]
pub enum EditorError {
    #[error("editor is not initialized")]
    #[diagnostic(
        code(editor::not_initialized),
        help("call `set_editor` before loading a post")
    )]
    NotInitialized,

    #[error("no post is attached to this session")]
    #[diagnostic(code(editor::no_post), help("call `set_post` first"))]
    NoPost,
}

/// Why the save gates turned a document away.
///
/// The `Display` text is the notice shown to the author.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationRejection {
    #[error("The story needs to be at least {min} characters.")]
    BodyTooShort { min: usize, actual: usize },

    #[error("The story needs to have a title. Please write a heading in your story.")]
    MissingTitle,

    #[error("The title is too short. Please keep it longer than {} characters.", .min.saturating_sub(1))]
    TitleTooShort { min: usize, actual: usize },
}

/// A persistence call failed.
#[derive(Debug, Error, Diagnostic)]
pub enum PersistenceError {
    #[error("failed to save `{field}`")]
    #[diagnostic(code(persistence::save_property))]
    SaveProperty {
        field: PostField,
        #[source]
        source: BoxError,
    },

    #[error("failed to publish post")]
    #[diagnostic(code(persistence::publish))]
    Publish {
        #[source]
        source: BoxError,
    },
}

impl PersistenceError {
    pub fn save_property(field: PostField, source: impl Into<BoxError>) -> Self {
        Self::SaveProperty {
            field,
            source: source.into(),
        }
    }

    pub fn publish(source: impl Into<BoxError>) -> Self {
        Self::Publish {
            source: source.into(),
        }
    }
}

/// The author closed the publish confirmation without confirming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("publish confirmation was dismissed")]
pub struct Dismissed;
