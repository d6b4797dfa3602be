//! Persistence into a local directory, one JSON file per call.

use std::path::{Path, PathBuf};

use honest_editor_core::error::BoxError;
use honest_editor_core::{PersistenceError, Post, PostField, PostStore};
use serde::Serialize;
use serde_json::json;

/// Writes `<dir>/<field>.json` for property saves and `<dir>/published.json`
/// on publish. Later writes overwrite earlier ones.
#[derive(Debug, Clone)]
pub struct FilePostStore {
    dir: PathBuf,
}

impl FilePostStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl PostStore for FilePostStore {
    async fn save_post_property(&self, post: &Post, field: PostField) -> Result<(), PersistenceError> {
        let path = self.dir.join(format!("{field}.json"));
        write_json(&path, &field_value(post, field))
            .await
            .map_err(|e| PersistenceError::save_property(field, e))?;
        tracing::debug!(path = %path.display(), %field, "saved post property");
        Ok(())
    }

    async fn publish_post(&self, post: &Post) -> Result<(), PersistenceError> {
        let path = self.dir.join("published.json");
        write_json(&path, post)
            .await
            .map_err(PersistenceError::publish)?;
        tracing::debug!(path = %path.display(), "published post");
        Ok(())
    }
}

/// The part of `post` a property save sends.
fn field_value(post: &Post, field: PostField) -> serde_json::Value {
    match field {
        PostField::Title => json!({
            "id": post.id,
            "title": post.title,
        }),
        PostField::Body => json!({
            "id": post.id,
            "body": post.body,
            "bodyMD": post.body_md,
        }),
        PostField::PaidSection => json!({
            "id": post.id,
            "hasPaidSection": post.has_paid_section,
            "paidSectionLinebreak": post.paid_section_linebreak,
            "paidSectionCost": post.paid_section_cost,
            "hashtags": post.hashtags,
        }),
    }
}

pub async fn write_json(path: &Path, value: &impl Serialize) -> Result<(), BoxError> {
    let bytes = serde_json::to_vec_pretty(value)?;
    tokio::fs::write(path, bytes).await?;
    Ok(())
}
