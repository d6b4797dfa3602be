use honest_editor_core::{ConfirmDialog, ConfirmHandle, Notifier, Post, PublishOptions};

/// Prints notices to stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn info(&self, message: &str) {
        println!("→ {message}");
    }

    fn success(&self, message: &str) {
        println!("✓ {message}");
    }

    fn error(&self, message: &str) {
        println!("✗ {message}");
    }
}

/// Answers the publish confirmation from options given up front.
///
/// Without options every confirmation is dismissed.
#[derive(Debug, Clone, Default)]
pub struct OptionsDialog {
    options: Option<PublishOptions>,
}

impl OptionsDialog {
    pub fn new(options: Option<PublishOptions>) -> Self {
        Self { options }
    }
}

impl ConfirmDialog for OptionsDialog {
    fn open(&self, post: &Post) -> ConfirmHandle {
        let title = post.title.as_deref().unwrap_or_default();
        match &self.options {
            Some(options) => {
                tracing::info!(title, hashtags = options.hashtags.len(), "confirming publish");
                ConfirmHandle::confirmed(options.clone())
            }
            None => {
                println!("⚠ No publish options given, not publishing \"{}\"", title.trim());
                ConfirmHandle::dismissed()
            }
        }
    }
}
