//! Actions a TARS worker can be given.

pub mod file_tools;
pub mod process_tools;
pub mod registry;
pub mod traits;

pub use file_tools::{FileListAction, FileReadAction, FileWriteAction};
pub use process_tools::RunCommandAction;
pub use registry::ActionRegistry;
pub use traits::{required_str, Action};

use std::path::PathBuf;
use std::sync::Arc;

/// Registry with every built-in action, rooted at `sandbox`.
pub fn default_registry(sandbox: impl Into<PathBuf>) -> ActionRegistry {
    let sandbox = sandbox.into();
    let mut registry = ActionRegistry::new();
    registry.register(Arc::new(FileReadAction::new(sandbox.clone())));
    registry.register(Arc::new(FileWriteAction::new(sandbox.clone())));
    registry.register(Arc::new(FileListAction::new(sandbox.clone())));
    registry.register(Arc::new(RunCommandAction::new(sandbox)));
    registry
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use tars_core::{ActionDispatcher, ActionInput};

    #[test]
    fn test_default_registry_has_builtins() {
        let registry = default_registry("/tmp");
        assert_eq!(
            registry.names(),
            vec!["file_list", "file_read", "file_write", "run_command"]
        );
    }

    #[tokio::test]
    async fn test_default_registry_dispatches_into_sandbox() {
        let sandbox = tempfile::TempDir::new().unwrap();
        let registry = default_registry(sandbox.path());

        let mut input = ActionInput::new();
        input.insert("path".to_string(), serde_json::json!("hello.txt"));
        input.insert("content".to_string(), serde_json::json!("hi"));
        registry.dispatch("file_write", &input).await.unwrap();

        assert!(sandbox.path().join("hello.txt").exists());
    }
}
