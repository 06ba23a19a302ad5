//! Integration tests for the prompt packer.
//!
//! These tests use an async-aware MPSC channel from `tokio::sync` to avoid
//! deadlocks between the test thread and the application's async tasks.

use prompt_packer::app::{self, events::UserEvent, proxy::EventProxy, state::AppState};
use prompt_packer::config::AppConfig;
use prompt_packer::core::{CorpusBuilder, FileDiscovery, FormatOptions, SelectionTree};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;

/// Contains the test infrastructure.
mod helpers {
    use super::*;
    use async_trait::async_trait;
    use prompt_packer::app::sinks::OutputSink;
    use std::fs;

    /// A test double for the host, backed by a tokio MPSC channel.
    #[derive(Clone)]
    pub struct TestEventProxy {
        pub sender: mpsc::UnboundedSender<UserEvent>,
    }

    impl EventProxy for TestEventProxy {
        fn send_event(&self, event: UserEvent) {
            if let Err(e) = self.sender.send(event) {
                // Panic in a test if the receiver is dropped, as it indicates a test setup error.
                panic!("Test receiver dropped: {}", e);
            }
        }
    }

    /// Records copied text instead of touching the real clipboard.
    #[derive(Default)]
    pub struct RecordingSink {
        pub copied: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl OutputSink for RecordingSink {
        async fn copy_text(&self, text: &str) -> anyhow::Result<()> {
            self.copied.lock().unwrap().push(text.to_string());
            Ok(())
        }

        async fn present_markdown(&self, _text: &str) -> anyhow::Result<()> {
            Ok(())
        }
    }

    /// `TestHarness` sets up a complete, isolated environment for each test case.
    pub struct TestHarness {
        pub state: Arc<Mutex<AppState>>,
        pub proxy: TestEventProxy,
        pub event_rx: mpsc::UnboundedReceiver<UserEvent>,
        pub sink: Arc<RecordingSink>,
        pub root_path: PathBuf,
        _temp_dir: TempDir,
    }

    impl TestHarness {
        /// Creates a harness whose project is the end-to-end fixture.
        pub fn new() -> Self {
            let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
            let root_path = temp_dir.path().join("project");
            create_fixture(&root_path);
            let (event_tx, event_rx) = mpsc::unbounded_channel();

            let mut state = AppState::new(AppConfig::default());
            state.config_path = Some(temp_dir.path().join("config.json"));

            Self {
                state: Arc::new(Mutex::new(state)),
                proxy: TestEventProxy { sender: event_tx },
                event_rx,
                sink: Arc::new(RecordingSink::default()),
                root_path,
                _temp_dir: temp_dir,
            }
        }

        pub fn send(&self, message: serde_json::Value) {
            app::handle_ipc_message(
                message.to_string(),
                self.sink.clone(),
                self.proxy.clone(),
                self.state.clone(),
            );
        }

        /// Collects all events that arrive within `window`.
        pub async fn drain(&mut self, window: Duration) -> Vec<UserEvent> {
            let mut events = Vec::new();
            let deadline = tokio::time::sleep(window);
            tokio::pin!(deadline);
            loop {
                tokio::select! {
                    Some(event) = self.event_rx.recv() => events.push(event),
                    _ = &mut deadline => break,
                }
            }
            events
        }

        /// Waits for the next `ShowInfo` notice, skipping other events.
        pub async fn next_info(&mut self) -> Option<String> {
            loop {
                let event = tokio::time::timeout(Duration::from_secs(2), self.event_rx.recv())
                    .await
                    .ok()??;
                if let UserEvent::ShowInfo(msg) = event {
                    return Some(msg);
                }
            }
        }
    }

    /// `a/x.ts` (50 bytes), `a/y.png`, and `b/readme` (10 bytes, no extension).
    pub fn create_fixture(root: &Path) {
        fs::create_dir_all(root.join("a")).unwrap();
        fs::create_dir_all(root.join("b")).unwrap();
        fs::write(root.join("a/x.ts"), "x".repeat(50)).unwrap();
        fs::write(root.join("a/y.png"), b"\x89PNG\r\n\x1a\n\0\0").unwrap();
        fs::write(root.join("b/readme"), "hello text").unwrap();
    }
}

use helpers::*;

fn tree_section(document: &str) -> &str {
    let start = document
        .find("## 🌳 Project Structure")
        .expect("document has a tree section");
    let end = document.find("## 📄 Files Content").unwrap_or(document.len());
    &document[start..end]
}

#[tokio::test]
async fn test_discovery_skips_binary_extensions() {
    let temp_dir = tempfile::tempdir().unwrap();
    create_fixture(temp_dir.path());

    let files = FileDiscovery::default().discover(temp_dir.path()).unwrap();

    assert_eq!(
        files,
        vec![temp_dir.path().join("a/x.ts"), temp_dir.path().join("b/readme")]
    );
}

#[tokio::test]
async fn test_end_to_end_selected_and_full_tree() {
    let temp_dir = tempfile::tempdir().unwrap();
    let root = temp_dir.path().join("project");
    create_fixture(&root);

    let discovery = FileDiscovery::default();
    let files = discovery.discover(&root).unwrap();
    let mut tree = SelectionTree::new(root.clone());
    tree.build(&files);
    assert!(tree.toggle_path(&root.join("b/readme")));
    let selected = tree.selected_files();
    assert_eq!(selected, vec![root.join("a/x.ts")]);

    let builder = CorpusBuilder::new(root.clone(), discovery, FormatOptions::default());
    let (tx, _rx) = mpsc::unbounded_channel();
    let cancel = AtomicBool::new(false);

    let selected_doc = builder
        .build(&selected, false, &tx, &cancel)
        .await
        .unwrap()
        .unwrap()
        .document;
    let section = tree_section(&selected_doc);
    assert!(section.contains("a/"));
    assert!(section.contains("x.ts"));
    assert!(!section.contains("b/"));
    assert!(!section.contains("readme"));
    assert!(selected_doc.contains("📄 **a/x.ts**"));
    assert!(!selected_doc.contains("📄 **b/readme**"));

    let full_doc = builder
        .build(&selected, true, &tx, &cancel)
        .await
        .unwrap()
        .unwrap()
        .document;
    let section = tree_section(&full_doc);
    assert!(section.contains("a/ ✓"));
    assert!(section.contains("x.ts ✓"));
    assert!(section.contains("b/ ✗"));
    assert!(section.contains("readme ✗"));
    assert!(!section.contains("y.png"));
    // File contents stay limited to the selection.
    assert!(!full_doc.contains("📄 **b/readme**"));
}

#[tokio::test]
async fn test_ipc_session_from_load_to_clipboard() {
    let mut harness = TestHarness::new();
    app::commands::load_project(
        harness.root_path.clone(),
        harness.proxy.clone(),
        harness.state.clone(),
    );
    let events = harness.drain(Duration::from_millis(300)).await;
    let loaded = events.iter().rev().find_map(|e| match e {
        UserEvent::StateUpdate(ui) => Some(ui.clone()),
        _ => None,
    });
    assert_eq!(loaded.unwrap().total_files_found, 2);

    let readme = harness.root_path.join("b/readme");
    harness.send(serde_json::json!({ "command": "toggle", "payload": readme }));
    harness.send(serde_json::json!({ "command": "toggleFullTree" }));
    let events = harness.drain(Duration::from_millis(200)).await;

    // Two mutations inside the debounce window produce one announcement.
    let announcements: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            UserEvent::SelectionChanged { files, full_tree } => Some((files.clone(), *full_tree)),
            _ => None,
        })
        .collect();
    assert_eq!(announcements, vec![(vec![harness.root_path.join("a/x.ts")], true)]);
    let stats = events
        .iter()
        .find_map(|e| match e {
            UserEvent::StatsUpdate(stats) => Some(stats.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(stats.file_count, 1);
    assert_eq!(stats.total_size, "50 B");
    assert_eq!(stats.total_tokens, "~13");

    harness.send(serde_json::json!({ "command": "copyPrompt" }));
    let info = harness.next_info().await.unwrap();

    assert!(info.starts_with("✅ 1 files packed to clipboard!"));
    let copied = harness.sink.copied.lock().unwrap().clone();
    assert_eq!(copied.len(), 1);
    assert!(tree_section(&copied[0]).contains("readme ✗"));
}

#[tokio::test]
async fn test_unknown_and_malformed_messages_are_ignored() {
    let mut harness = TestHarness::new();
    harness.send(serde_json::json!({ "command": "launchRockets" }));
    app::handle_ipc_message(
        "not json".to_string(),
        harness.sink.clone(),
        harness.proxy.clone(),
        harness.state.clone(),
    );

    assert!(harness.drain(Duration::from_millis(100)).await.is_empty());
}
