//! Editing sessions against in-memory and file stores, on a paused clock.
mod common;
use common::*;
use flowspec::editor::{FlowRecord, Haptic, HostBridge, JsonFileStore, MemoryStore, select_host};
use flowspec::prelude::*;
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const DEBOUNCE: Duration = Duration::from_millis(800);

/// Host that records every call and answers confirmations with a fixed value.
#[derive(Default)]
struct RecordingHost {
    available: bool,
    confirm_answer: bool,
    alerts: Mutex<Vec<String>>,
    confirms: Mutex<Vec<String>>,
    haptics: Mutex<Vec<Haptic>>,
    ready: Mutex<bool>,
    closed: Mutex<bool>,
}

impl RecordingHost {
    fn new(confirm_answer: bool) -> Arc<Self> {
        Arc::new(Self {
            available: true,
            confirm_answer,
            ..Self::default()
        })
    }

    fn alerts(&self) -> Vec<String> {
        self.alerts.lock().unwrap().clone()
    }

    fn haptics(&self) -> Vec<Haptic> {
        self.haptics.lock().unwrap().clone()
    }
}

impl HostBridge for RecordingHost {
    fn is_available(&self) -> bool {
        self.available
    }

    fn alert(&self, message: &str) {
        self.alerts.lock().unwrap().push(message.to_string());
    }

    fn confirm(&self, message: &str) -> bool {
        self.confirms.lock().unwrap().push(message.to_string());
        self.confirm_answer
    }

    fn haptic(&self, kind: Haptic) {
        self.haptics.lock().unwrap().push(kind);
    }

    fn ready(&self) {
        *self.ready.lock().unwrap() = true;
    }

    fn close(&self) {
        *self.closed.lock().unwrap() = true;
    }
}

fn as_host(host: &Arc<RecordingHost>) -> Option<Arc<dyn HostBridge>> {
    Some(host.clone() as Arc<dyn HostBridge>)
}

fn session(store: &Arc<MemoryStore>, host: &Arc<RecordingHost>, config: EditorConfig) -> FlowEditor {
    let state = EditorState::new(linear_spec(), FLOW_NAME);
    FlowEditor::new(state, store.clone(), as_host(host), config)
}

fn rename(editor: &mut FlowEditor, title: &str) {
    editor
        .edit(|state| state.set_title("SCREEN_A", title))
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_save_waits_for_the_debounce() {
    let store = Arc::new(MemoryStore::new());
    let host = RecordingHost::new(true);
    let mut editor = session(&store, &host, EditorConfig::default());
    assert!(!editor.is_dirty());

    rename(&mut editor, "Hello");
    assert!(editor.is_dirty());
    assert_eq!(editor.pump().await, &SaveStatus::Idle);

    tokio::time::advance(DEBOUNCE - Duration::from_millis(1)).await;
    assert_eq!(editor.pump().await, &SaveStatus::Idle);

    tokio::time::advance(Duration::from_millis(1)).await;
    assert_eq!(editor.pump().await, &SaveStatus::Saving);

    assert_eq!(editor.settle().await, &SaveStatus::Saved);
    assert_eq!(store.save_count().await, 1);
    assert!(!editor.is_dirty());
}

#[tokio::test(start_paused = true)]
async fn test_edit_burst_coalesces_into_one_save() {
    let store = Arc::new(MemoryStore::new());
    let host = RecordingHost::new(true);
    let mut editor = session(&store, &host, EditorConfig::default());

    for title in ["H", "He", "Hel", "Hello"] {
        rename(&mut editor, title);
        tokio::time::advance(Duration::from_millis(300)).await;
        editor.pump().await;
    }
    editor.settle().await;

    let saves = store.saves().await;
    assert_eq!(saves.len(), 1);
    assert_eq!(&saves[0].spec, editor.spec());
    assert_eq!(saves[0].spec.screens[0].title, "Hello");
    assert_eq!(saves[0].compiled, compile(editor.spec()));
}

#[tokio::test(start_paused = true)]
async fn test_saves_never_overlap() {
    let store = Arc::new(MemoryStore::new().with_save_delay(Duration::from_secs(1)));
    let host = RecordingHost::new(true);
    let mut editor = session(&store, &host, EditorConfig::default());

    rename(&mut editor, "First");
    tokio::time::advance(DEBOUNCE).await;
    assert_eq!(editor.pump().await, &SaveStatus::Saving);

    // Edits while the save runs wait for it instead of starting another one.
    rename(&mut editor, "Second");
    tokio::time::advance(DEBOUNCE).await;
    editor.pump().await;
    assert_eq!(editor.next_deadline(), None);

    editor.settle().await;
    let saves = store.saves().await;
    assert_eq!(saves.len(), 2);
    assert_eq!(store.max_concurrent_saves(), 1);
    assert_eq!(saves[0].spec.screens[0].title, "First");
    assert_eq!(saves[1].spec.screens[0].title, "Second");
    assert!(!editor.is_dirty());
}

#[tokio::test(start_paused = true)]
async fn test_failed_save_is_retried_on_the_next_edit() {
    let store = Arc::new(MemoryStore::new());
    store.fail_next(1);
    let host = RecordingHost::new(true);
    let mut editor = session(&store, &host, EditorConfig::default());

    rename(&mut editor, "Lost?");
    let status = editor.settle().await.clone();
    assert!(matches!(status, SaveStatus::Failed(_)));
    assert_eq!(store.save_count().await, 0);
    assert!(editor.is_dirty());
    assert_eq!(editor.spec().screens[0].title, "Lost?");
    assert_eq!(editor.next_deadline(), None);

    let alerts = host.alerts();
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].starts_with("Could not save the flow"));
    assert!(host.haptics().contains(&Haptic::Error));

    rename(&mut editor, "Kept");
    assert_eq!(editor.settle().await, &SaveStatus::Saved);
    let last = store.last_saved().await.unwrap();
    assert_eq!(last.spec.screens[0].title, "Kept");
}

#[tokio::test(start_paused = true)]
async fn test_failed_save_retries_by_itself_when_configured() {
    let store = Arc::new(MemoryStore::new());
    store.fail_next(2);
    let host = RecordingHost::new(true);
    let config = EditorConfig {
        retry_failed_saves: true,
        ..EditorConfig::default()
    };
    let mut editor = session(&store, &host, config);

    rename(&mut editor, "Persistent");
    assert_eq!(editor.settle().await, &SaveStatus::Saved);
    assert_eq!(store.save_count().await, 1);
    assert_eq!(host.alerts().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_flow_with_issues_is_not_saved() {
    let store = Arc::new(MemoryStore::new());
    let host = RecordingHost::new(true);
    let mut editor = session(&store, &host, EditorConfig::default());

    editor
        .edit(|state| {
            state.set_branch_rules(
                "SCREEN_A",
                vec![BranchRule::new("ghost", BranchOp::IsTrue, None, Some("SCREEN_B"))],
            )
        })
        .unwrap();
    assert_eq!(editor.settle().await, &SaveStatus::Idle);
    assert_eq!(store.save_count().await, 0);

    match editor.save_now().await {
        Err(EditorError::InvalidSpec(issues)) => assert_eq!(issues.len(), 1),
        other => panic!("expected InvalidSpec, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_save_now_skips_the_debounce() {
    let store = Arc::new(MemoryStore::new());
    let host = RecordingHost::new(true);
    let mut editor = session(&store, &host, EditorConfig::default());

    rename(&mut editor, "Right away");
    editor.save_now().await.unwrap();
    assert_eq!(editor.status(), &SaveStatus::Saved);
    assert_eq!(editor.next_deadline(), None);
    assert_eq!(host.haptics(), vec![Haptic::Success]);

    editor.settle().await;
    assert_eq!(store.save_count().await, 1);
}

#[tokio::test(start_paused = true)]
async fn test_screen_removal_asks_the_host() {
    let store = Arc::new(MemoryStore::new());

    let refusing = RecordingHost::new(false);
    let mut editor = session(&store, &refusing, EditorConfig::default());
    let err = editor.remove_screen("SCREEN_B").unwrap_err();
    assert_eq!(err, EditorError::Cancelled("SCREEN_B".to_string()));
    assert_eq!(editor.spec().screens.len(), 2);
    assert!(!editor.is_dirty());
    assert_eq!(
        *refusing.confirms.lock().unwrap(),
        vec!["Delete screen \"Done\"?".to_string()]
    );
    assert_eq!(refusing.haptics(), vec![Haptic::Warning]);

    let accepting = RecordingHost::new(true);
    let mut editor = session(&store, &accepting, EditorConfig::default());
    let removed = editor.remove_screen("SCREEN_B").unwrap();
    assert_eq!(removed.id, "SCREEN_B");
    assert!(editor.is_dirty());
    assert!(editor.next_deadline().is_some());

    // Checked before asking: the last screen and unknown ids never reach the host.
    editor.remove_screen("SCREEN_Z").unwrap_err();
    assert_eq!(
        editor.remove_screen("SCREEN_A").unwrap_err(),
        EditorError::LastScreen("SCREEN_A".to_string())
    );
    assert_eq!(accepting.confirms.lock().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_open_normalizes_stored_legacy_flow() {
    let legacy = json!({
        "title": "Contact us",
        "fields": [
            { "label": "Name", "required": true },
            { "type": "email", "label": "Email" }
        ]
    });
    let store = Arc::new(MemoryStore::with_initial(legacy));
    let host = RecordingHost::new(true);

    let editor = FlowEditor::open(store.clone(), as_host(&host), EditorConfig::default(), None)
        .await
        .unwrap();
    assert_eq!(editor.spec().screens[0].inputs().len(), 2);
    assert!(editor.issues().is_empty());
    assert!(!editor.is_dirty());
    assert!(*host.ready.lock().unwrap());

    let status = editor.close().await;
    assert_eq!(status, SaveStatus::Idle);
    assert!(*host.closed.lock().unwrap());
    assert_eq!(store.save_count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_close_flushes_pending_edits() {
    let store = Arc::new(MemoryStore::new());
    let editor_store: Arc<dyn FlowStore> = store.clone();
    let mut editor = FlowEditor::open(editor_store, None, EditorConfig::default(), Some(FLOW_NAME))
        .await
        .unwrap();
    assert_eq!(editor.spec(), &FlowSpec::single_screen(FLOW_NAME));

    editor.edit(|state| state.add_screen("Second")).unwrap();
    assert_eq!(editor.close().await, SaveStatus::Saved);

    let last = store.last_saved().await.unwrap();
    assert_eq!(last.spec.screens.len(), 2);
}

#[test]
fn test_unavailable_host_falls_back_to_noop() {
    let missing = Arc::new(RecordingHost {
        available: false,
        ..RecordingHost::default()
    });
    let chosen = select_host(Some(missing as Arc<dyn HostBridge>));
    assert!(!chosen.is_available());
    assert!(chosen.confirm("Delete?"));

    let present = RecordingHost::new(false);
    assert!(select_host(as_host(&present)).is_available());
}

#[test]
fn test_file_store_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::new(dir.path().join("flow.json"));

    tokio_test::block_on(async {
        assert_eq!(store.load().await.unwrap(), None);

        let spec = branching_spec();
        let record = FlowRecord {
            compiled: compile(&spec),
            spec: spec.clone(),
        };
        store.save(&record).await.unwrap();
        assert!(!dir.path().join("flow.json.tmp").exists());

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(normalize(&loaded, FLOW_NAME), spec);
    });
}

#[test]
fn test_file_store_reads_bare_specs_and_reports_corruption() {
    let dir = tempfile::tempdir().unwrap();
    let bare = dir.path().join("bare.json");
    std::fs::write(&bare, canonical_raw().to_string()).unwrap();
    let broken = dir.path().join("broken.json");
    std::fs::write(&broken, "{ not json").unwrap();

    tokio_test::block_on(async {
        let loaded = JsonFileStore::new(&bare).load().await.unwrap().unwrap();
        assert_eq!(normalize(&loaded, FLOW_NAME), linear_spec());

        let err = JsonFileStore::new(&broken).load().await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)));
    });
}

#[tokio::test]
async fn test_file_backed_session() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("flow.json");

    let store: Arc<dyn FlowStore> = Arc::new(JsonFileStore::new(&path));
    let mut editor = FlowEditor::open(store.clone(), None, EditorConfig::default(), Some(FLOW_NAME))
        .await
        .unwrap();
    editor
        .edit(|state| state.add_block("SCREEN_A", Block::short_text("city", "City", true), None))
        .unwrap();
    editor.save_now().await.unwrap();

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(written["compiled"]["version"], "7.2");
    assert_eq!(
        written["compiled"]["screens"][0]["layout"]["children"][0]["children"][0]["name"],
        "city"
    );

    let reopened = FlowEditor::open(store, None, EditorConfig::default(), Some(FLOW_NAME))
        .await
        .unwrap();
    assert_eq!(reopened.spec(), editor.spec());
}
