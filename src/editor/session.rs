use super::host::{Haptic, HostBridge, select_host};
use super::queue::{SaveQueue, SaveStatus};
use super::state::EditorState;
use super::store::{FlowRecord, FlowStore};
use crate::compiler::Compiler;
use crate::config::EditorConfig;
use crate::error::{EditorError, StoreError};
use crate::spec::{FlowSpec, Screen};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

struct InFlightSave {
    revision: u64,
    handle: JoinHandle<Result<(), StoreError>>,
}

/// An editing session: the editor state wired to a store, a host bridge and
/// the autosave queue.
///
/// Edits go through [`FlowEditor::edit`]. Saves run on a spawned task and are
/// driven by [`FlowEditor::pump`], [`FlowEditor::settle`] or
/// [`FlowEditor::save_now`].
pub struct FlowEditor {
    state: EditorState,
    config: EditorConfig,
    store: Arc<dyn FlowStore>,
    host: Arc<dyn HostBridge>,
    queue: SaveQueue,
    in_flight: Option<InFlightSave>,
    status: SaveStatus,
    saved_revision: Option<u64>,
}

impl FlowEditor {
    /// Loads the stored flow (any accepted shape) and normalizes it. A store
    /// with nothing in it starts from the single-screen default.
    pub async fn open(
        store: Arc<dyn FlowStore>,
        host: Option<Arc<dyn HostBridge>>,
        config: EditorConfig,
        flow_name: Option<&str>,
    ) -> Result<Self, EditorError> {
        let flow_name = flow_name.unwrap_or(&config.default_flow_name).to_string();
        let state = match store.load().await? {
            Some(raw) => EditorState::from_raw(&raw, &flow_name),
            None => EditorState::new(FlowSpec::default(), &flow_name),
        };
        tracing::info!(
            flow = %flow_name,
            screens = state.spec().screens.len(),
            issues = state.issues().len(),
            "flow opened"
        );

        let editor = Self::new(state, store, host, config);
        editor.host.ready();
        Ok(editor)
    }

    pub fn new(
        state: EditorState,
        store: Arc<dyn FlowStore>,
        host: Option<Arc<dyn HostBridge>>,
        config: EditorConfig,
    ) -> Self {
        let saved_revision = Some(state.revision());
        Self {
            queue: SaveQueue::new(config.debounce()),
            state,
            config,
            store,
            host: select_host(host),
            in_flight: None,
            status: SaveStatus::Idle,
            saved_revision,
        }
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn spec(&self) -> &FlowSpec {
        self.state.spec()
    }

    pub fn issues(&self) -> &[String] {
        self.state.issues()
    }

    pub fn status(&self) -> &SaveStatus {
        &self.status
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// True when the current revision has not been persisted.
    pub fn is_dirty(&self) -> bool {
        self.saved_revision != Some(self.state.revision())
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.queue.deadline()
    }

    /// Applies an edit and schedules an autosave if the spec changed.
    pub fn edit<T>(
        &mut self,
        change: impl FnOnce(&mut EditorState) -> Result<T, EditorError>,
    ) -> Result<T, EditorError> {
        let before = self.state.revision();
        let result = change(&mut self.state);
        if self.state.revision() != before {
            self.queue.mark_dirty(Instant::now());
        }
        result
    }

    /// Removes a screen after the host confirms it.
    pub fn remove_screen(&mut self, screen_id: &str) -> Result<Screen, EditorError> {
        let spec = self.state.spec();
        let title = spec
            .screen(screen_id)
            .map(|s| s.title.clone())
            .ok_or_else(|| EditorError::ScreenNotFound(screen_id.to_string()))?;
        if spec.screens.len() == 1 {
            return Err(EditorError::LastScreen(screen_id.to_string()));
        }
        self.host.haptic(Haptic::Warning);
        if !self.host.confirm(&format!("Delete screen \"{}\"?", title)) {
            return Err(EditorError::Cancelled(screen_id.to_string()));
        }
        self.edit(|state| state.remove_screen(screen_id))
    }

    /// Collects a finished save and starts the pending one if it is due.
    /// Never blocks on a running save.
    pub async fn pump(&mut self) -> &SaveStatus {
        self.reap(false).await;
        if self.in_flight.is_none() && self.queue.take_due(Instant::now()) {
            if self.state.is_valid() {
                self.start_save();
            } else {
                tracing::debug!(
                    issues = self.state.issues().len(),
                    "autosave skipped while the flow has issues"
                );
                self.queue.finish(Instant::now(), false);
            }
        }
        &self.status
    }

    /// Runs the queue until nothing is pending or in flight.
    ///
    /// With `retry_failed_saves` this keeps retrying until a save succeeds.
    pub async fn settle(&mut self) -> &SaveStatus {
        loop {
            if self.in_flight.is_some() {
                self.reap(true).await;
                continue;
            }
            let Some(deadline) = self.queue.deadline() else {
                break;
            };
            tokio::time::sleep_until(deadline).await;
            self.pump().await;
        }
        &self.status
    }

    /// Saves immediately, after waiting for any running save.
    pub async fn save_now(&mut self) -> Result<(), EditorError> {
        self.reap(true).await;
        if !self.state.is_valid() {
            return Err(EditorError::InvalidSpec(self.state.issues().to_vec()));
        }
        self.queue.start();
        self.start_save();
        match self.reap(true).await {
            Some(Err(e)) => Err(e.into()),
            _ => {
                self.host.haptic(Haptic::Success);
                Ok(())
            }
        }
    }

    /// Flushes pending saves and releases the host.
    pub async fn close(mut self) -> SaveStatus {
        self.settle().await;
        self.host.close();
        self.status
    }

    fn start_save(&mut self) {
        let spec = self.state.spec().clone();
        let compiled = Compiler::builder(&spec)
            .with_config(&self.config)
            .build()
            .compile();
        let record = FlowRecord { spec, compiled };
        let revision = self.state.revision();
        let store = Arc::clone(&self.store);

        tracing::debug!(revision, "save started");
        let handle = tokio::spawn(async move { store.save(&record).await });
        self.in_flight = Some(InFlightSave { revision, handle });
        self.status = SaveStatus::Saving;
    }

    async fn reap(&mut self, wait: bool) -> Option<Result<(), StoreError>> {
        let ready = self
            .in_flight
            .as_ref()
            .is_some_and(|save| wait || save.handle.is_finished());
        if !ready {
            return None;
        }
        let save = self.in_flight.take()?;
        let result = save
            .handle
            .await
            .unwrap_or_else(|e| Err(StoreError::Rejected(format!("save task ended: {}", e))));

        match &result {
            Ok(()) => {
                tracing::info!(revision = save.revision, "flow saved");
                self.saved_revision = Some(save.revision);
                self.status = SaveStatus::Saved;
            }
            Err(e) => {
                tracing::warn!(revision = save.revision, error = %e, "flow save failed");
                self.status = SaveStatus::Failed(e.to_string());
                self.host.alert(&format!("Could not save the flow: {}", e));
                self.host.haptic(Haptic::Error);
            }
        }
        let retry = result.is_err() && self.config.retry_failed_saves;
        self.queue.finish(Instant::now(), retry);
        Some(result)
    }
}
