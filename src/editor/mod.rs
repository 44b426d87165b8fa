//! Editing sessions.
//!
//! [`EditorState`] holds the spec and applies mutations synchronously.
//! [`FlowEditor`] adds persistence through a [`FlowStore`], the debounced
//! [`SaveQueue`] and the messaging [`HostBridge`].

mod host;
mod queue;
mod session;
mod state;
mod store;

pub use host::{Haptic, HostBridge, NoopHost, select_host};
pub use queue::{SaveQueue, SaveStatus};
pub use session::FlowEditor;
pub use state::EditorState;
pub use store::{FlowRecord, FlowStore, JsonFileStore, MemoryStore};
