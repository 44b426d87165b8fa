use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Haptic {
    Success,
    Warning,
    Error,
}

/// Capabilities of the messaging host the editor runs inside.
///
/// Every method is best effort. An editor must keep working when the host
/// ignores a call.
pub trait HostBridge: Send + Sync {
    /// Whether the host is actually present. Hosts that report `false` are
    /// replaced by [`NoopHost`] in [`select_host`].
    fn is_available(&self) -> bool {
        true
    }

    fn alert(&self, message: &str);

    /// Asks the user to confirm a destructive action.
    fn confirm(&self, message: &str) -> bool;

    fn haptic(&self, kind: Haptic);

    /// Signals that the editor finished loading.
    fn ready(&self) {}

    fn close(&self) {}
}

/// Host used outside a messaging client. Alerts go to the log and every
/// confirmation is accepted.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHost;

impl HostBridge for NoopHost {
    fn is_available(&self) -> bool {
        false
    }

    fn alert(&self, message: &str) {
        tracing::warn!(message, "host alert");
    }

    fn confirm(&self, message: &str) -> bool {
        tracing::debug!(message, "confirmation auto-accepted");
        true
    }

    fn haptic(&self, _kind: Haptic) {}
}

/// Picks the host bridge for a session, falling back to [`NoopHost`] when no
/// host is given or the given one is unavailable.
pub fn select_host(candidate: Option<Arc<dyn HostBridge>>) -> Arc<dyn HostBridge> {
    match candidate {
        Some(host) if host.is_available() => host,
        Some(_) => {
            tracing::debug!("host bridge unavailable, using no-op host");
            Arc::new(NoopHost)
        }
        None => Arc::new(NoopHost),
    }
}
