use std::sync::Mutex;

/// Recoverable problem observed while resolving a page.
///
/// Every warning leaves the page renderable: the offending binding, reference or component
/// degrades to an empty or unresolved section.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolveWarning {
    /// A collection binding could not be fetched; the layer was kept unresolved.
    BindingFetchFailed {
        /// Layer carrying the binding.
        layer_id: String,
        /// Bound collection.
        collection_id: String,
        /// Source error message.
        message: String,
    },
    /// A referenced item (or its fields) could not be fetched; the field was skipped.
    ReferenceFetchFailed {
        /// Reference field on the owning item.
        field_id: String,
        /// Referenced item.
        item_id: String,
        /// Source error message.
        message: String,
    },
    /// A component instance points at a component missing from the library.
    ComponentMissing {
        /// Instance layer.
        layer_id: String,
        /// Requested component.
        component_id: String,
    },
    /// A component instance would expand into itself.
    ComponentCycle {
        /// Instance layer.
        layer_id: String,
        /// Component already on the expansion stack.
        component_id: String,
    },
}

/// Structured sink for resolution warnings, injected into the engine.
pub trait ResolveLog: Send + Sync {
    /// Record one warning.
    fn warn(&self, warning: ResolveWarning);
}

/// Default log forwarding every warning to `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLog;

impl ResolveLog for TracingLog {
    fn warn(&self, warning: ResolveWarning) {
        match &warning {
            ResolveWarning::BindingFetchFailed {
                layer_id,
                collection_id,
                message,
            } => tracing::warn!(layer_id, collection_id, message, "binding fetch failed"),
            ResolveWarning::ReferenceFetchFailed {
                field_id,
                item_id,
                message,
            } => tracing::warn!(field_id, item_id, message, "reference fetch failed"),
            ResolveWarning::ComponentMissing {
                layer_id,
                component_id,
            } => tracing::warn!(layer_id, component_id, "component missing from library"),
            ResolveWarning::ComponentCycle {
                layer_id,
                component_id,
            } => tracing::warn!(layer_id, component_id, "component expands into itself"),
        }
    }
}

/// Log that keeps warnings in memory (and still forwards them to `tracing`).
#[derive(Debug, Default)]
pub struct RecordingLog {
    warnings: Mutex<Vec<ResolveWarning>>,
}

impl RecordingLog {
    /// Create an empty recording log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the warnings recorded so far, in arrival order.
    pub fn warnings(&self) -> Vec<ResolveWarning> {
        match self.warnings.lock() {
            Ok(g) => g.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Drain and return the recorded warnings.
    pub fn take(&self) -> Vec<ResolveWarning> {
        match self.warnings.lock() {
            Ok(mut g) => std::mem::take(&mut *g),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl ResolveLog for RecordingLog {
    fn warn(&self, warning: ResolveWarning) {
        TracingLog.warn(warning.clone());
        match self.warnings.lock() {
            Ok(mut g) => g.push(warning),
            Err(poisoned) => poisoned.into_inner().push(warning),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/log.rs"]
mod tests;
