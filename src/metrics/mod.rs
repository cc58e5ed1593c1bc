//! Metrics infrastructure for Flurry.
//!
//! Events are emitted through the `metrics` facade. The host process decides
//! whether a recorder is installed; without one every emission is a no-op.

pub mod events;

/// Emit an internal event.
///
/// This macro calls the `InternalEvent::emit()` method on the given event,
/// which records the corresponding metric.
///
/// # Example
///
/// ```ignore
/// use flurry::metrics::events::{BytesRead, RowsDropped};
///
/// emit!(BytesRead { bytes: 1024 });
/// emit!(RowsDropped { count: 3 });
/// ```
#[macro_export]
macro_rules! emit {
    ($event:expr) => {
        $crate::metrics::events::InternalEvent::emit($event)
    };
}
