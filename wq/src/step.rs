//! Step capability contract
//!
//! The orchestrator knows nothing about what a step does - text input,
//! choice, confirmation, side-effecting action - it only drives this
//! contract. Concrete step implementations live outside this crate; tests
//! use stubs.

use eyre::Report;

use crate::events::{Cmd, Event};

/// One unit of interactive or background work in the run.
///
/// Lifecycle: a step is constructed externally, enqueued, activated exactly
/// once via [`Step::begin`], mutated only through its own
/// [`Step::handle_event`], and never removed individually - the memory
/// guardian evicts completed steps in bulk.
///
/// Contract notes:
/// - `title` is stable identity for display and must be side-effect free.
/// - completion is monotonic: once `is_complete` returns true it stays true,
///   and the orchestrator never invokes `begin` again.
/// - `render_final` is only ever called once `is_complete` is true; the
///   orchestrator guarantees the ordering.
/// - event routing is exclusive: only the active step receives the `&mut`
///   borrow, so a handler can never observe another step mid-mutation.
/// - action payloads are untyped; a step must ignore payloads it does not
///   recognize (see [`Event::action_as`]).
pub trait Step: Send {
    /// Stable display title.
    fn title(&self) -> &str;

    /// Invoked once when the step becomes active.
    ///
    /// Interactive steps usually return `None` and wait for key events;
    /// background steps return the action that will eventually complete them.
    fn begin(&mut self) -> Option<Cmd> {
        None
    }

    /// Handle one event, optionally dispatching a follow-up action.
    ///
    /// This is the only way step state changes.
    fn handle_event(&mut self, event: &Event) -> Option<Cmd>;

    /// Whether the step has finished (successfully or not).
    fn is_complete(&self) -> bool;

    /// The failure recorded for this step, if any. Content is opaque to the
    /// orchestrator and surfaces only through rendering and statistics.
    fn failure(&self) -> Option<&Report>;

    /// Whether the step finished with a failure.
    fn has_failure(&self) -> bool {
        self.failure().is_some()
    }

    /// Rendering while the step is active; pure in state and width.
    fn render_active(&self, width: usize) -> String;

    /// Rendering once the step is complete; pure in state and width.
    fn render_final(&self, width: usize) -> String;

    /// Whether a failure of this step stops the whole queue.
    fn halts_on_failure(&self) -> bool;

    /// Change the halting behavior; read at the moment the step completes.
    fn set_halts_on_failure(&mut self, halt: bool);

    /// Optional capability: the step accepts a replacement prefix for its
    /// final rendering. Used by the render pipeline's numbering feature;
    /// steps returning `None` keep their plain completion glyph.
    fn final_prefix_override(&mut self) -> Option<&mut dyn FinalPrefixOverride> {
        None
    }

    /// Optional capability: as above, for the in-progress rendering.
    fn active_prefix_override(&mut self) -> Option<&mut dyn ActivePrefixOverride> {
        None
    }
}

/// Capability: accept a replacement prefix for the final rendering.
pub trait FinalPrefixOverride {
    fn set_final_prefix(&mut self, prefix: String);
}

/// Capability: accept a replacement prefix for the in-progress rendering.
pub trait ActivePrefixOverride {
    fn set_active_prefix(&mut self, prefix: String);
}
