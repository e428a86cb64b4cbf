//! Queue events and asynchronous actions
//!
//! Everything the orchestrator observes arrives as an [`Event`] pulled from a
//! single channel, so all state mutation is serialized in arrival order. A
//! step that needs background work returns a [`Cmd`]; the runner spawns it and
//! feeds its resulting event back into the same channel.

use std::any::Any;
use std::fmt;
use std::time::Duration;

use crossterm::event::{self, KeyCode, KeyEvent, KeyModifiers};
use eyre::Result;
use futures::future::BoxFuture;
use tokio::sync::mpsc;

/// Opaque payload produced by a step's asynchronous action.
///
/// The orchestrator never inspects it; the step that dispatched the action
/// downcasts it back with [`Event::action_as`]. Steps must ignore payloads
/// they do not recognize - a late result from an earlier step may still be
/// in flight when the cursor has already moved on.
pub type ActionPayload = Box<dyn Any + Send>;

/// Asynchronous follow-up action returned by a step.
///
/// Runs outside the main loop; its output re-enters the loop as a single
/// event, preserving serialization.
pub type Cmd = BoxFuture<'static, Event>;

/// Wrap a future into a [`Cmd`].
pub fn cmd<F>(fut: F) -> Cmd
where
    F: Future<Output = Event> + Send + 'static,
{
    Box::pin(fut)
}

/// Events routed through the queue
pub enum Event {
    /// Key press
    Key(KeyEvent),
    /// Terminal resize
    Resize(u16, u16),
    /// Periodic refresh
    Tick,
    /// Global cancellation (Ctrl+C or injected by the embedder)
    Interrupt,
    /// Result of a step's asynchronous action
    Action(ActionPayload),
}

impl Event {
    /// Wrap an arbitrary payload into an action-result event.
    pub fn action<T: Any + Send>(payload: T) -> Self {
        Self::Action(Box::new(payload))
    }

    /// Downcast an action payload, if this is one of the expected type.
    pub fn action_as<T: Any>(&self) -> Option<&T> {
        match self {
            Self::Action(payload) => payload.downcast_ref(),
            _ => None,
        }
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => f.debug_tuple("Key").field(key).finish(),
            Self::Resize(w, h) => f.debug_tuple("Resize").field(w).field(h).finish(),
            Self::Tick => f.write_str("Tick"),
            Self::Interrupt => f.write_str("Interrupt"),
            Self::Action(_) => f.write_str("Action(..)"),
        }
    }
}

/// Translate a raw terminal event into a queue event.
///
/// Ctrl+C becomes the global [`Event::Interrupt`]; mouse events are dropped.
fn translate(event: event::Event) -> Option<Event> {
    match event {
        event::Event::Key(key) if is_interrupt(&key) => Some(Event::Interrupt),
        event::Event::Key(key) => Some(Event::Key(key)),
        event::Event::Resize(w, h) => Some(Event::Resize(w, h)),
        _ => None,
    }
}

fn is_interrupt(key: &KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL) && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('C'))
}

/// Event pump for the run loop
///
/// A blocking thread polls the terminal and forwards events over an
/// unbounded channel; command results are pushed into the same channel via
/// [`EventHandler::sender`], so the receiver side sees one serialized stream.
pub struct EventHandler {
    /// Sender handle cloned for command dispatch
    tx: mpsc::UnboundedSender<Event>,
    /// Event receiver
    rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
    /// Create a new event handler with the given tick rate
    pub fn new(tick_rate: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        let poll_tx = tx.clone();
        std::thread::spawn(move || {
            loop {
                // Poll for events with timeout
                if event::poll(tick_rate).unwrap_or(false) {
                    if let Ok(evt) = event::read() {
                        let Some(event) = translate(evt) else {
                            continue;
                        };

                        if poll_tx.send(event).is_err() {
                            break;
                        }
                    }
                } else {
                    // Send tick event
                    if poll_tx.send(Event::Tick).is_err() {
                        break;
                    }
                }
            }
        });

        Self { tx, rx }
    }

    /// Sender for feeding command results back into the loop
    pub fn sender(&self) -> mpsc::UnboundedSender<Event> {
        self.tx.clone()
    }

    /// Get the next event (async)
    pub async fn next(&mut self) -> Result<Event> {
        self.rx.recv().await.ok_or_else(|| eyre::eyre!("Event channel closed"))
    }
}
