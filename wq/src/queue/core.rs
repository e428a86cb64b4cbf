//! Queue orchestrator
//!
//! Owns the ordered step list and the progress cursor, routes every incoming
//! event to exactly the active step, and decides when to advance, when to
//! halt on a failure, and when the run is finished. The state machine lives
//! in [`Queue::handle`] and is fully driveable without a terminal; the
//! transport loop in [`Queue::run`] adds raw-mode setup, the event pump, and
//! inline frame repainting.
//!
//! States: idle (not started) -> active at `cursor` -> halted | completed
//! (`cursor == steps.len()`). All `steps[i]` with `i < cursor` are complete;
//! if halted, nothing past the halting step ever runs.

use std::io::{self, Write};
use std::time::Duration;

use crossterm::{cursor as term_cursor, execute, terminal};
use eyre::{Context, Result};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::events::{Cmd, Event, EventHandler};
use crate::guardian::{MemoryGuardian, Pressure};
use crate::render;
use crate::settings::Tunables;
use crate::stats::Stats;
use crate::step::Step;

use super::config::DisplayConfig;

/// How often the event pump emits ticks when the terminal is quiet
const TICK_RATE: Duration = Duration::from_millis(33);

/// What the caller should do after feeding an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Keep the loop running
    Continue,
    /// The run reached a terminal state
    Terminate,
}

/// The wizard queue: ordered steps plus progress state
pub struct Queue {
    pub(crate) steps: Vec<Box<dyn Step>>,
    pub(crate) cursor: usize,
    pub(crate) started: bool,
    pub(crate) halted: bool,
    pub(crate) halting_step: Option<usize>,
    pub(crate) stats: Stats,
    pub(crate) display: DisplayConfig,
    guardian: MemoryGuardian,
}

impl Queue {
    /// Create a queue, resolving process-wide tunables once.
    pub fn new(title: impl Into<String>, steps: Vec<Box<dyn Step>>) -> Self {
        let tunables = Tunables::resolve().unwrap_or_else(|e| {
            warn!("Failed to resolve tunables: {}; using defaults", e);
            Tunables::default()
        });
        Self::with_tunables(title, steps, tunables)
    }

    /// Create a queue with injected tunables.
    pub fn with_tunables(title: impl Into<String>, steps: Vec<Box<dyn Step>>, tunables: Tunables) -> Self {
        let display = DisplayConfig {
            title: title.into(),
            ..DisplayConfig::default()
        };
        Self {
            steps,
            cursor: 0,
            started: false,
            halted: false,
            halting_step: None,
            stats: Stats::default(),
            display,
            guardian: MemoryGuardian::new(tunables),
        }
    }

    /// Append a step; insertion order is execution order.
    pub fn enqueue(&mut self, step: Box<dyn Step>) {
        self.steps.push(step);
    }

    /// The retained steps.
    pub fn steps(&self) -> &[Box<dyn Step>] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Index of the currently active step.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Index of the step that halted the run, if any.
    pub fn halting_index(&self) -> Option<usize> {
        self.halting_step
    }

    /// The step that halted the run, if any.
    pub fn halting_step(&self) -> Option<&dyn Step> {
        self.halting_step.and_then(|i| self.steps.get(i)).map(|s| s.as_ref())
    }

    /// Current run statistics.
    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// Whether the run reached a terminal state.
    pub fn is_finished(&self) -> bool {
        self.halted || self.cursor >= self.steps.len()
    }

    /// Render the current frame.
    pub fn render(&mut self) -> String {
        render::render_frame(self)
    }

    /// Begin the run: activate the first step, or complete immediately when
    /// the queue is empty.
    pub fn start(&mut self) -> (Outcome, Vec<Cmd>) {
        if self.started {
            let outcome = if self.is_finished() { Outcome::Terminate } else { Outcome::Continue };
            return (outcome, Vec::new());
        }
        self.started = true;

        if self.steps.is_empty() {
            debug!("empty queue, completing immediately");
            return (Outcome::Terminate, Vec::new());
        }

        debug!(total = self.steps.len(), step = self.steps[0].title(), "starting queue");
        let cmds = self.steps[0].begin().into_iter().collect();
        (Outcome::Continue, cmds)
    }

    /// Feed one event through the state machine.
    ///
    /// Events are routed to the active step only. When the step completes,
    /// the memory guardian runs, the queue halts or advances, and statistics
    /// are recomputed. Returned commands include both the completed step's
    /// follow-up and the next step's begin action - neither is dropped.
    ///
    /// After a terminal state this is a no-op that signals terminate, which
    /// also discards late results from actions outlived by the run.
    pub fn handle(&mut self, event: &Event) -> (Outcome, Vec<Cmd>) {
        if self.is_finished() {
            return (Outcome::Terminate, Vec::new());
        }
        if !self.started {
            return (Outcome::Continue, Vec::new());
        }

        match event {
            Event::Interrupt => {
                debug!("interrupted, halting queue");
                self.halted = true;
                return (Outcome::Terminate, Vec::new());
            }
            Event::Resize(width, _) => {
                self.display.screen_width = *width as usize;
            }
            _ => {}
        }

        let mut cmds: Vec<Cmd> = self.steps[self.cursor].handle_event(event).into_iter().collect();

        if self.steps[self.cursor].is_complete() {
            self.after_completion();

            let step = &self.steps[self.cursor];
            if step.has_failure() && step.halts_on_failure() {
                debug!(step = step.title(), "step failed, halting queue");
                self.halted = true;
                self.halting_step = Some(self.cursor);
                self.stats = Stats::recompute(&self.steps, self.cursor, self.halted, self.halting_step);
                return (Outcome::Terminate, cmds);
            }

            self.cursor += 1;
            self.stats = Stats::recompute(&self.steps, self.cursor, self.halted, self.halting_step);

            if self.cursor >= self.steps.len() {
                debug!("queue completed");
                return (Outcome::Terminate, cmds);
            }

            debug!(step = self.steps[self.cursor].title(), "advancing");
            if let Some(cmd) = self.steps[self.cursor].begin() {
                cmds.push(cmd);
            }
        }

        (Outcome::Continue, cmds)
    }

    /// Memory-guardian check, run after every step completion.
    fn after_completion(&mut self) {
        let completed = self.cursor.min(self.steps.len());
        match self.guardian.evaluate(completed) {
            Pressure::Memory => {
                self.cleanup_old_tasks();
                render::cache::clear_rule_cache();
                render::cache::release_buffers();
                self.steps.shrink_to_fit();
            }
            Pressure::HardCap => self.cleanup_old_tasks(),
            Pressure::None => {}
        }
    }

    /// Evict the oldest completed steps beyond the retention cap.
    ///
    /// Keeps the most recent `max_completed_tasks` completed steps plus every
    /// not-yet-run step; the active step is the same logical step afterwards.
    pub fn cleanup_old_tasks(&mut self) {
        let keep_from = self.cursor.saturating_sub(self.guardian.max_completed_tasks());
        if keep_from == 0 {
            return;
        }
        self.steps.drain(..keep_from);
        self.cursor -= keep_from;
        if let Some(halting) = self.halting_step.as_mut() {
            *halting = halting.saturating_sub(keep_from);
        }
        debug!(evicted = keep_from, retained = self.steps.len(), "evicted completed steps");
    }

    /// Drive the queue to completion on the terminal.
    ///
    /// Returns transport-level failures only; step failures are carried in
    /// queue state and surface through the rendered summary and
    /// [`Queue::halting_step`].
    pub async fn run(&mut self) -> Result<()> {
        terminal::enable_raw_mode().context("Failed to enable raw mode")?;
        let _guard = RawModeGuard;

        if self.display.clear_screen {
            execute!(
                io::stdout(),
                terminal::Clear(terminal::ClearType::All),
                term_cursor::MoveTo(0, 0)
            )
            .context("Failed to clear screen")?;
        }
        if self.display.screen_width == 0
            && let Ok((width, _)) = terminal::size()
        {
            self.display.screen_width = width as usize;
        }

        let mut events = EventHandler::new(TICK_RATE);
        let results = events.sender();

        let (outcome, cmds) = self.start();
        dispatch(cmds, &results);

        let mut painted = 0usize;
        self.repaint(&mut painted)?;
        if outcome == Outcome::Terminate {
            return Ok(());
        }

        loop {
            let event = events.next().await?;
            let (outcome, cmds) = self.handle(&event);
            dispatch(cmds, &results);
            self.repaint(&mut painted)?;
            if outcome == Outcome::Terminate {
                break;
            }
        }

        Ok(())
    }

    /// Repaint the frame in place: rewind past the previous frame, clear it,
    /// and print the new one.
    fn repaint(&mut self, painted: &mut usize) -> Result<()> {
        let frame = render::render_frame(self);
        let mut stdout = io::stdout();

        if *painted > 0 {
            let rows = (*painted).min(u16::MAX as usize) as u16;
            execute!(stdout, term_cursor::MoveUp(rows), terminal::Clear(terminal::ClearType::FromCursorDown))
                .context("Failed to rewind frame")?;
        }

        let mut rows = 0usize;
        for line in frame.lines() {
            write!(stdout, "{line}\r\n").context("Failed to write frame")?;
            rows += 1;
        }
        stdout.flush().context("Failed to flush frame")?;
        *painted = rows;
        Ok(())
    }
}

/// Spawn each command; its result re-enters the serialized event stream.
fn dispatch(cmds: Vec<Cmd>, results: &mpsc::UnboundedSender<Event>) {
    for cmd in cmds {
        let results = results.clone();
        tokio::spawn(async move {
            // A closed channel means the run is over and the result is moot
            let _ = results.send(cmd.await);
        });
    }
}

/// Restores the terminal even on early return or panic
struct RawModeGuard;

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}
