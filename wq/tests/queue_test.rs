//! Integration tests for WizQueue
//!
//! These tests drive the orchestrator through its public surface only: the
//! state machine via `start`/`handle`, the render pipeline via `render`.

use std::sync::Once;

use eyre::Report;
use proptest::prelude::*;
use serial_test::serial;
use wizqueue::{Cmd, Event, NumberFormat, Outcome, Queue, RunStatus, Step, Tunables, cmd};

static INIT: Once = Once::new();

fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// How a test step completes
#[derive(Clone, Copy, PartialEq, Eq)]
enum Completes {
    /// On the next tick event
    OnTick,
    /// When its own action result arrives
    OnAction,
}

struct TestStep {
    title: String,
    completes: Completes,
    fail: bool,
    halts: bool,
    done: bool,
    failure: Option<Report>,
}

impl TestStep {
    fn new(title: impl Into<String>, completes: Completes) -> Self {
        Self {
            title: title.into(),
            completes,
            fail: false,
            halts: false,
            done: false,
            failure: None,
        }
    }

    fn ok(title: impl Into<String>) -> Box<dyn Step> {
        Box::new(Self::new(title, Completes::OnTick))
    }

    fn failing(title: impl Into<String>, halts: bool) -> Box<dyn Step> {
        let mut step = Self::new(title, Completes::OnTick);
        step.fail = true;
        step.halts = halts;
        Box::new(step)
    }

    fn background(title: impl Into<String>) -> Box<dyn Step> {
        Box::new(Self::new(title, Completes::OnAction))
    }

    fn complete(&mut self) {
        self.done = true;
        if self.fail {
            self.failure = Some(eyre::eyre!("{} failed", self.title));
        }
    }
}

impl Step for TestStep {
    fn title(&self) -> &str {
        &self.title
    }

    fn begin(&mut self) -> Option<Cmd> {
        if self.completes == Completes::OnAction {
            let payload = format!("done:{}", self.title);
            Some(cmd(async move { Event::action(payload) }))
        } else {
            None
        }
    }

    fn handle_event(&mut self, event: &Event) -> Option<Cmd> {
        if self.done {
            return None;
        }
        match self.completes {
            Completes::OnTick => {
                if matches!(event, Event::Tick) {
                    self.complete();
                }
            }
            Completes::OnAction => {
                let expected = format!("done:{}", self.title);
                if event.action_as::<String>() == Some(&expected) {
                    self.complete();
                }
            }
        }
        None
    }

    fn is_complete(&self) -> bool {
        self.done
    }

    fn failure(&self) -> Option<&Report> {
        self.failure.as_ref()
    }

    fn render_active(&self, _width: usize) -> String {
        format!("{} ...", self.title)
    }

    fn render_final(&self, _width: usize) -> String {
        match &self.failure {
            Some(failure) => format!("{}: {}", self.title, failure),
            None => format!("{} done", self.title),
        }
    }

    fn halts_on_failure(&self) -> bool {
        self.halts
    }

    fn set_halts_on_failure(&mut self, halt: bool) {
        self.halts = halt;
    }
}

fn queue(steps: Vec<Box<dyn Step>>) -> Queue {
    Queue::with_tunables("Test run", steps, Tunables::default())
}

/// Drive a started queue with ticks until it terminates or `limit` is hit.
fn drive(q: &mut Queue, limit: usize) {
    for _ in 0..limit {
        if q.handle(&Event::Tick).0 == Outcome::Terminate {
            break;
        }
    }
}

// =============================================================================
// State machine
// =============================================================================

#[test]
fn test_three_steps_all_succeed() {
    init_tracing();
    let mut q = queue(vec![TestStep::ok("one"), TestStep::ok("two"), TestStep::ok("three")]);

    assert_eq!(q.start().0, Outcome::Continue);
    drive(&mut q, 10);

    assert!(q.is_finished());
    assert!(!q.is_halted());
    assert_eq!(q.cursor(), 3);
    assert_eq!(q.stats().success_count, 3);
    assert_eq!(q.stats().error_count, 0);
    assert_eq!(q.stats().status(q.len()), RunStatus::Success);
}

#[test]
fn test_halt_on_second_step() {
    init_tracing();
    let mut q = queue(vec![
        TestStep::ok("one"),
        TestStep::failing("two", true),
        TestStep::ok("three"),
    ]);

    q.start();
    drive(&mut q, 10);

    assert!(q.is_halted());
    assert_eq!(q.cursor(), 1);
    assert_eq!(q.halting_index(), Some(1));
    assert!(!q.steps()[2].is_complete());
    assert_eq!(q.stats().success_count, 1);
    assert_eq!(q.stats().error_count, 1);
}

#[test]
fn test_empty_queue_terminates_immediately() {
    init_tracing();
    let mut q = queue(vec![]);
    assert_eq!(q.start().0, Outcome::Terminate);
    assert_eq!(q.handle(&Event::Tick).0, Outcome::Terminate);
    assert_eq!(q.stats().success_count, 0);
    assert_eq!(q.stats().error_count, 0);
}

// =============================================================================
// Asynchronous actions
// =============================================================================

#[tokio::test]
async fn test_background_steps_complete_through_action_results() {
    init_tracing();
    let mut q = queue(vec![TestStep::background("fetch"), TestStep::background("unpack")]);

    let (outcome, mut cmds) = q.start();
    assert_eq!(outcome, Outcome::Continue);

    // Each action result re-enters the loop and completes its step, which
    // begins the next step and yields its action
    while let Some(cmd) = cmds.pop() {
        let event = cmd.await;
        let (_, next) = q.handle(&event);
        cmds.extend(next);
    }

    assert!(q.is_finished());
    assert_eq!(q.stats().success_count, 2);
}

#[tokio::test]
async fn test_stale_action_result_after_interrupt_is_ignored() {
    init_tracing();
    let mut q = queue(vec![TestStep::background("fetch")]);

    let (_, mut cmds) = q.start();
    let pending = cmds.pop().expect("begin action");

    assert_eq!(q.handle(&Event::Interrupt).0, Outcome::Terminate);
    assert!(q.is_halted());

    // The in-flight action resolves after cancellation; its result is moot
    let stale = pending.await;
    assert_eq!(q.handle(&stale).0, Outcome::Terminate);
    assert!(!q.steps()[0].is_complete());
}

// =============================================================================
// Rendering
// =============================================================================

#[test]
#[serial]
fn test_success_summary_rendering() {
    init_tracing();
    colored::control::set_override(false);
    let mut q = queue(vec![TestStep::ok("one"), TestStep::ok("two"), TestStep::ok("three")]);
    q.start();
    drive(&mut q, 10);

    let frame = q.render();
    assert!(frame.contains("✓ one done"));
    assert!(frame.contains("✓ three done"));
    assert!(frame.contains("Completed 3 of 3 tasks"));
    assert!(frame.contains("SUCCESS"));
    colored::control::unset_override();
}

#[test]
#[serial]
fn test_halted_run_rendering() {
    init_tracing();
    colored::control::set_override(false);
    let mut q = queue(vec![
        TestStep::ok("one"),
        TestStep::failing("two", true),
        TestStep::ok("three"),
    ]);
    q.start();
    drive(&mut q, 10);

    let frame = q.render();
    // Every step up to and including the halting one, with its error text
    assert!(frame.contains("✓ one done"));
    assert!(frame.contains("✖ two: two failed"));
    // The never-run step does not appear
    assert!(!frame.contains("three"));
    assert!(frame.contains("Completed 1 of 3 tasks"));
    assert!(frame.contains("PROBLEM"));
    colored::control::unset_override();
}

#[test]
#[serial]
fn test_render_is_idempotent_at_every_stage() {
    init_tracing();
    colored::control::set_override(false);
    let mut q = queue(vec![TestStep::ok("one"), TestStep::ok("two")]);
    q.start();

    loop {
        let first = q.render();
        let second = q.render();
        assert_eq!(first, second);
        if q.handle(&Event::Tick).0 == Outcome::Terminate {
            break;
        }
    }
    assert_eq!(q.render(), q.render());
    colored::control::unset_override();
}

#[test]
#[serial]
fn test_numbering_against_configured_format() {
    init_tracing();
    colored::control::set_override(false);

    struct Numbered {
        inner: TestStep,
        final_prefix: Option<String>,
        active_prefix: Option<String>,
    }

    impl Step for Numbered {
        fn title(&self) -> &str {
            self.inner.title()
        }

        fn handle_event(&mut self, event: &Event) -> Option<Cmd> {
            self.inner.handle_event(event)
        }

        fn is_complete(&self) -> bool {
            self.inner.is_complete()
        }

        fn failure(&self) -> Option<&Report> {
            self.inner.failure()
        }

        fn render_active(&self, width: usize) -> String {
            self.inner.render_active(width)
        }

        fn render_final(&self, width: usize) -> String {
            self.inner.render_final(width)
        }

        fn halts_on_failure(&self) -> bool {
            self.inner.halts_on_failure()
        }

        fn set_halts_on_failure(&mut self, halt: bool) {
            self.inner.set_halts_on_failure(halt);
        }

        fn final_prefix_override(&mut self) -> Option<&mut dyn wizqueue::FinalPrefixOverride> {
            Some(self)
        }

        fn active_prefix_override(&mut self) -> Option<&mut dyn wizqueue::ActivePrefixOverride> {
            Some(self)
        }
    }

    impl wizqueue::FinalPrefixOverride for Numbered {
        fn set_final_prefix(&mut self, prefix: String) {
            self.final_prefix = Some(prefix);
        }
    }

    impl wizqueue::ActivePrefixOverride for Numbered {
        fn set_active_prefix(&mut self, prefix: String) {
            self.active_prefix = Some(prefix);
        }
    }

    fn numbered(title: &str) -> Box<dyn Step> {
        Box::new(Numbered {
            inner: TestStep::new(title, Completes::OnTick),
            final_prefix: None,
            active_prefix: None,
        })
    }

    let mut q = Queue::with_tunables(
        "Test run",
        vec![numbered("one"), numbered("two"), numbered("three")],
        Tunables::default(),
    )
    .with_numbering(true, false, NumberFormat::default());

    q.start();
    drive(&mut q, 10);

    let frame = q.render();
    assert!(frame.contains("[01] one done"));
    assert!(frame.contains("[02] two done"));
    assert!(frame.contains("[03] three done"));

    // Keep-first-symbol: the first successful step retains its glyph and the
    // second is numbered 1
    let mut q = Queue::with_tunables(
        "Test run",
        vec![numbered("one"), numbered("two")],
        Tunables::default(),
    )
    .with_numbering(true, true, NumberFormat::default());
    q.start();
    drive(&mut q, 10);

    let frame = q.render();
    assert!(frame.contains("✓ one done"));
    assert!(frame.contains("[01] two done"));
    colored::control::unset_override();
}

// =============================================================================
// Memory eviction
// =============================================================================

#[test]
fn test_eviction_bounds_history_and_preserves_active_step() {
    init_tracing();
    let steps: Vec<Box<dyn Step>> = (1..=30).map(|i| TestStep::ok(format!("step-{i:02}"))).collect();

    let mut q = Queue::with_tunables(
        "Test run",
        steps,
        Tunables {
            max_completed_tasks: 5,
            memory_threshold: u64::MAX,
        },
    );
    q.start();

    for completed in 1..=20 {
        q.handle(&Event::Tick);
        assert!(!q.is_finished());
        // History never exceeds the cap by more than the step completing now
        assert!(q.cursor() <= 6, "history {} after {completed} completions", q.cursor());
        // The active step is always the next unstarted one
        let active = q.steps()[q.cursor()].title().to_string();
        assert_eq!(active, format!("step-{:02}", completed + 1));
    }
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn prop_all_success_runs_to_completion(n in 1usize..20) {
        let steps: Vec<Box<dyn Step>> = (0..n).map(|i| TestStep::ok(format!("step-{i}"))).collect();
        let mut q = queue(steps);
        q.start();
        drive(&mut q, n + 1);

        prop_assert!(q.is_finished());
        prop_assert!(!q.is_halted());
        prop_assert_eq!(q.cursor(), n);
        prop_assert_eq!(q.stats().success_count, n);
        prop_assert_eq!(q.stats().error_count, 0);
        prop_assert_eq!(q.stats().status(q.len()), RunStatus::Success);
    }

    #[test]
    fn prop_halting_failure_counted_exactly_once(n in 1usize..12, k in 0usize..12) {
        let k = k % n;
        let steps: Vec<Box<dyn Step>> = (0..n)
            .map(|i| {
                if i == k {
                    TestStep::failing(format!("step-{i}"), true)
                } else {
                    TestStep::ok(format!("step-{i}"))
                }
            })
            .collect();

        let mut q = queue(steps);
        q.start();
        drive(&mut q, n + 1);

        prop_assert!(q.is_halted());
        prop_assert_eq!(q.cursor(), k);
        prop_assert_eq!(q.halting_index(), Some(k));
        prop_assert_eq!(q.stats().error_count, 1);
        prop_assert_eq!(q.stats().success_count, k);
        for step in &q.steps()[k + 1..] {
            prop_assert!(!step.is_complete());
        }
    }

    #[test]
    fn prop_non_halting_failure_lets_the_run_continue(n in 1usize..12, k in 0usize..12) {
        let k = k % n;
        let steps: Vec<Box<dyn Step>> = (0..n)
            .map(|i| {
                if i == k {
                    TestStep::failing(format!("step-{i}"), false)
                } else {
                    TestStep::ok(format!("step-{i}"))
                }
            })
            .collect();

        let mut q = queue(steps);
        q.start();
        drive(&mut q, n + 1);

        prop_assert!(q.is_finished());
        prop_assert!(!q.is_halted());
        prop_assert_eq!(q.cursor(), n);
        prop_assert_eq!(q.stats().error_count, 1);
        prop_assert_eq!(q.stats().success_count, n - 1);
        prop_assert_eq!(q.stats().status(q.len()), RunStatus::Problem);
    }
}
