//! Run-level statistics
//!
//! Success and error counts are derived state: they are recomputed from the
//! steps already passed by the cursor, never mutated independently. The
//! halting step needs special care - it sits at the cursor rather than
//! before it, so its failure is attributed exactly once by the bound check
//! below.

use crate::step::Step;

/// Run status derived from the statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Steps remain and nothing has failed yet
    InProgress,
    /// Every step completed without failure
    Success,
    /// At least one step failed
    Problem,
}

impl RunStatus {
    /// Display label for the status tag
    pub fn label(&self) -> &'static str {
        match self {
            Self::InProgress => "IN PROGRESS",
            Self::Success => "SUCCESS",
            Self::Problem => "PROBLEM",
        }
    }
}

/// Aggregated success/error counts
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub success_count: usize,
    pub error_count: usize,
}

impl Stats {
    /// Recompute counts from the steps the cursor has passed.
    ///
    /// Scans `steps[0 .. min(cursor, len)]`; when the queue halted on a step
    /// at or beyond that bound, the halting failure is added exactly once.
    pub fn recompute(steps: &[Box<dyn Step>], cursor: usize, halted: bool, halting_step: Option<usize>) -> Self {
        let scanned = cursor.min(steps.len());

        let mut stats = Self::default();
        for step in &steps[..scanned] {
            if !step.is_complete() {
                continue;
            }
            if step.has_failure() {
                stats.error_count += 1;
            } else {
                stats.success_count += 1;
            }
        }

        if halted
            && let Some(index) = halting_step
            && index >= scanned
            && steps.get(index).is_some_and(|s| s.has_failure())
        {
            stats.error_count += 1;
        }

        stats
    }

    /// Status tag for a queue of `total` steps.
    pub fn status(&self, total: usize) -> RunStatus {
        if self.error_count > 0 {
            RunStatus::Problem
        } else if self.success_count == total {
            RunStatus::Success
        } else {
            RunStatus::InProgress
        }
    }

    /// Summary line, e.g. "Completed 3 of 3 tasks".
    pub fn summary_text(&self, total: usize) -> String {
        format!("Completed {} of {} tasks", self.success_count, total)
    }
}

#[cfg(test)]
mod tests {
    use eyre::Report;

    use super::*;
    use crate::events::{Cmd, Event};

    struct Fixed {
        done: bool,
        failure: Option<Report>,
    }

    impl Fixed {
        fn ok() -> Box<dyn Step> {
            Box::new(Self { done: true, failure: None })
        }

        fn failed() -> Box<dyn Step> {
            Box::new(Self {
                done: true,
                failure: Some(eyre::eyre!("boom")),
            })
        }

        fn pending() -> Box<dyn Step> {
            Box::new(Self { done: false, failure: None })
        }
    }

    impl Step for Fixed {
        fn title(&self) -> &str {
            "fixed"
        }

        fn handle_event(&mut self, _event: &Event) -> Option<Cmd> {
            None
        }

        fn is_complete(&self) -> bool {
            self.done
        }

        fn failure(&self) -> Option<&Report> {
            self.failure.as_ref()
        }

        fn render_active(&self, _width: usize) -> String {
            String::new()
        }

        fn render_final(&self, _width: usize) -> String {
            String::new()
        }

        fn halts_on_failure(&self) -> bool {
            false
        }

        fn set_halts_on_failure(&mut self, _halt: bool) {}
    }

    #[test]
    fn test_recompute_counts_passed_steps() {
        let steps = vec![Fixed::ok(), Fixed::failed(), Fixed::ok(), Fixed::pending()];
        let stats = Stats::recompute(&steps, 3, false, None);
        assert_eq!(stats.success_count, 2);
        assert_eq!(stats.error_count, 1);
    }

    #[test]
    fn test_recompute_ignores_steps_past_cursor() {
        let steps = vec![Fixed::ok(), Fixed::failed()];
        let stats = Stats::recompute(&steps, 1, false, None);
        assert_eq!(stats.success_count, 1);
        assert_eq!(stats.error_count, 0);
    }

    #[test]
    fn test_halting_step_at_cursor_counted_exactly_once() {
        // The halting step sits at the cursor, outside the scanned range
        let steps = vec![Fixed::ok(), Fixed::failed(), Fixed::pending()];
        let stats = Stats::recompute(&steps, 1, true, Some(1));
        assert_eq!(stats.success_count, 1);
        assert_eq!(stats.error_count, 1);
    }

    #[test]
    fn test_halting_step_inside_scan_not_double_counted() {
        // If the cursor already passed the halting step, the scan sees it
        let steps = vec![Fixed::ok(), Fixed::failed(), Fixed::pending()];
        let stats = Stats::recompute(&steps, 2, true, Some(1));
        assert_eq!(stats.error_count, 1);
    }

    #[test]
    fn test_status_selection() {
        let ok = Stats { success_count: 3, error_count: 0 };
        assert_eq!(ok.status(3), RunStatus::Success);

        let partial = Stats { success_count: 1, error_count: 0 };
        assert_eq!(partial.status(3), RunStatus::InProgress);

        let broken = Stats { success_count: 2, error_count: 1 };
        assert_eq!(broken.status(3), RunStatus::Problem);
    }

    #[test]
    fn test_empty_queue_is_success() {
        let stats = Stats::default();
        assert_eq!(stats.status(0), RunStatus::Success);
    }

    #[test]
    fn test_summary_text() {
        let stats = Stats { success_count: 2, error_count: 1 };
        assert_eq!(stats.summary_text(3), "Completed 2 of 3 tasks");
    }
}
