//! Render pipeline
//!
//! Turns the queue's current state into one text frame: header, per-step
//! lines, connecting rules, and a summary footer or cleanup pass. Rendering
//! is pure in queue state and width - two renders of an unchanged queue are
//! byte-identical - so the runner can repaint on every event.

pub mod cache;
mod cleanup;
pub mod numbering;
pub mod style;

pub use cache::RuleKind;
pub use numbering::{NumberFormat, Numbering, position_for};
pub use style::{ErrorStatusColor, TitleStyle, layout_width};

use colored::Colorize;

use crate::queue::Queue;

/// Render the queue into a frame of newline-joined lines.
pub(crate) fn render_frame(queue: &mut Queue) -> String {
    let width = style::layout_width(queue.display.screen_width);
    let numbering = queue.display.numbering.clone();
    let error_status = queue.display.error_status;
    let result_separators = queue.display.result_separators;
    let show_summary = queue.display.show_summary;
    let cursor = queue.cursor;
    let halted = queue.halted;
    let total = queue.steps.len();

    let first_step_failed = queue
        .steps
        .first()
        .is_some_and(|s| s.is_complete() && s.has_failure());

    let mut lines = cache::take_buffer();

    // Header: rule, title + optional badge, rule
    lines.push(cache::rule(RuleKind::Frame, width));
    lines.push(style::title_line(
        &queue.display.title,
        queue.display.title_style,
        queue
            .display
            .app_name
            .as_deref()
            .map(|name| (name, queue.display.app_name_color)),
        width,
    ));
    lines.push(cache::rule(RuleKind::Frame, width));

    // Step entries; pending steps past the cursor emit nothing
    let mut glyph_pos: Option<(usize, usize)> = None;
    for i in 0..total {
        if i > cursor {
            break;
        }
        let complete = queue.steps[i].is_complete();

        if i < cursor || (i == cursor && complete) {
            let failed = queue.steps[i].has_failure();
            let prefix = match numbering::position_for(i, &numbering, first_step_failed) {
                Some(position) => {
                    let text = numbering.format.render(position);
                    match queue.steps[i].final_prefix_override() {
                        Some(cap) => {
                            cap.set_final_prefix(text.clone());
                            style::numbered_final_prefix(&text, failed, error_status)
                        }
                        None => style::done_glyph(failed, error_status),
                    }
                }
                None => style::done_glyph(failed, error_status),
            };

            let text = queue.steps[i].render_final(width);
            let mut text_lines = text.lines();
            let first = text_lines.next().unwrap_or("");
            glyph_pos = Some((lines.len(), 0));
            lines.push(format!("{prefix} {first}"));

            let rest: Vec<&str> = text_lines.collect();
            if !rest.is_empty() && result_separators {
                let kind = if failed {
                    RuleKind::Error(error_status)
                } else {
                    RuleKind::Result
                };
                lines.push(cache::rule(kind, width));
            }
            for line in rest {
                lines.push(line.to_string());
            }
        } else if i == cursor {
            let failed = queue.steps[i].has_failure();
            let prefix = match numbering::position_for(i, &numbering, first_step_failed) {
                Some(position) => {
                    let text = numbering.format.render(position);
                    match queue.steps[i].active_prefix_override() {
                        Some(cap) => {
                            cap.set_active_prefix(text.clone());
                            style::numbered_active_prefix(&text)
                        }
                        None => style::active_glyph(),
                    }
                }
                None => style::active_glyph(),
            };

            let text = queue.steps[i].render_active(width);
            let mut text_lines = text.lines();
            let first = text_lines.next().unwrap_or("");
            glyph_pos = Some((lines.len(), 0));
            lines.push(format!("{prefix} {first}"));
            for line in text_lines {
                lines.push(line.to_string());
            }

            if !halted && !failed {
                lines.push(style::connector());
            }
        }
    }

    cleanup::dedup_trailing_rule(&mut lines);

    let finished = halted || cursor >= total;
    if !finished {
        lines.push(cache::rule(RuleKind::Frame, width));
    } else if show_summary {
        let status = queue.stats.status(total);
        let left = format!(
            "{} {}",
            style::done_glyph(false, error_status),
            queue.stats.summary_text(total).bold()
        );
        let tag = style::status_tag(status, error_status);
        lines.push(style::align_ends(&left, &tag, width));
        lines.push(cache::rule(RuleKind::Frame, width));
    } else {
        if let Some((row, col)) = glyph_pos {
            cleanup::erase_dangling_connectors(&mut lines, row, col);
        }
        lines.push(cache::rule(RuleKind::Frame, width));
    }

    let frame = lines.join("\n");
    cache::give_buffer(lines);
    frame
}
