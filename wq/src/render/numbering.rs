//! Step numbering
//!
//! When enabled, completed (and active) steps show a numeric prefix instead
//! of their glyph. The template turns a 1-based position into the prefix
//! text; keep-first-symbol mode leaves the very first step its glyph unless
//! it failed, shifting later numbers down by one.

/// Prefix template: the first run of `N` is replaced by the position,
/// zero-padded to the run's length. `"[NN]"` renders position 1 as `"[01]"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberFormat(String);

impl Default for NumberFormat {
    fn default() -> Self {
        Self("[NN]".to_string())
    }
}

impl NumberFormat {
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    /// Expand the template for a 1-based position.
    pub fn render(&self, position: usize) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        let Some(start) = chars.iter().position(|&c| c == 'N') else {
            return position.to_string();
        };
        let run = chars[start..].iter().take_while(|&&c| c == 'N').count();

        let mut out: String = chars[..start].iter().collect();
        out.push_str(&format!("{position:0run$}"));
        out.extend(&chars[start + run..]);
        out
    }
}

/// Numbering mode configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Numbering {
    pub enabled: bool,
    pub keep_first_symbol: bool,
    pub format: NumberFormat,
}

/// The 1-based position to display for the step at `index`, or `None` when
/// the step keeps its glyph.
///
/// `first_step_failed` is whether the queue's first step completed with a
/// failure - a failed first step is never exempted from numbering.
pub fn position_for(index: usize, numbering: &Numbering, first_step_failed: bool) -> Option<usize> {
    if !numbering.enabled {
        return None;
    }

    if numbering.keep_first_symbol {
        if index == 0 {
            return first_step_failed.then_some(1);
        }
        // Numbers shift down by one while the first step keeps its symbol
        return Some(if first_step_failed { index + 1 } else { index });
    }

    Some(index + 1)
}
