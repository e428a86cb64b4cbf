//! Post-processing passes over the rendered line buffer
//!
//! Both passes address the character grid by rune index rather than tracking
//! columns during emission, which keeps the emission loop declarative.

use super::style::{CONNECTOR_CHAR, RULE_CHAR};

/// Remove the trailing horizontal rule if the last emitted line is purely a
/// rule - it would duplicate the closing rule appended afterwards.
pub fn dedup_trailing_rule(lines: &mut Vec<String>) {
    let Some(last) = lines.last() else {
        return;
    };
    let stripped = strip_ansi_escapes::strip_str(last);
    if !stripped.is_empty() && stripped.chars().all(|c| c == RULE_CHAR) {
        lines.pop();
    }
}

/// Blank vertical connector glyphs that sit in `glyph_col` on lines below
/// `glyph_row`, so no connector dangles past the final step.
pub fn erase_dangling_connectors(lines: &mut [String], glyph_row: usize, glyph_col: usize) {
    for line in lines.iter_mut().skip(glyph_row + 1) {
        let stripped = strip_ansi_escapes::strip_str(line.as_str());
        let mut chars: Vec<char> = stripped.chars().collect();
        if chars.get(glyph_col).copied() != Some(CONNECTOR_CHAR) {
            continue;
        }
        chars[glyph_col] = ' ';
        let rebuilt: String = chars.into_iter().collect();
        *line = rebuilt.trim_end().to_string();
    }
}
