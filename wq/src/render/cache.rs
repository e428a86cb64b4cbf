//! Interned rule strings and the shared line-buffer pool
//!
//! Rules repeat on every frame at the same handful of widths, so they are
//! built once and interned process-wide. The memory guardian clears both
//! structures under pressure; everything here is reached only from the
//! serialized event path.

use std::collections::HashMap;
use std::sync::Mutex;

use colored::Colorize;
use once_cell::sync::Lazy;

use super::style::{ErrorStatusColor, RULE_CHAR};

/// Rule flavor, part of the intern key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    /// Frame rules: header, closing, in-progress trailer
    Frame,
    /// Separator above a successful step's extra result lines
    Result,
    /// Separator above a failed step's extra result lines
    Error(ErrorStatusColor),
}

static RULE_CACHE: Lazy<Mutex<HashMap<(RuleKind, usize), String>>> = Lazy::new(|| Mutex::new(HashMap::new()));

static LINE_BUFFERS: Lazy<Mutex<Vec<Vec<String>>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// Buffers kept around between frames.
const POOL_LIMIT: usize = 4;

fn build_rule(kind: RuleKind, width: usize) -> String {
    let bar: String = RULE_CHAR.to_string().repeat(width);
    match kind {
        RuleKind::Frame => bar.dimmed().to_string(),
        RuleKind::Result => bar.green().dimmed().to_string(),
        RuleKind::Error(status) => bar.color(status.color()).to_string(),
    }
}

/// A horizontal rule of the given kind and width, interned.
pub fn rule(kind: RuleKind, width: usize) -> String {
    let mut cache = match RULE_CACHE.lock() {
        Ok(cache) => cache,
        Err(poisoned) => poisoned.into_inner(),
    };
    cache.entry((kind, width)).or_insert_with(|| build_rule(kind, width)).clone()
}

/// Drop every interned rule.
pub fn clear_rule_cache() {
    let mut cache = match RULE_CACHE.lock() {
        Ok(cache) => cache,
        Err(poisoned) => poisoned.into_inner(),
    };
    cache.clear();
    cache.shrink_to_fit();
}

/// Borrow a line buffer from the pool.
pub fn take_buffer() -> Vec<String> {
    let mut pool = match LINE_BUFFERS.lock() {
        Ok(pool) => pool,
        Err(poisoned) => poisoned.into_inner(),
    };
    pool.pop().unwrap_or_default()
}

/// Return a line buffer to the pool.
pub fn give_buffer(mut buffer: Vec<String>) {
    buffer.clear();
    let mut pool = match LINE_BUFFERS.lock() {
        Ok(pool) => pool,
        Err(poisoned) => poisoned.into_inner(),
    };
    if pool.len() < POOL_LIMIT {
        pool.push(buffer);
    }
}

/// Release every pooled buffer.
pub fn release_buffers() {
    let mut pool = match LINE_BUFFERS.lock() {
        Ok(pool) => pool,
        Err(poisoned) => poisoned.into_inner(),
    };
    pool.clear();
    pool.shrink_to_fit();
}
