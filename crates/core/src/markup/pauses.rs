use crate::markup::{break_tag, Segment};

pub const ELLIPSIS_PAUSE_MS: u32 = 700;
pub const BREATH_PAUSE_MS: u32 = 1000;

/// A punctuation pattern and the pause inserted after it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PauseRule {
    pub pattern: &'static str,
    pub base_ms: u32,
    /// Only fire when followed by whitespace, a closing quote or end of text,
    /// so `3.16`, `1,000` and `John 3:16` stay untouched.
    pub needs_boundary: bool,
}

const fn rule(pattern: &'static str, base_ms: u32, needs_boundary: bool) -> PauseRule {
    PauseRule {
        pattern,
        base_ms,
        needs_boundary,
    }
}

/// Tried in order at every position; the first match wins. Longer and rarer
/// patterns come before the ones they contain.
pub const PAUSE_RULES: &[PauseRule] = &[
    rule("...", ELLIPSIS_PAUSE_MS, false),
    rule("\u{2026}", ELLIPSIS_PAUSE_MS, false),
    rule("?!", 550, true),
    rule("!?", 550, true),
    rule("?", 500, true),
    rule("!", 500, true),
    rule(".", 500, true),
    rule(";", 400, true),
    rule(":", 400, true),
    rule("\u{2014}", 300, false),
    rule("\u{2013}", 300, false),
    rule(" - ", 300, false),
    rule(",", 250, true),
];

// Entities produced by `escape`. Scanned as a unit so `&quot;` never
// triggers the `;` rule.
const ENTITIES: &[&str] = &["&amp;", "&lt;", "&gt;", "&quot;", "&apos;"];
const CLOSING_ENTITIES: &[&str] = &["&quot;", "&apos;"];

fn scaled(base_ms: u32, multiplier: f32) -> u32 {
    (base_ms as f32 * multiplier.max(0.0)).round() as u32
}

fn at_boundary(rest: &str) -> bool {
    match rest.chars().next() {
        None => true,
        Some(c) if c.is_whitespace() || matches!(c, ')' | ']') => true,
        Some(_) => CLOSING_ENTITIES.iter().any(|e| rest.starts_with(e)),
    }
}

/// Single left-to-right pass over escaped text. Output is never rescanned,
/// so a pattern can only be consumed once.
pub(crate) fn insert_pauses(escaped: &str, multiplier: f32) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut text = String::new();
    let mut i = 0;

    'scan: while i < escaped.len() {
        let rest = &escaped[i..];

        if let Some(entity) = ENTITIES.iter().find(|e| rest.starts_with(*e)) {
            text.push_str(entity);
            i += entity.len();
            continue;
        }

        for rule in PAUSE_RULES {
            if !rest.starts_with(rule.pattern) {
                continue;
            }
            let after = &rest[rule.pattern.len()..];
            if rule.needs_boundary && !at_boundary(after) {
                continue;
            }
            text.push_str(rule.pattern);
            let ms = scaled(rule.base_ms, multiplier);
            if ms > 0 {
                segments.push(Segment::Text(std::mem::take(&mut text)));
                segments.push(Segment::Tag(break_tag(ms)));
            }
            i += rule.pattern.len();
            continue 'scan;
        }

        // Not a pattern start: copy one char.
        let c = rest.chars().next().unwrap_or_default();
        text.push(c);
        i += c.len_utf8().max(1);
    }

    if !text.is_empty() {
        segments.push(Segment::Text(text));
    }
    segments
}

/// Replace blank-line paragraph breaks inside text segments with a long pause.
pub(crate) fn insert_breaths(segments: Vec<Segment>, multiplier: f32) -> Vec<Segment> {
    // Breaths may stretch with the mood but never shrink below the base.
    let ms = scaled(BREATH_PAUSE_MS, multiplier.max(1.0));
    let mut out = Vec::with_capacity(segments.len());

    for segment in segments {
        let text = match segment {
            Segment::Text(t) => t,
            tag => {
                out.push(tag);
                continue;
            }
        };

        let mut paragraphs = split_paragraphs(&text).into_iter().peekable();
        while let Some(paragraph) = paragraphs.next() {
            if !paragraph.is_empty() {
                out.push(Segment::Text(paragraph.to_owned()));
            }
            if paragraphs.peek().is_some() {
                out.push(Segment::Tag(break_tag(ms)));
            }
        }
    }
    out
}

/// Splits on runs of whitespace that contain at least two newlines.
fn split_paragraphs(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut run_start = None;
    let mut newlines = 0;

    for (idx, c) in text.char_indices() {
        if c.is_whitespace() {
            if run_start.is_none() {
                run_start = Some(idx);
                newlines = 0;
            }
            if c == '\n' {
                newlines += 1;
            }
            continue;
        }
        if let Some(rs) = run_start.take() {
            if newlines >= 2 {
                parts.push(&text[start..rs]);
                start = idx;
            }
        }
    }
    if let Some(rs) = run_start {
        if newlines >= 2 {
            parts.push(&text[start..rs]);
            start = text.len();
            parts.push(&text[start..]);
            return parts;
        }
    }
    parts.push(&text[start..]);
    parts
}
