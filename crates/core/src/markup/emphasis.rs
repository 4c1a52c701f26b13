use crate::markup::Segment;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Words that carry emotional weight in devotional and supportive content.
pub const EMPHASIS_WORDS: &[&str] = &[
    "god", "lord", "jesus", "christ", "holy", "love", "loved", "grace", "mercy", "peace", "hope",
    "faith", "joy", "forgive", "forgiven", "blessed", "strength", "eternal", "salvation",
    "never", "always", "amen",
];

/// Repeats beyond this count are left unmarked.
pub const MAX_EMPHASIS_PER_WORD: usize = 2;

const EMPHASIS_OPEN: &str = "<emphasis level=\"moderate\">";
const EMPHASIS_CLOSE: &str = "</emphasis>";

static EMPHASIS_RE: LazyLock<Regex> = LazyLock::new(|| {
    let alternation = EMPHASIS_WORDS.join("|");
    Regex::new(&format!(r"(?i)\b(?:{alternation})\b"))
        .expect("emphasis vocabulary compiles to a valid regex")
});

/// Wraps vocabulary words found in text segments. Matching ignores case;
/// the original spelling is kept inside the tag.
pub(crate) fn apply_emphasis(segments: Vec<Segment>) -> Vec<Segment> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut out = Vec::with_capacity(segments.len());

    for segment in segments {
        let text = match segment {
            Segment::Text(t) => t,
            tag => {
                out.push(tag);
                continue;
            }
        };

        let mut last = 0;
        for m in EMPHASIS_RE.find_iter(&text) {
            let count = counts.entry(m.as_str().to_lowercase()).or_insert(0);
            if *count >= MAX_EMPHASIS_PER_WORD {
                continue;
            }
            *count += 1;

            if m.start() > last {
                out.push(Segment::Text(text[last..m.start()].to_owned()));
            }
            out.push(Segment::Tag(EMPHASIS_OPEN.to_owned()));
            out.push(Segment::Text(m.as_str().to_owned()));
            out.push(Segment::Tag(EMPHASIS_CLOSE.to_owned()));
            last = m.end();
        }
        if last < text.len() {
            out.push(Segment::Text(text[last..].to_owned()));
        }
    }
    out
}
