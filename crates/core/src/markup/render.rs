//! Views of generated markup for providers that cannot take all of it.

const ENTITIES: &[(&str, char)] = &[
    ("&amp;", '&'),
    ("&lt;", '<'),
    ("&gt;", '>'),
    ("&quot;", '"'),
    ("&apos;", '\''),
];

/// Inverse of [`super::escape`], in a single pass.
pub fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        match ENTITIES.iter().find(|(e, _)| rest.starts_with(e)) {
            Some((entity, c)) => {
                out.push(*c);
                rest = &rest[entity.len()..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Splits markup into `(is_tag, slice)` pieces. Escaped text never contains
/// `<`, so every `<` starts a tag.
fn pieces(markup: &str) -> Vec<(bool, &str)> {
    let mut out = Vec::new();
    let mut rest = markup;
    while let Some(open) = rest.find('<') {
        if open > 0 {
            out.push((false, &rest[..open]));
        }
        match rest[open..].find('>') {
            Some(close) => {
                out.push((true, &rest[open..open + close + 1]));
                rest = &rest[open + close + 1..];
            }
            None => {
                out.push((false, &rest[open..]));
                rest = "";
            }
        }
    }
    if !rest.is_empty() {
        out.push((false, rest));
    }
    out
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_break(tag: &str) -> bool {
    tag.starts_with("<break")
}

/// All tags removed and entities decoded. Pauses become a single space.
pub fn to_plain_text(markup: &str) -> String {
    let text: String = pieces(markup)
        .into_iter()
        .map(|(is_tag, s)| match (is_tag, is_break(s)) {
            (false, _) => s,
            (true, true) => " ",
            (true, false) => "",
        })
        .collect();
    collapse_whitespace(&unescape(&text))
}

/// Decoded text with only `<break .../>` tags kept.
pub fn to_break_text(markup: &str) -> String {
    let mut out = String::with_capacity(markup.len());
    for (is_tag, s) in pieces(markup) {
        if !is_tag {
            out.push_str(&unescape(s));
        } else if is_break(s) {
            out.push_str(s);
        }
    }
    collapse_whitespace(&out)
}
