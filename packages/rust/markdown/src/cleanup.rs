//! Post-conversion cleanup passes.
//!
//! htmd output from blog themes carries WordPress leftovers: wrapper tags,
//! empty emphasis, `*` bullets and relative links. Most passes only touch
//! prose lines and leave fenced code as is. [`normalize_text`] is the
//! plain-text path used for competitor pages.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use url::Url;

static FENCE_LANG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\s*)```(?:language-|lang-|highlight-)([\w+#-]+)").expect("valid regex")
});
static BULLET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*)[*+-]\s+").expect("valid regex"));
static WRAPPER_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"</?(?:div|span|section|article|figure|figcaption|details|summary|font|center)(?:\s[^>]*)?>",
    )
    .expect("valid regex")
});
static EMPTY_EMPHASIS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\*{4}|(^|\s)(?:\*\*|__)\s+(?:\*\*|__)(\s|$)").expect("valid regex")
});
static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(!?)\[([^\]]*)\]\(([^)\s]+)\)").expect("valid regex"));

/// Run every Markdown pass in order.
pub(crate) fn run_pipeline(md: &str, base_url: Option<&Url>) -> String {
    let md = map_prose_lines(md, |line| {
        let line = strip_wrapper_tags(line);
        let line = drop_empty_emphasis(&line);
        normalize_bullet(&line)
    });
    let md = demote_extra_h1(&md);
    let md = fix_fence_languages(&md);
    let md = match base_url {
        Some(base) => map_prose_lines(&md, |line| resolve_links(line, base)),
        None => md,
    };
    let md = trim_line_ends(&md);
    finish(&squeeze_blank_lines(&md))
}

/// Collapse whitespace in plain text: runs of spaces and tabs become one
/// space, lines are trimmed, and runs of blank lines become exactly one.
pub fn normalize_text(text: &str) -> String {
    static SPACE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[^\S\n]+").expect("valid regex"));

    let mut out: Vec<String> = Vec::new();
    let mut pending_blank = false;

    for line in text.lines() {
        let line = SPACE_RE.replace_all(line, " ");
        let line = line.trim();
        if line.is_empty() {
            pending_blank = !out.is_empty();
            continue;
        }
        if pending_blank {
            out.push(String::new());
            pending_blank = false;
        }
        out.push(line.to_string());
    }

    out.join("\n")
}

// ---------------------------------------------------------------------------
// Line plumbing
// ---------------------------------------------------------------------------

fn is_fence(line: &str) -> bool {
    line.trim_start().starts_with("```")
}

/// Apply `f` to every line outside fenced code blocks.
fn map_prose_lines(md: &str, mut f: impl FnMut(&str) -> String) -> String {
    let mut in_code = false;
    md.lines()
        .map(|line| {
            if is_fence(line) {
                in_code = !in_code;
                line.to_string()
            } else if in_code {
                line.to_string()
            } else {
                f(line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Prose passes
// ---------------------------------------------------------------------------

/// Drop theme wrapper tags htmd passed through, keeping their text.
fn strip_wrapper_tags(line: &str) -> String {
    WRAPPER_TAG_RE.replace_all(line, "").into_owned()
}

/// `****` and `** **` left behind by empty `<strong>` elements.
fn drop_empty_emphasis(line: &str) -> String {
    if !line.contains("**") && !line.contains("__") {
        return line.to_string();
    }
    EMPTY_EMPHASIS_RE.replace_all(line, "${1}${2}").into_owned()
}

/// `*` and `+` bullets become `-`. Thematic breaks stay.
fn normalize_bullet(line: &str) -> String {
    if is_thematic_break(line) {
        return line.to_string();
    }
    BULLET_RE.replace(line, "${1}- ").into_owned()
}

/// `***`, `- - -`, `___` and friends.
fn is_thematic_break(line: &str) -> bool {
    let marks: Vec<char> = line.chars().filter(|c| !c.is_whitespace()).collect();
    marks.len() >= 3 && matches!(marks[0], '*' | '-' | '_') && marks.iter().all(|c| *c == marks[0])
}

/// Rewrite relative link and image targets against `base`.
fn resolve_links(line: &str, base: &Url) -> String {
    LINK_RE
        .replace_all(line, |caps: &Captures| {
            let (bang, text, href) = (&caps[1], &caps[2], &caps[3]);
            let keep = href.contains("://")
                || href.starts_with('#')
                || href.starts_with("mailto:")
                || href.starts_with("tel:")
                || href.starts_with("data:");
            let target = if keep {
                href.to_string()
            } else {
                base.join(href)
                    .map(String::from)
                    .unwrap_or_else(|_| href.to_string())
            };
            format!("{bang}[{text}]({target})")
        })
        .into_owned()
}

// ---------------------------------------------------------------------------
// Whole-document passes
// ---------------------------------------------------------------------------

/// Keep the first `#` heading; later ones become `##`.
fn demote_extra_h1(md: &str) -> String {
    let mut seen_h1 = false;
    map_prose_lines(md, |line| match line.strip_prefix("# ") {
        Some(text) if seen_h1 => format!("## {text}"),
        Some(_) => {
            seen_h1 = true;
            line.to_string()
        }
        None => line.to_string(),
    })
}

/// ```` ```language-js ```` → ```` ```js ````.
fn fix_fence_languages(md: &str) -> String {
    md.lines()
        .map(|line| FENCE_LANG_RE.replace(line, "${1}```${2}").into_owned())
        .collect::<Vec<_>>()
        .join("\n")
}

fn trim_line_ends(md: &str) -> String {
    md.lines().map(str::trim_end).collect::<Vec<_>>().join("\n")
}

fn squeeze_blank_lines(md: &str) -> String {
    static MULTI_BLANK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));
    MULTI_BLANK_RE.replace_all(md, "\n\n").into_owned()
}

/// No leading blank lines, exactly one trailing newline.
fn finish(md: &str) -> String {
    let body = md.trim_start_matches('\n').trim_end_matches('\n');
    format!("{body}\n")
}
