//! Statement-level parser (§4.2). Turns one ruleblock's source text into an
//! ordered `Vec<Rule>`. Preprocessing runs once per ruleblock; each
//! resulting segment is classified and handed to the matching sub-parser.

mod bind;
mod compute;
mod fetch;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::PicoruleError;
use crate::model::Rule;

static BLOCK_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)/\*.*?\*/").unwrap());
static LINE_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"//[^\n]*").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static BRACKET_CONTENTS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[[^\]\[]*\]").unwrap());

/// Parse one ruleblock's text into its ordered rule list (§4.2), plus any
/// non-fatal warnings (dropped `#` directives, §7).
///
/// `rb_name` is substituted for the literal token `[[rb_id]]` before any
/// other preprocessing step runs (§4.2 step i).
pub fn parse_ruleblock(rb_name: &str, text: &str) -> Result<(Vec<Rule>, Vec<String>), PicoruleError> {
    let preprocessed = preprocess(rb_name, text);

    let mut rules = Vec::new();
    let mut warnings = Vec::new();
    let (segments, directives) = split_segments(&preprocessed);
    for directive in directives {
        warnings.push(format!("ignored compiler directive '{directive}'"));
    }
    for segment in segments {
        match classify(&segment) {
            Statement::Bind => rules.push(Rule::Bind(bind::parse_bind(rb_name, &segment)?)),
            Statement::Fetch => rules.push(Rule::Fetch(fetch::parse_fetch(rb_name, &segment)?)),
            Statement::Compute => {
                rules.push(Rule::Compute(compute::parse_compute(rb_name, &segment)?))
            }
            Statement::Ignored => {
                log::debug!("ruleblock '{rb_name}': dropping unrecognised segment '{segment}'");
            }
        }
    }
    Ok((rules, warnings))
}

#[derive(Debug, PartialEq, Eq)]
enum Statement {
    Fetch,
    Compute,
    Bind,
    Ignored,
}

fn classify(segment: &str) -> Statement {
    let has_arrow = segment.contains("=>");
    let has_colon = segment.contains(':');
    if has_arrow && !has_colon && segment.contains(".bind()") {
        Statement::Bind
    } else if has_arrow && !has_colon {
        Statement::Fetch
    } else if has_colon {
        Statement::Compute
    } else {
        Statement::Ignored
    }
}

/// Preprocessing steps (i)-(iv) of §4.2. Splitting and directive-discarding
/// (steps v-vi) happen in [`split_segments`].
fn preprocess(rb_name: &str, text: &str) -> String {
    let substituted = text.replace("[[rb_id]]", rb_name);
    let no_block_comments = BLOCK_COMMENT.replace_all(&substituted, "");
    let no_comments = LINE_COMMENT.replace_all(&no_block_comments, "");

    // Collapse whitespace inside `[...]` first so multi-line attribute lists
    // survive being split on newlines later (§4.2 step iii).
    let bracket_normalised = BRACKET_CONTENTS.replace_all(&no_comments, |caps: &regex::Captures| {
        let inner = &caps[0];
        WHITESPACE.replace_all(inner, "").to_string()
    });

    WHITESPACE
        .replace_all(&bracket_normalised, " ")
        .trim()
        .to_string()
}

/// Split on `;`, discarding empty segments and separating out `#`-prefixed
/// compiler directives (§4.2 steps v-vi, §7: directives are not interpreted
/// by the core; they are reported as warnings rather than acted upon).
fn split_segments(text: &str) -> (Vec<String>, Vec<String>) {
    let mut segments = Vec::new();
    let mut directives = Vec::new();
    for s in text.split(';') {
        let s = s.trim();
        if s.is_empty() {
            continue;
        }
        if let Some(directive) = s.strip_prefix('#') {
            directives.push(directive.trim().to_string());
        } else {
            segments.push(s.to_string());
        }
    }
    (segments, directives)
}
