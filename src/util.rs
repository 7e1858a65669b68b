//! Small text helpers shared by the parser and the expression translator.
//! Both need to walk comma-separated argument lists that may themselves
//! contain balanced parentheses (§4.2, §4.5, §9 design notes); centralising
//! that logic avoids two subtly different implementations drifting apart.

/// Find the index (byte offset) of the `)` that closes the `(` implicitly
/// open at `s[0..]` (i.e. `s` starts right *after* an opening paren already
/// consumed by the caller, so the initial depth is 1). Returns `None` if the
/// string is unbalanced.
pub fn find_matching_close_paren(s: &str) -> Option<usize> {
    let mut depth: i32 = 1;
    for (idx, ch) in s.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split `s` on commas that occur at paren-depth zero, so a nested call like
/// `round(val,0)` is kept intact as a single element (§4.2).
pub fn split_top_level_commas(s: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth: i32 = 0;
    let mut current = String::new();
    for ch in s.chars() {
        match ch {
            '(' => {
                depth += 1;
                current.push(ch);
            }
            ')' => {
                depth -= 1;
                current.push(ch);
            }
            ',' if depth == 0 => {
                parts.push(current.trim().to_string());
                current = String::new();
            }
            _ => current.push(ch),
        }
    }
    if !current.trim().is_empty() || !parts.is_empty() {
        parts.push(current.trim().to_string());
    }
    parts.into_iter().filter(|p| !p.is_empty()).collect()
}

/// Split `s` on a separator that occurs at paren-depth zero. Used by the
/// expression translator to split `~`-joined `serializedv2` element
/// expressions without breaking apart nested calls.
pub fn split_top_level(s: &str, sep: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth: i32 = 0;
    let mut current = String::new();
    for ch in s.chars() {
        match ch {
            '(' => {
                depth += 1;
                current.push(ch);
            }
            ')' => {
                depth -= 1;
                current.push(ch);
            }
            c if c == sep && depth == 0 => {
                parts.push(current.trim().to_string());
                current = String::new();
            }
            _ => current.push(ch),
        }
    }
    parts.push(current.trim().to_string());
    parts
}

/// Find every top-level call to `name(...)` in `input` and replace it with
/// whatever `f` renders from its argument list, leaving everything else
/// untouched. Used by the expression translator for the function-rename
/// rewrites (§4.5): `nvl`, `to_number`, `to_char`, `substr`, `least`,
/// `greatest`, `least_date`, `greatest_date`. Matches are anchored so that
/// `xto_number(` does not fire on a call named `to_number`.
pub fn rewrite_calls(input: &str, name: &str, f: impl Fn(&[String]) -> String) -> String {
    let needle = format!("{name}(");
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    loop {
        match rest.find(&needle) {
            Some(pos) => {
                let boundary_ok = pos == 0
                    || !rest[..pos]
                        .chars()
                        .last()
                        .map(|c| c.is_alphanumeric() || c == '_')
                        .unwrap_or(false);
                if !boundary_ok {
                    out.push_str(&rest[..pos + needle.len()]);
                    rest = &rest[pos + needle.len()..];
                    continue;
                }

                let after_paren = &rest[pos + needle.len()..];
                match find_matching_close_paren(after_paren) {
                    Some(close) => {
                        let args_str = &after_paren[..close];
                        let args = split_top_level_commas(args_str);
                        out.push_str(&rest[..pos]);
                        out.push_str(&f(&args));
                        rest = &after_paren[close + 1..];
                    }
                    None => {
                        // Unbalanced; leave untouched rather than panic.
                        out.push_str(rest);
                        rest = "";
                        break;
                    }
                }
            }
            None => {
                out.push_str(rest);
                break;
            }
        }
    }
    out
}
