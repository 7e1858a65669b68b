//! Bind statement parsing (§4.2): `local => rout_<block>.<var>.<prop>.bind();`
//! The `rout_` prefix is obligatory in the surface syntax; its absence is a
//! parse error, not a fall-through to Fetch.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::PicoruleError;
use crate::model::{BindRule, Property};

static BIND: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)
        ^(?P<var>[a-z_][a-z0-9_]*)
        \s*=>\s*
        rout_(?P<block>[a-z_][a-z0-9_]*)
        \.
        (?P<srcvar>[a-z_][a-z0-9_]*)
        \.
        (?P<prop>_|[a-z][a-z0-9_]*)
        \.bind\(\)\s*$
        ",
    )
    .unwrap()
});

pub fn parse_bind(rb_name: &str, segment: &str) -> Result<BindRule, PicoruleError> {
    let caps = BIND.captures(segment).ok_or_else(|| PicoruleError::InvalidBind {
        ruleblock: rb_name.to_string(),
        detail: format!("segment does not match bind shape (missing 'rout_' prefix or malformed tail): '{segment}'"),
    })?;

    Ok(BindRule {
        assigned_variable: caps["var"].to_string(),
        source_ruleblock: caps["block"].to_string(),
        source_variable: caps["srcvar"].to_string(),
        property: Property::parse(&caps["prop"]),
        references: BTreeSet::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_bind() {
        let r = parse_bind("rb3", "c => rout_rb2.b.val.bind()").unwrap();
        assert_eq!(r.assigned_variable, "c");
        assert_eq!(r.source_ruleblock, "rb2");
        assert_eq!(r.source_variable, "b");
        assert_eq!(r.property, Property::Val);
    }

    #[test]
    fn missing_rout_prefix_is_an_error() {
        let err = parse_bind("rb", "c => other_rb.b.val.bind()").unwrap_err();
        assert!(matches!(err, PicoruleError::InvalidBind { .. }));
    }

    #[test]
    fn malformed_tail_is_an_error() {
        let err = parse_bind("rb", "c => rout_rb2.b.val.bindX()").unwrap_err();
        assert!(matches!(err, PicoruleError::InvalidBind { .. }));
    }
}
