//! Fetch statement parsing (§4.2): `name => table.attrSpec.property.function(params)[.where(pred)]`.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::PicoruleError;
use crate::model::{AttributeToken, FetchRule, Property};
use crate::util::{find_matching_close_paren, split_top_level_commas};

// Captures everything up to and including the function call's opening
// paren; the call's arguments are then located with a balanced-paren scan
// rather than a regex, since they may contain nested parens (§4.2, §9).
static FETCH_HEAD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)
        ^(?P<var>[a-z_][a-z0-9_]*)
        \s*=>\s*
        (?P<table>[a-z_][a-z0-9_]*)
        \.
        (?P<attr>\[[^\]]*\]|[\w%]+)
        \.
        (?P<prop>_|[a-z][a-z0-9_]*)
        \.
        (?P<func>[a-z_][a-z0-9_]*)
        \(
        ",
    )
    .unwrap()
});

static WHERE_HEAD: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\.where\(").unwrap());

pub fn parse_fetch(rb_name: &str, segment: &str) -> Result<FetchRule, PicoruleError> {
    let caps = FETCH_HEAD.captures(segment).ok_or_else(|| PicoruleError::InvalidFetch {
        ruleblock: rb_name.to_string(),
        detail: format!("segment does not match fetch shape: '{segment}'"),
    })?;

    let params_start = caps.get(0).unwrap().end();
    let after_head = &segment[params_start..];
    let close = find_matching_close_paren(after_head).ok_or_else(|| PicoruleError::InvalidFetch {
        ruleblock: rb_name.to_string(),
        detail: format!("unbalanced function parens in '{segment}'"),
    })?;

    let params_str = &after_head[..close];
    let function_params = split_top_level_commas(params_str);

    let rest = after_head[close + 1..].trim();
    let predicate = if !rest.is_empty() {
        let where_match = WHERE_HEAD.find(rest).ok_or_else(|| PicoruleError::InvalidFetch {
            ruleblock: rb_name.to_string(),
            detail: format!("trailing content after fetch call in '{segment}'"),
        })?;
        let where_body = &rest[where_match.end()..];
        let pred_close =
            find_matching_close_paren(where_body).ok_or_else(|| PicoruleError::InvalidFetch {
                ruleblock: rb_name.to_string(),
                detail: format!("unbalanced .where() parens in '{segment}'"),
            })?;
        Some(where_body[..pred_close].trim().to_string())
    } else {
        None
    };

    let attribute_list = parse_attribute_list(&caps["attr"]);
    if attribute_list.is_empty() {
        return Err(PicoruleError::InvalidFetch {
            ruleblock: rb_name.to_string(),
            detail: format!("fetch attribute list is empty in '{segment}'"),
        });
    }

    Ok(FetchRule {
        assigned_variable: caps["var"].to_string(),
        table: caps["table"].to_string(),
        attribute_list,
        property: Property::parse(&caps["prop"]),
        function_name: caps["func"].to_string(),
        function_params,
        predicate,
        references: BTreeSet::new(),
    })
}

fn parse_attribute_list(raw: &str) -> Vec<AttributeToken> {
    if let Some(inner) = raw.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        inner
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| AttributeToken(s.to_string()))
            .collect()
    } else {
        vec![AttributeToken(raw.to_string())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_fetch() {
        let r = parse_fetch("ckd", "egfr_last => eadv.lab_bld_egfr.val.last()").unwrap();
        assert_eq!(r.assigned_variable, "egfr_last");
        assert_eq!(r.table, "eadv");
        assert_eq!(r.attribute_list, vec![AttributeToken("lab_bld_egfr".into())]);
        assert_eq!(r.property, Property::Val);
        assert_eq!(r.function_name, "last");
        assert!(r.function_params.is_empty());
        assert!(r.predicate.is_none());
    }

    #[test]
    fn underscore_property_resolves_to_val() {
        let r = parse_fetch("g", "acr_max => eadv.lab_ua_acr._.maxldv()").unwrap();
        assert_eq!(r.property, Property::Val);
    }

    #[test]
    fn bracketed_attribute_list() {
        let r = parse_fetch("rb", "x => eadv.[lab_a,lab_b,lab_c%].val.last()").unwrap();
        assert_eq!(r.attribute_list.len(), 3);
        assert!(r.attribute_list[2].is_wildcard());
    }

    #[test]
    fn nested_paren_parameter_not_split_on_inner_comma() {
        let r = parse_fetch(
            "h",
            "acr_graph => eadv.lab_ua_acr.val.serializedv2(round(val,0)~dt)",
        )
        .unwrap();
        assert_eq!(r.function_params, vec!["round(val,0)~dt".to_string()]);
    }

    #[test]
    fn fetch_with_where_predicate() {
        let r = parse_fetch(
            "rb",
            "x => eadv.lab_a.val.last().where(val > 0)",
        )
        .unwrap();
        assert_eq!(r.predicate.as_deref(), Some("val > 0"));
    }

    #[test]
    fn fetch_with_numeric_function_param() {
        let r = parse_fetch("rb", "x => eadv.lab_a.val.nth(3)").unwrap();
        assert_eq!(r.function_params, vec!["3".to_string()]);
    }

    #[test]
    fn invalid_fetch_shape_errors() {
        let err = parse_fetch("rb", "x => not a fetch at all").unwrap_err();
        assert!(matches!(err, PicoruleError::InvalidFetch { .. }));
    }
}
