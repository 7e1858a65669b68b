//! Compute statement parsing (§4.2): `name : {predicate => value}, {=> elseValue};`

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::PicoruleError;
use crate::model::{ComputeArm, ComputeRule};

static ARM: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{([^{}]*)\}").unwrap());

pub fn parse_compute(rb_name: &str, segment: &str) -> Result<ComputeRule, PicoruleError> {
    let colon_idx = segment.find(':').ok_or_else(|| PicoruleError::InvalidCompute {
        ruleblock: rb_name.to_string(),
        detail: format!("missing ':' in '{segment}'"),
    })?;

    let var = segment[..colon_idx].trim().to_string();
    if var.is_empty() {
        return Err(PicoruleError::InvalidCompute {
            ruleblock: rb_name.to_string(),
            detail: format!("missing assigned variable in '{segment}'"),
        });
    }

    let body = &segment[colon_idx + 1..];
    let mut conditions = Vec::new();
    for caps in ARM.captures_iter(body) {
        let inner = caps[1].trim();
        conditions.push(parse_arm(inner));
    }

    if conditions.is_empty() {
        return Err(PicoruleError::InvalidCompute {
            ruleblock: rb_name.to_string(),
            detail: format!("no condition arms found in '{segment}'"),
        });
    }

    Ok(ComputeRule {
        assigned_variable: var,
        conditions,
        references: BTreeSet::new(),
    })
}

fn parse_arm(inner: &str) -> ComputeArm {
    match inner.find("=>") {
        Some(idx) => {
            let predicate_side = inner[..idx].trim();
            let value_side = inner[idx + 2..].trim();
            if predicate_side.is_empty() {
                ComputeArm {
                    predicate: None,
                    return_value: value_side.to_string(),
                }
            } else {
                ComputeArm {
                    predicate: Some(predicate_side.to_string()),
                    return_value: value_side.to_string(),
                }
            }
        }
        None => ComputeArm {
            predicate: None,
            return_value: inner.trim().to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_compute() {
        let r = parse_compute("ckd", "has_ckd : {egfr_last < 60 => 1}, {=> 0}").unwrap();
        assert_eq!(r.assigned_variable, "has_ckd");
        assert_eq!(r.conditions.len(), 2);
        assert_eq!(r.conditions[0].predicate.as_deref(), Some("egfr_last < 60"));
        assert_eq!(r.conditions[0].return_value, "1");
        assert!(r.conditions[1].predicate.is_none());
        assert_eq!(r.conditions[1].return_value, "0");
    }

    #[test]
    fn else_only_arm_list() {
        let r = parse_compute("rb", "x : {=> 42}").unwrap();
        assert_eq!(r.conditions.len(), 1);
        assert!(r.conditions[0].predicate.is_none());
    }

    #[test]
    fn missing_arms_is_an_error() {
        let err = parse_compute("rb", "x : no braces here").unwrap_err();
        assert!(matches!(err, PicoruleError::InvalidCompute { .. }));
    }

    #[test]
    fn value_expression_with_commas_inside_parens() {
        let r = parse_compute("rb", "x : {a > 0 => round(val,2)}").unwrap();
        assert_eq!(r.conditions[0].return_value, "round(val,2)");
    }
}
