//! Attribute filter (§4.5): the WHERE fragment built from a fetch's
//! attribute list. Centralised here since the three dialects differ only in
//! LIKE-escape treatment (§9 design note: "duplication invites drift").

use crate::model::AttributeToken;

use super::dialect::DialectHandler;

pub(crate) fn attribute_filter(dialect: &dyn DialectHandler, attributes: &[AttributeToken]) -> String {
    let clauses: Vec<String> = attributes
        .iter()
        .map(|attr| {
            if attr.is_wildcard() {
                dialect.like_clause("att", &attr.0)
            } else {
                format!("att = '{}'", attr.0)
            }
        })
        .collect();

    if clauses.len() > 1 {
        format!("({})", clauses.join(" OR "))
    } else {
        clauses.into_iter().next().unwrap_or_else(|| "1=0".to_string())
    }
}
