//! PostgreSQL dialect (§6).

use super::dialect::DialectHandler;
use crate::options::Dialect;

#[derive(Debug)]
pub(crate) struct PostgresDialect;

impl DialectHandler for PostgresDialect {
    fn dialect(&self) -> Dialect {
        Dialect::PostgreSql
    }

    fn target_table(&self, name: &str) -> String {
        format!("rout_{}", name.to_lowercase())
    }

    fn intermediate_name(&self, var: &str) -> String {
        format!("SQ_{}", var.to_uppercase())
    }

    fn subject_set_name(&self) -> &'static str {
        "UEADV"
    }

    fn current_date(&self) -> &'static str {
        "CURRENT_DATE"
    }

    fn date_add(&self, expr: &str, days: i64) -> String {
        if days >= 0 {
            format!("({expr} + INTERVAL '{days} days')")
        } else {
            format!("({expr} - INTERVAL '{} days')", -days)
        }
    }

    fn day_diff(&self, a: &str, b: &str) -> String {
        format!("({a} - {b})")
    }

    fn cast_numeric(&self, expr: &str) -> String {
        format!("({expr})::numeric")
    }

    fn cast_string(&self, expr: &str) -> String {
        format!("({expr})::text")
    }

    fn string_concat(&self, parts: &[String]) -> String {
        parts.join(" || ")
    }

    fn string_agg(&self, expr: &str, delimiter_sql: &str, order_by: &str) -> String {
        format!("STRING_AGG({expr}, {delimiter_sql} ORDER BY {order_by})")
    }

    fn median(&self, expr: &str) -> String {
        format!("PERCENTILE_CONT(0.5) WITHIN GROUP (ORDER BY {expr})")
    }

    fn substring(&self, s: &str, start: &str, len: &str) -> String {
        format!("SUBSTRING({s} FROM {start} FOR {len})")
    }

    fn substring_from(&self, s: &str, start: &str) -> String {
        format!("SUBSTRING({s} FROM {start})")
    }

    fn right_n(&self, s: &str, n: &str) -> String {
        format!("RIGHT({s},{n})")
    }

    fn date_format(&self, expr: &str, fmt: &str) -> String {
        format!("TO_CHAR({expr},'{fmt}')")
    }

    fn like_clause(&self, column: &str, pattern: &str) -> String {
        format!("{column} LIKE '{pattern}'")
    }

    fn join_on_eid(&self, _left_alias: &str, _right_alias: &str) -> String {
        "USING (eid)".to_string()
    }
}
