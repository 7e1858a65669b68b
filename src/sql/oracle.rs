//! Oracle PL/SQL dialect (§6).

use super::dialect::DialectHandler;
use crate::options::Dialect;

#[derive(Debug)]
pub(crate) struct OracleDialect;

impl DialectHandler for OracleDialect {
    fn dialect(&self) -> Dialect {
        Dialect::Oracle
    }

    fn target_table(&self, name: &str) -> String {
        format!("ROUT_{}", name.to_uppercase())
    }

    fn intermediate_name(&self, var: &str) -> String {
        format!("SQ_{}", var.to_uppercase())
    }

    fn subject_set_name(&self) -> &'static str {
        "UEADV"
    }

    fn current_date(&self) -> &'static str {
        "SYSDATE"
    }

    fn date_add(&self, expr: &str, days: i64) -> String {
        if days >= 0 {
            format!("({expr} + {days})")
        } else {
            format!("({expr} - {})", -days)
        }
    }

    fn day_diff(&self, a: &str, b: &str) -> String {
        format!("({a} - {b})")
    }

    fn cast_numeric(&self, expr: &str) -> String {
        format!("TO_NUMBER({expr})")
    }

    fn cast_string(&self, expr: &str) -> String {
        format!("TO_CHAR({expr})")
    }

    fn string_concat(&self, parts: &[String]) -> String {
        parts.join(" || ")
    }

    fn string_agg(&self, expr: &str, delimiter_sql: &str, order_by: &str) -> String {
        format!("LISTAGG({expr}, {delimiter_sql}) WITHIN GROUP (ORDER BY {order_by})")
    }

    fn median(&self, expr: &str) -> String {
        format!("MEDIAN({expr})")
    }

    fn substring(&self, s: &str, start: &str, len: &str) -> String {
        format!("SUBSTR({s},{start},{len})")
    }

    fn substring_from(&self, s: &str, start: &str) -> String {
        format!("SUBSTR({s},{start})")
    }

    fn right_n(&self, s: &str, n: &str) -> String {
        format!("SUBSTR({s},-{n})")
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
