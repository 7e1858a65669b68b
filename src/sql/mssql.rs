//! SQL Server T-SQL dialect (§6). Unlike Oracle/PostgreSQL, this dialect's
//! envelope is a serial script of temp-table materialisations rather than a
//! single CTE query (§4.5); `sql::envelope` branches on that shape, but all
//! per-fragment SQL text still goes through this same `DialectHandler`.

use super::dialect::DialectHandler;
use crate::options::Dialect;

#[derive(Debug)]
pub(crate) struct MsSqlDialect;

impl DialectHandler for MsSqlDialect {
    fn dialect(&self) -> Dialect {
        Dialect::MsSql
    }

    fn target_table(&self, name: &str) -> String {
        format!("SROUT_{name}")
    }

    fn intermediate_name(&self, var: &str) -> String {
        format!("#SQ_{var}")
    }

    fn subject_set_name(&self) -> &'static str {
        "#UEADV"
    }

    fn current_date(&self) -> &'static str {
        "GETDATE()"
    }

    fn date_add(&self, expr: &str, days: i64) -> String {
        format!("DATEADD(day, {days}, {expr})")
    }

    fn day_diff(&self, a: &str, b: &str) -> String {
        format!("DATEDIFF(day, {b}, {a})")
    }

    fn cast_numeric(&self, expr: &str) -> String {
        format!("CAST({expr} AS FLOAT)")
    }

    fn cast_string(&self, expr: &str) -> String {
        format!("CAST({expr} AS VARCHAR(1000))")
    }

    fn coalesce(&self, args: &[String]) -> String {
        // ISNULL is binary; fold a longer argument list pairwise.
        let mut iter = args.iter().rev();
        let mut acc = iter.next().cloned().unwrap_or_default();
        for a in iter {
            acc = format!("ISNULL({a},{acc})");
        }
        acc
    }

    fn string_concat(&self, parts: &[String]) -> String {
        parts.join(" + ")
    }

    fn string_agg(&self, expr: &str, delimiter_sql: &str, order_by: &str) -> String {
        format!("STRING_AGG({expr}, {delimiter_sql}) WITHIN GROUP (ORDER BY {order_by})")
    }

    fn median(&self, expr: &str) -> String {
        format!("PERCENTILE_CONT(0.5) WITHIN GROUP (ORDER BY {expr}) OVER (PARTITION BY eid)")
    }

    fn median_fragment(&self, from_sql: &str, where_sql: &str, numeric: &str) -> String {
        // PERCENTILE_CONT is a T-SQL window function only; it cannot legally
        // coexist with an outer GROUP BY (error 8120), so this collapses
        // per-eid duplicate rows with DISTINCT instead of GROUP BY.
        format!(
            "SELECT DISTINCT eid, {} AS v FROM {from_sql} WHERE {where_sql}",
            self.median(numeric)
        )
    }

    fn stddev(&self, expr: &str) -> String {
        format!("STDEV({expr})")
    }

    fn substring(&self, s: &str, start: &str, len: &str) -> String {
        format!("SUBSTRING({s},{start},{len})")
    }

    fn substring_from(&self, s: &str, start: &str) -> String {
        format!("SUBSTRING({s},{start},LEN({s}))")
    }

    fn right_n(&self, s: &str, n: &str) -> String {
        format!("RIGHT({s},{n})")
    }

    fn ceil(&self, expr: &str) -> String {
        format!("CEILING({expr})")
    }

    fn date_format(&self, expr: &str, fmt: &str) -> String {
        let net_fmt = fmt.replace("YYYY", "yyyy").replace("DD", "dd");
        format!("FORMAT({expr}, '{net_fmt}')")
    }

    fn like_clause(&self, column: &str, pattern: &str) -> String {
        let escaped = pattern.replace('_', "[_]");
        format!("{column} LIKE '{escaped}' ESCAPE '\\'")
    }

    fn join_on_eid(&self, left_alias: &str, right_alias: &str) -> String {
        format!("ON {left_alias}.eid = {right_alias}.eid")
    }
}
