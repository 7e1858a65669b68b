//! Dialect strategy (§4.5, §9): one `DialectHandler` implementation per
//! target SQL engine, selected from [`crate::options::Dialect`] via a boxed
//! trait object, one handler per target.

use core::fmt::Debug;

use crate::options::Dialect;

pub(crate) fn handler(dialect: Dialect) -> Box<dyn DialectHandler> {
    match dialect {
        Dialect::Oracle => Box::new(super::oracle::OracleDialect),
        Dialect::MsSql => Box::new(super::mssql::MsSqlDialect),
        Dialect::PostgreSql => Box::new(super::postgres::PostgresDialect),
    }
}

/// Small helpers record (current-date, date-add, date-diff, string
/// aggregate, coalesce, nullif, ...) plus per-variable fragment naming and
/// the envelope assembly. One implementation per dialect; the generator
/// (§4.5, `sql::mod`) is written entirely against this trait and never
/// matches on [`Dialect`] directly.
pub(crate) trait DialectHandler: Debug {
    fn dialect(&self) -> Dialect;

    /// `ROUT_<NAME>` / `SROUT_<name>` / `rout_<name>` (§6).
    fn target_table(&self, name: &str) -> String;

    /// `SQ_<NAME>` (CTE name) or `#SQ_<name>` (temp table name) (§6).
    fn intermediate_name(&self, var: &str) -> String;

    /// The universal subject-set identifier: `UEADV` or `#UEADV`.
    fn subject_set_name(&self) -> &'static str;

    fn current_date(&self) -> &'static str;

    /// Add (or, for negative `days`, subtract) `days` days from `expr`.
    fn date_add(&self, expr: &str, days: i64) -> String;

    /// Day difference `a - b`, both dates/timestamps.
    fn day_diff(&self, a: &str, b: &str) -> String;

    fn cast_numeric(&self, expr: &str) -> String;

    fn cast_string(&self, expr: &str) -> String;

    fn coalesce(&self, args: &[String]) -> String {
        format!("COALESCE({})", args.join(","))
    }

    fn string_concat(&self, parts: &[String]) -> String;

    fn string_agg(&self, expr: &str, delimiter_sql: &str, order_by: &str) -> String;

    fn median(&self, expr: &str) -> String;

    /// Full `SELECT eid, <median> AS v FROM ... WHERE ...` fragment (§4.5).
    /// Default: a plain `GROUP BY eid` aggregate, which is correct for
    /// dialects where `median`/`PERCENTILE_CONT ... WITHIN GROUP` is a true
    /// ordered-set aggregate. T-SQL only exposes `PERCENTILE_CONT` as a
    /// window function, which cannot coexist with an outer `GROUP BY`, so
    /// that dialect overrides this with a `DISTINCT eid` + windowed shape.
    fn median_fragment(&self, from_sql: &str, where_sql: &str, numeric: &str) -> String {
        format!(
            "SELECT eid, {} AS v FROM {from_sql} WHERE {where_sql} GROUP BY eid",
            self.median(numeric)
        )
    }

    /// Sample standard deviation: `STDDEV` (Oracle/PostgreSQL) vs `STDEV`
    /// (T-SQL).
    fn stddev(&self, expr: &str) -> String {
        format!("STDDEV({expr})")
    }

    /// `SUBSTR`/`SUBSTRING` with explicit length.
    fn substring(&self, s: &str, start: &str, len: &str) -> String;

    /// `SUBSTR`/`SUBSTRING` to the end of the string.
    fn substring_from(&self, s: &str, start: &str) -> String;

    /// Last `n` characters of `s`.
    fn right_n(&self, s: &str, n: &str) -> String;

    fn ceil(&self, expr: &str) -> String {
        format!("CEIL({expr})")
    }

    fn date_format(&self, expr: &str, fmt: &str) -> String;

    /// LIKE clause for a wildcard attribute pattern, including any
    /// dialect-specific escape handling (§4.5 attribute filter).
    fn like_clause(&self, column: &str, pattern: &str) -> String;

    /// `USING (eid)` vs `ON a.eid = b.eid` (§6).
    fn join_on_eid(&self, left_alias: &str, right_alias: &str) -> String;
}
