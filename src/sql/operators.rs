//! Operator catalogue (§4.5): one fragment-producing function per fetch
//! operator. Every fragment is a `SELECT eid, <cols> FROM eadv WHERE
//! <filter> GROUP BY eid` (or, where the semantics need row-level
//! tie-breaking, a `ROW_NUMBER()`-windowed subquery) — never raw string
//! literals baked per dialect, since only the handful of dialect idioms
//! (`LISTAGG` vs `STRING_AGG`, `MEDIAN` vs `PERCENTILE_CONT`, …) actually
//! vary; the shape of the query is the same everywhere.

use crate::model::FetchRule;

use super::dialect::DialectHandler;
use super::expr;

/// Two-column (`<var>_val`, `<var>_dt`) vs single-column (`<var>`) fetch
/// operators (§4.5 dv-family note).
pub(crate) fn is_two_column(function_name: &str) -> bool {
    matches!(
        function_name,
        "lastdv" | "firstdv" | "maxldv" | "minldv" | "minfdv" | "max_neg_delta_dv"
    )
}

/// Render the core per-`eid` aggregation for one fetch operator. `where_sql`
/// is the combined attribute-filter + predicate WHERE clause already
/// translated to dialect SQL; `from_sql` is `eadv` optionally joined against
/// earlier fragments (§4.5 predicate-with-dependency rule).
pub(crate) fn fragment(
    dialect: &dyn DialectHandler,
    rule: &FetchRule,
    from_sql: &str,
    where_sql: &str,
) -> String {
    let col = rule.property.column();
    let numeric = dialect.cast_numeric(col);

    match rule.function_name.as_str() {
        "last" => ranked_value(dialect, from_sql, where_sql, col, "dt DESC, att ASC, val ASC", 1),
        "first" => ranked_value(dialect, from_sql, where_sql, col, "dt ASC, att ASC, val ASC", 1),
        "nth" => {
            let k: i64 = rule
                .function_params
                .first()
                .and_then(|p| p.parse().ok())
                .unwrap_or(1);
            ranked_value(dialect, from_sql, where_sql, col, "dt DESC, att ASC, val ASC", k)
        }
        "count" => format!(
            "SELECT eid, COUNT(*) AS v FROM {from_sql} WHERE {where_sql} GROUP BY eid"
        ),
        "distinct_count" => format!(
            "SELECT eid, COUNT(DISTINCT val) AS v FROM {from_sql} WHERE {where_sql} GROUP BY eid"
        ),
        "sum" => format!(
            "SELECT eid, SUM({numeric}) AS v FROM {from_sql} WHERE {where_sql} GROUP BY eid"
        ),
        "avg" => format!(
            "SELECT eid, AVG({numeric}) AS v FROM {from_sql} WHERE {where_sql} GROUP BY eid"
        ),
        "min" => {
            let expr = if matches!(col, "dt") { col.to_string() } else { numeric };
            format!("SELECT eid, MIN({expr}) AS v FROM {from_sql} WHERE {where_sql} GROUP BY eid")
        }
        "max" => {
            let expr = if matches!(col, "dt") { col.to_string() } else { numeric };
            format!("SELECT eid, MAX({expr}) AS v FROM {from_sql} WHERE {where_sql} GROUP BY eid")
        }
        "median" => dialect.median_fragment(from_sql, where_sql, &numeric),
        "exists" => exists_fragment(dialect, from_sql, where_sql),
        "stats_mode" => stats_mode(dialect, from_sql, where_sql),
        "lastdv" => ranked_two_column(dialect, from_sql, where_sql, "dt DESC, att ASC, val ASC"),
        "firstdv" => ranked_two_column(dialect, from_sql, where_sql, "dt ASC, att ASC, val ASC"),
        "maxldv" => ranked_two_column_numeric(dialect, from_sql, where_sql, "val_num DESC, dt DESC, att ASC"),
        "minldv" => ranked_two_column_numeric(dialect, from_sql, where_sql, "val_num ASC, dt DESC, att ASC"),
        "minfdv" => ranked_two_column_numeric(dialect, from_sql, where_sql, "val_num ASC, dt ASC, att ASC"),
        "max_neg_delta_dv" => max_neg_delta_dv(dialect, from_sql, where_sql),
        "serialize" => serialize_values(dialect, from_sql, where_sql, &rule.function_params, false),
        "serialize2" => serialize_values(dialect, from_sql, where_sql, &rule.function_params, true),
        "serializedv" => serializedv(dialect, from_sql, where_sql, &rule.function_params),
        "serializedv2" => serializedv2(dialect, from_sql, where_sql, &rule.function_params),
        "regr_slope" => regression(dialect, from_sql, where_sql, "slope"),
        "regr_intercept" => regression(dialect, from_sql, where_sql, "intercept"),
        "regr_r2" => regression(dialect, from_sql, where_sql, "r2"),
        "temporal_regularity" => temporal_regularity(dialect, from_sql, where_sql),
        other => {
            log::warn!("unrecognised fetch operator '{other}', emitting passthrough count");
            format!("SELECT eid, COUNT(*) AS v FROM {from_sql} WHERE {where_sql} GROUP BY eid")
        }
    }
}

/// `last`/`first`/`nth(k)`: row with the k-th rank under `order_by`.
fn ranked_value(
    _dialect: &dyn DialectHandler,
    from_sql: &str,
    where_sql: &str,
    col: &str,
    order_by: &str,
    k: i64,
) -> String {
    format!(
        "SELECT eid, {col} AS v FROM (SELECT eid, {col}, \
         ROW_NUMBER() OVER (PARTITION BY eid ORDER BY {order_by}) AS rn \
         FROM {from_sql} WHERE {where_sql}) ranked WHERE rn = {k}"
    )
}

fn ranked_two_column(_dialect: &dyn DialectHandler, from_sql: &str, where_sql: &str, order_by: &str) -> String {
    format!(
        "SELECT eid, val AS v_val, dt AS v_dt FROM (SELECT eid, val, dt, \
         ROW_NUMBER() OVER (PARTITION BY eid ORDER BY {order_by}) AS rn \
         FROM {from_sql} WHERE {where_sql}) ranked WHERE rn = 1"
    )
}

fn ranked_two_column_numeric(
    dialect: &dyn DialectHandler,
    from_sql: &str,
    where_sql: &str,
    order_by: &str,
) -> String {
    let numeric = dialect.cast_numeric("val");
    format!(
        "SELECT eid, val AS v_val, dt AS v_dt FROM (SELECT eid, val, dt, {numeric} AS val_num, \
         ROW_NUMBER() OVER (PARTITION BY eid ORDER BY {order_by}) AS rn \
         FROM {from_sql} WHERE {where_sql}) ranked WHERE rn = 1"
    )
}

/// `max_neg_delta_dv`: successive-row deltas ordered by `dt`, keep only the
/// negative ones, return the most negative (tie-break: latest `dt`).
fn max_neg_delta_dv(dialect: &dyn DialectHandler, from_sql: &str, where_sql: &str) -> String {
    let numeric = dialect.cast_numeric("val");
    format!(
        "SELECT eid, val AS v_val, dt AS v_dt FROM ( \
         SELECT eid, val, dt, \
         ({numeric} - LAG({numeric}) OVER (PARTITION BY eid ORDER BY dt)) AS delta, \
         ROW_NUMBER() OVER (PARTITION BY eid ORDER BY \
         ({numeric} - LAG({numeric}) OVER (PARTITION BY eid ORDER BY dt)) ASC, dt DESC) AS rn \
         FROM {from_sql} WHERE {where_sql}) deltas WHERE delta < 0 AND rn = 1"
    )
}

/// `exists`: 1 if any row matches, else 0 — for every `eid`, not just the
/// ones with a match. Joining the match set back against the dialect's
/// subject set (which always holds every `eid`) before coalescing means the
/// fragment itself never has a missing row, so any later `LEFT JOIN` of this
/// fragment (envelope output, or a Compute arm's join scope) sees a literal
/// `0` rather than `NULL` for non-matching `eid`s.
fn exists_fragment(dialect: &dyn DialectHandler, from_sql: &str, where_sql: &str) -> String {
    let subject = dialect.subject_set_name();
    let join = dialect.join_on_eid(subject, "flag");
    let zero_or_one = dialect.coalesce(&["flag.v".to_string(), "0".to_string()]);
    format!(
        "SELECT {subject}.eid, {zero_or_one} AS v FROM {subject} \
         LEFT JOIN (SELECT eid, 1 AS v FROM {from_sql} WHERE {where_sql} GROUP BY eid) flag {join}"
    )
}

/// `stats_mode`: most frequent `val` per group, ties broken lexicographically.
fn stats_mode(_dialect: &dyn DialectHandler, from_sql: &str, where_sql: &str) -> String {
    format!(
        "SELECT eid, val AS v FROM ( \
         SELECT eid, val, COUNT(*) AS freq, \
         ROW_NUMBER() OVER (PARTITION BY eid ORDER BY COUNT(*) DESC, val ASC) AS rn \
         FROM {from_sql} WHERE {where_sql} GROUP BY eid, val) ranked WHERE rn = 1"
    )
}

fn serialize_values(
    dialect: &dyn DialectHandler,
    from_sql: &str,
    where_sql: &str,
    params: &[String],
    cast_string: bool,
) -> String {
    let delimiter_sql = params.first().cloned().unwrap_or_else(|| "','".to_string());
    let value_expr = if cast_string {
        dialect.cast_string("val")
    } else {
        "val".to_string()
    };
    format!(
        "SELECT eid, {} AS v FROM {from_sql} WHERE {where_sql} GROUP BY eid",
        dialect.string_agg(&value_expr, &delimiter_sql, "dt")
    )
}

fn serializedv(dialect: &dyn DialectHandler, from_sql: &str, where_sql: &str, params: &[String]) -> String {
    let delimiter_sql = params.first().cloned().unwrap_or_else(|| "','".to_string());
    let dt_formatted = dialect.date_format("dt", "YYYY-MM-DD");
    let element = dialect.string_concat(&[
        dialect.cast_string("val"),
        "'~'".to_string(),
        dt_formatted,
    ]);
    format!(
        "SELECT eid, {} AS v FROM {from_sql} WHERE {where_sql} GROUP BY eid",
        dialect.string_agg(&element, &delimiter_sql, "dt")
    )
}

/// `serializedv2(fmt)`: the caller supplies a `~`-joined element format;
/// each sub-expression goes through the expression translator, with the
/// bare token `dt` special-cased to a formatted date (§4.5).
fn serializedv2(dialect: &dyn DialectHandler, from_sql: &str, where_sql: &str, params: &[String]) -> String {
    let fmt = params.first().cloned().unwrap_or_else(|| "val".to_string());
    let pieces = crate::util::split_top_level(&fmt, '~');
    let rendered: Vec<String> = pieces
        .iter()
        .map(|p| {
            if p.trim() == "dt" {
                dialect.date_format("dt", "YYYY-MM-DD")
            } else {
                dialect.cast_string(&expr::translate(dialect, p))
            }
        })
        .collect();
    let element = if rendered.len() > 1 {
        let mut parts = Vec::with_capacity(rendered.len() * 2 - 1);
        for (i, r) in rendered.iter().enumerate() {
            if i > 0 {
                parts.push("'~'".to_string());
            }
            parts.push(r.clone());
        }
        dialect.string_concat(&parts)
    } else {
        rendered.into_iter().next().unwrap_or_default()
    };
    format!(
        "SELECT eid, {} AS v FROM {from_sql} WHERE {where_sql} GROUP BY eid",
        dialect.string_agg(&element, "','", "dt")
    )
}

/// `regr_slope`/`regr_intercept`/`regr_r2`: ordinary-least-squares of `val`
/// against day-offset from each group's earliest `dt`. NULL when the
/// denominator is zero (a single distinct x value in the group).
fn regression(dialect: &dyn DialectHandler, from_sql: &str, where_sql: &str, which: &str) -> String {
    let numeric = dialect.cast_numeric("val");
    let day_diff = dialect.day_diff("dt", "min_dt");
    let base = format!(
        "SELECT eid, {numeric} AS y, ({day_diff}) AS x, \
         MIN(dt) OVER (PARTITION BY eid) AS min_dt \
         FROM {from_sql} WHERE {where_sql}"
    );
    let agg = format!(
        "SELECT eid, COUNT(*) AS n, SUM(x) AS sx, SUM(y) AS sy, SUM(x*y) AS sxy, SUM(x*x) AS sxx, SUM(y*y) AS syy \
         FROM ({base}) pts GROUP BY eid"
    );
    let denom = "(a.n * a.sxx - a.sx * a.sx)";
    let slope = format!("(a.n * a.sxy - a.sx * a.sy) / NULLIF({denom}, 0)");
    let intercept = format!("(a.sy - ({slope}) * a.sx) / a.n");
    let r2 = format!(
        "POWER((a.n * a.sxy - a.sx * a.sy), 2) / NULLIF(({denom}) * (a.n * a.syy - a.sy * a.sy), 0)"
    );
    let v_expr = match which {
        "slope" => slope,
        "intercept" => intercept,
        _ => r2,
    };
    format!("SELECT a.eid, {v_expr} AS v FROM ({agg}) a")
}

/// `temporal_regularity`: coefficient of variation of successive-row
/// day-intervals. NULL with fewer than two rows; 0 if the mean interval is
/// zero.
fn temporal_regularity(dialect: &dyn DialectHandler, from_sql: &str, where_sql: &str) -> String {
    let intervals = format!(
        "SELECT eid, dt - LAG(dt) OVER (PARTITION BY eid ORDER BY dt) AS gap \
         FROM {from_sql} WHERE {where_sql}"
    );
    format!(
        "SELECT eid, \
         CASE WHEN COUNT(gap) < 1 THEN NULL \
              WHEN AVG(gap) = 0 THEN 0 \
              ELSE {} / AVG(gap) END AS v \
         FROM ({intervals}) gaps WHERE gap IS NOT NULL GROUP BY eid",
        dialect.stddev("gap")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AttributeToken, Property};
    use crate::sql::oracle::OracleDialect;
    use crate::sql::mssql::MsSqlDialect;

    fn rule(op: &str, params: Vec<String>) -> FetchRule {
        FetchRule {
            assigned_variable: "x".into(),
            table: "eadv".into(),
            attribute_list: vec![AttributeToken("lab_a".into())],
            property: Property::Val,
            function_name: op.into(),
            function_params: params,
            predicate: None,
            references: Default::default(),
        }
    }

    #[test]
    fn two_column_classification() {
        assert!(is_two_column("lastdv"));
        assert!(is_two_column("max_neg_delta_dv"));
        assert!(!is_two_column("last"));
        assert!(!is_two_column("count"));
    }

    #[test]
    fn last_uses_row_number_with_tiebreak() {
        let r = rule("last", vec![]);
        let out = fragment(&OracleDialect, &r, "eadv", "att = 'lab_a'");
        assert!(out.contains("ROW_NUMBER()"));
        assert!(out.contains("rn = 1"));
        assert!(out.contains("att ASC, val ASC"));
    }

    #[test]
    fn nth_picks_requested_rank() {
        let r = rule("nth", vec!["3".into()]);
        let out = fragment(&OracleDialect, &r, "eadv", "1=1");
        assert!(out.contains("rn = 3"));
    }

    #[test]
    fn count_is_plain_aggregate() {
        let r = rule("count", vec![]);
        let out = fragment(&OracleDialect, &r, "eadv", "1=1");
        assert_eq!(
            out,
            "SELECT eid, COUNT(*) AS v FROM eadv WHERE 1=1 GROUP BY eid"
        );
    }

    #[test]
    fn lastdv_emits_two_columns() {
        let r = rule("lastdv", vec![]);
        let out = fragment(&OracleDialect, &r, "eadv", "1=1");
        assert!(out.contains("v_val"));
        assert!(out.contains("v_dt"));
    }

    #[test]
    fn serialize_uses_dialect_string_agg() {
        let r = rule("serialize", vec!["','".into()]);
        let out = fragment(&MsSqlDialect, &r, "eadv", "1=1");
        assert!(out.contains("STRING_AGG"));
        assert!(out.contains("WITHIN GROUP"));
    }

    #[test]
    fn median_uses_dialect_median() {
        let r = rule("median", vec![]);
        let out = fragment(&OracleDialect, &r, "eadv", "1=1");
        assert!(out.contains("MEDIAN"));
        assert!(out.contains("GROUP BY eid"));
    }

    #[test]
    fn mssql_median_is_distinct_window_not_group_by() {
        let r = rule("median", vec![]);
        let out = fragment(&MsSqlDialect, &r, "eadv", "1=1");
        assert!(out.contains("PERCENTILE_CONT"));
        assert!(out.contains("OVER (PARTITION BY eid)"));
        assert!(out.contains("SELECT DISTINCT eid"));
        assert!(!out.contains("GROUP BY"));
    }

    #[test]
    fn temporal_regularity_uses_dialect_stddev() {
        let r = rule("temporal_regularity", vec![]);
        let oracle_out = fragment(&OracleDialect, &r, "eadv", "1=1");
        assert!(oracle_out.contains("STDDEV(gap)"));
        let mssql_out = fragment(&MsSqlDialect, &r, "eadv", "1=1");
        assert!(mssql_out.contains("STDEV(gap)"));
        assert!(!mssql_out.contains("STDDEV"));
    }

    #[test]
    fn regr_r2_uses_sum_of_y_squares_in_denominator() {
        let r = rule("regr_r2", vec![]);
        let out = fragment(&OracleDialect, &r, "eadv", "1=1");
        assert!(out.contains("SUM(y*y) AS syy"));
        assert!(out.contains("a.n * a.syy - a.sy * a.sy"));
    }

    #[test]
    fn exists_defaults_absent_eids_to_zero_not_null() {
        let r = rule("exists", vec![]);
        let out = fragment(&OracleDialect, &r, "eadv", "1=1");
        assert!(out.contains("LEFT JOIN"));
        assert!(out.contains("COALESCE(flag.v,0)"));
        assert!(out.contains("UEADV"));
    }

    #[test]
    fn max_neg_delta_dv_filters_negative_and_picks_latest() {
        let r = rule("max_neg_delta_dv", vec![]);
        let out = fragment(&OracleDialect, &r, "eadv", "1=1");
        assert!(out.contains("delta < 0"));
        assert!(out.contains("LAG("));
    }

    #[test]
    fn unknown_operator_falls_back_to_count() {
        let r = rule("bogus_operator", vec![]);
        let out = fragment(&OracleDialect, &r, "eadv", "1=1");
        assert!(out.contains("COUNT(*)"));
    }
}
