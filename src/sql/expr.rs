//! Expression translator (§4.5, §9): converts Picorules expression syntax —
//! used both inside compute arms and inside fetch predicates — into dialect
//! SQL. Implemented as an explicit ordered pipeline of string rewrites rather
//! than a full expression AST. Order matters: the date-arithmetic rewrites
//! involving `sysdate` must run before the generic `sysdate` token
//! substitution, or the literal text they match on would already be gone.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::util::rewrite_calls;

use super::dialect::DialectHandler;

const DATE_VAR: &str = r"[a-z_][a-z0-9_]*(?:_dt_min|_dt_max|_dt|_fd|_ld)|dt";

static BACKTICK_STRING: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`]*)`").unwrap());
static NOT_NULL_TEST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Za-z0-9_\)])!\?").unwrap());
static NULL_TEST: Lazy<Regex> = Lazy::new(|| Regex::new(r"([A-Za-z0-9_\)])\?").unwrap());

static SYSDATE_MINUS_VAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"sysdate\s*-\s*({DATE_VAR})\b")).unwrap());
static SYSDATE_MINUS_N: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"sysdate\s*-\s*(\d+)\b").unwrap());
static SYSDATE_PLUS_N: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"sysdate\s*\+\s*(\d+)\b").unwrap());
static VAR_MINUS_VAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"\b({DATE_VAR})\s*-\s*({DATE_VAR})\b")).unwrap());
static VAR_MINUS_N: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"\b({DATE_VAR})\s*-\s*(\d+)\b")).unwrap());
static VAR_PLUS_N: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"\b({DATE_VAR})\s*\+\s*(\d+)\b")).unwrap());
static SYSDATE_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bsysdate\b").unwrap());

/// Translate one Picorules expression fragment into dialect SQL.
pub(crate) fn translate(dialect: &dyn DialectHandler, expr: &str) -> String {
    let mut s = expr.to_string();

    s = BACKTICK_STRING.replace_all(&s, "'$1'").to_string();

    if s.trim() == "." {
        return "1=1".to_string();
    }

    // Date arithmetic, which must run before the blanket `sysdate` token
    // substitution and before null-test rewriting touches `?`.
    s = SYSDATE_MINUS_VAR
        .replace_all(&s, |c: &regex::Captures| dialect.day_diff(dialect.current_date(), &c[1]))
        .to_string();
    s = VAR_MINUS_VAR
        .replace_all(&s, |c: &regex::Captures| dialect.day_diff(&c[1], &c[2]))
        .to_string();
    s = SYSDATE_MINUS_N
        .replace_all(&s, |c: &regex::Captures| {
            dialect.date_add(dialect.current_date(), -c[1].parse::<i64>().unwrap_or(0))
        })
        .to_string();
    s = SYSDATE_PLUS_N
        .replace_all(&s, |c: &regex::Captures| {
            dialect.date_add(dialect.current_date(), c[1].parse::<i64>().unwrap_or(0))
        })
        .to_string();
    s = VAR_MINUS_N
        .replace_all(&s, |c: &regex::Captures| {
            dialect.date_add(&c[1], -c[2].parse::<i64>().unwrap_or(0))
        })
        .to_string();
    s = VAR_PLUS_N
        .replace_all(&s, |c: &regex::Captures| {
            dialect.date_add(&c[1], c[2].parse::<i64>().unwrap_or(0))
        })
        .to_string();
    s = SYSDATE_TOKEN.replace_all(&s, dialect.current_date()).to_string();

    // Null tests, anchored to an identifier or a closing paren so stray `?`
    // characters inside already-quoted strings are left alone.
    s = NOT_NULL_TEST.replace_all(&s, "$1 IS NOT NULL").to_string();
    s = NULL_TEST.replace_all(&s, "$1 IS NULL").to_string();

    s = s.replace("lower__bound__dt", "'0001-01-01'");
    s = s.replace("upper__bound__dt", "'9999-12-31'");

    s = rewrite_calls(&s, "nvl", |args| dialect.coalesce(args));
    s = rewrite_calls(&s, "to_number", |args| dialect.cast_numeric(&args[0]));
    s = rewrite_calls(&s, "to_char", |args| {
        if args.len() >= 2 {
            dialect.date_format(&args[0], args[1].trim_matches('\''))
        } else {
            dialect.cast_string(&args[0])
        }
    });
    s = rewrite_calls(&s, "substr", |args| match args.len() {
        3 => dialect.substring(&args[0], &args[1], &args[2]),
        2 if args[1].trim_start().starts_with('-') => {
            dialect.right_n(&args[0], args[1].trim_start().trim_start_matches('-'))
        }
        2 => dialect.substring_from(&args[0], &args[1]),
        _ => format!("substr({})", args.join(",")),
    });
    s = rewrite_calls(&s, "ceil", |args| dialect.ceil(&args[0]));

    s = rewrite_calls(&s, "least_date", |args| coalesce_extreme(dialect, args, true));
    s = rewrite_calls(&s, "greatest_date", |args| coalesce_extreme(dialect, args, false));
    s = rewrite_calls(&s, "least", |args| pairwise_fold(args, true, true));
    s = rewrite_calls(&s, "greatest", |args| pairwise_fold(args, false, true));

    if matches!(dialect.dialect(), crate::options::Dialect::MsSql) {
        s = s.replace("||", "+");
    }

    s
}

/// `least_date`/`greatest_date`: ignore NULLs by coalescing to a sentinel
/// that can never be the real answer, then unmasking the sentinel back to
/// NULL if every argument was missing (§4.5).
fn coalesce_extreme(dialect: &dyn DialectHandler, args: &[String], is_min: bool) -> String {
    let sentinel = if is_min { "'9999-12-31'" } else { "'0001-01-01'" };
    let coalesced: Vec<String> = args
        .iter()
        .map(|a| dialect.coalesce(&[a.clone(), sentinel.to_string()]))
        .collect();
    let folded = pairwise_fold(&coalesced, is_min, false);
    format!("CASE WHEN {folded} = {sentinel} THEN NULL ELSE {folded} END")
}

/// `least`/`greatest`: fold pairwise, returning NULL as soon as any argument
/// is NULL when `null_aware` is set (§4.5). `least_date`/`greatest_date`
/// pass `null_aware = false` since their arguments are already coalesced.
fn pairwise_fold(args: &[String], is_min: bool, null_aware: bool) -> String {
    let cmp = if is_min { "<=" } else { ">=" };
    let mut iter = args.iter();
    let mut acc = iter.next().cloned().unwrap_or_default();
    for next in iter {
        acc = if null_aware {
            format!(
                "CASE WHEN {acc} IS NULL OR {next} IS NULL THEN NULL WHEN {acc} {cmp} {next} THEN {acc} ELSE {next} END"
            )
        } else {
            format!("CASE WHEN {acc} {cmp} {next} THEN {acc} ELSE {next} END")
        };
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::mssql::MsSqlDialect;
    use crate::sql::oracle::OracleDialect;
    use crate::sql::postgres::PostgresDialect;

    #[test]
    fn backtick_strings_become_single_quoted() {
        assert_eq!(translate(&OracleDialect, "att = `lab_a`"), "att = 'lab_a'");
    }

    #[test]
    fn null_tests() {
        assert_eq!(translate(&OracleDialect, "x?"), "x IS NULL");
        assert_eq!(translate(&OracleDialect, "x!?"), "x IS NOT NULL");
    }

    #[test]
    fn null_test_after_closing_paren() {
        assert_eq!(translate(&OracleDialect, "f(x)?"), "f(x) IS NULL");
    }

    #[test]
    fn lone_dot_is_always_true_guard() {
        assert_eq!(translate(&OracleDialect, "."), "1=1");
        // Decimal numbers must not be mistaken for the lone-dot guard.
        assert_eq!(translate(&OracleDialect, "val = 2.5"), "val = 2.5");
    }

    #[test]
    fn sysdate_minus_number_runs_before_generic_sysdate_substitution() {
        let out = translate(&OracleDialect, "sysdate - 30");
        assert_eq!(out, "(SYSDATE - 30)");
    }

    #[test]
    fn sysdate_minus_date_var_is_day_diff() {
        let out = translate(&OracleDialect, "sysdate - acr_max_dt");
        assert_eq!(out, "(SYSDATE - acr_max_dt)");
    }

    #[test]
    fn date_var_plus_n_mssql() {
        let out = translate(&MsSqlDialect, "egfr_last_dt + 90");
        assert_eq!(out, "DATEADD(day, 90, egfr_last_dt)");
    }

    #[test]
    fn nvl_rename() {
        assert_eq!(translate(&MsSqlDialect, "nvl(a,b)"), "ISNULL(a,b)");
        assert_eq!(translate(&PostgresDialect, "nvl(a,b)"), "COALESCE(a,b)");
    }

    #[test]
    fn to_char_without_format_is_string_cast() {
        assert_eq!(translate(&PostgresDialect, "to_char(val)"), "(val)::text");
    }

    #[test]
    fn to_char_with_format_is_date_format() {
        assert_eq!(
            translate(&OracleDialect, "to_char(dt,'YYYY-MM-DD')"),
            "TO_CHAR(dt,'YYYY-MM-DD')"
        );
    }

    #[test]
    fn substr_negative_start_is_right() {
        assert_eq!(translate(&PostgresDialect, "substr(x,-3)"), "RIGHT(x,3)");
    }

    #[test]
    fn substr_with_length() {
        assert_eq!(
            translate(&MsSqlDialect, "substr(x,1,3)"),
            "SUBSTRING(x,1,3)"
        );
    }

    #[test]
    fn ceil_rename_mssql_only() {
        assert_eq!(translate(&MsSqlDialect, "ceil(x)"), "CEILING(x)");
        assert_eq!(translate(&OracleDialect, "ceil(x)"), "CEIL(x)");
    }

    #[test]
    fn system_constants() {
        assert_eq!(
            translate(&OracleDialect, "d >= lower__bound__dt"),
            "d >= '0001-01-01'"
        );
        assert_eq!(
            translate(&OracleDialect, "d <= upper__bound__dt"),
            "d <= '9999-12-31'"
        );
    }

    #[test]
    fn least_returns_null_if_any_arg_null() {
        let out = translate(&OracleDialect, "least(a,b)");
        assert!(out.contains("IS NULL"));
        assert!(out.contains("<="));
    }

    #[test]
    fn least_date_ignores_nulls() {
        let out = translate(&OracleDialect, "least_date(a,b)");
        assert!(out.contains("9999-12-31"));
        assert!(out.contains("COALESCE"));
    }

    #[test]
    fn concat_operator_normalised_for_mssql() {
        assert_eq!(translate(&MsSqlDialect, "a || b"), "a + b");
        assert_eq!(translate(&OracleDialect, "a || b"), "a || b");
    }
}
