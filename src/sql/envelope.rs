//! Per-ruleblock envelope assembly (§4.5): wraps each rule's fragment in a
//! CTE (Oracle/PostgreSQL) or a materialised temp table (T-SQL), and
//! assembles the outer `SELECT eid, <cols> FROM UEADV LEFT JOIN …` that
//! produces the ruleblock's target table. Every fragment's output column is
//! renamed to the assigned variable itself (`v`/`v_val`/`v_dt` become
//! `<var>`/`<var>_val`/`<var>_dt`) so that later rules in the same
//! ruleblock can refer to an earlier one just by its bare name once it is
//! joined into scope — no alias bookkeeping needed in the expression
//! translator.

use std::collections::HashMap;

use crate::model::{BindRule, ComputeRule, FetchRule, LinkedRuleblock, Property, Rule};

use super::dialect::DialectHandler;
use super::{attribute_filter, expr, operators};

struct Assigned {
    name: String,
    is_two_col: bool,
    frag_name: String,
}

/// Render the full SQL program for one ruleblock. `two_col_index` maps
/// `(ruleblock, variable) -> is dv-family`, precomputed once across every
/// ruleblock in the batch (§4.5 dv-family note), so Bind rules can resolve
/// which column their source variable actually exposes.
pub(crate) fn generate(
    handler: &dyn DialectHandler,
    rb: &LinkedRuleblock,
    two_col_index: &HashMap<(String, String), bool>,
) -> String {
    let target = handler.target_table(&rb.name);
    let subject_set = handler.subject_set_name();

    let mut assigned: Vec<Assigned> = Vec::with_capacity(rb.rules.len());
    let mut ctes: Vec<String> = Vec::with_capacity(rb.rules.len());

    for rule in &rb.rules {
        let (var, is_two_col, raw_fragment) = match rule {
            Rule::Fetch(f) => (f.assigned_variable.clone(), operators::is_two_column(&f.function_name), fetch_fragment(handler, f, &assigned)),
            Rule::Compute(c) => (c.assigned_variable.clone(), false, compute_fragment(handler, c, &assigned)),
            Rule::Bind(b) => (b.assigned_variable.clone(), false, bind_fragment(handler, b, two_col_index)),
        };

        let frag_name = handler.intermediate_name(&var);
        let wrapped = wrap_fragment(&var, is_two_col, &raw_fragment);
        ctes.push(format!("{frag_name} AS ({wrapped})"));
        assigned.push(Assigned { name: var, is_two_col, frag_name });
    }

    if matches!(handler.dialect(), crate::options::Dialect::MsSql) {
        render_mssql(handler, &target, subject_set, &assigned, &ctes)
    } else {
        render_cte_dialect(handler, &target, subject_set, &assigned, &ctes)
    }
}

/// Rename a fragment's generic `v`/`v_val`/`v_dt` output to the assigned
/// variable's own column name(s).
fn wrap_fragment(var: &str, is_two_col: bool, raw: &str) -> String {
    if is_two_col {
        format!("SELECT eid, v_val AS {var}_val, v_dt AS {var}_dt FROM ({raw}) frag")
    } else {
        format!("SELECT eid, v AS {var} FROM ({raw}) frag")
    }
}

fn fetch_fragment(handler: &dyn DialectHandler, rule: &FetchRule, assigned: &[Assigned]) -> String {
    let attr_sql = attribute_filter::attribute_filter(handler, &rule.attribute_list);
    let where_sql = match &rule.predicate {
        Some(pred) => format!("{attr_sql} AND ({})", expr::translate(handler, pred)),
        None => attr_sql,
    };

    let prior: Vec<&Assigned> = assigned
        .iter()
        .filter(|a| rule.references.contains(&a.name))
        .collect();

    let from_sql = if prior.is_empty() {
        rule.table.clone()
    } else {
        let mut from = rule.table.clone();
        for p in &prior {
            let join = handler.join_on_eid(&rule.table, &p.frag_name);
            from = format!("{from} JOIN {} {join}", p.frag_name);
        }
        from
    };

    operators::fragment(handler, rule, &from_sql, &where_sql)
}

/// Compute fragment FROM clause: the subject set left-joined with every
/// previously-assigned variable in the ruleblock, so every name is in scope
/// for the CASE predicate/return expressions (§4.5).
fn compute_fragment(handler: &dyn DialectHandler, rule: &ComputeRule, assigned: &[Assigned]) -> String {
    let from_sql = join_all_prior(handler, assigned);

    let mut case_sql = String::from("CASE");
    for arm in &rule.conditions {
        match &arm.predicate {
            Some(pred) => {
                let pred_sql = expr::translate(handler, pred);
                let val_sql = expr::translate(handler, &arm.return_value);
                case_sql.push_str(&format!(" WHEN {pred_sql} THEN {val_sql}"));
            }
            None => {
                // No explicit ELSE arm means no ELSE clause here either —
                // SQL-standard behaviour already gives NULL.
                let val_sql = expr::translate(handler, &arm.return_value);
                case_sql.push_str(&format!(" ELSE {val_sql}"));
            }
        }
    }
    case_sql.push_str(" END");

    format!("SELECT {subject_set}.eid, {case_sql} AS v FROM {from_sql}", subject_set = handler.subject_set_name())
}

/// Bind (§4.2, §4.5 dv-family note): the source column is the bare variable
/// name for a plain fetch, but `<var>_val`/`<var>_dt` for a dv-family one —
/// those never expose a bare `<var>` column at all.
fn bind_fragment(
    handler: &dyn DialectHandler,
    rule: &BindRule,
    two_col_index: &HashMap<(String, String), bool>,
) -> String {
    let source_table = handler.target_table(&rule.source_ruleblock);
    let is_dv_family = two_col_index
        .get(&(rule.source_ruleblock.clone(), rule.source_variable.clone()))
        .copied()
        .unwrap_or(false);
    let column = if is_dv_family {
        match rule.property {
            Property::Val => format!("{}_val", rule.source_variable),
            Property::Dt => format!("{}_dt", rule.source_variable),
        }
    } else {
        rule.source_variable.clone()
    };
    format!("SELECT eid, {column} AS v FROM {source_table}")
}

fn join_all_prior(handler: &dyn DialectHandler, assigned: &[Assigned]) -> String {
    let subject_set = handler.subject_set_name();
    let mut from = subject_set.to_string();
    for a in assigned {
        let join = handler.join_on_eid(subject_set, &a.frag_name);
        from = format!("{from} LEFT JOIN {} {join}", a.frag_name);
    }
    from
}

fn select_columns(assigned: &[Assigned]) -> Vec<String> {
    let mut cols = Vec::with_capacity(assigned.len() * 2);
    for a in assigned {
        if a.is_two_col {
            cols.push(format!("{}.{}_val", a.frag_name, a.name));
            cols.push(format!("{}.{}_dt", a.frag_name, a.name));
        } else {
            cols.push(format!("{}.{}", a.frag_name, a.name));
        }
    }
    cols
}

/// Oracle / PostgreSQL: one `CREATE TABLE … AS WITH …` statement.
fn render_cte_dialect(
    handler: &dyn DialectHandler,
    target: &str,
    subject_set: &str,
    assigned: &[Assigned],
    ctes: &[String],
) -> String {
    let cols = select_columns(assigned);
    let col_list = if cols.is_empty() { String::new() } else { format!(", {}", cols.join(", ")) };

    let mut joins = String::new();
    for a in assigned {
        let join = handler.join_on_eid(subject_set, &a.frag_name);
        joins.push_str(&format!(" LEFT JOIN {} {join}", a.frag_name));
    }

    let mut sql = format!(
        "CREATE TABLE {target} AS\nWITH {subject_set} AS (SELECT DISTINCT eid FROM eadv)"
    );
    if !ctes.is_empty() {
        sql.push_str(",\n");
        sql.push_str(&ctes.join(",\n"));
    }
    sql.push_str(&format!(
        "\nSELECT {subject_set}.eid{col_list} FROM {subject_set}{joins};"
    ));
    sql
}

/// T-SQL: a serial script of temp-table materialisations, each indexed on
/// `eid` before the next fragment depends on it (§4.5, §6).
fn render_mssql(
    handler: &dyn DialectHandler,
    target: &str,
    subject_set: &str,
    assigned: &[Assigned],
    ctes: &[String],
) -> String {
    let mut script = String::new();

    script.push_str(&format!(
        "IF OBJECT_ID('tempdb..{subject_set}') IS NOT NULL DROP TABLE {subject_set};\n"
    ));
    for a in assigned {
        script.push_str(&format!(
            "IF OBJECT_ID('tempdb..{}') IS NOT NULL DROP TABLE {};\n",
            a.frag_name, a.frag_name
        ));
    }
    script.push_str(&format!(
        "IF OBJECT_ID('{target}') IS NOT NULL DROP TABLE {target};\n\n"
    ));

    script.push_str(&format!(
        "SELECT eid INTO {subject_set} FROM eadv GROUP BY eid;\n"
    ));

    for (a, cte) in assigned.iter().zip(ctes.iter()) {
        // `cte` is `"<frag_name> AS (<select ...>)"`; splice the temp-table
        // target into the same `SELECT ... INTO` shape T-SQL requires.
        let select_body = cte
            .strip_prefix(&format!("{} AS (", a.frag_name))
            .and_then(|s| s.strip_suffix(')'))
            .unwrap_or(cte.as_str());
        let into_form = splice_into(select_body, &a.frag_name);
        script.push_str(&format!("{into_form};\n"));
        script.push_str(&format!(
            "ALTER TABLE {} ADD PRIMARY KEY (eid);\n\n",
            a.frag_name
        ));
    }

    let cols = select_columns(assigned);
    let col_list = if cols.is_empty() { String::new() } else { format!(", {}", cols.join(", ")) };
    let mut joins = String::new();
    for a in assigned {
        let join = handler.join_on_eid(subject_set, &a.frag_name);
        joins.push_str(&format!(" LEFT OUTER JOIN {} {join}", a.frag_name));
    }
    script.push_str(&format!(
        "SELECT {subject_set}.eid{col_list} INTO {target} FROM {subject_set}{joins};\n"
    ));

    script
}

/// Rewrite `SELECT <cols> FROM <rest>` into `SELECT <cols> INTO <table> FROM
/// <rest>`, the T-SQL materialisation idiom used in place of `CREATE TABLE …
/// AS` (§4.5, §6).
fn splice_into(select_sql: &str, table: &str) -> String {
    match select_sql.find(" FROM ") {
        Some(idx) => format!("{} INTO {table} {}", &select_sql[..idx], &select_sql[idx + 1..]),
        None => select_sql.to_string(),
    }
}
