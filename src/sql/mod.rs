//! Code generator (§4.5): dialect dispatch over a linked, transformed
//! ruleblock list, producing one SQL program per ruleblock.

mod attribute_filter;
mod dialect;
mod envelope;
mod expr;
mod mssql;
mod operators;
mod oracle;
mod postgres;

pub(crate) use dialect::DialectHandler;

use std::collections::HashMap;

use crate::model::{LinkedRuleblock, Rule};
use crate::options::Dialect;

/// Generate the SQL program for every ruleblock, in the order given (already
/// dependency-ordered and transformed by the time this runs).
pub(crate) fn generate_all(dialect: Dialect, ruleblocks: &[LinkedRuleblock]) -> Vec<String> {
    let handler = dialect::handler(dialect);
    let two_col_index = two_column_index(ruleblocks);
    ruleblocks
        .iter()
        .map(|rb| {
            log::debug!("generating SQL for ruleblock '{}'", rb.name);
            envelope::generate(handler.as_ref(), rb, &two_col_index)
        })
        .collect()
}

/// Maps `(ruleblock name, variable name) -> dv-family (two-column)` across
/// every ruleblock, so a Bind rule that pulls a variable from another
/// ruleblock can tell whether its source is a dv-family fetch (exposing
/// `<var>_val`/`<var>_dt`) or a plain single-column one (exposing `<var>`).
fn two_column_index(ruleblocks: &[LinkedRuleblock]) -> HashMap<(String, String), bool> {
    let mut index = HashMap::new();
    for rb in ruleblocks {
        for rule in &rb.rules {
            if let Rule::Fetch(f) = rule {
                index.insert(
                    (rb.name.clone(), f.assigned_variable.clone()),
                    operators::is_two_column(&f.function_name),
                );
            }
        }
    }
    index
}

/// `ROUT_<NAME>` / `SROUT_<name>` / `rout_<name>` per dialect (§6).
pub(crate) fn target_table(dialect: Dialect, name: &str) -> String {
    dialect::handler(dialect).target_table(name)
}
