//! Manifest builder (§4.6): a structural description of the compiled batch,
//! built from the post-transform ruleblock list. Never reads or writes JSON
//! itself — that conversion is an external collaborator (§1) — but every
//! field derives `Serialize`/`Deserialize` so a caller's round-trip is
//! exact (§8 property 6).

use std::collections::BTreeMap;

use chrono::Utc;

use crate::model::{DependencyGraph, LinkedRuleblock, Manifest, ManifestEntry, Rule};
use crate::options::Dialect;
use crate::sql;

const MANIFEST_VERSION: &str = "1.0.0";

/// Output variable names in source-rule order; a dv-family variable
/// contributes its single logical name once (§4.6).
fn output_variables(rules: &[Rule]) -> Vec<String> {
    rules.iter().map(|r| r.assigned_variable().to_string()).collect()
}

pub(crate) fn build(dialect: Dialect, graph: &DependencyGraph, ruleblocks: &[LinkedRuleblock]) -> Manifest {
    let entries: Vec<ManifestEntry> = ruleblocks
        .iter()
        .enumerate()
        .map(|(idx, rb)| ManifestEntry {
            ruleblock_id: rb.name.clone(),
            execution_order: idx,
            target_table: sql::target_table(dialect, &rb.name),
            dependencies: graph.dependencies_of(&rb.name).to_vec(),
            output_variables: output_variables(&rb.rules),
            sql_index: idx,
        })
        .collect();

    let dependency_graph: BTreeMap<String, Vec<String>> = ruleblocks
        .iter()
        .map(|rb| (rb.name.clone(), graph.dependencies_of(&rb.name).to_vec()))
        .collect();

    Manifest {
        version: MANIFEST_VERSION.to_string(),
        dialect: dialect.to_string(),
        compiled_at: Utc::now().to_rfc3339(),
        total_ruleblocks: ruleblocks.len(),
        entries,
        dependency_graph,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BindRule, FetchRule, Property};

    fn rb(name: &str, rules: Vec<Rule>) -> LinkedRuleblock {
        LinkedRuleblock {
            name: name.to_string(),
            is_active: true,
            rules,
            dependencies: vec![],
        }
    }

    fn fetch_rule(var: &str) -> Rule {
        Rule::Fetch(FetchRule {
            assigned_variable: var.to_string(),
            table: "eadv".to_string(),
            attribute_list: vec![crate::model::AttributeToken("a".into())],
            property: Property::Val,
            function_name: "last".to_string(),
            function_params: vec![],
            predicate: None,
            references: Default::default(),
        })
    }

    #[test]
    fn sql_index_and_execution_order_match_position() {
        let blocks = vec![rb("a", vec![fetch_rule("x")]), rb("b", vec![fetch_rule("y")])];
        let graph = DependencyGraph {
            edges: vec![("a".into(), vec![]), ("b".into(), vec![])],
        };
        let manifest = build(Dialect::Oracle, &graph, &blocks);
        assert_eq!(manifest.entries.len(), 2);
        for (i, entry) in manifest.entries.iter().enumerate() {
            assert_eq!(entry.execution_order, i);
            assert_eq!(entry.sql_index, i);
        }
    }

    #[test]
    fn dependencies_restricted_to_present_nodes() {
        let blocks = vec![rb(
            "a",
            vec![Rule::Bind(BindRule {
                assigned_variable: "v".into(),
                source_ruleblock: "missing".into(),
                source_variable: "x".into(),
                property: Property::Val,
                references: Default::default(),
            })],
        )];
        let graph = DependencyGraph {
            edges: vec![("a".into(), vec![])],
        };
        let manifest = build(Dialect::PostgreSql, &graph, &blocks);
        assert!(manifest.entries[0].dependencies.is_empty());
    }

    #[test]
    fn target_table_matches_dialect_naming() {
        let blocks = vec![rb("ckd", vec![fetch_rule("x")])];
        let graph = DependencyGraph {
            edges: vec![("ckd".into(), vec![])],
        };
        let manifest = build(Dialect::Oracle, &graph, &blocks);
        assert_eq!(manifest.entries[0].target_table, "ROUT_CKD");
    }

    #[test]
    fn version_and_dialect_fields() {
        let manifest = build(Dialect::MsSql, &DependencyGraph::default(), &[]);
        assert_eq!(manifest.version, "1.0.0");
        assert_eq!(manifest.dialect, "mssql");
        assert_eq!(manifest.total_ruleblocks, 0);
    }
}
