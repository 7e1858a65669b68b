//! End-to-end compile scenarios, exercised through the public API only.

use picorules::{compile, Dialect, Options, RuleblockInput};

fn rb(name: &str, text: &str) -> RuleblockInput {
    RuleblockInput::new(name, text)
}

#[test]
fn smoke_oracle_ckd() {
    let blocks = vec![rb(
        "ckd",
        "egfr_last => eadv.lab_bld_egfr.val.last(); has_ckd : {egfr_last < 60 => 1}, {=> 0};",
    )];
    let result = compile(&blocks, &Options::new(Dialect::Oracle));
    assert!(result.success);
    assert_eq!(result.sql.len(), 1);
    let sql = &result.sql[0];
    assert!(sql.contains("CREATE TABLE ROUT_CKD AS"));
    assert!(sql.contains("UEADV AS"));
    assert!(sql.contains("SQ_EGFR_LAST"));
    assert!(sql.contains("SQ_HAS_CKD"));
    assert!(sql.contains("USING (eid)"));

    let manifest = result.manifest.unwrap();
    assert_eq!(manifest.total_ruleblocks, 1);
    assert_eq!(manifest.entries[0].output_variables, vec!["egfr_last", "has_ckd"]);
}

#[test]
fn cross_block_ordering_mssql() {
    let blocks = vec![
        rb("rb3", "c => rout_rb2.b.val.bind();"),
        rb("rb1", "a => eadv.att1.val.last();"),
        rb("rb2", "b => rout_rb1.a.val.bind();"),
    ];
    let result = compile(&blocks, &Options::new(Dialect::MsSql));
    assert!(result.success);
    let ids: Vec<&str> = result
        .manifest
        .as_ref()
        .unwrap()
        .entries
        .iter()
        .map(|e| e.ruleblock_id.as_str())
        .collect();
    assert_eq!(ids, vec!["rb1", "rb2", "rb3"]);
    assert!(result.sql[0].contains("SROUT_rb1"));
    // A bind reads through the source ruleblock's target table, not a raw
    // column reference into its own temp table.
    assert!(!result.sql[2].contains("FROM #SQ_c"));
}

#[test]
fn cycle_yields_single_circular_dependency_error() {
    let blocks = vec![
        rb("rb1", "a => rout_rb2.b.val.bind();"),
        rb("rb2", "b => rout_rb1.a.val.bind();"),
    ];
    let result = compile(&blocks, &Options::new(Dialect::Oracle));
    assert!(!result.success);
    assert_eq!(result.sql.len(), 0);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].message.starts_with("Circular dependency"));
}

#[test]
fn path_pruning_chain() {
    let blocks = vec![
        rb("a", "x => eadv.att1.val.last();"),
        rb("b", "y => rout_a.x.val.bind();"),
        rb("c", "z => rout_b.y.val.bind();"),
        rb("d", "w => rout_c.z.val.bind();"),
        rb("unrelated", "u => eadv.att2.val.last();"),
    ];
    let mut options = Options::new(Dialect::Oracle);
    options.prune_inputs.insert("b".to_string());
    options.prune_outputs.insert("d".to_string());
    let result = compile(&blocks, &options);
    assert!(result.success);
    let ids: Vec<&str> = result
        .manifest
        .as_ref()
        .unwrap()
        .entries
        .iter()
        .map(|e| e.ruleblock_id.as_str())
        .collect();
    assert_eq!(ids, vec!["b", "c", "d"]);
}

#[test]
fn dv_family_postgres_two_columns() {
    let blocks = vec![rb("g", "acr_max => eadv.lab_ua_acr._.maxldv();")];
    let result = compile(&blocks, &Options::new(Dialect::PostgreSql));
    assert!(result.success);
    let sql = &result.sql[0];
    assert!(sql.contains("acr_max_val"));
    assert!(sql.contains("acr_max_dt"));
    assert!(sql.contains("CREATE TABLE rout_g AS"));
    assert_eq!(
        result.manifest.unwrap().entries[0].output_variables,
        vec!["acr_max"]
    );
}

#[test]
fn nested_paren_parameter_mssql() {
    let blocks = vec![rb(
        "h",
        "acr_graph => eadv.lab_ua_acr.val.serializedv2(round(val,0)~dt);",
    )];
    let result = compile(&blocks, &Options::new(Dialect::MsSql));
    assert!(result.success);
    let sql = &result.sql[0];
    assert!(sql.contains("STRING_AGG"));
    assert!(sql.contains("'~'"));
}

#[test]
fn byte_identical_modulo_compiled_at() {
    let blocks = vec![rb("a", "x => eadv.att1.val.last();")];
    let r1 = compile(&blocks, &Options::new(Dialect::Oracle));
    let r2 = compile(&blocks, &Options::new(Dialect::Oracle));
    assert_eq!(r1.sql, r2.sql);
    let (m1, m2) = (r1.manifest.unwrap(), r2.manifest.unwrap());
    assert_eq!(m1.entries, m2.entries);
    assert_eq!(m1.dependency_graph, m2.dependency_graph);
}

#[test]
fn absent_bind_target_contributes_no_dependency_edge() {
    let blocks = vec![rb("a", "x => rout_missing.y.val.bind();")];
    let result = compile(&blocks, &Options::new(Dialect::Oracle));
    assert!(result.success);
    assert!(result.manifest.unwrap().entries[0].dependencies.is_empty());
}

#[test]
fn predicate_with_dependency_joins_prior_fragment() {
    let blocks = vec![rb(
        "rb",
        "baseline => eadv.lab_a.val.last(); \
         followup => eadv.lab_a.val.last().where(baseline > 0);",
    )];
    let result = compile(&blocks, &Options::new(Dialect::Oracle));
    assert!(result.success);
    let sql = &result.sql[0];
    assert!(sql.contains("JOIN SQ_BASELINE"));
}
