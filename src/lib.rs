//! Picorules compiler: converts a batch of ruleblock texts into a
//! dependency-ordered sequence of SQL programs targeting Oracle PL/SQL,
//! T-SQL, or PostgreSQL (§1, §2). The pipeline is a pure function of its
//! arguments — [`compile`] performs no I/O, spawns nothing, and never
//! raises: every failure is collected into [`CompileResult::errors`].

mod error;
mod linker;
mod manifest;
mod model;
mod options;
mod parser;
mod sql;
mod transform;
mod util;

pub use error::{Error, Warning};
pub use model::{AttributeToken, Manifest, ManifestEntry, Property, RuleblockInput};
pub use options::{CompileResult, Dialect, Options};

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use error::PicoruleError;
use model::{LinkedRuleblock, ParsedRuleblock, Rule};

static NAME_GRAMMAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z_][a-z0-9_]*$").unwrap());

const MAX_TEXT_BYTES: usize = 1024 * 1024;
const MAX_NAME_LEN: usize = 100;

/// Compile a batch of ruleblocks (§6). The single public entry point.
pub fn compile(ruleblocks: &[RuleblockInput], options: &Options) -> CompileResult {
    let mut errors = Vec::new();

    if let Err(validation_errors) = validate_inputs(ruleblocks) {
        errors.extend(validation_errors.into_iter().map(Error::from));
        return CompileResult {
            success: false,
            sql: Vec::new(),
            errors,
            warnings: Vec::new(),
            manifest: None,
        };
    }

    let active: Vec<&RuleblockInput> = ruleblocks
        .iter()
        .filter(|rb| options.include_inactive || rb.is_active)
        .collect();

    let mut warnings = Vec::new();
    let mut parsed = Vec::with_capacity(active.len());
    for rb in &active {
        match parser::parse_ruleblock(&rb.name, &rb.text) {
            Ok((rules, rule_warnings)) => {
                warnings.extend(
                    rule_warnings
                        .into_iter()
                        .map(|msg| Warning::new(rb.name.clone(), msg)),
                );
                parsed.push(ParsedRuleblock {
                    name: rb.name.clone(),
                    is_active: rb.is_active,
                    rules,
                });
            }
            Err(err) => errors.push(Error::from(err)),
        }
    }

    if !errors.is_empty() {
        return CompileResult {
            success: false,
            sql: Vec::new(),
            errors,
            warnings,
            manifest: None,
        };
    }

    for rb in &mut parsed {
        linker::extract_references(&mut rb.rules);
    }

    let graph = linker::build_dependency_graph(&parsed);
    let order = match linker::topological_order(&graph) {
        Ok(order) => order,
        Err(err) => {
            return CompileResult {
                success: false,
                sql: Vec::new(),
                errors: vec![Error::from(err)],
                warnings,
                manifest: None,
            }
        }
    };

    let by_name: std::collections::HashMap<&str, &ParsedRuleblock> =
        parsed.iter().map(|rb| (rb.name.as_str(), rb)).collect();
    let linked: Vec<LinkedRuleblock> = order
        .into_iter()
        .filter_map(|name| by_name.get(name.as_str()).copied())
        .map(|rb| LinkedRuleblock {
            name: rb.name.clone(),
            is_active: rb.is_active,
            rules: rb.rules.clone(),
            dependencies: graph.dependencies_of(&rb.name).to_vec(),
        })
        .collect();

    let subset_applied = transform::apply_subset(linked, &options.subset);
    let transformed = transform::apply_pruning(
        subset_applied,
        &graph,
        &options.prune_inputs,
        &options.prune_outputs,
    );

    let sql = sql::generate_all(options.dialect, &transformed);
    let manifest = manifest::build(options.dialect, &graph, &transformed);

    CompileResult {
        success: true,
        sql,
        errors,
        warnings,
        manifest: Some(manifest),
    }
}

/// Name grammar, length, text-size, and duplicate-name checks (§3, §4.1).
fn validate_inputs(ruleblocks: &[RuleblockInput]) -> Result<(), Vec<PicoruleError>> {
    let mut errs = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for rb in ruleblocks {
        if rb.name.is_empty() || rb.name.len() > MAX_NAME_LEN || !NAME_GRAMMAR.is_match(&rb.name) {
            errs.push(PicoruleError::InvalidName { name: rb.name.clone() });
            continue;
        }
        if !seen.insert(rb.name.clone()) {
            errs.push(PicoruleError::DuplicateRuleblock { name: rb.name.clone() });
        }
        if rb.text.len() > MAX_TEXT_BYTES {
            errs.push(PicoruleError::TextTooLarge { name: rb.name.clone() });
        }
    }

    if errs.is_empty() {
        Ok(())
    } else {
        Err(errs)
    }
}
