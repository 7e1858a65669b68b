//! Linker (§4.3): per-rule reference extraction, the cross-ruleblock
//! dependency graph, cycle detection and topological ordering.

use std::collections::{BTreeSet, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::PicoruleError;
use crate::model::{DependencyGraph, ParsedRuleblock, Rule};

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[a-z_][a-z0-9_]*\b").unwrap());
static QUOTED: Lazy<Regex> = Lazy::new(|| Regex::new(r"'[^']*'|`[^`]*`").unwrap());

const EVENT_TABLE_COLUMNS: &[&str] = &["eid", "att", "dt", "val", "loc"];

/// Stoplist of keywords and built-in aggregate names excluded from free
/// identifier extraction (§4.3). Dialect-specific expression functions
/// (`nvl`, `round`, `power`, ...) are deliberately *not* in this list; the
/// leak is harmless, since edges are only added when a reference matches a
/// present ruleblock's bind target, never from the raw reference set.
static STOPLIST: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "and", "or", "not", "is", "in", "like",
        "last", "first", "count", "sum", "avg", "min", "max", "median",
        "distinct_count", "nth", "lastdv", "firstdv", "maxldv", "minldv",
        "minfdv", "max_neg_delta_dv", "serialize", "serialize2",
        "serializedv", "serializedv2", "regr_slope", "regr_intercept",
        "regr_r2", "exists", "stats_mode", "temporal_regularity",
        "case", "when", "then", "else", "end",
        "null", "true", "false", "sysdate",
    ]
    .into_iter()
    .collect()
});

/// Extract free variable identifiers from an expression fragment, applying
/// the stoplist and stripping quoted literal contents first so string
/// payloads are never mistaken for identifiers.
fn free_identifiers(text: &str) -> BTreeSet<String> {
    let stripped = QUOTED.replace_all(text, "");
    IDENTIFIER
        .find_iter(&stripped)
        .map(|m| m.as_str().to_string())
        .filter(|id| !STOPLIST.contains(id.as_str()))
        .collect()
}

/// Populate each rule's `references` set (§4.3).
pub fn extract_references(rules: &mut [Rule]) {
    for rule in rules {
        let refs = match rule {
            Rule::Compute(c) => {
                let mut refs = BTreeSet::new();
                for arm in &c.conditions {
                    if let Some(pred) = &arm.predicate {
                        refs.extend(free_identifiers(pred));
                    }
                    refs.extend(free_identifiers(&arm.return_value));
                }
                refs
            }
            Rule::Fetch(f) => {
                let mut refs = BTreeSet::new();
                if let Some(pred) = &f.predicate {
                    refs.extend(
                        free_identifiers(pred)
                            .into_iter()
                            .filter(|id| !EVENT_TABLE_COLUMNS.contains(&id.as_str())),
                    );
                }
                refs
            }
            Rule::Bind(b) => {
                let mut refs = BTreeSet::new();
                refs.insert(b.source_variable.clone());
                refs
            }
        };
        *rule.references_mut() = refs;
    }
}

/// Build the dependency graph over present ruleblocks (§3, §4.3): an edge
/// `A -> B` exists iff `A` contains a bind to present ruleblock `B`.
/// Adjacency preserves input order, which is what keeps the later
/// topological sort deterministic (§9 design note).
pub fn build_dependency_graph(ruleblocks: &[ParsedRuleblock]) -> DependencyGraph {
    let present: HashSet<&str> = ruleblocks.iter().map(|rb| rb.name.as_str()).collect();

    let mut edges = Vec::with_capacity(ruleblocks.len());
    for rb in ruleblocks {
        let mut deps = Vec::new();
        let mut seen = HashSet::new();
        for rule in &rb.rules {
            if let Rule::Bind(b) = rule {
                if present.contains(b.source_ruleblock.as_str()) && seen.insert(b.source_ruleblock.clone())
                {
                    deps.push(b.source_ruleblock.clone());
                } else if !present.contains(b.source_ruleblock.as_str()) {
                    log::warn!(
                        "ruleblock '{}': bind references absent ruleblock '{}'; no dependency edge added",
                        rb.name,
                        b.source_ruleblock
                    );
                }
            }
        }
        edges.push((rb.name.clone(), deps));
    }
    DependencyGraph { edges }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Grey,
    Black,
}

/// Reverse-postorder topological sort with cycle detection (§4.3). Visits
/// nodes in input order so that unconstrained pairs keep their original
/// relative order, and on finding a grey (in-progress) successor,
/// reconstructs the cycle path for the error message.
pub fn topological_order(graph: &DependencyGraph) -> Result<Vec<String>, PicoruleError> {
    let names: Vec<&str> = graph.names().collect();
    let mut color: std::collections::HashMap<&str, Color> =
        names.iter().map(|n| (*n, Color::White)).collect();
    let mut order = Vec::with_capacity(names.len());
    let mut stack: Vec<String> = Vec::new();

    for &name in &names {
        if color[name] == Color::White {
            visit(graph, name, &mut color, &mut order, &mut stack)?;
        }
    }

    Ok(order)
}

fn visit<'a>(
    graph: &'a DependencyGraph,
    name: &'a str,
    color: &mut std::collections::HashMap<&'a str, Color>,
    order: &mut Vec<String>,
    stack: &mut Vec<String>,
) -> Result<(), PicoruleError> {
    color.insert(name, Color::Grey);
    stack.push(name.to_string());

    for dep in graph.dependencies_of(name) {
        match color.get(dep.as_str()) {
            Some(Color::Grey) => {
                let start = stack.iter().position(|n| n == dep).unwrap_or(0);
                let mut path: Vec<String> = stack[start..].to_vec();
                path.push(dep.clone());
                return Err(PicoruleError::CircularDependency {
                    path: path.join(" -> "),
                });
            }
            Some(Color::Black) => {}
            Some(Color::White) | None => {
                visit(graph, dep.as_str(), color, order, stack)?;
            }
        }
    }

    stack.pop();
    color.insert(name, Color::Black);
    order.push(name.to_string());
    Ok(())
}
