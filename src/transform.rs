//! Transformer (§4.4): subset filtering and bidirectional graph pruning,
//! applied to the topologically ordered ruleblock list while preserving
//! that order.

use std::collections::{BTreeSet, HashSet};

use crate::model::{DependencyGraph, LinkedRuleblock};

/// All name comparisons in the transformer are case-insensitive (§4.4);
/// ruleblock names themselves are already lowercase by grammar, so this
/// only matters for caller-supplied subset/prune sets.
fn normalize(set: &BTreeSet<String>) -> HashSet<String> {
    set.iter().map(|s| s.to_lowercase()).collect()
}

/// Step 1: retain only ruleblocks whose name is in `subset` (case
/// insensitive). An empty subset is a no-op (§4.4).
pub fn apply_subset(ordered: Vec<LinkedRuleblock>, subset: &BTreeSet<String>) -> Vec<LinkedRuleblock> {
    if subset.is_empty() {
        return ordered;
    }
    let wanted = normalize(subset);
    ordered
        .into_iter()
        .filter(|rb| wanted.contains(&rb.name.to_lowercase()))
        .collect()
}

/// Transitive closure over outgoing edges from `seeds` (including the seeds
/// themselves) — the ancestors/sources that `seeds` depend on (§4.4 `Anc`).
fn ancestors(graph: &DependencyGraph, seeds: &HashSet<String>) -> HashSet<String> {
    let mut visited: HashSet<String> = HashSet::new();
    let mut stack: Vec<String> = seeds.iter().cloned().collect();
    while let Some(name) = stack.pop() {
        if !visited.insert(name.clone()) {
            continue;
        }
        for dep in graph.dependencies_of(&name) {
            if !visited.contains(dep) {
                stack.push(dep.clone());
            }
        }
    }
    visited
}

/// Transitive closure over reverse edges from `seeds` (including the seeds
/// themselves) — the descendants/sinks that consume `seeds` (§4.4 `Desc`).
fn descendants(graph: &DependencyGraph, seeds: &HashSet<String>) -> HashSet<String> {
    let mut reverse: std::collections::HashMap<&str, Vec<&str>> = std::collections::HashMap::new();
    for (name, deps) in &graph.edges {
        for dep in deps {
            reverse.entry(dep.as_str()).or_default().push(name.as_str());
        }
    }

    let mut visited: HashSet<String> = HashSet::new();
    let mut stack: Vec<String> = seeds.iter().cloned().collect();
    while let Some(name) = stack.pop() {
        if !visited.insert(name.clone()) {
            continue;
        }
        if let Some(children) = reverse.get(name.as_str()) {
            for child in children {
                if !visited.contains(*child) {
                    stack.push(child.to_string());
                }
            }
        }
    }
    visited
}

/// Step 2: apply `pruneInputs`/`pruneOutputs` (§4.4). The ordering from the
/// linker (§4.3) is preserved throughout by filtering in place rather than
/// rebuilding the list.
pub fn apply_pruning(
    ordered: Vec<LinkedRuleblock>,
    graph: &DependencyGraph,
    prune_inputs: &BTreeSet<String>,
    prune_outputs: &BTreeSet<String>,
) -> Vec<LinkedRuleblock> {
    let inputs = normalize(prune_inputs);
    let outputs = normalize(prune_outputs);

    if inputs.is_empty() && outputs.is_empty() {
        return ordered;
    }

    let present: HashSet<String> = ordered.iter().map(|rb| rb.name.to_lowercase()).collect();
    let inputs: HashSet<String> = inputs.into_iter().filter(|n| present.contains(n)).collect();
    let outputs: HashSet<String> = outputs.into_iter().filter(|n| present.contains(n)).collect();

    let keep: HashSet<String> = match (inputs.is_empty(), outputs.is_empty()) {
        (true, true) => present,
        (true, false) => ancestors(graph, &outputs),
        (false, true) => descendants(graph, &inputs),
        (false, false) => {
            let anc = ancestors(graph, &outputs);
            let desc = descendants(graph, &inputs);
            anc.intersection(&desc).cloned().collect()
        }
    };

    ordered
        .into_iter()
        .filter(|rb| keep.contains(&rb.name.to_lowercase()))
        .collect()
}
