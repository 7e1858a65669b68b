//! Data model shared by every pipeline stage (parser → linker → transform →
//! generator → manifest). Nothing in here performs I/O or owns mutable state;
//! every value is built once and read by later stages.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// One ruleblock as supplied by the caller, before parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleblockInput {
    pub name: String,
    pub text: String,
    pub is_active: bool,
}

impl RuleblockInput {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        RuleblockInput {
            name: name.into(),
            text: text.into(),
            is_active: true,
        }
    }

    pub fn inactive(name: impl Into<String>, text: impl Into<String>) -> Self {
        RuleblockInput {
            name: name.into(),
            text: text.into(),
            is_active: false,
        }
    }
}

/// The column a fetch operator reads, or the column a bind pulls through.
///
/// `_` is the surface sentinel spelling of [`Property::Val`]; property
/// resolution happens once at parse time, so later stages never see `_`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Property {
    Val,
    Dt,
}

impl Property {
    pub fn parse(token: &str) -> Property {
        match token {
            "dt" => Property::Dt,
            _ => Property::Val,
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            Property::Val => "val",
            Property::Dt => "dt",
        }
    }
}

/// A single attribute token from a fetch's attribute list: either a bare
/// name or a SQL-LIKE pattern (anything containing `%`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeToken(pub String);

impl AttributeToken {
    pub fn is_wildcard(&self) -> bool {
        self.0.contains('%')
    }
}

/// One `{predicate?, returnValue}` arm of a Compute rule. `predicate == None`
/// marks the ELSE arm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputeArm {
    pub predicate: Option<String>,
    pub return_value: String,
}

/// The three statement shapes a ruleblock's text can contain, in the order
/// they appeared in source. Every variant carries `references`, populated by
/// the linker from the rule's own textual content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    Fetch(FetchRule),
    Compute(ComputeRule),
    Bind(BindRule),
}

impl Rule {
    pub fn assigned_variable(&self) -> &str {
        match self {
            Rule::Fetch(r) => &r.assigned_variable,
            Rule::Compute(r) => &r.assigned_variable,
            Rule::Bind(r) => &r.assigned_variable,
        }
    }

    pub fn references(&self) -> &BTreeSet<String> {
        match self {
            Rule::Fetch(r) => &r.references,
            Rule::Compute(r) => &r.references,
            Rule::Bind(r) => &r.references,
        }
    }

    pub fn references_mut(&mut self) -> &mut BTreeSet<String> {
        match self {
            Rule::Fetch(r) => &mut r.references,
            Rule::Compute(r) => &mut r.references,
            Rule::Bind(r) => &mut r.references,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRule {
    pub assigned_variable: String,
    pub table: String,
    pub attribute_list: Vec<AttributeToken>,
    pub property: Property,
    pub function_name: String,
    pub function_params: Vec<String>,
    pub predicate: Option<String>,
    pub references: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputeRule {
    pub assigned_variable: String,
    pub conditions: Vec<ComputeArm>,
    pub references: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindRule {
    pub assigned_variable: String,
    pub source_ruleblock: String,
    pub source_variable: String,
    pub property: Property,
    pub references: BTreeSet<String>,
}

/// A fully parsed ruleblock: source text turned into an ordered rule list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRuleblock {
    pub name: String,
    pub is_active: bool,
    pub rules: Vec<Rule>,
}

/// Dependency graph over *present* ruleblocks only (§3 invariant: a bind to
/// an absent ruleblock contributes no edge). Adjacency is insertion-ordered
/// so that topological order is deterministic run over run (§9 design note).
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// `name -> names it depends on`, in first-seen order.
    pub edges: Vec<(String, Vec<String>)>,
}

impl DependencyGraph {
    pub fn dependencies_of(&self, name: &str) -> &[String] {
        self.edges
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, deps)| deps.as_slice())
            .unwrap_or(&[])
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.edges.iter().map(|(n, _)| n.as_str())
    }
}

/// One ruleblock after linking: parsed rules plus its place in the
/// dependency-ordered batch.
#[derive(Debug, Clone)]
pub struct LinkedRuleblock {
    pub name: String,
    pub is_active: bool,
    pub rules: Vec<Rule>,
    pub dependencies: Vec<String>,
}

/// A manifest entry, one per emitted ruleblock (§4.6).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ManifestEntry {
    pub ruleblock_id: String,
    pub execution_order: usize,
    pub target_table: String,
    pub dependencies: Vec<String>,
    pub output_variables: Vec<String>,
    pub sql_index: usize,
}

/// Top-level manifest (§4.6, §6).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Manifest {
    pub version: String,
    pub dialect: String,
    pub compiled_at: String,
    pub total_ruleblocks: usize,
    pub entries: Vec<ManifestEntry>,
    pub dependency_graph: std::collections::BTreeMap<String, Vec<String>>,
}
