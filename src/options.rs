//! Compiler entry-point surface: [`Dialect`], [`Options`] and
//! [`CompileResult`] (§6). `Dialect` derives `strum::EnumString`/
//! `strum::Display` for case-insensitive parsing and lowercase rendering;
//! it's also the key used to select each dialect's
//! [`crate::sql::DialectHandler`].

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Warning};
use crate::model::Manifest;

#[derive(
    Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize, strum::EnumString, strum::Display,
)]
#[strum(serialize_all = "lowercase")]
pub enum Dialect {
    Oracle,
    #[strum(serialize = "mssql")]
    MsSql,
    #[strum(serialize = "postgresql")]
    PostgreSql,
}

/// Compile options (§6). `dialect` is the only required field.
#[derive(Debug, Clone)]
pub struct Options {
    pub dialect: Dialect,
    pub include_inactive: bool,
    pub subset: BTreeSet<String>,
    pub prune_inputs: BTreeSet<String>,
    pub prune_outputs: BTreeSet<String>,
    /// Reserved: overrides the textual rendering of `sysdate`. Not yet
    /// consumed by the expression translator (§6 marks it reserved).
    pub static_sysdate: Option<String>,
}

impl Options {
    pub fn new(dialect: Dialect) -> Self {
        Options {
            dialect,
            include_inactive: false,
            subset: BTreeSet::new(),
            prune_inputs: BTreeSet::new(),
            prune_outputs: BTreeSet::new(),
            static_sysdate: None,
        }
    }
}

/// The result of a compile call (§6). Always returned by value.
#[derive(Debug, Clone)]
pub struct CompileResult {
    pub success: bool,
    pub sql: Vec<String>,
    pub errors: Vec<Error>,
    pub warnings: Vec<Warning>,
    pub manifest: Option<Manifest>,
}

impl CompileResult {
    pub(crate) fn fatal(error: Error) -> Self {
        CompileResult {
            success: false,
            sql: Vec::new(),
            errors: vec![error],
            warnings: Vec::new(),
            manifest: None,
        }
    }
}
