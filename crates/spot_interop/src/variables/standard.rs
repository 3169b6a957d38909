// crates/spot_interop/src/variables/standard.rs
//! Variables every host installation is expected to publish.

use crate::host::Host;
use crate::variables::access::DEFAULT_TEXT_READ_LIMIT;
use crate::variables::kinds::{TextVariable, Variable, VariableType};
use crate::variables::registry::VariableRegistry;
use crate::variables::scope::Scope;

/// One row of the standard variable table.
#[derive(Clone, Copy, Debug)]
pub struct StandardVariable {
    pub name: &'static str,
    pub kind: VariableType,
    pub scope: Scope,
    pub read_only: bool,
}

const fn entry(
    name: &'static str,
    kind: VariableType,
    scope: Scope,
    read_only: bool,
) -> StandardVariable {
    StandardVariable {
        name,
        kind,
        scope,
        read_only,
    }
}

pub const STANDARD_VARIABLES: &[StandardVariable] = &[
    entry("LiveImgRunning", VariableType::Bool, Scope::APPLICATION_STATE, true),
    entry("LiveImgCount", VariableType::Integer, Scope::APPLICATION_STATE, true),
    entry("PrefsFilePath", VariableType::Text, Scope::FILE_PATH, true),
    entry("_argT1", VariableType::Text, Scope::UNKNOWN, false),
    entry("_argT2", VariableType::Text, Scope::UNKNOWN, false),
    entry("_argT3", VariableType::Text, Scope::UNKNOWN, false),
    entry("TextVar1", VariableType::Text, Scope::USER_SETTING, false),
    entry("TextVar2", VariableType::Text, Scope::USER_SETTING, false),
    entry("NumVar1", VariableType::Numeric, Scope::USER_SETTING, false),
];

impl VariableRegistry {
    /// Registry of the [`STANDARD_VARIABLES`] the host actually knows.
    pub fn standard(host: Host) -> Self {
        Self::standard_with_read_limit(host, DEFAULT_TEXT_READ_LIMIT)
    }

    /// Like [`VariableRegistry::standard`], with text variables reading at most
    /// `text_read_limit` bytes.
    ///
    /// Each entry is checked with one read; entries the host rejects are left out.
    pub fn standard_with_read_limit(host: Host, text_read_limit: usize) -> Self {
        let mut registry = Self::new();
        for row in STANDARD_VARIABLES {
            match build(host, row, text_read_limit) {
                Ok(variable) => {
                    registry.register(variable);
                }
                Err(err) => {
                    tracing::warn!(variable = row.name, error = %err, "skipping standard variable");
                }
            }
        }
        tracing::debug!(count = registry.len(), "standard variables loaded");
        registry
    }
}

fn build(host: Host, row: &StandardVariable, text_read_limit: usize) -> crate::Result<Variable> {
    let variable: Variable = match row.kind {
        VariableType::Text => {
            TextVariable::new(host, row.name, row.scope, row.read_only)?
                .with_read_limit(text_read_limit)
                .into()
        }
        kind => Variable::new(host, row.name, kind, row.scope, row.read_only)?,
    };
    variable.value()?;
    Ok(variable)
}
