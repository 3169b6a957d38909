// crates/spot_interop/src/variables/mod.rs
//! Host variables: raw accessors, typed handles, and the named registry.

pub mod access;
pub mod kinds;
pub mod registry;
pub mod scope;
pub mod standard;

pub use access::{VariableAddress, DEFAULT_TEXT_READ_LIMIT, MAX_TEXT_READ_LIMIT};
pub use kinds::{
    BoolVariable, IntegerVariable, NumericVariable, TextVariable, TypedVariable, Value, Variable,
    VariableInfo, VariableType,
};
pub use registry::VariableRegistry;
pub use scope::Scope;
pub use standard::{StandardVariable, STANDARD_VARIABLES};
