// crates/spot_interop/src/variables/kinds.rs
//! Typed handles to host variables.
//!
//! A handle never caches the value: reads go to the host every time and writes
//! only count once the host accepts them.

use std::ffi::CString;
use std::fmt;

use crate::error::{InteropError, Result};
use crate::host::Host;
use crate::util::round_away_from_zero;
use crate::variables::access::{
    self, to_c_string, VariableAddress, DEFAULT_TEXT_READ_LIMIT, MAX_TEXT_READ_LIMIT,
};
use crate::variables::scope::Scope;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VariableType {
    Bool,
    Text,
    Numeric,
    Integer,
}

/// A value read from or written to a [`Variable`] of any kind.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Bool(bool),
    Text(String),
    Numeric(f64),
    Integer(i64),
}

impl Value {
    pub fn variable_type(&self) -> VariableType {
        match self {
            Value::Bool(_) => VariableType::Bool,
            Value::Text(_) => VariableType::Text,
            Value::Numeric(_) => VariableType::Numeric,
            Value::Integer(_) => VariableType::Integer,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => f.write_str(if *v { "true" } else { "false" }),
            Value::Text(v) => f.write_str(v),
            // Six fixed decimals, the host UI's default numeric rendering.
            Value::Numeric(v) => write!(f, "{v:.6}"),
            Value::Integer(v) => write!(f, "{v}"),
        }
    }
}

/// Identity and policy shared by every variable kind.
#[derive(Clone, Debug)]
pub struct VariableInfo {
    host: Host,
    name: String,
    c_name: CString,
    dialog: Option<CString>,
    scope: Scope,
    read_only: bool,
}

impl VariableInfo {
    fn new(host: Host, name: &str, scope: Scope, read_only: bool) -> Result<Self> {
        Ok(Self {
            host,
            name: name.to_string(),
            c_name: to_c_string("variable name", name)?,
            dialog: None,
            scope,
            read_only,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Owning dialog for embedded variables; `None` for globals.
    pub fn dialog(&self) -> Option<&str> {
        self.dialog.as_deref().and_then(|d| d.to_str().ok())
    }

    pub fn is_global(&self) -> bool {
        self.dialog.is_none()
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    pub fn address(&self) -> VariableAddress<'_> {
        VariableAddress {
            name: &self.c_name,
            dialog: self.dialog.as_deref(),
        }
    }

    fn ensure_writable(&self) -> Result<()> {
        if self.read_only {
            return Err(InteropError::read_only(&self.name));
        }
        Ok(())
    }

    /// Persist through the host's save primitive.
    pub fn save(&self, file_path: &str) -> Result<()> {
        access::save(&self.host, self.address(), file_path)
    }

    /// Reload from a host-written file. Read-only variables refuse.
    pub fn recall(&self, file_path: &str) -> Result<()> {
        self.ensure_writable()?;
        access::recall(&self.host, self.address(), file_path)
    }
}

/// Shared surface of the four concrete kinds.
pub trait TypedVariable: Sized + 'static {
    const TYPE: VariableType;

    fn info(&self) -> &VariableInfo;
    fn info_mut(&mut self) -> &mut VariableInfo;

    /// Borrow the concrete kind out of a [`Variable`], if it is that kind.
    fn from_variable(variable: &Variable) -> Option<&Self>;
    fn into_variable(self) -> Variable;

    fn name(&self) -> &str {
        self.info().name()
    }

    fn scope(&self) -> Scope {
        self.info().scope()
    }

    fn is_read_only(&self) -> bool {
        self.info().is_read_only()
    }

    /// Attach the handle to a variable embedded in `dialog`.
    fn in_dialog(mut self, dialog: &str) -> Result<Self> {
        self.info_mut().dialog = Some(to_c_string("dialog name", dialog)?);
        Ok(self)
    }
}

macro_rules! typed_variable {
    ($kind:ident, $variant:ident) => {
        impl TypedVariable for $kind {
            const TYPE: VariableType = VariableType::$variant;

            fn info(&self) -> &VariableInfo {
                &self.info
            }

            fn info_mut(&mut self) -> &mut VariableInfo {
                &mut self.info
            }

            fn from_variable(variable: &Variable) -> Option<&Self> {
                match variable {
                    Variable::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn into_variable(self) -> Variable {
                Variable::$variant(self)
            }
        }

        impl From<$kind> for Variable {
            fn from(v: $kind) -> Self {
                Variable::$variant(v)
            }
        }
    };
}

// ==================================================================================
// Bool
// ==================================================================================

#[derive(Clone, Debug)]
pub struct BoolVariable {
    info: VariableInfo,
}

impl BoolVariable {
    pub fn new(host: Host, name: &str, scope: Scope, read_only: bool) -> Result<Self> {
        Ok(Self {
            info: VariableInfo::new(host, name, scope, read_only)?,
        })
    }

    pub fn value(&self) -> Result<bool> {
        access::get_bool(&self.info.host, self.info.address())
    }

    pub fn set_value(&self, value: bool) -> Result<()> {
        self.info.ensure_writable()?;
        access::set_bool(&self.info.host, self.info.address(), value)
    }

    pub fn format_value(&self) -> Result<String> {
        Ok(Value::Bool(self.value()?).to_string())
    }
}

typed_variable!(BoolVariable, Bool);

// ==================================================================================
// Text
// ==================================================================================

#[derive(Clone, Debug)]
pub struct TextVariable {
    info: VariableInfo,
    read_limit: usize,
}

impl TextVariable {
    pub fn new(host: Host, name: &str, scope: Scope, read_only: bool) -> Result<Self> {
        Ok(Self {
            info: VariableInfo::new(host, name, scope, read_only)?,
            read_limit: DEFAULT_TEXT_READ_LIMIT,
        })
    }

    /// Change how many bytes [`value`](Self::value) reads at most, up to
    /// [`MAX_TEXT_READ_LIMIT`].
    pub fn with_read_limit(mut self, max_len: usize) -> Self {
        self.read_limit = max_len.min(MAX_TEXT_READ_LIMIT);
        self
    }

    pub fn read_limit(&self) -> usize {
        self.read_limit
    }

    pub fn value(&self) -> Result<String> {
        self.value_bounded(self.read_limit)
    }

    pub fn value_bounded(&self, max_len: usize) -> Result<String> {
        access::get_text(&self.info.host, self.info.address(), max_len)
    }

    pub fn set_value(&self, value: &str) -> Result<()> {
        self.info.ensure_writable()?;
        access::set_text(&self.info.host, self.info.address(), value)
    }

    pub fn format_value(&self) -> Result<String> {
        self.value()
    }
}

typed_variable!(TextVariable, Text);

// ==================================================================================
// Numeric (real)
// ==================================================================================

#[derive(Clone, Debug)]
pub struct NumericVariable {
    info: VariableInfo,
}

impl NumericVariable {
    pub fn new(host: Host, name: &str, scope: Scope, read_only: bool) -> Result<Self> {
        Ok(Self {
            info: VariableInfo::new(host, name, scope, read_only)?,
        })
    }

    pub fn value(&self) -> Result<f64> {
        access::get_numeric(&self.info.host, self.info.address())
    }

    pub fn set_value(&self, value: f64) -> Result<()> {
        self.info.ensure_writable()?;
        access::set_numeric(&self.info.host, self.info.address(), value)
    }

    /// Parse `text` as a real number and commit it.
    pub fn set_from_str(&self, text: &str) -> Result<()> {
        self.info.ensure_writable()?;
        let value = text.trim().parse::<f64>().map_err(|_| InteropError::Parse {
            name: self.info.name.clone(),
            text: text.to_string(),
        })?;
        access::set_numeric(&self.info.host, self.info.address(), value)
    }

    pub fn format_value(&self) -> Result<String> {
        Ok(Value::Numeric(self.value()?).to_string())
    }
}

typed_variable!(NumericVariable, Numeric);

// ==================================================================================
// Integer
// ==================================================================================

/// A numeric host variable holding whole numbers. The host stores a double;
/// real inputs are rounded half away from zero before they are sent.
#[derive(Clone, Debug)]
pub struct IntegerVariable {
    info: VariableInfo,
}

impl IntegerVariable {
    pub fn new(host: Host, name: &str, scope: Scope, read_only: bool) -> Result<Self> {
        Ok(Self {
            info: VariableInfo::new(host, name, scope, read_only)?,
        })
    }

    pub fn value(&self) -> Result<i64> {
        let raw = access::get_numeric(&self.info.host, self.info.address())?;
        Ok(round_away_from_zero(raw) as i64)
    }

    pub fn set_value(&self, value: i64) -> Result<()> {
        self.info.ensure_writable()?;
        access::set_numeric(&self.info.host, self.info.address(), value as f64)
    }

    pub fn set_real(&self, value: f64) -> Result<()> {
        self.info.ensure_writable()?;
        access::set_numeric(&self.info.host, self.info.address(), round_away_from_zero(value))
    }

    /// Parse `text` as an integer in `radix` (2..=36) and commit it.
    pub fn set_from_str(&self, text: &str, radix: u32) -> Result<()> {
        self.info.ensure_writable()?;
        let parse_error = || InteropError::Parse {
            name: self.info.name.clone(),
            text: text.to_string(),
        };
        if !(2..=36).contains(&radix) {
            return Err(parse_error());
        }
        let value = i64::from_str_radix(text.trim(), radix).map_err(|_| parse_error())?;
        access::set_numeric(&self.info.host, self.info.address(), value as f64)
    }

    pub fn format_value(&self) -> Result<String> {
        Ok(Value::Integer(self.value()?).to_string())
    }
}

typed_variable!(IntegerVariable, Integer);

// ==================================================================================
// Any kind
// ==================================================================================

/// A host variable of one of the four kinds.
#[derive(Clone, Debug)]
pub enum Variable {
    Bool(BoolVariable),
    Text(TextVariable),
    Numeric(NumericVariable),
    Integer(IntegerVariable),
}

impl Variable {
    /// Build a handle of the given kind.
    pub fn new(
        host: Host,
        name: &str,
        kind: VariableType,
        scope: Scope,
        read_only: bool,
    ) -> Result<Self> {
        Ok(match kind {
            VariableType::Bool => BoolVariable::new(host, name, scope, read_only)?.into(),
            VariableType::Text => TextVariable::new(host, name, scope, read_only)?.into(),
            VariableType::Numeric => NumericVariable::new(host, name, scope, read_only)?.into(),
            VariableType::Integer => IntegerVariable::new(host, name, scope, read_only)?.into(),
        })
    }

    pub fn info(&self) -> &VariableInfo {
        match self {
            Variable::Bool(v) => &v.info,
            Variable::Text(v) => &v.info,
            Variable::Numeric(v) => &v.info,
            Variable::Integer(v) => &v.info,
        }
    }

    pub fn name(&self) -> &str {
        self.info().name()
    }

    pub fn variable_type(&self) -> VariableType {
        match self {
            Variable::Bool(_) => VariableType::Bool,
            Variable::Text(_) => VariableType::Text,
            Variable::Numeric(_) => VariableType::Numeric,
            Variable::Integer(_) => VariableType::Integer,
        }
    }

    pub fn scope(&self) -> Scope {
        self.info().scope()
    }

    pub fn is_read_only(&self) -> bool {
        self.info().is_read_only()
    }

    pub fn downcast<K: TypedVariable>(&self) -> Option<&K> {
        K::from_variable(self)
    }

    pub fn value(&self) -> Result<Value> {
        Ok(match self {
            Variable::Bool(v) => Value::Bool(v.value()?),
            Variable::Text(v) => Value::Text(v.value()?),
            Variable::Numeric(v) => Value::Numeric(v.value()?),
            Variable::Integer(v) => Value::Integer(v.value()?),
        })
    }

    /// Commit `value`. Numeric and integer kinds accept either numeric value
    /// (integers round reals); any other mismatch is an invalid operation.
    pub fn set_value(&self, value: Value) -> Result<()> {
        self.info().ensure_writable()?;
        match (self, value) {
            (Variable::Bool(v), Value::Bool(x)) => v.set_value(x),
            (Variable::Text(v), Value::Text(x)) => v.set_value(&x),
            (Variable::Numeric(v), Value::Numeric(x)) => v.set_value(x),
            (Variable::Numeric(v), Value::Integer(x)) => v.set_value(x as f64),
            (Variable::Integer(v), Value::Integer(x)) => v.set_value(x),
            (Variable::Integer(v), Value::Numeric(x)) => v.set_real(x),
            (variable, value) => Err(InteropError::InvalidOperation(format!(
                "cannot store a {:?} value in {:?} variable ({})",
                value.variable_type(),
                variable.variable_type(),
                variable.name()
            ))),
        }
    }

    pub fn format_value(&self) -> Result<String> {
        Ok(self.value()?.to_string())
    }

    pub fn save(&self, file_path: &str) -> Result<()> {
        self.info().save(file_path)
    }

    pub fn recall(&self, file_path: &str) -> Result<()> {
        self.info().recall(file_path)
    }
}
