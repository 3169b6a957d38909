// crates/spot_interop/src/variables/registry.rs

use std::collections::BTreeMap;

use crate::error::{BatchFailure, InteropError, Result};
use crate::variables::kinds::{TypedVariable, Value, Variable};
use crate::variables::scope::Scope;

/// Named host variables, one handle per name.
///
/// Iteration (and therefore batch save/restore order) is by name.
#[derive(Clone, Debug, Default)]
pub struct VariableRegistry {
    variables: BTreeMap<String, Variable>,
}

impl VariableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `variable`, replacing any entry with the same name. Returns the
    /// replaced entry.
    pub fn register(&mut self, variable: impl Into<Variable>) -> Option<Variable> {
        let variable = variable.into();
        self.variables.insert(variable.name().to_string(), variable)
    }

    pub fn unregister(&mut self, name: &str) -> Option<Variable> {
        self.variables.remove(name)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.variables.values()
    }

    pub fn lookup(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    /// Look up `name` as a specific kind. Missing and wrong-kind both give `None`.
    pub fn lookup_as<K: TypedVariable>(&self, name: &str) -> Option<&K> {
        self.lookup(name).and_then(K::from_variable)
    }

    pub fn all_of_type<K: TypedVariable>(&self) -> impl Iterator<Item = &K> {
        self.variables.values().filter_map(K::from_variable)
    }

    /// `exact`: scope equals `mask`. Otherwise: scope shares any bit with `mask`.
    pub fn all_matching_scope(&self, mask: Scope, exact: bool) -> Vec<&Variable> {
        self.filter(|v| v.scope().matches(mask, exact))
    }

    pub fn all_matching_scope_as<K: TypedVariable>(&self, mask: Scope, exact: bool) -> Vec<&K> {
        self.all_of_type::<K>()
            .filter(|v| v.scope().matches(mask, exact))
            .collect()
    }

    pub fn all_mutable(&self) -> Vec<&Variable> {
        self.filter(|v| !v.is_read_only())
    }

    pub fn all_immutable(&self) -> Vec<&Variable> {
        self.filter(|v| v.is_read_only())
    }

    fn filter(&self, pred: impl Fn(&Variable) -> bool) -> Vec<&Variable> {
        self.variables.values().filter(|v| pred(v)).collect()
    }

    /// Read the current host value of a registered variable.
    pub fn value_of(&self, name: &str) -> Result<Value> {
        self.require(name)?.value()
    }

    /// Write a registered variable through the host.
    pub fn set_value(&self, name: &str, value: Value) -> Result<()> {
        self.require(name)?.set_value(value)
    }

    fn require(&self, name: &str) -> Result<&Variable> {
        self.lookup(name)
            .ok_or_else(|| InteropError::NotFound(name.to_string()))
    }

    /// Save every registered variable to `file_path`.
    ///
    /// Every entry is attempted even if earlier ones fail; failures come back
    /// together as [`InteropError::Batch`].
    pub fn save_all(&self, file_path: &str) -> Result<()> {
        let targets: Vec<&Variable> = self.variables.values().collect();
        run_batch("save", &targets, |v| v.save(file_path))
    }

    /// Restore every mutable variable from `file_path`. Read-only variables are
    /// never restored.
    pub fn restore_all(&self, file_path: &str) -> Result<()> {
        run_batch("restore", &self.all_mutable(), |v| v.recall(file_path))
    }
}

fn run_batch(
    operation: &'static str,
    targets: &[&Variable],
    mut op: impl FnMut(&Variable) -> Result<()>,
) -> Result<()> {
    let failures: Vec<BatchFailure> = targets
        .iter()
        .filter_map(|variable| {
            op(variable).err().map(|error| BatchFailure {
                name: variable.name().to_string(),
                error,
            })
        })
        .collect();

    if failures.is_empty() {
        tracing::debug!(count = targets.len(), "{operation} completed for all variables");
        return Ok(());
    }
    tracing::warn!(failed = failures.len(), attempted = targets.len(), "{operation} incomplete");
    Err(InteropError::Batch {
        operation,
        attempted: targets.len(),
        failures,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::Host;
    use crate::test_support::host_for;
    use crate::variables::kinds::{
        BoolVariable, IntegerVariable, NumericVariable, TextVariable, VariableType,
    };
    use spot_shared::host_action;
    use spot_testhost::{MockHost, StoredValue};

    fn camera_registry(host: Host) -> VariableRegistry {
        let mut registry = VariableRegistry::new();
        let gain_scope = Scope::CAMERA_SETTING | Scope::USER_SETTING;
        registry.register(
            NumericVariable::new(host, "Exposure", Scope::CAMERA_SETTING, false).unwrap(),
        );
        registry.register(NumericVariable::new(host, "Gain", gain_scope, false).unwrap());
        registry.register(TextVariable::new(host, "Operator", Scope::USER_SETTING, false).unwrap());
        registry.register(
            BoolVariable::new(host, "LiveImgRunning", Scope::APPLICATION_STATE, true).unwrap(),
        );
        registry
    }

    #[test]
    fn missing_lookup_is_empty() {
        let mock = MockHost::new();
        let registry = camera_registry(host_for(&mock));
        assert!(registry.lookup("missing").is_none());
        assert!(registry.lookup_as::<BoolVariable>("missing").is_none());
        assert!(matches!(registry.value_of("missing"), Err(InteropError::NotFound(_))));
    }

    #[test]
    fn typed_lookup_rejects_wrong_kind() {
        let mock = MockHost::new();
        let registry = camera_registry(host_for(&mock));
        assert!(registry.lookup_as::<NumericVariable>("Exposure").is_some());
        assert!(registry.lookup_as::<IntegerVariable>("Exposure").is_none());
        assert!(registry.lookup_as::<TextVariable>("Exposure").is_none());
    }

    #[test]
    fn all_of_type_yields_only_that_kind() {
        let mock = MockHost::new();
        let registry = camera_registry(host_for(&mock));

        let numeric: Vec<&str> = registry
            .all_of_type::<NumericVariable>()
            .map(|v| v.name())
            .collect();
        assert_eq!(numeric, vec!["Exposure", "Gain"]);
        assert_eq!(registry.all_of_type::<BoolVariable>().count(), 1);
        assert_eq!(registry.all_of_type::<IntegerVariable>().count(), 0);
    }

    #[test]
    fn registering_same_name_replaces() {
        let mock = MockHost::new();
        let host = host_for(&mock);
        let mut registry = VariableRegistry::new();

        assert!(registry
            .register(TextVariable::new(host, "Mode", Scope::UNKNOWN, false).unwrap())
            .is_none());
        let replaced =
            registry.register(IntegerVariable::new(host, "Mode", Scope::REPORTING, true).unwrap());

        assert_eq!(replaced.map(|v| v.variable_type()), Some(VariableType::Text));
        assert_eq!(registry.len(), 1);
        let current = registry.lookup("Mode").unwrap();
        assert_eq!(current.variable_type(), VariableType::Integer);
        assert_eq!(current.scope(), Scope::REPORTING);
    }

    #[test]
    fn scope_filters_distinguish_exact_from_overlap() {
        let mock = MockHost::new();
        let registry = camera_registry(host_for(&mock));

        let exact: Vec<&str> = registry
            .all_matching_scope(Scope::CAMERA_SETTING, true)
            .into_iter()
            .map(Variable::name)
            .collect();
        assert_eq!(exact, vec!["Exposure"]);

        let any: Vec<&str> = registry
            .all_matching_scope(Scope::CAMERA_SETTING, false)
            .into_iter()
            .map(Variable::name)
            .collect();
        assert_eq!(any, vec!["Exposure", "Gain"]);

        let text_user = registry.all_matching_scope_as::<TextVariable>(Scope::USER_SETTING, false);
        assert_eq!(text_user.len(), 1);
        assert_eq!(text_user[0].name(), "Operator");
    }

    #[test]
    fn mutability_partitions_the_registry() {
        let mock = MockHost::new();
        let registry = camera_registry(host_for(&mock));
        assert_eq!(registry.all_mutable().len(), 3);
        let immutable = registry.all_immutable();
        assert_eq!(immutable.len(), 1);
        assert_eq!(immutable[0].name(), "LiveImgRunning");
    }

    #[test]
    fn save_all_attempts_every_entry_and_aggregates_failures() {
        let mock = MockHost::new();
        for (name, value) in [
            ("Exposure", StoredValue::Numeric(10.0)),
            ("Gain", StoredValue::Numeric(1.5)),
            ("Operator", StoredValue::Text("kim".into())),
            ("LiveImgRunning", StoredValue::Bool(false)),
        ] {
            mock.set_variable(name, value);
        }
        mock.reject_variable("Gain");
        let registry = camera_registry(host_for(&mock));

        let err = registry.save_all("C:/backup").unwrap_err();
        match err {
            InteropError::Batch { attempted, failures, .. } => {
                assert_eq!(attempted, 4);
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].name, "Gain");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(mock.calls(host_action::SAVE_VARIABLE), 4);
        assert!(mock.saved_value("C:/backup", "Operator").is_some());
        assert!(mock.saved_value("C:/backup", "LiveImgRunning").is_some());
    }

    #[test]
    fn restore_all_only_touches_mutable_variables() {
        let mock = MockHost::new();
        mock.set_variable("Exposure", StoredValue::Numeric(10.0));
        mock.set_variable("Gain", StoredValue::Numeric(1.5));
        mock.set_variable("Operator", StoredValue::Text("kim".into()));
        mock.set_variable("LiveImgRunning", StoredValue::Bool(false));
        let registry = camera_registry(host_for(&mock));
        registry.save_all("C:/backup").unwrap();

        registry.set_value("Exposure", Value::Numeric(20.0)).unwrap();
        registry.set_value("Operator", Value::Text("lee".into())).unwrap();
        mock.set_variable("LiveImgRunning", StoredValue::Bool(true));

        registry.restore_all("C:/backup").unwrap();
        assert_eq!(mock.calls(host_action::RECALL_VARIABLE), 3);
        assert_eq!(registry.value_of("Exposure").unwrap(), Value::Numeric(10.0));
        assert_eq!(registry.value_of("Operator").unwrap(), Value::Text("kim".into()));
        assert_eq!(registry.value_of("LiveImgRunning").unwrap(), Value::Bool(true));
    }

    #[test]
    fn restore_all_continues_past_missing_entries() {
        let mock = MockHost::new();
        mock.set_variable("Exposure", StoredValue::Numeric(10.0));
        let registry = camera_registry(host_for(&mock));
        mock.save_file_entry("C:/backup", "Operator", StoredValue::Text("kim".into()));

        let err = registry.restore_all("C:/backup").unwrap_err();
        assert!(matches!(
            err,
            InteropError::Batch { attempted: 3, ref failures, .. } if failures.len() == 2
        ));
        assert_eq!(mock.variable("Operator"), Some(StoredValue::Text("kim".into())));
    }
}
