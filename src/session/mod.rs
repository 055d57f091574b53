//! Per-session parameter store.
//!
//! Holds the values the user assigned with `set`, checked against the current
//! plugin's parameter schema, plus the read-only environment defaults used to
//! fill missing mandatory parameters when a run is validated.

use tracing::debug;

use crate::error::{CreakError, Result, ValidationError};
use crate::plugins::{ParamSchema, Params};

/// Session parameters and the environment-derived fallbacks.
#[derive(Debug, Clone, Default)]
pub struct ParamStore {
    values: Params,
    base: Params,
}

impl ParamStore {
    /// Create an empty store over the given base defaults.
    pub fn new(base: Params) -> Self {
        Self {
            values: Params::new(),
            base,
        }
    }

    /// Assign `value` to `name` if the schema declares it.
    ///
    /// The name is lower-cased. Without a schema (no plugin loaded) every
    /// name is invalid. Returns the normalized name.
    pub fn set(&mut self, schema: Option<&ParamSchema>, name: &str, value: &str) -> Result<String> {
        let name = Self::checked_name(schema, name)?;
        debug!(param = %name, "Setting parameter");
        self.values.insert(name.clone(), value.to_string());
        Ok(name)
    }

    /// Clear `name` so the base default, if any, applies again.
    pub fn unset(&mut self, schema: Option<&ParamSchema>, name: &str) -> Result<String> {
        let name = Self::checked_name(schema, name)?;
        self.values.remove(&name);
        Ok(name)
    }

    fn checked_name(schema: Option<&ParamSchema>, name: &str) -> Result<String> {
        let name = name.to_lowercase();
        match schema {
            Some(schema) if schema.contains_key(&name) => Ok(name),
            _ => Err(CreakError::InvalidParameter(name)),
        }
    }

    /// Make sure every mandatory parameter has a value.
    ///
    /// Missing mandatory values are copied from the base defaults when
    /// available; an explicit session value is never overwritten. Stops at
    /// the first mandatory parameter that has no value anywhere.
    pub fn validate(&mut self, schema: &ParamSchema) -> std::result::Result<(), ValidationError> {
        for (name, mandatory) in schema {
            if !mandatory || self.values.contains_key(name) {
                continue;
            }
            match self.base.get(name) {
                Some(default) => {
                    debug!(param = %name, "Filling parameter from environment default");
                    self.values.insert(name.clone(), default.clone());
                }
                None => return Err(ValidationError::MissingMandatoryParameter(name.clone())),
            }
        }
        Ok(())
    }

    /// Drop every session value. Base defaults are untouched.
    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Copy of the current values, as handed to a plugin run.
    pub fn snapshot(&self) -> Params {
        self.values.clone()
    }

    pub fn values(&self) -> &Params {
        &self.values
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Environment-derived defaults.
    pub fn base(&self) -> &Params {
        &self.base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(entries: &[(&str, bool)]) -> ParamSchema {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn base(entries: &[(&str, &str)]) -> Params {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_set_known_param_case_insensitive() {
        let schema = schema(&[("target", true)]);
        let mut store = ParamStore::default();
        let name = store.set(Some(&schema), "TARGET", "10.0.0.1").unwrap();
        assert_eq!(name, "target");
        assert_eq!(store.get("target"), Some("10.0.0.1"));
    }

    #[test]
    fn test_set_unknown_param_rejected() {
        let schema = schema(&[("target", true)]);
        let mut store = ParamStore::default();
        let err = store.set(Some(&schema), "port", "80").unwrap_err();
        assert!(matches!(err, CreakError::InvalidParameter(ref n) if n == "port"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_set_without_plugin_rejected() {
        let mut store = ParamStore::default();
        assert!(store.set(None, "target", "x").is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn test_unset_removes_value() {
        let schema = schema(&[("target", true)]);
        let mut store = ParamStore::default();
        store.set(Some(&schema), "target", "x").unwrap();
        store.unset(Some(&schema), "Target").unwrap();
        assert!(store.get("target").is_none());
        assert!(store.unset(Some(&schema), "bogus").is_err());
    }

    #[test]
    fn test_validate_missing_mandatory() {
        let schema = schema(&[("target", true), ("timeout", false)]);
        let mut store = ParamStore::default();
        assert_eq!(
            store.validate(&schema),
            Err(ValidationError::MissingMandatoryParameter("target".into()))
        );
    }

    #[test]
    fn test_validate_fills_from_base() {
        let schema = schema(&[("dev", true), ("gateway", false)]);
        let mut store = ParamStore::new(base(&[("dev", "eth0"), ("gateway", "10.0.0.254")]));
        store.validate(&schema).unwrap();
        assert_eq!(store.get("dev"), Some("eth0"));
        // Optional parameters are never filled from defaults.
        assert_eq!(store.get("gateway"), None);
    }

    #[test]
    fn test_validate_session_value_beats_base() {
        let schema = schema(&[("dev", true)]);
        let mut store = ParamStore::new(base(&[("dev", "eth0")]));
        store.set(Some(&schema), "dev", "wlan0").unwrap();
        store.validate(&schema).unwrap();
        assert_eq!(store.get("dev"), Some("wlan0"));
        assert_eq!(store.base().get("dev").map(String::as_str), Some("eth0"));
    }

    #[test]
    fn test_unset_restores_base_fallback() {
        let schema = schema(&[("dev", true)]);
        let mut store = ParamStore::new(base(&[("dev", "eth0")]));
        store.set(Some(&schema), "dev", "wlan0").unwrap();
        store.unset(Some(&schema), "dev").unwrap();
        store.validate(&schema).unwrap();
        assert_eq!(store.get("dev"), Some("eth0"));
    }

    #[test]
    fn test_optional_params_pass_through() {
        let schema = schema(&[("target", true), ("timeout", false)]);
        let mut store = ParamStore::default();
        store.set(Some(&schema), "target", "a").unwrap();
        store.set(Some(&schema), "timeout", "5").unwrap();
        store.validate(&schema).unwrap();
        assert_eq!(store.snapshot().len(), 2);
    }

    #[test]
    fn test_clear_keeps_base() {
        let schema = schema(&[("target", true)]);
        let mut store = ParamStore::new(base(&[("dev", "eth0")]));
        store.set(Some(&schema), "target", "a").unwrap();
        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.base().len(), 1);
    }
}
