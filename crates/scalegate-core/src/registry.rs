//! Verified-type registry.
//!
//! A peripheral map from a stable type identifier to the capability set
//! that type has been verified for (associativity, commutativity,
//! idempotence, whatever the verifying test suite established). The
//! registry carries no hot-path cost: it is consulted at system
//! boundaries, not per request.
//!
//! Both forms are offered: an explicitly constructed [`Registry`] is
//! the first-class API, and [`global`] is a process-wide convenience
//! over the identical operations.

use std::any::type_name;
use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Record of a type that passed capability verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedType {
    /// Fully qualified type name, as produced by `std::any::type_name`.
    pub type_name: String,
    /// Capabilities the verifying suite established.
    pub capabilities: Vec<String>,
    /// Where the verification lives (test module path, for humans).
    pub tested_in: String,
}

impl VerifiedType {
    /// Build a record for `T`, keyed by its monomorphized type name.
    pub fn of<T>(capabilities: &[&str], tested_in: &str) -> Self {
        Self {
            type_name: type_name::<T>().to_string(),
            capabilities: capabilities.iter().map(|c| c.to_string()).collect(),
            tested_in: tested_in.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    #[error("type {0} is not in the verified registry")]
    NotVerified(String),

    #[error("type {type_name} missing required capability {missing} (has: {present:?})")]
    MissingCapability {
        type_name: String,
        missing: String,
        present: Vec<String>,
    },
}

/// Registry of verified types.
#[derive(Debug, Default)]
pub struct Registry {
    verified: HashMap<String, VerifiedType>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a verified type record.
    pub fn register(&mut self, record: VerifiedType) {
        self.verified.insert(record.type_name.clone(), record);
    }

    /// Look up the record for `T`, if any.
    pub fn get<T>(&self) -> Option<&VerifiedType> {
        self.verified.get(type_name::<T>())
    }

    /// True if `T` has any verification record.
    pub fn is_verified<T>(&self) -> bool {
        self.verified.contains_key(type_name::<T>())
    }

    /// Check that `T` is verified and carries every required capability.
    pub fn check<T>(&self, required: &[&str]) -> Result<(), RegistryError> {
        let name = type_name::<T>();
        let record = self
            .verified
            .get(name)
            .ok_or_else(|| RegistryError::NotVerified(name.to_string()))?;

        for cap in required {
            if !record.capabilities.iter().any(|c| c == cap) {
                return Err(RegistryError::MissingCapability {
                    type_name: name.to_string(),
                    missing: cap.to_string(),
                    present: record.capabilities.clone(),
                });
            }
        }
        Ok(())
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.verified.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verified.is_empty()
    }
}

static GLOBAL: OnceLock<RwLock<Registry>> = OnceLock::new();

fn global_registry() -> &'static RwLock<Registry> {
    GLOBAL.get_or_init(|| RwLock::new(Registry::new()))
}

/// Process-wide convenience API over the same registry operations.
pub mod global {
    use super::{RegistryError, VerifiedType, global_registry};

    /// Register into the process-wide registry.
    pub fn register(record: VerifiedType) {
        let mut reg = global_registry().write().expect("registry lock poisoned");
        reg.register(record);
    }

    /// Check `T` against the process-wide registry.
    pub fn check<T>(required: &[&str]) -> Result<(), RegistryError> {
        let reg = global_registry().read().expect("registry lock poisoned");
        reg.check::<T>(required)
    }

    /// True if `T` is verified in the process-wide registry.
    pub fn is_verified<T>() -> bool {
        let reg = global_registry().read().expect("registry lock poisoned");
        reg.is_verified::<T>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FoldCounter;
    struct UnknownThing;

    #[test]
    fn register_and_check() {
        let mut reg = Registry::new();
        reg.register(VerifiedType::of::<FoldCounter>(
            &["associative", "commutative"],
            "scalegate_core::registry::tests",
        ));

        assert!(reg.is_verified::<FoldCounter>());
        assert!(reg.check::<FoldCounter>(&["associative"]).is_ok());
        assert!(
            reg.check::<FoldCounter>(&["associative", "commutative"])
                .is_ok()
        );
    }

    #[test]
    fn unverified_type_is_rejected() {
        let reg = Registry::new();
        let err = reg.check::<UnknownThing>(&["associative"]).unwrap_err();
        assert!(matches!(err, RegistryError::NotVerified(_)));
    }

    #[test]
    fn missing_capability_names_the_gap() {
        let mut reg = Registry::new();
        reg.register(VerifiedType::of::<FoldCounter>(&["associative"], "tests"));

        let err = reg.check::<FoldCounter>(&["idempotent"]).unwrap_err();
        match err {
            RegistryError::MissingCapability { missing, present, .. } => {
                assert_eq!(missing, "idempotent");
                assert_eq!(present, vec!["associative".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn reregistration_replaces() {
        let mut reg = Registry::new();
        reg.register(VerifiedType::of::<FoldCounter>(&["associative"], "tests"));
        reg.register(VerifiedType::of::<FoldCounter>(&["idempotent"], "tests"));

        assert_eq!(reg.len(), 1);
        assert!(reg.check::<FoldCounter>(&["idempotent"]).is_ok());
        assert!(reg.check::<FoldCounter>(&["associative"]).is_err());
    }

    #[test]
    fn global_convenience_mirrors_registry() {
        struct GlobalOnly;
        global::register(VerifiedType::of::<GlobalOnly>(&["associative"], "tests"));
        assert!(global::is_verified::<GlobalOnly>());
        assert!(global::check::<GlobalOnly>(&["associative"]).is_ok());
        assert!(global::check::<GlobalOnly>(&["commutative"]).is_err());
    }
}
