//! Validator Registry Implementation
//!
//! 管理校验器种类（种类名 -> 工厂），支持在外部注册新的种类

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use once_cell::sync::Lazy;

use crate::command::errors::CommandError;
use crate::command::validator::{ArgOptions, ArgValidator};
use crate::value::TypeTag;

/// Builds a validator for `(arg_name, options)`
pub type ValidatorFactory =
    Arc<dyn Fn(&str, ArgOptions) -> Result<ArgValidator, CommandError> + Send + Sync>;

static SHARED_REGISTRY: Lazy<Arc<ValidatorRegistry>> =
    Lazy::new(|| Arc::new(ValidatorRegistry::with_builtins()));

/// Built-in kinds that compare against a fixed tag
const BUILTIN_KINDS: [(&[&str], TypeTag); 7] = [
    (&["int", "integer"], TypeTag::Int),
    (&["bool", "boolean"], TypeTag::Bool),
    (&["string", "str"], TypeTag::Str),
    (&["float"], TypeTag::Float),
    (&["dict", "map"], TypeTag::Dict),
    (&["set"], TypeTag::Set),
    (&["list", "array"], TypeTag::List),
];

const OBJECT_KINDS: [&str; 2] = ["object", "type"];

/// Open set of validator kinds, keyed by kind name.
///
/// Several names may share one factory (aliases). A kind name is
/// registered once and never replaced.
pub struct ValidatorRegistry {
    kinds: RwLock<HashMap<String, ValidatorFactory>>,
}

impl ValidatorRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            kinds: RwLock::new(HashMap::new()),
        }
    }

    /// Create a registry holding the built-in kinds
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        {
            let mut kinds = registry.write_kinds();
            for (names, tag) in BUILTIN_KINDS {
                let factory = tagged_factory(tag);
                for name in names {
                    kinds.insert(name.to_string(), Arc::clone(&factory));
                }
            }

            let object_factory: ValidatorFactory = Arc::new(|name: &str, options: ArgOptions| {
                ArgValidator::object(name, options)
            });
            for name in OBJECT_KINDS {
                kinds.insert(name.to_string(), Arc::clone(&object_factory));
            }
        }
        registry
    }

    /// Process-wide registry used by command types that don't pick one
    pub fn shared() -> Arc<Self> {
        Arc::clone(&SHARED_REGISTRY)
    }

    /// Register a kind under one or more names.
    ///
    /// Either every name is added or none is.
    pub fn register<I, S, F>(&self, kind_names: I, factory: F) -> Result<(), CommandError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&str, ArgOptions) -> Result<ArgValidator, CommandError> + Send + Sync + 'static,
    {
        let names: Vec<String> = kind_names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(CommandError::InvalidKindName);
        }

        let mut kinds = self.write_kinds();
        {
            let mut seen = HashSet::new();
            for name in &names {
                if name.trim().is_empty() {
                    return Err(CommandError::InvalidKindName);
                }
                if kinds.contains_key(name) || !seen.insert(name.as_str()) {
                    return Err(CommandError::KindAlreadyRegistered(name.clone()));
                }
            }
        }

        let factory: ValidatorFactory = Arc::new(factory);
        log::debug!("registering validator kind {:?}", names);
        for name in names {
            kinds.insert(name, Arc::clone(&factory));
        }

        Ok(())
    }

    /// Register a kind whose validators compare against a fixed tag
    pub fn register_tag<I, S>(&self, kind_names: I, tag: TypeTag) -> Result<(), CommandError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let factory = tagged_factory(tag);
        self.register(kind_names, move |name: &str, options: ArgOptions| factory(name, options))
    }

    pub fn has_kind(&self, kind: &str) -> bool {
        self.read_kinds().contains_key(kind)
    }

    /// All kind names, sorted
    pub fn kind_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read_kinds().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn kind_count(&self) -> usize {
        self.read_kinds().len()
    }

    pub fn factory(&self, kind: &str) -> Option<ValidatorFactory> {
        self.read_kinds().get(kind).cloned()
    }

    /// Build a validator of `kind` for `arg_name`
    pub fn create(
        &self,
        kind: &str,
        arg_name: &str,
        options: ArgOptions,
    ) -> Result<ArgValidator, CommandError> {
        // 先释放读锁，工厂内部可能再次访问注册表
        let factory = self
            .factory(kind)
            .ok_or_else(|| CommandError::UnknownKind(kind.to_string()))?;
        factory(arg_name, options)
    }

    fn read_kinds(&self) -> RwLockReadGuard<'_, HashMap<String, ValidatorFactory>> {
        self.kinds.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_kinds(&self) -> RwLockWriteGuard<'_, HashMap<String, ValidatorFactory>> {
        self.kinds.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn tagged_factory(tag: TypeTag) -> ValidatorFactory {
    Arc::new(move |name: &str, options: ArgOptions| {
        ArgValidator::new(name, tag.clone(), options)
    })
}

impl Default for ValidatorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ValidatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatorRegistry")
            .field("kinds", &self.kind_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{ArgMap, ArgValue};

    #[test]
    fn test_builtin_kinds_and_aliases() {
        let registry = ValidatorRegistry::with_builtins();
        for kind in [
            "int", "integer", "bool", "boolean", "string", "str", "float", "dict", "map", "set",
            "list", "array", "object", "type",
        ] {
            assert!(registry.has_kind(kind), "missing kind {}", kind);
        }
        assert_eq!(registry.kind_count(), 14);
        assert!(!registry.has_kind("uuid"));
    }

    #[test]
    fn test_aliases_build_equivalent_validators() {
        let registry = ValidatorRegistry::with_builtins();
        let a = registry.create("int", "n", ArgOptions::new()).unwrap();
        let b = registry.create("integer", "n", ArgOptions::new()).unwrap();
        assert_eq!(a.expected(), b.expected());
        assert_eq!(a.type_name(), "int");
    }

    #[test]
    fn test_new_registry_is_empty() {
        let registry = ValidatorRegistry::new();
        assert_eq!(registry.kind_count(), 0);
        let err = registry.create("int", "n", ArgOptions::new()).unwrap_err();
        assert!(matches!(err, CommandError::UnknownKind(kind) if kind == "int"));
    }

    #[test]
    fn test_register_custom_kind() {
        let registry = ValidatorRegistry::with_builtins();
        registry
            .register_tag(["duration", "timespan"], TypeTag::object("Duration"))
            .unwrap();

        let validator = registry
            .create("timespan", "timeout", ArgOptions::new())
            .unwrap();
        let args = ArgMap::new().with("timeout", ArgValue::object(std::time::Duration::from_secs(3)));
        assert!(validator.validate(&args).is_ok());
    }

    #[test]
    fn test_register_with_custom_factory() {
        let registry = ValidatorRegistry::new();
        registry
            .register(["port"], |name: &str, options: ArgOptions| {
                ArgValidator::new(name, TypeTag::Int, options.not_none())
            })
            .unwrap();

        let validator = registry.create("port", "listen", ArgOptions::new()).unwrap();
        assert!(!validator.allows_none());
    }

    #[test]
    fn test_duplicate_kind_rejected_without_partial_insert() {
        let registry = ValidatorRegistry::with_builtins();
        let before = registry.kind_count();

        let err = registry.register_tag(["fresh", "int"], TypeTag::Int).unwrap_err();
        assert!(matches!(err, CommandError::KindAlreadyRegistered(name) if name == "int"));
        assert!(!registry.has_kind("fresh"));
        assert_eq!(registry.kind_count(), before);

        let err = registry.register_tag(["twice", "twice"], TypeTag::Int).unwrap_err();
        assert!(matches!(err, CommandError::KindAlreadyRegistered(_)));
    }

    #[test]
    fn test_empty_kind_name_rejected() {
        let registry = ValidatorRegistry::new();
        assert!(matches!(
            registry.register_tag(["  "], TypeTag::Int),
            Err(CommandError::InvalidKindName)
        ));
        assert!(matches!(
            registry.register_tag(Vec::<String>::new(), TypeTag::Int),
            Err(CommandError::InvalidKindName)
        ));
    }

    #[test]
    fn test_kind_names_sorted() {
        let registry = ValidatorRegistry::new();
        registry.register_tag(["zeta", "alpha"], TypeTag::Str).unwrap();
        assert_eq!(registry.kind_names(), vec!["alpha".to_string(), "zeta".to_string()]);
    }

    #[test]
    fn test_shared_registry_has_builtins() {
        let shared = ValidatorRegistry::shared();
        assert!(shared.has_kind("object"));
        assert!(Arc::ptr_eq(&shared, &ValidatorRegistry::shared()));
    }
}
