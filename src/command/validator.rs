//! Argument Validator Implementation
//!
//! 校验单个命名参数的存在性、类型与默认值

use serde::{Deserialize, Serialize};

use crate::command::errors::{ArgError, CommandError};
use crate::value::{short_type_name, ArgMap, ArgValue, TypeTag};

/// Type tag source for object-kind validators
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectType(String);

impl ObjectType {
    /// Tag taken from a Rust type's short name, e.g. `ObjectType::of::<Report>()` is `"Report"`
    pub fn of<T: ?Sized>() -> Self {
        Self(short_type_name::<T>())
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ObjectType {
    fn from(name: &str) -> Self {
        Self::named(name)
    }
}

impl From<String> for ObjectType {
    fn from(name: String) -> Self {
        Self::named(name)
    }
}

/// Options accepted by every declaration method
#[derive(Debug, Clone)]
pub struct ArgOptions {
    pub default: Option<ArgValue>,
    pub allow_none: bool,
    /// Only read by object-kind validators
    pub object_type: Option<ObjectType>,
}

impl Default for ArgOptions {
    fn default() -> Self {
        Self {
            default: None,
            allow_none: true,
            object_type: None,
        }
    }
}

impl ArgOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default(mut self, value: impl Into<ArgValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn allow_none(mut self, allow: bool) -> Self {
        self.allow_none = allow;
        self
    }

    pub fn not_none(self) -> Self {
        self.allow_none(false)
    }

    pub fn of_type(mut self, object_type: impl Into<ObjectType>) -> Self {
        self.object_type = Some(object_type.into());
        self
    }
}

/// Serializable description of a declared argument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgumentInfo {
    pub name: String,
    pub type_tag: String,
    pub default: Option<serde_json::Value>,
    pub allow_none: bool,
    pub required: bool,
}

/// Gate-keeper for one named argument.
///
/// Immutable once built; command types share validators through `Arc`.
#[derive(Debug, Clone)]
pub struct ArgValidator {
    name: String,
    expected: TypeTag,
    default: Option<ArgValue>,
    allow_none: bool,
}

impl ArgValidator {
    /// Create a validator expecting `expected`.
    ///
    /// A truthy default is type-checked here; falsy defaults are kept but
    /// never used.
    pub fn new(
        name: impl Into<String>,
        expected: TypeTag,
        options: ArgOptions,
    ) -> Result<Self, CommandError> {
        let name = name.into();
        if name.is_empty() {
            return Err(CommandError::invalid_validator("validator requires a name"));
        }

        let validator = Self {
            name,
            expected,
            default: options.default,
            allow_none: options.allow_none,
        };

        if let Some(default) = validator.usable_default() {
            validator.check_type(&format!("default for {}", validator.name), default)?;
        }

        Ok(validator)
    }

    /// Create an object-kind validator, tagged from `options.object_type`
    pub fn object(name: impl Into<String>, options: ArgOptions) -> Result<Self, CommandError> {
        let name = name.into();
        if name.is_empty() {
            return Err(CommandError::invalid_validator("validator requires a name"));
        }

        let tag = options
            .object_type
            .as_ref()
            .filter(|tag| !tag.name().is_empty())
            .map(|tag| TypeTag::object(tag.name()))
            .ok_or_else(|| {
                CommandError::invalid_validator("Object validator requires a type argument")
            })?;

        Self::new(name, tag, options)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn expected(&self) -> &TypeTag {
        &self.expected
    }

    pub fn type_name(&self) -> &str {
        self.expected.name()
    }

    pub fn default(&self) -> Option<&ArgValue> {
        self.default.as_ref()
    }

    pub fn allows_none(&self) -> bool {
        self.allow_none
    }

    /// Whether omitting the argument fails
    pub fn is_required(&self) -> bool {
        self.usable_default().is_none()
    }

    /// Vet `args[name]`, falling back to the default when absent
    pub fn validate(&self, args: &ArgMap) -> Result<ArgValue, ArgError> {
        match args.get(&self.name) {
            Some(value) => {
                // 不允许 None 时，任何假值都按 None 处理
                if !self.allow_none && !value.is_truthy() {
                    return Err(ArgError::NotNone(self.name.clone()));
                }
                self.check_type(&self.name, value)?;
                Ok(value.clone())
            }
            None => self
                .usable_default()
                .cloned()
                .ok_or_else(|| ArgError::MissingRequired(self.name.clone())),
        }
    }

    /// Exact tag-name comparison, no subtype compatibility
    pub fn check_type(&self, label: &str, value: &ArgValue) -> Result<(), ArgError> {
        let actual = value.type_tag();
        if actual.name() != self.expected.name() {
            return Err(ArgError::UnexpectedType {
                name: label.to_string(),
                expected: self.expected.name().to_string(),
                actual: actual.name().to_string(),
            });
        }
        Ok(())
    }

    pub fn describe(&self) -> ArgumentInfo {
        ArgumentInfo {
            name: self.name.clone(),
            type_tag: self.expected.name().to_string(),
            default: self.default.as_ref().map(ArgValue::to_json),
            allow_none: self.allow_none,
            required: self.is_required(),
        }
    }

    // 假值默认值视为未设置
    fn usable_default(&self) -> Option<&ArgValue> {
        self.default.as_ref().filter(|value| value.is_truthy())
    }
}
