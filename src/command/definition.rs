//! Command Type Definition
//!
//! 命令类型在定义时一次性构建参数校验器表：继承父类型的表，再执行声明钩子覆盖或扩展

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::command::errors::CommandError;
use crate::command::execution::Command;
use crate::command::registry::ValidatorRegistry;
use crate::command::validator::{ArgOptions, ArgValidator, ArgumentInfo};

type ValidatorMap = BTreeMap<String, Arc<ArgValidator>>;

/// Descriptor of a command type.
///
/// Holds the resolved validator map and the user hooks. The map is only
/// written while the type's declaration hook runs; afterwards the type is
/// effectively immutable and can be shared freely.
pub struct CommandType {
    name: String,
    parent: Option<Arc<CommandType>>,
    registry: Arc<ValidatorRegistry>,
    behaviour: Arc<dyn Command>,
    validators: RwLock<ValidatorMap>,
    declaring: AtomicBool,
}

/// Builder for [`CommandType`]
pub struct CommandTypeBuilder {
    name: String,
    parent: Option<Arc<CommandType>>,
    registry: Option<Arc<ValidatorRegistry>>,
}

impl CommandTypeBuilder {
    /// Inherit validators (and, unless overridden, the registry) from `parent`
    pub fn parent(mut self, parent: &Arc<CommandType>) -> Self {
        self.parent = Some(Arc::clone(parent));
        self
    }

    pub fn registry(mut self, registry: Arc<ValidatorRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn build<C: Command + 'static>(self, behaviour: C) -> Result<Arc<CommandType>, CommandError> {
        self.build_shared(Arc::new(behaviour))
    }

    /// Define the type: copy the parent's map, then run the declaration hook.
    ///
    /// The declaration phase is closed whether or not the hook succeeds.
    pub fn build_shared(self, behaviour: Arc<dyn Command>) -> Result<Arc<CommandType>, CommandError> {
        let registry = self
            .registry
            .or_else(|| self.parent.as_ref().map(|parent| Arc::clone(&parent.registry)))
            .unwrap_or_else(ValidatorRegistry::shared);

        let inherited = self
            .parent
            .as_ref()
            .map(|parent| parent.validator_map())
            .unwrap_or_default();
        let inherited_count = inherited.len();

        let command_type = CommandType {
            name: self.name,
            parent: self.parent,
            registry,
            behaviour: Arc::clone(&behaviour),
            validators: RwLock::new(inherited),
            declaring: AtomicBool::new(true),
        };

        let outcome = behaviour.declare_args(&mut command_type.declarer());
        command_type.declaring.store(false, Ordering::Release);

        if let Err(err) = outcome {
            log::warn!(
                "declaring arguments for command '{}' failed: {}",
                command_type.name,
                err
            );
            return Err(err);
        }

        log::debug!(
            "defined command '{}' with {} argument(s), {} inherited from {}",
            command_type.name,
            command_type.read_validators().len(),
            inherited_count,
            command_type
                .parent
                .as_ref()
                .map(|parent| parent.name.as_str())
                .unwrap_or("<none>")
        );

        Ok(Arc::new(command_type))
    }
}

impl CommandType {
    pub fn builder(name: impl Into<String>) -> CommandTypeBuilder {
        CommandTypeBuilder {
            name: name.into(),
            parent: None,
            registry: None,
        }
    }

    /// Define a root command type against the shared registry
    pub fn define<C: Command + 'static>(
        name: impl Into<String>,
        behaviour: C,
    ) -> Result<Arc<CommandType>, CommandError> {
        Self::builder(name).build(behaviour)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&Arc<CommandType>> {
        self.parent.as_ref()
    }

    pub fn registry(&self) -> &Arc<ValidatorRegistry> {
        &self.registry
    }

    /// True only while this type's declaration hook is running
    pub fn is_declaring(&self) -> bool {
        self.declaring.load(Ordering::Acquire)
    }

    /// Declaration methods for this type. Outside the declaration
    /// phase every call fails with [`CommandError::NotDeclaring`].
    pub fn declarer(&self) -> ArgDeclarer<'_> {
        ArgDeclarer { command_type: self }
    }

    pub fn validator(&self, name: &str) -> Option<Arc<ArgValidator>> {
        self.read_validators().get(name).cloned()
    }

    /// Snapshot of the validators in argument-name order
    pub fn validators(&self) -> Vec<Arc<ArgValidator>> {
        self.read_validators().values().cloned().collect()
    }

    pub fn argument_names(&self) -> Vec<String> {
        self.read_validators().keys().cloned().collect()
    }

    pub fn arguments(&self) -> Vec<ArgumentInfo> {
        self.read_validators()
            .values()
            .map(|validator| validator.describe())
            .collect()
    }

    pub(crate) fn behaviour(&self) -> Arc<dyn Command> {
        Arc::clone(&self.behaviour)
    }

    fn validator_map(&self) -> ValidatorMap {
        self.read_validators().clone()
    }

    fn insert_validator(&self, validator: ArgValidator) -> Result<(), CommandError> {
        if !self.is_declaring() {
            return Err(CommandError::NotDeclaring);
        }

        let mut validators = self.validators.write().unwrap_or_else(PoisonError::into_inner);
        if validators.contains_key(validator.name()) {
            log::trace!(
                "command '{}' overrides argument '{}'",
                self.name,
                validator.name()
            );
        }
        validators.insert(validator.name().to_string(), Arc::new(validator));
        Ok(())
    }

    fn read_validators(&self) -> std::sync::RwLockReadGuard<'_, ValidatorMap> {
        self.validators.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandType")
            .field("name", &self.name)
            .field("parent", &self.parent.as_ref().map(|parent| parent.name.as_str()))
            .field("arguments", &self.argument_names())
            .field("declaring", &self.is_declaring())
            .finish()
    }
}

/// Declaration API handed to [`Command::declare_args`].
///
/// Each method builds a validator through the type's registry and stores it
/// under the argument name, replacing any inherited validator of that name.
pub struct ArgDeclarer<'a> {
    command_type: &'a CommandType,
}

impl<'a> ArgDeclarer<'a> {
    pub fn command_type(&self) -> &'a CommandType {
        self.command_type
    }

    /// Declare `name` with a validator of the registered `kind`
    pub fn declare(&mut self, kind: &str, name: &str, options: ArgOptions) -> Result<(), CommandError> {
        // 阶段检查先于工厂调用
        if !self.command_type.is_declaring() {
            log::warn!(
                "attempt to declare '{}' on command '{}' outside argument declaration",
                name,
                self.command_type.name
            );
            return Err(CommandError::NotDeclaring);
        }

        let validator = self.command_type.registry.create(kind, name, options)?;
        self.command_type.insert_validator(validator)
    }

    pub fn int(&mut self, name: &str, options: ArgOptions) -> Result<(), CommandError> {
        self.declare("int", name, options)
    }

    pub fn integer(&mut self, name: &str, options: ArgOptions) -> Result<(), CommandError> {
        self.declare("integer", name, options)
    }

    pub fn bool(&mut self, name: &str, options: ArgOptions) -> Result<(), CommandError> {
        self.declare("bool", name, options)
    }

    pub fn boolean(&mut self, name: &str, options: ArgOptions) -> Result<(), CommandError> {
        self.declare("boolean", name, options)
    }

    pub fn string(&mut self, name: &str, options: ArgOptions) -> Result<(), CommandError> {
        self.declare("string", name, options)
    }

    pub fn str(&mut self, name: &str, options: ArgOptions) -> Result<(), CommandError> {
        self.declare("str", name, options)
    }

    pub fn float(&mut self, name: &str, options: ArgOptions) -> Result<(), CommandError> {
        self.declare("float", name, options)
    }

    pub fn dict(&mut self, name: &str, options: ArgOptions) -> Result<(), CommandError> {
        self.declare("dict", name, options)
    }

    pub fn map(&mut self, name: &str, options: ArgOptions) -> Result<(), CommandError> {
        self.declare("map", name, options)
    }

    pub fn set(&mut self, name: &str, options: ArgOptions) -> Result<(), CommandError> {
        self.declare("set", name, options)
    }

    pub fn list(&mut self, name: &str, options: ArgOptions) -> Result<(), CommandError> {
        self.declare("list", name, options)
    }

    pub fn array(&mut self, name: &str, options: ArgOptions) -> Result<(), CommandError> {
        self.declare("array", name, options)
    }

    /// Requires `options.object_type`
    pub fn object(&mut self, name: &str, options: ArgOptions) -> Result<(), CommandError> {
        self.declare("object", name, options)
    }

    pub fn type_(&mut self, name: &str, options: ArgOptions) -> Result<(), CommandError> {
        self.declare("type", name, options)
    }
}
