//! Command Instance Execution
//!
//! 每次 run 创建一个新实例：校验并绑定参数，然后调用自定义校验与执行钩子

use std::any::Any;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::command::definition::{ArgDeclarer, CommandType};
use crate::command::errors::CommandError;
use crate::value::{ArgMap, ArgValue};

/// Hooks implemented by concrete command types.
///
/// All three have no-op defaults. Errors returned from `validate` and
/// `execute` reach the caller of `run` unchanged.
pub trait Command: Send + Sync {
    /// Declare arguments. Called once, when the command type is defined.
    fn declare_args(&self, _args: &mut ArgDeclarer<'_>) -> Result<(), CommandError> {
        Ok(())
    }

    /// Cross-field checks, run after every declared argument is bound
    fn validate(&self, _command: &CommandInstance<'_>) -> Result<(), CommandError> {
        Ok(())
    }

    fn execute(&self, _command: &CommandInstance<'_>) -> Result<ArgValue, CommandError> {
        Ok(ArgValue::None)
    }
}

/// Lifecycle of one invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Created,
    ArgsValidated,
    CustomValidated,
    Executed,
}

/// One invocation of a command type, alive for a single `run` call
#[derive(Debug)]
pub struct CommandInstance<'a> {
    command_type: &'a CommandType,
    raw_args: ArgMap,
    bound: ArgMap,
    state: RunState,
}

impl<'a> CommandInstance<'a> {
    fn new(command_type: &'a CommandType, raw_args: ArgMap) -> Self {
        Self {
            command_type,
            raw_args,
            bound: ArgMap::new(),
            state: RunState::Created,
        }
    }

    pub fn command_type(&self) -> &'a CommandType {
        self.command_type
    }

    /// The bag exactly as passed to `run`, undeclared arguments included
    pub fn raw_args(&self) -> &ArgMap {
        &self.raw_args
    }

    /// Validated values, one per declared argument
    pub fn bound_args(&self) -> &ArgMap {
        &self.bound
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.bound.get(name)
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(ArgValue::as_int)
    }

    pub fn float(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(ArgValue::as_float)
    }

    pub fn boolean(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(ArgValue::as_bool)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(ArgValue::as_str)
    }

    pub fn list(&self, name: &str) -> Option<&[ArgValue]> {
        self.get(name).and_then(ArgValue::as_list)
    }

    pub fn object<T: Any>(&self, name: &str) -> Option<&T> {
        self.get(name).and_then(ArgValue::downcast_ref::<T>)
    }

    /// Vet the raw bag through every validator, stopping at the first failure
    fn bind_args(&mut self) -> Result<(), CommandError> {
        for validator in self.command_type.validators() {
            let value = validator.validate(&self.raw_args)?;
            log::trace!(
                "command '{}': bound '{}' = {}",
                self.command_type.name(),
                validator.name(),
                value
            );
            self.bound.insert(validator.name(), value);
        }
        self.state = RunState::ArgsValidated;
        Ok(())
    }

    fn run(&mut self, behaviour: &dyn Command) -> Result<ArgValue, CommandError> {
        self.bind_args()?;

        behaviour.validate(&self)?;
        self.state = RunState::CustomValidated;

        let result = behaviour.execute(&self)?;
        self.state = RunState::Executed;
        Ok(result)
    }
}

impl CommandType {
    /// Run the command: validate `args`, bind them on a fresh instance,
    /// then call `validate` and `execute`.
    pub fn run(&self, args: ArgMap) -> Result<ArgValue, CommandError> {
        log::debug!("running command '{}' with {} argument(s)", self.name(), args.len());

        let behaviour: Arc<dyn Command> = self.behaviour();
        let mut instance = CommandInstance::new(self, args);
        let result = instance.run(behaviour.as_ref());

        match &result {
            Ok(_) => log::debug!("command '{}' executed", self.name()),
            Err(err) => log::debug!(
                "command '{}' failed in state {:?}: {}",
                self.name(),
                instance.state(),
                err
            ),
        }
        result
    }
}
