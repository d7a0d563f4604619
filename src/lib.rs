//! Command objects with declared, inherited and validated arguments.
//!
//! A command type declares its arguments once, when it is defined, through
//! [`Command::declare_args`]. Every [`CommandType::run`] vets the supplied
//! [`ArgMap`] against those declarations, binds the results on a fresh
//! [`CommandInstance`], then calls the `validate` and `execute` hooks.

pub mod command;
pub mod value;

pub use command::{
    ArgDeclarer, ArgError, ArgOptions, ArgValidator, ArgumentInfo, Command, CommandError,
    CommandInstance, CommandType, CommandTypeBuilder, ErrorType, ObjectType, RunState,
    ValidatorFactory, ValidatorRegistry,
};
pub use value::{ArgMap, ArgValue, ObjectArg, TypeTag};
