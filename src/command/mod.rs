//! Command Module
//!
//! 命令参数的声明、继承、校验与执行

pub mod errors;
pub mod registry;
pub mod validator;
pub mod definition;
pub mod execution;

#[cfg(test)]
mod tests;


pub use errors::{ArgError, CommandError, ErrorType};
pub use registry::{ValidatorFactory, ValidatorRegistry};
pub use validator::{ArgOptions, ArgValidator, ArgumentInfo, ObjectType};
pub use definition::{ArgDeclarer, CommandType, CommandTypeBuilder};
pub use execution::{Command, CommandInstance, RunState};
