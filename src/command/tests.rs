//! Property-based tests for argument declaration and validation
//!
//! 覆盖默认值、必填、继承覆盖、声明阶段与类型标签的性质

#[cfg(test)]
mod tests {
    use crate::command::{
        ArgDeclarer, ArgError, ArgOptions, ArgValidator, Command, CommandError, CommandInstance,
        CommandType, ValidatorRegistry,
    };
    use crate::value::{ArgMap, ArgValue, TypeTag};
    use proptest::prelude::*;
    use std::collections::BTreeSet;
    use std::sync::Arc;

    /// Generate arbitrary argument names
    fn arb_arg_name() -> impl Strategy<Value = String> {
        "[a-z_][a-z0-9_]{0,12}".prop_map(|s| s.to_string())
    }

    fn arb_name_set() -> impl Strategy<Value = BTreeSet<String>> {
        prop::collection::btree_set(arb_arg_name(), 0..6)
    }

    fn arb_builtin_kind() -> impl Strategy<Value = &'static str> {
        prop::sample::select(vec![
            "int", "integer", "bool", "boolean", "string", "str", "float", "dict", "map", "set",
            "list", "array", "object", "type",
        ])
    }

    /// Returns a fixed value from `execute`
    struct Returns(ArgValue);

    impl Command for Returns {
        fn execute(&self, _command: &CommandInstance<'_>) -> Result<ArgValue, CommandError> {
            Ok(self.0.clone())
        }
    }

    /// Declares each name with the same kind and options, returns the bound bag
    struct DeclaresAll {
        kind: &'static str,
        names: Vec<String>,
        options: ArgOptions,
    }

    impl Command for DeclaresAll {
        fn declare_args(&self, args: &mut ArgDeclarer<'_>) -> Result<(), CommandError> {
            for name in &self.names {
                args.declare(self.kind, name, self.options.clone())?;
            }
            Ok(())
        }

        fn execute(&self, command: &CommandInstance<'_>) -> Result<ArgValue, CommandError> {
            Ok(ArgValue::Dict(
                command
                    .bound_args()
                    .iter()
                    .map(|(name, value)| (ArgValue::from(name), value.clone()))
                    .collect(),
            ))
        }
    }

    /// Tries to declare an argument from inside `execute`
    struct LateDeclarer {
        kind: &'static str,
        name: String,
    }

    impl Command for LateDeclarer {
        fn execute(&self, command: &CommandInstance<'_>) -> Result<ArgValue, CommandError> {
            command
                .command_type()
                .declarer()
                .declare(self.kind, &self.name, ArgOptions::new())?;
            Ok(ArgValue::None)
        }
    }

    fn isolated() -> Arc<ValidatorRegistry> {
        Arc::new(ValidatorRegistry::with_builtins())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        /// A type with no declared arguments returns whatever `execute` returns
        #[test]
        fn prop_no_arg_command_returns_execute_value(n in any::<i64>(), s in ".{0,16}") {
            let ty = CommandType::define("returns_int", Returns(ArgValue::Int(n))).unwrap();
            prop_assert_eq!(ty.run(ArgMap::new()).unwrap(), ArgValue::Int(n));

            let ty = CommandType::define("returns_str", Returns(ArgValue::from(s.clone()))).unwrap();
            prop_assert_eq!(ty.run(ArgMap::new()).unwrap(), ArgValue::from(s));
        }

        /// Omitting a required argument names that argument
        #[test]
        fn prop_missing_required_names_argument(name in arb_arg_name()) {
            let ty = CommandType::builder("required")
                .registry(isolated())
                .build(DeclaresAll { kind: "int", names: vec![name.clone()], options: ArgOptions::new() })
                .unwrap();

            let err = ty.run(ArgMap::new()).unwrap_err();
            prop_assert_eq!(err.as_validation(), Some(&ArgError::MissingRequired(name)));
        }

        /// Truthy defaults are bound when the argument is omitted
        #[test]
        fn prop_truthy_default_is_bound(
            names in prop::collection::btree_set(arb_arg_name(), 1..5),
            default in any::<i64>().prop_filter("default must be truthy", |d| *d != 0)
        ) {
            let ty = CommandType::builder("defaults")
                .registry(isolated())
                .build(DeclaresAll {
                    kind: "integer",
                    names: names.iter().cloned().collect(),
                    options: ArgOptions::new().with_default(default),
                })
                .unwrap();

            let result = ty.run(ArgMap::new()).unwrap();
            let bound = result.as_dict().unwrap();
            prop_assert_eq!(bound.len(), names.len());
            for value in bound.values() {
                prop_assert_eq!(value, &ArgValue::Int(default));
            }
        }

        /// A falsy default behaves as if no default had been given
        #[test]
        fn prop_falsy_default_is_required(name in arb_arg_name(), pick in 0usize..4) {
            let (kind, default) = [
                ("int", ArgValue::Int(0)),
                ("string", ArgValue::from("")),
                ("bool", ArgValue::Bool(false)),
                ("list", ArgValue::List(Vec::new())),
            ][pick].clone();

            let ty = CommandType::builder("falsy")
                .registry(isolated())
                .build(DeclaresAll {
                    kind,
                    names: vec![name.clone()],
                    options: ArgOptions::new().with_default(default),
                })
                .unwrap();

            let err = ty.run(ArgMap::new()).unwrap_err();
            prop_assert_eq!(err.as_validation(), Some(&ArgError::MissingRequired(name)));
        }

        /// A subtype's map is its parent's map overlaid with its own declarations
        #[test]
        fn prop_subtype_map_overlays_parent(
            parent_names in arb_name_set(),
            child_names in arb_name_set()
        ) {
            let parent = CommandType::builder("parent")
                .registry(isolated())
                .build(DeclaresAll {
                    kind: "int",
                    names: parent_names.iter().cloned().collect(),
                    options: ArgOptions::new().with_default(1),
                })
                .unwrap();
            let child = CommandType::builder("child")
                .parent(&parent)
                .build(DeclaresAll {
                    kind: "str",
                    names: child_names.iter().cloned().collect(),
                    options: ArgOptions::new().with_default("c"),
                })
                .unwrap();

            let expected: Vec<String> = parent_names.union(&child_names).cloned().collect();
            prop_assert_eq!(child.argument_names(), expected);

            for name in &parent_names {
                let inherited = child.validator(name).unwrap();
                if child_names.contains(name) {
                    prop_assert_eq!(inherited.expected(), &TypeTag::Str);
                } else {
                    prop_assert!(Arc::ptr_eq(&inherited, &parent.validator(name).unwrap()));
                }
            }

            // the parent never sees the child's declarations
            let parent_expected: Vec<String> = parent_names.iter().cloned().collect();
            prop_assert_eq!(parent.argument_names(), parent_expected);
        }

        /// Declaring from `execute` fails with the phase error, whatever the arguments
        #[test]
        fn prop_declaration_outside_phase_fails(kind in arb_builtin_kind(), name in ".{0,12}") {
            let ty = CommandType::builder("late")
                .registry(isolated())
                .build(LateDeclarer { kind, name: name.clone() })
                .unwrap();

            let err = ty.run(ArgMap::new()).unwrap_err();
            prop_assert!(matches!(err, CommandError::NotDeclaring));
            prop_assert!(ty.validator(&name).is_none());
        }

        /// A string validator reports the runtime tag of an int
        #[test]
        fn prop_type_mismatch_reports_tags(x in any::<i64>()) {
            let validator = ArgValidator::new("x", TypeTag::Str, ArgOptions::new()).unwrap();
            let err = validator.validate(&ArgMap::new().with("x", x)).unwrap_err();
            prop_assert_eq!(
                err,
                ArgError::UnexpectedType {
                    name: "x".to_string(),
                    expected: "str".to_string(),
                    actual: "int".to_string(),
                }
            );
        }

        /// Present values of the declared type pass through unchanged
        #[test]
        fn prop_present_value_passes_through(
            name in arb_arg_name(),
            value in any::<i64>(),
            default in 1i64..1000
        ) {
            let validator = ArgValidator::new(
                name.clone(),
                TypeTag::Int,
                ArgOptions::new().with_default(default),
            )
            .unwrap();
            let args = ArgMap::new().with(name, value);
            prop_assert_eq!(validator.validate(&args), Ok(ArgValue::Int(value)));
        }
    }
}
