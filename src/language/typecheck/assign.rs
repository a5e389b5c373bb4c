use super::*;

impl Instantiations {
    /// Whether a value of `source` may be used where `destination` is
    /// expected. Unsolved generic instances are solved on first contact.
    pub fn is_assignable_to(&mut self, source: &Type, destination: &Type) -> CheckResult<bool> {
        let assignable = match (source, destination) {
            (Type::Error, _) | (_, Type::Error) => true,
            (Type::Size, Type::Size)
            | (Type::CInt, Type::CInt)
            | (Type::Bool, Type::Bool)
            | (Type::Byte, Type::Byte)
            | (Type::Void, Type::Void) => true,
            (Type::ParamRef(source), Type::ParamRef(destination))
                if source.location == destination.location =>
            {
                true
            }
            (
                Type::Ptr {
                    to: source_to,
                    is_mutable: source_mutable,
                },
                Type::Ptr {
                    to: destination_to,
                    is_mutable: destination_mutable,
                },
            ) => {
                self.is_assignable_to(source_to, destination_to)?
                    && (!destination_mutable || *source_mutable)
            }
            (Type::Constructor(source), Type::Constructor(destination))
                if source.name == destination.name =>
            {
                true
            }
            (
                Type::Application {
                    callee: source_callee,
                    args: source_args,
                },
                Type::Application {
                    callee: destination_callee,
                    args: destination_args,
                },
            ) => {
                if source_callee.name != destination_callee.name
                    || source_args.len() != destination_args.len()
                {
                    false
                } else {
                    let mut all = true;
                    for (source_arg, destination_arg) in source_args.iter().zip(destination_args) {
                        if !self.is_assignable_to(source_arg, destination_arg)? {
                            all = false;
                            break;
                        }
                    }
                    all
                }
            }
            (_, Type::GenericInstance { id, .. }) => {
                match self.solution(*id).cloned() {
                    Some(solution) => self.is_assignable_to(source, &solution)?,
                    None => self.bind_instance(*id, source)?,
                }
            }
            (Type::GenericInstance { id, .. }, _) => {
                match self.solution(*id).cloned() {
                    Some(solution) => self.is_assignable_to(&solution, destination)?,
                    None => self.bind_instance(*id, destination)?,
                }
            }
            (Type::Function(source), Type::Function(destination)) => {
                self.is_function_assignable(source, destination)?
            }
            (Type::UntaggedUnion(source_members), Type::UntaggedUnion(destination_members)) => {
                if source_members.len() != destination_members.len() {
                    false
                } else {
                    let mut all = true;
                    for (source_member, destination_member) in
                        source_members.iter().zip(destination_members)
                    {
                        if !self.is_assignable_to(source_member, destination_member)? {
                            all = false;
                            break;
                        }
                    }
                    all
                }
            }
            (_, Type::UntaggedUnion(destination_members)) => {
                let mut any = false;
                for member in destination_members {
                    if self.is_assignable_to(source, member)? {
                        any = true;
                        break;
                    }
                }
                any
            }
            _ => false,
        };
        Ok(assignable)
    }

    fn bind_instance(&mut self, id: u64, other: &Type) -> CheckResult<bool> {
        let other = self.shallow_resolve(other);
        if let Type::GenericInstance { id: other_id, .. } = other {
            if other_id == id {
                return Ok(true);
            }
        }
        self.solve(id, other)?;
        Ok(true)
    }

    fn is_function_assignable(&mut self, source: &FunctionType, destination: &FunctionType) -> CheckResult<bool> {
        if source.receiver.is_some()
            || destination.receiver.is_some()
            || source.type_params.is_some()
            || destination.type_params.is_some()
            || source.from.len() != destination.from.len()
        {
            return Ok(false);
        }
        for (source_param, destination_param) in source.from.iter().zip(&destination.from) {
            // parameters are contravariant
            if !self.is_assignable_to(destination_param, source_param)? {
                return Ok(false);
            }
        }
        self.is_assignable_to(&source.to, &destination.to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::span::{FileId, Span};

    fn binder(name: &str) -> Binder {
        Identifier {
            name: name.to_string(),
            location: SourceLocation::new(FileId(0), Span::new(0, name.len())),
        }
    }

    fn sample_types() -> Vec<Type> {
        vec![
            Type::Void,
            Type::Bool,
            Type::Byte,
            Type::CInt,
            Type::Size,
            Type::ptr(Type::CInt, true),
            Type::ptr(Type::Bool, false),
            Type::UntaggedUnion(vec![Type::CInt, Type::Bool]),
            Type::function(FunctionType {
                receiver: None,
                type_params: None,
                from: vec![Type::CInt],
                to: Type::Bool,
                constraints: Vec::new(),
            }),
        ]
    }

    #[test]
    fn error_is_assignable_both_ways() {
        let mut instantiations = Instantiations::default();
        for ty in sample_types() {
            assert!(instantiations.is_assignable_to(&Type::Error, &ty).unwrap(), "{ty}");
            assert!(instantiations.is_assignable_to(&ty, &Type::Error).unwrap(), "{ty}");
        }
    }

    #[test]
    fn mutable_pointer_may_be_used_as_immutable_only() {
        let mut instantiations = Instantiations::default();
        for ty in sample_types() {
            let mutable = Type::ptr(ty.clone(), true);
            let immutable = Type::ptr(ty.clone(), false);
            assert!(instantiations.is_assignable_to(&mutable, &immutable).unwrap());
            assert!(!instantiations.is_assignable_to(&immutable, &mutable).unwrap());
        }
    }

    #[test]
    fn generic_instance_is_solved_by_first_use() {
        let mut instantiations = Instantiations::default();
        let t = binder("T");
        let instance = instantiations.fresh(&t, SourceLocation::default());
        let Type::GenericInstance { id, .. } = instance else {
            panic!("expected a generic instance");
        };
        assert!(!instantiations.is_solved(id));

        assert!(instantiations.is_assignable_to(&Type::CInt, &instance).unwrap());
        assert_eq!(instantiations.solution(id), Some(&Type::CInt));
        assert!(!instantiations.is_assignable_to(&Type::Bool, &instance).unwrap());
        assert!(instantiations.is_assignable_to(&instance, &Type::CInt).unwrap());
    }

    #[test]
    fn instances_unified_with_each_other_do_not_cycle() {
        let mut instantiations = Instantiations::default();
        let a = instantiations.fresh(&binder("A"), SourceLocation::default());
        let b = instantiations.fresh(&binder("B"), SourceLocation::default());
        assert!(instantiations.is_assignable_to(&a, &b).unwrap());
        assert!(instantiations.is_assignable_to(&b, &a).unwrap());
        assert!(instantiations.is_assignable_to(&Type::Byte, &a).unwrap());
        assert_eq!(instantiations.resolved(&b), Some(Type::Byte));
    }

    #[test]
    fn solving_twice_is_an_internal_error() {
        let mut instantiations = Instantiations::default();
        instantiations.solve(7, Type::CInt).unwrap();
        assert!(matches!(
            instantiations.solve(7, Type::Bool),
            Err(InternalError::InstanceSolvedTwice(7))
        ));
    }

    #[test]
    fn functions_are_contravariant_in_parameters() {
        let mut instantiations = Instantiations::default();
        let function = |param: Type, to: Type| {
            Type::function(FunctionType {
                receiver: None,
                type_params: None,
                from: vec![param],
                to,
                constraints: Vec::new(),
            })
        };
        let takes_immutable = function(Type::ptr(Type::CInt, false), Type::Void);
        let takes_mutable = function(Type::ptr(Type::CInt, true), Type::Void);
        assert!(instantiations.is_assignable_to(&takes_immutable, &takes_mutable).unwrap());
        assert!(!instantiations.is_assignable_to(&takes_mutable, &takes_immutable).unwrap());
    }

    #[test]
    fn union_destination_accepts_any_member() {
        let mut instantiations = Instantiations::default();
        let union = Type::UntaggedUnion(vec![Type::CInt, Type::Bool]);
        assert!(instantiations.is_assignable_to(&Type::Bool, &union).unwrap());
        assert!(!instantiations.is_assignable_to(&Type::Byte, &union).unwrap());
        let swapped = Type::UntaggedUnion(vec![Type::Bool, Type::CInt]);
        assert!(!instantiations.is_assignable_to(&swapped, &union).unwrap());
    }
}
