use crate::language::{
    ast::{BinaryOperator, Binder, QualifiedName},
    span::SourceLocation,
};
use std::{collections::HashMap, fmt};

/// Substitution from a type parameter's declaration site to the type that
/// replaces it.
pub type Substitution = HashMap<SourceLocation, Type>;

#[derive(Clone, Debug, PartialEq)]
pub enum Type {
    Error,
    Void,
    Bool,
    Byte,
    CInt,
    Size,
    Ptr {
        to: Box<Type>,
        is_mutable: bool,
    },
    Function(Box<FunctionType>),
    Constructor(TypeConstructor),
    Application {
        callee: TypeConstructor,
        args: Vec<Type>,
    },
    ParamRef(Binder),
    GenericInstance {
        binder: Binder,
        id: u64,
        call_location: SourceLocation,
    },
    ThisRef(SourceLocation),
    UntaggedUnion(Vec<Type>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct FunctionType {
    pub receiver: Option<Type>,
    pub type_params: Option<Vec<Binder>>,
    pub from: Vec<Type>,
    pub to: Type,
    pub constraints: Vec<Constraint>,
}

/// Named head of a struct or enum type. `params` is `None` for
/// non-generic declarations.
#[derive(Clone, Debug, PartialEq)]
pub struct TypeConstructor {
    pub binder: Binder,
    pub name: QualifiedName,
    pub params: Option<Vec<Binder>>,
}

/// The type bound to `param` must implement `interface[args]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Constraint {
    pub interface: QualifiedName,
    pub args: Vec<Type>,
    pub param: Binder,
}

impl Type {
    pub fn ptr(to: Type, is_mutable: bool) -> Type {
        Type::Ptr {
            to: Box::new(to),
            is_mutable,
        }
    }

    pub fn function(function: FunctionType) -> Type {
        Type::Function(Box::new(function))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Type::Error)
    }

    pub fn as_function(&self) -> Option<&FunctionType> {
        match self {
            Type::Function(function) => Some(function),
            _ => None,
        }
    }

    pub fn allows_equality_comparison(&self) -> bool {
        matches!(
            self,
            Type::Bool | Type::CInt | Type::Byte | Type::Size | Type::Ptr { .. } | Type::Error
        )
    }

    pub fn apply_substitution(&self, substitution: &Substitution, this_type: Option<&Type>) -> Type {
        match self {
            Type::Error | Type::Void | Type::Bool | Type::Byte | Type::CInt | Type::Size => self.clone(),
            Type::Ptr { to, is_mutable } => {
                Type::ptr(to.apply_substitution(substitution, this_type), *is_mutable)
            }
            Type::Function(function) => {
                Type::function(function.apply_substitution(substitution, this_type))
            }
            Type::Constructor(_) | Type::GenericInstance { .. } => self.clone(),
            Type::Application { callee, args } => Type::Application {
                callee: callee.clone(),
                args: args
                    .iter()
                    .map(|arg| arg.apply_substitution(substitution, this_type))
                    .collect(),
            },
            Type::ParamRef(binder) => substitution
                .get(&binder.location)
                .cloned()
                .unwrap_or_else(|| self.clone()),
            Type::ThisRef(_) => this_type.cloned().unwrap_or_else(|| self.clone()),
            Type::UntaggedUnion(members) => Type::UntaggedUnion(
                members
                    .iter()
                    .map(|member| member.apply_substitution(substitution, this_type))
                    .collect(),
            ),
        }
    }
}

impl FunctionType {
    pub fn apply_substitution(&self, substitution: &Substitution, this_type: Option<&Type>) -> FunctionType {
        FunctionType {
            receiver: self
                .receiver
                .as_ref()
                .map(|receiver| receiver.apply_substitution(substitution, this_type)),
            type_params: self.type_params.clone(),
            from: self
                .from
                .iter()
                .map(|param| param.apply_substitution(substitution, this_type))
                .collect(),
            to: self.to.apply_substitution(substitution, this_type),
            constraints: self
                .constraints
                .iter()
                .map(|constraint| Constraint {
                    interface: constraint.interface.clone(),
                    args: constraint
                        .args
                        .iter()
                        .map(|arg| arg.apply_substitution(substitution, this_type))
                        .collect(),
                    param: constraint.param.clone(),
                })
                .collect(),
        }
    }
}

/// Operand and result types for a binary operator applied to a non-pointer
/// left-hand side; `==`/`!=` are handled separately.
pub fn binary_operation_rule(operator: BinaryOperator, lhs: &Type) -> Option<(Type, Type)> {
    use BinaryOperator::*;
    let rule = match (operator, lhs) {
        (Plus | Minus | Times, Type::CInt) => (Type::CInt, Type::CInt),
        (Plus | Minus | Times, Type::Size) => (Type::Size, Type::Size),
        (LessThan | LessThanEqual | GreaterThan | GreaterThanEqual, Type::CInt) => {
            (Type::CInt, Type::Bool)
        }
        (LessThan | LessThanEqual | GreaterThan | GreaterThanEqual, Type::Size) => {
            (Type::Size, Type::Bool)
        }
        (And | Or, Type::Bool) => (Type::Bool, Type::Bool),
        _ => return None,
    };
    Some(rule)
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Error => write!(f, "<error>"),
            Type::Void => write!(f, "Void"),
            Type::Bool => write!(f, "Bool"),
            Type::Byte => write!(f, "Byte"),
            Type::CInt => write!(f, "CInt"),
            Type::Size => write!(f, "Size"),
            Type::Ptr { to, is_mutable } => {
                if *is_mutable {
                    write!(f, "*mut {to}")
                } else {
                    write!(f, "*{to}")
                }
            }
            Type::Function(function) => write!(f, "{function}"),
            Type::Constructor(constructor) => write!(f, "{}", constructor.name),
            Type::Application { callee, args } => {
                write!(f, "{}[{}]", callee.name, join(args))
            }
            Type::ParamRef(binder) => write!(f, "{}", binder.name),
            Type::GenericInstance { binder, id, .. } => write!(f, "{}'{id}", binder.name),
            Type::ThisRef(_) => write!(f, "This"),
            Type::UntaggedUnion(members) => {
                let members: Vec<String> = members.iter().map(ToString::to_string).collect();
                write!(f, "{}", members.join(" | "))
            }
        }
    }
}

impl fmt::Display for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(params) = &self.type_params {
            let names: Vec<&str> = params.iter().map(|param| param.name.as_str()).collect();
            write!(f, "[{}]", names.join(", "))?;
        }
        write!(f, "(")?;
        if let Some(receiver) = &self.receiver {
            write!(f, "this: {receiver}")?;
            if !self.from.is_empty() {
                write!(f, ", ")?;
            }
        }
        write!(f, "{}) -> {}", join(&self.from), self.to)
    }
}

fn join(types: &[Type]) -> String {
    types
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::{
        ast::Identifier,
        span::{FileId, Span},
    };

    fn binder(name: &str, start: usize) -> Binder {
        Identifier {
            name: name.to_string(),
            location: SourceLocation::new(FileId(0), Span::new(start, start + name.len())),
        }
    }

    #[test]
    fn substitution_is_keyed_by_declaration_site() {
        let t = binder("T", 0);
        let other_t = binder("T", 40);
        let mut substitution = Substitution::new();
        substitution.insert(t.location, Type::CInt);

        let ty = Type::ptr(Type::ParamRef(t), true);
        assert_eq!(
            ty.apply_substitution(&substitution, None),
            Type::ptr(Type::CInt, true)
        );
        let untouched = Type::ParamRef(other_t);
        assert_eq!(untouched.apply_substitution(&substitution, None), untouched);
    }

    #[test]
    fn this_type_replaces_this_ref() {
        let this = Type::ThisRef(SourceLocation::default());
        let function = Type::function(FunctionType {
            receiver: Some(this.clone()),
            type_params: None,
            from: vec![this],
            to: Type::Void,
            constraints: Vec::new(),
        });
        let applied = function.apply_substitution(&Substitution::new(), Some(&Type::Bool));
        let applied = applied.as_function().expect("function");
        assert_eq!(applied.receiver, Some(Type::Bool));
        assert_eq!(applied.from, vec![Type::Bool]);
    }

    #[test]
    fn equality_comparable_types() {
        for ty in [Type::Bool, Type::CInt, Type::Byte, Type::Size, Type::ptr(Type::Void, false)] {
            assert!(ty.allows_equality_comparison(), "{ty}");
        }
        let constructor = Type::Constructor(TypeConstructor {
            binder: binder("Point", 0),
            name: QualifiedName::new(["main", "Point"]),
            params: None,
        });
        assert!(!constructor.allows_equality_comparison());
        let function = Type::function(FunctionType {
            receiver: None,
            type_params: None,
            from: Vec::new(),
            to: Type::Void,
            constraints: Vec::new(),
        });
        assert!(!function.allows_equality_comparison());
    }

    #[test]
    fn display_matches_surface_syntax() {
        assert_eq!(Type::ptr(Type::ptr(Type::Byte, false), true).to_string(), "*mut *Byte");
        assert_eq!(
            Type::UntaggedUnion(vec![Type::CInt, Type::Bool]).to_string(),
            "CInt | Bool"
        );
    }
}
