use crate::language::{
    ast::{BinaryOperator, QualifiedName},
    span::SourceLocation,
    typecheck::types::Type,
};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Error)]
pub enum DiagnosticKind {
    #[error("unbound variable")]
    UnboundVariable,
    #[error("unbound type `{0}`")]
    UnboundType(String),
    #[error("`this` used outside of an extension function")]
    UnboundThis,
    #[error("`This` type used outside of an interface")]
    UnboundThisType,
    #[error("expected a pointer type, found `{0}`")]
    NotAPointerType(Type),
    #[error("expression is not addressable")]
    NotAnAddressableValue,
    #[error("value is not mutable")]
    ValNotMutable,
    #[error("struct field is not mutable")]
    StructFieldNotMutable,
    #[error("not a struct field")]
    NotAStructField,
    #[error("type `{source_type}` is not assignable to `{destination}`")]
    TypeNotAssignable { source_type: Type, destination: Type },
    #[error("type `{0}` is not callable")]
    TypeNotCallable(Type),
    #[error("type `{0}` does not support equality comparison")]
    TypeNotEqualityComparable(Type),
    #[error("operator `{0}` is not applicable to these operands")]
    OperatorNotApplicable(BinaryOperator),
    #[error("missing arguments: expected {required}")]
    MissingArgs { required: usize },
    #[error("too many arguments: expected {required}")]
    TooManyArgs { required: usize },
    #[error("too few type arguments")]
    TooFewTypeArgs,
    #[error("too many type arguments")]
    TooManyTypeArgs,
    #[error("could not infer type parameter `{0}`")]
    UninferrableTypeParam(String),
    #[error("no property `{property}` on type `{ty}`")]
    NoSuchProperty { ty: Type, property: String },
    #[error("no implementation found for this constraint")]
    NoImplementationFound,
    #[error("type of expression is ambiguous")]
    AmbiguousExpression,
    #[error("match does not cover every case")]
    NonExhaustivePatterns,
    #[error("unreachable pattern")]
    UnreachablePattern,
    #[error("pattern does not name a case of this enum")]
    UnboundPattern,
    #[error("pattern has the wrong number of parameters")]
    PatternParamMismatch,
    #[error("nested patterns are not allowed")]
    NestedPatternsNotAllowed,
    #[error("duplicate case name")]
    DuplicateVariantName,
    #[error("duplicate field name")]
    DuplicateFieldName,
    #[error("not an interface")]
    NotAnInterface,
    #[error("constant must be a CInt, Bool or pointer")]
    NotAConst,
    #[error("incomplete type: expected {0} type arguments")]
    IncompleteType(usize),
    #[error("this statement is not allowed in `defer`")]
    StatementNotAllowedInDefer,
    #[error("expected an enum type")]
    ExpectedEnumType,
    #[error("no such module")]
    NoSuchModule,
    #[error("`new` requires a struct")]
    InvalidNewExpression,
}

impl DiagnosticKind {
    pub fn help(&self) -> Option<&'static str> {
        match self {
            DiagnosticKind::ValNotMutable => Some("declare the binding with `val mut` or use a `*mut` pointer"),
            DiagnosticKind::StructFieldNotMutable => {
                Some("declare the field with `val mut` and access it through a `*mut` pointer")
            }
            DiagnosticKind::AmbiguousExpression => {
                Some("add a type annotation so the pointer type is known")
            }
            DiagnosticKind::NonExhaustivePatterns => Some("add the missing cases or an `else` arm"),
            DiagnosticKind::UninferrableTypeParam(_) => {
                Some("pass the type arguments explicitly, e.g. `f[CInt](...)`")
            }
            DiagnosticKind::IncompleteType(_) => Some("supply type arguments, e.g. `Option[CInt]`"),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Diagnostic {
    pub location: SourceLocation,
    pub kind: DiagnosticKind,
}

pub trait DiagnosticReporter {
    fn report(&mut self, location: SourceLocation, kind: DiagnosticKind);
}

impl DiagnosticReporter for Vec<Diagnostic> {
    fn report(&mut self, location: SourceLocation, kind: DiagnosticKind) {
        self.push(Diagnostic { location, kind });
    }
}

/// A broken checker invariant. These abort the pass instead of becoming
/// user diagnostics.
#[derive(Debug, Error)]
pub enum InternalError {
    #[error("overlapping implementations of `{interface}` for `{ty}`")]
    OverlappingImplementations { interface: QualifiedName, ty: Type },
    #[error("generic instance #{0} was solved twice")]
    InstanceSolvedTwice(u64),
    #[error("type of `{name}` at {location} was never computed")]
    MissingBinderType {
        name: String,
        location: SourceLocation,
    },
    #[error("no type was recorded for the expression at {0}")]
    MissingExpressionType(SourceLocation),
    #[error("no declaration contains {0}")]
    NoEnclosingDeclaration(SourceLocation),
    #[error("`return` outside of a function body at {0}")]
    ReturnOutsideFunction(SourceLocation),
    #[error("method with a receiver called without a property access at {0}")]
    ReceiverWithoutProperty(SourceLocation),
    #[error("type parameter `{0}` has no declaring function")]
    UnknownTypeParamSite(String),
    #[error("interface `{0}` was never checked")]
    UncheckedInterface(QualifiedName),
}

pub type CheckResult<T> = Result<T, InternalError>;
