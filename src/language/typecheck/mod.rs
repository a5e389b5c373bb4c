use crate::language::{
    ast::*,
    resolve::{Binding, Resolver, ScopeResolver, TypeBinding},
    span::{HasLocation, SourceLocation},
};
use std::collections::{HashMap, HashSet};
use tracing::{debug, trace};

mod annotation;
mod assign;
mod decl;
pub mod diagnostics;
mod expr;
pub mod generics;
mod property;
mod stmt;
pub mod types;

pub use diagnostics::{CheckResult, Diagnostic, DiagnosticKind, DiagnosticReporter, InternalError};
pub use generics::Instantiations;
pub use property::{ImplementationBinding, PropertyBinding};
pub use types::{Constraint, FunctionType, Substitution, Type, TypeConstructor};

#[derive(Clone, Debug, Default)]
pub struct CheckOptions {
    /// Stop collecting after this many diagnostics.
    pub max_diagnostics: Option<usize>,
}

impl CheckOptions {
    pub const MAX_ERRORS_VAR: &'static str = "HADES_MAX_ERRORS";

    pub fn from_env() -> Self {
        let max_diagnostics = std::env::var(Self::MAX_ERRORS_VAR)
            .ok()
            .and_then(|value| value.trim().parse().ok());
        Self { max_diagnostics }
    }
}

/// Diagnostics of one checked program. `total` counts every reported
/// diagnostic, including those dropped by `CheckOptions::max_diagnostics`.
#[derive(Clone, Debug, Default)]
pub struct CheckReport {
    pub diagnostics: Vec<Diagnostic>,
    pub total: usize,
}

/// Resolves and checks every declaration of `program`, returning the
/// diagnostics in report order.
pub fn check_program(program: &Program, options: &CheckOptions) -> CheckResult<CheckReport> {
    let resolver = ScopeResolver::new(program);
    let mut checker = Checker::new(resolver, Vec::new());
    for file in &program.files {
        debug!(module = %file.module, declarations = file.declarations.len(), "checking file");
        for declaration in &file.declarations {
            checker.check_declaration(declaration)?;
        }
    }
    let mut diagnostics = checker.into_reporter();
    let total = diagnostics.len();
    if let Some(max) = options.max_diagnostics {
        diagnostics.truncate(max);
    }
    Ok(CheckReport { diagnostics, total })
}

/// Type checker state for one compilation. Every table is keyed by the
/// source location of the node it describes and is filled on demand.
pub struct Checker<'a, R, D> {
    resolver: R,
    reporter: D,
    binder_types: HashMap<SourceLocation, Type>,
    expression_types: HashMap<SourceLocation, Type>,
    annotation_types: HashMap<SourceLocation, Type>,
    type_arguments: HashMap<SourceLocation, Vec<Type>>,
    impl_bindings: HashMap<SourceLocation, Vec<ImplementationBinding<'a>>>,
    property_bindings: HashMap<SourceLocation, PropertyBinding<'a>>,
    interface_decls: HashMap<QualifiedName, &'a InterfaceDef>,
    checked_declarations: HashSet<SourceLocation>,
    checked_statements: HashSet<SourceLocation>,
    checked_vals: HashSet<SourceLocation>,
    return_types: Vec<Type>,
    instantiations: Instantiations,
    reported_uninferrable: HashSet<u64>,
}

impl<'a, R: Resolver<'a>, D: DiagnosticReporter> Checker<'a, R, D> {
    pub fn new(resolver: R, reporter: D) -> Self {
        Self {
            resolver,
            reporter,
            binder_types: HashMap::new(),
            expression_types: HashMap::new(),
            annotation_types: HashMap::new(),
            type_arguments: HashMap::new(),
            impl_bindings: HashMap::new(),
            property_bindings: HashMap::new(),
            interface_decls: HashMap::new(),
            checked_declarations: HashSet::new(),
            checked_statements: HashSet::new(),
            checked_vals: HashSet::new(),
            return_types: Vec::new(),
            instantiations: Instantiations::default(),
            reported_uninferrable: HashSet::new(),
        }
    }

    pub fn reporter(&self) -> &D {
        &self.reporter
    }

    pub fn into_reporter(self) -> D {
        self.reporter
    }

    pub fn instantiations(&self) -> &Instantiations {
        &self.instantiations
    }

    pub fn type_of_expression(&mut self, expression: &'a Expression) -> CheckResult<Type> {
        if let Some(ty) = self.expression_types.get(&expression.location) {
            return Ok(ty.clone());
        }
        self.check_declaration_containing(expression.location)?;
        self.expression_types
            .get(&expression.location)
            .cloned()
            .ok_or(InternalError::MissingExpressionType(expression.location))
    }

    pub fn type_of_binder(&mut self, binder: &'a Binder) -> CheckResult<Type> {
        if let Some(ty) = self.binder_types.get(&binder.location) {
            return Ok(ty.clone());
        }
        self.check_declaration_containing(binder.location)?;
        self.binder_type(binder)
    }

    pub fn annotation_to_type(&mut self, annotation: &'a TypeAnnotation) -> CheckResult<Type> {
        if let Some(ty) = self.annotation_types.get(&annotation.location) {
            return Ok(ty.clone());
        }
        self.check_declaration_containing(annotation.location)?;
        self.infer_annotation(annotation)
    }

    /// Type arguments resolved for a generic call or its callee.
    pub fn type_args(&self, location: SourceLocation) -> Option<&[Type]> {
        self.type_arguments.get(&location).map(Vec::as_slice)
    }

    /// Implementations chosen for each interface constraint of the call.
    pub fn constraint_bindings(&self, call: &Expression) -> Option<&[ImplementationBinding<'a>]> {
        self.impl_bindings.get(&call.location).map(Vec::as_slice)
    }

    pub fn property_binding(&self, property: &Expression) -> Option<&PropertyBinding<'a>> {
        self.property_bindings.get(&property.location)
    }

    pub fn interface_decl(&self, name: &QualifiedName) -> CheckResult<&'a InterfaceDef> {
        self.interface_decls
            .get(name)
            .copied()
            .ok_or_else(|| InternalError::UncheckedInterface(name.clone()))
    }

    fn check_declaration_containing(&mut self, location: SourceLocation) -> CheckResult<()> {
        let declaration = self
            .resolver
            .declaration_containing(location)
            .ok_or(InternalError::NoEnclosingDeclaration(location))?;
        self.check_declaration(declaration)
    }

    fn binder_type(&self, binder: &Binder) -> CheckResult<Type> {
        self.binder_types
            .get(&binder.location)
            .cloned()
            .ok_or_else(|| InternalError::MissingBinderType {
                name: binder.name.clone(),
                location: binder.location,
            })
    }

    fn bind_value(&mut self, binder: &Binder, ty: Type) {
        self.binder_types.insert(binder.location, ty);
    }

    fn is_assignable_to(&mut self, source: &Type, destination: &Type) -> CheckResult<bool> {
        self.instantiations.is_assignable_to(source, destination)
    }

    fn check_assignability(
        &mut self,
        location: SourceLocation,
        source: &Type,
        destination: &Type,
    ) -> CheckResult<()> {
        if !self.is_assignable_to(source, destination)? {
            self.error(
                location,
                DiagnosticKind::TypeNotAssignable {
                    source_type: source.clone(),
                    destination: destination.clone(),
                },
            );
        }
        Ok(())
    }

    fn with_return_type<T>(
        &mut self,
        return_type: Type,
        f: impl FnOnce(&mut Self) -> CheckResult<T>,
    ) -> CheckResult<T> {
        self.return_types.push(return_type);
        let result = f(self);
        self.return_types.pop();
        result
    }

    fn error(&mut self, location: SourceLocation, kind: DiagnosticKind) {
        self.reporter.report(location, kind);
    }
}

#[cfg(test)]
mod tests;
