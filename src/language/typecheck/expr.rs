use super::{types::binary_operation_rule, *};

impl<'a, R: Resolver<'a>, D: DiagnosticReporter> Checker<'a, R, D> {
    /// Infers and records the type of `expression`. Each expression is
    /// inferred at most once.
    pub(super) fn infer_expression(&mut self, expression: &'a Expression) -> CheckResult<Type> {
        if let Some(ty) = self.expression_types.get(&expression.location) {
            return Ok(ty.clone());
        }
        let ty = self.infer_expression_kind(expression)?;
        trace!(at = %expression.location, ty = %ty, "inferred");
        self.expression_types.insert(expression.location, ty.clone());
        Ok(ty)
    }

    pub(super) fn check_expression(&mut self, expected: &Type, expression: &'a Expression) -> CheckResult<()> {
        if let Some(ty) = self.expression_types.get(&expression.location).cloned() {
            return self.check_assignability(expression.location, &ty, expected);
        }
        let ty = match (&expression.kind, expected) {
            (ExpressionKind::NullPtr, Type::Ptr { .. }) => expected.clone(),
            (ExpressionKind::IntLiteral(_), Type::Size) => Type::Size,
            (ExpressionKind::PointerCast { to_type, arg }, _) => {
                self.check_pointer_cast(expected, expression, to_type, arg)?
            }
            _ => {
                let ty = self.infer_expression(expression)?;
                return self.check_assignability(expression.location, &ty, expected);
            }
        };
        self.expression_types.insert(expression.location, ty);
        Ok(())
    }

    fn infer_expression_kind(&mut self, expression: &'a Expression) -> CheckResult<Type> {
        let location = expression.location;
        let ty = match &expression.kind {
            ExpressionKind::Error => Type::Error,
            ExpressionKind::Var(name) => match self.resolver.resolve(name) {
                Some(binding) => self.infer_binding(binding)?,
                None => {
                    self.error(name.location, DiagnosticKind::UnboundVariable);
                    Type::Error
                }
            },
            ExpressionKind::Call {
                callee,
                type_args,
                args,
            } => self.infer_call(expression, callee, type_args.as_deref(), args)?,
            ExpressionKind::Property { lhs, property } => {
                self.infer_property(expression, lhs, property, None)?
            }
            ExpressionKind::ByteString(_) => Type::ptr(Type::Byte, false),
            ExpressionKind::BoolLiteral(_) => Type::Bool,
            ExpressionKind::IntLiteral(_) => Type::CInt,
            ExpressionKind::This => match self.resolver.resolve_this_param(location) {
                Some(this_param) => self.infer_annotation(&this_param.annotation)?,
                None => {
                    self.error(location, DiagnosticKind::UnboundThis);
                    Type::Error
                }
            },
            ExpressionKind::NullPtr => {
                self.error(location, DiagnosticKind::AmbiguousExpression);
                Type::ptr(Type::Error, false)
            }
            ExpressionKind::Not(operand) => {
                self.check_expression(&Type::Bool, operand)?;
                Type::Bool
            }
            ExpressionKind::BinaryOperation { operator, lhs, rhs } => {
                self.infer_binary_operation(expression, *operator, lhs, rhs)?
            }
            ExpressionKind::SizeOf(annotation) => {
                self.infer_annotation(annotation)?;
                Type::Size
            }
            ExpressionKind::AddressOf(operand) => {
                let ty = self.infer_expression(operand)?;
                self.check_lvalue(operand, false);
                Type::ptr(ty, false)
            }
            ExpressionKind::AddressOfMut(operand) => {
                let ty = self.infer_expression(operand)?;
                self.check_lvalue(operand, true);
                Type::ptr(ty, true)
            }
            ExpressionKind::Load(pointer) => match self.infer_expression(pointer)? {
                Type::Ptr { to, .. } => *to,
                Type::Error => Type::Error,
                other => {
                    self.error(pointer.location, DiagnosticKind::NotAPointerType(other));
                    Type::Error
                }
            },
            ExpressionKind::PointerCast { to_type, arg } => {
                let to = self.infer_annotation(to_type)?;
                match self.infer_expression(arg)? {
                    Type::Ptr { is_mutable, .. } => Type::ptr(to, is_mutable),
                    Type::Error => Type::Error,
                    other => {
                        self.error(arg.location, DiagnosticKind::NotAPointerType(other));
                        Type::Error
                    }
                }
            }
            ExpressionKind::If {
                condition,
                true_branch,
                false_branch,
            } => {
                self.check_expression(&Type::Bool, condition)?;
                let ty = self.infer_expression(true_branch)?;
                self.check_expression(&ty, false_branch)?;
                ty
            }
            ExpressionKind::TypeApplication { lhs, args } => {
                let mut arg_types = Vec::with_capacity(args.len());
                for arg in args {
                    arg_types.push(self.infer_annotation(arg)?);
                }
                match self.infer_expression(lhs)? {
                    Type::Error => Type::Error,
                    callee @ Type::Constructor(_) => self.apply_type_constructor(location, callee, arg_types),
                    _ => {
                        self.error(location, DiagnosticKind::TooFewTypeArgs);
                        Type::Error
                    }
                }
            }
            ExpressionKind::Match { value, arms } => self.infer_match(expression, value, arms)?,
            ExpressionKind::New {
                path,
                type_args,
                args,
            } => self.infer_new(expression, path, type_args.as_deref(), args)?,
        };
        Ok(ty)
    }

    pub(super) fn infer_binding(&mut self, binding: Binding<'a>) -> CheckResult<Type> {
        match binding {
            Binding::GlobalFunction(def) => {
                let function_type = self.type_of_function_signature(&def.signature)?;
                Ok(Type::ptr(Type::function(function_type), false))
            }
            Binding::ExternFunction(def) => Ok(Type::ptr(self.type_of_extern_function_def(def)?, false)),
            Binding::FunctionParam { signature, param } => {
                self.type_of_function_signature(signature)?;
                self.binder_type(&param.binder)
            }
            Binding::Val(val) => {
                self.check_val_statement(val)?;
                self.binder_type(&val.binder)
            }
            Binding::Struct(def) => {
                self.declare_struct(def)?;
                Ok(Type::ptr(self.binder_type(&def.binder)?, false))
            }
            Binding::GlobalConst(def) => {
                self.declare_global_const(def)?;
                self.binder_type(&def.name)
            }
            Binding::EnumCaseConstructor { declaration, case } => {
                self.type_of_enum_constructor(declaration, case)
            }
            Binding::Pattern(binder) => self.binder_type(binder),
        }
    }

    fn infer_property(
        &mut self,
        expression: &'a Expression,
        lhs: &'a Expression,
        property: &'a Identifier,
        type_args: Option<&'a [TypeAnnotation]>,
    ) -> CheckResult<Type> {
        if let Some(binding) = self.get_property_binding(expression, lhs, property, type_args)? {
            return Ok(binding.ty().clone());
        }
        let lhs_type = self.infer_expression(lhs)?;
        if !lhs_type.is_error() {
            self.error(
                property.location,
                DiagnosticKind::NoSuchProperty {
                    ty: lhs_type,
                    property: property.name.clone(),
                },
            );
        }
        Ok(Type::Error)
    }

    fn infer_binary_operation(
        &mut self,
        expression: &'a Expression,
        operator: BinaryOperator,
        lhs: &'a Expression,
        rhs: &'a Expression,
    ) -> CheckResult<Type> {
        let lhs_type = self.infer_expression(lhs)?;
        if matches!(operator, BinaryOperator::Equals | BinaryOperator::NotEquals) {
            self.check_expression(&lhs_type, rhs)?;
            if !lhs_type.allows_equality_comparison() {
                self.error(
                    expression.location,
                    DiagnosticKind::TypeNotEqualityComparable(lhs_type),
                );
            }
            return Ok(Type::Bool);
        }
        let rule = match &lhs_type {
            Type::Error => {
                self.infer_expression(rhs)?;
                return Ok(Type::Error);
            }
            Type::Ptr { .. } if matches!(operator, BinaryOperator::Plus | BinaryOperator::Minus) => {
                Some((Type::Size, lhs_type.clone()))
            }
            Type::Ptr { .. } => None,
            _ => binary_operation_rule(operator, &lhs_type),
        };
        match rule {
            Some((rhs_type, result)) => {
                self.check_expression(&rhs_type, rhs)?;
                Ok(result)
            }
            None => {
                self.infer_expression(rhs)?;
                self.error(expression.location, DiagnosticKind::OperatorNotApplicable(operator));
                Ok(Type::Error)
            }
        }
    }

    fn check_pointer_cast(
        &mut self,
        expected: &Type,
        expression: &'a Expression,
        to_type: &'a TypeAnnotation,
        arg: &'a Expression,
    ) -> CheckResult<Type> {
        let to = self.infer_annotation(to_type)?;
        let arg_is_mutable = match self.infer_expression(arg)? {
            Type::Ptr { is_mutable, .. } => is_mutable,
            Type::Error => return Ok(Type::Error),
            other => {
                self.error(arg.location, DiagnosticKind::NotAPointerType(other));
                return Ok(Type::Error);
            }
        };
        let Type::Ptr { is_mutable, .. } = expected else {
            self.error(
                expression.location,
                DiagnosticKind::TypeNotAssignable {
                    source_type: Type::ptr(to, arg_is_mutable),
                    destination: expected.clone(),
                },
            );
            return Ok(Type::Error);
        };
        if *is_mutable && !arg_is_mutable {
            self.error(
                expression.location,
                DiagnosticKind::TypeNotAssignable {
                    source_type: Type::ptr(to, false),
                    destination: expected.clone(),
                },
            );
            return Ok(Type::Error);
        }
        let ty = Type::ptr(to, *is_mutable);
        self.check_assignability(expression.location, &ty, expected)?;
        Ok(ty)
    }

    /// `&x`, `&mut x` and `&x.field` need a `val` binding at the root.
    fn check_lvalue(&mut self, expression: &'a Expression, mutable: bool) {
        let name = match &expression.kind {
            ExpressionKind::Var(name) => Some(name),
            ExpressionKind::Property { lhs, .. } => match &lhs.kind {
                ExpressionKind::Var(name) => Some(name),
                _ => None,
            },
            _ => None,
        };
        match name.and_then(|name| self.resolver.resolve(name)) {
            Some(Binding::Val(val)) => {
                if mutable && !val.is_mutable {
                    self.error(expression.location, DiagnosticKind::ValNotMutable);
                }
            }
            _ => self.error(expression.location, DiagnosticKind::NotAnAddressableValue),
        }
    }

    fn infer_call(
        &mut self,
        expression: &'a Expression,
        callee: &'a Expression,
        type_args: Option<&'a [TypeAnnotation]>,
        args: &'a [Expression],
    ) -> CheckResult<Type> {
        let callee_type = match &callee.kind {
            ExpressionKind::Property { lhs, property } => {
                if let Some(ty) = self.expression_types.get(&callee.location) {
                    ty.clone()
                } else {
                    let ty = self.infer_property(callee, lhs, property, type_args)?;
                    self.expression_types.insert(callee.location, ty.clone());
                    ty
                }
            }
            _ => self.infer_expression(callee)?,
        };
        let function_type = match &callee_type {
            Type::Function(function) => Some((**function).clone()),
            Type::Ptr { to, .. } => to.as_function().cloned(),
            _ => None,
        };
        let function_type = match function_type {
            Some(function_type) => function_type,
            None => {
                if !callee_type.is_error() {
                    self.error(callee.location, DiagnosticKind::TypeNotCallable(callee_type));
                }
                for arg in type_args.unwrap_or_default() {
                    self.infer_annotation(arg)?;
                }
                for arg in args {
                    self.infer_expression(arg)?;
                }
                return Ok(Type::Error);
            }
        };
        self.check_call(expression, Some(callee), &function_type, type_args, args)
    }

    /// Checks arguments against a (possibly generic) function type and
    /// records the type arguments and implementations chosen for the call.
    fn check_call(
        &mut self,
        expression: &'a Expression,
        callee: Option<&'a Expression>,
        function_type: &FunctionType,
        type_args: Option<&'a [TypeAnnotation]>,
        args: &'a [Expression],
    ) -> CheckResult<Type> {
        let mut substitution = Substitution::new();
        for param in function_type.type_params.iter().flatten() {
            let instance = self.make_generic_instance(param, expression.location);
            substitution.insert(param.location, instance);
        }
        if let Some(type_args) = type_args {
            let mut explicit = Vec::with_capacity(type_args.len());
            for arg in type_args {
                explicit.push(self.infer_annotation(arg)?);
            }
            let expected = function_type.type_params.as_ref().map_or(0, Vec::len);
            if explicit.len() > expected {
                self.error(expression.location, DiagnosticKind::TooManyTypeArgs);
            } else if explicit.len() < expected {
                self.error(expression.location, DiagnosticKind::TooFewTypeArgs);
            }
            for (param, ty) in function_type.type_params.iter().flatten().zip(explicit) {
                substitution.insert(param.location, ty);
            }
        }

        let mut receiver_expression = None;
        if let Some(receiver) = &function_type.receiver {
            let Some(ExpressionKind::Property { lhs, .. }) = callee.map(|callee| &callee.kind) else {
                return Err(InternalError::ReceiverWithoutProperty(expression.location));
            };
            self.check_expression(&receiver.apply_substitution(&substitution, None), lhs)?;
            receiver_expression = Some(&**lhs);
        }

        let params: Vec<Type> = function_type
            .from
            .iter()
            .map(|param| param.apply_substitution(&substitution, None))
            .collect();
        for (param, arg) in params.iter().zip(args) {
            self.check_expression(param, arg)?;
        }
        let required = params.len();
        if args.len() < required {
            self.error(expression.location, DiagnosticKind::MissingArgs { required });
        } else if args.len() > required {
            self.error(expression.location, DiagnosticKind::TooManyArgs { required });
            for arg in &args[required..] {
                self.infer_expression(arg)?;
            }
        }

        if let Some(receiver) = receiver_expression {
            self.apply_instantiations_to_expression(receiver)?;
        }
        for arg in args {
            self.apply_instantiations_to_expression(arg)?;
        }

        if let Some(type_params) = &function_type.type_params {
            let mut resolved = Vec::with_capacity(type_params.len());
            for param in type_params {
                let ty = substitution.get(&param.location).cloned().unwrap_or(Type::Error);
                resolved.push(self.apply_instantiations(&ty));
            }
            if let Some(callee) = callee {
                self.type_arguments.insert(callee.location, resolved.clone());
            }
            self.type_arguments.insert(expression.location, resolved);
        }

        if !function_type.constraints.is_empty() {
            let mut bindings = Vec::with_capacity(function_type.constraints.len());
            for constraint in &function_type.constraints {
                let Some(param_type) = substitution.get(&constraint.param.location) else {
                    continue;
                };
                // Unsolved parameters were already reported as uninferrable.
                let Some(resolved) = self.instantiations.resolved(param_type) else {
                    continue;
                };
                let ty = self.apply_instantiations(&resolved);
                if ty.is_error() {
                    continue;
                }
                let mut interface_args = Vec::with_capacity(constraint.args.len());
                for arg in &constraint.args {
                    let arg = arg.apply_substitution(&substitution, None);
                    interface_args.push(self.apply_instantiations(&arg));
                }
                match self.get_interface_implementation(
                    &ty,
                    expression.location,
                    &constraint.interface,
                    &interface_args,
                )? {
                    Some(binding) => bindings.push(binding),
                    None => self.error(expression.location, DiagnosticKind::NoImplementationFound),
                }
            }
            self.impl_bindings.insert(expression.location, bindings);
        }

        let to = function_type.to.apply_substitution(&substitution, None);
        Ok(self.apply_instantiations(&to))
    }

    fn infer_new(
        &mut self,
        expression: &'a Expression,
        path: &'a QualifiedPath,
        type_args: Option<&'a [TypeAnnotation]>,
        args: &'a [Expression],
    ) -> CheckResult<Type> {
        let Some(Declaration::Struct(def)) = self.resolver.resolve_declaration(path) else {
            self.error(path.location, DiagnosticKind::InvalidNewExpression);
            for arg in type_args.unwrap_or_default() {
                self.infer_annotation(arg)?;
            }
            for arg in args {
                self.infer_expression(arg)?;
            }
            return Ok(Type::Error);
        };
        self.declare_struct(def)?;
        let Type::Function(constructor) = self.binder_type(&def.binder)? else {
            return Ok(Type::Error);
        };
        let instance = self.check_call(expression, None, &constructor, type_args, args)?;
        Ok(Type::ptr(instance, true))
    }

    fn infer_match(
        &mut self,
        expression: &'a Expression,
        value: &'a Expression,
        arms: &'a [MatchArm],
    ) -> CheckResult<Type> {
        let value_type = self.infer_expression(value)?;
        let (constructor, type_args) = match &value_type {
            Type::Constructor(constructor) => (Some(constructor), &[][..]),
            Type::Application { callee, args } => (Some(callee), args.as_slice()),
            _ => (None, &[][..]),
        };
        let declaration = match constructor.and_then(|ctor| self.resolver.resolve_type_variable(&ctor.binder)) {
            Some(TypeBinding::Enum(def)) => def,
            _ => return self.infer_match_on_non_enum(value, &value_type, arms),
        };
        let substitution: Substitution = declaration
            .type_params
            .iter()
            .flatten()
            .zip(type_args)
            .map(|(param, arg)| (param.binder.location, arg.clone()))
            .collect();

        let mut matched = HashSet::new();
        let mut has_catch_all = false;
        let mut arm_type: Option<Type> = None;
        for arm in arms {
            let pattern = &arm.pattern;
            if has_catch_all {
                self.error(pattern.location, DiagnosticKind::UnreachablePattern);
            }
            match &pattern.kind {
                PatternKind::DotName { identifier, params } => {
                    let case = declaration
                        .cases
                        .iter()
                        .find(|case| case.name.name == identifier.name);
                    match case {
                        None => self.error(identifier.location, DiagnosticKind::UnboundPattern),
                        Some(case) => {
                            if !matched.insert(case.name.name.as_str()) && !has_catch_all {
                                self.error(pattern.location, DiagnosticKind::UnreachablePattern);
                            }
                            if case.params.len() != params.len() {
                                self.error(pattern.location, DiagnosticKind::PatternParamMismatch);
                            }
                        }
                    }
                    for (index, param) in params.iter().enumerate() {
                        match &param.kind {
                            PatternKind::Name(binder) => {
                                let ty = match case.and_then(|case| case.params.get(index)) {
                                    Some(annotation) => self
                                        .infer_annotation(annotation)?
                                        .apply_substitution(&substitution, None),
                                    None => Type::Error,
                                };
                                self.bind_value(binder, ty);
                            }
                            PatternKind::Wildcard => {}
                            PatternKind::DotName { .. } | PatternKind::Else => {
                                self.error(param.location, DiagnosticKind::NestedPatternsNotAllowed);
                            }
                        }
                    }
                }
                PatternKind::Name(binder) => {
                    self.bind_value(binder, value_type.clone());
                    has_catch_all = true;
                }
                PatternKind::Wildcard | PatternKind::Else => has_catch_all = true,
            }
            match &arm_type {
                Some(expected) => {
                    let expected = expected.clone();
                    self.check_expression(&expected, &arm.expression)?;
                }
                None => arm_type = Some(self.infer_expression(&arm.expression)?),
            }
        }

        let exhaustive = has_catch_all
            || declaration
                .cases
                .iter()
                .all(|case| matched.contains(case.name.name.as_str()));
        if !exhaustive {
            self.error(expression.location, DiagnosticKind::NonExhaustivePatterns);
        }
        Ok(arm_type.unwrap_or(Type::Error))
    }

    fn infer_match_on_non_enum(
        &mut self,
        value: &'a Expression,
        value_type: &Type,
        arms: &'a [MatchArm],
    ) -> CheckResult<Type> {
        if !value_type.is_error() {
            self.error(value.location, DiagnosticKind::ExpectedEnumType);
        }
        for arm in arms {
            match &arm.pattern.kind {
                PatternKind::Name(binder) => self.bind_value(binder, value_type.clone()),
                PatternKind::DotName { params, .. } => {
                    for param in params {
                        if let PatternKind::Name(binder) = &param.kind {
                            self.bind_value(binder, Type::Error);
                        }
                    }
                }
                PatternKind::Wildcard | PatternKind::Else => {}
            }
            self.infer_expression(&arm.expression)?;
        }
        Ok(Type::Error)
    }
}
