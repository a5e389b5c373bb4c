use super::*;

impl<'a, R: Resolver<'a>, D: DiagnosticReporter> Checker<'a, R, D> {
    pub(super) fn check_block(&mut self, block: &'a Block) -> CheckResult<()> {
        for member in &block.members {
            self.check_block_member(member)?;
        }
        Ok(())
    }

    fn check_block_member(&mut self, member: &'a BlockMember) -> CheckResult<()> {
        match member {
            BlockMember::Expression(expression) => self.infer_expression(expression).map(|_| ()),
            BlockMember::Statement(statement) => self.check_statement(statement),
        }
    }

    fn check_statement(&mut self, statement: &'a Statement) -> CheckResult<()> {
        if !self.checked_statements.insert(statement.location) {
            return Ok(());
        }
        match &statement.kind {
            StatementKind::Return(value) => {
                let return_type = self
                    .return_types
                    .last()
                    .cloned()
                    .ok_or(InternalError::ReturnOutsideFunction(statement.location))?;
                match value {
                    Some(value) => self.check_expression(&return_type, value),
                    None => self.check_assignability(statement.location, &Type::Void, &return_type),
                }
            }
            StatementKind::Val(val) => self.check_val_statement(val),
            StatementKind::While { condition, body } => {
                self.check_expression(&Type::Bool, condition)?;
                self.check_block(body)
            }
            StatementKind::If {
                condition,
                if_true,
                if_false,
            } => {
                self.check_expression(&Type::Bool, condition)?;
                self.check_block(if_true)?;
                match if_false {
                    Some(if_false) => self.check_block(if_false),
                    None => Ok(()),
                }
            }
            StatementKind::LocalAssignment { name, value } => self.check_local_assignment(name, value),
            StatementKind::MemberAssignment { lhs, value } => self.check_member_assignment(lhs, value),
            StatementKind::PointerAssignment { pointer, value } => {
                self.check_pointer_assignment(statement, pointer, value)
            }
            StatementKind::Defer(member) => {
                self.check_block_member(member)?;
                if let BlockMember::Statement(Statement {
                    kind: StatementKind::Val(_) | StatementKind::Return(_),
                    ..
                }) = &**member
                {
                    self.error(statement.location, DiagnosticKind::StatementNotAllowedInDefer);
                }
                Ok(())
            }
            StatementKind::Error => Ok(()),
        }
    }

    pub(super) fn check_val_statement(&mut self, val: &'a ValStatement) -> CheckResult<()> {
        if !self.checked_vals.insert(val.location) {
            return Ok(());
        }
        let ty = match &val.annotation {
            Some(annotation) => {
                let ty = self.infer_annotation(annotation)?;
                self.check_expression(&ty, &val.rhs)?;
                ty
            }
            None => self.infer_expression(&val.rhs)?,
        };
        self.bind_value(&val.binder, ty);
        Ok(())
    }

    fn check_local_assignment(&mut self, name: &'a Identifier, value: &'a Expression) -> CheckResult<()> {
        match self.resolver.resolve(name) {
            Some(Binding::Val(val)) => {
                self.check_val_statement(val)?;
                if !val.is_mutable {
                    self.error(name.location, DiagnosticKind::ValNotMutable);
                }
                let ty = self.binder_type(&val.binder)?;
                self.check_expression(&ty, value)
            }
            Some(_) => {
                self.error(name.location, DiagnosticKind::NotAnAddressableValue);
                self.infer_expression(value).map(|_| ())
            }
            None => {
                self.error(name.location, DiagnosticKind::UnboundVariable);
                self.infer_expression(value).map(|_| ())
            }
        }
    }

    fn check_member_assignment(&mut self, lhs: &'a Expression, value: &'a Expression) -> CheckResult<()> {
        let ExpressionKind::Property { lhs: target, property } = &lhs.kind else {
            self.error(lhs.location, DiagnosticKind::NotAStructField);
            return self.infer_expression(value).map(|_| ());
        };
        let binding = self.struct_field_binding(target, property)?;
        let (field_type, is_mutable) = match &binding {
            Some(field_binding @ PropertyBinding::StructField { .. }) => (
                field_binding.ty().clone(),
                field_binding.field().is_some_and(|field| field.is_mutable),
            ),
            Some(PropertyBinding::StructFieldPointer {
                ty: Type::Ptr { to, is_mutable },
                ..
            }) => ((**to).clone(), *is_mutable),
            _ => {
                self.error(property.location, DiagnosticKind::NotAStructField);
                return self.infer_expression(value).map(|_| ());
            }
        };
        if let Some(binding) = binding {
            self.expression_types.insert(lhs.location, binding.ty().clone());
            self.property_bindings.insert(lhs.location, binding);
        }
        if !is_mutable {
            self.error(property.location, DiagnosticKind::StructFieldNotMutable);
            return self.infer_expression(value).map(|_| ());
        }
        self.check_expression(&field_type, value)
    }

    fn check_pointer_assignment(
        &mut self,
        statement: &'a Statement,
        pointer: &'a Expression,
        value: &'a Expression,
    ) -> CheckResult<()> {
        match self.infer_expression(pointer)? {
            Type::Error => self.infer_expression(value).map(|_| ()),
            Type::Ptr { to, is_mutable } => {
                if !is_mutable {
                    self.error(statement.location, DiagnosticKind::ValNotMutable);
                }
                self.check_expression(&to, value)
            }
            other => {
                self.error(pointer.location, DiagnosticKind::NotAPointerType(other));
                self.infer_expression(value).map(|_| ())
            }
        }
    }
}
