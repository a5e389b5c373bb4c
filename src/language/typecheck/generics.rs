use super::*;

/// Solutions for the unification slots created at generic call sites.
#[derive(Debug, Default)]
pub struct Instantiations {
    next_id: u64,
    solutions: HashMap<u64, Type>,
}

impl Instantiations {
    pub fn fresh(&mut self, binder: &Binder, call_location: SourceLocation) -> Type {
        self.next_id += 1;
        trace!(id = self.next_id, param = %binder.name, at = %call_location, "generic instance");
        Type::GenericInstance {
            binder: binder.clone(),
            id: self.next_id,
            call_location,
        }
    }

    pub fn solution(&self, id: u64) -> Option<&Type> {
        self.solutions.get(&id)
    }

    pub fn is_solved(&self, id: u64) -> bool {
        self.solutions.contains_key(&id)
    }

    pub(super) fn solve(&mut self, id: u64, ty: Type) -> CheckResult<()> {
        if self.solutions.contains_key(&id) {
            return Err(InternalError::InstanceSolvedTwice(id));
        }
        trace!(id, solution = %ty, "generic instance solved");
        self.solutions.insert(id, ty);
        Ok(())
    }

    /// Follows solved instances until reaching an unsolved instance or a
    /// non-instance type.
    pub fn shallow_resolve(&self, ty: &Type) -> Type {
        let mut current = ty;
        while let Type::GenericInstance { id, .. } = current {
            match self.solutions.get(id) {
                Some(solution) => current = solution,
                None => break,
            }
        }
        current.clone()
    }

    /// The type an instance currently stands for, or `None` while unsolved.
    pub fn resolved(&self, ty: &Type) -> Option<Type> {
        match self.shallow_resolve(ty) {
            Type::GenericInstance { .. } => None,
            other => Some(other),
        }
    }
}

impl<'a, R: Resolver<'a>, D: DiagnosticReporter> Checker<'a, R, D> {
    pub(super) fn make_generic_instance(&mut self, binder: &Binder, call_location: SourceLocation) -> Type {
        self.instantiations.fresh(binder, call_location)
    }

    /// Replaces every solved instance with its solution. Unsolved instances
    /// become `Error` and are reported once each.
    pub(super) fn apply_instantiations(&mut self, ty: &Type) -> Type {
        match ty {
            Type::Error
            | Type::Void
            | Type::Bool
            | Type::Byte
            | Type::CInt
            | Type::Size
            | Type::ParamRef(_)
            | Type::Constructor(_)
            | Type::ThisRef(_) => ty.clone(),
            Type::Ptr { to, is_mutable } => Type::ptr(self.apply_instantiations(to), *is_mutable),
            Type::Function(function) => {
                let receiver = function
                    .receiver
                    .as_ref()
                    .map(|receiver| self.apply_instantiations(receiver));
                let from = function
                    .from
                    .iter()
                    .map(|param| self.apply_instantiations(param))
                    .collect();
                let to = self.apply_instantiations(&function.to);
                let constraints = function
                    .constraints
                    .iter()
                    .map(|constraint| Constraint {
                        interface: constraint.interface.clone(),
                        args: constraint
                            .args
                            .iter()
                            .map(|arg| self.apply_instantiations(arg))
                            .collect(),
                        param: constraint.param.clone(),
                    })
                    .collect();
                Type::function(FunctionType {
                    receiver,
                    type_params: function.type_params.clone(),
                    from,
                    to,
                    constraints,
                })
            }
            Type::Application { callee, args } => Type::Application {
                callee: callee.clone(),
                args: args.iter().map(|arg| self.apply_instantiations(arg)).collect(),
            },
            Type::GenericInstance {
                binder,
                id,
                call_location,
            } => match self.instantiations.solution(*id).cloned() {
                Some(solution) => self.apply_instantiations(&solution),
                None => {
                    if self.reported_uninferrable.insert(*id) {
                        self.error(
                            *call_location,
                            DiagnosticKind::UninferrableTypeParam(binder.name.clone()),
                        );
                    }
                    Type::Error
                }
            },
            Type::UntaggedUnion(members) => Type::UntaggedUnion(
                members
                    .iter()
                    .map(|member| self.apply_instantiations(member))
                    .collect(),
            ),
        }
    }

    pub(super) fn apply_instantiations_to_expression(&mut self, expression: &'a Expression) -> CheckResult<()> {
        let ty = match self.expression_types.get(&expression.location) {
            Some(ty) => ty.clone(),
            None => self.infer_expression(expression)?,
        };
        let instance = self.apply_instantiations(&ty);
        self.expression_types.insert(expression.location, instance);
        Ok(())
    }
}
