use super::*;

impl<'a, R: Resolver<'a>, D: DiagnosticReporter> Checker<'a, R, D> {
    /// Checks a declaration once; later calls for the same location return
    /// immediately, including re-entrant ones.
    pub fn check_declaration(&mut self, declaration: &'a Declaration) -> CheckResult<()> {
        if !self.checked_declarations.insert(declaration.location()) {
            return Ok(());
        }
        debug!(at = %declaration.location(), "checking declaration");
        match declaration {
            Declaration::Error(_) => Ok(()),
            Declaration::ImportAs(import) => {
                if self.resolver.resolve_source_file(&import.module_path).is_none() {
                    self.error(import.module_path.location, DiagnosticKind::NoSuchModule);
                }
                Ok(())
            }
            Declaration::FunctionDef(def) => self.check_function_def(def),
            Declaration::ExternFunctionDef(def) => self.type_of_extern_function_def(def).map(|_| ()),
            Declaration::Struct(def) => self.declare_struct(def),
            Declaration::Enum(def) => self.check_enum(def),
            Declaration::Interface(def) => self.check_interface(def),
            Declaration::Implementation(def) => self.check_implementation(def),
            Declaration::Const(def) => self.declare_global_const(def),
        }
    }

    fn check_function_def(&mut self, def: &'a FunctionDef) -> CheckResult<()> {
        let function_type = self.type_of_function_signature(&def.signature)?;
        self.with_return_type(function_type.to, |checker| checker.check_block(&def.body))
    }

    pub(super) fn type_of_function_signature(
        &mut self,
        signature: &'a FunctionSignature,
    ) -> CheckResult<FunctionType> {
        if let Some(Type::Function(cached)) = self.binder_types.get(&signature.name.location) {
            return Ok((**cached).clone());
        }
        let mut from = Vec::with_capacity(signature.params.len());
        for param in &signature.params {
            let ty = match &param.annotation {
                Some(annotation) => self.infer_annotation(annotation)?,
                None => Type::Error,
            };
            self.bind_value(&param.binder, ty.clone());
            from.push(ty);
        }
        let receiver = match &signature.this_param {
            Some(this_param) => Some(self.infer_annotation(&this_param.annotation)?),
            None => None,
        };
        let to = self.infer_annotation(&signature.return_type)?;
        let mut constraints = Vec::new();
        for param in signature.type_params.iter().flatten() {
            let Some(bound) = &param.bound else {
                continue;
            };
            if let Some((interface, args)) = self.check_interface_ref(bound)? {
                constraints.push(Constraint {
                    interface,
                    args,
                    param: param.binder.clone(),
                });
            }
        }
        let function_type = FunctionType {
            receiver,
            type_params: signature
                .type_params
                .as_ref()
                .map(|params| params.iter().map(|param| param.binder.clone()).collect()),
            from,
            to,
            constraints,
        };
        self.bind_value(&signature.name, Type::function(function_type.clone()));
        Ok(function_type)
    }

    /// Validates that the reference names an interface and infers its type
    /// arguments.
    fn check_interface_ref(
        &mut self,
        interface_ref: &'a InterfaceRef,
    ) -> CheckResult<Option<(QualifiedName, Vec<Type>)>> {
        let mut args = Vec::new();
        for arg in interface_ref.type_args.iter().flatten() {
            args.push(self.infer_annotation(arg)?);
        }
        match self.resolver.resolve_declaration(&interface_ref.path) {
            Some(Declaration::Interface(def)) => {
                Ok(Some((self.resolver.qualified_name(&def.name), args)))
            }
            _ => {
                self.error(interface_ref.path.location, DiagnosticKind::NotAnInterface);
                Ok(None)
            }
        }
    }

    pub(super) fn type_of_extern_function_def(&mut self, def: &'a ExternFunctionDef) -> CheckResult<Type> {
        if let Some(cached) = self.binder_types.get(&def.binder.location) {
            return Ok(cached.clone());
        }
        let mut from = Vec::with_capacity(def.param_types.len());
        for param in &def.param_types {
            from.push(self.infer_annotation(param)?);
        }
        let ty = Type::function(FunctionType {
            receiver: None,
            type_params: None,
            from,
            to: self.infer_annotation(&def.return_type)?,
            constraints: Vec::new(),
        });
        self.bind_value(&def.binder, ty.clone());
        Ok(ty)
    }

    /// Binds the struct name to its constructor function type.
    pub(super) fn declare_struct(&mut self, def: &'a StructDef) -> CheckResult<()> {
        if self.binder_types.contains_key(&def.binder.location) {
            return Ok(());
        }
        let mut seen = HashSet::new();
        let mut from = Vec::with_capacity(def.fields.len());
        for field in &def.fields {
            if !seen.insert(field.binder.name.as_str()) {
                self.error(field.binder.location, DiagnosticKind::DuplicateFieldName);
            }
            from.push(self.infer_annotation(&field.annotation)?);
        }
        let constructor_type = Type::function(FunctionType {
            receiver: None,
            type_params: def
                .type_params
                .as_ref()
                .map(|params| params.iter().map(|param| param.binder.clone()).collect()),
            from,
            to: self.type_of_struct_instance(def),
            constraints: Vec::new(),
        });
        self.bind_value(&def.binder, constructor_type);
        Ok(())
    }

    pub(super) fn declare_global_const(&mut self, def: &'a ConstDef) -> CheckResult<()> {
        if self.binder_types.contains_key(&def.name.location) {
            return Ok(());
        }
        // A self-referential initializer sees `Error` for the constant.
        self.bind_value(&def.name, Type::Error);
        let ty = self.infer_expression(&def.initializer)?;
        if !matches!(ty, Type::CInt | Type::Bool | Type::Ptr { .. } | Type::Error) {
            self.error(def.initializer.location, DiagnosticKind::NotAConst);
        }
        self.bind_value(&def.name, ty);
        Ok(())
    }

    fn check_enum(&mut self, def: &'a EnumDef) -> CheckResult<()> {
        let mut names = HashSet::new();
        for case in &def.cases {
            for param in &case.params {
                self.infer_annotation(param)?;
            }
            if !names.insert(case.name.name.as_str()) {
                self.error(case.name.location, DiagnosticKind::DuplicateVariantName);
            }
        }
        Ok(())
    }

    /// A payload-less case is a value of the enum type; a case with
    /// parameters is a function producing one.
    pub(super) fn type_of_enum_constructor(&mut self, def: &'a EnumDef, case: &'a EnumCase) -> CheckResult<Type> {
        let instance = self.type_of_enum_instance(def);
        if case.params.is_empty() {
            return Ok(match instance {
                Type::Application { callee, .. } => Type::Constructor(callee),
                other => other,
            });
        }
        let mut from = Vec::with_capacity(case.params.len());
        for param in &case.params {
            from.push(self.infer_annotation(param)?);
        }
        Ok(Type::function(FunctionType {
            receiver: None,
            type_params: def
                .type_params
                .as_ref()
                .map(|params| params.iter().map(|param| param.binder.clone()).collect()),
            from,
            to: instance,
            constraints: Vec::new(),
        }))
    }

    fn check_interface(&mut self, def: &'a InterfaceDef) -> CheckResult<()> {
        let name = self.resolver.qualified_name(&def.name);
        self.interface_decls.insert(name, def);
        for member in &def.members {
            self.type_of_function_signature(member)?;
        }
        Ok(())
    }

    fn check_implementation(&mut self, def: &'a ImplementationDef) -> CheckResult<()> {
        let interface = self.check_interface_ref(&def.interface_ref)?;
        self.infer_annotation(&def.for_type)?;
        if interface.is_none() {
            return Ok(());
        }
        for member in &def.members {
            self.check_declaration(member)?;
        }
        Ok(())
    }
}
