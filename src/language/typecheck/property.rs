use super::*;

/// Resolved meaning of an `a.b` expression.
#[derive(Clone, Debug)]
pub enum PropertyBinding<'a> {
    Global {
        ty: Type,
        binding: Binding<'a>,
    },
    StructField {
        ty: Type,
        declaration: &'a StructDef,
        member_index: usize,
    },
    /// Field reached through a pointer; `ty` is a pointer to the field.
    StructFieldPointer {
        ty: Type,
        declaration: &'a StructDef,
        member_index: usize,
    },
    /// Top-level function declared with a `this` parameter.
    GlobalExtensionFunction {
        ty: Type,
        def: &'a FunctionDef,
    },
    /// Interface member reached through a matching implementation.
    InterfaceExtensionFunction {
        ty: Type,
        implementation: ImplementationBinding<'a>,
        member_index: usize,
    },
}

impl<'a> PropertyBinding<'a> {
    pub fn ty(&self) -> &Type {
        match self {
            PropertyBinding::Global { ty, .. }
            | PropertyBinding::StructField { ty, .. }
            | PropertyBinding::StructFieldPointer { ty, .. }
            | PropertyBinding::GlobalExtensionFunction { ty, .. }
            | PropertyBinding::InterfaceExtensionFunction { ty, .. } => ty,
        }
    }

    pub fn field(&self) -> Option<&'a StructField> {
        match self {
            PropertyBinding::StructField {
                declaration,
                member_index,
                ..
            }
            | PropertyBinding::StructFieldPointer {
                declaration,
                member_index,
                ..
            } => declaration.fields.get(*member_index),
            _ => None,
        }
    }
}

/// Where the implementation satisfying an interface constraint comes from.
#[derive(Clone, Copy, Debug)]
pub enum ImplementationBinding<'a> {
    GlobalImpl(&'a ImplementationDef),
    /// The bound declared on a type parameter of the enclosing function.
    TypeBound {
        interface_ref: &'a InterfaceRef,
        signature: &'a FunctionSignature,
        type_param_index: usize,
    },
}

impl<'a> ImplementationBinding<'a> {
    pub fn interface_ref(&self) -> &'a InterfaceRef {
        match self {
            ImplementationBinding::GlobalImpl(def) => &def.interface_ref,
            ImplementationBinding::TypeBound { interface_ref, .. } => interface_ref,
        }
    }
}

impl<'a, R: Resolver<'a>, D: DiagnosticReporter> Checker<'a, R, D> {
    pub(super) fn get_property_binding(
        &mut self,
        expression: &'a Expression,
        lhs: &'a Expression,
        property: &'a Identifier,
        type_args: Option<&'a [TypeAnnotation]>,
    ) -> CheckResult<Option<PropertyBinding<'a>>> {
        if let Some(binding) = self.property_bindings.get(&expression.location) {
            return Ok(Some(binding.clone()));
        }
        let binding = self.compute_property_binding(expression, lhs, property, type_args)?;
        if let Some(binding) = &binding {
            self.property_bindings
                .insert(expression.location, binding.clone());
        }
        Ok(binding)
    }

    fn compute_property_binding(
        &mut self,
        expression: &'a Expression,
        lhs: &'a Expression,
        property: &'a Identifier,
        type_args: Option<&'a [TypeAnnotation]>,
    ) -> CheckResult<Option<PropertyBinding<'a>>> {
        if let Some(binding) = self.resolver.resolve_module_property(expression) {
            let ty = self.infer_binding(binding)?;
            return Ok(Some(PropertyBinding::Global { ty, binding }));
        }
        let lhs_type = self.infer_expression(lhs)?;
        if let Some(binding) = self.struct_field_binding_for_type(&lhs_type, property)? {
            return Ok(Some(binding));
        }
        if let Some(binding) = self.global_extension_function_binding(expression, &lhs_type, property)? {
            return Ok(Some(binding));
        }
        // Generic interface methods are not supported.
        if type_args.is_some() {
            return Ok(None);
        }
        self.interface_property_binding(expression, &lhs_type, property)
    }

    pub(super) fn struct_field_binding(
        &mut self,
        lhs: &'a Expression,
        property: &Identifier,
    ) -> CheckResult<Option<PropertyBinding<'a>>> {
        let lhs_type = self.infer_expression(lhs)?;
        self.struct_field_binding_for_type(&lhs_type, property)
    }

    fn struct_field_binding_for_type(
        &mut self,
        lhs_type: &Type,
        property: &Identifier,
    ) -> CheckResult<Option<PropertyBinding<'a>>> {
        match lhs_type {
            Type::Application { callee, args } => {
                self.struct_field_binding_for_constructor(callee, Some(args), property)
            }
            Type::Constructor(constructor) => {
                self.struct_field_binding_for_constructor(constructor, None, property)
            }
            Type::Ptr { to, is_mutable } => {
                let binding = match self.struct_field_binding_for_type(to, property)? {
                    Some(PropertyBinding::StructField {
                        ty,
                        declaration,
                        member_index,
                    }) => PropertyBinding::StructFieldPointer {
                        ty: Type::ptr(
                            ty,
                            declaration.fields[member_index].is_mutable && *is_mutable,
                        ),
                        declaration,
                        member_index,
                    },
                    _ => return Ok(None),
                };
                Ok(Some(binding))
            }
            _ => Ok(None),
        }
    }

    fn struct_field_binding_for_constructor(
        &mut self,
        constructor: &TypeConstructor,
        type_args: Option<&[Type]>,
        property: &Identifier,
    ) -> CheckResult<Option<PropertyBinding<'a>>> {
        let Some(TypeBinding::Struct(declaration)) =
            self.resolver.resolve_type_variable(&constructor.binder)
        else {
            return Ok(None);
        };
        let Some(member_index) = declaration
            .fields
            .iter()
            .position(|field| field.binder.name == property.name)
        else {
            return Ok(None);
        };
        let field_type = self.infer_annotation(&declaration.fields[member_index].annotation)?;
        let substitution: Substitution = declaration
            .type_params
            .iter()
            .flatten()
            .enumerate()
            .map(|(index, param)| {
                let arg = type_args
                    .and_then(|args| args.get(index))
                    .cloned()
                    .unwrap_or(Type::Error);
                (param.binder.location, arg)
            })
            .collect();
        Ok(Some(PropertyBinding::StructField {
            ty: field_type.apply_substitution(&substitution, None),
            declaration,
            member_index,
        }))
    }

    fn global_extension_function_binding(
        &mut self,
        expression: &'a Expression,
        lhs_type: &Type,
        property: &Identifier,
    ) -> CheckResult<Option<PropertyBinding<'a>>> {
        let defs = self
            .resolver
            .extension_defs_in_scope(property.location, &property.name);
        for def in defs {
            let Some(this_param) = &def.signature.this_param else {
                continue;
            };
            let this_type = self.infer_annotation(&this_param.annotation)?;
            if self.is_assignable_to(lhs_type, &this_type)? {
                let ty = Type::function(self.type_of_function_signature(&def.signature)?);
                return Ok(Some(PropertyBinding::GlobalExtensionFunction { ty, def }));
            }
            if let Some(type_params) = &def.signature.type_params {
                let mut substitution = Substitution::new();
                for param in type_params {
                    let instance = self.make_generic_instance(&param.binder, expression.location);
                    substitution.insert(param.binder.location, instance);
                }
                let this_instance = this_type.apply_substitution(&substitution, None);
                if self.is_assignable_to(lhs_type, &this_instance)? {
                    let ty = Type::function(self.type_of_function_signature(&def.signature)?);
                    return Ok(Some(PropertyBinding::GlobalExtensionFunction { ty, def }));
                }
            }
        }
        Ok(None)
    }

    fn interface_property_binding(
        &mut self,
        expression: &'a Expression,
        lhs_type: &Type,
        property: &Identifier,
    ) -> CheckResult<Option<PropertyBinding<'a>>> {
        let implementations = self.implementation_bindings_for_type(lhs_type, expression.location)?;
        for implementation in implementations {
            let interface_ref = implementation.interface_ref();
            let Some(Declaration::Interface(interface)) =
                self.resolver.resolve_declaration(&interface_ref.path)
            else {
                continue;
            };
            let mut implementation_args = Vec::new();
            for arg in interface_ref.type_args.iter().flatten() {
                implementation_args.push(self.infer_annotation(arg)?);
            }
            let substitution: Substitution = interface
                .type_params
                .iter()
                .flatten()
                .map(|param| param.binder.location)
                .zip(implementation_args)
                .collect();
            for (member_index, member) in interface.members.iter().enumerate() {
                // generic interface methods are not supported
                if member.name.name != property.name || member.type_params.is_some() {
                    continue;
                }
                let function_type = self.type_of_function_signature(member)?;
                if function_type.receiver.is_none() {
                    continue;
                }
                let ty = Type::function(function_type.apply_substitution(&substitution, Some(lhs_type)));
                return Ok(Some(PropertyBinding::InterfaceExtensionFunction {
                    ty,
                    implementation,
                    member_index,
                }));
            }
        }
        Ok(None)
    }

    /// Implementations in scope whose `for` type accepts `ty`, plus the
    /// bound of `ty` itself when it is a bounded type parameter.
    fn implementation_bindings_for_type(
        &mut self,
        ty: &Type,
        location: SourceLocation,
    ) -> CheckResult<Vec<ImplementationBinding<'a>>> {
        let mut bindings = Vec::new();
        for implementation in self.resolver.implementations_in_scope(location) {
            if !matches!(
                self.resolver.resolve_declaration(&implementation.interface_ref.path),
                Some(Declaration::Interface(_))
            ) {
                continue;
            }
            let for_type = self.infer_annotation(&implementation.for_type)?;
            if self.is_assignable_to(ty, &for_type)? {
                bindings.push(ImplementationBinding::GlobalImpl(implementation));
            }
        }
        if let Type::ParamRef(binder) = ty {
            if let Some(TypeBinding::TypeParam(TypeParam {
                bound: Some(interface_ref),
                ..
            })) = self.resolver.resolve_type_variable(binder)
            {
                let (signature, type_param_index) = self
                    .resolver
                    .type_param_site(binder)
                    .ok_or_else(|| InternalError::UnknownTypeParamSite(binder.name.clone()))?;
                bindings.push(ImplementationBinding::TypeBound {
                    interface_ref,
                    signature,
                    type_param_index,
                });
            }
        }
        Ok(bindings)
    }

    /// The single implementation of `interface[interface_args]` for `ty`
    /// visible at `location`.
    pub(super) fn get_interface_implementation(
        &mut self,
        ty: &Type,
        location: SourceLocation,
        interface: &QualifiedName,
        interface_args: &[Type],
    ) -> CheckResult<Option<ImplementationBinding<'a>>> {
        let Some(Declaration::Interface(expected_interface)) =
            self.resolver.resolve_qualified_name(interface)
        else {
            return Ok(None);
        };
        let mut found = Vec::new();
        for implementation in self.implementation_bindings_for_type(ty, location)? {
            let interface_ref = implementation.interface_ref();
            let Some(Declaration::Interface(actual_interface)) =
                self.resolver.resolve_declaration(&interface_ref.path)
            else {
                continue;
            };
            if actual_interface.location != expected_interface.location {
                continue;
            }
            let mut implementation_args = Vec::new();
            for arg in interface_ref.type_args.iter().flatten() {
                implementation_args.push(self.infer_annotation(arg)?);
            }
            if implementation_args.len() != interface_args.len() {
                continue;
            }
            let mut args_match = true;
            for (actual, expected) in implementation_args.iter().zip(interface_args) {
                if !self.is_assignable_to(actual, expected)? {
                    args_match = false;
                    break;
                }
            }
            if args_match {
                found.push(implementation);
            }
        }
        if found.len() > 1 {
            return Err(InternalError::OverlappingImplementations {
                interface: interface.clone(),
                ty: ty.clone(),
            });
        }
        Ok(found.pop())
    }
}
