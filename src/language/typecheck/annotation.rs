use super::*;

impl<'a, R: Resolver<'a>, D: DiagnosticReporter> Checker<'a, R, D> {
    pub(super) fn infer_annotation(&mut self, annotation: &'a TypeAnnotation) -> CheckResult<Type> {
        self.infer_annotation_with(annotation, false)
    }

    fn infer_annotation_with(
        &mut self,
        annotation: &'a TypeAnnotation,
        allow_incomplete: bool,
    ) -> CheckResult<Type> {
        if let Some(ty) = self.annotation_types.get(&annotation.location) {
            return Ok(ty.clone());
        }
        let ty = match &annotation.kind {
            TypeAnnotationKind::Error => Type::Error,
            TypeAnnotationKind::Var(name) => match name.name.as_str() {
                "Void" => Type::Void,
                "Bool" => Type::Bool,
                "Byte" => Type::Byte,
                "CInt" => Type::CInt,
                "Size" => Type::Size,
                _ => match self.resolve_type_variable(name) {
                    Some(ty) => ty,
                    None => {
                        self.error(
                            annotation.location,
                            DiagnosticKind::UnboundType(name.name.clone()),
                        );
                        Type::Error
                    }
                },
            },
            TypeAnnotationKind::Ptr(to) => Type::ptr(self.infer_annotation(to)?, false),
            TypeAnnotationKind::MutPtr(to) => Type::ptr(self.infer_annotation(to)?, true),
            TypeAnnotationKind::Application { callee, args } => {
                let callee_type = self.infer_annotation_with(callee, true)?;
                let mut arg_types = Vec::with_capacity(args.len());
                for arg in args {
                    arg_types.push(self.infer_annotation(arg)?);
                }
                self.apply_type_constructor(annotation.location, callee_type, arg_types)
            }
            TypeAnnotationKind::Qualified(path) => match self.resolver.resolve_declaration(path) {
                Some(Declaration::Struct(def)) => head_type(self.type_of_struct_instance(def)),
                Some(Declaration::Enum(def)) => head_type(self.type_of_enum_instance(def)),
                _ => {
                    let name = path.last().map(|ident| ident.name.clone()).unwrap_or_default();
                    self.error(annotation.location, DiagnosticKind::UnboundType(name));
                    Type::Error
                }
            },
            TypeAnnotationKind::Function { from, to } => {
                let mut params = Vec::with_capacity(from.len());
                for param in from {
                    params.push(self.infer_annotation(param)?);
                }
                Type::function(FunctionType {
                    receiver: None,
                    type_params: None,
                    from: params,
                    to: self.infer_annotation(to)?,
                    constraints: Vec::new(),
                })
            }
            TypeAnnotationKind::This => self.resolve_this_type(annotation.location),
            TypeAnnotationKind::Union(members) => {
                let mut types = Vec::with_capacity(members.len());
                for member in members {
                    types.push(self.infer_annotation(member)?);
                }
                Type::UntaggedUnion(types)
            }
        };
        if let Type::Constructor(TypeConstructor {
            params: Some(params),
            ..
        }) = &ty
        {
            if !allow_incomplete {
                self.error(annotation.location, DiagnosticKind::IncompleteType(params.len()));
            }
        }
        self.annotation_types.insert(annotation.location, ty.clone());
        Ok(ty)
    }

    /// `Ctor[args]` in annotation or expression position.
    pub(super) fn apply_type_constructor(
        &mut self,
        location: SourceLocation,
        callee: Type,
        args: Vec<Type>,
    ) -> Type {
        match callee {
            Type::Error => Type::Error,
            Type::Constructor(constructor) => {
                let expected = constructor.params.as_ref().map_or(0, Vec::len);
                if args.len() > expected {
                    self.error(location, DiagnosticKind::TooManyTypeArgs);
                    Type::Error
                } else if args.len() < expected {
                    self.error(location, DiagnosticKind::TooFewTypeArgs);
                    Type::Error
                } else {
                    Type::Application {
                        callee: constructor,
                        args,
                    }
                }
            }
            _ => {
                self.error(location, DiagnosticKind::TooManyTypeArgs);
                Type::Error
            }
        }
    }

    fn resolve_type_variable(&mut self, name: &Identifier) -> Option<Type> {
        let ty = match self.resolver.resolve_type_variable(name)? {
            TypeBinding::Struct(def) => head_type(self.type_of_struct_instance(def)),
            TypeBinding::Enum(def) => head_type(self.type_of_enum_instance(def)),
            TypeBinding::TypeParam(param) => Type::ParamRef(param.binder.clone()),
        };
        Some(ty)
    }

    fn resolve_this_type(&mut self, location: SourceLocation) -> Type {
        match self.resolver.enclosing_interface(location) {
            Some(interface) => Type::ThisRef(interface.location),
            None => {
                self.error(location, DiagnosticKind::UnboundThisType);
                Type::Error
            }
        }
    }

    /// The type of a value of this struct: the bare constructor, or the
    /// constructor applied to its own parameters when generic.
    pub fn type_of_struct_instance(&self, def: &StructDef) -> Type {
        self.instance_type(&def.binder, def.type_params.as_deref())
    }

    pub fn type_of_enum_instance(&self, def: &EnumDef) -> Type {
        self.instance_type(&def.name, def.type_params.as_deref())
    }

    fn instance_type(&self, binder: &Binder, type_params: Option<&[TypeParam]>) -> Type {
        let constructor = TypeConstructor {
            binder: binder.clone(),
            name: self.resolver.qualified_name(binder),
            params: type_params.map(|params| params.iter().map(|param| param.binder.clone()).collect()),
        };
        match type_params {
            Some(params) => Type::Application {
                args: params
                    .iter()
                    .map(|param| Type::ParamRef(param.binder.clone()))
                    .collect(),
                callee: constructor,
            },
            None => Type::Constructor(constructor),
        }
    }
}

/// Generic instance types name their bare constructor when written without
/// type arguments.
fn head_type(instance: Type) -> Type {
    match instance {
        Type::Application { callee, .. } => Type::Constructor(callee),
        other => other,
    }
}
