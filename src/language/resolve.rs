use crate::language::{
    ast::*,
    span::{FileId, HasLocation, SourceLocation},
};
use std::collections::{BTreeSet, HashMap};

/// What a value identifier refers to.
#[derive(Clone, Copy, Debug)]
pub enum Binding<'a> {
    GlobalFunction(&'a FunctionDef),
    ExternFunction(&'a ExternFunctionDef),
    FunctionParam {
        signature: &'a FunctionSignature,
        param: &'a Param,
    },
    Val(&'a ValStatement),
    Struct(&'a StructDef),
    GlobalConst(&'a ConstDef),
    EnumCaseConstructor {
        declaration: &'a EnumDef,
        case: &'a EnumCase,
    },
    Pattern(&'a Binder),
}

/// What a type identifier refers to.
#[derive(Clone, Copy, Debug)]
pub enum TypeBinding<'a> {
    Struct(&'a StructDef),
    Enum(&'a EnumDef),
    TypeParam(&'a TypeParam),
}

/// Name-resolution queries the type checker relies on. Every answer is
/// read-only and refers into the program the resolver was built from.
pub trait Resolver<'a> {
    fn resolve(&self, name: &Identifier) -> Option<Binding<'a>>;

    fn resolve_type_variable(&self, name: &Identifier) -> Option<TypeBinding<'a>>;

    /// `Name`, `alias.Name` or `full.module.Name`, looked up from the file the
    /// path appears in.
    fn resolve_declaration(&self, path: &QualifiedPath) -> Option<&'a Declaration>;

    fn resolve_qualified_name(&self, name: &QualifiedName) -> Option<&'a Declaration>;

    /// Binding of a property expression that names a module member
    /// (`alias.value`) or an enum case (`Color.Red`).
    fn resolve_module_property(&self, expression: &Expression) -> Option<Binding<'a>>;

    fn resolve_this_param(&self, location: SourceLocation) -> Option<&'a ThisParam>;

    fn resolve_source_file(&self, path: &QualifiedPath) -> Option<&'a SourceFile>;

    fn implementations_in_scope(&self, location: SourceLocation) -> Vec<&'a ImplementationDef>;

    /// Top-level functions with a `this` parameter named `name`.
    fn extension_defs_in_scope(&self, location: SourceLocation, name: &str) -> Vec<&'a FunctionDef>;

    /// Innermost checkable declaration around `location`; functions inside an
    /// implementation are returned on their own.
    fn declaration_containing(&self, location: SourceLocation) -> Option<&'a Declaration>;

    fn enclosing_interface(&self, location: SourceLocation) -> Option<&'a InterfaceDef>;

    /// Signature that declares the type parameter `binder`, with its index.
    fn type_param_site(&self, binder: &Binder) -> Option<(&'a FunctionSignature, usize)>;

    fn qualified_name(&self, binder: &Binder) -> QualifiedName;
}

/// Resolver that walks every file once up front and records, per identifier
/// location, what that identifier refers to.
pub struct ScopeResolver<'a> {
    program: &'a Program,
    globals: Vec<HashMap<&'a str, &'a Declaration>>,
    imports: Vec<HashMap<&'a str, FileId>>,
    values: HashMap<SourceLocation, Binding<'a>>,
    types: HashMap<SourceLocation, TypeBinding<'a>>,
    module_properties: HashMap<SourceLocation, Binding<'a>>,
    this_params: HashMap<SourceLocation, &'a ThisParam>,
    type_param_sites: HashMap<SourceLocation, (&'a FunctionSignature, usize)>,
}

impl<'a> ScopeResolver<'a> {
    pub fn new(program: &'a Program) -> Self {
        let mut resolver = Self {
            program,
            globals: Vec::with_capacity(program.files.len()),
            imports: Vec::with_capacity(program.files.len()),
            values: HashMap::new(),
            types: HashMap::new(),
            module_properties: HashMap::new(),
            this_params: HashMap::new(),
            type_param_sites: HashMap::new(),
        };
        for file in &program.files {
            let mut globals = HashMap::new();
            let mut imports = HashMap::new();
            for declaration in &file.declarations {
                if let Declaration::ImportAs(import) = declaration {
                    if let Some(target) = program.file_by_module(&import.module_path.to_qualified_name()) {
                        imports.insert(import.alias.name.as_str(), target.id);
                    }
                } else if let Some(name) = declaration_name(declaration) {
                    globals.entry(name.name.as_str()).or_insert(declaration);
                }
            }
            resolver.globals.push(globals);
            resolver.imports.push(imports);
        }
        for file in &program.files {
            let mut walker = ScopeWalker {
                scopes: vec![resolver.file_scope(file.id)],
                resolver: &mut resolver,
                file: file.id,
                this_param: None,
            };
            for declaration in &file.declarations {
                walker.walk_declaration(declaration);
            }
        }
        resolver
    }

    fn file_scope(&self, file: FileId) -> Scope<'a> {
        let mut scope = Scope::default();
        let Some(globals) = self.globals.get(file.index()) else {
            return scope;
        };
        for (&name, &declaration) in globals {
            if let Some(binding) = value_binding(declaration) {
                scope.values.insert(name, binding);
            }
            match declaration {
                Declaration::Struct(def) => {
                    scope.types.insert(name, TypeBinding::Struct(def));
                }
                Declaration::Enum(def) => {
                    scope.types.insert(name, TypeBinding::Enum(def));
                }
                _ => {}
            }
        }
        scope
    }

    fn global(&self, file: FileId, name: &str) -> Option<&'a Declaration> {
        self.globals.get(file.index())?.get(name).copied()
    }

    fn visible_files(&self, file: FileId) -> BTreeSet<FileId> {
        let mut files = BTreeSet::from([file]);
        if let Some(imports) = self.imports.get(file.index()) {
            files.extend(imports.values().copied());
        }
        files
    }

    fn visible_declarations(&self, location: SourceLocation) -> impl Iterator<Item = &'a Declaration> + '_ {
        let program = self.program;
        self.visible_files(location.file)
            .into_iter()
            .filter_map(move |id| program.file(id))
            .flat_map(|file| file.declarations.iter())
    }
}

impl<'a> Resolver<'a> for ScopeResolver<'a> {
    fn resolve(&self, name: &Identifier) -> Option<Binding<'a>> {
        self.values.get(&name.location).copied()
    }

    fn resolve_type_variable(&self, name: &Identifier) -> Option<TypeBinding<'a>> {
        self.types.get(&name.location).copied()
    }

    fn resolve_declaration(&self, path: &QualifiedPath) -> Option<&'a Declaration> {
        let file = path.location.file;
        match path.identifiers.as_slice() {
            [] => None,
            [name] => self.global(file, &name.name),
            [alias, name] => match self
                .imports
                .get(file.index())
                .and_then(|imports| imports.get(alias.name.as_str()))
            {
                Some(target) => self.global(*target, &name.name),
                None => self.resolve_qualified_name(&path.to_qualified_name()),
            },
            _ => self.resolve_qualified_name(&path.to_qualified_name()),
        }
    }

    fn resolve_qualified_name(&self, name: &QualifiedName) -> Option<&'a Declaration> {
        let (last, module) = name.0.split_last()?;
        let file = self.program.file_by_module(&QualifiedName(module.to_vec()))?;
        self.global(file.id, last)
    }

    fn resolve_module_property(&self, expression: &Expression) -> Option<Binding<'a>> {
        self.module_properties.get(&expression.location).copied()
    }

    fn resolve_this_param(&self, location: SourceLocation) -> Option<&'a ThisParam> {
        self.this_params.get(&location).copied()
    }

    fn resolve_source_file(&self, path: &QualifiedPath) -> Option<&'a SourceFile> {
        self.program.file_by_module(&path.to_qualified_name())
    }

    fn implementations_in_scope(&self, location: SourceLocation) -> Vec<&'a ImplementationDef> {
        self.visible_declarations(location)
            .filter_map(|declaration| match declaration {
                Declaration::Implementation(def) => Some(def),
                _ => None,
            })
            .collect()
    }

    fn extension_defs_in_scope(&self, location: SourceLocation, name: &str) -> Vec<&'a FunctionDef> {
        self.visible_declarations(location)
            .filter_map(|declaration| match declaration {
                Declaration::FunctionDef(def)
                    if def.signature.this_param.is_some() && def.signature.name.name == name =>
                {
                    Some(def)
                }
                _ => None,
            })
            .collect()
    }

    fn declaration_containing(&self, location: SourceLocation) -> Option<&'a Declaration> {
        let file = self.program.file(location.file)?;
        let declaration = file
            .declarations
            .iter()
            .find(|declaration| declaration.location().contains(location))?;
        if let Declaration::Implementation(implementation) = declaration {
            if let Some(member) = implementation
                .members
                .iter()
                .find(|member| member.location().contains(location))
            {
                return Some(member);
            }
        }
        Some(declaration)
    }

    fn enclosing_interface(&self, location: SourceLocation) -> Option<&'a InterfaceDef> {
        let file = self.program.file(location.file)?;
        file.declarations.iter().find_map(|declaration| match declaration {
            Declaration::Interface(def) if def.location.contains(location) => Some(def),
            _ => None,
        })
    }

    fn type_param_site(&self, binder: &Binder) -> Option<(&'a FunctionSignature, usize)> {
        self.type_param_sites.get(&binder.location).copied()
    }

    fn qualified_name(&self, binder: &Binder) -> QualifiedName {
        match self.program.file(binder.location.file) {
            Some(file) => file.module.append(&binder.name),
            None => QualifiedName::new([binder.name.as_str()]),
        }
    }
}

fn declaration_name(declaration: &Declaration) -> Option<&Identifier> {
    match declaration {
        Declaration::FunctionDef(def) if def.signature.this_param.is_none() => Some(&def.signature.name),
        Declaration::ExternFunctionDef(def) => Some(&def.binder),
        Declaration::Struct(def) => Some(&def.binder),
        Declaration::Enum(def) => Some(&def.name),
        Declaration::Interface(def) => Some(&def.name),
        Declaration::Const(def) => Some(&def.name),
        _ => None,
    }
}

fn value_binding(declaration: &Declaration) -> Option<Binding<'_>> {
    match declaration {
        Declaration::FunctionDef(def) if def.signature.this_param.is_none() => {
            Some(Binding::GlobalFunction(def))
        }
        Declaration::ExternFunctionDef(def) => Some(Binding::ExternFunction(def)),
        Declaration::Struct(def) => Some(Binding::Struct(def)),
        Declaration::Const(def) => Some(Binding::GlobalConst(def)),
        _ => None,
    }
}

#[derive(Default)]
struct Scope<'a> {
    values: HashMap<&'a str, Binding<'a>>,
    types: HashMap<&'a str, TypeBinding<'a>>,
}

struct ScopeWalker<'r, 'a> {
    resolver: &'r mut ScopeResolver<'a>,
    file: FileId,
    scopes: Vec<Scope<'a>>,
    this_param: Option<&'a ThisParam>,
}

impl<'r, 'a> ScopeWalker<'r, 'a> {
    fn lookup_value(&self, name: &str) -> Option<Binding<'a>> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.values.get(name).copied())
    }

    fn lookup_type(&self, name: &str) -> Option<TypeBinding<'a>> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.types.get(name).copied())
    }

    fn define_value(&mut self, binder: &'a Binder, binding: Binding<'a>) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.values.insert(binder.name.as_str(), binding);
        }
        self.resolver.values.insert(binder.location, binding);
    }

    fn with_scope(&mut self, f: impl FnOnce(&mut Self)) {
        self.scopes.push(Scope::default());
        f(self);
        self.scopes.pop();
    }

    fn walk_declaration(&mut self, declaration: &'a Declaration) {
        match declaration {
            Declaration::FunctionDef(def) => self.walk_function(def),
            Declaration::ExternFunctionDef(def) => {
                for annotation in &def.param_types {
                    self.walk_annotation(annotation);
                }
                self.walk_annotation(&def.return_type);
            }
            Declaration::Struct(def) => {
                self.resolver
                    .types
                    .insert(def.binder.location, TypeBinding::Struct(def));
                self.with_scope(|walker| {
                    walker.declare_type_params(def.type_params.as_deref(), None);
                    for field in &def.fields {
                        walker.walk_annotation(&field.annotation);
                    }
                });
            }
            Declaration::Enum(def) => {
                self.resolver
                    .types
                    .insert(def.name.location, TypeBinding::Enum(def));
                self.with_scope(|walker| {
                    walker.declare_type_params(def.type_params.as_deref(), None);
                    for case in &def.cases {
                        for param in &case.params {
                            walker.walk_annotation(param);
                        }
                    }
                });
            }
            Declaration::Interface(def) => {
                self.with_scope(|walker| {
                    walker.declare_type_params(def.type_params.as_deref(), None);
                    for member in &def.members {
                        walker.with_scope(|walker| walker.walk_signature(member));
                    }
                });
            }
            Declaration::Implementation(def) => {
                self.walk_interface_ref(&def.interface_ref);
                self.walk_annotation(&def.for_type);
                for member in def.functions() {
                    self.walk_function(member);
                }
            }
            Declaration::Const(def) => self.walk_expression(&def.initializer),
            Declaration::ImportAs(_) | Declaration::Error(_) => {}
        }
    }

    fn declare_type_params(
        &mut self,
        params: Option<&'a [TypeParam]>,
        signature: Option<&'a FunctionSignature>,
    ) {
        let params = params.unwrap_or_default();
        for (index, param) in params.iter().enumerate() {
            if let Some(scope) = self.scopes.last_mut() {
                scope
                    .types
                    .insert(param.binder.name.as_str(), TypeBinding::TypeParam(param));
            }
            self.resolver
                .types
                .insert(param.binder.location, TypeBinding::TypeParam(param));
            if let Some(signature) = signature {
                self.resolver
                    .type_param_sites
                    .insert(param.binder.location, (signature, index));
            }
        }
        // bounds may mention any parameter of the same list
        for bound in params.iter().filter_map(|param| param.bound.as_ref()) {
            self.walk_interface_ref(bound);
        }
    }

    /// Declares the signature's type parameters and parameters in the
    /// current scope.
    fn walk_signature(&mut self, signature: &'a FunctionSignature) {
        self.declare_type_params(signature.type_params.as_deref(), Some(signature));
        if let Some(this_param) = &signature.this_param {
            self.walk_annotation(&this_param.annotation);
        }
        for param in &signature.params {
            if let Some(annotation) = &param.annotation {
                self.walk_annotation(annotation);
            }
            self.define_value(&param.binder, Binding::FunctionParam { signature, param });
        }
        self.walk_annotation(&signature.return_type);
    }

    fn walk_function(&mut self, def: &'a FunctionDef) {
        let enclosing_this = self.this_param.take();
        self.this_param = def.signature.this_param.as_ref();
        self.with_scope(|walker| {
            walker.walk_signature(&def.signature);
            walker.walk_block(&def.body);
        });
        self.this_param = enclosing_this;
    }

    fn walk_interface_ref(&mut self, interface_ref: &'a InterfaceRef) {
        for arg in interface_ref.type_args.iter().flatten() {
            self.walk_annotation(arg);
        }
    }

    fn walk_block(&mut self, block: &'a Block) {
        self.with_scope(|walker| {
            for member in &block.members {
                walker.walk_block_member(member);
            }
        });
    }

    fn walk_block_member(&mut self, member: &'a BlockMember) {
        match member {
            BlockMember::Expression(expression) => self.walk_expression(expression),
            BlockMember::Statement(statement) => self.walk_statement(statement),
        }
    }

    fn walk_statement(&mut self, statement: &'a Statement) {
        match &statement.kind {
            StatementKind::Return(value) => {
                if let Some(value) = value {
                    self.walk_expression(value);
                }
            }
            StatementKind::Val(val) => {
                if let Some(annotation) = &val.annotation {
                    self.walk_annotation(annotation);
                }
                self.walk_expression(&val.rhs);
                self.define_value(&val.binder, Binding::Val(val));
            }
            StatementKind::While { condition, body } => {
                self.walk_expression(condition);
                self.walk_block(body);
            }
            StatementKind::If {
                condition,
                if_true,
                if_false,
            } => {
                self.walk_expression(condition);
                self.walk_block(if_true);
                if let Some(if_false) = if_false {
                    self.walk_block(if_false);
                }
            }
            StatementKind::LocalAssignment { name, value } => {
                self.record_value(name);
                self.walk_expression(value);
            }
            StatementKind::MemberAssignment { lhs, value } => {
                self.walk_expression(lhs);
                self.walk_expression(value);
            }
            StatementKind::PointerAssignment { pointer, value } => {
                self.walk_expression(pointer);
                self.walk_expression(value);
            }
            StatementKind::Defer(member) => self.walk_block_member(member),
            StatementKind::Error => {}
        }
    }

    fn record_value(&mut self, name: &Identifier) {
        if let Some(binding) = self.lookup_value(&name.name) {
            self.resolver.values.insert(name.location, binding);
        }
    }

    fn walk_expression(&mut self, expression: &'a Expression) {
        match &expression.kind {
            ExpressionKind::Var(name) => self.record_value(name),
            ExpressionKind::Call {
                callee,
                type_args,
                args,
            } => {
                self.walk_expression(callee);
                for arg in type_args.iter().flatten() {
                    self.walk_annotation(arg);
                }
                for arg in args {
                    self.walk_expression(arg);
                }
            }
            ExpressionKind::Property { lhs, .. } => match self.static_property(expression) {
                Some(binding) => {
                    self.resolver
                        .module_properties
                        .insert(expression.location, binding);
                }
                None => self.walk_expression(lhs),
            },
            ExpressionKind::This => {
                if let Some(this_param) = self.this_param {
                    self.resolver
                        .this_params
                        .insert(expression.location, this_param);
                }
            }
            ExpressionKind::Not(inner)
            | ExpressionKind::AddressOf(inner)
            | ExpressionKind::AddressOfMut(inner)
            | ExpressionKind::Load(inner) => self.walk_expression(inner),
            ExpressionKind::BinaryOperation { lhs, rhs, .. } => {
                self.walk_expression(lhs);
                self.walk_expression(rhs);
            }
            ExpressionKind::SizeOf(annotation) => self.walk_annotation(annotation),
            ExpressionKind::PointerCast { to_type, arg } => {
                self.walk_annotation(to_type);
                self.walk_expression(arg);
            }
            ExpressionKind::If {
                condition,
                true_branch,
                false_branch,
            } => {
                self.walk_expression(condition);
                self.walk_expression(true_branch);
                self.walk_expression(false_branch);
            }
            ExpressionKind::TypeApplication { lhs, args } => {
                self.walk_expression(lhs);
                for arg in args {
                    self.walk_annotation(arg);
                }
            }
            ExpressionKind::Match { value, arms } => {
                self.walk_expression(value);
                for arm in arms {
                    self.with_scope(|walker| {
                        walker.bind_pattern(&arm.pattern);
                        walker.walk_expression(&arm.expression);
                    });
                }
            }
            ExpressionKind::New {
                type_args, args, ..
            } => {
                for arg in type_args.iter().flatten() {
                    self.walk_annotation(arg);
                }
                for arg in args {
                    self.walk_expression(arg);
                }
            }
            ExpressionKind::Error
            | ExpressionKind::ByteString(_)
            | ExpressionKind::BoolLiteral(_)
            | ExpressionKind::NullPtr
            | ExpressionKind::IntLiteral(_) => {}
        }
    }

    fn bind_pattern(&mut self, pattern: &'a Pattern) {
        match &pattern.kind {
            PatternKind::Name(binder) => self.define_value(binder, Binding::Pattern(binder)),
            PatternKind::DotName { params, .. } => {
                for param in params {
                    self.bind_pattern(param);
                }
            }
            PatternKind::Wildcard | PatternKind::Else => {}
        }
    }

    fn walk_annotation(&mut self, annotation: &'a TypeAnnotation) {
        match &annotation.kind {
            TypeAnnotationKind::Var(name) => {
                if let Some(binding) = self.lookup_type(&name.name) {
                    self.resolver.types.insert(name.location, binding);
                }
            }
            TypeAnnotationKind::Ptr(to) | TypeAnnotationKind::MutPtr(to) => self.walk_annotation(to),
            TypeAnnotationKind::Application { callee, args } => {
                self.walk_annotation(callee);
                for arg in args {
                    self.walk_annotation(arg);
                }
            }
            TypeAnnotationKind::Function { from, to } => {
                for param in from {
                    self.walk_annotation(param);
                }
                self.walk_annotation(to);
            }
            TypeAnnotationKind::Union(members) => {
                for member in members {
                    self.walk_annotation(member);
                }
            }
            TypeAnnotationKind::Qualified(_) | TypeAnnotationKind::This | TypeAnnotationKind::Error => {}
        }
    }

    /// `alias.member`, `Enum.Case` and `alias.Enum.Case`, unless the head is
    /// shadowed by a value in scope.
    fn static_property(&self, expression: &'a Expression) -> Option<Binding<'a>> {
        let mut path = Vec::new();
        collect_path(expression, &mut path)?;
        let (head, _) = path.split_first()?;
        if self.lookup_value(&head.name).is_some() {
            return None;
        }
        let imported = self
            .resolver
            .imports
            .get(self.file.index())
            .and_then(|imports| imports.get(head.name.as_str()))
            .copied();
        let (file, rest) = match imported {
            Some(target) => (target, &path[1..]),
            None => (self.file, &path[..]),
        };
        match rest {
            [name] if imported.is_some() => value_binding(self.resolver.global(file, &name.name)?),
            [enum_name, case_name] => {
                let declaration = match self.resolver.global(file, &enum_name.name)? {
                    Declaration::Enum(def) => def,
                    _ => return None,
                };
                let case = declaration
                    .cases
                    .iter()
                    .find(|case| case.name.name == case_name.name)?;
                Some(Binding::EnumCaseConstructor { declaration, case })
            }
            _ => None,
        }
    }
}

fn collect_path<'a>(expression: &'a Expression, path: &mut Vec<&'a Identifier>) -> Option<()> {
    match &expression.kind {
        ExpressionKind::Var(name) => {
            path.push(name);
            Some(())
        }
        ExpressionKind::Property { lhs, property } => {
            collect_path(lhs, path)?;
            path.push(property);
            Some(())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::parser::parse_source_file;
    use indoc::indoc;
    use std::path::PathBuf;

    fn program(files: &[(&str, &str)]) -> Program {
        let files = files
            .iter()
            .enumerate()
            .map(|(index, (module, source))| {
                parse_source_file(
                    FileId(index as u32),
                    QualifiedName::new(module.split('.')),
                    PathBuf::from(format!("{module}.hds")),
                    source,
                )
                .expect("parse")
            })
            .collect();
        Program { files }
    }

    fn body(declaration: &Declaration) -> &Block {
        match declaration {
            Declaration::FunctionDef(def) => &def.body,
            other => panic!("expected function, got {other:?}"),
        }
    }

    #[test]
    fn locals_shadow_globals_in_order() {
        let program = program(&[(
            "main",
            indoc! {"
                const x = 1;
                def f(x: CInt): CInt {
                    val y = x;
                    val x = true;
                    return x;
                }
            "},
        )]);
        let resolver = ScopeResolver::new(&program);
        let block = body(&program.files[0].declarations[1]);
        let BlockMember::Statement(Statement {
            kind: StatementKind::Val(first),
            ..
        }) = &block.members[0]
        else {
            panic!("expected val");
        };
        let ExpressionKind::Var(name) = &first.rhs.kind else {
            panic!("expected var");
        };
        assert!(matches!(resolver.resolve(name), Some(Binding::FunctionParam { .. })));

        let BlockMember::Statement(Statement {
            kind: StatementKind::Return(Some(value)),
            ..
        }) = &block.members[2]
        else {
            panic!("expected return");
        };
        let ExpressionKind::Var(name) = &value.kind else {
            panic!("expected var");
        };
        assert!(matches!(resolver.resolve(name), Some(Binding::Val(val)) if val.binder.name == "x"));
    }

    #[test]
    fn enum_cases_and_aliases_resolve_as_module_properties() {
        let program = program(&[
            (
                "main",
                indoc! {"
                    import lib.math as math;
                    enum Color { Red; Green; }
                    def f(): CInt {
                        val c = Color.Red;
                        return math.two;
                    }
                "},
            ),
            ("lib.math", "const two = 2;"),
        ]);
        let resolver = ScopeResolver::new(&program);
        let block = body(&program.files[0].declarations[2]);
        let BlockMember::Statement(Statement {
            kind: StatementKind::Val(val),
            ..
        }) = &block.members[0]
        else {
            panic!("expected val");
        };
        assert!(matches!(
            resolver.resolve_module_property(&val.rhs),
            Some(Binding::EnumCaseConstructor { case, .. }) if case.name.name == "Red"
        ));
        let BlockMember::Statement(Statement {
            kind: StatementKind::Return(Some(value)),
            ..
        }) = &block.members[1]
        else {
            panic!("expected return");
        };
        assert!(matches!(
            resolver.resolve_module_property(value),
            Some(Binding::GlobalConst(def)) if def.name.name == "two"
        ));
    }

    #[test]
    fn implementations_and_extensions_come_from_imported_files() {
        let program = program(&[
            (
                "main",
                indoc! {"
                    import lib.show as show;
                    def main(): Void {}
                "},
            ),
            (
                "lib.show",
                indoc! {"
                    interface Show { def show(this: This): Void; }
                    implementation Show for CInt { def show(this: CInt): Void {} }
                    def twice(this: CInt): CInt { return this; }
                "},
            ),
            ("other", "def twice(this: Bool): Bool { return this; }"),
        ]);
        let resolver = ScopeResolver::new(&program);
        let location = program.files[0].declarations[1].location();
        assert_eq!(resolver.implementations_in_scope(location).len(), 1);
        let extensions = resolver.extension_defs_in_scope(location, "twice");
        assert_eq!(extensions.len(), 1);
        assert_eq!(extensions[0].signature.name.location.file, FileId(1));
    }

    #[test]
    fn declaration_containing_descends_into_implementations() {
        let program = program(&[(
            "main",
            indoc! {"
                interface Show { def show(this: This): Void; }
                implementation Show for CInt {
                    def show(this: CInt): Void { this; }
                }
            "},
        )]);
        let resolver = ScopeResolver::new(&program);
        let Declaration::Implementation(implementation) = &program.files[0].declarations[1] else {
            panic!("expected implementation");
        };
        let member = implementation.functions().next().expect("member");
        let BlockMember::Expression(this) = &member.body.members[0] else {
            panic!("expected expression");
        };
        let found = resolver
            .declaration_containing(this.location)
            .expect("declaration");
        assert!(matches!(found, Declaration::FunctionDef(def) if def.location == member.location));
        assert!(resolver.resolve_this_param(this.location).is_some());
        assert!(resolver
            .enclosing_interface(program.files[0].declarations[0].location())
            .is_some());
    }

    #[test]
    fn type_params_record_their_declaring_signature() {
        let program = program(&[(
            "main",
            "def id[A, B](x: B): B { return x; }",
        )]);
        let resolver = ScopeResolver::new(&program);
        let Declaration::FunctionDef(def) = &program.files[0].declarations[0] else {
            panic!("expected function");
        };
        let type_params = def.signature.type_params.as_ref().expect("type params");
        let (signature, index) = resolver
            .type_param_site(&type_params[1].binder)
            .expect("site");
        assert_eq!(signature.name.name, "id");
        assert_eq!(index, 1);
        let TypeAnnotationKind::Var(name) = &def.signature.return_type.kind else {
            panic!("expected var annotation");
        };
        assert!(matches!(
            resolver.resolve_type_variable(name),
            Some(TypeBinding::TypeParam(param)) if param.binder.name == "B"
        ));
    }
}
