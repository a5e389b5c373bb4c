use crate::language::span::{FileId, HasLocation, SourceLocation};
use std::{fmt, path::PathBuf};

#[derive(Clone, Debug, Default)]
pub struct Program {
    pub files: Vec<SourceFile>,
}

impl Program {
    pub fn file(&self, id: FileId) -> Option<&SourceFile> {
        self.files.get(id.index())
    }

    pub fn file_by_module(&self, module: &QualifiedName) -> Option<&SourceFile> {
        self.files.iter().find(|file| &file.module == module)
    }
}

#[derive(Clone, Debug)]
pub struct SourceFile {
    pub id: FileId,
    pub module: QualifiedName,
    pub path: PathBuf,
    pub declarations: Vec<Declaration>,
}

/// Dotted name of a module or of a module-level declaration, e.g. `lib.math.add`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QualifiedName(pub Vec<String>);

impl QualifiedName {
    pub fn new(segments: impl IntoIterator<Item = impl Into<String>>) -> Self {
        QualifiedName(segments.into_iter().map(Into::into).collect())
    }

    pub fn append(&self, name: &str) -> QualifiedName {
        let mut segments = self.0.clone();
        segments.push(name.to_string());
        QualifiedName(segments)
    }

    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Identifier {
    pub name: String,
    pub location: SourceLocation,
}

/// An identifier in a position that introduces a name.
pub type Binder = Identifier;

#[derive(Clone, Debug)]
pub struct QualifiedPath {
    pub identifiers: Vec<Identifier>,
    pub location: SourceLocation,
}

impl QualifiedPath {
    pub fn to_qualified_name(&self) -> QualifiedName {
        QualifiedName(
            self.identifiers
                .iter()
                .map(|ident| ident.name.clone())
                .collect(),
        )
    }

    pub fn last(&self) -> Option<&Identifier> {
        self.identifiers.last()
    }
}

#[derive(Clone, Debug)]
pub struct TypeParam {
    pub binder: Binder,
    pub bound: Option<InterfaceRef>,
}

#[derive(Clone, Debug)]
pub struct InterfaceRef {
    pub path: QualifiedPath,
    pub type_args: Option<Vec<TypeAnnotation>>,
    pub location: SourceLocation,
}

#[derive(Clone, Debug)]
pub enum Declaration {
    ImportAs(ImportAs),
    FunctionDef(FunctionDef),
    ExternFunctionDef(ExternFunctionDef),
    Struct(StructDef),
    Enum(EnumDef),
    Interface(InterfaceDef),
    Implementation(ImplementationDef),
    Const(ConstDef),
    Error(SourceLocation),
}

impl HasLocation for Declaration {
    fn location(&self) -> SourceLocation {
        match self {
            Declaration::ImportAs(decl) => decl.location,
            Declaration::FunctionDef(decl) => decl.location,
            Declaration::ExternFunctionDef(decl) => decl.location,
            Declaration::Struct(decl) => decl.location,
            Declaration::Enum(decl) => decl.location,
            Declaration::Interface(decl) => decl.location,
            Declaration::Implementation(decl) => decl.location,
            Declaration::Const(decl) => decl.location,
            Declaration::Error(location) => *location,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ImportAs {
    pub module_path: QualifiedPath,
    pub alias: Binder,
    pub location: SourceLocation,
}

#[derive(Clone, Debug)]
pub struct FunctionSignature {
    pub name: Binder,
    pub type_params: Option<Vec<TypeParam>>,
    pub this_param: Option<ThisParam>,
    pub params: Vec<Param>,
    pub return_type: TypeAnnotation,
    pub location: SourceLocation,
}

#[derive(Clone, Debug)]
pub struct ThisParam {
    pub annotation: TypeAnnotation,
    pub location: SourceLocation,
}

#[derive(Clone, Debug)]
pub struct Param {
    pub binder: Binder,
    pub annotation: Option<TypeAnnotation>,
}

#[derive(Clone, Debug)]
pub struct FunctionDef {
    pub signature: FunctionSignature,
    pub body: Block,
    pub location: SourceLocation,
}

#[derive(Clone, Debug)]
pub struct ExternFunctionDef {
    pub binder: Binder,
    pub param_types: Vec<TypeAnnotation>,
    pub return_type: TypeAnnotation,
    pub extern_name: Identifier,
    pub location: SourceLocation,
}

#[derive(Clone, Debug)]
pub struct StructDef {
    pub binder: Binder,
    pub type_params: Option<Vec<TypeParam>>,
    pub fields: Vec<StructField>,
    pub location: SourceLocation,
}

#[derive(Clone, Debug)]
pub struct StructField {
    pub binder: Binder,
    pub is_mutable: bool,
    pub annotation: TypeAnnotation,
}

#[derive(Clone, Debug)]
pub struct EnumDef {
    pub name: Binder,
    pub type_params: Option<Vec<TypeParam>>,
    pub cases: Vec<EnumCase>,
    pub location: SourceLocation,
}

#[derive(Clone, Debug)]
pub struct EnumCase {
    pub name: Binder,
    pub params: Vec<TypeAnnotation>,
}

#[derive(Clone, Debug)]
pub struct InterfaceDef {
    pub name: Binder,
    pub type_params: Option<Vec<TypeParam>>,
    pub members: Vec<FunctionSignature>,
    pub location: SourceLocation,
}

#[derive(Clone, Debug)]
pub struct ImplementationDef {
    pub interface_ref: InterfaceRef,
    pub for_type: TypeAnnotation,
    /// Always `Declaration::FunctionDef`; kept as declarations so members
    /// are checked through the same memoized entry point.
    pub members: Vec<Declaration>,
    pub location: SourceLocation,
}

impl ImplementationDef {
    pub fn functions(&self) -> impl Iterator<Item = &FunctionDef> {
        self.members.iter().filter_map(|member| match member {
            Declaration::FunctionDef(def) => Some(def),
            _ => None,
        })
    }
}

#[derive(Clone, Debug)]
pub struct ConstDef {
    pub name: Binder,
    pub initializer: Expression,
    pub location: SourceLocation,
}

#[derive(Clone, Debug)]
pub struct TypeAnnotation {
    pub kind: TypeAnnotationKind,
    pub location: SourceLocation,
}

#[derive(Clone, Debug)]
pub enum TypeAnnotationKind {
    Error,
    Var(Identifier),
    Ptr(Box<TypeAnnotation>),
    MutPtr(Box<TypeAnnotation>),
    Application {
        callee: Box<TypeAnnotation>,
        args: Vec<TypeAnnotation>,
    },
    Qualified(QualifiedPath),
    Function {
        from: Vec<TypeAnnotation>,
        to: Box<TypeAnnotation>,
    },
    This,
    Union(Vec<TypeAnnotation>),
}

#[derive(Clone, Debug)]
pub struct Block {
    pub members: Vec<BlockMember>,
    pub location: SourceLocation,
}

#[derive(Clone, Debug)]
pub enum BlockMember {
    Expression(Expression),
    Statement(Statement),
}

impl HasLocation for BlockMember {
    fn location(&self) -> SourceLocation {
        match self {
            BlockMember::Expression(expr) => expr.location,
            BlockMember::Statement(stmt) => stmt.location,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Statement {
    pub kind: StatementKind,
    pub location: SourceLocation,
}

#[derive(Clone, Debug)]
pub enum StatementKind {
    Return(Option<Expression>),
    Val(ValStatement),
    While {
        condition: Expression,
        body: Block,
    },
    If {
        condition: Expression,
        if_true: Block,
        if_false: Option<Block>,
    },
    LocalAssignment {
        name: Identifier,
        value: Expression,
    },
    /// `lhs` is always an `ExpressionKind::Property`.
    MemberAssignment {
        lhs: Expression,
        value: Expression,
    },
    /// `*pointer = value`
    PointerAssignment {
        pointer: Expression,
        value: Expression,
    },
    Defer(Box<BlockMember>),
    Error,
}

#[derive(Clone, Debug)]
pub struct ValStatement {
    pub binder: Binder,
    pub is_mutable: bool,
    pub annotation: Option<TypeAnnotation>,
    pub rhs: Expression,
    pub location: SourceLocation,
}

#[derive(Clone, Debug)]
pub struct Expression {
    pub kind: ExpressionKind,
    pub location: SourceLocation,
}

impl HasLocation for Expression {
    fn location(&self) -> SourceLocation {
        self.location
    }
}

#[derive(Clone, Debug)]
pub enum ExpressionKind {
    Error,
    Var(Identifier),
    Call {
        callee: Box<Expression>,
        type_args: Option<Vec<TypeAnnotation>>,
        args: Vec<Expression>,
    },
    Property {
        lhs: Box<Expression>,
        property: Identifier,
    },
    ByteString(Vec<u8>),
    BoolLiteral(bool),
    This,
    NullPtr,
    IntLiteral(i64),
    Not(Box<Expression>),
    BinaryOperation {
        operator: BinaryOperator,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
    SizeOf(TypeAnnotation),
    AddressOf(Box<Expression>),
    AddressOfMut(Box<Expression>),
    Load(Box<Expression>),
    PointerCast {
        to_type: TypeAnnotation,
        arg: Box<Expression>,
    },
    If {
        condition: Box<Expression>,
        true_branch: Box<Expression>,
        false_branch: Box<Expression>,
    },
    TypeApplication {
        lhs: Box<Expression>,
        args: Vec<TypeAnnotation>,
    },
    Match {
        value: Box<Expression>,
        arms: Vec<MatchArm>,
    },
    New {
        path: QualifiedPath,
        type_args: Option<Vec<TypeAnnotation>>,
        args: Vec<Expression>,
    },
}

#[derive(Clone, Debug)]
pub struct MatchArm {
    pub pattern: Pattern,
    pub expression: Expression,
}

#[derive(Clone, Debug)]
pub struct Pattern {
    pub kind: PatternKind,
    pub location: SourceLocation,
}

#[derive(Clone, Debug)]
pub enum PatternKind {
    /// `.Case(p, ...)`
    DotName {
        identifier: Identifier,
        params: Vec<Pattern>,
    },
    Name(Binder),
    Wildcard,
    Else,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    Plus,
    Minus,
    Times,
    And,
    Or,
    Equals,
    NotEquals,
    LessThan,
    LessThanEqual,
    GreaterThan,
    GreaterThanEqual,
}

impl BinaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Plus => "+",
            BinaryOperator::Minus => "-",
            BinaryOperator::Times => "*",
            BinaryOperator::And => "and",
            BinaryOperator::Or => "or",
            BinaryOperator::Equals => "==",
            BinaryOperator::NotEquals => "!=",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessThanEqual => "<=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::GreaterThanEqual => ">=",
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
