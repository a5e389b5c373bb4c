use crate::language::{
    ast::*,
    errors::{SyntaxError, SyntaxErrors},
    lexer::lex,
    span::{FileId, SourceLocation, Span},
    token::{Token, TokenKind},
};
use std::path::PathBuf;

pub fn parse_source_file(
    file: FileId,
    module: QualifiedName,
    path: PathBuf,
    source: &str,
) -> Result<SourceFile, SyntaxErrors> {
    let tokens = lex(source).map_err(SyntaxErrors::new)?;
    let declarations = Parser::new(file, tokens).parse()?;
    Ok(SourceFile {
        id: file,
        module,
        path,
        declarations,
    })
}

const BINARY_PRECEDENCE: &[&[BinaryOperator]] = &[
    &[BinaryOperator::And, BinaryOperator::Or],
    &[
        BinaryOperator::LessThan,
        BinaryOperator::LessThanEqual,
        BinaryOperator::GreaterThanEqual,
        BinaryOperator::GreaterThan,
    ],
    &[BinaryOperator::Equals, BinaryOperator::NotEquals],
    &[BinaryOperator::Plus, BinaryOperator::Minus],
    &[BinaryOperator::Times],
];

struct Parser {
    file: FileId,
    tokens: Vec<Token>,
    pos: usize,
    errors: Vec<SyntaxError>,
}

impl Parser {
    fn new(file: FileId, tokens: Vec<Token>) -> Self {
        Self {
            file,
            tokens,
            pos: 0,
            errors: Vec::new(),
        }
    }

    fn parse(mut self) -> Result<Vec<Declaration>, SyntaxErrors> {
        let mut declarations = Vec::new();
        while !self.is_eof() {
            match self.parse_declaration() {
                Ok(decl) => declarations.push(decl),
                Err(err) => {
                    self.report(err);
                    self.synchronize_declaration();
                }
            }
        }
        if self.errors.is_empty() {
            Ok(declarations)
        } else {
            Err(SyntaxErrors::new(self.errors))
        }
    }

    fn parse_declaration(&mut self) -> Result<Declaration, SyntaxError> {
        let start = self.current_span_start();
        match self.peek_kind() {
            Some(TokenKind::Import) => self.parse_import_as(start).map(Declaration::ImportAs),
            Some(TokenKind::Def) => {
                self.advance();
                self.parse_function_def(start).map(Declaration::FunctionDef)
            }
            Some(TokenKind::Extern) => self
                .parse_extern_function_def(start)
                .map(Declaration::ExternFunctionDef),
            Some(TokenKind::Struct) => self.parse_struct(start).map(Declaration::Struct),
            Some(TokenKind::Enum) => self.parse_enum(start).map(Declaration::Enum),
            Some(TokenKind::Interface) => self.parse_interface(start).map(Declaration::Interface),
            Some(TokenKind::Implementation) => self
                .parse_implementation(start)
                .map(Declaration::Implementation),
            Some(TokenKind::Const) => self.parse_const(start).map(Declaration::Const),
            _ => Err(self
                .error_here("Expected declaration")
                .with_help("declarations start with `def`, `struct`, `enum`, `interface`, `implementation`, `extern`, `const` or `import`")),
        }
    }

    fn parse_import_as(&mut self, start: usize) -> Result<ImportAs, SyntaxError> {
        self.expect(TokenKind::Import)?;
        let module_path = self.parse_qualified_path()?;
        self.expect(TokenKind::As)?;
        let alias = self.expect_identifier("Expected module alias after `as`")?;
        self.expect(TokenKind::Semi)?;
        Ok(ImportAs {
            module_path,
            alias,
            location: self.location_from(start),
        })
    }

    fn parse_function_def(&mut self, start: usize) -> Result<FunctionDef, SyntaxError> {
        let signature = self.parse_signature(start)?;
        let body = self.parse_block()?;
        Ok(FunctionDef {
            signature,
            body,
            location: self.location_from(start),
        })
    }

    fn parse_signature(&mut self, start: usize) -> Result<FunctionSignature, SyntaxError> {
        let name = self.expect_identifier("Expected function name")?;
        let type_params = self.parse_optional_type_params()?;
        self.expect(TokenKind::LParen)?;
        let mut this_param = None;
        let mut params = Vec::new();
        if self.check(TokenKind::This) {
            let this_start = self.current_span_start();
            self.advance();
            self.expect(TokenKind::Colon)?;
            let annotation = self.parse_type_annotation()?;
            this_param = Some(ThisParam {
                annotation,
                location: self.location_from(this_start),
            });
            if !self.check(TokenKind::RParen) {
                self.expect(TokenKind::Comma)?;
            }
        }
        while !self.check(TokenKind::RParen) && !self.is_eof() {
            let binder = self.expect_identifier("Expected parameter name")?;
            let annotation = if self.matches(TokenKind::Colon) {
                Some(self.parse_type_annotation()?)
            } else {
                None
            };
            params.push(Param { binder, annotation });
            if !self.matches(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;
        self.expect(TokenKind::Colon)?;
        let return_type = self.parse_type_annotation()?;
        Ok(FunctionSignature {
            name,
            type_params,
            this_param,
            params,
            return_type,
            location: self.location_from(start),
        })
    }

    fn parse_optional_type_params(&mut self) -> Result<Option<Vec<TypeParam>>, SyntaxError> {
        if !self.matches(TokenKind::LBracket) {
            return Ok(None);
        }
        let mut params = Vec::new();
        while !self.check(TokenKind::RBracket) && !self.is_eof() {
            let binder = self.expect_identifier("Expected type parameter name")?;
            let bound = if self.matches(TokenKind::Colon) {
                Some(self.parse_interface_ref()?)
            } else {
                None
            };
            params.push(TypeParam { binder, bound });
            if !self.matches(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBracket)?;
        Ok(Some(params))
    }

    fn parse_interface_ref(&mut self) -> Result<InterfaceRef, SyntaxError> {
        let start = self.current_span_start();
        let path = self.parse_qualified_path()?;
        let type_args = if self.matches(TokenKind::LBracket) {
            Some(self.parse_type_annotation_list(TokenKind::RBracket)?)
        } else {
            None
        };
        Ok(InterfaceRef {
            path,
            type_args,
            location: self.location_from(start),
        })
    }

    fn parse_extern_function_def(&mut self, start: usize) -> Result<ExternFunctionDef, SyntaxError> {
        self.expect(TokenKind::Extern)?;
        self.expect(TokenKind::Def)?;
        let binder = self.expect_identifier("Expected extern function name")?;
        self.expect(TokenKind::LParen)?;
        let param_types = self.parse_type_annotation_list(TokenKind::RParen)?;
        self.expect(TokenKind::Colon)?;
        let return_type = self.parse_type_annotation()?;
        self.expect(TokenKind::Eq)?;
        let extern_name = self.expect_identifier("Expected external symbol name")?;
        self.expect(TokenKind::Semi)?;
        Ok(ExternFunctionDef {
            binder,
            param_types,
            return_type,
            extern_name,
            location: self.location_from(start),
        })
    }

    fn parse_struct(&mut self, start: usize) -> Result<StructDef, SyntaxError> {
        self.expect(TokenKind::Struct)?;
        let binder = self.expect_identifier("Expected struct name")?;
        let type_params = self.parse_optional_type_params()?;
        self.expect(TokenKind::LBrace)?;
        let mut fields = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_eof() {
            self.expect(TokenKind::Val)?;
            let is_mutable = self.matches(TokenKind::Mut);
            let field = self.expect_identifier("Expected field name")?;
            self.expect(TokenKind::Colon)?;
            let annotation = self.parse_type_annotation()?;
            self.expect(TokenKind::Semi)?;
            fields.push(StructField {
                binder: field,
                is_mutable,
                annotation,
            });
        }
        self.expect(TokenKind::RBrace)?;
        Ok(StructDef {
            binder,
            type_params,
            fields,
            location: self.location_from(start),
        })
    }

    fn parse_enum(&mut self, start: usize) -> Result<EnumDef, SyntaxError> {
        self.expect(TokenKind::Enum)?;
        let name = self.expect_identifier("Expected enum name")?;
        let type_params = self.parse_optional_type_params()?;
        self.expect(TokenKind::LBrace)?;
        let mut cases = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_eof() {
            let case_name = self.expect_identifier("Expected enum case name")?;
            let params = if self.matches(TokenKind::LParen) {
                self.parse_type_annotation_list(TokenKind::RParen)?
            } else {
                Vec::new()
            };
            self.expect(TokenKind::Semi)?;
            cases.push(EnumCase {
                name: case_name,
                params,
            });
        }
        self.expect(TokenKind::RBrace)?;
        Ok(EnumDef {
            name,
            type_params,
            cases,
            location: self.location_from(start),
        })
    }

    fn parse_interface(&mut self, start: usize) -> Result<InterfaceDef, SyntaxError> {
        self.expect(TokenKind::Interface)?;
        let name = self.expect_identifier("Expected interface name")?;
        let type_params = self.parse_optional_type_params()?;
        self.expect(TokenKind::LBrace)?;
        let mut members = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_eof() {
            let member_start = self.current_span_start();
            self.expect(TokenKind::Def)?;
            members.push(self.parse_signature(member_start)?);
            self.expect(TokenKind::Semi)?;
        }
        self.expect(TokenKind::RBrace)?;
        Ok(InterfaceDef {
            name,
            type_params,
            members,
            location: self.location_from(start),
        })
    }

    fn parse_implementation(&mut self, start: usize) -> Result<ImplementationDef, SyntaxError> {
        self.expect(TokenKind::Implementation)?;
        let interface_ref = self.parse_interface_ref()?;
        self.expect(TokenKind::For)?;
        let for_type = self.parse_type_annotation()?;
        self.expect(TokenKind::LBrace)?;
        let mut members = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_eof() {
            let member_start = self.current_span_start();
            self.expect(TokenKind::Def)?;
            members.push(Declaration::FunctionDef(
                self.parse_function_def(member_start)?,
            ));
        }
        self.expect(TokenKind::RBrace)?;
        Ok(ImplementationDef {
            interface_ref,
            for_type,
            members,
            location: self.location_from(start),
        })
    }

    fn parse_const(&mut self, start: usize) -> Result<ConstDef, SyntaxError> {
        self.expect(TokenKind::Const)?;
        let name = self.expect_identifier("Expected constant name")?;
        self.expect(TokenKind::Eq)?;
        let initializer = self.parse_expression()?;
        self.expect(TokenKind::Semi)?;
        Ok(ConstDef {
            name,
            initializer,
            location: self.location_from(start),
        })
    }

    fn parse_block(&mut self) -> Result<Block, SyntaxError> {
        let start = self.expect(TokenKind::LBrace)?.span.start;
        let mut members = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_eof() {
            members.push(self.parse_block_member()?);
        }
        self.expect(TokenKind::RBrace)?;
        Ok(Block {
            members,
            location: self.location_from(start),
        })
    }

    fn parse_block_member(&mut self) -> Result<BlockMember, SyntaxError> {
        let start = self.current_span_start();
        let kind = match self.peek_kind() {
            Some(TokenKind::Return) => {
                self.advance();
                let value = if self.check(TokenKind::Semi) {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                self.expect(TokenKind::Semi)?;
                StatementKind::Return(value)
            }
            Some(TokenKind::Val) => StatementKind::Val(self.parse_val(start)?),
            Some(TokenKind::While) => {
                self.advance();
                let condition = self.parse_expression()?;
                let body = self.parse_block()?;
                StatementKind::While { condition, body }
            }
            Some(TokenKind::If) => return self.parse_if_statement(start).map(BlockMember::Statement),
            Some(TokenKind::Defer) => {
                self.advance();
                StatementKind::Defer(Box::new(self.parse_block_member()?))
            }
            _ => {
                let expression = self.parse_expression()?;
                if !self.matches(TokenKind::Eq) {
                    self.expect(TokenKind::Semi)?;
                    return Ok(BlockMember::Expression(expression));
                }
                let value = self.parse_expression()?;
                self.expect(TokenKind::Semi)?;
                match expression.kind {
                    ExpressionKind::Var(name) => StatementKind::LocalAssignment { name, value },
                    ExpressionKind::Property { .. } => StatementKind::MemberAssignment {
                        lhs: expression,
                        value,
                    },
                    ExpressionKind::Load(pointer) => StatementKind::PointerAssignment {
                        pointer: *pointer,
                        value,
                    },
                    _ => {
                        return Err(SyntaxError::new(
                            "Invalid assignment target",
                            expression.location.span,
                        )
                        .with_help("only names, fields and `*pointer` can be assigned"))
                    }
                }
            }
        };
        Ok(BlockMember::Statement(Statement {
            kind,
            location: self.location_from(start),
        }))
    }

    fn parse_val(&mut self, start: usize) -> Result<ValStatement, SyntaxError> {
        self.expect(TokenKind::Val)?;
        let is_mutable = self.matches(TokenKind::Mut);
        let binder = self.expect_identifier("Expected name after `val`")?;
        let annotation = if self.matches(TokenKind::Colon) {
            Some(self.parse_type_annotation()?)
        } else {
            None
        };
        self.expect(TokenKind::Eq)?;
        let rhs = self.parse_expression()?;
        self.expect(TokenKind::Semi)?;
        Ok(ValStatement {
            binder,
            is_mutable,
            annotation,
            rhs,
            location: self.location_from(start),
        })
    }

    fn parse_if_statement(&mut self, start: usize) -> Result<Statement, SyntaxError> {
        self.expect(TokenKind::If)?;
        let condition = self.parse_expression()?;
        let if_true = self.parse_block()?;
        let if_false = if self.matches(TokenKind::Else) {
            if self.check(TokenKind::If) {
                let nested_start = self.current_span_start();
                let nested = self.parse_if_statement(nested_start)?;
                Some(Block {
                    location: nested.location,
                    members: vec![BlockMember::Statement(nested)],
                })
            } else {
                Some(self.parse_block()?)
            }
        } else {
            None
        };
        Ok(Statement {
            kind: StatementKind::If {
                condition,
                if_true,
                if_false,
            },
            location: self.location_from(start),
        })
    }

    fn parse_expression(&mut self) -> Result<Expression, SyntaxError> {
        self.parse_binary(0)
    }

    fn parse_binary(&mut self, level: usize) -> Result<Expression, SyntaxError> {
        let Some(operators) = BINARY_PRECEDENCE.get(level) else {
            return self.parse_prefix();
        };
        let mut lhs = self.parse_binary(level + 1)?;
        while let Some(operator) = self.current_binary_operator() {
            if !operators.contains(&operator) {
                break;
            }
            self.advance();
            let rhs = self.parse_binary(level + 1)?;
            let location = SourceLocation::between(lhs.location, rhs.location);
            lhs = Expression {
                kind: ExpressionKind::BinaryOperation {
                    operator,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                location,
            };
        }
        Ok(lhs)
    }

    fn current_binary_operator(&self) -> Option<BinaryOperator> {
        let operator = match self.peek_kind()? {
            TokenKind::Plus => BinaryOperator::Plus,
            TokenKind::Minus => BinaryOperator::Minus,
            TokenKind::Star => BinaryOperator::Times,
            TokenKind::And => BinaryOperator::And,
            TokenKind::Or => BinaryOperator::Or,
            TokenKind::EqEq => BinaryOperator::Equals,
            TokenKind::BangEq => BinaryOperator::NotEquals,
            TokenKind::Lt => BinaryOperator::LessThan,
            TokenKind::LtEq => BinaryOperator::LessThanEqual,
            TokenKind::Gt => BinaryOperator::GreaterThan,
            TokenKind::GtEq => BinaryOperator::GreaterThanEqual,
            _ => return None,
        };
        Some(operator)
    }

    fn parse_prefix(&mut self) -> Result<Expression, SyntaxError> {
        let start = self.current_span_start();
        let kind = match self.peek_kind() {
            Some(TokenKind::Bang) => {
                self.advance();
                ExpressionKind::Not(Box::new(self.parse_prefix()?))
            }
            Some(TokenKind::Ampersand) => {
                self.advance();
                if self.matches(TokenKind::Mut) {
                    ExpressionKind::AddressOfMut(Box::new(self.parse_prefix()?))
                } else {
                    ExpressionKind::AddressOf(Box::new(self.parse_prefix()?))
                }
            }
            Some(TokenKind::Star) => {
                self.advance();
                ExpressionKind::Load(Box::new(self.parse_prefix()?))
            }
            _ => return self.parse_postfix(),
        };
        Ok(Expression {
            kind,
            location: self.location_from(start),
        })
    }

    fn parse_postfix(&mut self) -> Result<Expression, SyntaxError> {
        let start = self.current_span_start();
        let mut expression = self.parse_primary()?;
        loop {
            let kind = match self.peek_kind() {
                Some(TokenKind::LParen) => {
                    self.advance();
                    let args = self.parse_argument_list()?;
                    ExpressionKind::Call {
                        callee: Box::new(expression),
                        type_args: None,
                        args,
                    }
                }
                Some(TokenKind::LBracket) => {
                    self.advance();
                    let type_args = self.parse_type_annotation_list(TokenKind::RBracket)?;
                    if self.matches(TokenKind::LParen) {
                        let args = self.parse_argument_list()?;
                        ExpressionKind::Call {
                            callee: Box::new(expression),
                            type_args: Some(type_args),
                            args,
                        }
                    } else {
                        ExpressionKind::TypeApplication {
                            lhs: Box::new(expression),
                            args: type_args,
                        }
                    }
                }
                Some(TokenKind::Dot) => {
                    self.advance();
                    let property = self.expect_identifier("Expected property name after `.`")?;
                    ExpressionKind::Property {
                        lhs: Box::new(expression),
                        property,
                    }
                }
                _ => return Ok(expression),
            };
            expression = Expression {
                kind,
                location: self.location_from(start),
            };
        }
    }

    fn parse_primary(&mut self) -> Result<Expression, SyntaxError> {
        let start = self.current_span_start();
        let kind = match self.peek_kind() {
            Some(TokenKind::LParen) => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect(TokenKind::RParen)?;
                return Ok(inner);
            }
            Some(TokenKind::Identifier(_)) => {
                ExpressionKind::Var(self.expect_identifier("Expected identifier")?)
            }
            Some(TokenKind::ByteString(bytes)) => {
                self.advance();
                ExpressionKind::ByteString(bytes)
            }
            Some(TokenKind::Integer(value)) => {
                self.advance();
                ExpressionKind::IntLiteral(value)
            }
            Some(TokenKind::True) => {
                self.advance();
                ExpressionKind::BoolLiteral(true)
            }
            Some(TokenKind::False) => {
                self.advance();
                ExpressionKind::BoolLiteral(false)
            }
            Some(TokenKind::NullPtr) => {
                self.advance();
                ExpressionKind::NullPtr
            }
            Some(TokenKind::This) => {
                self.advance();
                ExpressionKind::This
            }
            Some(TokenKind::SizeOf) => {
                self.advance();
                self.expect(TokenKind::LBracket)?;
                let annotation = self.parse_type_annotation()?;
                self.expect(TokenKind::RBracket)?;
                ExpressionKind::SizeOf(annotation)
            }
            Some(TokenKind::PointerCast) => {
                self.advance();
                self.expect(TokenKind::LBracket)?;
                let to_type = self.parse_type_annotation()?;
                self.expect(TokenKind::RBracket)?;
                self.expect(TokenKind::LParen)?;
                let arg = self.parse_expression()?;
                self.expect(TokenKind::RParen)?;
                ExpressionKind::PointerCast {
                    to_type,
                    arg: Box::new(arg),
                }
            }
            Some(TokenKind::If) => {
                self.advance();
                let condition = self.parse_expression()?;
                self.expect(TokenKind::Then)?;
                let true_branch = self.parse_expression()?;
                self.expect(TokenKind::Else)?;
                let false_branch = self.parse_expression()?;
                ExpressionKind::If {
                    condition: Box::new(condition),
                    true_branch: Box::new(true_branch),
                    false_branch: Box::new(false_branch),
                }
            }
            Some(TokenKind::Match) => {
                self.advance();
                let value = self.parse_expression()?;
                self.expect(TokenKind::LBrace)?;
                let mut arms = Vec::new();
                while !self.check(TokenKind::RBrace) && !self.is_eof() {
                    let pattern = self.parse_pattern()?;
                    self.expect(TokenKind::Arrow)?;
                    let expression = self.parse_expression()?;
                    arms.push(MatchArm {
                        pattern,
                        expression,
                    });
                    if !self.matches(TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(TokenKind::RBrace)?;
                ExpressionKind::Match {
                    value: Box::new(value),
                    arms,
                }
            }
            Some(TokenKind::New) => {
                self.advance();
                let path = self.parse_qualified_path()?;
                let type_args = if self.matches(TokenKind::LBracket) {
                    Some(self.parse_type_annotation_list(TokenKind::RBracket)?)
                } else {
                    None
                };
                self.expect(TokenKind::LParen)?;
                let args = self.parse_argument_list()?;
                ExpressionKind::New {
                    path,
                    type_args,
                    args,
                }
            }
            _ => return Err(self.error_here("Expected expression")),
        };
        Ok(Expression {
            kind,
            location: self.location_from(start),
        })
    }

    fn parse_pattern(&mut self) -> Result<Pattern, SyntaxError> {
        let start = self.current_span_start();
        let kind = match self.peek_kind() {
            Some(TokenKind::Dot) => {
                self.advance();
                let identifier = self.expect_identifier("Expected case name after `.`")?;
                let mut params = Vec::new();
                if self.matches(TokenKind::LParen) {
                    while !self.check(TokenKind::RParen) && !self.is_eof() {
                        params.push(self.parse_pattern()?);
                        if !self.matches(TokenKind::Comma) {
                            break;
                        }
                    }
                    self.expect(TokenKind::RParen)?;
                }
                PatternKind::DotName { identifier, params }
            }
            Some(TokenKind::Else) => {
                self.advance();
                PatternKind::Else
            }
            Some(TokenKind::Underscore) => {
                self.advance();
                PatternKind::Wildcard
            }
            Some(TokenKind::Identifier(_)) => {
                PatternKind::Name(self.expect_identifier("Expected pattern")?)
            }
            _ => return Err(self.error_here("Expected pattern")),
        };
        Ok(Pattern {
            kind,
            location: self.location_from(start),
        })
    }

    fn parse_argument_list(&mut self) -> Result<Vec<Expression>, SyntaxError> {
        let mut args = Vec::new();
        while !self.check(TokenKind::RParen) && !self.is_eof() {
            args.push(self.parse_expression()?);
            if !self.matches(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(args)
    }

    fn parse_type_annotation_list(
        &mut self,
        terminator: TokenKind,
    ) -> Result<Vec<TypeAnnotation>, SyntaxError> {
        let mut annotations = Vec::new();
        while !self.check(terminator.clone()) && !self.is_eof() {
            annotations.push(self.parse_type_annotation()?);
            if !self.matches(TokenKind::Comma) {
                break;
            }
        }
        self.expect(terminator)?;
        Ok(annotations)
    }

    fn parse_type_annotation(&mut self) -> Result<TypeAnnotation, SyntaxError> {
        let start = self.current_span_start();
        let first = self.parse_type_atom()?;
        if !self.check(TokenKind::Pipe) {
            return Ok(first);
        }
        let mut members = vec![first];
        while self.matches(TokenKind::Pipe) {
            members.push(self.parse_type_atom()?);
        }
        Ok(TypeAnnotation {
            kind: TypeAnnotationKind::Union(members),
            location: self.location_from(start),
        })
    }

    fn parse_type_atom(&mut self) -> Result<TypeAnnotation, SyntaxError> {
        let start = self.current_span_start();
        let kind = match self.peek_kind() {
            Some(TokenKind::Star) => {
                self.advance();
                if self.matches(TokenKind::Mut) {
                    TypeAnnotationKind::MutPtr(Box::new(self.parse_type_atom()?))
                } else {
                    TypeAnnotationKind::Ptr(Box::new(self.parse_type_atom()?))
                }
            }
            Some(TokenKind::LParen) => {
                self.advance();
                let from = self.parse_type_annotation_list(TokenKind::RParen)?;
                self.expect(TokenKind::Arrow)?;
                let to = self.parse_type_annotation()?;
                TypeAnnotationKind::Function {
                    from,
                    to: Box::new(to),
                }
            }
            Some(TokenKind::Identifier(name)) if name == "This" => {
                self.advance();
                TypeAnnotationKind::This
            }
            Some(TokenKind::Identifier(_)) => {
                let path = self.parse_qualified_path()?;
                let head = if path.identifiers.len() == 1 {
                    let mut identifiers = path.identifiers;
                    TypeAnnotationKind::Var(identifiers.remove(0))
                } else {
                    TypeAnnotationKind::Qualified(path)
                };
                if self.matches(TokenKind::LBracket) {
                    let callee = TypeAnnotation {
                        kind: head,
                        location: self.location_from(start),
                    };
                    let args = self.parse_type_annotation_list(TokenKind::RBracket)?;
                    TypeAnnotationKind::Application {
                        callee: Box::new(callee),
                        args,
                    }
                } else {
                    head
                }
            }
            _ => return Err(self.error_here("Expected type")),
        };
        Ok(TypeAnnotation {
            kind,
            location: self.location_from(start),
        })
    }

    fn parse_qualified_path(&mut self) -> Result<QualifiedPath, SyntaxError> {
        let start = self.current_span_start();
        let mut identifiers = vec![self.expect_identifier("Expected name")?];
        while self.check(TokenKind::Dot)
            && matches!(self.peek_kind_n(1), Some(TokenKind::Identifier(_)))
        {
            self.advance();
            identifiers.push(self.expect_identifier("Expected name after `.`")?);
        }
        Ok(QualifiedPath {
            identifiers,
            location: self.location_from(start),
        })
    }

    fn expect_identifier(&mut self, msg: &str) -> Result<Identifier, SyntaxError> {
        match self.peek_kind() {
            Some(TokenKind::Identifier(name)) => {
                let span = self.advance().span;
                Ok(Identifier {
                    name,
                    location: SourceLocation::new(self.file, span),
                })
            }
            _ => Err(self.error_here(msg)),
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<&Token, SyntaxError> {
        if self.check(kind.clone()) {
            Ok(self.advance())
        } else {
            let found = self
                .peek_kind()
                .map(|kind| kind.describe())
                .unwrap_or_else(|| "end of file".into());
            Err(self
                .error_here(&format!("Expected {}", kind.describe()))
                .with_label(format!("found {found}")))
        }
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        matches!(self.peek_kind(), Some(tk) if tk == kind)
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.tokens.get(self.pos).map(|t| t.kind.clone())
    }

    fn peek_kind_n(&self, n: usize) -> Option<TokenKind> {
        self.tokens.get(self.pos + n).map(|t| t.kind.clone())
    }

    fn advance(&mut self) -> &Token {
        if !self.is_eof() {
            self.pos += 1;
        }
        &self.tokens[self.pos.saturating_sub(1)]
    }

    fn is_eof(&self) -> bool {
        matches!(self.peek_kind(), Some(TokenKind::Eof) | None)
    }

    fn current_span_start(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|t| t.span.start)
            .unwrap_or_default()
    }

    fn location_from(&self, start: usize) -> SourceLocation {
        let end = self
            .pos
            .checked_sub(1)
            .and_then(|idx| self.tokens.get(idx))
            .map(|t| t.span.end)
            .unwrap_or(start)
            .max(start);
        SourceLocation::new(self.file, Span::new(start, end))
    }

    fn error_here(&self, message: &str) -> SyntaxError {
        let span = self
            .tokens
            .get(self.pos)
            .map(|t| t.span)
            .unwrap_or_else(|| {
                self.tokens
                    .last()
                    .map(|t| t.span)
                    .unwrap_or_else(|| Span::new(0, 0))
            });
        SyntaxError::new(message.to_string(), span)
    }

    fn report(&mut self, err: SyntaxError) {
        self.errors.push(err);
    }

    fn synchronize_declaration(&mut self) {
        if !self.is_eof() {
            self.advance();
        }
        while !self.is_eof() {
            match self.peek_kind() {
                Some(
                    TokenKind::Def
                    | TokenKind::Extern
                    | TokenKind::Struct
                    | TokenKind::Enum
                    | TokenKind::Interface
                    | TokenKind::Implementation
                    | TokenKind::Const
                    | TokenKind::Import,
                ) => return,
                _ => {
                    self.advance();
                }
            }
        }
    }
}
