//! Recursive descent parser implementation

use basalt_ast::*;
use basalt_lexer::{Token, TokenKind};

use crate::ParseError;

pub struct Parser<'a> {
    source: &'a str,
    path: String,
    file: FileId,
    tokens: Vec<Token>,
    pos: usize,
    ids: &'a mut NodeIdGen,
}

impl<'a> Parser<'a> {
    pub fn new(
        source: &'a str,
        path: impl Into<String>,
        file: FileId,
        tokens: Vec<Token>,
        ids: &'a mut NodeIdGen,
    ) -> Self {
        Self {
            source,
            path: path.into(),
            file,
            tokens,
            pos: 0,
            ids,
        }
    }

    // === Utilities ===

    fn current(&self) -> Token {
        self.tokens
            .get(self.pos)
            .copied()
            .unwrap_or_else(|| *self.tokens.last().expect("tokens should have at least EOF"))
    }

    fn peek(&self) -> TokenKind {
        self.current().kind
    }

    fn peek_ahead(&self, n: usize) -> TokenKind {
        self.tokens
            .get(self.pos + n)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::Eof)
    }

    fn advance(&mut self) -> Token {
        let token = self.current();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek() == kind
    }

    fn consume(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        if self.at(kind) {
            Ok(self.advance())
        } else {
            Err(ParseError::unexpected(
                kind.describe(),
                self.peek(),
                self.current().span,
            ))
        }
    }

    fn text(&self, token: Token) -> &'a str {
        token.text(self.source)
    }

    fn span(&self) -> Span {
        self.current().span
    }

    fn ident(&mut self) -> Result<(String, Span), ParseError> {
        let token = self.consume(TokenKind::Ident)?;
        Ok((self.text(token).to_string(), token.span))
    }

    fn expr(&mut self, kind: ExprKind, span: Span) -> Expr {
        Expr {
            id: self.ids.next(),
            kind,
            span,
        }
    }

    /// Parse an integer literal token (decimal, hex, or binary)
    fn int_literal(&mut self) -> Result<(i128, Span), ParseError> {
        let token = self.current();
        let text = self.text(token).replace('_', "");
        let value = match token.kind {
            TokenKind::Int => text.parse::<i128>().ok(),
            TokenKind::HexInt => i128::from_str_radix(&text[2..], 16).ok(),
            TokenKind::BinInt => i128::from_str_radix(&text[2..], 2).ok(),
            _ => {
                return Err(ParseError::unexpected(
                    "integer literal",
                    token.kind,
                    token.span,
                ))
            }
        };
        self.advance();
        match value {
            Some(v) => Ok((v, token.span)),
            None => Err(ParseError::IntOutOfRange {
                text,
                span: token.span,
            }),
        }
    }

    fn at_int_literal(&self) -> bool {
        matches!(
            self.peek(),
            TokenKind::Int | TokenKind::HexInt | TokenKind::BinInt
        )
    }

    // === File ===

    pub fn parse_source_file(&mut self) -> Result<SourceFile, ParseError> {
        let start = self.span();
        let mut includes = Vec::new();
        while self.at(TokenKind::Include) {
            includes.push(self.parse_include()?);
        }

        let mut declarations = Vec::new();
        while !self.at(TokenKind::Eof) {
            declarations.push(self.parse_declaration()?);
        }

        let end = self.span();
        Ok(SourceFile {
            file: self.file,
            path: self.path.clone(),
            includes,
            declarations,
            span: start.merge(end),
        })
    }

    fn parse_include(&mut self) -> Result<IncludeDecl, ParseError> {
        let start = self.span();
        self.consume(TokenKind::Include)?;
        let token = self.consume(TokenKind::String)?;
        let path = unescape_string(self.text(token));
        self.consume(TokenKind::Semi)?;
        Ok(IncludeDecl { path, span: start })
    }

    // === Declarations ===

    pub fn parse_declaration(&mut self) -> Result<Declaration, ParseError> {
        let start = self.span();

        let visibility = match self.peek() {
            TokenKind::Public => {
                self.advance();
                Visibility::Public
            }
            TokenKind::Private => {
                self.advance();
                Visibility::Private
            }
            _ => Visibility::Public,
        };

        let kind = match self.peek() {
            TokenKind::Scope => DeclarationKind::Scope(self.parse_scope_decl()?),
            TokenKind::Struct => DeclarationKind::Struct(self.parse_struct_decl()?),
            TokenKind::Enum => DeclarationKind::Enum(self.parse_enum_decl()?),
            TokenKind::Bitmap => DeclarationKind::Bitmap(self.parse_bitmap_decl()?),
            TokenKind::Register => DeclarationKind::Register(self.parse_register_decl()?),
            TokenKind::Extern => DeclarationKind::Function(self.parse_extern_decl()?),
            k if k.is_modifier() || k.is_type_start() || k == TokenKind::Ident => {
                self.parse_function_or_variable()?
            }
            _ => {
                return Err(ParseError::ExpectedDeclaration { span: start });
            }
        };

        let end = self.span();
        Ok(Declaration {
            kind,
            visibility,
            span: start.merge(end),
        })
    }

    fn parse_scope_decl(&mut self) -> Result<ScopeDecl, ParseError> {
        let start = self.span();
        self.consume(TokenKind::Scope)?;
        let (name, _) = self.ident()?;
        self.consume(TokenKind::LBrace)?;

        // Nested scope declarations parse fine here; rejecting them is a
        // structural check owned by the symbol builder.
        let mut members = Vec::new();
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            members.push(self.parse_declaration()?);
        }

        self.consume(TokenKind::RBrace)?;
        let end = self.span();
        Ok(ScopeDecl {
            name,
            members,
            span: start.merge(end),
        })
    }

    fn parse_struct_decl(&mut self) -> Result<StructDecl, ParseError> {
        let start = self.span();
        self.consume(TokenKind::Struct)?;
        let (name, _) = self.ident()?;
        self.consume(TokenKind::LBrace)?;

        let mut fields = Vec::new();
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            let field_start = self.span();
            let mut ty = self.parse_type()?;
            let (field_name, _) = self.ident()?;
            ty.dims = self.parse_array_dims()?;
            self.consume(TokenKind::Semi)?;
            fields.push(FieldDecl {
                name: field_name,
                ty,
                span: field_start,
            });
        }

        self.consume(TokenKind::RBrace)?;
        let end = self.span();
        Ok(StructDecl {
            name,
            fields,
            span: start.merge(end),
        })
    }

    fn parse_enum_decl(&mut self) -> Result<EnumDecl, ParseError> {
        let start = self.span();
        self.consume(TokenKind::Enum)?;
        let (name, _) = self.ident()?;
        self.consume(TokenKind::LBrace)?;

        let mut variants = Vec::new();
        while self.at(TokenKind::Ident) {
            let variant_start = self.span();
            let (variant_name, _) = self.ident()?;
            let value = if self.at(TokenKind::Assign) {
                self.advance();
                let negative = if self.at(TokenKind::Minus) {
                    self.advance();
                    true
                } else {
                    false
                };
                let (v, span) = self.int_literal()?;
                let v = if negative { -v } else { v };
                Some(i64::try_from(v).map_err(|_| ParseError::IntOutOfRange {
                    text: v.to_string(),
                    span,
                })?)
            } else {
                None
            };
            variants.push(EnumVariant {
                name: variant_name,
                value,
                span: variant_start,
            });
            if self.at(TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }

        self.consume(TokenKind::RBrace)?;
        let end = self.span();
        Ok(EnumDecl {
            name,
            variants,
            span: start.merge(end),
        })
    }

    fn parse_bitmap_decl(&mut self) -> Result<BitmapDecl, ParseError> {
        let start = self.span();
        self.consume(TokenKind::Bitmap)?;
        let (name, _) = self.ident()?;
        self.consume(TokenKind::Colon)?;
        let backing = self.parse_type()?;
        self.consume(TokenKind::LBrace)?;

        let mut fields = Vec::new();
        while self.at(TokenKind::Ident) {
            let field_start = self.span();
            let (field_name, _) = self.ident()?;
            self.consume(TokenKind::Colon)?;
            let (offset, offset_span) = self.int_literal()?;
            let offset = u32::try_from(offset).map_err(|_| ParseError::IntOutOfRange {
                text: offset.to_string(),
                span: offset_span,
            })?;
            let width = if self.at(TokenKind::Comma) {
                self.advance();
                let (w, w_span) = self.int_literal()?;
                u32::try_from(w).map_err(|_| ParseError::IntOutOfRange {
                    text: w.to_string(),
                    span: w_span,
                })?
            } else {
                1
            };
            self.consume(TokenKind::Semi)?;
            fields.push(BitFieldDecl {
                name: field_name,
                offset,
                width,
                span: field_start,
            });
        }

        self.consume(TokenKind::RBrace)?;
        let end = self.span();
        Ok(BitmapDecl {
            name,
            backing,
            fields,
            span: start.merge(end),
        })
    }

    fn parse_register_decl(&mut self) -> Result<RegisterDecl, ParseError> {
        let start = self.span();
        self.consume(TokenKind::Register)?;
        let (name, _) = self.ident()?;
        self.consume(TokenKind::At)?;
        let (address, addr_span) = self.int_literal()?;
        let address = u64::try_from(address).map_err(|_| ParseError::IntOutOfRange {
            text: address.to_string(),
            span: addr_span,
        })?;
        self.consume(TokenKind::Colon)?;
        let ty = self.parse_type()?;
        self.consume(TokenKind::Semi)?;
        let end = self.span();
        Ok(RegisterDecl {
            name,
            address,
            ty,
            span: start.merge(end),
        })
    }

    fn parse_extern_decl(&mut self) -> Result<FunctionDecl, ParseError> {
        let start = self.span();
        self.consume(TokenKind::Extern)?;
        let return_type = self.parse_type()?;
        let (name, _) = self.ident()?;
        let params = self.parse_params()?;
        self.consume(TokenKind::Semi)?;
        let end = self.span();
        Ok(FunctionDecl {
            name,
            params,
            return_type,
            body: None,
            is_extern: true,
            span: start.merge(end),
        })
    }

    /// A declaration opening with a type: function if `(` follows the name,
    /// variable otherwise.
    fn parse_function_or_variable(&mut self) -> Result<DeclarationKind, ParseError> {
        let start = self.span();
        let mut ty = self.parse_type()?;
        let (name, _) = self.ident()?;

        if self.at(TokenKind::LParen) {
            let params = self.parse_params()?;
            let body = self.parse_block()?;
            let end = self.span();
            Ok(DeclarationKind::Function(FunctionDecl {
                name,
                params,
                return_type: ty,
                body: Some(body),
                is_extern: false,
                span: start.merge(end),
            }))
        } else {
            ty.dims = self.parse_array_dims()?;
            let init = if self.at(TokenKind::Assign) {
                self.advance();
                Some(self.parse_expr()?)
            } else {
                None
            };
            self.consume(TokenKind::Semi)?;
            let end = self.span();
            Ok(DeclarationKind::Variable(VarDecl {
                name,
                ty,
                init,
                span: start.merge(end),
            }))
        }
    }

    fn parse_params(&mut self) -> Result<Vec<Param>, ParseError> {
        self.consume(TokenKind::LParen)?;
        let mut params = Vec::new();
        while !self.at(TokenKind::RParen) && !self.at(TokenKind::Eof) {
            let start = self.span();
            let mut ty = self.parse_type()?;
            let (name, _) = self.ident()?;
            ty.dims = self.parse_array_dims()?;
            params.push(Param {
                name,
                ty,
                span: start,
            });
            if self.at(TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        self.consume(TokenKind::RParen)?;
        Ok(params)
    }

    // === Types ===

    fn parse_type(&mut self) -> Result<TypeNode, ParseError> {
        let start = self.span();
        let mut modifiers = Modifiers::default();
        let mut overflow = OverflowPolicy::None;

        loop {
            match self.peek() {
                TokenKind::Const => {
                    self.advance();
                    modifiers.is_const = true;
                }
                TokenKind::Atomic => {
                    self.advance();
                    modifiers.is_atomic = true;
                }
                TokenKind::Volatile => {
                    self.advance();
                    modifiers.is_volatile = true;
                }
                TokenKind::Clamp => {
                    self.advance();
                    overflow = OverflowPolicy::Clamp;
                }
                TokenKind::Wrap => {
                    self.advance();
                    overflow = OverflowPolicy::Wrap;
                }
                _ => break,
            }
        }

        let kind = match self.peek() {
            TokenKind::U8 => TypeKind::U8,
            TokenKind::U16 => TypeKind::U16,
            TokenKind::U32 => TypeKind::U32,
            TokenKind::U64 => TypeKind::U64,
            TokenKind::I8 => TypeKind::I8,
            TokenKind::I16 => TypeKind::I16,
            TokenKind::I32 => TypeKind::I32,
            TokenKind::I64 => TypeKind::I64,
            TokenKind::F32 => TypeKind::F32,
            TokenKind::F64 => TypeKind::F64,
            TokenKind::Bool => TypeKind::Bool,
            TokenKind::Void => TypeKind::Void,
            TokenKind::Str => {
                self.advance();
                self.consume(TokenKind::Lt)?;
                let (n, n_span) = self.int_literal()?;
                let n = u32::try_from(n).map_err(|_| ParseError::IntOutOfRange {
                    text: n.to_string(),
                    span: n_span,
                })?;
                self.consume(TokenKind::Gt)?;
                let mut node = TypeNode::new(TypeKind::Str(n), start);
                node.modifiers = modifiers;
                node.overflow = overflow;
                return Ok(node);
            }
            TokenKind::Ident => {
                let (name, _) = self.ident()?;
                let mut node = TypeNode::new(TypeKind::Named(name), start);
                node.modifiers = modifiers;
                node.overflow = overflow;
                return Ok(node);
            }
            _ => return Err(ParseError::InvalidType { span: start }),
        };
        self.advance();

        let mut node = TypeNode::new(kind, start);
        node.modifiers = modifiers;
        node.overflow = overflow;
        Ok(node)
    }

    fn parse_array_dims(&mut self) -> Result<Vec<ArrayLen>, ParseError> {
        let mut dims = Vec::new();
        while self.at(TokenKind::LBracket) {
            self.advance();
            let len = if self.at_int_literal() {
                let (n, span) = self.int_literal()?;
                ArrayLen::Literal(u64::try_from(n).map_err(|_| ParseError::IntOutOfRange {
                    text: n.to_string(),
                    span,
                })?)
            } else {
                let (name, _) = self.ident()?;
                ArrayLen::Named(name)
            };
            self.consume(TokenKind::RBracket)?;
            dims.push(len);
        }
        Ok(dims)
    }

    // === Statements ===

    fn parse_block(&mut self) -> Result<Block, ParseError> {
        let start = self.span();
        self.consume(TokenKind::LBrace)?;
        let mut statements = Vec::new();
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            statements.push(self.parse_statement()?);
        }
        self.consume(TokenKind::RBrace)?;
        let end = self.span();
        Ok(Block {
            statements,
            span: start.merge(end),
        })
    }

    fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        let start = self.span();
        match self.peek() {
            TokenKind::Return => {
                self.advance();
                let value = if self.at(TokenKind::Semi) {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                self.consume(TokenKind::Semi)?;
                Ok(Statement {
                    kind: StatementKind::Return(value),
                    span: start,
                })
            }
            TokenKind::If => self.parse_if(),
            TokenKind::While => {
                self.advance();
                self.consume(TokenKind::LParen)?;
                let condition = self.parse_expr()?;
                self.consume(TokenKind::RParen)?;
                let body = self.parse_block()?;
                Ok(Statement {
                    kind: StatementKind::While { condition, body },
                    span: start,
                })
            }
            TokenKind::For => self.parse_for(),
            TokenKind::Switch => self.parse_switch(),
            TokenKind::Critical => {
                self.advance();
                let body = self.parse_block()?;
                Ok(Statement {
                    kind: StatementKind::Critical(body),
                    span: start,
                })
            }
            k if k.is_modifier() || k.is_type_start() => self.parse_local_decl(),
            // `Point origin;`: identifier followed by identifier is a
            // declaration with a named type
            TokenKind::Ident if self.peek_ahead(1) == TokenKind::Ident => self.parse_local_decl(),
            _ => self.parse_assign_or_expr(true),
        }
    }

    fn parse_local_decl(&mut self) -> Result<Statement, ParseError> {
        let start = self.span();
        let mut ty = self.parse_type()?;
        let (name, _) = self.ident()?;
        ty.dims = self.parse_array_dims()?;
        let init = if self.at(TokenKind::Assign) {
            self.advance();
            Some(self.parse_expr()?)
        } else {
            None
        };
        self.consume(TokenKind::Semi)?;
        Ok(Statement {
            kind: StatementKind::Local(LocalDecl {
                name,
                ty,
                init,
                span: start,
            }),
            span: start,
        })
    }

    fn parse_assign_or_expr(&mut self, consume_semi: bool) -> Result<Statement, ParseError> {
        let start = self.span();
        let target = self.parse_expr()?;

        let kind = if let Some(op) = assign_op_of(self.peek()) {
            self.advance();
            let value = self.parse_expr()?;
            StatementKind::Assign { target, op, value }
        } else {
            StatementKind::Expr(target)
        };

        if consume_semi {
            self.consume(TokenKind::Semi)?;
        }
        Ok(Statement { kind, span: start })
    }

    fn parse_if(&mut self) -> Result<Statement, ParseError> {
        let start = self.span();
        self.consume(TokenKind::If)?;
        self.consume(TokenKind::LParen)?;
        let condition = self.parse_expr()?;
        self.consume(TokenKind::RParen)?;
        let then_block = self.parse_block()?;

        let else_block = if self.at(TokenKind::Else) {
            self.advance();
            if self.at(TokenKind::If) {
                // `else if` chains become a single-statement else block
                let nested = self.parse_if()?;
                let span = nested.span;
                Some(Block {
                    statements: vec![nested],
                    span,
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
                then_block,
                else_block,
            },
            span: start,
        })
    }

    fn parse_for(&mut self) -> Result<Statement, ParseError> {
        let start = self.span();
        self.consume(TokenKind::For)?;
        self.consume(TokenKind::LParen)?;

        let init = if self.at(TokenKind::Semi) {
            self.advance();
            None
        } else if self.peek().is_modifier()
            || self.peek().is_type_start()
            || (self.at(TokenKind::Ident) && self.peek_ahead(1) == TokenKind::Ident)
        {
            Some(Box::new(self.parse_local_decl()?))
        } else {
            Some(Box::new(self.parse_assign_or_expr(true)?))
        };

        let condition = if self.at(TokenKind::Semi) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.consume(TokenKind::Semi)?;

        let step = if self.at(TokenKind::RParen) {
            None
        } else {
            Some(Box::new(self.parse_assign_or_expr(false)?))
        };
        self.consume(TokenKind::RParen)?;

        let body = self.parse_block()?;
        Ok(Statement {
            kind: StatementKind::For {
                init,
                condition,
                step,
                body,
            },
            span: start,
        })
    }

    fn parse_switch(&mut self) -> Result<Statement, ParseError> {
        let start = self.span();
        self.consume(TokenKind::Switch)?;
        self.consume(TokenKind::LParen)?;
        let scrutinee = self.parse_expr()?;
        self.consume(TokenKind::RParen)?;
        self.consume(TokenKind::LBrace)?;

        let mut cases = Vec::new();
        let mut default_block = None;
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            if self.at(TokenKind::Case) {
                let case_start = self.span();
                self.advance();
                let value = self.parse_expr()?;
                let body = self.parse_block()?;
                cases.push(SwitchCase {
                    value,
                    body,
                    span: case_start,
                });
            } else if self.at(TokenKind::Default) {
                self.advance();
                default_block = Some(self.parse_block()?);
            } else {
                return Err(ParseError::unexpected(
                    "`case` or `default`",
                    self.peek(),
                    self.span(),
                ));
            }
        }
        self.consume(TokenKind::RBrace)?;

        Ok(Statement {
            kind: StatementKind::Switch {
                scrutinee,
                cases,
                default_block,
            },
            span: start,
        })
    }

    // === Expressions ===

    pub fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_ternary()
    }

    fn parse_ternary(&mut self) -> Result<Expr, ParseError> {
        let condition = self.parse_binary(0)?;
        if self.at(TokenKind::Question) {
            self.advance();
            let then_expr = self.parse_expr()?;
            self.consume(TokenKind::Colon)?;
            let else_expr = self.parse_expr()?;
            let span = condition.span.merge(else_expr.span);
            return Ok(self.expr(
                ExprKind::Ternary {
                    condition: Box::new(condition),
                    then_expr: Box::new(then_expr),
                    else_expr: Box::new(else_expr),
                },
                span,
            ));
        }
        Ok(condition)
    }

    fn parse_binary(&mut self, min_prec: u8) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_unary()?;
        while let Some(op) = binary_op_of(self.peek()) {
            let prec = precedence(op);
            if prec < min_prec {
                break;
            }
            self.advance();
            let rhs = self.parse_binary(prec + 1)?;
            let span = lhs.span.merge(rhs.span);
            lhs = self.expr(
                ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                span,
            );
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let start = self.span();
        let op = match self.peek() {
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Bang => Some(UnaryOp::Not),
            TokenKind::Tilde => Some(UnaryOp::BitNot),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let operand = self.parse_unary()?;
            let span = start.merge(operand.span);
            return Ok(self.expr(
                ExprKind::Unary {
                    op,
                    operand: Box::new(operand),
                },
                span,
            ));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;
        while self.at(TokenKind::LBracket) {
            self.advance();
            let first = self.parse_expr()?;
            if self.at(TokenKind::Comma) {
                // `x[offset, width]`: bit field view
                self.advance();
                let width = self.parse_expr()?;
                self.consume(TokenKind::RBracket)?;
                let span = expr.span.merge(width.span);
                expr = self.expr(
                    ExprKind::BitAccess {
                        base: Box::new(expr),
                        offset: Box::new(first),
                        width: Box::new(width),
                    },
                    span,
                );
            } else {
                self.consume(TokenKind::RBracket)?;
                let span = expr.span.merge(first.span);
                expr = self.expr(
                    ExprKind::ArrayIndex {
                        base: Box::new(expr),
                        index: Box::new(first),
                    },
                    span,
                );
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let start = self.span();
        match self.peek() {
            TokenKind::Int | TokenKind::HexInt | TokenKind::BinInt => {
                let (value, span) = self.int_literal()?;
                Ok(self.expr(ExprKind::Int(value), span))
            }
            TokenKind::Float => {
                let token = self.advance();
                let value = self
                    .text(token)
                    .replace('_', "")
                    .parse::<f64>()
                    .map_err(|_| ParseError::InvalidExpression { span: token.span })?;
                Ok(self.expr(ExprKind::Float(value), token.span))
            }
            TokenKind::True => {
                self.advance();
                Ok(self.expr(ExprKind::Bool(true), start))
            }
            TokenKind::False => {
                self.advance();
                Ok(self.expr(ExprKind::Bool(false), start))
            }
            TokenKind::String => {
                let token = self.advance();
                let value = unescape_string(self.text(token));
                Ok(self.expr(ExprKind::Str(value), token.span))
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.consume(TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::This | TokenKind::Global | TokenKind::Ident => self.parse_name_expr(),
            _ => Err(ParseError::InvalidExpression { span: start }),
        }
    }

    /// Parse an identifier, qualified member chain, or call
    fn parse_name_expr(&mut self) -> Result<Expr, ParseError> {
        let start = self.span();
        let (head_qualifier, mut segments) = match self.peek() {
            TokenKind::This => {
                self.advance();
                self.consume(TokenKind::Dot)?;
                (Some(Qualifier::This), Vec::new())
            }
            TokenKind::Global => {
                self.advance();
                self.consume(TokenKind::Dot)?;
                (Some(Qualifier::Global), Vec::new())
            }
            _ => {
                let (name, _) = self.ident()?;
                (None, vec![name])
            }
        };

        let mut end = start;
        if head_qualifier.is_some() {
            let (name, span) = self.ident()?;
            segments.push(name);
            end = span;
        }
        while self.at(TokenKind::Dot) {
            self.advance();
            let (name, span) = self.ident()?;
            segments.push(name);
            end = span;
        }

        if self.at(TokenKind::LParen) {
            let (qualifier, path) = match head_qualifier {
                Some(q) => (Some(q), segments),
                None if segments.len() == 1 => (None, segments),
                None => {
                    let head = segments.remove(0);
                    (Some(Qualifier::Name(head)), segments)
                }
            };
            let callee = Callee {
                qualifier,
                path,
                span: start.merge(end),
            };
            let args = self.parse_args()?;
            let span = start.merge(self.span());
            return Ok(self.expr(ExprKind::Call(CallExpr { callee, args }), span));
        }

        let span = start.merge(end);
        let kind = match head_qualifier {
            Some(q) => ExprKind::Member {
                qualifier: q,
                path: segments,
            },
            None if segments.len() == 1 => ExprKind::Ident(segments.into_iter().next().unwrap()),
            None => {
                let head = segments.remove(0);
                ExprKind::Member {
                    qualifier: Qualifier::Name(head),
                    path: segments,
                }
            }
        };
        Ok(self.expr(kind, span))
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>, ParseError> {
        self.consume(TokenKind::LParen)?;
        let mut args = Vec::new();
        while !self.at(TokenKind::RParen) && !self.at(TokenKind::Eof) {
            args.push(self.parse_expr()?);
            if self.at(TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        self.consume(TokenKind::RParen)?;
        Ok(args)
    }
}

/// Binary operator for a token, if any
fn binary_op_of(kind: TokenKind) -> Option<BinaryOp> {
    match kind {
        TokenKind::Plus => Some(BinaryOp::Add),
        TokenKind::Minus => Some(BinaryOp::Sub),
        TokenKind::Star => Some(BinaryOp::Mul),
        TokenKind::Slash => Some(BinaryOp::Div),
        TokenKind::Percent => Some(BinaryOp::Rem),
        TokenKind::Amp => Some(BinaryOp::BitAnd),
        TokenKind::Pipe => Some(BinaryOp::BitOr),
        TokenKind::Caret => Some(BinaryOp::BitXor),
        TokenKind::Shl => Some(BinaryOp::Shl),
        TokenKind::Shr => Some(BinaryOp::Shr),
        TokenKind::EqEq => Some(BinaryOp::Eq),
        TokenKind::NotEq => Some(BinaryOp::Ne),
        TokenKind::Lt => Some(BinaryOp::Lt),
        TokenKind::Le => Some(BinaryOp::Le),
        TokenKind::Gt => Some(BinaryOp::Gt),
        TokenKind::Ge => Some(BinaryOp::Ge),
        TokenKind::AmpAmp => Some(BinaryOp::And),
        TokenKind::PipePipe => Some(BinaryOp::Or),
        _ => None,
    }
}

fn assign_op_of(kind: TokenKind) -> Option<AssignOp> {
    match kind {
        TokenKind::Assign => Some(AssignOp::Set),
        TokenKind::AddAssign => Some(AssignOp::Add),
        TokenKind::SubAssign => Some(AssignOp::Sub),
        TokenKind::MulAssign => Some(AssignOp::Mul),
        TokenKind::DivAssign => Some(AssignOp::Div),
        TokenKind::RemAssign => Some(AssignOp::Rem),
        TokenKind::AndAssign => Some(AssignOp::BitAnd),
        TokenKind::OrAssign => Some(AssignOp::BitOr),
        TokenKind::XorAssign => Some(AssignOp::BitXor),
        TokenKind::ShlAssign => Some(AssignOp::Shl),
        TokenKind::ShrAssign => Some(AssignOp::Shr),
        _ => None,
    }
}

/// C-style precedence; higher binds tighter
fn precedence(op: BinaryOp) -> u8 {
    match op {
        BinaryOp::Or => 1,
        BinaryOp::And => 2,
        BinaryOp::BitOr => 3,
        BinaryOp::BitXor => 4,
        BinaryOp::BitAnd => 5,
        BinaryOp::Eq | BinaryOp::Ne => 6,
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => 7,
        BinaryOp::Shl | BinaryOp::Shr => 8,
        BinaryOp::Add | BinaryOp::Sub => 9,
        BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => 10,
    }
}

/// Strip surrounding quotes and process the common escapes
fn unescape_string(raw: &str) -> String {
    let inner = &raw[1..raw.len().saturating_sub(1)];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some('0') => out.push('\0'),
                Some(other) => out.push(other),
                None => {}
            }
        } else {
            out.push(c);
        }
    }
    out
}
