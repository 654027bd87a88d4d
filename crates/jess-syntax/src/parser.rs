//! Recursive-descent parser producing the `jess-ast` model.
//!
//! The parser is speculative where Java's grammar demands it (casts,
//! lambdas, local-variable declarations, type-shaped method-reference
//! targets): it snapshots the token cursor, attempts the more specific
//! parse, and falls back on failure.

use crate::lexer::{tokenize, Token, TokenKind as T};
use crate::ParseError;
use jess_ast::{
    AnnotationArg, AnnotationUse, Block, CompilationUnit, ConstructorDecl, EnumConstant, Expr,
    FieldDecl, Import, InitializerDecl, LambdaBody, LambdaParam, Literal, LiteralKind,
    LocalVarDecl, Member, MethodDecl, MethodRefTarget, Modifiers, NameExpr, NamedType, Param,
    PrimitiveKind, Stmt, TypeDecl, TypeKind, TypeParam, TypeRef, UnaryOp, WildcardBound,
};
use jess_core::{FileId, NodeId, Span};
use std::path::Path;

const KEYWORDS: &[&str] = &[
    "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class", "const",
    "continue", "default", "do", "double", "else", "enum", "extends", "final", "finally", "float",
    "for", "goto", "if", "implements", "import", "instanceof", "int", "interface", "long",
    "native", "new", "package", "private", "protected", "public", "return", "short", "static",
    "strictfp", "super", "switch", "synchronized", "this", "throw", "throws", "transient", "try",
    "void", "volatile", "while",
];

fn is_keyword(word: &str) -> bool {
    KEYWORDS.binary_search(&word).is_ok()
}

/// Flattens a `Name`/`FieldAccess` chain back into a dotted name, for
/// receivers that turn out to denote a type (`a.b.Foo.class`,
/// `A.super.m()`).
fn expr_as_dotted_name(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Name(name) => Some(name.name.clone()),
        Expr::FieldAccess { receiver, name, .. } => {
            let mut prefix = expr_as_dotted_name(receiver)?;
            prefix.push('.');
            prefix.push_str(name);
            Some(prefix)
        }
        _ => None,
    }
}

/// Parses `text` into a compilation unit.
pub fn parse_compilation_unit(
    text: &str,
    file: FileId,
    path: &Path,
) -> Result<CompilationUnit, ParseError> {
    let tokens = tokenize(text)?;
    let mut parser = Parser {
        text,
        tokens,
        pos: 0,
        next_node: 0,
        file,
    };
    parser.unit(path)
}

/// Parses a standalone type spelling (`int`, `java.util.List<T>[]`, `void`).
///
/// Used wherever a type arrives as text: oracle-reported member signatures
/// and descriptor translations.
pub fn parse_type_ref(text: &str) -> Result<TypeRef, ParseError> {
    let tokens = tokenize(text)?;
    let mut parser = Parser {
        text,
        tokens,
        pos: 0,
        next_node: 0,
        file: FileId::from_raw(u32::MAX),
    };
    let ty = parser.return_type()?;
    if !parser.at(T::Eof) {
        return Err(parser.error_here("trailing input after type"));
    }
    Ok(ty)
}

struct Parser<'a> {
    text: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    next_node: u32,
    file: FileId,
}

impl<'a> Parser<'a> {
    fn cur(&self) -> Token {
        self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn kind(&self) -> T {
        self.cur().kind
    }

    fn nth(&self, offset: usize) -> Token {
        self.tokens[(self.pos + offset).min(self.tokens.len() - 1)]
    }

    fn cur_text(&self) -> &'a str {
        self.cur().text(self.text)
    }

    fn at(&self, kind: T) -> bool {
        self.kind() == kind
    }

    fn at_word(&self, word: &str) -> bool {
        self.at(T::Ident) && self.cur_text() == word
    }

    fn nth_is_word(&self, offset: usize, word: &str) -> bool {
        let token = self.nth(offset);
        token.kind == T::Ident && token.text(self.text) == word
    }

    fn bump(&mut self) -> Token {
        let token = self.cur();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: T) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn eat_word(&mut self, word: &str) -> bool {
        if self.at_word(word) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: T, what: &str) -> Result<Token, ParseError> {
        if self.at(kind) {
            Ok(self.bump())
        } else {
            Err(self.error_here(format!("expected {what}")))
        }
    }

    fn expect_ident(&mut self) -> Result<(String, Span), ParseError> {
        if self.at(T::Ident) && !is_keyword(self.cur_text()) {
            let token = self.bump();
            Ok((token.text(self.text).to_string(), token.span))
        } else {
            Err(self.error_here("expected identifier"))
        }
    }

    fn error_here(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(self.text, self.cur().span, message)
    }

    fn node_id(&mut self) -> NodeId {
        let id = NodeId::from_raw(self.next_node);
        self.next_node += 1;
        id
    }

    fn prev_end(&self) -> usize {
        if self.pos == 0 {
            0
        } else {
            self.tokens[self.pos - 1].span.end
        }
    }

    fn span_from(&self, start: usize) -> Span {
        Span::new(start, self.prev_end())
    }

    // ---- compilation unit ------------------------------------------------

    fn unit(&mut self, path: &Path) -> Result<CompilationUnit, ParseError> {
        let leading = self.annotations()?;

        let mut package = None;
        let mut pending_annotations = leading;
        if self.at_word("package") {
            self.bump();
            let (name, _) = self.qualified_name()?;
            self.expect(T::Semi, "`;`")?;
            package = Some(name);
            // Annotations before `package` annotate the package; they play
            // no role in slicing.
            pending_annotations = Vec::new();
        }

        let mut imports = Vec::new();
        while self.at_word("import") {
            let start = self.cur().span.start;
            self.bump();
            let is_static = self.eat_word("static");
            let (name, _) = self.qualified_name()?;
            let mut is_star = false;
            if self.eat(T::Dot) {
                self.expect(T::Star, "`*`")?;
                is_star = true;
            }
            self.expect(T::Semi, "`;`")?;
            imports.push(Import {
                path: name,
                is_static,
                is_star,
                span: self.span_from(start),
            });
        }

        let mut types = Vec::new();
        while !self.at(T::Eof) {
            if self.eat(T::Semi) {
                continue;
            }
            let annotations = if pending_annotations.is_empty() {
                self.annotations()?
            } else {
                std::mem::take(&mut pending_annotations)
            };
            let (modifiers, more) = self.modifiers_and_annotations()?;
            let mut all = annotations;
            all.extend(more);
            types.push(self.type_decl(all, modifiers)?);
        }

        Ok(CompilationUnit {
            file: self.file,
            path: path.to_path_buf(),
            package,
            imports,
            types,
        })
    }

    fn qualified_name(&mut self) -> Result<(String, Span), ParseError> {
        let (mut name, first) = self.expect_ident()?;
        let start = first.start;
        while self.at(T::Dot) && self.nth(1).kind == T::Ident && !is_keyword(self.nth(1).text(self.text))
        {
            self.bump();
            let (segment, _) = self.expect_ident()?;
            name.push('.');
            name.push_str(&segment);
        }
        Ok((name, self.span_from(start)))
    }

    // ---- annotations & modifiers ----------------------------------------

    fn annotations(&mut self) -> Result<Vec<AnnotationUse>, ParseError> {
        let mut annotations = Vec::new();
        while self.at(T::At) && !self.nth_is_word(1, "interface") {
            annotations.push(self.annotation()?);
        }
        Ok(annotations)
    }

    fn annotation(&mut self) -> Result<AnnotationUse, ParseError> {
        let start = self.cur().span.start;
        self.expect(T::At, "`@`")?;
        let (name, name_span) = self.qualified_name()?;
        let ty = NamedType::new(name, name_span);
        let mut args = Vec::new();
        if self.eat(T::LParen) {
            if !self.at(T::RParen) {
                if self.at(T::Ident)
                    && !is_keyword(self.cur_text())
                    && self.nth(1).kind == T::Eq
                {
                    loop {
                        let (arg_name, _) = self.expect_ident()?;
                        self.expect(T::Eq, "`=`")?;
                        let value = self.annotation_value()?;
                        args.push(AnnotationArg::Named {
                            name: arg_name,
                            value,
                        });
                        if !self.eat(T::Comma) {
                            break;
                        }
                    }
                } else {
                    args.push(AnnotationArg::Value(self.annotation_value()?));
                }
            }
            self.expect(T::RParen, "`)`")?;
        }
        Ok(AnnotationUse {
            ty,
            args,
            span: self.span_from(start),
        })
    }

    fn annotation_value(&mut self) -> Result<Expr, ParseError> {
        if self.at(T::LBrace) {
            let start = self.cur().span.start;
            self.bump();
            let mut values = Vec::new();
            while !self.at(T::RBrace) {
                values.push(self.annotation_value()?);
                if !self.eat(T::Comma) {
                    break;
                }
            }
            self.expect(T::RBrace, "`}`")?;
            return Ok(Expr::ArrayInit {
                values,
                span: self.span_from(start),
            });
        }
        if self.at(T::At) {
            return Err(self.error_here("nested annotation values are not supported"));
        }
        self.ternary()
    }

    fn modifiers_and_annotations(
        &mut self,
    ) -> Result<(Modifiers, Vec<AnnotationUse>), ParseError> {
        let mut modifiers = Modifiers::empty();
        let mut annotations = Vec::new();
        loop {
            if self.at(T::At) && !self.nth_is_word(1, "interface") {
                annotations.push(self.annotation()?);
                continue;
            }
            let flag = match self.cur_text() {
                "public" => Modifiers::PUBLIC,
                "protected" => Modifiers::PROTECTED,
                "private" => Modifiers::PRIVATE,
                "static" => Modifiers::STATIC,
                "final" => Modifiers::FINAL,
                "abstract" => Modifiers::ABSTRACT,
                "default" => Modifiers::DEFAULT,
                "native" => Modifiers::NATIVE,
                "synchronized" => Modifiers::SYNCHRONIZED,
                "transient" => Modifiers::TRANSIENT,
                "volatile" => Modifiers::VOLATILE,
                "strictfp" => Modifiers::STRICTFP,
                _ => break,
            };
            if !self.at(T::Ident) {
                break;
            }
            self.bump();
            modifiers.insert(flag);
        }
        Ok((modifiers, annotations))
    }

    // ---- type declarations ----------------------------------------------

    fn type_decl(
        &mut self,
        annotations: Vec<AnnotationUse>,
        modifiers: Modifiers,
    ) -> Result<TypeDecl, ParseError> {
        let start = self.cur().span.start;
        let kind = if self.eat_word("class") {
            TypeKind::Class
        } else if self.eat_word("interface") {
            TypeKind::Interface
        } else if self.eat_word("enum") {
            TypeKind::Enum
        } else if self.at(T::At) && self.nth_is_word(1, "interface") {
            self.bump();
            self.bump();
            TypeKind::Annotation
        } else {
            return Err(self.error_here("expected type declaration"));
        };

        let (name, name_span) = self.expect_ident()?;
        let id = self.node_id();
        let mut decl = TypeDecl::new(id, kind, name.clone(), name_span);
        decl.annotations = annotations;
        decl.modifiers = modifiers;

        if self.at(T::Lt) {
            decl.type_params = self.type_params()?;
        }

        match kind {
            TypeKind::Class => {
                if self.eat_word("extends") {
                    decl.superclass = Some(self.type_ref()?);
                }
                if self.eat_word("implements") {
                    decl.interfaces = self.type_list()?;
                }
            }
            TypeKind::Interface => {
                if self.eat_word("extends") {
                    decl.interfaces = self.type_list()?;
                }
            }
            TypeKind::Enum => {
                if self.eat_word("implements") {
                    decl.interfaces = self.type_list()?;
                }
            }
            TypeKind::Annotation => {}
        }

        self.expect(T::LBrace, "`{`")?;

        if kind == TypeKind::Enum {
            while self.at(T::Ident) && !is_keyword(self.cur_text()) {
                let (constant_name, constant_span) = self.expect_ident()?;
                let mut args = Vec::new();
                if self.eat(T::LParen) {
                    while !self.at(T::RParen) {
                        args.push(self.expr()?);
                        if !self.eat(T::Comma) {
                            break;
                        }
                    }
                    self.expect(T::RParen, "`)`")?;
                }
                if self.at(T::LBrace) {
                    return Err(self.error_here("enum constant bodies are not supported"));
                }
                decl.enum_constants.push(EnumConstant {
                    name: constant_name,
                    args,
                    span: constant_span,
                });
                if !self.eat(T::Comma) {
                    break;
                }
            }
            // Constant list terminator before members.
            self.eat(T::Semi);
        }

        while !self.at(T::RBrace) && !self.at(T::Eof) {
            if self.eat(T::Semi) {
                continue;
            }
            let members = self.member(&name, kind)?;
            decl.members.extend(members);
        }
        self.expect(T::RBrace, "`}`")?;
        decl.span = self.span_from(start);
        Ok(decl)
    }

    fn type_list(&mut self) -> Result<Vec<TypeRef>, ParseError> {
        let mut list = vec![self.type_ref()?];
        while self.eat(T::Comma) {
            list.push(self.type_ref()?);
        }
        Ok(list)
    }

    fn member(&mut self, owner_name: &str, owner_kind: TypeKind) -> Result<Vec<Member>, ParseError> {
        let start = self.cur().span.start;
        let (modifiers, annotations) = self.modifiers_and_annotations()?;

        if self.at_word("class")
            || self.at_word("interface")
            || self.at_word("enum")
            || (self.at(T::At) && self.nth_is_word(1, "interface"))
        {
            let nested = self.type_decl(annotations, modifiers)?;
            return Ok(vec![Member::Type(nested)]);
        }

        if self.at(T::LBrace) {
            let body = self.block()?;
            let id = self.node_id();
            return Ok(vec![Member::Initializer(InitializerDecl {
                id,
                is_static: modifiers.is_static(),
                body,
                span: self.span_from(start),
            })]);
        }

        let type_params = if self.at(T::Lt) {
            self.type_params()?
        } else {
            Vec::new()
        };

        // Constructor: the owner's name immediately followed by `(`.
        if owner_kind != TypeKind::Annotation
            && self.at(T::Ident)
            && self.cur_text() == owner_name
            && self.nth(1).kind == T::LParen
        {
            let (_, _) = self.expect_ident()?;
            let (params, varargs) = self.params()?;
            let throws = self.throws_clause()?;
            let body = self.block()?;
            let id = self.node_id();
            return Ok(vec![Member::Constructor(ConstructorDecl {
                id,
                modifiers,
                annotations,
                type_params,
                name: owner_name.to_string(),
                params,
                varargs,
                throws,
                body,
                span: self.span_from(start),
            })]);
        }

        let return_type = self.return_type()?;
        let (member_name, _) = self.expect_ident()?;

        if self.at(T::LParen) {
            let (params, varargs) = self.params()?;
            let throws = self.throws_clause()?;
            let annotation_default = if owner_kind == TypeKind::Annotation {
                if self.eat_word("default") {
                    Some(self.annotation_value()?)
                } else {
                    None
                }
            } else {
                None
            };
            let body = if self.at(T::LBrace) {
                Some(self.block()?)
            } else {
                self.expect(T::Semi, "`;` or method body")?;
                None
            };
            let id = self.node_id();
            return Ok(vec![Member::Method(MethodDecl {
                id,
                modifiers,
                annotations,
                type_params,
                return_type,
                name: member_name,
                params,
                varargs,
                throws,
                body,
                annotation_default,
                span: self.span_from(start),
            })]);
        }

        if !type_params.is_empty() {
            return Err(self.error_here("expected method declaration"));
        }
        if return_type.is_void() {
            return Err(self.error_here("fields cannot have type `void`"));
        }

        // Field declarator list.
        let mut fields = Vec::new();
        let mut name = member_name;
        loop {
            let mut ty = return_type.clone();
            while self.at(T::LBracket) && self.nth(1).kind == T::RBracket {
                let bracket = self.bump();
                self.bump();
                ty = TypeRef::array_of(ty, Span::new(bracket.span.start, self.prev_end()));
            }
            let init = if self.eat(T::Eq) {
                Some(self.variable_initializer()?)
            } else {
                None
            };
            let id = self.node_id();
            fields.push(Member::Field(FieldDecl {
                id,
                modifiers,
                annotations: annotations.clone(),
                ty,
                name,
                init,
                span: self.span_from(start),
            }));
            if !self.eat(T::Comma) {
                break;
            }
            name = self.expect_ident()?.0;
        }
        self.expect(T::Semi, "`;`")?;
        Ok(fields)
    }

    fn variable_initializer(&mut self) -> Result<Expr, ParseError> {
        if self.at(T::LBrace) {
            return self.annotation_value();
        }
        self.expr()
    }

    fn params(&mut self) -> Result<(Vec<Param>, bool), ParseError> {
        self.expect(T::LParen, "`(`")?;
        let mut params = Vec::new();
        let mut varargs = false;
        while !self.at(T::RParen) {
            let start = self.cur().span.start;
            let mut annotations = Vec::new();
            loop {
                if self.at(T::At) {
                    annotations.push(self.annotation()?);
                } else if self.at_word("final") {
                    self.bump();
                } else {
                    break;
                }
            }
            let mut ty = self.type_ref()?;
            if self.eat(T::Ellipsis) {
                varargs = true;
                let span = ty.span();
                ty = TypeRef::array_of(ty, span);
            }
            let (name, _) = self.expect_ident()?;
            while self.at(T::LBracket) && self.nth(1).kind == T::RBracket {
                let bracket = self.bump();
                self.bump();
                ty = TypeRef::array_of(ty, Span::new(bracket.span.start, self.prev_end()));
            }
            params.push(Param {
                annotations,
                ty,
                name,
                span: self.span_from(start),
            });
            if !self.eat(T::Comma) {
                break;
            }
        }
        self.expect(T::RParen, "`)`")?;
        Ok((params, varargs))
    }

    fn throws_clause(&mut self) -> Result<Vec<TypeRef>, ParseError> {
        if self.eat_word("throws") {
            self.type_list()
        } else {
            Ok(Vec::new())
        }
    }

    fn type_params(&mut self) -> Result<Vec<TypeParam>, ParseError> {
        self.expect(T::Lt, "`<`")?;
        let mut params = Vec::new();
        while !self.at(T::Gt) {
            let (name, span) = self.expect_ident()?;
            let mut param = TypeParam::new(name, span);
            if self.eat_word("extends") {
                param.bounds.push(self.type_ref()?);
                while self.eat(T::Amp) {
                    param.bounds.push(self.type_ref()?);
                }
            }
            params.push(param);
            if !self.eat(T::Comma) {
                break;
            }
        }
        self.expect(T::Gt, "`>`")?;
        Ok(params)
    }

    // ---- types -----------------------------------------------------------

    fn return_type(&mut self) -> Result<TypeRef, ParseError> {
        if self.at_word("void") {
            let token = self.bump();
            return Ok(TypeRef::Void(token.span));
        }
        self.type_ref()
    }

    fn type_ref(&mut self) -> Result<TypeRef, ParseError> {
        let core = self.type_core()?;
        self.with_dims(core)
    }

    fn with_dims(&mut self, mut ty: TypeRef) -> Result<TypeRef, ParseError> {
        while self.at(T::LBracket) && self.nth(1).kind == T::RBracket {
            let bracket = self.bump();
            self.bump();
            ty = TypeRef::array_of(ty, Span::new(bracket.span.start, self.prev_end()));
        }
        Ok(ty)
    }

    fn type_core(&mut self) -> Result<TypeRef, ParseError> {
        if !self.at(T::Ident) {
            return Err(self.error_here("expected type"));
        }
        if let Some(primitive) = PrimitiveKind::from_keyword(self.cur_text()) {
            let token = self.bump();
            return Ok(TypeRef::Primitive(primitive, token.span));
        }
        if is_keyword(self.cur_text()) {
            return Err(self.error_here("expected type"));
        }
        let (name, span) = self.qualified_name()?;
        let mut named = NamedType::new(name, span);
        if self.at(T::Lt) {
            named.args = self.type_args()?;
        }
        Ok(TypeRef::Named(named))
    }

    fn type_args(&mut self) -> Result<Vec<TypeRef>, ParseError> {
        self.expect(T::Lt, "`<`")?;
        let mut args = Vec::new();
        while !self.at(T::Gt) {
            if self.at(T::Question) {
                let start = self.bump().span.start;
                let bound = if self.eat_word("extends") {
                    Some((WildcardBound::Extends, Box::new(self.type_ref()?)))
                } else if self.eat_word("super") {
                    Some((WildcardBound::Super, Box::new(self.type_ref()?)))
                } else {
                    None
                };
                args.push(TypeRef::Wildcard {
                    bound,
                    span: self.span_from(start),
                });
            } else {
                args.push(self.type_ref()?);
            }
            if !self.eat(T::Comma) {
                break;
            }
        }
        self.expect(T::Gt, "`>`")?;
        Ok(args)
    }

    // ---- statements -------------------------------------------------------

    fn block(&mut self) -> Result<Block, ParseError> {
        let start = self.cur().span.start;
        self.expect(T::LBrace, "`{`")?;
        let mut statements = Vec::new();
        while !self.at(T::RBrace) && !self.at(T::Eof) {
            self.stmt_into(&mut statements)?;
        }
        self.expect(T::RBrace, "`}`")?;
        Ok(Block::new(statements, self.span_from(start)))
    }

    fn stmt_single(&mut self) -> Result<Stmt, ParseError> {
        let mut buffer = Vec::new();
        self.stmt_into(&mut buffer)?;
        if buffer.len() == 1 {
            Ok(buffer.remove(0))
        } else {
            let span = buffer
                .first()
                .map(|stmt| stmt.span())
                .unwrap_or_else(|| Span::point(self.prev_end()));
            Ok(Stmt::Block(Block::new(buffer, span)))
        }
    }

    fn stmt_into(&mut self, out: &mut Vec<Stmt>) -> Result<(), ParseError> {
        let start = self.cur().span.start;
        if self.at(T::LBrace) {
            let block = self.block()?;
            out.push(Stmt::Block(block));
            return Ok(());
        }
        if self.at(T::Semi) {
            let token = self.bump();
            out.push(Stmt::Empty(token.span));
            return Ok(());
        }
        if self.at_word("return") {
            self.bump();
            let value = if self.at(T::Semi) {
                None
            } else {
                Some(self.expr()?)
            };
            self.expect(T::Semi, "`;`")?;
            out.push(Stmt::Return {
                value,
                span: self.span_from(start),
            });
            return Ok(());
        }
        if self.at_word("if") {
            self.bump();
            self.expect(T::LParen, "`(`")?;
            let cond = self.expr()?;
            self.expect(T::RParen, "`)`")?;
            let then_branch = Box::new(self.stmt_single()?);
            let else_branch = if self.eat_word("else") {
                Some(Box::new(self.stmt_single()?))
            } else {
                None
            };
            out.push(Stmt::If {
                cond,
                then_branch,
                else_branch,
                span: self.span_from(start),
            });
            return Ok(());
        }
        if self.at_word("while") {
            self.bump();
            self.expect(T::LParen, "`(`")?;
            let cond = self.expr()?;
            self.expect(T::RParen, "`)`")?;
            let body = Box::new(self.stmt_single()?);
            out.push(Stmt::While {
                cond,
                body,
                span: self.span_from(start),
            });
            return Ok(());
        }
        if self.at_word("throw") {
            self.bump();
            let value = self.expr()?;
            self.expect(T::Semi, "`;`")?;
            out.push(Stmt::Throw {
                value,
                span: self.span_from(start),
            });
            return Ok(());
        }
        for unsupported in ["for", "do", "switch", "try", "synchronized", "break", "continue", "assert"] {
            if self.at_word(unsupported) {
                return Err(self.error_here(format!("`{unsupported}` statements are not supported")));
            }
        }
        if self.at_word("final") {
            self.bump();
            return self.local_decl_into(start, out);
        }

        // Speculative local-variable declaration.
        let snapshot = self.pos;
        if self.try_local_decl(start, out)? {
            return Ok(());
        }
        self.pos = snapshot;

        let expr = self.expr()?;
        self.expect(T::Semi, "`;`")?;
        out.push(Stmt::Expr(expr));
        Ok(())
    }

    fn try_local_decl(
        &mut self,
        start: usize,
        out: &mut Vec<Stmt>,
    ) -> Result<bool, ParseError> {
        let snapshot = self.pos;
        let parsed = (|| -> Result<(), ParseError> {
            let _ = self.type_ref()?;
            let _ = self.expect_ident()?;
            Ok(())
        })();
        if parsed.is_err() {
            self.pos = snapshot;
            return Ok(false);
        }
        // The declarator must continue with `=`, `;`, `,` or `[`; anything
        // else means the prefix was an expression after all.
        if !matches!(self.kind(), T::Eq | T::Semi | T::Comma | T::LBracket) {
            self.pos = snapshot;
            return Ok(false);
        }
        self.pos = snapshot;
        self.local_decl_into(start, out)?;
        Ok(true)
    }

    fn local_decl_into(&mut self, start: usize, out: &mut Vec<Stmt>) -> Result<(), ParseError> {
        let base = self.type_ref()?;
        loop {
            let (name, _) = self.expect_ident()?;
            let mut ty = base.clone();
            while self.at(T::LBracket) && self.nth(1).kind == T::RBracket {
                let bracket = self.bump();
                self.bump();
                ty = TypeRef::array_of(ty, Span::new(bracket.span.start, self.prev_end()));
            }
            let init = if self.eat(T::Eq) {
                Some(self.variable_initializer()?)
            } else {
                None
            };
            out.push(Stmt::Local(LocalVarDecl {
                ty,
                name,
                init,
                span: self.span_from(start),
            }));
            if !self.eat(T::Comma) {
                break;
            }
        }
        self.expect(T::Semi, "`;`")?;
        Ok(())
    }

    // ---- expressions ------------------------------------------------------

    fn expr(&mut self) -> Result<Expr, ParseError> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expr, ParseError> {
        let start = self.cur().span.start;
        let lhs = self.ternary()?;
        let op = match self.kind() {
            T::Eq => {
                self.bump();
                None
            }
            T::PlusEq => {
                self.bump();
                Some("+=")
            }
            T::MinusEq => {
                self.bump();
                Some("-=")
            }
            T::StarEq => {
                self.bump();
                Some("*=")
            }
            T::SlashEq => {
                self.bump();
                Some("/=")
            }
            T::PercentEq => {
                self.bump();
                Some("%=")
            }
            T::AmpEq => {
                self.bump();
                Some("&=")
            }
            T::PipeEq => {
                self.bump();
                Some("|=")
            }
            T::CaretEq => {
                self.bump();
                Some("^=")
            }
            T::ShlEq => {
                self.bump();
                Some("<<=")
            }
            T::Gt => {
                // `>>=` / `>>>=` arrive as adjacent `>` tokens.
                if let Some((op, count)) = self.peek_shift_assign() {
                    for _ in 0..count {
                        self.bump();
                    }
                    Some(op)
                } else {
                    return Ok(lhs);
                }
            }
            _ => return Ok(lhs),
        };
        let rhs = self.assignment()?;
        Ok(Expr::Assign {
            lhs: Box::new(lhs),
            op,
            rhs: Box::new(rhs),
            span: self.span_from(start),
        })
    }

    fn peek_shift_assign(&self) -> Option<(&'static str, usize)> {
        let first = self.cur();
        let second = self.nth(1);
        if first.kind != T::Gt || first.span.end != second.span.start {
            return None;
        }
        match second.kind {
            T::GtEq => Some((">>=", 2)),
            T::Gt => {
                let third = self.nth(2);
                if second.span.end == third.span.start && third.kind == T::GtEq {
                    Some((">>>=", 3))
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    fn ternary(&mut self) -> Result<Expr, ParseError> {
        let start = self.cur().span.start;
        let cond = self.binary(1)?;
        if self.eat(T::Question) {
            let then_value = self.expr()?;
            self.expect(T::Colon, "`:`")?;
            let else_value = self.ternary()?;
            return Ok(Expr::Conditional {
                cond: Box::new(cond),
                then_value: Box::new(then_value),
                else_value: Box::new(else_value),
                span: self.span_from(start),
            });
        }
        Ok(cond)
    }

    fn peek_binary_op(&self) -> Option<(&'static str, u8, usize)> {
        let op = match self.kind() {
            T::PipePipe => ("||", 1, 1),
            T::AmpAmp => ("&&", 2, 1),
            T::Pipe => ("|", 3, 1),
            T::Caret => ("^", 4, 1),
            T::Amp => ("&", 5, 1),
            T::EqEq => ("==", 6, 1),
            T::NotEq => ("!=", 6, 1),
            T::Lt => ("<", 7, 1),
            T::LtEq => ("<=", 7, 1),
            T::GtEq => (">=", 7, 1),
            T::Gt => {
                let second = self.nth(1);
                if self.cur().span.end == second.span.start && second.kind == T::Gt {
                    let third = self.nth(2);
                    if second.span.end == third.span.start && third.kind == T::Gt {
                        (">>>", 8, 3)
                    } else {
                        (">>", 8, 2)
                    }
                } else {
                    (">", 7, 1)
                }
            }
            T::Shl => ("<<", 8, 1),
            T::Plus => ("+", 9, 1),
            T::Minus => ("-", 9, 1),
            T::Star => ("*", 10, 1),
            T::Slash => ("/", 10, 1),
            T::Percent => ("%", 10, 1),
            T::Ident if self.cur_text() == "instanceof" => ("instanceof", 7, 1),
            _ => return None,
        };
        Some(op)
    }

    fn binary(&mut self, min_prec: u8) -> Result<Expr, ParseError> {
        let start = self.cur().span.start;
        let mut lhs = self.unary()?;
        while let Some((op, prec, tokens)) = self.peek_binary_op() {
            if prec < min_prec {
                break;
            }
            if op == "instanceof" {
                self.bump();
                let ty = self.type_ref()?;
                lhs = Expr::InstanceOf {
                    value: Box::new(lhs),
                    ty,
                    span: self.span_from(start),
                };
                continue;
            }
            for _ in 0..tokens {
                self.bump();
            }
            let rhs = self.binary(prec + 1)?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                span: self.span_from(start),
            };
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        let start = self.cur().span.start;
        let op = match self.kind() {
            T::Plus => Some(UnaryOp::Plus),
            T::Minus => Some(UnaryOp::Minus),
            T::Bang => Some(UnaryOp::Not),
            T::Tilde => Some(UnaryOp::BitNot),
            T::PlusPlus => Some(UnaryOp::PreInc),
            T::MinusMinus => Some(UnaryOp::PreDec),
            _ => None,
        };
        if let Some(op) = op {
            self.bump();
            let value = self.unary()?;
            return Ok(Expr::Unary {
                op,
                value: Box::new(value),
                span: self.span_from(start),
            });
        }

        if self.at(T::LParen) {
            if let Some(cast) = self.try_cast(start)? {
                return Ok(cast);
            }
        }

        let primary = self.primary()?;
        self.postfix(primary, start)
    }

    fn try_cast(&mut self, start: usize) -> Result<Option<Expr>, ParseError> {
        let snapshot = self.pos;
        self.bump();
        let parsed = self.type_ref();
        match parsed {
            Ok(ty) if self.at(T::RParen) => {
                self.bump();
                let follows = match self.kind() {
                    T::Ident => true,
                    T::IntLit
                    | T::LongLit
                    | T::FloatLit
                    | T::DoubleLit
                    | T::CharLit
                    | T::StringLit
                    | T::LParen
                    | T::Bang
                    | T::Tilde => true,
                    _ => false,
                };
                // A cast of a non-primitive type to a following `(`/ident is
                // still ambiguous with a parenthesised name; Java resolves it
                // semantically, and so does the resolver downstream.
                if follows {
                    let value = self.unary()?;
                    return Ok(Some(Expr::Cast {
                        ty,
                        value: Box::new(value),
                        span: self.span_from(start),
                    }));
                }
                self.pos = snapshot;
                Ok(None)
            }
            _ => {
                self.pos = snapshot;
                Ok(None)
            }
        }
    }

    fn postfix(&mut self, mut expr: Expr, start: usize) -> Result<Expr, ParseError> {
        loop {
            match self.kind() {
                T::Dot => {
                    if self.nth_is_word(1, "super") {
                        // Qualified interface-super receiver: `A.super.m()`.
                        let qualifier = match expr_as_dotted_name(&expr) {
                            Some(name) => NamedType::new(name, expr.span()),
                            None => return Err(self.error_here("invalid `super` qualifier")),
                        };
                        self.bump();
                        self.bump();
                        expr = Expr::SuperRef {
                            qualifier: Some(qualifier),
                            span: self.span_from(start),
                        };
                        continue;
                    }
                    if self.nth_is_word(1, "class") {
                        // `Name.class`; rebuild the receiver as a type.
                        let ty = match expr_as_dotted_name(&expr) {
                            Some(name) => {
                                TypeRef::Named(NamedType::new(name, expr.span()))
                            }
                            None => return Err(self.error_here("invalid `.class` receiver")),
                        };
                        self.bump();
                        self.bump();
                        expr = Expr::ClassLiteral {
                            ty,
                            span: self.span_from(start),
                        };
                        continue;
                    }
                    if self.nth(1).kind == T::Lt {
                        // Explicit generic invocation `recv.<T>m(args)`.
                        self.bump();
                        let type_args = self.type_args()?;
                        let (name, _) = self.expect_ident()?;
                        self.expect(T::LParen, "`(`")?;
                        let args = self.call_args()?;
                        expr = Expr::MethodCall {
                            receiver: Some(Box::new(expr)),
                            type_args,
                            name,
                            args,
                            resolution: Default::default(),
                            span: self.span_from(start),
                        };
                        continue;
                    }
                    if self.nth_is_word(1, "new") {
                        return Err(self.error_here("qualified `new` is not supported"));
                    }
                    self.bump();
                    let (name, _) = self.expect_ident()?;
                    if self.at(T::LParen) {
                        self.bump();
                        let args = self.call_args()?;
                        expr = Expr::MethodCall {
                            receiver: Some(Box::new(expr)),
                            type_args: Vec::new(),
                            name,
                            args,
                            resolution: Default::default(),
                            span: self.span_from(start),
                        };
                    } else {
                        expr = Expr::FieldAccess {
                            receiver: Box::new(expr),
                            name,
                            resolution: Default::default(),
                            span: self.span_from(start),
                        };
                    }
                }
                T::LBracket => {
                    self.bump();
                    let index = self.expr()?;
                    self.expect(T::RBracket, "`]`")?;
                    expr = Expr::ArrayIndex {
                        array: Box::new(expr),
                        index: Box::new(index),
                        span: self.span_from(start),
                    };
                }
                T::ColonColon => {
                    self.bump();
                    let name = if self.eat_word("new") {
                        "new".to_string()
                    } else {
                        self.expect_ident()?.0
                    };
                    expr = Expr::MethodRef {
                        target: MethodRefTarget::Expr(Box::new(expr)),
                        name,
                        span: self.span_from(start),
                    };
                }
                T::PlusPlus => {
                    self.bump();
                    expr = Expr::Unary {
                        op: UnaryOp::PostInc,
                        value: Box::new(expr),
                        span: self.span_from(start),
                    };
                }
                T::MinusMinus => {
                    self.bump();
                    expr = Expr::Unary {
                        op: UnaryOp::PostDec,
                        value: Box::new(expr),
                        span: self.span_from(start),
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    fn call_args(&mut self) -> Result<Vec<Expr>, ParseError> {
        // Opening `(` already consumed.
        let mut args = Vec::new();
        while !self.at(T::RParen) {
            args.push(self.expr()?);
            if !self.eat(T::Comma) {
                break;
            }
        }
        self.expect(T::RParen, "`)`")?;
        Ok(args)
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        let start = self.cur().span.start;
        match self.kind() {
            T::IntLit => Ok(self.literal(LiteralKind::Int)),
            T::LongLit => Ok(self.literal(LiteralKind::Long)),
            T::FloatLit => Ok(self.literal(LiteralKind::Float)),
            T::DoubleLit => Ok(self.literal(LiteralKind::Double)),
            T::CharLit => Ok(self.literal(LiteralKind::Char)),
            T::StringLit => Ok(self.literal(LiteralKind::String)),
            T::LParen => {
                if let Some(lambda) = self.try_lambda(start)? {
                    return Ok(lambda);
                }
                self.bump();
                let inner = self.expr()?;
                self.expect(T::RParen, "`)`")?;
                Ok(Expr::Paren {
                    value: Box::new(inner),
                    span: self.span_from(start),
                })
            }
            T::Ident => {
                let text = self.cur_text();
                match text {
                    "true" | "false" => Ok(self.literal(LiteralKind::Bool)),
                    "null" => Ok(self.literal(LiteralKind::Null)),
                    "this" => {
                        self.bump();
                        if self.eat(T::LParen) {
                            let args = self.call_args()?;
                            return Ok(Expr::MethodCall {
                                receiver: None,
                                type_args: Vec::new(),
                                name: "this".to_string(),
                                args,
                                resolution: Default::default(),
                                span: self.span_from(start),
                            });
                        }
                        Ok(Expr::This {
                            span: self.span_from(start),
                        })
                    }
                    "super" => {
                        self.bump();
                        if self.eat(T::LParen) {
                            let args = self.call_args()?;
                            return Ok(Expr::MethodCall {
                                receiver: None,
                                type_args: Vec::new(),
                                name: "super".to_string(),
                                args,
                                resolution: Default::default(),
                                span: self.span_from(start),
                            });
                        }
                        Ok(Expr::SuperRef {
                            qualifier: None,
                            span: self.span_from(start),
                        })
                    }
                    "new" => self.new_expr(start),
                    _ => {
                        // Primitive class literals (`int.class`,
                        // `long[].class`).
                        if PrimitiveKind::from_keyword(text).is_some() {
                            let ty = self.type_ref()?;
                            if self.at(T::Dot) && self.nth_is_word(1, "class") {
                                self.bump();
                                self.bump();
                                return Ok(Expr::ClassLiteral {
                                    ty,
                                    span: self.span_from(start),
                                });
                            }
                            return Err(self.error_here(format!("unexpected `{text}`")));
                        }
                        if is_keyword(text) {
                            return Err(self.error_here(format!("unexpected `{text}`")));
                        }
                        // Single-parameter lambda shorthand.
                        if self.nth(1).kind == T::Arrow {
                            let (name, span) = self.expect_ident()?;
                            self.bump();
                            let body = self.lambda_body()?;
                            return Ok(Expr::Lambda {
                                params: vec![LambdaParam {
                                    ty: None,
                                    name,
                                    span,
                                }],
                                body,
                                span: self.span_from(start),
                            });
                        }
                        // Array-typed method references (`String[]::new`)
                        // need a type-shaped target.
                        let snapshot = self.pos;
                        if let Ok(ty) = self.type_ref() {
                            if ty.array_dims() > 0 && self.at(T::ColonColon) {
                                self.bump();
                                let name = if self.eat_word("new") {
                                    "new".to_string()
                                } else {
                                    self.expect_ident()?.0
                                };
                                return Ok(Expr::MethodRef {
                                    target: MethodRefTarget::Type(ty),
                                    name,
                                    span: self.span_from(start),
                                });
                            }
                        }
                        self.pos = snapshot;

                        let (name, span) = self.expect_ident()?;
                        if self.at(T::LParen) {
                            self.bump();
                            let args = self.call_args()?;
                            return Ok(Expr::MethodCall {
                                receiver: None,
                                type_args: Vec::new(),
                                name,
                                args,
                                resolution: Default::default(),
                                span: self.span_from(start),
                            });
                        }
                        Ok(Expr::Name(NameExpr::new(name, span)))
                    }
                }
            }
            _ => Err(self.error_here("expected expression")),
        }
    }

    fn literal(&mut self, kind: LiteralKind) -> Expr {
        let token = self.bump();
        Expr::Literal(Literal::new(kind, token.text(self.text), token.span))
    }

    fn new_expr(&mut self, start: usize) -> Result<Expr, ParseError> {
        self.bump();
        let core = self.type_core()?;
        if self.at(T::LBracket) {
            let element = core;
            let mut dims = Vec::new();
            while self.eat(T::LBracket) {
                if self.at(T::RBracket) {
                    dims.push(None);
                } else {
                    dims.push(Some(self.expr()?));
                }
                self.expect(T::RBracket, "`]`")?;
            }
            let initializer = if self.at(T::LBrace) {
                self.bump();
                let mut values = Vec::new();
                while !self.at(T::RBrace) {
                    values.push(self.variable_initializer()?);
                    if !self.eat(T::Comma) {
                        break;
                    }
                }
                self.expect(T::RBrace, "`}`")?;
                Some(values)
            } else {
                None
            };
            return Ok(Expr::NewArray {
                element,
                dims,
                initializer,
                span: self.span_from(start),
            });
        }
        self.expect(T::LParen, "`(`")?;
        let args = self.call_args()?;
        if self.at(T::LBrace) {
            return Err(self.error_here("anonymous class bodies are not supported"));
        }
        Ok(Expr::New {
            ty: core,
            args,
            resolution: Default::default(),
            span: self.span_from(start),
        })
    }

    fn try_lambda(&mut self, start: usize) -> Result<Option<Expr>, ParseError> {
        // Look ahead for `)` `->` at balanced depth.
        let mut depth = 0usize;
        let mut offset = 0usize;
        loop {
            let token = self.nth(offset);
            match token.kind {
                T::LParen => depth += 1,
                T::RParen => {
                    depth -= 1;
                    if depth == 0 {
                        if self.nth(offset + 1).kind != T::Arrow {
                            return Ok(None);
                        }
                        break;
                    }
                }
                T::Eof => return Ok(None),
                _ => {}
            }
            offset += 1;
        }

        self.expect(T::LParen, "`(`")?;
        let mut params = Vec::new();
        while !self.at(T::RParen) {
            let param_start = self.cur().span.start;
            while self.at_word("final") {
                self.bump();
            }
            // `(x, y)` vs `(Type x, Type y)`.
            let snapshot = self.pos;
            let typed = (|| -> Result<(TypeRef, String), ParseError> {
                let ty = self.type_ref()?;
                let (name, _) = self.expect_ident()?;
                Ok((ty, name))
            })();
            match typed {
                Ok((ty, name)) if matches!(self.kind(), T::Comma | T::RParen) => {
                    params.push(LambdaParam {
                        ty: Some(ty),
                        name,
                        span: self.span_from(param_start),
                    });
                }
                _ => {
                    self.pos = snapshot;
                    let (name, span) = self.expect_ident()?;
                    params.push(LambdaParam {
                        ty: None,
                        name,
                        span,
                    });
                }
            }
            if !self.eat(T::Comma) {
                break;
            }
        }
        self.expect(T::RParen, "`)`")?;
        self.expect(T::Arrow, "`->`")?;
        let body = self.lambda_body()?;
        Ok(Some(Expr::Lambda {
            params,
            body,
            span: self.span_from(start),
        }))
    }

    fn lambda_body(&mut self) -> Result<LambdaBody, ParseError> {
        if self.at(T::LBrace) {
            Ok(LambdaBody::Block(self.block()?))
        } else {
            Ok(LambdaBody::Expr(Box::new(self.expr()?)))
        }
    }
}
