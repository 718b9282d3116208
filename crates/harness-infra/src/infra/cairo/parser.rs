//! Recursive-descent parser for the supported Cairo 0 subset.

use super::ast::{
    BinaryOp, Binding, Call, CallTarget, Expr, Function, Ident, Module, Param, ReturnValue,
    ReturnValues, Stmt, TypeRef,
};
use super::lexer::{Lexer, SourceMap, Span, Token, TokenKind};
use crate::domain::{Felt, encode_short_string};

const DIRECTIVES: [&str; 2] = ["lang", "builtins"];
const MAX_NESTING_DEPTH: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub message: String,
    pub span: Span,
}

impl SyntaxError {
    fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

type ParseResult<T> = Result<T, SyntaxError>;

/// Parses `src`. Lexical errors are all reported; parsing stops at the first
/// syntax error.
pub fn parse(src: &str, map: &SourceMap) -> Result<Module, Vec<SyntaxError>> {
    let tokens: Vec<Token<'_>> = Lexer::new(src).collect();

    let lexical: Vec<SyntaxError> = tokens
        .iter()
        .filter_map(|token| match token.kind {
            TokenKind::Error => Some(SyntaxError::new(
                format!("unexpected character '{}'", token.text),
                token.span,
            )),
            TokenKind::UnterminatedString => Some(SyntaxError::new(
                "unterminated short string",
                token.span,
            )),
            _ => None,
        })
        .collect();
    if !lexical.is_empty() {
        return Err(lexical);
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        map,
        eof: Span::new(src.len(), src.len()),
        depth: 0,
    };
    parser.module().map_err(|err| vec![err])
}

struct Parser<'a> {
    tokens: Vec<Token<'a>>,
    pos: usize,
    map: &'a SourceMap,
    eof: Span,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token<'a>> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|token| token.kind)
    }

    fn peek_nth_kind(&self, n: usize) -> Option<TokenKind> {
        self.tokens.get(self.pos + n).map(|token| token.kind)
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek_kind() == Some(kind)
    }

    fn bump(&mut self) -> Option<Token<'a>> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn unexpected(&self, expected: &str) -> SyntaxError {
        match self.peek() {
            Some(token) => SyntaxError::new(
                format!("expected {}, found '{}'", expected, token.text),
                token.span,
            ),
            None => SyntaxError::new(format!("expected {}, found end of file", expected), self.eof),
        }
    }

    fn expect(&mut self, kind: TokenKind) -> ParseResult<Token<'a>> {
        if self.at(kind) {
            self.bump().ok_or_else(|| self.unexpected(kind.describe()))
        } else {
            Err(self.unexpected(kind.describe()))
        }
    }

    fn ident(&mut self) -> ParseResult<Ident> {
        let token = self.expect(TokenKind::Name)?;
        Ok(Ident {
            name: token.text.to_string(),
            span: token.span,
        })
    }

    fn module(&mut self) -> ParseResult<Module> {
        let mut module = Module::default();
        while let Some(kind) = self.peek_kind() {
            match kind {
                TokenKind::Percent => self.directive()?,
                TokenKind::From => module.imports.extend(self.import()?),
                TokenKind::At | TokenKind::Func => module.functions.push(self.function()?),
                _ => return Err(self.unexpected("'func', a decorator, a directive or an import")),
            }
        }
        Ok(module)
    }

    // `%lang starknet`, `%builtins a b c`: arguments run to the end of the line.
    fn directive(&mut self) -> ParseResult<()> {
        let percent = self.expect(TokenKind::Percent)?;
        let name = self.ident()?;
        if !DIRECTIVES.contains(&name.name.as_str()) {
            return Err(SyntaxError::new(
                format!("unknown directive '%{}'", name.name),
                percent.span.to(name.span),
            ));
        }
        let line = self.map.line(percent.span.start);
        while let Some(token) = self.peek() {
            if self.map.line(token.span.start) != line {
                break;
            }
            self.pos += 1;
        }
        Ok(())
    }

    fn import(&mut self) -> ParseResult<Vec<Ident>> {
        self.expect(TokenKind::From)?;
        self.ident()?;
        while self.eat(TokenKind::Dot) {
            self.ident()?;
        }
        self.expect(TokenKind::Import)?;
        let parenthesized = self.eat(TokenKind::ParenOpen);
        let mut names = vec![self.ident()?];
        while self.eat(TokenKind::Comma) {
            if parenthesized && self.at(TokenKind::ParenClose) {
                break;
            }
            names.push(self.ident()?);
        }
        if parenthesized {
            self.expect(TokenKind::ParenClose)?;
        }
        Ok(names)
    }

    fn function(&mut self) -> ParseResult<Function> {
        let mut decorators = Vec::new();
        while self.eat(TokenKind::At) {
            decorators.push(self.ident()?);
        }
        let func = self.expect(TokenKind::Func)?;
        let name = self.ident()?;

        if self.at(TokenKind::BraceOpen) {
            self.skip_implicit_args()?;
        }

        self.expect(TokenKind::ParenOpen)?;
        let params = self.comma_list(TokenKind::ParenClose, |p| {
            let name = p.ident()?;
            p.expect(TokenKind::Colon)?;
            Ok(Param {
                name: Some(name),
                ty: p.type_ref()?,
            })
        })?;

        let returns = if self.eat(TokenKind::Arrow) {
            self.expect(TokenKind::ParenOpen)?;
            self.comma_list(TokenKind::ParenClose, |p| {
                if p.at(TokenKind::Name) && p.peek_nth_kind(1) == Some(TokenKind::Colon) {
                    let name = p.ident()?;
                    p.expect(TokenKind::Colon)?;
                    Ok(Param {
                        name: Some(name),
                        ty: p.type_ref()?,
                    })
                } else {
                    Ok(Param {
                        name: None,
                        ty: p.type_ref()?,
                    })
                }
            })?
        } else {
            Vec::new()
        };

        self.expect(TokenKind::Colon)?;

        let mut body = Vec::new();
        loop {
            match self.peek_kind() {
                Some(TokenKind::End) => break,
                Some(_) => body.push(self.stmt()?),
                None => {
                    return Err(SyntaxError::new(
                        format!("expected 'end' to close function '{}'", name.name),
                        name.span,
                    ));
                }
            }
        }
        let end = self.expect(TokenKind::End)?;

        Ok(Function {
            span: func.span.to(end.span),
            name,
            decorators,
            params,
            returns,
            body,
        })
    }

    // Implicit arguments (`{syscall_ptr: felt*, range_check_ptr}`) carry no
    // meaning here.
    fn skip_implicit_args(&mut self) -> ParseResult<()> {
        let open = self.expect(TokenKind::BraceOpen)?;
        let mut depth = 1usize;
        while depth > 0 {
            match self.bump().map(|token| token.kind) {
                Some(TokenKind::BraceOpen) => depth += 1,
                Some(TokenKind::BraceClose) => depth -= 1,
                Some(_) => {}
                None => return Err(SyntaxError::new("unclosed '{'", open.span)),
            }
        }
        Ok(())
    }

    /// Parses `item (, item)*` up to and including `close`. Allows a trailing
    /// comma and an empty list.
    fn comma_list<T>(
        &mut self,
        close: TokenKind,
        mut item: impl FnMut(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<Vec<T>> {
        let mut items = Vec::new();
        while !self.at(close) {
            items.push(item(self)?);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(close)?;
        Ok(items)
    }

    fn type_ref(&mut self) -> ParseResult<TypeRef> {
        let name = self.ident()?;
        let mut span = name.span;
        let mut pointer = false;
        while self.at(TokenKind::Star) {
            if let Some(star) = self.bump() {
                span = span.to(star.span);
            }
            pointer = true;
        }
        Ok(TypeRef {
            name: name.name,
            pointer,
            span,
        })
    }

    fn stmt(&mut self) -> ParseResult<Stmt> {
        match self.peek_kind() {
            Some(TokenKind::Return) => self.return_stmt(),
            Some(TokenKind::Let) => {
                let keyword = self.expect(TokenKind::Let)?;
                if self.at(TokenKind::ParenOpen) {
                    self.unpack(keyword.span)
                } else {
                    self.bind(Binding::Let)
                }
            }
            Some(TokenKind::Tempvar) => {
                self.bump();
                self.bind(Binding::Tempvar)
            }
            Some(TokenKind::Local) => {
                self.bump();
                self.bind(Binding::Local)
            }
            Some(TokenKind::Assert) => {
                let keyword = self.expect(TokenKind::Assert)?;
                let lhs = self.expr()?;
                self.expect(TokenKind::Eq)?;
                let rhs = self.expr()?;
                Ok(Stmt::Assert {
                    span: keyword.span.to(rhs.span()),
                    lhs,
                    rhs,
                })
            }
            Some(TokenKind::Name) => match self.expr()? {
                Expr::Call(call) => Ok(Stmt::Call(call)),
                other => Err(SyntaxError::new(
                    "expected a statement; only calls can stand alone",
                    other.span(),
                )),
            },
            _ => Err(self.unexpected("a statement")),
        }
    }

    fn return_stmt(&mut self) -> ParseResult<Stmt> {
        let keyword = self.expect(TokenKind::Return)?;
        if self.at(TokenKind::ParenOpen) {
            self.bump();
            let values = self.comma_list(TokenKind::ParenClose, |p| {
                if p.at(TokenKind::Name) && p.peek_nth_kind(1) == Some(TokenKind::Eq) {
                    let name = p.ident()?;
                    p.expect(TokenKind::Eq)?;
                    Ok(ReturnValue {
                        name: Some(name),
                        value: p.expr()?,
                    })
                } else {
                    Ok(ReturnValue {
                        name: None,
                        value: p.expr()?,
                    })
                }
            })?;
            let end = self.tokens[self.pos - 1].span;
            return Ok(Stmt::Return {
                values: ReturnValues::Tuple(values),
                span: keyword.span.to(end),
            });
        }

        match self.expr()? {
            Expr::Call(call) => Ok(Stmt::Return {
                span: keyword.span.to(call.span),
                values: ReturnValues::Call(call),
            }),
            other => Err(SyntaxError::new(
                "expected '(' or a call after 'return'",
                other.span(),
            )),
        }
    }

    fn bind(&mut self, binding: Binding) -> ParseResult<Stmt> {
        let target = self.ident()?;
        let ty = if self.eat(TokenKind::Colon) {
            Some(self.type_ref()?)
        } else {
            None
        };
        self.expect(TokenKind::Eq)?;
        let value = self.expr()?;
        Ok(Stmt::Bind {
            binding,
            target,
            ty,
            value,
        })
    }

    fn unpack(&mut self, start: Span) -> ParseResult<Stmt> {
        self.expect(TokenKind::ParenOpen)?;
        let targets = self.comma_list(TokenKind::ParenClose, |p| p.ident())?;
        self.expect(TokenKind::Eq)?;
        match self.expr()? {
            Expr::Call(call) => Ok(Stmt::Unpack {
                span: start.to(call.span),
                targets,
                call,
            }),
            other => Err(SyntaxError::new(
                "tuple destructuring requires a function call",
                other.span(),
            )),
        }
    }

    fn expr(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Plus) => BinaryOp::Add,
                Some(TokenKind::Minus) => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.bump();
            let rhs = self.term()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn term(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Star) => BinaryOp::Mul,
                Some(TokenKind::Slash) => BinaryOp::Div,
                _ => return Ok(lhs),
            };
            self.bump();
            let rhs = self.unary()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    // Every nested expression passes through here: parentheses, negation and
    // call arguments.
    fn unary(&mut self) -> ParseResult<Expr> {
        if self.depth >= MAX_NESTING_DEPTH {
            let span = self.peek().map_or(self.eof, |token| token.span);
            return Err(SyntaxError::new("expression nested too deeply", span));
        }
        self.depth += 1;
        let result = self.nested_unary();
        self.depth -= 1;
        result
    }

    fn nested_unary(&mut self) -> ParseResult<Expr> {
        if self.at(TokenKind::Minus) {
            let minus = self.expect(TokenKind::Minus)?;
            let operand = self.unary()?;
            let span = minus.span.to(operand.span());
            return Ok(Expr::Neg(Box::new(operand), span));
        }
        self.primary()
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        let Some(token) = self.peek().cloned() else {
            return Err(self.unexpected("an expression"));
        };
        match token.kind {
            TokenKind::Int | TokenKind::Hex => {
                self.bump();
                let value = Felt::parse(token.text).map_err(|err| {
                    SyntaxError::new(format!("invalid integer literal: {}", err), token.span)
                })?;
                Ok(Expr::Int(value, token.span))
            }
            TokenKind::ShortString => {
                self.bump();
                let text = &token.text[1..token.text.len() - 1];
                let value = encode_short_string(text).map_err(|err| {
                    SyntaxError::new(format!("invalid short string: {}", err), token.span)
                })?;
                Ok(Expr::ShortString(value, token.span))
            }
            TokenKind::ParenOpen => {
                self.bump();
                let inner = self.expr()?;
                self.expect(TokenKind::ParenClose)?;
                Ok(inner)
            }
            TokenKind::Name => self.name_expr(),
            _ => Err(self.unexpected("an expression")),
        }
    }

    fn name_expr(&mut self) -> ParseResult<Expr> {
        let name = self.ident()?;

        if self.eat(TokenKind::Dot) {
            let method = self.ident()?;
            let target = match method.name.as_str() {
                "read" => CallTarget::StorageRead(name),
                "write" => CallTarget::StorageWrite(name),
                other => {
                    return Err(SyntaxError::new(
                        format!(
                            "unknown member '{}'; storage variables support 'read' and 'write'",
                            other
                        ),
                        method.span,
                    ));
                }
            };
            return self.call(target);
        }

        if self.at(TokenKind::ParenOpen) {
            return self.call(CallTarget::Function(name));
        }

        Ok(Expr::Var(name))
    }

    fn call(&mut self, target: CallTarget) -> ParseResult<Expr> {
        let start = target.ident().span;
        self.expect(TokenKind::ParenOpen)?;
        let args = self.comma_list(TokenKind::ParenClose, |p| p.expr())?;
        let end = self.tokens[self.pos - 1].span;
        Ok(Expr::Call(Call {
            target,
            args,
            span: start.to(end),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(src: &str) -> Module {
        let map = SourceMap::new(src);
        parse(src, &map).unwrap()
    }

    fn parse_err(src: &str) -> (String, (usize, usize)) {
        let map = SourceMap::new(src);
        let errors = parse(src, &map).unwrap_err();
        let first = &errors[0];
        (first.message.clone(), map.line_col(first.span.start))
    }

    #[test]
    fn greeting_contract() {
        let module = parse_ok(
            "%lang starknet\n\
             %builtins pedersen range_check\n\
             from starkware.cairo.common.cairo_builtins import HashBuiltin\n\
             \n\
             @view\n\
             func get_greeting{syscall_ptr: felt*, pedersen_ptr: HashBuiltin*, range_check_ptr}() -> (greeting: felt):\n\
                 return ('God bless Ezen-wata')\n\
             end\n",
        );
        assert_eq!(module.imports.len(), 1);
        assert_eq!(module.functions.len(), 1);
        let func = &module.functions[0];
        assert_eq!(func.name.name, "get_greeting");
        assert_eq!(func.decorators[0].name, "view");
        assert_eq!(func.returns.len(), 1);
        assert!(matches!(func.body[0], Stmt::Return { .. }));
    }

    #[test]
    fn bare_return_type_and_named_return_value() {
        let module = parse_ok("func f() -> (felt):\n  return (res=1)\nend");
        let func = &module.functions[0];
        assert!(func.returns[0].name.is_none());
        assert!(func.returns[0].ty.is_felt());
    }

    #[test]
    fn storage_calls_and_bindings() {
        let module = parse_ok(
            "func f(x: felt):\n\
               let (a) = balance.read()\n\
               tempvar b = a + x * 2\n\
               local c: felt = -b\n\
               assert c = 0 - b\n\
               balance.write(c / 3)\n\
               return ()\n\
             end",
        );
        let body = &module.functions[0].body;
        assert_eq!(body.len(), 6);
        assert!(matches!(body[0], Stmt::Unpack { .. }));
        assert!(matches!(
            body[4],
            Stmt::Call(Call {
                target: CallTarget::StorageWrite(_),
                ..
            })
        ));
    }

    #[test]
    fn precedence() {
        let module = parse_ok("func f() -> (r: felt):\n return (1 + 2 * 3)\nend");
        let Stmt::Return {
            values: ReturnValues::Tuple(values),
            ..
        } = &module.functions[0].body[0]
        else {
            panic!("expected return");
        };
        assert!(matches!(
            values[0].value,
            Expr::Binary {
                op: BinaryOp::Add,
                ..
            }
        ));
    }

    #[test]
    fn missing_paren_reports_position() {
        let (message, position) = parse_err("@view\nfunc get_greeting( -> (felt):\nend");
        assert_eq!(message, "expected identifier, found '->'");
        assert_eq!(position, (2, 20));
    }

    #[test]
    fn missing_end() {
        let (message, position) = parse_err("func f():\n  return ()\n");
        assert_eq!(message, "expected 'end' to close function 'f'");
        assert_eq!(position, (1, 6));
    }

    #[test]
    fn lexical_errors_are_all_reported() {
        let src = "func f():\n  let x = $\n  let y = ?\nend";
        let map = SourceMap::new(src);
        let errors = parse(src, &map).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].message, "unexpected character '$'");
    }

    #[test]
    fn overlong_short_string() {
        let (message, _) =
            parse_err("func f() -> (r: felt):\n return ('this string is much longer than 31 bytes')\nend");
        assert!(message.starts_with("invalid short string"));
    }

    #[test]
    fn unknown_directive() {
        let (message, position) = parse_err("%lang starknet\n%pragma x\n");
        assert_eq!(message, "unknown directive '%pragma'");
        assert_eq!(position, (2, 1));
    }

    #[test]
    fn deep_nesting_is_a_syntax_error() {
        let depth = 100_000;
        let src = format!(
            "func f() -> (r: felt):\n return ({}1{})\nend",
            "(".repeat(depth),
            ")".repeat(depth)
        );
        let (message, position) = parse_err(&src);
        assert_eq!(message, "expression nested too deeply");
        assert_eq!(position.0, 2);
    }

    #[test]
    fn nesting_below_the_limit_parses() {
        let depth = MAX_NESTING_DEPTH - 2;
        let src = format!(
            "func f() -> (r: felt):\n return (-{}1{})\nend",
            "(".repeat(depth),
            ")".repeat(depth)
        );
        parse_ok(&src);
    }

    #[test]
    fn unterminated_string() {
        let (message, _) = parse_err("func f() -> (r: felt):\n return ('oops)\nend");
        assert_eq!(message, "unterminated short string");
    }
}
