//! Recursive-descent parser producing the typed AST in [`crate::ast`].

use std::mem;

use wyrm_core::TextRange;

use crate::ast::*;
use crate::lexer::tokenize;
use crate::token::{Token, TokenKind};
use crate::ParseError;

/// Parse one snippet into a module.
pub fn parse_module(src: &str) -> Result<Module, ParseError> {
    let tokens = tokenize(src)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        func_depth: 0,
        loop_depth: 0,
    };
    parser.module()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    func_depth: u32,
    loop_depth: u32,
}

impl Parser {
    fn module(&mut self) -> Result<Module, ParseError> {
        let mut body = Vec::new();
        while !self.at(&TokenKind::Eof) {
            if self.eat(&TokenKind::Newline) {
                continue;
            }
            self.statement(&mut body)?;
        }
        Ok(Module { body })
    }

    // ── Statements ───────────────────────────────────────────────

    fn statement(&mut self, out: &mut Vec<Stmt>) -> Result<(), ParseError> {
        match self.peek() {
            TokenKind::If => {
                let stmt = self.if_stmt()?;
                out.push(stmt);
                Ok(())
            }
            TokenKind::For => {
                let stmt = self.for_stmt()?;
                out.push(stmt);
                Ok(())
            }
            TokenKind::While => {
                let stmt = self.while_stmt()?;
                out.push(stmt);
                Ok(())
            }
            TokenKind::Def => {
                let stmt = self.func_def()?;
                out.push(stmt);
                Ok(())
            }
            TokenKind::Class => {
                let stmt = self.class_def()?;
                out.push(stmt);
                Ok(())
            }
            _ => self.simple_line(out),
        }
    }

    /// One or more `;`-separated simple statements terminated by a newline.
    fn simple_line(&mut self, out: &mut Vec<Stmt>) -> Result<(), ParseError> {
        loop {
            out.push(self.small_stmt()?);
            if !self.eat(&TokenKind::Semicolon) {
                break;
            }
            if self.at(&TokenKind::Newline) || self.at(&TokenKind::Eof) {
                break;
            }
        }
        self.expect_newline()
    }

    fn small_stmt(&mut self) -> Result<Stmt, ParseError> {
        let start = self.current_range();
        match self.peek() {
            TokenKind::Return => {
                if self.func_depth == 0 {
                    return Err(self.error_at(start, "'return' outside function"));
                }
                self.bump();
                let value = if self.at_stmt_end() {
                    None
                } else {
                    Some(self.testlist()?)
                };
                Ok(self.finish_stmt(start, StmtKind::Return { value }))
            }
            TokenKind::Break => {
                if self.loop_depth == 0 {
                    return Err(self.error_at(start, "'break' outside loop"));
                }
                self.bump();
                Ok(self.finish_stmt(start, StmtKind::Break))
            }
            TokenKind::Continue => {
                if self.loop_depth == 0 {
                    return Err(self.error_at(start, "'continue' not properly in loop"));
                }
                self.bump();
                Ok(self.finish_stmt(start, StmtKind::Continue))
            }
            TokenKind::Pass => {
                self.bump();
                Ok(self.finish_stmt(start, StmtKind::Pass))
            }
            TokenKind::Import => {
                self.bump();
                let names = self.import_aliases()?;
                Ok(self.finish_stmt(start, StmtKind::Import { names }))
            }
            TokenKind::From => {
                self.bump();
                let module = self.dotted_name()?;
                self.expect(&TokenKind::Import)?;
                let names = if self.eat(&TokenKind::Star) {
                    vec![ImportAlias {
                        name: "*".to_string(),
                        asname: None,
                        range: self.prev_range(),
                    }]
                } else {
                    self.import_aliases()?
                };
                Ok(self.finish_stmt(start, StmtKind::ImportFrom { module, names }))
            }
            _ => self.expr_stmt(start),
        }
    }

    fn expr_stmt(&mut self, start: TextRange) -> Result<Stmt, ParseError> {
        let first = self.testlist_star()?;

        if self.eat(&TokenKind::Colon) {
            let annotation = self.test()?;
            let value = if self.eat(&TokenKind::Assign) {
                Some(self.testlist()?)
            } else {
                None
            };
            return Ok(self.finish_stmt(
                start,
                StmtKind::AnnAssign {
                    target: first,
                    annotation,
                    value,
                },
            ));
        }

        if let Some(op) = self.aug_op() {
            self.bump();
            let value = self.testlist()?;
            return Ok(self.finish_stmt(
                start,
                StmtKind::AugAssign {
                    target: first,
                    op,
                    value,
                },
            ));
        }

        if self.at(&TokenKind::Assign) {
            let mut targets = vec![first];
            let mut value = None;
            while self.eat(&TokenKind::Assign) {
                let next = self.testlist_star()?;
                if self.at(&TokenKind::Assign) {
                    targets.push(next);
                } else {
                    value = Some(next);
                }
            }
            let value = value.expect("assignment chain ends with a value");
            return Ok(self.finish_stmt(start, StmtKind::Assign { targets, value }));
        }

        Ok(self.finish_stmt(start, StmtKind::Expr(first)))
    }

    /// The binary operator of an augmented assignment token, if the parser
    /// is at one.
    fn aug_op(&self) -> Option<BinOp> {
        Some(match self.peek() {
            TokenKind::PlusEq => BinOp::Add,
            TokenKind::MinusEq => BinOp::Sub,
            TokenKind::StarEq => BinOp::Mul,
            TokenKind::SlashEq => BinOp::Div,
            TokenKind::DoubleSlashEq => BinOp::FloorDiv,
            TokenKind::PercentEq => BinOp::Mod,
            TokenKind::DoubleStarEq => BinOp::Pow,
            TokenKind::AmpEq => BinOp::BitAnd,
            TokenKind::PipeEq => BinOp::BitOr,
            TokenKind::CaretEq => BinOp::BitXor,
            TokenKind::ShlEq => BinOp::Shl,
            TokenKind::ShrEq => BinOp::Shr,
            _ => return None,
        })
    }

    fn if_stmt(&mut self) -> Result<Stmt, ParseError> {
        let start = self.current_range();
        self.bump(); // if / elif
        let test = self.test()?;
        let body = self.suite()?;
        let orelse = if self.at(&TokenKind::Elif) {
            vec![self.if_stmt()?]
        } else if self.eat(&TokenKind::Else) {
            self.suite()?
        } else {
            Vec::new()
        };
        Ok(self.finish_stmt(start, StmtKind::If { test, body, orelse }))
    }

    fn for_stmt(&mut self) -> Result<Stmt, ParseError> {
        let start = self.current_range();
        self.bump();
        let target = self.target_list()?;
        self.expect(&TokenKind::In)?;
        let iter = self.testlist()?;
        self.loop_depth += 1;
        let body = self.suite();
        self.loop_depth -= 1;
        let body = body?;
        let orelse = if self.eat(&TokenKind::Else) {
            self.suite()?
        } else {
            Vec::new()
        };
        Ok(self.finish_stmt(
            start,
            StmtKind::For {
                target,
                iter,
                body,
                orelse,
            },
        ))
    }

    fn while_stmt(&mut self) -> Result<Stmt, ParseError> {
        let start = self.current_range();
        self.bump();
        let test = self.test()?;
        self.loop_depth += 1;
        let body = self.suite();
        self.loop_depth -= 1;
        let body = body?;
        let orelse = if self.eat(&TokenKind::Else) {
            self.suite()?
        } else {
            Vec::new()
        };
        Ok(self.finish_stmt(start, StmtKind::While { test, body, orelse }))
    }

    fn func_def(&mut self) -> Result<Stmt, ParseError> {
        let start = self.current_range();
        self.bump();
        let (name, name_range) = self.expect_name()?;
        self.expect(&TokenKind::LParen)?;
        let params = self.params(true)?;
        self.expect(&TokenKind::RParen)?;
        let returns = if self.eat(&TokenKind::Arrow) {
            Some(self.test()?)
        } else {
            None
        };
        self.func_depth += 1;
        let saved_loop_depth = mem::replace(&mut self.loop_depth, 0);
        let body = self.suite();
        self.loop_depth = saved_loop_depth;
        self.func_depth -= 1;
        Ok(self.finish_stmt(
            start,
            StmtKind::FunctionDef(FunctionDef {
                name,
                name_range,
                params,
                returns,
                body: body?,
            }),
        ))
    }

    fn class_def(&mut self) -> Result<Stmt, ParseError> {
        let start = self.current_range();
        self.bump();
        let (name, name_range) = self.expect_name()?;
        let mut bases = Vec::new();
        if self.eat(&TokenKind::LParen) {
            while !self.at(&TokenKind::RParen) {
                bases.push(self.test()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
            self.expect(&TokenKind::RParen)?;
        }
        let body = self.suite()?;
        Ok(self.finish_stmt(
            start,
            StmtKind::ClassDef {
                name,
                name_range,
                bases,
                body,
            },
        ))
    }

    /// `: NEWLINE INDENT stmts DEDENT` or `: simple_line`.
    fn suite(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.expect(&TokenKind::Colon)?;
        let mut body = Vec::new();
        if self.eat(&TokenKind::Newline) {
            self.expect(&TokenKind::Indent)?;
            while !self.eat(&TokenKind::Dedent) {
                if self.eat(&TokenKind::Newline) {
                    continue;
                }
                if self.at(&TokenKind::Eof) {
                    break;
                }
                self.statement(&mut body)?;
            }
        } else {
            self.simple_line(&mut body)?;
        }
        Ok(body)
    }

    fn import_aliases(&mut self) -> Result<Vec<ImportAlias>, ParseError> {
        let mut names = Vec::new();
        loop {
            let start = self.current_range();
            let name = self.dotted_name()?;
            let asname = if self.eat(&TokenKind::As) {
                Some(self.expect_name()?.0)
            } else {
                None
            };
            names.push(ImportAlias {
                name,
                asname,
                range: TextRange::new(start.start(), self.prev_range().end()),
            });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Ok(names)
    }

    fn dotted_name(&mut self) -> Result<String, ParseError> {
        let mut name = self.expect_name()?.0;
        while self.eat(&TokenKind::Dot) {
            name.push('.');
            name.push_str(&self.expect_name()?.0);
        }
        Ok(name)
    }

    fn params(&mut self, allow_annotations: bool) -> Result<Params, ParseError> {
        let mut params = Params::default();
        let mut kwonly = false;
        loop {
            match self.peek() {
                TokenKind::Star => {
                    self.bump();
                    if let TokenKind::Name(_) = self.peek() {
                        params.vararg = Some(self.param(allow_annotations, false)?);
                    }
                    kwonly = true;
                }
                TokenKind::DoubleStar => {
                    self.bump();
                    params.kwarg = Some(self.param(allow_annotations, false)?);
                }
                TokenKind::Name(_) => {
                    let param = self.param(allow_annotations, true)?;
                    if kwonly {
                        params.kwonly.push(param);
                    } else {
                        params.args.push(param);
                    }
                }
                _ => break,
            }
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Ok(params)
    }

    fn param(&mut self, allow_annotations: bool, allow_default: bool) -> Result<Param, ParseError> {
        let (name, range) = self.expect_name()?;
        let annotation = if allow_annotations && self.eat(&TokenKind::Colon) {
            Some(self.test()?)
        } else {
            None
        };
        let default = if allow_default && self.eat(&TokenKind::Assign) {
            Some(self.test()?)
        } else {
            None
        };
        Ok(Param {
            name,
            range,
            annotation,
            default,
        })
    }

    /// Comma-separated assignment/loop targets, folded into a tuple when
    /// more than one.
    fn target_list(&mut self) -> Result<Expr, ParseError> {
        let start = self.current_range();
        let mut items = vec![self.postfix_expr()?];
        let mut trailing_comma = false;
        while self.eat(&TokenKind::Comma) {
            if self.at(&TokenKind::In) || self.at(&TokenKind::Assign) {
                trailing_comma = true;
                break;
            }
            items.push(self.postfix_expr()?);
        }
        if items.len() == 1 && !trailing_comma {
            Ok(items.pop().expect("one element"))
        } else {
            Ok(self.finish_expr(start, ExprKind::Tuple(items)))
        }
    }

    // ── Expressions ──────────────────────────────────────────────

    /// `test (',' test)*` — a tuple when more than one element.
    fn testlist(&mut self) -> Result<Expr, ParseError> {
        self.testlist_impl(false)
    }

    /// Like [`Self::testlist`] but also admits `*starred` elements.
    fn testlist_star(&mut self) -> Result<Expr, ParseError> {
        self.testlist_impl(true)
    }

    fn testlist_impl(&mut self, allow_star: bool) -> Result<Expr, ParseError> {
        let start = self.current_range();
        let first = self.test_or_starred(allow_star)?;
        if !self.at(&TokenKind::Comma) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat(&TokenKind::Comma) {
            if self.at_expr_end() {
                break;
            }
            items.push(self.test_or_starred(allow_star)?);
        }
        Ok(self.finish_expr(start, ExprKind::Tuple(items)))
    }

    fn test_or_starred(&mut self, allow_star: bool) -> Result<Expr, ParseError> {
        if allow_star && self.at(&TokenKind::Star) {
            let start = self.current_range();
            self.bump();
            let inner = self.test()?;
            return Ok(self.finish_expr(start, ExprKind::Starred(Box::new(inner))));
        }
        self.test()
    }

    fn test(&mut self) -> Result<Expr, ParseError> {
        if self.at(&TokenKind::Lambda) {
            return self.lambda();
        }
        let start = self.current_range();
        let body = self.or_test()?;
        if self.eat(&TokenKind::If) {
            let test = self.or_test()?;
            self.expect(&TokenKind::Else)?;
            let orelse = self.test()?;
            return Ok(self.finish_expr(
                start,
                ExprKind::IfExp {
                    test: Box::new(test),
                    body: Box::new(body),
                    orelse: Box::new(orelse),
                },
            ));
        }
        Ok(body)
    }

    fn lambda(&mut self) -> Result<Expr, ParseError> {
        let start = self.current_range();
        self.bump();
        let params = self.params(false)?;
        self.expect(&TokenKind::Colon)?;
        let body = self.test()?;
        Ok(self.finish_expr(
            start,
            ExprKind::Lambda {
                params: Box::new(params),
                body: Box::new(body),
            },
        ))
    }

    fn or_test(&mut self) -> Result<Expr, ParseError> {
        let start = self.current_range();
        let first = self.and_test()?;
        if !self.at(&TokenKind::Or) {
            return Ok(first);
        }
        let mut values = vec![first];
        while self.eat(&TokenKind::Or) {
            values.push(self.and_test()?);
        }
        Ok(self.finish_expr(
            start,
            ExprKind::BoolOp {
                op: BoolOpKind::Or,
                values,
            },
        ))
    }

    fn and_test(&mut self) -> Result<Expr, ParseError> {
        let start = self.current_range();
        let first = self.not_test()?;
        if !self.at(&TokenKind::And) {
            return Ok(first);
        }
        let mut values = vec![first];
        while self.eat(&TokenKind::And) {
            values.push(self.not_test()?);
        }
        Ok(self.finish_expr(
            start,
            ExprKind::BoolOp {
                op: BoolOpKind::And,
                values,
            },
        ))
    }

    fn not_test(&mut self) -> Result<Expr, ParseError> {
        if self.at(&TokenKind::Not) {
            let start = self.current_range();
            self.bump();
            let operand = self.not_test()?;
            return Ok(self.finish_expr(
                start,
                ExprKind::UnaryOp {
                    op: UnaryOp::Not,
                    operand: Box::new(operand),
                },
            ));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, ParseError> {
        let start = self.current_range();
        let left = self.bit_or()?;
        let mut ops = Vec::new();
        let mut comparators = Vec::new();
        loop {
            let op = match self.peek() {
                TokenKind::EqEq => CmpOp::Eq,
                TokenKind::NotEq => CmpOp::NotEq,
                TokenKind::Lt => CmpOp::Lt,
                TokenKind::Le => CmpOp::Le,
                TokenKind::Gt => CmpOp::Gt,
                TokenKind::Ge => CmpOp::Ge,
                TokenKind::In => CmpOp::In,
                TokenKind::Is => {
                    self.bump();
                    let op = if self.eat(&TokenKind::Not) {
                        CmpOp::IsNot
                    } else {
                        CmpOp::Is
                    };
                    ops.push(op);
                    comparators.push(self.bit_or()?);
                    continue;
                }
                TokenKind::Not => {
                    self.bump();
                    self.expect(&TokenKind::In)?;
                    ops.push(CmpOp::NotIn);
                    comparators.push(self.bit_or()?);
                    continue;
                }
                _ => break,
            };
            self.bump();
            ops.push(op);
            comparators.push(self.bit_or()?);
        }
        if ops.is_empty() {
            return Ok(left);
        }
        Ok(self.finish_expr(
            start,
            ExprKind::Compare {
                left: Box::new(left),
                ops,
                comparators,
            },
        ))
    }

    fn bit_or(&mut self) -> Result<Expr, ParseError> {
        self.binary_chain(&[(TokenKind::Pipe, BinOp::BitOr)], Self::bit_xor)
    }

    fn bit_xor(&mut self) -> Result<Expr, ParseError> {
        self.binary_chain(&[(TokenKind::Caret, BinOp::BitXor)], Self::bit_and)
    }

    fn bit_and(&mut self) -> Result<Expr, ParseError> {
        self.binary_chain(&[(TokenKind::Amp, BinOp::BitAnd)], Self::shift)
    }

    fn shift(&mut self) -> Result<Expr, ParseError> {
        self.binary_chain(
            &[(TokenKind::Shl, BinOp::Shl), (TokenKind::Shr, BinOp::Shr)],
            Self::arith,
        )
    }

    fn arith(&mut self) -> Result<Expr, ParseError> {
        self.binary_chain(
            &[(TokenKind::Plus, BinOp::Add), (TokenKind::Minus, BinOp::Sub)],
            Self::term,
        )
    }

    fn term(&mut self) -> Result<Expr, ParseError> {
        self.binary_chain(
            &[
                (TokenKind::Star, BinOp::Mul),
                (TokenKind::Slash, BinOp::Div),
                (TokenKind::DoubleSlash, BinOp::FloorDiv),
                (TokenKind::Percent, BinOp::Mod),
            ],
            Self::factor,
        )
    }

    fn binary_chain(
        &mut self,
        ops: &[(TokenKind, BinOp)],
        next: fn(&mut Self) -> Result<Expr, ParseError>,
    ) -> Result<Expr, ParseError> {
        let start = self.current_range();
        let mut left = next(self)?;
        'outer: loop {
            for (token, op) in ops {
                if self.at(token) {
                    self.bump();
                    let right = next(self)?;
                    left = self.finish_expr(
                        start,
                        ExprKind::BinOp {
                            left: Box::new(left),
                            op: *op,
                            right: Box::new(right),
                        },
                    );
                    continue 'outer;
                }
            }
            return Ok(left);
        }
    }

    fn factor(&mut self) -> Result<Expr, ParseError> {
        let op = match self.peek() {
            TokenKind::Plus => Some(UnaryOp::Pos),
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Tilde => Some(UnaryOp::Invert),
            _ => None,
        };
        if let Some(op) = op {
            let start = self.current_range();
            self.bump();
            let operand = self.factor()?;
            return Ok(self.finish_expr(
                start,
                ExprKind::UnaryOp {
                    op,
                    operand: Box::new(operand),
                },
            ));
        }
        self.power()
    }

    fn power(&mut self) -> Result<Expr, ParseError> {
        let start = self.current_range();
        let base = self.postfix_expr()?;
        if self.eat(&TokenKind::DoubleStar) {
            let exp = self.factor()?;
            return Ok(self.finish_expr(
                start,
                ExprKind::BinOp {
                    left: Box::new(base),
                    op: BinOp::Pow,
                    right: Box::new(exp),
                },
            ));
        }
        Ok(base)
    }

    fn postfix_expr(&mut self) -> Result<Expr, ParseError> {
        let start = self.current_range();
        let mut expr = self.atom()?;
        loop {
            if self.eat(&TokenKind::LParen) {
                let (args, keywords) = self.call_args()?;
                self.expect(&TokenKind::RParen)?;
                expr = self.finish_expr(
                    start,
                    ExprKind::Call {
                        func: Box::new(expr),
                        args,
                        keywords,
                    },
                );
            } else if self.eat(&TokenKind::LBracket) {
                let index = self.subscript_index()?;
                self.expect(&TokenKind::RBracket)?;
                expr = self.finish_expr(
                    start,
                    ExprKind::Subscript {
                        value: Box::new(expr),
                        index: Box::new(index),
                    },
                );
            } else if self.eat(&TokenKind::Dot) {
                let (attr, attr_range) = self.expect_name()?;
                expr = self.finish_expr(
                    start,
                    ExprKind::Attribute {
                        value: Box::new(expr),
                        attr,
                        attr_range,
                    },
                );
            } else {
                return Ok(expr);
            }
        }
    }

    fn subscript_index(&mut self) -> Result<Expr, ParseError> {
        let start = self.current_range();
        let lower = if self.at(&TokenKind::Colon) {
            None
        } else {
            Some(Box::new(self.test()?))
        };
        if !self.eat(&TokenKind::Colon) {
            return Ok(*lower.expect("plain subscript has an index"));
        }
        let upper = if self.at(&TokenKind::Colon) || self.at(&TokenKind::RBracket) {
            None
        } else {
            Some(Box::new(self.test()?))
        };
        let step = if self.eat(&TokenKind::Colon) {
            if self.at(&TokenKind::RBracket) {
                None
            } else {
                Some(Box::new(self.test()?))
            }
        } else {
            None
        };
        Ok(self.finish_expr(start, ExprKind::Slice { lower, upper, step }))
    }

    fn call_args(&mut self) -> Result<(Vec<Expr>, Vec<Keyword>), ParseError> {
        let mut args = Vec::new();
        let mut keywords = Vec::new();
        while !self.at(&TokenKind::RParen) {
            let start = self.current_range();
            if self.eat(&TokenKind::DoubleStar) {
                let value = self.test()?;
                keywords.push(Keyword {
                    arg: None,
                    value,
                    range: TextRange::new(start.start(), self.prev_range().end()),
                });
            } else if self.eat(&TokenKind::Star) {
                let inner = self.test()?;
                args.push(self.finish_expr(start, ExprKind::Starred(Box::new(inner))));
            } else if self.at_keyword_arg() {
                let (name, _) = self.expect_name()?;
                self.expect(&TokenKind::Assign)?;
                let value = self.test()?;
                keywords.push(Keyword {
                    arg: Some(name),
                    value,
                    range: TextRange::new(start.start(), self.prev_range().end()),
                });
            } else {
                let value = self.test()?;
                if self.at(&TokenKind::For) {
                    // Bare generator argument: f(x for x in xs)
                    let generators = self.comprehension_clauses()?;
                    args.push(self.finish_expr(
                        start,
                        ExprKind::Generator {
                            elt: Box::new(value),
                            generators,
                        },
                    ));
                } else {
                    args.push(value);
                }
            }
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Ok((args, keywords))
    }

    fn at_keyword_arg(&self) -> bool {
        matches!(self.peek(), TokenKind::Name(_))
            && matches!(
                self.tokens.get(self.pos + 1).map(|t| &t.kind),
                Some(TokenKind::Assign)
            )
    }

    fn atom(&mut self) -> Result<Expr, ParseError> {
        let start = self.current_range();
        match self.peek().clone() {
            TokenKind::Name(name) => {
                self.bump();
                Ok(self.finish_expr(start, ExprKind::Name(name)))
            }
            TokenKind::Int(value) => {
                self.bump();
                Ok(self.finish_expr(start, ExprKind::Int(value)))
            }
            TokenKind::Float(value) => {
                self.bump();
                Ok(self.finish_expr(start, ExprKind::Float(value)))
            }
            TokenKind::Str { .. } => self.string_atom(start),
            TokenKind::True => {
                self.bump();
                Ok(self.finish_expr(start, ExprKind::Bool(true)))
            }
            TokenKind::False => {
                self.bump();
                Ok(self.finish_expr(start, ExprKind::Bool(false)))
            }
            TokenKind::NoneKw => {
                self.bump();
                Ok(self.finish_expr(start, ExprKind::NoneLit))
            }
            TokenKind::LParen => self.paren_atom(start),
            TokenKind::LBracket => self.list_atom(start),
            TokenKind::LBrace => self.brace_atom(start),
            TokenKind::Lambda => self.lambda(),
            other => Err(self.error_at(
                start,
                format!("unexpected {}", other.describe()),
            )),
        }
    }

    /// Adjacent string literals concatenate; the result is formatted if any
    /// piece was.
    fn string_atom(&mut self, start: TextRange) -> Result<Expr, ParseError> {
        let mut value = String::new();
        let mut formatted = false;
        while let TokenKind::Str {
            value: piece,
            formatted: piece_formatted,
        } = self.peek()
        {
            value.push_str(piece);
            formatted |= *piece_formatted;
            self.bump();
        }
        Ok(self.finish_expr(start, ExprKind::Str { value, formatted }))
    }

    fn paren_atom(&mut self, start: TextRange) -> Result<Expr, ParseError> {
        self.bump();
        if self.eat(&TokenKind::RParen) {
            return Ok(self.finish_expr(start, ExprKind::Tuple(Vec::new())));
        }
        let first = self.test_or_starred(true)?;
        if self.at(&TokenKind::For) {
            let generators = self.comprehension_clauses()?;
            self.expect(&TokenKind::RParen)?;
            return Ok(self.finish_expr(
                start,
                ExprKind::Generator {
                    elt: Box::new(first),
                    generators,
                },
            ));
        }
        if self.at(&TokenKind::Comma) {
            let mut items = vec![first];
            while self.eat(&TokenKind::Comma) {
                if self.at(&TokenKind::RParen) {
                    break;
                }
                items.push(self.test_or_starred(true)?);
            }
            self.expect(&TokenKind::RParen)?;
            return Ok(self.finish_expr(start, ExprKind::Tuple(items)));
        }
        self.expect(&TokenKind::RParen)?;
        // Keep the inner node; the wider parenthesized range is not
        // significant to any analysis.
        Ok(first)
    }

    fn list_atom(&mut self, start: TextRange) -> Result<Expr, ParseError> {
        self.bump();
        if self.eat(&TokenKind::RBracket) {
            return Ok(self.finish_expr(start, ExprKind::List(Vec::new())));
        }
        let first = self.test_or_starred(true)?;
        if self.at(&TokenKind::For) {
            let generators = self.comprehension_clauses()?;
            self.expect(&TokenKind::RBracket)?;
            return Ok(self.finish_expr(
                start,
                ExprKind::ListComp {
                    elt: Box::new(first),
                    generators,
                },
            ));
        }
        let mut items = vec![first];
        while self.eat(&TokenKind::Comma) {
            if self.at(&TokenKind::RBracket) {
                break;
            }
            items.push(self.test_or_starred(true)?);
        }
        self.expect(&TokenKind::RBracket)?;
        Ok(self.finish_expr(start, ExprKind::List(items)))
    }

    fn brace_atom(&mut self, start: TextRange) -> Result<Expr, ParseError> {
        self.bump();
        if self.eat(&TokenKind::RBrace) {
            return Ok(self.finish_expr(
                start,
                ExprKind::Dict {
                    keys: Vec::new(),
                    values: Vec::new(),
                },
            ));
        }

        // `**spread` can only start a dict.
        if self.eat(&TokenKind::DoubleStar) {
            let value = self.test()?;
            return self.dict_tail(start, vec![None], vec![value]);
        }

        let first = self.test()?;
        if self.eat(&TokenKind::Colon) {
            let value = self.test()?;
            if self.at(&TokenKind::For) {
                let generators = self.comprehension_clauses()?;
                self.expect(&TokenKind::RBrace)?;
                return Ok(self.finish_expr(
                    start,
                    ExprKind::DictComp {
                        key: Box::new(first),
                        value: Box::new(value),
                        generators,
                    },
                ));
            }
            return self.dict_tail(start, vec![Some(first)], vec![value]);
        }

        if self.at(&TokenKind::For) {
            let generators = self.comprehension_clauses()?;
            self.expect(&TokenKind::RBrace)?;
            return Ok(self.finish_expr(
                start,
                ExprKind::SetComp {
                    elt: Box::new(first),
                    generators,
                },
            ));
        }

        let mut items = vec![first];
        while self.eat(&TokenKind::Comma) {
            if self.at(&TokenKind::RBrace) {
                break;
            }
            items.push(self.test()?);
        }
        self.expect(&TokenKind::RBrace)?;
        Ok(self.finish_expr(start, ExprKind::Set(items)))
    }

    fn dict_tail(
        &mut self,
        start: TextRange,
        mut keys: Vec<Option<Expr>>,
        mut values: Vec<Expr>,
    ) -> Result<Expr, ParseError> {
        while self.eat(&TokenKind::Comma) {
            if self.at(&TokenKind::RBrace) {
                break;
            }
            if self.eat(&TokenKind::DoubleStar) {
                keys.push(None);
                values.push(self.test()?);
                continue;
            }
            let key = self.test()?;
            self.expect(&TokenKind::Colon)?;
            keys.push(Some(key));
            values.push(self.test()?);
        }
        self.expect(&TokenKind::RBrace)?;
        Ok(self.finish_expr(start, ExprKind::Dict { keys, values }))
    }

    fn comprehension_clauses(&mut self) -> Result<Vec<Comprehension>, ParseError> {
        let mut generators = Vec::new();
        while self.eat(&TokenKind::For) {
            let target = self.target_list()?;
            self.expect(&TokenKind::In)?;
            let iter = self.or_test()?;
            let mut ifs = Vec::new();
            while self.eat(&TokenKind::If) {
                ifs.push(self.or_test()?);
            }
            generators.push(Comprehension { target, iter, ifs });
        }
        Ok(generators)
    }

    // ── Token plumbing ───────────────────────────────────────────

    fn peek(&self) -> &TokenKind {
        &self.tokens[self.pos].kind
    }

    fn at(&self, kind: &TokenKind) -> bool {
        mem::discriminant(self.peek()) == mem::discriminant(kind)
    }

    fn at_stmt_end(&self) -> bool {
        matches!(
            self.peek(),
            TokenKind::Newline | TokenKind::Semicolon | TokenKind::Eof
        )
    }

    /// True at tokens that may legally follow a trailing comma in a list of
    /// expressions.
    fn at_expr_end(&self) -> bool {
        matches!(
            self.peek(),
            TokenKind::Newline
                | TokenKind::Semicolon
                | TokenKind::Eof
                | TokenKind::Assign
                | TokenKind::Colon
                | TokenKind::RParen
                | TokenKind::RBracket
                | TokenKind::RBrace
        )
    }

    fn bump(&mut self) {
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<(), ParseError> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(self.error_at(
                self.current_range(),
                format!(
                    "expected {}, found {}",
                    kind.describe(),
                    self.peek().describe()
                ),
            ))
        }
    }

    fn expect_newline(&mut self) -> Result<(), ParseError> {
        if self.eat(&TokenKind::Newline) || self.at(&TokenKind::Eof) {
            Ok(())
        } else {
            Err(self.error_at(self.current_range(), "invalid syntax"))
        }
    }

    fn expect_name(&mut self) -> Result<(String, TextRange), ParseError> {
        let range = self.current_range();
        if let TokenKind::Name(name) = self.peek() {
            let name = name.clone();
            self.bump();
            Ok((name, range))
        } else {
            Err(self.error_at(
                range,
                format!("expected identifier, found {}", self.peek().describe()),
            ))
        }
    }

    fn current_range(&self) -> TextRange {
        self.tokens[self.pos].range
    }

    fn prev_range(&self) -> TextRange {
        self.tokens[self.pos.saturating_sub(1)].range
    }

    fn finish_stmt(&self, start: TextRange, kind: StmtKind) -> Stmt {
        Stmt {
            kind,
            range: self.span_from(start),
        }
    }

    fn finish_expr(&self, start: TextRange, kind: ExprKind) -> Expr {
        Expr {
            kind,
            range: self.span_from(start),
        }
    }

    fn span_from(&self, start: TextRange) -> TextRange {
        let end = self.prev_range().end().max(start.start());
        TextRange::new(start.start(), end)
    }

    fn error_at(&self, range: TextRange, message: impl Into<String>) -> ParseError {
        ParseError {
            message: message.into(),
            range,
        }
    }
}
