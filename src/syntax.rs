//! Surface language: a small lambda calculus with let, if, arithmetic,
//! booleans, pairs, lists and strings.

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use thiserror::Error;

use crate::ops::Operator;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Term {
    Num(i64),
    Bool(bool),
    Str(String),
    Var(String),
    Lam {
        param: String,
        body: Box<Term>,
    },
    App {
        func: Box<Term>,
        arg: Box<Term>,
    },
    Let {
        name: String,
        value: Box<Term>,
        body: Box<Term>,
    },
    If {
        cond: Box<Term>,
        then_branch: Box<Term>,
        else_branch: Box<Term>,
    },
    Binary {
        op: Operator,
        lhs: Box<Term>,
        rhs: Box<Term>,
    },
    Not(Box<Term>),
    Pair(Box<Term>, Box<Term>),
    Fst(Box<Term>),
    Snd(Box<Term>),
    Cons(Box<Term>, Box<Term>),
    Head(Box<Term>),
    Tail(Box<Term>),
}

impl Term {
    pub fn var(name: &str) -> Term {
        Term::Var(name.to_string())
    }

    pub fn lam(param: &str, body: Term) -> Term {
        Term::Lam {
            param: param.to_string(),
            body: Box::new(body),
        }
    }

    pub fn app(func: Term, arg: Term) -> Term {
        Term::App {
            func: Box::new(func),
            arg: Box::new(arg),
        }
    }

    pub fn binary(op: Operator, lhs: Term, rhs: Term) -> Term {
        Term::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyntaxError {
    #[error("unexpected character `{ch}` at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },
    #[error("unterminated string starting at offset {0}")]
    UnterminatedString(usize),
    #[error("integer literal `{text}` at offset {offset} is out of range")]
    IntegerRange { text: String, offset: usize },
    #[error("expected {expected} at offset {offset}, found {found}")]
    Expected {
        expected: &'static str,
        found: String,
        offset: usize,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Keyword {
    Let,
    In,
    If,
    Then,
    Else,
    True,
    False,
    Not,
    Fst,
    Snd,
    Head,
    Tail,
}

static KEYWORDS: Lazy<HashMap<&'static str, Keyword>> = Lazy::new(|| {
    HashMap::from([
        ("let", Keyword::Let),
        ("in", Keyword::In),
        ("if", Keyword::If),
        ("then", Keyword::Then),
        ("else", Keyword::Else),
        ("true", Keyword::True),
        ("false", Keyword::False),
        ("not", Keyword::Not),
        ("fst", Keyword::Fst),
        ("snd", Keyword::Snd),
        ("head", Keyword::Head),
        ("tail", Keyword::Tail),
    ])
});

/// Multi-character symbols come first so the longest match wins.
const SYMBOLS: [&str; 20] = [
    "->", "==", "!=", "<=", ">=", "&&", "||", "\\", ".", "=", "<", ">", "+", "-", "*", "/", "(",
    ")", ",", ":",
];

#[derive(Clone, Debug, PartialEq, Eq)]
enum Token {
    Int(i64),
    Str(String),
    Ident(String),
    Keyword(Keyword),
    Sym(&'static str),
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Int(n) => write!(f, "`{n}`"),
            Token::Str(s) => write!(f, "{s:?}"),
            Token::Ident(name) => write!(f, "`{name}`"),
            Token::Keyword(kw) => {
                let word = KEYWORDS
                    .iter()
                    .find_map(|(word, k)| (k == kw).then_some(*word))
                    .unwrap_or("keyword");
                write!(f, "`{word}`")
            }
            Token::Sym(sym) => write!(f, "`{sym}`"),
            Token::Eof => f.write_str("end of input"),
        }
    }
}

#[derive(Clone, Debug)]
struct Spanned {
    token: Token,
    offset: usize,
}

fn tokenize(source: &str) -> Result<Vec<Spanned>, SyntaxError> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();
    while let Some(&(offset, ch)) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
            continue;
        }
        let rest = &source[offset..];
        if rest.starts_with("--") {
            while let Some(&(_, c)) = chars.peek() {
                if c == '\n' {
                    break;
                }
                chars.next();
            }
            continue;
        }
        if ch == 'λ' {
            chars.next();
            tokens.push(Spanned {
                token: Token::Sym("\\"),
                offset,
            });
            continue;
        }
        if ch.is_ascii_digit() {
            let mut end = offset;
            while let Some(&(i, c)) = chars.peek() {
                if !c.is_ascii_digit() {
                    break;
                }
                end = i + c.len_utf8();
                chars.next();
            }
            let text = &source[offset..end];
            let value = text.parse::<i64>().map_err(|_| SyntaxError::IntegerRange {
                text: text.to_string(),
                offset,
            })?;
            tokens.push(Spanned {
                token: Token::Int(value),
                offset,
            });
            continue;
        }
        if ch.is_alphabetic() || ch == '_' {
            let mut end = offset;
            while let Some(&(i, c)) = chars.peek() {
                if !(c.is_alphanumeric() || c == '_' || c == '\'') {
                    break;
                }
                end = i + c.len_utf8();
                chars.next();
            }
            let word = &source[offset..end];
            let token = match KEYWORDS.get(word) {
                Some(kw) => Token::Keyword(*kw),
                None => Token::Ident(word.to_string()),
            };
            tokens.push(Spanned { token, offset });
            continue;
        }
        if ch == '"' {
            chars.next();
            let mut text = String::new();
            let mut closed = false;
            while let Some((_, c)) = chars.next() {
                match c {
                    '"' => {
                        closed = true;
                        break;
                    }
                    '\\' => match chars.next() {
                        Some((_, 'n')) => text.push('\n'),
                        Some((_, 't')) => text.push('\t'),
                        Some((_, other)) => text.push(other),
                        None => break,
                    },
                    other => text.push(other),
                }
            }
            if !closed {
                return Err(SyntaxError::UnterminatedString(offset));
            }
            tokens.push(Spanned {
                token: Token::Str(text),
                offset,
            });
            continue;
        }
        let Some(sym) = SYMBOLS.iter().find(|sym| rest.starts_with(**sym)) else {
            return Err(SyntaxError::UnexpectedChar { ch, offset });
        };
        for _ in 0..sym.chars().count() {
            chars.next();
        }
        tokens.push(Spanned {
            token: Token::Sym(*sym),
            offset,
        });
    }
    tokens.push(Spanned {
        token: Token::Eof,
        offset: source.len(),
    });
    Ok(tokens)
}

pub fn parse(source: &str) -> Result<Term, SyntaxError> {
    let mut parser = Parser {
        tokens: tokenize(source)?,
        pos: 0,
    };
    let term = parser.expr()?;
    parser.expect(&Token::Eof, "end of input")?;
    Ok(term)
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        self.tokens
            .get(self.pos)
            .map(|spanned| &spanned.token)
            .unwrap_or(&Token::Eof)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map(|s| s.offset).unwrap_or(0)
    }

    fn bump(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == token {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn error(&self, expected: &'static str) -> SyntaxError {
        SyntaxError::Expected {
            expected,
            found: self.peek().to_string(),
            offset: self.offset(),
        }
    }

    fn expect(&mut self, token: &Token, expected: &'static str) -> Result<(), SyntaxError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.error(expected))
        }
    }

    fn ident(&mut self) -> Result<String, SyntaxError> {
        match self.peek().clone() {
            Token::Ident(name) => {
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.error("identifier")),
        }
    }

    fn expr(&mut self) -> Result<Term, SyntaxError> {
        match self.peek() {
            Token::Sym("\\") => {
                self.bump();
                let mut params = vec![self.ident()?];
                while let Token::Ident(_) = self.peek() {
                    params.push(self.ident()?);
                }
                if !self.eat(&Token::Sym("->")) {
                    self.expect(&Token::Sym("."), "`->`")?;
                }
                let body = self.expr()?;
                Ok(params
                    .iter()
                    .rev()
                    .fold(body, |body, param| Term::lam(param, body)))
            }
            Token::Keyword(Keyword::Let) => {
                self.bump();
                let name = self.ident()?;
                self.expect(&Token::Sym("="), "`=`")?;
                let value = self.expr()?;
                self.expect(&Token::Keyword(Keyword::In), "`in`")?;
                let body = self.expr()?;
                Ok(Term::Let {
                    name,
                    value: Box::new(value),
                    body: Box::new(body),
                })
            }
            Token::Keyword(Keyword::If) => {
                self.bump();
                let cond = self.expr()?;
                self.expect(&Token::Keyword(Keyword::Then), "`then`")?;
                let then_branch = self.expr()?;
                self.expect(&Token::Keyword(Keyword::Else), "`else`")?;
                let else_branch = self.expr()?;
                Ok(Term::If {
                    cond: Box::new(cond),
                    then_branch: Box::new(then_branch),
                    else_branch: Box::new(else_branch),
                })
            }
            _ => self.cons(),
        }
    }

    fn cons(&mut self) -> Result<Term, SyntaxError> {
        let head = self.or()?;
        if self.eat(&Token::Sym(":")) {
            let tail = self.expr()?;
            return Ok(Term::Cons(Box::new(head), Box::new(tail)));
        }
        Ok(head)
    }

    fn or(&mut self) -> Result<Term, SyntaxError> {
        let mut lhs = self.and()?;
        while self.eat(&Token::Sym("||")) {
            let rhs = self.and()?;
            lhs = Term::binary(Operator::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    fn and(&mut self) -> Result<Term, SyntaxError> {
        let mut lhs = self.comparison()?;
        while self.eat(&Token::Sym("&&")) {
            let rhs = self.comparison()?;
            lhs = Term::binary(Operator::And, lhs, rhs);
        }
        Ok(lhs)
    }

    fn comparison(&mut self) -> Result<Term, SyntaxError> {
        let lhs = self.sum()?;
        let op = match self.peek() {
            Token::Sym("==") => Operator::Eq,
            Token::Sym("!=") => Operator::Ne,
            Token::Sym("<") => Operator::Lt,
            Token::Sym("<=") => Operator::Le,
            Token::Sym(">") => Operator::Gt,
            Token::Sym(">=") => Operator::Ge,
            _ => return Ok(lhs),
        };
        self.bump();
        let rhs = self.sum()?;
        Ok(Term::binary(op, lhs, rhs))
    }

    fn sum(&mut self) -> Result<Term, SyntaxError> {
        let mut lhs = self.product()?;
        loop {
            let op = match self.peek() {
                Token::Sym("+") => Operator::Add,
                Token::Sym("-") => Operator::Sub,
                _ => return Ok(lhs),
            };
            self.bump();
            let rhs = self.product()?;
            lhs = Term::binary(op, lhs, rhs);
        }
    }

    fn product(&mut self) -> Result<Term, SyntaxError> {
        let mut lhs = self.application()?;
        loop {
            let op = match self.peek() {
                Token::Sym("*") => Operator::Mul,
                Token::Sym("/") => Operator::Div,
                _ => return Ok(lhs),
            };
            self.bump();
            let rhs = self.application()?;
            lhs = Term::binary(op, lhs, rhs);
        }
    }

    fn application(&mut self) -> Result<Term, SyntaxError> {
        let mut func = self.prefix()?;
        while self.starts_atom() {
            let arg = self.atom()?;
            func = Term::app(func, arg);
        }
        Ok(func)
    }

    fn prefix(&mut self) -> Result<Term, SyntaxError> {
        let wrap: fn(Box<Term>) -> Term = match self.peek() {
            Token::Keyword(Keyword::Not) => Term::Not,
            Token::Keyword(Keyword::Fst) => Term::Fst,
            Token::Keyword(Keyword::Snd) => Term::Snd,
            Token::Keyword(Keyword::Head) => Term::Head,
            Token::Keyword(Keyword::Tail) => Term::Tail,
            Token::Sym("-") => {
                self.bump();
                return Ok(match self.atom()? {
                    Term::Num(n) => Term::Num(-n),
                    other => Term::binary(Operator::Sub, Term::Num(0), other),
                });
            }
            _ => return self.atom(),
        };
        self.bump();
        let arg = self.atom()?;
        Ok(wrap(Box::new(arg)))
    }

    fn starts_atom(&self) -> bool {
        matches!(
            self.peek(),
            Token::Int(_)
                | Token::Str(_)
                | Token::Ident(_)
                | Token::Keyword(Keyword::True | Keyword::False)
                | Token::Sym("(")
        )
    }

    fn atom(&mut self) -> Result<Term, SyntaxError> {
        let offset = self.offset();
        match self.bump() {
            Token::Int(n) => Ok(Term::Num(n)),
            Token::Str(s) => Ok(Term::Str(s)),
            Token::Ident(name) => Ok(Term::Var(name)),
            Token::Keyword(Keyword::True) => Ok(Term::Bool(true)),
            Token::Keyword(Keyword::False) => Ok(Term::Bool(false)),
            Token::Sym("(") => {
                let first = self.expr()?;
                if self.eat(&Token::Sym(",")) {
                    let second = self.expr()?;
                    self.expect(&Token::Sym(")"), "`)`")?;
                    return Ok(Term::Pair(Box::new(first), Box::new(second)));
                }
                self.expect(&Token::Sym(")"), "`)`")?;
                Ok(first)
            }
            other => Err(SyntaxError::Expected {
                expected: "expression",
                found: other.to_string(),
                offset,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn arithmetic_precedence() -> Result<()> {
        let term = parse("1 + 2 * 3 - 4")?;
        let expected = Term::binary(
            Operator::Sub,
            Term::binary(
                Operator::Add,
                Term::Num(1),
                Term::binary(Operator::Mul, Term::Num(2), Term::Num(3)),
            ),
            Term::Num(4),
        );
        assert_eq!(term, expected);
        Ok(())
    }

    #[test]
    fn application_binds_tighter_than_operators() -> Result<()> {
        let term = parse("f 3 + f 4")?;
        let expected = Term::binary(
            Operator::Add,
            Term::app(Term::var("f"), Term::Num(3)),
            Term::app(Term::var("f"), Term::Num(4)),
        );
        assert_eq!(term, expected);
        Ok(())
    }

    #[test]
    fn lambda_sugar_and_let() -> Result<()> {
        let term = parse("let add = \\x y -> x + y in (add 3) 4")?;
        let Term::Let { name, value, body } = term else {
            anyhow::bail!("expected let");
        };
        assert_eq!(name, "add");
        assert_eq!(
            *value,
            Term::lam(
                "x",
                Term::lam("y", Term::binary(Operator::Add, Term::var("x"), Term::var("y")))
            )
        );
        assert_eq!(
            *body,
            Term::app(Term::app(Term::var("add"), Term::Num(3)), Term::Num(4))
        );
        assert_eq!(parse("λx. x")?, Term::lam("x", Term::var("x")));
        Ok(())
    }

    #[test]
    fn conditionals_and_booleans() -> Result<()> {
        let term = parse("if 1 < 2 && not false then 10 else 20")?;
        let Term::If { cond, .. } = term else {
            anyhow::bail!("expected if");
        };
        assert_eq!(
            *cond,
            Term::binary(
                Operator::And,
                Term::binary(Operator::Lt, Term::Num(1), Term::Num(2)),
                Term::Not(Box::new(Term::Bool(false)))
            )
        );
        Ok(())
    }

    #[test]
    fn pairs_lists_and_strings() -> Result<()> {
        assert_eq!(
            parse("fst (1, \"two\")")?,
            Term::Fst(Box::new(Term::Pair(
                Box::new(Term::Num(1)),
                Box::new(Term::Str("two".into()))
            )))
        );
        assert_eq!(
            parse("1 : 2 : 3")?,
            Term::Cons(
                Box::new(Term::Num(1)),
                Box::new(Term::Cons(Box::new(Term::Num(2)), Box::new(Term::Num(3))))
            )
        );
        assert_eq!(parse("-5 -- trailing comment")?, Term::Num(-5));
        Ok(())
    }

    #[test]
    fn reports_positions() -> Result<()> {
        assert_eq!(
            parse("1 + "),
            Err(SyntaxError::Expected {
                expected: "expression",
                found: "end of input".into(),
                offset: 4,
            })
        );
        assert_eq!(
            parse("let x 5"),
            Err(SyntaxError::Expected {
                expected: "`=`",
                found: "`5`".into(),
                offset: 6,
            })
        );
        assert_eq!(
            parse("1 # 2"),
            Err(SyntaxError::UnexpectedChar { ch: '#', offset: 2 })
        );
        assert_eq!(parse("\"open"), Err(SyntaxError::UnterminatedString(0)));
        assert!(matches!(
            parse("99999999999999999999"),
            Err(SyntaxError::IntegerRange { .. })
        ));
        Ok(())
    }
}
