// Formula parser and evaluator for the subset the synthesizer emits.
// Supports: decimal literals, A1 / $A$1 refs with optional Sheet! prefix,
// ranges inside SUM/MAX/MIN, + - * / ^, unary minus, parentheses.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, MathematicalOps};
use std::str::FromStr;

/// A cell address as written in a formula; rows and columns are 0-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellAddr {
    pub sheet: Option<String>,
    pub row: u32,
    pub col: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(Decimal),
    Ref(CellAddr),
    Range(CellAddr, CellAddr),
    Neg(Box<Expr>),
    Binary {
        op: Op,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Function {
        name: String,
        args: Vec<Expr>,
    },
}

/// Parse a formula string (must start with '=').
pub fn parse(formula: &str) -> Result<Expr, String> {
    let formula = formula.trim();
    let input = formula
        .strip_prefix('=')
        .ok_or_else(|| "Formula must start with =".to_string())?;

    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err("Empty formula".to_string());
    }

    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.expr()?;
    if parser.pos != parser.tokens.len() {
        return Err(format!("Unexpected token at position {}", parser.pos));
    }
    Ok(expr)
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(Decimal),
    CellRef { row: u32, col: u16 },
    SheetPrefix(String),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
    Comma,
    Colon,
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' => i += 1,
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '^' => {
                tokens.push(Token::Caret);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            ':' => {
                tokens.push(Token::Colon);
                i += 1;
            }
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let n = Decimal::from_str(&text).map_err(|e| format!("Bad number '{text}': {e}"))?;
                tokens.push(Token::Number(n));
            }
            c if c.is_ascii_alphabetic() || c == '$' || c == '_' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_ascii_alphanumeric() || chars[i] == '$' || chars[i] == '_')
                {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                match chars.get(i) {
                    Some('!') => {
                        tokens.push(Token::SheetPrefix(word));
                        i += 1;
                    }
                    Some('(') => tokens.push(Token::Ident(word.to_ascii_uppercase())),
                    _ => {
                        let (row, col) = parse_a1(&word)?;
                        tokens.push(Token::CellRef { row, col });
                    }
                }
            }
            other => return Err(format!("Unexpected character '{other}'")),
        }
    }

    Ok(tokens)
}

/// "$C$12" / "C12" -> (11, 2)
fn parse_a1(word: &str) -> Result<(u32, u16), String> {
    let stripped: String = word.chars().filter(|c| *c != '$').collect();
    let split = stripped
        .find(|c: char| c.is_ascii_digit())
        .ok_or_else(|| format!("Not a cell reference: '{word}'"))?;
    let (letters, digits) = stripped.split_at(split);
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(format!("Not a cell reference: '{word}'"));
    }

    let mut col: u32 = 0;
    for c in letters.chars() {
        col = col * 26 + (c.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
    }
    let row: u32 = digits
        .parse()
        .map_err(|_| format!("Not a cell reference: '{word}'"))?;
    if row == 0 || col == 0 || col > u16::MAX as u32 {
        return Err(format!("Cell reference out of range: '{word}'"));
    }
    Ok((row - 1, (col - 1) as u16))
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        t
    }

    fn expect(&mut self, expected: Token) -> Result<(), String> {
        match self.next() {
            Some(t) if t == expected => Ok(()),
            Some(t) => Err(format!("Expected {expected:?}, found {t:?}")),
            None => Err(format!("Expected {expected:?}, found end of formula")),
        }
    }

    fn expr(&mut self) -> Result<Expr, String> {
        let mut left = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => Op::Add,
                Some(Token::Minus) => Op::Sub,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.term()?;
            left = binary(op, left, right);
        }
    }

    fn term(&mut self) -> Result<Expr, String> {
        let mut left = self.power()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => Op::Mul,
                Some(Token::Slash) => Op::Div,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.power()?;
            left = binary(op, left, right);
        }
    }

    // Left-associative, and binds looser than unary minus (-2^2 = 4)
    fn power(&mut self) -> Result<Expr, String> {
        let mut left = self.unary()?;
        while let Some(Token::Caret) = self.peek() {
            self.pos += 1;
            let right = self.unary()?;
            left = binary(Op::Pow, left, right);
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, String> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                Ok(Expr::Neg(Box::new(self.unary()?)))
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Expr, String> {
        match self.next() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::LParen) => {
                let inner = self.expr()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(Token::SheetPrefix(sheet)) => match self.next() {
                Some(Token::CellRef { row, col }) => self.reference(Some(sheet), row, col),
                other => Err(format!("Expected cell after '{sheet}!', found {other:?}")),
            },
            Some(Token::CellRef { row, col }) => self.reference(None, row, col),
            Some(Token::Ident(name)) => {
                self.expect(Token::LParen)?;
                let mut args = Vec::new();
                if self.peek() != Some(&Token::RParen) {
                    loop {
                        args.push(self.expr()?);
                        if self.peek() == Some(&Token::Comma) {
                            self.pos += 1;
                        } else {
                            break;
                        }
                    }
                }
                self.expect(Token::RParen)?;
                Ok(Expr::Function { name, args })
            }
            Some(t) => Err(format!("Unexpected token {t:?}")),
            None => Err("Unexpected end of formula".to_string()),
        }
    }

    fn reference(&mut self, sheet: Option<String>, row: u32, col: u16) -> Result<Expr, String> {
        let start = CellAddr {
            sheet: sheet.clone(),
            row,
            col,
        };
        if self.peek() != Some(&Token::Colon) {
            return Ok(Expr::Ref(start));
        }
        self.pos += 1;
        match self.next() {
            Some(Token::CellRef { row, col }) => Ok(Expr::Range(start, CellAddr { sheet, row, col })),
            other => Err(format!("Expected range end, found {other:?}")),
        }
    }
}

fn binary(op: Op, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Evaluate an expression; `lookup` resolves a single cell to a number.
pub fn evaluate<F>(expr: &Expr, lookup: &mut F) -> Result<Decimal, String>
where
    F: FnMut(&CellAddr) -> Result<Decimal, String>,
{
    match expr {
        Expr::Number(n) => Ok(*n),
        Expr::Ref(addr) => lookup(addr),
        Expr::Range(..) => Err("Range used outside of a function".to_string()),
        Expr::Neg(inner) => Ok(-evaluate(inner, lookup)?),
        Expr::Binary { op, left, right } => {
            let l = evaluate(left, lookup)?;
            let r = evaluate(right, lookup)?;
            apply(*op, l, r)
        }
        Expr::Function { name, args } => {
            let mut values = Vec::new();
            for arg in args {
                match arg {
                    Expr::Range(start, end) => values.extend(expand_range(start, end, lookup)?),
                    other => values.push(evaluate(other, lookup)?),
                }
            }
            call(name, &values)
        }
    }
}

fn apply(op: Op, l: Decimal, r: Decimal) -> Result<Decimal, String> {
    let overflow = || format!("Arithmetic overflow in {l} {op:?} {r}");
    match op {
        Op::Add => l.checked_add(r).ok_or_else(overflow),
        Op::Sub => l.checked_sub(r).ok_or_else(overflow),
        Op::Mul => l.checked_mul(r).ok_or_else(overflow),
        Op::Div => {
            if r.is_zero() {
                return Err("#DIV/0!".to_string());
            }
            l.checked_div(r).ok_or_else(overflow)
        }
        Op::Pow => {
            if r.fract().is_zero() {
                let exp = r.to_i64().ok_or_else(overflow)?;
                l.checked_powi(exp).ok_or_else(overflow)
            } else {
                l.checked_powd(r).ok_or_else(overflow)
            }
        }
    }
}

fn expand_range<F>(start: &CellAddr, end: &CellAddr, lookup: &mut F) -> Result<Vec<Decimal>, String>
where
    F: FnMut(&CellAddr) -> Result<Decimal, String>,
{
    let (r0, r1) = (start.row.min(end.row), start.row.max(end.row));
    let (c0, c1) = (start.col.min(end.col), start.col.max(end.col));
    let mut values = Vec::new();
    for row in r0..=r1 {
        for col in c0..=c1 {
            values.push(lookup(&CellAddr {
                sheet: start.sheet.clone(),
                row,
                col,
            })?);
        }
    }
    Ok(values)
}

fn call(name: &str, values: &[Decimal]) -> Result<Decimal, String> {
    match name {
        "SUM" => Ok(values.iter().copied().sum()),
        "MAX" => values
            .iter()
            .copied()
            .max()
            .ok_or_else(|| "MAX needs at least one argument".to_string()),
        "MIN" => values
            .iter()
            .copied()
            .min()
            .ok_or_else(|| "MIN needs at least one argument".to_string()),
        other => Err(format!("Unsupported function {other}")),
    }
}
