//! Formula-based spectral indices
//!
//! Parses arithmetic formulas over named bands, e.g.
//! - `"(red - nir) / (nir - swir)"` → RDRI
//! - `"(green - nir) / (green + nir)"` → NDWI
//!
//! Supported syntax: `+ - * /`, parentheses, unary minus, numeric constants
//! and band names (`[A-Za-z_][A-Za-z0-9_]*`). Band names are resolved to
//! input slots at parse time, so evaluation does no lookups per pixel.

use crate::imagery::indices::{build_output, check_dimensions, DIVISION_EPSILON};
use crate::maybe_rayon::*;
use rivice_core::raster::Raster;
use rivice_core::{Error, Result};

/// A token in the parsed expression
#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Band(String),
    Op(char),
    LParen,
    RParen,
}

/// A node in the expression AST
#[derive(Debug, Clone)]
enum Expr {
    Num(f64),
    /// Index into [`Formula::bands`]
    Band(usize),
    BinOp {
        op: char,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Neg(Box<Expr>),
}

/// Tokenize a formula string
fn tokenize(formula: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = formula.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            c if c.is_whitespace() => i += 1,
            '+' | '-' | '*' | '/' => {
                tokens.push(Token::Op(chars[i]));
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
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let num_str: String = chars[start..i].iter().collect();
                let num = num_str
                    .parse::<f64>()
                    .map_err(|_| Error::Algorithm(format!("Invalid number: {}", num_str)))?;
                tokens.push(Token::Number(num));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Band(chars[start..i].iter().collect()));
            }
            c => {
                return Err(Error::Algorithm(format!(
                    "Unexpected character '{}' in formula",
                    c
                )));
            }
        }
    }

    Ok(tokens)
}

/// Recursive descent parser for arithmetic expressions
struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    bands: Vec<String>,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            bands: Vec::new(),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn band_slot(&mut self, name: String) -> usize {
        match self.bands.iter().position(|b| *b == name) {
            Some(i) => i,
            None => {
                self.bands.push(name);
                self.bands.len() - 1
            }
        }
    }

    /// Parse: expr = term (('+' | '-') term)*
    fn parse_expr(&mut self) -> Result<Expr> {
        let mut left = self.parse_term()?;

        while let Some(Token::Op(op @ ('+' | '-'))) = self.peek() {
            let op = *op;
            self.advance();
            let right = self.parse_term()?;
            left = Expr::BinOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    /// Parse: term = factor (('*' | '/') factor)*
    fn parse_term(&mut self) -> Result<Expr> {
        let mut left = self.parse_factor()?;

        while let Some(Token::Op(op @ ('*' | '/'))) = self.peek() {
            let op = *op;
            self.advance();
            let right = self.parse_factor()?;
            left = Expr::BinOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    /// Parse: factor = number | band | '(' expr ')' | '-' factor | '+' factor
    fn parse_factor(&mut self) -> Result<Expr> {
        match self.advance() {
            Some(Token::Number(n)) => Ok(Expr::Num(n)),
            Some(Token::Band(name)) => Ok(Expr::Band(self.band_slot(name))),
            Some(Token::LParen) => {
                let expr = self.parse_expr()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(expr),
                    _ => Err(Error::Algorithm("Expected closing parenthesis".into())),
                }
            }
            Some(Token::Op('-')) => Ok(Expr::Neg(Box::new(self.parse_factor()?))),
            Some(Token::Op('+')) => self.parse_factor(),
            other => Err(Error::Algorithm(format!(
                "Unexpected token in formula: {:?}",
                other
            ))),
        }
    }
}

/// Evaluate an expression with band values in slot order
fn eval(expr: &Expr, values: &[f64]) -> f64 {
    match expr {
        Expr::Num(n) => *n,
        Expr::Band(slot) => values[*slot],
        Expr::BinOp { op, left, right } => {
            let l = eval(left, values);
            let r = eval(right, values);
            match op {
                '+' => l + r,
                '-' => l - r,
                '*' => l * r,
                '/' => {
                    if r.abs() < DIVISION_EPSILON {
                        f64::NAN
                    } else {
                        l / r
                    }
                }
                _ => f64::NAN,
            }
        }
        Expr::Neg(inner) => -eval(inner, values),
    }
}

/// A parsed band-algebra formula.
#[derive(Debug, Clone)]
pub struct Formula {
    source: String,
    expr: Expr,
    bands: Vec<String>,
}

impl Formula {
    /// Parse a formula.
    ///
    /// # Errors
    /// Unknown characters, unbalanced parentheses, dangling operators and
    /// trailing tokens are rejected.
    pub fn parse(formula: &str) -> Result<Self> {
        let tokens = tokenize(formula)?;
        if tokens.is_empty() {
            return Err(Error::Algorithm("Empty formula".into()));
        }

        let mut parser = Parser::new(tokens);
        let expr = parser.parse_expr()?;
        if let Some(extra) = parser.peek() {
            return Err(Error::Algorithm(format!(
                "Unexpected trailing token in formula: {:?}",
                extra
            )));
        }

        Ok(Self {
            source: formula.trim().to_string(),
            expr,
            bands: parser.bands,
        })
    }

    /// `(a - b) / (b - c)` over three distinct bands, built without parsing
    pub(crate) fn difference_ratio(a: &str, b: &str, c: &str) -> Self {
        let diff = |l: usize, r: usize| Expr::BinOp {
            op: '-',
            left: Box::new(Expr::Band(l)),
            right: Box::new(Expr::Band(r)),
        };
        Self {
            source: format!("({a} - {b}) / ({b} - {c})"),
            expr: Expr::BinOp {
                op: '/',
                left: Box::new(diff(0, 1)),
                right: Box::new(diff(1, 2)),
            },
            bands: vec![a.to_string(), b.to_string(), c.to_string()],
        }
    }

    /// Formula text as supplied
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Band names referenced, in order of first appearance
    pub fn bands(&self) -> &[String] {
        &self.bands
    }

    /// Evaluate per pixel.
    ///
    /// `inputs[i]` supplies the band named `self.bands()[i]`. A pixel is NaN
    /// if any input is invalid there or a division by zero occurs.
    pub fn evaluate(&self, inputs: &[&Raster<f64>]) -> Result<Raster<f64>> {
        if inputs.len() != self.bands.len() {
            return Err(Error::Algorithm(format!(
                "Formula '{}' needs {} bands, got {}",
                self.source,
                self.bands.len(),
                inputs.len()
            )));
        }

        let first = match inputs.first() {
            Some(first) => *first,
            None => {
                return Err(Error::Algorithm(format!(
                    "Formula '{}' references no bands",
                    self.source
                )))
            }
        };
        for raster in &inputs[1..] {
            check_dimensions(first, raster)?;
        }

        let (rows, cols) = first.shape();

        let data: Vec<f64> = (0..rows)
            .into_par_iter()
            .flat_map(|row| {
                let mut row_data = vec![f64::NAN; cols];
                let mut values = vec![0.0; inputs.len()];

                'pixel: for (col, out) in row_data.iter_mut().enumerate() {
                    for (slot, raster) in inputs.iter().enumerate() {
                        let v = unsafe { raster.get_unchecked(row, col) };
                        if raster.is_nodata(v) {
                            continue 'pixel;
                        }
                        values[slot] = v;
                    }
                    *out = eval(&self.expr, &values);
                }

                row_data
            })
            .collect();

        build_output(first, data)
    }
}
