//! Formula parser for R-style formulas
//!
//! This parser implements R-style formula syntax with support for:
//! - Response terms: y ~ x1 + x2, log2(y) ~ log2(x)
//! - Intercept control: y ~ 0 + x1, y ~ x1 - 1, y ~ 1
//! - Interactions: x1:x2, x1:x2:x3
//! - Crossing: a*b -> a + b + a:b
//! - Function calls: log(x), sqrt(x), factor(x)

use crate::formula::error::{FormulaError, FormulaResult};
use crate::formula::{Formula, Term};
use std::iter::Peekable;
use std::str::Chars;

/// Formula parser
pub struct FormulaParser<'a> {
    chars: Peekable<Chars<'a>>,
    original: String,
    position: usize,
}

#[derive(Clone, Copy, PartialEq)]
enum Sign {
    Plus,
    Minus,
}

impl<'a> FormulaParser<'a> {
    /// Create a new parser
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            original: input.to_string(),
            position: 0,
        }
    }

    /// Parse a formula
    pub fn parse(formula: &str) -> FormulaResult<Formula> {
        let mut parser = FormulaParser::new(formula);
        parser.parse_formula()
    }

    /// Parse the entire formula
    fn parse_formula(&mut self) -> FormulaResult<Formula> {
        self.skip_whitespace();

        if self.chars.peek().is_none() {
            return Err(FormulaError::syntax(self.position, "Empty formula"));
        }

        let response = self.parse_response()?;
        self.parse_tilde()?;
        let (has_intercept, terms) = self.parse_rhs()?;

        self.skip_whitespace();
        if self.chars.peek().is_some() {
            let remaining: String = self.chars.clone().collect();
            return Err(FormulaError::syntax_with_context(
                self.position,
                "Trailing characters after formula",
                format!("Unexpected: '{}'", remaining),
            ));
        }

        Ok(Formula {
            response,
            terms,
            has_intercept,
            original: self.original.clone(),
        })
    }

    /// Parse response (left side of ~)
    fn parse_response(&mut self) -> FormulaResult<Option<Term>> {
        self.skip_whitespace();

        if self.peek_char() == Some('~') {
            return Ok(None);
        }

        let response = self.parse_factor()?;

        self.skip_whitespace();
        if self.peek_char() == Some('~') {
            Ok(Some(response))
        } else {
            Err(FormulaError::syntax_with_context(
                self.position,
                "Expected '~' after response",
                format!("Found '{}' instead", self.peek_char().unwrap_or(' ')),
            ))
        }
    }

    /// Parse right-hand side of formula
    fn parse_rhs(&mut self) -> FormulaResult<(bool, Vec<Term>)> {
        self.skip_whitespace();

        if self.chars.peek().is_none() {
            return Ok((true, Vec::new()));
        }

        let mut has_intercept = true;
        let mut terms: Vec<Term> = Vec::new();
        let mut sign = Sign::Plus;

        if self.peek_char() == Some('-') {
            self.advance();
            sign = Sign::Minus;
        }

        loop {
            self.skip_whitespace();

            match self.peek_char() {
                Some(c @ ('0' | '1')) => {
                    self.advance();
                    if self.peek_char().is_some_and(|next| next.is_ascii_digit()) {
                        return Err(FormulaError::syntax(
                            self.position,
                            "Only 0 or 1 may appear as a numeric term",
                        ));
                    }
                    has_intercept = matches!((sign, c), (Sign::Plus, '1') | (Sign::Minus, '0'));
                }
                Some('+') | Some('-') => {
                    return Err(FormulaError::syntax(
                        self.position,
                        "Expected term before operator",
                    ));
                }
                _ => {
                    let expanded = self.parse_term()?;
                    if sign == Sign::Minus {
                        return Err(FormulaError::InvalidStructure {
                            message: "only the intercept can be removed with '-'".to_string(),
                            suggestion: Some("drop the term from the formula instead".to_string()),
                        });
                    }
                    for term in expanded {
                        if !terms.contains(&term) {
                            terms.push(term);
                        }
                    }
                }
            }

            self.skip_whitespace();
            sign = match self.peek_char() {
                Some('+') => Sign::Plus,
                Some('-') => Sign::Minus,
                _ => break,
            };
            self.advance();

            self.skip_whitespace();
            if self.chars.peek().is_none() {
                return Err(FormulaError::syntax(
                    self.position,
                    "Expected term after operator",
                ));
            }
        }

        Ok((has_intercept, terms))
    }

    /// Parse a term: interactions joined by '*', expanded to all their crossings
    fn parse_term(&mut self) -> FormulaResult<Vec<Term>> {
        let mut crossed = vec![self.parse_interaction()?];

        loop {
            self.skip_whitespace();
            if self.peek_char() != Some('*') {
                break;
            }
            self.advance();
            crossed.push(self.parse_interaction()?);
        }

        if crossed.len() == 1 {
            return Ok(vec![make_term(crossed.remove(0))]);
        }

        // every non-empty subset, lower orders first
        let mut subsets: Vec<Vec<usize>> = (1u32..(1 << crossed.len()))
            .map(|mask| (0..crossed.len()).filter(|i| mask & (1 << i) != 0).collect())
            .collect();
        subsets.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));

        Ok(subsets
            .into_iter()
            .map(|subset| {
                let factors: Vec<Term> = subset
                    .into_iter()
                    .flat_map(|i| crossed[i].iter().cloned())
                    .collect();
                make_term(factors)
            })
            .collect())
    }

    /// Parse factors separated by ':'
    fn parse_interaction(&mut self) -> FormulaResult<Vec<Term>> {
        let mut factors = vec![self.parse_factor()?];

        loop {
            self.skip_whitespace();
            if self.peek_char() != Some(':') {
                break;
            }
            self.advance();
            let factor = self.parse_factor()?;
            if !factors.contains(&factor) {
                factors.push(factor);
            }
        }

        Ok(factors)
    }

    /// Parse a factor (variable or function call)
    fn parse_factor(&mut self) -> FormulaResult<Term> {
        self.skip_whitespace();

        match self.peek_char() {
            Some(c) if c.is_alphabetic() => self.parse_identifier_or_function(),
            Some('(') => Err(FormulaError::syntax_with_context(
                self.position,
                "Parenthesized expressions are not supported",
                "write the expanded terms instead",
            )),
            Some(c) => Err(FormulaError::syntax(
                self.position,
                format!("Unexpected character '{}' in factor", c),
            )),
            None => Err(FormulaError::syntax(
                self.position,
                "Unexpected end of input, expected factor",
            )),
        }
    }

    /// Parse an identifier or function call
    fn parse_identifier_or_function(&mut self) -> FormulaResult<Term> {
        let ident = self.parse_identifier()?;

        self.skip_whitespace();

        if self.peek_char() == Some('(') {
            self.parse_function_call(&ident)
        } else {
            Ok(Term::variable(&ident))
        }
    }

    /// Parse a function call
    fn parse_function_call(&mut self, func_name: &str) -> FormulaResult<Term> {
        self.advance(); // '('

        let mut args = Vec::new();

        loop {
            self.skip_whitespace();

            if self.peek_char() == Some(')') {
                if args.is_empty() {
                    return Err(FormulaError::syntax(
                        self.position,
                        format!("Function '{}' requires at least one argument", func_name),
                    ));
                }
                self.advance();
                break;
            }

            args.push(self.parse_factor()?);

            self.skip_whitespace();

            match self.peek_char() {
                Some(',') => {
                    self.advance();
                    continue;
                }
                Some(')') => {
                    self.advance();
                    break;
                }
                Some(c) => {
                    return Err(FormulaError::syntax(
                        self.position,
                        format!("Expected ',' or ')', found '{}'", c),
                    ));
                }
                None => {
                    return Err(FormulaError::syntax(
                        self.position,
                        "Unexpected end of input, expected ')'",
                    ));
                }
            }
        }

        Ok(Term::function(func_name, args))
    }

    /// Parse an identifier
    fn parse_identifier(&mut self) -> FormulaResult<String> {
        let mut ident = String::new();
        let start_pos = self.position;

        match self.chars.next() {
            Some(c) if c.is_alphabetic() => {
                self.position += 1;
                ident.push(c);
            }
            Some(c) => {
                return Err(FormulaError::syntax(
                    start_pos,
                    format!("Identifier must start with a letter, found '{}'", c),
                ));
            }
            None => {
                return Err(FormulaError::syntax(
                    start_pos,
                    "Unexpected end of input, expected identifier",
                ));
            }
        }

        // Subsequent characters can be alphanumeric, underscore, or period
        while let Some(&c) = self.chars.peek() {
            if c.is_alphanumeric() || c == '_' || c == '.' {
                ident.push(c);
                self.advance();
            } else {
                break;
            }
        }

        Ok(ident)
    }

    /// Parse tilde operator
    fn parse_tilde(&mut self) -> FormulaResult<()> {
        self.skip_whitespace();

        match self.chars.next() {
            Some('~') => {
                self.position += 1;
                Ok(())
            }
            Some(c) => Err(FormulaError::syntax(
                self.position,
                format!("Expected '~', found '{}'", c),
            )),
            None => Err(FormulaError::syntax(
                self.position,
                "Unexpected end of formula, expected '~'",
            )),
        }
    }

    /// Skip whitespace
    fn skip_whitespace(&mut self) {
        while let Some(&c) = self.chars.peek() {
            if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn advance(&mut self) {
        if self.chars.next().is_some() {
            self.position += 1;
        }
    }

    /// Peek at next character
    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }
}

fn make_term(mut factors: Vec<Term>) -> Term {
    if factors.len() == 1 {
        factors.remove(0)
    } else {
        Term::interaction(factors)
    }
}
