//! Recursive-descent parser from selector text to [`Expr`].

use super::ast::{
    Attribute, Category, Comparator, Comparison, Direction, Expr, Neighbor, ScopedAssertion,
    ScopedAttribute, ScopedValue, Step,
};
use super::SelectorSyntaxError;
use crate::types::ShapeType;

const ATTRIBUTE_ROOTS: [&str; 4] = ["id", "service", "trait", "var"];

pub(crate) fn parse(input: &str) -> Result<Expr, SelectorSyntaxError> {
    let mut parser = Parser {
        input,
        chars: input.chars().collect(),
        pos: 0,
        roots: 0,
    };
    let expr = parser.expr(&[])?;
    parser.ws();
    if !parser.eof() {
        return Err(parser.error(format!("Unexpected character `{}`", parser.chars[parser.pos])));
    }
    Ok(expr)
}

struct Parser<'a> {
    input: &'a str,
    chars: Vec<char>,
    pos: usize,
    roots: usize,
}

impl Parser<'_> {
    // --- steps -----------------------------------------------------------

    /// Steps until end of input or one of `terminators`.
    fn expr(&mut self, terminators: &[char]) -> Result<Expr, SelectorSyntaxError> {
        let mut steps = Vec::new();
        loop {
            self.ws();
            match self.peek() {
                None => break,
                Some(c) if terminators.contains(&c) => break,
                Some(_) => steps.push(self.step()?),
            }
        }
        if steps.is_empty() {
            return Err(self.error("Expected a selector".to_string()));
        }
        Ok(Expr { steps })
    }

    fn step(&mut self) -> Result<Step, SelectorSyntaxError> {
        match self.peek() {
            Some('*') => {
                self.pos += 1;
                Ok(Step::Identity)
            }
            Some('>') => {
                self.pos += 1;
                Ok(Step::Neighbor(Neighbor {
                    direction: Direction::Forward,
                    labels: Vec::new(),
                }))
            }
            Some('<') => {
                if self.peek_at(1) == Some('-') {
                    self.expect_str("<-[")?;
                    let labels = self.labels()?;
                    self.expect_str("]-")?;
                    Ok(Step::Neighbor(Neighbor {
                        direction: Direction::Reverse,
                        labels,
                    }))
                } else {
                    self.pos += 1;
                    Ok(Step::Neighbor(Neighbor {
                        direction: Direction::Reverse,
                        labels: Vec::new(),
                    }))
                }
            }
            Some('~') => {
                self.expect_str("~>")?;
                Ok(Step::RecursiveNeighbor)
            }
            Some('-') => {
                self.expect_str("-[")?;
                let labels = self.labels()?;
                self.expect_str("]->")?;
                Ok(Step::Neighbor(Neighbor {
                    direction: Direction::Forward,
                    labels,
                }))
            }
            Some('[') => self.attribute(),
            Some(':') => self.function(),
            Some('$') => self.variable(),
            Some(c) if c.is_ascii_alphabetic() => {
                let start = self.pos;
                let word = self.identifier()?;
                match word.as_str() {
                    "number" => Ok(Step::Category(Category::Number)),
                    "simpleType" => Ok(Step::Category(Category::SimpleType)),
                    "collection" => Ok(Step::Category(Category::Collection)),
                    other => other.parse::<ShapeType>().map(Step::Type).map_err(|_| {
                        self.pos = start;
                        self.error(format!("Unknown shape type `{}`", other))
                    }),
                }
            }
            Some(c) => Err(self.error(format!("Unexpected character `{}`", c))),
            None => Err(self.error("Unexpected end of selector".to_string())),
        }
    }

    fn labels(&mut self) -> Result<Vec<String>, SelectorSyntaxError> {
        let mut labels = Vec::new();
        loop {
            self.ws();
            labels.push(self.identifier()?);
            self.ws();
            if self.peek() == Some(',') {
                self.pos += 1;
            } else {
                return Ok(labels);
            }
        }
    }

    fn function(&mut self) -> Result<Step, SelectorSyntaxError> {
        self.expect(':')?;
        let name = self.identifier()?;
        self.ws();
        self.expect('(')?;
        let mut args = Vec::new();
        loop {
            args.push(self.expr(&[',', ')'])?);
            self.ws();
            match self.next() {
                Some(',') => continue,
                Some(')') => break,
                _ => return Err(self.error("Expected `,` or `)`".to_string())),
            }
        }

        let arity = |min: usize, max: usize, p: &Self| {
            if args.len() < min || args.len() > max {
                Err(p.error(format!(
                    "`:{}` expects {} argument(s), found {}",
                    name,
                    if min == max { min.to_string() } else { format!("{min} to {max}") },
                    args.len()
                )))
            } else {
                Ok(())
            }
        };

        match name.as_str() {
            "not" => {
                arity(1, 1, self)?;
                Ok(Step::Not(Box::new(take_first(args))))
            }
            "test" => Ok(Step::Test(args)),
            "is" | "each" => Ok(Step::Is(args)),
            "in" => {
                arity(1, 1, self)?;
                Ok(Step::In(Box::new(take_first(args))))
            }
            "root" => {
                arity(1, 1, self)?;
                let index = self.roots;
                self.roots += 1;
                Ok(Step::Root {
                    index,
                    expr: Box::new(take_first(args)),
                })
            }
            "recursive" => {
                arity(1, 1, self)?;
                Ok(Step::Recursive(Box::new(take_first(args))))
            }
            "topdown" => {
                arity(1, 2, self)?;
                let mut args = args.into_iter();
                let qualifier = Box::new(args.next().unwrap_or(Expr { steps: vec![] }));
                let disqualifier = args.next().map(Box::new);
                Ok(Step::TopDown {
                    qualifier,
                    disqualifier,
                })
            }
            other => {
                tracing::warn!(function = other, selector = self.input, "unknown selector function");
                Ok(Step::Nothing)
            }
        }
    }

    fn variable(&mut self) -> Result<Step, SelectorSyntaxError> {
        self.expect('$')?;
        if self.peek() == Some('{') {
            self.pos += 1;
            let name = self.identifier()?;
            self.expect('}')?;
            return Ok(Step::VariableGet(name));
        }
        let name = self.identifier()?;
        self.expect('(')?;
        let expr = self.expr(&[')'])?;
        self.ws();
        self.expect(')')?;
        Ok(Step::VariableStore {
            name,
            expr: Box::new(expr),
        })
    }

    // --- attributes ------------------------------------------------------

    fn attribute(&mut self) -> Result<Step, SelectorSyntaxError> {
        self.expect('[')?;
        self.ws();
        if self.peek() == Some('@') {
            return self.scoped_attribute();
        }
        let path = self.attribute_path()?;
        self.ws();
        if self.peek() == Some(']') {
            self.pos += 1;
            return Ok(Step::Attribute(Attribute {
                path,
                comparison: None,
            }));
        }
        let comparator = self.comparator()?;
        let mut values = Vec::new();
        loop {
            self.ws();
            values.push(self.value()?);
            self.ws();
            if self.peek() == Some(',') {
                self.pos += 1;
            } else {
                break;
            }
        }
        let case_insensitive = self.case_flag();
        self.ws();
        self.expect(']')?;
        Ok(Step::Attribute(Attribute {
            path,
            comparison: Some(Comparison {
                comparator,
                values,
                case_insensitive,
            }),
        }))
    }

    fn scoped_attribute(&mut self) -> Result<Step, SelectorSyntaxError> {
        self.expect('@')?;
        self.ws();
        let path = if self.peek() == Some(':') {
            Vec::new()
        } else {
            self.attribute_path()?
        };
        self.ws();
        self.expect(':')?;

        let mut assertions = Vec::new();
        loop {
            self.ws();
            let lhs = self.scoped_value()?;
            self.ws();
            let comparator = self.comparator()?;
            let mut rhs = Vec::new();
            loop {
                self.ws();
                rhs.push(self.scoped_value()?);
                self.ws();
                if self.peek() == Some(',') {
                    self.pos += 1;
                } else {
                    break;
                }
            }
            let case_insensitive = self.case_flag();
            assertions.push(ScopedAssertion {
                lhs,
                comparator,
                rhs,
                case_insensitive,
            });
            self.ws();
            if self.peek() == Some('&') {
                self.expect_str("&&")?;
            } else {
                break;
            }
        }
        self.ws();
        self.expect(']')?;
        Ok(Step::Scoped(ScopedAttribute { path, assertions }))
    }

    fn scoped_value(&mut self) -> Result<ScopedValue, SelectorSyntaxError> {
        if self.peek() == Some('@') {
            self.expect_str("@{")?;
            self.ws();
            let path = if self.peek() == Some('}') {
                Vec::new()
            } else {
                self.path_segments()?
            };
            self.ws();
            self.expect('}')?;
            Ok(ScopedValue::Path(path))
        } else {
            Ok(ScopedValue::Literal(self.value()?))
        }
    }

    /// A path whose first segment must be a known attribute root.
    fn attribute_path(&mut self) -> Result<Vec<String>, SelectorSyntaxError> {
        let start = self.pos;
        let path = self.path_segments()?;
        if !ATTRIBUTE_ROOTS.contains(&path[0].as_str()) {
            self.pos = start;
            return Err(self.error(format!(
                "Unknown attribute `{}`; expected one of: id, service, trait, var",
                path[0]
            )));
        }
        Ok(path)
    }

    fn path_segments(&mut self) -> Result<Vec<String>, SelectorSyntaxError> {
        let mut segments = vec![self.segment()?];
        loop {
            self.ws();
            if self.peek() == Some('|') {
                self.pos += 1;
                self.ws();
                segments.push(self.segment()?);
            } else {
                return Ok(segments);
            }
        }
    }

    fn segment(&mut self) -> Result<String, SelectorSyntaxError> {
        match self.peek() {
            Some('"') | Some('\'') => self.quoted(),
            Some('(') => {
                for pseudo in ["(keys)", "(values)", "(length)"] {
                    if self.starts_with(pseudo) {
                        self.pos += pseudo.chars().count();
                        return Ok(pseudo.to_string());
                    }
                }
                Err(self.error("Expected `(keys)`, `(values)` or `(length)`".to_string()))
            }
            _ => {
                let start = self.pos;
                while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '#' | '$'))
                {
                    self.pos += 1;
                }
                if start == self.pos {
                    return Err(self.error("Expected an attribute path segment".to_string()));
                }
                Ok(self.chars[start..self.pos].iter().collect())
            }
        }
    }

    fn comparator(&mut self) -> Result<Comparator, SelectorSyntaxError> {
        for (token, comparator) in Comparator::TOKENS {
            if self.starts_with(token) {
                self.pos += token.chars().count();
                return Ok(comparator);
            }
        }
        Err(self.error("Expected a comparator".to_string()))
    }

    fn value(&mut self) -> Result<String, SelectorSyntaxError> {
        match self.peek() {
            Some('"') | Some('\'') => self.quoted(),
            _ => {
                let start = self.pos;
                while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '#' | '$' | '-' | '+'))
                {
                    self.pos += 1;
                }
                if start == self.pos {
                    return Err(self.error("Expected a value".to_string()));
                }
                Ok(self.chars[start..self.pos].iter().collect())
            }
        }
    }

    /// A trailing ` i` before `]` or `&&`.
    fn case_flag(&mut self) -> bool {
        let save = self.pos;
        self.ws();
        if self.peek() == Some('i') && matches!(self.peek_at(1), Some(']') | Some('&') | Some(' ') | Some('\t') | Some('\n') | Some('\r'))
        {
            self.pos += 1;
            return true;
        }
        self.pos = save;
        false
    }

    // --- lexing ----------------------------------------------------------

    fn quoted(&mut self) -> Result<String, SelectorSyntaxError> {
        let quote = self.next().unwrap_or('"');
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == quote {
                let text: String = self.chars[start..self.pos].iter().collect();
                self.pos += 1;
                return Ok(text);
            }
            self.pos += 1;
        }
        Err(self.error("Unterminated quoted string".to_string()))
    }

    fn identifier(&mut self) -> Result<String, SelectorSyntaxError> {
        let start = self.pos;
        match self.peek() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => self.pos += 1,
            _ => return Err(self.error("Expected an identifier".to_string())),
        }
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    /// Skip whitespace, commas are significant so they are not skipped.
    /// Line comments start with `//`.
    fn ws(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => self.pos += 1,
                Some('/') if self.peek_at(1) == Some('/') => {
                    while !matches!(self.peek(), None | Some('\n')) {
                        self.pos += 1;
                    }
                }
                _ => return,
            }
        }
    }

    fn expect(&mut self, c: char) -> Result<(), SelectorSyntaxError> {
        if self.peek() == Some(c) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(format!("Expected `{}`", c)))
        }
    }

    fn expect_str(&mut self, s: &str) -> Result<(), SelectorSyntaxError> {
        if self.starts_with(s) {
            self.pos += s.chars().count();
            Ok(())
        } else {
            Err(self.error(format!("Expected `{}`", s)))
        }
    }

    fn starts_with(&self, s: &str) -> bool {
        s.chars()
            .enumerate()
            .all(|(i, c)| self.peek_at(i) == Some(c))
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn next(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn eof(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn error(&self, message: String) -> SelectorSyntaxError {
        let mut line = 1;
        let mut column = 1;
        for c in self.chars.iter().take(self.pos) {
            if *c == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }
        SelectorSyntaxError {
            message,
            selector: self.input.to_string(),
            offset: self.pos,
            line,
            column,
        }
    }
}

fn take_first(args: Vec<Expr>) -> Expr {
    args.into_iter()
        .next()
        .unwrap_or(Expr { steps: Vec::new() })
}

// --- tests -------------------------------------------------------------------
