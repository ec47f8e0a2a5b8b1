//! Token-level Python scanner. Not a grammar: it only knows enough to find
//! names, member access and literals while skipping comments and strings.

use crate::error::BindingError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Name,
    Number,
    /// Plain string literal; `literal` holds the unquoted text when it has no escapes.
    Str { literal: Option<String> },
    Dot,
    LBracket,
    RBracket,
    LParen,
    Op,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
}

/// What the binding extractor needs from a parser.
pub trait SourceParser: Send + Sync {
    fn parse(&self, source: &str) -> Result<SyntaxTree, BindingError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyntaxTree {
    pub tokens: Vec<Token>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PythonScanner;

impl SourceParser for PythonScanner {
    fn parse(&self, source: &str) -> Result<SyntaxTree, BindingError> {
        Scanner::new(source).run().map(|tokens| SyntaxTree { tokens })
    }
}

struct Scanner<'a> {
    src: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
    line: usize,
    out: Vec<Token>,
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            chars: src.char_indices().collect(),
            pos: 0,
            line: 1,
            out: Vec::new(),
        }
    }

    fn peek(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).map(|&(_, c)| c)
    }

    fn offset(&self, pos: usize) -> usize {
        self.chars.get(pos).map(|&(o, _)| o).unwrap_or(self.src.len())
    }

    fn push(&mut self, kind: TokenKind, start: usize, line: usize) {
        let text = self.src[self.offset(start)..self.offset(self.pos)].to_string();
        self.out.push(Token { kind, text, line });
    }

    fn run(mut self) -> Result<Vec<Token>, BindingError> {
        while let Some(c) = self.peek(0) {
            let start = self.pos;
            let line = self.line;
            match c {
                '\n' => {
                    self.line += 1;
                    self.pos += 1;
                }
                '#' => {
                    while matches!(self.peek(0), Some(c) if c != '\n') {
                        self.pos += 1;
                    }
                }
                '\'' | '"' => self.string(start, 0)?,
                c if c.is_alphabetic() || c == '_' => {
                    while matches!(self.peek(0), Some(c) if c.is_alphanumeric() || c == '_') {
                        self.pos += 1;
                    }
                    let word = &self.src[self.offset(start)..self.offset(self.pos)];
                    if is_string_prefix(word) && matches!(self.peek(0), Some('\'' | '"')) {
                        let prefix_len = self.pos - start;
                        self.pos = start;
                        self.string(start, prefix_len)?;
                    } else {
                        self.push(TokenKind::Name, start, line);
                    }
                }
                c if c.is_ascii_digit() => {
                    while matches!(self.peek(0), Some(c) if c.is_ascii_alphanumeric() || c == '_') {
                        self.pos += 1;
                    }
                    self.push(TokenKind::Number, start, line);
                }
                '.' => {
                    self.pos += 1;
                    self.push(TokenKind::Dot, start, line);
                }
                '[' => {
                    self.pos += 1;
                    self.push(TokenKind::LBracket, start, line);
                }
                ']' => {
                    self.pos += 1;
                    self.push(TokenKind::RBracket, start, line);
                }
                '(' => {
                    self.pos += 1;
                    self.push(TokenKind::LParen, start, line);
                }
                c if c.is_whitespace() || c == '\\' => self.pos += 1,
                _ => {
                    self.pos += 1;
                    self.push(TokenKind::Op, start, line);
                }
            }
        }
        Ok(self.out)
    }

    // `self.pos` points at the prefix (or the quote when `prefix_len` is 0).
    fn string(&mut self, start: usize, prefix_len: usize) -> Result<(), BindingError> {
        let line = self.line;
        let prefix: String = self.chars[start..start + prefix_len]
            .iter()
            .map(|&(_, c)| c.to_ascii_lowercase())
            .collect();
        self.pos += prefix_len;
        let quote = self.peek(0).unwrap_or('"');
        let triple = self.peek(1) == Some(quote) && self.peek(2) == Some(quote);
        let quote_len = if triple { 3 } else { 1 };
        self.pos += quote_len;
        let body_start = self.pos;
        let mut escaped = false;

        loop {
            match self.peek(0) {
                None => {
                    return Err(BindingError::Parse {
                        line,
                        message: "unterminated string literal".into(),
                    })
                }
                Some('\\') => {
                    escaped = true;
                    if self.peek(1) == Some('\n') {
                        self.line += 1;
                    }
                    self.pos += 2;
                }
                Some('\n') if !triple => {
                    return Err(BindingError::Parse {
                        line,
                        message: "unterminated string literal".into(),
                    })
                }
                Some('\n') => {
                    self.line += 1;
                    self.pos += 1;
                }
                Some(c) if c == quote => {
                    if !triple || (self.peek(1) == Some(quote) && self.peek(2) == Some(quote)) {
                        break;
                    }
                    self.pos += 1;
                }
                Some(_) => self.pos += 1,
            }
        }

        let body_end = self.pos;
        let body = self.src[self.offset(body_start)..self.offset(body_end)].to_string();
        self.pos += quote_len;
        let plain = !escaped && !triple && (prefix.is_empty() || prefix == "u");
        self.push(
            TokenKind::Str { literal: plain.then_some(body) },
            start,
            line,
        );
        if prefix.contains('f') {
            self.replacement_fields(body_start, body_end, line)?;
        }
        Ok(())
    }

    /// Emits the tokens of every `{expr}` in an f-string body. Each field is
    /// closed by an `Op("}")` so a chain never runs into the code after the string.
    fn replacement_fields(
        &mut self,
        body_start: usize,
        body_end: usize,
        mut line: usize,
    ) -> Result<(), BindingError> {
        let body = &self.chars[body_start..body_end];
        let mut fields = Vec::new();
        let mut i = 0;
        while i < body.len() {
            let c = body[i].1;
            match c {
                '\n' => {
                    line += 1;
                    i += 1;
                }
                '{' | '}' if body.get(i + 1).map(|&(_, n)| n) == Some(c) => i += 2,
                '{' => {
                    let len = field_expr_len(&body[i + 1..]);
                    let expr: String = body[i + 1..i + 1 + len].iter().map(|&(_, c)| c).collect();
                    let newlines = expr.matches('\n').count();
                    fields.push((expr, line));
                    line += newlines;
                    // Format spec text stays in this loop, so nested `{width}` fields are found too.
                    i += 1 + len;
                }
                _ => i += 1,
            }
        }

        for (expr, field_line) in fields {
            let shift = field_line - 1;
            let tokens = Scanner::new(&expr).run().map_err(|e| match e {
                BindingError::Parse { line, message } => BindingError::Parse {
                    line: line + shift,
                    message,
                },
            })?;
            self.out.extend(tokens.into_iter().map(|mut t| {
                t.line += shift;
                t
            }));
            self.out.push(Token {
                kind: TokenKind::Op,
                text: "}".into(),
                line: field_line,
            });
        }
        Ok(())
    }
}

// Length of a replacement field's expression: up to a top-level `}`, `:` or `!` (but not `!=`).
fn field_expr_len(chars: &[(usize, char)]) -> usize {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i].1;
        if let Some(q) = quote {
            if c == '\\' {
                i += 1;
            } else if c == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' if depth > 0 => depth -= 1,
            '}' | ':' if depth == 0 => return i,
            '!' if depth == 0 && chars.get(i + 1).map(|&(_, n)| n) != Some('=') => return i,
            _ => {}
        }
        i += 1;
    }
    chars.len()
}

fn is_string_prefix(word: &str) -> bool {
    matches!(
        word.to_ascii_lowercase().as_str(),
        "r" | "u" | "b" | "f" | "br" | "rb" | "fr" | "rf"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<(TokenKind, String)> {
        PythonScanner
            .parse(src)
            .unwrap()
            .tokens
            .into_iter()
            .map(|t| (t.kind, t.text))
            .collect()
    }

    #[test]
    fn comments_and_strings_hide_names() {
        let toks = kinds("x = 'Table1.data'  # Table1.data\n");
        assert_eq!(
            toks,
            vec![
                (TokenKind::Name, "x".into()),
                (TokenKind::Op, "=".into()),
                (
                    TokenKind::Str { literal: Some("Table1.data".into()) },
                    "'Table1.data'".into()
                ),
            ]
        );
    }

    #[test]
    fn prefixed_and_triple_quoted_strings() {
        let toks = kinds("f\"{a}\" + '''multi\nline''' + rb'\\x00'");
        let strs = toks
            .iter()
            .filter(|(k, _)| matches!(k, TokenKind::Str { .. }))
            .count();
        assert_eq!(strs, 3);
        let names: Vec<_> = toks
            .iter()
            .filter(|(k, _)| *k == TokenKind::Name)
            .map(|(_, t)| t.as_str())
            .collect();
        assert_eq!(names, vec!["a"]);
    }

    #[test]
    fn fstring_fields_are_scanned_with_their_lines() {
        let src = "x = 1\ns = f'''{{skip}} {a.b!r}\n{c[0]:>{width}}'''";
        let tree = PythonScanner.parse(src).unwrap();
        let names: Vec<_> = tree
            .tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Name)
            .map(|t| (t.text.as_str(), t.line))
            .collect();
        assert_eq!(
            names,
            vec![("x", 1), ("s", 2), ("a", 2), ("b", 2), ("c", 3), ("width", 3)]
        );
    }

    #[test]
    fn braces_in_plain_strings_stay_opaque() {
        assert_eq!(kinds("'{a}'").len(), 1);
    }

    #[test]
    fn tracks_line_numbers() {
        let tree = PythonScanner.parse("a\n\n'''x\ny'''\nb").unwrap();
        let lines: Vec<_> = tree.tokens.iter().map(|t| (t.text.as_str(), t.line)).collect();
        assert_eq!(lines, vec![("a", 1), ("'''x\ny'''", 3), ("b", 5)]);
    }

    #[test]
    fn unterminated_string_reports_its_line() {
        let err = PythonScanner.parse("ok = 1\nbad = 'oops\n").unwrap_err();
        assert_eq!(
            err,
            BindingError::Parse {
                line: 2,
                message: "unterminated string literal".into()
            }
        );
    }
}
