//! Binding-pair extraction: finds `Entity.member[...]` chains in Python source
//! and resolves them against a data context without running the code.

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::{context::EvaluationPair, error::BindingError};

pub mod scanner;

pub use scanner::{PythonScanner, SourceParser, SyntaxTree, Token, TokenKind};

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Attr(String),
    Index(usize),
    Key(String),
}

/// Each distinct chain rooted at one of `entities` is reported once, in order of
/// first appearance. Segments missing from `data_context` resolve to `null`.
pub fn extract_python_evaluation_pairs(
    code: &str,
    entities: &HashSet<String>,
    data_context: &Map<String, Value>,
    parser: &dyn SourceParser,
) -> Result<Vec<EvaluationPair>, BindingError> {
    let tree = parser.parse(code)?;
    let tokens = &tree.tokens;

    let mut seen = HashSet::new();
    let mut pairs = Vec::new();
    for (i, tok) in tokens.iter().enumerate() {
        if tok.kind != TokenKind::Name || !entities.contains(&tok.text) {
            continue;
        }
        if i > 0 && tokens[i - 1].kind == TokenKind::Dot {
            continue;
        }
        let (expression, segments) = read_chain(tokens, i);
        if !seen.insert(expression.clone()) {
            continue;
        }
        let value = resolve(data_context.get(&tok.text), &segments);
        pairs.push(EvaluationPair { expression, value });
    }
    Ok(pairs)
}

fn read_chain(tokens: &[Token], root: usize) -> (String, Vec<Segment>) {
    let mut expr = tokens[root].text.clone();
    let mut segments = Vec::new();
    let mut j = root + 1;

    loop {
        match (tokens.get(j), tokens.get(j + 1), tokens.get(j + 2)) {
            (Some(dot), Some(name), next) if dot.kind == TokenKind::Dot && name.kind == TokenKind::Name => {
                // A trailing method call is not part of the value.
                if matches!(next, Some(t) if t.kind == TokenKind::LParen) {
                    break;
                }
                expr.push('.');
                expr.push_str(&name.text);
                segments.push(Segment::Attr(name.text.clone()));
                j += 2;
            }
            (Some(open), Some(inner), Some(close))
                if open.kind == TokenKind::LBracket && close.kind == TokenKind::RBracket =>
            {
                let segment = match &inner.kind {
                    TokenKind::Number => match inner.text.parse::<usize>() {
                        Ok(n) => Segment::Index(n),
                        Err(_) => break,
                    },
                    TokenKind::Str { literal: Some(key) } => Segment::Key(key.clone()),
                    _ => break,
                };
                expr.push('[');
                expr.push_str(&inner.text);
                expr.push(']');
                segments.push(segment);
                j += 3;
            }
            _ => break,
        }
    }
    (expr, segments)
}

fn resolve(root: Option<&Value>, segments: &[Segment]) -> Value {
    let mut cur = match root {
        Some(v) => v,
        None => return Value::Null,
    };
    for seg in segments {
        let next = match (seg, cur) {
            (Segment::Attr(k) | Segment::Key(k), Value::Object(obj)) => obj.get(k),
            (Segment::Index(i), Value::Array(items)) => items.get(*i),
            (Segment::Index(i), Value::Object(obj)) => obj.get(&i.to_string()),
            _ => None,
        };
        match next {
            Some(v) => cur = v,
            None => return Value::Null,
        }
    }
    cur.clone()
}
