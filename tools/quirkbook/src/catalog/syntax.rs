use crate::sandbox::{Sandbox, Thrown};
use crate::snippet::{Expectation, Snippet};
use crate::types::ErrorKind;

pub(super) static SNIPPETS: &[Snippet] = &[Snippet {
    name: "syntax_invalid_assignment_target",
    topic: "syntax",
    summary: "new x = (1,2,3) is rejected before any statement runs",
    deterministic: true,
    body: syntax_invalid_assignment_target,
    expected: Expectation::Throws {
        kind: ErrorKind::SyntaxError,
        message: "Invalid left-hand side in assignment",
        transcript: &[],
    },
}];

const SOURCE: &[&str] = &["console.log('unreachable')", "new x = (1,2,3)"];

/// Early errors are reported for the whole file, so nothing logs.
fn syntax_invalid_assignment_target(sb: &mut Sandbox) -> Result<(), Thrown> {
    for statement in SOURCE {
        check_assignment(statement)?;
    }
    sb.log_str("unreachable")
}

/// Accepts `name = ...`, `a.b = ...` and `a[k] = ...`; anything else on the
/// left of a plain `=` is an early error.
fn check_assignment(statement: &str) -> Result<(), Thrown> {
    let Some((target, _)) = split_assignment(statement) else {
        return Ok(());
    };
    if is_reference(target.trim()) {
        return Ok(());
    }
    Err(Thrown::syntax_error("Invalid left-hand side in assignment"))
}

fn split_assignment(statement: &str) -> Option<(&str, &str)> {
    let bytes = statement.as_bytes();
    let mut depth = 0usize;
    for (i, b) in bytes.iter().enumerate() {
        match b {
            b'(' | b'[' => depth += 1,
            b')' | b']' => depth = depth.saturating_sub(1),
            b'=' if depth == 0 => {
                let prev = i.checked_sub(1).map(|p| bytes[p]);
                let next = bytes.get(i + 1).copied();
                let compound = matches!(prev, Some(b'=' | b'!' | b'<' | b'>'));
                if !compound && next != Some(b'=') && next != Some(b'>') {
                    return Some((&statement[..i], &statement[i + 1..]));
                }
            }
            _ => {}
        }
    }
    None
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        && !matches!(s, "new" | "this" | "typeof" | "void" | "delete")
}

fn is_reference(target: &str) -> bool {
    if is_identifier(target) {
        return true;
    }
    if let Some(open) = target.rfind('[') {
        return target.ends_with(']') && is_reference(&target[..open]);
    }
    match target.rsplit_once('.') {
        Some((object, property)) => {
            (is_reference(object) || object == "this") && is_identifier(property)
        }
        None => false,
    }
}
