//! Every registered snippet, compiled in and grouped by topic.

mod binding;
mod closures;
mod equality;
mod functions;
mod hoisting;
mod login;
mod objects;
mod promises;
mod prototypes;
mod syntax;
mod timers;

use crate::errors::RunnerError;
use crate::sandbox::value::Value;
use crate::sandbox::Sandbox;
use crate::snippet::Snippet;

/// All snippets in catalog order.
pub fn catalog() -> Vec<&'static Snippet> {
    [
        timers::SNIPPETS,
        closures::SNIPPETS,
        hoisting::SNIPPETS,
        binding::SNIPPETS,
        promises::SNIPPETS,
        objects::SNIPPETS,
        equality::SNIPPETS,
        prototypes::SNIPPETS,
        functions::SNIPPETS,
        login::SNIPPETS,
        syntax::SNIPPETS,
    ]
    .into_iter()
    .flatten()
    .collect()
}

pub fn find(name: &str) -> Result<&'static Snippet, RunnerError> {
    catalog()
        .into_iter()
        .find(|snippet| snippet.name == name)
        .ok_or_else(|| RunnerError::UnknownSnippet(name.to_string()))
}

fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or(Value::Undefined)
}

/// `console.log` as a first-class function value.
fn console_log() -> Value {
    Value::function("log", |sb, _, args| {
        sb.log(args)?;
        Ok(Value::Undefined)
    })
}

/// Receiver of a sloppy-mode function: a missing `this` becomes the global
/// object.
fn sloppy_this(sb: &Sandbox, this: &Value) -> Value {
    match this {
        Value::Undefined | Value::Null => sb.global_this(),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::{catalog, find};
    use crate::errors::RunnerError;
    use std::collections::HashSet;

    #[test]
    fn names_are_unique() {
        let all = catalog();
        let names: HashSet<_> = all.iter().map(|snippet| snippet.name).collect();
        assert_eq!(names.len(), all.len());
    }

    #[test]
    fn every_topic_is_populated() {
        let topics: HashSet<_> = catalog().iter().map(|snippet| snippet.topic).collect();
        for topic in [
            "timers",
            "closures",
            "hoisting",
            "this",
            "promises",
            "objects",
            "equality",
            "prototypes",
            "functions",
            "async",
            "syntax",
        ] {
            assert!(topics.contains(topic), "missing topic {topic}");
        }
    }

    #[test]
    fn find_reports_unknown_names() {
        assert_eq!(find("timer_ordering").expect("known").topic, "timers");
        let err = find("no_such_snippet").expect_err("unknown");
        assert!(matches!(err, RunnerError::UnknownSnippet(name) if name == "no_such_snippet"));
    }
}
