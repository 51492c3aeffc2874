use super::arg;
use crate::sandbox::promise::Promise;
use crate::sandbox::value::Value;
use crate::sandbox::{Sandbox, Thrown};
use crate::snippet::{Expectation, Snippet};

pub(super) static SNIPPETS: &[Snippet] = &[
    Snippet {
        name: "promise_resolve_first_wins",
        topic: "promises",
        summary: "Once resolved, a later reject is ignored",
        deterministic: true,
        body: promise_resolve_first_wins,
        expected: Expectation::Transcript(&["2"]),
    },
    Snippet {
        name: "promise_random_settlement",
        topic: "promises",
        summary: "A promise kept or broken at random; then or catch handles it",
        deterministic: false,
        body: promise_random_settlement,
        expected: Expectation::OneOf(&[&["done"], &["Error: ..."]]),
    },
    Snippet {
        name: "promise_pending_then_resolved",
        topic: "promises",
        summary: "A promise logs as pending until its timer settles it",
        deterministic: true,
        body: promise_pending_then_resolved,
        expected: Expectation::Transcript(&["Promise { <pending> }", "Promise resolved"]),
    },
    Snippet {
        name: "async_without_await",
        topic: "promises",
        summary: "An async body with no await runs to completion before the caller continues",
        deterministic: true,
        body: async_without_await,
        expected: Expectation::Transcript(&[
            "async body start",
            "async body end",
            "after call",
            "then: done",
            "timer",
        ]),
    },
    Snippet {
        name: "promise_sequence_vs_all",
        topic: "promises",
        summary: "Awaiting in sequence takes the sum of delays; Promise.all takes the max",
        deterministic: true,
        body: promise_sequence_vs_all,
        expected: Expectation::Transcript(&["all: done", "sequence: done"]),
    },
];

fn promise_resolve_first_wins(sb: &mut Sandbox) -> Result<(), Thrown> {
    let func = Value::function("func", |sb, _, args| {
        let x = arg(args, 0).to_number();
        let promise = Promise::pending();
        // The executor overwrites y with x, then attempts both settlements.
        let y = x;
        if x / y == y / x {
            promise.resolve(sb, Value::from(x + y));
        }
        promise.reject(sb, Value::from("error"));

        promise.then_or_else(
            sb,
            |sb, success| {
                sb.log(&[success])?;
                Ok(Value::Undefined)
            },
            |sb, error| {
                sb.log(&[error])?;
                Ok(Value::Undefined)
            },
        );
        Ok(Value::Undefined)
    });
    sb.call_detached(&func, &[Value::from(1), Value::from(0)])?;
    Ok(())
}

fn promise_random_settlement(sb: &mut Sandbox) -> Result<(), Thrown> {
    let promise_kept = sb.random()? < 0.5;
    let promise = Promise::pending();
    if promise_kept {
        promise.resolve(sb, Value::from("done"));
    } else {
        promise.reject(sb, Value::Error(Thrown::other("...")));
    }
    promise
        .then(sb, |sb, ok| {
            sb.log(&[ok])?;
            Ok(Value::Undefined)
        })
        .catch(sb, |sb, err| {
            sb.log(&[err])?;
            Ok(Value::Undefined)
        });
    Ok(())
}

fn promise_pending_then_resolved(sb: &mut Sandbox) -> Result<(), Thrown> {
    let promises = Promise::pending();
    let executor_target = promises.clone();
    sb.set_timeout(2000, move |sb| {
        sb.log_str("Promise resolved")?;
        executor_target.resolve(sb, Value::Undefined);
        Ok(())
    });
    sb.log_str(&promises.describe())
}

fn promise_sequence_vs_all(sb: &mut Sandbox) -> Result<(), Thrown> {
    let sequence = sb
        .delay(50, Value::Undefined)
        .then_promise(sb, |sb, _| Ok(sb.delay(50, Value::Undefined)))
        .then(sb, |_, _| Ok(Value::from("done")));
    sequence.then(sb, |sb, result| {
        sb.log(&[Value::from("sequence:"), result])?;
        Ok(Value::Undefined)
    });

    let first = sb.delay(50, Value::Undefined);
    let second = sb.delay(50, Value::Undefined);
    Promise::all(sb, vec![first, second])
        .then(sb, |_, _| Ok(Value::from("done")))
        .then(sb, |sb, result| {
            sb.log(&[Value::from("all:"), result])?;
            Ok(Value::Undefined)
        });
    Ok(())
}

fn async_without_await(sb: &mut Sandbox) -> Result<(), Thrown> {
    sb.set_timeout(0, |sb| sb.log_str("timer"));

    let pending = sb.run_async(|sb| {
        sb.log_str("async body start")?;
        sb.log_str("async body end")?;
        Ok(Value::from("done"))
    })?;
    pending.then(sb, |sb, value| {
        sb.log(&[Value::from("then:"), value])?;
        Ok(Value::Undefined)
    });
    sb.log_str("after call")
}
