use super::{arg, console_log};
use crate::sandbox::value::Value;
use crate::sandbox::{Sandbox, Thrown};
use crate::snippet::{Expectation, Snippet};

pub(super) static SNIPPETS: &[Snippet] = &[
    Snippet {
        name: "timer_ordering",
        topic: "timers",
        summary: "Synchronous code runs first; zero-delay timers fire in registration order",
        deterministic: true,
        body: timer_ordering,
        expected: Expectation::Transcript(&["Three", "Two", "Four", "Five", "One"]),
    },
    Snippet {
        name: "callbacks_deferred",
        topic: "timers",
        summary: "A callback passed to setTimeout runs after the delay, not before",
        deterministic: true,
        body: callbacks_deferred,
        expected: Expectation::Transcript(&[
            "1",
            "1",
            "This message is shown after 3 seconds.",
            "This message is shown after 3 seconds.",
            "This message is shown after 3 seconds.",
        ]),
    },
    Snippet {
        name: "busy_wait_hang",
        topic: "timers",
        summary: "A busy-wait on Date.now() blocks the single thread",
        deterministic: false,
        body: busy_wait_hang,
        expected: Expectation::Hang,
    },
];

fn timer_ordering(sb: &mut Sandbox) -> Result<(), Thrown> {
    let module = sb.global_env().child();
    for (name, line) in [
        ("printOne", "One"),
        ("printTwo", "Two"),
        ("printThree", "Three"),
        ("printFour", "Four"),
        ("printFive", "Five"),
    ] {
        module.declare_function(
            name,
            Value::function(name, move |sb, _, _| {
                sb.log_str(line)?;
                Ok(Value::Undefined)
            }),
        );
    }

    sb.schedule_call(module.get("printOne")?, 1000, Vec::new());
    sb.schedule_call(module.get("printTwo")?, 0, Vec::new());
    module.call(sb, "printThree", &[])?;
    sb.schedule_call(module.get("printFour")?, 0, Vec::new());
    sb.schedule_call(module.get("printFive")?, 0, Vec::new());
    Ok(())
}

fn callbacks_deferred(sb: &mut Sandbox) -> Result<(), Thrown> {
    let module = sb.global_env().child();
    module.declare_function(
        "doSomething",
        Value::function("doSomething", |sb, _, args| {
            sb.call_detached(&arg(args, 0), &[Value::from(1)])?;
            Ok(Value::Undefined)
        }),
    );
    module.declare_function(
        "doSomethingAsync",
        Value::function("doSomethingAsync", |sb, _, args| {
            let callback = arg(args, 0);
            sb.set_timeout(1000, move |sb| {
                sb.call_detached(&callback, &[Value::from(1)])?;
                Ok(())
            });
            Ok(Value::Undefined)
        }),
    );

    module.call(sb, "doSomething", &[console_log()])?;
    module.call(sb, "doSomethingAsync", &[console_log()])?;

    let message = Value::function("message", |sb, _, _| {
        sb.log_str("This message is shown after 3 seconds.")?;
        Ok(Value::Undefined)
    });
    module.define_const("message", message);
    sb.schedule_call(module.get("message")?, 3000, Vec::new());

    let anonymous = Value::function("", |sb, _, _| {
        sb.log_str("This message is shown after 3 seconds.")?;
        Ok(Value::Undefined)
    });
    sb.schedule_call(anonymous, 3000, Vec::new());
    let arrow = Value::function("", |sb, _, _| {
        sb.log_str("This message is shown after 3 seconds.")?;
        Ok(Value::Undefined)
    });
    sb.schedule_call(arrow, 3000, Vec::new());
    Ok(())
}

fn busy_wait_hang(sb: &mut Sandbox) -> Result<(), Thrown> {
    let hang = Value::function("hang", |sb, _, args| {
        let secs = arg(args, 0).to_number();
        let done_at = sb.date_now()? + secs * 1000.0;
        while sb.date_now()? < done_at {}
        Ok(Value::Undefined)
    });
    sb.call_detached(&hang, &[Value::from(10)])?;
    Ok(())
}
