use super::arg;
use crate::sandbox::env::Env;
use crate::sandbox::value::Value;
use crate::sandbox::{Sandbox, Thrown};
use crate::snippet::{Expectation, Snippet};

pub(super) static SNIPPETS: &[Snippet] = &[
    Snippet {
        name: "closure_var_loop",
        topic: "closures",
        summary: "Closures built in a var loop all share the one function-scoped i",
        deterministic: true,
        body: closure_var_loop,
        expected: Expectation::Transcript(&["5", "5"]),
    },
    Snippet {
        name: "closure_let_loop",
        topic: "closures",
        summary: "A let loop gives every iteration its own binding",
        deterministic: true,
        body: closure_let_loop,
        expected: Expectation::Transcript(&["0"]),
    },
    Snippet {
        name: "closure_iife_capture",
        topic: "closures",
        summary: "An IIFE parameter freezes the loop value for each closure",
        deterministic: true,
        body: closure_iife_capture,
        expected: Expectation::Transcript(&["0"]),
    },
    Snippet {
        name: "closure_counter",
        topic: "closures",
        summary: "Returned functions keep their defining scope alive",
        deterministic: true,
        body: closure_counter,
        expected: Expectation::Transcript(&["Peter", "0", "1", "2"]),
    },
    Snippet {
        name: "closure_hello",
        topic: "closures",
        summary: "A closure reads a variable the caller cannot see",
        deterministic: true,
        body: closure_hello,
        expected: Expectation::Transcript(&["typeof message:  undefined", "Hello!"]),
    },
    Snippet {
        name: "lexical_scope_chain",
        topic: "closures",
        summary: "Inner functions resolve names through every enclosing scope",
        deterministic: true,
        body: lexical_scope_chain,
        expected: Expectation::Transcript(&["Global", "Outer", "Inner", "Outer", "Global", "Global"]),
    },
    Snippet {
        name: "iife_module_counter",
        topic: "closures",
        summary: "An IIFE hides state behind the functions it returns",
        deterministic: true,
        body: iife_module_counter,
        expected: Expectation::Transcript(&["typeof message: undefined", "Hello!", "0", "1"]),
    },
];

fn log_binding(sb: &mut Sandbox, scope: &Env, name: &str) -> Result<(), Thrown> {
    let value = scope.get(name)?;
    sb.log(&[value])
}

fn closure_var_loop(sb: &mut Sandbox) -> Result<(), Thrown> {
    let module = sb.global_env().child();
    let outer = module.clone();
    module.declare_function(
        "makeFunctionArray",
        Value::function("makeFunctionArray", move |sb, _, _| {
            let scope = outer.child();
            scope.declare_var("i");
            scope.define_const("arr", Value::array(Vec::new()));

            scope.assign("i", Value::from(0))?;
            while scope.get("i")?.to_number() < 5.0 {
                let captured = scope.clone();
                let log_i = Value::function("", move |sb, _, _| {
                    log_binding(sb, &captured, "i")?;
                    Ok(Value::Undefined)
                });
                sb.invoke(&scope.get("arr")?, "push", &[log_i])?;
                let next = scope.get("i")?.to_number() + 1.0;
                scope.assign("i", Value::from(next))?;
            }
            log_binding(sb, &scope, "i")?;
            scope.get("arr")
        }),
    );

    let arr = module.call(sb, "makeFunctionArray", &[])?;
    module.define_const("arr", arr);
    let first = sb.get(&module.get("arr")?, "0")?;
    sb.call_detached(&first, &[])?;
    Ok(())
}

fn closure_let_loop(sb: &mut Sandbox) -> Result<(), Thrown> {
    let module = sb.global_env().child();
    let outer = module.clone();
    module.declare_function(
        "makeFunctionArray",
        Value::function("makeFunctionArray", move |sb, _, _| {
            let scope = outer.child();
            scope.define_const("arr", Value::array(Vec::new()));

            let mut next = 0.0;
            while next < 5.0 {
                let iteration = scope.child();
                iteration.define_let("i", Value::from(next));
                let captured = iteration.clone();
                let log_i = Value::function("", move |sb, _, _| {
                    log_binding(sb, &captured, "i")?;
                    Ok(Value::Undefined)
                });
                sb.invoke(&scope.get("arr")?, "push", &[log_i])?;
                next = iteration.get("i")?.to_number() + 1.0;
            }
            scope.get("arr")
        }),
    );

    let arr = module.call(sb, "makeFunctionArray", &[])?;
    let first = sb.get(&arr, "0")?;
    sb.call_detached(&first, &[])?;
    Ok(())
}

fn closure_iife_capture(sb: &mut Sandbox) -> Result<(), Thrown> {
    let module = sb.global_env().child();
    let outer = module.clone();
    module.declare_function(
        "makeFunctionArray",
        Value::function("makeFunctionArray", move |sb, _, _| {
            let scope = outer.child();
            scope.declare_var("i");
            scope.define_const("arr", Value::array(Vec::new()));

            scope.assign("i", Value::from(0))?;
            while scope.get("i")?.to_number() < 5.0 {
                let enclosing = scope.clone();
                let iife = Value::function("", move |_, _, args| {
                    let frame = enclosing.child();
                    frame.define_var("x", arg(args, 0));
                    Ok(Value::function("", move |sb, _, _| {
                        log_binding(sb, &frame, "x")?;
                        Ok(Value::Undefined)
                    }))
                });
                let i = scope.get("i")?;
                let log_x = sb.call_detached(&iife, &[i])?;
                sb.invoke(&scope.get("arr")?, "push", &[log_x])?;
                let next = scope.get("i")?.to_number() + 1.0;
                scope.assign("i", Value::from(next))?;
            }
            scope.get("arr")
        }),
    );

    let function_arr = module.call(sb, "makeFunctionArray", &[])?;
    let first = sb.get(&function_arr, "0")?;
    sb.call_detached(&first, &[])?;
    Ok(())
}

fn closure_counter(sb: &mut Sandbox) -> Result<(), Thrown> {
    let module = sb.global_env().child();

    let person_scope = module.clone();
    module.declare_function(
        "person",
        Value::function("person", move |_, _, _| {
            let scope = person_scope.child();
            scope.define_let("name", Value::from("Peter"));
            Ok(Value::function("displayName", move |sb, _, _| {
                log_binding(sb, &scope, "name")?;
                Ok(Value::Undefined)
            }))
        }),
    );
    let peter = module.call(sb, "person", &[])?;
    module.define_let("peter", peter);
    module.call(sb, "peter", &[])?;

    let counter_scope = module.clone();
    module.declare_function(
        "getCounter",
        Value::function("getCounter", move |_, _, _| {
            let scope = counter_scope.child();
            scope.define_let("counter", Value::from(0));
            Ok(Value::function("", move |_, _, _| {
                let current = scope.get("counter")?;
                scope.assign("counter", Value::from(current.to_number() + 1.0))?;
                Ok(current)
            }))
        }),
    );
    let count = module.call(sb, "getCounter", &[])?;
    module.define_let("count", count);
    for _ in 0..3 {
        let value = module.call(sb, "count", &[])?;
        sb.log(&[value])?;
    }
    Ok(())
}

fn closure_hello(sb: &mut Sandbox) -> Result<(), Thrown> {
    let module = sb.global_env().child();
    let outer = module.clone();
    module.declare_function(
        "makeHelloFunction",
        Value::function("makeHelloFunction", move |_, _, _| {
            let scope = outer.child();
            scope.define_const("message", Value::from("Hello!"));
            let captured = scope.clone();
            scope.declare_function(
                "sayHello",
                Value::function("sayHello", move |sb, _, _| {
                    log_binding(sb, &captured, "message")?;
                    Ok(Value::Undefined)
                }),
            );
            scope.get("sayHello")
        }),
    );

    let say_hello = module.call(sb, "makeHelloFunction", &[])?;
    module.define_const("sayHello", say_hello);
    let type_of = module.type_of("message")?;
    sb.log(&[Value::from("typeof message: "), Value::from(type_of)])?;
    module.call(sb, "sayHello", &[])?;
    Ok(())
}

fn lexical_scope_chain(sb: &mut Sandbox) -> Result<(), Thrown> {
    let module = sb.global_env().child();
    module.define_let("a", Value::from("Global"));

    let outer_scope = module.clone();
    module.declare_function(
        "outer",
        Value::function("outer", move |sb, _, _| {
            let scope = outer_scope.child();
            scope.define_let("b", Value::from("Outer"));
            let inner_scope = scope.clone();
            scope.declare_function(
                "inner",
                Value::function("inner", move |sb, _, _| {
                    let scope = inner_scope.child();
                    scope.define_let("c", Value::from("Inner"));
                    log_binding(sb, &scope, "c")?;
                    log_binding(sb, &scope, "b")?;
                    log_binding(sb, &scope, "a")?;
                    Ok(Value::Undefined)
                }),
            );
            log_binding(sb, &scope, "a")?;
            log_binding(sb, &scope, "b")?;
            scope.call(sb, "inner", &[])?;
            Ok(Value::Undefined)
        }),
    );

    module.call(sb, "outer", &[])?;
    log_binding(sb, &module, "a")
}

fn iife_module_counter(sb: &mut Sandbox) -> Result<(), Thrown> {
    let module = sb.global_env().child();

    let hello_scope = module.clone();
    let make_hello = Value::function("", move |_, _, _| {
        let scope = hello_scope.child();
        scope.define_var("message", Value::from("Hello!"));
        let captured = scope.clone();
        Ok(Value::function("sayHello", move |sb, _, _| {
            log_binding(sb, &captured, "message")?;
            Ok(Value::Undefined)
        }))
    });
    let say_hello = sb.call_detached(&make_hello, &[])?;
    module.define_const("sayHello", say_hello);
    let type_of = module.type_of("message")?;
    sb.log(&[Value::from("typeof message:"), Value::from(type_of)])?;
    module.call(sb, "sayHello", &[])?;

    let counter_scope = module.clone();
    let make_counter = Value::function("", move |_, _, _| {
        let scope = counter_scope.child();
        scope.define_let("count", Value::from(0));
        let inc_scope = scope.clone();
        let get_scope = scope.clone();
        Ok(Value::object([
            (
                "inc",
                Value::function("inc", move |_, _, _| {
                    let next = inc_scope.get("count")?.to_number() + 1.0;
                    inc_scope.assign("count", Value::from(next))?;
                    Ok(Value::Undefined)
                }),
            ),
            (
                "get",
                Value::function("get", move |sb, _, _| {
                    log_binding(sb, &get_scope, "count")?;
                    Ok(Value::Undefined)
                }),
            ),
        ]))
    });
    let counter = sb.call_detached(&make_counter, &[])?;
    sb.invoke(&counter, "get", &[])?;
    sb.invoke(&counter, "inc", &[])?;
    sb.invoke(&counter, "get", &[])?;
    Ok(())
}
