use super::sloppy_this;
use crate::sandbox::value::Value;
use crate::sandbox::{Sandbox, Thrown};
use crate::snippet::{Expectation, Snippet};
use crate::types::ErrorKind;

pub(super) static SNIPPETS: &[Snippet] = &[
    Snippet {
        name: "this_method_binding",
        topic: "this",
        summary: "this follows the call site; bind pins it explicitly",
        deterministic: true,
        body: this_method_binding,
        expected: Expectation::Transcript(&["Jordan", "undefined", "this is a bound object"]),
    },
    Snippet {
        name: "this_top_level",
        topic: "this",
        summary: "At module top level this is undefined, so this.name throws",
        deterministic: true,
        body: this_top_level,
        expected: Expectation::Throws {
            kind: ErrorKind::TypeError,
            message: "Cannot read properties of undefined (reading 'name')",
            transcript: &["undefined"],
        },
    },
    Snippet {
        name: "iife_global_leak",
        topic: "this",
        summary: "var a = b = 3 leaks b onto the global object",
        deterministic: true,
        body: iife_global_leak,
        expected: Expectation::Transcript(&["undefined", "3", "3", "3"]),
    },
];

fn this_method_binding(sb: &mut Sandbox) -> Result<(), Thrown> {
    let module = sb.global_env().child();
    let greet = Value::function("greet", |sb, this, _| {
        let receiver = sloppy_this(sb, this);
        let name = sb.get(&receiver, "name")?;
        sb.log(&[name])?;
        Ok(Value::Undefined)
    });
    let person = Value::object([("name", Value::from("Jordan")), ("greet", greet)]);
    module.define_const("person", person.clone());

    sb.invoke(&person, "greet", &[])?;

    let detached = sb.get(&person, "greet")?;
    module.define_const("greet", detached);
    module.call(sb, "greet", &[])?;

    let friend = Value::object([("name", Value::from("David"))]);
    module.define_const("friend", friend.clone());
    let bound = match sb.get(&person, "greet")? {
        Value::Function(function) => Value::Function(
            function.bind(Value::object([("name", Value::from("this is a bound object"))])),
        ),
        other => other,
    };
    sb.set(&friend, "greet", bound)?;
    sb.invoke(&friend, "greet", &[])?;
    Ok(())
}

fn this_top_level(sb: &mut Sandbox) -> Result<(), Thrown> {
    let this = Value::Undefined;
    sb.log(&[this.clone()])?;
    let name = sb.get(&this, "name")?;
    sb.log(&[name])
}

fn iife_global_leak(sb: &mut Sandbox) -> Result<(), Thrown> {
    let module = sb.global_env().child();

    // var a = b = 3: assigns the undeclared b first, then declares a locally.
    let outer = module.clone();
    let leak = Value::function("", move |_, _, _| {
        let scope = outer.child();
        scope.declare_var("a");
        scope.assign("b", Value::from(3))?;
        let b = scope.get("b")?;
        scope.assign("a", b)?;
        Ok(Value::Undefined)
    });
    sb.call_detached(&leak, &[])?;
    let type_of_a = module.type_of("a")?;
    sb.log_str(type_of_a)?;
    let b = module.get("b")?;
    sb.log(&[b])?;

    let outer = module.clone();
    let both = Value::function("", move |sb, _, _| {
        let scope = outer.child();
        scope.declare_var("a");
        scope.assign("b", Value::from(3))?;
        let b = scope.get("b")?;
        scope.assign("a", b)?;
        let a = scope.get("a")?;
        sb.log(&[a])?;
        let b = scope.get("b")?;
        sb.log(&[b])?;
        Ok(Value::Undefined)
    });
    sb.call_detached(&both, &[])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::sandbox::tests::sandbox;

    #[test]
    fn leaked_global_is_a_property_of_the_global_object() {
        let mut sb = sandbox();
        super::iife_global_leak(&mut sb).expect("run");
        let global = sb.global_this();
        let b = sb.get(&global, "b").expect("b");
        assert_eq!(b.to_display(), "3");
        assert_eq!(sb.get(&global, "a").expect("a").to_display(), "undefined");
    }
}
