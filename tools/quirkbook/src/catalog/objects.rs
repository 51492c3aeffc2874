use super::arg;
use crate::sandbox::env::Env;
use crate::sandbox::value::Value;
use crate::sandbox::{Sandbox, Thrown};
use crate::snippet::{Expectation, Snippet};

pub(super) static SNIPPETS: &[Snippet] = &[
    Snippet {
        name: "shallow_copy",
        topic: "objects",
        summary: "Object.assign copies the top level; nested objects stay shared",
        deterministic: true,
        body: shallow_copy,
        expected: Expectation::Transcript(&[
            "{ a: 'a', b: 'b', obj: { key: 'key' } }",
            "New Key",
            "a",
        ]),
    },
    Snippet {
        name: "deep_copy",
        topic: "objects",
        summary: "A recursive copy leaves no shared nested objects",
        deterministic: true,
        body: deep_copy,
        expected: Expectation::Transcript(&["{ a: 'a', b: 'b', obj: { key: 'key' } }", "key"]),
    },
    Snippet {
        name: "object_mutation",
        topic: "objects",
        summary: "Two names for one object see the same mutation",
        deterministic: true,
        body: object_mutation,
        expected: Expectation::Transcript(&["new a"]),
    },
    Snippet {
        name: "primitives_and_objects",
        topic: "objects",
        summary: "Object construction, numeric keys, nested and dynamic property access",
        deterministic: true,
        body: primitives_and_objects,
        expected: Expectation::Transcript(&[
            "Hi",
            "undefined",
            "One",
            "{ street: 'Main Street', number: 123 }",
            "Main Street",
            "123",
            "123",
        ]),
    },
    Snippet {
        name: "destructuring",
        topic: "objects",
        summary: "Array destructuring with holes and object destructuring",
        deterministic: true,
        body: destructuring,
        expected: Expectation::Transcript(&["1 2", "1 3", "Max"]),
    },
    Snippet {
        name: "spread_and_rest",
        topic: "objects",
        summary: "Spread flattens into arrays and objects; rest gathers arguments",
        deterministic: true,
        body: spread_and_rest,
        expected: Expectation::Transcript(&[
            "[ 1, 2, 3, 4 ]",
            "[ [ 1, 2, 3 ], 4 ]",
            "{ name: 'Max', age: 28 }",
            "{ person: { name: 'Max' }, age: 28 }",
            "[ 1 ]",
        ]),
    },
];

fn sample_object() -> Value {
    Value::object([
        ("a", Value::from("a")),
        ("b", Value::from("b")),
        ("obj", Value::object([("key", Value::from("key"))])),
    ])
}

/// `Object.assign(target, source)`
fn object_assign(sb: &mut Sandbox, target: &Value, source: &Value) -> Result<Value, Thrown> {
    let entries = source
        .as_object()
        .map(|object| object.borrow().entries())
        .unwrap_or_default();
    for (key, value) in entries {
        sb.set(target, &key, value)?;
    }
    Ok(target.clone())
}

/// `Object.keys(obj)`
fn object_keys(value: &Value) -> Value {
    let keys = value
        .as_object()
        .map(|object| object.borrow().keys())
        .unwrap_or_default();
    Value::array(keys.into_iter().map(Value::from).collect())
}

fn log_path(sb: &mut Sandbox, root: &Value, path: &[&str]) -> Result<(), Thrown> {
    let mut current = root.clone();
    for key in path {
        current = sb.get(&current, key)?;
    }
    sb.log(&[current])
}

fn shallow_copy(sb: &mut Sandbox) -> Result<(), Thrown> {
    let o = sample_object();
    let o2 = object_assign(sb, &Value::empty_object(), &o)?;
    sb.log(&[o2.clone()])?;

    let nested = sb.get(&o, "obj")?;
    sb.set(&nested, "key", Value::from("New Key"))?;
    log_path(sb, &o2, &["obj", "key"])?;

    sb.set(&o, "a", Value::from("changed"))?;
    log_path(sb, &o2, &["a"])
}

fn define_deep_copy(module: &Env) {
    let scope = module.clone();
    module.declare_function(
        "deepCopy",
        Value::function("deepCopy", move |sb, _, args| {
            let obj = arg(args, 0);
            let keys = object_keys(&obj);
            let new_object = Value::empty_object();
            let count = sb.get(&keys, "length")?.to_number() as usize;
            for i in 0..count {
                let key = sb.get(&keys, &i.to_string())?.to_js_string();
                let value = sb.get(&obj, &key)?;
                let copied = if value.type_of() == "object" {
                    scope.call(sb, "deepCopy", &[value])?
                } else {
                    value
                };
                sb.set(&new_object, &key, copied)?;
            }
            Ok(new_object)
        }),
    );
}

fn deep_copy(sb: &mut Sandbox) -> Result<(), Thrown> {
    let module = sb.global_env().child();
    define_deep_copy(&module);

    let o = sample_object();
    let o3 = module.call(sb, "deepCopy", &[o.clone()])?;
    sb.log(&[o3.clone()])?;

    let nested = sb.get(&o, "obj")?;
    sb.set(&nested, "key", Value::from("New Key"))?;
    log_path(sb, &o3, &["obj", "key"])
}

fn object_mutation(sb: &mut Sandbox) -> Result<(), Thrown> {
    let o = Value::object([("a", Value::from("a")), ("b", Value::from("b"))]);
    let o2 = o.clone();
    sb.set(&o, "a", Value::from("new a"))?;
    log_path(sb, &o2, &["a"])
}

fn greet() -> Value {
    Value::function("greet", |sb, _, _| {
        sb.log_str("Hi")?;
        Ok(Value::Undefined)
    })
}

fn primitives_and_objects(sb: &mut Sandbox) -> Result<(), Thrown> {
    let o = Value::empty_object();
    sb.set(&o, "firstName", Value::from("Harsh"))?;
    sb.set(&o, "lastName", Value::from("Sharma"))?;
    sb.set(&o, "greet", greet())?;

    let o3 = Value::object([
        ("firstName", Value::from("Harsh")),
        ("lastName", Value::from("Sharma")),
        ("isTeaching", Value::Bool(false)),
        ("greet", greet()),
        (
            "address",
            Value::object([
                ("street", Value::from("Main Street")),
                ("number", Value::from(123)),
            ]),
        ),
    ]);
    let greeted = sb.invoke(&o3, "greet", &[])?;
    sb.log(&[greeted])?;

    // Numeric keys are coerced to strings.
    let o4 = Value::object([(Value::from(1).to_js_string(), Value::from("One"))]);
    let one = sb.get(&o4, &Value::from(1).to_js_string())?;
    sb.log(&[one])?;

    log_path(sb, &o3, &["address"])?;
    log_path(sb, &o3, &["address", "street"])?;
    log_path(sb, &o3, &["address", "number"])?;
    let key = "number";
    log_path(sb, &o3, &["address", key])
}

fn destructuring(sb: &mut Sandbox) -> Result<(), Thrown> {
    let module = sb.global_env().child();
    let numbers = Value::array(vec![Value::from(1), Value::from(2), Value::from(3)]);
    module.define_const("numbers", numbers.clone());

    // [a, b] = numbers, with no declaration: both land on the global object.
    for (index, name) in ["a", "b"].into_iter().enumerate() {
        let element = sb.get(&numbers, &index.to_string())?;
        module.assign(name, element)?;
    }
    let (a, b) = (module.get("a")?, module.get("b")?);
    sb.log(&[a, b])?;

    // [num1, , num3] = numbers
    for (index, name) in [(0, "num1"), (2, "num3")] {
        let element = sb.get(&numbers, &index.to_string())?;
        module.assign(name, element)?;
    }
    let (num1, num3) = (module.get("num1")?, module.get("num3")?);
    sb.log(&[num1, num3])?;

    let person = Value::object([("name", Value::from("Max")), ("age", Value::from(28))]);
    let name = sb.get(&person, "name")?;
    module.define_const("name", name);
    let name = module.get("name")?;
    sb.log(&[name])
}

fn spread_and_rest(sb: &mut Sandbox) -> Result<(), Thrown> {
    let numbers = Value::array(vec![Value::from(1), Value::from(2), Value::from(3)]);

    let mut spread = numbers
        .as_array()
        .map(|items| items.borrow().clone())
        .unwrap_or_default();
    spread.push(Value::from(4));
    sb.log(&[Value::array(spread)])?;

    let without_dots = Value::array(vec![numbers.clone(), Value::from(4)]);
    sb.log(&[without_dots])?;

    let person = Value::object([("name", Value::from("Max"))]);
    let new_person = object_assign(sb, &Value::empty_object(), &person)?;
    sb.set(&new_person, "age", Value::from(28))?;
    sb.log(&[new_person])?;

    let new_person_without_dots = Value::object([("person", person), ("age", Value::from(28))]);
    sb.log(&[new_person_without_dots])?;

    let filter = Value::function("filter", |sb, _, args| {
        let rest = Value::array(args.to_vec());
        let is_one = Value::function("", |_, _, args| {
            Ok(Value::Bool(arg(args, 0).strict_eq(&Value::from(1))))
        });
        sb.invoke(&rest, "filter", &[is_one])
    });
    let filtered = sb.call_detached(
        &filter,
        &[Value::from(1), Value::from(2), Value::from(3)],
    )?;
    sb.log(&[filtered])
}
