use super::{arg, console_log};
use crate::sandbox::env::Env;
use crate::sandbox::value::Value;
use crate::sandbox::{Sandbox, Thrown};
use crate::snippet::{Expectation, Snippet};

pub(super) static SNIPPETS: &[Snippet] = &[
    Snippet {
        name: "first_class_functions",
        topic: "functions",
        summary: "Functions passed to map, filter and reduce like any other value",
        deterministic: true,
        body: first_class_functions,
        expected: Expectation::Transcript(&["2", "[ 1, 2, 3, 4 ]", "true", "false", "[ 2, 3 ]", "3", "6"]),
    },
    Snippet {
        name: "higher_order_map",
        topic: "functions",
        summary: "A hand-written map built on forEach",
        deterministic: true,
        body: higher_order_map,
        expected: Expectation::Transcript(&["[ 1, 2, 3, 4 ]"]),
    },
    Snippet {
        name: "arrow_functions",
        topic: "functions",
        summary: "Arrow function parameter and body shorthands",
        deterministic: true,
        body: arrow_functions,
        expected: Expectation::Transcript(&["Max", "Harsh", "Harsh", "Harsh", "Harsh 32", "4", "4"]),
    },
    Snippet {
        name: "map_vs_foreach",
        topic: "functions",
        summary: "forEach mutates in place and returns nothing; map builds a new array",
        deterministic: true,
        body: map_vs_foreach,
        expected: Expectation::Transcript(&[
            "[ 2, 4, 6, 8, 10 ]",
            "[ 4, 8, 12, 16, 20 ]",
            "a",
            "b",
            "c",
            "d",
            "[ 6, 8 ]",
        ]),
    },
    Snippet {
        name: "index_of_dedupe",
        topic: "functions",
        summary: "indexOf finds the first occurrence, which is how filter drops repeats",
        deterministic: true,
        body: index_of_dedupe,
        expected: Expectation::Transcript(&[
            "indexOf 0 value g index 0",
            "indexOf 1 value o index 1",
            "indexOf 1 value o index 2",
            "indexOf 0 value g index 3",
            "indexOf 4 value l index 4",
            "indexOf 5 value e index 5",
        ]),
    },
    Snippet {
        name: "remove_duplicates",
        topic: "functions",
        summary: "Six ways to drop duplicates from an array",
        deterministic: true,
        body: remove_duplicates,
        expected: Expectation::Transcript(&[
            "[ 1, 2, 3, 4, 5 ]",
            "[ 1, 2 ]",
            "[ 1, 2, 3, 4, 5 ]",
            "[ 1, 2, 3, 4, 5 ]",
            "[ 1, 2, 3, 4, 5 ]",
            "[ 1, 2, 3, 4, 5 ]",
            r#"[{"name":"Jayant","age":25},{"name":"Sandy","age":25},{"name":"Shiva","age":25}]"#,
        ]),
    },
];

fn numbers(values: &[i32]) -> Value {
    Value::array(values.iter().copied().map(Value::from).collect())
}

fn add_one() -> Value {
    Value::function("addOne", |_, _, args| {
        Ok(Value::from(arg(args, 0).to_number() + 1.0))
    })
}

fn first_class_functions(sb: &mut Sandbox) -> Result<(), Thrown> {
    let module = sb.global_env().child();
    module.define_const("x", numbers(&[0, 1, 2, 3]));
    module.declare_function("addOne", add_one());
    module.declare_function(
        "isGreaterThanOne",
        Value::function("isGreaterThanOne", |_, _, args| {
            Ok(Value::Bool(arg(args, 0).to_number() > 1.0))
        }),
    );
    module.declare_function(
        "add",
        Value::function("add", |_, _, args| {
            Ok(Value::from(arg(args, 0).to_number() + arg(args, 1).to_number()))
        }),
    );
    let x = module.get("x")?;

    let two = module.call(sb, "addOne", &[Value::from(1)])?;
    sb.log(&[two])?;
    let mapped = sb.invoke(&x, "map", &[module.get("addOne")?])?;
    sb.log(&[mapped])?;

    for candidate in [100, 1] {
        let verdict = module.call(sb, "isGreaterThanOne", &[Value::from(candidate)])?;
        sb.log(&[verdict])?;
    }
    let filtered = sb.invoke(&x, "filter", &[module.get("isGreaterThanOne")?])?;
    sb.log(&[filtered])?;

    let three = module.call(sb, "add", &[Value::from(1), Value::from(2)])?;
    sb.log(&[three])?;
    let total = sb.invoke(&x, "reduce", &[module.get("add")?])?;
    sb.log(&[total])
}

fn define_map(module: &Env) {
    module.declare_function(
        "map",
        Value::function("map", |sb, _, args| {
            let (arr, callback) = (arg(args, 0), arg(args, 1));
            let new_arr = Value::array(Vec::new());
            let target = new_arr.clone();
            let push_mapped = Value::function("", move |sb, _, args| {
                let mapped = sb.call(&callback, &Value::Undefined, &[arg(args, 0)])?;
                sb.invoke(&target, "push", &[mapped])
            });
            sb.invoke(&arr, "forEach", &[push_mapped])?;
            Ok(new_arr)
        }),
    );
}

fn higher_order_map(sb: &mut Sandbox) -> Result<(), Thrown> {
    let module = sb.global_env().child();
    define_map(&module);
    module.declare_function("addOne", add_one());
    module.define_const("x", numbers(&[0, 1, 2, 3]));

    let mapped = module.call(sb, "map", &[module.get("x")?, module.get("addOne")?])?;
    sb.log(&[mapped])
}

fn arrow_functions(sb: &mut Sandbox) -> Result<(), Thrown> {
    let module = sb.global_env().child();
    let log = console_log();
    let print = Value::function("printMyName", move |sb, _, args| {
        sb.call(&log, &Value::Undefined, &[arg(args, 0)])
    });
    module.declare_function("printMyName", print.clone());
    module.call(sb, "printMyName", &[Value::from("Max")])?;

    for name in ["arrowMyName", "arrowMyNameOneParam"] {
        module.define_const(name, print.clone());
        module.call(sb, name, &[Value::from("Harsh")])?;
    }
    module.define_const(
        "arrowMyNameNoParam",
        Value::function("arrowMyNameNoParam", |sb, _, _| {
            sb.log_str("Harsh")?;
            Ok(Value::Undefined)
        }),
    );
    module.call(sb, "arrowMyNameNoParam", &[])?;
    module.define_const(
        "arrowMyNameMoreParam",
        Value::function("arrowMyNameMoreParam", |sb, _, args| {
            sb.log(&[arg(args, 0), arg(args, 1)])?;
            Ok(Value::Undefined)
        }),
    );
    module.call(sb, "arrowMyNameMoreParam", &[Value::from("Harsh"), Value::from(32)])?;

    let double = |_: &mut Sandbox, _: &Value, args: &[Value]| -> Result<Value, Thrown> {
        Ok(Value::from(arg(args, 0).to_number() * 2.0))
    };
    module.define_const("multiply", Value::function("multiply", double));
    module.define_const("multiplyNew", Value::function("multiplyNew", double));
    // Both lines call multiply; multiplyNew is declared and never used.
    for _ in 0..2 {
        let four = module.call(sb, "multiply", &[Value::from(2)])?;
        sb.log(&[four])?;
    }
    Ok(())
}

fn map_vs_foreach(sb: &mut Sandbox) -> Result<(), Thrown> {
    let arr = numbers(&[1, 2, 3, 4, 5]);
    let target = arr.clone();
    let double_in_place = Value::function("", move |sb, _, args| {
        let doubled = Value::from(arg(args, 0).to_number() * 2.0);
        sb.set(&target, &arg(args, 1).to_js_string(), doubled.clone())?;
        Ok(doubled)
    });
    sb.invoke(&arr, "forEach", &[double_in_place])?;
    sb.log(&[arr.clone()])?;

    let times_two = Value::function("", |_, _, args| Ok(Value::from(arg(args, 0).to_number() * 2.0)));
    let doubled = sb.invoke(&arr, "map", &[times_two.clone()])?;
    sb.log(&[doubled])?;

    let char_arr = Value::array(["a", "b", "c", "d"].into_iter().map(Value::from).collect());
    let print_letter = Value::function("", |sb, _, args| {
        sb.log(&[arg(args, 0)])?;
        Ok(Value::Undefined)
    });
    sb.invoke(&char_arr, "forEach", &[print_letter])?;

    let num_arr = numbers(&[1, 2, 3, 4]);
    let over_five = Value::function("", |_, _, args| Ok(Value::Bool(arg(args, 0).to_number() > 5.0)));
    let mapped = sb.invoke(&num_arr, "map", &[times_two])?;
    let fil_arr = sb.invoke(&mapped, "filter", &[over_five])?;
    sb.log(&[fil_arr])
}

fn index_of_dedupe(sb: &mut Sandbox) -> Result<(), Thrown> {
    let data = Value::array(["g", "o", "o", "g", "l", "e"].into_iter().map(Value::from).collect());
    let haystack = data.clone();
    let first_occurrence = Value::function("", move |sb, _, args| {
        let (value, index) = (arg(args, 0), arg(args, 1));
        let first = sb.invoke(&haystack, "indexOf", &[value.clone()])?;
        sb.log(&[
            Value::from("indexOf"),
            first.clone(),
            Value::from("value"),
            value,
            Value::from("index"),
            index.clone(),
        ])?;
        Ok(Value::Bool(first.strict_eq(&index)))
    });
    sb.invoke(&data, "filter", &[first_occurrence])?;
    Ok(())
}

fn remove_duplicates(sb: &mut Sandbox) -> Result<(), Thrown> {
    let arr = numbers(&[1, 2, 3, 4, 5, 1, 2]);

    // filter keeping first occurrences, then filter keeping the repeats
    for keep_first in [true, false] {
        let data = arr.clone();
        let predicate = Value::function("", move |sb, _, args| {
            let first = sb.invoke(&data, "indexOf", &[arg(args, 0)])?;
            Ok(Value::Bool(first.strict_eq(&arg(args, 1)) == keep_first))
        });
        let filtered = sb.invoke(&arr, "filter", &[predicate])?;
        sb.log(&[filtered])?;
    }

    // [...new Set(data)]
    let items = arr.as_array().map(|items| items.borrow().clone()).unwrap_or_default();
    let mut set: Vec<Value> = Vec::new();
    for item in items {
        if !set.iter().any(|member| member.same_value_zero(&item)) {
            set.push(item);
        }
    }
    sb.log(&[Value::array(set)])?;

    let unique = Value::array(Vec::new());
    let seen = unique.clone();
    let push_new = Value::function("", move |sb, _, args| {
        let element = arg(args, 0);
        if !sb.invoke(&seen, "includes", &[element.clone()])?.is_truthy() {
            sb.invoke(&seen, "push", &[element])?;
        }
        Ok(Value::Undefined)
    });
    sb.invoke(&arr, "forEach", &[push_new])?;
    sb.log(&[unique])?;

    let push_if_absent = Value::function("", |sb, _, args| {
        let (a, b) = (arg(args, 0), arg(args, 1));
        if sb.invoke(&a, "indexOf", &[b.clone()])?.to_number() < 0.0 {
            sb.invoke(&a, "push", &[b])?;
        }
        Ok(a)
    });
    let reduced = sb.invoke(&arr, "reduce", &[push_if_absent, Value::array(Vec::new())])?;
    sb.log(&[reduced])?;

    let spread_if_absent = Value::function("", |sb, _, args| {
        let (acc, cur) = (arg(args, 0), arg(args, 1));
        if sb.invoke(&acc, "includes", &[cur.clone()])?.is_truthy() {
            return Ok(acc);
        }
        let mut next = acc.as_array().map(|items| items.borrow().clone()).unwrap_or_default();
        next.push(cur);
        Ok(Value::array(next))
    });
    let reduced = sb.invoke(&arr, "reduce", &[spread_if_absent, Value::array(Vec::new())])?;
    sb.log(&[reduced])?;

    let users = Value::array(
        ["Jayant", "Sandy", "Shiva", "Jayant"]
            .into_iter()
            .map(|name| Value::object([("name", Value::from(name)), ("age", Value::from(25))]))
            .collect(),
    );
    let by_name = Value::function("", |sb, _, args| sb.get(&arg(args, 0), "name"));
    let unique_users = unique_by_keep_last(sb, &users, &by_name)?;
    let json = sb.json_stringify(&unique_users)?;
    sb.log(&[json])
}

/// `[...new Map(data.map(x => [key(x), x])).values()]`: a later duplicate
/// replaces the earlier value but keeps its position.
fn unique_by_keep_last(sb: &mut Sandbox, data: &Value, key: &Value) -> Result<Value, Thrown> {
    let items = data.as_array().map(|items| items.borrow().clone()).unwrap_or_default();
    let mut map: Vec<(Value, Value)> = Vec::new();
    for item in items {
        let k = sb.call(key, &Value::Undefined, &[item.clone()])?;
        match map.iter_mut().find(|(existing, _)| existing.same_value_zero(&k)) {
            Some(entry) => entry.1 = item,
            None => map.push((k, item)),
        }
    }
    Ok(Value::array(map.into_iter().map(|(_, value)| value).collect()))
}
