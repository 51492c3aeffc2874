use crate::sandbox::value::Value;
use crate::sandbox::{Sandbox, Thrown};
use crate::snippet::{Expectation, Snippet};

pub(super) static SNIPPETS: &[Snippet] = &[
    Snippet {
        name: "typeof_and_falsy",
        topic: "equality",
        summary: "typeof null is object; exactly six values are falsy",
        deterministic: true,
        body: typeof_and_falsy,
        expected: Expectation::Transcript(&[
            "number", "object", "false", "false", "false", "false", "false", "false", "true",
            "true", "true",
        ]),
    },
    Snippet {
        name: "loose_vs_strict_equality",
        topic: "equality",
        summary: "== coerces its operands, === requires matching types",
        deterministic: true,
        body: loose_vs_strict_equality,
        expected: Expectation::Transcript(&[
            "42",
            "42",
            "0 == '' true",
            "0 === '' false",
            "null == undefined true",
            "null === undefined false",
            "'1' == 1 true",
            "[] == '' true",
            "NaN == NaN false",
        ]),
    },
];

fn typeof_and_falsy(sb: &mut Sandbox) -> Result<(), Thrown> {
    let x = Value::from(42);
    sb.log_str(x.type_of())?;
    sb.log_str(Value::Null.type_of())?;

    let candidates = [
        Value::Undefined,
        Value::Null,
        Value::Bool(false),
        Value::from(0),
        Value::Num(f64::NAN),
        Value::from(""),
        Value::empty_object(),
        Value::array(Vec::new()),
        Value::from("Everything else"),
    ];
    for candidate in candidates {
        // Boolean(candidate)
        sb.log(&[Value::Bool(candidate.is_truthy())])?;
    }
    Ok(())
}

fn loose_vs_strict_equality(sb: &mut Sandbox) -> Result<(), Thrown> {
    let x = Value::from(42);
    let explicit = Value::from(x.to_js_string());
    // x + ""
    let implicit = Value::from(x.to_js_string() + "");
    sb.log(&[explicit])?;
    sb.log(&[implicit])?;

    let comparisons = [
        ("0 == ''", Value::from(0), Value::from(""), false),
        ("0 === ''", Value::from(0), Value::from(""), true),
        ("null == undefined", Value::Null, Value::Undefined, false),
        ("null === undefined", Value::Null, Value::Undefined, true),
        ("'1' == 1", Value::from("1"), Value::from(1), false),
        ("[] == ''", Value::array(Vec::new()), Value::from(""), false),
        ("NaN == NaN", Value::Num(f64::NAN), Value::Num(f64::NAN), false),
    ];
    for (label, left, right, strict) in comparisons {
        let equal = if strict {
            left.strict_eq(&right)
        } else {
            left.loose_eq(&right)
        };
        sb.log(&[Value::from(label), Value::Bool(equal)])?;
    }
    Ok(())
}
