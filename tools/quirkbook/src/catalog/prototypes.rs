use super::arg;
use crate::sandbox::realm::DelegationTable;
use crate::sandbox::value::Value;
use crate::sandbox::{Sandbox, Thrown};
use crate::snippet::{Expectation, Snippet};
use std::rc::Rc;

pub(super) static SNIPPETS: &[Snippet] = &[
    Snippet {
        name: "prototype_method_lookup",
        topic: "prototypes",
        summary: "Primitives box to wrapper tables; own properties shadow delegated ones",
        deterministic: true,
        body: prototype_method_lookup,
        expected: Expectation::Transcript(&[
            "[ 'value', 'value1' ]",
            "TEST",
            "42",
            "[object Object]",
            "own toString",
        ]),
    },
    Snippet {
        name: "class_set",
        topic: "prototypes",
        summary: "A Set class with add, delete, has and a size getter",
        deterministic: true,
        body: class_set,
        expected: Expectation::Transcript(&[
            "s should have 5 members and actually has:  5",
            "s should contain 5:  true",
            "s should contain 6:  true",
            "s should have 6 members and actually has:  6",
            "s should no longer contain 6:  true",
            "s should have 5 members and actually has:  5",
        ]),
    },
    Snippet {
        name: "class_inheritance",
        topic: "prototypes",
        summary: "A subclass overrides a field and inherits the parent's method",
        deterministic: true,
        body: class_inheritance,
        expected: Expectation::Transcript(&["Harsh", "Female", "Harsh", "Female", "Female"]),
    },
    Snippet {
        name: "array_prototype_extension",
        topic: "prototypes",
        summary: "A method added to Array.prototype is visible on every array",
        deterministic: true,
        body: array_prototype_extension,
        expected: Expectation::Transcript(&["[ 1, 2, 3, 4, 5 ]", "number", "[ 1, 2, 3, 4, 5 ]"]),
    },
];

fn prototype_method_lookup(sb: &mut Sandbox) -> Result<(), Thrown> {
    let arr = Value::array(Vec::new());
    sb.invoke(&arr, "push", &[Value::from("value")])?;
    sb.invoke(&arr, "push", &[Value::from("value1")])?;
    sb.log(&[arr])?;

    let word = Value::from("Test");
    let upper = sb.invoke(&word, "toUpperCase", &[])?;
    sb.log(&[upper])?;

    let num = Value::from(42);
    let text = sb.invoke(&num, "toString", &[])?;
    sb.log(&[text])?;

    let obj = Value::empty_object();
    let inherited = sb.invoke(&obj, "toString", &[])?;
    sb.log(&[inherited])?;
    sb.set(
        &obj,
        "toString",
        Value::function("toString", |_, _, _| Ok(Value::from("own toString"))),
    )?;
    let own = sb.invoke(&obj, "toString", &[])?;
    sb.log(&[own])
}

fn set_table(sb: &Sandbox) -> Rc<DelegationTable> {
    let table = DelegationTable::new("Set", Some(Rc::clone(&sb.realm().object)));
    table.define_method("add", |sb, this, args| {
        let val = arg(args, 0);
        if !sb.invoke(this, "has", &[val.clone()])?.is_truthy() {
            let arr = sb.get(this, "arr")?;
            sb.invoke(&arr, "push", &[val])?;
        }
        Ok(Value::Undefined)
    });
    table.define_method("delete", |sb, this, args| {
        let val = arg(args, 0);
        let arr = sb.get(this, "arr")?;
        let others = Value::function("", move |_, _, args| {
            Ok(Value::Bool(!arg(args, 0).strict_eq(&val)))
        });
        let kept = sb.invoke(&arr, "filter", &[others])?;
        sb.set(this, "arr", kept)?;
        Ok(Value::Undefined)
    });
    table.define_method("has", |sb, this, args| {
        let arr = sb.get(this, "arr")?;
        sb.invoke(&arr, "includes", &[arg(args, 0)])
    });
    table.define_getter("size", |sb, this, _| {
        let arr = sb.get(this, "arr")?;
        sb.get(&arr, "length")
    });
    table
}

fn class_set(sb: &mut Sandbox) -> Result<(), Thrown> {
    let table = set_table(sb);
    let s = Value::instance(table);
    let members = (1..=5).map(Value::from).collect();
    sb.set(&s, "arr", Value::array(members))?;

    for _ in 0..3 {
        sb.invoke(&s, "add", &[Value::from(1)])?;
    }
    let size = sb.get(&s, "size")?;
    sb.log(&[Value::from("s should have 5 members and actually has: "), size])?;
    let has_five = sb.invoke(&s, "has", &[Value::from(5)])?;
    sb.log(&[Value::from("s should contain 5: "), has_five])?;

    sb.invoke(&s, "add", &[Value::from(6)])?;
    let has_six = sb.invoke(&s, "has", &[Value::from(6)])?;
    sb.log(&[Value::from("s should contain 6: "), has_six])?;
    let size = sb.get(&s, "size")?;
    sb.log(&[Value::from("s should have 6 members and actually has: "), size])?;

    sb.invoke(&s, "delete", &[Value::from(6)])?;
    let has_six = sb.invoke(&s, "has", &[Value::from(6)])?;
    sb.log(&[
        Value::from("s should no longer contain 6: "),
        Value::Bool(!has_six.is_truthy()),
    ])?;
    let size = sb.get(&s, "size")?;
    sb.log(&[Value::from("s should have 5 members and actually has: "), size])
}

fn print_property(key: &'static str) -> impl Fn(&mut Sandbox, &Value, &[Value]) -> Result<Value, Thrown> {
    move |sb, this, _| {
        let value = sb.get(this, key)?;
        sb.log(&[value])?;
        Ok(Value::Undefined)
    }
}

/// Methods live on the tables; the constructors run parent first.
fn class_inheritance(sb: &mut Sandbox) -> Result<(), Thrown> {
    let human = DelegationTable::new("Human", Some(Rc::clone(&sb.realm().object)));
    human.define_method("printGender", print_property("gender"));
    let person_table = DelegationTable::new("Person", Some(Rc::clone(&human)));
    person_table.define_method("printMyName", print_property("name"));

    let person = Value::instance(Rc::clone(&person_table));
    sb.set(&person, "gender", Value::from("Male"))?;
    sb.set(&person, "name", Value::from("Harsh"))?;
    sb.set(&person, "gender", Value::from("Female"))?;
    sb.invoke(&person, "printMyName", &[])?;
    sb.invoke(&person, "printGender", &[])?;

    // Class fields: arrow-function properties close over the instance.
    let person = Value::instance(person_table);
    sb.set(&person, "gender", Value::from("Male"))?;
    let receiver = person.clone();
    sb.set(
        &person,
        "printGender",
        Value::function("printGender", move |sb, _, _| {
            let gender = sb.get(&receiver, "gender")?;
            sb.log(&[gender])?;
            Ok(Value::Undefined)
        }),
    )?;
    sb.set(&person, "name", Value::from("Harsh"))?;
    sb.set(&person, "gender", Value::from("Female"))?;
    let receiver = person.clone();
    sb.set(
        &person,
        "printMyName",
        Value::function("printMyName", move |sb, _, _| {
            let name = sb.get(&receiver, "name")?;
            sb.log(&[name])?;
            let gender = sb.get(&receiver, "gender")?;
            sb.log(&[gender])?;
            Ok(Value::Undefined)
        }),
    )?;
    sb.invoke(&person, "printMyName", &[])?;
    sb.invoke(&person, "printGender", &[])?;
    Ok(())
}

fn array_prototype_extension(sb: &mut Sandbox) -> Result<(), Thrown> {
    let module = sb.global_env().child();
    let arr = Value::array([1, 2, 3, 4, 5, 1, 2].into_iter().map(Value::from).collect());
    module.define_var("arr", arr.clone());

    // The loop counter is never declared, so it becomes a global.
    let scope = module.clone();
    let unique_by_index = Value::function("", move |sb, this, _| {
        let frame = scope.child();
        frame.define_var("unique", Value::array(Vec::new()));
        frame.assign("i", Value::from(0))?;
        while frame.get("i")?.to_number() < sb.get(this, "length")?.to_number() {
            let index = frame.get("i")?.to_js_string();
            frame.define_var("current", sb.get(this, &index)?);
            let unique = frame.get("unique")?;
            let current = frame.get("current")?;
            if sb.invoke(&unique, "indexOf", &[current.clone()])?.to_number() < 0.0 {
                sb.invoke(&unique, "push", &[current])?;
            }
            let next = frame.get("i")?.to_number() + 1.0;
            frame.assign("i", Value::from(next))?;
        }
        frame.get("unique")
    });
    sb.realm().array.define("unique", unique_by_index);
    let unique = sb.invoke(&arr, "unique", &[])?;
    sb.log(&[unique])?;
    let leaked = module.type_of("i")?;
    sb.log_str(leaked)?;

    // Array.from(new Set(this))
    sb.realm().array.define_method("unique", |_, this, _| {
        let mut seen: Vec<Value> = Vec::new();
        let items = this.as_array().map(|items| items.borrow().clone()).unwrap_or_default();
        for item in items {
            if !seen.iter().any(|existing| existing.same_value_zero(&item)) {
                seen.push(item);
            }
        }
        Ok(Value::array(seen))
    });
    let unique = sb.invoke(&arr, "unique", &[])?;
    sb.log(&[unique])
}

#[cfg(test)]
mod tests {
    use crate::sandbox::tests::sandbox;

    #[test]
    fn array_extension_stays_inside_its_sandbox() {
        let mut extended = sandbox();
        super::array_prototype_extension(&mut extended).expect("run");
        assert!(extended.realm().array.resolve("unique").is_some());

        let fresh = sandbox();
        assert!(fresh.realm().array.resolve("unique").is_none());
    }

    #[test]
    fn size_getter_tracks_membership() {
        let mut sb = sandbox();
        super::class_set(&mut sb).expect("run");
        assert_eq!(
            sb.lines().last().map(String::as_str),
            Some("s should have 5 members and actually has:  5")
        );
    }
}
