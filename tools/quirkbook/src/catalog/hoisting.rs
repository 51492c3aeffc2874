use super::arg;
use crate::sandbox::value::Value;
use crate::sandbox::{Sandbox, Thrown};
use crate::snippet::{Expectation, Snippet};
use crate::types::ErrorKind;

pub(super) static SNIPPETS: &[Snippet] = &[
    Snippet {
        name: "hoisting_declarations",
        topic: "hoisting",
        summary: "var reads undefined before assignment; function declarations work before their text",
        deterministic: true,
        body: hoisting_declarations,
        expected: Expectation::Transcript(&[
            "undefined",
            "10",
            "[Function: getPi]",
            "3.14",
            "undefined",
            "10",
            "40",
            "23",
            "undefined",
            "5",
        ]),
    },
    Snippet {
        name: "hoisting_function_expression",
        topic: "hoisting",
        summary: "A var holding a function expression is undefined until assigned",
        deterministic: true,
        body: hoisting_function_expression,
        expected: Expectation::Throws {
            kind: ErrorKind::TypeError,
            message: "thisIsNotHoistedVar is not a function",
            transcript: &["This is a function declared at the bottom of a file."],
        },
    },
    Snippet {
        name: "hoisting_temporal_dead_zone",
        topic: "hoisting",
        summary: "Reading a let binding before its declaration throws",
        deterministic: true,
        body: hoisting_temporal_dead_zone,
        expected: Expectation::Throws {
            kind: ErrorKind::ReferenceError,
            message: "Cannot access 'number' before initialization",
            transcript: &[],
        },
    },
    Snippet {
        name: "scope_redeclaration",
        topic: "hoisting",
        summary: "var may be redeclared; a hoisted inner function shadows the global",
        deterministic: true,
        body: scope_redeclaration,
        expected: Expectation::Transcript(&["52", "1"]),
    },
    Snippet {
        name: "execution_stack",
        topic: "hoisting",
        summary: "Nested calls unwind back through the stack",
        deterministic: true,
        body: execution_stack,
        expected: Expectation::Transcript(&["22"]),
    },
];

#[allow(clippy::approx_constant)]
fn hoisting_declarations(sb: &mut Sandbox) -> Result<(), Thrown> {
    let module = sb.global_env().child();

    // Declaration phase: every var and function declaration in the file.
    module.declare_var("num");
    module.declare_function(
        "getPi",
        Value::function("getPi", |_, _, _| Ok(Value::from(3.14))),
    );
    let multiply_scope = module.clone();
    module.declare_function(
        "multiplyByTen",
        Value::function("multiplyByTen", move |sb, _, args| {
            let scope = multiply_scope.child();
            scope.define_var("number", arg(args, 0));
            scope.declare_var("ten");
            let ten = scope.get("ten")?;
            sb.log(&[ten])?;
            scope.assign("ten", Value::from(10))?;
            let ten = scope.get("ten")?;
            sb.log(&[ten])?;
            Ok(Value::from(
                scope.get("number")?.to_number() * scope.get("ten")?.to_number(),
            ))
        }),
    );
    let sum_scope = module.clone();
    module.declare_function(
        "sumArray",
        Value::function("sumArray", move |sb, _, args| {
            let scope = sum_scope.child();
            scope.define_var("array", arg(args, 0));
            scope.declare_function(
                "sum",
                Value::function("sum", |_, _, args| {
                    Ok(Value::from(arg(args, 0).to_number() + arg(args, 1).to_number()))
                }),
            );
            let sum = scope.get("sum")?;
            sb.invoke(&scope.get("array")?, "reduce", &[sum])
        }),
    );
    module.declare_let("condition");

    // Execution phase.
    let num = module.get("num")?;
    sb.log(&[num])?;
    module.assign("num", Value::from(10))?;
    let num = module.get("num")?;
    sb.log(&[num])?;

    let get_pi = module.get("getPi")?;
    sb.log(&[get_pi])?;
    let pi = module.call(sb, "getPi", &[])?;
    sb.log(&[pi])?;

    let product = module.call(sb, "multiplyByTen", &[Value::from(4)])?;
    sb.log(&[product])?;

    let numbers = Value::array(vec![Value::from(5), Value::from(10), Value::from(8)]);
    let total = module.call(sb, "sumArray", &[numbers])?;
    sb.log(&[total])?;

    module.initialize("condition", Value::Bool(true));
    if module.get("condition")?.is_truthy() {
        let block = module.child();
        block.declare_let("number");
        block.initialize("number", Value::Undefined);
        let number = block.get("number")?;
        sb.log(&[number])?;
        block.assign("number", Value::from(5))?;
        let number = block.get("number")?;
        sb.log(&[number])?;
    }
    Ok(())
}

fn hoisting_function_expression(sb: &mut Sandbox) -> Result<(), Thrown> {
    let module = sb.global_env().child();
    module.declare_function(
        "thisIsHoisted",
        Value::function("thisIsHoisted", |sb, _, _| {
            sb.log_str("This is a function declared at the bottom of a file.")?;
            Ok(Value::Undefined)
        }),
    );
    module.declare_const("thisIsNotHoisted");
    module.declare_var("thisIsNotHoistedVar");

    module.call(sb, "thisIsHoisted", &[])?;
    module.call(sb, "thisIsNotHoistedVar", &[])?;

    module.assign(
        "thisIsNotHoistedVar",
        Value::function("thisIsNotHoistedVar", |sb, _, _| {
            sb.log_str("Var should this be hoisted?")?;
            Ok(Value::Undefined)
        }),
    )?;
    Ok(())
}

fn hoisting_temporal_dead_zone(sb: &mut Sandbox) -> Result<(), Thrown> {
    let module = sb.global_env().child();
    module.define_let("condition", Value::Bool(true));
    if module.get("condition")?.is_truthy() {
        let block = module.child();
        block.declare_let("number");
        let number = block.get("number")?;
        sb.log(&[number])?;
        block.initialize("number", Value::Undefined);
    }
    Ok(())
}

fn scope_redeclaration(sb: &mut Sandbox) -> Result<(), Thrown> {
    let module = sb.global_env().child();
    module.declare_var("numVar");
    module.declare_var("a");
    let b_scope = module.clone();
    module.declare_function(
        "b",
        Value::function("b", move |_, _, _| {
            let scope = b_scope.child();
            scope.declare_function("a", Value::function("a", |_, _, _| Ok(Value::Undefined)));
            scope.assign("a", Value::from(10))?;
            Ok(Value::Undefined)
        }),
    );

    module.define_const("num", Value::from(50));
    module.define_let("numLet", Value::from(50));
    module.assign("numLet", Value::from(51))?;
    let bumped = module.get("numLet")?.to_number() + 1.0;
    module.assign("numLet", Value::from(bumped))?;

    let obj = Value::empty_object();
    module.define_const("obj", obj.clone());
    sb.set(&obj, "a", Value::from("a"))?;

    module.define_var("numVar", Value::from(50));
    module.assign("numVar", Value::from(51))?;
    module.define_var("numVar", Value::from(52));
    let num_var = module.get("numVar")?;
    sb.log(&[num_var])?;

    module.assign("a", Value::from(1))?;
    module.call(sb, "b", &[])?;
    let a = module.get("a")?;
    sb.log(&[a])
}

fn execution_stack(sb: &mut Sandbox) -> Result<(), Thrown> {
    let module = sb.global_env().child();
    module.declare_function(
        "addOne",
        Value::function("addOne", |_, _, args| {
            Ok(Value::from(arg(args, 0).to_number() + 1.0))
        }),
    );
    let get_num_scope = module.clone();
    module.declare_function(
        "getNum",
        Value::function("getNum", move |sb, _, _| {
            get_num_scope.call(sb, "addOne", &[Value::from(10)])
        }),
    );
    let c_scope = module.clone();
    module.declare_function(
        "c",
        Value::function("c", move |sb, _, _| {
            let left = c_scope.call(sb, "getNum", &[])?.to_number();
            let right = c_scope.call(sb, "getNum", &[])?.to_number();
            sb.log(&[Value::from(left + right)])?;
            Ok(Value::Undefined)
        }),
    );
    module.call(sb, "c", &[])?;
    Ok(())
}
