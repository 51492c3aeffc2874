//! Lexical environment records.
//!
//! Each [`Env`] is one scope frame linked to its parent. `var` and function
//! declarations bind eagerly (hoisted), `let`/`const` start in the temporal
//! dead zone until initialized, and sloppy-mode assignment to an undeclared
//! name lands on the global object.

use super::value::Value;
use super::{Sandbox, Thrown};
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Clone)]
enum Binding {
    Var(Value),
    Let(Option<Value>),
    Const(Option<Value>),
}

struct Frame {
    bindings: RefCell<Vec<(String, Binding)>>,
    parent: Option<Env>,
    global_object: Option<Value>,
}

#[derive(Clone)]
pub struct Env {
    frame: Rc<Frame>,
}

impl Env {
    pub fn global(global_object: Value) -> Self {
        Self {
            frame: Rc::new(Frame {
                bindings: RefCell::new(Vec::new()),
                parent: None,
                global_object: Some(global_object),
            }),
        }
    }

    pub fn child(&self) -> Self {
        Self {
            frame: Rc::new(Frame {
                bindings: RefCell::new(Vec::new()),
                parent: Some(self.clone()),
                global_object: None,
            }),
        }
    }

    /// `var name;` binds `undefined` unless the name already exists in this
    /// frame, in which case the existing value is kept.
    pub fn declare_var(&self, name: &str) {
        if !self.has_own(name) {
            self.put(name, Binding::Var(Value::Undefined));
        }
    }

    pub fn define_var(&self, name: &str, value: Value) {
        self.put(name, Binding::Var(value));
    }

    pub fn declare_function(&self, name: &str, value: Value) {
        self.put(name, Binding::Var(value));
    }

    pub fn declare_let(&self, name: &str) {
        self.put(name, Binding::Let(None));
    }

    pub fn declare_const(&self, name: &str) {
        self.put(name, Binding::Const(None));
    }

    /// Ends the dead zone for a `let` or `const` in this frame.
    pub fn initialize(&self, name: &str, value: Value) {
        let mut bindings = self.frame.bindings.borrow_mut();
        match bindings.iter_mut().find(|(k, _)| k == name) {
            Some((_, Binding::Let(slot))) | Some((_, Binding::Const(slot))) => {
                *slot = Some(value)
            }
            Some((_, Binding::Var(slot))) => *slot = value,
            None => bindings.push((name.to_string(), Binding::Let(Some(value)))),
        }
    }

    pub fn define_let(&self, name: &str, value: Value) {
        self.put(name, Binding::Let(Some(value)));
    }

    pub fn define_const(&self, name: &str, value: Value) {
        self.put(name, Binding::Const(Some(value)));
    }

    pub fn get(&self, name: &str) -> Result<Value, Thrown> {
        match self.lookup(name) {
            Lookup::Found(binding) => read(name, &binding),
            Lookup::Global(value) => Ok(value),
            Lookup::Missing => Err(Thrown::reference_error(format!("{name} is not defined"))),
        }
    }

    /// `typeof name`: undeclared names are `"undefined"`, names in the dead
    /// zone still throw.
    pub fn type_of(&self, name: &str) -> Result<&'static str, Thrown> {
        match self.lookup(name) {
            Lookup::Found(binding) => Ok(read(name, &binding)?.type_of()),
            Lookup::Global(value) => Ok(value.type_of()),
            Lookup::Missing => Ok("undefined"),
        }
    }

    pub fn assign(&self, name: &str, value: Value) -> Result<(), Thrown> {
        let mut env = Some(self.clone());
        while let Some(current) = env {
            {
                let mut bindings = current.frame.bindings.borrow_mut();
                if let Some((_, binding)) = bindings.iter_mut().find(|(k, _)| k == name) {
                    return match binding {
                        Binding::Var(slot) | Binding::Let(Some(slot)) => {
                            *slot = value;
                            Ok(())
                        }
                        Binding::Let(None) | Binding::Const(None) => Err(dead_zone(name)),
                        Binding::Const(Some(_)) => {
                            Err(Thrown::type_error("Assignment to constant variable."))
                        }
                    };
                }
            }
            if let Some(global) = &current.frame.global_object {
                if let Some(object) = global.as_object() {
                    object.borrow_mut().set_own(name, value);
                }
                return Ok(());
            }
            env = current.frame.parent.clone();
        }
        Ok(())
    }

    pub fn call(&self, sb: &mut Sandbox, name: &str, args: &[Value]) -> Result<Value, Thrown> {
        match self.get(name)? {
            Value::Function(function) => function.invoke(sb, &Value::Undefined, args),
            _ => Err(Thrown::type_error(format!("{name} is not a function"))),
        }
    }

    fn has_own(&self, name: &str) -> bool {
        self.frame.bindings.borrow().iter().any(|(k, _)| k == name)
    }

    fn put(&self, name: &str, binding: Binding) {
        let mut bindings = self.frame.bindings.borrow_mut();
        match bindings.iter_mut().find(|(k, _)| k == name) {
            Some(existing) => existing.1 = binding,
            None => bindings.push((name.to_string(), binding)),
        }
    }

    fn lookup(&self, name: &str) -> Lookup {
        let mut env = Some(self.clone());
        while let Some(current) = env {
            if let Some((_, binding)) = current
                .frame
                .bindings
                .borrow()
                .iter()
                .find(|(k, _)| k == name)
            {
                return Lookup::Found(binding.clone());
            }
            if let Some(global) = &current.frame.global_object {
                let own = global
                    .as_object()
                    .and_then(|object| object.borrow().get_own(name));
                return match own {
                    Some(value) => Lookup::Global(value),
                    None => Lookup::Missing,
                };
            }
            env = current.frame.parent.clone();
        }
        Lookup::Missing
    }
}

enum Lookup {
    Found(Binding),
    Global(Value),
    Missing,
}

fn read(name: &str, binding: &Binding) -> Result<Value, Thrown> {
    match binding {
        Binding::Var(value) | Binding::Let(Some(value)) | Binding::Const(Some(value)) => {
            Ok(value.clone())
        }
        Binding::Let(None) | Binding::Const(None) => Err(dead_zone(name)),
    }
}

fn dead_zone(name: &str) -> Thrown {
    Thrown::reference_error(format!("Cannot access '{name}' before initialization"))
}
