//! Delegation tables stand in for prototype chains.
//!
//! A table is an explicit list of named capabilities plus an explicit parent
//! link. Property lookup walks own properties first, then the receiver's table,
//! then each parent in turn. Every sandbox builds its own [`Realm`], so a
//! snippet that extends `Array.prototype` only ever touches its own copy.

use super::value::{Function, Value};
use super::{Sandbox, Thrown};
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Clone)]
pub enum Slot {
    Method(Value),
    Getter(Function),
}

pub struct DelegationTable {
    name: String,
    slots: RefCell<Vec<(String, Slot)>>,
    parent: Option<Rc<DelegationTable>>,
}

impl DelegationTable {
    pub fn new(name: &str, parent: Option<Rc<DelegationTable>>) -> Rc<Self> {
        Rc::new(Self {
            name: name.to_string(),
            slots: RefCell::new(Vec::new()),
            parent,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&Rc<DelegationTable>> {
        self.parent.as_ref()
    }

    pub fn define(&self, key: &str, value: Value) {
        self.put(key, Slot::Method(value));
    }

    pub fn define_method(
        &self,
        key: &str,
        body: impl Fn(&mut Sandbox, &Value, &[Value]) -> Result<Value, Thrown> + 'static,
    ) {
        self.define(key, Value::Function(Function::new(key, body)));
    }

    pub fn define_getter(
        &self,
        key: &str,
        body: impl Fn(&mut Sandbox, &Value, &[Value]) -> Result<Value, Thrown> + 'static,
    ) {
        self.put(key, Slot::Getter(Function::new(key, body)));
    }

    fn put(&self, key: &str, slot: Slot) {
        let mut slots = self.slots.borrow_mut();
        match slots.iter_mut().find(|(k, _)| k == key) {
            Some(existing) => existing.1 = slot,
            None => slots.push((key.to_string(), slot)),
        }
    }

    fn own_slot(&self, key: &str) -> Option<Slot> {
        self.slots
            .borrow()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, slot)| slot.clone())
    }

    pub fn resolve(&self, key: &str) -> Option<Slot> {
        if let Some(slot) = self.own_slot(key) {
            return Some(slot);
        }
        let mut next = self.parent.clone();
        while let Some(table) = next {
            if let Some(slot) = table.own_slot(key) {
                return Some(slot);
            }
            next = table.parent.clone();
        }
        None
    }

    pub fn chain(&self) -> Vec<String> {
        let mut names = vec![self.name.clone()];
        let mut next = self.parent.clone();
        while let Some(table) = next {
            names.push(table.name.clone());
            next = table.parent.clone();
        }
        names
    }
}

pub struct Realm {
    pub object: Rc<DelegationTable>,
    pub function: Rc<DelegationTable>,
    pub array: Rc<DelegationTable>,
    pub string: Rc<DelegationTable>,
    pub number: Rc<DelegationTable>,
    pub boolean: Rc<DelegationTable>,
}

impl Realm {
    pub fn new() -> Self {
        let object = DelegationTable::new("Object", None);
        let realm = Self {
            function: DelegationTable::new("Function", Some(Rc::clone(&object))),
            array: DelegationTable::new("Array", Some(Rc::clone(&object))),
            string: DelegationTable::new("String", Some(Rc::clone(&object))),
            number: DelegationTable::new("Number", Some(Rc::clone(&object))),
            boolean: DelegationTable::new("Boolean", Some(Rc::clone(&object))),
            object,
        };
        install_object_methods(&realm.object);
        install_array_methods(&realm.array);
        install_string_methods(&realm.string);
        install_number_methods(&realm.number);
        realm
    }

    /// The table a value delegates to, boxing primitives the way property
    /// access on `42` or `'Test'` does.
    pub fn table_for(&self, value: &Value) -> Option<Rc<DelegationTable>> {
        match value {
            Value::Undefined | Value::Null => None,
            Value::Bool(_) => Some(Rc::clone(&self.boolean)),
            Value::Num(_) => Some(Rc::clone(&self.number)),
            Value::Str(_) => Some(Rc::clone(&self.string)),
            Value::Array(_) => Some(Rc::clone(&self.array)),
            Value::Function(_) => Some(Rc::clone(&self.function)),
            Value::Error(_) => Some(Rc::clone(&self.object)),
            Value::Object(object) => Some(
                object
                    .borrow()
                    .proto()
                    .cloned()
                    .unwrap_or_else(|| Rc::clone(&self.object)),
            ),
        }
    }
}

impl Default for Realm {
    fn default() -> Self {
        Self::new()
    }
}

fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or(Value::Undefined)
}

fn receiver_array(this: &Value, method: &str) -> Result<Vec<Value>, Thrown> {
    this.as_array()
        .map(|items| items.borrow().clone())
        .ok_or_else(|| Thrown::type_error(format!("Array.prototype.{method} called on non-array")))
}

fn element_at(this: &Value, index: usize) -> Option<Value> {
    this.as_array()
        .and_then(|items| items.borrow().get(index).cloned())
}

fn array_len(this: &Value) -> usize {
    this.as_array().map(|items| items.borrow().len()).unwrap_or(0)
}

fn install_object_methods(table: &DelegationTable) {
    table.define_method("hasOwnProperty", |_, this, args| {
        let key = arg(args, 0).to_js_string();
        Ok(Value::Bool(
            this.as_object()
                .is_some_and(|object| object.borrow().has_own(&key)),
        ))
    });
    table.define_method("toString", |_, this, _| {
        Ok(Value::from(match this {
            Value::Object(_) => "[object Object]".to_string(),
            other => other.to_js_string(),
        }))
    });
}

fn install_array_methods(table: &DelegationTable) {
    table.define_method("push", |_, this, args| {
        let items = this
            .as_array()
            .ok_or_else(|| Thrown::type_error("Array.prototype.push called on non-array"))?;
        let mut items = items.borrow_mut();
        items.extend(args.iter().cloned());
        Ok(Value::Num(items.len() as f64))
    });
    // Callback methods re-read the element on each step, so a callback that
    // writes back into the array (`arr[index] = ...`) sees its own writes.
    table.define_method("forEach", |sb, this, args| {
        receiver_array(this, "forEach")?;
        let callback = arg(args, 0);
        let mut index = 0;
        while let Some(item) = element_at(this, index) {
            sb.call(&callback, &Value::Undefined, &[item, Value::Num(index as f64), this.clone()])?;
            index += 1;
        }
        Ok(Value::Undefined)
    });
    table.define_method("map", |sb, this, args| {
        receiver_array(this, "map")?;
        let callback = arg(args, 0);
        let mut mapped = Vec::with_capacity(array_len(this));
        let mut index = 0;
        while let Some(item) = element_at(this, index) {
            mapped.push(sb.call(
                &callback,
                &Value::Undefined,
                &[item, Value::Num(index as f64), this.clone()],
            )?);
            index += 1;
        }
        Ok(Value::array(mapped))
    });
    table.define_method("filter", |sb, this, args| {
        receiver_array(this, "filter")?;
        let predicate = arg(args, 0);
        let mut kept = Vec::new();
        let mut index = 0;
        while let Some(item) = element_at(this, index) {
            let keep = sb.call(
                &predicate,
                &Value::Undefined,
                &[item.clone(), Value::Num(index as f64), this.clone()],
            )?;
            if keep.is_truthy() {
                kept.push(item);
            }
            index += 1;
        }
        Ok(Value::array(kept))
    });
    table.define_method("reduce", |sb, this, args| {
        let items = receiver_array(this, "reduce")?;
        let reducer = arg(args, 0);
        let (mut accumulator, start) = match args.get(1) {
            Some(initial) => (initial.clone(), 0),
            None => match items.first() {
                Some(first) => (first.clone(), 1),
                None => {
                    return Err(Thrown::type_error(
                        "Reduce of empty array with no initial value",
                    ))
                }
            },
        };
        let mut index = start;
        while let Some(item) = element_at(this, index) {
            accumulator = sb.call(
                &reducer,
                &Value::Undefined,
                &[accumulator, item, Value::Num(index as f64), this.clone()],
            )?;
            index += 1;
        }
        Ok(accumulator)
    });
    table.define_method("includes", |_, this, args| {
        let items = receiver_array(this, "includes")?;
        let needle = arg(args, 0);
        Ok(Value::Bool(items.iter().any(|item| item.same_value_zero(&needle))))
    });
    table.define_method("indexOf", |_, this, args| {
        let items = receiver_array(this, "indexOf")?;
        let needle = arg(args, 0);
        Ok(Value::Num(
            items
                .iter()
                .position(|item| item.strict_eq(&needle))
                .map(|i| i as f64)
                .unwrap_or(-1.0),
        ))
    });
    table.define_method("join", |_, this, args| {
        let separator = match arg(args, 0) {
            Value::Undefined => ",".to_string(),
            other => other.to_js_string(),
        };
        let items = receiver_array(this, "join")?;
        Ok(Value::from(
            items
                .iter()
                .map(|item| match item {
                    Value::Undefined | Value::Null => String::new(),
                    other => other.to_js_string(),
                })
                .collect::<Vec<_>>()
                .join(&separator),
        ))
    });
}

fn install_string_methods(table: &DelegationTable) {
    table.define_method("toUpperCase", |_, this, _| {
        Ok(Value::from(this.to_js_string().to_uppercase()))
    });
}

fn install_number_methods(table: &DelegationTable) {
    table.define_method("toString", |_, this, _| Ok(Value::from(this.to_js_string())));
}

#[cfg(test)]
mod tests {
    use super::{DelegationTable, Realm, Slot};
    use crate::sandbox::value::Value;
    use std::rc::Rc;

    #[test]
    fn lookup_walks_explicit_parent_links() {
        let human = DelegationTable::new("Human", None);
        human.define_method("printGender", |_, _, _| Ok(Value::from("from human")));
        let person = DelegationTable::new("Person", Some(Rc::clone(&human)));
        person.define_method("printMyName", |_, _, _| Ok(Value::Undefined));

        assert!(matches!(person.resolve("printGender"), Some(Slot::Method(_))));
        assert!(person.resolve("missing").is_none());
        assert_eq!(person.chain(), vec!["Person", "Human"]);
    }

    #[test]
    fn primitives_box_to_their_wrapper_tables() {
        let realm = Realm::new();
        let table = realm.table_for(&Value::from(42)).expect("number table");
        assert_eq!(table.chain(), vec!["Number", "Object"]);
        assert!(realm.table_for(&Value::Undefined).is_none());
        assert_eq!(
            realm.table_for(&Value::array(vec![])).expect("array").name(),
            "Array"
        );
    }

    #[test]
    fn realms_do_not_share_tables() {
        let first = Realm::new();
        let second = Realm::new();
        first.array.define_method("unique", |_, _, _| Ok(Value::Undefined));
        assert!(first.array.resolve("unique").is_some());
        assert!(second.array.resolve("unique").is_none());
    }
}
