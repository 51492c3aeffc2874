//! A minimal promise: one settlement, reactions delivered as microtasks.

use super::value::Value;
use super::{Sandbox, Thrown};
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Clone)]
pub enum Settled {
    Fulfilled(Value),
    Rejected(Value),
}

type Reaction = Box<dyn FnOnce(&mut Sandbox, Settled) -> Result<(), Thrown>>;

enum State {
    Pending(Vec<Reaction>),
    Done(Settled),
}

struct Inner {
    state: State,
    handled: bool,
}

#[derive(Clone)]
pub struct Promise {
    inner: Rc<RefCell<Inner>>,
}

impl Promise {
    pub fn pending() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                state: State::Pending(Vec::new()),
                handled: false,
            })),
        }
    }

    pub fn resolved(sb: &mut Sandbox, value: Value) -> Self {
        let promise = Self::pending();
        promise.resolve(sb, value);
        promise
    }

    pub fn rejected(sb: &mut Sandbox, reason: Value) -> Self {
        let promise = Self::pending();
        promise.reject(sb, reason);
        promise
    }

    /// Settles with `value`. Returns false when the promise had already
    /// settled; later calls never change the outcome.
    pub fn resolve(&self, sb: &mut Sandbox, value: Value) -> bool {
        self.settle(sb, Settled::Fulfilled(value))
    }

    pub fn reject(&self, sb: &mut Sandbox, reason: Value) -> bool {
        let settled = self.settle(sb, Settled::Rejected(reason));
        if settled && !self.inner.borrow().handled {
            sb.track_rejection(self.clone());
        }
        settled
    }

    pub fn adopt(&self, sb: &mut Sandbox, other: &Promise) {
        let target = self.clone();
        other.react(
            sb,
            Box::new(move |sb, settled| {
                match settled {
                    Settled::Fulfilled(value) => target.resolve(sb, value),
                    Settled::Rejected(reason) => target.reject(sb, reason),
                };
                Ok(())
            }),
        );
    }

    fn settle(&self, sb: &mut Sandbox, outcome: Settled) -> bool {
        let reactions = {
            let mut inner = self.inner.borrow_mut();
            match std::mem::replace(&mut inner.state, State::Done(outcome.clone())) {
                State::Pending(reactions) => reactions,
                State::Done(previous) => {
                    inner.state = State::Done(previous);
                    return false;
                }
            }
        };
        for reaction in reactions {
            let outcome = outcome.clone();
            sb.queue_microtask(move |sb| reaction(sb, outcome));
        }
        true
    }

    fn react(&self, sb: &mut Sandbox, reaction: Reaction) {
        let ready = {
            let mut inner = self.inner.borrow_mut();
            inner.handled = true;
            match &mut inner.state {
                State::Pending(reactions) => {
                    reactions.push(reaction);
                    return;
                }
                State::Done(outcome) => outcome.clone(),
            }
        };
        sb.queue_microtask(move |sb| reaction(sb, ready));
    }

    /// `.then(onFulfilled)`; rejections pass through to the returned promise.
    pub fn then(
        &self,
        sb: &mut Sandbox,
        on_fulfilled: impl FnOnce(&mut Sandbox, Value) -> Result<Value, Thrown> + 'static,
    ) -> Promise {
        let derived = Promise::pending();
        let target = derived.clone();
        self.react(
            sb,
            Box::new(move |sb, settled| match settled {
                Settled::Fulfilled(value) => {
                    let outcome = on_fulfilled(sb, value);
                    target.settle_with(sb, outcome)
                }
                Settled::Rejected(reason) => {
                    target.reject(sb, reason);
                    Ok(())
                }
            }),
        );
        derived
    }

    pub fn then_or_else(
        &self,
        sb: &mut Sandbox,
        on_fulfilled: impl FnOnce(&mut Sandbox, Value) -> Result<Value, Thrown> + 'static,
        on_rejected: impl FnOnce(&mut Sandbox, Value) -> Result<Value, Thrown> + 'static,
    ) -> Promise {
        let derived = Promise::pending();
        let target = derived.clone();
        self.react(
            sb,
            Box::new(move |sb, settled| {
                let outcome = match settled {
                    Settled::Fulfilled(value) => on_fulfilled(sb, value),
                    Settled::Rejected(reason) => on_rejected(sb, reason),
                };
                target.settle_with(sb, outcome)
            }),
        );
        derived
    }

    /// `.catch(onRejected)`; fulfilled values pass through untouched.
    pub fn catch(
        &self,
        sb: &mut Sandbox,
        on_rejected: impl FnOnce(&mut Sandbox, Value) -> Result<Value, Thrown> + 'static,
    ) -> Promise {
        let derived = Promise::pending();
        let target = derived.clone();
        self.react(
            sb,
            Box::new(move |sb, settled| match settled {
                Settled::Fulfilled(value) => {
                    target.resolve(sb, value);
                    Ok(())
                }
                Settled::Rejected(reason) => {
                    let outcome = on_rejected(sb, reason);
                    target.settle_with(sb, outcome)
                }
            }),
        );
        derived
    }

    /// `.then(v => otherPromise)`: the returned promise adopts whatever the
    /// callback hands back.
    pub fn then_promise(
        &self,
        sb: &mut Sandbox,
        on_fulfilled: impl FnOnce(&mut Sandbox, Value) -> Result<Promise, Thrown> + 'static,
    ) -> Promise {
        let derived = Promise::pending();
        let target = derived.clone();
        self.react(
            sb,
            Box::new(move |sb, settled| {
                match settled {
                    Settled::Fulfilled(value) => match on_fulfilled(sb, value) {
                        Ok(next) => target.adopt(sb, &next),
                        Err(thrown) if thrown.is_interrupt() => return Err(thrown),
                        Err(thrown) => {
                            target.reject(sb, Value::Error(thrown));
                        }
                    },
                    Settled::Rejected(reason) => {
                        target.reject(sb, reason);
                    }
                }
                Ok(())
            }),
        );
        derived
    }

    /// `Promise.all`: fulfills with every value in input order, or rejects
    /// with the first rejection.
    pub fn all(sb: &mut Sandbox, promises: Vec<Promise>) -> Promise {
        let combined = Promise::pending();
        if promises.is_empty() {
            combined.resolve(sb, Value::array(Vec::new()));
            return combined;
        }
        let results = Rc::new(RefCell::new(vec![Value::Undefined; promises.len()]));
        let remaining = Rc::new(RefCell::new(promises.len()));
        for (index, promise) in promises.iter().enumerate() {
            let combined = combined.clone();
            let results = Rc::clone(&results);
            let remaining = Rc::clone(&remaining);
            promise.react(
                sb,
                Box::new(move |sb, settled| {
                    match settled {
                        Settled::Fulfilled(value) => {
                            results.borrow_mut()[index] = value;
                            let left = {
                                let mut left = remaining.borrow_mut();
                                *left -= 1;
                                *left
                            };
                            if left == 0 {
                                let values = results.borrow().clone();
                                combined.resolve(sb, Value::array(values));
                            }
                        }
                        Settled::Rejected(reason) => {
                            combined.reject(sb, reason);
                        }
                    }
                    Ok(())
                }),
            );
        }
        combined
    }

    pub fn describe(&self) -> String {
        match &self.inner.borrow().state {
            State::Pending(_) => "Promise { <pending> }".to_string(),
            State::Done(Settled::Fulfilled(value)) => format!("Promise {{ {} }}", value.inspect()),
            State::Done(Settled::Rejected(reason)) => {
                format!("Promise {{ <rejected> {} }}", reason.inspect())
            }
        }
    }

    /// The rejection reason if this promise rejected and nobody listened.
    pub(crate) fn unhandled_reason(&self) -> Option<Value> {
        let inner = self.inner.borrow();
        match &inner.state {
            State::Done(Settled::Rejected(reason)) if !inner.handled => Some(reason.clone()),
            _ => None,
        }
    }

    fn settle_with(&self, sb: &mut Sandbox, outcome: Result<Value, Thrown>) -> Result<(), Thrown> {
        match outcome {
            Ok(value) => {
                self.resolve(sb, value);
            }
            Err(thrown) if thrown.is_interrupt() => return Err(thrown),
            Err(thrown) => {
                self.reject(sb, Value::Error(thrown));
            }
        }
        Ok(())
    }
}
