//! One login handler written three ways: nested error-first callbacks, a
//! promise chain, and await. The user store, the password check, and the
//! token signer are in-sandbox fakes that answer on timers.

use crate::sandbox::promise::Promise;
use crate::sandbox::value::Value;
use crate::sandbox::{Sandbox, Thrown};
use crate::snippet::{Expectation, Snippet};
use std::cell::Cell;
use std::rc::Rc;

pub(super) static SNIPPETS: &[Snippet] = &[
    Snippet {
        name: "login_callbacks",
        topic: "async",
        summary: "Nested error-first callbacks; every level forwards its error by hand",
        deterministic: true,
        body: login_callbacks,
        expected: Expectation::Transcript(&[
            "#3 callback Error: No user with email grace@example.com",
            "#2 401 Incorrect Password",
            "#1 200 { token: 'signed:ada@example.com' }",
        ]),
    },
    Snippet {
        name: "login_promise_chain",
        topic: "async",
        summary: "One catch serves the whole chain, but a 401 inside a then does not stop it",
        deterministic: true,
        body: login_promise_chain,
        expected: Expectation::Transcript(&[
            "#3 callback Error: No user with email grace@example.com",
            "#2 401 Incorrect Password",
            "#2 callback Error: Cannot set headers after they are sent to the client",
            "#1 200 { token: 'signed:ada@example.com' }",
        ]),
    },
    Snippet {
        name: "login_async_await",
        topic: "async",
        summary: "await reads top to bottom; an early return ends the request",
        deterministic: true,
        body: login_async_await,
        expected: Expectation::Transcript(&[
            "#3 callback Error: No user with email grace@example.com",
            "#2 401 Incorrect Password",
            "#1 200 { token: 'signed:ada@example.com' }",
        ]),
    },
];

const FIND_MS: u64 = 10;
const COMPARE_MS: u64 = 5;
const SIGN_MS: u64 = 5;
const SAVE_MS: u64 = 10;

const USERS: &[(i32, &str, &str)] = &[(1, "ada@example.com", "hunter2")];

#[derive(Clone, Copy)]
struct Request {
    label: &'static str,
    email: &'static str,
    password: &'static str,
}

/// Started together, so their responses interleave by completion time.
const REQUESTS: [Request; 3] = [
    Request { label: "#1", email: "ada@example.com", password: "hunter2" },
    Request { label: "#2", email: "ada@example.com", password: "letmein" },
    Request { label: "#3", email: "grace@example.com", password: "hunter2" },
];

/// The HTTP response of one request. Answers once; a second answer throws
/// the way an Express response does.
#[derive(Clone)]
struct Response {
    label: &'static str,
    sent: Rc<Cell<bool>>,
}

impl Response {
    fn new(label: &'static str) -> Self {
        Self {
            label,
            sent: Rc::new(Cell::new(false)),
        }
    }

    /// `res.status(status).send(body)`
    fn send(&self, sb: &mut Sandbox, status: u16, body: &str) -> Result<(), Thrown> {
        self.answer(sb, status, body.to_string())
    }

    /// `res.json(body)`
    fn json(&self, sb: &mut Sandbox, body: Value) -> Result<(), Thrown> {
        self.answer(sb, 200, body.inspect())
    }

    fn answer(&self, sb: &mut Sandbox, status: u16, body: String) -> Result<(), Thrown> {
        if self.sent.replace(true) {
            return Err(Thrown::other("Cannot set headers after they are sent to the client"));
        }
        sb.log_str(&format!("{} {status} {body}", self.label))
    }
}

/// The `callback(err)` each handler was given.
fn callback(sb: &mut Sandbox, request: Request, err: Value) -> Result<(), Thrown> {
    sb.log(&[Value::from(format!("{} callback", request.label)), err])
}

/// `User.findOne({ email })`
fn find_one(email: &str) -> Result<Value, Value> {
    USERS
        .iter()
        .find(|(_, known, _)| *known == email)
        .map(|(id, email, password)| {
            Value::object([
                ("id", Value::from(*id)),
                ("email", Value::from(*email)),
                ("password", Value::from(*password)),
            ])
        })
        .ok_or_else(|| Value::Error(Thrown::other(format!("No user with email {email}"))))
}

/// `user.comparePassword(candidate)`
fn compare_password(sb: &mut Sandbox, user: &Value, candidate: &str) -> Result<Value, Thrown> {
    let stored = sb.get(user, "password")?;
    Ok(Value::from(stored.strict_eq(&Value::from(candidate))))
}

fn token_payload(sb: &mut Sandbox, user: &Value) -> Result<Value, Thrown> {
    Ok(Value::object([
        ("id", sb.get(user, "id")?),
        ("email", sb.get(user, "email")?),
    ]))
}

/// `jwt.sign(payload, secret)`
fn sign(sb: &mut Sandbox, payload: &Value) -> Result<Value, Thrown> {
    let email = sb.get(payload, "email")?;
    Ok(Value::from(format!("signed:{}", email.to_js_string())))
}

/// Delivers `outcome` to an error-first callback after `delay_ms`.
fn answer_later(
    sb: &mut Sandbox,
    delay_ms: u64,
    outcome: Result<Value, Value>,
    done: impl FnOnce(&mut Sandbox, Value, Value) -> Result<(), Thrown> + 'static,
) {
    sb.set_timeout(delay_ms, move |sb| match outcome {
        Ok(value) => done(sb, Value::Null, value),
        Err(err) => done(sb, err, Value::Undefined),
    });
}

fn settle_later(sb: &mut Sandbox, delay_ms: u64, outcome: Result<Value, Value>) -> Promise {
    let promise = Promise::pending();
    let target = promise.clone();
    sb.set_timeout(delay_ms, move |sb| {
        match outcome {
            Ok(value) => target.resolve(sb, value),
            Err(reason) => target.reject(sb, reason),
        };
        Ok(())
    });
    promise
}

fn login_callbacks(sb: &mut Sandbox) -> Result<(), Thrown> {
    for request in REQUESTS {
        login_with_callbacks(sb, request);
    }
    Ok(())
}

fn login_with_callbacks(sb: &mut Sandbox, request: Request) {
    let res = Response::new(request.label);
    answer_later(sb, FIND_MS, find_one(request.email), move |sb, err, user| {
        if err.is_truthy() {
            return callback(sb, request, err);
        }
        let is_match = compare_password(sb, &user, request.password)?;
        answer_later(sb, COMPARE_MS, Ok(is_match), move |sb, err, is_match| {
            if err.is_truthy() {
                return callback(sb, request, err);
            }
            if !is_match.is_truthy() {
                return res.send(sb, 401, "Incorrect Password");
            }
            let payload = token_payload(sb, &user)?;
            let token = sign(sb, &payload)?;
            answer_later(sb, SIGN_MS, Ok(token), move |sb, err, token| {
                if err.is_truthy() {
                    return callback(sb, request, err);
                }
                sb.set(&user, "token", token.clone())?;
                answer_later(sb, SAVE_MS, Ok(Value::Undefined), move |sb, err, _| {
                    if err.is_truthy() {
                        return callback(sb, request, err);
                    }
                    res.json(sb, Value::object([("token", token)]))
                });
                Ok(())
            });
            Ok(())
        });
        Ok(())
    });
}

fn login_promise_chain(sb: &mut Sandbox) -> Result<(), Thrown> {
    for request in REQUESTS {
        login_with_promise_chain(sb, request)?;
    }
    Ok(())
}

/// `user` and `token` live in the handler's scope so every then can reach
/// them.
fn login_with_promise_chain(sb: &mut Sandbox, request: Request) -> Result<(), Thrown> {
    let res = Response::new(request.label);
    let scope = sb.global_env().child();
    scope.define_let("user", Value::Undefined);
    scope.define_let("token", Value::Undefined);

    let (found_scope, match_scope, token_scope, json_scope) =
        (scope.clone(), scope.clone(), scope.clone(), scope);
    let refused = res.clone();
    settle_later(sb, FIND_MS, find_one(request.email))
        .then_promise(sb, move |sb, user| {
            found_scope.assign("user", user.clone())?;
            let is_match = compare_password(sb, &user, request.password)?;
            Ok(settle_later(sb, COMPARE_MS, Ok(is_match)))
        })
        .then_promise(sb, move |sb, is_match| {
            if !is_match.is_truthy() {
                refused.send(sb, 401, "Incorrect Password")?;
                return Ok(Promise::resolved(sb, Value::Undefined));
            }
            let payload = token_payload(sb, &match_scope.get("user")?)?;
            let token = sign(sb, &payload)?;
            Ok(settle_later(sb, SIGN_MS, Ok(token)))
        })
        .then_promise(sb, move |sb, token| {
            token_scope.assign("token", token.clone())?;
            sb.set(&token_scope.get("user")?, "token", token)?;
            Ok(settle_later(sb, SAVE_MS, Ok(Value::Undefined)))
        })
        .then(sb, move |sb, _| {
            res.json(sb, Value::object([("token", json_scope.get("token")?)]))?;
            Ok(Value::Undefined)
        })
        .catch(sb, move |sb, err| {
            callback(sb, request, err)?;
            Ok(Value::Undefined)
        });
    Ok(())
}

fn login_async_await(sb: &mut Sandbox) -> Result<(), Thrown> {
    for request in REQUESTS {
        login_with_await(sb, request);
    }
    Ok(())
}

/// Each await resumes the rest of the body, so every later step nests
/// inside the one before it.
fn login_with_await(sb: &mut Sandbox, request: Request) {
    let res = Response::new(request.label);
    settle_later(sb, FIND_MS, find_one(request.email))
        .then_promise(sb, move |sb, user| {
            let is_match = compare_password(sb, &user, request.password)?;
            Ok(settle_later(sb, COMPARE_MS, Ok(is_match)).then_promise(sb, move |sb, is_match| {
                if !is_match.is_truthy() {
                    res.send(sb, 401, "Incorrect Password")?;
                    return Ok(Promise::resolved(sb, Value::Undefined));
                }
                let payload = token_payload(sb, &user)?;
                let token = sign(sb, &payload)?;
                Ok(settle_later(sb, SIGN_MS, Ok(token)).then_promise(sb, move |sb, token| {
                    sb.set(&user, "token", token.clone())?;
                    Ok(settle_later(sb, SAVE_MS, Ok(Value::Undefined)).then(sb, move |sb, _| {
                        res.json(sb, Value::object([("token", token)]))?;
                        Ok(Value::Undefined)
                    }))
                }))
            }))
        })
        .catch(sb, move |sb, err| {
            callback(sb, request, err)?;
            Ok(Value::Undefined)
        });
}
