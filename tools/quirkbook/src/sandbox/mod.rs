//! Per-run execution context for snippet bodies.
//!
//! A [`Sandbox`] owns everything a run can observe: its console transcript,
//! its global object and scope chain, its delegation tables, and its event
//! loop. Nothing inside is shared with another run.

pub mod env;
pub mod event_loop;
pub mod promise;
pub mod realm;
pub mod value;

use crate::runtime::{Clock, Terminal};
use crate::types::ThrownError;
use env::Env;
use event_loop::EventLoop;
use promise::Promise;
use realm::{Realm, Slot};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use value::Value;

/// What a snippet body raises. Uncaught, it ends the run in `Threw`.
pub type Thrown = ThrownError;

/// Longest single wait between interrupt checks while honoring real timers.
const REAL_TIMER_SLICE: Duration = Duration::from_millis(20);

pub struct SandboxOptions {
    pub simulate_timers: bool,
    pub capture_console: bool,
    pub clock: Arc<dyn Clock>,
    pub terminal: Arc<dyn Terminal>,
    pub interrupt: Arc<AtomicBool>,
}

pub struct Sandbox {
    simulate_timers: bool,
    capture_console: bool,
    clock: Arc<dyn Clock>,
    terminal: Arc<dyn Terminal>,
    interrupt: Arc<AtomicBool>,
    started_at: SystemTime,
    lines: Vec<String>,
    event_loop: EventLoop,
    last_fired_ms: u64,
    realm: Realm,
    global_this: Value,
    global_env: Env,
    rejections: Vec<Promise>,
}

impl Sandbox {
    pub fn new(options: SandboxOptions) -> Self {
        let global_this = Value::empty_object();
        let started_at = options.clock.now();
        Self {
            simulate_timers: options.simulate_timers,
            capture_console: options.capture_console,
            clock: options.clock,
            terminal: options.terminal,
            interrupt: options.interrupt,
            started_at,
            lines: Vec::new(),
            event_loop: EventLoop::default(),
            last_fired_ms: 0,
            realm: Realm::new(),
            global_env: Env::global(global_this.clone()),
            global_this,
            rejections: Vec::new(),
        }
    }

    /// `console.log(...args)`: arguments rendered and joined by single spaces.
    pub fn log(&mut self, args: &[Value]) -> Result<(), Thrown> {
        let line = args
            .iter()
            .map(Value::to_display)
            .collect::<Vec<_>>()
            .join(" ");
        self.emit(line)
    }

    pub fn log_str(&mut self, line: &str) -> Result<(), Thrown> {
        self.emit(line.to_string())
    }

    fn emit(&mut self, line: String) -> Result<(), Thrown> {
        self.check_interrupt()?;
        if self.capture_console {
            self.lines.push(line);
            return Ok(());
        }
        self.terminal
            .write_line(&line)
            .map_err(|e| Thrown::other(e.to_string()))
    }

    pub fn set_timeout(
        &mut self,
        delay_ms: u64,
        callback: impl FnOnce(&mut Sandbox) -> Result<(), Thrown> + 'static,
    ) {
        self.event_loop.schedule(delay_ms, Box::new(callback));
    }

    pub fn schedule_call(&mut self, callback: Value, delay_ms: u64, args: Vec<Value>) {
        self.set_timeout(delay_ms, move |sb| {
            sb.call(&callback, &Value::Undefined, &args)?;
            Ok(())
        });
    }

    pub fn queue_microtask(
        &mut self,
        task: impl FnOnce(&mut Sandbox) -> Result<(), Thrown> + 'static,
    ) {
        self.event_loop.enqueue_microtask(Box::new(task));
    }

    /// `Date.now()`. Under simulated timers the clock only moves when a timer
    /// fires, so a busy-wait on it never finishes.
    pub fn date_now(&mut self) -> Result<f64, Thrown> {
        self.check_interrupt()?;
        let now = if self.simulate_timers {
            self.started_at + Duration::from_millis(self.event_loop.now_ms())
        } else {
            self.clock.now()
        };
        let millis = now
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis())
            .unwrap_or(0);
        Ok(millis as f64)
    }

    pub fn random(&mut self) -> Result<f64, Thrown> {
        let mut bytes = [0u8; 8];
        getrandom::fill(&mut bytes).map_err(|e| Thrown::other(format!("entropy unavailable: {e}")))?;
        Ok((u64::from_le_bytes(bytes) >> 11) as f64 / (1u64 << 53) as f64)
    }

    pub fn global_env(&self) -> Env {
        self.global_env.clone()
    }

    pub fn global_this(&self) -> Value {
        self.global_this.clone()
    }

    pub fn realm(&self) -> &Realm {
        &self.realm
    }

    /// `target[key]`: own properties first, then the delegation chain.
    pub fn get(&mut self, target: &Value, key: &str) -> Result<Value, Thrown> {
        match target {
            Value::Undefined | Value::Null => {
                return Err(Thrown::type_error(format!(
                    "Cannot read properties of {} (reading '{key}')",
                    target.to_js_string()
                )))
            }
            Value::Array(items) => {
                let items = items.borrow();
                if key == "length" {
                    return Ok(Value::Num(items.len() as f64));
                }
                if let Ok(index) = key.parse::<usize>() {
                    return Ok(items.get(index).cloned().unwrap_or(Value::Undefined));
                }
            }
            Value::Str(s) if key == "length" => {
                return Ok(Value::Num(s.encode_utf16().count() as f64));
            }
            Value::Object(object) => {
                if let Some(value) = object.borrow().get_own(key) {
                    return Ok(value);
                }
            }
            Value::Function(function) if key == "name" => {
                return Ok(Value::from(function.name()));
            }
            Value::Error(error) => match key {
                "message" => return Ok(Value::from(error.message.as_str())),
                "name" => return Ok(Value::from(error.kind.as_str())),
                _ => {}
            },
            _ => {}
        }
        let Some(table) = self.realm.table_for(target) else {
            return Ok(Value::Undefined);
        };
        match table.resolve(key) {
            Some(Slot::Method(value)) => Ok(value),
            Some(Slot::Getter(getter)) => getter.invoke(self, target, &[]),
            None => Ok(Value::Undefined),
        }
    }

    /// `target[key] = value`. Writes to primitives are silently dropped.
    pub fn set(&mut self, target: &Value, key: &str, value: Value) -> Result<(), Thrown> {
        match target {
            Value::Undefined | Value::Null => Err(Thrown::type_error(format!(
                "Cannot set properties of {} (setting '{key}')",
                target.to_js_string()
            ))),
            Value::Object(object) => {
                object.borrow_mut().set_own(key, value);
                Ok(())
            }
            Value::Array(items) => {
                if let Ok(index) = key.parse::<usize>() {
                    let mut items = items.borrow_mut();
                    if index >= items.len() {
                        items.resize(index + 1, Value::Undefined);
                    }
                    items[index] = value;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    pub fn invoke(&mut self, target: &Value, method: &str, args: &[Value]) -> Result<Value, Thrown> {
        let callee = self.get(target, method)?;
        match &callee {
            Value::Function(function) => {
                self.check_interrupt()?;
                function.invoke(self, target, args)
            }
            _ => Err(Thrown::type_error(format!("{method} is not a function"))),
        }
    }

    pub fn call(&mut self, callee: &Value, this: &Value, args: &[Value]) -> Result<Value, Thrown> {
        self.check_interrupt()?;
        match callee {
            Value::Function(function) => function.invoke(self, this, args),
            other => Err(Thrown::type_error(format!(
                "{} is not a function",
                other.inspect()
            ))),
        }
    }

    /// Calls a method pulled off its object, as `const f = obj.method; f()`
    /// does: the receiver is lost.
    pub fn call_detached(&mut self, callee: &Value, args: &[Value]) -> Result<Value, Thrown> {
        self.call(callee, &Value::Undefined, args)
    }

    pub fn json_stringify(&self, value: &Value) -> Result<Value, Thrown> {
        match value.to_json() {
            Some(json) => serde_json::to_string(&json)
                .map(Value::from)
                .map_err(|e| Thrown::type_error(e.to_string())),
            None => Ok(Value::Undefined),
        }
    }

    pub fn delay(&mut self, delay_ms: u64, value: Value) -> Promise {
        let promise = Promise::pending();
        let target = promise.clone();
        self.set_timeout(delay_ms, move |sb| {
            target.resolve(sb, value);
            Ok(())
        });
        promise
    }

    /// Calls an `async function` body. The body runs synchronously up to its
    /// end; its result or exception settles the returned promise.
    pub fn run_async(
        &mut self,
        body: impl FnOnce(&mut Sandbox) -> Result<Value, Thrown>,
    ) -> Result<Promise, Thrown> {
        match body(self) {
            Ok(value) => Ok(Promise::resolved(self, value)),
            Err(thrown) if thrown.is_interrupt() => Err(thrown),
            Err(thrown) => Ok(Promise::rejected(self, Value::Error(thrown))),
        }
    }

    pub(crate) fn track_rejection(&mut self, promise: Promise) {
        self.rejections.push(promise);
    }

    pub(crate) fn interrupted(&self) -> bool {
        self.interrupt.load(Ordering::SeqCst)
    }

    fn check_interrupt(&self) -> Result<(), Thrown> {
        if self.interrupted() {
            return Err(Thrown::interrupted());
        }
        Ok(())
    }

    fn drain_microtasks(&mut self) -> Result<(), Thrown> {
        while let Some(task) = self.event_loop.pop_microtask() {
            self.check_interrupt()?;
            task(self)?;
        }
        Ok(())
    }

    /// Drains microtasks, then fires timers in deadline order until none are
    /// left, draining microtasks after each one. Ends with an error when any
    /// promise rejection went unhandled.
    pub(crate) fn run_event_loop(&mut self) -> Result<(), Thrown> {
        self.drain_microtasks()?;
        while let Some(due) = self.event_loop.next_due() {
            if !self.simulate_timers {
                self.wait_until(due)?;
            }
            let Some((due, task)) = self.event_loop.pop_timer() else {
                break;
            };
            self.last_fired_ms = due;
            self.check_interrupt()?;
            task(self)?;
            self.drain_microtasks()?;
        }
        match self.unhandled_rejection() {
            Some(thrown) => Err(thrown),
            None => Ok(()),
        }
    }

    fn wait_until(&self, due_ms: u64) -> Result<(), Thrown> {
        let deadline = self.started_at + Duration::from_millis(due_ms);
        loop {
            self.check_interrupt()?;
            let now = self.clock.now();
            if now >= deadline {
                return Ok(());
            }
            let next = (now + REAL_TIMER_SLICE).min(deadline);
            self.clock
                .sleep_until(next)
                .map_err(|e| Thrown::other(e.to_string()))?;
        }
    }

    fn unhandled_rejection(&self) -> Option<Thrown> {
        self.rejections
            .iter()
            .find_map(Promise::unhandled_reason)
            .map(|reason| match reason {
                Value::Error(error) => error,
                other => Thrown::other(format!("Uncaught (in promise) {}", other.inspect())),
            })
    }

    pub fn elapsed_virtual_ms(&self) -> u64 {
        self.last_fired_ms
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::{Sandbox, SandboxOptions};
    use crate::runtime::{FakeClock, FakeTerminal};
    use crate::sandbox::promise::Promise;
    use crate::sandbox::value::Value;
    use crate::types::ErrorKind;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    pub(crate) fn sandbox() -> Sandbox {
        Sandbox::new(SandboxOptions {
            simulate_timers: true,
            capture_console: true,
            clock: Arc::new(FakeClock::default()),
            terminal: Arc::new(FakeTerminal::new()),
            interrupt: Arc::new(AtomicBool::new(false)),
        })
    }

    #[test]
    fn console_joins_arguments_with_single_spaces() {
        let mut sb = sandbox();
        sb.log(&[Value::from("has: "), Value::from(5)]).expect("log");
        sb.log(&[Value::from(1), Value::from(2)]).expect("log");
        assert_eq!(sb.lines(), ["has:  5", "1 2"]);
    }

    #[test]
    fn timers_fire_after_synchronous_code_in_deadline_order() {
        let mut sb = sandbox();
        sb.set_timeout(1000, |sb| sb.log_str("One"));
        sb.set_timeout(0, |sb| sb.log_str("Two"));
        sb.log_str("Three").expect("log");
        sb.run_event_loop().expect("loop");
        assert_eq!(sb.lines(), ["Three", "Two", "One"]);
        assert_eq!(sb.elapsed_virtual_ms(), 1000);
    }

    #[test]
    fn microtasks_run_before_the_next_timer() {
        let mut sb = sandbox();
        sb.set_timeout(0, |sb| sb.log_str("timer"));
        sb.queue_microtask(|sb| sb.log_str("microtask"));
        sb.log_str("sync").expect("log");
        sb.run_event_loop().expect("loop");
        assert_eq!(sb.lines(), ["sync", "microtask", "timer"]);
    }

    #[test]
    fn reading_a_property_of_undefined_is_a_type_error() {
        let mut sb = sandbox();
        let err = sb.get(&Value::Undefined, "name").expect_err("must throw");
        assert_eq!(err.kind, ErrorKind::TypeError);
        assert_eq!(err.message, "Cannot read properties of undefined (reading 'name')");
    }

    #[test]
    fn detached_methods_lose_their_receiver() {
        let mut sb = sandbox();
        let person = Value::object([("name", Value::from("Jordan"))]);
        let get_name = Value::function("getName", |sb, this, _| {
            if matches!(this, Value::Undefined) {
                return Ok(Value::Undefined);
            }
            sb.get(this, "name")
        });
        sb.set(&person, "getName", get_name.clone()).expect("set");
        assert_eq!(sb.invoke(&person, "getName", &[]).expect("call").to_display(), "Jordan");
        assert_eq!(sb.call_detached(&get_name, &[]).expect("call").to_display(), "undefined");
    }

    #[test]
    fn first_settlement_wins() {
        let mut sb = sandbox();
        let promise = Promise::pending();
        assert!(promise.resolve(&mut sb, Value::from(2)));
        assert!(!promise.resolve(&mut sb, Value::from(3)));
        assert!(!promise.reject(&mut sb, Value::from("late")));
        promise.then(&mut sb, |sb, value| {
            sb.log(&[value])?;
            Ok(Value::Undefined)
        });
        sb.run_event_loop().expect("loop");
        assert_eq!(sb.lines(), ["2"]);
    }

    #[test]
    fn unhandled_rejection_fails_the_run() {
        let mut sb = sandbox();
        Promise::rejected(&mut sb, Value::from("boom"));
        let err = sb.run_event_loop().expect_err("unhandled");
        assert!(err.message.contains("boom"));
    }

    #[test]
    fn caught_rejection_is_not_reported() {
        let mut sb = sandbox();
        let promise = Promise::rejected(&mut sb, Value::from("boom"));
        promise.catch(&mut sb, |sb, reason| {
            sb.log(&[Value::from("caught"), reason])?;
            Ok(Value::Undefined)
        });
        sb.run_event_loop().expect("loop");
        assert_eq!(sb.lines(), ["caught boom"]);
    }

    #[test]
    fn promise_all_waits_for_the_slowest_input() {
        let mut sb = sandbox();
        let fast = sb.delay(10, Value::from("a"));
        let slow = sb.delay(30, Value::from("b"));
        Promise::all(&mut sb, vec![slow, fast]).then(&mut sb, |sb, values| {
            sb.log(&[values])?;
            Ok(Value::Undefined)
        });
        sb.run_event_loop().expect("loop");
        assert_eq!(sb.lines(), ["[ 'b', 'a' ]"]);
        assert_eq!(sb.elapsed_virtual_ms(), 30);
    }

    #[test]
    fn interrupt_stops_a_busy_wait() {
        let interrupt = Arc::new(AtomicBool::new(false));
        let mut sb = Sandbox::new(SandboxOptions {
            simulate_timers: true,
            capture_console: true,
            clock: Arc::new(FakeClock::default()),
            terminal: Arc::new(FakeTerminal::new()),
            interrupt: Arc::clone(&interrupt),
        });
        let start = sb.date_now().expect("now");
        interrupt.store(true, Ordering::SeqCst);
        let err = sb.date_now().expect_err("interrupted");
        assert!(err.is_interrupt());
        assert_eq!(start, 0.0);
    }

    #[test]
    fn uncaptured_console_goes_to_the_terminal() {
        let terminal = FakeTerminal::new();
        let mut sb = Sandbox::new(SandboxOptions {
            simulate_timers: true,
            capture_console: false,
            clock: Arc::new(FakeClock::default()),
            terminal: Arc::new(terminal.clone()),
            interrupt: Arc::new(AtomicBool::new(false)),
        });
        sb.log_str("passthrough").expect("log");
        assert!(sb.lines().is_empty());
        assert_eq!(terminal.written_lines(), vec!["passthrough"]);
    }
}
