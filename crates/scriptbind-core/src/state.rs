//! Evaluation stack and runtime instance.
//!
//! [`State`] is the runtime side of the bridge: an evaluation stack with call
//! frames, a global namespace table and the per-instance
//! [`ClassRegistry`]. Positions are 1-based and relative to the current
//! frame, so a native function always sees its first argument at position 1.
//!
//! # Example
//!
//! ```
//! use scriptbind_core::{Function, State, Value};
//!
//! let mut state = State::new();
//! let double = Function::new("double", |state: &mut State| {
//!     let n = match state.value_at(1) {
//!         Some(Value::Integer(n)) => *n,
//!         _ => 0,
//!     };
//!     state.push(Value::Integer(n * 2))?;
//!     Ok(1)
//! });
//!
//! state.push(Value::Function(double)).unwrap();
//! state.push(Value::Integer(21)).unwrap();
//! assert_eq!(state.call(1).unwrap(), 1);
//! assert_eq!(state.value_at(1), Some(&Value::Integer(42)));
//! ```

use crate::class::{ClassRegistry, dispatch};
use crate::config::Config;
use crate::error::{ConversionError, ScriptError};
use crate::function::Function;
use crate::table::TableRef;
use crate::value::{Key, Value, ValueKind};

/// A runtime instance.
pub struct State {
    stack: Vec<Value>,
    /// Index into `stack` of the slot before position 1 of the current frame
    base: usize,
    globals: TableRef,
    registry: ClassRegistry,
    config: Config,
}

impl State {
    /// Create a state with the default configuration.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            stack: Vec::new(),
            base: 0,
            globals: TableRef::namespace(),
            registry: ClassRegistry::new(),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The global namespace table.
    pub fn globals(&self) -> &TableRef {
        &self.globals
    }

    pub fn registry(&self) -> &ClassRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ClassRegistry {
        &mut self.registry
    }

    // ========================================================================
    // Stack access
    // ========================================================================

    /// Number of values in the current frame.
    pub fn top(&self) -> usize {
        self.stack.len() - self.base
    }

    /// Resize the current frame, truncating or padding with nil.
    pub fn set_top(&mut self, top: usize) {
        self.stack.resize(self.base + top, Value::Nil);
    }

    /// Push a value, failing when the configured depth is reached.
    pub fn push(&mut self, value: Value) -> Result<(), ConversionError> {
        if self.stack.len() >= self.config.max_stack_depth {
            return Err(ConversionError::StackOverflow {
                limit: self.config.max_stack_depth,
            });
        }
        self.stack.push(value);
        Ok(())
    }

    /// Pop the topmost value of the current frame.
    pub fn pop(&mut self) -> Option<Value> {
        if self.top() == 0 {
            return None;
        }
        self.stack.pop()
    }

    /// Value at a 1-based position of the current frame.
    pub fn value_at(&self, pos: usize) -> Option<&Value> {
        if pos == 0 || pos > self.top() {
            return None;
        }
        self.stack.get(self.base + pos - 1)
    }

    /// Type tag at a position; out-of-range positions read as nil.
    pub fn kind_at(&self, pos: usize) -> ValueKind {
        self.value_at(pos).map_or(ValueKind::Nil, Value::kind)
    }

    // ========================================================================
    // Calls
    // ========================================================================

    /// Call the value sitting below the topmost `nargs` values.
    ///
    /// On success the callee and arguments are replaced by the results and
    /// the result count is returned. On failure the callee and everything
    /// above it are removed before the error is returned, so the caller's
    /// frame is left exactly as it was before the callee was pushed.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn call(&mut self, nargs: usize) -> Result<usize, ScriptError> {
        if nargs >= self.top() {
            return Err(ScriptError::runtime(format!(
                "call expects a callee below {} arguments",
                nargs
            )));
        }
        let func_index = self.stack.len() - nargs - 1;
        let function = match self.resolve_callee(&self.stack[func_index]) {
            Ok(function) => function,
            Err(err) => {
                self.stack.truncate(func_index);
                return Err(err);
            }
        };
        self.stack.remove(func_index);

        let saved_base = self.base;
        self.base = func_index;
        let outcome = match function.call(self) {
            Ok(results) => {
                let results = results.min(self.top());
                let first = self.stack.len() - results;
                self.stack.drain(func_index..first);
                Ok(results)
            }
            Err(err) => {
                self.stack.truncate(func_index);
                Err(err)
            }
        };
        self.base = saved_base;
        outcome
    }

    /// Call a function with the given arguments and collect its results.
    ///
    /// The stack is left as it was on both success and failure.
    pub fn invoke(&mut self, function: &Function, args: &[Value]) -> Result<Vec<Value>, ScriptError> {
        let top = self.top();
        let outcome = self.invoke_at(top, Value::Function(function.clone()), args);
        self.set_top(top);
        outcome
    }

    fn invoke_at(&mut self, top: usize, callee: Value, args: &[Value]) -> Result<Vec<Value>, ScriptError> {
        self.push(callee)?;
        for arg in args {
            self.push(arg.clone())?;
        }
        self.call(args.len())?;
        Ok(self.stack.split_off(self.base + top))
    }

    fn resolve_callee(&self, callee: &Value) -> Result<Function, ScriptError> {
        match callee {
            Value::Function(function) => Ok(function.clone()),
            Value::Table(table) => table.call_handler().ok_or(ScriptError::NotCallable {
                kind: callee.type_name(),
            }),
            other => Err(ScriptError::NotCallable {
                kind: other.type_name(),
            }),
        }
    }

    // ========================================================================
    // Indexing
    // ========================================================================

    /// Read `target[key]`, dispatching through the class for objects.
    pub fn get_field(&mut self, target: &Value, key: &str) -> Result<Value, ScriptError> {
        match target {
            Value::Table(table) => Ok(table.get_str(key).unwrap_or_default()),
            Value::Object(object) => dispatch::index(self, object, key),
            other => Err(ScriptError::NotIndexable {
                kind: other.type_name(),
            }),
        }
    }

    /// Assign `target[key] = value`, honoring table guards and writers.
    pub fn set_field(&mut self, target: &Value, key: &str, value: Value) -> Result<(), ScriptError> {
        match target {
            Value::Table(table) => table.assign(Key::from(key), value, self.config.name_conflict),
            Value::Object(object) => dispatch::newindex(self, object, key, value),
            other => Err(ScriptError::NotIndexable {
                kind: other.type_name(),
            }),
        }
    }

    /// Read a global.
    pub fn global(&self, name: &str) -> Value {
        self.globals.get_str(name).unwrap_or_default()
    }

    // ========================================================================
    // Teardown
    // ========================================================================

    /// Tear the instance down.
    ///
    /// Clears the stack and globals and invalidates every class descriptor.
    /// Wrappers still held by native code stay alive but no longer resolve.
    pub fn close(&mut self) {
        self.stack.clear();
        self.base = 0;
        self.globals.clear();
        self.registry.clear();
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for State {
    fn drop(&mut self) {
        self.close();
    }
}
