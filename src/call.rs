//! Calling script functions from native code.
//!
//! [`call_function`] resolves a dotted path such as `"game.events.on_hit"`
//! from the global table, pushes a tuple of arguments, calls the value and
//! converts its first result. [`call_method`] does the same for a member of
//! an object, passing the object as `self`.

use scriptbind_core::{ConversionError, FromStack, ScriptError, State, ToStack, Value};
use thiserror::Error;

/// Errors returned when native code calls into script values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CallError {
    /// The path does not lead to a callable value
    #[error("script function {path} not found")]
    NotFound { path: String },

    /// Arguments could not be pushed
    #[error("failed to push arguments for {path}: {source}")]
    Push {
        path: String,
        #[source]
        source: ConversionError,
    },

    /// The callee raised an error
    #[error("calling {path} failed: {source}")]
    Script {
        path: String,
        #[source]
        source: ScriptError,
    },

    /// The first result does not convert to the requested type
    #[error("{path} returned {actual}, expected {expected}")]
    WrongReturn {
        path: String,
        expected: &'static str,
        actual: &'static str,
    },
}

fn not_found(path: &str) -> CallError {
    CallError::NotFound {
        path: path.to_string(),
    }
}

/// Walk a dotted path from the global table.
fn lookup(state: &mut State, path: &str) -> Result<Value, CallError> {
    let mut current = Value::Table(state.globals().clone());
    for segment in path.split('.') {
        if segment.is_empty() {
            return Err(not_found(path));
        }
        current = state
            .get_field(&current, segment)
            .map_err(|_| not_found(path))?;
        if current.is_nil() {
            return Err(not_found(path));
        }
    }
    if !current.is_callable() {
        return Err(not_found(path));
    }
    Ok(current)
}

#[cfg_attr(feature = "profiling", profiling::function)]
fn call_value<R, A>(
    state: &mut State,
    path: &str,
    callee: Value,
    receiver: Option<Value>,
    args: A,
) -> Result<R, CallError>
where
    R: FromStack,
    A: ToStack,
{
    let top = state.top();
    let push_error = |source| CallError::Push {
        path: path.to_string(),
        source,
    };

    let pushed = (|| -> Result<usize, ConversionError> {
        state.push(callee)?;
        let mut nargs = 0;
        if let Some(receiver) = receiver {
            state.push(receiver)?;
            nargs += 1;
        }
        Ok(nargs + args.push(state)?)
    })();
    let nargs = match pushed {
        Ok(nargs) => nargs,
        Err(source) => {
            state.set_top(top);
            return Err(push_error(source));
        }
    };

    let outcome = match state.call(nargs) {
        Ok(_) if R::test(state, top + 1) => Ok(R::get(state, top + 1)),
        Ok(_) => Err(CallError::WrongReturn {
            path: path.to_string(),
            expected: std::any::type_name::<R>(),
            actual: state.kind_at(top + 1).name(),
        }),
        Err(source) => Err(CallError::Script {
            path: path.to_string(),
            source,
        }),
    };
    state.set_top(top);
    outcome
}

/// Call the script value at `path` with `args` and convert its first result.
///
/// The stack is restored on success and on every failure.
pub fn call_function<R, A>(state: &mut State, path: &str, args: A) -> Result<R, CallError>
where
    R: FromStack,
    A: ToStack,
{
    let callee = lookup(state, path)?;
    call_value(state, path, callee, None, args)
}

/// Like [`call_function`], but logs the failure and returns
/// `R::make_default()`.
pub fn call_function_or_default<R, A>(state: &mut State, path: &str, args: A) -> R
where
    R: FromStack,
    A: ToStack,
{
    call_function(state, path, args).unwrap_or_else(|err| {
        tracing::warn!(path, %err, "script call failed, using default result");
        R::make_default()
    })
}

/// Call member `name` of `object`, passing the object first.
pub fn call_method<R, A>(state: &mut State, object: &Value, name: &str, args: A) -> Result<R, CallError>
where
    R: FromStack,
    A: ToStack,
{
    let callee = state.get_field(object, name).map_err(|source| CallError::Script {
        path: name.to_string(),
        source,
    })?;
    if !callee.is_callable() {
        return Err(not_found(name));
    }
    call_value(state, name, callee, Some(object.clone()), args)
}
