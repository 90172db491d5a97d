//! Overload chains and the argument binder.
//!
//! Every name a script can call is backed by an [`OverloadSet`]: an ordered
//! list of candidates, each pairing a [`Binder`] (the declared parameter
//! list plus bound trailing defaults) with a type-erased invoker. A call
//! walks the candidates in registration order and commits to the first one
//! whose binder accepts the arguments in the current frame.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use scriptbind_core::{
    Class, ConversionError, FromStack, ObjRef, RegistrationError, ScriptError, State, ToStack,
    Value,
};

/// Type-erased body of a candidate.
pub type Invoker = Rc<dyn Fn(&mut State) -> Result<usize, ScriptError>>;

/// Where an overload set is bound; decides the error raised when no
/// candidate matches.
#[derive(Clone)]
pub enum Site {
    /// Free function or static function
    Function { name: Rc<str> },
    /// Member function; position 1 must hold an instance of the class
    Member {
        class: &'static str,
        member: Rc<str>,
        this_test: fn(&State, usize) -> bool,
    },
    /// Calling the class table (embedded construction)
    Construct { class: &'static str },
    /// The `new` family on the class table
    New { class: &'static str },
}

impl Site {
    pub fn function(name: &str) -> Self {
        Site::Function { name: Rc::from(name) }
    }

    pub fn member<T: Class>(member: &str) -> Self {
        Site::Member {
            class: T::NAME,
            member: Rc::from(member),
            this_test: ObjRef::<T>::test,
        }
    }

    /// Position of the first declared parameter.
    fn first_arg(&self) -> usize {
        match self {
            Site::Member { .. } => 2,
            _ => 1,
        }
    }

    fn mismatch(&self) -> ScriptError {
        match self {
            Site::Function { name } => ScriptError::WrongParams {
                name: name.to_string(),
            },
            Site::Member { class, member, .. } => ScriptError::WrongMemberParams {
                class: class.to_string(),
                member: member.to_string(),
            },
            Site::Construct { class } => ScriptError::WrongConstructParams {
                class: class.to_string(),
            },
            Site::New { class } => ScriptError::WrongNewParams {
                class: class.to_string(),
            },
        }
    }
}

impl fmt::Debug for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Site::Function { name } => write!(f, "Function({})", name),
            Site::Member { class, member, .. } => write!(f, "Member({}:{})", class, member),
            Site::Construct { class } => write!(f, "Construct({})", class),
            Site::New { class } => write!(f, "New({})", class),
        }
    }
}

/// Error for a member call whose `self` is not a live instance.
pub(crate) fn invalid_object(state: &State, class: &str, member: &str) -> ScriptError {
    ScriptError::InvalidObject {
        class: class.to_string(),
        member: member.to_string(),
        value: state.value_at(1).map_or_else(|| "nil".to_string(), ToString::to_string),
    }
}

// ============================================================================
// Binder
// ============================================================================

/// One declared parameter.
#[derive(Clone, Copy)]
pub struct ParamSpec {
    pub width: usize,
    pub test: fn(&State, usize) -> bool,
    pub type_name: &'static str,
}

impl ParamSpec {
    pub fn of<A: FromStack>() -> Self {
        Self {
            width: A::WIDTH,
            test: A::test,
            type_name: std::any::type_name::<A>(),
        }
    }
}

impl fmt::Debug for ParamSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.type_name, self.width)
    }
}

/// Declared parameters of a candidate together with its bound defaults.
///
/// Parameters from `default_start` on have a default: when the arguments
/// run out before such a parameter, its encoded default is used instead.
#[derive(Clone, Debug)]
pub struct Binder {
    params: Vec<ParamSpec>,
    default_start: usize,
    defaults: Vec<Vec<Value>>,
}

impl Binder {
    pub fn new(params: Vec<ParamSpec>) -> Self {
        let default_start = params.len();
        Self {
            params,
            default_start,
            defaults: Vec::new(),
        }
    }

    /// Bind trailing defaults.
    ///
    /// The values are pushed on `state`, split across the trailing
    /// parameters by slot width, checked with each parameter's `test`, and
    /// kept as encoded values. The stack is left unchanged.
    pub fn with_defaults<D: ToStack>(
        mut self,
        state: &mut State,
        name: &str,
        defaults: D,
    ) -> Result<Self, RegistrationError> {
        let invalid = |source: ConversionError| RegistrationError::InvalidDefault {
            name: name.to_string(),
            source,
        };

        let top = state.top();
        let pushed = defaults.push(state).map_err(invalid)?;
        let mut values: Vec<Value> = (top + 1..=top + pushed)
            .map(|pos| state.value_at(pos).cloned().unwrap_or_default())
            .collect();
        state.set_top(top);

        let mut groups = Vec::new();
        let mut default_start = self.params.len();
        for param in self.params.iter().rev() {
            if values.is_empty() {
                break;
            }
            if param.width > values.len() {
                return Err(invalid(ConversionError::Failed {
                    message: format!("default values do not fill parameter {}", param.type_name),
                }));
            }
            groups.push(values.split_off(values.len() - param.width));
            default_start -= 1;
        }
        if !values.is_empty() {
            return Err(invalid(ConversionError::Failed {
                message: format!("{} default values left over", values.len()),
            }));
        }
        groups.reverse();

        for (param, group) in self.params[default_start..].iter().zip(&groups) {
            let pushed = group.iter().try_for_each(|value| state.push(value.clone()));
            let accepted = pushed.is_ok() && (param.test)(state, top + 1);
            let actual = state.kind_at(top + 1).name();
            state.set_top(top);
            pushed.map_err(invalid)?;
            if !accepted {
                return Err(invalid(ConversionError::TypeMismatch {
                    expected: param.type_name,
                    actual,
                }));
            }
        }

        self.default_start = default_start;
        self.defaults = groups;
        Ok(self)
    }

    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    /// Index of the first parameter with a bound default.
    pub fn default_start(&self) -> usize {
        self.default_start
    }

    /// Check the current frame against the declared parameters, starting
    /// at position `first`. Never mutates the stack.
    pub fn accepts(&self, state: &State, first: usize) -> bool {
        let top = state.top() + 1 - first.min(state.top() + 1);
        let mut cursor = 0;
        for (index, param) in self.params.iter().enumerate() {
            if cursor < top {
                if !(param.test)(state, first + cursor) {
                    return false;
                }
                cursor += param.width;
            } else if index < self.default_start && param.width > 0 {
                return false;
            }
        }
        cursor == top
    }

    /// Push the defaults of every parameter the arguments did not reach.
    ///
    /// Called after [`accepts`](Self::accepts) succeeded, so the frame
    /// afterwards holds a complete argument list.
    pub fn fill_defaults(&self, state: &mut State, first: usize) -> Result<(), ConversionError> {
        let supplied = state.top() + 1 - first.min(state.top() + 1);
        let mut cursor = 0;
        for (index, param) in self.params.iter().enumerate() {
            if cursor < supplied {
                cursor += param.width;
            } else if index >= self.default_start {
                for value in &self.defaults[index - self.default_start] {
                    state.push(value.clone())?;
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// Overload sets
// ============================================================================

/// One overload: how to test the arguments and what to run.
pub struct Candidate {
    pub binder: Binder,
    pub invoke: Invoker,
}

impl Candidate {
    pub fn new(binder: Binder, invoke: Invoker) -> Self {
        Self { binder, invoke }
    }
}

/// All overloads bound under one name.
pub struct OverloadSet {
    site: Site,
    candidates: RefCell<Vec<Rc<Candidate>>>,
}

impl OverloadSet {
    pub fn new(site: Site, first: Candidate) -> Self {
        Self {
            site,
            candidates: RefCell::new(vec![Rc::new(first)]),
        }
    }

    /// Append a candidate at the end of the chain.
    pub fn push(&self, candidate: Candidate) {
        self.candidates.borrow_mut().push(Rc::new(candidate));
    }

    pub fn len(&self) -> usize {
        self.candidates.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.borrow().is_empty()
    }

    pub fn site(&self) -> &Site {
        &self.site
    }

    /// Index of the candidate that would handle the current frame.
    pub fn select(&self, state: &State) -> Option<usize> {
        let first = self.site.first_arg();
        self.candidates
            .borrow()
            .iter()
            .position(|candidate| candidate.binder.accepts(state, first))
    }
}

impl scriptbind_core::NativeCallable for OverloadSet {
    #[cfg_attr(feature = "profiling", profiling::function)]
    fn call(&self, state: &mut State) -> Result<usize, ScriptError> {
        if let Site::Member {
            class,
            member,
            this_test,
        } = &self.site
        {
            if !this_test(state, 1) {
                return Err(invalid_object(state, class, member));
            }
        }

        let first = self.site.first_arg();
        let chosen = self
            .candidates
            .borrow()
            .iter()
            .find(|candidate| candidate.binder.accepts(state, first))
            .cloned();
        let Some(candidate) = chosen else {
            return Err(self.site.mismatch());
        };

        candidate.binder.fill_defaults(state, first)?;
        (candidate.invoke)(state)
    }
}

impl fmt::Debug for OverloadSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverloadSet")
            .field("site", &self.site)
            .field("candidates", &self.len())
            .finish()
    }
}
