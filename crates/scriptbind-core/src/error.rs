//! Error types for the binding bridge.
//!
//! Three layers, matching how far a failure travels:
//!
//! - [`ConversionError`]: a value could not be pushed or read. Argument
//!   tests never produce one (a failed test is a plain `false`).
//! - [`ScriptError`]: aborts the current script call. Raised by overload
//!   resolution, object identity checks, member dispatch and table guards.
//! - [`RegistrationError`]: enrollment of functions, classes or enums failed.

use thiserror::Error;

/// Errors that can occur when moving values across the boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    /// Type mismatch during conversion
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    /// Null light pointers cannot be pushed
    #[error("null pointer cannot be pushed")]
    NullPointer,

    /// The evaluation stack reached its configured depth
    #[error("stack overflow: depth limit of {limit} slots reached")]
    StackOverflow { limit: usize },

    /// Class objects can only be pushed after their class is registered
    #[error("class {name} is not registered with this state")]
    UnregisteredClass { name: &'static str },

    /// Generic conversion failure
    #[error("conversion failed: {message}")]
    Failed { message: String },
}

/// Errors that abort the current script-level call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScriptError {
    /// Error converting arguments or return values
    #[error("{0}")]
    Conversion(#[from] ConversionError),

    /// No overload of a free or static function accepted the arguments
    #[error("call native function[{name}] with wrong params.")]
    WrongParams { name: String },

    /// No overload of a member function accepted the arguments
    #[error("call native member function[{class}:{member}] with wrong params.")]
    WrongMemberParams { class: String, member: String },

    /// No constructor accepted the arguments (embedded construction)
    #[error("construct native class[{class}] with wrong params.")]
    WrongConstructParams { class: String },

    /// No constructor accepted the arguments (`new` family)
    #[error("new native class[{class}] with wrong params.")]
    WrongNewParams { class: String },

    /// `self` did not resolve to a live instance of the member's class
    #[error("call native member function[{class}:{member}] with invalid object {value}.")]
    InvalidObject {
        class: String,
        member: String,
        value: String,
    },

    #[error("can not find readable symbol {symbol} in an instance of {class}.")]
    SymbolNotReadable { symbol: String, class: String },

    #[error("can not find writable symbol {symbol} in an instance of {class}.")]
    SymbolNotWritable { symbol: String, class: String },

    /// Writer rejected the value's type
    #[error("The type of {value} is not suitable for symbol {symbol} in an instance of {class}.")]
    WriterTypeFailed {
        symbol: String,
        class: String,
        value: String,
    },

    /// Writer accepted the type but its validator rejected the value
    #[error("{value} is not a valid value for symbol {symbol} in an instance of {class}.")]
    WriterValueFailed {
        symbol: String,
        class: String,
        value: String,
    },

    #[error("\"{class}.{symbol} = {value}\" caused an unknown writer error.")]
    WriterUnknownFailed {
        symbol: String,
        class: String,
        value: String,
    },

    /// Enum tables are read-only
    #[error("can not modify native enum[{name}].")]
    ModifyEnum { name: String },

    /// Class tables only accept assignments to keys that already exist
    #[error("\"{class}.{key} = {value}\" tried to modify an inexistent value in a native class.")]
    ModifyMissingStatic {
        class: String,
        key: String,
        value: String,
    },

    /// Assignment to a key bound by registration
    #[error("new index \"{key}\" causing a name conflict.")]
    NameConflict { key: String },

    #[error("attempt to call a {kind} value")]
    NotCallable { kind: &'static str },

    #[error("attempt to index a {kind} value")]
    NotIndexable { kind: &'static str },

    /// Error raised by native code
    #[error("{message}")]
    Runtime { message: String },
}

impl ScriptError {
    /// Create a runtime error with a message.
    pub fn runtime(message: impl Into<String>) -> Self {
        ScriptError::Runtime {
            message: message.into(),
        }
    }
}

/// Errors that can occur while enrolling symbols.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistrationError {
    /// A bound default value could not be encoded
    #[error("default value for {name} could not be encoded: {source}")]
    InvalidDefault {
        name: String,
        #[source]
        source: ConversionError,
    },

    /// The name is already bound to something that is not an overload set
    #[error("name conflict: {name} is already registered")]
    NameConflict { name: String },

    /// A bound value could not be produced
    #[error("registration of {name} failed: {source}")]
    Script {
        name: String,
        #[source]
        source: ScriptError,
    },
}
