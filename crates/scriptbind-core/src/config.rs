//! Runtime-instance configuration.

/// What happens when a script assigns to a name bound by registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictPolicy {
    /// Keep the registered value and log a warning
    #[default]
    Warn,
    /// Keep the registered value and fail the assignment
    Error,
}

/// Settings for a [`State`](crate::State).
///
/// ```
/// use scriptbind_core::{Config, ConflictPolicy};
///
/// let config = Config::default()
///     .with_max_stack_depth(4096)
///     .with_name_conflict(ConflictPolicy::Error);
/// assert_eq!(config.max_stack_depth, 4096);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Maximum number of stack slots across all frames
    pub max_stack_depth: usize,
    /// Policy for assignments that collide with registered names
    pub name_conflict: ConflictPolicy,
}

impl Config {
    /// Default maximum stack depth.
    pub const DEFAULT_MAX_STACK_DEPTH: usize = 1_000_000;

    pub fn with_max_stack_depth(mut self, depth: usize) -> Self {
        self.max_stack_depth = depth;
        self
    }

    pub fn with_name_conflict(mut self, policy: ConflictPolicy) -> Self {
        self.name_conflict = policy;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_stack_depth: Self::DEFAULT_MAX_STACK_DEPTH,
            name_conflict: ConflictPolicy::Warn,
        }
    }
}
