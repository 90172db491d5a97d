//! Script tables and their assignment guards.
//!
//! Every table has a [`TableKind`]. Namespace, class and enum tables keep the
//! symbols installed by registration in a separate *bound* layer; lookups
//! check script-assigned entries first and fall back to the bound layer,
//! while assignments go through [`TableRef::assign`], which applies the
//! kind-specific guard:
//!
//! | kind | assignment to a bound key | assignment to a new key |
//! |---|---|---|
//! | plain | n/a | stored |
//! | namespace | rejected per [`ConflictPolicy`] | stored |
//! | class | stored (shadows) | error |
//! | enum | error | error |

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::class::ClassId;
use crate::config::ConflictPolicy;
use crate::error::ScriptError;
use crate::function::Function;
use crate::value::{Key, Value};

/// What a table represents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableKind {
    Plain,
    Namespace,
    Class { class: ClassId, name: Rc<str> },
    Enum { name: Rc<str> },
}

/// Table storage.
#[derive(Debug)]
pub struct Table {
    kind: TableKind,
    entries: FxHashMap<Key, Value>,
    bound: FxHashMap<Key, Value>,
    call: Option<Function>,
}

/// Shared handle to a [`Table`].
///
/// Borrows of the inner table never outlive a single method call, so native
/// code running inside a lookup can freely touch the same table.
#[derive(Clone)]
pub struct TableRef(Rc<RefCell<Table>>);

impl TableRef {
    /// Create an empty table of the given kind.
    pub fn new(kind: TableKind) -> Self {
        TableRef(Rc::new(RefCell::new(Table {
            kind,
            entries: FxHashMap::default(),
            bound: FxHashMap::default(),
            call: None,
        })))
    }

    pub fn plain() -> Self {
        Self::new(TableKind::Plain)
    }

    pub fn namespace() -> Self {
        Self::new(TableKind::Namespace)
    }

    pub fn kind(&self) -> TableKind {
        self.0.borrow().kind.clone()
    }

    /// Look up a key: script entries first, then bound symbols.
    pub fn get(&self, key: &Key) -> Option<Value> {
        let table = self.0.borrow();
        table
            .entries
            .get(key)
            .or_else(|| table.bound.get(key))
            .cloned()
    }

    /// Convenience lookup by string key.
    pub fn get_str(&self, key: &str) -> Option<Value> {
        self.get(&Key::from(key))
    }

    /// Look up a key in the bound layer only.
    pub fn get_bound(&self, key: &Key) -> Option<Value> {
        self.0.borrow().bound.get(key).cloned()
    }

    /// Store into the script layer without any guard. Nil removes the entry.
    pub fn raw_set(&self, key: Key, value: Value) {
        let mut table = self.0.borrow_mut();
        if value.is_nil() {
            table.entries.remove(&key);
        } else {
            table.entries.insert(key, value);
        }
    }

    /// Install a registered symbol, replacing any previous bound value.
    ///
    /// A script entry under the same key is evicted so the new symbol is
    /// what lookups see.
    pub fn bind(&self, key: Key, value: Value) {
        let mut table = self.0.borrow_mut();
        if table.entries.remove(&key).is_some() {
            tracing::debug!(key = %key, "registered symbol replaces script value");
        }
        table.bound.insert(key, value);
    }

    /// Script-side assignment, guarded according to the table kind.
    pub fn assign(&self, key: Key, value: Value, policy: ConflictPolicy) -> Result<(), ScriptError> {
        let kind = self.kind();
        match kind {
            TableKind::Plain => {
                self.raw_set(key, value);
                Ok(())
            }
            TableKind::Namespace => {
                if self.get_bound(&key).is_none() {
                    self.raw_set(key, value);
                    return Ok(());
                }
                match policy {
                    ConflictPolicy::Warn => {
                        tracing::warn!(key = %key, "new index causing a name conflict");
                        Ok(())
                    }
                    ConflictPolicy::Error => Err(ScriptError::NameConflict {
                        key: key.to_string(),
                    }),
                }
            }
            TableKind::Class { name, .. } => {
                if self.get(&key).is_some() {
                    self.raw_set(key, value);
                    Ok(())
                } else {
                    Err(ScriptError::ModifyMissingStatic {
                        class: name.to_string(),
                        key: key.to_string(),
                        value: value.to_string(),
                    })
                }
            }
            TableKind::Enum { name } => Err(ScriptError::ModifyEnum {
                name: name.to_string(),
            }),
        }
    }

    /// Handler invoked when the table itself is called.
    pub fn call_handler(&self) -> Option<Function> {
        self.0.borrow().call.clone()
    }

    pub fn set_call_handler(&self, function: Function) {
        self.0.borrow_mut().call = Some(function);
    }

    /// Number of entries across both layers.
    pub fn len(&self) -> usize {
        let table = self.0.borrow();
        table.entries.len() + table.bound.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry, bound symbol and call handler.
    pub fn clear(&self) {
        let mut table = self.0.borrow_mut();
        table.entries.clear();
        table.bound.clear();
        table.call = None;
    }

    /// Check whether two handles refer to the same table.
    pub fn ptr_eq(&self, other: &TableRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            TableKind::Class { name, .. } => write!(f, "class[{}]", name),
            TableKind::Enum { name } => write!(f, "enum[{}]", name),
            TableKind::Plain | TableKind::Namespace => write!(f, "table: {:p}", Rc::as_ptr(&self.0)),
        }
    }
}

impl fmt::Debug for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
