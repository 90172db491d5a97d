//! Member tables of a class.

use std::rc::Rc;

use bitflags::bitflags;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use rustc_hash::FxHashMap;

use crate::convert::ToStack;
use crate::error::ConversionError;
use crate::function::Function;
use crate::state::State;
use crate::value::Value;

bitflags! {
    /// Which tables of a class define a symbol.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MemberFlags: u8 {
        const FUNCTION = 1 << 0;
        const READER = 1 << 1;
        const WRITER = 1 << 2;
    }
}

/// Result reported by a writer function.
///
/// Writers push the status as an integer; anything outside this set is
/// treated as [`WriterStatus::UnknownFailed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(i64)]
pub enum WriterStatus {
    Succeeded = 0,
    /// The value's type is not accepted by the writer
    TypeFailed = 1,
    /// The type matched but validation rejected the value
    ValueFailed = 2,
    UnknownFailed = 3,
}

impl WriterStatus {
    /// Decode a status pushed by a writer.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Integer(code) => WriterStatus::try_from(*code).unwrap_or(WriterStatus::UnknownFailed),
            _ => WriterStatus::UnknownFailed,
        }
    }
}

impl ToStack for WriterStatus {
    fn push(self, state: &mut State) -> Result<usize, ConversionError> {
        state.push(Value::Integer(self.into()))?;
        Ok(1)
    }
}

/// Functions, readers and writers of one class.
///
/// The first registration of a name in each table wins; later insertions
/// report `false` and leave the table unchanged.
#[derive(Default)]
pub struct ClassMembers {
    functions: FxHashMap<Rc<str>, Function>,
    readers: FxHashMap<Rc<str>, Function>,
    writers: FxHashMap<Rc<str>, Function>,
}

impl ClassMembers {
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    pub fn reader(&self, name: &str) -> Option<&Function> {
        self.readers.get(name)
    }

    pub fn writer(&self, name: &str) -> Option<&Function> {
        self.writers.get(name)
    }

    pub fn insert_function(&mut self, name: &str, function: Function) -> bool {
        insert_first(&mut self.functions, name, function)
    }

    pub fn insert_reader(&mut self, name: &str, reader: Function) -> bool {
        insert_first(&mut self.readers, name, reader)
    }

    pub fn insert_writer(&mut self, name: &str, writer: Function) -> bool {
        insert_first(&mut self.writers, name, writer)
    }

    /// Tables in which `name` is defined.
    pub fn flags(&self, name: &str) -> MemberFlags {
        let mut flags = MemberFlags::empty();
        flags.set(MemberFlags::FUNCTION, self.functions.contains_key(name));
        flags.set(MemberFlags::READER, self.readers.contains_key(name));
        flags.set(MemberFlags::WRITER, self.writers.contains_key(name));
        flags
    }
}

fn insert_first(table: &mut FxHashMap<Rc<str>, Function>, name: &str, function: Function) -> bool {
    if table.contains_key(name) {
        return false;
    }
    table.insert(Rc::from(name), function);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(name: &str) -> Function {
        Function::new(name, |_: &mut State| Ok(0))
    }

    #[test]
    fn first_insertion_wins() {
        let mut members = ClassMembers::default();
        let first = noop("first");
        assert!(members.insert_function("go", first.clone()));
        assert!(!members.insert_function("go", noop("second")));
        assert!(members.function("go").unwrap().ptr_eq(&first));
    }

    #[test]
    fn flags_report_defining_tables() {
        let mut members = ClassMembers::default();
        members.insert_reader("hp", noop("hp"));
        members.insert_writer("hp", noop("hp"));
        members.insert_function("heal", noop("heal"));
        assert_eq!(members.flags("hp"), MemberFlags::READER | MemberFlags::WRITER);
        assert_eq!(members.flags("heal"), MemberFlags::FUNCTION);
        assert!(members.flags("missing").is_empty());
    }

    #[test]
    fn writer_status_decoding() {
        assert_eq!(WriterStatus::from_value(&Value::Integer(0)), WriterStatus::Succeeded);
        assert_eq!(WriterStatus::from_value(&Value::Integer(2)), WriterStatus::ValueFailed);
        assert_eq!(WriterStatus::from_value(&Value::Integer(99)), WriterStatus::UnknownFailed);
        assert_eq!(WriterStatus::from_value(&Value::Nil), WriterStatus::UnknownFailed);
        assert_eq!(i64::from(WriterStatus::TypeFailed), 1);
    }
}
