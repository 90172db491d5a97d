//! Member dispatch on objects.
//!
//! Reading `object.key` checks the object's own class first (functions,
//! then readers) and then walks the direct bases in declaration order,
//! depth first. The first class that defines the symbol wins. Writing
//! checks writers the same way. Repeated bases in a diamond are visited
//! once per path; no linearization is applied.

use crate::error::ScriptError;
use crate::function::Function;
use crate::object::ObjectRef;
use crate::state::State;
use crate::value::Value;

use super::{ClassId, ClassRegistry, WriterStatus};

enum Readable {
    Function(Function),
    Reader(Function),
}

fn find_readable(registry: &ClassRegistry, class: ClassId, key: &str) -> Option<Readable> {
    let descriptor = registry.descriptor(class)?;
    let members = descriptor.members();
    if let Some(function) = members.function(key) {
        return Some(Readable::Function(function.clone()));
    }
    if let Some(reader) = members.reader(key) {
        return Some(Readable::Reader(reader.clone()));
    }
    descriptor
        .supers()
        .iter()
        .find_map(|&base| find_readable(registry, base, key))
}

fn find_writer(registry: &ClassRegistry, class: ClassId, key: &str) -> Option<Function> {
    let descriptor = registry.descriptor(class)?;
    if let Some(writer) = descriptor.members().writer(key) {
        return Some(writer.clone());
    }
    descriptor
        .supers()
        .iter()
        .find_map(|&base| find_writer(registry, base, key))
}

/// The object's class, if it is still known to the registry.
fn live_class(state: &State, object: &ObjectRef) -> Option<ClassId> {
    state
        .registry()
        .descriptor_checked(object.class(), object.type_id())
        .map(|descriptor| descriptor.id())
}

/// Read `object[key]`.
///
/// Functions are returned as values; readers are invoked with the object
/// and their first result is returned.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn index(state: &mut State, object: &ObjectRef, key: &str) -> Result<Value, ScriptError> {
    let found = live_class(state, object).and_then(|class| find_readable(state.registry(), class, key));
    match found {
        Some(Readable::Function(function)) => Ok(Value::Function(function)),
        Some(Readable::Reader(reader)) => {
            let results = state.invoke(&reader, &[Value::Object(object.clone())])?;
            Ok(results.into_iter().next().unwrap_or_default())
        }
        None => Err(ScriptError::SymbolNotReadable {
            symbol: key.to_string(),
            class: object.type_name().to_string(),
        }),
    }
}

/// Assign `object[key] = value` through the first writer found.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn newindex(state: &mut State, object: &ObjectRef, key: &str, value: Value) -> Result<(), ScriptError> {
    let writer = live_class(state, object)
        .and_then(|class| find_writer(state.registry(), class, key))
        .ok_or_else(|| ScriptError::SymbolNotWritable {
            symbol: key.to_string(),
            class: object.type_name().to_string(),
        })?;

    let text = value.to_string();
    let results = state.invoke(&writer, &[Value::Object(object.clone()), value])?;
    let status = results
        .first()
        .map_or(WriterStatus::UnknownFailed, WriterStatus::from_value);

    let symbol = key.to_string();
    let class = object.type_name().to_string();
    match status {
        WriterStatus::Succeeded => Ok(()),
        WriterStatus::TypeFailed => Err(ScriptError::WriterTypeFailed {
            symbol,
            class,
            value: text,
        }),
        WriterStatus::ValueFailed => Err(ScriptError::WriterValueFailed {
            symbol,
            class,
            value: text,
        }),
        WriterStatus::UnknownFailed => Err(ScriptError::WriterUnknownFailed {
            symbol,
            class,
            value: text,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::{BaseLink, Class};
    use crate::convert::{FromStack, ToStack};
    use crate::object::{ObjRef, push_embedded};

    #[derive(Default)]
    struct Base {
        tag: i64,
    }

    impl Class for Base {
        const NAME: &'static str = "Base";
    }

    #[derive(Default)]
    struct Derived {
        _pad: u64,
        base: Base,
    }

    impl Class for Derived {
        const NAME: &'static str = "Derived";

        fn bases() -> Vec<BaseLink> {
            vec![BaseLink::new::<Derived, Base>(
                std::mem::offset_of!(Derived, base),
                |d| &d.base,
                |d| &mut d.base,
            )]
        }
    }

    fn tag_reader() -> Function {
        Function::new("tag", |state: &mut State| {
            let this = ObjRef::<Base>::get(state, 1);
            let tag = this.with(|base| base.tag).unwrap_or(-1);
            tag.push(state).map_err(ScriptError::from)
        })
    }

    fn tag_writer() -> Function {
        Function::new("tag", |state: &mut State| {
            let this = ObjRef::<Base>::get(state, 1);
            let status = if !i64::test(state, 2) {
                WriterStatus::TypeFailed
            } else {
                let tag = i64::get(state, 2);
                if tag < 0 {
                    WriterStatus::ValueFailed
                } else {
                    this.with_mut(|base| base.tag = tag)
                        .map_or(WriterStatus::UnknownFailed, |_| WriterStatus::Succeeded)
                }
            };
            status.push(state).map_err(ScriptError::from)
        })
    }

    fn setup() -> (State, ObjectRef) {
        let mut state = State::new();
        state.registry_mut().register::<Derived>();
        let base = state.registry().id_of::<Base>().unwrap();
        let members = state.registry_mut().descriptor_mut(base).unwrap().members_mut();
        members.insert_reader("tag", tag_reader());
        members.insert_writer("tag", tag_writer());

        push_embedded(Derived { _pad: 0, base: Base { tag: 5 } }, &mut state).unwrap();
        let object = state.pop().unwrap().as_object().unwrap().clone();
        (state, object)
    }

    #[test]
    fn reads_walk_to_base_readers() {
        let (mut state, object) = setup();
        assert_eq!(index(&mut state, &object, "tag").unwrap(), Value::Integer(5));
        assert_eq!(state.top(), 0);
    }

    #[test]
    fn missing_symbols_are_reported() {
        let (mut state, object) = setup();
        let err = index(&mut state, &object, "nope").unwrap_err();
        assert_eq!(err.to_string(), "can not find readable symbol nope in an instance of Derived.");
        let err = newindex(&mut state, &object, "nope", Value::Nil).unwrap_err();
        assert!(matches!(err, ScriptError::SymbolNotWritable { .. }));
    }

    #[test]
    fn writer_statuses_map_to_errors() {
        let (mut state, object) = setup();
        newindex(&mut state, &object, "tag", Value::Integer(9)).unwrap();
        assert_eq!(index(&mut state, &object, "tag").unwrap(), Value::Integer(9));

        let err = newindex(&mut state, &object, "tag", Value::from("x")).unwrap_err();
        assert!(matches!(err, ScriptError::WriterTypeFailed { .. }));
        let err = newindex(&mut state, &object, "tag", Value::Integer(-3)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "-3 is not a valid value for symbol tag in an instance of Derived."
        );
    }

    #[test]
    fn cleared_registry_stops_dispatch() {
        let (mut state, object) = setup();
        state.registry_mut().clear();
        assert!(index(&mut state, &object, "tag").is_err());
    }
}
