//! Integration tests for the binding bridge.
//!
//! These tests go through the public facade: classes and functions are
//! registered with `Module`, then driven the way a script would drive them
//! (stack pushes, `State::call`, field reads and writes).

use std::mem::offset_of;
use std::sync::Arc;

use scriptbind::prelude::*;

// =============================================================================
// Fixtures
// =============================================================================

#[derive(Class, Clone, Default)]
#[bind(value)]
struct Named {
    #[bind(get, set)]
    name: String,
}

#[derive(Class, Default)]
struct Scored {
    #[bind(get)]
    score: i64,
}

#[derive(Class, Default)]
#[repr(C)]
struct Entry {
    #[bind(base)]
    named: Named,
    #[bind(base)]
    scored: Scored,
    #[bind(get, name = "rank")]
    position: i64,
}

#[derive(Class, Default)]
struct Root {
    #[bind(get, set)]
    id: i64,
}

#[derive(Class, Default)]
struct Left {
    #[bind(base)]
    root: Root,
}

#[derive(Class, Default)]
#[repr(C)]
struct Right {
    marker: u64,
    #[bind(base)]
    root: Root,
}

#[derive(Class, Default)]
#[repr(C)]
struct Both {
    #[bind(base)]
    left: Left,
    #[bind(base)]
    right: Right,
}

#[derive(ScriptEnum, Clone, Copy, Debug, PartialEq)]
enum Mode {
    Idle = 0,
    #[bind(default)]
    Run = 2,
    #[bind(name = "HALT")]
    Halt = 9,
}

fn entry() -> Entry {
    Entry {
        named: Named {
            name: "ada".to_string(),
        },
        scored: Scored { score: 42 },
        position: 3,
    }
}

fn pushed<T: ToStack>(state: &mut State, value: T) -> Value {
    let top = state.top();
    value.push(state).unwrap();
    let value = state.value_at(top + 1).cloned().unwrap();
    state.set_top(top);
    value
}

fn registered(classes: impl FnOnce(&mut Module<'_>)) -> State {
    let mut state = State::new();
    classes(&mut Module::new(&mut state));
    state
}

fn with_entry_classes(module: &mut Module<'_>) {
    module.class::<Named>().build().unwrap();
    module.class::<Scored>().build().unwrap();
    module
        .class::<Entry>()
        .method("describe", |e: &Entry| format!("{}#{}", e.named.name, e.position))
        .unwrap()
        .build()
        .unwrap();
}

// =============================================================================
// Multi-base layout
// =============================================================================

#[test]
fn second_base_offset_matches_layout() {
    let state = registered(with_entry_classes);
    let registry = state.registry();
    let entry_id = registry.id_of::<Entry>().unwrap();
    let scored_id = registry.id_of::<Scored>().unwrap();
    let named_id = registry.id_of::<Named>().unwrap();

    let descriptor = registry.descriptor(entry_id).unwrap();
    assert_eq!(descriptor.base_entry(named_id).unwrap().offset, 0);
    let second = descriptor.base_entry(scored_id).unwrap().offset;
    assert_eq!(second, offset_of!(Entry, scored));
    assert_ne!(second, 0);

    let sub = registry.descriptor(scored_id).unwrap().sub_entry(entry_id).unwrap();
    assert_eq!(sub.offset, second);
}

#[test]
fn base_members_resolve_through_the_derived_object() {
    let mut state = registered(with_entry_classes);
    let object = pushed(&mut state, entry());

    assert_eq!(state.get_field(&object, "score").unwrap(), Value::Integer(42));
    assert_eq!(state.get_field(&object, "name").unwrap(), Value::from("ada"));
    assert_eq!(state.get_field(&object, "rank").unwrap(), Value::Integer(3));

    state.set_field(&object, "name", Value::from("bob")).unwrap();
    let described: String = call_method(&mut state, &object, "describe", ()).unwrap();
    assert_eq!(described, "bob#3");
}

#[test]
fn value_classes_copy_out_of_derived_objects() {
    let mut state = registered(with_entry_classes);
    let object = pushed(&mut state, entry());
    state.push(object).unwrap();

    assert!(Named::test(&state, 1));
    assert_eq!(Named::get(&state, 1).name, "ada");
    assert!(<ObjRef<Scored>>::test(&state, 1));
    assert!(!<ObjRef<Root>>::test(&state, 1));
}

#[test]
fn diamond_keeps_the_first_registered_path() {
    let mut state = registered(|module| {
        module.class::<Both>().build().unwrap();
        module.class::<Root>().build().unwrap();
    });
    let registry = state.registry();
    let both = registry.id_of::<Both>().unwrap();
    let root = registry.id_of::<Root>().unwrap();
    let entry = registry.descriptor(both).unwrap().base_entry(root).unwrap();
    assert_eq!(entry.offset, offset_of!(Both, left) + offset_of!(Left, root));
    assert_eq!(entry.depth(), 2);

    let mut value = Both::default();
    value.left.root.id = 1;
    value.right.root.id = 2;
    let object = pushed(&mut state, value);
    assert_eq!(state.get_field(&object, "id").unwrap(), Value::Integer(1));

    state.set_field(&object, "id", Value::Integer(7)).unwrap();
    let both = ObjRef::<Both>::resolve(&state, object.as_object().unwrap()).unwrap();
    assert_eq!(both.with(|b| (b.left.root.id, b.right.root.id)), Some((7, 2)));
}

// =============================================================================
// Overloads and defaults
// =============================================================================

#[test]
fn overloads_commit_to_the_first_match() {
    let mut state = State::new();
    Module::new(&mut state)
        .function("pick", |_: i64| "int")
        .unwrap()
        .function("pick", |_: f64| "float")
        .unwrap()
        .function("pick_float_first", |_: f64| "float")
        .unwrap()
        .function("pick_float_first", |_: i64| "int")
        .unwrap();

    let pick = |state: &mut State, name: &str, arg: Value| -> String {
        call_function(state, name, Handle::new(arg)).unwrap()
    };
    assert_eq!(pick(&mut state, "pick", Value::Integer(2)), "int");
    assert_eq!(pick(&mut state, "pick", Value::Number(2.5)), "float");
    assert_eq!(pick(&mut state, "pick_float_first", Value::Integer(2)), "float");
}

#[test]
fn trailing_defaults_fill_missing_arguments() {
    let mut state = State::new();
    Module::new(&mut state)
        .function_with("add", |a: i64, b: i64| a + b, (5i64,))
        .unwrap();

    assert_eq!(call_function::<i64, _>(&mut state, "add", (1i64,)).unwrap(), 6);
    assert_eq!(call_function::<i64, _>(&mut state, "add", (1i64, 2i64)).unwrap(), 3);

    let err = call_function::<i64, _>(&mut state, "add", ()).unwrap_err();
    let CallError::Script { source, .. } = err else {
        panic!("expected a script error");
    };
    assert_eq!(source.to_string(), "call native function[add] with wrong params.");
}

#[test]
fn defaults_are_checked_at_registration() {
    let mut state = State::new();
    let err = Module::new(&mut state)
        .function_with("bad", |a: i64| a, ("five",))
        .err()
        .unwrap();
    assert!(matches!(err, RegistrationError::InvalidDefault { .. }));
}

// =============================================================================
// Writers
// =============================================================================

#[test]
fn writer_failures_carry_readable_messages() {
    let mut state = State::new();
    Module::new(&mut state)
        .class::<Root>()
        .writer("positive", |r: &mut Root, id: i64| {
            if id <= 0 {
                return false;
            }
            r.id = id;
            true
        })
        .unwrap()
        .build()
        .unwrap();
    let object = pushed(&mut state, Root::default());

    let err = state.set_field(&object, "positive", Value::Integer(-1)).unwrap_err();
    assert_eq!(
        err.to_string(),
        "-1 is not a valid value for symbol positive in an instance of Root."
    );

    let err = state.set_field(&object, "id", Value::from("x")).unwrap_err();
    assert_eq!(
        err.to_string(),
        "The type of x is not suitable for symbol id in an instance of Root."
    );

    let err = state.set_field(&object, "missing", Value::Integer(1)).unwrap_err();
    assert_eq!(
        err.to_string(),
        "can not find writable symbol missing in an instance of Root."
    );

    state.set_field(&object, "positive", Value::Integer(4)).unwrap();
    assert_eq!(state.get_field(&object, "id").unwrap(), Value::Integer(4));
}

// =============================================================================
// Storage categories
// =============================================================================

fn root_state() -> State {
    registered(|module| {
        module
            .class::<Root>()
            .method("bump", |r: &mut Root| {
                r.id += 1;
                r.id
            })
            .unwrap()
            .build()
            .unwrap();
    })
}

#[test]
fn weak_objects_expire_with_their_owner() {
    let mut state = root_state();
    let owner = Arc::new(Root { id: 5 });
    let object = pushed(&mut state, Arc::downgrade(&owner));
    assert_eq!(object.as_object().unwrap().category(), StorageCategory::Weak);
    assert_eq!(state.get_field(&object, "id").unwrap(), Value::Integer(5));

    drop(owner);
    assert!(!object.as_object().unwrap().is_live());
    let err = call_method::<i64, _>(&mut state, &object, "bump", ()).unwrap_err();
    let CallError::Script { source, .. } = err else {
        panic!("expected a script error");
    };
    assert!(matches!(source, ScriptError::InvalidObject { .. }));
}

#[test]
fn unique_objects_move_out_once() {
    let mut state = root_state();
    let object = pushed(&mut state, Box::new(Root { id: 9 }));
    state.push(object.clone()).unwrap();

    assert!(<Option<Box<Root>>>::test(&state, 1));
    let taken = <Option<Box<Root>>>::get(&state, 1).unwrap();
    assert_eq!(taken.id, 9);
    assert!(!<Option<Box<Root>>>::test(&state, 1));
    assert!(<Option<Box<Root>>>::get(&state, 1).is_none());
    assert!(!object.as_object().unwrap().is_live());
}

#[test]
fn shared_objects_need_exclusive_access_to_mutate() {
    let mut state = root_state();
    let owner = Arc::new(Root { id: 1 });
    let object = pushed(&mut state, Arc::clone(&owner));

    let err = call_method::<i64, _>(&mut state, &object, "bump", ()).unwrap_err();
    assert!(matches!(err, CallError::Script { .. }));

    drop(owner);
    assert_eq!(call_method::<i64, _>(&mut state, &object, "bump", ()).unwrap(), 2);
}

#[test]
fn unregistered_classes_cannot_be_pushed() {
    let mut state = State::new();
    let err = Root::default().push(&mut state).unwrap_err();
    assert_eq!(err, ConversionError::UnregisteredClass { name: "Root" });
    assert_eq!(state.top(), 0);
}

// =============================================================================
// Tables
// =============================================================================

#[test]
fn namespace_keys_bound_by_registration_are_protected() {
    let mut state = State::new();
    Module::new(&mut state)
        .function("answer", || 42i64)
        .unwrap();
    let globals = Value::Table(state.globals().clone());

    state.set_field(&globals, "answer", Value::Integer(0)).unwrap();
    assert_eq!(call_function::<i64, _>(&mut state, "answer", ()).unwrap(), 42);

    state.set_field(&globals, "fresh", Value::Integer(1)).unwrap();
    assert_eq!(state.global("fresh"), Value::Integer(1));

    let mut strict = State::with_config(Config::default().with_name_conflict(ConflictPolicy::Error));
    Module::new(&mut strict).function("answer", || 42i64).unwrap();
    let globals = Value::Table(strict.globals().clone());
    let err = strict.set_field(&globals, "answer", Value::Integer(0)).unwrap_err();
    assert!(matches!(err, ScriptError::NameConflict { .. }));
}

#[test]
fn enums_are_bound_twice_and_read_only() {
    let mut state = State::new();
    Module::new(&mut state).enumeration::<Mode>().unwrap();

    assert_eq!(state.global("Run"), Value::Integer(2));
    assert_eq!(state.global("HALT"), Value::Integer(9));
    let table = state.global("Mode");
    assert_eq!(table.to_string(), "enum[Mode]");
    assert_eq!(state.get_field(&table, "Idle").unwrap(), Value::Integer(0));

    let err = state.set_field(&table, "Idle", Value::Integer(5)).unwrap_err();
    assert_eq!(err.to_string(), "can not modify native enum[Mode].");

    state.push(Value::Integer(3)).unwrap();
    assert!(!Mode::test(&state, 1));
    assert_eq!(Mode::get(&state, 1), Mode::Run);
    assert_eq!(Mode::make_default(), Mode::Run);
}

#[test]
fn class_tables_reject_new_keys() {
    let mut state = State::new();
    Module::new(&mut state)
        .class::<Root>()
        .constructor(|id: i64| Root { id })
        .unwrap()
        .static_function("origin", || 0i64)
        .unwrap()
        .build()
        .unwrap();

    let class = state.global("Root");
    assert_eq!(class.to_string(), "class[Root]");
    let err = state.set_field(&class, "extra", Value::Integer(1)).unwrap_err();
    assert!(matches!(err, ScriptError::ModifyMissingStatic { .. }));

    let object = call_function::<Value, _>(&mut state, "Root", (6i64,)).unwrap();
    assert_eq!(object.as_object().unwrap().category(), StorageCategory::Embedded);
    assert_eq!(call_function::<i64, _>(&mut state, "Root.origin", ()).unwrap(), 0);

    let err = call_function::<Value, _>(&mut state, "Root.new", ("six",)).unwrap_err();
    assert_eq!(
        err.to_string(),
        "calling Root.new failed: new native class[Root] with wrong params."
    );
}

// =============================================================================
// Teardown
// =============================================================================

#[test]
fn closed_states_no_longer_resolve_wrappers() {
    let mut state = root_state();
    let object = pushed(&mut state, Root { id: 1 });
    assert_eq!(state.get_field(&object, "id").unwrap(), Value::Integer(1));

    state.close();
    assert!(state.registry().is_empty());
    assert_eq!(state.global("Root"), Value::Nil);

    let err = state.get_field(&object, "id").unwrap_err();
    assert!(matches!(err, ScriptError::SymbolNotReadable { .. }));
    assert!(object.as_object().unwrap().is_live());
}

#[test]
fn failed_calls_fall_back_to_defaults() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let mut state = root_state();

    let value: i64 = call_function_or_default(&mut state, "missing.fn", (1i64,));
    assert_eq!(value, 0);
    let handle: Handle = call_function_or_default(&mut state, "Root", ());
    assert!(handle.is_empty());
    assert_eq!(state.top(), 0);
}

#[test]
fn chain_order_decides_between_arity_and_defaults() {
    let mut state = State::new();
    Module::new(&mut state)
        .function("f", |a: i64, b: i64| a + b)
        .unwrap()
        .function_with("f", |a: i64, b: i64, c: i64| a * b * c, (7i64,))
        .unwrap()
        .function_with("g", |a: i64, b: i64, c: i64| a * b * c, (7i64,))
        .unwrap()
        .function("g", |a: i64, b: i64| a + b)
        .unwrap();

    assert_eq!(call_function::<i64, _>(&mut state, "f", (2i64, 3i64)).unwrap(), 5);
    assert_eq!(call_function::<i64, _>(&mut state, "f", (2i64, 3i64, 4i64)).unwrap(), 24);
    assert_eq!(call_function::<i64, _>(&mut state, "g", (2i64, 3i64)).unwrap(), 42);
}

#[test]
fn weak_views_of_shared_objects_expire() {
    let mut state = root_state();
    let object = pushed(&mut state, Arc::new(Root { id: 3 }));
    state.push(object.clone()).unwrap();

    assert!(<std::sync::Weak<Root>>::test(&state, 1));
    let weak = <std::sync::Weak<Root>>::get(&state, 1);
    assert_eq!(weak.upgrade().map(|r| r.id), Some(3));

    let observer = pushed(&mut state, weak.clone());
    state.set_top(0);
    drop(object);
    assert!(weak.upgrade().is_none());

    state.push(observer).unwrap();
    assert!(!<ObjRef<Root>>::test(&state, 1));
    assert!(!<std::sync::Weak<Root>>::test(&state, 1));
}
