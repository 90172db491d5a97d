use scriptbind::prelude::*;

#[derive(Class, Default)]
struct Position {
    #[bind(get, set)]
    x: f32,
    #[bind(get, set)]
    y: f32,
}

#[derive(Class, Default)]
struct Health {
    #[bind(get)]
    current: i32,
}

#[derive(Class, Default)]
#[bind(name = "Actor")]
struct Unit {
    #[bind(base)]
    position: Position,
    #[bind(base)]
    health: Health,
    #[bind(get, set, name = "label")]
    tag: String,
    cache: Vec<u8>,
}

fn main() {
    assert_eq!(Unit::NAME, "Actor");
    assert_eq!(Unit::bases().len(), 2);
    assert_eq!(Unit::bases()[1].name(), "Health");
    assert_eq!(Unit::fields().len(), 1);
    assert_eq!(Position::fields().len(), 2);

    let mut state = State::new();
    Module::new(&mut state).class::<Unit>().build().unwrap();
    let unit = Unit { tag: "scout".into(), ..Unit::default() };
    assert_eq!(unit.cache.len(), 0);
    assert_eq!(unit.push(&mut state).unwrap(), 1);
}
