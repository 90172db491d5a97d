use scriptbind::prelude::*;

#[derive(Class, Clone, Default, PartialEq, Debug)]
#[bind(value)]
struct Color {
    #[bind(get, set)]
    r: u8,
    #[bind(get, set)]
    g: u8,
    #[bind(get, set)]
    b: u8,
}

fn main() {
    let mut state = State::new();
    Module::new(&mut state).class::<Color>().build().unwrap();

    let color = Color { r: 1, g: 2, b: 3 };
    color.clone().push(&mut state).unwrap();
    assert!(Color::test(&state, 1));
    assert_eq!(Color::get(&state, 1), color);
    assert_eq!(Color::make_default(), Color::default());
}
