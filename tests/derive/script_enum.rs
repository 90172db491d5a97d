use scriptbind::prelude::*;

#[derive(ScriptEnum, Clone, Copy, PartialEq, Debug)]
#[bind(name = "Facing")]
enum Direction {
    North,
    East = 5,
    #[bind(default)]
    South,
    #[bind(name = "W")]
    West = -1,
}

fn main() {
    assert_eq!(Direction::NAME, "Facing");
    assert_eq!(
        Direction::variants(),
        &[("North", 0), ("East", 5), ("South", 6), ("W", -1)]
    );
    assert_eq!(Direction::fallback(), Direction::South);

    let mut state = State::new();
    Direction::West.push(&mut state).unwrap();
    assert_eq!(state.value_at(1), Some(&Value::Integer(-1)));
    assert_eq!(Direction::get(&state, 1), Direction::West);
}
