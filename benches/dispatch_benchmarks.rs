//! Performance benchmarks for the call-boundary hot paths.
//!
//! - Conversion: pushing and testing scalars and tuples
//! - Overloads: first-match resolution over chains of growing length
//! - Dispatch: member calls and property reads through multi-base objects
//!
//! ## Profiling with Puffin
//!
//! Run with the `profile-with-puffin` feature to collect scope timings:
//!
//! ```bash
//! cargo bench --features profile-with-puffin -- --profile-time 5
//! ```

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use scriptbind::prelude::*;
use std::hint::black_box;

#[cfg(feature = "profile-with-puffin")]
static FRAME_VIEW: std::sync::OnceLock<puffin::GlobalFrameView> = std::sync::OnceLock::new();

/// Initialize puffin profiler.
#[cfg(feature = "profile-with-puffin")]
fn setup_profiler() {
    puffin::set_scopes_on(true);
    FRAME_VIEW.get_or_init(puffin::GlobalFrameView::default);
}

#[cfg(not(feature = "profile-with-puffin"))]
fn setup_profiler() {}

/// Call at the end of each benchmark iteration to flush profiling data.
#[cfg(feature = "profile-with-puffin")]
fn end_profiling_frame() {
    puffin::GlobalProfiler::lock().new_frame();
}

#[cfg(not(feature = "profile-with-puffin"))]
fn end_profiling_frame() {}

/// Print how many frames were captured.
#[cfg(feature = "profile-with-puffin")]
fn print_profiling_stats() {
    let Some(frame_view) = FRAME_VIEW.get() else {
        println!("Profiler not initialized");
        return;
    };
    let view = frame_view.lock();
    println!("\n=== Profiling: {} frames recorded ===\n", view.recent_frames().count());
}

#[cfg(not(feature = "profile-with-puffin"))]
fn print_profiling_stats() {}

#[derive(Class, Default)]
struct Body {
    #[bind(get, set)]
    mass: f64,
}

#[derive(Class, Default)]
struct Tagged {
    #[bind(get)]
    tag: i64,
}

#[derive(Class, Default)]
struct Ship {
    #[bind(base)]
    body: Body,
    #[bind(base)]
    tagged: Tagged,
    #[bind(get, set)]
    fuel: f64,
}

fn ship_state() -> (State, Value) {
    let mut state = State::new();
    let mut module = Module::new(&mut state);
    module
        .class::<Body>()
        .method("weigh", |b: &Body, g: f64| b.mass * g)
        .unwrap()
        .build()
        .unwrap();
    module.class::<Tagged>().build().unwrap();
    module.class::<Ship>().build().unwrap();

    Ship::default().push(&mut state).unwrap();
    let ship = state.pop().unwrap();
    (state, ship)
}

/// Benchmark pushing and testing values.
fn conversion_benchmarks(c: &mut Criterion) {
    setup_profiler();
    let mut group = c.benchmark_group("conversion");

    group.bench_function("push_test_get_i32", |b| {
        let mut state = State::new();
        b.iter(|| {
            black_box(42i32).push(&mut state).unwrap();
            let value = if i32::test(&state, 1) { i32::get(&state, 1) } else { 0 };
            state.set_top(0);
            end_profiling_frame();
            black_box(value)
        });
    });

    group.bench_function("push_tuple_4", |b| {
        let mut state = State::new();
        b.iter(|| {
            let pushed = black_box((1i64, 2.5f64, true, "four")).push(&mut state).unwrap();
            state.set_top(0);
            end_profiling_frame();
            black_box(pushed)
        });
    });

    group.finish();
}

/// Benchmark overload resolution where the last candidate matches.
fn overload_benchmarks(c: &mut Criterion) {
    setup_profiler();
    let mut group = c.benchmark_group("overloads");

    for chain in [1usize, 4, 16] {
        let mut state = State::new();
        {
            let mut module = Module::new(&mut state);
            for i in 0..chain - 1 {
                let marker = i as i64;
                module.function("f", move |_: bool, _: i64| marker).unwrap();
            }
            module.function("f", |a: i64, b: i64| a + b).unwrap();
        }

        group.bench_with_input(BenchmarkId::new("last_match", chain), &chain, |b, _| {
            b.iter(|| {
                let sum: i64 = call_function(&mut state, "f", black_box((1i64, 2i64))).unwrap();
                end_profiling_frame();
                sum
            });
        });
    }

    group.finish();
}

/// Benchmark member calls and reads through a second base.
fn dispatch_benchmarks(c: &mut Criterion) {
    setup_profiler();
    let mut group = c.benchmark_group("dispatch");
    let (mut state, ship) = ship_state();

    group.bench_function("read_second_base_field", |b| {
        b.iter(|| {
            let tag = state.get_field(&ship, black_box("tag")).unwrap();
            end_profiling_frame();
            tag
        });
    });

    group.bench_function("write_own_field", |b| {
        b.iter(|| {
            state.set_field(&ship, "fuel", Value::Number(black_box(3.5))).unwrap();
            end_profiling_frame();
        });
    });

    group.bench_function("call_base_method", |b| {
        b.iter(|| {
            let weight: f64 = call_method(&mut state, &ship, "weigh", (black_box(9.8f64),)).unwrap();
            end_profiling_frame();
            weight
        });
    });

    group.finish();
    print_profiling_stats();
}

criterion_group!(benches, conversion_benchmarks, overload_benchmarks, dispatch_benchmarks);
criterion_main!(benches);
