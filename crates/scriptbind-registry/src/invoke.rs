//! Typed adapters from Rust callables to overload candidates.
//!
//! - [`IntoFunction`]: `Fn(A, B, ..) -> R` for free and static functions
//! - [`IntoMethod`]: `Fn(&T, A, ..) -> R` or `Fn(&mut T, A, ..) -> R`
//! - [`IntoConstructor`]: `Fn(A, B, ..) -> T`, stored type-erased until
//!   the class decides how constructed values are pushed
//!
//! Implemented for up to eight parameters. Parameters are read with
//! [`FromStack::get`] after the binder accepted the frame, advancing by
//! each parameter's slot width. The return value is pushed with
//! [`ToStack::push`]; `()` pushes nothing.

use std::marker::PhantomData;
use std::rc::Rc;

use scriptbind_core::{Class, FromStack, ObjRef, ScriptError, State, ToStack};

use crate::overload::{Invoker, ParamSpec, invalid_object};

/// Builds the value of a class from the current frame.
pub type Maker<T> = Rc<dyn Fn(&State) -> T>;

/// A callable usable as a free or static function.
pub trait IntoFunction<Args, R> {
    fn params() -> Vec<ParamSpec>;
    fn into_invoker(self) -> Invoker;
}

/// Receiver markers for [`IntoMethod`].
pub struct Ref<Args>(PhantomData<Args>);
pub struct Mut<Args>(PhantomData<Args>);

/// A callable usable as a member function of `T`.
pub trait IntoMethod<T, Marker, R> {
    fn params() -> Vec<ParamSpec>;
    fn into_invoker(self, member: Rc<str>) -> Invoker;
}

/// A callable producing a `T` from arguments.
pub trait IntoConstructor<T, Args> {
    fn params() -> Vec<ParamSpec>;
    fn into_maker(self) -> Maker<T>;
}

// ============================================================================
// Implementations by arity
// ============================================================================

macro_rules! impl_into_callables {
    ($($ty:ident $var:ident),*) => {
        impl<Func, Ret, $($ty,)*> IntoFunction<($($ty,)*), Ret> for Func
        where
            Func: Fn($($ty),*) -> Ret + 'static,
            Ret: ToStack,
            $($ty: FromStack + 'static,)*
        {
            fn params() -> Vec<ParamSpec> {
                vec![$(ParamSpec::of::<$ty>()),*]
            }

            #[allow(unused_mut, unused_variables, unused_assignments)]
            fn into_invoker(self) -> Invoker {
                Rc::new(move |state: &mut State| {
                    let mut pos = 1;
                    $(
                        let $var = <$ty as FromStack>::get(state, pos);
                        pos += <$ty as FromStack>::WIDTH;
                    )*
                    let result = (self)($($var),*);
                    result.push(state).map_err(ScriptError::from)
                })
            }
        }

        impl<T, Func, Ret, $($ty,)*> IntoMethod<T, Ref<($($ty,)*)>, Ret> for Func
        where
            T: Class,
            Func: Fn(&T, $($ty),*) -> Ret + 'static,
            Ret: ToStack,
            $($ty: FromStack + 'static,)*
        {
            fn params() -> Vec<ParamSpec> {
                vec![$(ParamSpec::of::<$ty>()),*]
            }

            #[allow(unused_mut, unused_variables, unused_assignments)]
            fn into_invoker(self, member: Rc<str>) -> Invoker {
                Rc::new(move |state: &mut State| {
                    let this = ObjRef::<T>::get(state, 1);
                    let mut pos = 2;
                    $(
                        let $var = <$ty as FromStack>::get(state, pos);
                        pos += <$ty as FromStack>::WIDTH;
                    )*
                    let result = this
                        .with(|this| (self)(this, $($var),*))
                        .ok_or_else(|| invalid_object(state, T::NAME, &member))?;
                    result.push(state).map_err(ScriptError::from)
                })
            }
        }

        impl<T, Func, Ret, $($ty,)*> IntoMethod<T, Mut<($($ty,)*)>, Ret> for Func
        where
            T: Class,
            Func: Fn(&mut T, $($ty),*) -> Ret + 'static,
            Ret: ToStack,
            $($ty: FromStack + 'static,)*
        {
            fn params() -> Vec<ParamSpec> {
                vec![$(ParamSpec::of::<$ty>()),*]
            }

            #[allow(unused_mut, unused_variables, unused_assignments)]
            fn into_invoker(self, member: Rc<str>) -> Invoker {
                Rc::new(move |state: &mut State| {
                    let this = ObjRef::<T>::get(state, 1);
                    let mut pos = 2;
                    $(
                        let $var = <$ty as FromStack>::get(state, pos);
                        pos += <$ty as FromStack>::WIDTH;
                    )*
                    let result = this
                        .with_mut(|this| (self)(this, $($var),*))
                        .ok_or_else(|| invalid_object(state, T::NAME, &member))?;
                    result.push(state).map_err(ScriptError::from)
                })
            }
        }

        impl<T, Func, $($ty,)*> IntoConstructor<T, ($($ty,)*)> for Func
        where
            T: Class,
            Func: Fn($($ty),*) -> T + 'static,
            $($ty: FromStack + 'static,)*
        {
            fn params() -> Vec<ParamSpec> {
                vec![$(ParamSpec::of::<$ty>()),*]
            }

            #[allow(unused_mut, unused_variables, unused_assignments)]
            fn into_maker(self) -> Maker<T> {
                Rc::new(move |state: &State| {
                    let mut pos = 1;
                    $(
                        let $var = <$ty as FromStack>::get(state, pos);
                        pos += <$ty as FromStack>::WIDTH;
                    )*
                    (self)($($var),*)
                })
            }
        }
    };
}

impl_into_callables!();
impl_into_callables!(A a);
impl_into_callables!(A a, B b);
impl_into_callables!(A a, B b, C c);
impl_into_callables!(A a, B b, C c, D d);
impl_into_callables!(A a, B b, C c, D d, E e);
impl_into_callables!(A a, B b, C c, D d, E e, F f);
impl_into_callables!(A a, B b, C c, D d, E e, F f, G g);
impl_into_callables!(A a, B b, C c, D d, E e, F f, G g, H h);

#[cfg(test)]
mod tests {
    use super::*;
    use scriptbind_core::Value;

    fn run<Args, R>(f: impl IntoFunction<Args, R>, args: &[Value]) -> Vec<Value> {
        let mut state = State::new();
        for arg in args {
            state.push(arg.clone()).unwrap();
        }
        let before = state.top();
        let pushed = f.into_invoker()(&mut state).unwrap();
        assert_eq!(state.top(), before + pushed);
        (before + 1..=state.top())
            .map(|pos| state.value_at(pos).cloned().unwrap())
            .collect()
    }

    #[test]
    fn arguments_follow_slot_widths() {
        let results = run(
            |a: i32, (b, c): (i32, i32), d: String| format!("{a}{b}{c}{d}"),
            &[Value::Integer(1), Value::Integer(2), Value::Integer(3), Value::from("x")],
        );
        assert_eq!(results, vec![Value::from("123x")]);
    }

    #[test]
    fn unit_returns_push_nothing() {
        assert!(run(|_: bool| (), &[Value::Boolean(true)]).is_empty());
    }

    #[test]
    fn params_report_each_declared_type() {
        fn params_of<Args, R, F: IntoFunction<Args, R>>(_: &F) -> Vec<ParamSpec> {
            F::params()
        }
        let f = |_: i64, _: (f64, bool), _: ()| 0i32;
        let widths: Vec<usize> = params_of(&f).iter().map(|p| p.width).collect();
        assert_eq!(widths, vec![1, 2, 0]);
    }
}
