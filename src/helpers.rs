//! Helpers - functions templates call by name.
//!
//! Built-in helpers ship with the runtime and are found without consulting
//! the naming authority. User helpers are plain functions of their argument
//! values; [`build_user_helper`] turns one into a [`Helper`] whose result
//! reference recomputes when an argument moves.

use std::rc::Rc;

use crate::component::{ArgsSnapshot, CapturedArguments};
use crate::error::{Error, Result};
use crate::reactive::{
    CachedReference, ConstReference, ReferenceRef, RevisionClock, debug_info_for_reference,
};
use crate::value::{Callback, Value};

/// A helper as the VM invokes it.
pub type Helper = Rc<dyn Fn(&CapturedArguments) -> Result<ReferenceRef>>;

/// A helper as applications register it: positional and named values in, a
/// value out.
pub type UserHelper = Rc<dyn Fn(&[Value], &ArgsSnapshot) -> Value>;

/// Built-in helper registered under `name`, if any.
pub(crate) fn builtin_helper(name: &str) -> Option<Helper> {
    match name {
        "action" => Some(Rc::new(action)),
        _ => None,
    }
}

/// `{{action this.save extra}}`: a callback invoking the first argument with
/// the remaining positional arguments followed by the call's own arguments.
pub fn action(args: &CapturedArguments) -> Result<ReferenceRef> {
    let Some(callback_ref) = args.positional().first() else {
        return Err(Error::ActionNotCallable {
            description: String::new(),
            found: Value::Undefined.type_name().to_string(),
        });
    };

    let callback = match callback_ref.value() {
        Value::Function(callback) => callback,
        other => {
            return Err(Error::ActionNotCallable {
                description: debug_info_for_reference(&**callback_ref),
                found: other.type_name().to_string(),
            });
        }
    };

    let captured = args.clone();
    let curried = Callback::new(move |invocation: &[Value]| {
        let mut call_args: Vec<Value> = captured.positional_values().into_iter().skip(1).collect();
        call_args.extend_from_slice(invocation);
        callback.call(&call_args)
    });

    Ok(Rc::new(ConstReference::new(curried)))
}

/// Adapt a user helper into a VM helper.
pub fn build_user_helper(helper: UserHelper, clock: &RevisionClock) -> Helper {
    let clock = clock.clone();
    Rc::new(move |args: &CapturedArguments| -> Result<ReferenceRef> {
        let helper = helper.clone();
        let args = args.clone();
        let reference = CachedReference::new(&clock, move || {
            helper(&args.positional_values(), &args.named_snapshot())
        });
        Ok(Rc::new(reference))
    })
}
