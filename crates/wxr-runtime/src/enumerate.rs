//! The OpenXR two-call enumeration idiom.

use wxr_core::{XrError, XrResult};

/// Outcome of one enumeration call.
#[derive(Debug, PartialEq, Eq)]
pub enum Enumerated<'a, T> {
    /// Capacity was zero; only the count is reported.
    Count(u32),
    /// The caller's array is large enough for every item.
    Filled(&'a [T]),
}

/// Applies the two-call rules to `items` for a caller-provided `capacity`.
/// The required count always accompanies the result so the ABI layer can
/// write it back even on `SizeInsufficient`.
pub fn two_call<T>(items: &[T], capacity: u32) -> (u32, XrResult<Enumerated<'_, T>>) {
    let required = items.len() as u32;
    let result = if capacity == 0 {
        Ok(Enumerated::Count(required))
    } else if capacity < required {
        Err(XrError::SizeInsufficient { required, capacity })
    } else {
        Ok(Enumerated::Filled(items))
    };
    (required, result)
}
