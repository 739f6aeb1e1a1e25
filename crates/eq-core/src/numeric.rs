use crate::CoreError;

/// Floating point type used throughout system
pub type Real = f64;

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, CoreError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(CoreError::NonFinite { what, value: v })
    }
}

/// Reject the first NaN or infinite entry of `values`.
pub fn ensure_all_finite(values: &[Real], what: &'static str) -> Result<(), CoreError> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(CoreError::NonFiniteEntry {
            what,
            index,
            value: values[index],
        }),
        None => Ok(()),
    }
}
