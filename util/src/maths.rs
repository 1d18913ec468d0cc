//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Clamp a value into the closed interval `[min, max]`.
pub fn clamp<T>(value: &T, min: &T, max: &T) -> T 
where
    T: Float
{
    let mut ret = *value;

    if ret > *max {
        ret = *max
    }
    if ret < *min {
        ret = *min
    }

    ret
}

/// Returns true if `value` lies within `tol` of either end of `[min, max]`.
pub fn at_bound<T>(value: &T, min: &T, max: &T, tol: &T) -> bool
where
    T: Float
{
    (*value - *min).abs() <= *tol || (*max - *value).abs() <= *tol
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(&20.0, &-18.0, &18.0), 18.0);
        assert_eq!(clamp(&-20.0, &-18.0, &18.0), -18.0);
        assert_eq!(clamp(&1.5f32, &-18.0, &18.0), 1.5);
    }

    #[test]
    fn test_at_bound() {
        assert!(at_bound(&18.0, &-18.0, &18.0, &1e-9));
        assert!(at_bound(&-18.0, &-18.0, &18.0, &1e-9));
        assert!(!at_bound(&17.9, &-18.0, &18.0, &1e-9));
    }
}
