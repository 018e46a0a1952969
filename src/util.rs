/// Asserts that a hyperparameter lies in the closed interval `[a,b]`, panicking with
/// the name of the offending expression otherwise
///
/// ### Example
/// ```should_panic
/// # use flappy_q::assert_interval;
/// let gamma = 1.5;
/// assert_interval!(gamma, 0.0, 1.0);
/// ```
/// This panics with the message "Invalid value for \`gamma\`: 1.5. Must be in the interval \[0, 1\]."
#[macro_export]
macro_rules! assert_interval {
    ($var:expr, $a:expr, $b:expr) => {
        assert!(
            $var >= $a && $var <= $b,
            "Invalid value for `{}`: {}. Must be in the interval [{}, {}].",
            stringify!($var),
            $var,
            $a,
            $b,
        );
    };
}

/// Asserts that a hyperparameter is strictly positive and finite
#[macro_export]
macro_rules! assert_positive {
    ($var:expr) => {
        assert!(
            $var.is_finite() && $var > 0.0,
            "Invalid value for `{}`: {}. Must be positive and finite.",
            stringify!($var),
            $var,
        );
    };
}
