//! Conditional parallel iteration.
//!
//! With the `parallel` feature, iteration runs on rayon's thread pool;
//! without it (or on targets where rayon is unavailable) the same call sites
//! fall back to sequential iterators. The per-scale wavelet transform and the
//! batch pipeline runner are the two hot paths.

/// Macro for conditionally parallel reference iteration over slices.
///
/// When the `parallel` feature is enabled, uses `par_iter()`.
/// Otherwise, uses `iter()` for sequential execution.
#[macro_export]
macro_rules! slice_maybe_parallel {
    ($expr:expr) => {{
        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            $expr.par_iter()
        }
        #[cfg(not(feature = "parallel"))]
        {
            $expr.iter()
        }
    }};
}

// Re-export macros at module level
pub use slice_maybe_parallel;
