//! `into_par_iter()` with or without rayon.
//!
//! Row, scene and index loops are written against rayon's prelude. Without
//! the `parallel` feature the same calls resolve to plain iterators and
//! every stage runs on the calling thread.

#[cfg(feature = "parallel")]
pub use rayon::prelude::*;

#[cfg(not(feature = "parallel"))]
mod sequential {
    /// Stand-in for `rayon::prelude::IntoParallelIterator`.
    ///
    /// Only `into_par_iter()` exists here; slices go through it too
    /// (`slice.into_par_iter()`), never `par_iter()`.
    pub trait IntoParallelIterator {
        type Iter: Iterator;
        fn into_par_iter(self) -> Self::Iter;
    }

    impl<I: IntoIterator> IntoParallelIterator for I {
        type Iter = I::IntoIter;
        fn into_par_iter(self) -> Self::Iter {
            self.into_iter()
        }
    }
}

#[cfg(not(feature = "parallel"))]
pub use sequential::*;
