//! Iterator entry points that run on rayon with the `parallel` feature and on plain std
//! iterators without it.
//!
//! Import everything with `use placeholder_maybe_rayon::*;` and call `par_iter()`,
//! `into_par_iter()`, `par_chunks_exact()` or `join()` as usual.

#[cfg(feature = "parallel")]
mod parallel {
    pub use rayon::prelude::{
        IndexedParallelIterator, IntoParallelIterator, IntoParallelRefIterator,
        IntoParallelRefMutIterator, ParallelIterator, ParallelSlice, ParallelSliceMut,
    };
    pub use rayon::join;
}

#[cfg(feature = "parallel")]
pub use parallel::*;

#[cfg(not(feature = "parallel"))]
mod sequential {
    use std::slice::{Chunks, ChunksExact, ChunksExactMut, Iter, IterMut};

    /// `par_iter` over a borrowed collection.
    pub trait IntoParallelRefIterator<'data> {
        type Item: 'data;
        type Iter: Iterator<Item = Self::Item>;

        fn par_iter(&'data self) -> Self::Iter;
    }

    impl<'data, T: 'data> IntoParallelRefIterator<'data> for [T] {
        type Item = &'data T;
        type Iter = Iter<'data, T>;

        fn par_iter(&'data self) -> Self::Iter {
            self.iter()
        }
    }

    impl<'data, T: 'data> IntoParallelRefIterator<'data> for Vec<T> {
        type Item = &'data T;
        type Iter = Iter<'data, T>;

        fn par_iter(&'data self) -> Self::Iter {
            self.iter()
        }
    }

    /// `par_iter_mut` over a mutably borrowed collection.
    pub trait IntoParallelRefMutIterator<'data> {
        type Item: 'data;
        type Iter: Iterator<Item = Self::Item>;

        fn par_iter_mut(&'data mut self) -> Self::Iter;
    }

    impl<'data, T: 'data> IntoParallelRefMutIterator<'data> for [T] {
        type Item = &'data mut T;
        type Iter = IterMut<'data, T>;

        fn par_iter_mut(&'data mut self) -> Self::Iter {
            self.iter_mut()
        }
    }

    impl<'data, T: 'data> IntoParallelRefMutIterator<'data> for Vec<T> {
        type Item = &'data mut T;
        type Iter = IterMut<'data, T>;

        fn par_iter_mut(&'data mut self) -> Self::Iter {
            self.iter_mut()
        }
    }

    pub trait IntoParallelIterator {
        type Item;
        type Iter: Iterator<Item = Self::Item>;

        fn into_par_iter(self) -> Self::Iter;
    }

    impl<T: IntoIterator> IntoParallelIterator for T {
        type Item = T::Item;
        type Iter = T::IntoIter;

        fn into_par_iter(self) -> Self::Iter {
            self.into_iter()
        }
    }

    pub trait ParallelSlice<T> {
        fn par_chunks(&self, chunk_size: usize) -> Chunks<'_, T>;
        fn par_chunks_exact(&self, chunk_size: usize) -> ChunksExact<'_, T>;
    }

    impl<T> ParallelSlice<T> for [T] {
        fn par_chunks(&self, chunk_size: usize) -> Chunks<'_, T> {
            self.chunks(chunk_size)
        }

        fn par_chunks_exact(&self, chunk_size: usize) -> ChunksExact<'_, T> {
            self.chunks_exact(chunk_size)
        }
    }

    pub trait ParallelSliceMut<T> {
        fn par_chunks_exact_mut(&mut self, chunk_size: usize) -> ChunksExactMut<'_, T>;
    }

    impl<T> ParallelSliceMut<T> for [T] {
        fn par_chunks_exact_mut(&mut self, chunk_size: usize) -> ChunksExactMut<'_, T> {
            self.chunks_exact_mut(chunk_size)
        }
    }

    /// rayon's `find_any`, which on a sequential iterator is `find`.
    pub trait ParallelIterator: Iterator {
        fn find_any<P>(mut self, predicate: P) -> Option<Self::Item>
        where
            Self: Sized,
            P: Fn(&Self::Item) -> bool,
        {
            self.find(predicate)
        }
    }

    impl<T: Iterator> ParallelIterator for T {}

    /// Runs `oper_a` then `oper_b`.
    pub fn join<A, B, RA, RB>(oper_a: A, oper_b: B) -> (RA, RB)
    where
        A: FnOnce() -> RA,
        B: FnOnce() -> RB,
    {
        (oper_a(), oper_b())
    }
}

#[cfg(not(feature = "parallel"))]
pub use sequential::*;
