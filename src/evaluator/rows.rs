//! Row selections passed to the interpreters.

use std::ops::Range;

/// The rows to evaluate, in output order.
///
/// Indices may repeat, be unordered, or lie outside the dataset; rows
/// outside the dataset evaluate to NaN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rows<'a> {
    Indices(&'a [usize]),
    Range(Range<usize>),
}

impl<'a> Rows<'a> {
    pub fn len(&self) -> usize {
        match self {
            Rows::Indices(indices) => indices.len(),
            Rows::Range(range) => range.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Row at output position `position`
    ///
    /// # Panics
    ///
    /// Panics if `position >= self.len()`.
    #[inline]
    pub fn get(&self, position: usize) -> usize {
        match self {
            Rows::Indices(indices) => indices[position],
            Rows::Range(range) => {
                assert!(position < range.len(), "row position out of bounds");
                range.start + position
            }
        }
    }

    pub fn iter(&self) -> RowsIter<'a> {
        match self {
            Rows::Indices(indices) => RowsIter::Indices(indices.iter()),
            Rows::Range(range) => RowsIter::Range(range.clone()),
        }
    }
}

impl<'a> From<&'a [usize]> for Rows<'a> {
    fn from(indices: &'a [usize]) -> Self {
        Rows::Indices(indices)
    }
}

impl<'a> From<&'a Vec<usize>> for Rows<'a> {
    fn from(indices: &'a Vec<usize>) -> Self {
        Rows::Indices(indices)
    }
}

impl<'a, const N: usize> From<&'a [usize; N]> for Rows<'a> {
    fn from(indices: &'a [usize; N]) -> Self {
        Rows::Indices(indices)
    }
}

impl From<Range<usize>> for Rows<'_> {
    fn from(range: Range<usize>) -> Self {
        Rows::Range(range)
    }
}

/// Iterator over the rows of a [`Rows`] selection
#[derive(Debug, Clone)]
pub enum RowsIter<'a> {
    Indices(std::slice::Iter<'a, usize>),
    Range(Range<usize>),
}

impl Iterator for RowsIter<'_> {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        match self {
            RowsIter::Indices(iter) => iter.next().copied(),
            RowsIter::Range(range) => range.next(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            RowsIter::Indices(iter) => iter.size_hint(),
            RowsIter::Range(range) => range.size_hint(),
        }
    }
}

impl ExactSizeIterator for RowsIter<'_> {}
