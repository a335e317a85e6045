//! Buffer for holding mantissa words.

use crate::defs::Error;
use crate::defs::Word;
use core::ops::Deref;
use core::ops::DerefMut;

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

/// Buffer for holding mantissa words. The value is kept aligned to the top
/// of the buffer, so resizing only ever adds or removes words at the low end,
/// and never moves individual bits.
#[derive(Debug, Hash)]
pub struct WordBuf {
    inner: Vec<Word>,
}

impl WordBuf {
    /// New zero-filled buffer of `sz` words.
    pub fn new(sz: usize) -> Result<Self, Error> {
        let mut inner = Vec::new();
        inner.try_reserve_exact(sz)?;
        inner.resize(sz, 0);
        Ok(WordBuf { inner })
    }

    #[inline]
    pub fn fill(&mut self, d: Word) {
        self.inner.fill(d);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Keep the `n` most significant words and discard the rest.
    pub fn keep_top(&mut self, n: usize) {
        let l = self.inner.len();
        self.inner.copy_within(l - n.., 0);
        self.inner.truncate(n);
    }

    /// Extend the buffer to `n` words; the value stays in the top words,
    /// the added low words are zero.
    pub fn extend_low(&mut self, n: usize) -> Result<(), Error> {
        let l = self.inner.len();
        self.inner.try_reserve(n - l)?;
        self.inner.resize(n, 0);
        self.inner.copy_within(..l, n - l);
        self.inner[..n - l].fill(0);
        Ok(())
    }

    /// Discard the low words that hold no value bits.
    pub fn drop_trailing_zeroes(&mut self) {
        let zeroes = self.inner.iter().take_while(|v| **v == 0).count();
        if zeroes > 0 {
            self.keep_top(self.inner.len() - zeroes);
        }
    }
}

impl Deref for WordBuf {
    type Target = [Word];

    #[inline]
    fn deref(&self) -> &[Word] {
        self.inner.deref()
    }
}

impl DerefMut for WordBuf {
    #[inline]
    fn deref_mut(&mut self) -> &mut [Word] {
        self.inner.deref_mut()
    }
}
