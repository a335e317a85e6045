//! Mantissa of a number.

use crate::common::buf::WordBuf;
use crate::common::util::add_carry;
use crate::common::util::add_word;
use crate::common::util::count_leading_zeroes;
use crate::common::util::shift_slice_left;
use crate::common::util::sub_borrow;
use crate::defs::Error;
use crate::defs::RoundingMode;
use crate::defs::SignedWord;
use crate::defs::Word;
use crate::defs::WORD_BIT_SIZE;
use crate::defs::WORD_MAX;
use crate::defs::WORD_SIGNIFICANT_BIT;
use core::cmp::Ordering;
use itertools::izip;

// Word `i` of the value `m` when `m` is aligned to the top of an `l`-word
// frame and then shifted right by `shift` bits. Words outside of `m` read
// as zero.
#[inline]
fn frame_word(m: &[Word], l: usize, shift: usize, i: usize) -> Word {
    let off = l - m.len();
    let idx = i + shift / WORD_BIT_SIZE;
    let bits = shift % WORD_BIT_SIZE;

    let word = |j: usize| if j >= off && j < l { m[j - off] } else { 0 };

    if bits == 0 {
        word(idx)
    } else {
        word(idx) >> bits | word(idx + 1) << (WORD_BIT_SIZE - bits)
    }
}

/// Mantissa representation.
///
/// The value is left-aligned in the buffer: the most significant bit of a
/// non-zero mantissa is always set, and the bits below the precision `p`
/// are zero.
#[derive(Debug, Hash)]
pub struct Mantissa {
    m: WordBuf,
    p: usize, // precision in bits
}

impl Mantissa {
    // bit length to length in words.
    #[inline]
    pub(crate) fn bit_len_to_word_len(p: usize) -> usize {
        (p + WORD_BIT_SIZE - 1) / WORD_BIT_SIZE
    }

    // reserve a buffer for mantissa.
    fn reserve_new(sz: usize) -> Result<WordBuf, Error> {
        WordBuf::new(sz)
    }

    /// New mantissa with precision `p` bits filled with zeroes.
    pub fn new(p: usize) -> Result<Self, Error> {
        let m = Self::reserve_new(Self::bit_len_to_word_len(p))?;

        Ok(Mantissa { m, p })
    }

    /// New mantissa with precision `p` bits filled with 1.
    pub fn oned_mantissa(p: usize) -> Result<Self, Error> {
        let mut m = Self::reserve_new(Self::bit_len_to_word_len(p))?;

        m.fill(WORD_MAX);

        let tz = m.len() * WORD_BIT_SIZE - p;
        if tz > 0 {
            m[0] = m[0] >> tz << tz;
        }

        Ok(Mantissa { m, p })
    }

    /// New mantissa with precision `p` for the normalized value of `d`.
    /// The significant bits of `d` must fit in the precision.
    pub fn from_word(p: usize, mut d: Word) -> Result<Self, Error> {
        let mut m = Self::reserve_new(Self::bit_len_to_word_len(p))?;

        if d > 0 {
            let sig = WORD_BIT_SIZE - d.leading_zeros() as usize - d.trailing_zeros() as usize;
            if sig > p {
                return Err(Error::InvalidArgument);
            }

            while d & WORD_SIGNIFICANT_BIT == 0 {
                d <<= 1;
            }
        }

        let l = m.len();
        m[l - 1] = d;

        Ok(Mantissa { m, p })
    }

    /// New mantissa with precision `p` prefilled with `w`.
    pub fn from_words(p: usize, w: &[Word]) -> Result<Self, Error> {
        if w.len() != Self::bit_len_to_word_len(p) {
            return Err(Error::InvalidArgument);
        }

        let mut m = Self::reserve_new(w.len())?;
        m.copy_from_slice(w);

        Ok(Mantissa { m, p })
    }

    /// Constructs a mantissa of precision `p` directly from a buffer.
    pub(crate) fn from_word_buf(m: WordBuf, p: usize) -> Self {
        debug_assert!(m.len() == Self::bit_len_to_word_len(p));

        Mantissa { m, p }
    }

    /// Return true if the mantissa represents zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.m[self.m.len() - 1] & WORD_SIGNIFICANT_BIT == 0
    }

    /// Returns length of the mantissa in words.
    #[inline]
    pub fn len(&self) -> usize {
        self.m.len()
    }

    /// Returns the buffer length in bits.
    #[inline]
    pub fn max_bit_len(&self) -> usize {
        self.len() * WORD_BIT_SIZE
    }

    /// Returns the precision in bits.
    #[inline]
    pub fn bit_len(&self) -> usize {
        self.p
    }

    pub fn digits(&self) -> &[Word] {
        &self.m
    }

    #[cfg(test)]
    pub fn most_significant_word(&self) -> Word {
        self.m[self.m.len() - 1]
    }

    /// Clones the mantissa.
    pub fn clone(&self) -> Result<Self, Error> {
        let mut m = Self::reserve_new(self.m.len())?;
        m.copy_from_slice(&self.m);
        Ok(Mantissa { m, p: self.p })
    }

    /// Shift to the left so that the most significant bit is set, return the shift amount.
    fn maximize(m: &mut [Word]) -> usize {
        let shift = count_leading_zeroes(m);

        if shift > 0 && shift < m.len() * WORD_BIT_SIZE {
            shift_slice_left(m, shift);
        }

        shift
    }

    /// Compare to m2 as left-aligned fractions.
    /// Returns positive if self > m2, negative if self < m2, 0 otherwise.
    pub fn abs_cmp(&self, m2: &Self) -> SignedWord {
        debug_assert!(!self.is_zero() && !m2.is_zero());

        for (a, b) in core::iter::zip(self.m.iter().rev(), m2.m.iter().rev()) {
            let diff = *a as SignedWord - *b as SignedWord;
            if diff != 0 {
                return diff;
            }
        }

        match self.len().cmp(&m2.len()) {
            Ordering::Greater => {
                if self.m[..self.len() - m2.len()].iter().any(|x| *x != 0) {
                    1
                } else {
                    0
                }
            }
            Ordering::Less => {
                if m2.m[..m2.len() - self.len()].iter().any(|x| *x != 0) {
                    -1
                } else {
                    0
                }
            }
            Ordering::Equal => 0,
        }
    }

    /// Adds `m2`, shifted right by `m2_shift` bits, to `self` keeping the full precision
    /// of the result. Returns the exponent adjustment and the new mantissa.
    pub fn abs_add_full(&self, m2: &Self, m2_shift: usize) -> Result<(isize, Self), Error> {
        debug_assert!(!self.is_zero() && !m2.is_zero());

        let l = self
            .len()
            .max((m2_shift + WORD_BIT_SIZE - 1) / WORD_BIT_SIZE + m2.len())
            + 1;

        let mut buf = Self::reserve_new(l)?;

        let m1iter = (0..l).map(|i| frame_word(&self.m, l, 0, i));
        let m2iter = (0..l).map(|i| frame_word(&m2.m, l, m2_shift, i));

        let mut c = 0;
        for (d, a, b) in izip!(buf.iter_mut(), m1iter, m2iter) {
            c = add_carry(a, b, c, d);
        }

        let mut shift = 0;
        if c > 0 {
            // the low words have enough slack for an exact shift
            crate::common::util::shift_slice_right(&mut buf, 1);
            let lb = buf.len();
            buf[lb - 1] |= WORD_SIGNIFICANT_BIT;
            shift = 1;
        }

        buf.drop_trailing_zeroes();

        let p = buf.len() * WORD_BIT_SIZE;

        Ok((shift, Mantissa { m: buf, p }))
    }

    /// Subtracts `m2`, shifted right by `m2_shift` bits, from `self` keeping the full
    /// precision of the result. `self` must be larger than the shifted `m2`.
    /// Returns the exponent adjustment and the new mantissa.
    pub fn abs_sub_full(&self, m2: &Self, m2_shift: usize) -> Result<(isize, Self), Error> {
        debug_assert!(!self.is_zero() && !m2.is_zero());

        let l = self
            .len()
            .max((m2_shift + WORD_BIT_SIZE - 1) / WORD_BIT_SIZE + m2.len());

        let mut buf = Self::reserve_new(l)?;

        let m1iter = (0..l).map(|i| frame_word(&self.m, l, 0, i));
        let m2iter = (0..l).map(|i| frame_word(&m2.m, l, m2_shift, i));

        let mut c = 0;
        for (d, a, b) in izip!(buf.iter_mut(), m1iter, m2iter) {
            c = sub_borrow(a, b, c, d);
        }

        debug_assert!(c == 0);

        let shift = Self::maximize(&mut buf);

        buf.drop_trailing_zeroes();

        let p = buf.len() * WORD_BIT_SIZE;

        Ok((-(shift as isize), Mantissa { m: buf, p }))
    }

    /// Rounds `self` to the precision `p` using the rounding mode `rm`.
    /// Returns true if the rounding overflowed into a higher exponent, and the
    /// direction in which the magnitude of the value has changed.
    pub fn round_to(
        &mut self,
        p: usize,
        rm: RoundingMode,
        is_positive: bool,
    ) -> Result<(bool, Ordering), Error> {
        debug_assert!(!self.is_zero());
        debug_assert!(p >= 1);

        if self.max_bit_len() <= p {
            if self.max_bit_len() < p {
                self.m.extend_low(Self::bit_len_to_word_len(p))?;
            }
            self.p = p;

            return Ok((false, Ordering::Equal));
        }

        let n = self.max_bit_len() - p; // bits to be removed

        let i = n / WORD_BIT_SIZE;
        let t = n % WORD_BIT_SIZE;

        let rb_i = (n - 1) / WORD_BIT_SIZE;
        let rb_t = (n - 1) % WORD_BIT_SIZE;
        let rbit = self.m[rb_i] >> rb_t & 1 != 0;

        let mut sticky = self.m[..rb_i].iter().any(|x| *x != 0);
        if !sticky && rb_t > 0 {
            sticky = self.m[rb_i] << (WORD_BIT_SIZE - rb_t) != 0;
        }

        let inexact = rbit || sticky;

        // the removed bits become 0
        self.m[..i].fill(0);
        if t > 0 {
            self.m[i] = self.m[i] >> t << t;
        }

        let inc = inexact
            && match rm {
                RoundingMode::ToEven => {
                    rbit && (sticky || self.m[n / WORD_BIT_SIZE] >> (n % WORD_BIT_SIZE) & 1 != 0)
                }
                RoundingMode::Up => is_positive,
                RoundingMode::Down => !is_positive,
                RoundingMode::ToZero => false,
                RoundingMode::FromZero => true,
            };

        let mut carry = false;
        if inc {
            if add_word(&mut self.m[i..], (1 as Word) << t) != 0 {
                // 1 was in front of the mantissa
                let l = self.m.len();
                self.m[l - 1] = WORD_SIGNIFICANT_BIT;
                carry = true;
            }
        }

        self.m.keep_top(Self::bit_len_to_word_len(p));
        self.p = p;

        let dir = if !inexact {
            Ordering::Equal
        } else if inc {
            Ordering::Greater
        } else {
            Ordering::Less
        };

        Ok((carry, dir))
    }

    #[cfg(feature = "random")]
    /// Returns a randomized normalized mantissa with precision `p`.
    pub fn random_normal(p: usize) -> Result<Self, Error> {
        let mut m = Self::reserve_new(Self::bit_len_to_word_len(p))?;

        for v in m.iter_mut() {
            *v = rand::random::<Word>();
        }

        let l = m.len();
        m[l - 1] |= WORD_SIGNIFICANT_BIT;

        let tz = l * WORD_BIT_SIZE - p;
        if tz > 0 {
            m[0] = m[0] >> tz << tz;
        }

        Ok(Mantissa { m, p })
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn test_round_to() {
        // no rounding needed
        let mut m = Mantissa::from_words(WORD_BIT_SIZE, &[WORD_SIGNIFICANT_BIT | 0b11]).unwrap();
        let (c, dir) = m.round_to(WORD_BIT_SIZE, RoundingMode::ToEven, true).unwrap();
        assert!(!c && dir == Ordering::Equal);

        // 1.01 at 2 bits for all modes
        for (rm, pos, expected_dir, expected_m) in [
            (RoundingMode::ToEven, true, Ordering::Less, 0b10),
            (RoundingMode::Up, true, Ordering::Greater, 0b11),
            (RoundingMode::Up, false, Ordering::Less, 0b10),
            (RoundingMode::Down, true, Ordering::Less, 0b10),
            (RoundingMode::Down, false, Ordering::Greater, 0b11),
            (RoundingMode::ToZero, false, Ordering::Less, 0b10),
            (RoundingMode::FromZero, false, Ordering::Greater, 0b11),
        ] {
            let mut m =
                Mantissa::from_words(WORD_BIT_SIZE, &[0b101 << (WORD_BIT_SIZE - 3)]).unwrap();
            let (c, dir) = m.round_to(2, rm, pos).unwrap();
            assert!(!c);
            assert_eq!(dir, expected_dir);
            assert_eq!(m.most_significant_word(), expected_m << (WORD_BIT_SIZE - 2));
        }

        // a tie on an odd significand rounds up and overflows the single bit
        let mut m = Mantissa::from_words(WORD_BIT_SIZE, &[0b11 << (WORD_BIT_SIZE - 2)]).unwrap();
        let (c, dir) = m.round_to(1, RoundingMode::ToEven, true).unwrap();
        assert!(c && dir == Ordering::Greater);
        assert_eq!(m.most_significant_word(), WORD_SIGNIFICANT_BIT);

        // below the tie
        let mut m = Mantissa::from_words(WORD_BIT_SIZE, &[0b1001 << (WORD_BIT_SIZE - 4)]).unwrap();
        let (c, dir) = m.round_to(2, RoundingMode::ToEven, true).unwrap();
        assert!(!c && dir == Ordering::Less);
        assert_eq!(m.most_significant_word(), 0b10 << (WORD_BIT_SIZE - 2));

        let mut m = Mantissa::from_words(WORD_BIT_SIZE, &[0b1011 << (WORD_BIT_SIZE - 4)]).unwrap();
        let (c, dir) = m.round_to(2, RoundingMode::ToEven, true).unwrap();
        assert!(!c && dir == Ordering::Greater);
        assert_eq!(m.most_significant_word(), 0b11 << (WORD_BIT_SIZE - 2));

        // carry out of the top
        let mut m = Mantissa::oned_mantissa(WORD_BIT_SIZE * 2).unwrap();
        let (c, dir) = m.round_to(WORD_BIT_SIZE, RoundingMode::FromZero, true).unwrap();
        assert!(c && dir == Ordering::Greater);
        assert_eq!(m.most_significant_word(), WORD_SIGNIFICANT_BIT);
    }

    #[test]
    fn test_abs_add_sub_full() {
        // 1 + 1 = 10
        let m1 = Mantissa::from_word(WORD_BIT_SIZE, 1).unwrap();
        let m2 = Mantissa::from_word(WORD_BIT_SIZE, 1).unwrap();
        let (shift, m3) = m1.abs_add_full(&m2, 0).unwrap();
        assert_eq!(shift, 1);
        assert_eq!(m3.most_significant_word(), WORD_SIGNIFICANT_BIT);

        // 1 + 2^(-W): exact, full precision
        let (shift, m3) = m1.abs_add_full(&m2, WORD_BIT_SIZE).unwrap();
        assert_eq!(shift, 0);
        assert!(m3.digits().iter().rev().eq([
            WORD_SIGNIFICANT_BIT,
            WORD_SIGNIFICANT_BIT
        ]
        .iter()));

        // 1 - 2^(-W-1): result is just below 1, normalization shifts by 1
        let (shift, m3) = m1.abs_sub_full(&m2, WORD_BIT_SIZE + 1).unwrap();
        assert_eq!(shift, -1);
        assert!(m3.digits().iter().rev().eq([WORD_MAX, WORD_SIGNIFICANT_BIT].iter()));

        // cancellation: 1 - (1 - 2^(-W-1)) = 2^(-W-1)
        let m4 = Mantissa::from_word_buf(
            {
                let mut b = WordBuf::new(2).unwrap();
                b[1] = WORD_MAX;
                b[0] = WORD_SIGNIFICANT_BIT;
                b
            },
            WORD_BIT_SIZE * 2,
        );
        let (shift, m5) = m1.abs_sub_full(&m4, 1).unwrap();
        assert_eq!(shift, -((WORD_BIT_SIZE + 1) as isize));
        assert_eq!(m5.most_significant_word(), WORD_SIGNIFICANT_BIT);
        assert_eq!(m5.len(), 1);
    }
}
