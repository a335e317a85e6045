//! BigFloatNumber definition and the primitive operations the summation builds upon.

use crate::defs::Error;
use crate::defs::Exponent;
use crate::defs::RoundingMode;
use crate::defs::Sign;
use crate::defs::SignedWord;
use crate::defs::Word;
use crate::defs::EXPONENT_MAX;
use crate::defs::EXPONENT_MIN;
use crate::defs::WORD_BIT_SIZE;
use crate::defs::WORD_SIGNIFICANT_BIT;
use crate::mantissa::Mantissa;
use core::cmp::Ordering;

/// A finite floating point number with mantissa of an arbitrary size, an exponent, and the sign.
#[derive(Debug, Hash)]
pub(crate) struct BigFloatNumber {
    e: Exponent,
    s: Sign,
    m: Mantissa,
}

impl BigFloatNumber {
    // Check the precision so it does not cause arithmetic overflows anywhere.
    pub(crate) fn p_assertion(p: usize) -> Result<(), Error> {
        if p == 0 || p >= (isize::MAX / 2 + EXPONENT_MIN as isize) as usize {
            Err(Error::InvalidArgument)
        } else {
            Ok(())
        }
    }

    /// Returns a new number with value of 0 and precision of `p` bits.
    ///
    /// ## Errors
    ///
    ///  - InvalidArgument: the precision is incorrect.
    ///  - MemoryAllocation: failed to allocate memory for mantissa.
    pub fn new(p: usize) -> Result<Self, Error> {
        Self::p_assertion(p)?;
        Ok(BigFloatNumber {
            m: Mantissa::new(p)?,
            e: 0,
            s: Sign::Pos,
        })
    }

    /// Returns the maximum value for the specified precision `p`: all bits of the
    /// mantissa are set to 1, the exponent has the maximum possible value, and the
    /// sign is positive.
    ///
    /// ## Errors
    ///
    ///  - InvalidArgument: the precision is incorrect.
    ///  - MemoryAllocation: failed to allocate memory for mantissa.
    pub fn max_value(p: usize) -> Result<Self, Error> {
        Self::p_assertion(p)?;
        Ok(BigFloatNumber {
            m: Mantissa::oned_mantissa(p)?,
            e: EXPONENT_MAX,
            s: Sign::Pos,
        })
    }

    /// Returns the minimum value for the specified precision `p`: all bits of the
    /// mantissa are set to 1, the exponent has the maximum possible value, and the
    /// sign is negative.
    ///
    /// ## Errors
    ///
    ///  - InvalidArgument: the precision is incorrect.
    ///  - MemoryAllocation: failed to allocate memory for mantissa.
    pub fn min_value(p: usize) -> Result<Self, Error> {
        let mut ret = Self::max_value(p)?;
        ret.s = Sign::Neg;
        Ok(ret)
    }

    /// Returns a new number with value `d` and the precision `p`.
    ///
    /// ## Errors
    ///
    ///  - InvalidArgument: the precision is incorrect, or the significant bits
    ///    of `d` do not fit in the precision.
    ///  - MemoryAllocation: failed to allocate memory for mantissa.
    pub fn from_word(mut d: Word, p: usize) -> Result<Self, Error> {
        Self::p_assertion(p)?;

        if d == 0 {
            Self::new(p)
        } else {
            let mut shift = 0;
            while d & WORD_SIGNIFICANT_BIT == 0 {
                d <<= 1;
                shift += 1;
            }
            Ok(BigFloatNumber {
                m: Mantissa::from_word(p, d)?,
                e: (WORD_BIT_SIZE - shift) as Exponent,
                s: Sign::Pos,
            })
        }
    }

    /// Constructs a number with precision `p` from an f64 value.
    ///
    /// ## Errors
    ///
    ///  - InvalidArgument: the precision is incorrect, `f` is NaN or subnormal, or the
    ///    significant bits of `f` do not fit in the precision.
    ///  - ExponentOverflow: `f` is Inf.
    ///  - MemoryAllocation: failed to allocate memory for mantissa.
    pub fn from_f64(p: usize, mut f: f64) -> Result<Self, Error> {
        Self::p_assertion(p)?;

        if f == 0.0f64 {
            return Self::new(p);
        }

        if f.is_infinite() {
            return Err(Error::ExponentOverflow(if f.is_sign_negative() {
                Sign::Neg
            } else {
                Sign::Pos
            }));
        }

        if f.is_nan() {
            return Err(Error::InvalidArgument);
        }

        let s = if f < 0.0f64 {
            f = -f;
            Sign::Neg
        } else {
            Sign::Pos
        };

        let u = f.to_bits();
        let exponent: Exponent = (u >> 52) as Exponent & 0b11111111111;
        if exponent == 0 {
            // subnormal f64 values are not used by this crate
            return Err(Error::InvalidArgument);
        }

        let mantissa = (u << 12) >> 1 | 0x8000000000000000u64;

        let mut ret = Self::from_u64_normalized(p, mantissa)?;

        ret.s = s;
        ret.e = exponent - 0b1111111111 + 1;

        Ok(ret)
    }

    // Construct from a normalized u64 with the exponent set to the bit length of `d`.
    fn from_u64_normalized(p: usize, d: u64) -> Result<Self, Error> {
        debug_assert!(d & 0x8000000000000000u64 != 0);

        #[cfg(not(target_arch = "x86"))]
        {
            let sig = 64 - d.trailing_zeros() as usize;
            if sig > p {
                return Err(Error::InvalidArgument);
            }

            let sn = Mantissa::bit_len_to_word_len(p);
            let mut w = crate::common::buf::WordBuf::new(sn)?;
            w[sn - 1] = d;

            Ok(BigFloatNumber {
                m: Mantissa::from_word_buf(w, p),
                e: 64,
                s: Sign::Pos,
            })
        }

        #[cfg(target_arch = "x86")]
        {
            let sig = 64 - d.trailing_zeros() as usize;
            if sig > p {
                return Err(Error::InvalidArgument);
            }

            let sn = Mantissa::bit_len_to_word_len(p);
            let mut w = crate::common::buf::WordBuf::new(sn)?;
            w[sn - 1] = (d >> WORD_BIT_SIZE) as Word;
            if sn > 1 {
                w[sn - 2] = d as Word;
            } else if d as Word != 0 {
                return Err(Error::InvalidArgument);
            }

            Ok(BigFloatNumber {
                m: Mantissa::from_word_buf(w, p),
                e: 64,
                s: Sign::Pos,
            })
        }
    }

    /// Constructs a number from the raw parts:
    ///
    ///  - `m` is the mantissa, the least significant word first.
    ///  - `p` is the precision in bits; `m` must contain exactly ⌈p / WORD_BIT_SIZE⌉ words.
    ///  - `s` is the sign.
    ///  - `e` is the exponent.
    ///
    /// A non-zero mantissa must be normalized (the most significant bit set), and the
    /// bits below the precision must be zero.
    ///
    /// ## Errors
    ///
    ///  - MemoryAllocation: failed to allocate memory for mantissa.
    ///  - InvalidArgument: the precision or the mantissa normalization is incorrect.
    pub fn from_raw_parts(m: &[Word], p: usize, s: Sign, e: Exponent) -> Result<Self, Error> {
        Self::p_assertion(p)?;

        let m = Mantissa::from_words(p, m)?;

        if m.is_zero() {
            if m.digits().iter().any(|x| *x != 0) {
                return Err(Error::InvalidArgument);
            }

            let mut ret = Self::new(p)?;
            ret.s = s;
            return Ok(ret);
        }

        let tz = m.max_bit_len() - p;
        if tz > 0 && m.digits()[0] << (WORD_BIT_SIZE - tz) != 0 {
            return Err(Error::InvalidArgument);
        }

        Ok(BigFloatNumber { m, s, e })
    }

    /// Decomposes `self` into raw parts: the mantissa words, the precision,
    /// the sign, and the exponent.
    #[inline]
    pub fn as_raw_parts(&self) -> (&[Word], usize, Sign, Exponent) {
        (self.m.digits(), self.m.bit_len(), self.s, self.e)
    }

    pub(crate) fn from_parts_unchecked(m: Mantissa, s: Sign, e: Exponent) -> Self {
        BigFloatNumber { e, s, m }
    }

    /// Returns the sign of a number.
    #[inline]
    pub fn sign(&self) -> Sign {
        self.s
    }

    /// Returns true if `self` is positive.
    #[inline]
    pub fn is_positive(&self) -> bool {
        self.s == Sign::Pos
    }

    /// Returns true if `self` is negative.
    #[inline]
    pub fn is_negative(&self) -> bool {
        self.s == Sign::Neg
    }

    /// Returns the exponent of `self`.
    #[inline]
    pub fn exponent(&self) -> Exponent {
        self.e
    }

    /// Returns the precision of `self` in bits.
    #[inline]
    pub fn precision(&self) -> usize {
        self.m.bit_len()
    }

    /// Returns true if `self` is zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.m.is_zero()
    }

    /// Returns a reference to the mantissa.
    #[inline]
    pub(crate) fn mantissa(&self) -> &Mantissa {
        &self.m
    }

    /// Sets the sign of `self`.
    pub fn set_sign(&mut self, s: Sign) {
        self.s = s;
    }

    /// Sets the exponent of `self`.
    pub fn set_exponent(&mut self, e: Exponent) {
        self.e = e;
    }

    /// Returns a copy of the number with the sign reversed.
    ///
    /// ## Errors
    ///
    ///  - MemoryAllocation: failed to allocate memory for mantissa.
    pub fn neg(&self) -> Result<Self, Error> {
        let mut ret = self.clone()?;
        ret.s = ret.s.invert();
        Ok(ret)
    }

    /// Clones the number.
    ///
    /// ## Errors
    ///
    ///  - MemoryAllocation: failed to allocate memory for mantissa.
    pub fn clone(&self) -> Result<Self, Error> {
        Ok(BigFloatNumber {
            e: self.e,
            s: self.s,
            m: self.m.clone()?,
        })
    }

    /// Compares `self` to `d2`.
    /// Returns positive if `self` is greater than `d2`, negative if `self` is smaller than `d2`, 0 otherwise.
    pub fn cmp(&self, d2: &Self) -> SignedWord {
        if self.is_zero() && d2.is_zero() {
            return 0;
        }

        if self.is_zero() {
            return -(d2.s as SignedWord);
        }

        if d2.is_zero() {
            return self.s as SignedWord;
        }

        if self.s != d2.s {
            return self.s as SignedWord;
        }

        self.abs_cmp(d2) * self.s as SignedWord
    }

    /// Compares the absolute value of `self` to the absolute value of `d2`.
    /// Returns positive if `|self|` is greater than `|d2|`, negative if `|self|` is
    /// smaller than `|d2|`, 0 otherwise.
    pub fn abs_cmp(&self, d2: &Self) -> SignedWord {
        if self.is_zero() {
            return if d2.is_zero() { 0 } else { -1 };
        }

        if d2.is_zero() {
            return 1;
        }

        if self.e != d2.e {
            return if self.e > d2.e { 1 } else { -1 };
        }

        self.m.abs_cmp(&d2.m)
    }

    /// Returns a copy of `self` rounded to precision `p`, together with the position
    /// of the returned value relative to `self`.
    ///
    /// ## Errors
    ///
    ///  - ExponentOverflow: the rounded value is out of the exponent range.
    ///  - InvalidArgument: the precision is incorrect.
    ///  - MemoryAllocation: failed to allocate memory for mantissa.
    pub fn copy_rounded(&self, p: usize, rm: RoundingMode) -> Result<(Self, Ordering), Error> {
        Self::p_assertion(p)?;

        if self.is_zero() {
            let mut ret = Self::new(p)?;
            ret.s = self.s;
            return Ok((ret, Ordering::Equal));
        }

        let mut m = self.m.clone()?;
        let (carry, dir) = m.round_to(p, rm, self.is_positive())?;

        let e = self.e as isize + carry as isize;
        if e > EXPONENT_MAX as isize {
            return Err(Error::ExponentOverflow(self.s));
        }

        let ret = BigFloatNumber {
            m,
            s: self.s,
            e: e as Exponent,
        };

        Ok((ret, Self::signed_ternary(dir, self.is_positive())))
    }

    /// Adds `d2` to `self` and returns the correctly rounded result of precision `p`
    /// together with the position of the result relative to the exact sum.
    ///
    /// ## Errors
    ///
    ///  - ExponentOverflow: the result is out of the exponent range.
    ///  - InvalidArgument: the precision is incorrect.
    ///  - MemoryAllocation: failed to allocate memory for mantissa.
    pub fn add_rounded(&self, d2: &Self, p: usize, rm: RoundingMode) -> Result<(Self, Ordering), Error> {
        Self::p_assertion(p)?;

        if self.is_zero() || d2.is_zero() {
            if self.is_zero() && d2.is_zero() {
                let s = if self.s == d2.s {
                    self.s
                } else if rm == RoundingMode::Down {
                    Sign::Neg
                } else {
                    Sign::Pos
                };

                let mut ret = Self::new(p)?;
                ret.s = s;
                return Ok((ret, Ordering::Equal));
            }

            let x = if self.is_zero() { d2 } else { self };
            return x.copy_rounded(p, rm);
        }

        let e1 = self.e as isize;
        let e2 = d2.e as isize;

        let (s, e, m) = if self.s == d2.s {
            let (a, b, e) = if e1 >= e2 { (self, d2, e1) } else { (d2, self, e2) };
            let (de, m) = a.m.abs_add_full(&b.m, e1.abs_diff(e2))?;
            (self.s, e + de, m)
        } else {
            match self.abs_cmp(d2) {
                0 => {
                    // the sum is exactly zero
                    let s = if rm == RoundingMode::Down { Sign::Neg } else { Sign::Pos };
                    let mut ret = Self::new(p)?;
                    ret.s = s;
                    return Ok((ret, Ordering::Equal));
                }
                v if v > 0 => {
                    let (de, m) = self.m.abs_sub_full(&d2.m, (e1 - e2) as usize)?;
                    (self.s, e1 + de, m)
                }
                _ => {
                    let (de, m) = d2.m.abs_sub_full(&self.m, (e2 - e1) as usize)?;
                    (d2.s, e2 + de, m)
                }
            }
        };

        let mut m = m;
        let (carry, dir) = m.round_to(p, rm, s == Sign::Pos)?;

        let e = e + carry as isize;
        if e > EXPONENT_MAX as isize || e < EXPONENT_MIN as isize {
            return Err(Error::ExponentOverflow(s));
        }

        let ret = BigFloatNumber {
            m,
            s,
            e: e as Exponent,
        };

        Ok((ret, Self::signed_ternary(dir, s == Sign::Pos)))
    }

    // Converts the direction of a magnitude change into the position of the result
    // relative to the exact value.
    pub(crate) fn signed_ternary(dir: Ordering, is_positive: bool) -> Ordering {
        if is_positive {
            dir
        } else {
            dir.reverse()
        }
    }

    #[cfg(feature = "random")]
    /// Returns a random normalized number with precision `p` and exponent in the
    /// range from `exp_from` to `exp_to` inclusive. The sign can be positive and
    /// negative. Zero is excluded. The function does not follow any specific
    /// distribution law. The intended use of this function is for testing.
    ///
    /// ## Errors
    ///
    ///  - InvalidArgument: the precision is incorrect.
    ///  - MemoryAllocation: failed to allocate memory for mantissa.
    pub fn random_normal(p: usize, exp_from: Exponent, exp_to: Exponent) -> Result<Self, Error> {
        Self::p_assertion(p)?;

        let m = Mantissa::random_normal(p)?;
        let e = if exp_from < exp_to {
            (rand::random::<isize>().abs() % (exp_to as isize - exp_from as isize)
                + exp_from as isize) as Exponent
        } else {
            exp_from
        };
        let s = if rand::random::<u8>() & 1 == 0 { Sign::Pos } else { Sign::Neg };

        Ok(BigFloatNumber { e, s, m })
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn test_cmp() {
        let d1 = BigFloatNumber::from_word(3, 2).unwrap();
        let d2 = BigFloatNumber::from_word(2, 2).unwrap();
        let z = BigFloatNumber::new(2).unwrap();

        assert!(d1.cmp(&d2) > 0);
        assert!(d2.cmp(&d1) < 0);
        assert!(d1.cmp(&d1) == 0);
        assert!(d1.cmp(&z) > 0);
        assert!(z.cmp(&d1) < 0);
        assert!(z.cmp(&z.neg().unwrap()) == 0);

        let d3 = d1.neg().unwrap();
        assert!(d3.cmp(&d1) < 0);
        assert!(d1.cmp(&d3) > 0);
        assert!(d3.cmp(&d2.neg().unwrap()) < 0);

        let mut d4 = BigFloatNumber::from_word(1, 2).unwrap();
        d4.set_exponent(100);
        assert!(d4.cmp(&d1) > 0);
        assert!(d4.abs_cmp(&d1) > 0);
        assert!(d1.abs_cmp(&d3) == 0);
    }

    #[test]
    fn test_from_f64() {
        let d1 = BigFloatNumber::from_f64(53, 0.25).unwrap();
        assert_eq!(d1.exponent(), -1);
        assert!(!d1.is_zero() && d1.is_positive());

        let d1 = BigFloatNumber::from_f64(53, -1.5).unwrap();
        assert_eq!(d1.exponent(), 1);
        assert!(d1.is_negative());
        let (m, p, s, e) = d1.as_raw_parts();
        assert_eq!(p, 53);
        assert_eq!(s, Sign::Neg);
        assert_eq!(e, 1);
        assert_eq!(m[0], 0b11 << (WORD_BIT_SIZE - 2));

        assert!(BigFloatNumber::from_f64(53, f64::NAN).is_err());
        assert!(BigFloatNumber::from_f64(53, f64::INFINITY).is_err());

        // 3 has two significant bits and does not fit one bit of precision
        assert!(BigFloatNumber::from_f64(1, 3.0).is_err());
        assert!(BigFloatNumber::from_f64(2, 3.0).is_ok());
    }

    #[test]
    fn test_copy_rounded() {
        // 0.11 at one bit of precision
        let d1 = BigFloatNumber::from_word(3, 2).unwrap();

        let (d2, t) = d1.copy_rounded(1, RoundingMode::ToEven).unwrap();
        assert_eq!(d2.exponent(), 3); // rounds up to 100
        assert_eq!(t, Ordering::Greater);

        let (d2, t) = d1.copy_rounded(1, RoundingMode::ToZero).unwrap();
        assert_eq!(d2.exponent(), 2); // rounds down to 10
        assert_eq!(t, Ordering::Less);

        let d3 = d1.neg().unwrap();
        let (d2, t) = d3.copy_rounded(1, RoundingMode::ToZero).unwrap();
        assert_eq!(d2.exponent(), 2);
        assert!(d2.is_negative());
        assert_eq!(t, Ordering::Greater);

        let (d2, t) = d3.copy_rounded(1, RoundingMode::Down).unwrap();
        assert_eq!(d2.exponent(), 3);
        assert!(d2.is_negative());
        assert_eq!(t, Ordering::Less);

        // extension is exact
        let (d2, t) = d1.copy_rounded(200, RoundingMode::ToEven).unwrap();
        assert_eq!(t, Ordering::Equal);
        assert_eq!(d2.precision(), 200);
        assert!(d2.cmp(&d1) == 0);
    }

    #[test]
    fn test_add_rounded() {
        let one = BigFloatNumber::from_word(1, 64).unwrap();
        let two = BigFloatNumber::from_word(2, 64).unwrap();
        let three = BigFloatNumber::from_word(3, 64).unwrap();

        // 1 + 2 = 3 exactly
        let (r, t) = one.add_rounded(&two, 64, RoundingMode::ToEven).unwrap();
        assert!(r.cmp(&three) == 0);
        assert_eq!(t, Ordering::Equal);

        // 1 + (-1) = +0, and -0 under Down
        let mone = one.neg().unwrap();
        let (r, t) = one.add_rounded(&mone, 64, RoundingMode::ToEven).unwrap();
        assert!(r.is_zero() && r.is_positive());
        assert_eq!(t, Ordering::Equal);
        let (r, _) = one.add_rounded(&mone, 64, RoundingMode::Down).unwrap();
        assert!(r.is_zero() && r.is_negative());

        // 2^100 + 1 rounded to 53 bits
        let mut big = BigFloatNumber::from_word(1, 53).unwrap();
        big.set_exponent(101);
        let one53 = BigFloatNumber::from_word(1, 53).unwrap();

        let (r, t) = big.add_rounded(&one53, 53, RoundingMode::ToEven).unwrap();
        assert!(r.cmp(&big) == 0);
        assert_eq!(t, Ordering::Less);

        let (r, t) = big.add_rounded(&one53, 53, RoundingMode::Up).unwrap();
        assert!(r.cmp(&big) > 0);
        assert_eq!(t, Ordering::Greater);

        // cancellation leaves an exact small value: (1 + 2^-70) - 1 = 2^-70
        let (a, t) = one.add_rounded(
            &{
                let mut v = BigFloatNumber::from_word(1, 8).unwrap();
                v.set_exponent(-69);
                v
            },
            128,
            RoundingMode::ToEven,
        )
        .unwrap();
        assert_eq!(t, Ordering::Equal);
        let (r, t) = a.add_rounded(&mone, 64, RoundingMode::ToEven).unwrap();
        assert_eq!(t, Ordering::Equal);
        assert_eq!(r.exponent(), -69);
    }

    #[test]
    fn test_zero_signs() {
        let pz = BigFloatNumber::new(8).unwrap();
        let nz = pz.neg().unwrap();

        for (a, b, rm, s) in [
            (&pz, &nz, RoundingMode::ToEven, Sign::Pos),
            (&pz, &nz, RoundingMode::Down, Sign::Neg),
            (&nz, &nz, RoundingMode::ToEven, Sign::Neg),
            (&pz, &pz, RoundingMode::Down, Sign::Pos),
        ] {
            let (r, t) = a.add_rounded(b, 8, rm).unwrap();
            assert!(r.is_zero());
            assert_eq!(r.sign(), s);
            assert_eq!(t, Ordering::Equal);
        }
    }
}
