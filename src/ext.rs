//! BigFloat including finite numbers, `NaN`, and `Inf`.

use crate::defs::Error;
use crate::defs::Exponent;
use crate::defs::RoundingMode;
use crate::defs::Sign;
use crate::defs::SignedWord;
use crate::defs::Word;
use crate::defs::DEFAULT_P;
use crate::num::BigFloatNumber;
use core::cmp::Ordering;
use lazy_static::lazy_static;
use smallvec::SmallVec;

/// Not a number.
pub const NAN: BigFloat = BigFloat {
    inner: Flavor::NaN(None),
};

/// Positive infinity.
pub const INF_POS: BigFloat = BigFloat {
    inner: Flavor::Inf(Sign::Pos),
};

/// Negative infinity.
pub const INF_NEG: BigFloat = BigFloat {
    inner: Flavor::Inf(Sign::Neg),
};

lazy_static! {

    /// 1
    pub static ref ONE: BigFloat = BigFloat { inner: Flavor::Value(BigFloatNumber::from_word(1, DEFAULT_P).expect("Constant ONE initialized")) };

    /// 2
    pub static ref TWO: BigFloat = BigFloat { inner: Flavor::Value(BigFloatNumber::from_word(2, DEFAULT_P).expect("Constant TWO initialized")) };
}

/// A floating point number of arbitrary precision.
#[derive(Debug)]
pub struct BigFloat {
    inner: Flavor,
}

#[derive(Debug)]
pub(crate) enum Flavor {
    Value(BigFloatNumber),
    NaN(Option<Error>),
    Inf(Sign), // signed Inf
}

impl BigFloat {
    /// Returns a new number with value of 0 and precision of `p` bits.
    pub fn new(p: usize) -> Self {
        Self::result_to_ext(BigFloatNumber::new(p))
    }

    /// Returns a new number with value `d` and precision `p`.
    /// The significant bits of `d` must fit in the precision `p`.
    pub fn from_word(d: Word, p: usize) -> Self {
        Self::result_to_ext(BigFloatNumber::from_word(d, p))
    }

    /// Constructs a number with precision `p` from an f64 value.
    /// The significant bits of `f` must fit in the precision `p`.
    pub fn from_f64(f: f64, p: usize) -> Self {
        Self::result_to_ext(BigFloatNumber::from_f64(p, f))
    }

    /// Constructs a number from the raw parts: the mantissa words (the least
    /// significant word first), the precision `p` in bits, the sign, and the
    /// exponent. A non-zero mantissa must be normalized, and the bits below
    /// the precision must be zero.
    pub fn from_raw_parts(m: &[Word], p: usize, s: Sign, e: Exponent) -> Self {
        Self::result_to_ext(BigFloatNumber::from_raw_parts(m, p, s, e))
    }

    /// Decomposes a finite number into raw parts: the mantissa words, the
    /// precision, the sign, and the exponent. Returns None for `NaN` and `Inf`.
    pub fn as_raw_parts(&self) -> Option<(&[Word], usize, Sign, Exponent)> {
        match &self.inner {
            Flavor::Value(v) => Some(v.as_raw_parts()),
            _ => None,
        }
    }

    fn nan(err: Option<Error>) -> Self {
        BigFloat {
            inner: Flavor::NaN(err),
        }
    }

    fn inf(s: Sign) -> Self {
        BigFloat {
            inner: Flavor::Inf(s),
        }
    }

    fn result_to_ext(res: Result<BigFloatNumber, Error>) -> BigFloat {
        match res {
            Err(Error::ExponentOverflow(s)) => Self::inf(s),
            Err(e) => Self::nan(Some(e)),
            Ok(v) => BigFloat {
                inner: Flavor::Value(v),
            },
        }
    }

    fn result_with_ternary(res: Result<(BigFloatNumber, Ordering), Error>) -> (BigFloat, Ordering) {
        match res {
            Err(Error::ExponentOverflow(s)) => {
                // the value escaped the exponent range in the direction of the sign
                let t = if s.is_positive() { Ordering::Greater } else { Ordering::Less };
                (Self::inf(s), t)
            }
            Err(e) => (Self::nan(Some(e)), Ordering::Equal),
            Ok((v, t)) => (
                BigFloat {
                    inner: Flavor::Value(v),
                },
                t,
            ),
        }
    }

    /// Returns true if `self` is positive infinity.
    pub fn is_inf_pos(&self) -> bool {
        matches!(self.inner, Flavor::Inf(Sign::Pos))
    }

    /// Returns true if `self` is negative infinity.
    pub fn is_inf_neg(&self) -> bool {
        matches!(self.inner, Flavor::Inf(Sign::Neg))
    }

    /// Returns true if `self` is infinite.
    pub fn is_inf(&self) -> bool {
        matches!(self.inner, Flavor::Inf(_))
    }

    /// Return true if `self` is not a number.
    pub fn is_nan(&self) -> bool {
        matches!(self.inner, Flavor::NaN(_))
    }

    /// Returns true if `self` is zero. Returns false for `NaN` and `Inf`.
    pub fn is_zero(&self) -> bool {
        match &self.inner {
            Flavor::Value(v) => v.is_zero(),
            _ => false,
        }
    }

    /// Returns the associated with `NaN` error, if any.
    pub fn err(&self) -> Option<Error> {
        match &self.inner {
            Flavor::NaN(Some(e)) => Some(*e),
            _ => None,
        }
    }

    /// Returns the sign of `self`. Returns None for `NaN`.
    pub fn sign(&self) -> Option<Sign> {
        match &self.inner {
            Flavor::Value(v) => Some(v.sign()),
            Flavor::Inf(s) => Some(*s),
            Flavor::NaN(_) => None,
        }
    }

    /// Returns the exponent of a finite `self`, or None.
    pub fn exponent(&self) -> Option<Exponent> {
        match &self.inner {
            Flavor::Value(v) => Some(v.exponent()),
            _ => None,
        }
    }

    /// Returns the precision of a finite `self` in bits, or None.
    pub fn precision(&self) -> Option<usize> {
        match &self.inner {
            Flavor::Value(v) => Some(v.precision()),
            _ => None,
        }
    }

    /// Sets the exponent of a finite `self`; `NaN` and `Inf` are left unchanged.
    pub fn set_exponent(&mut self, e: Exponent) {
        if let Flavor::Value(v) = &mut self.inner {
            v.set_exponent(e);
        }
    }

    /// Returns a copy of the number with the sign reversed.
    pub fn neg(&self) -> Self {
        match &self.inner {
            Flavor::Value(v) => Self::result_to_ext(v.neg()),
            Flavor::NaN(err) => Self::nan(*err),
            Flavor::Inf(s) => Self::inf(s.invert()),
        }
    }

    /// Compares `self` to `d2`.
    /// Returns positive if `self` > `d2`, negative if `self` < `d2`, zero if
    /// `self` == `d2`, None if `self` or `d2` is NaN.
    pub fn cmp(&self, d2: &Self) -> Option<SignedWord> {
        match &self.inner {
            Flavor::Value(v1) => match &d2.inner {
                Flavor::Value(v2) => Some(v1.cmp(v2)),
                Flavor::Inf(s2) => {
                    if s2.is_positive() {
                        Some(-1)
                    } else {
                        Some(1)
                    }
                }
                Flavor::NaN(_) => None,
            },
            Flavor::Inf(s1) => match &d2.inner {
                Flavor::Value(_) => Some(*s1 as SignedWord),
                Flavor::Inf(s2) => Some(*s1 as SignedWord - *s2 as SignedWord),
                Flavor::NaN(_) => None,
            },
            Flavor::NaN(_) => None,
        }
    }

    /// Adds `d2` to `self` and returns the correctly rounded result of precision `p`,
    /// together with the position of the result relative to the exact sum.
    pub fn add(&self, d2: &Self, p: usize, rm: RoundingMode) -> (Self, Ordering) {
        match &self.inner {
            Flavor::Value(v1) => match &d2.inner {
                Flavor::Value(v2) => Self::result_with_ternary(v1.add_rounded(v2, p, rm)),
                Flavor::Inf(s2) => (Self::inf(*s2), Ordering::Equal),
                Flavor::NaN(err) => (Self::nan(*err), Ordering::Equal),
            },
            Flavor::Inf(s1) => match &d2.inner {
                Flavor::Value(_) => (Self::inf(*s1), Ordering::Equal),
                Flavor::Inf(s2) => {
                    if *s1 != *s2 {
                        (NAN, Ordering::Equal)
                    } else {
                        (Self::inf(*s2), Ordering::Equal)
                    }
                }
                Flavor::NaN(err) => (Self::nan(*err), Ordering::Equal),
            },
            Flavor::NaN(err) => (Self::nan(*err), Ordering::Equal),
        }
    }

    /// Computes the sum of the operands `ops`, correctly rounded to precision `p`
    /// using the rounding mode `rm`: the result is the representable number closest
    /// to the exact mathematical sum in the direction permitted by `rm`. The second
    /// returned value shows the position of the result relative to the exact sum:
    /// `Ordering::Less` if the result is smaller, `Ordering::Greater` if it is
    /// larger, and `Ordering::Equal` if the sum is exact. For a special result
    /// (`NaN`, `Inf`, or a zero) `Ordering::Equal` is returned.
    ///
    /// Special operands follow the usual conventions:
    ///
    ///  - any `NaN` operand gives a `NaN` result;
    ///  - infinities of both signs together give `NaN`, otherwise an infinite
    ///    operand makes the result infinite;
    ///  - a sum of zeros is a zero, negative if all the operands are negative
    ///    zeros, and positive otherwise, except under `RoundingMode::Down` where
    ///    mixed zero signs give a negative zero;
    ///  - complete cancellation of regular operands gives a positive zero, or a
    ///    negative zero under `RoundingMode::Down`.
    ///
    /// An empty list sums to a positive zero.
    pub fn sum(ops: &[&Self], p: usize, rm: RoundingMode) -> (Self, Ordering) {
        let mut sign_inf: Option<Sign> = None;
        let mut sign_zero: Option<Sign> = None;
        let mut zero_mixed = false;
        let mut regs: SmallVec<[&BigFloatNumber; 16]> = SmallVec::new();

        // a single pass sorts out the singular operands
        for x in ops {
            match &x.inner {
                Flavor::NaN(err) => return (Self::nan(*err), Ordering::Equal),
                Flavor::Inf(s) => match sign_inf {
                    None => sign_inf = Some(*s),
                    Some(si) if si != *s => return (NAN, Ordering::Equal),
                    _ => {}
                },
                Flavor::Value(v) => {
                    if v.is_zero() {
                        match sign_zero {
                            None => sign_zero = Some(v.sign()),
                            Some(sz) if sz != v.sign() => zero_mixed = true,
                            _ => {}
                        }
                    } else {
                        regs.push(v);
                    }
                }
            }
        }

        if let Some(s) = sign_inf {
            // infinities of a single sign dominate everything finite
            return (Self::inf(s), Ordering::Equal);
        }

        if regs.is_empty() {
            let s = match sign_zero {
                None => Sign::Pos, // no operands at all
                Some(s) if !zero_mixed => s,
                _ => {
                    if rm == RoundingMode::Down {
                        Sign::Neg
                    } else {
                        Sign::Pos
                    }
                }
            };

            return Self::result_with_ternary(BigFloatNumber::new(p).map(|mut v| {
                v.set_sign(s);
                (v, Ordering::Equal)
            }));
        }

        Self::result_with_ternary(BigFloatNumber::sum(&regs, p, rm))
    }
}

impl Clone for BigFloat {
    fn clone(&self) -> Self {
        match &self.inner {
            Flavor::Value(v) => Self::result_to_ext(v.clone()),
            Flavor::NaN(err) => Self::nan(*err),
            Flavor::Inf(s) => Self::inf(*s),
        }
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn test_sum_singular() {
        let one = BigFloat::from_word(1, 64);

        // any NaN operand gives NaN
        let (r, t) = BigFloat::sum(&[&one, &NAN, &INF_POS], 64, RoundingMode::ToEven);
        assert!(r.is_nan());
        assert_eq!(t, Ordering::Equal);

        // mixed infinities give NaN
        let (r, _) = BigFloat::sum(&[&INF_POS, &INF_NEG, &one], 64, RoundingMode::ToEven);
        assert!(r.is_nan());

        // infinities of one sign dominate
        let (r, t) = BigFloat::sum(&[&one, &INF_NEG, &one], 64, RoundingMode::ToEven);
        assert!(r.is_inf_neg());
        assert_eq!(t, Ordering::Equal);

        let (r, _) = BigFloat::sum(&[&INF_POS, &one, &INF_POS], 64, RoundingMode::ToEven);
        assert!(r.is_inf_pos());
    }

    #[test]
    fn test_sum_zeros() {
        let pz = BigFloat::new(64);
        let nz = pz.neg();

        // +0 - 0 - 0 is +0, and -0 toward negative infinity
        let (r, t) = BigFloat::sum(&[&pz, &nz, &nz], 64, RoundingMode::ToEven);
        assert!(r.is_zero());
        assert_eq!(r.sign(), Some(Sign::Pos));
        assert_eq!(t, Ordering::Equal);

        let (r, _) = BigFloat::sum(&[&pz, &nz, &nz], 64, RoundingMode::Down);
        assert!(r.is_zero());
        assert_eq!(r.sign(), Some(Sign::Neg));

        // unanimous signs are kept
        let (r, _) = BigFloat::sum(&[&nz, &nz, &nz], 64, RoundingMode::ToEven);
        assert_eq!(r.sign(), Some(Sign::Neg));

        // two zeros of opposite signs sum to +0 when rounding to nearest
        let (r, _) = BigFloat::sum(&[&pz, &nz], 64, RoundingMode::ToEven);
        assert_eq!(r.sign(), Some(Sign::Pos));

        // the empty sum is +0
        let (r, t) = BigFloat::sum(&[], 64, RoundingMode::Down);
        assert!(r.is_zero());
        assert_eq!(r.sign(), Some(Sign::Pos));
        assert_eq!(t, Ordering::Equal);
    }

    #[test]
    fn test_sum_mixed() {
        // zeros among regular operands do not change the result
        let one = BigFloat::from_word(1, 64);
        let two = BigFloat::from_word(2, 64);
        let three = BigFloat::from_word(3, 64);
        let z = BigFloat::new(64);

        let (r, t) = BigFloat::sum(&[&one, &z, &two, &z.neg()], 64, RoundingMode::ToEven);
        assert_eq!(r.cmp(&three), Some(0));
        assert_eq!(t, Ordering::Equal);

        // a single regular operand is copied
        let (r, t) = BigFloat::sum(&[&z, &three, &z], 64, RoundingMode::ToEven);
        assert_eq!(r.cmp(&three), Some(0));
        assert_eq!(t, Ordering::Equal);
    }

    #[test]
    fn test_sum_overflow_to_inf() {
        let m = BigFloat::from_raw_parts(
            &[crate::defs::WORD_MAX],
            crate::defs::WORD_BIT_SIZE,
            Sign::Pos,
            crate::defs::EXPONENT_MAX,
        );

        let (r, t) = BigFloat::sum(&[&m, &m, &m], 64, RoundingMode::ToEven);
        assert!(r.is_inf_pos());
        assert_eq!(t, Ordering::Greater);

        let mn = m.neg();
        let (r, t) = BigFloat::sum(&[&mn, &mn, &mn], 64, RoundingMode::ToEven);
        assert!(r.is_inf_neg());
        assert_eq!(t, Ordering::Less);
    }

    #[test]
    fn test_add() {
        let one = BigFloat::from_word(1, 64);

        let (r, _) = one.add(&INF_POS, 64, RoundingMode::ToEven);
        assert!(r.is_inf_pos());

        let (r, _) = INF_NEG.add(&one, 64, RoundingMode::ToEven);
        assert!(r.is_inf_neg());

        let (r, _) = INF_POS.add(&INF_NEG, 64, RoundingMode::ToEven);
        assert!(r.is_nan());

        let (r, _) = NAN.add(&one, 64, RoundingMode::ToEven);
        assert!(r.is_nan());

        let (r, t) = one.add(&one, 64, RoundingMode::ToEven);
        assert_eq!(r.cmp(&TWO), Some(0));
        assert_eq!(t, Ordering::Equal);
    }

    #[test]
    fn test_consts() {
        assert_eq!(ONE.precision(), Some(DEFAULT_P));
        let (r, t) = ONE.add(&ONE, DEFAULT_P, RoundingMode::ToEven);
        assert_eq!(r.cmp(&TWO), Some(0));
        assert_eq!(t, Ordering::Equal);
    }
}
