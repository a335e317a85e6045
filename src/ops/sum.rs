//! Summation of a list of numbers with a single correct rounding.
//!
//! A naive chain of additions cannot deliver a correctly rounded sum: every
//! intermediate rounding loses information, and cancellation between operands
//! of opposite signs can wipe out arbitrarily many leading bits. Instead the
//! inputs are folded into a fixed-width two's-complement window which slides
//! from the most significant bits of the sum downwards, until the accumulated
//! part either is exact or provably dominates everything not yet accumulated.
//! When the truncated sum lands too close to a rounding boundary to decide the
//! direction (the table maker's dilemma), the sign of the exact residual is
//! computed with a second, narrower window.

use crate::common::buf::WordBuf;
use crate::common::util::add_word;
use crate::common::util::com_slice;
use crate::common::util::log2_ceil;
use crate::common::util::low_bits_zero;
use crate::common::util::shift_slice_left_copy;
use crate::common::util::slice_bit;
use crate::common::util::sub_word;
use crate::defs::Error;
use crate::defs::Exponent;
use crate::defs::RoundingMode;
use crate::defs::Sign;
use crate::defs::Word;
use crate::defs::EXPONENT_MAX;
use crate::defs::EXPONENT_MIN;
use crate::defs::WORD_BIT_SIZE;
use crate::defs::WORD_MAX;
use crate::defs::WORD_SIGNIFICANT_BIT;
use crate::mantissa::Accumulator;
use crate::mantissa::Mantissa;
use crate::mantissa::TruncatedSum;
use crate::num::BigFloatNumber;
use core::cmp::Ordering;

impl BigFloatNumber {
    /// Computes the sum of the finite non-zero operands `ops`, correctly rounded
    /// to precision `p` using the rounding mode `rm`. The second returned value
    /// shows the position of the result relative to the exact sum.
    ///
    /// If the exact sum is zero, the returned zero is positive, except under
    /// `RoundingMode::Down` where it is negative.
    ///
    /// ## Errors
    ///
    ///  - ExponentOverflow: the result is out of the exponent range.
    ///  - InvalidArgument: the precision is incorrect.
    ///  - MemoryAllocation: failed to allocate memory for mantissa.
    pub fn sum(ops: &[&Self], p: usize, rm: RoundingMode) -> Result<(Self, Ordering), Error> {
        Self::p_assertion(p)?;

        match ops.len() {
            0 => Ok((Self::new(p)?, Ordering::Equal)),
            1 => ops[0].copy_rounded(p, rm),
            2 => ops[0].add_rounded(ops[1], p, rm),
            _ => Self::sum_regular(ops, p, rm),
        }
    }

    // The generic case: three or more operands.
    fn sum_regular(ops: &[&Self], sq: usize, rm: RoundingMode) -> Result<(Self, Ordering), Error> {
        let rn = ops.len();
        let logn = log2_ceil(rn);
        let cq = logn + 1;

        let maxexp = ops
            .iter()
            .map(|x| x.exponent() as isize)
            .fold(isize::MIN, isize::max);

        // cq bits of headroom for the carries, sq + logn + 2 bits below them,
        // so that the error of the truncated sum stays under control
        let ws = (cq + sq + logn + 2 + WORD_BIT_SIZE - 1) / WORD_BIT_SIZE;

        let mut acc = Accumulator::new(ws, logn, maxexp)?;

        let st = acc.sum_truncated(ops, sq + 3);

        if st.cancel == 0 {
            // complete cancellation: the exact sum is zero
            let mut ret = Self::new(sq)?;
            if rm == RoundingMode::Down {
                ret.set_sign(Sign::Neg);
            }
            return Ok((ret, Ordering::Equal));
        }

        Self::round_window(&acc, &st, ops, sq, rm, logn)
    }

    // Turns the two's-complement window into a sign-magnitude result of precision
    // `sq`, correctly rounded, together with the ternary value.
    fn round_window(
        acc: &Accumulator,
        st: &TruncatedSum,
        ops: &[&Self],
        sq: usize,
        rm: RoundingMode,
        logn: usize,
    ) -> Result<(Self, Ordering), Error> {
        let w = acc.words();
        let neg = acc.is_negative();
        let pos = !neg;
        let sign = if neg { Sign::Neg } else { Sign::Pos };

        let e = st.e;
        let minexp = st.minexp;
        let u = e - sq as isize;

        let sn = Mantissa::bit_len_to_word_len(sq);
        let mut m = WordBuf::new(sn)?;

        // the window bits [u, e) become the significand of the result;
        // bits below the window LSB read as zero
        let delta = e - minexp - (sn * WORD_BIT_SIZE) as isize;
        if delta >= 0 {
            // read the window shifted right by delta
            let idx = delta as usize / WORD_BIT_SIZE;
            let bits = delta as usize % WORD_BIT_SIZE;

            for (i, d) in m.iter_mut().enumerate() {
                let j = i + idx;
                let mut v = if j < w.len() { w[j] >> bits } else { 0 };
                if bits > 0 && j + 1 < w.len() {
                    v |= w[j + 1] << (WORD_BIT_SIZE - bits);
                }
                *d = v;
            }
        } else {
            shift_slice_left_copy(w, &mut m, (-delta) as usize);
        }

        if neg {
            // the magnitude of a negative window is reconstructed from the
            // complemented bits; the missing +1 surfaces as `carryx` below
            com_slice(&mut m);
        }

        let tz = sn * WORD_BIT_SIZE - sq;
        if tz > 0 {
            m[0] = m[0] >> tz << tz;
        }

        // the rounding bit of the two's-complement window,
        // and whether anything is set below it
        let rpos = u - 1 - minexp;
        let rbit = rpos >= 0 && slice_bit(w, rpos as usize);
        let lowzero = rpos <= 0 || low_bits_zero(w, rpos as usize);

        let away = rm == RoundingMode::FromZero
            || (pos && rm == RoundingMode::Up)
            || (neg && rm == RoundingMode::Down);

        let mut corr;
        let tern;

        if let Some(top) = st.pending {
            // the window is exact only down to 2^(err + 1)
            let err = top + logn as isize;
            debug_assert!(u - err >= 3);

            match window_run(w, err - minexp, rpos) {
                Some(run) if run == rbit => {
                    // the exact sum is within 2^err of a number representable
                    // in sq bits; the residual below that number decides
                    let sst = Self::residual_sign(acc, st, ops, top, err, sq, logn)?;
                    let sst_m = if neg { -sst } else { sst };

                    // offset of the boundary number from the extracted significand
                    let beta = (if neg { !rbit } else { rbit }) as i32;

                    if sst == 0 {
                        corr = beta;
                        tern = Ordering::Equal;
                    } else if rm == RoundingMode::ToEven {
                        corr = beta;
                        tern = if sst > 0 { Ordering::Less } else { Ordering::Greater };
                    } else if away {
                        corr = beta + (sst_m > 0) as i32;
                        tern = if pos { Ordering::Greater } else { Ordering::Less };
                    } else {
                        corr = beta - (sst_m < 0) as i32;
                        tern = if pos { Ordering::Less } else { Ordering::Greater };
                    }
                }
                Some(_) if rm == RoundingMode::ToEven => {
                    // the exact sum is within 2^err of a halfway point
                    let sst = Self::residual_sign(acc, st, ops, top, err, sq, logn)?;
                    let sst_m = if neg { -sst } else { sst };

                    let up = if sst_m == 0 {
                        // exactly halfway, ties to even
                        slice_bit(&m, tz)
                    } else {
                        sst_m > 0
                    };

                    corr = up as i32;
                    tern = if up == pos { Ordering::Greater } else { Ordering::Less };
                }
                _ => {
                    // the known bits round on their own; the result is inexact
                    // in any case, and the rounding bit is not affected by the
                    // residual
                    let inc = match rm {
                        RoundingMode::ToEven => {
                            if pos {
                                rbit
                            } else {
                                !rbit
                            }
                        }
                        _ => away,
                    };

                    corr = inc as i32;
                    tern = if inc == pos { Ordering::Greater } else { Ordering::Less };
                }
            }
        } else {
            // the window holds the exact sum
            let (mrbit, msticky, carryx) = if pos {
                (rbit, !lowzero, false)
            } else if lowzero {
                (rbit, false, !rbit)
            } else {
                (!rbit, true, false)
            };

            let inexact = mrbit || msticky;

            let inc = inexact
                && match rm {
                    RoundingMode::ToEven => mrbit && (msticky || slice_bit(&m, tz)),
                    _ => away,
                };

            corr = carryx as i32 + inc as i32;
            tern = if !inexact {
                Ordering::Equal
            } else if inc == pos {
                Ordering::Greater
            } else {
                Ordering::Less
            };
        }

        // apply the correction one ulp at a time, renormalizing at the powers of two
        let mut e = e;
        while corr > 0 {
            if add_word(&mut m, (1 as Word) << tz) != 0 {
                let l = m.len();
                m[l - 1] = WORD_SIGNIFICANT_BIT;
                e += 1;
            }
            corr -= 1;
        }
        while corr < 0 {
            sub_word(&mut m, (1 as Word) << tz);
            if m[sn - 1] & WORD_SIGNIFICANT_BIT == 0 {
                // crossed a power of two downwards
                m.fill(WORD_MAX);
                if tz > 0 {
                    m[0] = m[0] >> tz << tz;
                }
                e -= 1;
            }
            corr += 1;
        }

        if e > EXPONENT_MAX as isize || e < EXPONENT_MIN as isize {
            return Err(Error::ExponentOverflow(sign));
        }

        let ret = BigFloatNumber::from_parts_unchecked(
            Mantissa::from_word_buf(m, sq),
            sign,
            e as Exponent,
        );

        Ok((ret, tern))
    }

    // Determines the sign of the exact sum of everything below the boundary
    // number: the low bits of the window and the bits of the inputs that were
    // never accumulated. Returns -1, 0, or 1.
    fn residual_sign(
        acc: &Accumulator,
        st: &TruncatedSum,
        ops: &[&Self],
        top: isize,
        err: isize,
        sq: usize,
        logn: usize,
    ) -> Result<i32, Error> {
        let wq = acc.words().len() * WORD_BIT_SIZE;
        let zs = Mantissa::bit_len_to_word_len(wq - sq);
        let zq = zs * WORD_BIT_SIZE;

        let minexp = err + 2 - zq as isize;
        let mut z = Accumulator::positioned(zs, logn, top, minexp)?;

        // Seed with the window bits of exponent below err + 2, placed flush at
        // the top of the new window. The two bits at err + 1 and err belong to
        // the run below the rounding bit, which makes the seed, read as a
        // two's-complement number, exactly the offset of the accumulated sum
        // from the boundary number. When even err + 1 is below the window LSB,
        // the offset is zero.
        if err >= st.minexp {
            let sb = (err + 2 - st.minexp) as usize;
            shift_slice_left_copy(acc.words(), z.words_mut(), zq - sb);
        }

        let zst = z.sum_truncated(ops, 0);

        Ok(if zst.cancel == 0 {
            0
        } else if z.is_negative() {
            -1
        } else {
            1
        })
    }
}

// The value of the window bits [lo, hi) if they are all equal.
// Positions below the window LSB read as zero.
fn window_run(w: &[Word], lo: isize, hi: isize) -> Option<bool> {
    if hi <= 0 {
        return Some(false);
    }

    let hiu = hi as usize;

    if lo < 0 {
        return if low_bits_zero(w, hiu) { Some(false) } else { None };
    }

    let lou = lo as usize;
    let first = slice_bit(w, lou);

    for i in lou + 1..hiu {
        if slice_bit(w, i) != first {
            return None;
        }
    }

    Some(first)
}
