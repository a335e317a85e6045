//! Fixed-width two's-complement accumulator used by multi-operand summation.

use crate::common::buf::WordBuf;
use crate::common::util::add_slice;
use crate::common::util::add_word;
use crate::common::util::clear_bits_above;
use crate::common::util::count_leading_ones;
use crate::common::util::count_leading_zeroes;
use crate::common::util::shift_slice_left;
use crate::common::util::shift_slice_left_copy_out;
use crate::common::util::shift_slice_right_copy;
use crate::common::util::sub_slice;
use crate::common::util::sub_word;
use crate::defs::Error;
use crate::defs::Word;
use crate::defs::WORD_BIT_SIZE;
use crate::defs::WORD_MAX;
use crate::defs::WORD_SIGNIFICANT_BIT;
use crate::num::BigFloatNumber;

/// A two's-complement integer of a fixed width spanning the bit exponents
/// `[minexp, minexp + wq)`. The inputs folded into it contribute only their
/// bits of exponent smaller than `maxexp`; the `cq` bits above `maxexp`
/// absorb the carries of up to `2^logn` additions.
pub(crate) struct Accumulator {
    w: WordBuf,
    t: WordBuf, // scratch for aligning one input
    wq: usize,
    logn: usize,
    cq: usize,
    minexp: isize,
    maxexp: isize,
    pending: Option<isize>,
}

/// Outcome of a truncated summation pass.
pub(crate) struct TruncatedSum {
    /// Number of leading bits of the window equal to its sign bit.
    /// A value of 0 means the exact sum is zero.
    pub cancel: usize,

    /// Exponent of the truncated sum.
    pub e: isize,

    /// The final window LSB exponent.
    pub minexp: isize,

    /// Largest exponent of the bits that are not accumulated, if any.
    pub pending: Option<isize>,
}

impl Accumulator {
    /// New accumulator of `ws` words with the most significant fold bit just below
    /// `maxexp + cq`, where `cq = logn + 1`.
    pub fn new(ws: usize, logn: usize, maxexp: isize) -> Result<Self, Error> {
        let cq = logn + 1;
        let wq = ws * WORD_BIT_SIZE;

        Self::positioned(ws, logn, maxexp, maxexp + cq as isize - wq as isize)
    }

    /// New accumulator with an explicitly chosen LSB exponent.
    pub fn positioned(ws: usize, logn: usize, maxexp: isize, minexp: isize) -> Result<Self, Error> {
        debug_assert!(maxexp > minexp);

        let w = WordBuf::new(ws)?;
        let t = WordBuf::new(ws + 1)?;

        Ok(Accumulator {
            w,
            t,
            wq: ws * WORD_BIT_SIZE,
            logn,
            cq: logn + 1,
            minexp,
            maxexp,
            pending: None,
        })
    }

    pub fn words(&self) -> &[Word] {
        &self.w
    }

    pub fn words_mut(&mut self) -> &mut [Word] {
        &mut self.w
    }

    pub fn is_negative(&self) -> bool {
        self.w[self.w.len() - 1] & WORD_SIGNIFICANT_BIT != 0
    }

    /// Adds the bits of `x` with exponents inside `[minexp, maxexp)` into the window.
    fn fold(&mut self, x: &BigFloatNumber) {
        debug_assert!(!x.is_zero());

        let xm = x.mantissa().digits();
        let xs = xm.len();
        let xe = x.exponent() as isize;
        let xp = x.precision();

        debug_assert!(xm[xs - 1] & WORD_SIGNIFICANT_BIT != 0);

        let ws = self.w.len();

        // bit offset of the least significant represented bit of x
        // relative to the window LSB
        let vd = xe - (xs * WORD_BIT_SIZE) as isize - self.minexp;

        if vd < 0 {
            // x extends below the window LSB
            if xe <= self.minexp {
                // entirely below; to be taken into account at a later iteration
                if self.pending.map_or(true, |t| xe > t) {
                    self.pending = Some(xe);
                }
                return;
            }

            // significant bits below the window LSB are dropped at this iteration
            if xe - (xp as isize) < self.minexp {
                self.pending = Some(self.minexp);
            }

            let vd = (-vd) as usize;
            let vds = vd / WORD_BIT_SIZE;
            let rem = vd % WORD_BIT_SIZE;

            let mut vs = xs - vds;
            let mut vp: &[Word] = &xm[vds..];

            // bits of exponent >= maxexp have been accumulated at an earlier iteration
            let mut tr = if xe > self.maxexp {
                let drop = (xe - self.maxexp) as usize;
                debug_assert!(drop / WORD_BIT_SIZE < vs);
                vs -= drop / WORD_BIT_SIZE;
                drop % WORD_BIT_SIZE
            } else {
                0
            };

            if rem != 0 {
                shift_slice_right_copy(&vp[..vs], &mut self.t, rem);
                tr += rem;
                if tr >= WORD_BIT_SIZE {
                    vs -= 1;
                    tr -= WORD_BIT_SIZE;
                }
                debug_assert!(vs >= 1);
                if tr != 0 {
                    self.t[vs - 1] &= WORD_MAX >> tr;
                    tr = 0;
                }
                vp = &self.t[..vs];
            }

            debug_assert!(vs <= ws);

            // a top fragment that cannot be masked inside the immutable input
            // is accounted for through carry propagation after the addition
            let mut frag = 0;
            if tr != 0 {
                vs -= 1;
                frag = vp[vs] & (WORD_MAX >> tr);
            }

            if x.is_positive() {
                let mut c = add_slice(&mut self.w[..vs], &vp[..vs]);
                c += frag;
                if c != 0 && vs < ws {
                    add_word(&mut self.w[vs..], c);
                }
            } else {
                let mut b = sub_slice(&mut self.w[..vs], &vp[..vs]);
                b += frag;
                if b != 0 && vs < ws {
                    sub_word(&mut self.w[vs..], b);
                }
            }
        } else {
            // x lies at or above the window LSB
            let vd = vd as usize;
            let vds = vd / WORD_BIT_SIZE;

            if vds >= ws {
                return;
            }

            let rem = vd % WORD_BIT_SIZE;
            let ds = ws - vds;
            let mut vs = xs;

            let tr = if xe > self.maxexp {
                let drop = (xe - self.maxexp) as usize;
                if drop / WORD_BIT_SIZE >= vs {
                    return;
                }
                vs -= drop / WORD_BIT_SIZE;
                drop % WORD_BIT_SIZE
            } else {
                0
            };

            if rem == 0 {
                debug_assert!(vs <= ds);

                let mut frag = 0;
                if tr != 0 {
                    vs -= 1;
                    frag = xm[vs] & (WORD_MAX >> tr);
                }

                let dp = &mut self.w[vds..];

                if x.is_positive() {
                    let mut c = add_slice(&mut dp[..vs], &xm[..vs]);
                    c += frag;
                    if c != 0 && vs < ds {
                        add_word(&mut dp[vs..], c);
                    }
                } else {
                    let mut b = sub_slice(&mut dp[..vs], &xm[..vs]);
                    b += frag;
                    if b != 0 && vs < ds {
                        sub_word(&mut dp[vs..], b);
                    }
                }
            } else {
                // align in the scratch area
                let c = shift_slice_left_copy_out(&xm[..vs], &mut self.t, rem);
                self.t[vs] = c;
                let mut vlen = vs + 1;

                if tr != 0 {
                    // clear the bits at and above maxexp
                    let hb = (self.maxexp - self.minexp) as usize - vds * WORD_BIT_SIZE;
                    clear_bits_above(&mut self.t[..vlen], hb);
                }

                if vlen > ds {
                    // the clipped words are zero: the kept bits of x lie below the window top
                    vlen = ds;
                }

                let vp: &[Word] = &self.t[..vlen];
                let dp = &mut self.w[vds..];

                if x.is_positive() {
                    let c = add_slice(&mut dp[..vlen], vp);
                    if c != 0 && vlen < ds {
                        add_word(&mut dp[vlen..], c);
                    }
                } else {
                    let b = sub_slice(&mut dp[..vlen], vp);
                    if b != 0 && vlen < ds {
                        sub_word(&mut dp[vlen..], b);
                    }
                }
            }
        }
    }

    /// Repeatedly folds the inputs into the window until the accumulated part of the
    /// sum either is exact or dominates the not yet accumulated bits by `prec` bits
    /// of precision. Catastrophic cancellation is compensated by shifting the window
    /// contents left and lowering the window.
    pub fn sum_truncated(&mut self, ops: &[&BigFloatNumber], prec: usize) -> TruncatedSum {
        debug_assert!(self.wq >= self.logn + prec + 2);

        loop {
            self.pending = None;

            for x in ops {
                self.fold(x);
            }

            let neg = self.is_negative();

            let cancel = if neg {
                count_leading_ones(&self.w)
            } else {
                let cancel = count_leading_zeroes(&self.w);
                if cancel == self.wq {
                    // the truncated sum is zero
                    match self.pending {
                        None => {
                            // and so is the exact sum
                            return TruncatedSum {
                                cancel: 0,
                                e: 0,
                                minexp: self.minexp,
                                pending: None,
                            };
                        }
                        Some(top) => {
                            // restart the window right below the most significant
                            // bit that was not accumulated
                            self.maxexp = top;
                            self.minexp = top + self.cq as isize - self.wq as isize;
                            continue;
                        }
                    }
                }
                cancel
            };

            let e = self.minexp + (self.wq - cancel) as isize;

            let top = match self.pending {
                None => {
                    // the accumulated sum is exact
                    return TruncatedSum {
                        cancel,
                        e,
                        minexp: self.minexp,
                        pending: None,
                    };
                }
                Some(top) => top,
            };

            let err = top + self.logn as isize;

            if err <= e - prec as isize {
                return TruncatedSum {
                    cancel,
                    e,
                    minexp: self.minexp,
                    pending: self.pending,
                };
            }

            // cancellation exceeded the safety margin: keep two of the cancelled bits,
            // shift the rest out, and continue below the window
            let shift = cancel as isize - 2 - (err - e).max(0);
            debug_assert!(shift > 0);

            shift_slice_left(&mut self.w, shift as usize);
            self.minexp -= shift;
            self.maxexp = top;
        }
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::common::util::log2_ceil;
    use crate::defs::Sign;

    fn acc_for(sq: usize, rn: usize, maxexp: isize) -> Accumulator {
        let logn = log2_ceil(rn);
        let cq = logn + 1;
        let ws = (cq + sq + logn + 2 + WORD_BIT_SIZE - 1) / WORD_BIT_SIZE;
        Accumulator::new(ws, logn, maxexp).unwrap()
    }

    #[test]
    fn test_sum_truncated_exact() {
        // 1 + 1 + 1 = 11 in binary
        let one = BigFloatNumber::from_word(1, 1).unwrap();
        let ops: [&BigFloatNumber; 3] = [&one, &one, &one];

        let mut acc = acc_for(2, 3, 1);
        let st = acc.sum_truncated(&ops, 2 + 3);

        assert_eq!(st.e, 2);
        assert!(st.pending.is_none());
        assert!(!acc.is_negative());

        // -1 - 1 - 1
        let mone = {
            let mut v = BigFloatNumber::from_word(1, 1).unwrap();
            v.set_sign(Sign::Neg);
            v
        };
        let ops: [&BigFloatNumber; 3] = [&mone, &mone, &mone];

        let mut acc = acc_for(2, 3, 1);
        let st = acc.sum_truncated(&ops, 2 + 3);

        assert_eq!(st.e, 2);
        assert!(st.pending.is_none());
        assert!(acc.is_negative());
    }

    #[test]
    fn test_sum_truncated_zero() {
        let one = BigFloatNumber::from_word(1, 1).unwrap();
        let mone = {
            let mut v = BigFloatNumber::from_word(1, 1).unwrap();
            v.set_sign(Sign::Neg);
            v
        };
        let two = BigFloatNumber::from_word(2, 2).unwrap();
        let mtwo = {
            let mut v = BigFloatNumber::from_word(2, 2).unwrap();
            v.set_sign(Sign::Neg);
            v
        };

        let ops: [&BigFloatNumber; 4] = [&one, &mtwo, &two, &mone];

        let mut acc = acc_for(64, 4, 2);
        let st = acc.sum_truncated(&ops, 64 + 3);

        assert_eq!(st.cancel, 0);
        assert!(st.pending.is_none());
    }

    #[test]
    fn test_sum_truncated_gap() {
        // 2^100 - 2^100 + 2^-100: the window is re-homed over the gap
        let big = {
            let mut v = BigFloatNumber::from_word(1, 1).unwrap();
            v.set_exponent(101);
            v
        };
        let mbig = {
            let mut v = BigFloatNumber::from_word(1, 1).unwrap();
            v.set_exponent(101);
            v.set_sign(Sign::Neg);
            v
        };
        let tiny = {
            let mut v = BigFloatNumber::from_word(1, 1).unwrap();
            v.set_exponent(-99);
            v
        };

        let ops: [&BigFloatNumber; 3] = [&big, &mbig, &tiny];

        let mut acc = acc_for(53, 3, 101);
        let st = acc.sum_truncated(&ops, 53 + 3);

        assert_eq!(st.e, -99);
        assert!(st.pending.is_none());
        assert!(!acc.is_negative());
    }
}
