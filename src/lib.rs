//! Fsum computes correctly rounded sums of arbitrary precision floating point
//! numbers, purely in Rust.
//!
//! ## Introduction
//!
//! Summing a list of floating point numbers with a chain of additions rounds the
//! partial sum at every step, so the final result can be off by many ulps, and with
//! operands of mixed signs the error is unbounded: catastrophic cancellation can
//! erase all correct bits of the intermediate sums. [`BigFloat::sum`] instead
//! computes the value a single rounding of the exact mathematical sum would give,
//! for any number of operands, any per-operand precisions, and any spread of
//! exponents. Along with the sum it reports whether the returned number is below,
//! above, or equal to the exact sum.
//!
//! Each number consists of an array of words representing the mantissa, a
//! precision measured in bits, an exponent, and the sign. `NaN` and positive and
//! negative infinity exist as special values, and zeros are signed.
//!
//! The value of a finite number is `mantissa × 2^exponent`, where the mantissa is
//! read as a binary fraction in the interval [0.5, 1). Non-zero numbers are kept
//! normalized: the most significant bit of the mantissa is always set.
//!
//! ## Examples
//!
//! ``` rust
//! use fsum::{BigFloat, RoundingMode};
//! use core::cmp::Ordering;
//!
//! let one = BigFloat::from_word(1, 64);
//! let tiny = {
//!     let mut v = BigFloat::from_word(1, 64);
//!     v.set_exponent(-79); // 2^(-80)
//!     v
//! };
//!
//! // the exact sum 1 + 2^(-80) - 1 = 2^(-80) is recovered,
//! // although it never fits a 64-bit partial sum
//! let (s, t) = BigFloat::sum(&[&one, &tiny, &one.neg()], 64, RoundingMode::ToEven);
//!
//! assert_eq!(s.cmp(&tiny), Some(0));
//! assert_eq!(t, Ordering::Equal);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(missing_docs)]
#![deny(clippy::suspicious)]
#![allow(clippy::comparison_chain)]
#![allow(clippy::collapsible_else_if)]
#![allow(clippy::collapsible_if)]
#![allow(clippy::module_inception)]

#[cfg(not(feature = "std"))]
extern crate alloc;

mod common;
mod defs;
mod ext;
mod mantissa;
mod num;
mod ops;

pub use crate::defs::Error;
pub use crate::defs::Exponent;
pub use crate::defs::RoundingMode;
pub use crate::defs::Sign;
pub use crate::defs::Word;
pub use crate::ext::BigFloat;
pub use crate::ext::INF_NEG;
pub use crate::ext::INF_POS;
pub use crate::ext::NAN;
pub use crate::ext::ONE;
pub use crate::ext::TWO;

pub use crate::defs::DEFAULT_P;
pub use crate::defs::EXPONENT_MAX;
pub use crate::defs::EXPONENT_MIN;
pub use crate::defs::WORD_BASE;
pub use crate::defs::WORD_BIT_SIZE;
pub use crate::defs::WORD_MAX;
pub use crate::defs::WORD_SIGNIFICANT_BIT;
