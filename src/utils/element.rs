use std::fmt::{Debug, Display};
use std::str::FromStr;

use half::f16;
use num::{Float, Num, NumCast, ToPrimitive};

/// Element type of document-term vectors and matrices.
///
/// Implemented for the primitive integers, `f16`, `f32` and `f64`.
/// `IS_FLOAT` lets in-place weighting refuse integer matrices at runtime,
/// which mirrors the observable behaviour of a dynamically typed matrix.
pub trait Element:
    Num + NumCast + Copy + PartialOrd + Default + Debug + Send + Sync + 'static
{
    const IS_FLOAT: bool;
    const NAME: &'static str;
    const MAX: Self;

    /// Converts from `f64`, yielding zero when the value is not representable
    /// (e.g. `300.0` into `i8`).
    #[inline]
    fn from_f64_lossy(value: f64) -> Self {
        <Self as NumCast>::from(value).unwrap_or_else(Self::zero)
    }

    /// Converts a term count, saturating at [`Element::MAX`].
    #[inline]
    fn from_count(count: u64) -> Self {
        <Self as NumCast>::from(count)
            .filter(|value| *value <= Self::MAX)
            .unwrap_or(Self::MAX)
    }

    #[inline]
    fn as_f64(self) -> f64 {
        self.to_f64().unwrap_or(0.0)
    }
}

/// Floating point element usable for weighted matrices and model storage.
pub trait FloatElement: Element + Float + Display + FromStr {}

macro_rules! impl_element {
    ($($t:ty => $is_float:expr),* $(,)?) => {
        $(
            impl Element for $t {
                const IS_FLOAT: bool = $is_float;
                const NAME: &'static str = stringify!($t);
                const MAX: Self = <$t>::MAX;
            }
        )*
    };
}

impl_element!(
    i8 => false,
    i16 => false,
    i32 => false,
    i64 => false,
    u8 => false,
    u16 => false,
    u32 => false,
    u64 => false,
    usize => false,
    f16 => true,
    f32 => true,
    f64 => true,
);

impl FloatElement for f16 {}
impl FloatElement for f32 {}
impl FloatElement for f64 {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_flags() {
        assert!(!<i8 as Element>::IS_FLOAT);
        assert!(!<u64 as Element>::IS_FLOAT);
        assert!(<f16 as Element>::IS_FLOAT);
        assert!(<f64 as Element>::IS_FLOAT);
        assert_eq!(<f32 as Element>::NAME, "f32");
        assert_eq!(<f16 as Element>::NAME, "f16");
    }

    #[test]
    fn lossy_conversion_falls_back_to_zero() {
        assert_eq!(i8::from_f64_lossy(3.0), 3);
        assert_eq!(i8::from_f64_lossy(300.0), 0);
        assert_eq!(u8::from_f64_lossy(-1.0), 0);
        assert_eq!(f32::from_f64_lossy(0.5), 0.5f32);
        assert_eq!(f16::from_f64_lossy(2.0), f16::from_f32(2.0));
    }

    #[test]
    fn counts_saturate() {
        assert_eq!(u8::from_count(7), 7);
        assert_eq!(u8::from_count(256), u8::MAX);
        assert_eq!(i8::from_count(u64::MAX), i8::MAX);
        assert_eq!(u64::from_count(u64::MAX), u64::MAX);
        assert_eq!(f16::from_count(1_000_000), f16::MAX);
        assert_eq!(f64::from_count(3), 3.0);
    }
}
