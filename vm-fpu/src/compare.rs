//! fcmpu / fcmpo

use crate::format::{Format, is_nan, is_signaling};
use crate::{Flags, FpResult};
use std::cmp::Ordering;

/// CR 字段中的比较结果位（高位在前：LT GT EQ UN）
pub const CR_LT: u8 = 0b1000;
pub const CR_GT: u8 = 0b0100;
pub const CR_EQ: u8 = 0b0010;
pub const CR_UN: u8 = 0b0001;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareKind {
    /// fcmpu：只有 SNaN 置 VXSNAN
    Unordered,
    /// fcmpo：任一 NaN 还会置 VXVC
    Ordered,
}

/// 比较 frA 与 frB
///
/// 结果的 `bits` 是写入目标 CR 字段的 4 位值，`flags` 中的 FPCC 与之相同。
pub fn compare<F: Format>(kind: CompareKind, a: u128, b: u128) -> FpResult {
    let field = match F::from_bits(a).partial_cmp(&F::from_bits(b)) {
        Some(Ordering::Less) => CR_LT,
        Some(Ordering::Greater) => CR_GT,
        Some(Ordering::Equal) => CR_EQ,
        None => CR_UN,
    };

    let mut flags = Flags::from_fpcc(field);
    if is_signaling::<F>(a) || is_signaling::<F>(b) {
        flags |= Flags::VXSNAN;
    }
    if kind == CompareKind::Ordered && (is_nan::<F>(a) || is_nan::<F>(b)) {
        flags |= Flags::VXVC;
    }
    FpResult::new(u128::from(field), flags)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Double, Single};

    fn d(x: f64) -> u128 {
        u128::from(x.to_bits())
    }

    #[test]
    fn test_signed_zeros_compare_equal() {
        let r = compare::<Double>(CompareKind::Unordered, d(0.0), d(-0.0));
        assert_eq!(r.bits, u128::from(CR_EQ));
        assert_eq!(r.flags, Flags::FE);
    }

    #[test]
    fn test_ordering() {
        let r = compare::<Double>(CompareKind::Ordered, d(-1.0), d(f64::INFINITY));
        assert_eq!(r.bits, u128::from(CR_LT));
        let r = compare::<Single>(CompareKind::Ordered, 0x4000_0000, 0x3F80_0000);
        assert_eq!(r.bits, u128::from(CR_GT));
    }

    #[test]
    fn test_nan_is_unordered() {
        let nan = 0x7FF8_0000_0000_0000;
        let u = compare::<Double>(CompareKind::Unordered, nan, d(1.0));
        assert_eq!(u.bits, u128::from(CR_UN));
        assert_eq!(u.flags, Flags::FU);

        let o = compare::<Double>(CompareKind::Ordered, d(1.0), nan);
        assert!(o.flags.contains(Flags::VXVC | Flags::VX | Flags::FX | Flags::FU));
    }

    #[test]
    fn test_signaling_nan() {
        let snan = 0x7FF4_0000_0000_0000;
        let u = compare::<Double>(CompareKind::Unordered, snan, d(1.0));
        assert!(u.flags.contains(Flags::VXSNAN));
        assert!(!u.flags.contains(Flags::VXVC));
    }
}
