//! IEEE-754 二进制格式的位级辅助：分类、NaN 静默化、FPRF 编码

use crate::Flags;
use rustc_apfloat::Float;
use rustc_apfloat::ieee::{Double, Single};
use std::cmp::Ordering;

/// 单/双精度格式的位布局
///
/// 所有位模式以 `u128` 传递（与 `rustc_apfloat` 的 `to_bits` 一致），只使用低 `WIDTH` 位。
pub trait Format: Float {
    const WIDTH: u32;
    const FRAC_BITS: u32;

    const SIGN_MASK: u128 = 1 << (Self::WIDTH - 1);
    const FRAC_MASK: u128 = (1 << Self::FRAC_BITS) - 1;
    const EXP_MASK: u128 = (Self::SIGN_MASK - 1) & !Self::FRAC_MASK;
    const QUIET_MASK: u128 = 1 << (Self::FRAC_BITS - 1);
    /// 无 NaN 输入的无效操作产生的默认 QNaN
    const DEFAULT_NAN_BITS: u128 = Self::EXP_MASK | Self::QUIET_MASK;

    /// 宿主正确舍入的平方根，以及 r*r - x 的符号（判断是否不精确、向哪个方向舍入）
    fn sqrt_with_residual(bits: u128) -> (u128, Ordering);
}

impl Format for Single {
    const WIDTH: u32 = 32;
    const FRAC_BITS: u32 = 23;

    fn sqrt_with_residual(bits: u128) -> (u128, Ordering) {
        let x = f32::from_bits(bits as u32);
        let r = x.sqrt();
        // 24 位尾数的平方在 f64 中精确
        let wide = f64::from(r);
        let residual = wide * wide - f64::from(x);
        (u128::from(r.to_bits()), residual.partial_cmp(&0.0).unwrap_or(Ordering::Equal))
    }
}

impl Format for Double {
    const WIDTH: u32 = 64;
    const FRAC_BITS: u32 = 52;

    fn sqrt_with_residual(bits: u128) -> (u128, Ordering) {
        let x = f64::from_bits(bits as u64);
        let r = x.sqrt();
        // 极小操作数先放大 2^200，避免残差下溢为 0
        let (xs, rs) = if x < f64::from_bits(0x0870_0000_0000_0000) {
            let scale = 2f64.powi(200);
            let xs = x * scale;
            (xs, xs.sqrt())
        } else {
            (x, r)
        };
        let residual = rs.mul_add(rs, -xs);
        (u128::from(r.to_bits()), residual.partial_cmp(&0.0).unwrap_or(Ordering::Equal))
    }
}

/// 浮点数类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Class {
    Zero,
    Subnormal,
    Normal,
    Infinity,
    QuietNan,
    SignalingNan,
}

pub fn classify<F: Format>(bits: u128) -> Class {
    let exp = bits & F::EXP_MASK;
    let frac = bits & F::FRAC_MASK;
    match (exp == F::EXP_MASK, exp == 0, frac == 0) {
        (true, _, true) => Class::Infinity,
        (true, _, false) if frac & F::QUIET_MASK != 0 => Class::QuietNan,
        (true, _, false) => Class::SignalingNan,
        (false, true, true) => Class::Zero,
        (false, true, false) => Class::Subnormal,
        (false, false, _) => Class::Normal,
    }
}

pub fn is_nan<F: Format>(bits: u128) -> bool {
    matches!(classify::<F>(bits), Class::QuietNan | Class::SignalingNan)
}

pub fn is_signaling<F: Format>(bits: u128) -> bool {
    classify::<F>(bits) == Class::SignalingNan
}

pub fn is_infinite<F: Format>(bits: u128) -> bool {
    classify::<F>(bits) == Class::Infinity
}

pub fn is_zero<F: Format>(bits: u128) -> bool {
    classify::<F>(bits) == Class::Zero
}

pub fn is_subnormal<F: Format>(bits: u128) -> bool {
    classify::<F>(bits) == Class::Subnormal
}

pub fn is_negative<F: Format>(bits: u128) -> bool {
    bits & F::SIGN_MASK != 0
}

/// 置 quiet 位，保留符号与 payload
pub fn quiet<F: Format>(bits: u128) -> u128 {
    bits | F::QUIET_MASK
}

/// 结果的 FPRF 编码 (C FL FG FE FU)
pub fn fprf<F: Format>(bits: u128) -> Flags {
    let negative = is_negative::<F>(bits);
    match (classify::<F>(bits), negative) {
        (Class::QuietNan | Class::SignalingNan, _) => Flags::FPRF_C | Flags::FU,
        (Class::Infinity, true) => Flags::FL | Flags::FU,
        (Class::Infinity, false) => Flags::FG | Flags::FU,
        (Class::Normal, true) => Flags::FL,
        (Class::Normal, false) => Flags::FG,
        (Class::Subnormal, true) => Flags::FPRF_C | Flags::FL,
        (Class::Subnormal, false) => Flags::FPRF_C | Flags::FG,
        (Class::Zero, true) => Flags::FPRF_C | Flags::FE,
        (Class::Zero, false) => Flags::FE,
    }
}

/// 两个同格式位模式之间的 ULP 距离（按有序整数映射计算，+0 与 -0 距离为 0）
pub fn ulp_distance<F: Format>(a: u128, b: u128) -> u128 {
    let ordinal = |bits: u128| -> i128 {
        let magnitude = (bits & !F::SIGN_MASK) as i128;
        if is_negative::<F>(bits) {
            -magnitude
        } else {
            magnitude
        }
    };
    ordinal(a).abs_diff(ordinal(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_layout() {
        assert_eq!(Single::EXP_MASK, 0x7F80_0000);
        assert_eq!(Single::DEFAULT_NAN_BITS, 0x7FC0_0000);
        assert_eq!(Double::DEFAULT_NAN_BITS, 0x7FF8_0000_0000_0000);
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify::<Single>(0x8000_0000), Class::Zero);
        assert_eq!(classify::<Single>(0x0000_0001), Class::Subnormal);
        assert_eq!(classify::<Single>(0x7FA0_0000), Class::SignalingNan);
        assert_eq!(classify::<Double>(0xFFF0_0000_0000_0000), Class::Infinity);
    }

    #[test]
    fn test_fprf_encodings() {
        assert_eq!(fprf::<Single>(0x8000_0000), Flags::FPRF_C | Flags::FE);
        assert_eq!(fprf::<Double>(0x7FF8_0000_0000_0000), Flags::FPRF_C | Flags::FU);
        assert_eq!(fprf::<Double>(1.0f64.to_bits().into()), Flags::FG);
    }

    #[test]
    fn test_ulp_distance_crosses_zero() {
        assert_eq!(ulp_distance::<Single>(0x8000_0000, 0x0000_0000), 0);
        assert_eq!(ulp_distance::<Single>(0x8000_0001, 0x0000_0001), 2);
        assert_eq!(ulp_distance::<Single>(0x3F80_0000, 0x3F80_0003), 3);
    }

    #[test]
    fn test_sqrt_residual_direction() {
        let (r, residual) = Double::sqrt_with_residual(4.0f64.to_bits().into());
        assert_eq!(r, u128::from(2.0f64.to_bits()));
        assert_eq!(residual, Ordering::Equal);
        let (_, residual) = Single::sqrt_with_residual(2.0f32.to_bits().into());
        assert_ne!(residual, Ordering::Equal);
    }
}
