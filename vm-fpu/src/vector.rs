//! AltiVec 单精度向量运算
//!
//! 每个字元素独立计算，round-to-nearest-even，不产生 FPSCR 副作用。
//! Java 模式（VSCR[NJ] = 0）保留非规格化数；non-Java 模式把非规格化的输入和结果
//! 冲刷为同号零。无 NaN 输入的无效操作产生 0x7FC00000。

use crate::arith::{self, FusedOp};
use crate::format::{Format, is_nan, is_negative, is_subnormal, is_zero, quiet};
use crate::{Round, Single};
use rustc_apfloat::Float;
use std::cmp::Ordering;
use vm_simd::{Saturating, Vec128};

/// VSCR[NJ] 的取值
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VectorMode {
    pub non_java: bool,
}

impl VectorMode {
    pub const JAVA: VectorMode = VectorMode { non_java: false };
    pub const NON_JAVA: VectorMode = VectorMode { non_java: true };

    fn flush(self, bits: u32) -> u32 {
        if self.non_java && is_subnormal::<Single>(u128::from(bits)) {
            bits & 0x8000_0000
        } else {
            bits
        }
    }

    fn map1(self, a: Vec128, f: impl Fn(u32) -> u32) -> Vec128 {
        let a = a.to_words();
        Vec128::from_words(std::array::from_fn(|i| self.flush(f(self.flush(a[i])))))
    }

    fn map2(self, a: Vec128, b: Vec128, f: impl Fn(u32, u32) -> u32) -> Vec128 {
        let (a, b) = (a.to_words(), b.to_words());
        Vec128::from_words(std::array::from_fn(|i| {
            self.flush(f(self.flush(a[i]), self.flush(b[i])))
        }))
    }

    fn map3(self, a: Vec128, b: Vec128, c: Vec128, f: impl Fn(u32, u32, u32) -> u32) -> Vec128 {
        let (a, b, c) = (a.to_words(), b.to_words(), c.to_words());
        Vec128::from_words(std::array::from_fn(|i| {
            self.flush(f(self.flush(a[i]), self.flush(b[i]), self.flush(c[i])))
        }))
    }

    /// 比较类：只冲刷输入
    fn predicate(self, a: Vec128, b: Vec128, f: impl Fn(u32, u32) -> u32) -> Vec128 {
        let (a, b) = (a.to_words(), b.to_words());
        Vec128::from_words(std::array::from_fn(|i| f(self.flush(a[i]), self.flush(b[i]))))
    }
}

fn wide(bits: u32) -> u128 {
    u128::from(bits)
}

fn first_nan(operands: &[u32]) -> Option<u32> {
    operands
        .iter()
        .copied()
        .find(|&x| is_nan::<Single>(wide(x)))
        .map(|x| quiet::<Single>(wide(x)) as u32)
}

fn to_f32(bits: u32) -> f32 {
    f32::from_bits(bits)
}

/// vaddfp
pub fn add(a: Vec128, b: Vec128, mode: VectorMode) -> Vec128 {
    mode.map2(a, b, |x, y| arith::add::<Single>(wide(x), wide(y)).bits as u32)
}

/// vsubfp
pub fn sub(a: Vec128, b: Vec128, mode: VectorMode) -> Vec128 {
    mode.map2(a, b, |x, y| arith::sub::<Single>(wide(x), wide(y)).bits as u32)
}

/// vmaddfp：a * c + b，只舍入一次
pub fn multiply_add(a: Vec128, c: Vec128, b: Vec128, mode: VectorMode) -> Vec128 {
    mode.map3(a, c, b, |x, z, y| {
        arith::fused::<Single>(FusedOp::MultiplyAdd, wide(x), wide(z), wide(y)).bits as u32
    })
}

/// vnmsubfp：-(a * c - b)
pub fn negative_multiply_sub(a: Vec128, c: Vec128, b: Vec128, mode: VectorMode) -> Vec128 {
    mode.map3(a, c, b, |x, z, y| {
        arith::fused::<Single>(FusedOp::NegativeMultiplySub, wide(x), wide(z), wide(y)).bits as u32
    })
}

fn select_extreme(x: u32, y: u32, pick_greater: bool) -> u32 {
    if let Some(nan) = first_nan(&[x, y]) {
        return nan;
    }
    let order = match Single::from_bits(wide(x)).partial_cmp(&Single::from_bits(wide(y))) {
        // +0 大于 -0
        Some(Ordering::Equal) => is_negative::<Single>(wide(y)).cmp(&is_negative::<Single>(wide(x))),
        Some(order) => order,
        None => Ordering::Equal,
    };
    if (order == Ordering::Greater) == pick_greater { x } else { y }
}

/// vmaxfp
pub fn max(a: Vec128, b: Vec128, mode: VectorMode) -> Vec128 {
    mode.map2(a, b, |x, y| select_extreme(x, y, true))
}

/// vminfp
pub fn min(a: Vec128, b: Vec128, mode: VectorMode) -> Vec128 {
    mode.map2(a, b, |x, y| select_extreme(x, y, false))
}

/// vrfin / vrfiz / vrfip / vrfim
pub fn round_to_integral(a: Vec128, round: Round, mode: VectorMode) -> Vec128 {
    mode.map1(a, |x| {
        if let Some(nan) = first_nan(&[x]) {
            return nan;
        }
        Single::from_bits(wide(x)).round_to_integral(round).value.to_bits() as u32
    })
}

/// vrefp 的参考值：正确舍入的 1/x
pub fn reciprocal_estimate(a: Vec128, mode: VectorMode) -> Vec128 {
    let one = wide(1.0f32.to_bits());
    mode.map1(a, |x| arith::div::<Single>(one, wide(x)).bits as u32)
}

/// vrsqrtefp 的参考值
pub fn reciprocal_sqrt_estimate(a: Vec128, mode: VectorMode) -> Vec128 {
    mode.map1(a, |x| {
        if let Some(nan) = first_nan(&[x]) {
            return nan;
        }
        let bits = wide(x);
        if is_zero::<Single>(bits) {
            return x | Single::EXP_MASK as u32;
        }
        if is_negative::<Single>(bits) {
            return Single::DEFAULT_NAN_BITS as u32;
        }
        ((1.0 / f64::from(to_f32(x)).sqrt()) as f32).to_bits()
    })
}

/// vlogefp 的参考值：log2(x)
pub fn log2_estimate(a: Vec128, mode: VectorMode) -> Vec128 {
    mode.map1(a, |x| {
        if let Some(nan) = first_nan(&[x]) {
            return nan;
        }
        let bits = wide(x);
        if is_zero::<Single>(bits) {
            return f32::NEG_INFINITY.to_bits();
        }
        if is_negative::<Single>(bits) {
            return Single::DEFAULT_NAN_BITS as u32;
        }
        (f64::from(to_f32(x)).log2() as f32).to_bits()
    })
}

/// vexptefp 的参考值：2^x
pub fn exp2_estimate(a: Vec128, mode: VectorMode) -> Vec128 {
    mode.map1(a, |x| {
        if let Some(nan) = first_nan(&[x]) {
            return nan;
        }
        (f64::from(to_f32(x)).exp2() as f32).to_bits()
    })
}

fn scaled(x: u32, scale: u32) -> f64 {
    f64::from(to_f32(x)) * 2f64.powi((scale & 0x1F) as i32)
}

/// vctuxs：乘 2^scale 后向零截断，饱和到无符号字；NaN 结果为 0
pub fn to_unsigned_fixed(a: Vec128, scale: u32, mode: VectorMode) -> Saturating {
    convert_fixed(a, mode, |x| {
        if is_nan::<Single>(wide(x)) {
            return (0, false);
        }
        let v = scaled(x, scale).trunc();
        if v > f64::from(u32::MAX) {
            (u32::MAX, true)
        } else if v < 0.0 {
            (0, true)
        } else {
            (v as u32, false)
        }
    })
}

/// vctsxs：饱和到有符号字
pub fn to_signed_fixed(a: Vec128, scale: u32, mode: VectorMode) -> Saturating {
    convert_fixed(a, mode, |x| {
        if is_nan::<Single>(wide(x)) {
            return (0, false);
        }
        let v = scaled(x, scale).trunc();
        if v > f64::from(i32::MAX) {
            (i32::MAX as u32, true)
        } else if v < f64::from(i32::MIN) {
            (i32::MIN as u32, true)
        } else {
            (v as i32 as u32, false)
        }
    })
}

fn convert_fixed(a: Vec128, mode: VectorMode, f: impl Fn(u32) -> (u32, bool)) -> Saturating {
    let words = a.to_words();
    let mut saturated = false;
    let value = Vec128::from_words(std::array::from_fn(|i| {
        let (v, sat) = f(mode.flush(words[i]));
        saturated |= sat;
        v
    }));
    Saturating { value, saturated }
}

/// vcfux：无符号字除以 2^scale
pub fn from_unsigned_fixed(a: Vec128, scale: u32) -> Vec128 {
    let divisor = 2f64.powi((scale & 0x1F) as i32);
    let words = a.to_words();
    // f64 中的商是精确的，转 f32 只舍入一次
    Vec128::from_words(std::array::from_fn(|i| ((f64::from(words[i]) / divisor) as f32).to_bits()))
}

/// vcfsx：有符号字除以 2^scale
pub fn from_signed_fixed(a: Vec128, scale: u32) -> Vec128 {
    let divisor = 2f64.powi((scale & 0x1F) as i32);
    let words = a.to_words();
    Vec128::from_words(std::array::from_fn(|i| {
        ((f64::from(words[i] as i32) / divisor) as f32).to_bits()
    }))
}

fn compare_lanes(x: u32, y: u32) -> Option<Ordering> {
    Single::from_bits(wide(x)).partial_cmp(&Single::from_bits(wide(y)))
}

fn mask(condition: bool) -> u32 {
    if condition { u32::MAX } else { 0 }
}

/// vcmpeqfp
pub fn compare_equal(a: Vec128, b: Vec128, mode: VectorMode) -> Vec128 {
    mode.predicate(a, b, |x, y| mask(compare_lanes(x, y) == Some(Ordering::Equal)))
}

/// vcmpgefp
pub fn compare_greater_equal(a: Vec128, b: Vec128, mode: VectorMode) -> Vec128 {
    mode.predicate(a, b, |x, y| {
        mask(matches!(compare_lanes(x, y), Some(Ordering::Greater | Ordering::Equal)))
    })
}

/// vcmpgtfp
pub fn compare_greater(a: Vec128, b: Vec128, mode: VectorMode) -> Vec128 {
    mode.predicate(a, b, |x, y| mask(compare_lanes(x, y) == Some(Ordering::Greater)))
}

/// vcmpbfp：bit 0 为 a <= b 不成立，bit 1 为 a >= -b 不成立；NaN 两位都置 1
pub fn compare_bounds(a: Vec128, b: Vec128, mode: VectorMode) -> Vec128 {
    mode.predicate(a, b, |x, y| {
        let le = matches!(compare_lanes(x, y), Some(Ordering::Less | Ordering::Equal));
        let ge = matches!(
            compare_lanes(x, y ^ 0x8000_0000),
            Some(Ordering::Greater | Ordering::Equal)
        );
        (u32::from(!le) << 31) | (u32::from(!ge) << 30)
    })
}
