//! 舍入与转换：frsp、fcfid、fctiw / fctiwz / fctidz

use crate::arith::rounded;
use crate::format::{Format, fprf, is_nan, is_signaling, quiet};
use crate::{Double, Flags, FpResult, Single};
use rustc_apfloat::{Float, FloatConvert, Round};

/// frsp：双精度舍入到单精度，结果以双精度格式写回
///
/// FPRF 按单精度分类（单精度非规格化数报告为非规格化）。
pub fn round_to_single(b: u128) -> FpResult {
    if is_nan::<Double>(b) {
        // 静默化后截断到单精度 payload 宽度
        let bits = quiet::<Double>(b) & !((1u128 << (Double::FRAC_BITS - Single::FRAC_BITS)) - 1);
        let flags = if is_signaling::<Double>(b) {
            Flags::VXSNAN
        } else {
            Flags::empty()
        };
        return FpResult::new(bits, flags | fprf::<Double>(bits));
    }

    let source = Double::from_bits(b);
    let narrow = |round: Round| {
        let mut loses_info = false;
        FloatConvert::<Single>::convert_r(source, round, &mut loses_info)
    };
    let mut result = rounded::<Single>(narrow(Round::NearestTiesToEven), || {
        narrow(Round::TowardZero)
    });
    let mut loses_info = false;
    let widened = FloatConvert::<Double>::convert(Single::from_bits(result.bits), &mut loses_info);
    result.bits = widened.value.to_bits();
    result
}

/// fcfid：64 位有符号整数（frB 的位模式）转双精度
pub fn from_integer(b: u128) -> FpResult {
    let value = i128::from(b as u64 as i64);
    rounded::<Double>(Double::from_i128_r(value, Round::NearestTiesToEven), || {
        Double::from_i128_r(value, Round::TowardZero)
    })
}

/// 转换目标宽度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntWidth {
    /// fctiw / fctiwz：结果在低 32 位
    Word,
    /// fctid / fctidz
    Doubleword,
}

impl IntWidth {
    fn min(self) -> i64 {
        match self {
            IntWidth::Word => i64::from(i32::MIN),
            IntWidth::Doubleword => i64::MIN,
        }
    }

    fn max(self) -> i64 {
        match self {
            IntWidth::Word => i64::from(i32::MAX),
            IntWidth::Doubleword => i64::MAX,
        }
    }

    /// 可表示范围的上界（不含）
    fn upper_bound(self) -> f64 {
        match self {
            IntWidth::Word => 2f64.powi(31),
            IntWidth::Doubleword => 2f64.powi(63),
        }
    }

    fn encode(self, value: i64) -> u128 {
        match self {
            IntWidth::Word => u128::from(value as i32 as u32),
            IntWidth::Doubleword => u128::from(value as u64),
        }
    }
}

/// fctiw / fctiwz / fctidz：双精度转有符号整数
///
/// NaN 与超出范围的值饱和并置 VXCVI（NaN 取最小值）。FPRF 未定义；
/// 字宽结果的高 32 位未定义，由调用方在比较掩码中排除。
pub fn to_integer(b: u128, width: IntWidth, round: Round) -> FpResult {
    if is_nan::<Double>(b) {
        let mut flags = Flags::VXCVI;
        if is_signaling::<Double>(b) {
            flags |= Flags::VXSNAN;
        }
        return FpResult::new(width.encode(width.min()), flags).with_undefined(Flags::FPRF);
    }

    let x = f64::from_bits(b as u64);
    let r = match round {
        Round::NearestTiesToEven => x.round_ties_even(),
        Round::NearestTiesToAway => x.round(),
        Round::TowardPositive => x.ceil(),
        Round::TowardNegative => x.floor(),
        Round::TowardZero => x.trunc(),
    };
    let upper = width.upper_bound();
    if r >= upper || r < -upper {
        let saturated = if r > 0.0 { width.max() } else { width.min() };
        return FpResult::new(width.encode(saturated), Flags::VXCVI).with_undefined(Flags::FPRF);
    }

    let mut flags = Flags::empty();
    if r != x {
        flags |= Flags::XX | Flags::FI;
        if r.abs() > x.abs() {
            flags |= Flags::FR;
        }
    }
    FpResult::new(width.encode(r as i64), flags).with_undefined(Flags::FPRF)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(x: f64) -> u128 {
        u128::from(x.to_bits())
    }

    #[test]
    fn test_frsp_rounds_once() {
        let r = round_to_single(d(1.6));
        assert_eq!(r.bits, d(f64::from(1.6f32)));
        assert!(r.flags.contains(Flags::XX | Flags::FI | Flags::FG));

        let exact = round_to_single(d(1.5));
        assert_eq!(exact.flags, Flags::FG);
    }

    #[test]
    fn test_frsp_overflow() {
        let r = round_to_single(d(f64::MAX));
        assert_eq!(r.bits, d(f64::INFINITY));
        assert!(r.flags.contains(Flags::OX | Flags::XX));
    }

    #[test]
    fn test_frsp_nan_payload_truncated() {
        let r = round_to_single(0x7FF0_0000_0000_0001);
        assert_eq!(r.bits, 0x7FF8_0000_0000_0000);
        assert!(r.flags.contains(Flags::VXSNAN));
    }

    #[test]
    fn test_fcfid() {
        assert_eq!(from_integer(u128::from((-3i64) as u64)).bits, d(-3.0));
        // 2^53 + 1 不能精确表示
        let r = from_integer((1u128 << 53) + 1);
        assert!(r.flags.contains(Flags::XX | Flags::FI));
    }

    #[test]
    fn test_fctiw_rounding_modes() {
        let r = to_integer(d(1.5), IntWidth::Word, Round::NearestTiesToEven);
        assert_eq!(r.bits, 2);
        assert!(r.flags.contains(Flags::XX | Flags::FR));
        assert!(r.undefined.contains(Flags::FPRF));

        let r = to_integer(d(2.5), IntWidth::Word, Round::NearestTiesToEven);
        assert_eq!(r.bits, 2);
        assert!(!r.flags.contains(Flags::FR));

        let r = to_integer(d(-1.6), IntWidth::Word, Round::TowardZero);
        assert_eq!(r.bits, 0xFFFF_FFFF);
    }

    #[test]
    fn test_fctiw_saturation() {
        let r = to_integer(d(20000000000.0), IntWidth::Word, Round::TowardZero);
        assert_eq!(r.bits, 0x7FFF_FFFF);
        assert!(r.flags.contains(Flags::VXCVI | Flags::VX | Flags::FX));

        let r = to_integer(d(f64::NEG_INFINITY), IntWidth::Doubleword, Round::TowardZero);
        assert_eq!(r.bits, 0x8000_0000_0000_0000);

        let r = to_integer(0x7FF8_0000_0000_0000, IntWidth::Word, Round::NearestTiesToEven);
        assert_eq!(r.bits, 0x8000_0000);
        assert!(!r.flags.contains(Flags::VXSNAN));
    }

    #[test]
    fn test_fctidz_round_trips_through_fcfid() {
        let r = to_integer(d(-20000.5), IntWidth::Doubleword, Round::TowardZero);
        assert_eq!(from_integer(r.bits).bits, d(-20000.0));
    }
}
