//! vm-simd - 128 位向量整数运算参考模型
//! 为 oracle 提供 AltiVec/VMX 整数指令的逐元素参考语义，并通过 `host` 模块暴露宿主 SSE2 执行路径。
//!
//! ## 特性
//! - 大端元素编号：元素 0 位于 128 位值的最高有效位
//! - 模运算与饱和运算（饱和时报告 SAT）
//! - 平均、最值、比较、移位与循环移位
//! - 奇偶元素乘法与跨元素求和
//! - 置换、打包/解包、合并（见 `permute`）

use std::fmt;

pub mod host;
pub mod permute;

/// 128 位向量寄存器值
///
/// 元素按大端编号：`lane(1, 0)` 是最高字节，`lane(4, 3)` 是最低字。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Vec128(pub u128);

impl Vec128 {
    pub const ZERO: Vec128 = Vec128(0);
    pub const ONES: Vec128 = Vec128(u128::MAX);

    pub fn from_words(words: [u32; 4]) -> Self {
        Self::from_lanes(4, &words.map(u64::from))
    }

    pub fn to_words(self) -> [u32; 4] {
        std::array::from_fn(|i| self.lane(4, i) as u32)
    }

    pub fn from_halves(halves: [u16; 8]) -> Self {
        Self::from_lanes(2, &halves.map(u64::from))
    }

    pub fn to_halves(self) -> [u16; 8] {
        std::array::from_fn(|i| self.lane(2, i) as u16)
    }

    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Vec128(u128::from_be_bytes(bytes))
    }

    pub fn to_bytes(self) -> [u8; 16] {
        self.0.to_be_bytes()
    }

    /// 从大端编号的元素序列构造
    pub fn from_lanes(element_size: u8, values: &[u64]) -> Self {
        values
            .iter()
            .enumerate()
            .fold(Vec128::ZERO, |acc, (i, &v)| acc.with_lane(element_size, i, v))
    }

    /// 元素个数
    pub fn lanes(element_size: u8) -> usize {
        16 / usize::from(element_size.max(1))
    }

    /// 读取第 `index` 个元素（零扩展）
    pub fn lane(self, element_size: u8, index: usize) -> u64 {
        let (_, mask) = geometry(element_size);
        let shift = lane_shift(element_size, index);
        ((self.0 >> shift) & mask) as u64
    }

    /// 读取第 `index` 个元素（符号扩展）
    pub fn lane_signed(self, element_size: u8, index: usize) -> i64 {
        sign_extend(self.lane(element_size, index), u32::from(element_size) * 8)
    }

    /// 替换第 `index` 个元素
    pub fn with_lane(self, element_size: u8, index: usize, value: u64) -> Self {
        let (_, mask) = geometry(element_size);
        let shift = lane_shift(element_size, index);
        let cleared = self.0 & !(mask << shift);
        Vec128(cleared | ((u128::from(value) & mask) << shift))
    }

    /// 所有元素均为 `value`
    pub fn splat(element_size: u8, value: u64) -> Self {
        let lanes = Self::lanes(element_size);
        (0..lanes).fold(Vec128::ZERO, |acc, i| acc.with_lane(element_size, i, value))
    }
}

impl fmt::Display for Vec128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

impl fmt::LowerHex for Vec128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

/// 饱和运算结果：值 + 是否发生饱和（对应 VSCR[SAT]）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Saturating {
    pub value: Vec128,
    pub saturated: bool,
}

impl Saturating {
    pub fn exact(value: Vec128) -> Self {
        Self {
            value,
            saturated: false,
        }
    }
}

fn geometry(element_size: u8) -> (u32, u128) {
    let lane_bits = u32::from(element_size.max(1)) * 8;
    // 16 字节元素占满整个寄存器
    let mask = 1u128.checked_shl(lane_bits).map_or(u128::MAX, |bit| bit - 1);
    (lane_bits, mask)
}

fn lane_shift(element_size: u8, index: usize) -> u32 {
    let lanes = Vec128::lanes(element_size);
    let (lane_bits, _) = geometry(element_size);
    (lanes - 1 - index) as u32 * lane_bits
}

/// 将 `bits` 位宽的值符号扩展到 i64
pub fn sign_extend(value: u64, bits: u32) -> i64 {
    if bits >= 64 {
        return value as i64;
    }
    let shift = 64 - bits;
    ((value << shift) as i64) >> shift
}

fn clamp_signed(value: i128, bits: u32) -> (u64, bool) {
    let max = (1i128 << (bits - 1)) - 1;
    let min = -(1i128 << (bits - 1));
    if value > max {
        (max as u64, true)
    } else if value < min {
        (min as u64, true)
    } else {
        (value as u64, false)
    }
}

fn clamp_unsigned(value: i128, bits: u32) -> (u64, bool) {
    let max = (1i128 << bits) - 1;
    if value > max {
        (max as u64, true)
    } else if value < 0 {
        (0, true)
    } else {
        (value as u64, false)
    }
}

pub(crate) fn fallback_vec_binop(
    a: Vec128,
    b: Vec128,
    element_size: u8,
    mut op: impl FnMut(u64, u64) -> u64,
) -> Vec128 {
    let (lane_bits, mask) = geometry(element_size);
    let lanes = 128 / lane_bits;
    let mut acc = 0u128;
    for i in 0..lanes {
        let shift = i * lane_bits;
        let av = ((a.0 >> shift) & mask) as u64;
        let bv = ((b.0 >> shift) & mask) as u64;
        let rv = u128::from(op(av, bv)) & mask;
        acc |= rv << shift;
    }
    Vec128(acc)
}

fn fallback_vec_binop_sat(
    a: Vec128,
    b: Vec128,
    element_size: u8,
    op: impl Fn(u64, u64) -> (u64, bool),
) -> Saturating {
    let mut saturated = false;
    let value = fallback_vec_binop(a, b, element_size, |x, y| {
        let (r, sat) = op(x, y);
        saturated |= sat;
        r
    });
    Saturating { value, saturated }
}

// ============================================================
// 模运算与饱和运算
// ============================================================

/// 逐元素加法（模运算）
pub fn vec_add(a: Vec128, b: Vec128, element_size: u8) -> Vec128 {
    fallback_vec_binop(a, b, element_size, |x, y| x.wrapping_add(y))
}

/// 逐元素减法（模运算）
pub fn vec_sub(a: Vec128, b: Vec128, element_size: u8) -> Vec128 {
    fallback_vec_binop(a, b, element_size, |x, y| x.wrapping_sub(y))
}

/// 饱和加法 (无符号)
pub fn vec_add_sat_u(a: Vec128, b: Vec128, element_size: u8) -> Saturating {
    let (bits, _) = geometry(element_size);
    fallback_vec_binop_sat(a, b, element_size, |x, y| {
        clamp_unsigned(i128::from(x) + i128::from(y), bits)
    })
}

/// 饱和加法 (有符号)
pub fn vec_add_sat_s(a: Vec128, b: Vec128, element_size: u8) -> Saturating {
    let (bits, _) = geometry(element_size);
    fallback_vec_binop_sat(a, b, element_size, |x, y| {
        clamp_signed(
            i128::from(sign_extend(x, bits)) + i128::from(sign_extend(y, bits)),
            bits,
        )
    })
}

/// 饱和减法 (无符号)
pub fn vec_sub_sat_u(a: Vec128, b: Vec128, element_size: u8) -> Saturating {
    let (bits, _) = geometry(element_size);
    fallback_vec_binop_sat(a, b, element_size, |x, y| {
        clamp_unsigned(i128::from(x) - i128::from(y), bits)
    })
}

/// 饱和减法 (有符号)
pub fn vec_sub_sat_s(a: Vec128, b: Vec128, element_size: u8) -> Saturating {
    let (bits, _) = geometry(element_size);
    fallback_vec_binop_sat(a, b, element_size, |x, y| {
        clamp_signed(
            i128::from(sign_extend(x, bits)) - i128::from(sign_extend(y, bits)),
            bits,
        )
    })
}

/// 无符号加法进位 (vaddcuw)
pub fn vec_add_carry(a: Vec128, b: Vec128, element_size: u8) -> Vec128 {
    let (bits, _) = geometry(element_size);
    fallback_vec_binop(a, b, element_size, |x, y| {
        u64::from((u128::from(x) + u128::from(y)) >> bits != 0)
    })
}

/// 无符号减法借位的反码 (vsubcuw)：a >= b 时为 1
pub fn vec_sub_carry(a: Vec128, b: Vec128, element_size: u8) -> Vec128 {
    fallback_vec_binop(a, b, element_size, |x, y| u64::from(x >= y))
}

// ============================================================
// 平均值与最值
// ============================================================

/// 向上取整平均 (无符号)
pub fn vec_avg_u(a: Vec128, b: Vec128, element_size: u8) -> Vec128 {
    fallback_vec_binop(a, b, element_size, |x, y| {
        ((u128::from(x) + u128::from(y) + 1) >> 1) as u64
    })
}

/// 向上取整平均 (有符号)
pub fn vec_avg_s(a: Vec128, b: Vec128, element_size: u8) -> Vec128 {
    let (bits, _) = geometry(element_size);
    fallback_vec_binop(a, b, element_size, |x, y| {
        ((i128::from(sign_extend(x, bits)) + i128::from(sign_extend(y, bits)) + 1) >> 1) as u64
    })
}

/// 逐元素最小值 (无符号)
pub fn vec_min_u(a: Vec128, b: Vec128, element_size: u8) -> Vec128 {
    fallback_vec_binop(a, b, element_size, |x, y| x.min(y))
}

/// 逐元素最大值 (无符号)
pub fn vec_max_u(a: Vec128, b: Vec128, element_size: u8) -> Vec128 {
    fallback_vec_binop(a, b, element_size, |x, y| x.max(y))
}

/// 逐元素最小值 (有符号)
pub fn vec_min_s(a: Vec128, b: Vec128, element_size: u8) -> Vec128 {
    let (bits, _) = geometry(element_size);
    fallback_vec_binop(a, b, element_size, |x, y| {
        if sign_extend(x, bits) <= sign_extend(y, bits) {
            x
        } else {
            y
        }
    })
}

/// 逐元素最大值 (有符号)
pub fn vec_max_s(a: Vec128, b: Vec128, element_size: u8) -> Vec128 {
    let (bits, _) = geometry(element_size);
    fallback_vec_binop(a, b, element_size, |x, y| {
        if sign_extend(x, bits) >= sign_extend(y, bits) {
            x
        } else {
            y
        }
    })
}

// ============================================================
// 比较与位运算
// ============================================================

/// 逐元素比较相等
pub fn vec_cmpeq(a: Vec128, b: Vec128, element_size: u8) -> Vec128 {
    fallback_vec_binop(a, b, element_size, |x, y| if x == y { !0u64 } else { 0 })
}

/// 逐元素比较大于 (无符号)
pub fn vec_cmpgt_u(a: Vec128, b: Vec128, element_size: u8) -> Vec128 {
    fallback_vec_binop(a, b, element_size, |x, y| if x > y { !0u64 } else { 0 })
}

/// 逐元素比较大于 (有符号)
pub fn vec_cmpgt_s(a: Vec128, b: Vec128, element_size: u8) -> Vec128 {
    let (bits, _) = geometry(element_size);
    fallback_vec_binop(a, b, element_size, |x, y| {
        if sign_extend(x, bits) > sign_extend(y, bits) {
            !0u64
        } else {
            0
        }
    })
}

/// 按位与
pub fn vec_and(a: Vec128, b: Vec128) -> Vec128 {
    Vec128(a.0 & b.0)
}

/// 按位与非 (a & !b)
pub fn vec_andc(a: Vec128, b: Vec128) -> Vec128 {
    Vec128(a.0 & !b.0)
}

/// 按位或
pub fn vec_or(a: Vec128, b: Vec128) -> Vec128 {
    Vec128(a.0 | b.0)
}

/// 按位或非
pub fn vec_nor(a: Vec128, b: Vec128) -> Vec128 {
    Vec128(!(a.0 | b.0))
}

/// 按位异或
pub fn vec_xor(a: Vec128, b: Vec128) -> Vec128 {
    Vec128(a.0 ^ b.0)
}

// ============================================================
// 移位（移位量取自 b 对应元素的低 log2(bits) 位）
// ============================================================

/// 逐元素循环左移
pub fn vec_rl(a: Vec128, b: Vec128, element_size: u8) -> Vec128 {
    let (bits, _) = geometry(element_size);
    fallback_vec_binop(a, b, element_size, |x, y| {
        let count = (y % u64::from(bits)) as u32;
        if count == 0 {
            x
        } else {
            (x << count) | (x >> (bits - count))
        }
    })
}

/// 逐元素左移
pub fn vec_sl(a: Vec128, b: Vec128, element_size: u8) -> Vec128 {
    let (bits, _) = geometry(element_size);
    fallback_vec_binop(a, b, element_size, |x, y| x << (y % u64::from(bits)))
}

/// 逐元素右移 (逻辑)
pub fn vec_sr(a: Vec128, b: Vec128, element_size: u8) -> Vec128 {
    let (bits, _) = geometry(element_size);
    fallback_vec_binop(a, b, element_size, |x, y| x >> (y % u64::from(bits)))
}

/// 逐元素右移 (算术)
pub fn vec_sra(a: Vec128, b: Vec128, element_size: u8) -> Vec128 {
    let (bits, _) = geometry(element_size);
    fallback_vec_binop(a, b, element_size, |x, y| {
        (sign_extend(x, bits) >> (y % u64::from(bits))) as u64
    })
}

// ============================================================
// 奇偶元素乘法与跨元素求和
// ============================================================

fn vec_mul_widening(a: Vec128, b: Vec128, element_size: u8, signed: bool, odd: bool) -> Vec128 {
    let wide = element_size * 2;
    let pairs = Vec128::lanes(wide);
    (0..pairs).fold(Vec128::ZERO, |acc, j| {
        let src = 2 * j + usize::from(odd);
        let product = if signed {
            (a.lane_signed(element_size, src) * b.lane_signed(element_size, src)) as u64
        } else {
            a.lane(element_size, src) * b.lane(element_size, src)
        };
        acc.with_lane(wide, j, product)
    })
}

/// 偶数元素乘法 (vmule*)：源元素 0,2,4... 的乘积写入双倍宽度元素
pub fn vec_mul_even(a: Vec128, b: Vec128, element_size: u8, signed: bool) -> Vec128 {
    vec_mul_widening(a, b, element_size, signed, false)
}

/// 奇数元素乘法 (vmulo*)
pub fn vec_mul_odd(a: Vec128, b: Vec128, element_size: u8, signed: bool) -> Vec128 {
    vec_mul_widening(a, b, element_size, signed, true)
}

/// 每个字内的元素之和加上 b 的对应字 (vsum4ubs / vsum4sbs / vsum4shs)
pub fn vec_sum4(a: Vec128, b: Vec128, element_size: u8, signed: bool) -> Saturating {
    let per_word = usize::from(4 / element_size.max(1));
    let mut saturated = false;
    let value = (0..4).fold(Vec128::ZERO, |acc, word| {
        let mut sum: i128 = (0..per_word)
            .map(|k| {
                let idx = word * per_word + k;
                if signed {
                    i128::from(a.lane_signed(element_size, idx))
                } else {
                    i128::from(a.lane(element_size, idx))
                }
            })
            .sum();
        let (r, sat) = if signed {
            sum += i128::from(b.lane_signed(4, word));
            clamp_signed(sum, 32)
        } else {
            sum += i128::from(b.lane(4, word));
            clamp_unsigned(sum, 32)
        };
        saturated |= sat;
        acc.with_lane(4, word, r)
    });
    Saturating { value, saturated }
}

/// 两两求和 (vsum2sws)：结果写入字 1 与字 3，其余字为 0
pub fn vec_sum2s(a: Vec128, b: Vec128) -> Saturating {
    let mut saturated = false;
    let value = [1usize, 3].iter().fold(Vec128::ZERO, |acc, &word| {
        let sum = i128::from(a.lane_signed(4, word - 1))
            + i128::from(a.lane_signed(4, word))
            + i128::from(b.lane_signed(4, word));
        let (r, sat) = clamp_signed(sum, 32);
        saturated |= sat;
        acc.with_lane(4, word, r)
    });
    Saturating { value, saturated }
}

/// 全部求和 (vsumsws)：a 的四个字加 b 的字 3，结果写入字 3
pub fn vec_sums(a: Vec128, b: Vec128) -> Saturating {
    let sum: i128 = (0..4).map(|i| i128::from(a.lane_signed(4, i))).sum::<i128>()
        + i128::from(b.lane_signed(4, 3));
    let (r, saturated) = clamp_signed(sum, 32);
    Saturating {
        value: Vec128::ZERO.with_lane(4, 3, r),
        saturated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lane_numbering_is_big_endian() {
        let v = Vec128::from_words([0x11111111, 0x22222222, 0x33333333, 0x44444444]);
        assert_eq!(v.0, 0x11111111_22222222_33333333_44444444);
        assert_eq!(v.lane(4, 0), 0x11111111);
        assert_eq!(v.lane(1, 15), 0x44);
        assert_eq!(v.to_halves()[0], 0x1111);
    }

    #[test]
    fn test_quadword_element() {
        assert_eq!(Vec128::lanes(16), 1);
        let v = Vec128(0xAAAA_0000_0000_0000_0000_0000_0000_0000).with_lane(16, 0, 5);
        assert_eq!(v, Vec128(5));
        assert_eq!(v.lane(16, 0), 5);
    }

    #[test]
    fn test_vec_add_sat_s8_clamps() {
        let a = Vec128::splat(1, 0x7F);
        let b = Vec128::splat(1, 0x01);
        let r = vec_add_sat_s(a, b, 1);
        assert_eq!(r.value, Vec128::splat(1, 0x7F));
        assert!(r.saturated);
        assert_eq!(vec_add(a, b, 1), Vec128::splat(1, 0x80));
    }

    #[test]
    fn test_vec_add_sat_u8() {
        let a = Vec128::from_lanes(1, &[0xFF, 0x00, 0xFF, 0x00]);
        let b = Vec128::splat(1, 0x01);
        let r = vec_add_sat_u(a, b, 1);
        let lanes: Vec<u64> = (0..4).map(|i| r.value.lane(1, i)).collect();
        assert_eq!(lanes, vec![0xFF, 0x01, 0xFF, 0x01]);
        assert!(r.saturated);
    }

    #[test]
    fn test_sub_carry() {
        let a = Vec128::from_words([5, 1, 0, 0xFFFF_FFFF]);
        let b = Vec128::from_words([3, 2, 0, 1]);
        assert_eq!(vec_sub_carry(a, b, 4).to_words(), [1, 0, 1, 1]);
        assert_eq!(vec_add_carry(a, b, 4).to_words(), [0, 0, 0, 1]);
    }

    #[test]
    fn test_rotate_and_shift_counts_use_low_bits() {
        let a = Vec128::splat(1, 0x81);
        let b = Vec128::splat(1, 0x09);
        assert_eq!(vec_rl(a, b, 1), Vec128::splat(1, 0x03));
        assert_eq!(vec_sl(a, b, 1), Vec128::splat(1, 0x02));
        assert_eq!(vec_sra(a, b, 1), Vec128::splat(1, 0xC0));
    }

    #[test]
    fn test_mul_even_odd() {
        let a = Vec128::from_halves([0xFFFF, 2, 0, 0, 0, 0, 0, 3]);
        let b = Vec128::from_halves([2, 5, 0, 0, 0, 0, 0, 7]);
        assert_eq!(vec_mul_even(a, b, 2, true).to_words()[0], 0xFFFF_FFFE);
        assert_eq!(vec_mul_even(a, b, 2, false).to_words()[0], 0x0001_FFFE);
        assert_eq!(vec_mul_odd(a, b, 2, false).to_words(), [10, 0, 0, 21]);
    }

    #[test]
    fn test_sums_saturate() {
        let a = Vec128::from_words([0x7FFF_FFFF, 1, 0, 0]);
        let r = vec_sums(a, Vec128::ZERO);
        assert_eq!(r.value.to_words(), [0, 0, 0, 0x7FFF_FFFF]);
        assert!(r.saturated);
    }
}
