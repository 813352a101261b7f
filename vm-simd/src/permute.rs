//! 向量置换与数据搬移：splat、解包、打包、合并、vperm、整体移位

use crate::{Saturating, Vec128, sign_extend};

/// 复制元素 `index` 到所有元素 (vspltb / vsplth / vspltw)
pub fn splat_lane(a: Vec128, element_size: u8, index: usize) -> Vec128 {
    let lanes = Vec128::lanes(element_size);
    Vec128::splat(element_size, a.lane(element_size, index % lanes))
}

/// 5 位有符号立即数扩展后复制 (vspltisb / vspltish / vspltisw)
pub fn splat_immediate(element_size: u8, simm5: i32) -> Vec128 {
    let value = sign_extend(simm5 as u64 & 0x1F, 5);
    Vec128::splat(element_size, value as u64)
}

/// 有符号解包：取高半（`high`）或低半元素并符号扩展到双倍宽度
pub fn unpack_signed(a: Vec128, element_size: u8, high: bool) -> Vec128 {
    let wide = element_size * 2;
    let count = Vec128::lanes(wide);
    let base = if high { 0 } else { count };
    (0..count).fold(Vec128::ZERO, |acc, i| {
        acc.with_lane(wide, i, a.lane_signed(element_size, base + i) as u64)
    })
}

/// 像素解包 (vupkhpx / vupklpx)：1:5:5:5 → 8:8:8:8
pub fn unpack_pixel(a: Vec128, high: bool) -> Vec128 {
    let base = if high { 0 } else { 4 };
    (0..4).fold(Vec128::ZERO, |acc, i| {
        let h = a.lane(2, base + i);
        let alpha = if h & 0x8000 != 0 { 0xFF } else { 0 };
        let word = (alpha << 24) | (((h >> 10) & 0x1F) << 16) | (((h >> 5) & 0x1F) << 8) | (h & 0x1F);
        acc.with_lane(4, i, word)
    })
}

/// 打包时源/目标元素的解释方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackMode {
    /// 截断 (vpkuhum / vpkuwum)
    Modulo,
    /// 无符号源饱和到无符号目标 (vpkuhus / vpkuwus)
    UnsignedToUnsigned,
    /// 有符号源饱和到无符号目标 (vpkshus / vpkswus)
    SignedToUnsigned,
    /// 有符号源饱和到有符号目标 (vpkshss / vpkswss)
    SignedToSigned,
}

/// 打包：a 的元素填入结果高半，b 的元素填入低半，元素宽度减半
pub fn pack(a: Vec128, b: Vec128, element_size: u8, mode: PackMode) -> Saturating {
    let narrow = element_size / 2;
    let narrow_bits = u32::from(narrow) * 8;
    let lanes = Vec128::lanes(element_size);
    let unsigned_max = (1i64 << narrow_bits) - 1;
    let signed_max = (1i64 << (narrow_bits - 1)) - 1;
    let signed_min = -(1i64 << (narrow_bits - 1));

    let mut saturated = false;
    let mut value = Vec128::ZERO;
    for (half, src) in [a, b].iter().enumerate() {
        for i in 0..lanes {
            let (v, sat) = match mode {
                PackMode::Modulo => (src.lane(element_size, i), false),
                PackMode::UnsignedToUnsigned => {
                    let v = src.lane(element_size, i) as i64;
                    if v > unsigned_max {
                        (unsigned_max as u64, true)
                    } else {
                        (v as u64, false)
                    }
                }
                PackMode::SignedToUnsigned => {
                    let v = src.lane_signed(element_size, i);
                    if v > unsigned_max {
                        (unsigned_max as u64, true)
                    } else if v < 0 {
                        (0, true)
                    } else {
                        (v as u64, false)
                    }
                }
                PackMode::SignedToSigned => {
                    let v = src.lane_signed(element_size, i);
                    if v > signed_max {
                        (signed_max as u64, true)
                    } else if v < signed_min {
                        (signed_min as u64, true)
                    } else {
                        (v as u64, false)
                    }
                }
            };
            saturated |= sat;
            value = value.with_lane(narrow, half * lanes + i, v);
        }
    }
    Saturating { value, saturated }
}

/// 像素打包 (vpkpx)：8:8:8:8 → 1:5:5:5
pub fn pack_pixel(a: Vec128, b: Vec128) -> Vec128 {
    let mut value = Vec128::ZERO;
    for (half, src) in [a, b].iter().enumerate() {
        for i in 0..4 {
            let w = src.lane(4, i);
            let pixel = (((w >> 24) & 1) << 15)
                | (((w >> 19) & 0x1F) << 10)
                | (((w >> 11) & 0x1F) << 5)
                | ((w >> 3) & 0x1F);
            value = value.with_lane(2, half * 4 + i, pixel);
        }
    }
    value
}

/// 合并 (vmrgh* / vmrgl*)：交错 a、b 的高半或低半元素
pub fn merge(a: Vec128, b: Vec128, element_size: u8, high: bool) -> Vec128 {
    let half = Vec128::lanes(element_size) / 2;
    let base = if high { 0 } else { half };
    (0..half).fold(Vec128::ZERO, |acc, i| {
        acc.with_lane(element_size, 2 * i, a.lane(element_size, base + i))
            .with_lane(element_size, 2 * i + 1, b.lane(element_size, base + i))
    })
}

/// 字节置换 (vperm)：控制字节低 5 位从 a||b 中选择
pub fn perm(a: Vec128, b: Vec128, control: Vec128) -> Vec128 {
    let source = concat(a, b);
    let bytes = control.to_bytes().map(|c| source[usize::from(c & 0x1F)]);
    Vec128::from_bytes(bytes)
}

/// 按位选择 (vsel)：c 为 1 的位取 b，否则取 a
pub fn select(a: Vec128, b: Vec128, c: Vec128) -> Vec128 {
    Vec128((a.0 & !c.0) | (b.0 & c.0))
}

/// 整体左移位 (vsl)。
///
/// 只有 b 的每个字节低 3 位都相同时结果才有定义，否则返回 `None`。
pub fn shift_left_bits(a: Vec128, b: Vec128) -> Option<Vec128> {
    uniform_bit_count(b).map(|count| Vec128(a.0 << count))
}

/// 整体右移位 (vsr)，定义域同 `shift_left_bits`
pub fn shift_right_bits(a: Vec128, b: Vec128) -> Option<Vec128> {
    uniform_bit_count(b).map(|count| Vec128(a.0 >> count))
}

fn uniform_bit_count(b: Vec128) -> Option<u32> {
    let bytes = b.to_bytes();
    let count = bytes[15] & 0x7;
    bytes
        .iter()
        .all(|&x| x & 0x7 == count)
        .then_some(u32::from(count))
}

/// 按字节左移 (vslo)：移位量取 b 最低字节的 bit 1:4
pub fn shift_left_octets(a: Vec128, b: Vec128) -> Vec128 {
    let octets = u32::from((b.to_bytes()[15] >> 3) & 0xF);
    Vec128(a.0.checked_shl(octets * 8).unwrap_or(0))
}

/// 按字节右移 (vsro)
pub fn shift_right_octets(a: Vec128, b: Vec128) -> Vec128 {
    let octets = u32::from((b.to_bytes()[15] >> 3) & 0xF);
    Vec128(a.0.checked_shr(octets * 8).unwrap_or(0))
}

/// 双字拼接移位 (vsldoi)：取 a||b 的第 sh..sh+15 字节
pub fn shift_left_double(a: Vec128, b: Vec128, octets: usize) -> Vec128 {
    let source = concat(a, b);
    let sh = octets & 0xF;
    Vec128::from_bytes(std::array::from_fn(|i| source[sh + i]))
}

/// lvsl 的置换控制向量：sh, sh+1, ..., sh+15
pub fn load_shift_left(offset: u64) -> Vec128 {
    let sh = (offset & 0xF) as u8;
    Vec128::from_bytes(std::array::from_fn(|i| sh + i as u8))
}

/// lvsr 的置换控制向量：16-sh, ..., 31-sh
pub fn load_shift_right(offset: u64) -> Vec128 {
    let sh = (offset & 0xF) as u8;
    Vec128::from_bytes(std::array::from_fn(|i| 16 - sh + i as u8))
}

fn concat(a: Vec128, b: Vec128) -> [u8; 32] {
    let mut out = [0u8; 32];
    out[..16].copy_from_slice(&a.to_bytes());
    out[16..].copy_from_slice(&b.to_bytes());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> Vec128 {
        Vec128::from_bytes(std::array::from_fn(|i| i as u8))
    }

    #[test]
    fn test_splat_immediate_sign_extends() {
        assert_eq!(splat_immediate(1, -1), Vec128::ONES);
        assert_eq!(splat_immediate(2, 15), Vec128::splat(2, 0x000F));
        assert_eq!(splat_immediate(4, -16), Vec128::splat(4, 0xFFFF_FFF0));
    }

    #[test]
    fn test_merge_high_bytes() {
        let a = ramp();
        let b = Vec128::splat(1, 0xAA);
        let bytes = merge(a, b, 1, true).to_bytes();
        assert_eq!(bytes[0..4], [0x00u8, 0xAA, 0x01, 0xAA]);
    }

    #[test]
    fn test_perm_selects_across_sources() {
        let a = ramp();
        let b = Vec128::splat(1, 0xEE);
        let control = Vec128::from_bytes(std::array::from_fn(|i| if i % 2 == 0 { 0x03 } else { 0x1F }));
        let bytes = perm(a, b, control).to_bytes();
        assert_eq!(bytes[0], 0x03);
        assert_eq!(bytes[1], 0xEE);
    }

    #[test]
    fn test_pack_signed_saturates() {
        let a = Vec128::splat(2, 0x0100);
        let b = Vec128::splat(2, 0xFF00);
        let r = pack(a, b, 2, PackMode::SignedToSigned);
        assert!(r.saturated);
        assert_eq!(r.value.lane(1, 0), 0x7F);
        assert_eq!(r.value.lane(1, 8), 0x80);
    }

    #[test]
    fn test_pixel_round_trip() {
        let pixels = Vec128::from_halves([0x8000 | 0x7FFF, 0x1234, 0, 0, 0, 0, 0, 0]);
        let words = unpack_pixel(pixels, true);
        assert_eq!(words.lane(4, 0), 0xFF1F1F1F);
        // 打包取每个通道的 bit 3..7，不是解包的逆运算
        let back = pack_pixel(words, Vec128::ZERO);
        assert_eq!(back.lane(2, 0), 0x8000 | (0x03 << 10) | (0x03 << 5) | 0x03);
    }

    #[test]
    fn test_vsl_requires_uniform_count() {
        let a = Vec128(1);
        assert_eq!(shift_left_bits(a, Vec128::splat(1, 0x03)), Some(Vec128(8)));
        assert_eq!(shift_left_bits(a, Vec128::from_lanes(1, &[0x01])), None);
    }

    #[test]
    fn test_vsldoi_and_lvsl() {
        let a = ramp();
        let b = Vec128::from_bytes(std::array::from_fn(|i| 0x10 + i as u8));
        assert_eq!(shift_left_double(a, b, 1), load_shift_left(1));
        assert_eq!(load_shift_right(0), b);
    }
}
