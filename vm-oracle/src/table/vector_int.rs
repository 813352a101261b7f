//! AltiVec 整数向量指令
//!
//! 饱和形式在任一元素饱和时置 VSCR[SAT]。

use super::{saturating, vbinary, vector};
use crate::descriptor::{InstructionGroup, TableBuilder};
use crate::operand::LaneType;
use vm_simd::{self as simd, Vec128};

const GROUP: InstructionGroup = InstructionGroup::VectorInteger;

/// `(后缀, 元素字节数, 无符号元素, 有符号元素)`
const WIDTHS: [(char, u8, LaneType, LaneType); 3] = [
    ('b', 1, LaneType::UnsignedByte, LaneType::SignedByte),
    ('h', 2, LaneType::UnsignedHalf, LaneType::SignedHalf),
    ('w', 4, LaneType::UnsignedWord, LaneType::SignedWord),
];

type Modulo = fn(Vec128, Vec128, u8) -> Vec128;
type Clamped = fn(Vec128, Vec128, u8) -> simd::Saturating;

fn modulo(builder: &mut TableBuilder, mnemonic: String, lane: LaneType, size: u8, op: Modulo) {
    builder.add(vbinary(mnemonic, GROUP, [lane, lane], lane, move |a, b| {
        vector(lane, op(a, b, size))
    }));
}

fn clamped(builder: &mut TableBuilder, mnemonic: String, lane: LaneType, size: u8, op: Clamped) {
    builder.add(vbinary(mnemonic, GROUP, [lane, lane], lane, move |a, b| {
        saturating(lane, op(a, b, size))
    }));
}

pub fn register(builder: &mut TableBuilder) {
    for (s, size, unsigned, signed) in WIDTHS {
        modulo(builder, format!("vaddu{s}m"), unsigned, size, simd::vec_add);
        modulo(builder, format!("vsubu{s}m"), unsigned, size, simd::vec_sub);
        clamped(builder, format!("vaddu{s}s"), unsigned, size, simd::vec_add_sat_u);
        clamped(builder, format!("vadds{s}s"), signed, size, simd::vec_add_sat_s);
        clamped(builder, format!("vsubu{s}s"), unsigned, size, simd::vec_sub_sat_u);
        clamped(builder, format!("vsubs{s}s"), signed, size, simd::vec_sub_sat_s);
        modulo(builder, format!("vavgu{s}"), unsigned, size, simd::vec_avg_u);
        modulo(builder, format!("vavgs{s}"), signed, size, simd::vec_avg_s);
        modulo(builder, format!("vmaxu{s}"), unsigned, size, simd::vec_max_u);
        modulo(builder, format!("vmaxs{s}"), signed, size, simd::vec_max_s);
        modulo(builder, format!("vminu{s}"), unsigned, size, simd::vec_min_u);
        modulo(builder, format!("vmins{s}"), signed, size, simd::vec_min_s);

        // 比较结果是全 1 / 全 0 掩码
        for (name, operand, op) in [
            (format!("vcmpequ{s}"), unsigned, simd::vec_cmpeq as Modulo),
            (format!("vcmpgtu{s}"), unsigned, simd::vec_cmpgt_u as Modulo),
            (format!("vcmpgts{s}"), signed, simd::vec_cmpgt_s as Modulo),
        ] {
            builder.add(vbinary(name, GROUP, [operand, operand], unsigned, move |a, b| {
                vector(unsigned, op(a, b, size))
            }));
        }

        modulo(builder, format!("vrl{s}"), unsigned, size, simd::vec_rl);
        modulo(builder, format!("vsl{s}"), unsigned, size, simd::vec_sl);
        modulo(builder, format!("vsr{s}"), unsigned, size, simd::vec_sr);
        modulo(builder, format!("vsra{s}"), signed, size, simd::vec_sra);
    }

    modulo(builder, "vaddcuw".to_string(), LaneType::UnsignedWord, 4, simd::vec_add_carry);
    modulo(builder, "vsubcuw".to_string(), LaneType::UnsignedWord, 4, simd::vec_sub_carry);

    type Bitwise = fn(Vec128, Vec128) -> Vec128;
    let bitwise: [(&str, Bitwise); 5] = [
        ("vand", simd::vec_and),
        ("vandc", simd::vec_andc),
        ("vor", simd::vec_or),
        ("vnor", simd::vec_nor),
        ("vxor", simd::vec_xor),
    ];
    for (name, op) in bitwise {
        let lane = LaneType::UnsignedWord;
        builder.add(vbinary(name, GROUP, [lane, lane], lane, move |a, b| vector(lane, op(a, b))));
    }

    // 奇偶乘法：结果为双倍宽度元素
    let widening = [
        ('b', 1u8, (LaneType::UnsignedByte, LaneType::UnsignedHalf), (LaneType::SignedByte, LaneType::SignedHalf)),
        ('h', 2u8, (LaneType::UnsignedHalf, LaneType::UnsignedWord), (LaneType::SignedHalf, LaneType::SignedWord)),
    ];
    for (s, size, (unsigned, unsigned_wide), (signed, signed_wide)) in widening {
        for (parity, odd) in [('e', false), ('o', true)] {
            for (sign, lane, wide, is_signed) in [('u', unsigned, unsigned_wide, false), ('s', signed, signed_wide, true)] {
                builder.add(vbinary(
                    format!("vmul{parity}{sign}{s}"),
                    GROUP,
                    [lane, lane],
                    wide,
                    move |a, b| {
                        let product = if odd {
                            simd::vec_mul_odd(a, b, size, is_signed)
                        } else {
                            simd::vec_mul_even(a, b, size, is_signed)
                        };
                        vector(wide, product)
                    },
                ));
            }
        }
    }

    // 跨元素求和，累加数总是字
    let sum4 = [
        ("vsum4ubs", LaneType::UnsignedByte, LaneType::UnsignedWord, 1u8, false),
        ("vsum4sbs", LaneType::SignedByte, LaneType::SignedWord, 1, true),
        ("vsum4shs", LaneType::SignedHalf, LaneType::SignedWord, 2, true),
    ];
    for (name, lane, acc, size, signed) in sum4 {
        builder.add(vbinary(name, GROUP, [lane, acc], acc, move |a, b| {
            saturating(acc, simd::vec_sum4(a, b, size, signed))
        }));
    }
    let sw = LaneType::SignedWord;
    builder.add(vbinary("vsum2sws", GROUP, [sw, sw], sw, move |a, b| saturating(sw, simd::vec_sum2s(a, b))));
    builder.add(vbinary("vsumsws", GROUP, [sw, sw], sw, move |a, b| saturating(sw, simd::vec_sums(a, b))));
}
