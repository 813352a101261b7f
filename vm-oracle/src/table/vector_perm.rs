//! 向量置换与数据搬移指令

use super::{saturating, vbinary, vector, vternary, vunary};
use crate::descriptor::{InstructionDescriptor, InstructionGroup, TableBuilder};
use crate::operand::{Expected, ImmKind, LaneType, SemanticType};
use vm_simd::Vec128;
use vm_simd::permute::{self, PackMode};

const GROUP: InstructionGroup = InstructionGroup::VectorPermute;

const UB: LaneType = LaneType::UnsignedByte;
const UH: LaneType = LaneType::UnsignedHalf;
const UW: LaneType = LaneType::UnsignedWord;

/// 移位计数不一致时结果未定义，整个值不参与比较
fn bit_shift(result: Option<Vec128>) -> Expected {
    match result {
        Some(v) => vector(UW, v),
        None => vector(UW, Vec128::ZERO).ignore_bits(u128::MAX),
    }
}

pub fn register(builder: &mut TableBuilder) {
    for (name, size, lane) in [("vspltisb", 1u8, UB), ("vspltish", 2, UH), ("vspltisw", 4, UW)] {
        builder.add(
            InstructionDescriptor::builder(name, GROUP, SemanticType::Vector(lane))
                .operands([SemanticType::Imm(ImmKind::Simm5)])
                .reference(move |ops| {
                    let simm = ops.imm(0, ImmKind::Simm5)?;
                    Ok(vector(lane, permute::splat_immediate(size, simm)))
                }),
        );
    }

    let splats = [
        ("vspltb", 1u8, UB, ImmKind::ByteIndex),
        ("vsplth", 2, UH, ImmKind::HalfIndex),
        ("vspltw", 4, UW, ImmKind::WordIndex),
    ];
    for (name, size, lane, index) in splats {
        builder.add(
            InstructionDescriptor::builder(name, GROUP, SemanticType::Vector(lane))
                .operands([SemanticType::Vector(lane), SemanticType::Imm(index)])
                .reference(move |ops| {
                    let uimm = ops.imm(1, index)? as usize;
                    Ok(vector(lane, permute::splat_lane(ops.vector(0)?, size, uimm)))
                }),
        );
    }

    let unpacks = [
        ("vupkhsb", "vupklsb", 1u8, LaneType::SignedByte, LaneType::SignedHalf),
        ("vupkhsh", "vupklsh", 2, LaneType::SignedHalf, LaneType::SignedWord),
    ];
    for (high_name, low_name, size, lane, wide) in unpacks {
        for (name, high) in [(high_name, true), (low_name, false)] {
            builder.add(vunary(name, GROUP, lane, wide, move |a| {
                vector(wide, permute::unpack_signed(a, size, high))
            }));
        }
    }
    for (name, high) in [("vupkhpx", true), ("vupklpx", false)] {
        builder.add(vunary(name, GROUP, UH, UW, move |a| vector(UW, permute::unpack_pixel(a, high))));
    }

    builder.add(vbinary("vsl", GROUP, [UW, UW], UW, |a, b| bit_shift(permute::shift_left_bits(a, b))));
    builder.add(vbinary("vsr", GROUP, [UW, UW], UW, |a, b| bit_shift(permute::shift_right_bits(a, b))));
    builder.add(vbinary("vslo", GROUP, [UB, UB], UB, |a, b| vector(UB, permute::shift_left_octets(a, b))));
    builder.add(vbinary("vsro", GROUP, [UB, UB], UB, |a, b| vector(UB, permute::shift_right_octets(a, b))));
    builder.add(
        InstructionDescriptor::builder("vsldoi", GROUP, SemanticType::Vector(UW))
            .operands([
                SemanticType::Vector(UW),
                SemanticType::Vector(UW),
                SemanticType::Imm(ImmKind::ShiftOctets),
            ])
            .reference(|ops| {
                let sh = ops.imm(2, ImmKind::ShiftOctets)? as usize;
                Ok(vector(UW, permute::shift_left_double(ops.vector(0)?, ops.vector(1)?, sh)))
            }),
    );

    builder.add(vternary("vsel", GROUP, [UW; 3], UW, |a, b, c| vector(UW, permute::select(a, b, c))));
    builder.add(vternary("vperm", GROUP, [UB; 3], UB, |a, b, c| vector(UB, permute::perm(a, b, c))));

    let packs = [
        ("vpkuhum", 2u8, UH, UB, PackMode::Modulo),
        ("vpkuwum", 4, UW, UH, PackMode::Modulo),
        ("vpkuhus", 2, UH, UB, PackMode::UnsignedToUnsigned),
        ("vpkuwus", 4, UW, UH, PackMode::UnsignedToUnsigned),
        ("vpkshus", 2, LaneType::SignedHalf, UB, PackMode::SignedToUnsigned),
        ("vpkswus", 4, LaneType::SignedWord, UH, PackMode::SignedToUnsigned),
        ("vpkshss", 2, LaneType::SignedHalf, LaneType::SignedByte, PackMode::SignedToSigned),
        ("vpkswss", 4, LaneType::SignedWord, LaneType::SignedHalf, PackMode::SignedToSigned),
    ];
    for (name, size, lane, narrow, mode) in packs {
        builder.add(vbinary(name, GROUP, [lane, lane], narrow, move |a, b| {
            let packed = permute::pack(a, b, size, mode);
            if mode == PackMode::Modulo {
                vector(narrow, packed.value)
            } else {
                saturating(narrow, packed)
            }
        }));
    }
    builder.add(vbinary("vpkpx", GROUP, [UW, UW], UH, |a, b| vector(UH, permute::pack_pixel(a, b))));

    for (s, size, lane) in [('b', 1u8, UB), ('h', 2, UH), ('w', 4, UW)] {
        for (half, high) in [('h', true), ('l', false)] {
            builder.add(vbinary(format!("vmrg{half}{s}"), GROUP, [lane, lane], lane, move |a, b| {
                vector(lane, permute::merge(a, b, size, high))
            }));
        }
    }
}
