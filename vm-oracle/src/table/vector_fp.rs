//! AltiVec 单精度向量指令
//!
//! Java / non-Java 模式在构建表时由 [`TableOptions`] 固定。

use super::{TableOptions, saturating, vbinary, vector, vternary, vunary};
use crate::descriptor::{InstructionDescriptor, InstructionGroup, NanPolicy, TableBuilder, Tolerance};
use crate::operand::{ImmKind, LaneType, SemanticType};
use vm_fpu::Round;
use vm_fpu::vector::{self as vfp, VectorMode};
use vm_simd::{Saturating, Vec128};

const GROUP: InstructionGroup = InstructionGroup::VectorFloat;
const FP: LaneType = LaneType::Float;

/// vrefp / vrsqrtefp 精确到 1/4096
const RECIPROCAL_ULPS: u128 = 1 << 11;
/// vexptefp 精确到 1/16
const EXP_ULPS: u128 = 1 << 19;
/// vlogefp 的绝对误差上界
const LOG_MAX_ERROR: f64 = 1.0 / 32.0;

type Binary = fn(Vec128, Vec128, VectorMode) -> Vec128;
type Estimate = fn(Vec128, VectorMode) -> Vec128;
type ToFixed = fn(Vec128, u32, VectorMode) -> Saturating;
type FromFixed = fn(Vec128, u32) -> Vec128;

pub fn register(builder: &mut TableBuilder, options: &TableOptions) {
    let mode = options.vector_mode;

    let arithmetic: [(&str, Binary); 4] = [
        ("vaddfp", vfp::add),
        ("vsubfp", vfp::sub),
        ("vmaxfp", vfp::max),
        ("vminfp", vfp::min),
    ];
    for (name, op) in arithmetic {
        builder.add(vbinary(name, GROUP, [FP, FP], FP, move |a, b| vector(FP, op(a, b, mode))));
    }

    // 操作数顺序为 vA, vC, vB
    builder.add(vternary("vmaddfp", GROUP, [FP; 3], FP, move |a, c, b| {
        vector(FP, vfp::multiply_add(a, c, b, mode))
    }));
    builder.add(vternary("vnmsubfp", GROUP, [FP; 3], FP, move |a, c, b| {
        vector(FP, vfp::negative_multiply_sub(a, c, b, mode))
    }));

    let rounding = [
        ("vrfin", Round::NearestTiesToEven),
        ("vrfiz", Round::TowardZero),
        ("vrfip", Round::TowardPositive),
        ("vrfim", Round::TowardNegative),
    ];
    for (name, round) in rounding {
        builder.add(vunary(name, GROUP, FP, FP, move |a| {
            vector(FP, vfp::round_to_integral(a, round, mode))
        }));
    }

    let estimates: [(&str, Estimate, Tolerance); 4] = [
        ("vrefp", vfp::reciprocal_estimate, Tolerance::Ulp { max_ulps: RECIPROCAL_ULPS }),
        ("vrsqrtefp", vfp::reciprocal_sqrt_estimate, Tolerance::Ulp { max_ulps: RECIPROCAL_ULPS }),
        ("vlogefp", vfp::log2_estimate, Tolerance::Absolute { max_error: LOG_MAX_ERROR }),
        ("vexptefp", vfp::exp2_estimate, Tolerance::Ulp { max_ulps: EXP_ULPS }),
    ];
    for (name, op, tolerance) in estimates {
        builder.add(
            vunary(name, GROUP, FP, FP, move |a| vector(FP, op(a, mode)))
                .tolerance(tolerance)
                .nan_policy(NanPolicy::AnyNan),
        );
    }

    let scale = SemanticType::Imm(ImmKind::Scale);
    let to_fixed: [(&str, LaneType, ToFixed); 2] = [
        ("vctuxs", LaneType::UnsignedWord, vfp::to_unsigned_fixed),
        ("vctsxs", LaneType::SignedWord, vfp::to_signed_fixed),
    ];
    for (name, lane, op) in to_fixed {
        builder.add(
            InstructionDescriptor::builder(name, GROUP, SemanticType::Vector(lane))
                .operands([SemanticType::Vector(FP), scale])
                .reference(move |ops| {
                    let uimm = ops.imm(1, ImmKind::Scale)? as u32;
                    Ok(saturating(lane, op(ops.vector(0)?, uimm, mode)))
                }),
        );
    }
    let from_fixed: [(&str, LaneType, FromFixed); 2] = [
        ("vcfux", LaneType::UnsignedWord, vfp::from_unsigned_fixed),
        ("vcfsx", LaneType::SignedWord, vfp::from_signed_fixed),
    ];
    for (name, lane, op) in from_fixed {
        builder.add(
            InstructionDescriptor::builder(name, GROUP, SemanticType::Vector(FP))
                .operands([SemanticType::Vector(lane), scale])
                .reference(move |ops| {
                    let uimm = ops.imm(1, ImmKind::Scale)? as u32;
                    Ok(vector(FP, op(ops.vector(0)?, uimm)))
                }),
        );
    }

    let compares: [(&str, Binary); 4] = [
        ("vcmpeqfp", vfp::compare_equal),
        ("vcmpgefp", vfp::compare_greater_equal),
        ("vcmpgtfp", vfp::compare_greater),
        ("vcmpbfp", vfp::compare_bounds),
    ];
    for (name, op) in compares {
        let mask = LaneType::UnsignedWord;
        builder.add(vbinary(name, GROUP, [FP, FP], mask, move |a, b| vector(mask, op(a, b, mode))));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::OperandCorpus;
    use crate::descriptor::InstructionTable;
    use crate::operand::{Expected, Value};
    use vm_fpu::Flags;

    fn table(mode: VectorMode) -> InstructionTable {
        let corpus = OperandCorpus::standard();
        let mut builder = TableBuilder::new();
        register(&mut builder, &TableOptions::new(corpus, mode));
        builder.build(corpus).expect("vector float table is valid")
    }

    fn floats(words: [f32; 4]) -> Value {
        Value::Vector(FP, Vec128::from_words(words.map(f32::to_bits)))
    }

    fn run(table: &InstructionTable, mnemonic: &str, operands: &[Value]) -> Expected {
        table
            .get(mnemonic)
            .expect("registered")
            .evaluate(operands)
            .expect("typed operands")
    }

    #[test]
    fn test_vctsxs_saturates_with_sat() {
        let table = table(VectorMode::JAVA);
        let e = run(&table, "vctsxs", &[
            floats([1.0e10, -1.0e10, 2.5, -2.5]),
            Value::Imm(ImmKind::Scale, 0),
        ]);
        assert_eq!(
            e.value.bits(),
            Vec128::from_words([0x7FFF_FFFF, 0x8000_0000, 2, (-2i32) as u32]).0
        );
        assert_eq!(e.flags, Flags::SAT);
    }

    #[test]
    fn test_vcfsx_scales_down() {
        let table = table(VectorMode::JAVA);
        let a = Value::Vector(LaneType::SignedWord, Vec128::from_words([4, (-4i32) as u32, 1, 0]));
        let e = run(&table, "vcfsx", &[a, Value::Imm(ImmKind::Scale, 2)]);
        assert_eq!(e.value, floats([1.0, -1.0, 0.25, 0.0]));
    }

    #[test]
    fn test_non_java_mode_flushes_denormals() {
        let tiny = f32::from_bits(1);
        let java = run(&table(VectorMode::JAVA), "vaddfp", &[floats([tiny; 4]), floats([0.0; 4])]);
        assert_eq!(java.value, floats([tiny; 4]));
        let flushed = run(&table(VectorMode::NON_JAVA), "vaddfp", &[floats([tiny; 4]), floats([0.0; 4])]);
        assert_eq!(flushed.value, floats([0.0; 4]));
    }

    #[test]
    fn test_estimate_tolerances() {
        let table = table(VectorMode::JAVA);
        assert_eq!(
            table.get("vlogefp").map(|d| d.tolerance),
            Some(Tolerance::Absolute { max_error: LOG_MAX_ERROR })
        );
        assert_eq!(table.get("vrefp").map(|d| d.nan_policy), Some(NanPolicy::AnyNan));
        assert_eq!(table.get("vaddfp").map(|d| d.nan_policy), Some(NanPolicy::Strict));
    }
}
