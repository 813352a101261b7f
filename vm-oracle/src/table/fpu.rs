//! 标量 FPU 指令（FPSCR 语义）

use super::{double, single};
use crate::descriptor::{InstructionDescriptor, InstructionGroup, NanPolicy, TableBuilder, Tolerance};
use crate::operand::{Expected, SemanticType, Value};
use vm_fpu::arith::{self, FusedOp, SignOp};
use vm_fpu::compare::{self, CompareKind};
use vm_fpu::convert::{self, IntWidth};
use vm_fpu::{Double, FpResult, Round, Single};

type Binary = fn(u128, u128) -> FpResult;
type Unary = fn(u128) -> FpResult;

const ARITH_DOUBLE: [(&str, Binary); 4] = [
    ("fadd", arith::add::<Double>),
    ("fsub", arith::sub::<Double>),
    ("fmul", arith::mul::<Double>),
    ("fdiv", arith::div::<Double>),
];

const ARITH_SINGLE: [(&str, Binary); 4] = [
    ("fadds", arith::add::<Single>),
    ("fsubs", arith::sub::<Single>),
    ("fmuls", arith::mul::<Single>),
    ("fdivs", arith::div::<Single>),
];

const FUSED: [(&str, FusedOp); 4] = [
    ("fmadd", FusedOp::MultiplyAdd),
    ("fmsub", FusedOp::MultiplySub),
    ("fnmadd", FusedOp::NegativeMultiplyAdd),
    ("fnmsub", FusedOp::NegativeMultiplySub),
];

const SIGN_OPS: [(&str, SignOp); 4] = [
    ("fmr", SignOp::Move),
    ("fneg", SignOp::Negate),
    ("fabs", SignOp::Absolute),
    ("fnabs", SignOp::NegativeAbsolute),
];

/// fres 精确到 1/256：单精度 2^15 ULP
const FRES_ULPS: u128 = 1 << 15;
/// frsqrte 精确到 1/32：双精度 2^47 ULP
const FRSQRTE_ULPS: u128 = 1 << 47;

fn fpu(mnemonic: &str, ty: SemanticType, arity: usize) -> crate::descriptor::DescriptorBuilder {
    InstructionDescriptor::builder(mnemonic, InstructionGroup::Fpu, ty)
        .operands(vec![ty; arity])
}

pub fn register(builder: &mut TableBuilder) {
    for (mnemonic, op) in ARITH_DOUBLE {
        builder.add(
            fpu(mnemonic, SemanticType::F64, 2)
                .reference(move |ops| Ok(double(op(ops.f64(0)?.into(), ops.f64(1)?.into())))),
        );
    }
    for (mnemonic, op) in ARITH_SINGLE {
        builder.add(
            fpu(mnemonic, SemanticType::F32, 2)
                .reference(move |ops| Ok(single(op(ops.f32(0)?.into(), ops.f32(1)?.into())))),
        );
    }

    let sqrt_double: Unary = arith::sqrt::<Double>;
    let sqrt_single: Unary = arith::sqrt::<Single>;
    builder.add(fpu("fsqrt", SemanticType::F64, 1).reference(move |ops| Ok(double(sqrt_double(ops.f64(0)?.into())))));
    builder.add(fpu("fsqrts", SemanticType::F32, 1).reference(move |ops| Ok(single(sqrt_single(ops.f32(0)?.into())))));

    builder.add(
        fpu("fres", SemanticType::F32, 1)
            .tolerance(Tolerance::Ulp { max_ulps: FRES_ULPS })
            .nan_policy(NanPolicy::AnyNan)
            .reference(|ops| Ok(single(arith::reciprocal_estimate::<Single>(ops.f32(0)?.into())))),
    );
    builder.add(
        fpu("frsqrte", SemanticType::F64, 1)
            .tolerance(Tolerance::Ulp { max_ulps: FRSQRTE_ULPS })
            .nan_policy(NanPolicy::AnyNan)
            .reference(|ops| Ok(double(arith::reciprocal_sqrt_estimate(ops.f64(0)?.into())))),
    );

    builder.add(fpu("fsel", SemanticType::F64, 3).reference(|ops| {
        Ok(double(arith::select::<Double>(
            ops.f64(0)?.into(),
            ops.f64(1)?.into(),
            ops.f64(2)?.into(),
        )))
    }));

    // 操作数顺序为 frA, frC, frB
    for (mnemonic, op) in FUSED {
        builder.add(fpu(mnemonic, SemanticType::F64, 3).reference(move |ops| {
            Ok(double(arith::fused::<Double>(
                op,
                ops.f64(0)?.into(),
                ops.f64(1)?.into(),
                ops.f64(2)?.into(),
            )))
        }));
        builder.add(fpu(&format!("{mnemonic}s"), SemanticType::F32, 3).reference(move |ops| {
            Ok(single(arith::fused::<Single>(
                op,
                ops.f32(0)?.into(),
                ops.f32(1)?.into(),
                ops.f32(2)?.into(),
            )))
        }));
    }

    builder.add(
        fpu("frsp", SemanticType::F64, 1)
            .reference(|ops| Ok(double(convert::round_to_single(ops.f64(0)?.into())))),
    );
    // 操作数按 64 位整数解释
    builder.add(
        fpu("fcfid", SemanticType::F64, 1)
            .reference(|ops| Ok(double(convert::from_integer(ops.f64(0)?.into())))),
    );
    builder.add(fpu("fctidz", SemanticType::F64, 1).reference(|ops| {
        Ok(double(convert::to_integer(
            ops.f64(0)?.into(),
            IntWidth::Doubleword,
            Round::TowardZero,
        )))
    }));
    for (mnemonic, round) in [("fctiw", Round::NearestTiesToEven), ("fctiwz", Round::TowardZero)] {
        builder.add(fpu(mnemonic, SemanticType::F64, 1).reference(move |ops| {
            let r = convert::to_integer(ops.f64(0)?.into(), IntWidth::Word, round);
            Ok(double(r).ignore_bits(0xFFFF_FFFF_0000_0000))
        }));
    }

    for (mnemonic, kind) in [("fcmpu", CompareKind::Unordered), ("fcmpo", CompareKind::Ordered)] {
        builder.add(
            InstructionDescriptor::builder(mnemonic, InstructionGroup::Fpu, SemanticType::CrField)
                .operands([SemanticType::F64, SemanticType::F64])
                .reference(move |ops| {
                    let r = compare::compare::<Double>(kind, ops.f64(0)?.into(), ops.f64(1)?.into());
                    Ok(Expected::exact(Value::Cr(r.bits as u8), r.flags).ignore_flags(r.undefined))
                }),
        );
    }

    for (mnemonic, op) in SIGN_OPS {
        builder.add(
            fpu(mnemonic, SemanticType::F64, 1)
                .reference(move |ops| Ok(double(arith::sign_op::<Double>(op, ops.f64(0)?.into())))),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::OperandCorpus;
    use vm_fpu::Flags;

    fn table() -> crate::descriptor::InstructionTable {
        let mut builder = TableBuilder::new();
        register(&mut builder);
        builder.build(OperandCorpus::standard()).expect("fpu table is valid")
    }

    #[test]
    fn test_fadds_cancellation() {
        let table = table();
        let fadds = table.get("fadds").expect("fadds");
        let e = fadds
            .evaluate(&[Value::from_f32(1.5), Value::from_f32(-1.5)])
            .expect("typed");
        assert_eq!(e.value, Value::F32(0));
        assert_eq!(e.flags, Flags::FE);
    }

    #[test]
    fn test_fctiw_ignores_high_word() {
        let table = table();
        let e = table
            .get("fctiw")
            .expect("fctiw")
            .evaluate(&[Value::from_f64(-1.0)])
            .expect("typed");
        assert_eq!(e.care.value_mask, 0xFFFF_FFFF);
        assert_eq!(e.value.bits() as u32, 0xFFFF_FFFF);
        assert!(!e.care.flags.intersects(Flags::FPRF));
    }

    #[test]
    fn test_fcmpo_with_nan_is_unordered() {
        let table = table();
        let e = table
            .get("fcmpo")
            .expect("fcmpo")
            .evaluate(&[Value::from_f64(f64::NAN), Value::from_f64(1.0)])
            .expect("typed");
        assert_eq!(e.value, Value::Cr(compare::CR_UN));
        assert!(e.flags.contains(Flags::VXVC | Flags::FU));
    }

    #[test]
    fn test_estimates_use_ulp_tolerance() {
        let table = table();
        let fres = table.get("fres").expect("fres");
        assert_eq!(fres.tolerance, Tolerance::Ulp { max_ulps: FRES_ULPS });
        let e = fres.evaluate(&[Value::from_f32(3.0)]).expect("typed");
        assert!(!e.care.flags.contains(Flags::FI));
    }

    #[test]
    fn test_fused_single_forms_are_registered() {
        let table = table();
        for name in ["fmadds", "fmsubs", "fnmadds", "fnmsubs"] {
            assert_eq!(table.get(name).map(|d| d.arity()), Some(3));
        }
    }
}
