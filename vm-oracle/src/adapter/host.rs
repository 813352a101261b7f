//! 宿主执行器：用宿主的 IEEE 浮点与 SSE2 向量指令执行两种体系结构共有的运算
//!
//! 宿主的状态位无法映射到 FPSCR，`read_flags` 总是返回 `None`。
//! 默认 NaN 与 NaN 选择规则和目标体系结构不同，对应用例会报告 MISMATCH。

use super::ExecutionAdapter;
use crate::case::TestCase;
use crate::operand::Value;
use vm_error::AdapterError;
use vm_fpu::Flags;
use vm_simd::host::{self, HostFloatOp, HostOp};
use vm_simd::Vec128;

#[derive(Debug, Default)]
pub struct HostAdapter;

impl HostAdapter {
    pub fn new() -> Self {
        Self
    }
}

fn scalar_double(mnemonic: &str, x: &[f64]) -> Option<f64> {
    let r = match (mnemonic, x) {
        ("fadd", [a, b]) => a + b,
        ("fsub", [a, b]) => a - b,
        ("fmul", [a, c]) => a * c,
        ("fdiv", [a, b]) => a / b,
        ("fsqrt", [b]) => b.sqrt(),
        ("fmadd", [a, c, b]) => a.mul_add(*c, *b),
        ("fmsub", [a, c, b]) => a.mul_add(*c, -b),
        ("fnmadd", [a, c, b]) => -a.mul_add(*c, *b),
        ("fnmsub", [a, c, b]) => -a.mul_add(*c, -b),
        _ => return None,
    };
    Some(r)
}

fn scalar_single(mnemonic: &str, x: &[f32]) -> Option<f32> {
    let r = match (mnemonic, x) {
        ("fadds", [a, b]) => a + b,
        ("fsubs", [a, b]) => a - b,
        ("fmuls", [a, c]) => a * c,
        ("fdivs", [a, b]) => a / b,
        ("fsqrts", [b]) => b.sqrt(),
        ("fmadds", [a, c, b]) => a.mul_add(*c, *b),
        ("fmsubs", [a, c, b]) => a.mul_add(*c, -b),
        ("fnmadds", [a, c, b]) => -a.mul_add(*c, *b),
        ("fnmsubs", [a, c, b]) => -a.mul_add(*c, -b),
        _ => return None,
    };
    Some(r)
}

/// 符号搬移在宿主上同样是纯位操作
fn sign_move(mnemonic: &str, bits: u64) -> Option<u64> {
    const SIGN: u64 = 1 << 63;
    match mnemonic {
        "fmr" => Some(bits),
        "fneg" => Some(bits ^ SIGN),
        "fabs" => Some(bits & !SIGN),
        "fnabs" => Some(bits | SIGN),
        _ => None,
    }
}

fn vector_op(mnemonic: &str) -> Option<(HostOp, u8)> {
    let op = match mnemonic {
        "vaddubm" => (HostOp::Add, 1),
        "vadduhm" => (HostOp::Add, 2),
        "vadduwm" => (HostOp::Add, 4),
        "vsububm" => (HostOp::Sub, 1),
        "vsubuhm" => (HostOp::Sub, 2),
        "vsubuwm" => (HostOp::Sub, 4),
        "vaddsbs" => (HostOp::AddSatS, 1),
        "vaddshs" => (HostOp::AddSatS, 2),
        "vaddubs" => (HostOp::AddSatU, 1),
        "vadduhs" => (HostOp::AddSatU, 2),
        "vsubsbs" => (HostOp::SubSatS, 1),
        "vsubshs" => (HostOp::SubSatS, 2),
        "vsububs" => (HostOp::SubSatU, 1),
        "vsubuhs" => (HostOp::SubSatU, 2),
        "vavgub" => (HostOp::AvgU, 1),
        "vavguh" => (HostOp::AvgU, 2),
        "vminub" => (HostOp::MinU, 1),
        "vmaxub" => (HostOp::MaxU, 1),
        "vminsh" => (HostOp::MinS, 2),
        "vmaxsh" => (HostOp::MaxS, 2),
        "vcmpequb" => (HostOp::CmpEq, 1),
        "vcmpequh" => (HostOp::CmpEq, 2),
        "vcmpequw" => (HostOp::CmpEq, 4),
        "vcmpgtsb" => (HostOp::CmpGtS, 1),
        "vcmpgtsh" => (HostOp::CmpGtS, 2),
        "vcmpgtsw" => (HostOp::CmpGtS, 4),
        "vand" => (HostOp::And, 4),
        "vandc" => (HostOp::AndC, 4),
        "vor" => (HostOp::Or, 4),
        "vxor" => (HostOp::Xor, 4),
        _ => return None,
    };
    Some(op)
}

fn float_vector_op(mnemonic: &str) -> Option<HostFloatOp> {
    match mnemonic {
        "vaddfp" => Some(HostFloatOp::Add),
        "vsubfp" => Some(HostFloatOp::Sub),
        _ => None,
    }
}

impl HostAdapter {
    fn run(&self, case: &TestCase<'_>) -> Option<u128> {
        let mnemonic = case.mnemonic();
        let operands = &case.operands;
        match operands.first()? {
            Value::F64(_) => {
                let bits: Vec<u64> = operands.iter().map(|v| v.bits() as u64).collect();
                if let [b] = bits.as_slice()
                    && let Some(r) = sign_move(mnemonic, *b)
                {
                    return Some(u128::from(r));
                }
                let x: Vec<f64> = bits.into_iter().map(f64::from_bits).collect();
                scalar_double(mnemonic, &x).map(|r| u128::from(r.to_bits()))
            }
            Value::F32(_) => {
                let x: Vec<f32> = operands.iter().map(|v| f32::from_bits(v.bits() as u32)).collect();
                scalar_single(mnemonic, &x).map(|r| u128::from(r.to_bits()))
            }
            Value::Vector(..) => {
                let [a, b] = operands.as_slice() else {
                    return None;
                };
                let (a, b) = (Vec128(a.bits()), Vec128(b.bits()));
                if let Some((op, size)) = vector_op(mnemonic) {
                    return host::vec_binop(op, a, b, size).map(|v| v.0);
                }
                float_vector_op(mnemonic)
                    .and_then(|op| host::vec_float_binop(op, a, b))
                    .map(|v| v.0)
            }
            _ => None,
        }
    }
}

impl ExecutionAdapter for HostAdapter {
    fn name(&self) -> &str {
        "host"
    }

    fn clear_flags(&mut self) {}

    fn execute(&mut self, case: &TestCase<'_>) -> Result<Value, AdapterError> {
        self.run(case)
            .map(|bits| case.descriptor.result.value_from_bits(bits))
            .ok_or_else(|| AdapterError::unsupported(case.mnemonic(), "no host equivalent"))
    }

    fn read_flags(&mut self) -> Option<Flags> {
        None
    }
}
