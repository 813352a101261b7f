//! 标量浮点算术：加减乘除、乘加族、平方根、倒数估计、fsel 与符号搬移
//!
//! 所有运算使用 round-to-nearest-even，FPSCR 的使能位全部为 0（不产生陷阱）。

use crate::format::{
    Format, fprf, is_infinite, is_nan, is_negative, is_signaling, is_zero, quiet,
};
use crate::{Flags, FpResult};
use rustc_apfloat::ieee::Double;
use rustc_apfloat::{Float, Round, Status, StatusAnd};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// 乘加族：frA * frC ± frB，可选结果取负
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FusedOp {
    MultiplyAdd,
    MultiplySub,
    NegativeMultiplyAdd,
    NegativeMultiplySub,
}

impl FusedOp {
    fn subtracts(self) -> bool {
        matches!(self, FusedOp::MultiplySub | FusedOp::NegativeMultiplySub)
    }

    fn negates(self) -> bool {
        matches!(
            self,
            FusedOp::NegativeMultiplyAdd | FusedOp::NegativeMultiplySub
        )
    }
}

/// 第一个 NaN 操作数（按给定顺序）静默化后传播；任一 SNaN 置 VXSNAN
pub(crate) fn propagate_nan<F: Format>(operands: &[u128]) -> Option<FpResult> {
    let first = operands.iter().copied().find(|&x| is_nan::<F>(x))?;
    let mut flags = Flags::empty();
    if operands.iter().any(|&x| is_signaling::<F>(x)) {
        flags |= Flags::VXSNAN;
    }
    let bits = quiet::<F>(first);
    Some(FpResult::new(bits, flags | fprf::<F>(bits)))
}

/// 无效操作：默认 QNaN
pub(crate) fn invalid<F: Format>(flag: Flags) -> FpResult {
    let bits = F::DEFAULT_NAN_BITS;
    FpResult::new(bits, flag | fprf::<F>(bits))
}

/// 由就近舍入结果与（惰性计算的）向零舍入结果得到位模式与状态位
pub(crate) fn rounded<F: Format>(
    nearest: StatusAnd<F>,
    toward_zero: impl FnOnce() -> StatusAnd<F>,
) -> FpResult {
    let status = nearest.status;
    let bits = nearest.value.to_bits();
    let mut flags = Flags::empty();
    let mut undefined = Flags::empty();

    if status.contains(Status::DIV_BY_ZERO) {
        flags |= Flags::ZX;
    }
    if status.contains(Status::OVERFLOW) {
        flags |= Flags::OX;
        undefined |= Flags::FR;
    }
    if status.contains(Status::UNDERFLOW) {
        flags |= Flags::UX;
    }
    if status.contains(Status::INEXACT) {
        flags |= Flags::XX | Flags::FI;
        let truncated = toward_zero().value.to_bits();
        if truncated & !F::SIGN_MASK != bits & !F::SIGN_MASK {
            flags |= Flags::FR;
        }
    }
    FpResult {
        bits,
        flags: (flags | fprf::<F>(bits)).summarize(),
        undefined,
    }
}

fn binary<F: Format>(op: BinaryOp, a: u128, b: u128) -> FpResult {
    if let Some(result) = propagate_nan::<F>(&[a, b]) {
        return result;
    }
    let both_infinite = is_infinite::<F>(a) && is_infinite::<F>(b);
    let same_sign = is_negative::<F>(a) == is_negative::<F>(b);
    let invalid_flag = match op {
        BinaryOp::Add if both_infinite && !same_sign => Some(Flags::VXISI),
        BinaryOp::Sub if both_infinite && same_sign => Some(Flags::VXISI),
        BinaryOp::Mul
            if (is_infinite::<F>(a) && is_zero::<F>(b))
                || (is_zero::<F>(a) && is_infinite::<F>(b)) =>
        {
            Some(Flags::VXIMZ)
        }
        BinaryOp::Div if is_zero::<F>(a) && is_zero::<F>(b) => Some(Flags::VXZDZ),
        BinaryOp::Div if both_infinite => Some(Flags::VXIDI),
        _ => None,
    };
    if let Some(flag) = invalid_flag {
        return invalid::<F>(flag);
    }

    let (fa, fb) = (F::from_bits(a), F::from_bits(b));
    let compute = |round: Round| match op {
        BinaryOp::Add => fa.add_r(fb, round),
        BinaryOp::Sub => fa.sub_r(fb, round),
        BinaryOp::Mul => fa.mul_r(fb, round),
        BinaryOp::Div => fa.div_r(fb, round),
    };
    rounded(compute(Round::NearestTiesToEven), || {
        compute(Round::TowardZero)
    })
}

/// fadd / fadds
pub fn add<F: Format>(a: u128, b: u128) -> FpResult {
    binary::<F>(BinaryOp::Add, a, b)
}

/// fsub / fsubs
pub fn sub<F: Format>(a: u128, b: u128) -> FpResult {
    binary::<F>(BinaryOp::Sub, a, b)
}

/// fmul / fmuls (frA * frC)
pub fn mul<F: Format>(a: u128, c: u128) -> FpResult {
    binary::<F>(BinaryOp::Mul, a, c)
}

/// fdiv / fdivs
pub fn div<F: Format>(a: u128, b: u128) -> FpResult {
    binary::<F>(BinaryOp::Div, a, b)
}

/// fmadd 族：只舍入一次；NaN 优先级为 frA、frB、frC，NaN 结果不取负
pub fn fused<F: Format>(op: FusedOp, a: u128, c: u128, b: u128) -> FpResult {
    if let Some(result) = propagate_nan::<F>(&[a, b, c]) {
        return result;
    }
    if (is_infinite::<F>(a) && is_zero::<F>(c)) || (is_zero::<F>(a) && is_infinite::<F>(c)) {
        return invalid::<F>(Flags::VXIMZ);
    }
    let product_infinite = is_infinite::<F>(a) || is_infinite::<F>(c);
    let product_negative = is_negative::<F>(a) != is_negative::<F>(c);
    let addend_negative = is_negative::<F>(b) != op.subtracts();
    if product_infinite && is_infinite::<F>(b) && product_negative != addend_negative {
        return invalid::<F>(Flags::VXISI);
    }

    let (fa, fc) = (F::from_bits(a), F::from_bits(c));
    let fb = if op.subtracts() {
        -F::from_bits(b)
    } else {
        F::from_bits(b)
    };
    let compute = |round: Round| fa.mul_add_r(fc, fb, round);
    let mut result = rounded(compute(Round::NearestTiesToEven), || {
        compute(Round::TowardZero)
    });
    if op.negates() {
        result.bits ^= F::SIGN_MASK;
        result.flags = ((result.flags - Flags::FPRF) | fprf::<F>(result.bits)).summarize();
    }
    result
}

/// fsqrt / fsqrts
pub fn sqrt<F: Format>(b: u128) -> FpResult {
    if let Some(result) = propagate_nan::<F>(&[b]) {
        return result;
    }
    if is_zero::<F>(b) {
        return FpResult::new(b, fprf::<F>(b));
    }
    if is_negative::<F>(b) {
        return invalid::<F>(Flags::VXSQRT);
    }
    if is_infinite::<F>(b) {
        return FpResult::new(b, fprf::<F>(b));
    }
    let (bits, residual) = F::sqrt_with_residual(b);
    let mut flags = fprf::<F>(bits);
    if residual != Ordering::Equal {
        flags |= Flags::XX | Flags::FI;
        if residual == Ordering::Greater {
            flags |= Flags::FR;
        }
    }
    FpResult::new(bits, flags)
}

/// 估计指令的状态位：FR、FI 与 XX 由实现决定
fn estimate(mut result: FpResult) -> FpResult {
    let inexact_only = !result.flags.intersects(Flags::EXCEPTIONS - Flags::XX);
    result.flags -= Flags::FR | Flags::FI | Flags::XX | Flags::FX;
    result.flags = result.flags.summarize();
    result.undefined |= Flags::FR | Flags::FI | Flags::XX;
    if inexact_only {
        result.undefined |= Flags::FX;
    }
    result
}

/// fres：1/x 的估计，参考值为正确舍入的倒数
pub fn reciprocal_estimate<F: Format>(b: u128) -> FpResult {
    if let Some(result) = propagate_nan::<F>(&[b]) {
        return result;
    }
    let one = F::from_u128(1).value.to_bits();
    estimate(binary::<F>(BinaryOp::Div, one, b))
}

/// frsqrte：1/sqrt(x) 的估计
pub fn reciprocal_sqrt_estimate(b: u128) -> FpResult {
    if let Some(result) = propagate_nan::<Double>(&[b]) {
        return result;
    }
    if is_zero::<Double>(b) {
        let bits = (b & Double::SIGN_MASK) | Double::EXP_MASK;
        return FpResult::new(bits, Flags::ZX | fprf::<Double>(bits));
    }
    if is_negative::<Double>(b) {
        return invalid::<Double>(Flags::VXSQRT);
    }
    if is_infinite::<Double>(b) {
        return FpResult::new(0, fprf::<Double>(0));
    }
    let x = f64::from_bits(b as u64);
    let bits = u128::from((1.0 / x.sqrt()).to_bits());
    estimate(FpResult::new(bits, Flags::XX | fprf::<Double>(bits)))
}

/// fsel：frA >= 0（含 -0，不含 NaN）时取 frC，否则取 frB；不改变任何状态位
pub fn select<F: Format>(a: u128, c: u128, b: u128) -> FpResult {
    let non_negative = !is_nan::<F>(a) && (is_zero::<F>(a) || !is_negative::<F>(a));
    FpResult::quiet_move(if non_negative { c } else { b })
}

/// fmr / fneg / fabs / fnabs 的符号操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignOp {
    Move,
    Negate,
    Absolute,
    NegativeAbsolute,
}

/// 纯位操作，不改变状态位，NaN 也不静默化
pub fn sign_op<F: Format>(op: SignOp, b: u128) -> FpResult {
    let bits = match op {
        SignOp::Move => b,
        SignOp::Negate => b ^ F::SIGN_MASK,
        SignOp::Absolute => b & !F::SIGN_MASK,
        SignOp::NegativeAbsolute => b | F::SIGN_MASK,
    };
    FpResult::quiet_move(bits)
}
