//! 宿主 SIMD 执行路径
//!
//! 在 x86_64 上用 SSE2 指令执行与 AltiVec 语义一致的逐元素运算，供执行适配器取得
//! “硬件观测值”。不支持的平台或元素宽度返回 `None`，由调用方记为不支持。
//! SSE 的元素边界与大端编号的元素边界重合，逐元素运算不受字节序影响。

use crate::Vec128;

/// 宿主可执行的整数向量运算
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostOp {
    Add,
    Sub,
    AddSatS,
    AddSatU,
    SubSatS,
    SubSatU,
    AvgU,
    MinU,
    MaxU,
    MinS,
    MaxS,
    CmpEq,
    CmpGtS,
    And,
    AndC,
    Or,
    Xor,
}

/// 宿主可执行的单精度向量运算
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostFloatOp {
    Add,
    Sub,
}

/// 用宿主 SIMD 指令执行整数向量运算
pub fn vec_binop(op: HostOp, a: Vec128, b: Vec128, element_size: u8) -> Option<Vec128> {
    platform::vec_binop(op, a, b, element_size)
}

/// 用宿主 SIMD 指令执行 4 x f32 运算
pub fn vec_float_binop(op: HostFloatOp, a: Vec128, b: Vec128) -> Option<Vec128> {
    platform::vec_float_binop(op, a, b)
}

#[cfg(target_arch = "x86_64")]
mod platform {
    use super::{HostFloatOp, HostOp};
    use crate::Vec128;
    use std::arch::x86_64::*;

    pub fn vec_binop(op: HostOp, a: Vec128, b: Vec128, element_size: u8) -> Option<Vec128> {
        if !is_x86_feature_detected!("sse2") {
            return None;
        }
        unsafe { sse_binop(op, a, b, element_size) }
    }

    pub fn vec_float_binop(op: HostFloatOp, a: Vec128, b: Vec128) -> Option<Vec128> {
        if !is_x86_feature_detected!("sse2") {
            return None;
        }
        unsafe { sse_float_binop(op, a, b) }
    }

    #[target_feature(enable = "sse2")]
    fn load(v: Vec128) -> __m128i {
        _mm_set_epi64x((v.0 >> 64) as u64 as i64, v.0 as u64 as i64)
    }

    #[target_feature(enable = "sse2")]
    fn store(r: __m128i) -> Vec128 {
        let lo = _mm_cvtsi128_si64(r) as u64;
        let hi = _mm_cvtsi128_si64(_mm_unpackhi_epi64(r, r)) as u64;
        Vec128((u128::from(hi) << 64) | u128::from(lo))
    }

    /// 使用SSE2指令执行整数向量运算
    ///
    /// # Safety
    ///
    /// 调用此函数必须满足以下条件：
    /// - CPU必须支持SSE2指令集（由`#[target_feature(enable = "sse2")]`保证）
    ///
    /// 违反这些条件将导致未定义行为（UB）。
    #[target_feature(enable = "sse2")]
    unsafe fn sse_binop(op: HostOp, a: Vec128, b: Vec128, element_size: u8) -> Option<Vec128> {
        let va = load(a);
        let vb = load(b);
        let res = match (op, element_size) {
            (HostOp::Add, 1) => _mm_add_epi8(va, vb),
            (HostOp::Add, 2) => _mm_add_epi16(va, vb),
            (HostOp::Add, 4) => _mm_add_epi32(va, vb),
            (HostOp::Sub, 1) => _mm_sub_epi8(va, vb),
            (HostOp::Sub, 2) => _mm_sub_epi16(va, vb),
            (HostOp::Sub, 4) => _mm_sub_epi32(va, vb),
            (HostOp::AddSatS, 1) => _mm_adds_epi8(va, vb),
            (HostOp::AddSatS, 2) => _mm_adds_epi16(va, vb),
            (HostOp::AddSatU, 1) => _mm_adds_epu8(va, vb),
            (HostOp::AddSatU, 2) => _mm_adds_epu16(va, vb),
            (HostOp::SubSatS, 1) => _mm_subs_epi8(va, vb),
            (HostOp::SubSatS, 2) => _mm_subs_epi16(va, vb),
            (HostOp::SubSatU, 1) => _mm_subs_epu8(va, vb),
            (HostOp::SubSatU, 2) => _mm_subs_epu16(va, vb),
            (HostOp::AvgU, 1) => _mm_avg_epu8(va, vb),
            (HostOp::AvgU, 2) => _mm_avg_epu16(va, vb),
            (HostOp::MinU, 1) => _mm_min_epu8(va, vb),
            (HostOp::MaxU, 1) => _mm_max_epu8(va, vb),
            (HostOp::MinS, 2) => _mm_min_epi16(va, vb),
            (HostOp::MaxS, 2) => _mm_max_epi16(va, vb),
            (HostOp::CmpEq, 1) => _mm_cmpeq_epi8(va, vb),
            (HostOp::CmpEq, 2) => _mm_cmpeq_epi16(va, vb),
            (HostOp::CmpEq, 4) => _mm_cmpeq_epi32(va, vb),
            (HostOp::CmpGtS, 1) => _mm_cmpgt_epi8(va, vb),
            (HostOp::CmpGtS, 2) => _mm_cmpgt_epi16(va, vb),
            (HostOp::CmpGtS, 4) => _mm_cmpgt_epi32(va, vb),
            (HostOp::And, _) => _mm_and_si128(va, vb),
            // andnot 计算 !a & b
            (HostOp::AndC, _) => _mm_andnot_si128(vb, va),
            (HostOp::Or, _) => _mm_or_si128(va, vb),
            (HostOp::Xor, _) => _mm_xor_si128(va, vb),
            _ => return None,
        };
        Some(store(res))
    }

    /// 使用SSE指令执行单精度向量运算
    ///
    /// # Safety
    ///
    /// 调用此函数必须满足以下条件：
    /// - CPU必须支持SSE2指令集（由`#[target_feature(enable = "sse2")]`保证）
    ///
    /// 违反这些条件将导致未定义行为（UB）。
    #[target_feature(enable = "sse2")]
    unsafe fn sse_float_binop(op: HostFloatOp, a: Vec128, b: Vec128) -> Option<Vec128> {
        let va = _mm_castsi128_ps(load(a));
        let vb = _mm_castsi128_ps(load(b));
        let res = match op {
            HostFloatOp::Add => _mm_add_ps(va, vb),
            HostFloatOp::Sub => _mm_sub_ps(va, vb),
        };
        Some(store(_mm_castps_si128(res)))
    }
}

#[cfg(not(target_arch = "x86_64"))]
mod platform {
    use super::{HostFloatOp, HostOp};
    use crate::Vec128;

    pub fn vec_binop(_op: HostOp, _a: Vec128, _b: Vec128, _element_size: u8) -> Option<Vec128> {
        None
    }

    pub fn vec_float_binop(_op: HostFloatOp, _a: Vec128, _b: Vec128) -> Option<Vec128> {
        None
    }
}
