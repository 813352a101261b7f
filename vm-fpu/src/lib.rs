//! vm-fpu - PowerPC 浮点参考语义
//! 逐位精确地给出标量 FPU 指令与 AltiVec 浮点指令的结果以及 FPSCR / VSCR 副作用。
//!
//! ## 特性
//! - 单次舍入的 round-to-nearest-even 运算（基于 `rustc_apfloat` 软浮点）
//! - NaN 传播顺序与默认 QNaN
//! - FR / FI / FPRF 的精确计算，以及实现相关位的“未定义”标记
//! - 浮点到整数转换的饱和与 VXCVI
//! - AltiVec Java / non-Java 模式（见 `vector`）

pub mod arith;
pub mod compare;
pub mod convert;
pub mod format;
pub mod status;
pub mod vector;

pub use rustc_apfloat::Round;
pub use rustc_apfloat::ieee::{Double, Single};
pub use status::Flags;

/// 一次标量浮点运算的结果
///
/// `bits` 只使用格式宽度内的低位。`undefined` 中的位在体系结构上由实现决定，
/// 比较时应排除。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FpResult {
    pub bits: u128,
    pub flags: Flags,
    pub undefined: Flags,
}

impl FpResult {
    /// 构造结果并补全 VX / FX 汇总位
    pub fn new(bits: u128, flags: Flags) -> Self {
        Self {
            bits,
            flags: flags.summarize(),
            undefined: Flags::empty(),
        }
    }

    /// 不影响任何状态位的搬移类结果
    pub fn quiet_move(bits: u128) -> Self {
        Self {
            bits,
            flags: Flags::empty(),
            undefined: Flags::empty(),
        }
    }

    pub fn with_undefined(mut self, undefined: Flags) -> Self {
        self.undefined |= undefined;
        self
    }
}
