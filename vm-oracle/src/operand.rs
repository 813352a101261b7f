//! 操作数与结果值的类型化表示
//!
//! 浮点数以原始位模式保存，NaN payload 与零的符号不会丢失。

use serde::{Deserialize, Serialize};
use std::fmt;
use vm_error::OperandError;
use vm_fpu::Flags;
use vm_simd::Vec128;

/// 向量元素的解释方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaneType {
    SignedByte,
    UnsignedByte,
    SignedHalf,
    UnsignedHalf,
    SignedWord,
    UnsignedWord,
    Float,
}

impl LaneType {
    pub const ALL: [LaneType; 7] = [
        LaneType::SignedByte,
        LaneType::UnsignedByte,
        LaneType::SignedHalf,
        LaneType::UnsignedHalf,
        LaneType::SignedWord,
        LaneType::UnsignedWord,
        LaneType::Float,
    ];

    /// 元素字节数
    pub fn element_size(self) -> u8 {
        match self {
            LaneType::SignedByte | LaneType::UnsignedByte => 1,
            LaneType::SignedHalf | LaneType::UnsignedHalf => 2,
            LaneType::SignedWord | LaneType::UnsignedWord | LaneType::Float => 4,
        }
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            LaneType::SignedByte | LaneType::SignedHalf | LaneType::SignedWord
        )
    }

    fn suffix(self) -> &'static str {
        match self {
            LaneType::SignedByte => "sb",
            LaneType::UnsignedByte => "ub",
            LaneType::SignedHalf => "sh",
            LaneType::UnsignedHalf => "uh",
            LaneType::SignedWord => "sw",
            LaneType::UnsignedWord => "uw",
            LaneType::Float => "fp",
        }
    }
}

/// 立即数的语义类别，决定语料中的取值
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImmKind {
    /// andi. / ori 等的 16 位无符号立即数
    Uimm16,
    /// vspltis* 的 5 位有符号立即数
    Simm5,
    /// vct*xs / vcf*x 的 2^scale
    Scale,
    ByteIndex,
    HalfIndex,
    WordIndex,
    /// vsldoi 的字节移位量
    ShiftOctets,
    /// 向量 load/store 的有效地址
    Offset,
}

impl ImmKind {
    fn name(self) -> &'static str {
        match self {
            ImmKind::Uimm16 => "uimm16",
            ImmKind::Simm5 => "simm5",
            ImmKind::Scale => "scale",
            ImmKind::ByteIndex => "byte_index",
            ImmKind::HalfIndex => "half_index",
            ImmKind::WordIndex => "word_index",
            ImmKind::ShiftOctets => "shift_octets",
            ImmKind::Offset => "offset",
        }
    }
}

/// 操作数/结果的语义类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SemanticType {
    F32,
    F64,
    Gpr,
    CrField,
    Vector(LaneType),
    Imm(ImmKind),
}

impl SemanticType {
    /// 位宽
    pub fn width(self) -> u32 {
        match self {
            SemanticType::F32 | SemanticType::Imm(_) => 32,
            SemanticType::F64 | SemanticType::Gpr => 64,
            SemanticType::CrField => 4,
            SemanticType::Vector(_) => 128,
        }
    }

    /// 覆盖全部有效位的掩码
    pub fn full_mask(self) -> u128 {
        match self.width() {
            128 => u128::MAX,
            w => (1u128 << w) - 1,
        }
    }

    /// 由原始位模式构造该类型的值
    pub fn value_from_bits(self, bits: u128) -> Value {
        match self {
            SemanticType::F32 => Value::F32(bits as u32),
            SemanticType::F64 => Value::F64(bits as u64),
            SemanticType::Gpr => Value::Gpr(bits as u64),
            SemanticType::CrField => Value::Cr((bits & 0xF) as u8),
            SemanticType::Vector(lane) => Value::Vector(lane, Vec128(bits)),
            SemanticType::Imm(kind) => Value::Imm(kind, bits as u32 as i32),
        }
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SemanticType::F32 => write!(f, "f32"),
            SemanticType::F64 => write!(f, "f64"),
            SemanticType::Gpr => write!(f, "gpr"),
            SemanticType::CrField => write!(f, "cr"),
            SemanticType::Vector(lane) => write!(f, "v{}", lane.suffix()),
            SemanticType::Imm(kind) => write!(f, "imm:{}", kind.name()),
        }
    }
}

/// 不可变的类型化值
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Value {
    F32(u32),
    F64(u64),
    Gpr(u64),
    /// 4 位条件字段（LT GT EQ SO/UN，高位在前）
    Cr(u8),
    Vector(LaneType, Vec128),
    Imm(ImmKind, i32),
}

/// 语料中的操作数与结果值使用同一表示
pub type Operand = Value;

impl Value {
    pub fn semantic_type(&self) -> SemanticType {
        match self {
            Value::F32(_) => SemanticType::F32,
            Value::F64(_) => SemanticType::F64,
            Value::Gpr(_) => SemanticType::Gpr,
            Value::Cr(_) => SemanticType::CrField,
            Value::Vector(lane, _) => SemanticType::Vector(*lane),
            Value::Imm(kind, _) => SemanticType::Imm(*kind),
        }
    }

    /// 原始位模式（零扩展到 128 位）
    pub fn bits(&self) -> u128 {
        match *self {
            Value::F32(b) => u128::from(b),
            Value::F64(b) | Value::Gpr(b) => u128::from(b),
            Value::Cr(b) => u128::from(b & 0xF),
            Value::Vector(_, v) => v.0,
            Value::Imm(_, i) => u128::from(i as u32),
        }
    }

    pub fn from_f32(x: f32) -> Self {
        Value::F32(x.to_bits())
    }

    pub fn from_f64(x: f64) -> Self {
        Value::F64(x.to_bits())
    }
}

/// 以十六进制输出，宽度由类型决定；立即数以十进制输出
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::F32(b) => write!(f, "0x{:08x}", b),
            Value::F64(b) | Value::Gpr(b) => write!(f, "0x{:016x}", b),
            Value::Cr(b) => write!(f, "0x{:x}", b & 0xF),
            Value::Vector(_, v) => write!(f, "0x{}", v),
            Value::Imm(_, i) => write!(f, "#{}", i),
        }
    }
}

/// 参考函数看到的操作数元组，访问时检查类型
#[derive(Debug, Clone, Copy)]
pub struct Operands<'a>(pub &'a [Value]);

impl<'a> Operands<'a> {
    fn get(&self, index: usize) -> Result<&'a Value, OperandError> {
        self.0.get(index).ok_or(OperandError::Missing(index))
    }

    fn mismatch(index: usize, expected: &str, found: &Value) -> OperandError {
        OperandError::TypeMismatch {
            index,
            expected: expected.to_string(),
            found: found.semantic_type().to_string(),
        }
    }

    pub fn f32(&self, index: usize) -> Result<u32, OperandError> {
        match self.get(index)? {
            Value::F32(b) => Ok(*b),
            other => Err(Self::mismatch(index, "f32", other)),
        }
    }

    pub fn f64(&self, index: usize) -> Result<u64, OperandError> {
        match self.get(index)? {
            Value::F64(b) => Ok(*b),
            other => Err(Self::mismatch(index, "f64", other)),
        }
    }

    pub fn gpr(&self, index: usize) -> Result<u64, OperandError> {
        match self.get(index)? {
            Value::Gpr(b) => Ok(*b),
            other => Err(Self::mismatch(index, "gpr", other)),
        }
    }

    /// 任意元素类型的向量
    pub fn vector(&self, index: usize) -> Result<Vec128, OperandError> {
        match self.get(index)? {
            Value::Vector(_, v) => Ok(*v),
            other => Err(Self::mismatch(index, "vector", other)),
        }
    }

    pub fn imm(&self, index: usize, kind: ImmKind) -> Result<i32, OperandError> {
        match self.get(index)? {
            Value::Imm(k, i) if *k == kind => Ok(*i),
            other => Err(Self::mismatch(
                index,
                &SemanticType::Imm(kind).to_string(),
                other,
            )),
        }
    }
}

/// 比较时关心的位
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Care {
    pub value_mask: u128,
    pub flags: Flags,
}

/// 参考模型给出的期望结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expected {
    pub value: Value,
    pub flags: Flags,
    pub care: Care,
}

impl Expected {
    /// 结果的全部位与全部状态位都参与比较
    pub fn exact(value: Value, flags: Flags) -> Self {
        Self {
            value,
            flags,
            care: Care {
                value_mask: value.semantic_type().full_mask(),
                flags: Flags::all(),
            },
        }
    }

    /// 没有状态副作用的结果
    pub fn value(value: Value) -> Self {
        Self::exact(value, Flags::empty())
    }

    /// 排除结果中体系结构未定义的位
    pub fn ignore_bits(mut self, mask: u128) -> Self {
        self.care.value_mask &= !mask;
        self
    }

    /// 排除由实现决定的状态位
    pub fn ignore_flags(mut self, flags: Flags) -> Self {
        self.care.flags -= flags;
        self.flags -= flags;
        self
    }
}

/// 执行器报告的实际结果；`flags` 为 `None` 表示执行器无法观测状态位
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    pub value: Value,
    pub flags: Option<Flags>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_display_widths() {
        assert_eq!(Value::F32(0x8000_0000).to_string(), "0x80000000");
        assert_eq!(Value::Gpr(1).to_string(), "0x0000000000000001");
        assert_eq!(Value::Imm(ImmKind::Simm5, -1).to_string(), "#-1");
        assert_eq!(
            Value::Vector(LaneType::Float, Vec128(1)).to_string(),
            "0x00000000000000000000000000000001"
        );
    }

    #[test]
    fn test_operand_type_checking() {
        let values = [Value::F32(0), Value::Imm(ImmKind::Scale, 2)];
        let ops = Operands(&values);
        assert_eq!(ops.f32(0), Ok(0));
        assert!(matches!(ops.f64(0), Err(OperandError::TypeMismatch { index: 0, .. })));
        assert_eq!(ops.imm(1, ImmKind::Scale), Ok(2));
        assert!(ops.imm(1, ImmKind::Offset).is_err());
        assert_eq!(ops.gpr(2), Err(OperandError::Missing(2)));
    }

    #[test]
    fn test_care_mask_helpers() {
        let e = Expected::exact(Value::F64(0), Flags::FE | Flags::FX)
            .ignore_bits(0xFFFF_FFFF_0000_0000)
            .ignore_flags(Flags::FPRF);
        assert_eq!(e.care.value_mask, 0xFFFF_FFFF);
        assert_eq!(e.flags, Flags::FX);
        assert!(!e.care.flags.contains(Flags::FE));
    }

    #[test]
    fn test_value_from_bits_round_trip() {
        let ty = SemanticType::Vector(LaneType::SignedHalf);
        assert_eq!(ty.value_from_bits(5).bits(), 5);
        assert_eq!(SemanticType::Imm(ImmKind::Simm5).value_from_bits(0xFFFF_FFFF), Value::Imm(ImmKind::Simm5, -1));
        assert_eq!(ty.to_string(), "vsh");
    }
}
