//! 标准指令表
//!
//! 每个分组一个子模块，各自把描述符注册进 [`TableBuilder`]。注册顺序即报告顺序。

use crate::corpus::{MEMORY_SIZE, OperandCorpus};
use crate::descriptor::{
    DescriptorBuilder, InstructionDescriptor, InstructionGroup, InstructionTable, TableBuilder,
};
use crate::operand::{Expected, LaneType, SemanticType, Value};
use vm_error::OracleResult;
use vm_fpu::vector::VectorMode;
use vm_fpu::{Flags, FpResult};
use vm_simd::{Saturating, Vec128};

pub mod fpu;
pub mod integer;
pub mod mem;
pub mod vector_fp;
pub mod vector_int;
pub mod vector_perm;

/// 参考函数构造时捕获的运行参数
#[derive(Debug, Clone, Copy)]
pub struct TableOptions {
    pub vector_mode: VectorMode,
    pub memory: [u8; MEMORY_SIZE],
}

impl TableOptions {
    pub fn new(corpus: &OperandCorpus, vector_mode: VectorMode) -> Self {
        Self {
            vector_mode,
            memory: *corpus.memory(),
        }
    }
}

/// 注册全部分组并校验
pub fn standard_table(corpus: &OperandCorpus, options: &TableOptions) -> OracleResult<InstructionTable> {
    let mut builder = TableBuilder::new();
    fpu::register(&mut builder);
    integer::register(&mut builder);
    vector_int::register(&mut builder);
    vector_fp::register(&mut builder, options);
    vector_perm::register(&mut builder);
    mem::register(&mut builder, options);
    builder.build(corpus)
}

/// 标量浮点结果 → 期望值；未定义位不参与比较
pub(crate) fn single(r: FpResult) -> Expected {
    Expected::exact(Value::F32(r.bits as u32), r.flags).ignore_flags(r.undefined)
}

pub(crate) fn double(r: FpResult) -> Expected {
    Expected::exact(Value::F64(r.bits as u64), r.flags).ignore_flags(r.undefined)
}

pub(crate) fn vector(lane: LaneType, v: Vec128) -> Expected {
    Expected::value(Value::Vector(lane, v))
}

/// 饱和结果置 VSCR[SAT]
pub(crate) fn saturating(lane: LaneType, r: Saturating) -> Expected {
    let flags = if r.saturated { Flags::SAT } else { Flags::empty() };
    Expected::exact(Value::Vector(lane, r.value), flags)
}

pub(crate) fn vunary<F>(
    mnemonic: impl Into<String>,
    group: InstructionGroup,
    operand: LaneType,
    result: LaneType,
    op: F,
) -> DescriptorBuilder
where
    F: Fn(Vec128) -> Expected + Send + Sync + 'static,
{
    InstructionDescriptor::builder(mnemonic, group, SemanticType::Vector(result))
        .operands([SemanticType::Vector(operand)])
        .reference(move |ops| Ok(op(ops.vector(0)?)))
}

pub(crate) fn vbinary<F>(
    mnemonic: impl Into<String>,
    group: InstructionGroup,
    operands: [LaneType; 2],
    result: LaneType,
    op: F,
) -> DescriptorBuilder
where
    F: Fn(Vec128, Vec128) -> Expected + Send + Sync + 'static,
{
    InstructionDescriptor::builder(mnemonic, group, SemanticType::Vector(result))
        .operands(operands.map(SemanticType::Vector))
        .reference(move |ops| Ok(op(ops.vector(0)?, ops.vector(1)?)))
}

pub(crate) fn vternary<F>(
    mnemonic: impl Into<String>,
    group: InstructionGroup,
    operands: [LaneType; 3],
    result: LaneType,
    op: F,
) -> DescriptorBuilder
where
    F: Fn(Vec128, Vec128, Vec128) -> Expected + Send + Sync + 'static,
{
    InstructionDescriptor::builder(mnemonic, group, SemanticType::Vector(result))
        .operands(operands.map(SemanticType::Vector))
        .reference(move |ops| Ok(op(ops.vector(0)?, ops.vector(1)?, ops.vector(2)?)))
}

/// 元素 `index` 以外的位
pub(crate) fn outside_lane(element_size: u8, index: usize) -> u128 {
    !Vec128::ZERO.with_lane(element_size, index, u64::MAX).0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_table_builds() {
        let corpus = OperandCorpus::standard();
        let table = standard_table(corpus, &TableOptions::new(corpus, VectorMode::JAVA))
            .expect("standard table is valid");
        for mnemonic in ["fadds", "and.", "vaddsbs", "vmaddfp", "vperm", "lvx", "stvebx"] {
            assert!(table.contains(mnemonic), "{mnemonic} missing");
        }
        assert!(table.iter().all(|d| (1..=3).contains(&d.arity())));
    }

    #[test]
    fn test_every_reference_accepts_its_first_case() {
        let corpus = OperandCorpus::standard();
        let table = standard_table(corpus, &TableOptions::new(corpus, VectorMode::JAVA))
            .expect("standard table is valid");
        for descriptor in table.iter() {
            let operands: Vec<Value> = descriptor
                .operands
                .iter()
                .map(|&ty| corpus.slice(ty)[0])
                .collect();
            let expected = descriptor.evaluate(&operands);
            assert!(expected.is_ok(), "{}: {:?}", descriptor.mnemonic, expected);
        }
    }

    #[test]
    fn test_outside_lane_mask() {
        assert_eq!(!outside_lane(4, 0), 0xFFFF_FFFF << 96);
        assert_eq!(!outside_lane(1, 15), 0xFF);
    }
}
