//! 向量 load/store 指令
//!
//! load 读取固定的内存映像；store 写入全零缓冲区后观测目标所在的对齐四字。
//! 有效地址对映像长度取模，不产生对齐异常。

use super::{TableOptions, outside_lane, vector};
use crate::corpus::MEMORY_SIZE;
use crate::descriptor::{InstructionDescriptor, InstructionGroup, TableBuilder};
use crate::operand::{Expected, ImmKind, LaneType, SemanticType};
use vm_simd::Vec128;
use vm_simd::permute;

const GROUP: InstructionGroup = InstructionGroup::VectorMemory;
const OFFSET: SemanticType = SemanticType::Imm(ImmKind::Offset);

type Memory = [u8; MEMORY_SIZE];

/// 元素访问的对齐地址与元素编号
fn element_address(offset: i32, size: u8) -> (usize, usize) {
    let ea = (offset as u32 as usize % MEMORY_SIZE) & !(usize::from(size) - 1);
    (ea, (ea & 0xF) / usize::from(size))
}

fn read(memory: &Memory, ea: usize, size: u8) -> u64 {
    memory[ea..ea + usize::from(size)]
        .iter()
        .fold(0, |acc, &b| (acc << 8) | u64::from(b))
}

fn load_element(memory: &Memory, offset: i32, size: u8, lane: LaneType) -> Expected {
    let (ea, index) = element_address(offset, size);
    let value = Vec128::ZERO.with_lane(size, index, read(memory, ea, size));
    // 其余元素未定义
    vector(lane, value).ignore_bits(outside_lane(size, index))
}

fn load_quadword(memory: &Memory, offset: i32) -> Vec128 {
    let (ea, _) = element_address(offset, 16);
    Vec128(read_quadword(memory, ea))
}

fn read_quadword(memory: &Memory, ea: usize) -> u128 {
    memory[ea..ea + 16]
        .iter()
        .fold(0, |acc, &b| (acc << 8) | u128::from(b))
}

/// 把 `source` 的元素（`size == 16` 时为整个向量）写入全零缓冲区，返回目标对齐四字
fn store(source: Vec128, offset: i32, size: u8) -> Vec128 {
    let mut buffer: Memory = [0; MEMORY_SIZE];
    if size == 16 {
        let (ea, _) = element_address(offset, 16);
        buffer[ea..ea + 16].copy_from_slice(&source.to_bytes());
    } else {
        let (ea, index) = element_address(offset, size);
        let bytes = source.lane(size, index).to_be_bytes();
        buffer[ea..ea + usize::from(size)].copy_from_slice(&bytes[8 - usize::from(size)..]);
    }
    let (quad, _) = element_address(offset, 16);
    Vec128(read_quadword(&buffer, quad))
}

pub fn register(builder: &mut TableBuilder, options: &TableOptions) {
    let memory = options.memory;

    let element_loads = [
        ("lvebx", 1u8, LaneType::UnsignedByte),
        ("lvehx", 2, LaneType::UnsignedHalf),
        ("lvewx", 4, LaneType::UnsignedWord),
    ];
    for (name, size, lane) in element_loads {
        builder.add(
            InstructionDescriptor::builder(name, GROUP, SemanticType::Vector(lane))
                .operands([OFFSET])
                .reference(move |ops| {
                    Ok(load_element(&memory, ops.imm(0, ImmKind::Offset)?, size, lane))
                }),
        );
    }
    // lvxl 只多一个 LRU 提示
    for name in ["lvx", "lvxl"] {
        let lane = LaneType::UnsignedWord;
        builder.add(
            InstructionDescriptor::builder(name, GROUP, SemanticType::Vector(lane))
                .operands([OFFSET])
                .reference(move |ops| {
                    Ok(vector(lane, load_quadword(&memory, ops.imm(0, ImmKind::Offset)?)))
                }),
        );
    }
    type Control = fn(u64) -> Vec128;
    let controls: [(&str, Control); 2] = [
        ("lvsl", permute::load_shift_left),
        ("lvsr", permute::load_shift_right),
    ];
    for (name, control) in controls {
        let lane = LaneType::UnsignedByte;
        builder.add(
            InstructionDescriptor::builder(name, GROUP, SemanticType::Vector(lane))
                .operands([OFFSET])
                .reference(move |ops| {
                    let offset = ops.imm(0, ImmKind::Offset)? as u32;
                    Ok(vector(lane, control(u64::from(offset))))
                }),
        );
    }

    let stores = [
        ("stvebx", 1u8, LaneType::UnsignedByte),
        ("stvehx", 2, LaneType::UnsignedHalf),
        ("stvewx", 4, LaneType::UnsignedWord),
        ("stvx", 16, LaneType::UnsignedWord),
        ("stvxl", 16, LaneType::UnsignedWord),
    ];
    for (name, size, lane) in stores {
        builder.add(
            InstructionDescriptor::builder(name, GROUP, SemanticType::Vector(lane))
                .operands([SemanticType::Vector(lane), OFFSET])
                .reference(move |ops| {
                    let offset = ops.imm(1, ImmKind::Offset)?;
                    Ok(vector(lane, store(ops.vector(0)?, offset, size)))
                }),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::OperandCorpus;
    use crate::descriptor::InstructionTable;
    use crate::operand::Value;
    use vm_fpu::vector::VectorMode;

    fn table() -> InstructionTable {
        let corpus = OperandCorpus::standard();
        let mut builder = TableBuilder::new();
        register(&mut builder, &TableOptions::new(corpus, VectorMode::JAVA));
        builder.build(corpus).expect("memory table is valid")
    }

    fn run(table: &InstructionTable, mnemonic: &str, operands: &[Value]) -> Expected {
        table
            .get(mnemonic)
            .expect("registered")
            .evaluate(operands)
            .expect("typed operands")
    }

    fn offset(ea: i32) -> Value {
        Value::Imm(ImmKind::Offset, ea)
    }

    #[test]
    fn test_lvehx_loads_aligned_element_only() {
        let table = table();
        // 地址 5 向下对齐到 4，元素编号 2
        let e = run(&table, "lvehx", &[offset(5)]);
        assert_eq!(e.value.bits(), Vec128::ZERO.with_lane(2, 2, 0x0405).0);
        assert_eq!(e.care.value_mask, !outside_lane(2, 2));
    }

    #[test]
    fn test_lvx_ignores_low_address_bits() {
        let table = table();
        let e = run(&table, "lvx", &[offset(17)]);
        let expected: [u8; 16] = std::array::from_fn(|i| 16 + i as u8);
        assert_eq!(e.value.bits(), u128::from_be_bytes(expected));
        assert_eq!(e.care.value_mask, u128::MAX);
    }

    #[test]
    fn test_lvsl_lvsr_controls() {
        let table = table();
        let e = run(&table, "lvsl", &[offset(3)]);
        assert_eq!(e.value.bits() >> 120, 3);
        let e = run(&table, "lvsr", &[offset(3)]);
        assert_eq!(e.value.bits() >> 120, 13);
    }

    #[test]
    fn test_element_store_writes_one_lane() {
        let table = table();
        let source = Value::Vector(LaneType::UnsignedWord, Vec128::from_words([1, 2, 3, 4]));
        let e = run(&table, "stvewx", &[source, offset(24)]);
        // 地址 24 位于第二个四字的字 2
        assert_eq!(e.value.bits(), Vec128::from_words([0, 0, 3, 0]).0);

        let e = run(&table, "stvx", &[source, offset(31)]);
        assert_eq!(e.value, source);
    }
}
