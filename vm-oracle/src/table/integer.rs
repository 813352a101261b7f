//! 64 位整数逻辑指令
//!
//! 记录形式（助记符带 `.`）按 64 位有符号结果设置 CR0 的 LT/GT/EQ，SO 取自已清零的 XER[SO]。

use crate::descriptor::{DescriptorBuilder, InstructionDescriptor, InstructionGroup, TableBuilder};
use crate::operand::{Expected, ImmKind, SemanticType, Value};
use vm_fpu::Flags;

type Logical = fn(u64, u64) -> u64;
type Unary = fn(u64) -> u64;

const LOGICAL: [(&str, Logical); 8] = [
    ("and", |a, b| a & b),
    ("andc", |a, b| a & !b),
    ("eqv", |a, b| !(a ^ b)),
    ("nand", |a, b| !(a & b)),
    ("nor", |a, b| !(a | b)),
    ("or", |a, b| a | b),
    ("orc", |a, b| a | !b),
    ("xor", |a, b| a ^ b),
];

/// 立即数形式：`(助记符, 运算, 是否记录)`；andi. 与 andis. 总是设置 CR0
const IMMEDIATE: [(&str, Logical, bool); 6] = [
    ("andi.", |a, imm| a & imm, true),
    ("andis.", |a, imm| a & (imm << 16), true),
    ("ori", |a, imm| a | imm, false),
    ("oris", |a, imm| a | (imm << 16), false),
    ("xori", |a, imm| a ^ imm, false),
    ("xoris", |a, imm| a ^ (imm << 16), false),
];

const UNARY: [(&str, Unary); 5] = [
    ("cntlzd", |a| u64::from(a.leading_zeros())),
    ("cntlzw", |a| u64::from((a as u32).leading_zeros())),
    ("extsb", |a| a as i8 as i64 as u64),
    ("extsh", |a| a as i16 as i64 as u64),
    ("extsw", |a| a as i32 as i64 as u64),
];

/// CR0 字段：LT GT EQ SO（SO 为 0）
pub fn cr0(result: u64) -> Flags {
    let signed = result as i64;
    let field = match signed.cmp(&0) {
        std::cmp::Ordering::Less => 0b1000,
        std::cmp::Ordering::Greater => 0b0100,
        std::cmp::Ordering::Equal => 0b0010,
    };
    Flags::from_cr_field(field)
}

fn expected(result: u64, record: bool) -> Expected {
    let flags = if record { cr0(result) } else { Flags::empty() };
    Expected::exact(Value::Gpr(result), flags)
}

fn logical(mnemonic: String) -> DescriptorBuilder {
    InstructionDescriptor::builder(mnemonic, InstructionGroup::IntegerLogical, SemanticType::Gpr)
}

pub fn register(builder: &mut TableBuilder) {
    for (mnemonic, op) in LOGICAL {
        for record in [false, true] {
            let name = if record { format!("{mnemonic}.") } else { mnemonic.to_string() };
            builder.add(
                logical(name)
                    .operands([SemanticType::Gpr, SemanticType::Gpr])
                    .reference(move |ops| Ok(expected(op(ops.gpr(0)?, ops.gpr(1)?), record))),
            );
        }
    }

    for (mnemonic, op, record) in IMMEDIATE {
        builder.add(
            logical(mnemonic.to_string())
                .operands([SemanticType::Gpr, SemanticType::Imm(ImmKind::Uimm16)])
                .reference(move |ops| {
                    let imm = u64::from(ops.imm(1, ImmKind::Uimm16)? as u16);
                    Ok(expected(op(ops.gpr(0)?, imm), record))
                }),
        );
    }

    for (mnemonic, op) in UNARY {
        for record in [false, true] {
            let name = if record { format!("{mnemonic}.") } else { mnemonic.to_string() };
            builder.add(
                logical(name)
                    .operands([SemanticType::Gpr])
                    .reference(move |ops| Ok(expected(op(ops.gpr(0)?), record))),
            );
        }
    }
}
