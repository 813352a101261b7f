//! 测试用例与笛卡尔积生成器
//!
//! 用例按语料顺序惰性生成：第一个操作数变化最慢，最后一个最快。

use crate::corpus::OperandCorpus;
use crate::descriptor::InstructionDescriptor;
use crate::operand::Value;
use std::fmt;
use vm_error::{OperandError, OracleError, OracleResult};

/// 一个操作数元组；生成后立即消费
#[derive(Debug, Clone)]
pub struct TestCase<'a> {
    pub descriptor: &'a InstructionDescriptor,
    /// 每个操作数在其语料切片中的下标
    pub indices: Vec<usize>,
    pub operands: Vec<Value>,
}

impl TestCase<'_> {
    pub fn mnemonic(&self) -> &str {
        &self.descriptor.mnemonic
    }
}

/// 下标格式 `[00],[01]`，与 dump 行一致
pub struct IndexList<'a>(pub &'a [usize]);

impl fmt::Display for IndexList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, index) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "[{:02}]", index)?;
        }
        Ok(())
    }
}

impl fmt::Display for TestCase<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.descriptor.mnemonic, IndexList(&self.indices))
    }
}

/// 里程表式的笛卡尔积迭代器
pub struct CaseGenerator<'a> {
    descriptor: &'a InstructionDescriptor,
    slices: Vec<&'a [Value]>,
    counters: Vec<usize>,
    exhausted: bool,
}

impl<'a> CaseGenerator<'a> {
    /// 检查每个切片非空且取值类型与描述符一致
    pub fn new(descriptor: &'a InstructionDescriptor, corpus: &'a OperandCorpus) -> OracleResult<Self> {
        let mut slices = Vec::with_capacity(descriptor.arity());
        for (index, &ty) in descriptor.operands.iter().enumerate() {
            let slice = corpus.slice(ty);
            if slice.is_empty() {
                return Err(OracleError::Operand {
                    source: OperandError::EmptySlice {
                        index,
                        ty: ty.to_string(),
                    },
                    mnemonic: descriptor.mnemonic.clone(),
                });
            }
            if let Some(bad) = slice.iter().find(|v| v.semantic_type() != ty) {
                return Err(OracleError::Operand {
                    source: OperandError::TypeMismatch {
                        index,
                        expected: ty.to_string(),
                        found: bad.semantic_type().to_string(),
                    },
                    mnemonic: descriptor.mnemonic.clone(),
                });
            }
            slices.push(slice);
        }
        Ok(Self {
            descriptor,
            counters: vec![0; slices.len()],
            slices,
            exhausted: false,
        })
    }

    /// 用例总数
    pub fn case_count(&self) -> usize {
        self.slices.iter().map(|s| s.len()).product()
    }

    fn advance(&mut self) {
        for position in (0..self.counters.len()).rev() {
            self.counters[position] += 1;
            if self.counters[position] < self.slices[position].len() {
                return;
            }
            self.counters[position] = 0;
        }
        self.exhausted = true;
    }
}

impl<'a> Iterator for CaseGenerator<'a> {
    type Item = TestCase<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        let case = TestCase {
            descriptor: self.descriptor,
            indices: self.counters.clone(),
            operands: self
                .counters
                .iter()
                .zip(&self.slices)
                .map(|(&i, slice)| slice[i])
                .collect(),
        };
        self.advance();
        Some(case)
    }
}
