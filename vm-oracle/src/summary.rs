//! 运行汇总：按判定计数、逐指令统计、不符列表与不支持列表
//!
//! 汇总只由按描述符顺序到达的 [`CaseRecord`] 构建，串行与并行运行得到相同结果。

use crate::compare::Verdict;
use crate::descriptor::{InstructionDescriptor, InstructionGroup};
use crate::operand::{Expected, Observation, Value};
use serde::Serialize;

/// 一个用例的完整结果
#[derive(Debug, Clone)]
pub struct CaseRecord<'a> {
    pub descriptor: &'a InstructionDescriptor,
    pub indices: Vec<usize>,
    pub operands: Vec<Value>,
    pub expected: Expected,
    /// 执行失败（UNSUPPORTED）时为 `None`
    pub observation: Option<Observation>,
    pub verdict: Verdict,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstructionStats {
    pub mnemonic: String,
    pub group: InstructionGroup,
    pub cases: u64,
    pub passed: u64,
    pub mismatched: u64,
    pub unsupported: u64,
}

impl InstructionStats {
    pub fn is_clean(&self) -> bool {
        self.mismatched == 0 && self.unsupported == 0
    }
}

/// 可序列化的不符记录，数值均为十六进制文本
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MismatchRecord {
    pub mnemonic: String,
    pub indices: Vec<usize>,
    pub operands: Vec<String>,
    pub expected: String,
    pub observed: String,
    pub expected_flags: String,
    pub observed_flags: Option<String>,
    pub flag_delta: String,
    pub ulp_distance: Option<u64>,
}

/// 同一指令同一原因的不支持用例合并为一条
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnsupportedRecord {
    pub mnemonic: String,
    pub reason: String,
    pub cases: u64,
}

/// 测试框架看到的命名用例
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamedCase {
    pub name: String,
    pub passed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub adapter: String,
    pub total: u64,
    pub passed: u64,
    pub mismatched: u64,
    pub unsupported: u64,
    pub instructions: Vec<InstructionStats>,
    pub mismatches: Vec<MismatchRecord>,
    pub unsupported_cases: Vec<UnsupportedRecord>,
}

impl RunSummary {
    pub fn new(adapter: impl Into<String>) -> Self {
        Self {
            adapter: adapter.into(),
            ..Self::default()
        }
    }

    /// 开始统计一条指令；之后的记录都计入这条指令
    pub fn begin_instruction(&mut self, descriptor: &InstructionDescriptor) {
        self.instructions.push(InstructionStats {
            mnemonic: descriptor.mnemonic.clone(),
            group: descriptor.group,
            cases: 0,
            passed: 0,
            mismatched: 0,
            unsupported: 0,
        });
    }

    pub fn record(&mut self, record: &CaseRecord<'_>) {
        if self
            .instructions
            .last()
            .is_none_or(|s| s.mnemonic != record.descriptor.mnemonic)
        {
            self.begin_instruction(record.descriptor);
        }
        self.total += 1;
        let Some(stats) = self.instructions.last_mut() else {
            return;
        };
        stats.cases += 1;

        match &record.verdict {
            Verdict::Pass => {
                self.passed += 1;
                stats.passed += 1;
            }
            Verdict::Mismatch(detail) => {
                self.mismatched += 1;
                stats.mismatched += 1;
                self.mismatches.push(MismatchRecord {
                    mnemonic: record.descriptor.mnemonic.clone(),
                    indices: record.indices.clone(),
                    operands: record.operands.iter().map(Value::to_string).collect(),
                    expected: detail.expected.to_string(),
                    observed: detail.observed.to_string(),
                    expected_flags: detail.expected_flags.to_string(),
                    observed_flags: detail.observed_flags.map(|f| f.to_string()),
                    flag_delta: detail.flag_delta.to_string(),
                    ulp_distance: detail
                        .ulp_distance
                        .map(|d| u64::try_from(d).unwrap_or(u64::MAX)),
                });
            }
            Verdict::Unsupported(reason) => {
                self.unsupported += 1;
                stats.unsupported += 1;
                match self.unsupported_cases.last_mut() {
                    Some(last)
                        if last.mnemonic == record.descriptor.mnemonic && &last.reason == reason =>
                    {
                        last.cases += 1
                    }
                    _ => self.unsupported_cases.push(UnsupportedRecord {
                        mnemonic: record.descriptor.mnemonic.clone(),
                        reason: reason.clone(),
                        cases: 1,
                    }),
                }
            }
        }
    }

    /// 计入当前指令的若干 PASS 用例，不保留记录
    pub(crate) fn record_passes(&mut self, count: u64) {
        if let Some(stats) = self.instructions.last_mut() {
            stats.cases += count;
            stats.passed += count;
        }
        self.total += count;
        self.passed += count;
    }

    /// 没有不符
    pub fn is_clean(&self) -> bool {
        self.mismatched == 0
    }

    /// 每条指令一个命名用例；没有 MISMATCH 与 UNSUPPORTED 时通过
    pub fn test_cases(&self) -> Vec<NamedCase> {
        self.instructions
            .iter()
            .map(|s| NamedCase {
                name: s.mnemonic.clone(),
                passed: s.is_clean(),
            })
            .collect()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
