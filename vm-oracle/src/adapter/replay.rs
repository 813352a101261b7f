//! 回放执行器：读取另一次运行（例如真实硬件）按 dump 格式记录的观测值
//!
//! 行格式：`<助记符> [ii],[jj] -> 0x<结果> [flags=0x<状态位>]`，`#` 开头的行与空行忽略。
//! 没有 `flags=` 的行表示状态位不可观测。

use super::ExecutionAdapter;
use crate::case::{IndexList, TestCase};
use crate::descriptor::InstructionTable;
use crate::operand::Value;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::Path;
use vm_error::{AdapterError, OracleResult, ReplayError};
use vm_fpu::Flags;

type Key = (String, Vec<usize>);

#[derive(Debug, Clone, Copy)]
struct Recorded {
    bits: u128,
    flags: Option<Flags>,
}

#[derive(Debug, Default)]
pub struct ReplayAdapter {
    observations: HashMap<Key, Recorded>,
    last_flags: Option<Flags>,
}

fn parse_hex(token: &str) -> Option<u128> {
    let digits = token.strip_prefix("0x").or_else(|| token.strip_prefix("0X"))?;
    u128::from_str_radix(digits, 16).ok()
}

fn parse_indices(token: &str) -> Option<Vec<usize>> {
    token
        .split(',')
        .map(|part| part.strip_prefix('[')?.strip_suffix(']')?.parse().ok())
        .collect()
}

impl ReplayAdapter {
    /// 解析 dump 文本；助记符必须存在于表中，下标个数必须与元数一致
    pub fn parse(text: &str, table: &InstructionTable) -> OracleResult<Self> {
        let mut observations = HashMap::new();
        for (number, raw) in text.lines().enumerate() {
            let line = number + 1;
            let content = raw.trim();
            if content.is_empty() || content.starts_with('#') {
                continue;
            }
            let malformed = |reason: &str| ReplayError::Malformed {
                line,
                reason: reason.to_string(),
            };

            let (case, observed) = content
                .split_once("->")
                .ok_or_else(|| malformed("missing '->'"))?;
            let mut case_tokens = case.split_whitespace();
            let mnemonic = case_tokens.next().ok_or_else(|| malformed("missing mnemonic"))?;
            let descriptor = table.get(mnemonic).ok_or_else(|| ReplayError::UnknownInstruction {
                line,
                mnemonic: mnemonic.to_string(),
            })?;
            let indices = case_tokens
                .next()
                .and_then(parse_indices)
                .ok_or_else(|| malformed("bad operand indices"))?;
            if case_tokens.next().is_some() || indices.len() != descriptor.arity() {
                return Err(malformed("operand count does not match instruction arity").into());
            }

            let mut observed_tokens = observed.split_whitespace();
            let bits = observed_tokens
                .next()
                .and_then(parse_hex)
                .ok_or_else(|| malformed("bad result value"))?;
            if bits & !descriptor.result.full_mask() != 0 {
                return Err(malformed("result value wider than the result type").into());
            }
            let flags = match observed_tokens.next() {
                None => None,
                Some(token) => {
                    let raw_flags = token
                        .strip_prefix("flags=")
                        .and_then(parse_hex)
                        .and_then(|f| u32::try_from(f).ok())
                        .ok_or_else(|| malformed("bad flags field"))?;
                    Some(Flags::from_bits_truncate(raw_flags))
                }
            };
            if observed_tokens.next().is_some() {
                return Err(malformed("trailing tokens").into());
            }
            match observations.entry((mnemonic.to_string(), indices)) {
                Entry::Occupied(_) => return Err(malformed("duplicate observation").into()),
                Entry::Vacant(slot) => {
                    slot.insert(Recorded { bits, flags });
                }
            }
        }
        log::info!("replay: loaded {} observations", observations.len());
        Ok(Self {
            observations,
            last_flags: None,
        })
    }

    pub fn from_file(path: impl AsRef<Path>, table: &InstructionTable) -> OracleResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text, table)
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

impl ExecutionAdapter for ReplayAdapter {
    fn name(&self) -> &str {
        "replay"
    }

    fn clear_flags(&mut self) {
        self.last_flags = None;
    }

    fn execute(&mut self, case: &TestCase<'_>) -> Result<Value, AdapterError> {
        let key = (case.mnemonic().to_string(), case.indices.clone());
        let recorded = self
            .observations
            .get(&key)
            .ok_or_else(|| AdapterError::MissingObservation {
                mnemonic: case.mnemonic().to_string(),
                case: IndexList(&case.indices).to_string(),
            })?;
        self.last_flags = recorded.flags;
        Ok(case.descriptor.result.value_from_bits(recorded.bits))
    }

    fn read_flags(&mut self) -> Option<Flags> {
        self.last_flags
    }
}
