//! 文本报告
//!
//! 三种模式：
//! - `summary`：输出逐指令统计、完整的不符列表与总计
//! - `verbose`：另外输出每个非 PASS 用例（超过上限后截断）
//! - `dump`：输出每个观测值，格式可被 [`ReplayAdapter`](crate::adapter::ReplayAdapter) 读回

use crate::case::IndexList;
use crate::compare::Verdict;
use crate::summary::{CaseRecord, MismatchRecord, RunSummary};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use vm_error::OracleResult;

/// 接收按描述符顺序到达的用例结果
pub trait CaseSink {
    /// 是否需要 PASS 用例；返回 `false` 时并行模式不缓存它们
    fn wants_passes(&self) -> bool {
        false
    }

    fn record(&mut self, record: &CaseRecord<'_>) -> OracleResult<()>;
}

/// 丢弃所有记录
#[derive(Debug, Default)]
pub struct NullSink;

impl CaseSink for NullSink {
    fn record(&mut self, _record: &CaseRecord<'_>) -> OracleResult<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportMode {
    #[default]
    Summary,
    Verbose,
    Dump,
}

impl std::str::FromStr for ReportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "summary" => Ok(ReportMode::Summary),
            "verbose" => Ok(ReportMode::Verbose),
            "dump" => Ok(ReportMode::Dump),
            other => Err(format!("unknown report mode: {other}")),
        }
    }
}

pub struct Reporter<W: Write> {
    out: W,
    mode: ReportMode,
    max_lines: usize,
    printed: usize,
    truncated: u64,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W, mode: ReportMode, max_lines: usize) -> Self {
        Self {
            out,
            mode,
            max_lines,
            printed: 0,
            truncated: 0,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// `mnemonic [ii],[jj] (ops) expected X F observed Y G delta D`
    fn write_case(&mut self, record: &CaseRecord<'_>) -> OracleResult<()> {
        let operands: Vec<String> = record.operands.iter().map(ToString::to_string).collect();
        write!(
            self.out,
            "{:<11} {} {} ({})",
            record.verdict.label(),
            record.descriptor.mnemonic,
            IndexList(&record.indices),
            operands.join(", ")
        )?;
        match &record.verdict {
            Verdict::Mismatch(detail) => {
                let observed_flags = detail
                    .observed_flags
                    .map_or_else(|| "?".to_string(), |f| f.to_string());
                write!(
                    self.out,
                    " expected {} {} observed {} {}",
                    detail.expected, detail.expected_flags, detail.observed, observed_flags
                )?;
                if !detail.flag_delta.is_empty() {
                    write!(self.out, " delta {}", detail.flag_delta)?;
                }
                if let Some(ulps) = detail.ulp_distance {
                    write!(self.out, " ulps {}", ulps)?;
                }
            }
            Verdict::Unsupported(reason) => write!(self.out, " {}", reason)?,
            Verdict::Pass => {}
        }
        writeln!(self.out)?;
        Ok(())
    }

    /// 汇总中的不符记录，格式与 verbose 行相同
    fn write_mismatch(&mut self, mismatch: &MismatchRecord) -> OracleResult<()> {
        write!(
            self.out,
            "{:<11} {} {} ({}) expected {} {} observed {} {}",
            "MISMATCH",
            mismatch.mnemonic,
            IndexList(&mismatch.indices),
            mismatch.operands.join(", "),
            mismatch.expected,
            mismatch.expected_flags,
            mismatch.observed,
            mismatch.observed_flags.as_deref().unwrap_or("?")
        )?;
        if mismatch.flag_delta != "-" {
            write!(self.out, " delta {}", mismatch.flag_delta)?;
        }
        if let Some(ulps) = mismatch.ulp_distance {
            write!(self.out, " ulps {}", ulps)?;
        }
        writeln!(self.out)?;
        Ok(())
    }

    /// dump 行，与回放格式一致
    fn write_dump(&mut self, record: &CaseRecord<'_>) -> OracleResult<()> {
        let Some(observation) = record.observation else {
            return Ok(());
        };
        write!(
            self.out,
            "{} {} -> 0x{:x}",
            record.descriptor.mnemonic,
            IndexList(&record.indices),
            observation.value.bits()
        )?;
        if let Some(flags) = observation.flags {
            write!(self.out, " flags=0x{:08x}", flags.bits())?;
        }
        writeln!(self.out)?;
        Ok(())
    }

    /// 逐指令统计与总计
    pub fn finish(&mut self, summary: &RunSummary) -> OracleResult<()> {
        if self.truncated > 0 {
            writeln!(self.out, "... {} more non-passing cases not shown", self.truncated)?;
        }
        if self.mode == ReportMode::Dump {
            self.out.flush()?;
            return Ok(());
        }
        writeln!(self.out, "adapter: {}", summary.adapter)?;
        writeln!(
            self.out,
            "{:<12} {:<16} {:>8} {:>8} {:>9} {:>12}",
            "instruction", "group", "cases", "pass", "mismatch", "unsupported"
        )?;
        for stats in &summary.instructions {
            writeln!(
                self.out,
                "{:<12} {:<16} {:>8} {:>8} {:>9} {:>12}",
                stats.mnemonic,
                stats.group.to_string(),
                stats.cases,
                stats.passed,
                stats.mismatched,
                stats.unsupported
            )?;
        }
        if self.mode == ReportMode::Summary {
            for mismatch in &summary.mismatches {
                self.write_mismatch(mismatch)?;
            }
        }
        for unsupported in &summary.unsupported_cases {
            writeln!(
                self.out,
                "unsupported: {} ({} cases): {}",
                unsupported.mnemonic, unsupported.cases, unsupported.reason
            )?;
        }
        writeln!(
            self.out,
            "total {} pass {} mismatch {} unsupported {}",
            summary.total, summary.passed, summary.mismatched, summary.unsupported
        )?;
        self.out.flush()?;
        Ok(())
    }
}

impl<W: Write> CaseSink for Reporter<W> {
    fn wants_passes(&self) -> bool {
        self.mode == ReportMode::Dump
    }

    fn record(&mut self, record: &CaseRecord<'_>) -> OracleResult<()> {
        match self.mode {
            ReportMode::Summary => Ok(()),
            ReportMode::Dump => self.write_dump(record),
            ReportMode::Verbose => {
                if record.verdict.is_pass() {
                    return Ok(());
                }
                if self.printed >= self.max_lines {
                    if self.truncated == 0 {
                        log::warn!("report truncated after {} lines", self.max_lines);
                    }
                    self.truncated += 1;
                    return Ok(());
                }
                self.printed += 1;
                self.write_case(record)
            }
        }
    }
}

/// 把汇总写成 JSON 文件
pub fn write_json_summary(summary: &RunSummary, path: impl AsRef<Path>) -> OracleResult<()> {
    let json = summary.to_json().map_err(|e| vm_error::OracleError::Io {
        message: format!("JSON serialization error: {}", e),
    })?;
    std::fs::write(path, json)?;
    Ok(())
}
