//! vm-oracle - PowerPC FPU / 整数逻辑 / AltiVec 指令的黄金值校验
//!
//! 对每条登记的指令，在固定语料的笛卡尔积上计算参考结果与状态副作用，
//! 交给执行器执行，并逐用例给出 PASS / MISMATCH / UNSUPPORTED 判定。
//!
//! ## 组成
//! - [`corpus`]：每种操作数类型的有序取值
//! - [`descriptor`] 与 [`table`]：指令描述符及标准指令表
//! - [`case`]：惰性的用例生成
//! - [`adapter`]：被测执行单元（参考模型回环、宿主、回放）
//! - [`engine`]：驱动执行并收集结果
//! - [`compare`]、[`summary`]、[`report`]：判定、汇总与输出
//!
//! ## 示例
//!
//! ```rust,ignore
//! use vm_oracle::{OracleConfig, run_with_config};
//!
//! let config = OracleConfig::from_toml("[selection]\ngroups = [\"fpu\"]")?;
//! let summary = run_with_config(&config, std::io::stdout())?;
//! assert!(summary.is_clean());
//! ```

pub mod adapter;
pub mod case;
pub mod compare;
pub mod config;
pub mod corpus;
pub mod descriptor;
pub mod engine;
pub mod operand;
pub mod report;
pub mod summary;
pub mod table;

pub use adapter::{ExecutionAdapter, HostAdapter, ModelAdapter, ReplayAdapter};
pub use case::{CaseGenerator, TestCase};
pub use compare::{Comparator, CompareOptions, Verdict};
pub use config::{AdapterKind, OracleConfig};
pub use corpus::{CorpusOptions, OperandCorpus};
pub use descriptor::{InstructionDescriptor, InstructionGroup, InstructionTable, NanPolicy, Tolerance};
pub use engine::OracleEngine;
pub use operand::{Expected, Observation, SemanticType, Value};
pub use report::{CaseSink, ReportMode, Reporter};
pub use summary::RunSummary;
pub use table::{TableOptions, standard_table};

use std::io::Write;
use vm_error::{OracleError, OracleResult};

/// 按配置构造执行器
pub fn build_adapter(
    config: &OracleConfig,
    table: &InstructionTable,
) -> OracleResult<Box<dyn ExecutionAdapter>> {
    let adapter: Box<dyn ExecutionAdapter> = match config.adapter.kind {
        AdapterKind::Model => Box::new(ModelAdapter::new()),
        AdapterKind::Host => Box::new(HostAdapter::new()),
        AdapterKind::Replay => {
            let path = config.adapter.replay_path.as_ref().ok_or_else(|| {
                OracleError::from(vm_error::ConfigError::InvalidValue(
                    "adapter.replay_path".to_string(),
                    "missing".to_string(),
                ))
            })?;
            Box::new(ReplayAdapter::from_file(path, table)?)
        }
    };
    Ok(adapter)
}

/// 完整运行一次：构建语料与指令表、选择指令、执行、输出报告
pub fn run_with_config<W: Write>(config: &OracleConfig, out: W) -> OracleResult<RunSummary> {
    config.validate()?;
    let corpus = OperandCorpus::build(&config.corpus);
    let table = standard_table(&corpus, &TableOptions::new(&corpus, config.vector.mode()))?;
    let selection = config.select(&table)?;
    let mut adapter = build_adapter(config, &table)?;

    let engine = OracleEngine::new(&corpus, Comparator::new(config.compare))
        .with_workers(config.engine.workers);
    let mut reporter = Reporter::new(out, config.report.mode, config.report.max_mismatch_lines);
    let summary = engine.run(&mut adapter, &selection, &mut reporter)?;
    reporter.finish(&summary)?;

    if let Some(path) = &config.report.json_summary {
        report::write_json_summary(&summary, path)?;
    }
    Ok(summary)
}
