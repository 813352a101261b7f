//! 测试引擎：生成用例、计算期望、驱动执行器、比较并记录
//!
//! 每个用例严格按 `evaluate` → `clear_flags` → `execute` → `read_flags` → `compare` 进行。
//! 参考函数失败是致命错误，运行立即结束；执行器失败记为 UNSUPPORTED。
//!
//! 多 worker 时按描述符并行，执行器由互斥锁保护，每个用例持锁完成
//! 清除/执行/读取三步。结果按描述符缓存后按选择顺序重放，
//! 因此汇总与串行运行逐项相同。

use crate::adapter::ExecutionAdapter;
use crate::case::{CaseGenerator, TestCase};
use crate::compare::{Comparator, Verdict};
use crate::corpus::OperandCorpus;
use crate::descriptor::InstructionDescriptor;
use crate::operand::{Observation, Value};
use crate::report::CaseSink;
use crate::summary::{CaseRecord, RunSummary};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use vm_error::{AdapterError, OracleResult, utils};
use vm_fpu::Flags;

type Outcome = (Result<Value, AdapterError>, Option<Flags>);

/// 一条指令在并行模式下缓存的结果
struct Buffered<'d> {
    descriptor: &'d InstructionDescriptor,
    /// 未缓存的 PASS 用例数
    passed: u64,
    records: Vec<CaseRecord<'d>>,
}

/// 持锁期间完成的三步
fn observe<A: ExecutionAdapter + ?Sized>(adapter: &mut A, case: &TestCase<'_>) -> Outcome {
    adapter.clear_flags();
    let value = adapter.execute(case);
    let flags = adapter.read_flags();
    (value, flags)
}

pub struct OracleEngine<'c> {
    corpus: &'c OperandCorpus,
    comparator: Comparator,
    workers: usize,
}

impl<'c> OracleEngine<'c> {
    pub fn new(corpus: &'c OperandCorpus, comparator: Comparator) -> Self {
        Self {
            corpus,
            comparator,
            workers: 1,
        }
    }

    /// worker 数；0 按 1 处理
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// 运行选中的指令
    pub fn run<A: ExecutionAdapter + ?Sized>(
        &self,
        adapter: &mut A,
        selection: &[Arc<InstructionDescriptor>],
        sink: &mut dyn CaseSink,
    ) -> OracleResult<RunSummary> {
        let mut summary = RunSummary::new(adapter.name());
        log::info!(
            "oracle run: {} instructions, adapter {}, {} workers",
            selection.len(),
            adapter.name(),
            self.workers
        );

        if self.workers <= 1 || selection.len() <= 1 {
            for descriptor in selection {
                summary.begin_instruction(descriptor);
                self.process(
                    descriptor,
                    |case| observe(&mut *adapter, case),
                    |record| {
                        summary.record(&record);
                        sink.record(&record)
                    },
                )?;
            }
        } else {
            for buffered in self.run_parallel(adapter, selection, sink.wants_passes())? {
                summary.begin_instruction(buffered.descriptor);
                summary.record_passes(buffered.passed);
                for record in &buffered.records {
                    summary.record(record);
                    sink.record(record)?;
                }
            }
        }

        log::info!(
            "oracle run finished: {} cases, {} pass, {} mismatch, {} unsupported",
            summary.total,
            summary.passed,
            summary.mismatched,
            summary.unsupported
        );
        Ok(summary)
    }

    fn run_parallel<'d, A: ExecutionAdapter + ?Sized>(
        &self,
        adapter: &mut A,
        selection: &'d [Arc<InstructionDescriptor>],
        keep_passes: bool,
    ) -> OracleResult<Vec<Buffered<'d>>> {
        let adapter = Mutex::new(adapter);
        let next = AtomicUsize::new(0);
        let failed = AtomicBool::new(false);
        let slots: Vec<Mutex<Option<OracleResult<Buffered<'d>>>>> =
            selection.iter().map(|_| Mutex::new(None)).collect();

        std::thread::scope(|scope| {
            for _ in 0..self.workers.min(selection.len()) {
                scope.spawn(|| {
                    while !failed.load(Ordering::Relaxed) {
                        let index = next.fetch_add(1, Ordering::Relaxed);
                        let Some(descriptor) = selection.get(index) else {
                            break;
                        };
                        let result = self.buffer(descriptor, &adapter, keep_passes);
                        if result.is_err() {
                            failed.store(true, Ordering::Relaxed);
                        }
                        *slots[index].lock() = Some(result);
                    }
                });
            }
        });

        // 被领取的下标一定有结果；失败后未领取的为 None
        let mut buffered = Vec::with_capacity(selection.len());
        for slot in slots {
            match slot.into_inner() {
                Some(Ok(result)) => buffered.push(result),
                Some(Err(e)) => return Err(e),
                None => {}
            }
        }
        Ok(buffered)
    }

    fn buffer<'d, A: ExecutionAdapter + ?Sized>(
        &self,
        descriptor: &'d InstructionDescriptor,
        adapter: &Mutex<&mut A>,
        keep_passes: bool,
    ) -> OracleResult<Buffered<'d>> {
        let mut passed = 0;
        let mut records = Vec::new();
        self.process(
            descriptor,
            |case| {
                let mut guard = adapter.lock();
                observe(&mut **guard, case)
            },
            |record| {
                if record.verdict.is_pass() && !keep_passes {
                    passed += 1;
                } else {
                    records.push(record);
                }
                Ok(())
            },
        )?;
        Ok(Buffered {
            descriptor,
            passed,
            records,
        })
    }

    /// 逐个用例处理一条指令
    fn process<'d>(
        &self,
        descriptor: &'d InstructionDescriptor,
        mut observe: impl FnMut(&TestCase<'_>) -> Outcome,
        mut emit: impl FnMut(CaseRecord<'d>) -> OracleResult<()>,
    ) -> OracleResult<()> {
        let generator = CaseGenerator::new(descriptor, self.corpus)
            .inspect_err(|e| utils::log_error(e, "oracle engine"))?;
        log::debug!("{}: {} cases", descriptor.mnemonic, generator.case_count());
        let mut warned = false;

        for case in generator {
            let expected = descriptor
                .evaluate(&case.operands)
                .inspect_err(|e| utils::log_error(e, "oracle engine"))?;
            let (value, flags) = observe(&case);
            let (observation, verdict) = match value {
                Ok(value) => {
                    let observation = Observation { value, flags };
                    let verdict = self.comparator.compare(descriptor, &expected, &observation);
                    (Some(observation), verdict)
                }
                Err(e) => {
                    if !warned {
                        log::warn!("{}: {}", descriptor.mnemonic, e);
                        warned = true;
                    }
                    (None, Verdict::Unsupported(e.to_string()))
                }
            };
            emit(CaseRecord {
                descriptor,
                indices: case.indices,
                operands: case.operands,
                expected,
                observation,
                verdict,
            })?;
        }
        Ok(())
    }
}
