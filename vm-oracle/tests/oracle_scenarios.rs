//! vm-oracle 端到端场景测试
//!
//! 覆盖符号零、饱和、NaN 比较、定点转换、确定性、并行一致性与 dump 回放

use std::sync::Arc;
use vm_error::AdapterError;
use vm_fpu::Flags;
use vm_fpu::compare::CR_UN;
use vm_fpu::vector::VectorMode;
use vm_oracle::adapter::{ExecutionAdapter, HostAdapter, ModelAdapter, ReplayAdapter};
use vm_oracle::compare::{Comparator, Verdict};
use vm_oracle::corpus::{CorpusOptions, OperandCorpus, VectorPattern};
use vm_oracle::descriptor::{InstructionDescriptor, InstructionTable};
use vm_oracle::engine::OracleEngine;
use vm_oracle::operand::{ImmKind, LaneType, Observation, Value};
use vm_oracle::report::{NullSink, ReportMode, Reporter};
use vm_oracle::summary::RunSummary;
use vm_oracle::table::{TableOptions, standard_table};
use vm_oracle::TestCase;
use vm_simd::Vec128;

fn table_for(corpus: &OperandCorpus) -> InstructionTable {
    standard_table(corpus, &TableOptions::new(corpus, VectorMode::JAVA)).expect("standard table")
}

/// 向量语料只保留边界值，整张表可以在测试里跑完
fn small_corpus() -> OperandCorpus {
    OperandCorpus::build(&CorpusOptions {
        extended_values: false,
        vector_patterns: vec![VectorPattern::Boundary],
    })
}

fn pick(table: &InstructionTable, names: &[&str]) -> Vec<Arc<InstructionDescriptor>> {
    let names: Vec<String> = names.iter().map(|n| n.to_string()).collect();
    table.select(&names, &[], &[]).expect("known instructions")
}

fn run<A: ExecutionAdapter + ?Sized>(
    corpus: &OperandCorpus,
    adapter: &mut A,
    selection: &[Arc<InstructionDescriptor>],
    workers: usize,
) -> RunSummary {
    OracleEngine::new(corpus, Comparator::default())
        .with_workers(workers)
        .run(adapter, selection, &mut NullSink)
        .expect("run completes")
}

/// 把 +0 结果报告成 -0 的执行器
struct NegativeZero(ModelAdapter);

impl ExecutionAdapter for NegativeZero {
    fn name(&self) -> &str {
        "negative-zero"
    }

    fn clear_flags(&mut self) {
        self.0.clear_flags()
    }

    fn execute(&mut self, case: &TestCase<'_>) -> Result<Value, AdapterError> {
        match self.0.execute(case)? {
            Value::F32(0) => Ok(Value::F32(0x8000_0000)),
            other => Ok(other),
        }
    }

    fn read_flags(&mut self) -> Option<Flags> {
        self.0.read_flags()
    }
}

// ============================================================================
// 单个用例
// ============================================================================

#[test]
fn test_fadds_opposite_values_need_positive_zero() {
    let corpus = OperandCorpus::standard();
    let table = table_for(corpus);
    let fadds = table.get("fadds").expect("fadds");
    let expected = fadds
        .evaluate(&[Value::from_f32(1.5), Value::from_f32(-1.5)])
        .expect("typed operands");
    assert_eq!(expected.value, Value::F32(0));
    assert!(expected.flags.contains(Flags::FE));

    let comparator = Comparator::default();
    let pass = Observation { value: Value::F32(0), flags: Some(expected.flags) };
    assert_eq!(comparator.compare(fadds, &expected, &pass), Verdict::Pass);
    let wrong = Observation { value: Value::F32(0x8000_0000), flags: Some(expected.flags) };
    let Verdict::Mismatch(detail) = comparator.compare(fadds, &expected, &wrong) else {
        panic!("-0 must not match +0");
    };
    assert!(detail.value_mismatch);
    assert!(detail.flag_delta.is_empty());
}

#[test]
fn test_negative_zero_executor_is_caught_by_engine() {
    let corpus = OperandCorpus::standard();
    let table = table_for(corpus);
    let selection = pick(&table, &["fadds"]);
    let summary = run(corpus, &mut NegativeZero(ModelAdapter::new()), &selection, 1);

    assert!(!summary.is_clean());
    let opposite = summary
        .mismatches
        .iter()
        .find(|m| m.indices == vec![4, 5])
        .expect("1.5 + -1.5 is reported");
    assert_eq!(opposite.expected, "0x00000000");
    assert_eq!(opposite.observed, "0x80000000");
}

#[test]
fn test_vaddsbs_saturates_and_sets_sat() {
    let corpus = OperandCorpus::standard();
    let table = table_for(corpus);
    let a = Value::Vector(LaneType::SignedByte, Vec128::splat(1, 0x7F));
    let b = Value::Vector(LaneType::SignedByte, Vec128::splat(1, 0x01));
    let expected = table
        .get("vaddsbs")
        .expect("vaddsbs")
        .evaluate(&[a, b])
        .expect("typed operands");
    assert_eq!(expected.value, a);
    assert_eq!(expected.flags, Flags::SAT);
}

#[test]
fn test_fcmpu_with_nan_is_unordered() {
    let corpus = OperandCorpus::standard();
    let table = table_for(corpus);
    let expected = table
        .get("fcmpu")
        .expect("fcmpu")
        .evaluate(&[Value::from_f64(f64::NAN), Value::from_f64(1.0)])
        .expect("typed operands");
    assert_eq!(expected.value, Value::Cr(CR_UN));
    assert!(expected.flags.contains(Flags::FU));
    // 静默 NaN 的无序比较不是无效操作
    assert!(!expected.flags.contains(Flags::VXVC));
}

#[test]
fn test_vctsxs_and_vcfsx_round_trip_integers() {
    let corpus = OperandCorpus::standard();
    let table = table_for(corpus);
    let floats = Value::Vector(
        LaneType::Float,
        Vec128::from_words([1.0f32.to_bits(), (-2.0f32).to_bits(), 100.0f32.to_bits(), 0]),
    );
    let scale = Value::Imm(ImmKind::Scale, 0);

    let fixed = table
        .get("vctsxs")
        .expect("vctsxs")
        .evaluate(&[floats, scale])
        .expect("typed operands");
    assert_eq!(fixed.value.bits(), Vec128::from_words([1, (-2i32) as u32, 100, 0]).0);
    assert!(!fixed.flags.contains(Flags::SAT));

    let back = table
        .get("vcfsx")
        .expect("vcfsx")
        .evaluate(&[fixed.value, scale])
        .expect("typed operands");
    assert_eq!(back.value, floats);
}

// ============================================================================
// 整表运行
// ============================================================================

#[test]
fn test_model_adapter_passes_every_case() {
    let corpus = small_corpus();
    let table = table_for(&corpus);
    let selection: Vec<_> = table.iter().cloned().collect();
    let summary = run(&corpus, &mut ModelAdapter::new(), &selection, 1);

    assert_eq!(summary.instructions.len(), table.len());
    assert_eq!(summary.passed, summary.total);
    assert!(summary.unsupported_cases.is_empty());
    assert!(summary.test_cases().iter().all(|c| c.passed));
}

#[test]
fn test_runs_are_deterministic() {
    let corpus = small_corpus();
    let table = table_for(&corpus);
    let selection: Vec<_> = table.iter().cloned().collect();
    let first = run(&corpus, &mut HostAdapter::new(), &selection, 1);
    let second = run(&corpus, &mut HostAdapter::new(), &selection, 1);
    assert_eq!(first, second);
}

#[test]
fn test_parallel_summary_matches_serial() {
    let corpus = small_corpus();
    let table = table_for(&corpus);
    let selection: Vec<_> = table.iter().cloned().collect();
    let serial = run(&corpus, &mut HostAdapter::new(), &selection, 1);
    let parallel = run(&corpus, &mut HostAdapter::new(), &selection, 4);
    assert_eq!(serial, parallel);
    assert!(serial.unsupported > 0);
}

#[test]
fn test_dump_replays_to_a_clean_run() {
    let corpus = OperandCorpus::standard();
    let table = table_for(corpus);
    let selection = pick(&table, &["fadds", "fcmpo", "vaddsbs", "and.", "vctuxs"]);
    let engine = OracleEngine::new(corpus, Comparator::default());

    let mut reporter = Reporter::new(Vec::new(), ReportMode::Dump, 0);
    let recorded = engine
        .run(&mut ModelAdapter::new(), &selection, &mut reporter)
        .expect("model run");
    let dump = String::from_utf8(reporter.into_inner()).expect("utf8 dump");
    assert_eq!(dump.lines().count() as u64, recorded.total);

    let mut replay = ReplayAdapter::parse(&dump, &table).expect("dump parses");
    assert_eq!(replay.len() as u64, recorded.total);
    let replayed = engine
        .run(&mut replay, &selection, &mut NullSink)
        .expect("replay run");
    assert_eq!(replayed.total, recorded.total);
    assert_eq!(replayed.passed, replayed.total);
    assert_eq!(replayed.adapter, "replay");
}

// ============================================================================
// 交换律与减法的反对称
// ============================================================================

#[test]
fn test_commutative_instructions_ignore_operand_order() {
    let corpus = OperandCorpus::standard();
    let table = table_for(corpus);
    for name in ["fadds", "fmul", "and", "xor", "nand", "vaddubm", "vadduws", "vaddsbs", "vavgub", "vmaxsh", "vand"] {
        let descriptor = table.get(name).expect("registered");
        let slice = corpus.slice(descriptor.operands[0]);
        for &a in slice {
            for &b in slice {
                let ab = descriptor.evaluate(&[a, b]).expect("typed operands");
                let ba = descriptor.evaluate(&[b, a]).expect("typed operands");
                assert_eq!(ab, ba, "{} {} {}", name, a, b);
            }
        }
    }
}

#[test]
fn test_modulo_subtraction_is_antisymmetric() {
    let corpus = OperandCorpus::standard();
    let table = table_for(corpus);
    for (sub, add, lane) in [
        ("vsububm", "vaddubm", LaneType::UnsignedByte),
        ("vsubuhm", "vadduhm", LaneType::UnsignedHalf),
        ("vsubuwm", "vadduwm", LaneType::UnsignedWord),
    ] {
        let sub = table.get(sub).expect("registered");
        let add = table.get(add).expect("registered");
        let slice = corpus.slice(vm_oracle::SemanticType::Vector(lane));
        for &a in slice {
            for &b in slice {
                let ab = sub.evaluate(&[a, b]).expect("typed operands").value;
                let ba = sub.evaluate(&[b, a]).expect("typed operands").value;
                let total = add.evaluate(&[ab, ba]).expect("typed operands").value;
                assert_eq!(total, Value::Vector(lane, Vec128::ZERO));
            }
        }
    }
}
