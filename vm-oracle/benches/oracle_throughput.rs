//! 引擎吞吐基准：每个分组用参考模型回环跑完全部用例

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use vm_fpu::vector::VectorMode;
use vm_oracle::adapter::ModelAdapter;
use vm_oracle::compare::Comparator;
use vm_oracle::corpus::OperandCorpus;
use vm_oracle::descriptor::InstructionGroup;
use vm_oracle::engine::OracleEngine;
use vm_oracle::report::NullSink;
use vm_oracle::table::{TableOptions, standard_table};

fn bench_groups(c: &mut Criterion) {
    let corpus = OperandCorpus::standard();
    let table = standard_table(corpus, &TableOptions::new(corpus, VectorMode::JAVA))
        .expect("standard table");
    let engine = OracleEngine::new(corpus, Comparator::default());

    let mut group = c.benchmark_group("oracle_groups");
    group.sample_size(10);
    for kind in [
        InstructionGroup::Fpu,
        InstructionGroup::IntegerLogical,
        InstructionGroup::VectorPermute,
    ] {
        let selection = table.select(&[], &[kind], &[]).expect("known group");
        let cases = engine
            .run(&mut ModelAdapter::new(), &selection, &mut NullSink)
            .expect("model run")
            .total;
        group.throughput(Throughput::Elements(cases));
        group.bench_with_input(BenchmarkId::from_parameter(kind), &selection, |b, selection| {
            b.iter(|| {
                let summary = engine
                    .run(&mut ModelAdapter::new(), black_box(selection), &mut NullSink)
                    .expect("model run");
                black_box(summary.passed)
            });
        });
    }
    group.finish();
}

fn bench_workers(c: &mut Criterion) {
    let corpus = OperandCorpus::standard();
    let table = standard_table(corpus, &TableOptions::new(corpus, VectorMode::JAVA))
        .expect("standard table");
    let selection = table.select(&[], &[InstructionGroup::Fpu], &[]).expect("known group");

    let mut group = c.benchmark_group("oracle_workers");
    group.sample_size(10);
    for workers in [1usize, 2, 4] {
        let engine = OracleEngine::new(corpus, Comparator::default()).with_workers(workers);
        group.bench_with_input(BenchmarkId::from_parameter(workers), &workers, |b, _| {
            b.iter(|| {
                engine
                    .run(&mut ModelAdapter::new(), &selection, &mut NullSink)
                    .expect("model run")
                    .total
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_groups, bench_workers);
criterion_main!(benches);
