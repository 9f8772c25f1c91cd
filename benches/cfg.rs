use criterion::{criterion_group, criterion_main, BatchSize, Criterion};

use classflow::prelude::*;

/// Builds a method that is a chain of `diamonds` if/else diamonds over one local.
fn diamond_chain(diamonds: u32) -> MethodBody {
    let mut ops: Vec<(u8, Payload)> = Vec::new();
    for _ in 0..diamonds {
        let base = ops.len() as u32;
        ops.push((opcode::ILOAD_0, Payload::None));
        ops.push((opcode::IFEQ, Payload::Jump { target: base + 5 }));
        ops.push((opcode::ICONST_1, Payload::None));
        ops.push((opcode::ISTORE_0, Payload::None));
        ops.push((opcode::GOTO, Payload::Jump { target: base + 7 }));
        ops.push((opcode::ICONST_2, Payload::None));
        ops.push((opcode::ISTORE_0, Payload::None));
        ops.push((opcode::NOP, Payload::None));
    }
    ops.push((opcode::RETURN, Payload::None));

    let insns: Vec<Instruction> = ops
        .into_iter()
        .enumerate()
        .map(|(i, (op, payload))| Instruction::new("Bench", "chain", i as u32, i as u32, op, payload))
        .collect();
    MethodBody::new("Bench", "chain", "(I)V", AccessFlags::ACC_STATIC, 1, insns, vec![]).unwrap()
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("method_analysis");
    for diamonds in [8u32, 64, 256] {
        let body = diamond_chain(diamonds);
        group.bench_function(format!("analyze_{}_diamonds", diamonds), |b| {
            b.iter_batched(
                || body.clone(),
                |body| MethodAnalysis::analyze(body).unwrap(),
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_dependencies(c: &mut Criterion) {
    let body = diamond_chain(64);
    let analysis = MethodAnalysis::analyze(body).unwrap();
    c.bench_function("dependency_queries", |b| {
        b.iter(|| {
            let mut total = 0usize;
            for index in 0..analysis.body().len() as u32 {
                total += analysis.operands(index).len();
            }
            total
        });
    });
}

criterion_group!(benches, bench_pipeline, bench_dependencies);
criterion_main!(benches);
