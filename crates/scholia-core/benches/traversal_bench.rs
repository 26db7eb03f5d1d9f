//! # Traversal Benchmarks
//!
//! Performance benchmarks for scholia-core graph walks over redb.
//!
//! Run with: `cargo bench -p scholia-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use scholia_core::{EntityRole, Id, KnowledgeBase, NamedFields};
use std::hint::black_box;

/// A chain of `size` abstract entities linked by `evolve`, closed into a cycle.
fn create_evolution_cycle(size: usize) -> (KnowledgeBase, Id) {
    let mut kb = KnowledgeBase::in_memory().expect("kb");
    let ids: Vec<Id> = (0..size)
        .map(|i| {
            kb.add_entity(EntityRole::Abstract, NamedFields::new(format!("e{}", i)))
                .expect("entity")
        })
        .collect();
    for pair in ids.windows(2) {
        kb.link_evolution(&pair[0], &pair[1]).expect("link");
    }
    if let (Some(last), Some(first)) = (ids.last(), ids.first()) {
        kb.link_evolution(last, first).expect("close");
    }
    let start = ids[0].clone();
    (kb, start)
}

/// A problem with `size` definitions, each solved by one contribution.
fn create_problem_tree(size: usize) -> (KnowledgeBase, Id) {
    let mut kb = KnowledgeBase::in_memory().expect("kb");
    let problem = kb.add_problem(NamedFields::new("p")).expect("problem");
    for i in 0..size {
        let definition = kb
            .add_definition(&problem, NamedFields::new(format!("d{}", i)))
            .expect("definition");
        kb.add_contribution(&definition, NamedFields::new(format!("c{}", i)))
            .expect("contribution");
    }
    (kb, problem)
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_evolution_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("evolution_chain");

    for size in [10, 100, 1000].iter() {
        let (kb, start) = create_evolution_cycle(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(kb.evolution_chain(&start).expect("chain")));
        });
    }

    group.finish();
}

fn bench_definitions_and_solutions(c: &mut Criterion) {
    let mut group = c.benchmark_group("definitions_and_solutions");

    for size in [10, 100].iter() {
        let (kb, problem) = create_problem_tree(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(kb.definitions_and_solutions(&problem).expect("walk")));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_evolution_chain, bench_definitions_and_solutions);
criterion_main!(benches);
