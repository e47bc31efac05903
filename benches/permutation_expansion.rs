use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use permuter::domain::models::{FlavorLevel, RuleDocument};
use permuter::services::PermutationEngine;

fn docs(prefix: &str, count: usize) -> Vec<RuleDocument> {
    (0..count)
        .map(|i| RuleDocument::new(format!("{prefix}_{i}.md"), format!("{prefix} body {i}\n").repeat(8)))
        .collect()
}

fn bench_expand(c: &mut Criterion) {
    let engine = PermutationEngine::new();
    let common = RuleDocument::new("common.md", "Be kind.\n".repeat(20));
    let mut group = c.benchmark_group("expand");

    for flavors_per_level in [2usize, 4, 8] {
        let rules = docs("rule", 4);
        let levels: Vec<FlavorLevel> = (1..=3)
            .map(|level| FlavorLevel::new(level, docs(&format!("flavor{level}"), flavors_per_level)))
            .collect();

        group.bench_with_input(
            BenchmarkId::from_parameter(flavors_per_level),
            &levels,
            |b, levels| {
                b.iter(|| {
                    engine
                        .expand(Some(black_box(&common)), black_box(&rules), black_box(levels))
                        .map(|e| e.permutations.len())
                });
            },
        );
    }
    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let engine = PermutationEngine::new();
    let common = RuleDocument::new("common.md", "Be kind.\n");
    let levels: Vec<FlavorLevel> = (1..=3).map(|level| FlavorLevel::new(level, docs("f", 4))).collect();
    let expansion = engine
        .expand(Some(&common), &docs("rule", 4), &levels)
        .unwrap_or_else(|e| panic!("expansion failed: {e}"));

    c.bench_function("render_permutations", |b| {
        b.iter(|| {
            expansion
                .permutations
                .iter()
                .map(|p| engine.render_permutation(black_box(p)).len())
                .sum::<usize>()
        });
    });
}

criterion_group!(benches, bench_expand, bench_render);
criterion_main!(benches);
