//! Resolution Benchmarks
//!
//! Measures fallback fake creation, cached lookups and override scopes.
//!
//! Run with: cargo bench --bench resolve_benchmarks

use armature_autofake::*;
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;

trait Repository: Send + Sync {
    fn count(&self) -> usize;
}

struct RepositoryFake(Fake);

impl Repository for RepositoryFake {
    fn count(&self) -> usize {
        self.0.invoke("count")
    }
}

fakeable!(dyn Repository => RepositoryFake);

struct InMemoryRepository;

impl Repository for InMemoryRepository {
    fn count(&self) -> usize {
        3
    }
}

impl Construct for InMemoryRepository {
    fn construct(_ctx: &mut ResolveContext<'_>) -> Result<Self> {
        Ok(InMemoryRepository)
    }
}

upcast!(InMemoryRepository => dyn Repository);

struct Handler {
    repository: Arc<dyn Repository>,
}

impl Construct for Handler {
    fn construct(ctx: &mut ResolveContext<'_>) -> Result<Self> {
        Ok(Handler {
            repository: ctx.resolve()?,
        })
    }
}

service!(Handler);

// ============================================================================
// Fallback Fakes
// ============================================================================

fn bench_fallback(c: &mut Criterion) {
    let mut group = c.benchmark_group("fallback");

    group.bench_function("first_resolve", |b| {
        b.iter(|| {
            let session = AutoFake::new().unwrap();
            black_box(session.resolve::<dyn Repository>().unwrap().count())
        })
    });

    group.bench_function("cached_resolve", |b| {
        let session = AutoFake::new().unwrap();
        session.resolve::<dyn Repository>().unwrap();
        b.iter(|| black_box(session.resolve::<dyn Repository>().unwrap()))
    });

    group.bench_function("concrete_with_fake_dependency", |b| {
        b.iter(|| {
            let session = AutoFake::new().unwrap();
            black_box(session.resolve::<Handler>().unwrap().repository.count())
        })
    });

    group.finish();
}

// ============================================================================
// Override Scopes
// ============================================================================

fn bench_overrides(c: &mut Criterion) {
    let mut group = c.benchmark_group("overrides");

    for depth in [1usize, 8, 32] {
        group.bench_function(format!("provide_depth_{depth}"), |b| {
            b.iter(|| {
                let mut session = AutoFake::new().unwrap();
                for _ in 0..depth {
                    session.provide::<dyn Repository, InMemoryRepository>().unwrap();
                }
                session.dispose().unwrap();
                black_box(session.is_disposed())
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_fallback, bench_overrides);
criterion_main!(benches);
