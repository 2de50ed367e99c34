//! Resolution Benchmarks
//!
//! Measures signature compilation, path splitting and full dispatch through small trees.
//!
//! Run with: cargo bench --bench resolve_benchmarks

use arbor_core::*;
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;

fn text(body: &'static str) -> Leaf {
    Endpoint::page(
        Signature::empty(),
        leaf_fn(move |_, _| Box::pin(async move { Ok(Reply::from(body)) })),
    )
}

fn forum(id: i64) -> Result<Arc<dyn Resource>, Error> {
    ResourceTable::builder()
        .leaf("index", text("forum"))
        .leaf(
            "topic",
            Endpoint::page(
                Signature::compile([
                    Parameter::int("topic"),
                    Parameter::keyword("offset").coerce(ScalarType::Int).default(0),
                ])?,
                leaf_fn(move |_, args| {
                    Box::pin(async move {
                        Ok(Reply::text(format!(
                            "{id}/{}/{}",
                            args.int("topic")?,
                            args.int("offset")?
                        )))
                    })
                }),
            ),
        )
        .build()
}

fn site() -> Site {
    let root = ResourceTable::builder()
        .leaf("index", text("home"))
        .leaf("about", text("about"))
        .transition(
            "forum",
            Endpoint::transition(
                Signature::compile([Parameter::int("id")]).unwrap(),
                transition_fn(|_, args| Box::pin(async move { forum(args.int("id")?) })),
            ),
        )
        .leaf(
            "old",
            Endpoint::page(
                Signature::empty(),
                leaf_fn(|_, _| Box::pin(async { Err(Error::rewrite("/about")) })),
            ),
        )
        .build()
        .unwrap();
    Site::new([root])
}

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");

    group.bench_function("compile", |b| {
        b.iter(|| {
            Signature::compile(black_box([
                Parameter::int("a"),
                Parameter::str("b"),
                Parameter::keyword("c").default(1),
                Parameter::var_keyword("rest"),
            ]))
        })
    });

    group.bench_function("path_segments", |b| {
        b.iter(|| path_segments(black_box("/forum/3/topic/7/caf%C3%A9/")))
    });

    group.finish();
}

fn bench_dispatch(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let site = site();
    let mut group = c.benchmark_group("dispatch");

    for (name, uri) in [
        ("index", "/"),
        ("leaf", "/about"),
        ("transition", "/forum/3/topic/7?offset=20"),
        ("path_rewrite", "/old"),
        ("not_found", "/nowhere/at/all"),
    ] {
        group.bench_function(name, |b| {
            b.to_async(&rt)
                .iter(|| async { black_box(site.dispatch(Request::get(uri)).await) })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_compile, bench_dispatch);
criterion_main!(benches);
