use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use memex_core::hypertext;

/// Body with `links` valid links separated by prose and near-miss markup.
fn synthetic_body(links: usize) -> String {
    let mut body = String::new();
    for i in 0..links {
        body.push_str("Some prose with a [stray bracket and ");
        body.push_str(&format!("[topic {i}](doc:{i}) then [broken](doc:x) text.\n"));
    }
    body
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("hypertext.parse");

    for links in [10_usize, 100, 1_000] {
        let body = synthetic_body(links);
        group.throughput(Throughput::Bytes(body.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(links), &body, |b, body| {
            b.iter(|| black_box(hypertext::parse(black_box(body)).len()));
        });
    }

    group.finish();
}

fn bench_locate(c: &mut Criterion) {
    let body = synthetic_body(1_000);
    c.bench_function("hypertext.locate.last", |b| {
        b.iter(|| black_box(hypertext::locate(black_box(&body), "text.\n")));
    });
}

criterion_group!(benches, bench_parse, bench_locate);
criterion_main!(benches);
