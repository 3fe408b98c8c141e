// Criterion benchmark suite: linear engine vs backtracking fallback
//
// Run: cargo bench
// Specific group: cargo bench -- search
// HTML report: target/criterion/report/index.html

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use rbregexp::encodings::{US_ASCII, UTF_8};
use rbregexp::preprocess::{preprocess, ErrorMode};
use rbregexp::prelude::*;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn contexts() -> [(&'static str, RegexpContext); 2] {
    [
        ("linear", RegexpContext::new()),
        (
            "backtrack",
            RegexpContext::builder().use_linear_engine(false).build(),
        ),
    ]
}

fn make_log_line(i: usize) -> String {
    format!(
        "2026-02-{:02} 12:{:02}:{:02} [{}] worker-{} handled request id={} from 10.0.{}.{}\n",
        i % 28 + 1,
        i % 60,
        (i * 7) % 60,
        ["INFO", "WARN", "DEBUG"][i % 3],
        i % 16,
        i * 31,
        i % 256,
        (i * 13) % 256,
    )
}

fn make_log_text(num_lines: usize) -> Vec<u8> {
    (0..num_lines).map(make_log_line).collect::<String>().into_bytes()
}

// ---------------------------------------------------------------------------
// 1. preprocess -- escape rewriting only
// ---------------------------------------------------------------------------

fn bench_preprocess(c: &mut Criterion) {
    let sources: &[(&str, &[u8])] = &[
        ("plain", b"hello (world|there)+"),
        ("hex", br"\x41\x42\x43\x7f"),
        ("unicode", br"caf\u00e9 \u{3042 3044}"),
        ("escapes", br"\d+\.\d+\s*\/\s*\w+"),
    ];
    let mut group = c.benchmark_group("preprocess");
    for (name, src) in sources {
        group.bench_with_input(BenchmarkId::from_parameter(name), src, |b, src| {
            b.iter(|| preprocess(black_box(src), US_ASCII, ErrorMode::Raise));
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// 2. compile -- preprocess, encoding resolution, engine compile
// ---------------------------------------------------------------------------

fn bench_compile(c: &mut Criterion) {
    let patterns: &[(&str, &str)] = &[
        ("literal", "hello world"),
        ("alternation", "alpha|beta|gamma|delta"),
        ("named_capture", r"(?<year>\d{4})-(?<month>\d{2})-(?<day>\d{2})"),
        ("backref", r"(\w+)\s+\1"),
    ];
    let mut group = c.benchmark_group("compile");
    for (name, pat) in patterns {
        group.bench_with_input(BenchmarkId::new("fresh", name), pat, |b, pat| {
            b.iter(|| {
                let ctx = RegexpContext::new();
                black_box(ctx.compile_str(pat, Options::new()).unwrap());
            });
        });
        let ctx = RegexpContext::new();
        let _held = ctx.compile_str(pat, Options::new()).unwrap();
        group.bench_with_input(BenchmarkId::new("interned", name), pat, |b, pat| {
            b.iter(|| black_box(ctx.compile_str(pat, Options::new()).unwrap()));
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// 3. search -- one search per iteration, per engine path
// ---------------------------------------------------------------------------

fn bench_search(c: &mut Criterion) {
    let text = make_log_text(200);
    let patterns: &[(&str, &str)] = &[
        ("literal", "request id=6169"),
        ("class", r"\[WARN\] worker-\d+"),
        ("captures", r"(\d+)\.(\d+)\.(\d+)\.(\d+)"),
        ("no_match", r"worker-\d+ crashed"),
    ];
    let mut group = c.benchmark_group("search");
    for (engine, ctx) in contexts() {
        for (name, pat) in patterns {
            let re = ctx.compile_str(pat, Options::new()).unwrap();
            let req = MatchRequest::new(&text, UTF_8);
            group.bench_function(BenchmarkId::new(engine, name), |b| {
                b.iter(|| black_box(ctx.search(&re, black_box(&req)).unwrap()));
            });
        }
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// 4. lazy groups -- match data without reading groups vs reading all
// ---------------------------------------------------------------------------

fn bench_lazy_groups(c: &mut Criterion) {
    let text = make_log_text(50);
    let ctx = RegexpContext::new();
    let re = ctx
        .compile_str(r"(\d{4})-(\d{2})-(\d{2}) (\d{2}):(\d{2}):(\d{2})", Options::new())
        .unwrap();
    let req = MatchRequest::new(&text, UTF_8);
    let mut group = c.benchmark_group("lazy_groups");
    group.bench_function("whole_match", |b| {
        b.iter(|| {
            let md = ctx.search(&re, &req).unwrap().into_match_data().unwrap();
            black_box(md.bounds(0));
        });
    });
    group.bench_function("all_groups", |b| {
        b.iter(|| {
            let md = ctx.search(&re, &req).unwrap().into_match_data().unwrap();
            black_box(md.to_array().len());
        });
    });
    group.bench_function("bool_only", |b| {
        b.iter(|| black_box(ctx.is_match(&re, &text, UTF_8).unwrap()));
    });
    group.finish();
}

// ---------------------------------------------------------------------------
// 5. find_iter -- scanning a large subject
// ---------------------------------------------------------------------------

fn bench_find_iter(c: &mut Criterion) {
    let text = make_log_text(500);
    let mut group = c.benchmark_group("find_iter");
    for (engine, ctx) in contexts() {
        let re = ctx.compile_str(r"id=(\d+)", Options::new()).unwrap();
        group.bench_function(engine, |b| {
            b.iter(|| black_box(ctx.find_iter(&re, &text, UTF_8).count()));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_preprocess,
    bench_compile,
    bench_search,
    bench_lazy_groups,
    bench_find_iter,
);
criterion_main!(benches);
