use std::hint::black_box;
use std::thread;

use criterion::{criterion_group, criterion_main, Criterion};

use keyval::parsers::{infer_value, LogfmtParser};
use keyval::{FieldMap, LineProcessor, ParserConfig, TimestampResolver};

const SHORT_LINE: &str = "level=info status=200 cached=true";
const LONG_LINE: &str = r#"time=2024-01-15T10:30:00Z level=info method=GET path=/api/v1/users status=200 duration=12.5 bytes=5120 user_agent="Mozilla/5.0 (X11; Linux x86_64)" request_id=3f2a9c cached=false"#;
const ESCAPED_LINE: &str = r#"msg="quoted \"value\" with\ttab" level=warn err="connection échouée""#;

fn fixed_resolver() -> std::sync::Arc<dyn TimestampResolver> {
    let ts = chrono::DateTime::from_timestamp(1_700_000_000, 0).unwrap_or_default();
    std::sync::Arc::new(move |_: &FieldMap, _: Option<&str>, _: Option<&str>| ts)
}

fn bench_tokenize_short(c: &mut Criterion) {
    let parser = LogfmtParser::new();
    c.bench_function("tokenize_short", |b| {
        b.iter(|| {
            black_box(parser.parse_line(black_box(SHORT_LINE)).ok());
        });
    });
}

fn bench_tokenize_long(c: &mut Criterion) {
    let parser = LogfmtParser::new();
    c.bench_function("tokenize_long", |b| {
        b.iter(|| {
            black_box(parser.parse_line(black_box(LONG_LINE)).ok());
        });
    });
}

fn bench_tokenize_escaped(c: &mut Criterion) {
    let parser = LogfmtParser::new();
    c.bench_function("tokenize_escaped", |b| {
        b.iter(|| {
            black_box(parser.parse_line(black_box(ESCAPED_LINE)).ok());
        });
    });
}

fn bench_infer_value(c: &mut Criterion) {
    let values = ["200", "12.5", "true", "GET", "/api/v1/users", ""];
    c.bench_function("infer_value_mixed", |b| {
        b.iter(|| {
            for value in &values {
                black_box(infer_value(black_box(value)));
            }
        });
    });
}

fn bench_process_line(c: &mut Criterion) {
    let processor = match LineProcessor::new(&ParserConfig {
        filter_regex: Some("level=".to_string()),
        ..Default::default()
    }) {
        Ok(processor) => processor.with_resolver(fixed_resolver()),
        Err(e) => panic!("benchmark config is invalid: {}", e),
    };
    c.bench_function("process_line_filtered", |b| {
        b.iter(|| {
            black_box(processor.process(black_box(LONG_LINE)).ok());
        });
    });
}

fn bench_process_line_default_resolver(c: &mut Criterion) {
    let processor = match LineProcessor::new(&ParserConfig::default()) {
        Ok(processor) => processor,
        Err(e) => panic!("benchmark config is invalid: {}", e),
    };
    c.bench_function("process_line_well_known_time", |b| {
        b.iter(|| {
            black_box(processor.process(black_box(LONG_LINE)).ok());
        });
    });
}

fn bench_process_parallel(c: &mut Criterion) {
    let processor = match LineProcessor::new(&ParserConfig::default()) {
        Ok(processor) => processor.with_resolver(fixed_resolver()),
        Err(e) => panic!("benchmark config is invalid: {}", e),
    };
    c.bench_function("process_line_parallel", |b| {
        b.iter(|| {
            thread::scope(|scope| {
                for _ in 0..4 {
                    scope.spawn(|| {
                        for _ in 0..32 {
                            black_box(processor.process(LONG_LINE).ok());
                        }
                    });
                }
            });
        });
    });
}

criterion_group!(
    tokenize_benches,
    bench_tokenize_short,
    bench_tokenize_long,
    bench_tokenize_escaped,
    bench_infer_value,
    bench_process_line,
    bench_process_line_default_resolver,
    bench_process_parallel
);
criterion_main!(tokenize_benches);
