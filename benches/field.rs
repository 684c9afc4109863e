use criterion::{black_box, criterion_group, criterion_main, Criterion};

use cronfield::{Field, FieldKind};

fn parse(c: &mut Criterion) {
    c.bench_function("parse wildcard", |b| {
        b.iter(|| Field::parse(FieldKind::Minute, black_box("*")))
    });
    c.bench_function("parse mixed list", |b| {
        b.iter(|| Field::parse(FieldKind::Minute, black_box("0-10/2,15,30-45,59")))
    });
    c.bench_function("parse named range", |b| {
        b.iter(|| Field::parse(FieldKind::Month, black_box("Jan-Jun,October")))
    });
}

fn scan(c: &mut Criterion) {
    let minutes = Field::parse(FieldKind::Minute, "0/5").unwrap();
    c.bench_function("next", |b| b.iter(|| minutes.next(black_box(17))));
    c.bench_function("format", |b| b.iter(|| minutes.to_string()));
}

criterion_group!(benches, parse, scan);
criterion_main!(benches);
