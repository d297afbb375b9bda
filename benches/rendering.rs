use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use std::path::Path;

use invoice_archiver::search::KeywordExpr;
use invoice_archiver::storage::sanitize_filename;
use invoice_archiver::template::{FileNameFields, FileNameFormat};

fn bench_render(c: &mut Criterion) {
    let fields = FileNameFields {
        date: "2024-01-15".to_string(),
        subject: "Re: クラウドサービス 1月分請求書".to_string(),
        sender: "billing".to_string(),
        original: "invoice_202401".to_string(),
    };
    let format = FileNameFormat::parse("{date}_{sender}_{subject}_{original}");

    c.bench_function("render_detailed_format", |b| {
        b.iter(|| format.render_with_extension(black_box(&fields), Some("pdf")))
    });

    c.bench_function("render_and_sanitize", |b| {
        b.iter(|| {
            let name = format.render_with_extension(black_box(&fields), Some("pdf"));
            sanitize_filename(&name, 150)
        })
    });
}

fn bench_parse_format(c: &mut Criterion) {
    c.bench_function("parse_format_with_unknown_tokens", |b| {
        b.iter(|| FileNameFormat::parse(black_box("{date}_{{subject}_{unknown}_{original")))
    });
    c.bench_function("parse_keyword", |b| {
        b.iter(|| KeywordExpr::parse(black_box("請求書 from:example.com -subject:\"draft copy\"")))
    });
}

fn bench_scan_fixture(c: &mut Criterion) {
    let fixture_path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("invoices.mbox");

    c.bench_function("scan_invoices_mbox", |b| {
        b.iter(|| {
            let parser = invoice_archiver::parser::mbox::MboxParser::new(&fixture_path).unwrap();
            parser
                .scan_headers(&mut |_offset, _length, _headers| true, None)
                .unwrap()
        })
    });
}

criterion_group!(benches, bench_render, bench_parse_format, bench_scan_fixture);
criterion_main!(benches);
