// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the page-selection engine: range parsing, plan
// composition, and assembling a plan into a PDF.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use lopdf::{Dictionary, Document, Object, Stream};

use pagewerk_document::pages::{PageTarget, Rotation, Transform};
use pagewerk_document::pdf::assemble;
use pagewerk_document::{OutputPlan, PdfReader, ResolvedPageSet};

/// A `pages`-page PDF with one tiny content stream per page.
fn synthetic_pdf(pages: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let kids: Vec<Object> = (0..pages)
        .map(|_| {
            let content =
                doc.add_object(Stream::new(Dictionary::new(), b"0 0 m 10 10 l S".to_vec()));
            let page = doc.add_object(Dictionary::from_iter([
                ("Type", Object::Name(b"Page".to_vec())),
                ("Parent", Object::Reference(pages_id)),
                ("Contents", Object::Reference(content)),
                (
                    "MediaBox",
                    Object::Array(vec![0.into(), 0.into(), 612.into(), 792.into()]),
                ),
            ]));
            Object::Reference(page)
        })
        .collect();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(Dictionary::from_iter([
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Count", Object::Integer(pages as i64)),
            ("Kids", Object::Array(kids)),
        ])),
    );
    let catalog = doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog));

    let mut out = Vec::new();
    doc.save_to(&mut out).expect("save synthetic PDF");
    out
}

fn bench_range_parsing(c: &mut Criterion) {
    let expression = "1,3-5,7,10-200,250,300-320,999";
    c.bench_function("parse range expression", |b| {
        b.iter(|| ResolvedPageSet::parse(black_box(expression)).expect("valid"));
    });
}

fn bench_composition(c: &mut Criterion) {
    let selection = ResolvedPageSet::parse("2-900").expect("valid");
    let rotate = Transform::Rotate(Rotation::new(90).expect("angle"));
    let target = PageTarget::parse("1-500").expect("valid");

    c.bench_function("compose remove (1000 pages)", |b| {
        b.iter(|| OutputPlan::remove(black_box(1000), &selection).expect("plan"));
    });
    c.bench_function("compose rotate subset (1000 pages)", |b| {
        b.iter(|| OutputPlan::transform(black_box(1000), &target, rotate.clone()).expect("plan"));
    });
}

fn bench_assembly(c: &mut Criterion) {
    let source = PdfReader::from_bytes(&synthetic_pdf(50)).expect("fixture");
    let plan = OutputPlan::organize(50, &(0..50).rev().collect::<Vec<i64>>()).expect("plan");

    c.bench_function("assemble reversed 50-page PDF", |b| {
        b.iter(|| assemble(black_box(&plan), &[&source]).expect("assemble"));
    });
}

criterion_group!(benches, bench_range_parsing, bench_composition, bench_assembly);
criterion_main!(benches);
