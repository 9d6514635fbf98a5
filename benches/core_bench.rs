//! Benchmarks for frago core operations.
//!
//! Run with: cargo bench
//!
//! Results include 95% confidence intervals via Criterion.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use frago::core::metadata::{parse_descriptor, validate_metadata};
use frago::core::params::validate_params;
use frago::core::registry::{Registry, SearchRoot};
use frago::core::types::RecipeSource;

const DESCRIPTOR: &str = r#"---
name: extract_table
type: atomic
runtime: chrome-js
version: "1.2.0"
description: "Extract a data table from the current page"
use_cases:
  - "Scrape pricing tables"
  - "Export search results"
tags: [scrape, table]
output_targets: [stdout, file, clipboard]
inputs:
  selector:
    type: string
    required: true
    description: CSS selector of the table
  limit:
    type: number
    default: 100
  columns:
    type: array
outputs:
  rows: array
  count: number
---
# extract_table

Reads every row of the matched table.
"#;

fn bench_descriptor_parse(c: &mut Criterion) {
    c.bench_function("descriptor_parse", |b| {
        b.iter(|| {
            let d = parse_descriptor(black_box(DESCRIPTOR)).unwrap();
            black_box(d);
        });
    });
}

fn bench_metadata_validate(c: &mut Criterion) {
    let descriptor = parse_descriptor(DESCRIPTOR).unwrap();
    c.bench_function("metadata_validate", |b| {
        b.iter(|| {
            let m = validate_metadata(black_box(&descriptor.metadata)).unwrap();
            black_box(m);
        });
    });
}

fn bench_param_validate(c: &mut Criterion) {
    let descriptor = parse_descriptor(DESCRIPTOR).unwrap();
    let metadata = validate_metadata(&descriptor.metadata).unwrap();
    let params = serde_json::json!({
        "selector": "table.prices",
        "limit": "25",
        "columns": "[\"name\", \"price\"]",
    });
    let params = params.as_object().unwrap().clone();

    c.bench_function("param_validate", |b| {
        b.iter(|| {
            let p = validate_params(black_box(&metadata), black_box(&params)).unwrap();
            black_box(p);
        });
    });
}

fn bench_registry_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry_scan");
    for count in [10, 100, 500] {
        let dir = tempfile::tempdir().unwrap();
        let chrome = dir.path().join("atomic/chrome");
        std::fs::create_dir_all(&chrome).unwrap();
        for i in 0..count {
            let name = format!("recipe_{i:04}");
            std::fs::write(chrome.join(format!("{name}.js")), "document.title").unwrap();
            std::fs::write(
                chrome.join(format!("{name}.md")),
                DESCRIPTOR.replacen("extract_table", &name, 2),
            )
            .unwrap();
        }
        let roots = vec![SearchRoot::new(dir.path(), RecipeSource::Project)];

        group.bench_with_input(BenchmarkId::from_parameter(count), &roots, |b, roots| {
            b.iter(|| {
                let registry = Registry::scanned(black_box(roots.clone()));
                assert_eq!(registry.len(), count);
                black_box(registry);
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_descriptor_parse,
    bench_metadata_validate,
    bench_param_validate,
    bench_registry_scan,
);
criterion_main!(benches);
