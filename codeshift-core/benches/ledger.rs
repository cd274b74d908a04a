//! Benchmark for change ledger throughput.

use codeshift_core::{ChangeLedger, CrosswalkRow, LabelTable, Reconciliation};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

const UNDEF: &str = "UNDEF";

/// Synthetic release pair mixing unchanged codes, replacements, splits,
/// merges, additions and deletions.
fn synthetic_release(size: usize) -> (Vec<CrosswalkRow>, LabelTable, LabelTable) {
    let tokens = vec!["undef".to_string()];
    let mut old = LabelTable::default();
    let mut new = LabelTable::default();
    old.insert(UNDEF, "undefined", &tokens);
    new.insert(UNDEF, "undefined", &tokens);

    let mut rows = Vec::with_capacity(size * 2);
    for i in 0..size {
        let o = format!("O{i}");
        let n = format!("N{i}");
        old.insert(&o, &format!("old label {i}"), &tokens);
        new.insert(&n, &format!("new label {}", i / 3), &tokens);

        match i % 6 {
            0 => rows.push(CrosswalkRow::new(o.clone(), o)),
            1 => rows.push(CrosswalkRow::new(o, n)),
            2 => {
                rows.push(CrosswalkRow::new(o.clone(), n));
                rows.push(CrosswalkRow::new(o, format!("S{i}")));
            }
            3 => {
                rows.push(CrosswalkRow::new(o, n.clone()));
                rows.push(CrosswalkRow::new(format!("M{i}"), n));
            }
            4 => rows.push(CrosswalkRow::new(UNDEF, n)),
            _ => rows.push(CrosswalkRow::new(o, UNDEF)),
        }
    }
    (rows, old, new)
}

fn bench_ledger_apply(c: &mut Criterion) {
    let (rows, old, new) = synthetic_release(10_000);

    c.bench_function("ledger_apply_10k_rows", |b| {
        b.iter(|| {
            let mut ledger = ChangeLedger::for_tables(&old, &new);
            ledger.apply_all(black_box(&rows), &old, &new);
            black_box(ledger.len())
        })
    });
}

fn bench_classify(c: &mut Criterion) {
    let (rows, old, new) = synthetic_release(10_000);
    let mut ledger = ChangeLedger::for_tables(&old, &new);
    ledger.apply_all(&rows, &old, &new);
    let records = ledger.into_records();

    c.bench_function("classify_10k_rows", |b| {
        b.iter(|| {
            let result = Reconciliation::from_records(black_box(records.clone()));
            black_box(result.map(|r| r.record_count()).unwrap_or_default())
        })
    });
}

criterion_group!(benches, bench_ledger_apply, bench_classify);
criterion_main!(benches);
