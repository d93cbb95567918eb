//! Benchmarks for onefile
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::path::{Path, PathBuf};

fn benchmark_queue_operations(c: &mut Criterion) {
    use onefile::walker::{FileQueue, FileTask};
    use std::sync::atomic::AtomicBool;

    c.bench_function("queue_send_recv", |b| {
        let queue = FileQueue::new(10000);
        let receiver = queue.receiver();
        let sender = queue.into_sender();
        let shutdown = AtomicBool::new(false);

        b.iter(|| {
            let task = FileTask::new(PathBuf::from("/test/path/file.txt"));
            sender.send(task, &shutdown).unwrap();
            let received = receiver.try_recv().unwrap();
            black_box(received);
        })
    });
}

fn benchmark_exclusion_checks(c: &mut Criterion) {
    use onefile::PathMatcher;

    let dirs: Vec<PathBuf> = (0..32)
        .map(|i| PathBuf::from(format!("/project/src/module{}/generated", i)))
        .collect();
    let files: Vec<PathBuf> = (0..32)
        .map(|i| PathBuf::from(format!("/project/src/module{}/secret.env", i)))
        .collect();
    let matcher = PathMatcher::new(&dirs, &files);

    c.bench_function("matcher_dir_miss", |b| {
        let candidate = Path::new("/project/src/module7/handlers/deep/nested");
        b.iter(|| black_box(matcher.is_excluded_dir(black_box(candidate))))
    });

    c.bench_function("matcher_dir_hit_descendant", |b| {
        let candidate = Path::new("/project/src/module31/generated/a/b");
        b.iter(|| black_box(matcher.is_excluded_dir(black_box(candidate))))
    });

    c.bench_function("matcher_file", |b| {
        let candidate = Path::new("/project/src/module16/secret.env");
        b.iter(|| black_box(matcher.is_excluded_file(black_box(candidate))))
    });
}

criterion_group!(benches, benchmark_queue_operations, benchmark_exclusion_checks);
criterion_main!(benches);
