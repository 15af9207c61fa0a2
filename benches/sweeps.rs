use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use numbat::{record, record_multi};

#[path = "common/mod.rs"]
mod common;
use common::*;

fn bench_record(c: &mut Criterion) {
    let mut group = c.benchmark_group("record");
    for n in [10, 100, 1000] {
        let x = make_input(n);

        group.bench_with_input(BenchmarkId::new("f64_eval", n), &x, |b, x| {
            b.iter(|| black_box(rosenbrock_f64(black_box(x))))
        });

        group.bench_with_input(BenchmarkId::new("rosenbrock", n), &x, |b, x| {
            b.iter(|| black_box(record(|v| rosenbrock(v), black_box(x)).unwrap()))
        });

        group.bench_with_input(BenchmarkId::new("nn_layer", n), &x, |b, x| {
            b.iter(|| black_box(record(|v| nn_layer(v), black_box(x)).unwrap()))
        });
    }
    group.finish();
}

fn bench_forward_zero(c: &mut Criterion) {
    let mut group = c.benchmark_group("forward_zero");
    for n in [10, 100, 1000] {
        let x = make_input(n);
        let mut f = record(|v| rosenbrock(v), &x).unwrap();
        let mut g = record(|v| rastrigin(v), &x).unwrap();

        group.bench_with_input(BenchmarkId::new("rosenbrock", n), &x, |b, x| {
            b.iter(|| black_box(f.forward(0, black_box(x)).unwrap()))
        });

        group.bench_with_input(BenchmarkId::new("rastrigin", n), &x, |b, x| {
            b.iter(|| black_box(g.forward(0, black_box(x)).unwrap()))
        });
    }
    group.finish();
}

fn bench_gradient(c: &mut Criterion) {
    let mut group = c.benchmark_group("gradient");
    for n in [2, 10, 100, 1000] {
        let x = make_input(n);
        let mut f = record(|v| rosenbrock(v), &x).unwrap();

        group.bench_with_input(BenchmarkId::new("rosenbrock_rev", n), &x, |b, x| {
            b.iter(|| {
                f.forward(0, black_box(x)).unwrap();
                black_box(f.reverse(0, &[1.0]).unwrap())
            })
        });

        group.bench_with_input(BenchmarkId::new("rosenbrock_fd", n), &x, |b, x| {
            b.iter(|| black_box(finite_diff_gradient(rosenbrock_f64, x, 1e-7)))
        });
    }
    group.finish();
}

fn bench_hvp(c: &mut Criterion) {
    let mut group = c.benchmark_group("hvp");
    for n in [10, 100, 1000] {
        let x = make_input(n);
        let v = make_direction(n);
        let mut f = record(|v| rastrigin(v), &x).unwrap();

        group.bench_with_input(BenchmarkId::new("rastrigin", n), &x, |b, x| {
            b.iter(|| {
                f.forward(0, black_box(x)).unwrap();
                f.forward(1, black_box(&v)).unwrap();
                black_box(f.reverse(1, &[1.0]).unwrap())
            })
        });
    }
    group.finish();
}

fn bench_taylor_orders(c: &mut Criterion) {
    let mut group = c.benchmark_group("taylor_orders");
    let n = 100;
    let x = make_input(n);
    let v = make_direction(n);
    let mut f = record(|v| nn_layer(v), &x).unwrap();
    for q in [1, 2, 4, 8] {
        let xq = make_taylor_input(&x, &v, q);

        group.bench_with_input(BenchmarkId::new("nn_layer_forward", q), &xq, |b, xq| {
            b.iter(|| black_box(f.forward(q, black_box(xq)).unwrap()))
        });

        group.bench_with_input(BenchmarkId::new("nn_layer_reverse", q), &xq, |b, xq| {
            f.forward(q, xq).unwrap();
            b.iter(|| black_box(f.reverse(q, &[1.0]).unwrap()))
        });
    }
    group.finish();
}

fn bench_jacobian_rows(c: &mut Criterion) {
    let mut group = c.benchmark_group("jacobian_rows");
    for n in [10, 100] {
        let x = make_input(n);
        let mut f = record_multi(|v| pde_poisson_vec(v), &x).unwrap();

        group.bench_with_input(BenchmarkId::new("pde_poisson", n), &x, |b, x| {
            b.iter(|| {
                f.forward(0, black_box(x)).unwrap();
                let mut w = vec![0.0; n];
                let mut rows = Vec::with_capacity(n);
                for i in 0..n {
                    w[i] = 1.0;
                    rows.push(f.reverse(0, &w).unwrap());
                    w[i] = 0.0;
                }
                black_box(rows)
            })
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_record,
    bench_forward_zero,
    bench_gradient,
    bench_hvp,
    bench_taylor_orders,
    bench_jacobian_rows
);
criterion_main!(benches);
