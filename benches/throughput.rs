use criterion::*;
use flowgate::*;
use tokio::runtime::Runtime;

const TEN_THOUSAND: usize = 10000;

fn get_runtime() -> Runtime {
    tokio::runtime::Builder::new_multi_thread().enable_all().build().unwrap()
}

fn bench_buffered_put_take(c: &mut Criterion) {
    let rt = get_runtime();
    let mut group = c.benchmark_group("buffered");
    group.throughput(Throughput::Elements(TEN_THOUSAND as u64));
    for bound in [16usize, 100, 1000] {
        group.bench_with_input(BenchmarkId::new("put_take", bound), &bound, |b, &bound| {
            b.to_async(&rt).iter(|| async move {
                let ch = Channel::bounded(bound).unwrap();
                let tx = ch.clone();
                tokio::spawn(async move {
                    for i in 0..TEN_THOUSAND {
                        let _ = tx.put(i).await;
                    }
                    tx.close();
                });
                let mut count = 0;
                while ch.take().await.is_ok() {
                    count += 1;
                }
                assert_eq!(count, TEN_THOUSAND);
            });
        });
    }
    group.finish();
}

fn bench_pipeline_forward(c: &mut Criterion) {
    let rt = get_runtime();
    let mut group = c.benchmark_group("pipeline");
    group.throughput(Throughput::Elements(TEN_THOUSAND as u64));
    group.bench_function("two_stage_forward", |b| {
        b.to_async(&rt).iter(|| async move {
            let a = Channel::bounded(100).unwrap();
            let z = Channel::bounded(100).unwrap();
            a.pipe(&z);
            let tx = a.clone();
            tokio::spawn(async move {
                for i in 0..TEN_THOUSAND {
                    let _ = tx.put(i).await;
                }
                tx.close_all();
            });
            let mut count = 0;
            while z.take().await.is_ok() {
                count += 1;
            }
            assert_eq!(count, TEN_THOUSAND);
        });
    });
    group.finish();
}

criterion_group!(benches, bench_buffered_put_take, bench_pipeline_forward);
criterion_main!(benches);
