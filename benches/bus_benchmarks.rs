use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use tokio::runtime::Runtime;
use topicbus::{
    pubsub::{TopicPath, TopicTrie},
    EventBus, InMemoryEventStore,
};

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .build()
        .unwrap()
}

fn bench_trie_subscribe(c: &mut Criterion) {
    let topics: Vec<TopicPath> = (0..100)
        .map(|i| TopicPath::subscription(&format!("svc{}:entity{}:create", i % 10, i)).unwrap())
        .collect();

    c.bench_function("trie_subscribe_100", |b| {
        b.iter_batched(
            TopicTrie::<u32>::new,
            |mut trie| {
                for (i, topic) in topics.iter().enumerate() {
                    trie.subscribe(topic, i as u32).unwrap();
                }
                trie
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_trie_collect(c: &mut Criterion) {
    let mut trie = TopicTrie::<u32>::new();
    for depth in 1..=5 {
        let prefix: Vec<String> = (0..depth).map(|d| format!("l{d}")).collect();
        let wildcard = format!("{}:*", prefix.join(":"));
        trie.subscribe(&TopicPath::subscription(&wildcard).unwrap(), depth)
            .unwrap();
    }
    let exact = TopicPath::subscription("l0:l1:l2:l3:l4:leaf").unwrap();
    trie.subscribe(&exact, 99).unwrap();

    let publish = TopicPath::publication("l0:l1:l2:l3:l4:leaf").unwrap();
    c.bench_function("trie_collect_depth_6", |b| {
        b.iter(|| black_box(trie.collect(black_box(&publish))))
    });
}

fn bench_publish(
    c: &mut Criterion,
    name: &str,
    listeners: usize,
) {
    let rt = runtime();
    let bus = EventBus::builder()
        .runtime(rt.handle().clone())
        .build()
        .unwrap();
    for _ in 0..listeners {
        bus.subscribe_fn("orders:create", |event| {
            black_box(event);
        })
        .unwrap();
    }

    c.bench_function(name, |b| {
        b.iter(|| bus.publish("orders:create", black_box("payload")).unwrap())
    });
}

fn bench_publish_1_sub(c: &mut Criterion) {
    bench_publish(c, "publish_1_sub", 1);
}

fn bench_publish_10_subs(c: &mut Criterion) {
    bench_publish(c, "publish_10_subs", 10);
}

fn bench_publish_persisted(c: &mut Criterion) {
    let rt = runtime();
    let bus = EventBus::builder()
        .runtime(rt.handle().clone())
        .store(InMemoryEventStore::new())
        .build()
        .unwrap();
    bus.subscribe_fn("orders:*", |event| {
        black_box(event);
    })
    .unwrap();
    bus.subscribe_fn("orders:create", |event| {
        black_box(event);
    })
    .unwrap();

    c.bench_function("publish_persisted_memory", |b| {
        b.iter(|| bus.publish("orders:create", black_box(42)).unwrap())
    });
}

criterion_group!(
    benches,
    bench_trie_subscribe,
    bench_trie_collect,
    bench_publish_1_sub,
    bench_publish_10_subs,
    bench_publish_persisted,
);
criterion_main!(benches);
