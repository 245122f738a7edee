//! Benchmarks for the Lookout diff engine
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use lookout::watch::{Differ, Friends, PinnedSet, Resource, VoicePresence};
use serde_json::{json, Value};

fn voice_document(members: usize, streaming_every: usize) -> Value {
    let mut channels = serde_json::Map::new();
    for channel in 0..10 {
        let list: Vec<Value> = (0..members / 10)
            .map(|i| {
                json!({
                    "name": format!("user{}", channel * 1000 + i),
                    "avatar": format!("https://cdn.example/{}.png", i),
                    "streaming": i % streaming_every == 0,
                    "video": false,
                })
            })
            .collect();
        channels.insert(format!("channel{}", channel), Value::Array(list));
    }
    json!({ "Home": channels })
}

fn friends_document(count: usize, playing_every: usize) -> Value {
    let friends: Vec<Value> = (0..count)
        .map(|i| {
            let playing = i % playing_every == 0;
            json!({
                "steamid": format!("7656119{:010}", i),
                "name": format!("friend{}", i),
                "status": if i % 2 == 0 { "online" } else { "offline" },
                "gameid": if playing { json!(570) } else { json!(0) },
                "text": if playing { "In Game: Dota 2" } else { "" },
            })
        })
        .collect();
    Value::Array(friends)
}

fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize");

    for size in [100, 1000] {
        let voice = voice_document(size, 7);
        let friends = friends_document(size, 5);

        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("voice", size), &voice, |b, doc| {
            b.iter(|| VoicePresence::normalize(black_box(doc.clone())).unwrap())
        });

        group.bench_with_input(BenchmarkId::new("friends", size), &friends, |b, doc| {
            b.iter(|| Friends::normalize(black_box(doc.clone())).unwrap())
        });
    }

    group.finish();
}

fn bench_compare(c: &mut Criterion) {
    let mut group = c.benchmark_group("compare");

    for size in [100, 1000, 10000] {
        group.throughput(Throughput::Elements(size as u64));

        // Unchanged snapshots: the steady state of every poll
        let voice = VoicePresence::normalize(voice_document(size, 7)).unwrap();
        let differ = Differ::<VoicePresence>::default();
        group.bench_function(format!("voice_unchanged_{}", size), |b| {
            b.iter(|| differ.compare(black_box(&voice), black_box(&voice)))
        });

        let before = VoicePresence::normalize(voice_document(size, 7)).unwrap();
        let after = VoicePresence::normalize(voice_document(size, 3)).unwrap();
        group.bench_function(format!("voice_streaming_churn_{}", size), |b| {
            b.iter(|| differ.compare(black_box(&before), black_box(&after)))
        });

        let before = Friends::normalize(friends_document(size, 5)).unwrap();
        let after = Friends::normalize(friends_document(size, 4)).unwrap();
        let pins = PinnedSet::new((0..size).step_by(10).map(|i| format!("7656119{:010}", i)));
        let differ = Differ::<Friends>::new(pins);
        group.bench_function(format!("friends_game_churn_{}", size), |b| {
            b.iter(|| differ.compare(black_box(&before), black_box(&after)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_normalize, bench_compare);
criterion_main!(benches);
