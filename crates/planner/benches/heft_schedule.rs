// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Benchmarks for the latency oracle and HEFT scheduling passes.

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use model_ir::{graph::Validated, ModelGraph, ModelLoader};
use planner::scheduler::HeterogeneousEarliestFinishTime;
use planner::sim::SimEngine;
use planner::{
    Engine, Job, JobQueue, SchedConfig, ScheduleContext, Scheduler, SchedulerType, WorkerConfig,
    WorkerWaitingTime,
};
use sched_core::{DeviceFlag, JobId, ModelId};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A chain of `len` ops where every fourth op is a softmax.
fn chain(len: usize) -> ModelGraph<Validated> {
    let ops: Vec<String> = (0..len)
        .map(|i| {
            let op = if i % 4 == 3 { "softmax" } else { "conv" };
            format!(
                r#"{{ "name": "op{i}", "op_type": "{op}", "inputs": [{i}], "outputs": [{}] }}"#,
                i + 1
            )
        })
        .collect();
    let json = format!(
        r#"{{ "name": "bench", "inputs": [0], "outputs": [{len}], "ops": [{}] }}"#,
        ops.join(",")
    );
    ModelLoader::from_json(&json).expect("bench model")
}

fn engine(len: usize) -> (Arc<SimEngine>, ModelId) {
    let mut config = SchedConfig::default();
    config.planner.schedulers = vec![SchedulerType::HeterogeneousEarliestFinishTime];
    config.subgraph.minimum_subgraph_size = 1;
    config.workers = vec![
        WorkerConfig::new(DeviceFlag::Cpu),
        WorkerConfig::new(DeviceFlag::Gpu).with_speed(2.0),
        WorkerConfig::new(DeviceFlag::Npu)
            .with_speed(4.0)
            .without_op_type("softmax"),
    ];
    let engine = SimEngine::from_config(&config, 1.0).expect("bench engine");
    let model = engine.register_model(&chain(len), true).expect("register");
    (engine, model)
}

fn bench_oracle(c: &mut Criterion) {
    let mut group = c.benchmark_group("shortest_latency_oracle");
    for len in [8, 16, 32] {
        let (engine, model) = engine(len);
        let job = Job::new(model);
        let waiting = WorkerWaitingTime::new();
        group.bench_function(format!("chain_{len}"), |b| {
            b.iter(|| engine.subgraph_with_shortest_latency(&job, &waiting))
        });
    }
    group.finish();
}

fn bench_heft_pass(c: &mut Criterion) {
    let map = BTreeMap::new();
    for reserve in [false, true] {
        let name = if reserve { "heft_reserved_pass" } else { "heft_pass" };
        c.bench_function(name, |b| {
            b.iter_batched(
                || {
                    let (engine, model) = engine(16);
                    let queue: JobQueue = (0..16)
                        .map(|i| {
                            let mut job = Job::new(model);
                            job.job_id = Some(JobId(i));
                            job
                        })
                        .collect();
                    (engine, queue)
                },
                |(engine, mut queue)| {
                    let mut heft = HeterogeneousEarliestFinishTime::new(reserve);
                    let mut ctx = ScheduleContext::new(engine.as_ref(), queue.len(), &map);
                    heft.schedule(&mut ctx, &mut queue)
                },
                BatchSize::SmallInput,
            )
        });
    }
}

criterion_group!(benches, bench_oracle, bench_heft_pass);
criterion_main!(benches);
