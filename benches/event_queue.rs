//! Event Pipeline Benchmarks
//!
//! Measures input reordering with coincident modifiers and output
//! accumulation/drain at various burst sizes.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use lamco_hid_pipeline::event_queue::EventQueue;
use lamco_hid_pipeline::hid::usages::{keyboard, page};
use lamco_hid_pipeline::hid::{AbsoluteTime, DeviceId, EventType, Usage, UsagePair};
use lamco_hid_pipeline::output::{
    InjectedEvent, InputSourceSpecifier, OutputEventQueue, OutputSink, Report, SoftwareFunction,
};
use lamco_hid_pipeline::Result;

/// Discards everything
struct NullSink;

impl OutputSink for NullSink {
    fn post_report(&mut self, report: &Report) -> Result<()> {
        black_box(report);
        Ok(())
    }

    fn post_injected_event(&mut self, event: &InjectedEvent) -> Result<()> {
        black_box(event);
        Ok(())
    }

    fn execute_shell_command(&mut self, _command: &str) -> Result<()> {
        Ok(())
    }

    fn select_input_source(&mut self, _specifiers: &[InputSourceSpecifier]) -> Result<()> {
        Ok(())
    }

    fn execute_software_function(&mut self, _function: &SoftwareFunction) -> Result<()> {
        Ok(())
    }

    fn send_user_command(&mut self, _command: &serde_json::Value) -> Result<()> {
        Ok(())
    }
}

/// Reports of `keys` letters followed by a modifier, all sharing one timestamp
fn generate_reports(reports: usize, keys: u16) -> Vec<(u64, u16, i64)> {
    let mut values = Vec::with_capacity(reports * (keys as usize + 1));
    for report in 0..reports {
        let ts = 1_000 * (report as u64 + 1);
        let value = (report % 2 == 0) as i64;
        for key in 0..keys {
            values.push((ts, keyboard::A.0 + key, value));
        }
        values.push((ts, keyboard::LEFT_SHIFT.0, value));
    }
    values
}

/// Benchmark pushing reports whose modifier arrives last (worst reordering)
fn bench_event_queue_push(c: &mut Criterion) {
    let mut group = c.benchmark_group("event_queue_push");

    for keys in [1u16, 4, 16] {
        let values = generate_reports(64, keys);
        group.throughput(Throughput::Elements(values.len() as u64));

        group.bench_with_input(BenchmarkId::new("modifier_last", keys), &values, |b, values| {
            b.iter(|| {
                let mut queue = EventQueue::new();
                for &(ts, usage, value) in values {
                    queue.push(
                        DeviceId(1),
                        AbsoluteTime::from_nanos(ts),
                        page::KEYBOARD_OR_KEYPAD,
                        Usage(usage),
                        value,
                    );
                }
                black_box(queue.len())
            })
        });
    }

    group.finish();
}

/// Benchmark accumulating key reports and draining them in one pass
fn bench_output_queue_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("output_queue_drain");

    for events in [16usize, 256, 4096] {
        group.throughput(Throughput::Elements(events as u64));

        group.bench_function(BenchmarkId::new("key_burst", events), |b| {
            b.iter(|| {
                let mut queue = OutputEventQueue::new();
                for i in 0..events {
                    let pair = UsagePair::keyboard(Usage(keyboard::A.0 + (i % 26) as u16));
                    let event_type = if i % 2 == 0 { EventType::KeyDown } else { EventType::KeyUp };
                    queue.emplace_back_key_event(pair, event_type, AbsoluteTime::from_millis(1));
                }
                let mut sink = NullSink;
                let end = AbsoluteTime::from_millis(u64::MAX / 1_000_000);
                black_box(queue.post_ready_events(end, &mut sink))
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_event_queue_push, bench_output_queue_drain);
criterion_main!(benches);
