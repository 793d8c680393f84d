use crate::config::HostConfig;
use anyhow::{Context, Result};
use holostack_core::{Location, ObserverId, SimTick};
use holostack_labels::{LabelContext, LabelRegistry, LabelStack, VisibilityUpdater};
use holostack_testkit::{CallRecord, JsonlSink, RecordingProxies, StaticViewers};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Ticks per second of the update context.
const TICKS_PER_SECOND: u64 = 20;

pub struct HeadlessConfig {
    pub host: HostConfig,
    pub ticks: u64,
    pub events: Option<PathBuf>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HeadlessReport {
    pub ticks: u64,
    pub shown: usize,
    pub hidden: usize,
    pub proxy_calls: usize,
    pub leaked_proxies: usize,
}

struct UptimeLine {
    stack: Arc<LabelStack>,
    index: usize,
}

pub fn run(cfg: HeadlessConfig) -> Result<HeadlessReport> {
    let proxies = Arc::new(RecordingProxies::new());
    let viewers = Arc::new(StaticViewers::new());
    let ctx = LabelContext {
        proxies: proxies.clone(),
        viewers: viewers.clone(),
        registry: Arc::new(LabelRegistry::new()),
        config: cfg.host.labels.clone(),
    };

    let mut sink = match &cfg.events {
        Some(path) => Some(
            JsonlSink::create(path)
                .with_context(|| format!("failed to create event log {}", path.display()))?,
        ),
        None => None,
    };

    for observer in &cfg.host.observers {
        viewers.join(observer.world, observer.id);
    }

    let mut uptime_lines = Vec::new();
    let mut stacks = Vec::with_capacity(cfg.host.stacks.len());
    for spec in &cfg.host.stacks {
        let lines: Vec<&str> = spec.lines.iter().map(String::as_str).collect();
        let stack = LabelStack::new(&ctx, spec.location, &lines);
        if spec.uptime_line {
            uptime_lines.push(UptimeLine {
                stack: Arc::clone(&stack),
                index: stack.line_count(),
            });
        }
        stacks.push(stack);
    }
    info!(
        stacks = stacks.len(),
        observers = cfg.host.observers.len(),
        ticks = cfg.ticks,
        "Starting headless label host"
    );

    let updater = VisibilityUpdater::new(cfg.host.labels.view_distance);
    let mut report = HeadlessReport::default();
    let mut tick = SimTick::ZERO;
    while tick.0 < cfg.ticks {
        let positions: Vec<(ObserverId, Location)> = cfg
            .host
            .observers
            .iter()
            .map(|observer| (observer.id, observer.position_at(tick)))
            .collect();
        let stats = updater.refresh(&ctx.registry, &positions);
        report.shown += stats.shown;
        report.hidden += stats.hidden;

        if tick.0 % TICKS_PER_SECOND == 0 {
            let seconds = tick.0 / TICKS_PER_SECOND;
            for uptime in &uptime_lines {
                let text = format!("&7Uptime: {seconds}s");
                uptime.stack.set_line(uptime.index, Some(&text));
            }
        }

        flush_calls(&proxies, &mut sink, tick, &mut report)?;
        tick = tick.advance(1);
    }

    for observer in &cfg.host.observers {
        updater.forget(&ctx.registry, observer.id);
        viewers.leave(observer.id);
    }
    drop(uptime_lines);
    ctx.registry.clear();
    flush_calls(&proxies, &mut sink, tick, &mut report)?;
    if let Some(sink) = sink.as_mut() {
        sink.flush()?;
    }

    report.ticks = tick.0;
    report.leaked_proxies = proxies.live_count();
    info!(
        shown = report.shown,
        hidden = report.hidden,
        proxy_calls = report.proxy_calls,
        leaked = report.leaked_proxies,
        "Headless label host finished"
    );
    Ok(report)
}

fn flush_calls(
    proxies: &RecordingProxies,
    sink: &mut Option<JsonlSink>,
    tick: SimTick,
    report: &mut HeadlessReport,
) -> Result<()> {
    let calls = proxies.take_calls();
    report.proxy_calls += calls.len();
    if let Some(sink) = sink.as_mut() {
        for call in &calls {
            sink.write(&CallRecord { tick, call })?;
        }
    }
    Ok(())
}
