//! Instrument Registry
//!
//! A fixed table maps every instrument to the sub-flag that gates it. The table is
//! evaluated once against [`MetricsConfig`] into a sparse arena indexed by
//! [`InstrumentId`]; a slot left empty is a disabled instrument and every record
//! call against it is a no-op.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, trace, warn};

use crate::config::{MetricsConfig, SubFlag};
use crate::telemetry::attributes::{keys, AttributeSet};
use crate::telemetry::types::now_unix_nanos;

/// Every instrument the engine can create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstrumentId {
    PlayersOnline,
    PlayerConnections,
    PlayerDisconnections,
    BlocksPlaced,
    BlocksBroken,
    BlockInteractions,
    WorldsLoaded,
    WorldsUnloaded,
    ChunksLoaded,
    ChunksUnloaded,
    ServerTps,
    MemoryUsed,
    MemoryMax,
    Uptime,
}

impl InstrumentId {
    pub const COUNT: usize = 14;

    fn index(self) -> usize {
        self as usize
    }

    pub fn spec(self) -> &'static InstrumentSpec {
        &INSTRUMENTS[self.index()]
    }

    pub fn name(self) -> &'static str {
        self.spec().name
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstrumentKind {
    Counter,
    UpDownCounter,
    Gauge,
}

/// Static description of one instrument and the flag that enables it.
#[derive(Debug)]
pub struct InstrumentSpec {
    pub id: InstrumentId,
    pub name: &'static str,
    pub description: &'static str,
    pub unit: &'static str,
    pub kind: InstrumentKind,
    pub gate: SubFlag,
}

pub static INSTRUMENTS: [InstrumentSpec; InstrumentId::COUNT] = [
    InstrumentSpec {
        id: InstrumentId::PlayersOnline,
        name: "hytale.players.count",
        description: "Number of players currently online",
        unit: "{players}",
        kind: InstrumentKind::UpDownCounter,
        gate: SubFlag::Sessions,
    },
    InstrumentSpec {
        id: InstrumentId::PlayerConnections,
        name: "hytale.players.connections",
        description: "Total player connections",
        unit: "{connections}",
        kind: InstrumentKind::Counter,
        gate: SubFlag::Connections,
    },
    InstrumentSpec {
        id: InstrumentId::PlayerDisconnections,
        name: "hytale.players.disconnections",
        description: "Total player disconnections",
        unit: "{disconnections}",
        kind: InstrumentKind::Counter,
        gate: SubFlag::Connections,
    },
    InstrumentSpec {
        id: InstrumentId::BlocksPlaced,
        name: "hytale.blocks.placed",
        description: "Total blocks placed",
        unit: "{blocks}",
        kind: InstrumentKind::Counter,
        gate: SubFlag::Placement,
    },
    InstrumentSpec {
        id: InstrumentId::BlocksBroken,
        name: "hytale.blocks.broken",
        description: "Total blocks broken",
        unit: "{blocks}",
        kind: InstrumentKind::Counter,
        gate: SubFlag::Breaking,
    },
    InstrumentSpec {
        id: InstrumentId::BlockInteractions,
        name: "hytale.blocks.interactions",
        description: "Total block interactions",
        unit: "{interactions}",
        kind: InstrumentKind::Counter,
        gate: SubFlag::Interactions,
    },
    InstrumentSpec {
        id: InstrumentId::WorldsLoaded,
        name: "hytale.worlds.loaded",
        description: "Total worlds loaded",
        unit: "{worlds}",
        kind: InstrumentKind::Counter,
        gate: SubFlag::WorldLoading,
    },
    InstrumentSpec {
        id: InstrumentId::WorldsUnloaded,
        name: "hytale.worlds.unloaded",
        description: "Total worlds unloaded",
        unit: "{worlds}",
        kind: InstrumentKind::Counter,
        gate: SubFlag::WorldLoading,
    },
    InstrumentSpec {
        id: InstrumentId::ChunksLoaded,
        name: "hytale.chunks.loaded",
        description: "Total chunks loaded",
        unit: "{chunks}",
        kind: InstrumentKind::Counter,
        gate: SubFlag::ChunkLoading,
    },
    InstrumentSpec {
        id: InstrumentId::ChunksUnloaded,
        name: "hytale.chunks.unloaded",
        description: "Total chunks unloaded",
        unit: "{chunks}",
        kind: InstrumentKind::Counter,
        gate: SubFlag::ChunkLoading,
    },
    InstrumentSpec {
        id: InstrumentId::ServerTps,
        name: "hytale.server.tps",
        description: "Server ticks per second",
        unit: "{ticks}/s",
        kind: InstrumentKind::Gauge,
        gate: SubFlag::Tps,
    },
    InstrumentSpec {
        id: InstrumentId::MemoryUsed,
        name: "hytale.server.memory.used",
        description: "Resident memory in use",
        unit: "By",
        kind: InstrumentKind::Gauge,
        gate: SubFlag::Memory,
    },
    InstrumentSpec {
        id: InstrumentId::MemoryMax,
        name: "hytale.server.memory.max",
        description: "Peak resident memory",
        unit: "By",
        kind: InstrumentKind::Gauge,
        gate: SubFlag::Memory,
    },
    InstrumentSpec {
        id: InstrumentId::Uptime,
        name: "hytale.server.uptime",
        description: "Server uptime",
        unit: "s",
        kind: InstrumentKind::Gauge,
        gate: SubFlag::Uptime,
    },
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumberValue {
    Int(i64),
    Double(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct NumberPoint {
    pub attributes: AttributeSet,
    pub start_time_unix_nano: u64,
    pub time_unix_nano: u64,
    pub value: NumberValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MetricPoints {
    /// Cumulative sum.
    Sum {
        monotonic: bool,
        points: Vec<NumberPoint>,
    },
    Gauge {
        points: Vec<NumberPoint>,
    },
}

/// One collected metric, ready for export.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricData {
    pub name: &'static str,
    pub description: &'static str,
    pub unit: &'static str,
    pub points: MetricPoints,
}

impl MetricData {
    pub fn point_count(&self) -> usize {
        match &self.points {
            MetricPoints::Sum { points, .. } | MetricPoints::Gauge { points } => points.len(),
        }
    }
}

/// Source of metrics pulled by the periodic reader.
pub trait MetricProducer: Send + Sync {
    fn produce(&self) -> Vec<MetricData>;
}

/// Pull-style gauge reading. `None` means no point this cycle.
pub type GaugeCallback = Arc<dyn Fn() -> Option<NumberValue> + Send + Sync>;

struct SumInstrument {
    name: &'static str,
    monotonic: bool,
    points: DashMap<AttributeSet, AtomicI64>,
    /// Attribute sets admitted so far, the overflow series excluded.
    series: AtomicUsize,
    limit: usize,
    overflowed: AtomicBool,
}

impl SumInstrument {
    fn new(name: &'static str, monotonic: bool, limit: usize) -> Self {
        Self {
            name,
            monotonic,
            points: DashMap::new(),
            series: AtomicUsize::new(0),
            limit,
            overflowed: AtomicBool::new(false),
        }
    }

    fn add(&self, delta: i64, attributes: AttributeSet) {
        let attributes = attributes.canonical();
        if let Some(value) = self.points.get(&attributes) {
            value.fetch_add(delta, Ordering::Relaxed);
            return;
        }
        let admitted = match self.points.entry(attributes) {
            Entry::Occupied(entry) => {
                entry.get().fetch_add(delta, Ordering::Relaxed);
                true
            }
            Entry::Vacant(entry) => {
                let reserved = self
                    .series
                    .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| {
                        (n < self.limit).then_some(n + 1)
                    })
                    .is_ok();
                if reserved {
                    entry.insert(AtomicI64::new(delta));
                }
                reserved
            }
        };
        if !admitted {
            self.add_overflow(delta);
        }
    }

    /// The shard guard from `add` must be released before this runs.
    fn add_overflow(&self, delta: i64) {
        if !self.overflowed.swap(true, Ordering::Relaxed) {
            warn!(
                instrument = self.name,
                limit = self.limit,
                "Attribute set limit reached, recording further series as overflow"
            );
        }
        self.points
            .entry(overflow_attributes())
            .or_insert_with(|| AtomicI64::new(0))
            .fetch_add(delta, Ordering::Relaxed);
    }
}

fn overflow_attributes() -> AttributeSet {
    AttributeSet::new().with(keys::METRIC_OVERFLOW, true)
}

enum Instrument {
    Sum(SumInstrument),
    Gauge(GaugeCallback),
}

/// Last ticks-per-second value reported by the host.
#[derive(Debug, Default)]
pub struct TpsCell {
    bits: AtomicU64,
    set: AtomicBool,
}

impl TpsCell {
    pub fn store(&self, tps: f64) {
        self.bits.store(tps.to_bits(), Ordering::Relaxed);
        self.set.store(true, Ordering::Release);
    }

    pub fn load(&self) -> Option<f64> {
        if self.set.load(Ordering::Acquire) {
            Some(f64::from_bits(self.bits.load(Ordering::Relaxed)))
        } else {
            None
        }
    }
}

/// Holds exactly the instruments the configuration enables.
pub struct InstrumentRegistry {
    slots: [Option<Instrument>; InstrumentId::COUNT],
    tps: Arc<TpsCell>,
    start_time_unix_nano: u64,
}

impl InstrumentRegistry {
    /// Build with the process gauge sources: `/proc/self/status` for memory, the
    /// registry's own start for uptime and ticks reported through
    /// [`record_tps`](Self::record_tps).
    pub fn new(metrics: &MetricsConfig) -> Self {
        let tps = Arc::new(TpsCell::default());
        let started = Instant::now();
        let tps_source = tps.clone();
        Self::with_gauges(metrics, tps, move |id| -> Option<GaugeCallback> {
            match id {
                InstrumentId::ServerTps => {
                    let tps = tps_source.clone();
                    Some(Arc::new(move || tps.load().map(NumberValue::Double)) as GaugeCallback)
                }
                InstrumentId::MemoryUsed => {
                    Some(Arc::new(|| proc_status_bytes("VmRSS:").map(NumberValue::Int)) as GaugeCallback)
                }
                InstrumentId::MemoryMax => {
                    Some(Arc::new(|| proc_status_bytes("VmHWM:").map(NumberValue::Int)) as GaugeCallback)
                }
                InstrumentId::Uptime => Some(Arc::new(move || {
                    Some(NumberValue::Int(started.elapsed().as_secs() as i64))
                }) as GaugeCallback),
                _ => None,
            }
        })
    }

    /// Build with caller-supplied gauge callbacks.
    pub fn with_gauges<F>(metrics: &MetricsConfig, tps: Arc<TpsCell>, gauge_for: F) -> Self
    where
        F: Fn(InstrumentId) -> Option<GaugeCallback>,
    {
        let slots = std::array::from_fn(|index| {
            let spec = &INSTRUMENTS[index];
            if !metrics.tracks(spec.gate) {
                trace!(
                    instrument = spec.name,
                    category = spec.gate.category().as_str(),
                    "Instrument disabled"
                );
                return None;
            }
            match spec.kind {
                InstrumentKind::Counter | InstrumentKind::UpDownCounter => {
                    Some(Instrument::Sum(SumInstrument::new(
                        spec.name,
                        spec.kind == InstrumentKind::Counter,
                        metrics.cardinality_limit,
                    )))
                }
                InstrumentKind::Gauge => gauge_for(spec.id).map(Instrument::Gauge),
            }
        });
        let registry = Self {
            slots,
            tps,
            start_time_unix_nano: now_unix_nanos(),
        };
        debug!(
            instruments = registry.enabled_count(),
            "Instrument registry built"
        );
        registry
    }

    pub fn is_enabled(&self, id: InstrumentId) -> bool {
        self.slots[id.index()].is_some()
    }

    pub fn enabled_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Add to a counter or up/down counter. No-op if the instrument is absent, is a
    /// gauge, or is a counter given a negative delta.
    pub fn add(&self, id: InstrumentId, delta: i64, attributes: AttributeSet) {
        match &self.slots[id.index()] {
            Some(Instrument::Sum(sum)) => {
                if sum.monotonic && delta < 0 {
                    debug!(instrument = id.name(), delta, "Ignoring negative counter delta");
                    return;
                }
                sum.add(delta, attributes);
            }
            Some(Instrument::Gauge(_)) => {
                debug!(instrument = id.name(), "Gauges are observed, not recorded");
            }
            None => {}
        }
    }

    pub fn increment(&self, id: InstrumentId, attributes: AttributeSet) {
        self.add(id, 1, attributes);
    }

    /// Store the latest ticks-per-second reading for the TPS gauge.
    pub fn record_tps(&self, tps: f64) {
        if tps.is_finite() {
            self.tps.store(tps);
        }
    }

    /// Current cumulative value of a sum for one attribute set.
    pub fn sum_value(&self, id: InstrumentId, attributes: &AttributeSet) -> Option<i64> {
        match &self.slots[id.index()] {
            Some(Instrument::Sum(sum)) => sum
                .points
                .get(&attributes.canonical())
                .map(|value| value.load(Ordering::Relaxed)),
            _ => None,
        }
    }

    /// Total across attribute sets.
    pub fn sum_total(&self, id: InstrumentId) -> Option<i64> {
        match &self.slots[id.index()] {
            Some(Instrument::Sum(sum)) => Some(
                sum.points
                    .iter()
                    .map(|entry| entry.value().load(Ordering::Relaxed))
                    .sum(),
            ),
            _ => None,
        }
    }

    /// Snapshot every enabled instrument. Sums with no points and gauges whose
    /// callback yields nothing are left out.
    pub fn collect(&self) -> Vec<MetricData> {
        let now = now_unix_nanos();
        let mut out = Vec::new();
        for (spec, slot) in INSTRUMENTS.iter().zip(self.slots.iter()) {
            let points = match slot {
                None => continue,
                Some(Instrument::Sum(sum)) => {
                    let points: Vec<NumberPoint> = sum
                        .points
                        .iter()
                        .map(|entry| NumberPoint {
                            attributes: entry.key().clone(),
                            start_time_unix_nano: self.start_time_unix_nano,
                            time_unix_nano: now,
                            value: NumberValue::Int(entry.value().load(Ordering::Relaxed)),
                        })
                        .collect();
                    if points.is_empty() {
                        continue;
                    }
                    MetricPoints::Sum {
                        monotonic: sum.monotonic,
                        points,
                    }
                }
                Some(Instrument::Gauge(callback)) => match callback() {
                    Some(value) => MetricPoints::Gauge {
                        points: vec![NumberPoint {
                            attributes: AttributeSet::new(),
                            start_time_unix_nano: self.start_time_unix_nano,
                            time_unix_nano: now,
                            value,
                        }],
                    },
                    None => continue,
                },
            };
            out.push(MetricData {
                name: spec.name,
                description: spec.description,
                unit: spec.unit,
                points,
            });
        }
        out
    }
}

impl MetricProducer for InstrumentRegistry {
    fn produce(&self) -> Vec<MetricData> {
        self.collect()
    }
}

/// Read a `kB` field from `/proc/self/status` as bytes.
fn proc_status_bytes(field: &str) -> Option<i64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    parse_status_kb(&status, field).map(|kb| kb.saturating_mul(1024))
}

fn parse_status_kb(status: &str, field: &str) -> Option<i64> {
    status
        .lines()
        .find_map(|line| line.strip_prefix(field))
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|value| value.parse::<i64>().ok())
}
