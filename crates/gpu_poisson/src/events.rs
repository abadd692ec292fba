//! Event types and sinks for observing sampler runs.
//!
//! This module defines [`SamplerEvent`] and a set of sinks and adapters to emit,
//! collect, or forward events while a [`crate::sampler::PoissonDiskSampler`]
//! iterates via [`crate::sampler::PoissonDiskSampler::run_with_events`].
use crate::sampler::{RunOutcome, StepReport};

/// Describes events emitted by the sampler.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub enum SamplerEvent {
    /// Emitted once device buffers are allocated.
    Initialized {
        /// Bytes of device memory held by the sampler.
        memory_bytes: u64,
        /// Result buffer capacity in samples.
        result_capacity: usize,
        /// Number of grid cells.
        cell_count: usize,
    },

    /// Emitted after each Throw/Resolve/Census pass.
    IterationFinished(StepReport),

    /// Emitted when a run reaches a terminal state.
    RunFinished {
        /// Why the run stopped.
        outcome: RunOutcome,
        /// Passes executed since the last reset.
        iterations: usize,
        /// Samples committed to the result buffer.
        accepted: usize,
        /// Cells still uncovered.
        empty_cells: usize,
    },

    /// Non-fatal warning generated during sampling.
    Warning {
        /// Context string (e.g. stage name).
        context: String,
        /// Human-readable message.
        message: String,
    },
}

/// A generic event sink that accepts [`SamplerEvent`]s.
pub trait EventSink {
    fn send(&mut self, event: SamplerEvent);

    fn send_many<I>(&mut self, events: I)
    where
        Self: Sized,
        I: IntoIterator<Item = SamplerEvent>,
    {
        for e in events {
            self.send(e);
        }
    }
}

/// A no-op event sink.
impl EventSink for () {
    #[inline]
    fn send(&mut self, _event: SamplerEvent) {}
}

/// An event sink that forwards to a user-provided closure.
pub struct FnSink<F>
where
    F: FnMut(SamplerEvent),
{
    f: F,
}

impl<F> FnSink<F>
where
    F: FnMut(SamplerEvent),
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> EventSink for FnSink<F>
where
    F: FnMut(SamplerEvent),
{
    #[inline]
    fn send(&mut self, event: SamplerEvent) {
        (self.f)(event);
    }
}

/// An event sink that collects all events in a `Vec`.
#[derive(Default)]
pub struct VecSink {
    events: Vec<SamplerEvent>,
}

impl VecSink {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self {
            events: Vec::with_capacity(cap),
        }
    }

    pub fn into_inner(self) -> Vec<SamplerEvent> {
        self.events
    }

    pub fn as_slice(&self) -> &[SamplerEvent] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Reports of every finished iteration, in order.
    pub fn iterations(&self) -> Vec<StepReport> {
        self.events
            .iter()
            .filter_map(|event| match event {
                SamplerEvent::IterationFinished(report) => Some(*report),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for VecSink {
    #[inline]
    fn send(&mut self, event: SamplerEvent) {
        self.events.push(event);
    }
}

/// Fan-out sink that forwards each event to all contained sinks.
pub struct MultiSink<S: EventSink> {
    pub(crate) sinks: Vec<S>,
}

impl<S: EventSink> MultiSink<S> {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn with_sinks(sinks: Vec<S>) -> Self {
        Self { sinks }
    }

    pub fn push(&mut self, sink: S) {
        self.sinks.push(sink);
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }
}

impl<S: EventSink> Default for MultiSink<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: EventSink> EventSink for MultiSink<S> {
    fn send(&mut self, event: SamplerEvent) {
        if self.sinks.is_empty() {
            return;
        }
        let last_idx = self.sinks.len() - 1;
        for i in 0..last_idx {
            self.sinks[i].send(event.clone());
        }
        self.sinks[last_idx].send(event);
    }
}
