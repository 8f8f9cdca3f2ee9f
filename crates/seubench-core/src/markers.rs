//! Synchronization markers bracketing the fault-exposed region.
//!
//! An external fault-injection controller sets breakpoints on
//! [`drseus_start_tag`] and [`drseus_end_tag`] to know when to start and
//! stop perturbing memory.

use std::hint::black_box;

use tracing::info;

/// Receives the start and end of the measured region.
pub trait SyncMarkers {
    fn start(&mut self, iteration: u64);
    fn end(&mut self, iteration: u64);
}

/// Breakpoint target for the start of the measured region.
#[inline(never)]
pub fn drseus_start_tag(iteration: u64) {
    black_box(iteration);
}

/// Breakpoint target for the end of the measured region.
#[inline(never)]
pub fn drseus_end_tag(iteration: u64) {
    black_box(iteration);
}

/// Markers for on-target runs: call the breakpoint functions.
#[derive(Debug, Clone, Copy, Default)]
pub struct BreakpointMarkers;

impl SyncMarkers for BreakpointMarkers {
    fn start(&mut self, iteration: u64) {
        info!(target: "seubench.engine", iteration, "measured region start marker");
        drseus_start_tag(iteration);
    }

    fn end(&mut self, iteration: u64) {
        drseus_end_tag(iteration);
        info!(target: "seubench.engine", iteration, "measured region end marker");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerEvent {
    Start { iteration: u64 },
    End { iteration: u64 },
}

/// Markers that remember when they fired.
#[derive(Debug, Clone, Default)]
pub struct RecordingMarkers {
    pub events: Vec<MarkerEvent>,
}

impl SyncMarkers for RecordingMarkers {
    fn start(&mut self, iteration: u64) {
        self.events.push(MarkerEvent::Start { iteration });
    }

    fn end(&mut self, iteration: u64) {
        self.events.push(MarkerEvent::End { iteration });
    }
}

impl<M: SyncMarkers + ?Sized> SyncMarkers for &mut M {
    fn start(&mut self, iteration: u64) {
        (**self).start(iteration);
    }

    fn end(&mut self, iteration: u64) {
        (**self).end(iteration);
    }
}
