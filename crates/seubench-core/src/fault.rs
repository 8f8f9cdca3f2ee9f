//! Fault-injection surface for off-target runs and tests.
//!
//! On hardware the perturbation comes from the beam or the external
//! controller. Off target, a [`FaultInjector`] stands in for it: during
//! measured iterations the engine calls it after every stage's kernel run
//! and before verification, with mutable access to the kernel inputs, the
//! candidate buffer and the golden buffers.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::golden::GoldenReference;
use crate::kernel::Kernel;
use crate::word::Word;

/// Everything an injector may corrupt.
pub struct FaultTarget<'a, K: Kernel> {
    pub kernel: &'a mut K,
    pub candidate: &'a mut [K::Word],
    pub goldens: &'a mut [GoldenReference<K::Word>],
}

pub trait FaultInjector<K: Kernel> {
    fn inject(&mut self, iteration: u64, stage: usize, target: FaultTarget<'_, K>);
}

/// Injector that never fires.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFaults;

impl<K: Kernel> FaultInjector<K> for NoFaults {
    fn inject(&mut self, _iteration: u64, _stage: usize, _target: FaultTarget<'_, K>) {}
}

impl<K: Kernel, F: FaultInjector<K>> FaultInjector<K> for Option<F> {
    fn inject(&mut self, iteration: u64, stage: usize, target: FaultTarget<'_, K>) {
        if let Some(inner) = self {
            inner.inject(iteration, stage, target);
        }
    }
}

/// Buffer class a fault lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultSite {
    Input,
    Output,
    /// Golden slot index.
    Golden(usize),
}

/// A single bit flip, either planned or already applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjectedFault {
    pub iteration: u64,
    pub stage: usize,
    pub site: FaultSite,
    pub word: usize,
    pub bit: u32,
}

impl InjectedFault {
    /// Apply this flip to `target`. Returns false when the word is out of range.
    pub fn apply<K: Kernel>(&self, target: FaultTarget<'_, K>) -> bool {
        match self.site {
            FaultSite::Input => target.kernel.flip_input_bit(self.word, self.bit),
            FaultSite::Output => flip_in(target.candidate, self.word, self.bit),
            FaultSite::Golden(slot) => target
                .goldens
                .get_mut(slot)
                .is_some_and(|golden| flip_in(golden.words_mut(), self.word, self.bit)),
        }
    }
}

fn flip_in<W: Word>(words: &mut [W], word: usize, bit: u32) -> bool {
    match words.get_mut(word) {
        Some(slot) => {
            *slot = slot.flip_bit(bit);
            true
        }
        None => false,
    }
}

/// Applies a fixed list of flips at exact `(iteration, stage)` points.
#[derive(Debug, Clone, Default)]
pub struct ScriptedInjector {
    plan: Vec<InjectedFault>,
    applied: Vec<InjectedFault>,
}

impl ScriptedInjector {
    #[must_use]
    pub fn new(plan: Vec<InjectedFault>) -> Self {
        Self {
            plan,
            applied: Vec::new(),
        }
    }

    #[must_use]
    pub fn applied(&self) -> &[InjectedFault] {
        &self.applied
    }
}

impl<K: Kernel> FaultInjector<K> for ScriptedInjector {
    fn inject(&mut self, iteration: u64, stage: usize, target: FaultTarget<'_, K>) {
        let FaultTarget {
            kernel,
            candidate,
            goldens,
        } = target;
        for fault in self
            .plan
            .iter()
            .filter(|fault| fault.iteration == iteration && fault.stage == stage)
        {
            let applied = fault.apply(FaultTarget {
                kernel: &mut *kernel,
                candidate: &mut *candidate,
                goldens: &mut *goldens,
            });
            if applied {
                self.applied.push(*fault);
            }
        }
    }
}

/// Seeded random single-bit flips.
///
/// Each call fires with `probability`; the site is chosen uniformly among
/// inputs (when the kernel exposes any), the candidate, and the golden
/// slots, and the word and bit uniformly within the site.
#[derive(Debug, Clone)]
pub struct BitFlipInjector {
    rng: StdRng,
    probability: f64,
    include_golden: bool,
    injected: Vec<InjectedFault>,
}

impl BitFlipInjector {
    /// `probability` is clamped to `0..=1`; NaN and infinities disable injection.
    #[must_use]
    pub fn new(seed: u64, probability: f64) -> Self {
        let probability = if probability.is_finite() {
            probability.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            rng: StdRng::seed_from_u64(seed),
            probability,
            include_golden: true,
            injected: Vec::new(),
        }
    }

    /// Leave golden buffers alone.
    #[must_use]
    pub fn without_golden(mut self) -> Self {
        self.include_golden = false;
        self
    }

    #[must_use]
    pub fn injected(&self) -> &[InjectedFault] {
        &self.injected
    }

    #[must_use]
    pub fn probability(&self) -> f64 {
        self.probability
    }
}

impl<K: Kernel> FaultInjector<K> for BitFlipInjector {
    fn inject(&mut self, iteration: u64, stage: usize, target: FaultTarget<'_, K>) {
        if self.probability <= 0.0 || !self.rng.gen_bool(self.probability) {
            return;
        }

        let mut sites = Vec::with_capacity(2 + target.goldens.len());
        if target.kernel.input_words() > 0 {
            sites.push((FaultSite::Input, target.kernel.input_words()));
        }
        if !target.candidate.is_empty() {
            sites.push((FaultSite::Output, target.candidate.len()));
        }
        if self.include_golden {
            for (slot, golden) in target.goldens.iter().enumerate() {
                if !golden.is_empty() {
                    sites.push((FaultSite::Golden(slot), golden.len()));
                }
            }
        }
        if sites.is_empty() {
            return;
        }

        let (site, words) = sites[self.rng.gen_range(0..sites.len())];
        let fault = InjectedFault {
            iteration,
            stage,
            site,
            word: self.rng.gen_range(0..words),
            bit: self.rng.gen_range(0..<K::Word as Word>::BITS),
        };
        if fault.apply(target) {
            debug!(
                target: "seubench.fault",
                iteration,
                stage,
                site = ?fault.site,
                word = fault.word,
                bit = fault.bit,
                "bit flip injected"
            );
            self.injected.push(fault);
        }
    }
}
