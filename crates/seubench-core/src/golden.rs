//! Golden reference buffers with an integrity seal.
//!
//! A golden buffer is only trusted while its xxh3 seal matches its contents.
//! Regeneration always overwrites the whole buffer and reseals it; nothing
//! patches a golden buffer element by element.

use xxhash_rust::xxh3::Xxh3;

use crate::word::Word;

/// Expected output for one golden slot of a kernel.
#[derive(Debug, Clone)]
pub struct GoldenReference<W: Word> {
    words: Vec<W>,
    seal: u64,
    seed: Option<u64>,
    regenerations: u64,
}

impl<W: Word> GoldenReference<W> {
    /// Zero-filled, sealed, never-generated golden buffer of `len` elements.
    #[must_use]
    pub fn new(len: usize) -> Self {
        let words = vec![W::default(); len];
        let seal = seal_of(&words);
        Self {
            words,
            seal,
            seed: None,
            regenerations: 0,
        }
    }

    /// Recompute the buffer for `seed` and reseal it.
    ///
    /// `fill` must be a pure function of the kernel inputs produced for
    /// `seed`, so identical seeds yield bit-identical goldens. The buffer is
    /// cleared before `fill` runs.
    pub fn regenerate(&mut self, seed: u64, fill: impl FnOnce(&mut [W])) {
        self.words.fill(W::default());
        fill(&mut self.words);
        self.seal = seal_of(&self.words);
        self.seed = Some(seed);
        self.regenerations = self.regenerations.saturating_add(1);
    }

    #[must_use]
    pub fn words(&self) -> &[W] {
        &self.words
    }

    /// Raw mutable access that bypasses the seal. Writes through this slice
    /// make the golden inconsistent until the next [`Self::regenerate`].
    pub fn words_mut(&mut self) -> &mut [W] {
        &mut self.words
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Seal recorded at the last regeneration.
    #[must_use]
    pub fn seal(&self) -> u64 {
        self.seal
    }

    /// Seal of the current contents.
    #[must_use]
    pub fn current_seal(&self) -> u64 {
        seal_of(&self.words)
    }

    /// Whether the contents still match the recorded seal.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.current_seal() == self.seal
    }

    /// Seed of the last regeneration.
    #[must_use]
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    #[must_use]
    pub fn regenerations(&self) -> u64 {
        self.regenerations
    }
}

/// xxh3-64 over the little-endian encoding of `words`.
#[must_use]
pub fn seal_of<W: Word>(words: &[W]) -> u64 {
    let mut hasher = Xxh3::new();
    for word in words {
        word.hash_into(&mut hasher);
    }
    hasher.digest()
}
