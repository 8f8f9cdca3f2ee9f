//! AES-128 known-answer kernel.
//!
//! One iteration loads a NIST AESAVS vector, checks the loaded plaintext
//! (`S`), encrypts it (`E`), and decrypts it back with an independent copy of
//! the key (`D`). The seed selects the vector, so a change rate of 1 walks
//! the whole table.
//!
//! The cipher is implemented here rather than pulled from a crate because it
//! is the workload under test: its tables and round loop must live in the
//! benchmark's own memory image.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use seubench_core::{HeaderField, Kernel, Stage, tags};

pub const BLOCK: usize = 16;
const ROUNDS: usize = 10;

// ---------------------------------------------------------------------------
// Cipher
// ---------------------------------------------------------------------------

struct Tables {
    sbox: [u8; 256],
    inv_sbox: [u8; 256],
}

static TABLES: OnceLock<Tables> = OnceLock::new();

fn tables() -> &'static Tables {
    TABLES.get_or_init(build_tables)
}

const fn xtime(b: u8) -> u8 {
    (b << 1) ^ if b & 0x80 != 0 { 0x1b } else { 0 }
}

const fn gmul(mut a: u8, mut b: u8) -> u8 {
    let mut product = 0;
    while b != 0 {
        if b & 1 != 0 {
            product ^= a;
        }
        a = xtime(a);
        b >>= 1;
    }
    product
}

/// S-box from the GF(2^8) inverse followed by the affine transform.
fn build_tables() -> Tables {
    let mut sbox = [0_u8; 256];
    let mut inv_sbox = [0_u8; 256];
    for x in 0..=255_u8 {
        let inverse = if x == 0 {
            0
        } else {
            (1..=255_u8).find(|&y| gmul(x, y) == 1).unwrap_or(0)
        };
        let s = inverse
            ^ inverse.rotate_left(1)
            ^ inverse.rotate_left(2)
            ^ inverse.rotate_left(3)
            ^ inverse.rotate_left(4)
            ^ 0x63;
        sbox[x as usize] = s;
        inv_sbox[s as usize] = x;
    }
    Tables { sbox, inv_sbox }
}

/// Round keys for AES-128.
pub fn expand_key(key: &[u8; BLOCK]) -> [[u8; BLOCK]; ROUNDS + 1] {
    let sbox = &tables().sbox;
    let mut words = [[0_u8; 4]; 4 * (ROUNDS + 1)];
    for (i, word) in words.iter_mut().take(4).enumerate() {
        word.copy_from_slice(&key[4 * i..4 * i + 4]);
    }
    let mut rcon = 1_u8;
    for i in 4..words.len() {
        let mut temp = words[i - 1];
        if i % 4 == 0 {
            temp = [
                sbox[temp[1] as usize] ^ rcon,
                sbox[temp[2] as usize],
                sbox[temp[3] as usize],
                sbox[temp[0] as usize],
            ];
            rcon = xtime(rcon);
        }
        for j in 0..4 {
            words[i][j] = words[i - 4][j] ^ temp[j];
        }
    }

    let mut round_keys = [[0_u8; BLOCK]; ROUNDS + 1];
    for (round, round_key) in round_keys.iter_mut().enumerate() {
        for column in 0..4 {
            round_key[4 * column..4 * column + 4].copy_from_slice(&words[4 * round + column]);
        }
    }
    round_keys
}

fn add_round_key(state: &mut [u8; BLOCK], round_key: &[u8; BLOCK]) {
    for (byte, key) in state.iter_mut().zip(round_key) {
        *byte ^= key;
    }
}

fn sub_bytes(state: &mut [u8; BLOCK], table: &[u8; 256]) {
    for byte in state.iter_mut() {
        *byte = table[*byte as usize];
    }
}

// State is column-major: byte `4 * column + row`.
fn shift_rows(state: &mut [u8; BLOCK]) {
    let old = *state;
    for column in 0..4 {
        for row in 1..4 {
            state[4 * column + row] = old[4 * ((column + row) % 4) + row];
        }
    }
}

fn inv_shift_rows(state: &mut [u8; BLOCK]) {
    let old = *state;
    for column in 0..4 {
        for row in 1..4 {
            state[4 * column + row] = old[4 * ((column + 4 - row) % 4) + row];
        }
    }
}

fn mix_columns(state: &mut [u8; BLOCK]) {
    for column in state.chunks_exact_mut(4) {
        let [a0, a1, a2, a3] = [column[0], column[1], column[2], column[3]];
        column[0] = gmul(a0, 2) ^ gmul(a1, 3) ^ a2 ^ a3;
        column[1] = a0 ^ gmul(a1, 2) ^ gmul(a2, 3) ^ a3;
        column[2] = a0 ^ a1 ^ gmul(a2, 2) ^ gmul(a3, 3);
        column[3] = gmul(a0, 3) ^ a1 ^ a2 ^ gmul(a3, 2);
    }
}

fn inv_mix_columns(state: &mut [u8; BLOCK]) {
    for column in state.chunks_exact_mut(4) {
        let [a0, a1, a2, a3] = [column[0], column[1], column[2], column[3]];
        column[0] = gmul(a0, 14) ^ gmul(a1, 11) ^ gmul(a2, 13) ^ gmul(a3, 9);
        column[1] = gmul(a0, 9) ^ gmul(a1, 14) ^ gmul(a2, 11) ^ gmul(a3, 13);
        column[2] = gmul(a0, 13) ^ gmul(a1, 9) ^ gmul(a2, 14) ^ gmul(a3, 11);
        column[3] = gmul(a0, 11) ^ gmul(a1, 13) ^ gmul(a2, 9) ^ gmul(a3, 14);
    }
}

/// Encrypt one block in place.
pub fn encrypt_block(state: &mut [u8; BLOCK], key: &[u8; BLOCK]) {
    let round_keys = expand_key(key);
    let sbox = &tables().sbox;
    add_round_key(state, &round_keys[0]);
    for (round, round_key) in round_keys.iter().enumerate().skip(1) {
        sub_bytes(state, sbox);
        shift_rows(state);
        if round != ROUNDS {
            mix_columns(state);
        }
        add_round_key(state, round_key);
    }
}

/// Decrypt one block in place.
pub fn decrypt_block(state: &mut [u8; BLOCK], key: &[u8; BLOCK]) {
    let round_keys = expand_key(key);
    let inv_sbox = &tables().inv_sbox;
    add_round_key(state, &round_keys[ROUNDS]);
    for round in (1..ROUNDS).rev() {
        inv_shift_rows(state);
        sub_bytes(state, inv_sbox);
        add_round_key(state, &round_keys[round]);
        inv_mix_columns(state);
    }
    inv_shift_rows(state);
    sub_bytes(state, inv_sbox);
    add_round_key(state, &round_keys[0]);
}

// ---------------------------------------------------------------------------
// Known-answer vectors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnownAnswer {
    pub key: [u8; BLOCK],
    pub plaintext: [u8; BLOCK],
    pub ciphertext: [u8; BLOCK],
}

const fn nibble(digit: u8) -> u8 {
    match digit {
        b'0'..=b'9' => digit - b'0',
        b'a'..=b'f' => digit - b'a' + 10,
        _ => panic!("block literals use lowercase hex"),
    }
}

const fn hex(text: &str) -> [u8; BLOCK] {
    let digits = text.as_bytes();
    assert!(digits.len() == 2 * BLOCK, "block literals are 32 hex digits");
    let mut out = [0_u8; BLOCK];
    let mut i = 0;
    while i < BLOCK {
        out[i] = (nibble(digits[2 * i]) << 4) | nibble(digits[2 * i + 1]);
        i += 1;
    }
    out
}

const fn kat(key: &str, plaintext: &str, ciphertext: &str) -> KnownAnswer {
    KnownAnswer {
        key: hex(key),
        plaintext: hex(plaintext),
        ciphertext: hex(ciphertext),
    }
}

const ZERO: &str = "00000000000000000000000000000000";

const GF_SBOX: [KnownAnswer; 7] = [
    kat(ZERO, "f34481ec3cc627bacd5dc3fb08f273e6", "0336763e966d92595a567cc9ce537f5e"),
    kat(ZERO, "9798c4640bad75c7c3227db910174e72", "a9a1631bf4996954ebc093957b234589"),
    kat(ZERO, "96ab5c2ff612d9dfaae8c31f30c42168", "ff4f8391a6a40ca5b25d23bedd44a597"),
    kat(ZERO, "6a118a874519e64e9963798a503f1d35", "dc43be40be0e53712f7e2bf5ca707209"),
    kat(ZERO, "cb9fceec81286ca3e989bd979b0cb284", "92beedab1895a94faa69b632e5cc47ce"),
    kat(ZERO, "b26aeb1874e47ca8358ff22378f09144", "459264f4798f6a78bacb89c15ed3d601"),
    kat(ZERO, "58c8e00b2631686d54eab84b91f0aca1", "08a4e2efec8a8e3312ca7460b9040bbf"),
];

const KEY_SBOX: [KnownAnswer; 2] = [
    kat("10a58869d74be5a374cf867cfb473859", ZERO, "6d251e6944b051e04eaa6fb4dbf78465"),
    kat("caea65cdbb75e9169ecd22ebe6e54675", ZERO, "6e29201190152df4ee058139def610bb"),
];

const VAR_KEY: [KnownAnswer; 3] = [
    kat("80000000000000000000000000000000", ZERO, "0edd33d3c621e546455bd8ba1418bec8"),
    kat("c0000000000000000000000000000000", ZERO, "4bc3f883450c113c64ca42e1112a9e87"),
    kat("e0000000000000000000000000000000", ZERO, "72a1da770f5d7ac4c9ef94d822affd97"),
];

const VAR_TXT: [KnownAnswer; 3] = [
    kat(ZERO, "80000000000000000000000000000000", "3ad78e726c1ec02b7ebfe92b23d9ec34"),
    kat(ZERO, "c0000000000000000000000000000000", "aae5939c8efdf2f04e60b9fe7117b2c2"),
    kat(ZERO, "e0000000000000000000000000000000", "f031d4d74f5dcbf39daaf8ca3af6e527"),
];

/// AESAVS known-answer suites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AesSuite {
    GfSbox,
    KeySbox,
    VarKey,
    VarTxt,
}

impl AesSuite {
    /// Suites in the order the benchmark walks them.
    pub const ALL: [Self; 4] = [Self::GfSbox, Self::KeySbox, Self::VarKey, Self::VarTxt];

    #[must_use]
    pub fn vectors(self) -> &'static [KnownAnswer] {
        match self {
            Self::GfSbox => &GF_SBOX,
            Self::KeySbox => &KEY_SBOX,
            Self::VarKey => &VAR_KEY,
            Self::VarTxt => &VAR_TXT,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::GfSbox => "gfsbox",
            Self::KeySbox => "keysbox",
            Self::VarKey => "varkey",
            Self::VarTxt => "vartxt",
        }
    }
}

// ---------------------------------------------------------------------------
// Kernel
// ---------------------------------------------------------------------------

const SLOT_PLAIN: usize = 0;
const SLOT_CIPHER: usize = 1;

const STAGES: [Stage; 3] = [
    Stage::new(tags::PRE_CHECK, SLOT_PLAIN),
    Stage::new(tags::POST_OPERATION, SLOT_CIPHER),
    Stage::new(tags::POST_REPAIR, SLOT_PLAIN),
];

/// Known-answer test over the selected suites.
///
/// Encryption and decryption use separate key buffers, so a flipped bit in
/// one key shows up in exactly one stage.
#[derive(Debug, Clone)]
pub struct AesKat {
    vectors: Vec<KnownAnswer>,
    current: usize,
    key: [u8; BLOCK],
    key2: [u8; BLOCK],
    input: [u8; BLOCK],
}

impl AesKat {
    /// Kernel over `suites`, in the given order. An empty list selects all.
    #[must_use]
    pub fn new(suites: &[AesSuite]) -> Self {
        let suites = if suites.is_empty() {
            &AesSuite::ALL[..]
        } else {
            suites
        };
        let vectors = suites
            .iter()
            .flat_map(|suite| suite.vectors().iter().copied())
            .collect();
        Self {
            vectors,
            current: 0,
            key: [0; BLOCK],
            key2: [0; BLOCK],
            input: [0; BLOCK],
        }
    }

    #[must_use]
    pub fn vector_count(&self) -> usize {
        self.vectors.len()
    }

    /// Index of the vector loaded by the last regeneration.
    #[must_use]
    pub fn current(&self) -> usize {
        self.current
    }

    fn vector(&self) -> &KnownAnswer {
        &self.vectors[self.current]
    }
}

impl Default for AesKat {
    fn default() -> Self {
        Self::new(&AesSuite::ALL)
    }
}

impl Kernel for AesKat {
    type Word = u8;

    fn name(&self) -> &'static str {
        "aes"
    }

    fn header_fields(&self) -> Vec<HeaderField> {
        vec![HeaderField::new("vectors", self.vectors.len())]
    }

    fn output_len(&self) -> usize {
        BLOCK
    }

    fn stages(&self) -> &[Stage] {
        &STAGES
    }

    fn golden_slots(&self) -> usize {
        2
    }

    fn generate_inputs(&mut self, seed: u64) {
        self.current = (seed % self.vectors.len() as u64) as usize;
        let vector = *self.vector();
        self.key = vector.key;
        self.key2 = vector.key;
        self.input = vector.plaintext;
    }

    fn expected_outputs(&self, slot: usize, out: &mut [u8]) {
        let vector = self.vector();
        let source = if slot == SLOT_CIPHER {
            &vector.ciphertext
        } else {
            &vector.plaintext
        };
        out.copy_from_slice(source);
    }

    fn run(&mut self, stage: usize, output: &mut [u8]) {
        let Ok(block) = <&mut [u8; BLOCK]>::try_from(output) else {
            return;
        };
        match stage {
            0 => *block = self.input,
            1 => encrypt_block(block, &self.key),
            _ => decrypt_block(block, &self.key2),
        }
    }

    fn input_words(&self) -> usize {
        3 * BLOCK
    }

    fn flip_input_bit(&mut self, word: usize, bit: u32) -> bool {
        let buffer = match word / BLOCK {
            0 => &mut self.key,
            1 => &mut self.key2,
            2 => &mut self.input,
            _ => return false,
        };
        buffer[word % BLOCK] ^= 1 << (bit % 8);
        true
    }
}
