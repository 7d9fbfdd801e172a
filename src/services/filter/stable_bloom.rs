//! Stable bloom filter.
//!
//! A fixed-size probabilistic set over `m` cells of `d` bits. Every insertion first
//! decrements `p` cells and then saturates the `k` cells addressed by the item, so
//! old entries age out and the fraction of non-zero cells converges to a stable
//! point instead of filling up. Memory never grows past `m` cells; the price is a
//! false-positive rate that rises towards the configured bound and an occasional
//! false negative for items inserted long ago.
//!
//! The decrement window is derived from the item hash and the insertion counter, so
//! two filters fed the same sequence of items end in byte-identical state.

use sha2::{Digest, Sha256};
use std::io::Cursor;

/// Compute the optimal number of hash functions for a target false-positive rate
pub fn optimal_k(false_positive_rate: f64) -> usize {
	(1.0 / false_positive_rate).log2().ceil() as usize
}

/// Compute the number of cells to decrement per insertion so the filter stabilises
/// at the requested false-positive rate
pub fn optimal_stable_p(m: usize, k: usize, d: u8, false_positive_rate: f64) -> usize {
	let max = 2f64.powi(d as i32) - 1.0;
	let sub_denom = (1.0 - false_positive_rate.powf(1.0 / k as f64)).powf(1.0 / max);
	let denom = (1.0 / sub_denom - 1.0) * (1.0 / k as f64 - 1.0 / m as f64);
	let p = 1.0 / denom;
	if !p.is_finite() || p < 1.0 {
		return if p.is_infinite() && p > 0.0 { m } else { 1 };
	}
	// Rounding up keeps the stable false-positive rate at or below the target
	(p.ceil() as usize).clamp(1, m)
}

fn murmur_hash(data: &[u8], seed: u32) -> u64 {
	let mut cursor = Cursor::new(data);
	// Reading from an in-memory cursor cannot fail
	murmur3::murmur3_x64_128(&mut cursor, seed).unwrap_or(0) as u64
}

/// splitmix64 finaliser, used to spread the decrement window start
fn mix(mut z: u64) -> u64 {
	z = z.wrapping_add(0x9e37_79b9_7f4a_7c15);
	z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
	z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
	z ^ (z >> 31)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StableBloomFilter {
	cells: Vec<u8>,
	/// Value a cell is set to on insertion (2^d - 1)
	max: u8,
	k: usize,
	p: usize,
	insertions: u64,
}

impl StableBloomFilter {
	/// Creates a filter with `m` cells of `d` bits each (1 <= d <= 8)
	pub fn new(m: usize, d: u8, false_positive_rate: f64) -> Self {
		let m = m.max(1);
		let d = d.clamp(1, 8);
		let k = (optimal_k(false_positive_rate) / 2).clamp(1, m);
		let max = if d == 8 { u8::MAX } else { (1u8 << d) - 1 };

		Self {
			cells: vec![0; m],
			max,
			k,
			p: optimal_stable_p(m, k, d, false_positive_rate),
			insertions: 0,
		}
	}

	/// Creates a filter with one-bit cells
	pub fn new_default(m: usize, false_positive_rate: f64) -> Self {
		Self::new(m, 1, false_positive_rate)
	}

	fn positions(&self, data: &[u8]) -> (u64, Vec<usize>) {
		let m = self.cells.len() as u64;
		let h1 = murmur_hash(data, 0);
		let h2 = murmur_hash(data, 1);
		let positions = (0..self.k as u64)
			.map(|i| (h1.wrapping_add(i.wrapping_mul(h2)) % m) as usize)
			.collect();
		(h1, positions)
	}

	/// Returns true if the item is (probably) a member
	pub fn test(&self, data: &[u8]) -> bool {
		let (_, positions) = self.positions(data);
		positions.iter().all(|&pos| self.cells[pos] > 0)
	}

	/// Inserts the item, ageing out `p` cells first
	pub fn add(&mut self, data: &[u8]) {
		let (h1, positions) = self.positions(data);
		self.decrement(h1);
		for pos in positions {
			self.cells[pos] = self.max;
		}
		self.insertions = self.insertions.wrapping_add(1);
	}

	/// Tests for membership and inserts the item in one step
	pub fn test_and_add(&mut self, data: &[u8]) -> bool {
		let member = self.test(data);
		self.add(data);
		member
	}

	fn decrement(&mut self, h1: u64) {
		let m = self.cells.len();
		let start = (mix(h1 ^ self.insertions) % m as u64) as usize;
		for i in 0..self.p {
			let idx = (start + i) % m;
			self.cells[idx] = self.cells[idx].saturating_sub(1);
		}
	}

	/// Number of cells, fixed for the lifetime of the filter
	pub fn cells(&self) -> usize {
		self.cells.len()
	}

	pub fn k(&self) -> usize {
		self.k
	}

	pub fn p(&self) -> usize {
		self.p
	}

	pub fn insertions(&self) -> u64 {
		self.insertions
	}

	/// Expected fraction of zero cells once the filter has stabilised
	pub fn stable_point(&self) -> f64 {
		let m = self.cells.len() as f64;
		let sub_denom = self.p as f64 * (1.0 / self.k as f64 - 1.0 / m);
		let denom = 1.0 + 1.0 / sub_denom;
		(1.0 / denom).powf(self.max as f64)
	}

	/// Upper bound of the false-positive rate once the filter has stabilised
	pub fn false_positive_rate(&self) -> f64 {
		(1.0 - self.stable_point()).powf(self.k as f64)
	}

	/// Clears all cells
	pub fn reset(&mut self) {
		self.cells.fill(0);
		self.insertions = 0;
	}

	/// Feeds the parameters, insertion counter and cells into a digest
	pub fn write_to(&self, hasher: &mut Sha256) {
		hasher.update((self.cells.len() as u64).to_be_bytes());
		hasher.update((self.k as u64).to_be_bytes());
		hasher.update((self.p as u64).to_be_bytes());
		hasher.update([self.max]);
		hasher.update(self.insertions.to_be_bytes());
		hasher.update(&self.cells);
	}

	/// SHA-256 digest over parameters and cells
	pub fn digest(&self) -> [u8; 32] {
		let mut hasher = Sha256::new();
		self.write_to(&mut hasher);
		hasher.finalize().into()
	}
}
