//! The `alt_bn128` (BN254) curve precompiles — `ADD`/`MUL` (EIP-196,
//! Byzantium) and `PAIRING` (EIP-197, Byzantium), re-priced by EIP-1108
//! (Istanbul).

use alloc::vec::Vec;

use primitive_types::U256;

use crate::{PrecompileFailure, PurePrecompile};

fn read_input(source: &[u8], target: &mut [u8], offset: usize) {
	if source.len() <= offset {
		return;
	}
	let len = core::cmp::min(target.len(), source.len() - offset);
	target[..len].copy_from_slice(&source[offset..][..len]);
}

fn other(message: &str) -> evmx_core::ExitError {
	evmx_core::ExitError::Other(alloc::borrow::Cow::Owned(alloc::string::String::from(message)))
}

fn read_fr(input: &[u8], start_inx: usize) -> Result<bn::Fr, evmx_core::ExitError> {
	let mut buf = [0u8; 32];
	read_input(input, &mut buf, start_inx);

	bn::Fr::from_slice(&buf).map_err(|_| other("invalid field element"))
}

fn read_point(input: &[u8], start_inx: usize) -> Result<bn::G1, evmx_core::ExitError> {
	use bn::{AffineG1, Fq, Group, G1};

	let mut px_buf = [0u8; 32];
	let mut py_buf = [0u8; 32];
	read_input(input, &mut px_buf, start_inx);
	read_input(input, &mut py_buf, start_inx + 32);

	let px = Fq::from_slice(&px_buf).map_err(|_| other("invalid point x coordinate"))?;
	let py = Fq::from_slice(&py_buf).map_err(|_| other("invalid point y coordinate"))?;

	Ok(if px == Fq::zero() && py == Fq::zero() {
		G1::zero()
	} else {
		AffineG1::new(px, py)
			.map_err(|_| other("invalid curve point"))?
			.into()
	})
}

fn add(input: &[u8], cost: u64) -> Result<(Vec<u8>, u64), PrecompileFailure> {
	use bn::AffineG1;

	let p1 = read_point(input, 0)?;
	let p2 = read_point(input, 64)?;

	let mut buf = [0u8; 64];
	if let Some(sum) = AffineG1::from_jacobian(p1 + p2) {
		sum.x()
			.to_big_endian(&mut buf[0..32])
			.map_err(|_| other("point encoding overflow"))?;
		sum.y()
			.to_big_endian(&mut buf[32..64])
			.map_err(|_| other("point encoding overflow"))?;
	}

	Ok((buf.to_vec(), cost))
}

fn mul(input: &[u8], cost: u64) -> Result<(Vec<u8>, u64), PrecompileFailure> {
	use bn::AffineG1;

	let p = read_point(input, 0)?;
	let fr = read_fr(input, 64)?;

	let mut buf = [0u8; 64];
	if let Some(product) = AffineG1::from_jacobian(p * fr) {
		product
			.x()
			.to_big_endian(&mut buf[0..32])
			.map_err(|_| other("point encoding overflow"))?;
		product
			.y()
			.to_big_endian(&mut buf[32..64])
			.map_err(|_| other("point encoding overflow"))?;
	}

	Ok((buf.to_vec(), cost))
}

fn pairing(input: &[u8], base_cost: u64, cost_per_pairing: u64) -> Result<(Vec<u8>, u64), PrecompileFailure> {
	use bn::{pairing_batch, AffineG1, AffineG2, Fq, Fq2, Group, Gt, G1, G2};

	if input.is_empty() {
		let mut buf = [0u8; 32];
		U256::one().to_big_endian(&mut buf);
		return Ok((buf.to_vec(), base_cost));
	}

	if input.len() % 192 > 0 {
		return Err(other("bad elliptic curve pairing size").into());
	}

	let elements = input.len() / 192;
	let cost = base_cost + (elements as u64 * cost_per_pairing);

	let mut vals = Vec::new();
	for idx in 0..elements {
		let a_x = Fq::from_slice(&input[idx * 192..idx * 192 + 32])
			.map_err(|_| other("invalid a argument x coordinate"))?;
		let a_y = Fq::from_slice(&input[idx * 192 + 32..idx * 192 + 64])
			.map_err(|_| other("invalid a argument y coordinate"))?;
		let b_a_y = Fq::from_slice(&input[idx * 192 + 64..idx * 192 + 96])
			.map_err(|_| other("invalid b argument imaginary coeff x coordinate"))?;
		let b_a_x = Fq::from_slice(&input[idx * 192 + 96..idx * 192 + 128])
			.map_err(|_| other("invalid b argument imaginary coeff y coordinate"))?;
		let b_b_y = Fq::from_slice(&input[idx * 192 + 128..idx * 192 + 160])
			.map_err(|_| other("invalid b argument real coeff x coordinate"))?;
		let b_b_x = Fq::from_slice(&input[idx * 192 + 160..idx * 192 + 192])
			.map_err(|_| other("invalid b argument real coeff y coordinate"))?;

		let b_a = Fq2::new(b_a_x, b_a_y);
		let b_b = Fq2::new(b_b_x, b_b_y);
		let b = if b_a.is_zero() && b_b.is_zero() {
			G2::zero()
		} else {
			G2::from(AffineG2::new(b_a, b_b).map_err(|_| other("invalid b argument - not on curve"))?)
		};
		let a = if a_x.is_zero() && a_y.is_zero() {
			G1::zero()
		} else {
			G1::from(AffineG1::new(a_x, a_y).map_err(|_| other("invalid a argument - not on curve"))?)
		};
		vals.push((a, b));
	}

	let mul = pairing_batch(&vals);
	let ret_val = if mul == Gt::one() { U256::one() } else { U256::zero() };

	let mut buf = [0u8; 32];
	ret_val.to_big_endian(&mut buf);
	Ok((buf.to_vec(), cost))
}

pub struct Bn128AddByzantium;
impl PurePrecompile for Bn128AddByzantium {
	fn execute(&self, input: &[u8]) -> Result<(Vec<u8>, u64), PrecompileFailure> {
		add(input, 500)
	}
}

pub struct Bn128AddIstanbul;
impl PurePrecompile for Bn128AddIstanbul {
	fn execute(&self, input: &[u8]) -> Result<(Vec<u8>, u64), PrecompileFailure> {
		add(input, 150) // EIP-1108
	}
}

pub struct Bn128MulByzantium;
impl PurePrecompile for Bn128MulByzantium {
	fn execute(&self, input: &[u8]) -> Result<(Vec<u8>, u64), PrecompileFailure> {
		mul(input, 40_000)
	}
}

pub struct Bn128MulIstanbul;
impl PurePrecompile for Bn128MulIstanbul {
	fn execute(&self, input: &[u8]) -> Result<(Vec<u8>, u64), PrecompileFailure> {
		mul(input, 6_000) // EIP-1108
	}
}

pub struct Bn128PairingByzantium;
impl PurePrecompile for Bn128PairingByzantium {
	fn execute(&self, input: &[u8]) -> Result<(Vec<u8>, u64), PrecompileFailure> {
		pairing(input, 100_000, 80_000)
	}
}

pub struct Bn128PairingIstanbul;
impl PurePrecompile for Bn128PairingIstanbul {
	fn execute(&self, input: &[u8]) -> Result<(Vec<u8>, u64), PrecompileFailure> {
		pairing(input, 45_000, 34_000) // EIP-1108
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloc::vec;

	#[test]
	fn add_of_two_zero_points_is_zero_point() {
		let input = [0u8; 128];
		let (out, cost) = Bn128AddIstanbul.execute(&input).unwrap();
		assert_eq!(out, vec![0u8; 64]);
		assert_eq!(cost, 150);
	}

	#[test]
	fn pairing_of_empty_input_is_true() {
		let (out, cost) = Bn128PairingIstanbul.execute(&[]).unwrap();
		let mut expected = [0u8; 32];
		expected[31] = 1;
		assert_eq!(out, expected.to_vec());
		assert_eq!(cost, 45_000);
	}

	#[test]
	fn pairing_rejects_non_multiple_of_192() {
		let err = Bn128PairingIstanbul.execute(&[0u8; 10]).unwrap_err();
		matches!(err, PrecompileFailure::Error { .. });
	}
}
