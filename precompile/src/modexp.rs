//! `MODEXP` (EIP-198, Byzantium): arbitrary-precision modular
//! exponentiation, re-priced by EIP-2565 (Berlin).

use alloc::borrow::Cow;
use alloc::vec;
use alloc::vec::Vec;
use core::cmp::{max, min};

use primitive_types::U256;

use crate::{PrecompileFailure, PurePrecompile};

fn modexp(base: &[u8], exponent: &[u8], modulus: &[u8]) -> Vec<u8> {
	aurora_engine_modexp::modexp(base, exponent, modulus)
}

fn calculate_iteration_count(multiplier: u64, exp_length: u64, exp_highp: &U256) -> u64 {
	let iteration_count = if exp_length <= 32 && exp_highp.is_zero() {
		0
	} else if exp_length <= 32 {
		exp_highp.bits() as u64 - 1
	} else {
		multiplier
			.saturating_mul(exp_length - 32)
			.saturating_add(max(1, exp_highp.bits() as u64) - 1)
	};

	max(iteration_count, 1)
}

/// EIP-198 gas rules, active from Byzantium.
pub fn byzantium_gas_calc(base_len: u64, exp_len: u64, mod_len: u64, exp_highp: &U256) -> u64 {
	gas_calc(0, 8, 20, base_len, exp_len, mod_len, exp_highp, |max_len| -> U256 {
		// Output of this function is bounded by 2^128.
		if max_len <= 64 {
			U256::from(max_len * max_len)
		} else if max_len <= 1_024 {
			U256::from(max_len * max_len / 4 + 96 * max_len - 3_072)
		} else {
			let x = U256::from(max_len);
			let x_sq = x * x; // x < 2^64 => x*x < 2^128, no overflow.
			x_sq / U256::from(16) + U256::from(480) * x - U256::from(199_680)
		}
	})
}

/// EIP-2565 gas rules, active from Berlin.
fn berlin_gas_calc(base_len: u64, exp_len: u64, mod_len: u64, exp_highp: &U256) -> u64 {
	gas_calc(200, 8, 3, base_len, exp_len, mod_len, exp_highp, |max_len| -> U256 {
		let words = U256::from(max_len.div_ceil(8));
		words * words
	})
}

#[allow(clippy::too_many_arguments)]
fn gas_calc<F>(
	min_price: u64,
	multiplier: u64,
	gas_divisor: u64,
	base_len: u64,
	exp_len: u64,
	mod_len: u64,
	exp_highp: &U256,
	calculate_multiplication_complexity: F,
) -> u64
where
	F: Fn(u64) -> U256,
{
	let multiplication_complexity = calculate_multiplication_complexity(max(base_len, mod_len));
	let iteration_count = calculate_iteration_count(multiplier, exp_len, exp_highp);
	let gas = (multiplication_complexity * U256::from(iteration_count)) / U256::from(gas_divisor);

	if gas > U256::from(u64::MAX) {
		u64::MAX
	} else {
		max(min_price, gas.as_u64())
	}
}

#[inline]
fn right_pad_with_offset<const LEN: usize>(data: &[u8], offset: usize) -> Cow<'_, [u8; LEN]> {
	right_pad(data.get(offset..).unwrap_or_default())
}

#[inline]
fn right_pad<const LEN: usize>(data: &[u8]) -> Cow<'_, [u8; LEN]> {
	if let Some(data) = data.get(..LEN) {
		Cow::Borrowed(data.try_into().unwrap())
	} else {
		let mut padded = [0; LEN];
		padded[..data.len()].copy_from_slice(data);
		Cow::Owned(padded)
	}
}

#[inline]
fn right_pad_vec(data: &[u8], len: usize) -> Cow<'_, [u8]> {
	if let Some(data) = data.get(..len) {
		Cow::Borrowed(data)
	} else {
		let mut padded = vec![0; len];
		padded[..data.len()].copy_from_slice(data);
		Cow::Owned(padded)
	}
}

#[inline]
fn left_pad<const LEN: usize>(data: &[u8]) -> Cow<'_, [u8; LEN]> {
	if let Some(data) = data.get(..LEN) {
		Cow::Borrowed(data.try_into().unwrap())
	} else {
		let mut padded = [0; LEN];
		padded[LEN - data.len()..].copy_from_slice(data);
		Cow::Owned(padded)
	}
}

#[inline]
fn left_pad_vec(data: &[u8], len: usize) -> Cow<'_, [u8]> {
	if let Some(data) = data.get(..len) {
		Cow::Borrowed(data)
	} else {
		let mut padded = vec![0; len];
		padded[len - data.len()..].copy_from_slice(data);
		Cow::Owned(padded)
	}
}

fn execute(
	input: &[u8],
	gas_calc: fn(u64, u64, u64, &U256) -> u64,
) -> Result<(Vec<u8>, u64), PrecompileFailure> {
	// Layout: <len(BASE)> <len(EXPONENT)> <len(MODULUS)> <BASE> <EXPONENT> <MODULUS>,
	// each length a 32-byte left-padded integer.
	const HEADER_LENGTH: usize = 96;

	let base_len = U256::from_big_endian(&right_pad_with_offset::<32>(input, 0).into_owned());
	let exp_len = U256::from_big_endian(&right_pad_with_offset::<32>(input, 32).into_owned());
	let mod_len = U256::from_big_endian(&right_pad_with_offset::<32>(input, 64).into_owned());

	let base_len = usize::try_from(base_len).map_err(|_| evmx_core::ExitError::OutOfGas)?;
	let mod_len = usize::try_from(mod_len).map_err(|_| evmx_core::ExitError::OutOfGas)?;
	// Exponent length may legitimately exceed usize; gas calc rejects it via overflow to MAX.
	let exp_len = usize::try_from(exp_len).unwrap_or(usize::MAX);

	let exp_highp_len = min(exp_len, 32);
	let input = input.get(HEADER_LENGTH..).unwrap_or_default();

	let exp_highp = {
		let right_padded_highp = right_pad_with_offset::<32>(input, base_len);
		let out = left_pad::<32>(&right_padded_highp[..exp_highp_len]);
		U256::from_big_endian(&out.into_owned())
	};

	let cost = gas_calc(base_len as u64, exp_len as u64, mod_len as u64, &exp_highp);

	if base_len == 0 && mod_len == 0 {
		return Ok((Vec::new(), cost));
	}

	let input_len = base_len.saturating_add(exp_len).saturating_add(mod_len);
	let input = right_pad_vec(input, input_len);
	let (base, input) = input.split_at(base_len);
	let (exponent, modulus) = input.split_at(exp_len);
	debug_assert_eq!(modulus.len(), mod_len);

	let output = modexp(base, exponent, modulus);

	Ok((left_pad_vec(&output, mod_len).into_owned(), cost))
}

pub struct ModexpByzantium;

impl PurePrecompile for ModexpByzantium {
	fn execute(&self, input: &[u8]) -> Result<(Vec<u8>, u64), PrecompileFailure> {
		execute(input, byzantium_gas_calc)
	}
}

pub struct ModexpBerlin;

impl PurePrecompile for ModexpBerlin {
	fn execute(&self, input: &[u8]) -> Result<(Vec<u8>, u64), PrecompileFailure> {
		execute(input, berlin_gas_calc)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn zero_length_base_and_modulus_is_free_of_computation() {
		let input = [0u8; 96];
		let (out, _) = ModexpBerlin.execute(&input).unwrap();
		assert!(out.is_empty());
	}

	#[test]
	fn berlin_charges_less_than_byzantium_for_small_inputs() {
		let mut input = vec![0u8; 96 + 3];
		input[31] = 1; // base_len = 1
		input[63] = 1; // exp_len = 1
		input[95] = 1; // mod_len = 1
		input[96] = 2; // base = 2
		input[97] = 2; // exponent = 2
		input[98] = 5; // modulus = 5

		let (_, byzantium_cost) = ModexpByzantium.execute(&input).unwrap();
		let (_, berlin_cost) = ModexpBerlin.execute(&input).unwrap();
		assert!(berlin_cost <= byzantium_cost);
	}
}
