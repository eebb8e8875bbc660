//! `BLAKE2F` (EIP-152, Istanbul+): exposes the BLAKE2b compression function
//! directly so contracts can implement BLAKE2b-based protocols cheaply.

mod eip152;

use alloc::vec::Vec;

use crate::{PrecompileFailure, PurePrecompile};

pub struct Blake2F;

impl Blake2F {
	const GAS_COST_PER_ROUND: u64 = 1;
}

impl PurePrecompile for Blake2F {
	/// Format of `input`:
	/// `[4 bytes rounds][64 bytes h][128 bytes m][8 bytes t_0][8 bytes t_1][1 byte f]`
	fn execute(&self, input: &[u8]) -> Result<(Vec<u8>, u64), PrecompileFailure> {
		const BLAKE2_F_ARG_LEN: usize = 213;

		if input.len() != BLAKE2_F_ARG_LEN {
			return Err(evmx_core::ExitError::Other(
				"input length for Blake2 F precompile should be exactly 213 bytes".into(),
			)
			.into());
		}

		let mut rounds_buf: [u8; 4] = [0; 4];
		rounds_buf.copy_from_slice(&input[0..4]);
		let rounds: u32 = u32::from_be_bytes(rounds_buf);
		let cost = (rounds as u64) * Blake2F::GAS_COST_PER_ROUND;

		let mut h_buf: [u8; 64] = [0; 64];
		h_buf.copy_from_slice(&input[4..68]);
		let mut h = [0u64; 8];
		for (i, state_word) in h.iter_mut().enumerate() {
			let mut temp: [u8; 8] = Default::default();
			temp.copy_from_slice(&h_buf[(i * 8)..(i + 1) * 8]);
			*state_word = u64::from_le_bytes(temp);
		}

		let mut m_buf: [u8; 128] = [0; 128];
		m_buf.copy_from_slice(&input[68..196]);
		let mut m = [0u64; 16];
		for (i, msg_word) in m.iter_mut().enumerate() {
			let mut temp: [u8; 8] = Default::default();
			temp.copy_from_slice(&m_buf[(i * 8)..(i + 1) * 8]);
			*msg_word = u64::from_le_bytes(temp);
		}

		let mut t_0_buf: [u8; 8] = [0; 8];
		t_0_buf.copy_from_slice(&input[196..204]);
		let t_0 = u64::from_le_bytes(t_0_buf);

		let mut t_1_buf: [u8; 8] = [0; 8];
		t_1_buf.copy_from_slice(&input[204..212]);
		let t_1 = u64::from_le_bytes(t_1_buf);

		let f = match input[212] {
			1 => true,
			0 => false,
			_ => {
				return Err(
					evmx_core::ExitError::Other("incorrect final block indicator flag".into())
						.into(),
				)
			}
		};

		eip152::compress(&mut h, m, [t_0, t_1], f, rounds as usize);

		let mut output_buf = [0u8; 64];
		for (i, state_word) in h.iter().enumerate() {
			output_buf[i * 8..(i + 1) * 8].copy_from_slice(&state_word.to_le_bytes());
		}

		Ok((output_buf.to_vec(), cost))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn rejects_wrong_length_input() {
		let err = Blake2F.execute(&[0u8; 10]).unwrap_err();
		matches!(err, PrecompileFailure::Error { .. });
	}

	#[test]
	fn rejects_bad_final_flag() {
		let mut input = [0u8; 213];
		input[212] = 2;
		let err = Blake2F.execute(&input).unwrap_err();
		matches!(err, PrecompileFailure::Error { .. });
	}

	#[test]
	fn zero_rounds_costs_nothing_and_returns_64_bytes() {
		let input = [0u8; 213];
		let (out, cost) = Blake2F.execute(&input).unwrap();
		assert_eq!(cost, 0);
		assert_eq!(out.len(), 64);
	}
}
