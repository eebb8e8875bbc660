//! The four precompiles present since Frontier: `ECRECOVER`, `SHA256`,
//! `RIPEMD160`, `IDENTITY`. Each is a pure function of its input with a
//! linear `base + word * ceil(len/32)` gas cost.

use alloc::vec::Vec;
use core::cmp::min;

use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use primitive_types::H256;
use sha3::{Digest, Keccak256};

use crate::{linear_cost, PrecompileFailure, PurePrecompile};

pub struct EcRecover;

impl PurePrecompile for EcRecover {
	#[allow(deprecated)]
	fn execute(&self, i: &[u8]) -> Result<(Vec<u8>, u64), PrecompileFailure> {
		const COST_BASE: u64 = 3000;
		const COST_WORD: u64 = 0;
		let cost = linear_cost(i.len() as u64, COST_BASE, COST_WORD)?;

		let mut input = [0u8; 128];
		input[..min(i.len(), 128)].copy_from_slice(&i[..min(i.len(), 128)]);

		// v can only be 27 or 28 on the full 32 bytes value.
		// https://github.com/ethereum/go-ethereum/blob/a907d7e81aaeea15d80b2d3209ad8e08e3bf49e0/core/vm/contracts.go#L177
		if input[32..63] != [0u8; 31] || ![27, 28].contains(&input[63]) {
			return Ok((Vec::new(), cost));
		}

		let mut msg = [0u8; 32];
		let mut sig = [0u8; 64];

		msg[0..32].copy_from_slice(&input[0..32]);
		sig[0..32].copy_from_slice(&input[64..96]); // r
		sig[32..64].copy_from_slice(&input[96..128]); // s

		let recovered: Option<H256> = (|| {
			let mut raw_recid = input[63] - 27;
			let mut sig = Signature::from_bytes((&sig[..]).into()).ok()?;
			if let Some(sig_normalized) = sig.normalize_s() {
				sig = sig_normalized;
				raw_recid ^= 1;
			}

			let recid = RecoveryId::from_byte(raw_recid)?;
			let pubkey = VerifyingKey::recover_from_prehash(&msg[..], &sig, recid).ok()?;

			let mut address = H256::from_slice(
				Keccak256::digest(&pubkey.to_encoded_point(false).as_bytes()[1..]).as_slice(),
			);
			address.0[0..12].copy_from_slice(&[0u8; 12]);
			Some(address)
		})();

		Ok((recovered.map(|a| a.0.to_vec()).unwrap_or_default(), cost))
	}
}

pub struct Sha256;

impl PurePrecompile for Sha256 {
	fn execute(&self, input: &[u8]) -> Result<(Vec<u8>, u64), PrecompileFailure> {
		const COST_BASE: u64 = 60;
		const COST_WORD: u64 = 12;
		let cost = linear_cost(input.len() as u64, COST_BASE, COST_WORD)?;

		let mut ret = [0u8; 32];
		let hash = sha2::Sha256::digest(input);
		ret[0..32].copy_from_slice(&hash);

		Ok((ret.to_vec(), cost))
	}
}

pub struct Ripemd160;

impl PurePrecompile for Ripemd160 {
	fn execute(&self, input: &[u8]) -> Result<(Vec<u8>, u64), PrecompileFailure> {
		const COST_BASE: u64 = 600;
		const COST_WORD: u64 = 120;
		let cost = linear_cost(input.len() as u64, COST_BASE, COST_WORD)?;

		let mut ret = [0u8; 32];
		let hash = ripemd::Ripemd160::digest(input);
		ret[12..32].copy_from_slice(&hash);

		Ok((ret.to_vec(), cost))
	}
}

pub struct Identity;

impl PurePrecompile for Identity {
	fn execute(&self, input: &[u8]) -> Result<(Vec<u8>, u64), PrecompileFailure> {
		const COST_BASE: u64 = 15;
		const COST_WORD: u64 = 3;
		let cost = linear_cost(input.len() as u64, COST_BASE, COST_WORD)?;

		Ok((input.to_vec(), cost))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn identity_echoes_input() {
		let (out, cost) = Identity.execute(b"hello world").unwrap();
		assert_eq!(out, b"hello world");
		assert_eq!(cost, 15 + 3);
	}

	#[test]
	fn sha256_hashes_empty_input() {
		let (out, cost) = Sha256.execute(&[]).unwrap();
		assert_eq!(cost, 60);
		assert_eq!(
			out,
			hex_literal::hex!("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")
		);
	}

	#[test]
	fn ripemd160_pads_result_to_32_bytes() {
		let (out, _) = Ripemd160.execute(&[]).unwrap();
		assert_eq!(out.len(), 32);
		assert_eq!(&out[0..12], &[0u8; 12]);
	}

	#[test]
	fn ecrecover_rejects_malformed_v() {
		let mut input = [0u8; 128];
		input[63] = 1; // neither 27 nor 28
		let (out, _) = EcRecover.execute(&input).unwrap();
		assert!(out.is_empty());
	}
}
