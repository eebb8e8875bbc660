//! `POINT_EVALUATION` (EIP-4844, Cancun): verifies a KZG opening proof
//! against a blob's versioned hash, using the Arkworks BLS12-381 stack.

use alloc::vec::Vec;
use core::ops::Neg;

use ark_bls12_381::{Bls12_381, Fr, G1Affine, G2Affine};
use ark_ec::pairing::Pairing;
use ark_ec::{AffineRepr, CurveGroup};
use ark_ff::{BigInteger, One, PrimeField};
use ark_serialize::CanonicalDeserialize;
use sha2::Digest;

use crate::{PrecompileFailure, PurePrecompile};

pub const GAS_COST: u64 = 50_000;
pub const VERSIONED_HASH_VERSION_KZG: u8 = 0x01;

/// `U256(FIELD_ELEMENTS_PER_BLOB).to_be_bytes() ++ BLS_MODULUS.to_bytes32()`
pub const RETURN_VALUE: &[u8; 64] = &hex_literal::hex!(
	"0000000000000000000000000000000000000000000000000000000000001000"
	"73eda753299d7d483339d80809a1d80553bda402fffe5bfeffffffff00000001"
);

pub struct KzgPointEvaluation;

impl PurePrecompile for KzgPointEvaluation {
	fn execute(&self, input: &[u8]) -> Result<(Vec<u8>, u64), PrecompileFailure> {
		run(input).map(|out| (out, GAS_COST))
	}
}

fn other(message: &str) -> PrecompileFailure {
	evmx_core::ExitError::Other(alloc::borrow::Cow::Owned(alloc::string::String::from(message)))
		.into()
}

/// Input layout: `| versioned_hash (32) | z (32) | y (32) | commitment (48) | proof (48) |`,
/// `z`/`y` big-endian padded scalars.
fn run(input: &[u8]) -> Result<Vec<u8>, PrecompileFailure> {
	if input.len() != 192 {
		return Err(other("invalid point evaluation input length"));
	}

	let versioned_hash = &input[..32];
	let commitment = &input[96..144];
	if kzg_to_versioned_hash(commitment) != versioned_hash {
		return Err(other("commitment does not match versioned hash"));
	}

	let commitment: &[u8; 48] = commitment.try_into().unwrap();
	let z = input[32..64].try_into().unwrap();
	let y = input[64..96].try_into().unwrap();
	let proof = input[144..192].try_into().unwrap();

	if verify_kzg_proof(commitment, z, y, proof) {
		Ok(RETURN_VALUE.to_vec())
	} else {
		Err(other("kzg proof verification failed"))
	}
}

/// `VERSIONED_HASH_VERSION_KZG ++ sha256(commitment)[1..]`
#[inline]
pub fn kzg_to_versioned_hash(commitment: &[u8]) -> [u8; 32] {
	let mut hash: [u8; 32] = sha2::Sha256::digest(commitment).into();
	hash[0] = VERSIONED_HASH_VERSION_KZG;
	hash
}

/// <https://github.com/ethereum/consensus-specs/blob/master/specs/deneb/polynomial-commitments.md#verify_kzg_proof_impl>
#[inline]
fn verify_kzg_proof(commitment: &[u8; 48], z: &[u8; 32], y: &[u8; 32], proof: &[u8; 48]) -> bool {
	let Ok(commitment_point) = parse_g1_compressed(commitment) else {
		return false;
	};
	let Ok(proof_point) = parse_g1_compressed(proof) else {
		return false;
	};
	let Ok(z_fr) = read_scalar_canonical(z) else {
		return false;
	};
	let Ok(y_fr) = read_scalar_canonical(y) else {
		return false;
	};

	let tau_g2 = get_trusted_setup_g2();
	let g1 = G1Affine::generator();
	let g2 = G2Affine::generator();

	let y_g1 = p1_scalar_mul(&g1, &y_fr);
	let p_minus_y = p1_sub_affine(&commitment_point, &y_g1);

	let z_g2 = p2_scalar_mul(&g2, &z_fr);
	let x_minus_z = p2_sub_affine(&tau_g2, &z_g2);

	let neg_g2 = g2.neg();

	pairing_check(&[(p_minus_y, neg_g2), (proof_point, x_minus_z)])
}

fn get_trusted_setup_g2() -> G2Affine {
	G2Affine::deserialize_compressed_unchecked(&TRUSTED_SETUP_TAU_G2_BYTES[..])
		.expect("trusted setup G2 point is a fixed, known-valid constant")
}

fn parse_g1_compressed(bytes: &[u8; 48]) -> Result<G1Affine, PrecompileFailure> {
	G1Affine::deserialize_compressed(&bytes[..]).map_err(|_| other("invalid compressed G1 point"))
}

fn read_scalar_canonical(bytes: &[u8; 32]) -> Result<Fr, PrecompileFailure> {
	let fr = Fr::from_be_bytes_mod_order(bytes);
	let bytes_roundtrip = fr.into_bigint().to_bytes_be();

	if bytes_roundtrip.as_slice() != bytes {
		return Err(other("non-canonical scalar field element"));
	}

	Ok(fr)
}

#[inline]
fn p1_scalar_mul(point: &G1Affine, scalar: &Fr) -> G1Affine {
	point.mul_bigint(scalar.into_bigint()).into_affine()
}

#[inline]
fn p2_scalar_mul(point: &G2Affine, scalar: &Fr) -> G2Affine {
	point.mul_bigint(scalar.into_bigint()).into_affine()
}

#[inline]
fn p1_sub_affine(a: &G1Affine, b: &G1Affine) -> G1Affine {
	(a.into_group() - b.into_group()).into_affine()
}

#[inline]
fn p2_sub_affine(a: &G2Affine, b: &G2Affine) -> G2Affine {
	(a.into_group() - b.into_group()).into_affine()
}

/// Trusted setup G2 point `[τ]₂` from the Ethereum KZG ceremony (compressed),
/// `g2_monomial_1` from `trusted_setup_4096.json`.
const TRUSTED_SETUP_TAU_G2_BYTES: [u8; 96] = hex_literal::hex!(
	"b5bfd7dd8cdeb128843bc287230af38926187075cbfbefa81009a2ce615ac53d2914e5870cb452d2afaaab24f3499f72185cbfee53492714734429b7b38608e23926c911cceceac9a36851477ba4c60b087041de621000edc98edada20c1def2"
);

#[inline]
fn pairing_check(pairs: &[(G1Affine, G2Affine)]) -> bool {
	if pairs.is_empty() {
		return true;
	}

	let (g1_points, g2_points): (Vec<G1Affine>, Vec<G2Affine>) = pairs.iter().copied().unzip();
	let pairing_result = Bls12_381::multi_pairing(&g1_points, &g2_points);
	pairing_result.0.is_one()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn rejects_wrong_length_input() {
		let err = KzgPointEvaluation.execute(&[0u8; 10]).unwrap_err();
		matches!(err, PrecompileFailure::Error { .. });
	}

	#[test]
	fn rejects_mismatched_versioned_hash() {
		let input = [0u8; 192];
		let err = KzgPointEvaluation.execute(&input).unwrap_err();
		matches!(err, PrecompileFailure::Error { .. });
	}
}
