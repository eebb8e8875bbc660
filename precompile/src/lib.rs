//! Standard precompiled contracts (§4.8): fixed-address "opcodes" an
//! executor dispatches to instead of running bytecode. Each one is a pure
//! function of its input and the active fork's feature flags — no access
//! to storage or the call stack beyond what `PrecompileHandle` exposes.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod blake2;
mod bls12_381;
mod bn128;
mod kzg;
mod modexp;
mod simple;

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use evmx_core::{ExitError, ExitFatal, ExitRevert, ExitSucceed};
use evmx_runtime::{CallScheme, Context};
use primitive_types::{H160, H256};

/// Data returned by a precompile on success.
#[derive(Debug, Eq, PartialEq, Clone)]
pub struct PrecompileOutput {
	pub exit_status: ExitSucceed,
	pub output: Vec<u8>,
}

/// Data returned by a precompile on failure. Mirrors `ExitReason`'s three
/// non-success branches, since a precompile can revert or err exactly like
/// contract bytecode can.
#[derive(Debug, Eq, PartialEq, Clone)]
pub enum PrecompileFailure {
	Error { exit_status: ExitError },
	Revert { exit_status: ExitRevert, output: Vec<u8> },
	Fatal { exit_status: ExitFatal },
}

impl From<ExitError> for PrecompileFailure {
	fn from(error: ExitError) -> PrecompileFailure {
		PrecompileFailure::Error { exit_status: error }
	}
}

pub type PrecompileResult = Result<PrecompileOutput, PrecompileFailure>;

/// The view into the enclosing call frame a precompile needs: enough to
/// charge gas against the caller's gasometer and to recurse into a nested
/// `CALL` (no precompile in the standard set actually does the latter, but
/// the surface is here for a custom set that wants to).
pub trait PrecompileHandle {
	#[allow(clippy::too_many_arguments)]
	fn call(
		&mut self,
		to: H160,
		transfer: Option<evmx_runtime::Transfer>,
		input: Vec<u8>,
		gas_limit: Option<u64>,
		is_static: bool,
		context: &Context,
	) -> (evmx_core::ExitReason, Vec<u8>);

	fn record_cost(&mut self, cost: u64) -> Result<(), ExitError>;
	fn remaining_gas(&self) -> u64;
	fn log(&mut self, address: H160, topics: Vec<H256>, data: Vec<u8>) -> Result<(), ExitError>;
	fn code_address(&self) -> H160;
	fn input(&self) -> &[u8];
	fn context(&self) -> &Context;
	fn is_static(&self) -> bool;
	fn gas_limit(&self) -> Option<u64>;
}

/// A dispatch table of precompiled contracts, keyed by address. Kept as a
/// trait (rather than a hardcoded `match` in the executor) so a downstream
/// chain can add, remove, or fork-gate precompiles without forking the
/// executor itself.
pub trait PrecompileSet {
	fn execute(&self, handle: &mut impl PrecompileHandle) -> Option<PrecompileResult>;

	/// Whether `address` names a precompile. Only meaningful as a
	/// standalone check (e.g. for `EXTCODESIZE`/access-list warming) —
	/// `execute` already performs this check internally.
	fn is_precompile(&self, address: H160) -> bool;
}

impl PrecompileSet for () {
	fn execute(&self, _handle: &mut impl PrecompileHandle) -> Option<PrecompileResult> {
		None
	}

	fn is_precompile(&self, _address: H160) -> bool {
		false
	}
}

/// A precompile expressed as a plain function: input, requested gas limit,
/// context, staticness in; output and its cost out. Lets
/// `BTreeMap<H160, PrecompileFn>` serve as a ready-made `PrecompileSet`.
pub type PrecompileFn =
	fn(&[u8], Option<u64>, &Context, bool) -> Result<(PrecompileOutput, u64), PrecompileFailure>;

impl PrecompileSet for BTreeMap<H160, PrecompileFn> {
	fn execute(&self, handle: &mut impl PrecompileHandle) -> Option<PrecompileResult> {
		let address = handle.code_address();
		let precompile = self.get(&address)?;

		let input = handle.input().to_vec();
		let gas_limit = handle.gas_limit();
		let context = handle.context().clone();
		let is_static = handle.is_static();

		Some(match (*precompile)(&input, gas_limit, &context, is_static) {
			Ok((output, cost)) => handle.record_cost(cost).map(|()| output).map_err(Into::into),
			Err(err) => Err(err),
		})
	}

	fn is_precompile(&self, address: H160) -> bool {
		self.contains_key(&address)
	}
}

trait PurePrecompile {
	fn execute(&self, input: &[u8]) -> Result<(Vec<u8>, u64), PrecompileFailure>;
}

fn linear_cost(len: u64, base: u64, word: u64) -> Result<u64, ExitError> {
	let cost = base
		.checked_add(word.checked_mul(len.saturating_add(31) / 32).ok_or(ExitError::OutOfGas)?)
		.ok_or(ExitError::OutOfGas)?;
	Ok(cost)
}

const fn address(last: u8) -> H160 {
	H160([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, last])
}

/// Whether `scheme` carries value — unused by any standard precompile
/// today, kept to round out `PrecompileHandle::call`'s signature for a
/// custom set that recurses.
#[allow(dead_code)]
fn is_value_transferring(scheme: CallScheme) -> bool {
	matches!(scheme, CallScheme::Call | CallScheme::CallCode)
}

/// The precompile set active on Ethereum mainnet, gated by the fork flags
/// each precompile's activation EIP introduced.
pub struct StandardPrecompileSet {
	pub byzantium: bool,
	pub istanbul: bool,
	pub berlin: bool,
	pub cancun: bool,
	pub prague: bool,
}

impl StandardPrecompileSet {
	pub fn for_fork(config: &evmx_runtime::Config) -> Self {
		use evmx_runtime::Fork;
		Self {
			byzantium: config.fork >= Fork::Byzantium,
			istanbul: config.fork >= Fork::Istanbul,
			berlin: config.fork >= Fork::Berlin,
			cancun: config.fork >= Fork::Cancun,
			prague: config.fork >= Fork::Prague,
		}
	}
}

impl PrecompileSet for StandardPrecompileSet {
	fn execute(&self, handle: &mut impl PrecompileHandle) -> Option<PrecompileResult> {
		let addr = handle.code_address();
		let input = handle.input().to_vec();

		let (result, cost) = if addr == address(1) {
			run(&simple::EcRecover, &input)
		} else if addr == address(2) {
			run(&simple::Sha256, &input)
		} else if addr == address(3) {
			run(&simple::Ripemd160, &input)
		} else if addr == address(4) {
			run(&simple::Identity, &input)
		} else if addr == address(5) {
			if self.berlin {
				run(&modexp::ModexpBerlin, &input)
			} else {
				run(&modexp::ModexpByzantium, &input)
			}
		} else if addr == address(6) && self.byzantium {
			if self.istanbul {
				run(&bn128::Bn128AddIstanbul, &input)
			} else {
				run(&bn128::Bn128AddByzantium, &input)
			}
		} else if addr == address(7) && self.byzantium {
			if self.istanbul {
				run(&bn128::Bn128MulIstanbul, &input)
			} else {
				run(&bn128::Bn128MulByzantium, &input)
			}
		} else if addr == address(8) && self.byzantium {
			if self.istanbul {
				run(&bn128::Bn128PairingIstanbul, &input)
			} else {
				run(&bn128::Bn128PairingByzantium, &input)
			}
		} else if addr == address(9) && self.istanbul {
			run(&blake2::Blake2F, &input)
		} else if addr == address(10) && self.cancun {
			run(&kzg::KzgPointEvaluation, &input)
		} else if self.prague && bls12_381::is_bls_address(addr) {
			bls12_381::execute(addr, &input)
		} else {
			return None;
		};

		match result {
			Ok(output) => {
				if let Err(e) = handle.record_cost(cost) {
					return Some(Err(e.into()));
				}
				Some(Ok(PrecompileOutput {
					exit_status: ExitSucceed::Returned,
					output,
				}))
			}
			Err(failure) => Some(Err(failure)),
		}
	}

	fn is_precompile(&self, address: H160) -> bool {
		let last = address.0[19];
		let leading_zero = address.0[..19].iter().all(|b| *b == 0);
		if !leading_zero {
			return self.prague && bls12_381::is_bls_address(address);
		}
		match last {
			1..=4 => true,
			5 => true,
			6 | 7 => self.byzantium,
			8 => self.byzantium,
			9 => self.istanbul,
			10 => self.cancun,
			_ => false,
		}
	}
}

fn run<P: PurePrecompile>(p: &P, input: &[u8]) -> (Result<Vec<u8>, PrecompileFailure>, u64) {
	match p.execute(input) {
		Ok((output, cost)) => (Ok(output), cost),
		Err(failure) => (Err(failure), 0),
	}
}
