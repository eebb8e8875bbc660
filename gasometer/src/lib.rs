#![cfg_attr(not(feature = "std"), no_std)]
//! Gas accounting (§4.4): fixed and dynamic per-opcode costs, memory
//! expansion pricing (Yellow Paper §H), and the end-of-transaction refund
//! cap. Depends on `evmx-runtime` only for `Config`'s fork-indexed cost
//! table — it knows nothing about the `Handler`/`Ledger` traits themselves.

extern crate alloc;

mod consts;
pub mod costs;
mod memory;
pub mod tracing;
mod utils;

pub use evmx_runtime::Config;

use evmx_core::{ExitError, Opcode, Stack};
use primitive_types::{H256, U256};

/// Tracks remaining gas and the refund counter for one frame. Once an
/// `ExitError` has occurred every subsequent call returns the same error
/// without touching the counters further — callers don't need to
/// special-case "already failed".
pub struct Gasometer<'config> {
	gas_limit: u64,
	state: Result<Inner<'config>, ExitError>,
}

struct Inner<'config> {
	used_gas: u64,
	memory_gas: u64,
	memory_words: usize,
	refunded_gas: i64,
	config: &'config Config,
}

impl<'config> Gasometer<'config> {
	pub fn new(gas_limit: u64, config: &'config Config) -> Self {
		Self {
			gas_limit,
			state: Ok(Inner {
				used_gas: 0,
				memory_gas: 0,
				memory_words: 0,
				refunded_gas: 0,
				config,
			}),
		}
	}

	fn inner(&self) -> Result<&Inner<'config>, ExitError> {
		self.state.as_ref().map_err(|e| e.clone())
	}

	/// Gas available for the next operation.
	pub fn gas(&self) -> u64 {
		let gas_limit = self.gas_limit;
		self.inner()
			.map(|i| gas_limit.saturating_sub(i.used_gas))
			.unwrap_or(0)
	}

	/// Gas consumed so far. Once the gasometer has latched an error, this
	/// is simply the full gas limit, since `OutOfGas` and friends burn
	/// everything remaining.
	pub fn total_used_gas(&self) -> u64 {
		match &self.state {
			Ok(inner) => inner.used_gas,
			Err(_) => self.gas_limit,
		}
	}

	pub fn refunded_gas(&self) -> i64 {
		self.inner().map(|i| i.refunded_gas).unwrap_or(0)
	}

	pub fn config(&self) -> Result<&'config Config, ExitError> {
		self.inner().map(|i| i.config)
	}

	/// `consume(cost)`: subtract `cost` from remaining gas, or latch
	/// `OutOfGas` for the rest of this frame's life.
	pub fn consume(&mut self, cost: u64) -> Result<(), ExitError> {
		let gas_limit = self.gas_limit;
		self.mutate(|inner| {
			let used = inner
				.used_gas
				.checked_add(cost)
				.ok_or(ExitError::OutOfGas)?;
			if used > gas_limit {
				return Err(ExitError::OutOfGas);
			}
			inner.used_gas = used;
			self::tracing::emit(|| self::tracing::Event::RecordCost(cost));
			Ok(())
		})
	}

	/// `refund(amount)`: adjust the refund counter. Negative amounts
	/// reverse a previously granted refund (e.g. `SSTORE` un-clearing a
	/// slot it had cleared earlier in the same transaction).
	pub fn refund(&mut self, amount: i64) -> Result<(), ExitError> {
		self.mutate(|inner| {
			inner.refunded_gas = inner.refunded_gas.saturating_add(amount);
			self::tracing::emit(|| self::tracing::Event::RecordRefund(amount));
			Ok(())
		})
	}

	/// `return_gas(amount)`: hand gas back to this frame's budget — used
	/// for the unspent portion of a child call's forwarded gas, and for
	/// the 2300-gas call stipend when the child doesn't spend it.
	pub fn return_gas(&mut self, amount: u64) -> Result<(), ExitError> {
		self.mutate(|inner| {
			inner.used_gas = inner.used_gas.saturating_sub(amount);
			self::tracing::emit(|| self::tracing::Event::RecordStipend(amount));
			Ok(())
		})
	}

	/// Charge the static cost of `opcode`, then the marginal memory
	/// expansion it requires — in that order, so out-of-gas on a huge
	/// expansion request is observed before state is touched.
	pub fn record_fixed(&mut self, opcode: Opcode, stack: &Stack, static_cost: u64) -> Result<(), ExitError> {
		self.record_memory(opcode, stack)?;
		self.consume(static_cost)
	}

	fn record_memory(&mut self, opcode: Opcode, stack: &Stack) -> Result<(), ExitError> {
		let gas_limit = self.gas_limit;
		self.mutate(|inner| {
			let new_words = self::memory::memory_cost(inner.memory_words, opcode, stack)?;
			if new_words > inner.memory_words {
				let new_gas = self::memory::memory_gas(new_words)?;
				let marginal = new_gas.saturating_sub(inner.memory_gas);
				let used = inner
					.used_gas
					.checked_add(marginal)
					.ok_or(ExitError::OutOfGas)?;
				if used > gas_limit {
					return Err(ExitError::OutOfGas);
				}
				inner.used_gas = used;
				inner.memory_words = new_words;
				inner.memory_gas = new_gas;
				self::tracing::emit(|| self::tracing::Event::RecordDynamicCost {
					gas_cost: 0,
					memory_gas: marginal,
					gas_refund: 0,
				});
			}
			Ok(())
		})
	}

	/// Charge a dynamic cost already computed by the caller (`SSTORE`,
	/// `CALL`, `CREATE`, `LOG*`, `EXP`, ...), plus whatever memory
	/// expansion `opcode`'s stack arguments require.
	pub fn record_dynamic_and_memory(
		&mut self,
		opcode: Opcode,
		stack: &Stack,
		gas_cost: u64,
		gas_refund: i64,
	) -> Result<(), ExitError> {
		self.record_memory(opcode, stack)?;
		let gas_limit = self.gas_limit;
		self.mutate(|inner| {
			let used = inner
				.used_gas
				.checked_add(gas_cost)
				.ok_or(ExitError::OutOfGas)?;
			if used > gas_limit {
				return Err(ExitError::OutOfGas);
			}
			inner.used_gas = used;
			inner.refunded_gas = inner.refunded_gas.saturating_add(gas_refund);
			self::tracing::emit(|| self::tracing::Event::RecordDynamicCost {
				gas_cost,
				memory_gas: 0,
				gas_refund,
			});
			Ok(())
		})
	}

	fn mutate<F: FnOnce(&mut Inner<'config>) -> Result<(), ExitError>>(
		&mut self,
		f: F,
	) -> Result<(), ExitError> {
		let result = match self.state.as_mut() {
			Ok(inner) => f(inner),
			Err(e) => return Err(e.clone()),
		};
		if let Err(e) = result {
			self.state = Err(e.clone());
			Err(e)
		} else {
			Ok(())
		}
	}
}

/// Cap the refund counter per the active fork (pre-London: `gas_used/2`;
/// London+: `gas_used/5`, EIP-3529) and fold it into the final gas used.
pub fn final_gas(gas_used: u64, refunded_gas: i64, config: &Config) -> u64 {
	let cap_divisor = config.refund_cap_divisor;
	let max_refund = gas_used / cap_divisor;
	let refund = if refunded_gas < 0 {
		0
	} else {
		core::cmp::min(refunded_gas as u64, max_refund)
	};
	gas_used.saturating_sub(refund)
}

/// `EXP`'s dynamic component: `10 + 50 * byte_length(exponent)`
/// (Spurious Dragon+; `10 + 10 * byte_length` before).
pub fn exp_cost(power: U256, config: &Config) -> Result<u64, ExitError> {
	self::costs::exp_cost(power, config)
}

/// Warm/cold account or storage-slot access surcharge (EIP-2929, Berlin+).
pub fn access_cost(is_cold: bool, warm_cost: u64, cold_cost: u64) -> u64 {
	if is_cold {
		cold_cost
	} else {
		warm_cost
	}
}

/// `SSTORE`'s dynamic cost, given the slot's original/current/new values.
pub fn sstore_cost(
	original: H256,
	current: H256,
	new: H256,
	gas: u64,
	is_cold: bool,
	config: &Config,
) -> Result<u64, ExitError> {
	self::costs::sstore_cost(original, current, new, gas, is_cold, config)
}

/// `SSTORE`'s refund contribution (EIP-2200/3529), separate from its
/// immediate cost.
pub fn sstore_refund(original: H256, current: H256, new: H256, config: &Config) -> i64 {
	self::costs::sstore_refund(original, current, new, config)
}
