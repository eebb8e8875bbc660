/// A monotonic point in Ethereum's protocol history (§4.6). Forks are
/// ordered; `Fork::Prague >= Fork::London` etc. holds so handlers can gate
/// behavior with a single comparison instead of a pile of boolean flags.
#[derive(Clone, Copy, Eq, PartialEq, PartialOrd, Ord, Debug, Hash)]
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Fork {
	Frontier,
	Homestead,
	TangerineWhistle,
	SpuriousDragon,
	Byzantium,
	Constantinople,
	Petersburg,
	Istanbul,
	Berlin,
	London,
	Merge,
	Shanghai,
	Cancun,
	Prague,
}

impl Fork {
	pub const LATEST: Fork = Fork::Prague;
}

/// The gas table and feature flags in effect for one fork. Dynamic costs
/// not fully captured by a flat number live in `evmx-gasometer::costs`,
/// parameterized by the fields here (`gas_sload`, `refund_sstore_clears`,
/// ...).
#[derive(Clone, Debug)]
pub struct Config {
	pub fork: Fork,

	// Fixed single-opcode costs.
	pub gas_extcode: u64,
	pub gas_ext_code: u64,
	pub gas_balance: u64,
	pub gas_sload: u64,
	pub gas_sload_cold: u64,
	pub gas_storage_read_warm: u64,
	pub gas_account_access_cold: u64,
	pub gas_suicide: u64,
	pub gas_suicide_new_account: u64,
	pub gas_call: u64,
	pub gas_expbyte: u64,
	pub gas_transaction_create: u64,
	pub gas_transaction_call: u64,
	pub gas_transaction_zero_data: u64,
	pub gas_transaction_non_zero_data: u64,

	/// EIP-2200/1283/3529 SSTORE metering is in effect.
	pub sstore_gas_metering: bool,
	/// EIP-1706: revert (rather than just reject) SSTORE at the 2300 gas
	/// stipend floor.
	pub sstore_revert_under_stipend: bool,
	pub gas_sstore_set: u64,
	pub gas_sstore_reset: u64,
	pub refund_sstore_clears: i64,
	/// EIP-3529 refund cap divisor: 2 pre-London, 5 from London on.
	pub refund_cap_divisor: u64,
	pub call_stipend: u64,

	/// EIP-2929: cold/warm account and storage access bookkeeping.
	pub increase_state_access_gas: bool,

	pub has_delegate_call: bool,
	pub has_static_call: bool,
	pub has_revert: bool,
	pub has_return_data: bool,
	pub has_bitwise_shift: bool,
	pub has_extcodehash: bool,
	pub has_create2: bool,
	pub has_chain_id: bool,
	pub has_self_balance: bool,
	pub has_base_fee: bool,
	pub has_push0: bool,
	pub has_mcopy: bool,
	pub has_transient_storage: bool,
	pub has_blob: bool,

	pub err_on_call_with_more_gas: bool,
	pub call_create_l64_after_gas: bool,
	pub empty_considered_exists: bool,
	pub create_increase_nonce: bool,
	/// EIP-170: deployed code size cap.
	pub create_contract_limit: Option<usize>,
	/// EIP-3860: init code size cap (Shanghai+), `None` before.
	pub max_initcode_size: Option<usize>,
	/// EIP-3541: reject deployed code starting with `0xEF`.
	pub disallow_executable_format: bool,

	pub stack_limit: usize,
	pub memory_limit: usize,
	/// `estimate`: SSTORE always charges the worst case, for gas-estimation
	/// callers that can't roll back a dry run.
	pub estimate: bool,
}

impl Config {
	pub const fn frontier() -> Config {
		Config {
			fork: Fork::Frontier,
			gas_extcode: 20,
			gas_ext_code: 20,
			gas_balance: 20,
			gas_sload: 50,
			gas_sload_cold: 0,
			gas_storage_read_warm: 0,
			gas_account_access_cold: 0,
			gas_suicide: 0,
			gas_suicide_new_account: 0,
			gas_call: 40,
			gas_expbyte: 10,
			gas_transaction_create: 21000,
			gas_transaction_call: 21000,
			gas_transaction_zero_data: 4,
			gas_transaction_non_zero_data: 68,
			sstore_gas_metering: false,
			sstore_revert_under_stipend: false,
			gas_sstore_set: 20000,
			gas_sstore_reset: 5000,
			refund_sstore_clears: 15000,
			refund_cap_divisor: 2,
			call_stipend: 2300,
			increase_state_access_gas: false,
			has_delegate_call: false,
			has_static_call: false,
			has_revert: false,
			has_return_data: false,
			has_bitwise_shift: false,
			has_extcodehash: false,
			has_create2: false,
			has_chain_id: false,
			has_self_balance: false,
			has_base_fee: false,
			has_push0: false,
			has_mcopy: false,
			has_transient_storage: false,
			has_blob: false,
			err_on_call_with_more_gas: true,
			call_create_l64_after_gas: false,
			empty_considered_exists: true,
			create_increase_nonce: false,
			create_contract_limit: None,
			max_initcode_size: None,
			disallow_executable_format: false,
			stack_limit: 1024,
			memory_limit: usize::MAX,
			estimate: false,
		}
	}

	pub const fn homestead() -> Config {
		Config {
			fork: Fork::Homestead,
			has_delegate_call: true,
			..Self::frontier()
		}
	}

	pub const fn tangerine_whistle() -> Config {
		Config {
			fork: Fork::TangerineWhistle,
			gas_extcode: 700,
			gas_ext_code: 700,
			gas_balance: 400,
			gas_sload: 200,
			gas_suicide: 5000,
			gas_suicide_new_account: 25000,
			gas_call: 700,
			..Self::homestead()
		}
	}

	pub const fn spurious_dragon() -> Config {
		Config {
			fork: Fork::SpuriousDragon,
			empty_considered_exists: false,
			create_contract_limit: Some(0x6000),
			..Self::tangerine_whistle()
		}
	}

	pub const fn byzantium() -> Config {
		Config {
			fork: Fork::Byzantium,
			has_static_call: true,
			has_revert: true,
			has_return_data: true,
			..Self::spurious_dragon()
		}
	}

	pub const fn constantinople() -> Config {
		Config {
			fork: Fork::Constantinople,
			has_bitwise_shift: true,
			has_extcodehash: true,
			has_create2: true,
			sstore_gas_metering: true,
			..Self::byzantium()
		}
	}

	pub const fn petersburg() -> Config {
		Config {
			fork: Fork::Petersburg,
			// EIP-1283's SSTORE metering was briefly disabled between
			// Constantinople and Petersburg pending EIP-1283's reentrancy
			// fix, re-enabled for real at Istanbul.
			sstore_gas_metering: false,
			..Self::constantinople()
		}
	}

	pub const fn istanbul() -> Config {
		Config {
			fork: Fork::Istanbul,
			gas_sload: 800,
			has_chain_id: true,
			has_self_balance: true,
			sstore_gas_metering: true,
			sstore_revert_under_stipend: true,
			err_on_call_with_more_gas: false,
			create_increase_nonce: true,
			..Self::petersburg()
		}
	}

	pub const fn berlin() -> Config {
		Config {
			fork: Fork::Berlin,
			increase_state_access_gas: true,
			gas_sload: 100,
			gas_sload_cold: 2100,
			gas_storage_read_warm: 100,
			gas_account_access_cold: 2600,
			gas_ext_code: 100,
			gas_balance: 100,
			gas_call: 100,
			..Self::istanbul()
		}
	}

	pub const fn london() -> Config {
		Config {
			fork: Fork::London,
			has_base_fee: true,
			refund_cap_divisor: 5,
			refund_sstore_clears: 4800,
			disallow_executable_format: true,
			..Self::berlin()
		}
	}

	pub const fn merge() -> Config {
		Config {
			fork: Fork::Merge,
			..Self::london()
		}
	}

	pub const fn shanghai() -> Config {
		Config {
			fork: Fork::Shanghai,
			has_push0: true,
			max_initcode_size: Some(2 * 0x6000),
			..Self::merge()
		}
	}

	pub const fn cancun() -> Config {
		Config {
			fork: Fork::Cancun,
			has_mcopy: true,
			has_transient_storage: true,
			has_blob: true,
			..Self::shanghai()
		}
	}

	pub const fn prague() -> Config {
		Config {
			fork: Fork::Prague,
			..Self::cancun()
		}
	}

	pub const fn for_fork(fork: Fork) -> Config {
		match fork {
			Fork::Frontier => Self::frontier(),
			Fork::Homestead => Self::homestead(),
			Fork::TangerineWhistle => Self::tangerine_whistle(),
			Fork::SpuriousDragon => Self::spurious_dragon(),
			Fork::Byzantium => Self::byzantium(),
			Fork::Constantinople => Self::constantinople(),
			Fork::Petersburg => Self::petersburg(),
			Fork::Istanbul => Self::istanbul(),
			Fork::Berlin => Self::berlin(),
			Fork::London => Self::london(),
			Fork::Merge => Self::merge(),
			Fork::Shanghai => Self::shanghai(),
			Fork::Cancun => Self::cancun(),
			Fork::Prague => Self::prague(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn fork_ordering_is_monotonic() {
		assert!(Fork::Frontier < Fork::Berlin);
		assert!(Fork::Berlin < Fork::Cancun);
	}

	#[test]
	fn london_tightens_refund_cap() {
		assert_eq!(Config::frontier().refund_cap_divisor, 2);
		assert_eq!(Config::london().refund_cap_divisor, 5);
	}

	#[test]
	fn cancun_enables_transient_storage() {
		assert!(!Config::shanghai().has_transient_storage);
		assert!(Config::cancun().has_transient_storage);
	}
}
