use alloc::vec::Vec;
use primitive_types::{H160, H256, U256};
use sha3::{Digest, Keccak256};

use super::Control;
use crate::handler::Transfer;
use crate::{CallScheme, Context, CreateScheme, ExitError, ExitSucceed, Handler, Runtime};

pub fn address<H: Handler>(runtime: &mut Runtime) -> Control<H> {
	let ret = H256::from(runtime.context.address);
	push_h256!(runtime, ret);
	Control::Continue
}

pub fn balance<H: Handler>(runtime: &mut Runtime, handler: &H) -> Control<H> {
	pop_h256!(runtime, address);
	push_u256!(runtime, handler.balance(address.into()));
	Control::Continue
}

pub fn selfbalance<H: Handler>(runtime: &mut Runtime, handler: &H) -> Control<H> {
	push_u256!(runtime, handler.balance(runtime.context.address));
	Control::Continue
}

pub fn origin<H: Handler>(runtime: &mut Runtime, handler: &H) -> Control<H> {
	let ret = H256::from(handler.origin());
	push_h256!(runtime, ret);
	Control::Continue
}

pub fn caller<H: Handler>(runtime: &mut Runtime) -> Control<H> {
	let ret = H256::from(runtime.context.caller);
	push_h256!(runtime, ret);
	Control::Continue
}

pub fn callvalue<H: Handler>(runtime: &mut Runtime) -> Control<H> {
	push_u256!(runtime, runtime.context.apparent_value);
	Control::Continue
}

pub fn gasprice<H: Handler>(runtime: &mut Runtime, handler: &H) -> Control<H> {
	push_u256!(runtime, handler.gas_price());
	Control::Continue
}

pub fn extcodesize<H: Handler>(runtime: &mut Runtime, handler: &H) -> Control<H> {
	pop_h256!(runtime, address);
	push_u256!(runtime, handler.code_size(address.into()));
	Control::Continue
}

pub fn extcodehash<H: Handler>(runtime: &mut Runtime, handler: &H) -> Control<H> {
	pop_h256!(runtime, address);
	push_h256!(runtime, handler.code_hash(address.into()));
	Control::Continue
}

pub fn extcodecopy<H: Handler>(runtime: &mut Runtime, handler: &H) -> Control<H> {
	pop_h256!(runtime, address);
	pop_u256!(runtime, memory_offset, code_offset, len);

	let code = handler.code(address.into());
	match runtime
		.machine
		.memory_mut()
		.copy_large(memory_offset, code_offset, len, &code)
	{
		Ok(()) => Control::Continue,
		Err(e) => Control::Exit(e.into()),
	}
}

pub fn returndatasize<H: Handler>(runtime: &mut Runtime) -> Control<H> {
	let size = U256::from(runtime.return_data_buffer.len());
	push_u256!(runtime, size);
	Control::Continue
}

pub fn returndatacopy<H: Handler>(runtime: &mut Runtime) -> Control<H> {
	pop_u256!(runtime, memory_offset, data_offset, len);

	match runtime.machine.memory_mut().copy_large(
		memory_offset,
		data_offset,
		len,
		&runtime.return_data_buffer,
	) {
		Ok(()) => Control::Continue,
		Err(e) => Control::Exit(e.into()),
	}
}

pub fn blockhash<H: Handler>(runtime: &mut Runtime, handler: &H) -> Control<H> {
	pop_u256!(runtime, number);
	push_h256!(runtime, handler.block_hash(number));
	Control::Continue
}

pub fn coinbase<H: Handler>(runtime: &mut Runtime, handler: &H) -> Control<H> {
	push_h256!(runtime, H256::from(handler.block_coinbase()));
	Control::Continue
}

pub fn timestamp<H: Handler>(runtime: &mut Runtime, handler: &H) -> Control<H> {
	push_u256!(runtime, handler.block_timestamp());
	Control::Continue
}

pub fn number<H: Handler>(runtime: &mut Runtime, handler: &H) -> Control<H> {
	push_u256!(runtime, handler.block_number());
	Control::Continue
}

/// `DIFFICULTY` pre-Merge, repurposed as `PREVRANDAO` from the Merge
/// onward (same opcode, EIP-4399). Falls back to `block_difficulty` if the
/// handler reports no post-Merge randomness.
pub fn difficulty<H: Handler>(runtime: &mut Runtime, handler: &H) -> Control<H> {
	let value = match handler.block_randomness() {
		Some(randomness) => U256::from_big_endian(&randomness[..]),
		None => handler.block_difficulty(),
	};
	push_u256!(runtime, value);
	Control::Continue
}

pub fn gaslimit<H: Handler>(runtime: &mut Runtime, handler: &H) -> Control<H> {
	push_u256!(runtime, handler.block_gas_limit());
	Control::Continue
}

pub fn chainid<H: Handler>(runtime: &mut Runtime, handler: &H) -> Control<H> {
	push_u256!(runtime, handler.chain_id());
	Control::Continue
}

pub fn base_fee<H: Handler>(runtime: &mut Runtime, handler: &H) -> Control<H> {
	push_u256!(runtime, handler.block_base_fee_per_gas());
	Control::Continue
}

/// `BLOBBASEFEE` (EIP-7516, Cancun+); `other()` rejects it on earlier forks
/// before dispatch ever reaches here since the handler reports `None`.
pub fn blob_base_fee<H: Handler>(runtime: &mut Runtime, handler: &H) -> Control<H> {
	match handler.blob_base_fee() {
		Some(fee) => {
			push_u256!(runtime, U256::from(fee));
			Control::Continue
		}
		None => Control::Exit(ExitError::InvalidCode(crate::Opcode::BLOBBASEFEE).into()),
	}
}

/// `BLOBHASH` (EIP-4844): push the versioned hash of the `index`-th blob
/// attached to the enclosing transaction, or zero if out of range.
pub fn blob_hash<H: Handler>(runtime: &mut Runtime, handler: &H) -> Control<H> {
	pop_u256!(runtime, index);
	let index = if index > U256::from(usize::MAX) {
		usize::MAX
	} else {
		index.as_usize()
	};
	let value = handler.get_blob_hash(index).unwrap_or_default();
	push_u256!(runtime, value);
	Control::Continue
}

pub fn sload<H: Handler>(runtime: &mut Runtime, handler: &H) -> Control<H> {
	pop_h256!(runtime, index);
	push_h256!(runtime, handler.storage(runtime.context.address, index));
	Control::Continue
}

pub fn sstore<H: Handler>(runtime: &mut Runtime, handler: &mut H) -> Control<H> {
	pop_h256!(runtime, index, value);
	match handler.set_storage(runtime.context.address, index, value) {
		Ok(()) => Control::Continue,
		Err(e) => Control::Exit(e.into()),
	}
}

pub fn tload<H: Handler>(runtime: &mut Runtime, handler: &mut H) -> Control<H> {
	pop_h256!(runtime, index);
	match handler.tload(runtime.context.address, index) {
		Ok(value) => {
			push_u256!(runtime, value);
			Control::Continue
		}
		Err(e) => Control::Exit(e.into()),
	}
}

pub fn tstore<H: Handler>(runtime: &mut Runtime, handler: &mut H) -> Control<H> {
	pop_h256!(runtime, index);
	pop_u256!(runtime, value);
	match handler.tstore(runtime.context.address, index, value) {
		Ok(()) => Control::Continue,
		Err(e) => Control::Exit(e.into()),
	}
}

pub fn gas<H: Handler>(runtime: &mut Runtime, handler: &H) -> Control<H> {
	push_u256!(runtime, handler.gas_left());
	Control::Continue
}

pub fn log<H: Handler>(runtime: &mut Runtime, n: u8, handler: &mut H) -> Control<H> {
	pop_u256!(runtime, offset, len);
	let offset = as_usize_or_fail!(offset);
	let len = as_usize_or_fail!(len);
	let data = runtime.machine.memory().get(offset, len);

	let mut topics = Vec::new();
	for _ in 0..(n as usize) {
		match runtime.machine.stack_mut().pop_h256() {
			Ok(value) => topics.push(value),
			Err(e) => return Control::Exit(e.into()),
		}
	}

	match handler.log(runtime.context.address, topics, data) {
		Ok(()) => Control::Continue,
		Err(e) => Control::Exit(e.into()),
	}
}

pub fn selfdestruct<H: Handler>(runtime: &mut Runtime, handler: &mut H) -> Control<H> {
	pop_h256!(runtime, target);

	match handler.mark_delete(runtime.context.address, target.into()) {
		Ok(()) => Control::Exit(ExitSucceed::Suicided.into()),
		Err(e) => Control::Exit(e.into()),
	}
}

pub fn create<H: Handler>(runtime: &mut Runtime, is_create2: bool, handler: &mut H) -> Control<H> {
	pop_u256!(runtime, value, code_offset, len);

	let code_offset = as_usize_or_fail!(code_offset);
	let len = as_usize_or_fail!(len);
	let init_code = runtime.machine.memory().get(code_offset, len);

	let scheme = if is_create2 {
		pop_h256!(runtime, salt);
		let code_hash = H256::from_slice(Keccak256::digest(&init_code).as_slice());
		CreateScheme::Create2 {
			caller: runtime.context.address,
			code_hash,
			salt,
		}
	} else {
		CreateScheme::Legacy {
			caller: runtime.context.address,
		}
	};

	match handler.create(runtime.context.address, scheme, value, init_code, None) {
		crate::Capture::Exit((reason, address, return_data)) => {
			match super::finish_create(runtime, reason, address, return_data) {
				Ok(()) => Control::Continue,
				Err(reason) => Control::Exit(reason),
			}
		}
		crate::Capture::Trap(interrupt) => Control::CreateInterrupt(interrupt),
	}
}

pub fn call<H: Handler>(runtime: &mut Runtime, scheme: CallScheme, handler: &mut H) -> Control<H> {
	pop_u256!(runtime, gas);
	pop_h256!(runtime, to);
	let gas = if gas > U256::from(u64::MAX) {
		u64::MAX
	} else {
		gas.as_u64()
	};
	let to: H160 = to.into();

	let value = match scheme {
		CallScheme::Call | CallScheme::CallCode => {
			pop_u256!(runtime, value);
			value
		}
		CallScheme::DelegateCall | CallScheme::StaticCall => U256::zero(),
	};

	pop_u256!(runtime, in_offset, in_len, out_offset, out_len);

	let in_offset = as_usize_or_fail!(in_offset);
	let in_len = as_usize_or_fail!(in_len);
	let out_offset_usize = as_usize_or_fail!(out_offset);
	let out_len_usize = as_usize_or_fail!(out_len);
	let _ = (out_offset_usize, out_len_usize);

	let input = runtime.machine.memory().get(in_offset, in_len);
	let context = match scheme {
		CallScheme::Call | CallScheme::StaticCall => Context {
			address: to,
			caller: runtime.context.address,
			apparent_value: value,
		},
		CallScheme::CallCode => Context {
			address: runtime.context.address,
			caller: runtime.context.address,
			apparent_value: value,
		},
		CallScheme::DelegateCall => Context {
			address: runtime.context.address,
			caller: runtime.context.caller,
			apparent_value: runtime.context.apparent_value,
		},
	};

	let transfer = if scheme == CallScheme::Call {
		Some(Transfer {
			source: runtime.context.address,
			target: to,
			value,
		})
	} else {
		None
	};

	match handler.call(
		to,
		transfer,
		input,
		Some(gas),
		scheme == CallScheme::StaticCall,
		context,
	) {
		crate::Capture::Exit((reason, return_data)) => {
			match super::finish_call(runtime, out_len, out_offset, reason, return_data) {
				Ok(()) => Control::Continue,
				Err(reason) => Control::Exit(reason),
			}
		}
		crate::Capture::Trap(interrupt) => Control::CallInterrupt(interrupt),
	}
}
