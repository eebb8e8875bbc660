#[macro_use]
mod macros;
mod system;

use alloc::vec::Vec;
use core::cmp::min;

use primitive_types::{H160, H256, U256};

use crate::{CallScheme, ExitReason, Handler, Opcode, Runtime};

/// What running one trapped opcode against a `Handler` produced.
pub enum Control<H: Handler> {
	Continue,
	CallInterrupt(H::CallInterrupt),
	CreateInterrupt(H::CreateInterrupt),
	Exit(ExitReason),
}

fn handle_other<H: Handler>(state: &mut Runtime, opcode: Opcode, handler: &mut H) -> Control<H> {
	match handler.other(opcode, &mut state.machine) {
		Ok(()) => Control::Continue,
		Err(e) => Control::Exit(e.into()),
	}
}

/// Resolve one opcode `evmx-core` couldn't handle on its own — everything
/// reading environment/block context, storage, logs, or recursing into a
/// child `CALL`/`CREATE` frame (§4.5, §4.9).
pub fn eval<H: Handler>(state: &mut Runtime, opcode: Opcode, handler: &mut H) -> Control<H> {
	match opcode {
		Opcode::ADDRESS => system::address(state),
		Opcode::BALANCE => system::balance(state, handler),
		Opcode::SELFBALANCE => system::selfbalance(state, handler),
		Opcode::ORIGIN => system::origin(state, handler),
		Opcode::CALLER => system::caller(state),
		Opcode::CALLVALUE => system::callvalue(state),
		Opcode::GASPRICE => system::gasprice(state, handler),
		Opcode::EXTCODESIZE => system::extcodesize(state, handler),
		Opcode::EXTCODEHASH => system::extcodehash(state, handler),
		Opcode::EXTCODECOPY => system::extcodecopy(state, handler),
		Opcode::RETURNDATASIZE => system::returndatasize(state),
		Opcode::RETURNDATACOPY => system::returndatacopy(state),
		Opcode::BLOCKHASH => system::blockhash(state, handler),
		Opcode::COINBASE => system::coinbase(state, handler),
		Opcode::TIMESTAMP => system::timestamp(state, handler),
		Opcode::NUMBER => system::number(state, handler),
		Opcode::DIFFICULTY => system::difficulty(state, handler),
		Opcode::GASLIMIT => system::gaslimit(state, handler),
		Opcode::CHAINID => system::chainid(state, handler),
		Opcode::BASEFEE => system::base_fee(state, handler),
		Opcode::BLOBHASH => system::blob_hash(state, handler),
		Opcode::BLOBBASEFEE => system::blob_base_fee(state, handler),
		Opcode::SLOAD => system::sload(state, handler),
		Opcode::SSTORE => system::sstore(state, handler),
		Opcode::TLOAD => system::tload(state, handler),
		Opcode::TSTORE => system::tstore(state, handler),
		Opcode::GAS => system::gas(state, handler),
		Opcode::LOG0 => system::log(state, 0, handler),
		Opcode::LOG1 => system::log(state, 1, handler),
		Opcode::LOG2 => system::log(state, 2, handler),
		Opcode::LOG3 => system::log(state, 3, handler),
		Opcode::LOG4 => system::log(state, 4, handler),
		Opcode::SELFDESTRUCT => system::selfdestruct(state, handler),
		Opcode::CREATE => system::create(state, false, handler),
		Opcode::CREATE2 => system::create(state, true, handler),
		Opcode::CALL => system::call(state, CallScheme::Call, handler),
		Opcode::CALLCODE => system::call(state, CallScheme::CallCode, handler),
		Opcode::DELEGATECALL => system::call(state, CallScheme::DelegateCall, handler),
		Opcode::STATICCALL => system::call(state, CallScheme::StaticCall, handler),
		_ => handle_other(state, opcode, handler),
	}
}

/// Fold a completed `CREATE`/`CREATE2` child frame's result back into the
/// parent: push the deployed address (zero on failure), and propagate a
/// `Fatal` exit up rather than swallowing it, since that variant means the
/// child frame's state isn't trustworthy at all.
pub fn finish_create(
	runtime: &mut Runtime,
	reason: ExitReason,
	address: Option<H160>,
	return_data: Vec<u8>,
) -> Result<(), ExitReason> {
	runtime.return_data_buffer = return_data;
	let pushed: H256 = address.map(H256::from).unwrap_or_default();

	match reason {
		ExitReason::Succeed(_) => {
			runtime.machine.stack_mut().push_h256(pushed)?;
			Ok(())
		}
		ExitReason::Revert(_) | ExitReason::Error(_) => {
			runtime.machine.stack_mut().push_h256(H256::default())?;
			Ok(())
		}
		ExitReason::Fatal(e) => {
			let _ = runtime.machine.stack_mut().push_h256(H256::default());
			Err(e.into())
		}
	}
}

/// Fold a completed `CALL`-family child frame's result back into the
/// parent: copy its return data into the caller-requested output window
/// and push the success flag.
pub fn finish_call(
	runtime: &mut Runtime,
	out_len: U256,
	out_offset: U256,
	reason: ExitReason,
	return_data: Vec<u8>,
) -> Result<(), ExitReason> {
	runtime.return_data_buffer = return_data;
	let target_len = min(out_len, U256::from(runtime.return_data_buffer.len()));

	match reason {
		ExitReason::Succeed(_) => {
			match runtime.machine.memory_mut().copy_large(
				out_offset,
				U256::zero(),
				target_len,
				&runtime.return_data_buffer,
			) {
				Ok(()) => {
					runtime.machine.stack_mut().push(U256::one())?;
					Ok(())
				}
				Err(_) => {
					runtime.machine.stack_mut().push(U256::zero())?;
					Ok(())
				}
			}
		}
		ExitReason::Revert(_) => {
			let _ = runtime.machine.memory_mut().copy_large(
				out_offset,
				U256::zero(),
				target_len,
				&runtime.return_data_buffer,
			);
			runtime.machine.stack_mut().push(U256::zero())?;
			Ok(())
		}
		ExitReason::Error(_) => {
			runtime.machine.stack_mut().push(U256::zero())?;
			Ok(())
		}
		ExitReason::Fatal(e) => {
			let _ = runtime.machine.stack_mut().push(U256::zero());
			Err(e.into())
		}
	}
}
