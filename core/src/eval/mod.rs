#[macro_use]
mod macros;
mod arithmetic;
mod bitwise;
mod misc;

use core::ops::{BitAnd, BitOr, BitXor};

use primitive_types::U256;

use crate::{ExitError, ExitReason, ExitSucceed, Machine, Opcode};

/// What the machine did after decoding one opcode.
pub enum Control {
	/// Ran to completion; advance the program counter by this many bytes.
	Continue(usize),
	/// The frame is done.
	Exit(ExitReason),
	/// `JUMP`/`JUMPI` landed on a destination to validate and move to.
	Jump(usize),
	/// This opcode needs a `Handler`; the caller must resolve it and
	/// resume.
	Trap(Opcode),
}

/// Decode and (if pure) execute `opcode`. Anything that touches state
/// outside this frame — environment data, storage, calls, creates, logs,
/// `SELFDESTRUCT` — falls through to `Control::Trap` for the runtime layer
/// to handle.
pub fn eval(state: &mut Machine, opcode: Opcode, position: usize) -> Control {
	match opcode {
		Opcode::STOP => Control::Exit(ExitSucceed::Stopped.into()),

		Opcode::ADD => op2_u256_tuple!(state, overflowing_add),
		Opcode::MUL => op2_u256_tuple!(state, overflowing_mul),
		Opcode::SUB => op2_u256_tuple!(state, overflowing_sub),
		Opcode::DIV => op2_u256_fn!(state, self::arithmetic::div),
		Opcode::SDIV => op2_u256_fn!(state, self::arithmetic::sdiv),
		Opcode::MOD => op2_u256_fn!(state, self::arithmetic::rem),
		Opcode::SMOD => op2_u256_fn!(state, self::arithmetic::srem),
		Opcode::ADDMOD => op3_u256_fn!(state, self::arithmetic::addmod),
		Opcode::MULMOD => op3_u256_fn!(state, self::arithmetic::mulmod),
		Opcode::EXP => op2_u256_fn!(state, self::arithmetic::exp),
		Opcode::SIGNEXTEND => op2_u256_fn!(state, self::arithmetic::signextend),

		Opcode::LT => op2_u256_bool!(state, lt),
		Opcode::GT => op2_u256_bool!(state, gt),
		Opcode::SLT => op2_u256_fn!(state, self::bitwise::slt),
		Opcode::SGT => op2_u256_fn!(state, self::bitwise::sgt),
		Opcode::EQ => op2_u256_bool!(state, eq),
		Opcode::ISZERO => op1_u256_fn!(state, self::bitwise::iszero),
		Opcode::AND => op2_u256!(state, bitand),
		Opcode::OR => op2_u256!(state, bitor),
		Opcode::XOR => op2_u256!(state, bitxor),
		Opcode::NOT => op1_u256_fn!(state, self::bitwise::not),
		Opcode::BYTE => op2_u256_fn!(state, self::bitwise::byte),
		Opcode::SHL => op2_u256_fn!(state, self::bitwise::shl),
		Opcode::SHR => op2_u256_fn!(state, self::bitwise::shr),
		Opcode::SAR => op2_u256_fn!(state, self::bitwise::sar),

		Opcode::SHA3 => self::misc::sha3(state),

		Opcode::CODESIZE => self::misc::codesize(state),
		Opcode::CODECOPY => self::misc::codecopy(state),
		Opcode::CALLDATALOAD => self::misc::calldataload(state),
		Opcode::CALLDATASIZE => self::misc::calldatasize(state),
		Opcode::CALLDATACOPY => self::misc::calldatacopy(state),

		Opcode::POP => self::misc::pop(state),
		Opcode::MLOAD => self::misc::mload(state),
		Opcode::MSTORE => self::misc::mstore(state),
		Opcode::MSTORE8 => self::misc::mstore8(state),
		Opcode::MCOPY => self::misc::mcopy(state),
		Opcode::MSIZE => self::misc::msize(state),

		Opcode::JUMP => self::misc::jump(state),
		Opcode::JUMPI => self::misc::jumpi(state),
		Opcode::JUMPDEST => self::misc::jumpdest(state),
		Opcode::PC => self::misc::pc(state, position),

		Opcode::RETURN => self::misc::ret(state),
		Opcode::REVERT => self::misc::revert(state),

		Opcode::INVALID => Control::Exit(ExitError::DesignatedInvalid.into()),

		_ if opcode == Opcode::PUSH0 => {
			push_u256!(state, U256::zero());
			Control::Continue(1)
		}
		_ if opcode.is_push().is_some() => {
			let n = opcode.is_push().expect("checked above") as usize;
			self::misc::push(state, n, position)
		}
		_ if (Opcode::DUP1.0..=Opcode::DUP16.0).contains(&opcode.0) => {
			self::misc::dup(state, (opcode.0 - Opcode::DUP1.0 + 1) as usize)
		}
		_ if (Opcode::SWAP1.0..=Opcode::SWAP16.0).contains(&opcode.0) => {
			self::misc::swap(state, (opcode.0 - Opcode::SWAP1.0 + 1) as usize)
		}

		_ => Control::Trap(opcode),
	}
}
