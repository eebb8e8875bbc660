use core::cmp::max;

use evmx_core::{ExitError, Opcode, Stack};
use primitive_types::U256;

use crate::consts::G_MEMORY;

/// New word-count memory size after growing to cover `[from, from+len)`,
/// never smaller than `current`. Mirrors `evmx_core::memory::ceil32` in word
/// units rather than bytes, since that's what the quadratic cost formula
/// (§4.2) is defined over.
fn memory_expand(current: usize, from: U256, len: U256) -> Result<usize, ExitError> {
	if len == U256::zero() {
		return Ok(current);
	}

	let end = from.checked_add(len).ok_or(ExitError::OutOfGas)?;
	if end > U256::from(usize::MAX) {
		return Err(ExitError::OutOfGas);
	}
	let end = end.as_usize();

	let rem = end % 32;
	let new = if rem == 0 { end / 32 } else { end / 32 + 1 };
	Ok(max(current, new))
}

/// The memory-word-count `opcode` would require given the stack it's about
/// to consume, or `current` unchanged if it touches no memory range.
/// Opcodes needing a `Handler` (logs, calls, creates) are included here
/// since their memory footprint is knowable before the trap is resolved.
pub fn memory_cost(current: usize, opcode: Opcode, stack: &Stack) -> Result<usize, ExitError> {
	match opcode {
		Opcode::SHA3 | Opcode::RETURN | Opcode::REVERT => {
			memory_expand(current, stack.peek(0)?, stack.peek(1)?)
		}
		Opcode::LOG0 | Opcode::LOG1 | Opcode::LOG2 | Opcode::LOG3 | Opcode::LOG4 => {
			memory_expand(current, stack.peek(0)?, stack.peek(1)?)
		}
		Opcode::CODECOPY | Opcode::CALLDATACOPY | Opcode::RETURNDATACOPY => {
			memory_expand(current, stack.peek(0)?, stack.peek(2)?)
		}
		Opcode::EXTCODECOPY => memory_expand(current, stack.peek(1)?, stack.peek(3)?),
		Opcode::MLOAD | Opcode::MSTORE => memory_expand(current, stack.peek(0)?, U256::from(32)),
		Opcode::MSTORE8 => memory_expand(current, stack.peek(0)?, U256::one()),
		Opcode::MCOPY => {
			let a = memory_expand(current, stack.peek(0)?, stack.peek(2)?)?;
			memory_expand(a, stack.peek(1)?, stack.peek(2)?)
		}
		Opcode::CREATE => memory_expand(current, stack.peek(1)?, stack.peek(2)?),
		Opcode::CREATE2 => memory_expand(current, stack.peek(1)?, stack.peek(2)?),
		Opcode::CALL | Opcode::CALLCODE => {
			let a = memory_expand(current, stack.peek(3)?, stack.peek(4)?)?;
			memory_expand(a, stack.peek(5)?, stack.peek(6)?)
		}
		Opcode::DELEGATECALL | Opcode::STATICCALL => {
			let a = memory_expand(current, stack.peek(2)?, stack.peek(3)?)?;
			memory_expand(a, stack.peek(4)?, stack.peek(5)?)
		}
		_ => Ok(current),
	}
}

/// Yellow Paper §H: `3w + w^2/512` for `w` 32-byte words, as an absolute
/// (not marginal) cost.
pub fn memory_gas(words: usize) -> Result<u64, ExitError> {
	let words = words as u64;
	let linear = G_MEMORY.checked_mul(words).ok_or(ExitError::OutOfGas)?;
	let quadratic = words.checked_mul(words).ok_or(ExitError::OutOfGas)? / 512;
	linear.checked_add(quadratic).ok_or(ExitError::OutOfGas)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn memory_gas_matches_yellow_paper_formula() {
		assert_eq!(memory_gas(1).unwrap(), 3);
		assert_eq!(memory_gas(32).unwrap(), 3 * 32 + (32 * 32) / 512);
	}
}
