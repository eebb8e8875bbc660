use primitive_types::{H256, U256};
use sha3::{Digest, Keccak256};

use super::Control;
use crate::{ExitError, ExitRevert, ExitSucceed};

pub fn codesize(state: &mut crate::Machine) -> Control {
	let size = U256::from(state.code().len());
	push_u256!(state, size);
	Control::Continue(1)
}

pub fn codecopy(state: &mut crate::Machine) -> Control {
	pop_u256!(state, memory_offset, code_offset, len);

	let code = state.code_rc();
	match state.memory_mut().copy_large(memory_offset, code_offset, len, &code) {
		Ok(()) => Control::Continue(1),
		Err(e) => Control::Exit(e.into()),
	}
}

pub fn calldataload(state: &mut crate::Machine) -> Control {
	pop_u256!(state, index);

	let mut load = [0u8; 32];
	for (i, slot) in load.iter_mut().enumerate() {
		if let Some(p) = index.checked_add(U256::from(i)) {
			if p <= U256::from(usize::MAX) {
				let p = p.as_usize();
				if p < state.data().len() {
					*slot = state.data()[p];
				}
			}
		}
	}

	push!(state, H256::from(load));
	Control::Continue(1)
}

pub fn calldatasize(state: &mut crate::Machine) -> Control {
	push_u256!(state, U256::from(state.data().len()));
	Control::Continue(1)
}

pub fn calldatacopy(state: &mut crate::Machine) -> Control {
	pop_u256!(state, memory_offset, data_offset, len);

	let memory_offset_u = as_usize_or_fail!(memory_offset);
	let ulen = as_usize_or_fail!(len);

	let data: &[u8] = if let Some(end) = data_offset.checked_add(len) {
		if end > U256::from(usize::MAX) || end.as_usize() > state.data().len() {
			&[]
		} else {
			let start = data_offset.as_usize();
			let end = end.as_usize();
			&state.data()[start..end]
		}
	} else {
		&[]
	};

	match state.memory_mut().set(memory_offset_u, data, Some(ulen)) {
		Ok(()) => Control::Continue(1),
		Err(e) => Control::Exit(e.into()),
	}
}

pub fn sha3(state: &mut crate::Machine) -> Control {
	pop_u256!(state, from, len);
	let from = as_usize_or_fail!(from);
	let ulen = as_usize_or_fail!(len);

	match state.memory_mut().resize(from, ulen) {
		Ok(()) => (),
		Err(e) => return Control::Exit(e.into()),
	}

	let data = state.memory().get(from, ulen);
	let mut hasher = Keccak256::new();
	hasher.update(&data);
	let hash = hasher.finalize();

	push!(state, H256::from_slice(&hash));
	Control::Continue(1)
}

pub fn pop(state: &mut crate::Machine) -> Control {
	pop!(state, _any);
	Control::Continue(1)
}

pub fn mload(state: &mut crate::Machine) -> Control {
	pop_u256!(state, index);
	let index = as_usize_or_fail!(index);
	match state.memory_mut().resize(index, 32) {
		Ok(()) => (),
		Err(e) => return Control::Exit(e.into()),
	}
	let value = H256::from_slice(&state.memory().get(index, 32));
	push!(state, value);
	Control::Continue(1)
}

pub fn mstore(state: &mut crate::Machine) -> Control {
	pop_u256!(state, index);
	pop!(state, value);
	let index = as_usize_or_fail!(index);
	match state.memory_mut().resize(index, 32) {
		Ok(()) => (),
		Err(e) => return Control::Exit(e.into()),
	}
	match state.memory_mut().set(index, &value[..], Some(32)) {
		Ok(()) => Control::Continue(1),
		Err(e) => Control::Exit(e.into()),
	}
}

pub fn mstore8(state: &mut crate::Machine) -> Control {
	pop_u256!(state, index, value);
	let index = as_usize_or_fail!(index);
	let value = (value.low_u32() & 0xff) as u8;
	match state.memory_mut().resize(index, 1) {
		Ok(()) => (),
		Err(e) => return Control::Exit(e.into()),
	}
	match state.memory_mut().set(index, &[value], Some(1)) {
		Ok(()) => Control::Continue(1),
		Err(e) => Control::Exit(e.into()),
	}
}

pub fn mcopy(state: &mut crate::Machine) -> Control {
	pop_u256!(state, dst, src, len);
	let dst = as_usize_or_fail!(dst);
	let src = as_usize_or_fail!(src);
	let ulen = as_usize_or_fail!(len);
	match state.memory_mut().copy_within(dst, src, ulen) {
		Ok(()) => Control::Continue(1),
		Err(e) => Control::Exit(e.into()),
	}
}

pub fn jump(state: &mut crate::Machine) -> Control {
	pop_u256!(state, dest);
	let dest = as_usize_or_fail!(dest, ExitError::InvalidJump);
	Control::Jump(dest)
}

pub fn jumpi(state: &mut crate::Machine) -> Control {
	pop_u256!(state, dest, value);
	let dest = as_usize_or_fail!(dest, ExitError::InvalidJump);
	if value != U256::zero() {
		Control::Jump(dest)
	} else {
		Control::Continue(1)
	}
}

pub fn jumpdest(_state: &mut crate::Machine) -> Control {
	Control::Continue(1)
}

pub fn pc(state: &mut crate::Machine, position: usize) -> Control {
	push_u256!(state, U256::from(position));
	Control::Continue(1)
}

pub fn msize(state: &mut crate::Machine) -> Control {
	push_u256!(state, U256::from(state.memory().len()));
	Control::Continue(1)
}

pub fn push(state: &mut crate::Machine, n: usize, position: usize) -> Control {
	let end = position + 1 + n;
	if end > state.code().len() {
		return Control::Exit(ExitError::PCUnderflow.into());
	}

	let value = state.read_immediate(position + 1, n);
	push_u256!(state, value);
	Control::Continue(1 + n)
}

pub fn dup(state: &mut crate::Machine, n: usize) -> Control {
	match state.stack_mut().dup(n) {
		Ok(()) => Control::Continue(1),
		Err(e) => Control::Exit(e.into()),
	}
}

pub fn swap(state: &mut crate::Machine, n: usize) -> Control {
	match state.stack_mut().swap(n) {
		Ok(()) => Control::Continue(1),
		Err(e) => Control::Exit(e.into()),
	}
}

pub fn ret(state: &mut crate::Machine) -> Control {
	pop_u256!(state, start, len);
	if let Some(end) = start.checked_add(len) {
		state.set_return_range(start..end);
		Control::Exit(ExitSucceed::Returned.into())
	} else {
		Control::Exit(ExitError::InvalidRange.into())
	}
}

pub fn revert(state: &mut crate::Machine) -> Control {
	pop_u256!(state, start, len);
	if let Some(end) = start.checked_add(len) {
		state.set_return_range(start..end);
		Control::Exit(ExitRevert::Reverted.into())
	} else {
		Control::Exit(ExitError::InvalidRange.into())
	}
}
