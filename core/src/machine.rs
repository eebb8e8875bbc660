use alloc::rc::Rc;
use alloc::vec::Vec;
use core::ops::Range;

use primitive_types::U256;

use crate::{Capture, ExitError, ExitReason, ExitSucceed, Memory, Opcode, Stack, Trap, Valids};

/// The code stream, stack and memory of a single frame (§4.3, tying
/// together §4.1/§4.2): a program counter over immutable code plus the
/// mutable state opcodes act on. Does not know about gas, the ledger, or
/// call/create recursion — those live in `evmx-runtime` and above.
pub struct Machine {
	/// Program code. `Rc` because child `CALL`/`DELEGATECALL` frames to the
	/// same contract address reuse the same bytes.
	code: Rc<Vec<u8>>,
	/// Calldata / constructor input for this frame.
	data: Rc<Vec<u8>>,
	/// Program counter.
	position: Result<usize, ExitReason>,
	valids: Valids,
	memory: Memory,
	stack: Stack,
	/// Byte range of `code` to return once the frame concludes
	/// successfully or via `REVERT`.
	return_range: Range<U256>,
}

impl Machine {
	pub fn new(code: Rc<Vec<u8>>, data: Rc<Vec<u8>>, stack_limit: usize, memory_limit: usize) -> Self {
		let valids = Valids::new(&code);
		Self {
			code,
			data,
			position: Ok(0),
			valids,
			memory: Memory::new(memory_limit),
			stack: Stack::new(stack_limit),
			return_range: U256::zero()..U256::zero(),
		}
	}

	pub fn code(&self) -> &[u8] {
		&self.code
	}

	/// Clone the `Rc` handle to the code buffer (cheap), for opcodes like
	/// `CODECOPY` that need to read code while holding a mutable borrow of
	/// memory.
	pub(crate) fn code_rc(&self) -> Rc<Vec<u8>> {
		self.code.clone()
	}

	pub fn data(&self) -> &[u8] {
		&self.data
	}

	pub fn position(&self) -> Result<usize, ExitReason> {
		self.position.clone()
	}

	pub fn stack(&self) -> &Stack {
		&self.stack
	}

	pub fn stack_mut(&mut self) -> &mut Stack {
		&mut self.stack
	}

	pub fn memory(&self) -> &Memory {
		&self.memory
	}

	pub fn memory_mut(&mut self) -> &mut Memory {
		&mut self.memory
	}

	pub fn valids(&self) -> &Valids {
		&self.valids
	}

	/// The frame's return-data range, resolved against `code` (or, more
	/// commonly, memory contents copied there by `RETURN`/`REVERT`).
	pub fn return_value(&self) -> Vec<u8> {
		if self.return_range.start > U256::from(usize::MAX)
			|| self.return_range.end > U256::from(usize::MAX)
		{
			return Vec::new();
		}
		let start = self.return_range.start.as_usize();
		let end = self.return_range.end.as_usize();
		if start >= end {
			return Vec::new();
		}
		self.memory.get(start, end - start)
	}

	/// Set the frame's result directly and terminate.
	pub fn exit(&mut self, reason: ExitReason) {
		self.position = Err(reason);
	}

	/// Record the memory range `RETURN`/`REVERT` pointed at.
	pub fn set_return_range(&mut self, range: Range<U256>) {
		self.return_range = range;
	}

	/// Peek the next opcode and the current stack without advancing,
	/// giving a tracer or a gas pre-check a look before `step` commits to
	/// executing it.
	pub fn inspect(&self) -> Option<(Opcode, &Stack)> {
		let position = self.position.as_ref().ok().copied()?;
		self.code.get(position).map(|op| (Opcode(*op), &self.stack))
	}

	/// Decode and execute one opcode's pure (non-externally-dependent)
	/// effect, or trap out with `Trap::Opcode` for anything that needs a
	/// `Handler` (environment/storage/call/create/log opcodes).
	pub fn step(&mut self) -> Result<(), Capture<ExitReason, Trap>> {
		let position = match self.position {
			Ok(position) => position,
			Err(reason) => return Err(Capture::Exit(reason.clone())),
		};

		let opcode = match self.code.get(position) {
			Some(byte) => Opcode(*byte),
			None => {
				self.position = Err(ExitSucceed::Stopped.into());
				return Err(Capture::Exit(ExitSucceed::Stopped.into()));
			}
		};

		match crate::eval::eval(self, opcode, position) {
			crate::eval::Control::Continue(bytes) => {
				self.position = Ok(position + bytes);
				Ok(())
			}
			crate::eval::Control::Jump(dest) => {
				if self.valids.is_valid(dest) {
					self.position = Ok(dest);
					Ok(())
				} else {
					self.position = Err(ExitError::InvalidJump.into());
					Err(Capture::Exit(ExitError::InvalidJump.into()))
				}
			}
			crate::eval::Control::Exit(reason) => {
				self.position = Err(reason.clone());
				Err(Capture::Exit(reason))
			}
			crate::eval::Control::Trap(opcode) => {
				self.position = Ok(position + 1);
				Err(Capture::Trap(Trap::Opcode(opcode)))
			}
		}
	}

	/// Read `n` immediate bytes following `position`, zero-extending past
	/// the end of code (used for `PUSH1..PUSH32`).
	pub fn read_immediate(&self, position: usize, n: usize) -> U256 {
		let mut buf = [0u8; 32];
		for (i, slot) in buf.iter_mut().rev().take(n).rev().enumerate() {
			if let Some(byte) = self.code.get(position + i) {
				*slot = *byte;
			}
		}
		U256::from_big_endian(&buf[32 - n..])
	}
}
