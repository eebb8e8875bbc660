use alloc::borrow::Cow;

use crate::Opcode;

/// Capture represents the result of execution: either the machine exited
/// with a final reason, or it trapped out asking the caller to resolve an
/// external opcode (a call, a create, or anything this layer doesn't know
/// how to execute by itself) before it can continue.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum Capture<E, T> {
	/// The machine has concluded.
	Exit(E),
	/// The machine has trapped out, pending resolution by the caller.
	Trap(T),
}

impl<E, T> Capture<E, T> {
	/// Map the exit value, leaving a trap untouched.
	pub fn map_exit<E2, F: FnOnce(E) -> E2>(self, f: F) -> Capture<E2, T> {
		match self {
			Capture::Exit(e) => Capture::Exit(f(e)),
			Capture::Trap(t) => Capture::Trap(t),
		}
	}
}

/// A single-byte opcode that `evmx-core` doesn't know how to execute
/// without help from a `Handler`: traps out of the dispatch loop.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum Trap {
	/// An opcode handled by an outer dispatcher.
	Opcode(Opcode),
}

/// Why a frame stopped running.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum ExitReason {
	/// The frame exited successfully.
	Succeed(ExitSucceed),
	/// The frame reverted: state is rolled back but remaining gas is
	/// preserved.
	Revert(ExitRevert),
	/// The frame failed: state is rolled back and all remaining gas is
	/// burned.
	Error(ExitError),
	/// A fatal, unrecoverable error in the host rather than in the
	/// contract being executed.
	Fatal(ExitFatal),
}

impl ExitReason {
	/// Whether the frame's side effects should be kept.
	pub fn is_succeed(&self) -> bool {
		matches!(self, ExitReason::Succeed(_))
	}
}

/// Normal, successful termination of a frame.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum ExitSucceed {
	/// Ran off the end of the code, or hit `STOP`.
	Stopped,
	/// `RETURN`.
	Returned,
	/// `SELFDESTRUCT`.
	Suicided,
}

impl From<ExitSucceed> for ExitReason {
	fn from(s: ExitSucceed) -> Self {
		ExitReason::Succeed(s)
	}
}

/// `REVERT`. Does not burn gas, unlike every other `ExitError`.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum ExitRevert {
	Reverted,
}

impl From<ExitRevert> for ExitReason {
	fn from(r: ExitRevert) -> Self {
		ExitReason::Revert(r)
	}
}

/// Failures that terminate the current frame and burn all of its remaining
/// gas. See spec §7 for the taxonomy these variants implement.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum ExitError {
	/// Attempted to pop more items than the stack holds.
	StackUnderflow,
	/// Attempted to push past the 1024-entry limit.
	StackOverflow,
	/// `JUMP`/`JUMPI` target is not a valid `JUMPDEST`.
	InvalidJump,
	/// `RETURN`/`REVERT` memory range overflows `usize`.
	InvalidRange,
	/// `INVALID` opcode, or any encoding past the end of a `PUSH` operand.
	DesignatedInvalid,
	/// Call/create stack depth would exceed 1024.
	CallTooDeep,
	/// `CREATE`/`CREATE2` target address already has code or a nonzero
	/// nonce.
	CreateCollision,
	/// Deployed code exceeds the 24576-byte cap (EIP-170, Spurious
	/// Dragon+).
	CreateContractLimit,
	/// Deployed code begins with the `0xEF` byte (EIP-3541, London+).
	InvalidContractPrefix,
	/// Insufficient gas for the operation or for memory expansion.
	OutOfGas,
	/// Attempted to transfer more value than the sender's balance.
	OutOfFund,
	/// Program counter ran past the end of an immediate read.
	PCUnderflow,
	/// `CREATE`-kind message with empty init code and an existing account.
	CreateEmpty,
	/// Sender's nonce would exceed `u64::MAX`.
	MaxNonce,
	/// State-modifying opcode executed in a static frame.
	WriteProtection,
	/// Undefined opcode for the active fork.
	InvalidCode(Opcode),
	/// A precompile rejected its input.
	PrecompileFailure,
	/// Catch-all for conditions not covered above.
	Other(Cow<'static, str>),
}

impl From<ExitError> for ExitReason {
	fn from(e: ExitError) -> Self {
		ExitReason::Error(e)
	}
}

/// Errors in the host environment rather than in contract code: these
/// cannot be attributed to gas and should propagate out of the whole
/// transaction, not just the current frame.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum ExitFatal {
	/// The dispatch loop trapped on an opcode the caller never resolved.
	UnhandledInterrupt,
	/// An `ExitError` was promoted to fatal by a caller that cannot
	/// otherwise represent it.
	UnhandledExitError,
	/// Catch-all.
	Other(Cow<'static, str>),
}

impl From<ExitFatal> for ExitReason {
	fn from(f: ExitFatal) -> Self {
		ExitReason::Fatal(f)
	}
}
