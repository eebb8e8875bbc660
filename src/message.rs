//! The per-frame data model (§3): the immutable `Message` a caller hands to
//! the interpreter, and the `Computation` it hands back once the frame (and
//! everything it called) has finished running.

use alloc::vec::Vec;

use primitive_types::{H160, U256};

/// Which of the six call/create flavors a `Message` represents. `StaticCall`
/// is kept distinct from `Call` (rather than folded into a `static_flag` on
/// every kind) because it alone forces the flag on for the whole subtree.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum MessageKind {
	Call,
	DelegateCall,
	CallCode,
	StaticCall,
	Create,
	Create2,
}

/// One call/create frame's immutable inputs. Constructed once by the caller
/// (top-level transaction, or an opcode handler spawning a child) and never
/// mutated afterward — the interpreter's mutable working state lives in
/// `evmx_runtime::Runtime`, not here.
#[derive(Clone, Debug)]
pub struct Message {
	pub kind: MessageKind,
	/// 0 at the top-level transaction; each child frame is `parent.depth + 1`.
	pub depth: usize,
	pub gas_limit: u64,
	pub sender: H160,
	pub recipient: H160,
	/// The address whose code is executed — equal to `recipient` except for
	/// `DelegateCall`/`CallCode`, where code runs at `sender`'s behalf but is
	/// fetched from a third address.
	pub code_address: H160,
	pub value: U256,
	pub input: Vec<u8>,
	/// Forces `WriteProtection` on any state-modifying opcode for the whole
	/// subtree once set, per `STATICCALL`'s semantics.
	pub static_flag: bool,
}

/// One (address, topics, data) event log entry, buffered in the active
/// snapshot until the frame that produced it commits.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Log {
	pub address: H160,
	pub topics: Vec<primitive_types::H256>,
	pub data: Vec<u8>,
}

/// A finished frame's outcome: how it exited, what it returned, and the gas
/// and logs it is entitled to propagate to its parent on success.
#[derive(Clone, Debug)]
pub struct Computation {
	pub exit_reason: evmx_core::ExitReason,
	/// `RETURN`/`REVERT` data, or deployed code for a successful `Create`.
	pub output: Vec<u8>,
	pub gas_used: u64,
	pub gas_refunded: i64,
	pub logs: Vec<Log>,
	/// Set only for `Create`/`Create2` frames that deployed successfully.
	pub created_address: Option<H160>,
}

impl Computation {
	pub fn is_succeed(&self) -> bool {
		self.exit_reason.is_succeed()
	}
}
