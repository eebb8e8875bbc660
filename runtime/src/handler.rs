use crate::prelude::*;
use crate::{Capture, Context, CreateScheme, ExitError, ExitReason, Machine, Opcode};
use primitive_types::{H160, H256, U256};

/// A balance movement `CALL` or `CREATE` asks the handler to perform before
/// running the child frame.
#[derive(Clone, Debug)]
pub struct Transfer {
	pub source: H160,
	pub target: H160,
	pub value: U256,
}

/// The state and environment surface the interpreter needs but the machine
/// (§4.1-4.3) doesn't own itself: account state, block/transaction context,
/// and the recursive `CALL`/`CREATE` entry points (§4.5, §4.9). Blanket
/// `auto_impl`'d over `&mut T`/`Box<T>` so a `&mut dyn Handler` composes the
/// same as an owned one.
#[auto_impl::auto_impl(&mut, Box)]
pub trait Handler {
	/// Value produced when a `CREATE` traps out to the caller instead of
	/// completing inline.
	type CreateInterrupt;
	/// Feedback fed back in to resume a trapped `CREATE`.
	type CreateFeedback;
	/// Value produced when a `CALL` traps out to the caller instead of
	/// completing inline.
	type CallInterrupt;
	/// Feedback fed back in to resume a trapped `CALL`.
	type CallFeedback;

	fn balance(&self, address: H160) -> U256;
	fn code_size(&self, address: H160) -> U256;
	fn code_hash(&self, address: H160) -> H256;
	fn code(&self, address: H160) -> Vec<u8>;
	fn storage(&self, address: H160, index: H256) -> H256;
	fn original_storage(&self, address: H160, index: H256) -> H256;

	fn gas_left(&self) -> U256;
	fn gas_price(&self) -> U256;
	fn origin(&self) -> H160;
	fn block_hash(&self, number: U256) -> H256;
	fn block_number(&self) -> U256;
	fn block_coinbase(&self) -> H160;
	fn block_timestamp(&self) -> U256;
	fn block_difficulty(&self) -> U256;
	/// `prevrandao` post-Merge; `None` pre-Merge (callers fall back to
	/// `block_difficulty`).
	fn block_randomness(&self) -> Option<H256>;
	fn block_gas_limit(&self) -> U256;
	/// EIP-1559 base fee; zero before London.
	fn block_base_fee_per_gas(&self) -> U256;
	fn chain_id(&self) -> U256;

	/// Whether `address` would be considered to exist per EIP-161 (nonzero
	/// nonce, code, or balance).
	fn exists(&self, address: H160) -> bool;
	/// Whether `address` has been marked for deletion earlier in this
	/// transaction.
	fn deleted(&self, address: H160) -> bool;

	/// EIP-2929/2930: whether `address` (and, if given, the storage slot at
	/// `index`) is cold for this transaction. Marks it warm as a side
	/// effect, matching the Yellow Paper's "first access pays, rest don't"
	/// rule — hence `&mut self`.
	fn is_cold(&mut self, address: H160, index: Option<H256>) -> bool;

	fn set_storage(&mut self, address: H160, index: H256, value: H256) -> Result<(), ExitError>;
	fn log(&mut self, address: H160, topics: Vec<H256>, data: Vec<u8>) -> Result<(), ExitError>;
	/// `SELFDESTRUCT`: move `address`'s entire balance to `target` and mark
	/// `address` for deletion at the end of the transaction.
	fn mark_delete(&mut self, address: H160, target: H160) -> Result<(), ExitError>;

	/// Run a `CREATE`/`CREATE2`. `scheme` already carries the precomputed
	/// `code_hash` for `CREATE2` so the handler never needs to hash
	/// `init_code` itself. Returns the deployed address on success (`None`
	/// if deployment failed after the frame ran, e.g. code-size limit).
	fn create(
		&mut self,
		caller: H160,
		scheme: CreateScheme,
		value: U256,
		init_code: Vec<u8>,
		target_gas: Option<u64>,
	) -> Capture<(ExitReason, Option<H160>, Vec<u8>), Self::CreateInterrupt>;

	fn create_feedback(&mut self, _feedback: Self::CreateFeedback) -> Result<(), ExitError> {
		Ok(())
	}

	/// Run a `CALL`/`CALLCODE`/`DELEGATECALL`/`STATICCALL`. `transfer` is
	/// `Some` only for `CALL` (the one scheme that moves value); the
	/// handler performs it atomically with entering the child frame so a
	/// transfer failure never leaves balances half-moved.
	#[allow(clippy::too_many_arguments)]
	fn call(
		&mut self,
		code_address: H160,
		transfer: Option<Transfer>,
		input: Vec<u8>,
		target_gas: Option<u64>,
		is_static: bool,
		context: Context,
	) -> Capture<(ExitReason, Vec<u8>), Self::CallInterrupt>;

	fn call_feedback(&mut self, _feedback: Self::CallFeedback) -> Result<(), ExitError> {
		Ok(())
	}

	/// Called before every opcode executes, ahead of the machine's own
	/// stack-depth and jump-destination checks. The default accepts
	/// everything; a tracing handler overrides this to record a `Step`
	/// event and a gas-metering handler to charge the opcode's cost before
	/// it runs.
	fn pre_validate(
		&mut self,
		_context: &Context,
		_opcode: Opcode,
		_stack: &crate::Stack,
	) -> Result<(), ExitError> {
		Ok(())
	}

	/// Opcodes the pure evaluator doesn't recognize at all land here rather
	/// than as a hard `InvalidCode`, so a handler can extend the opcode set
	/// (e.g. a devnet precompile trigger) without forking the machine.
	fn other(&mut self, opcode: Opcode, _machine: &mut Machine) -> Result<(), ExitError> {
		Err(ExitError::InvalidCode(opcode))
	}

	/// `BLOBBASEFEE` (EIP-7516); `None` before Cancun.
	fn blob_base_fee(&self) -> Option<u128> {
		None
	}
	/// `BLOBHASH` (EIP-4844); `None` if `index` is out of range or no blobs
	/// are attached to the enclosing transaction.
	fn get_blob_hash(&self, _index: usize) -> Option<U256> {
		None
	}
	/// `TSTORE` (EIP-1153); default errs so forks before Cancun reject it
	/// via `other`-style handling at the call site rather than silently
	/// accepting it.
	fn tstore(&mut self, _address: H160, _index: H256, _value: U256) -> Result<(), ExitError> {
		Err(ExitError::InvalidCode(Opcode(0x5c)))
	}
	/// `TLOAD` (EIP-1153).
	fn tload(&mut self, _address: H160, _index: H256) -> Result<U256, ExitError> {
		Err(ExitError::InvalidCode(Opcode(0x5d)))
	}
}
