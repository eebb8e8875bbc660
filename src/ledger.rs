//! The `Ledger` capability (§4.5): the external, snapshotable world-state
//! surface the core consumes but does not own. Modeled as a trait so the
//! interpreter never depends on any particular storage backing — only on
//! this capability's nested-transaction discipline.
//!
//! **Snapshot model.** `snapshot` pushes a new layer; `commit`/`rollback`
//! pop it, folding or discarding its effects into the layer beneath. This is
//! a strict LIFO stack — a `Ledger` implementation only has to support
//! popping its own top layer, never an arbitrary one out of order, since the
//! interpreter never holds a `SnapshotId` past the point it stops being the
//! innermost one.

use alloc::vec::Vec;

use primitive_types::{H160, H256, U256};

use crate::message::Log;

/// An opaque handle to a pushed snapshot layer. Carries no meaning outside
/// the `Ledger` that produced it — in particular, not an index a caller
/// should arithmetic on.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub struct SnapshotId(pub(crate) usize);

/// External capability the core's `Handler` impl is built on top of:
/// account balances/nonces/code/storage, EIP-1153 transient storage,
/// EIP-2929 access lists, logs, and the nested commit/rollback journal all
/// live behind this one trait (§4.5).
pub trait Ledger {
	fn get_balance(&self, address: H160) -> U256;
	fn add_balance(&mut self, address: H160, value: U256);
	/// Fails (leaving balances untouched) if `address` holds less than
	/// `value`.
	fn sub_balance(&mut self, address: H160, value: U256) -> Result<(), evmx_core::ExitError>;

	fn get_nonce(&self, address: H160) -> U256;
	fn inc_nonce(&mut self, address: H160) -> Result<(), evmx_core::ExitError>;
	fn set_nonce(&mut self, address: H160, nonce: U256);

	fn get_code(&self, address: H160) -> Vec<u8>;
	fn get_code_hash(&self, address: H160) -> H256;
	fn set_code(&mut self, address: H160, code: Vec<u8>);

	fn get_storage(&self, address: H160, slot: H256) -> H256;
	fn set_storage(&mut self, address: H160, slot: H256, value: H256);
	/// The slot's value at the start of the enclosing transaction, ignoring
	/// every `set_storage` since — the `original` the EIP-2200/3529 refund
	/// formula needs, distinct from `get_storage`'s live-in-frame value.
	fn get_original_storage(&self, address: H160, slot: H256) -> H256;

	/// EIP-1153: scoped to the enclosing transaction, cleared at its end
	/// regardless of the frame's own commit/rollback outcome.
	fn get_transient_storage(&self, address: H160, slot: H256) -> H256;
	fn set_transient_storage(&mut self, address: H160, slot: H256, value: H256);

	fn account_exists(&self, address: H160) -> bool;
	/// Balance zero, nonce zero, code empty (EIP-161).
	fn is_empty(&self, address: H160) -> bool;

	/// Moves `addr`'s entire balance to `beneficiary` and marks `addr` for
	/// deletion at the end of the transaction (EIP-6780 narrows this to the
	/// creation frame from Cancun on; the core leaves that check to the
	/// caller since it's a fork-gated policy, not a `Ledger` primitive).
	fn self_destruct(&mut self, addr: H160, beneficiary: H160) -> Result<(), evmx_core::ExitError>;
	/// Whether `self_destruct` has already been recorded for `address`
	/// earlier in this transaction.
	fn deleted(&self, address: H160) -> bool;

	/// Push a new snapshot layer, returning a handle to it.
	fn snapshot(&mut self) -> SnapshotId;
	/// Fold the snapshot's effects into the layer beneath and discard it.
	fn commit(&mut self, id: SnapshotId);
	/// Discard the snapshot and its effects entirely.
	fn rollback(&mut self, id: SnapshotId);

	/// EIP-2929/2930: mark `address` warm for the rest of the transaction.
	fn access_list_add_account(&mut self, address: H160);
	fn access_list_add_slot(&mut self, address: H160, slot: H256);
	fn is_account_warm(&self, address: H160) -> bool;
	fn is_slot_warm(&self, address: H160, slot: H256) -> bool;

	fn add_log(&mut self, address: H160, topics: Vec<H256>, data: Vec<u8>);
	/// Logs buffered in the current innermost snapshot, in emission order.
	/// Only meaningful to call once the whole transaction is finished
	/// (the interpreter reads it through `commit`'s propagation, not this
	/// directly, during normal execution).
	fn logs(&self) -> &[Log];
}
