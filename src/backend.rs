//! `MemoryLedger` (§3, §4.5): an in-memory, nested-transactional reference
//! implementation of `Ledger`. Grounded on the classic `MemoryBackend`
//! (flat `BTreeMap<H160, MemoryAccount>` plus a `MemoryVicinity` of block/tx
//! context) enriched by the overlayed backend's snapshot-of-sets journal —
//! here flattened to an explicit `Vec<Substate>` stack rather than a
//! parent-linked chain, since the `Ledger` contract is already LIFO and a
//! `Vec` makes that discipline checkable at `commit`/`rollback` time instead
//! of merely assumed.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::vec::Vec;

use evmx_core::ExitError;
use primitive_types::{H160, H256, U256};

use crate::ledger::{Ledger, SnapshotId};
use crate::message::Log;

/// Block and transaction context a `MemoryLedger` answers environmental
/// queries from. Set once per transaction; the interpreter never mutates
/// it.
#[derive(Clone, Debug)]
pub struct MemoryVicinity {
	pub gas_price: U256,
	pub origin: H160,
	pub chain_id: U256,
	/// Most recent 256 block hashes, ordered oldest (`[0]`) to newest.
	pub block_hashes: Vec<H256>,
	pub block_number: U256,
	pub block_coinbase: H160,
	pub block_timestamp: U256,
	pub block_difficulty: U256,
	/// `Some` from the Merge onward (EIP-4399 `PREVRANDAO`); `None` before.
	pub block_randomness: Option<H256>,
	pub block_gas_limit: U256,
	pub block_base_fee_per_gas: U256,
}

#[derive(Clone, Debug, Default)]
pub struct MemoryAccount {
	pub nonce: U256,
	pub balance: U256,
	pub storage: BTreeMap<H256, H256>,
	pub code: Vec<u8>,
}

/// One journal layer: everything written since the matching `snapshot()`
/// call, applied on top of everything beneath it. `storage_resets` records
/// an account whose storage was cleared wholesale (a `CREATE`/`CREATE2`
/// redeploying over a self-destructed account) so a lookup miss here reads
/// as zero rather than falling through to a stale value underneath.
#[derive(Default)]
struct Substate {
	logs: Vec<Log>,
	balances: BTreeMap<H160, U256>,
	nonces: BTreeMap<H160, U256>,
	codes: BTreeMap<H160, Vec<u8>>,
	storages: BTreeMap<(H160, H256), H256>,
	storage_resets: BTreeSet<H160>,
	transient_storages: BTreeMap<(H160, H256), H256>,
	deletes: BTreeSet<H160>,
}

pub struct MemoryLedger {
	vicinity: MemoryVicinity,
	accounts: BTreeMap<H160, MemoryAccount>,
	substates: Vec<Substate>,
	/// EIP-2929 warm sets. Kept flat rather than journaled per substate:
	/// once an address or slot has been paid for this transaction it stays
	/// warm even if the frame that touched it reverts, matching mainnet's
	/// actual access-list semantics.
	accessed_addresses: BTreeSet<H160>,
	accessed_storage: BTreeSet<(H160, H256)>,
}

impl MemoryLedger {
	pub fn new(vicinity: MemoryVicinity, accounts: BTreeMap<H160, MemoryAccount>) -> Self {
		Self {
			vicinity,
			accounts,
			substates: alloc::vec![Substate::default()],
			accessed_addresses: BTreeSet::new(),
			accessed_storage: BTreeSet::new(),
		}
	}

	pub fn vicinity(&self) -> &MemoryVicinity {
		&self.vicinity
	}

	/// EIP-1153: wipe all transient storage. Callers invoke this once per
	/// transaction boundary — the interpreter itself never spans more than
	/// one transaction, so it never needs to.
	pub fn clear_transient_storage(&mut self) {
		for substate in &mut self.substates {
			substate.transient_storages.clear();
		}
	}

	/// Flatten the current (necessarily single, post-transaction) substate
	/// back into the base account map. Call once a transaction's outermost
	/// frame has committed, before starting the next transaction.
	pub fn apply(&mut self) {
		assert_eq!(self.substates.len(), 1, "uneven snapshot nesting at apply time");
		let top = self.substates.pop().unwrap();
		for address in top.storage_resets {
			self.accounts.entry(address).or_default().storage.clear();
		}
		for ((address, key), value) in top.storages {
			self.accounts.entry(address).or_default().storage.insert(key, value);
		}
		for (address, balance) in top.balances {
			self.accounts.entry(address).or_default().balance = balance;
		}
		for (address, nonce) in top.nonces {
			self.accounts.entry(address).or_default().nonce = nonce;
		}
		for (address, code) in top.codes {
			self.accounts.entry(address).or_default().code = code;
		}
		for address in top.deletes {
			self.accounts.remove(&address);
		}
		self.substates.push(Substate::default());
	}

	fn known_balance(&self, address: H160) -> Option<U256> {
		self.substates.iter().rev().find_map(|s| s.balances.get(&address).copied())
	}

	fn known_nonce(&self, address: H160) -> Option<U256> {
		self.substates.iter().rev().find_map(|s| s.nonces.get(&address).copied())
	}

	fn known_code(&self, address: H160) -> Option<Vec<u8>> {
		self.substates.iter().rev().find_map(|s| s.codes.get(&address).cloned())
	}

	fn known_storage(&self, address: H160, key: H256) -> Option<H256> {
		for substate in self.substates.iter().rev() {
			if let Some(value) = substate.storages.get(&(address, key)) {
				return Some(*value);
			}
			if substate.storage_resets.contains(&address) {
				return Some(H256::default());
			}
		}
		None
	}

	fn known_transient_storage(&self, address: H160, key: H256) -> Option<H256> {
		self.substates
			.iter()
			.rev()
			.find_map(|s| s.transient_storages.get(&(address, key)).copied())
	}

	fn known_deleted(&self, address: H160) -> bool {
		self.substates.iter().rev().any(|s| s.deletes.contains(&address))
	}

	fn top(&mut self) -> &mut Substate {
		self.substates.last_mut().expect("substate stack is never empty")
	}
}

impl Ledger for MemoryLedger {
	fn get_balance(&self, address: H160) -> U256 {
		self.known_balance(address)
			.unwrap_or_else(|| self.accounts.get(&address).map(|a| a.balance).unwrap_or_default())
	}

	fn add_balance(&mut self, address: H160, value: U256) {
		if value.is_zero() {
			return;
		}
		let balance = self.get_balance(address).saturating_add(value);
		self.top().balances.insert(address, balance);
	}

	fn sub_balance(&mut self, address: H160, value: U256) -> Result<(), ExitError> {
		if value.is_zero() {
			return Ok(());
		}
		let balance = self.get_balance(address);
		if balance < value {
			return Err(ExitError::OutOfFund);
		}
		self.top().balances.insert(address, balance - value);
		Ok(())
	}

	fn get_nonce(&self, address: H160) -> U256 {
		self.known_nonce(address)
			.unwrap_or_else(|| self.accounts.get(&address).map(|a| a.nonce).unwrap_or_default())
	}

	fn inc_nonce(&mut self, address: H160) -> Result<(), ExitError> {
		let nonce = self.get_nonce(address);
		let nonce = nonce.checked_add(U256::one()).ok_or(ExitError::MaxNonce)?;
		self.top().nonces.insert(address, nonce);
		Ok(())
	}

	fn set_nonce(&mut self, address: H160, nonce: U256) {
		self.top().nonces.insert(address, nonce);
	}

	fn get_code(&self, address: H160) -> Vec<u8> {
		self.known_code(address)
			.unwrap_or_else(|| self.accounts.get(&address).map(|a| a.code.clone()).unwrap_or_default())
	}

	fn get_code_hash(&self, address: H160) -> H256 {
		use sha3::Digest;
		let code = self.get_code(address);
		if code.is_empty() {
			return H256::default();
		}
		H256::from_slice(sha3::Keccak256::digest(&code).as_slice())
	}

	fn set_code(&mut self, address: H160, code: Vec<u8>) {
		self.top().codes.insert(address, code);
	}

	fn get_storage(&self, address: H160, slot: H256) -> H256 {
		self.known_storage(address, slot).unwrap_or_else(|| {
			self.accounts.get(&address).and_then(|a| a.storage.get(&slot).copied()).unwrap_or_default()
		})
	}

	fn set_storage(&mut self, address: H160, slot: H256, value: H256) {
		self.top().storages.insert((address, slot), value);
	}

	fn get_original_storage(&self, address: H160, slot: H256) -> H256 {
		self.accounts.get(&address).and_then(|a| a.storage.get(&slot).copied()).unwrap_or_default()
	}

	fn get_transient_storage(&self, address: H160, slot: H256) -> H256 {
		self.known_transient_storage(address, slot).unwrap_or_default()
	}

	fn set_transient_storage(&mut self, address: H160, slot: H256, value: H256) {
		self.top().transient_storages.insert((address, slot), value);
	}

	fn account_exists(&self, address: H160) -> bool {
		if self.known_deleted(address) {
			return false;
		}
		self.known_balance(address).is_some()
			|| self.known_nonce(address).is_some()
			|| self.known_code(address).is_some()
			|| self.accounts.contains_key(&address)
	}

	fn is_empty(&self, address: H160) -> bool {
		self.get_balance(address).is_zero() && self.get_nonce(address).is_zero() && self.get_code(address).is_empty()
	}

	fn self_destruct(&mut self, addr: H160, beneficiary: H160) -> Result<(), ExitError> {
		let balance = self.get_balance(addr);
		if addr != beneficiary {
			self.sub_balance(addr, balance)?;
			self.add_balance(beneficiary, balance);
		}
		self.top().deletes.insert(addr);
		Ok(())
	}

	fn deleted(&self, address: H160) -> bool {
		self.known_deleted(address)
	}

	fn snapshot(&mut self) -> SnapshotId {
		let id = SnapshotId(self.substates.len());
		self.substates.push(Substate::default());
		id
	}

	fn commit(&mut self, id: SnapshotId) {
		assert_eq!(self.substates.len() - 1, id.0, "commit of a non-innermost snapshot");
		let child = self.substates.pop().expect("snapshot exists");
		let parent = self.top();
		parent.logs.extend(child.logs);
		parent.balances.extend(child.balances);
		parent.nonces.extend(child.nonces);
		parent.codes.extend(child.codes);
		parent.storage_resets.extend(child.storage_resets);
		parent.storages.extend(child.storages);
		parent.transient_storages.extend(child.transient_storages);
		parent.deletes.extend(child.deletes);
	}

	fn rollback(&mut self, id: SnapshotId) {
		assert_eq!(self.substates.len() - 1, id.0, "rollback of a non-innermost snapshot");
		self.substates.pop();
	}

	fn access_list_add_account(&mut self, address: H160) {
		self.accessed_addresses.insert(address);
	}

	fn access_list_add_slot(&mut self, address: H160, slot: H256) {
		self.accessed_addresses.insert(address);
		self.accessed_storage.insert((address, slot));
	}

	fn is_account_warm(&self, address: H160) -> bool {
		self.accessed_addresses.contains(&address)
	}

	fn is_slot_warm(&self, address: H160, slot: H256) -> bool {
		self.accessed_storage.contains(&(address, slot))
	}

	fn add_log(&mut self, address: H160, topics: Vec<H256>, data: Vec<u8>) {
		self.top().logs.push(Log { address, topics, data });
	}

	fn logs(&self) -> &[Log] {
		&self.substates.first().expect("substate stack is never empty").logs
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn vicinity() -> MemoryVicinity {
		MemoryVicinity {
			gas_price: U256::zero(),
			origin: H160::zero(),
			chain_id: U256::one(),
			block_hashes: Vec::new(),
			block_number: U256::zero(),
			block_coinbase: H160::zero(),
			block_timestamp: U256::zero(),
			block_difficulty: U256::zero(),
			block_randomness: None,
			block_gas_limit: U256::from(30_000_000u64),
			block_base_fee_per_gas: U256::zero(),
		}
	}

	#[test]
	fn rollback_discards_balance_changes() {
		let mut ledger = MemoryLedger::new(vicinity(), BTreeMap::new());
		let addr = H160::repeat_byte(0xAA);
		ledger.add_balance(addr, U256::from(100));

		let snap = ledger.snapshot();
		ledger.add_balance(addr, U256::from(50));
		assert_eq!(ledger.get_balance(addr), U256::from(150));
		ledger.rollback(snap);

		assert_eq!(ledger.get_balance(addr), U256::from(100));
	}

	#[test]
	fn commit_propagates_storage_to_parent() {
		let mut ledger = MemoryLedger::new(vicinity(), BTreeMap::new());
		let addr = H160::repeat_byte(0xBB);
		let slot = H256::zero();

		let snap = ledger.snapshot();
		ledger.set_storage(addr, slot, H256::repeat_byte(0x42));
		ledger.commit(snap);

		assert_eq!(ledger.get_storage(addr, slot), H256::repeat_byte(0x42));
	}

	#[test]
	fn warm_access_list_survives_rollback() {
		let mut ledger = MemoryLedger::new(vicinity(), BTreeMap::new());
		let addr = H160::repeat_byte(0xCC);

		let snap = ledger.snapshot();
		ledger.access_list_add_account(addr);
		ledger.rollback(snap);

		assert!(ledger.is_account_warm(addr));
	}
}
