use alloc::vec::Vec;
use primitive_types::{H256, U256};

use crate::ExitError;

/// Bounded 256-bit-word stack (§4.1). `limit` is the fork's configured
/// capacity, always 1024 on mainnet.
#[derive(Clone, Debug)]
pub struct Stack {
	data: Vec<U256>,
	limit: usize,
}

impl Stack {
	/// Create an empty stack with the given capacity.
	pub fn new(limit: usize) -> Self {
		Self {
			data: Vec::new(),
			limit,
		}
	}

	#[inline]
	pub fn limit(&self) -> usize {
		self.limit
	}

	#[inline]
	pub fn len(&self) -> usize {
		self.data.len()
	}

	#[inline]
	pub fn is_empty(&self) -> bool {
		self.data.is_empty()
	}

	#[inline]
	pub fn data(&self) -> &[U256] {
		&self.data
	}

	/// Pop the top value. `StackUnderflow` if empty.
	#[inline]
	pub fn pop(&mut self) -> Result<U256, ExitError> {
		self.data.pop().ok_or(ExitError::StackUnderflow)
	}

	#[inline]
	pub fn pop_h256(&mut self) -> Result<H256, ExitError> {
		self.pop().map(u256_to_h256)
	}

	/// Push a value. `StackOverflow` (leaving the stack unchanged) once
	/// `len == limit`.
	#[inline]
	pub fn push(&mut self, value: U256) -> Result<(), ExitError> {
		if self.data.len() >= self.limit {
			return Err(ExitError::StackOverflow);
		}
		self.data.push(value);
		Ok(())
	}

	#[inline]
	pub fn push_h256(&mut self, value: H256) -> Result<(), ExitError> {
		self.push(U256::from_big_endian(&value[..]))
	}

	/// Peek the `no_from_top`-th item from the top (`0` = top itself).
	#[inline]
	pub fn peek(&self, no_from_top: usize) -> Result<U256, ExitError> {
		if self.data.len() > no_from_top {
			Ok(self.data[self.data.len() - no_from_top - 1])
		} else {
			Err(ExitError::StackUnderflow)
		}
	}

	#[inline]
	pub fn peek_h256(&self, no_from_top: usize) -> Result<H256, ExitError> {
		self.peek(no_from_top).map(u256_to_h256)
	}

	/// Overwrite the `no_from_top`-th item from the top.
	#[inline]
	pub fn set(&mut self, no_from_top: usize, value: U256) -> Result<(), ExitError> {
		if self.data.len() > no_from_top {
			let len = self.data.len();
			self.data[len - no_from_top - 1] = value;
			Ok(())
		} else {
			Err(ExitError::StackUnderflow)
		}
	}

	/// `SWAPn`: exchange the top with the `n+1`-th item from the top.
	/// `1 <= n <= 16`.
	pub fn swap(&mut self, n: usize) -> Result<(), ExitError> {
		let top = self.peek(0)?;
		let other = self.peek(n)?;
		self.set(0, other)?;
		self.set(n, top)?;
		Ok(())
	}

	/// `DUPn`: push a copy of the `n`-th item from the top. `1 <= n <= 16`.
	pub fn dup(&mut self, n: usize) -> Result<(), ExitError> {
		let value = self.peek(n - 1)?;
		self.push(value)
	}
}

fn u256_to_h256(value: U256) -> H256 {
	let mut bytes = [0u8; 32];
	value.to_big_endian(&mut bytes);
	H256(bytes)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn push_pop_roundtrip() {
		let mut stack = Stack::new(4);
		stack.push(U256::from(42)).unwrap();
		assert_eq!(stack.len(), 1);
		assert_eq!(stack.pop().unwrap(), U256::from(42));
		assert!(stack.is_empty());
	}

	#[test]
	fn overflow_at_limit() {
		let mut stack = Stack::new(2);
		stack.push(U256::one()).unwrap();
		stack.push(U256::one()).unwrap();
		assert_eq!(stack.push(U256::one()), Err(ExitError::StackOverflow));
	}

	#[test]
	fn underflow_on_empty() {
		let mut stack = Stack::new(4);
		assert_eq!(stack.pop(), Err(ExitError::StackUnderflow));
	}

	#[test]
	fn swap_exchanges_top_and_nth() {
		let mut stack = Stack::new(4);
		for v in [1u64, 2, 3] {
			stack.push(U256::from(v)).unwrap();
		}
		stack.swap(2).unwrap();
		assert_eq!(stack.data(), &[U256::from(3), U256::from(2), U256::from(1)]);
	}

	#[test]
	fn dup_pushes_copy() {
		let mut stack = Stack::new(4);
		stack.push(U256::from(7)).unwrap();
		stack.dup(1).unwrap();
		assert_eq!(stack.data(), &[U256::from(7), U256::from(7)]);
	}
}
