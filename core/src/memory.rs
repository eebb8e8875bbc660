use alloc::vec::Vec;
use primitive_types::U256;

use crate::ExitError;

/// Round `x` up to the next multiple of 32.
fn ceil32(x: usize) -> usize {
	if x % 32 == 0 {
		x
	} else {
		x / 32 * 32 + 32
	}
}

/// Byte-addressable linear memory (§4.2). Length is always a multiple of
/// 32 and only ever grows during a frame's lifetime; reads past the current
/// length return zero, writes past it are the caller's responsibility to
/// `resize` for first (gas-metered growth happens in `evmx-gasometer`).
#[derive(Clone, Debug)]
pub struct Memory {
	data: Vec<u8>,
	limit: usize,
}

impl Memory {
	/// Create empty memory bounded by `limit` bytes (a host-level ceiling,
	/// not a fork parameter).
	pub fn new(limit: usize) -> Self {
		Self {
			data: Vec::new(),
			limit,
		}
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
	pub fn data(&self) -> &[u8] {
		&self.data
	}

	/// The word-aligned length memory would have after growing to cover
	/// `offset + size` bytes, without mutating `self`. Used by the
	/// gasometer to price expansion before committing to it.
	pub fn resize_offset(&self, offset: U256, size: U256) -> Result<usize, ExitError> {
		if size.is_zero() {
			return Ok(self.len());
		}

		let end = offset
			.checked_add(size)
			.ok_or(ExitError::InvalidRange)?;
		if end > U256::from(usize::MAX) {
			return Err(ExitError::InvalidRange);
		}
		let end = end.as_usize();
		Ok(core::cmp::max(self.len(), ceil32(end)))
	}

	/// `extend(offset, size)`: grow to `ceil32(offset + size)`. No-op if
	/// `size == 0` or the new length would not exceed the current one.
	/// Newly allocated bytes are zero.
	pub fn resize(&mut self, offset: usize, size: usize) -> Result<(), ExitError> {
		if size == 0 {
			return Ok(());
		}

		let end = offset.checked_add(size).ok_or(ExitError::InvalidRange)?;
		let new_len = ceil32(end);

		if new_len <= self.data.len() {
			return Ok(());
		}
		if new_len > self.limit {
			return Err(ExitError::InvalidRange);
		}

		self.data.resize(new_len, 0);
		Ok(())
	}

	/// `read(offset, size)`: a `size`-byte slice, zero-padded past the
	/// current length.
	pub fn get(&self, offset: usize, size: usize) -> Vec<u8> {
		let mut buf = Vec::with_capacity(size);
		for i in offset..offset + size {
			buf.push(self.data.get(i).copied().unwrap_or(0));
		}
		buf
	}

	/// `write(offset, value)`: overwrite `value.len()` bytes starting at
	/// `offset`. The caller must have already `resize`d far enough;
	/// `target_size`, if given, only writes that many bytes of `value`
	/// (padding with zero beyond `value`'s end) which is how `MSTORE8` and
	/// `PUSH`-sized writes use this.
	pub fn set(
		&mut self,
		offset: usize,
		value: &[u8],
		target_size: Option<usize>,
	) -> Result<(), ExitError> {
		let target_size = target_size.unwrap_or(value.len());
		if target_size == 0 {
			return Ok(());
		}

		if offset.checked_add(target_size).map(|end| end > self.data.len()) != Some(false) {
			return Err(ExitError::InvalidRange);
		}

		self.write_padded(value, offset, 0, target_size);
		Ok(())
	}

	/// `write_padded(data, mem_offset, data_offset, len)`: write
	/// `data[data_offset..]` into `[mem_offset..mem_offset+len)`,
	/// zero-filling whatever runs past `data`'s end. Caller must have
	/// already resized memory to cover the target range.
	pub fn write_padded(&mut self, data: &[u8], mem_offset: usize, data_offset: usize, len: usize) {
		for i in 0..len {
			let byte = data_offset
				.checked_add(i)
				.and_then(|idx| data.get(idx))
				.copied()
				.unwrap_or(0);
			self.data[mem_offset + i] = byte;
		}
	}

	/// Resize to cover `[offset, offset+len)` then `write_padded` from
	/// `data`. This is the gas-unaware counterpart of opcodes like
	/// `CALLDATACOPY`/`CODECOPY`/`EXTCODECOPY`/`RETURNDATACOPY` which have
	/// already charged memory expansion through the gasometer.
	pub fn copy_large(
		&mut self,
		memory_offset: U256,
		data_offset: U256,
		len: U256,
		data: &[u8],
	) -> Result<(), ExitError> {
		let memory_offset = as_usize_or_invalid_range(memory_offset)?;
		let ulen = as_usize_or_invalid_range(len)?;
		if ulen == 0 {
			return Ok(());
		}

		self.resize(memory_offset, ulen)?;

		let data_offset = if data_offset > U256::from(usize::MAX) {
			usize::MAX
		} else {
			data_offset.as_usize()
		};

		self.write_padded(data, memory_offset, data_offset, ulen);
		Ok(())
	}

	/// `copy(dst, src, len)`: memmove semantics (`MCOPY`, EIP-5656),
	/// correct in both directions of overlap.
	pub fn copy_within(&mut self, dst: usize, src: usize, len: usize) -> Result<(), ExitError> {
		if len == 0 {
			return Ok(());
		}
		let max_end = core::cmp::max(
			dst.checked_add(len).ok_or(ExitError::InvalidRange)?,
			src.checked_add(len).ok_or(ExitError::InvalidRange)?,
		);
		self.resize(0, max_end)?;
		self.data.copy_within(src..src + len, dst);
		Ok(())
	}
}

fn as_usize_or_invalid_range(value: U256) -> Result<usize, ExitError> {
	if value > U256::from(usize::MAX) {
		Err(ExitError::InvalidRange)
	} else {
		Ok(value.as_usize())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn resize_is_word_aligned() {
		let mut mem = Memory::new(usize::MAX);
		mem.resize(0, 1).unwrap();
		assert_eq!(mem.len(), 32);
	}

	#[test]
	fn resize_is_monotonic() {
		let mut mem = Memory::new(usize::MAX);
		mem.resize(0, 64).unwrap();
		mem.resize(0, 1).unwrap();
		assert_eq!(mem.len(), 64);
	}

	#[test]
	fn reads_past_length_are_zero() {
		let mem = Memory::new(usize::MAX);
		assert_eq!(mem.get(0, 4), vec![0, 0, 0, 0]);
	}

	#[test]
	fn write_then_read_roundtrips() {
		let mut mem = Memory::new(usize::MAX);
		mem.resize(0, 32).unwrap();
		mem.set(0, &[0x42], None).unwrap();
		assert_eq!(mem.get(0, 1), vec![0x42]);
	}

	#[test]
	fn copy_within_handles_forward_overlap() {
		let mut mem = Memory::new(usize::MAX);
		mem.resize(0, 64).unwrap();
		mem.set(0, &[1, 2, 3, 4], None).unwrap();
		mem.copy_within(2, 0, 4).unwrap();
		assert_eq!(mem.get(0, 6), vec![1, 2, 1, 2, 3, 4]);
	}
}
