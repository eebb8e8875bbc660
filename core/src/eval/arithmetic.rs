use primitive_types::{U256, U512};

use crate::utils::I256;

pub fn div(op1: U256, op2: U256) -> U256 {
	if op2.is_zero() {
		U256::zero()
	} else {
		op1 / op2
	}
}

pub fn sdiv(op1: U256, op2: U256) -> U256 {
	let op1: I256 = op1.into();
	let op2: I256 = op2.into();
	(op1 / op2).into()
}

pub fn rem(op1: U256, op2: U256) -> U256 {
	if op2.is_zero() {
		U256::zero()
	} else {
		op1 % op2
	}
}

pub fn srem(op1: U256, op2: U256) -> U256 {
	if op2.is_zero() {
		U256::zero()
	} else {
		let op1: I256 = op1.into();
		let op2: I256 = op2.into();
		(op1 % op2).into()
	}
}

pub fn addmod(op1: U256, op2: U256, op3: U256) -> U256 {
	let op1 = U512::from(op1);
	let op2 = U512::from(op2);
	let op3 = U512::from(op3);

	if op3 == U512::zero() {
		U256::zero()
	} else {
		let v = (op1 + op2) % op3;
		v.try_into().unwrap_or(U256::MAX)
	}
}

pub fn mulmod(op1: U256, op2: U256, op3: U256) -> U256 {
	let op1 = U512::from(op1);
	let op2 = U512::from(op2);
	let op3 = U512::from(op3);

	if op3 == U512::zero() {
		U256::zero()
	} else {
		let v = (op1 * op2) % op3;
		v.try_into().unwrap_or(U256::MAX)
	}
}

pub fn exp(op1: U256, op2: U256) -> U256 {
	let mut op1 = op1;
	let mut op2 = op2;
	let mut r: U256 = 1.into();

	while op2 != 0.into() {
		if op2 & 1.into() != 0.into() {
			r = r.overflowing_mul(op1).0;
		}
		op2 >>= 1;
		op1 = op1.overflowing_mul(op1).0;
	}

	r
}

pub fn signextend(op1: U256, op2: U256) -> U256 {
	if op1 > U256::from(32) {
		op2
	} else {
		let bit_index = (8 * op1.low_u32() + 7) as usize;
		let bit = op2.bit(bit_index);
		let mask = (U256::one() << bit_index) - U256::one();
		if bit {
			op2 | !mask
		} else {
			op2 & mask
		}
	}
}
