use primitive_types::U256;

use crate::utils::I256;

pub fn slt(op1: U256, op2: U256) -> U256 {
	let op1: I256 = op1.into();
	let op2: I256 = op2.into();
	if op1.lt(&op2) {
		U256::one()
	} else {
		U256::zero()
	}
}

pub fn sgt(op1: U256, op2: U256) -> U256 {
	let op1: I256 = op1.into();
	let op2: I256 = op2.into();
	if op1.gt(&op2) {
		U256::one()
	} else {
		U256::zero()
	}
}

pub fn iszero(op1: U256) -> U256 {
	if op1.is_zero() {
		U256::one()
	} else {
		U256::zero()
	}
}

pub fn not(op1: U256) -> U256 {
	!op1
}

pub fn byte(op1: U256, op2: U256) -> U256 {
	let mut ret = U256::zero();

	for i in 0..256 {
		if i < 8 && op1 < 32.into() {
			let o: usize = op1.as_usize();
			let t = 255 - (7 - i + 8 * o);
			let bit_mask = U256::one() << t;
			let value = (op2 & bit_mask) >> t;
			ret = ret.overflowing_add(value << i).0;
		}
	}

	ret
}

pub fn shl(shift: U256, value: U256) -> U256 {
	if value.is_zero() || shift >= U256::from(256) {
		U256::zero()
	} else {
		value << shift.as_usize()
	}
}

pub fn shr(shift: U256, value: U256) -> U256 {
	if value.is_zero() || shift >= U256::from(256) {
		U256::zero()
	} else {
		value >> shift.as_usize()
	}
}

pub fn sar(shift: U256, value: U256) -> U256 {
	let value = I256::from(value);

	if value.1.is_zero() || shift >= U256::from(256) {
		if value.0 == crate::utils::Sign::Minus {
			U256::MAX
		} else {
			U256::zero()
		}
	} else {
		let shift = shift.as_usize();

		match value.0 {
			crate::utils::Sign::Plus | crate::utils::Sign::Zero => value.1 >> shift,
			crate::utils::Sign::Minus => {
				let shifted = ((value.1.overflowing_sub(U256::one()).0) >> shift)
					.overflowing_add(U256::one())
					.0;
				crate::utils::I256(crate::utils::Sign::Minus, shifted).into()
			}
		}
	}
}
