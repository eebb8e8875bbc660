/// Pop one or more `H256` words off the stack, bailing out with the
/// underflow error as an `Exit` the moment any pop fails.
macro_rules! pop {
	($machine:expr, $( $x:ident ),* ) => {
		$(
			let $x = match $machine.stack_mut().pop_h256() {
				Ok(value) => value,
				Err(e) => return Control::Exit(e.into()),
			};
		)*
	};
}

/// Pop one or more `U256` words off the stack.
macro_rules! pop_u256 {
	($machine:expr, $( $x:ident ),* ) => {
		$(
			let $x = match $machine.stack_mut().pop() {
				Ok(value) => value,
				Err(e) => return Control::Exit(e.into()),
			};
		)*
	};
}

/// Push an `H256` word, bailing out on overflow.
macro_rules! push {
	($machine:expr, $( $x:expr ),* ) => {
		$(
			match $machine.stack_mut().push_h256($x) {
				Ok(()) => (),
				Err(e) => return Control::Exit(e.into()),
			}
		)*
	};
}

/// Push a `U256` word, bailing out on overflow.
macro_rules! push_u256 {
	($machine:expr, $( $x:expr ),* ) => {
		$(
			match $machine.stack_mut().push($x) {
				Ok(()) => (),
				Err(e) => return Control::Exit(e.into()),
			}
		)*
	};
}

/// Cast a `U256` offset/length down to `usize`, exiting with `InvalidRange`
/// (or a caller-supplied error) if it doesn't fit.
macro_rules! as_usize_or_fail {
	( $v:expr ) => {
		as_usize_or_fail!($v, crate::ExitError::InvalidRange)
	};
	( $v:expr, $err:expr ) => {
		if $v > primitive_types::U256::from(usize::MAX) {
			return Control::Exit($err.into());
		} else {
			$v.as_usize()
		}
	};
}

/// Pop two `U256` operands, apply a `(U256, U256) -> (U256, bool)` method
/// (e.g. `overflowing_add`), push the result back. Overflow is silently
/// wrapped, matching EVM 256-bit modular arithmetic.
macro_rules! op2_u256_tuple {
	($machine:expr, $op:ident) => {{
		pop_u256!($machine, op1, op2);
		let (ret, _overflow) = op1.$op(op2);
		push_u256!($machine, ret);
		Control::Continue(1)
	}};
}

/// Pop two `U256` operands, apply a free function, push the result.
macro_rules! op2_u256_fn {
	($machine:expr, $op:path) => {{
		pop_u256!($machine, op1, op2);
		let ret = $op(op1, op2);
		push_u256!($machine, ret);
		Control::Continue(1)
	}};
}

/// Pop three `U256` operands, apply a free function, push the result.
macro_rules! op3_u256_fn {
	($machine:expr, $op:path) => {{
		pop_u256!($machine, op1, op2, op3);
		let ret = $op(op1, op2, op3);
		push_u256!($machine, ret);
		Control::Continue(1)
	}};
}

/// Pop one `U256` operand, apply a free function, push the result.
macro_rules! op1_u256_fn {
	($machine:expr, $op:path) => {{
		pop_u256!($machine, op1);
		let ret = $op(op1);
		push_u256!($machine, ret);
		Control::Continue(1)
	}};
}

/// Pop two `U256` operands, apply a `core::ops` trait method (`bitand` /
/// `bitor` / `bitxor`), push the result.
macro_rules! op2_u256 {
	($machine:expr, $op:ident) => {{
		pop_u256!($machine, op1, op2);
		let ret = op1.$op(op2);
		push_u256!($machine, ret);
		Control::Continue(1)
	}};
}

/// Pop two `U256` operands, apply a `PartialOrd`/`PartialEq` comparison,
/// push `1`/`0`.
macro_rules! op2_u256_bool {
	($machine:expr, $op:ident) => {{
		pop_u256!($machine, op1, op2);
		let ret = if op1.$op(&op2) {
			primitive_types::U256::one()
		} else {
			primitive_types::U256::zero()
		};
		push_u256!($machine, ret);
		Control::Continue(1)
	}};
}
