//! Built-in operator semantics.
//!
//! Direct enum-based dispatch on operand pairs. User-defined operators
//! (class, record and global `operator` declarations) are resolved by the
//! interpreter before or after these functions run; this module only knows
//! the fixed set of built-in value types.

use std::cmp::Ordering;

use dws_ir::{BinaryOp, UnaryOp};
use dws_runtime::convert::{compare_values, ordinal_value, values_equal};
use dws_runtime::errors::{
    binary_type_mismatch, division_by_zero, integer_overflow, invalid_binary_op, invalid_unary_op,
};
use dws_runtime::{ArrayValue, EvalError, EvalErrorKind, SetDomain, SetValue, Value};

type OpResult = Result<Value, EvalError>;

// Arithmetic Helpers

#[inline]
fn checked_arith(result: Option<i64>, operation: &str) -> OpResult {
    result
        .map(Value::Integer)
        .ok_or_else(|| integer_overflow(operation))
}

#[inline]
fn checked_div(divisor: i64, result: impl FnOnce() -> Option<i64>, operation: &str) -> OpResult {
    if divisor == 0 {
        return Err(division_by_zero());
    }
    checked_arith(result(), operation)
}

/// Shift with the amount limited to the integer width; larger shifts
/// produce zero. `shr` is a logical shift.
#[expect(
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    reason = "logical shift reinterprets the bits"
)]
fn shift(value: i64, amount: i64, op: BinaryOp) -> OpResult {
    let Ok(amount) = u32::try_from(amount) else {
        return Err(integer_overflow(op.as_symbol()));
    };
    let result = match op {
        BinaryOp::Shl => value.checked_shl(amount).unwrap_or(0),
        _ => (value as u64).checked_shr(amount).map_or(0, |v| v as i64),
    };
    Ok(Value::Integer(result))
}

// Direct Dispatch

/// Evaluate a built-in binary operator.
///
/// Variant operands are unboxed first. `=`/`<>` fall back to script
/// equality for any pair of operands.
pub fn binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> OpResult {
    let (left, right) = (lhs.unboxed(), rhs.unboxed());
    match op {
        BinaryOp::Coalesce => {
            return Ok(if left.is_unassigned() || left.is_nil() {
                rhs.clone()
            } else {
                lhs.clone()
            });
        }
        BinaryOp::In => return eval_in(left, right),
        _ => {}
    }
    match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => eval_int_binary(*a, *b, op),
        (Value::Float(a), Value::Float(b)) => eval_float_binary(*a, *b, op),
        #[expect(clippy::cast_precision_loss, reason = "Integer widens to Float")]
        (Value::Integer(a), Value::Float(b)) => eval_float_binary(*a as f64, *b, op),
        #[expect(clippy::cast_precision_loss, reason = "Integer widens to Float")]
        (Value::Float(a), Value::Integer(b)) => eval_float_binary(*a, *b as f64, op),
        (Value::String(a), Value::String(b)) => eval_string_binary(a, b, op),
        (Value::Boolean(a), Value::Boolean(b)) => eval_bool_binary(*a, *b, op),
        (Value::Set(a), Value::Set(b)) => eval_set_binary(a, b, op),
        (Value::Array(a), Value::Array(b)) if op == BinaryOp::Add => concat_arrays(a, b),
        _ => match op {
            BinaryOp::Eq => Ok(Value::Boolean(values_equal(left, right))),
            BinaryOp::NotEq => Ok(Value::Boolean(!values_equal(left, right))),
            BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
                compare(left, right, op)
            }
            _ => Err(binary_type_mismatch(
                &left.type_name(),
                &right.type_name(),
                op,
            )),
        },
    }
}

/// Whether `err` means the operands were of the wrong types, as opposed to a
/// failure of a well-typed operation (overflow, division by zero).
pub fn is_operand_error(err: &EvalError) -> bool {
    matches!(
        err.kind,
        EvalErrorKind::TypeMismatch { .. }
            | EvalErrorKind::InvalidBinaryOp { .. }
            | EvalErrorKind::BinaryTypeMismatch { .. }
    )
}

// Type-Specific Evaluation Functions

/// Binary operations on integers. `and`/`or`/`xor` are bitwise.
fn eval_int_binary(a: i64, b: i64, op: BinaryOp) -> OpResult {
    match op {
        BinaryOp::Add => checked_arith(a.checked_add(b), "addition"),
        BinaryOp::Sub => checked_arith(a.checked_sub(b), "subtraction"),
        BinaryOp::Mul => checked_arith(a.checked_mul(b), "multiplication"),
        #[expect(clippy::cast_precision_loss, reason = "`/` always divides as Float")]
        BinaryOp::Div => {
            if b == 0 {
                return Err(division_by_zero());
            }
            Ok(Value::Float(a as f64 / b as f64))
        }
        BinaryOp::IntDiv => checked_div(b, || a.checked_div(b), "division"),
        BinaryOp::Mod => checked_div(b, || a.checked_rem(b), "remainder"),
        BinaryOp::And => Ok(Value::Integer(a & b)),
        BinaryOp::Or => Ok(Value::Integer(a | b)),
        BinaryOp::Xor => Ok(Value::Integer(a ^ b)),
        BinaryOp::Shl | BinaryOp::Shr => shift(a, b, op),
        _ => compare_ordered(a.cmp(&b), op, "Integer"),
    }
}

/// Binary operations on floats. Mixed Integer/Float operands arrive here
/// widened.
fn eval_float_binary(a: f64, b: f64, op: BinaryOp) -> OpResult {
    match op {
        BinaryOp::Add => Ok(Value::Float(a + b)),
        BinaryOp::Sub => Ok(Value::Float(a - b)),
        BinaryOp::Mul => Ok(Value::Float(a * b)),
        BinaryOp::Div => {
            if b == 0.0 {
                return Err(division_by_zero());
            }
            Ok(Value::Float(a / b))
        }
        BinaryOp::Eq => Ok(Value::Boolean(a.partial_cmp(&b) == Some(Ordering::Equal))),
        BinaryOp::NotEq => Ok(Value::Boolean(a.partial_cmp(&b) != Some(Ordering::Equal))),
        BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
            // NaN orders with nothing
            match a.partial_cmp(&b) {
                Some(ordering) => compare_ordered(ordering, op, "Float"),
                None => Ok(Value::Boolean(false)),
            }
        }
        _ => Err(invalid_binary_op("Float", op)),
    }
}

fn eval_string_binary(a: &str, b: &str, op: BinaryOp) -> OpResult {
    match op {
        BinaryOp::Add => Ok(Value::string(format!("{a}{b}"))),
        _ => compare_ordered(a.cmp(b), op, "String"),
    }
}

fn eval_bool_binary(a: bool, b: bool, op: BinaryOp) -> OpResult {
    match op {
        BinaryOp::And => Ok(Value::Boolean(a && b)),
        BinaryOp::Or => Ok(Value::Boolean(a || b)),
        BinaryOp::Xor => Ok(Value::Boolean(a ^ b)),
        BinaryOp::Implies => Ok(Value::Boolean(!a || b)),
        _ => compare_ordered(a.cmp(&b), op, "Boolean"),
    }
}

/// Set algebra. `<=`/`>=` test inclusion.
fn eval_set_binary(a: &SetValue, b: &SetValue, op: BinaryOp) -> OpResult {
    if !a.compatible_with(b) {
        return Err(binary_type_mismatch(&set_name(a), &set_name(b), op));
    }
    // An untyped literal operand takes the other side's domain.
    let (a, b) = match (a.domain(), b.domain()) {
        (SetDomain::Ordinal, SetDomain::Enum(_)) => {
            (SetValue::from_ordinals(b.domain().clone(), a.ordinals()), b.clone())
        }
        _ => (a.clone(), b.clone()),
    };
    match op {
        BinaryOp::Add => Ok(Value::Set(a.union(&b))),
        BinaryOp::Sub => Ok(Value::Set(a.difference(&b))),
        BinaryOp::Mul => Ok(Value::Set(a.intersection(&b))),
        BinaryOp::Eq => Ok(Value::Boolean(a.same_members(&b))),
        BinaryOp::NotEq => Ok(Value::Boolean(!a.same_members(&b))),
        BinaryOp::LtEq => Ok(Value::Boolean(a.is_subset(&b))),
        BinaryOp::GtEq => Ok(Value::Boolean(b.is_subset(&a))),
        _ => Err(invalid_binary_op("set", op)),
    }
}

fn set_name(set: &SetValue) -> String {
    match set.enum_type() {
        Some(ty) => format!("set of {}", ty.name),
        None => "set".to_string(),
    }
}

/// `+` on dynamic arrays of the same element type.
fn concat_arrays(a: &ArrayValue, b: &ArrayValue) -> OpResult {
    if a.element_type() != b.element_type() {
        return Err(binary_type_mismatch(
            &Value::Array(a.clone()).type_name(),
            &Value::Array(b.clone()).type_name(),
            BinaryOp::Add,
        ));
    }
    let mut items = a.to_vec();
    items.extend(b.to_vec());
    Ok(Value::Array(ArrayValue::dynamic(a.element_type().clone(), items)))
}

/// `x in s`: set membership by ordinal, or element search in an array.
fn eval_in(needle: &Value, haystack: &Value) -> OpResult {
    match haystack {
        Value::Set(set) => match ordinal_value(needle) {
            Some(ord) => Ok(Value::Boolean(set.contains(ord))),
            None => Err(binary_type_mismatch(
                &needle.type_name(),
                &set_name(set),
                BinaryOp::In,
            )),
        },
        Value::Array(array) => Ok(Value::Boolean(
            array.items().iter().any(|item| values_equal(item, needle)),
        )),
        Value::String(s) => match needle {
            Value::String(sub) => Ok(Value::Boolean(s.contains(sub.as_str()))),
            _ => Err(binary_type_mismatch(&needle.type_name(), "String", BinaryOp::In)),
        },
        _ => Err(invalid_binary_op(&haystack.type_name(), BinaryOp::In)),
    }
}

/// Comparison of values with no dedicated arm (enums).
fn compare(left: &Value, right: &Value, op: BinaryOp) -> OpResult {
    match compare_values(left, right) {
        Some(ordering) => compare_ordered(ordering, op, &left.type_name()),
        None => Err(binary_type_mismatch(
            &left.type_name(),
            &right.type_name(),
            op,
        )),
    }
}

fn compare_ordered(ordering: Ordering, op: BinaryOp, type_name: &str) -> OpResult {
    let result = match op {
        BinaryOp::Eq => ordering == Ordering::Equal,
        BinaryOp::NotEq => ordering != Ordering::Equal,
        BinaryOp::Lt => ordering == Ordering::Less,
        BinaryOp::LtEq => ordering != Ordering::Greater,
        BinaryOp::Gt => ordering == Ordering::Greater,
        BinaryOp::GtEq => ordering != Ordering::Less,
        _ => return Err(invalid_binary_op(type_name, op)),
    };
    Ok(Value::Boolean(result))
}

/// Evaluate a built-in unary operator. `not` is bitwise on integers.
pub fn unary(op: UnaryOp, operand: &Value) -> OpResult {
    match (operand.unboxed(), op) {
        (Value::Integer(n), UnaryOp::Neg) => n
            .checked_neg()
            .map(Value::Integer)
            .ok_or_else(|| integer_overflow("negation")),
        (Value::Float(x), UnaryOp::Neg) => Ok(Value::Float(-x)),
        (value @ (Value::Integer(_) | Value::Float(_)), UnaryOp::Plus) => Ok(value.clone()),
        (Value::Boolean(b), UnaryOp::Not) => Ok(Value::Boolean(!b)),
        (Value::Integer(n), UnaryOp::Not) => Ok(Value::Integer(!n)),
        (value, _) => Err(invalid_unary_op(&value.type_name(), op)),
    }
}
