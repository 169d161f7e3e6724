//! Built-ins that modify their first (or second) argument in place.

use dws_ir::{Expr, Name};
use dws_runtime::convert::ordinal_value;
use dws_runtime::errors::type_mismatch;
use dws_runtime::{EvalResult, SetValue, Value};

use super::standard::step_ordinal;
use super::{require_args, BuiltinRegistry};
use crate::exec::{CallArgs, Place};
use crate::interpreter::Interpreter;

pub(super) fn register(registry: &mut BuiltinRegistry) {
    registry.register_var_arg("Inc", inc);
    registry.register_var_arg("Dec", dec);
    registry.register_var_arg("SetLength", set_length);
    registry.register_var_arg("Insert", insert);
    registry.register_var_arg("Delete", delete);
    registry.register_var_arg("Include", include);
    registry.register_var_arg("Exclude", exclude);
    registry.register_var_arg("DecodeDate", decode_date);
    registry.register_var_arg("DecodeTime", decode_time);
}

/// The place an argument names, read once.
fn target(interp: &mut Interpreter, expr: &Expr) -> EvalResult<(Place, Value)> {
    let place = interp.place_of(expr)?;
    let value = interp.read_place(&place, expr.pos)?;
    Ok((place, value))
}

fn int_expr(interp: &mut Interpreter, expr: &Expr) -> EvalResult<i64> {
    let value = interp.eval_expr(expr)?;
    value
        .as_int()
        .ok_or_else(|| type_mismatch("Integer", &value.type_name()).into())
}

// Ordinals

fn inc(interp: &mut Interpreter, args: &[Expr]) -> EvalResult {
    require_args("Inc", 1, 2, args.len())?;
    step(interp, args, 1)
}

fn dec(interp: &mut Interpreter, args: &[Expr]) -> EvalResult {
    require_args("Dec", 1, 2, args.len())?;
    step(interp, args, -1)
}

fn step(interp: &mut Interpreter, args: &[Expr], sign: i64) -> EvalResult {
    let (place, current) = target(interp, &args[0])?;
    let delta = match args.get(1) {
        Some(expr) => int_expr(interp, expr)?,
        None => 1,
    };
    let updated = step_ordinal(&current, sign * delta)?;
    interp.write_place(place, updated, args[0].pos)?;
    Ok(Value::Nil)
}

// Strings and arrays

/// `SetLength(a, n)` resizes a dynamic array in place, filling new slots
/// with the element default; on strings it truncates or pads with spaces.
fn set_length(interp: &mut Interpreter, args: &[Expr]) -> EvalResult {
    require_args("SetLength", 2, 2, args.len())?;
    let (place, current) = target(interp, &args[0])?;
    let len = interp.eval_expr(&args[1])?;
    match current.unboxed() {
        Value::Array(array) => interp.call_array_method(
            array.clone(),
            &Name::new("SetLength"),
            CallArgs::Values(vec![len]),
            args[0].pos,
        ),
        Value::String(s) => {
            let len = len
                .as_int()
                .ok_or_else(|| type_mismatch("Integer", &len.type_name()))?;
            let len = usize::try_from(len).unwrap_or(0);
            let mut resized: String = s.chars().take(len).collect();
            let short = len.saturating_sub(resized.chars().count());
            resized.extend(std::iter::repeat(' ').take(short));
            interp.write_place(place, Value::String(resized), args[0].pos)?;
            Ok(Value::Nil)
        }
        other => Err(type_mismatch("array or String", &other.type_name()).into()),
    }
}

/// `Insert(source, s, index)`: insert `source` into string `s` before the
/// 1-based character `index`.
fn insert(interp: &mut Interpreter, args: &[Expr]) -> EvalResult {
    require_args("Insert", 3, 3, args.len())?;
    let source = interp.eval_expr(&args[0])?;
    let source = source
        .as_str()
        .ok_or_else(|| type_mismatch("String", &source.type_name()))?
        .to_string();
    let (place, current) = target(interp, &args[1])?;
    let text = current
        .as_str()
        .ok_or_else(|| type_mismatch("String", &current.type_name()))?;
    let index = int_expr(interp, &args[2])?.max(1);
    let at = usize::try_from(index - 1).unwrap_or(usize::MAX);
    let byte = text.char_indices().nth(at).map_or(text.len(), |(b, _)| b);
    let mut updated = text.to_string();
    updated.insert_str(byte, &source);
    interp.write_place(place, Value::String(updated), args[1].pos)?;
    Ok(Value::Nil)
}

/// `Delete(s, index, count)` on strings; `Delete(a, index[, count])` on
/// dynamic arrays.
fn delete(interp: &mut Interpreter, args: &[Expr]) -> EvalResult {
    require_args("Delete", 2, 3, args.len())?;
    let (place, current) = target(interp, &args[0])?;
    let index = interp.eval_expr(&args[1])?;
    let count = match args.get(2) {
        Some(expr) => interp.eval_expr(expr)?,
        None => Value::Integer(1),
    };
    match current.unboxed() {
        Value::Array(array) => interp.delete_elements(array, &index, &count),
        Value::String(s) => {
            let index = index
                .as_int()
                .ok_or_else(|| type_mismatch("Integer", &index.type_name()))?;
            let count = count
                .as_int()
                .ok_or_else(|| type_mismatch("Integer", &count.type_name()))?;
            let updated = if index < 1 || count <= 0 {
                s.clone()
            } else {
                let skip = usize::try_from(index - 1).unwrap_or(usize::MAX);
                let take = usize::try_from(count).unwrap_or(usize::MAX);
                s.chars()
                    .enumerate()
                    .filter(|(i, _)| *i < skip || *i - skip >= take)
                    .map(|(_, c)| c)
                    .collect()
            };
            interp.write_place(place, Value::String(updated), args[0].pos)?;
            Ok(Value::Nil)
        }
        other => Err(type_mismatch("array or String", &other.type_name()).into()),
    }
}

// Dates

/// Days from 1899-12-30 (day zero of a `TDateTime`) to 1970-01-01.
const UNIX_EPOCH_DAYS: i64 = 25_569;
const MS_PER_DAY: f64 = 86_400_000.0;

fn date_time_arg(interp: &mut Interpreter, expr: &Expr) -> EvalResult<f64> {
    let value = interp.eval_expr(expr)?;
    value
        .as_float()
        .ok_or_else(|| type_mismatch("TDateTime", &value.type_name()).into())
}

/// Write each component into the variable its argument names.
fn write_parts(interp: &mut Interpreter, targets: &[Expr], parts: &[i64]) -> EvalResult {
    for (expr, part) in targets.iter().zip(parts) {
        let place = interp.place_of(expr)?;
        interp.write_place(place, Value::Integer(*part), expr.pos)?;
    }
    Ok(Value::Nil)
}

/// `DecodeDate(dt, var year, month, day)`.
#[allow(clippy::cast_possible_truncation)]
fn decode_date(interp: &mut Interpreter, args: &[Expr]) -> EvalResult {
    require_args("DecodeDate", 4, 4, args.len())?;
    let dt = date_time_arg(interp, &args[0])?;
    let (year, month, day) = civil_from_days(dt.trunc() as i64 - UNIX_EPOCH_DAYS);
    write_parts(interp, &args[1..], &[year, month, day])
}

/// `DecodeTime(dt, var hour, min, sec, msec)`. The time of day is the
/// fractional part of `dt`, read as a positive offset for dates before 1899.
#[allow(clippy::cast_possible_truncation)]
fn decode_time(interp: &mut Interpreter, args: &[Expr]) -> EvalResult {
    require_args("DecodeTime", 5, 5, args.len())?;
    let dt = date_time_arg(interp, &args[0])?;
    let ms = ((dt.fract().abs() * MS_PER_DAY).round() as i64).min(86_399_999);
    let parts = [
        ms / 3_600_000,
        ms / 60_000 % 60,
        ms / 1000 % 60,
        ms % 1000,
    ];
    write_parts(interp, &args[1..], &parts)
}

/// Proleptic Gregorian `(year, month, day)` for days since 1970-01-01.
fn civil_from_days(days: i64) -> (i64, i64, i64) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}

// Sets

fn include(interp: &mut Interpreter, args: &[Expr]) -> EvalResult {
    require_args("Include", 2, 2, args.len())?;
    update_set(interp, args, SetValue::insert)
}

fn exclude(interp: &mut Interpreter, args: &[Expr]) -> EvalResult {
    require_args("Exclude", 2, 2, args.len())?;
    update_set(interp, args, SetValue::remove)
}

fn update_set(
    interp: &mut Interpreter,
    args: &[Expr],
    apply: fn(&mut SetValue, i64),
) -> EvalResult {
    let (place, current) = target(interp, &args[0])?;
    let Value::Set(set) = current.unboxed() else {
        return Err(type_mismatch("set", &current.type_name()).into());
    };
    let element = interp.eval_expr(&args[1])?;
    let ordinal =
        ordinal_value(&element).ok_or_else(|| type_mismatch("ordinal", &element.type_name()))?;
    let mut set = set.clone();
    apply(&mut set, ordinal);
    interp.write_place(place, Value::Set(set), args[0].pos)?;
    Ok(Value::Nil)
}
