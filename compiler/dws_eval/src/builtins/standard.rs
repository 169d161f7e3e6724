//! Built-ins taking evaluated arguments: output, conversions, strings,
//! ordinals, math, assertions, variants and JSON.
//!
//! Strings are indexed by character, 1-based.

use std::cmp::Ordering;
use std::fmt::Write as _;
use std::rc::Rc;

use dws_runtime::convert::{enum_from_ordinal, ordinal_value};
use dws_runtime::errors::{
    assertion_failed, conversion_failed, index_out_of_bounds, integer_overflow, type_mismatch,
};
use dws_runtime::{json, ArrayValue, EnumType, EvalError, EvalNote, EvalResult, TypeMeta, Value};

use super::{require_args, BuiltinRegistry};
use crate::interpreter::Interpreter;

pub(super) fn register(registry: &mut BuiltinRegistry) {
    // Output
    registry.register("Print", print);
    registry.register("PrintLn", println);

    // Conversions
    registry.register("IntToStr", int_to_str);
    registry.register("IntToHex", int_to_hex);
    registry.register("StrToInt", str_to_int);
    registry.register("StrToIntDef", str_to_int_def);
    registry.register("FloatToStr", float_to_str);
    registry.register("StrToFloat", str_to_float);
    registry.register("BoolToStr", bool_to_str);

    // Strings
    registry.register("Length", length);
    registry.register("Copy", copy);
    registry.register("Pos", pos);
    registry.register("UpperCase", upper_case);
    registry.register("LowerCase", lower_case);
    registry.register("Trim", trim);
    registry.register("TrimLeft", trim_left);
    registry.register("TrimRight", trim_right);
    registry.register("StringOfChar", string_of_char);
    registry.register("Chr", chr);

    // Ordinals
    registry.register("Ord", ord);
    registry.register("Succ", succ);
    registry.register("Pred", pred);
    registry.register("High", high);
    registry.register("Low", low);

    // Math
    registry.register("Abs", abs);
    registry.register("Sqr", sqr);
    registry.register("Sqrt", sqrt);
    registry.register("Round", round);
    registry.register("Trunc", trunc);
    registry.register("Min", min);
    registry.register("Max", max);
    registry.register("Odd", odd);

    // Assertions and references
    registry.register("Assert", assert);
    registry.register("Assigned", assigned);
    registry.register("ExceptObject", except_object);

    // Variants
    registry.register("VarIsNull", var_is_null);
    registry.register("VarIsEmpty", var_is_empty);
    registry.register("VarToStr", var_to_str);

    // JSON
    registry.register("ToJSON", to_json);
    registry.register("ToJSONPretty", to_json_pretty);
    registry.register("ParseJSON", parse_json);
}

// Argument Access

fn int_arg(name: &str, args: &[Value], index: usize) -> Result<i64, EvalError> {
    let value = arg(args, index);
    value
        .as_int()
        .ok_or_else(|| type_mismatch("Integer", &value.type_name()))
        .map_err(|err| err.with_note(EvalNote::new(format!("argument {} of {name}", index + 1))))
}

fn float_arg(name: &str, args: &[Value], index: usize) -> Result<f64, EvalError> {
    let value = arg(args, index);
    value
        .as_float()
        .ok_or_else(|| type_mismatch("Float", &value.type_name()))
        .map_err(|err| err.with_note(EvalNote::new(format!("argument {} of {name}", index + 1))))
}

fn str_arg<'a>(name: &str, args: &'a [Value], index: usize) -> Result<&'a str, EvalError> {
    let value = arg(args, index);
    value
        .as_str()
        .ok_or_else(|| type_mismatch("String", &value.type_name()))
        .map_err(|err| err.with_note(EvalNote::new(format!("argument {} of {name}", index + 1))))
}

fn arg(args: &[Value], index: usize) -> &Value {
    args.get(index).map_or(&Value::Nil, Value::unboxed)
}

fn char_count(s: &str) -> i64 {
    i64::try_from(s.chars().count()).unwrap_or(i64::MAX)
}

// Output

fn print(interp: &mut Interpreter, args: &[Value]) -> EvalResult {
    interp.print_handler().print(&concat(args));
    Ok(Value::Nil)
}

fn println(interp: &mut Interpreter, args: &[Value]) -> EvalResult {
    interp.print_handler().println(&concat(args));
    Ok(Value::Nil)
}

fn concat(args: &[Value]) -> String {
    args.iter().fold(String::new(), |mut out, value| {
        let _ = write!(out, "{value}");
        out
    })
}

// Conversions

fn int_to_str(_: &mut Interpreter, args: &[Value]) -> EvalResult {
    require_args("IntToStr", 1, 1, args.len())?;
    Ok(Value::string(int_arg("IntToStr", args, 0)?.to_string()))
}

fn int_to_hex(_: &mut Interpreter, args: &[Value]) -> EvalResult {
    require_args("IntToHex", 2, 2, args.len())?;
    let n = int_arg("IntToHex", args, 0)?;
    let digits = usize::try_from(int_arg("IntToHex", args, 1)?).unwrap_or(0);
    Ok(Value::string(format!("{n:0digits$X}")))
}

/// Decimal with optional sign, or hexadecimal with a `$` or `0x` prefix.
fn parse_int(text: &str) -> Option<i64> {
    let text = text.trim();
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let hex = digits
        .strip_prefix('$')
        .or_else(|| digits.strip_prefix("0x"))
        .or_else(|| digits.strip_prefix("0X"));
    let magnitude = match hex {
        Some(hex) => i64::from_str_radix(hex, 16).ok()?,
        None if digits.starts_with(['+', '-']) => return None,
        None => digits.parse::<i64>().ok()?,
    };
    Some(if negative { -magnitude } else { magnitude })
}

fn str_to_int(_: &mut Interpreter, args: &[Value]) -> EvalResult {
    require_args("StrToInt", 1, 1, args.len())?;
    let text = str_arg("StrToInt", args, 0)?;
    parse_int(text)
        .map(Value::Integer)
        .ok_or_else(|| conversion_failed(text, "Integer").into())
}

fn str_to_int_def(_: &mut Interpreter, args: &[Value]) -> EvalResult {
    require_args("StrToIntDef", 2, 2, args.len())?;
    let text = str_arg("StrToIntDef", args, 0)?;
    let default = int_arg("StrToIntDef", args, 1)?;
    Ok(Value::Integer(parse_int(text).unwrap_or(default)))
}

fn float_to_str(_: &mut Interpreter, args: &[Value]) -> EvalResult {
    require_args("FloatToStr", 1, 1, args.len())?;
    let x = float_arg("FloatToStr", args, 0)?;
    Ok(Value::string(Value::Float(x).to_string()))
}

fn str_to_float(_: &mut Interpreter, args: &[Value]) -> EvalResult {
    require_args("StrToFloat", 1, 1, args.len())?;
    let text = str_arg("StrToFloat", args, 0)?;
    text.trim()
        .parse::<f64>()
        .map(Value::Float)
        .map_err(|_| conversion_failed(text, "Float").into())
}

fn bool_to_str(_: &mut Interpreter, args: &[Value]) -> EvalResult {
    require_args("BoolToStr", 1, 1, args.len())?;
    let value = arg(args, 0);
    let b = value
        .as_bool()
        .ok_or_else(|| type_mismatch("Boolean", &value.type_name()))?;
    Ok(Value::string(Value::Boolean(b).to_string()))
}

// Strings

fn length(_: &mut Interpreter, args: &[Value]) -> EvalResult {
    require_args("Length", 1, 1, args.len())?;
    let len = match arg(args, 0) {
        Value::String(s) => char_count(s),
        Value::Array(a) => i64::try_from(a.len()).unwrap_or(i64::MAX),
        Value::Set(s) => i64::try_from(s.len()).unwrap_or(i64::MAX),
        other => return Err(type_mismatch("String or array", &other.type_name()).into()),
    };
    Ok(Value::Integer(len))
}

/// `Copy(s, index[, count])` on strings; `Copy(a[, index[, count]])` on
/// dynamic arrays returns a new array.
fn copy(_: &mut Interpreter, args: &[Value]) -> EvalResult {
    require_args("Copy", 1, 3, args.len())?;
    match arg(args, 0) {
        Value::Array(array) => {
            let start = match args.get(1) {
                Some(_) => int_arg("Copy", args, 1)?,
                None => array.low(),
            };
            let count = match args.get(2) {
                Some(_) => int_arg("Copy", args, 2)?,
                None => i64::MAX,
            };
            let skip = usize::try_from(start - array.low()).unwrap_or(0);
            let take = usize::try_from(count).unwrap_or(0);
            let items: Vec<Value> = array
                .items()
                .iter()
                .skip(skip)
                .take(take)
                .map(Value::copy_for_store)
                .collect();
            Ok(Value::Array(ArrayValue::dynamic(array.element_type().clone(), items)))
        }
        Value::String(s) => {
            require_args("Copy", 2, 3, args.len())?;
            let index = int_arg("Copy", args, 1)?.max(1);
            let count = match args.get(2) {
                Some(_) => int_arg("Copy", args, 2)?,
                None => i64::MAX,
            };
            let skip = usize::try_from(index - 1).unwrap_or(usize::MAX);
            let take = usize::try_from(count).unwrap_or(0);
            Ok(Value::string(s.chars().skip(skip).take(take).collect::<String>()))
        }
        other => Err(type_mismatch("String or array", &other.type_name()).into()),
    }
}

/// `Pos(sub, s[, offset])`: 1-based character index of `sub` in `s` at or
/// after `offset`, or 0.
fn pos(_: &mut Interpreter, args: &[Value]) -> EvalResult {
    require_args("Pos", 2, 3, args.len())?;
    let needle = str_arg("Pos", args, 0)?;
    let haystack = str_arg("Pos", args, 1)?;
    let offset = match args.get(2) {
        Some(_) => int_arg("Pos", args, 2)?.max(1),
        None => 1,
    };
    if needle.is_empty() {
        return Ok(Value::Integer(0));
    }
    let skip = usize::try_from(offset - 1).unwrap_or(usize::MAX);
    let Some((start, _)) = haystack.char_indices().nth(skip) else {
        return Ok(Value::Integer(0));
    };
    let found = haystack[start..]
        .find(needle)
        .map_or(0, |at| offset + char_count(&haystack[start..start + at]));
    Ok(Value::Integer(found))
}

fn upper_case(_: &mut Interpreter, args: &[Value]) -> EvalResult {
    require_args("UpperCase", 1, 1, args.len())?;
    Ok(Value::string(str_arg("UpperCase", args, 0)?.to_uppercase()))
}

fn lower_case(_: &mut Interpreter, args: &[Value]) -> EvalResult {
    require_args("LowerCase", 1, 1, args.len())?;
    Ok(Value::string(str_arg("LowerCase", args, 0)?.to_lowercase()))
}

fn trim(_: &mut Interpreter, args: &[Value]) -> EvalResult {
    require_args("Trim", 1, 1, args.len())?;
    Ok(Value::string(str_arg("Trim", args, 0)?.trim()))
}

fn trim_left(_: &mut Interpreter, args: &[Value]) -> EvalResult {
    require_args("TrimLeft", 1, 1, args.len())?;
    Ok(Value::string(str_arg("TrimLeft", args, 0)?.trim_start()))
}

fn trim_right(_: &mut Interpreter, args: &[Value]) -> EvalResult {
    require_args("TrimRight", 1, 1, args.len())?;
    Ok(Value::string(str_arg("TrimRight", args, 0)?.trim_end()))
}

fn string_of_char(_: &mut Interpreter, args: &[Value]) -> EvalResult {
    require_args("StringOfChar", 2, 2, args.len())?;
    let ch = str_arg("StringOfChar", args, 0)?;
    let count = usize::try_from(int_arg("StringOfChar", args, 1)?).unwrap_or(0);
    Ok(Value::string(ch.repeat(count)))
}

fn chr(_: &mut Interpreter, args: &[Value]) -> EvalResult {
    require_args("Chr", 1, 1, args.len())?;
    let code = int_arg("Chr", args, 0)?;
    u32::try_from(code)
        .ok()
        .and_then(char::from_u32)
        .map(|c| Value::string(c.to_string()))
        .ok_or_else(|| conversion_failed(&code.to_string(), "Char").into())
}

// Ordinals

fn ord(_: &mut Interpreter, args: &[Value]) -> EvalResult {
    require_args("Ord", 1, 1, args.len())?;
    let value = arg(args, 0);
    ordinal_value(value)
        .map(Value::Integer)
        .ok_or_else(|| type_mismatch("ordinal", &value.type_name()).into())
}

fn succ(_: &mut Interpreter, args: &[Value]) -> EvalResult {
    require_args("Succ", 1, 1, args.len())?;
    step_ordinal(arg(args, 0), 1)
}

fn pred(_: &mut Interpreter, args: &[Value]) -> EvalResult {
    require_args("Pred", 1, 1, args.len())?;
    step_ordinal(arg(args, 0), -1)
}

/// Move an ordinal `delta` steps. Enums step through their members in
/// declaration order and fail past either end.
pub(super) fn step_ordinal(value: &Value, delta: i64) -> EvalResult {
    match value.unboxed() {
        Value::Integer(n) => n
            .checked_add(delta)
            .map(Value::Integer)
            .ok_or_else(|| integer_overflow("Succ/Pred").into()),
        Value::Enum(e) => step_enum(&e.ty, e.ordinal, delta),
        Value::String(_) => {
            let code = ordinal_value(value).ok_or_else(|| type_mismatch("Char", "String"))?;
            u32::try_from(code + delta)
                .ok()
                .and_then(char::from_u32)
                .map(|c| Value::string(c.to_string()))
                .ok_or_else(|| index_out_of_bounds(code + delta, 0, 0x10_FFFF).into())
        }
        other => Err(type_mismatch("ordinal", &other.type_name()).into()),
    }
}

fn step_enum(ty: &Rc<EnumType>, ordinal: i64, delta: i64) -> EvalResult {
    let out_of_range = || index_out_of_bounds(ordinal + delta, ty.low(), ty.high());
    let position = ty.position_of(ordinal).ok_or_else(out_of_range)?;
    let target = i64::try_from(position)
        .ok()
        .and_then(|p| p.checked_add(delta))
        .and_then(|p| usize::try_from(p).ok())
        .and_then(|p| ty.members.get(p))
        .ok_or_else(out_of_range)?;
    Ok(enum_from_ordinal(ty, target.1))
}

fn high(_: &mut Interpreter, args: &[Value]) -> EvalResult {
    require_args("High", 1, 1, args.len())?;
    bound(arg(args, 0), true)
}

fn low(_: &mut Interpreter, args: &[Value]) -> EvalResult {
    require_args("Low", 1, 1, args.len())?;
    bound(arg(args, 0), false)
}

/// `High`/`Low` of an array, a string, an enum value, or a type.
fn bound(value: &Value, upper: bool) -> EvalResult {
    let pick = |hi: i64, lo: i64| Value::Integer(if upper { hi } else { lo });
    Ok(match value {
        Value::Array(a) => pick(a.high(), a.low()),
        Value::String(s) => pick(char_count(s), 1),
        Value::Enum(e) => enum_bound(&e.ty, upper),
        Value::Type(TypeMeta::Integer) => pick(i64::MAX, i64::MIN),
        Value::Type(TypeMeta::Boolean) => Value::Boolean(upper),
        Value::Type(TypeMeta::Enum(ty)) => enum_bound(ty, upper),
        Value::Type(TypeMeta::Array(ty)) => match ty.bounds {
            Some((lo, hi)) => pick(hi, lo),
            None => return Err(type_mismatch("static array type", &ty.element.to_string()).into()),
        },
        other => return Err(type_mismatch("array, string or ordinal type", &other.type_name()).into()),
    })
}

fn enum_bound(ty: &Rc<EnumType>, upper: bool) -> Value {
    enum_from_ordinal(ty, if upper { ty.high() } else { ty.low() })
}

// Math

fn abs(_: &mut Interpreter, args: &[Value]) -> EvalResult {
    require_args("Abs", 1, 1, args.len())?;
    match arg(args, 0) {
        Value::Integer(n) => n
            .checked_abs()
            .map(Value::Integer)
            .ok_or_else(|| integer_overflow("Abs").into()),
        Value::Float(x) => Ok(Value::Float(x.abs())),
        other => Err(type_mismatch("Integer or Float", &other.type_name()).into()),
    }
}

fn sqr(_: &mut Interpreter, args: &[Value]) -> EvalResult {
    require_args("Sqr", 1, 1, args.len())?;
    match arg(args, 0) {
        Value::Integer(n) => n
            .checked_mul(*n)
            .map(Value::Integer)
            .ok_or_else(|| integer_overflow("Sqr").into()),
        Value::Float(x) => Ok(Value::Float(x * x)),
        other => Err(type_mismatch("Integer or Float", &other.type_name()).into()),
    }
}

fn sqrt(_: &mut Interpreter, args: &[Value]) -> EvalResult {
    require_args("Sqrt", 1, 1, args.len())?;
    Ok(Value::Float(float_arg("Sqrt", args, 0)?.sqrt()))
}

fn round(_: &mut Interpreter, args: &[Value]) -> EvalResult {
    require_args("Round", 1, 1, args.len())?;
    float_to_int(float_arg("Round", args, 0)?.round(), "Round")
}

fn trunc(_: &mut Interpreter, args: &[Value]) -> EvalResult {
    require_args("Trunc", 1, 1, args.len())?;
    float_to_int(float_arg("Trunc", args, 0)?.trunc(), "Trunc")
}

#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    reason = "range checked before the cast"
)]
fn float_to_int(x: f64, operation: &str) -> EvalResult {
    if !x.is_finite() || x < i64::MIN as f64 || x >= i64::MAX as f64 {
        return Err(integer_overflow(operation).into());
    }
    Ok(Value::Integer(x as i64))
}

fn min(_: &mut Interpreter, args: &[Value]) -> EvalResult {
    require_args("Min", 2, 2, args.len())?;
    pick_numeric("Min", args, Ordering::Less)
}

fn max(_: &mut Interpreter, args: &[Value]) -> EvalResult {
    require_args("Max", 2, 2, args.len())?;
    pick_numeric("Max", args, Ordering::Greater)
}

/// The first argument unless the second compares as `wanted` against it.
/// Two integers give an integer; anything else compares as floats.
fn pick_numeric(name: &str, args: &[Value], wanted: Ordering) -> EvalResult {
    if let (Value::Integer(x), Value::Integer(y)) = (arg(args, 0), arg(args, 1)) {
        return Ok(Value::Integer(if y.cmp(x) == wanted { *y } else { *x }));
    }
    let x = float_arg(name, args, 0)?;
    let y = float_arg(name, args, 1)?;
    Ok(Value::Float(if y.partial_cmp(&x) == Some(wanted) { y } else { x }))
}

fn odd(_: &mut Interpreter, args: &[Value]) -> EvalResult {
    require_args("Odd", 1, 1, args.len())?;
    Ok(Value::Boolean(int_arg("Odd", args, 0)? % 2 != 0))
}

// Assertions and references

fn assert(_: &mut Interpreter, args: &[Value]) -> EvalResult {
    require_args("Assert", 1, 2, args.len())?;
    let value = arg(args, 0);
    let holds = value
        .as_bool()
        .ok_or_else(|| type_mismatch("Boolean", &value.type_name()))?;
    if holds {
        return Ok(Value::Nil);
    }
    let message = match args.get(1) {
        Some(_) => Some(str_arg("Assert", args, 1)?),
        None => None,
    };
    Err(assertion_failed(message).into())
}

fn assigned(_: &mut Interpreter, args: &[Value]) -> EvalResult {
    require_args("Assigned", 1, 1, args.len())?;
    let value = &args[0];
    Ok(Value::Boolean(!value.is_nil() && !value.is_unassigned()))
}

/// The exception being handled, or nil outside handlers.
fn except_object(interp: &mut Interpreter, args: &[Value]) -> EvalResult {
    require_args("ExceptObject", 0, 0, args.len())?;
    Ok(interp
        .handling
        .last()
        .map_or(Value::Nil, |h| Value::Object(h.exception.object.clone())))
}

// Variants

fn var_is_null(_: &mut Interpreter, args: &[Value]) -> EvalResult {
    require_args("VarIsNull", 1, 1, args.len())?;
    Ok(Value::Boolean(matches!(arg(args, 0), Value::Nil)))
}

fn var_is_empty(_: &mut Interpreter, args: &[Value]) -> EvalResult {
    require_args("VarIsEmpty", 1, 1, args.len())?;
    Ok(Value::Boolean(args[0].is_unassigned()))
}

fn var_to_str(_: &mut Interpreter, args: &[Value]) -> EvalResult {
    require_args("VarToStr", 1, 1, args.len())?;
    Ok(Value::string(match &args[0] {
        Value::Variant(None) | Value::Nil => String::new(),
        other => other.to_string(),
    }))
}

// JSON

fn to_json(_: &mut Interpreter, args: &[Value]) -> EvalResult {
    require_args("ToJSON", 1, 1, args.len())?;
    Ok(Value::string(json::to_json(&args[0])?))
}

fn to_json_pretty(_: &mut Interpreter, args: &[Value]) -> EvalResult {
    require_args("ToJSONPretty", 1, 1, args.len())?;
    Ok(Value::string(json::to_json_pretty(&args[0])?))
}

fn parse_json(_: &mut Interpreter, args: &[Value]) -> EvalResult {
    require_args("ParseJSON", 1, 1, args.len())?;
    Ok(json::parse_json(str_arg("ParseJSON", args, 0)?)?)
}
