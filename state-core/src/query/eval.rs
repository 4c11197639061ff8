//! Tree-walking evaluator. Every expression maps one input to zero or more outputs, which
//! are pushed into a sink as they are produced. An error stops the stream where it occurs;
//! outputs already delivered stay delivered, which is what `?` relies on.

use super::parser::{ArithOp, Ast, Builtin, CmpOp, StrPart};
use regex::Regex;
use serde_json::{Map, Number, Value};
use state_error::{StateError, StateResult};
use std::cmp::Ordering;

/// Receives each output in order; an `Err` aborts the producer.
pub type Sink<'s> = dyn FnMut(Value) -> StateResult<()> + 's;

/// Longest string `"s" * n` may build.
const MAX_REPEAT_BYTES: usize = 1 << 26;

fn eval_err(msg: impl Into<String>) -> StateError {
    StateError::QueryEval(msg.into())
}

fn push_into(out: &mut Vec<Value>) -> impl FnMut(Value) -> StateResult<()> + '_ {
    move |v| {
        out.push(v);
        Ok(())
    }
}

/// Runs `ast` to completion and gathers every output.
pub fn collect(ast: &Ast, input: &Value) -> StateResult<Vec<Value>> {
    let mut out = Vec::new();
    eval(ast, input, &mut push_into(&mut out))?;
    Ok(out)
}

pub fn eval(ast: &Ast, input: &Value, sink: &mut Sink<'_>) -> StateResult<()> {
    match ast {
        Ast::Identity => sink(input.clone()),
        Ast::RecurseAll => {
            let mut stack = vec![input];
            while let Some(value) = stack.pop() {
                match value {
                    Value::Array(items) => stack.extend(items.iter().rev()),
                    Value::Object(map) => stack.extend(map.values().rev()),
                    _ => {}
                }
                sink(value.clone())?;
            }
            Ok(())
        }
        Ast::Field(base, name) => {
            let key = Value::String(name.clone());
            eval(base, input, &mut |v: Value| -> StateResult<()> {
                sink(index_value(&v, &key)?)
            })
        }
        Ast::Index(base, index) => {
            // Index expressions run against the pipeline input, not the base value.
            let keys = collect(index, input)?;
            eval(base, input, &mut |v: Value| -> StateResult<()> {
                for key in &keys {
                    sink(index_value(&v, key)?)?;
                }
                Ok(())
            })
        }
        Ast::Slice(base, from, to) => {
            let bounds = |bound: &Option<Box<Ast>>| match bound {
                Some(expr) => collect(expr, input),
                None => Ok(vec![Value::Null]),
            };
            let froms = bounds(from)?;
            let tos = bounds(to)?;
            eval(base, input, &mut |v: Value| -> StateResult<()> {
                for to in &tos {
                    for from in &froms {
                        sink(slice_value(&v, from, to)?)?;
                    }
                }
                Ok(())
            })
        }
        Ast::Iterate(base) => eval(base, input, &mut |v: Value| -> StateResult<()> {
            iterate(&v)?.into_iter().try_for_each(|item| sink(item))
        }),
        Ast::Optional(inner) => {
            // Errors raised downstream of this `?` must not be swallowed by it.
            let mut downstream = None;
            let result = eval(inner, input, &mut |v: Value| -> StateResult<()> {
                sink(v).map_err(|err| {
                    downstream = Some(err);
                    eval_err("aborted")
                })
            });
            if let Some(err) = downstream {
                return Err(err);
            }
            if let Err(err) = result {
                log::trace!("suppressed by ?: {}", err);
            }
            Ok(())
        }
        Ast::Literal(v) => sink(v.clone()),
        Ast::Array(None) => sink(Value::Array(Vec::new())),
        Ast::Array(Some(inner)) => sink(Value::Array(collect(inner, input)?)),
        Ast::Object(entries) => {
            let mut objects = vec![Map::new()];
            for (key_ast, value_ast) in entries {
                let keys = collect(key_ast, input)?;
                let values = collect(value_ast, input)?;
                let mut next = Vec::with_capacity(objects.len() * keys.len() * values.len());
                for object in &objects {
                    for key in &keys {
                        let Value::String(name) = key else {
                            return Err(eval_err(format!(
                                "object keys must be strings, not {}",
                                type_name(key)
                            )));
                        };
                        for value in &values {
                            let mut built = object.clone();
                            built.insert(name.clone(), value.clone());
                            next.push(built);
                        }
                    }
                }
                objects = next;
            }
            objects
                .into_iter()
                .try_for_each(|object| sink(Value::Object(object)))
        }
        Ast::Format(parts) => {
            let mut texts = vec![String::new()];
            for part in parts {
                match part {
                    StrPart::Lit(s) => texts.iter_mut().for_each(|t| t.push_str(s)),
                    StrPart::Expr(expr) => {
                        let outs = collect(expr, input)?;
                        texts = texts
                            .iter()
                            .flat_map(|t| outs.iter().map(move |o| format!("{}{}", t, to_text(o))))
                            .collect();
                    }
                }
            }
            texts
                .into_iter()
                .try_for_each(|text| sink(Value::String(text)))
        }
        Ast::Pipe(lhs, rhs) => eval(lhs, input, &mut |v: Value| -> StateResult<()> {
            eval(rhs, &v, &mut *sink)
        }),
        Ast::Comma(items) => items
            .iter()
            .try_for_each(|item| eval(item, input, &mut *sink)),
        Ast::Alt(lhs, rhs) => {
            let mut kept = Vec::new();
            // Errors on the left count as "no value".
            let _ = eval(lhs, input, &mut |v: Value| -> StateResult<()> {
                if truthy(&v) {
                    kept.push(v);
                }
                Ok(())
            });
            if kept.is_empty() {
                return eval(rhs, input, sink);
            }
            kept.into_iter().try_for_each(|v| sink(v))
        }
        Ast::And(lhs, rhs) => eval(lhs, input, &mut |l: Value| -> StateResult<()> {
            if !truthy(&l) {
                return sink(Value::Bool(false));
            }
            eval(rhs, input, &mut |r: Value| -> StateResult<()> {
                sink(Value::Bool(truthy(&r)))
            })
        }),
        Ast::Or(lhs, rhs) => eval(lhs, input, &mut |l: Value| -> StateResult<()> {
            if truthy(&l) {
                return sink(Value::Bool(true));
            }
            eval(rhs, input, &mut |r: Value| -> StateResult<()> {
                sink(Value::Bool(truthy(&r)))
            })
        }),
        Ast::Compare(op, lhs, rhs) => {
            let rights = collect(rhs, input)?;
            let lefts = collect(lhs, input)?;
            for r in &rights {
                for l in &lefts {
                    sink(Value::Bool(compare(*op, l, r)))?;
                }
            }
            Ok(())
        }
        Ast::Arith(op, lhs, rhs) => {
            let rights = collect(rhs, input)?;
            let lefts = collect(lhs, input)?;
            for r in &rights {
                for l in &lefts {
                    sink(arith(*op, l, r)?)?;
                }
            }
            Ok(())
        }
        Ast::Neg(inner) => eval(inner, input, &mut |v: Value| -> StateResult<()> {
            sink(negate(&v)?)
        }),
        Ast::If(cond, then, otherwise) => eval(cond, input, &mut |c: Value| -> StateResult<()> {
            match otherwise {
                _ if truthy(&c) => eval(then, input, &mut *sink),
                Some(otherwise) => eval(otherwise, input, &mut *sink),
                None => sink(input.clone()),
            }
        }),
        Ast::Call(builtin, args) => call(*builtin, args, input, sink),
    }
}

fn call(builtin: Builtin, args: &[Ast], input: &Value, sink: &mut Sink<'_>) -> StateResult<()> {
    match (builtin, args) {
        (Builtin::Empty, _) => Ok(()),
        (Builtin::Error, []) => Err(eval_err(to_text(input))),
        (Builtin::Error, [message, ..]) => eval(message, input, &mut |m: Value| -> StateResult<()> {
            Err(eval_err(to_text(&m)))
        }),
        (Builtin::Select, [cond, ..]) => eval(cond, input, &mut |c: Value| -> StateResult<()> {
            if truthy(&c) {
                sink(input.clone())
            } else {
                Ok(())
            }
        }),
        (Builtin::Map, [f, ..]) => sink(Value::Array(map_items(f, input)?)),
        (Builtin::WithEntries, [f, ..]) => {
            let mapped = map_items(f, &to_entries(input)?)?;
            sink(from_entries(&Value::Array(mapped))?)
        }
        (_, []) => sink(apply0(builtin, input)?),
        (_, [arg, ..]) => collect(arg, input)?
            .iter()
            .try_for_each(|a| sink(apply1(builtin, input, a)?)),
    }
}

fn map_items(f: &Ast, input: &Value) -> StateResult<Vec<Value>> {
    let mut mapped = Vec::new();
    for item in iterate(input)? {
        eval(f, &item, &mut push_into(&mut mapped))?;
    }
    Ok(mapped)
}

fn apply0(builtin: Builtin, input: &Value) -> StateResult<Value> {
    match builtin {
        Builtin::Not => Ok(Value::Bool(!truthy(input))),
        Builtin::Length => length(input),
        Builtin::Keys => keys(input),
        Builtin::Type => Ok(Value::String(type_name(input).to_string())),
        Builtin::ToString => Ok(Value::String(to_text(input))),
        Builtin::ToJson => Ok(Value::String(input.to_string())),
        Builtin::FromJson => match input {
            Value::String(s) => serde_json::from_str(s)
                .map_err(|err| eval_err(format!("{} (while parsing '{}')", err, s))),
            other => Err(eval_err(format!("{} cannot be parsed as JSON", describe(other)))),
        },
        Builtin::ToNumber => match input {
            Value::Number(_) => Ok(input.clone()),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(num)
                .ok_or_else(|| eval_err(format!("cannot parse {:?} as a number", s))),
            other => Err(eval_err(format!("{} cannot be parsed as a number", describe(other)))),
        },
        Builtin::ToEntries => to_entries(input),
        Builtin::FromEntries => from_entries(input),
        Builtin::Add => iterate(input)?
            .iter()
            .try_fold(Value::Null, |acc, v| arith(ArithOp::Add, &acc, v)),
        Builtin::Any => Ok(Value::Bool(iterate(input)?.iter().any(truthy))),
        Builtin::All => Ok(Value::Bool(iterate(input)?.iter().all(truthy))),
        Builtin::First => index_value(input, &Value::from(0)),
        Builtin::Last => index_value(input, &Value::from(-1)),
        Builtin::Reverse => match input {
            Value::Null => Ok(Value::Array(Vec::new())),
            Value::String(s) => Ok(Value::String(s.chars().rev().collect())),
            Value::Array(items) => Ok(Value::Array(items.iter().rev().cloned().collect())),
            other => Err(eval_err(format!("cannot reverse {}", describe(other)))),
        },
        Builtin::Sort => sorted(input).map(Value::Array),
        Builtin::Unique => {
            let mut items = sorted(input)?;
            items.dedup_by(|a, b| cmp_values(a, b) == Ordering::Equal);
            Ok(Value::Array(items))
        }
        Builtin::Min => Ok(sorted(input)?.into_iter().next().unwrap_or(Value::Null)),
        Builtin::Max => Ok(sorted(input)?.pop().unwrap_or(Value::Null)),
        Builtin::AsciiDowncase | Builtin::AsciiUpcase => match input {
            Value::String(s) if builtin == Builtin::AsciiDowncase => {
                Ok(Value::String(s.to_ascii_lowercase()))
            }
            Value::String(s) => Ok(Value::String(s.to_ascii_uppercase())),
            other => Err(eval_err(format!("{} is not a string", describe(other)))),
        },
        other => Err(eval_err(format!("{:?} needs an argument", other))),
    }
}

fn apply1(builtin: Builtin, input: &Value, arg: &Value) -> StateResult<Value> {
    match (builtin, input, arg) {
        (Builtin::Has, _, _) => has(input, arg).map(Value::Bool),
        (Builtin::Join, _, Value::String(sep)) => {
            let mut parts = Vec::new();
            for item in iterate(input)? {
                parts.push(match item {
                    Value::Null => String::new(),
                    Value::String(s) => s,
                    Value::Number(_) | Value::Bool(_) => item.to_string(),
                    other => {
                        return Err(eval_err(format!("cannot join with {}", type_name(&other))))
                    }
                });
            }
            Ok(Value::String(parts.join(sep)))
        }
        (Builtin::Split, Value::String(s), Value::String(sep)) => Ok(Value::Array(
            split(s, sep).into_iter().map(Value::String).collect(),
        )),
        (Builtin::Test, Value::String(s), Value::String(pattern)) => {
            let re = Regex::new(pattern)
                .map_err(|err| eval_err(format!("{:?} is not a valid regex: {}", pattern, err)))?;
            Ok(Value::Bool(re.is_match(s)))
        }
        (Builtin::Test, other, _) if !other.is_string() => Err(eval_err(format!(
            "{} cannot be matched, as it is not a string",
            describe(other)
        ))),
        (Builtin::StartsWith, Value::String(s), Value::String(prefix)) => {
            Ok(Value::Bool(s.starts_with(prefix.as_str())))
        }
        (Builtin::EndsWith, Value::String(s), Value::String(suffix)) => {
            Ok(Value::Bool(s.ends_with(suffix.as_str())))
        }
        (Builtin::StartsWith | Builtin::EndsWith, _, _) => {
            Err(eval_err(format!("{:?} requires string inputs", builtin)))
        }
        (Builtin::LtrimStr, Value::String(s), Value::String(prefix)) => Ok(s
            .strip_prefix(prefix.as_str())
            .map_or_else(|| input.clone(), |rest| Value::String(rest.to_string()))),
        (Builtin::RtrimStr, Value::String(s), Value::String(suffix)) => Ok(s
            .strip_suffix(suffix.as_str())
            .map_or_else(|| input.clone(), |rest| Value::String(rest.to_string()))),
        (Builtin::LtrimStr | Builtin::RtrimStr, _, _) => Ok(input.clone()),
        _ => Err(eval_err(format!(
            "{:?} cannot be applied to {} and {}",
            builtin,
            describe(input),
            describe(arg)
        ))),
    }
}

fn split(s: &str, sep: &str) -> Vec<String> {
    if s.is_empty() {
        return Vec::new();
    }
    if sep.is_empty() {
        return s.chars().map(String::from).collect();
    }
    s.split(sep).map(str::to_string).collect()
}

fn sorted(value: &Value) -> StateResult<Vec<Value>> {
    let Value::Array(items) = value else {
        return Err(eval_err(format!(
            "{} cannot be sorted, as it is not an array",
            describe(value)
        )));
    };
    let mut items = items.clone();
    items.sort_by(cmp_values);
    Ok(items)
}

fn to_entries(value: &Value) -> StateResult<Value> {
    match value {
        Value::Object(map) => Ok(Value::Array(
            map.iter()
                .map(|(k, v)| {
                    let mut entry = Map::new();
                    entry.insert("key".to_string(), Value::String(k.clone()));
                    entry.insert("value".to_string(), v.clone());
                    Value::Object(entry)
                })
                .collect(),
        )),
        other => Err(eval_err(format!("{} has no keys", describe(other)))),
    }
}

fn from_entries(value: &Value) -> StateResult<Value> {
    let mut map = Map::new();
    for entry in iterate(value)? {
        let key = ["key", "k", "name", "Name", "K", "Key"]
            .iter()
            .find_map(|k| entry.get(*k).filter(|v| !v.is_null()));
        let key = match key {
            Some(Value::String(s)) => s.clone(),
            Some(v @ (Value::Number(_) | Value::Bool(_))) => v.to_string(),
            other => {
                let shown = other.map_or_else(|| "null (null)".to_string(), describe);
                return Err(eval_err(format!("cannot use {} as object key", shown)));
            }
        };
        let value = ["value", "v", "Value"]
            .iter()
            .find_map(|k| entry.get(*k))
            .cloned()
            .unwrap_or(Value::Null);
        map.insert(key, value);
    }
    Ok(Value::Object(map))
}

fn iterate(value: &Value) -> StateResult<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items.clone()),
        Value::Object(map) => Ok(map.values().cloned().collect()),
        other => Err(eval_err(format!("cannot iterate over {}", type_name(other)))),
    }
}

fn index_value(base: &Value, key: &Value) -> StateResult<Value> {
    match (base, key) {
        (Value::Object(map), Value::String(k)) => Ok(map.get(k).cloned().unwrap_or(Value::Null)),
        (Value::Array(items), Value::Number(n)) => {
            let Some(idx) = n.as_f64().map(f64::floor) else {
                return Ok(Value::Null);
            };
            let len = items.len() as f64;
            let idx = if idx < 0.0 { len + idx } else { idx };
            if idx < 0.0 || idx >= len {
                return Ok(Value::Null);
            }
            Ok(items[idx as usize].clone())
        }
        (Value::Null, Value::String(_) | Value::Number(_)) => Ok(Value::Null),
        (base, Value::String(k)) => Err(eval_err(format!(
            "cannot index {} with {:?}",
            type_name(base),
            k
        ))),
        (base, key) => Err(eval_err(format!(
            "cannot index {} with {}",
            type_name(base),
            type_name(key)
        ))),
    }
}

/// `.[from:to]` over arrays and strings; null bounds mean "from the start" / "to the end".
fn slice_value(base: &Value, from: &Value, to: &Value) -> StateResult<Value> {
    let resolve = |bound: &Value, len: usize, default: usize| -> StateResult<usize> {
        match bound {
            Value::Null => Ok(default),
            Value::Number(n) => {
                let len = len as f64;
                let mut idx = n.as_f64().unwrap_or(0.0).floor();
                if idx < 0.0 {
                    idx += len;
                }
                Ok(idx.clamp(0.0, len) as usize)
            }
            other => Err(eval_err(format!(
                "slice indices must be numbers, not {}",
                type_name(other)
            ))),
        }
    };
    match base {
        Value::Null => Ok(Value::Null),
        Value::Array(items) => {
            let start = resolve(from, items.len(), 0)?;
            let end = resolve(to, items.len(), items.len())?.max(start);
            Ok(Value::Array(items[start..end].to_vec()))
        }
        Value::String(s) => {
            let chars: Vec<char> = s.chars().collect();
            let start = resolve(from, chars.len(), 0)?;
            let end = resolve(to, chars.len(), chars.len())?.max(start);
            Ok(Value::String(chars[start..end].iter().collect()))
        }
        other => Err(eval_err(format!("cannot slice {}", type_name(other)))),
    }
}

fn has(base: &Value, key: &Value) -> StateResult<bool> {
    match (base, key) {
        (Value::Object(map), Value::String(k)) => Ok(map.contains_key(k)),
        (Value::Array(items), Value::Number(n)) => {
            Ok(n.as_f64().map_or(false, |i| i >= 0.0 && i < items.len() as f64))
        }
        (base, key) => Err(eval_err(format!(
            "cannot check whether {} has a {} key",
            type_name(base),
            type_name(key)
        ))),
    }
}

fn length(value: &Value) -> StateResult<Value> {
    match value {
        Value::Null => Ok(Value::from(0)),
        Value::Bool(_) => Err(eval_err("boolean has no length")),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::from(i.unsigned_abs()))
            } else if n.is_u64() {
                Ok(Value::Number(n.clone()))
            } else {
                Ok(num(n.as_f64().unwrap_or(0.0).abs()))
            }
        }
        Value::String(s) => Ok(Value::from(s.chars().count())),
        Value::Array(items) => Ok(Value::from(items.len())),
        Value::Object(map) => Ok(Value::from(map.len())),
    }
}

fn keys(value: &Value) -> StateResult<Value> {
    match value {
        Value::Object(map) => {
            let mut names: Vec<&String> = map.keys().collect();
            names.sort();
            Ok(Value::Array(names.into_iter().map(|k| Value::String(k.clone())).collect()))
        }
        Value::Array(items) => Ok(Value::Array((0..items.len()).map(Value::from).collect())),
        other => Err(eval_err(format!("{} has no keys", type_name(other)))),
    }
}

fn arith(op: ArithOp, lhs: &Value, rhs: &Value) -> StateResult<Value> {
    match (op, lhs, rhs) {
        (ArithOp::Add, Value::Null, v) | (ArithOp::Add, v, Value::Null) => Ok(v.clone()),
        (_, Value::Number(a), Value::Number(b)) => number_op(op, a, b, lhs, rhs),
        (ArithOp::Add, Value::String(a), Value::String(b)) => {
            Ok(Value::String(format!("{}{}", a, b)))
        }
        (ArithOp::Add, Value::Array(a), Value::Array(b)) => {
            Ok(Value::Array(a.iter().chain(b).cloned().collect()))
        }
        (ArithOp::Add, Value::Object(a), Value::Object(b)) => {
            let mut merged = a.clone();
            merged.extend(b.clone());
            Ok(Value::Object(merged))
        }
        (ArithOp::Sub, Value::Array(a), Value::Array(b)) => Ok(Value::Array(
            a.iter().filter(|x| !b.contains(x)).cloned().collect(),
        )),
        (ArithOp::Mul, Value::String(s), Value::Number(n))
        | (ArithOp::Mul, Value::Number(n), Value::String(s)) => repeat(s, n),
        (ArithOp::Mul, Value::Object(a), Value::Object(b)) => Ok(Value::Object(deep_merge(a, b))),
        (ArithOp::Div, Value::String(a), Value::String(b)) => Ok(Value::Array(
            split(a, b).into_iter().map(Value::String).collect(),
        )),
        _ => Err(eval_err(format!(
            "{} and {} cannot be {}",
            describe(lhs),
            describe(rhs),
            op_verb(op)
        ))),
    }
}

fn op_verb(op: ArithOp) -> &'static str {
    match op {
        ArithOp::Add => "added",
        ArithOp::Sub => "subtracted",
        ArithOp::Mul => "multiplied",
        ArithOp::Div | ArithOp::Rem => "divided",
    }
}

fn number_op(op: ArithOp, a: &Number, b: &Number, lhs: &Value, rhs: &Value) -> StateResult<Value> {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        let exact = match op {
            ArithOp::Add => x.checked_add(y),
            ArithOp::Sub => x.checked_sub(y),
            ArithOp::Mul => x.checked_mul(y),
            ArithOp::Div | ArithOp::Rem => None,
        };
        if let Some(v) = exact {
            return Ok(Value::from(v));
        }
    }
    let x = a.as_f64().unwrap_or(0.0);
    let y = b.as_f64().unwrap_or(0.0);
    let divide_by_zero = || {
        eval_err(format!(
            "{} and {} cannot be divided because the divisor is zero",
            describe(lhs),
            describe(rhs)
        ))
    };
    match op {
        ArithOp::Add => Ok(num(x + y)),
        ArithOp::Sub => Ok(num(x - y)),
        ArithOp::Mul => Ok(num(x * y)),
        ArithOp::Div if y == 0.0 => Err(divide_by_zero()),
        ArithOp::Div => Ok(num(x / y)),
        ArithOp::Rem => {
            let (x, y) = (x as i64, y as i64);
            if y == 0 {
                return Err(divide_by_zero());
            }
            Ok(Value::from(x.wrapping_rem(y)))
        }
    }
}

fn repeat(s: &str, times: &Number) -> StateResult<Value> {
    let times = times.as_f64().unwrap_or(0.0);
    if times < 1.0 {
        return Ok(Value::Null);
    }
    let times = times as usize;
    if s.len().saturating_mul(times) > MAX_REPEAT_BYTES {
        return Err(eval_err("repeated string is too long"));
    }
    Ok(Value::String(s.repeat(times)))
}

fn deep_merge(a: &Map<String, Value>, b: &Map<String, Value>) -> Map<String, Value> {
    let mut out = a.clone();
    for (k, v) in b {
        let merged = match (out.get(k), v) {
            (Some(Value::Object(x)), Value::Object(y)) => Value::Object(deep_merge(x, y)),
            _ => v.clone(),
        };
        out.insert(k.clone(), merged);
    }
    out
}

fn negate(value: &Value) -> StateResult<Value> {
    match value {
        Value::Number(n) => match n.as_i64().and_then(i64::checked_neg) {
            Some(i) => Ok(Value::from(i)),
            None => Ok(num(-n.as_f64().unwrap_or(0.0))),
        },
        other => Err(eval_err(format!("{} cannot be negated", describe(other)))),
    }
}

/// Integral results print without a fraction; non-finite ones become null.
fn num(f: f64) -> Value {
    if f.fract() == 0.0 && f.abs() < 9_007_199_254_740_992.0 {
        return Value::from(f as i64);
    }
    Number::from_f64(f).map_or(Value::Null, Value::Number)
}

/// `type (value)` with the value cut short, for error messages.
fn describe(value: &Value) -> String {
    let text = value.to_string();
    let shown: String = if text.chars().count() > 11 {
        text.chars().take(10).chain("...".chars()).collect()
    } else {
        text
    };
    format!("{} ({})", type_name(value), shown)
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Strings as-is, everything else as compact JSON.
pub(crate) fn to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn truthy(value: &Value) -> bool {
    !matches!(value, Value::Null | Value::Bool(false))
}

fn compare(op: CmpOp, lhs: &Value, rhs: &Value) -> bool {
    let ord = cmp_values(lhs, rhs);
    match op {
        CmpOp::Eq => ord == Ordering::Equal,
        CmpOp::Ne => ord != Ordering::Equal,
        CmpOp::Lt => ord == Ordering::Less,
        CmpOp::Le => ord != Ordering::Greater,
        CmpOp::Gt => ord == Ordering::Greater,
        CmpOp::Ge => ord != Ordering::Less,
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(false) => 1,
        Value::Bool(true) => 2,
        Value::Number(_) => 3,
        Value::String(_) => 4,
        Value::Array(_) => 5,
        Value::Object(_) => 6,
    }
}

/// Total order: null < false < true < numbers < strings < arrays < objects.
pub(crate) fn cmp_values(lhs: &Value, rhs: &Value) -> Ordering {
    let rank = type_rank(lhs).cmp(&type_rank(rhs));
    if rank != Ordering::Equal {
        return rank;
    }
    match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => cmp_numbers(a, b),
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Array(a), Value::Array(b)) => {
            for (x, y) in a.iter().zip(b) {
                let ord = cmp_values(x, y);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            a.len().cmp(&b.len())
        }
        (Value::Object(a), Value::Object(b)) => {
            let mut ka: Vec<&String> = a.keys().collect();
            let mut kb: Vec<&String> = b.keys().collect();
            ka.sort();
            kb.sort();
            let ord = ka.cmp(&kb);
            if ord != Ordering::Equal {
                return ord;
            }
            for k in ka {
                let ord = cmp_values(&a[k.as_str()], &b[k.as_str()]);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        }
        _ => Ordering::Equal,
    }
}

fn cmp_numbers(a: &Number, b: &Number) -> Ordering {
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return x.cmp(&y);
    }
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x.cmp(&y);
    }
    let x = a.as_f64().unwrap_or(f64::NAN);
    let y = b.as_f64().unwrap_or(f64::NAN);
    x.partial_cmp(&y).unwrap_or(Ordering::Equal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::parser::parse;
    use serde_json::json;

    fn run(expr: &str, input: &Value) -> StateResult<Vec<Value>> {
        collect(&parse(expr).unwrap(), input)
    }

    fn one(expr: &str, input: &Value) -> Value {
        let mut out = run(expr, input).unwrap();
        assert_eq!(out.len(), 1, "{expr:?} gave {out:?}");
        out.remove(0)
    }

    fn doc() -> Value {
        json!({
            "oem": {"found": true, "mounted": true, "mount_point": "/oem", "size_bytes": 64},
            "state": {"found": false, "mounted": false, "mount_point": ""},
            "tags": ["a", "b", "c"],
            "boot": "active_boot"
        })
    }

    #[test]
    fn field_access_on_missing_and_null() {
        assert_eq!(run(".nope", &doc()).unwrap(), vec![Value::Null]);
        assert_eq!(run(".nope.deeper", &doc()).unwrap(), vec![Value::Null]);
    }

    #[test]
    fn indexing_arrays() {
        assert_eq!(run(".tags[0]", &doc()).unwrap(), vec![json!("a")]);
        assert_eq!(run(".tags[-1]", &doc()).unwrap(), vec![json!("c")]);
        assert_eq!(run(".tags[9]", &doc()).unwrap(), vec![Value::Null]);
        assert_eq!(run(".tags[]", &doc()).unwrap(), vec![json!("a"), json!("b"), json!("c")]);
    }

    #[test]
    fn index_expression_sees_pipeline_input() {
        let input = json!({"k": "x", "m": {"x": 1}});
        assert_eq!(run(".m[.k]", &input).unwrap(), vec![json!(1)]);
    }

    #[test]
    fn type_errors_use_jq_wording() {
        let err = run(".boot.foo", &doc()).unwrap_err();
        assert_eq!(err.to_string(), r#"query failed: cannot index string with "foo""#);
        let err = run(".oem.found[]", &doc()).unwrap_err();
        assert!(err.to_string().contains("cannot iterate over boolean"));
        assert!(run(".tags.x", &doc()).is_err());
        assert!(run(r#".tags["x"]"#, &doc()).is_err());
    }

    #[test]
    fn optional_swallows_errors() {
        assert_eq!(run(".boot.foo?", &doc()).unwrap(), Vec::<Value>::new());
        assert_eq!(run("(.boot[])?, 1", &doc()).unwrap(), vec![json!(1)]);
    }

    #[test]
    fn optional_keeps_outputs_before_the_error() {
        let input = json!({"version": "v1"});
        assert_eq!(run("(.version, .version.nope)?", &input).unwrap(), vec![json!("v1")]);
        assert_eq!(
            run("[.tags[] | (., error(\"x\"))?]", &doc()).unwrap(),
            vec![json!(["a", "b", "c"])]
        );
    }

    #[test]
    fn optional_does_not_hide_later_errors() {
        let err = run(".tags? | .x", &doc()).unwrap_err();
        assert!(err.to_string().contains("cannot index array"), "{err}");
    }

    #[test]
    fn select_over_partitions() {
        let out = run(
            "[.[] | select(type == \"object\" and .found) | .mount_point]",
            &doc(),
        )
        .unwrap();
        assert_eq!(out, vec![json!(["/oem"])]);
    }

    #[test]
    fn alternative_falls_back_on_falsy() {
        assert_eq!(run(".missing // \"dflt\"", &doc()).unwrap(), vec![json!("dflt")]);
        assert_eq!(run(".state.found // 7", &doc()).unwrap(), vec![json!(7)]);
        assert_eq!(run(".boot // 7", &doc()).unwrap(), vec![json!("active_boot")]);
        assert_eq!(run(".boot.x // 7", &doc()).unwrap(), vec![json!(7)]);
    }

    #[test]
    fn builtins() {
        assert_eq!(run(".tags | length", &doc()).unwrap(), vec![json!(3)]);
        assert_eq!(run(".boot | length", &doc()).unwrap(), vec![json!(11)]);
        assert_eq!(run("null | length", &doc()).unwrap(), vec![json!(0)]);
        assert!(run("true | length", &doc()).is_err());
        assert_eq!(
            run(".state | keys", &doc()).unwrap(),
            vec![json!(["found", "mount_point", "mounted"])]
        );
        assert_eq!(run(".tags | keys", &doc()).unwrap(), vec![json!([0, 1, 2])]);
        assert_eq!(run(".oem | has(\"found\")", &doc()).unwrap(), vec![json!(true)]);
        assert_eq!(run(".tags | has(5)", &doc()).unwrap(), vec![json!(false)]);
        assert_eq!(
            run(".tags | map(. == \"b\")", &doc()).unwrap(),
            vec![json!([false, true, false])]
        );
        assert_eq!(run(".oem.size_bytes | tostring", &doc()).unwrap(), vec![json!("64")]);
        assert_eq!(run(".oem.found | not", &doc()).unwrap(), vec![json!(false)]);
        assert_eq!(
            run("[.tags[] | type]", &doc()).unwrap(),
            vec![json!(["string", "string", "string"])]
        );
        assert_eq!(run("empty", &doc()).unwrap(), Vec::<Value>::new());
    }

    #[test]
    fn string_builtins() {
        assert_eq!(one(".tags | join(\"-\")", &doc()), json!("a-b-c"));
        assert_eq!(one("[1, null, \"x\", true] | join(\",\")", &doc()), json!("1,,x,true"));
        assert_eq!(one(".boot | split(\"_\")", &doc()), json!(["active", "boot"]));
        assert_eq!(one(".boot | test(\"^act.*t$\")", &doc()), json!(true));
        assert_eq!(one(".boot | startswith(\"active\")", &doc()), json!(true));
        assert_eq!(one(".boot | endswith(\"active\")", &doc()), json!(false));
        assert_eq!(one(".boot | ltrimstr(\"active_\")", &doc()), json!("boot"));
        assert_eq!(one(".boot | rtrimstr(\"_boot\")", &doc()), json!("active"));
        assert_eq!(one(".boot | ascii_upcase", &doc()), json!("ACTIVE_BOOT"));
        assert!(run(".boot | test(\"(\")", &doc()).is_err());
        assert!(run(".tags | test(\"a\")", &doc()).is_err());
        assert!(run(".tags | startswith(\"a\")", &doc()).is_err());
    }

    #[test]
    fn json_builtins() {
        assert_eq!(one(".tags | tojson", &doc()), json!(r#"["a","b","c"]"#));
        assert_eq!(one("\"[1,2]\" | fromjson", &doc()), json!([1, 2]));
        assert_eq!(one("\"42\" | tonumber", &doc()), json!(42));
        assert!(run("\"nope\" | fromjson", &doc()).is_err());
        assert!(run("\"nope\" | tonumber", &doc()).is_err());
    }

    #[test]
    fn entry_builtins() {
        assert_eq!(
            one(".state | to_entries | map(.key)", &doc()),
            json!(["found", "mount_point", "mounted"])
        );
        assert_eq!(
            one("[{key: \"a\", value: 1}, {name: \"b\", v: 2}] | from_entries", &doc()),
            json!({"a": 1, "b": 2})
        );
        assert_eq!(
            one(".oem | with_entries(select(.key | startswith(\"m\")))", &doc()),
            json!({"mounted": true, "mount_point": "/oem"})
        );
    }

    #[test]
    fn array_builtins() {
        let input = json!([3, 1, 2, 1]);
        assert_eq!(one("sort", &input), json!([1, 1, 2, 3]));
        assert_eq!(one("unique", &input), json!([1, 2, 3]));
        assert_eq!(one("reverse", &input), json!([1, 2, 1, 3]));
        assert_eq!(one("add", &input), json!(7));
        assert_eq!(one("min", &input), json!(1));
        assert_eq!(one("max", &input), json!(3));
        assert_eq!(one("first", &input), json!(3));
        assert_eq!(one("last", &input), json!(1));
        assert_eq!(one("map(. > 2) | any", &input), json!(true));
        assert_eq!(one("map(. > 2) | all", &input), json!(false));
        assert_eq!(one("[] | add", &input), Value::Null);
        assert_eq!(one("[] | max", &input), Value::Null);
        assert_eq!(one(".tags | add", &doc()), json!("abc"));
    }

    #[test]
    fn arithmetic() {
        assert_eq!(one("1 + 2 * 3", &Value::Null), json!(7));
        assert_eq!(one("(1 + 2) * 3", &Value::Null), json!(9));
        assert_eq!(one("7 / 2", &Value::Null), json!(3.5));
        assert_eq!(one("7 % 3", &Value::Null), json!(1));
        assert_eq!(one("10 - 4 - 3", &Value::Null), json!(3));
        assert_eq!(one(".oem.size_bytes * 2", &doc()), json!(128));
        assert_eq!(one("-.oem.size_bytes", &doc()), json!(-64));
        assert_eq!(one(".boot + \"-x\"", &doc()), json!("active_boot-x"));
        assert_eq!(one("null + 1", &doc()), json!(1));
        assert_eq!(one(".tags + [\"d\"] - [\"a\"]", &doc()), json!(["b", "c", "d"]));
        assert_eq!(one("{a: 1} + {b: 2}", &doc()), json!({"a": 1, "b": 2}));
        assert_eq!(
            one("{a: {x: 1}} * {a: {y: 2}}", &doc()),
            json!({"a": {"x": 1, "y": 2}})
        );
        assert_eq!(one("\"a,b\" / \",\"", &doc()), json!(["a", "b"]));
        assert_eq!(one("\"ab\" * 2", &doc()), json!("abab"));
    }

    #[test]
    fn arithmetic_errors() {
        let err = run(".boot + 1", &doc()).unwrap_err();
        assert_eq!(
            err.to_string(),
            r#"query failed: string ("active_bo...) and number (1) cannot be added"#
        );
        assert!(run("1 / 0", &doc()).unwrap_err().to_string().contains("divisor is zero"));
        assert!(run("1 % 0", &doc()).is_err());
        assert!(run("{} - 1", &doc()).unwrap_err().to_string().contains("cannot be subtracted"));
        assert!(run("-\"x\"", &doc()).unwrap_err().to_string().contains("cannot be negated"));
    }

    #[test]
    fn conditionals() {
        assert_eq!(one(".state.found | if . then \"yes\" else \"no\" end", &doc()), json!("no"));
        assert_eq!(
            one(".oem | if .found and .mounted then .mount_point else null end", &doc()),
            json!("/oem")
        );
        assert_eq!(
            run(
                "(1, 2, 3) | if . == 1 then \"one\" elif . == 2 then \"two\" else \"many\" end",
                &doc()
            )
            .unwrap(),
            vec![json!("one"), json!("two"), json!("many")]
        );
        // Without else the input passes through.
        assert_eq!(one(".boot | if false then 1 end", &doc()), json!("active_boot"));
        // Each condition output selects a branch.
        assert_eq!(
            run("if (true, false) then 1 else 2 end", &doc()).unwrap(),
            vec![json!(1), json!(2)]
        );
    }

    #[test]
    fn interpolation() {
        assert_eq!(one("\"boot=\\(.boot)\"", &doc()), json!("boot=active_boot"));
        assert_eq!(
            one("\"n=\\(.oem.size_bytes) t=\\(.tags)\"", &doc()),
            json!(r#"n=64 t=["a","b","c"]"#)
        );
        assert_eq!(
            run("\"\\(.tags[])!\"", &doc()).unwrap(),
            vec![json!("a!"), json!("b!"), json!("c!")]
        );
    }

    #[test]
    fn slicing() {
        assert_eq!(one(".tags[1:]", &doc()), json!(["b", "c"]));
        assert_eq!(one(".tags[:-1]", &doc()), json!(["a", "b"]));
        assert_eq!(one(".tags[5:9]", &doc()), json!([]));
        assert_eq!(one(".boot[0:6]", &doc()), json!("active"));
        assert_eq!(one(".nope[1:2]", &doc()), Value::Null);
        assert!(run(".oem[0:1]", &doc()).is_err());
    }

    #[test]
    fn object_construction() {
        assert_eq!(
            one(".oem | {found, where: .mount_point}", &doc()),
            json!({"found": true, "where": "/oem"})
        );
        assert_eq!(
            run("{k: .tags[]}", &doc()).unwrap(),
            vec![json!({"k": "a"}), json!({"k": "b"}), json!({"k": "c"})]
        );
        assert_eq!(one("{(.boot): 1}", &doc()), json!({"active_boot": 1}));
        assert!(run("{(1): 2}", &doc()).is_err());
    }

    #[test]
    fn recursion_visits_every_value() {
        let all = run("..", &json!({"a": [1, {"b": 2}]})).unwrap();
        assert_eq!(all, vec![
            json!({"a": [1, {"b": 2}]}),
            json!([1, {"b": 2}]),
            json!(1),
            json!({"b": 2}),
            json!(2),
        ]);
    }

    #[test]
    fn total_order() {
        let ordered = [
            json!(null),
            json!(false),
            json!(true),
            json!(-1),
            json!(2.5),
            json!(10),
            json!(""),
            json!("a"),
            json!([]),
            json!([1]),
            json!({}),
            json!({"a": 1}),
        ];
        for pair in ordered.windows(2) {
            assert_eq!(cmp_values(&pair[0], &pair[1]), Ordering::Less, "{pair:?}");
        }
        assert_eq!(cmp_values(&json!(1), &json!(1.0)), Ordering::Equal);
    }

    #[test]
    fn comparisons_are_cartesian() {
        assert_eq!(
            run("(1, 2) < (2, 3)", &Value::Null).unwrap(),
            vec![json!(true), json!(false), json!(true), json!(true)]
        );
    }
}
