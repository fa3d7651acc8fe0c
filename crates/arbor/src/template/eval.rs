use std::cmp::Ordering;

use serde_json::{Number, Value};

use super::{
    TemplateError,
    parse::{Expr, Node},
};

/// Go-style truthiness: false, zero, empty and null are false.
pub(super) fn truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Render a value as text.
pub(super) fn format(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => format_number(n),
        Value::String(s) => s.clone(),
        Value::Array(a) => {
            let parts: Vec<String> = a.iter().map(format).collect();
            format!("[{}]", parts.join(" "))
        }
        Value::Object(o) => {
            let parts: Vec<String> = o.iter().map(|(k, v)| format!("{k}:{}", format(v))).collect();
            format!("map[{}]", parts.join(" "))
        }
    }
}

/// Integers render without a fraction.
fn format_number(n: &Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}

/// Append `s` to `out` with XML special characters escaped.
pub(super) fn escape_into(out: &mut String, s: &str) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
}

/// Execute nodes with `dot` as the current context.
pub(super) fn exec(nodes: &[Node], dot: &Value, out: &mut String) -> Result<(), TemplateError> {
    for node in nodes {
        match node {
            Node::Text(t) => out.push_str(t),
            Node::Output(expr) => escape_into(out, &format(&eval(expr, dot)?)),
            Node::If {
                cond,
                then,
                otherwise,
            } => {
                if truthy(&eval(cond, dot)?) {
                    exec(then, dot, out)?;
                } else {
                    exec(otherwise, dot, out)?;
                }
            }
            Node::Range {
                expr,
                body,
                otherwise,
            } => {
                let items: Vec<Value> = match eval(expr, dot)? {
                    Value::Array(a) => a,
                    Value::Object(o) => o.into_iter().map(|(_, v)| v).collect(),
                    Value::Number(n) => match n.as_u64() {
                        Some(count) => (0..count).map(Value::from).collect(),
                        None => return Err(err(expr, format!("can't range over {n}"))),
                    },
                    Value::Null => Vec::new(),
                    other => return Err(err(expr, format!("can't range over {}", kind(&other)))),
                };
                if items.is_empty() {
                    exec(otherwise, dot, out)?;
                }
                for item in &items {
                    exec(body, item, out)?;
                }
            }
        }
    }
    Ok(())
}

/// The offset of an expression, for errors.
fn offset(expr: &Expr) -> usize {
    match expr {
        Expr::Field { offset, .. } | Expr::Call { offset, .. } => *offset,
        Expr::Lit(_) => 0,
    }
}

/// Construct an error at an expression.
fn err(expr: &Expr, msg: impl Into<String>) -> TemplateError {
    TemplateError::new(msg, offset(expr))
}

/// A short name for a value's kind.
fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "nil",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Evaluate an expression.
fn eval(expr: &Expr, dot: &Value) -> Result<Value, TemplateError> {
    match expr {
        Expr::Lit(v) => Ok(v.clone()),
        Expr::Field { path, .. } => {
            let mut cur = dot;
            for name in path {
                cur = match cur {
                    Value::Object(o) => o.get(name).ok_or_else(|| {
                        err(expr, format!("can't evaluate field {name}"))
                    })?,
                    other => {
                        return Err(err(
                            expr,
                            format!("can't evaluate field {name} in {}", kind(other)),
                        ));
                    }
                };
            }
            Ok(cur.clone())
        }
        Expr::Call { name, args, .. } => {
            let vals = args
                .iter()
                .map(|a| eval(a, dot))
                .collect::<Result<Vec<_>, _>>()?;
            call(expr, name, vals)
        }
    }
}

/// Require an exact argument count.
fn arity(expr: &Expr, name: &str, vals: &[Value], n: usize) -> Result<(), TemplateError> {
    if vals.len() == n {
        Ok(())
    } else {
        Err(err(
            expr,
            format!("wrong number of args for {name}: want {n} got {}", vals.len()),
        ))
    }
}

/// Loose equality: numbers compare numerically, everything else
/// structurally.
fn equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Ordered comparison of numbers or strings.
fn compare(expr: &Expr, a: &Value, b: &Value) -> Result<Ordering, TemplateError> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .zip(y.as_f64())
            .and_then(|(x, y)| x.partial_cmp(&y))
            .ok_or_else(|| err(expr, "incomparable numbers")),
        (Value::String(x), Value::String(y)) => Ok(x.cmp(y)),
        _ => Err(err(
            expr,
            format!("incompatible types for comparison: {} and {}", kind(a), kind(b)),
        )),
    }
}

/// Call a built-in function.
fn call(expr: &Expr, name: &str, vals: Vec<Value>) -> Result<Value, TemplateError> {
    match name {
        "eq" => {
            if vals.len() < 2 {
                return Err(err(expr, "eq needs at least two arguments"));
            }
            Ok(Value::Bool(vals[1..].iter().any(|v| equal(&vals[0], v))))
        }
        "ne" => {
            arity(expr, name, &vals, 2)?;
            Ok(Value::Bool(!equal(&vals[0], &vals[1])))
        }
        "lt" | "le" | "gt" | "ge" => {
            arity(expr, name, &vals, 2)?;
            let ord = compare(expr, &vals[0], &vals[1])?;
            Ok(Value::Bool(match name {
                "lt" => ord == Ordering::Less,
                "le" => ord != Ordering::Greater,
                "gt" => ord == Ordering::Greater,
                _ => ord != Ordering::Less,
            }))
        }
        "not" => {
            arity(expr, name, &vals, 1)?;
            Ok(Value::Bool(!truthy(&vals[0])))
        }
        "and" | "or" => {
            let want = name == "or";
            let mut last = None;
            for v in vals {
                if truthy(&v) == want {
                    return Ok(v);
                }
                last = Some(v);
            }
            last.ok_or_else(|| err(expr, format!("{name} needs at least one argument")))
        }
        "len" => {
            arity(expr, name, &vals, 1)?;
            let n = match &vals[0] {
                Value::String(s) => s.chars().count(),
                Value::Array(a) => a.len(),
                Value::Object(o) => o.len(),
                other => return Err(err(expr, format!("len of {}", kind(other)))),
            };
            Ok(Value::from(n))
        }
        "index" => {
            let mut it = vals.into_iter();
            let mut cur = it
                .next()
                .ok_or_else(|| err(expr, "index needs at least one argument"))?;
            for key in it {
                cur = match (cur, &key) {
                    (Value::Array(mut a), Value::Number(n)) => {
                        let i = n
                            .as_u64()
                            .and_then(|i| usize::try_from(i).ok())
                            .filter(|i| *i < a.len())
                            .ok_or_else(|| err(expr, format!("index out of range: {n}")))?;
                        a.swap_remove(i)
                    }
                    (Value::Object(mut o), Value::String(k)) => {
                        o.remove(k.as_str()).unwrap_or(Value::Null)
                    }
                    (c, k) => {
                        return Err(err(
                            expr,
                            format!("can't index {} with {}", kind(&c), kind(k)),
                        ));
                    }
                };
            }
            Ok(cur)
        }
        _ => Err(err(expr, format!("function {name:?} not defined"))),
    }
}
