//! Expression evaluation over JSON values with PHP-like coercions.
//!
//! Undefined variables, properties and indexes evaluate to `null`.

use serde_json::{Map, Number, Value};

use super::{AssignOp, BinaryOp, Expr, Stmt, UnaryOp};

/// Variables visible to a template.
pub type Scope = Map<String, Value>;

/// Function table consulted for `name(args)` calls.
pub trait Functions {
    fn call(&self, name: &str, args: &[Value]) -> Result<Value, String>;
}

/// Evaluates expressions and statements against a [`Scope`].
pub struct Evaluator<'a> {
    functions: &'a dyn Functions,
}

impl<'a> Evaluator<'a> {
    pub fn new(functions: &'a dyn Functions) -> Self {
        Self { functions }
    }

    pub fn eval(&self, expr: &Expr, scope: &Scope) -> Result<Value, String> {
        match expr {
            Expr::Null => Ok(Value::Null),
            Expr::Bool { value } => Ok(Value::Bool(*value)),
            Expr::Int { value } => Ok(Value::from(*value)),
            Expr::Float { value } => Ok(float(*value)),
            Expr::Str { value } => Ok(Value::String(value.clone())),
            Expr::Var { name } => Ok(scope.get(name).cloned().unwrap_or(Value::Null)),
            Expr::Array { items } => self.array(items, scope),
            Expr::Property { object, name } => {
                let object = self.eval(object, scope)?;
                Ok(object.get(name).cloned().unwrap_or(Value::Null))
            }
            Expr::Index { object, index } => {
                let object = self.eval(object, scope)?;
                let index = self.eval(index, scope)?;
                Ok(lookup(&object, &index).cloned().unwrap_or(Value::Null))
            }
            Expr::Call { function, args } => {
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg, scope))
                    .collect::<Result<Vec<_>, _>>()?;
                self.functions.call(function, &args)
            }
            Expr::Unary { op, operand } => {
                let value = self.eval(operand, scope)?;
                match op {
                    UnaryOp::Not => Ok(Value::Bool(!is_truthy(&value))),
                    UnaryOp::Neg => arithmetic(BinaryOp::Sub, &Value::from(0), &value),
                    UnaryOp::Plus => Ok(to_number(&value)?.into_value()),
                }
            }
            Expr::Binary { op, left, right } => match op {
                BinaryOp::And => {
                    let left = is_truthy(&self.eval(left, scope)?);
                    Ok(Value::Bool(left && is_truthy(&self.eval(right, scope)?)))
                }
                BinaryOp::Or => {
                    let left = is_truthy(&self.eval(left, scope)?);
                    Ok(Value::Bool(left || is_truthy(&self.eval(right, scope)?)))
                }
                _ => {
                    let left = self.eval(left, scope)?;
                    let right = self.eval(right, scope)?;
                    binary(*op, &left, &right)
                }
            },
            Expr::Ternary {
                condition,
                then,
                otherwise,
            } => {
                let condition = self.eval(condition, scope)?;
                if is_truthy(&condition) {
                    match then {
                        Some(then) => self.eval(then, scope),
                        None => Ok(condition),
                    }
                } else {
                    self.eval(otherwise, scope)
                }
            }
            Expr::Coalesce { left, right } => match self.eval(left, scope)? {
                Value::Null => self.eval(right, scope),
                value => Ok(value),
            },
        }
    }

    fn array(&self, items: &[super::ArrayItem], scope: &Scope) -> Result<Value, String> {
        if items.iter().all(|item| item.key.is_none()) {
            return items
                .iter()
                .map(|item| self.eval(&item.value, scope))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array);
        }

        let mut map = Map::new();
        let mut next_index = 0i64;
        for item in items {
            let key = match &item.key {
                Some(key) => {
                    let key = self.eval(key, scope)?;
                    if let Some(n) = key.as_i64() {
                        next_index = next_index.max(n + 1);
                    }
                    to_display(&key)
                }
                None => {
                    let key = next_index.to_string();
                    next_index += 1;
                    key
                }
            };
            map.insert(key, self.eval(&item.value, scope)?);
        }
        Ok(Value::Object(map))
    }

    /// Execute one statement.
    pub fn exec(&self, stmt: &Stmt, scope: &mut Scope) -> Result<(), String> {
        match stmt {
            Stmt::Expr { expr } => self.eval(expr, scope).map(|_| ()),
            Stmt::Step { target, delta } => {
                let current = self.eval(target, scope)?;
                let next = arithmetic(BinaryOp::Add, &current, &Value::from(*delta))?;
                self.assign(target, next, scope)
            }
            Stmt::Assign { target, op, value } => {
                let value = self.eval(value, scope)?;
                let value = match op {
                    AssignOp::Set => value,
                    AssignOp::Coalesce => match self.eval(target, scope)? {
                        Value::Null => value,
                        current => current,
                    },
                    compound => {
                        let op = match compound {
                            AssignOp::Add => BinaryOp::Add,
                            AssignOp::Sub => BinaryOp::Sub,
                            AssignOp::Mul => BinaryOp::Mul,
                            AssignOp::Div => BinaryOp::Div,
                            _ => BinaryOp::Concat,
                        };
                        binary(op, &self.eval(target, scope)?, &value)?
                    }
                };
                self.assign(target, value, scope)
            }
        }
    }

    /// Write `value` to the place named by `target`, creating containers on the way.
    fn assign(&self, target: &Expr, value: Value, scope: &mut Scope) -> Result<(), String> {
        let mut path = Vec::new();
        let mut cursor = target;
        let root = loop {
            match cursor {
                Expr::Var { name } => break name,
                Expr::Property { object, name } => {
                    path.push(Value::String(name.clone()));
                    cursor = object;
                }
                Expr::Index { object, index } => {
                    path.push(self.eval(index, scope)?);
                    cursor = object;
                }
                _ => return Err("cannot assign to this expression".to_string()),
            }
        };
        path.reverse();

        let mut slot = scope.entry(root.clone()).or_insert(Value::Null);
        for key in path {
            slot = child_mut(slot, &key)?;
        }
        *slot = value;
        Ok(())
    }
}

fn child_mut<'v>(container: &'v mut Value, key: &Value) -> Result<&'v mut Value, String> {
    if container.is_null() {
        *container = Value::Object(Map::new());
    }
    match container {
        Value::Array(items) => match key.as_u64().map(|n| n as usize) {
            Some(i) if i < items.len() => Ok(&mut items[i]),
            Some(i) if i == items.len() => {
                items.push(Value::Null);
                Ok(&mut items[i])
            }
            _ => Err(format!("cannot index list with {}", to_display(key))),
        },
        Value::Object(map) => Ok(map.entry(to_display(key)).or_insert(Value::Null)),
        other => Err(format!("cannot use a scalar value ({}) as an array", type_name(other))),
    }
}

fn lookup<'v>(container: &'v Value, key: &Value) -> Option<&'v Value> {
    match container {
        Value::Array(items) => key
            .as_u64()
            .or_else(|| key.as_str().and_then(|s| s.parse().ok()))
            .and_then(|i| items.get(i as usize)),
        Value::Object(map) => map.get(&to_display(key)),
        _ => None,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "string",
        Value::Array(_) | Value::Object(_) => "array",
    }
}

fn float(f: f64) -> Value {
    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}

// ============================================================================
// Coercions
// ============================================================================

/// PHP truthiness: `null`, `false`, `0`, `0.0`, `""`, `"0"` and empty
/// arrays are false.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !(s.is_empty() || s == "0"),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// String conversion used for output and concatenation.
pub fn to_display(value: &Value) -> String {
    match value {
        Value::Null | Value::Bool(false) => String::new(),
        Value::Bool(true) => "1".to_string(),
        Value::Number(n) => match n.as_i64() {
            Some(i) => i.to_string(),
            None => {
                let f = n.as_f64().unwrap_or_default();
                if f.fract() == 0.0 && f.abs() < 1e15 {
                    format!("{:.0}", f)
                } else {
                    f.to_string()
                }
            }
        },
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => "Array".to_string(),
    }
}

#[derive(Debug, Clone, Copy)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn as_f64(self) -> f64 {
        match self {
            Num::Int(i) => i as f64,
            Num::Float(f) => f,
        }
    }

    fn into_value(self) -> Value {
        match self {
            Num::Int(i) => Value::from(i),
            Num::Float(f) => float(f),
        }
    }
}

fn numeric_str(s: &str) -> Option<Num> {
    let s = s.trim();
    if let Ok(i) = s.parse::<i64>() {
        return Some(Num::Int(i));
    }
    s.parse::<f64>().ok().filter(|f| f.is_finite()).map(Num::Float)
}

fn to_number(value: &Value) -> Result<Num, String> {
    match value {
        Value::Null => Ok(Num::Int(0)),
        Value::Bool(b) => Ok(Num::Int(i64::from(*b))),
        Value::Number(n) => Ok(match n.as_i64() {
            Some(i) => Num::Int(i),
            None => Num::Float(n.as_f64().unwrap_or_default()),
        }),
        Value::String(s) => numeric_str(s)
            .ok_or_else(|| format!("Unsupported operand: non-numeric string '{}'", s)),
        Value::Array(_) | Value::Object(_) => Err("Unsupported operand types: array".to_string()),
    }
}

/// Number-like for comparisons: numbers, numeric strings, bools and null.
fn comparable_number(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) => numeric_str(s).map(Num::as_f64),
        Value::Array(_) | Value::Object(_) => None,
        other => to_number(other).ok().map(Num::as_f64),
    }
}

fn arithmetic(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, String> {
    let (a, b) = (to_number(left)?, to_number(right)?);
    let result = match (a, b) {
        (Num::Int(x), Num::Int(y)) => {
            let checked = match op {
                BinaryOp::Add => x.checked_add(y),
                BinaryOp::Sub => x.checked_sub(y),
                BinaryOp::Mul => x.checked_mul(y),
                BinaryOp::Div => {
                    if y == 0 {
                        return Err("Division by zero".to_string());
                    }
                    // `i64::MIN / -1` overflows; it falls through to floats.
                    match x.checked_rem(y) {
                        Some(0) => x.checked_div(y),
                        Some(_) => return Ok(float(x as f64 / y as f64)),
                        None => None,
                    }
                }
                BinaryOp::Mod => {
                    if y == 0 {
                        return Err("Modulo by zero".to_string());
                    }
                    Some(x.wrapping_rem(y))
                }
                _ => None,
            };
            match checked {
                Some(n) => Num::Int(n),
                None => Num::Float(float_op(op, x as f64, y as f64)?),
            }
        }
        (a, b) => {
            if op == BinaryOp::Mod {
                return arithmetic(
                    op,
                    &Value::from(a.as_f64() as i64),
                    &Value::from(b.as_f64() as i64),
                );
            }
            Num::Float(float_op(op, a.as_f64(), b.as_f64())?)
        }
    };
    Ok(result.into_value())
}

fn float_op(op: BinaryOp, a: f64, b: f64) -> Result<f64, String> {
    match op {
        BinaryOp::Add => Ok(a + b),
        BinaryOp::Sub => Ok(a - b),
        BinaryOp::Mul => Ok(a * b),
        BinaryOp::Div if b == 0.0 => Err("Division by zero".to_string()),
        BinaryOp::Div => Ok(a / b),
        other => Err(format!("{:?} is not an arithmetic operator", other)),
    }
}

/// PHP 8 loose equality (`==`).
pub fn loose_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Bool(_), _) | (_, Value::Bool(_)) => is_truthy(left) == is_truthy(right),
        (Value::Null, Value::Null) => true,
        (Value::Null, Value::String(s)) | (Value::String(s), Value::Null) => s.is_empty(),
        (Value::Null, other) | (other, Value::Null) => !is_truthy(other),
        (Value::String(a), Value::String(b)) => match (numeric_str(a), numeric_str(b)) {
            (Some(x), Some(y)) => x.as_f64() == y.as_f64(),
            _ => a == b,
        },
        (Value::Number(_), Value::String(s)) | (Value::String(s), Value::Number(_)) => {
            match numeric_str(s) {
                Some(_) => comparable_number(left) == comparable_number(right),
                None => to_display(left) == to_display(right),
            }
        }
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => left == right,
    }
}

fn compare(left: &Value, right: &Value) -> std::cmp::Ordering {
    match (comparable_number(left), comparable_number(right)) {
        (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(std::cmp::Ordering::Equal),
        _ => to_display(left).cmp(&to_display(right)),
    }
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, String> {
    use std::cmp::Ordering;

    let result = match op {
        BinaryOp::Concat => Value::String(to_display(left) + &to_display(right)),
        BinaryOp::Eq => Value::Bool(loose_eq(left, right)),
        BinaryOp::NotEq => Value::Bool(!loose_eq(left, right)),
        BinaryOp::StrictEq => Value::Bool(left == right),
        BinaryOp::StrictNotEq => Value::Bool(left != right),
        BinaryOp::Lt => Value::Bool(compare(left, right) == Ordering::Less),
        BinaryOp::LtEq => Value::Bool(compare(left, right) != Ordering::Greater),
        BinaryOp::Gt => Value::Bool(compare(left, right) == Ordering::Greater),
        BinaryOp::GtEq => Value::Bool(compare(left, right) != Ordering::Less),
        BinaryOp::And => Value::Bool(is_truthy(left) && is_truthy(right)),
        BinaryOp::Or => Value::Bool(is_truthy(left) || is_truthy(right)),
        arith => return arithmetic(arith, left, right),
    };
    Ok(result)
}
