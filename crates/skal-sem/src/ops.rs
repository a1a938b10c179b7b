//! Per-operator type and value computation.
//!
//! Pure functions shared by the analyzer (typing only) and the evaluator
//! (typing plus computation). All failures are `TypeError`s carrying the
//! operator's source context.

use skal_lex::TokenKind;
use skal_util::{Error, Result, SourceCtx};

use crate::types::{is_implicitly_convertible, TypeId};
use crate::value::{Payload, Value};

/// The operand types an operator accepts, narrowest first.
pub fn valid_operand_types(op: TokenKind) -> &'static [TypeId] {
    use TokenKind::*;
    match op {
        And | Or | Xor | Lt | Lte | Gt | Gte | Eq | Neq | Plus => {
            &[TypeId::Int, TypeId::Real, TypeId::Str]
        }
        Minus | Mul | IntDiv | RealDiv | Mod => &[TypeId::Int, TypeId::Real],
        _ => &[],
    }
}

fn type_err(message: String, ctx: Option<&SourceCtx>) -> Error {
    Error::type_error(message, ctx.cloned())
}

/// Convert a payload to the runtime representation of `to`.
///
/// Standard conversions between int/real/string; `any`, `void`, and
/// `cast` targets pass the payload through unchanged. Failure (an
/// unparsable string, or the void placeholder) is a `TypeError`.
pub fn cast(payload: &Payload, to: TypeId, ctx: Option<&SourceCtx>) -> Result<Payload> {
    let fail = || type_err(format!("cannot convert {} to {}", payload, to), ctx);
    match to {
        TypeId::Int => match payload {
            Payload::Int(v) => Ok(Payload::Int(*v)),
            Payload::Real(v) => Ok(Payload::Int(*v as i64)),
            Payload::Str(s) => s.trim().parse().map(Payload::Int).map_err(|_| fail()),
            Payload::Void => Err(fail()),
        },
        TypeId::Real => match payload {
            Payload::Int(v) => Ok(Payload::Real(*v as f64)),
            Payload::Real(v) => Ok(Payload::Real(*v)),
            Payload::Str(s) => s.trim().parse().map(Payload::Real).map_err(|_| fail()),
            Payload::Void => Err(fail()),
        },
        TypeId::Str => match payload {
            Payload::Void => Err(fail()),
            other => Ok(Payload::Str(other.plain())),
        },
        TypeId::Any | TypeId::Void | TypeId::Cast => Ok(payload.clone()),
    }
}

/// The static type of an assignment, or a `TypeError` if the right side
/// cannot flow into the variable.
///
/// CAST-ASSIGN treats the right side as `cast`, permitting any
/// conversion. Assigning into an `any` variable adopts the right side's
/// real type.
pub fn assignment_type(
    op: TokenKind,
    var_ty: TypeId,
    expr_ty: TypeId,
    expr_real_ty: TypeId,
    ctx: Option<&SourceCtx>,
) -> Result<TypeId> {
    let expr_ty = if op == TokenKind::CastAssign {
        TypeId::Cast
    } else {
        expr_ty
    };

    if !is_implicitly_convertible(expr_ty, var_ty) {
        return Err(type_err(
            format!("cannot assign {} to {}", expr_ty, var_ty),
            ctx,
        ));
    }

    Ok(if var_ty == TypeId::Any {
        expr_real_ty
    } else {
        var_ty
    })
}

/// The value an assignment stores: typed by [`assignment_type`], payload
/// converted to that type.
pub fn assignment_value(
    op: TokenKind,
    var_ty: TypeId,
    expr: &Value,
    ctx: Option<&SourceCtx>,
) -> Result<Value> {
    let ty = assignment_type(op, var_ty, expr.ty, expr.real_ty, ctx)?;
    Ok(Value::new(ty, cast(&expr.payload, ty, ctx)?))
}

/// Result type of a unary operator.
///
/// `~` yields `cast`. `+`/`-` accept int/real/any (a `cast` operand
/// collapses to int). `not` boolean-coerces anything but void and yields
/// int.
pub fn unary_op_type(op: TokenKind, ty: TypeId, ctx: Option<&SourceCtx>) -> Result<TypeId> {
    match op {
        TokenKind::Cast => Ok(TypeId::Cast),
        TokenKind::Plus | TokenKind::Minus => match ty {
            TypeId::Cast => Ok(TypeId::Int),
            TypeId::Int | TypeId::Real | TypeId::Any => Ok(ty),
            _ => Err(type_err(format!("invalid operand type {} for {}", ty, op), ctx)),
        },
        TokenKind::Not => match ty {
            TypeId::Void => Err(type_err(format!("invalid operand type {} for {}", ty, op), ctx)),
            _ => Ok(TypeId::Int),
        },
        _ => Err(type_err(format!("invalid operand type {} for {}", ty, op), ctx)),
    }
}

/// Apply a unary operator. The result keeps the operand's real type so
/// `any` chains stay traceable; `not` produces a fresh int.
pub fn unary_op_value(op: TokenKind, arg: &Value, ctx: Option<&SourceCtx>) -> Result<Value> {
    let ty = unary_op_type(op, arg.ty, ctx)?;

    match op {
        TokenKind::Cast => Ok(Value::with_real_type(
            ty,
            arg.payload.clone(),
            arg.real_ty,
        )),
        TokenKind::Not => Ok(Value::new(
            TypeId::Int,
            Payload::Int(if arg.is_truthy() { 0 } else { 1 }),
        )),
        _ => {
            let payload = cast(&arg.payload, ty, ctx)?;
            let payload = if op == TokenKind::Minus {
                match payload {
                    Payload::Int(v) => Payload::Int(v.wrapping_neg()),
                    Payload::Real(v) => Payload::Real(-v),
                    other => {
                        return Err(type_err(
                            format!("invalid operand type {} for {}", other.type_of(), op),
                            ctx,
                        ))
                    }
                }
            } else {
                payload
            };
            Ok(Value::with_real_type(ty, payload, arg.real_ty))
        }
    }
}

/// Result type of a binary operator: the narrowest of int/real/string
/// that the operator accepts and both operands convert to. An `any`
/// operand makes the whole expression `any`.
pub fn binary_op_type(
    op: TokenKind,
    ty1: TypeId,
    ty2: TypeId,
    ctx: Option<&SourceCtx>,
) -> Result<TypeId> {
    for ty in [TypeId::Int, TypeId::Real, TypeId::Str] {
        if valid_operand_types(op).contains(&ty)
            && is_implicitly_convertible(ty1, ty)
            && is_implicitly_convertible(ty2, ty)
        {
            if ty1 == TypeId::Any || ty2 == TypeId::Any {
                return Ok(TypeId::Any);
            }
            return Ok(ty);
        }
    }

    Err(type_err(
        format!("invalid operand types {} and {} for {}", ty1, ty2, op),
        ctx,
    ))
}

/// Apply a binary operator.
///
/// Both payloads are converted to the promoted type and the operation is
/// computed there. When the static promotion is `any`, the concrete
/// computation type is re-derived from the operands' runtime payloads.
/// Logical and comparison results are int 0/1; arithmetic results carry
/// the static type.
pub fn binary_op_value(
    op: TokenKind,
    arg1: &Value,
    arg2: &Value,
    ctx: Option<&SourceCtx>,
) -> Result<Value> {
    let ty = binary_op_type(op, arg1.ty, arg2.ty, ctx)?;
    let calc = if ty == TypeId::Any {
        binary_op_type(op, arg1.payload.type_of(), arg2.payload.type_of(), ctx)?
    } else {
        ty
    };

    let left = cast(&arg1.payload, calc, ctx)?;
    let right = cast(&arg2.payload, calc, ctx)?;

    use TokenKind::*;
    match op {
        And => Ok(bool_value(truthy(&left) && truthy(&right))),
        Or => Ok(bool_value(truthy(&left) || truthy(&right))),
        Xor => Ok(bool_value(truthy(&left) ^ truthy(&right))),
        Lt | Lte | Gt | Gte | Eq | Neq => Ok(bool_value(compare(op, &left, &right))),
        Plus | Minus | Mul | IntDiv | RealDiv | Mod => {
            Ok(Value::new(ty, arith(op, &left, &right, ctx)?))
        }
        other => Err(type_err(
            format!("invalid operand types {} and {} for {}", arg1.ty, arg2.ty, other),
            ctx,
        )),
    }
}

fn bool_value(b: bool) -> Value {
    Value::new(TypeId::Int, Payload::Int(b as i64))
}

fn truthy(payload: &Payload) -> bool {
    match payload {
        Payload::Int(v) => *v != 0,
        Payload::Real(v) => *v != 0.0,
        Payload::Str(v) => !v.is_empty(),
        Payload::Void => true,
    }
}

fn compare(op: TokenKind, left: &Payload, right: &Payload) -> bool {
    use std::cmp::Ordering;

    let ord: Option<Ordering> = match (left, right) {
        (Payload::Int(a), Payload::Int(b)) => Some(a.cmp(b)),
        (Payload::Real(a), Payload::Real(b)) => a.partial_cmp(b),
        (Payload::Str(a), Payload::Str(b)) => Some(a.cmp(b)),
        _ => None,
    };

    match op {
        TokenKind::Lt => ord == Some(Ordering::Less),
        TokenKind::Lte => matches!(ord, Some(Ordering::Less | Ordering::Equal)),
        TokenKind::Gt => ord == Some(Ordering::Greater),
        TokenKind::Gte => matches!(ord, Some(Ordering::Greater | Ordering::Equal)),
        TokenKind::Eq => ord == Some(Ordering::Equal),
        TokenKind::Neq => ord != Some(Ordering::Equal),
        _ => false,
    }
}

fn arith(op: TokenKind, left: &Payload, right: &Payload, ctx: Option<&SourceCtx>) -> Result<Payload> {
    use TokenKind::*;

    match (left, right) {
        (Payload::Int(a), Payload::Int(b)) => {
            if matches!(op, IntDiv | RealDiv | Mod) && *b == 0 {
                return Err(type_err("division by zero".into(), ctx));
            }
            Ok(match op {
                Plus => Payload::Int(a.wrapping_add(*b)),
                Minus => Payload::Int(a.wrapping_sub(*b)),
                Mul => Payload::Int(a.wrapping_mul(*b)),
                IntDiv => Payload::Int(floor_div(*a, *b)),
                Mod => Payload::Int(floor_mod(*a, *b)),
                // True division; the wrapper's static type still follows
                // the promoted operand type.
                _ => Payload::Real(*a as f64 / *b as f64),
            })
        }
        (Payload::Real(a), Payload::Real(b)) => {
            if matches!(op, IntDiv | RealDiv | Mod) && *b == 0.0 {
                return Err(type_err("division by zero".into(), ctx));
            }
            Ok(Payload::Real(match op {
                Plus => a + b,
                Minus => a - b,
                Mul => a * b,
                IntDiv => (a / b).floor(),
                Mod => a - (a / b).floor() * b,
                _ => a / b,
            }))
        }
        (Payload::Str(a), Payload::Str(b)) if op == Plus => {
            let mut s = String::with_capacity(a.len() + b.len());
            s.push_str(a);
            s.push_str(b);
            Ok(Payload::Str(s))
        }
        (a, b) => Err(type_err(
            format!(
                "invalid operand types {} and {} for {}",
                a.type_of(),
                b.type_of(),
                op
            ),
            ctx,
        )),
    }
}

/// Floor division, rounding toward negative infinity.
fn floor_div(a: i64, b: i64) -> i64 {
    let q = a.wrapping_div(b);
    if a.wrapping_rem(b) != 0 && (a < 0) != (b < 0) {
        q.wrapping_sub(1)
    } else {
        q
    }
}

/// Remainder paired with [`floor_div`]: the result has the divisor's sign.
fn floor_mod(a: i64, b: i64) -> i64 {
    a.wrapping_sub(floor_div(a, b).wrapping_mul(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use TokenKind::*;

    fn int(v: i64) -> Value {
        Value::new(TypeId::Int, Payload::Int(v))
    }

    fn real(v: f64) -> Value {
        Value::new(TypeId::Real, Payload::Real(v))
    }

    fn string(v: &str) -> Value {
        Value::new(TypeId::Str, Payload::Str(v.into()))
    }

    #[test]
    fn test_binary_promotion() {
        assert_eq!(binary_op_type(Plus, TypeId::Int, TypeId::Int, None), Ok(TypeId::Int));
        assert_eq!(binary_op_type(Plus, TypeId::Int, TypeId::Real, None), Ok(TypeId::Real));
        assert_eq!(binary_op_type(Plus, TypeId::Str, TypeId::Str, None), Ok(TypeId::Str));
        assert_eq!(binary_op_type(Mul, TypeId::Any, TypeId::Int, None), Ok(TypeId::Any));
    }

    #[test]
    fn test_binary_rejections() {
        let err = binary_op_type(Minus, TypeId::Str, TypeId::Str, None).expect_err("should fail");
        assert_eq!(err.message, "invalid operand types string and string for MINUS");
        assert!(binary_op_type(Plus, TypeId::Int, TypeId::Str, None).is_err());
        assert!(binary_op_type(Plus, TypeId::Void, TypeId::Int, None).is_err());
    }

    #[test]
    fn test_arithmetic_values() {
        let v = binary_op_value(Plus, &int(2), &int(3), None).expect("plus failed");
        assert_eq!(v.payload, Payload::Int(5));
        assert_eq!(v.ty, TypeId::Int);

        let v = binary_op_value(Mul, &int(3), &real(2.5), None).expect("mul failed");
        assert_eq!(v.payload, Payload::Real(7.5));
        assert_eq!(v.ty, TypeId::Real);

        let v = binary_op_value(Plus, &string("ab"), &string("cd"), None).expect("concat failed");
        assert_eq!(v.payload, Payload::Str("abcd".into()));
    }

    #[test]
    fn test_floor_division_semantics() {
        let v = binary_op_value(IntDiv, &int(-7), &int(2), None).expect("div failed");
        assert_eq!(v.payload, Payload::Int(-4));
        let v = binary_op_value(Mod, &int(-7), &int(2), None).expect("mod failed");
        assert_eq!(v.payload, Payload::Int(1));
        let v = binary_op_value(IntDiv, &real(7.5), &real(2.0), None).expect("div failed");
        assert_eq!(v.payload, Payload::Real(3.0));
    }

    #[test]
    fn test_real_div_keeps_static_type_but_true_divides() {
        let v = binary_op_value(RealDiv, &int(7), &int(2), None).expect("div failed");
        assert_eq!(v.ty, TypeId::Int);
        assert_eq!(v.payload, Payload::Real(3.5));
    }

    #[test]
    fn test_division_by_zero() {
        for op in [IntDiv, RealDiv, Mod] {
            let err = binary_op_value(op, &int(1), &int(0), None).expect_err("should fail");
            assert_eq!(err.message, "division by zero");
            let err = binary_op_value(op, &real(1.0), &real(0.0), None).expect_err("should fail");
            assert_eq!(err.message, "division by zero");
        }
    }

    #[test]
    fn test_comparisons_yield_int() {
        let v = binary_op_value(Lt, &int(1), &int(2), None).expect("lt failed");
        assert_eq!(v, Value::new(TypeId::Int, Payload::Int(1)));
        let v = binary_op_value(Eq, &string("a"), &string("b"), None).expect("eq failed");
        assert_eq!(v.payload, Payload::Int(0));
        // int operand promotes to real before comparing
        let v = binary_op_value(Gte, &int(2), &real(2.0), None).expect("gte failed");
        assert_eq!(v.payload, Payload::Int(1));
    }

    #[test]
    fn test_logical_ops_coerce() {
        let v = binary_op_value(And, &int(2), &string("x"), None);
        // int and string have no common promoted type
        assert!(v.is_err());
        let v = binary_op_value(And, &int(2), &int(0), None).expect("and failed");
        assert_eq!(v.payload, Payload::Int(0));
        let v = binary_op_value(Xor, &int(2), &int(0), None).expect("xor failed");
        assert_eq!(v.payload, Payload::Int(1));
    }

    #[test]
    fn test_any_operand_computes_on_runtime_type() {
        let any_str = Value::with_real_type(TypeId::Any, Payload::Str("ab".into()), TypeId::Str);
        let v = binary_op_value(Plus, &any_str, &string("c"), None).expect("plus failed");
        assert_eq!(v.ty, TypeId::Any);
        assert_eq!(v.payload, Payload::Str("abc".into()));

        let err = binary_op_value(Minus, &any_str, &string("c"), None).expect_err("should fail");
        assert_eq!(err.kind, skal_util::ErrorKind::Type);
    }

    #[test]
    fn test_cast_conversions() {
        assert_eq!(cast(&Payload::Str(" 42 ".into()), TypeId::Int, None), Ok(Payload::Int(42)));
        assert_eq!(cast(&Payload::Real(3.9), TypeId::Int, None), Ok(Payload::Int(3)));
        assert_eq!(cast(&Payload::Int(3), TypeId::Str, None), Ok(Payload::Str("3".into())));
        assert_eq!(cast(&Payload::Real(3.0), TypeId::Str, None), Ok(Payload::Str("3.0".into())));
        let err = cast(&Payload::Str("abc".into()), TypeId::Int, None).expect_err("should fail");
        assert_eq!(err.message, "cannot convert 'abc' to int");
        assert!(cast(&Payload::Void, TypeId::Int, None).is_err());
        assert_eq!(cast(&Payload::Void, TypeId::Any, None), Ok(Payload::Void));
    }

    #[test]
    fn test_assignment_typing() {
        assert_eq!(
            assignment_type(Assign, TypeId::Real, TypeId::Int, TypeId::Int, None),
            Ok(TypeId::Real)
        );
        // any variable adopts the expression's real type
        assert_eq!(
            assignment_type(Assign, TypeId::Any, TypeId::Str, TypeId::Str, None),
            Ok(TypeId::Str)
        );
        // cast-assign permits anything
        assert_eq!(
            assignment_type(CastAssign, TypeId::Int, TypeId::Str, TypeId::Str, None),
            Ok(TypeId::Int)
        );
        let err = assignment_type(Assign, TypeId::Str, TypeId::Int, TypeId::Int, None)
            .expect_err("should fail");
        assert_eq!(err.message, "cannot assign int to string");
    }

    #[test]
    fn test_assignment_value_converts() {
        let v = assignment_value(Assign, TypeId::Real, &int(3), None).expect("assign failed");
        assert_eq!(v.payload, Payload::Real(3.0));
        let v = assignment_value(CastAssign, TypeId::Int, &string("17"), None).expect("assign failed");
        assert_eq!(v.payload, Payload::Int(17));
        let err = assignment_value(CastAssign, TypeId::Int, &string("x"), None).expect_err("should fail");
        assert_eq!(err.message, "cannot convert 'x' to int");
    }

    #[test]
    fn test_unary_typing() {
        assert_eq!(unary_op_type(Cast, TypeId::Str, None), Ok(TypeId::Cast));
        assert_eq!(unary_op_type(Minus, TypeId::Int, None), Ok(TypeId::Int));
        assert_eq!(unary_op_type(Minus, TypeId::Cast, None), Ok(TypeId::Int));
        assert_eq!(unary_op_type(Not, TypeId::Str, None), Ok(TypeId::Int));
        assert!(unary_op_type(Minus, TypeId::Str, None).is_err());
        assert!(unary_op_type(Not, TypeId::Void, None).is_err());
    }

    #[test]
    fn test_unary_values() {
        let v = unary_op_value(Minus, &int(5), None).expect("neg failed");
        assert_eq!(v.payload, Payload::Int(-5));

        let v = unary_op_value(Not, &string("x"), None).expect("not failed");
        assert_eq!(v, Value::new(TypeId::Int, Payload::Int(0)));
        let v = unary_op_value(Not, &int(0), None).expect("not failed");
        assert_eq!(v.payload, Payload::Int(1));

        // ~'5' then unary minus collapses cast to int
        let cast_val = unary_op_value(Cast, &string("5"), None).expect("cast failed");
        assert_eq!(cast_val.ty, TypeId::Cast);
        assert_eq!(cast_val.real_ty, TypeId::Str);
        let v = unary_op_value(Minus, &cast_val, None).expect("neg failed");
        assert_eq!(v.ty, TypeId::Int);
        assert_eq!(v.payload, Payload::Int(-5));
    }
}
