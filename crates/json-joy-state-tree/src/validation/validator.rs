//! Structural validator that walks a snapshot against a descriptor.
//!
//! Collections aggregate every failing element instead of stopping at the
//! first one.

use serde_json::Value;
use std::collections::HashMap;

use super::{ContextEntry, FailureKind, ValidationFailure};
use crate::tree::identifier_key;
use crate::type_def::classes::*;
use crate::type_def::{Type, TypeNode};

const NO_APPLICABLE: &str = "No type is applicable and no dispatch method is defined for the union";
const AMBIGUOUS: &str = "Multiple types are applicable and no dispatch method is defined for the union";

/// Validates `value` (missing when `None`) against `ty`. An empty result means success.
pub(crate) fn validate_value(
    ty: &Type,
    value: Option<&Value>,
    ctx: &[ContextEntry],
) -> Vec<ValidationFailure> {
    match &**ty {
        TypeNode::Late(l) => return validate_value(l.target(), value, ctx),
        TypeNode::Optional(o) => {
            return match value {
                // the default is instantiated in place of the missing value
                None => validate_value(&o.inner, Some(&o.default), ctx),
                Some(_) => validate_value(&o.inner, value, ctx),
            };
        }
        _ => {}
    }
    let value = match value {
        Some(v) => v,
        None => return failure(ctx, None, None::<String>),
    };

    match &**ty {
        TypeNode::Prim(p) => {
            if p.kind.accepts(value) {
                Vec::new()
            } else {
                failure(ctx, Some(value), Some(p.kind.mismatch_message()))
            }
        }

        TypeNode::Identifier(i) => {
            if i.base.accepts(value) {
                Vec::new()
            } else {
                failure(
                    ctx,
                    Some(value),
                    Some(format!(
                        "Value is not a valid {}, expected a {}",
                        i.name(),
                        i.base.name()
                    )),
                )
            }
        }

        TypeNode::Literal(l) => {
            if *value == l.value {
                Vec::new()
            } else {
                failure(
                    ctx,
                    Some(value),
                    Some(format!("Value is not a literal {}", ty.describe())),
                )
            }
        }

        TypeNode::Frozen(_) => Vec::new(),

        TypeNode::Model(m) => validate_model(value, m, ctx),

        TypeNode::Arr(a) => validate_arr(value, a, ctx),

        TypeNode::Map(m) => validate_map(value, m, ctx),

        TypeNode::Or(o) => validate_or(value, o, ctx),

        TypeNode::Ref(r) => {
            let ok = if r.uses_identifier() {
                value.is_string() || value.is_number()
            } else {
                value.is_string()
            };
            if ok {
                Vec::new()
            } else if r.uses_identifier() {
                failure(
                    ctx,
                    Some(value),
                    Some("Value is not a valid reference, expected a string or number identifier"),
                )
            } else {
                failure(
                    ctx,
                    Some(value),
                    Some("Value is not a valid reference, expected a path"),
                )
            }
        }

        TypeNode::Refinement(r) => {
            let inner = validate_value(&r.inner, Some(value), ctx);
            if !inner.is_empty() {
                return inner;
            }
            if (r.predicate)(value) {
                Vec::new()
            } else {
                let message = r
                    .message
                    .clone()
                    .unwrap_or_else(|| "Value does not respect the refinement predicate".to_string());
                failure(ctx, Some(value), Some(message))
            }
        }

        TypeNode::Late(_) | TypeNode::Optional(_) => Vec::new(),
    }
}

fn failure(
    ctx: &[ContextEntry],
    value: Option<&Value>,
    message: Option<impl Into<String>>,
) -> Vec<ValidationFailure> {
    vec![ValidationFailure {
        context: ctx.to_vec(),
        value: value.cloned(),
        message: message.map(Into::into),
        kind: FailureKind::Invalid,
    }]
}

fn child_context(ctx: &[ContextEntry], path: Option<String>, ty: &Type) -> Vec<ContextEntry> {
    let mut out = ctx.to_vec();
    out.push(ContextEntry {
        path,
        ty: ty.clone(),
    });
    out
}

fn validate_model(value: &Value, t: &ModelType, ctx: &[ContextEntry]) -> Vec<ValidationFailure> {
    let obj = match value.as_object() {
        Some(o) => o,
        None => return failure(ctx, Some(value), Some("Value is not a plain object")),
    };
    let mut out = Vec::new();
    for (key, prop) in &t.props {
        let sub = child_context(ctx, Some(key.clone()), prop);
        out.extend(validate_value(prop, obj.get(key), &sub));
    }
    out
}

fn validate_arr(value: &Value, t: &ArrType, ctx: &[ContextEntry]) -> Vec<ValidationFailure> {
    let arr = match value.as_array() {
        Some(a) => a,
        None => return failure(ctx, Some(value), Some("Value is not an array")),
    };
    let mut out = Vec::new();
    let id_attr = t.item.identifier_attribute();
    let mut seen: HashMap<String, usize> = HashMap::new();
    for (i, item) in arr.iter().enumerate() {
        let sub = child_context(ctx, Some(i.to_string()), &t.item);
        out.extend(validate_value(&t.item, Some(item), &sub));
        let Some(id) = id_attr.and_then(|attr| item.get(attr)).and_then(identifier_key) else {
            continue;
        };
        if let Some(first) = seen.insert(id.clone(), i) {
            out.extend(failure(
                &sub,
                Some(item),
                Some(format!(
                    "Duplicate identifier '{id}', already used at index {first}"
                )),
            ));
        }
    }
    out
}

fn validate_map(value: &Value, t: &MapType, ctx: &[ContextEntry]) -> Vec<ValidationFailure> {
    let obj = match value.as_object() {
        Some(o) => o,
        None => return failure(ctx, Some(value), Some("Value is not a plain object")),
    };
    let mut out = Vec::new();
    let id_attr = t.value.identifier_attribute();
    for (key, entry) in obj {
        let sub = child_context(ctx, Some(key.clone()), &t.value);
        let entry_failures = validate_value(&t.value, Some(entry), &sub);
        let valid = entry_failures.is_empty();
        out.extend(entry_failures);
        if !valid {
            continue;
        }
        let Some(id) = id_attr.and_then(|attr| entry.get(attr)).and_then(identifier_key) else {
            continue;
        };
        if id != *key {
            out.extend(failure(
                &sub,
                Some(entry),
                Some(format!(
                    "A map of objects containing an identifier should always store the object under their own identifier. Trying to store key '{key}', but expected: '{id}'"
                )),
            ));
        }
    }
    out
}

fn validate_or(value: &Value, t: &OrType, ctx: &[ContextEntry]) -> Vec<ValidationFailure> {
    if let Some(dispatcher) = &t.dispatcher {
        let index = dispatcher(value);
        return match t.types.get(index) {
            Some(member) => {
                let sub = child_context(ctx, None, member);
                validate_value(member, Some(value), &sub)
            }
            None => failure(
                ctx,
                Some(value),
                Some(format!(
                    "Dispatcher returned member {index}, but the union has {} members",
                    t.types.len()
                )),
            ),
        };
    }

    let mut applicable = 0usize;
    let mut errors = Vec::new();
    for member in &t.types {
        let sub = child_context(ctx, None, member);
        let member_failures = validate_value(member, Some(value), &sub);
        if member_failures.is_empty() {
            applicable += 1;
        } else {
            errors.extend(member_failures);
        }
    }

    match applicable {
        1 => Vec::new(),
        0 => {
            let mut out = vec![ValidationFailure {
                context: ctx.to_vec(),
                value: Some(value.clone()),
                message: Some(NO_APPLICABLE.to_string()),
                kind: FailureKind::NoApplicableType,
            }];
            out.extend(errors);
            out
        }
        _ => vec![ValidationFailure {
            context: ctx.to_vec(),
            value: Some(value.clone()),
            message: Some(AMBIGUOUS.to_string()),
            kind: FailureKind::Ambiguous,
        }],
    }
}

/// Picks the union member a validated snapshot belongs to.
pub(crate) fn dispatch_union<'a>(t: &'a OrType, value: &Value) -> Option<&'a Type> {
    if let Some(dispatcher) = &t.dispatcher {
        return t.types.get(dispatcher(value));
    }
    t.types.iter().find(|member| {
        let ctx = [ContextEntry {
            path: None,
            ty: (*member).clone(),
        }];
        validate_value(member, Some(value), &ctx).is_empty()
    })
}
