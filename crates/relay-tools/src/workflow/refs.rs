// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: MIT
//! Workflow output references.
//!
//! Step arguments may point at earlier outputs with `"$var"` strings or
//! `{ "$ref": "$var.path.to" }` objects.  Resolution is a pure tree walk
//! over the outputs map; an unresolved path fails the step, it is never
//! silently passed through.

use std::collections::HashMap;

use serde_json::{Map, Value};

/// Walk `$name.seg1.seg2` against the outputs map.
fn lookup(reference: &str, outputs: &HashMap<String, Value>) -> Result<Value, String> {
    let path = reference
        .strip_prefix('$')
        .ok_or_else(|| format!("not a reference: {reference}"))?;
    let mut segments = path.split('.');
    let name = segments.next().filter(|s| !s.is_empty()).ok_or_else(|| {
        format!("empty variable name in reference {reference}")
    })?;
    let mut current = outputs
        .get(name)
        .ok_or_else(|| format!("unknown output variable ${name}"))?;
    for segment in segments {
        current = match current {
            Value::Object(map) => map
                .get(segment)
                .ok_or_else(|| format!("path segment {segment} missing in ${name}"))?,
            Value::Array(items) => {
                let index: usize = segment
                    .parse()
                    .map_err(|_| format!("non-numeric index {segment} into array in ${name}"))?;
                items
                    .get(index)
                    .ok_or_else(|| format!("index {segment} out of bounds in ${name}"))?
            }
            _ => return Err(format!("cannot descend into scalar at {segment} in ${name}")),
        };
    }
    Ok(current.clone())
}

/// Resolve every reference inside `args` against `outputs`.
pub fn resolve_refs(args: &Value, outputs: &HashMap<String, Value>) -> Result<Value, String> {
    match args {
        Value::String(s) if s.starts_with('$') => lookup(s, outputs),
        Value::Object(map) => {
            // `{ "$ref": "$var.path" }` collapses to the referenced value.
            if map.len() == 1 {
                if let Some(Value::String(reference)) = map.get("$ref") {
                    return lookup(reference, outputs);
                }
            }
            let mut resolved = Map::with_capacity(map.len());
            for (k, v) in map {
                resolved.insert(k.clone(), resolve_refs(v, outputs)?);
            }
            Ok(Value::Object(resolved))
        }
        Value::Array(items) => items
            .iter()
            .map(|v| resolve_refs(v, outputs))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        other => Ok(other.clone()),
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
