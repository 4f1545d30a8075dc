//! Validation context and error model.
//!
//! Validation walks a snapshot alongside its descriptor, keeping a breadcrumb
//! trail of `(path segment, descriptor)` entries. Every failure carries the
//! full trail so the offending location can be reported from the root.

mod validator;

pub(crate) use validator::{dispatch_union, validate_value};

use json_joy_tree_path::format_pointer;
use serde_json::Value;
use std::fmt;

use crate::type_def::Type;

#[derive(Debug, Clone)]
pub struct ContextEntry {
    /// Segment under the parent entry; `None` for the root and for entries
    /// that narrow the type without moving (union members).
    pub path: Option<String>,
    pub ty: Type,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Invalid,
    /// No union member accepted the value.
    NoApplicableType,
    /// Several union members accepted the value.
    Ambiguous,
}

#[derive(Debug, Clone)]
pub struct ValidationFailure {
    pub context: Vec<ContextEntry>,
    /// `None` stands for a missing value.
    pub value: Option<Value>,
    pub message: Option<String>,
    pub kind: FailureKind,
}

pub type ValidationResult = Result<(), Vec<ValidationFailure>>;

impl ValidationFailure {
    /// Pointer from the root of the validated value.
    pub fn path(&self) -> String {
        let segments: Vec<&str> = self
            .context
            .iter()
            .filter_map(|entry| entry.path.as_deref())
            .collect();
        format_pointer(&segments)
    }

    pub fn type_description(&self) -> String {
        self.context
            .last()
            .map(|entry| entry.ty.describe())
            .unwrap_or_default()
    }

    pub fn render(&self) -> String {
        let mut line = format!(
            "at path \"{}\" value `{}` is not assignable to type: `{}`",
            self.path(),
            render_value(self.value.as_ref()),
            self.type_description()
        );
        if let Some(message) = &self.message {
            line.push_str(&format!(" ({message})"));
        }
        line
    }
}

pub(crate) fn render_value(value: Option<&Value>) -> String {
    match value {
        Some(v) => serde_json::to_string(v).unwrap_or_default(),
        None => "undefined".to_string(),
    }
}

/// Aggregated failure of converting a snapshot to a type.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub value: Option<Value>,
    pub type_description: String,
    pub failures: Vec<ValidationFailure>,
}

impl ValidationError {
    pub fn new(value: Option<&Value>, ty: &Type, failures: Vec<ValidationFailure>) -> Self {
        Self {
            value: value.cloned(),
            type_description: ty.describe(),
            failures,
        }
    }

    /// Every failure is a union ambiguity (as opposed to invalid data).
    pub fn is_ambiguous(&self) -> bool {
        !self.failures.is_empty()
            && self
                .failures
                .iter()
                .all(|f| f.kind == FailureKind::Ambiguous)
    }

    pub fn paths(&self) -> Vec<String> {
        self.failures.iter().map(ValidationFailure::path).collect()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Error while converting `{}` to `{}`:",
            render_value(self.value.as_ref()),
            self.type_description
        )?;
        for failure in &self.failures {
            write!(f, "\n{}", failure.render())?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}
