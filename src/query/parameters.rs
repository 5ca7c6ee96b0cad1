//! Parameter recording, binding and list expansion.
//!
//! Translation records one [`ParameterRef`] per `?` placeholder it emits,
//! in emission order. Binding resolves those references against caller
//! supplied [`QueryParameters`] and produces the positional
//! [`ParameterList`]. List values are expanded last, rewriting their single
//! placeholder into one placeholder per element.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use super::ast::InputParameter;
use super::value::{ParameterType, Value};
use crate::sql_walker::errors::TranslationError;

impl fmt::Display for InputParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputParameter::Named(name) => write!(f, ":{}", name),
            InputParameter::Positional(index) => write!(f, "?{}", index),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    pub value: Value,
    pub param_type: ParameterType,
}

/// Ordered (value, type) pairs; entry N binds the N-th placeholder
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ParameterList {
    params: Vec<Parameter>,
}

impl ParameterList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: Value, param_type: ParameterType) {
        self.params.push(Parameter { value, param_type });
    }

    /// Pushes `value` typed by inference
    pub fn push_value(&mut self, value: Value) {
        let param_type = value.inferred_type();
        self.push(value, param_type);
    }

    pub fn extend(&mut self, other: ParameterList) {
        self.params.extend(other.params);
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Parameter> {
        self.params.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter()
    }

    pub fn values(&self) -> Vec<Value> {
        self.params.iter().map(|p| p.value.clone()).collect()
    }

    pub fn types(&self) -> Vec<ParameterType> {
        self.params.iter().map(|p| p.param_type).collect()
    }
}

impl From<Vec<Value>> for ParameterList {
    fn from(values: Vec<Value>) -> Self {
        let mut list = ParameterList::new();
        for value in values {
            list.push_value(value);
        }
        list
    }
}

/// A placeholder emitted during translation, waiting for its value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterRef {
    pub key: InputParameter,
    /// Type of the field the parameter is compared against
    pub field_type: Option<ParameterType>,
}

/// Caller-supplied values for named and positional input parameters
#[derive(Debug, Clone, Default)]
pub struct QueryParameters {
    values: HashMap<InputParameter, (Value, Option<ParameterType>)>,
}

impl QueryParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values
            .insert(InputParameter::Named(name.into()), (value.into(), None));
        self
    }

    /// Binds with an explicit type, overriding field and inferred types
    pub fn set_typed(
        mut self,
        name: impl Into<String>,
        value: impl Into<Value>,
        param_type: ParameterType,
    ) -> Self {
        self.values.insert(
            InputParameter::Named(name.into()),
            (value.into(), Some(param_type)),
        );
        self
    }

    pub fn set_positional(mut self, index: usize, value: impl Into<Value>) -> Self {
        self.values
            .insert(InputParameter::Positional(index), (value.into(), None));
        self
    }

    pub fn get(&self, key: &InputParameter) -> Option<&(Value, Option<ParameterType>)> {
        self.values.get(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Resolves recorded references into positional parameters.
///
/// Type precedence: explicit type, then the compared field's type, then the
/// type inferred from the value.
pub fn bind_parameters(
    refs: &[ParameterRef],
    params: &QueryParameters,
) -> Result<ParameterList, TranslationError> {
    let mut list = ParameterList::new();
    for param_ref in refs {
        let (value, explicit) =
            params
                .get(&param_ref.key)
                .ok_or_else(|| TranslationError::MissingParameter {
                    name: param_ref.key.to_string(),
                })?;
        let param_type = explicit
            .or(param_ref.field_type)
            .unwrap_or_else(|| value.inferred_type());
        list.push(value.clone(), param_type);
    }
    Ok(list)
}

/// Rewrites every placeholder bound to a list into one placeholder per
/// element. An empty list renders `NULL` and binds nothing. Placeholders
/// inside quoted literals are left alone.
pub fn expand_list_parameters(
    sql: &str,
    params: &ParameterList,
) -> Result<(String, ParameterList), TranslationError> {
    if !params.iter().any(|p| p.value.is_list()) {
        return Ok((sql.to_string(), params.clone()));
    }

    let mut out = String::with_capacity(sql.len());
    let mut expanded = ParameterList::new();
    let mut position = 0usize;
    let mut quote: Option<char> = None;

    for c in sql.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => {
                quote = None;
                out.push(c);
            }
            (Some(_), c) => out.push(c),
            (None, '\'') | (None, '"') => {
                quote = Some(c);
                out.push(c);
            }
            (None, '?') => {
                let param = params
                    .get(position)
                    .ok_or_else(|| TranslationError::InvalidParameter {
                        name: format!("#{}", position),
                        message: "more placeholders than bound parameters".to_string(),
                    })?;
                position += 1;

                match &param.value {
                    Value::List(items) if items.is_empty() => out.push_str("NULL"),
                    Value::List(items) => {
                        let placeholders = vec!["?"; items.len()].join(", ");
                        out.push_str(&placeholders);
                        for item in items {
                            let item_type = match param.param_type {
                                ParameterType::Null => item.inferred_type(),
                                declared => declared,
                            };
                            expanded.push(item.clone(), item_type);
                        }
                    }
                    value => {
                        out.push('?');
                        expanded.push(value.clone(), param.param_type);
                    }
                }
            }
            (None, c) => out.push(c),
        }
    }

    if position != params.len() {
        return Err(TranslationError::InvalidParameter {
            name: format!("#{}", position),
            message: format!(
                "{} parameters bound for {} placeholders",
                params.len(),
                position
            ),
        });
    }
    Ok((out, expanded))
}
