//! Table-driven argument validation.
//!
//! Each tool declares an [`ArgSchema`]: an ordered list of fields with a
//! primitive kind, an optional default and, for integers, inclusive bounds.
//! Validation walks the table in order and stops at the first violation.
//! The same table renders the JSON schema advertised in `tools/list`.

use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    String,
    Integer { min: Option<i64>, max: Option<i64> },
    Boolean,
    StringArray,
    Enum(&'static [&'static str]),
}

impl FieldKind {
    fn expectation(&self) -> String {
        match self {
            Self::String => "a string".into(),
            Self::Integer { .. } => "an integer".into(),
            Self::Boolean => "a boolean".into(),
            Self::StringArray => "an array of strings".into(),
            Self::Enum(members) => format!("one of {}", members.join(", ")),
        }
    }
}

/// Default inserted when an optional field is absent.
#[derive(Debug, Clone, Copy)]
pub enum FieldDefault {
    Integer(i64),
    Boolean(bool),
    Str(&'static str),
}

impl FieldDefault {
    fn to_value(self) -> Value {
        match self {
            Self::Integer(v) => json!(v),
            Self::Boolean(v) => json!(v),
            Self::Str(v) => json!(v),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub default: Option<FieldDefault>,
    pub description: &'static str,
}

impl Field {
    pub const fn required(name: &'static str, kind: FieldKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: true,
            default: None,
            description,
        }
    }

    pub const fn optional(name: &'static str, kind: FieldKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: false,
            default: None,
            description,
        }
    }

    pub const fn with_default(mut self, default: FieldDefault) -> Self {
        self.default = Some(default);
        self
    }
}

#[derive(Debug)]
pub struct ArgSchema {
    pub fields: &'static [Field],
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("arguments must be an object")]
    NotAnObject,
    #[error("{field}: missing required field")]
    Missing { field: &'static str },
    #[error("{field}: expected {expected}")]
    WrongType {
        field: &'static str,
        expected: String,
    },
    #[error("{field}: must be at least {min}, got {value}")]
    BelowMinimum {
        field: &'static str,
        min: i64,
        value: i64,
    },
    #[error("{field}: must be at most {max}, got {value}")]
    AboveMaximum {
        field: &'static str,
        max: i64,
        value: i64,
    },
    #[error("{field}: expected one of {allowed}, got {value:?}")]
    NotAllowed {
        field: &'static str,
        allowed: String,
        value: String,
    },
    #[error("{0}")]
    Shape(String),
}

/// Arguments that passed their schema: only declared fields, defaults filled.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedArgs(Map<String, Value>);

impl ValidatedArgs {
    /// Deserialize into a handler's typed argument record.
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<T, ValidationError> {
        serde_json::from_value(Value::Object(self.0))
            .map_err(|e| ValidationError::Shape(e.to_string()))
    }
}

impl ArgSchema {
    pub fn validate(&self, arguments: &Value) -> Result<ValidatedArgs, ValidationError> {
        let empty = Map::new();
        let input = match arguments {
            Value::Null => &empty,
            Value::Object(map) => map,
            _ => return Err(ValidationError::NotAnObject),
        };

        let mut out = Map::new();
        for field in self.fields {
            match input.get(field.name).filter(|v| !v.is_null()) {
                Some(value) => {
                    let normalized = check_field(field, value)?;
                    out.insert(field.name.to_string(), normalized);
                }
                None if field.required => {
                    return Err(ValidationError::Missing { field: field.name })
                }
                None => {
                    if let Some(default) = field.default {
                        out.insert(field.name.to_string(), default.to_value());
                    }
                }
            }
        }
        Ok(ValidatedArgs(out))
    }

    pub fn json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for field in self.fields {
            let mut prop = match field.kind {
                FieldKind::String => json!({"type": "string"}),
                FieldKind::Integer { min, max } => {
                    let mut p = json!({"type": "integer"});
                    if let Some(min) = min {
                        p["minimum"] = json!(min);
                    }
                    if let Some(max) = max {
                        p["maximum"] = json!(max);
                    }
                    p
                }
                FieldKind::Boolean => json!({"type": "boolean"}),
                FieldKind::StringArray => json!({"type": "array", "items": {"type": "string"}}),
                FieldKind::Enum(members) => json!({"type": "string", "enum": members}),
            };
            prop["description"] = json!(field.description);
            if let Some(default) = field.default {
                prop["default"] = default.to_value();
            }
            properties.insert(field.name.to_string(), prop);
            if field.required {
                required.push(field.name);
            }
        }

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

fn check_field(field: &Field, value: &Value) -> Result<Value, ValidationError> {
    let wrong_type = || ValidationError::WrongType {
        field: field.name,
        expected: field.kind.expectation(),
    };

    match field.kind {
        FieldKind::String => value.as_str().map(|_| value.clone()).ok_or_else(wrong_type),
        FieldKind::Boolean => value.as_bool().map(|_| value.clone()).ok_or_else(wrong_type),
        FieldKind::StringArray => {
            let items = value.as_array().ok_or_else(wrong_type)?;
            if items.iter().all(Value::is_string) {
                Ok(value.clone())
            } else {
                Err(wrong_type())
            }
        }
        FieldKind::Integer { min, max } => {
            let n = as_whole_number(value).ok_or_else(wrong_type)?;
            if let Some(min) = min.filter(|min| n < *min) {
                return Err(ValidationError::BelowMinimum {
                    field: field.name,
                    min,
                    value: n,
                });
            }
            if let Some(max) = max.filter(|max| n > *max) {
                return Err(ValidationError::AboveMaximum {
                    field: field.name,
                    max,
                    value: n,
                });
            }
            Ok(json!(n))
        }
        FieldKind::Enum(members) => {
            let s = value.as_str().ok_or_else(wrong_type)?;
            if members.contains(&s) {
                Ok(value.clone())
            } else {
                Err(ValidationError::NotAllowed {
                    field: field.name,
                    allowed: members.join(", "),
                    value: s.to_string(),
                })
            }
        }
    }
}

/// JSON numbers with no fractional part (`3` and `3.0` both qualify).
fn as_whole_number(value: &Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    let f = value.as_f64()?;
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    static SAMPLE: ArgSchema = ArgSchema {
        fields: &[
            Field::required("path", FieldKind::String, "Target path"),
            Field::optional(
                "count",
                FieldKind::Integer {
                    min: Some(1),
                    max: Some(10),
                },
                "How many",
            )
            .with_default(FieldDefault::Integer(3)),
            Field::optional("force", FieldKind::Boolean, "Overwrite")
                .with_default(FieldDefault::Boolean(false)),
            Field::optional("tags", FieldKind::StringArray, "Labels"),
            Field::optional("mode", FieldKind::Enum(&["fast", "slow"]), "Speed")
                .with_default(FieldDefault::Str("fast")),
        ],
    };

    #[test]
    fn test_defaults_are_filled_and_unknown_fields_dropped() {
        let args = SAMPLE
            .validate(&json!({"path": "a.txt", "extra": true}))
            .unwrap();
        assert_eq!(args.0.get("count"), Some(&json!(3)));
        assert_eq!(args.0.get("force"), Some(&json!(false)));
        assert_eq!(args.0.get("mode"), Some(&json!("fast")));
        assert_eq!(args.0.get("tags"), None);
        assert_eq!(args.0.get("extra"), None);
    }

    #[test]
    fn test_missing_required_field() {
        let err = SAMPLE.validate(&json!({"count": 2})).unwrap_err();
        assert_eq!(err, ValidationError::Missing { field: "path" });
        assert_eq!(err.to_string(), "path: missing required field");
    }

    #[test]
    fn test_null_arguments_behave_like_empty_object() {
        let err = SAMPLE.validate(&Value::Null).unwrap_err();
        assert_eq!(err, ValidationError::Missing { field: "path" });

        let err = SAMPLE.validate(&json!(["path"])).unwrap_err();
        assert_eq!(err, ValidationError::NotAnObject);
    }

    #[test]
    fn test_null_field_counts_as_absent() {
        let args = SAMPLE
            .validate(&json!({"path": "a", "count": null}))
            .unwrap();
        assert_eq!(args.0.get("count"), Some(&json!(3)));
    }

    #[test]
    fn test_wrong_primitive_types() {
        let err = SAMPLE.validate(&json!({"path": 7})).unwrap_err();
        assert_eq!(err.to_string(), "path: expected a string");

        let err = SAMPLE
            .validate(&json!({"path": "a", "force": "yes"}))
            .unwrap_err();
        assert_eq!(err.to_string(), "force: expected a boolean");

        let err = SAMPLE
            .validate(&json!({"path": "a", "tags": ["x", 1]}))
            .unwrap_err();
        assert_eq!(err.to_string(), "tags: expected an array of strings");

        let err = SAMPLE
            .validate(&json!({"path": "a", "count": 2.5}))
            .unwrap_err();
        assert_eq!(err.to_string(), "count: expected an integer");
    }

    #[test]
    fn test_integer_bounds() {
        let err = SAMPLE
            .validate(&json!({"path": "a", "count": 0}))
            .unwrap_err();
        assert_eq!(err.to_string(), "count: must be at least 1, got 0");

        let err = SAMPLE
            .validate(&json!({"path": "a", "count": 11}))
            .unwrap_err();
        assert_eq!(err.to_string(), "count: must be at most 10, got 11");

        let args = SAMPLE
            .validate(&json!({"path": "a", "count": 4.0}))
            .unwrap();
        assert_eq!(args.0.get("count"), Some(&json!(4)));
    }

    #[test]
    fn test_enum_membership() {
        let err = SAMPLE
            .validate(&json!({"path": "a", "mode": "warp"}))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "mode: expected one of fast, slow, got \"warp\""
        );
    }

    #[test]
    fn test_fail_fast_reports_first_field_in_declaration_order() {
        let err = SAMPLE
            .validate(&json!({"count": 99, "force": "no"}))
            .unwrap_err();
        assert_eq!(err, ValidationError::Missing { field: "path" });
    }

    #[test]
    fn test_into_typed() {
        #[derive(Deserialize)]
        struct Sample {
            path: String,
            count: u32,
            force: bool,
            tags: Option<Vec<String>>,
        }

        let sample: Sample = SAMPLE
            .validate(&json!({"path": "p", "tags": ["a"]}))
            .unwrap()
            .into_typed()
            .unwrap();
        assert_eq!(sample.path, "p");
        assert_eq!(sample.count, 3);
        assert!(!sample.force);
        assert_eq!(sample.tags, Some(vec!["a".to_string()]));
    }

    #[test]
    fn test_json_schema_rendering() {
        let schema = SAMPLE.json_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], json!(["path"]));
        assert_eq!(schema["properties"]["count"]["type"], "integer");
        assert_eq!(schema["properties"]["count"]["minimum"], 1);
        assert_eq!(schema["properties"]["count"]["maximum"], 10);
        assert_eq!(schema["properties"]["count"]["default"], 3);
        assert_eq!(schema["properties"]["tags"]["items"]["type"], "string");
        assert_eq!(schema["properties"]["mode"]["enum"], json!(["fast", "slow"]));
        assert_eq!(schema["properties"]["path"]["description"], "Target path");
    }
}
