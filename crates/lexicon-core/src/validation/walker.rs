//! Recursive walk of a value against a type definition

use super::checks;
use super::report::{ValidationReport, Violation};
use super::ValidationMode;
use crate::document::SchemaDocument;
use crate::resolver::{ResolutionContext, ResolutionError, Resolver};
use crate::source::SchemaSource;
use crate::types::{json_type_name, ObjectType, TypeDefinition};
use crate::union;
use serde_json::{Map, Value};

/// Path of the value itself when it is not an object
pub const ROOT_PATH: &str = "$";

pub(crate) fn field_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", parent, name)
    }
}

pub(crate) fn index_path(parent: &str, index: usize) -> String {
    format!("{}[{}]", parent, index)
}

pub(crate) struct Walker<'a, S> {
    resolver: &'a Resolver<S>,
    doc: &'a SchemaDocument,
    mode: ValidationMode,
    ctx: ResolutionContext,
    report: ValidationReport,
}

impl<'a, S: SchemaSource> Walker<'a, S> {
    pub(crate) fn new(resolver: &'a Resolver<S>, doc: &'a SchemaDocument, mode: ValidationMode) -> Self {
        Self {
            resolver,
            doc,
            mode,
            ctx: resolver.checkout_context(),
            report: ValidationReport::new(),
        }
    }

    /// Return the report and hand memoized resolutions back to the resolver
    pub(crate) fn finish(self) -> ValidationReport {
        self.resolver.checkin_context(self.ctx);
        self.report
    }

    pub(crate) fn push(&mut self, path: &str, violation: Violation) {
        let path = if path.is_empty() { ROOT_PATH } else { path };
        self.report.push(path, &violation);
    }

    fn push_all(&mut self, path: &str, violations: Vec<Violation>) {
        for violation in violations {
            self.push(path, violation);
        }
    }

    fn mismatch(&mut self, path: &str, expected: &'static str, value: &Value) {
        self.push(
            path,
            Violation::TypeMismatch {
                expected,
                actual: json_type_name(value),
            },
        );
    }

    /// Validate the properties of an object
    ///
    /// Unknown fields are only considered at the top level.
    pub(crate) fn walk_object(
        &mut self,
        obj: &Map<String, Value>,
        def: &ObjectType,
        path: &str,
        top_level: bool,
    ) -> Result<(), ResolutionError> {
        if self.mode.enforces_required() {
            for name in &def.required {
                if !obj.contains_key(name) {
                    self.push(
                        &field_path(path, name),
                        Violation::MissingRequiredField { field: name.clone() },
                    );
                }
            }
        }

        if top_level && !self.mode.allows_unknown_fields() {
            // `$type` and other `$`-prefixed keys are protocol metadata
            for key in obj.keys().filter(|k| !k.starts_with('$')) {
                if !def.properties.contains_key(key) {
                    self.push(
                        &field_path(path, key),
                        Violation::UnknownField { field: key.clone() },
                    );
                }
            }
        }

        for (name, prop) in &def.properties {
            match obj.get(name) {
                None => {}
                Some(Value::Null) if def.is_nullable(name) => {}
                Some(value) => self.walk(value, prop, &field_path(path, name))?,
            }
        }

        Ok(())
    }

    /// Validate `value` against `def`, recording violations under `path`
    ///
    /// Only reference resolution failures abort the walk.
    pub(crate) fn walk(
        &mut self,
        value: &Value,
        def: &TypeDefinition,
        path: &str,
    ) -> Result<(), ResolutionError> {
        let constraints = self.mode.enforces_constraints();
        let mut violations = Vec::new();

        match def {
            TypeDefinition::Null(_) => {
                if !value.is_null() {
                    self.mismatch(path, "null", value);
                }
            }
            TypeDefinition::Boolean(b) => match value.as_bool() {
                Some(v) if constraints => checks::check_boolean(v, &b.constraints, &mut violations),
                Some(_) => {}
                None => self.mismatch(path, "boolean", value),
            },
            TypeDefinition::Integer(i) => match value.as_i64() {
                Some(v) if constraints => checks::check_integer(v, &i.constraints, &mut violations),
                Some(_) => {}
                None if value.is_u64() => violations.push(Violation::IntegerOutOfRange {
                    value: value.to_string(),
                }),
                None => self.mismatch(path, "integer", value),
            },
            TypeDefinition::String(s) => match value.as_str() {
                Some(v) if constraints => checks::check_string(v, s, &mut violations),
                Some(_) => {}
                None => self.mismatch(path, "string", value),
            },
            TypeDefinition::Bytes(b) => match checks::decode_bytes(value) {
                Ok(bytes) if constraints => {
                    checks::check_bytes_length(bytes.len(), &b.constraints, &mut violations)
                }
                Ok(_) => {}
                Err(violation) => violations.push(violation),
            },
            TypeDefinition::CidLink(_) => {
                let checked = if constraints {
                    checks::check_cid_link(value)
                } else {
                    checks::cid_link_target(value).map(|_| ())
                };
                if let Err(violation) = checked {
                    violations.push(violation);
                }
            }
            TypeDefinition::Unknown(_) => {}
            TypeDefinition::Object(o) => match value.as_object() {
                Some(obj) => self.walk_object(obj, o, path, false)?,
                None => self.mismatch(path, "object", value),
            },
            TypeDefinition::Array(a) => match value.as_array() {
                Some(items) => {
                    if constraints {
                        checks::check_array_length(items.len(), &a.constraints, &mut violations);
                    }
                    for (index, item) in items.iter().enumerate() {
                        self.walk(item, &a.items, &index_path(path, index))?;
                    }
                }
                None => self.mismatch(path, "array", value),
            },
            TypeDefinition::Union(u) => {
                if value.is_null() {
                    self.mismatch(path, "object", value);
                } else if let Err(e) = union::resolve(value, u) {
                    violations.push(Violation::Union(e));
                }
            }
            TypeDefinition::Ref(r) => {
                let target = self
                    .resolver
                    .resolve_reference_in(&r.target, self.doc, &mut self.ctx)?;
                self.walk(value, &target, path)?;
            }
            TypeDefinition::Blob(b) => match checks::parse_blob(value) {
                Ok(blob) if constraints => checks::check_blob(&blob, &b.constraints, &mut violations),
                Ok(_) => {}
                Err(violation) => violations.push(violation),
            },
        }

        self.push_all(path, violations);
        Ok(())
    }
}
