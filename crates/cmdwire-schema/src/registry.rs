use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use cmdwire_frame::CommandEnvelope;
use jsonschema::Validator;
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::RegistryConfig;
use crate::error::{Result, SchemaError};
use crate::validator::validate_params;

const SCHEMA_SUFFIX: &str = ".schema.json";

/// Command-keyed registry of compiled JSON Schema validators.
pub struct SchemaRegistry {
    validators: HashMap<String, Validator>,
    config: RegistryConfig,
}

impl SchemaRegistry {
    /// Create an empty registry with default config.
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create an empty registry with explicit config.
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            validators: HashMap::new(),
            config,
        }
    }

    /// Register a params schema for a command from a JSON string.
    pub fn register(&mut self, command: &str, schema_json: &str) -> Result<()> {
        let schema: Value = serde_json::from_str(schema_json)?;
        self.register_value(command, &schema)
    }

    /// Register a params schema for a command from a JSON value.
    pub fn register_value(&mut self, command: &str, schema: &Value) -> Result<()> {
        let mut schema_to_compile = schema.clone();
        if self.config.strict_mode {
            apply_strict_mode(&mut schema_to_compile);
        }

        let compiled = jsonschema::validator_for(&schema_to_compile)
            .map_err(|err| SchemaError::CompileFailed(format!("{command}: {err}")))?;

        self.validators.insert(command.to_string(), compiled);
        Ok(())
    }

    /// Load `<command>.schema.json` files from a directory.
    pub fn from_directory(path: &Path) -> Result<Self> {
        Self::from_directory_with_config(path, RegistryConfig::default())
    }

    /// Load schemas from a directory with explicit config.
    ///
    /// Files load in name order. A symlinked schema, a file name that is
    /// not a command name, or exceeding either directory limit fails the
    /// whole load.
    pub fn from_directory_with_config(path: &Path, config: RegistryConfig) -> Result<Self> {
        let mut registry = Self::with_config(config);
        let schema_files = list_schema_files(path)?;

        if schema_files.len() > config.max_schemas_from_directory {
            return Err(SchemaError::LoadFailed(format!(
                "{} schemas in {}, max is {}",
                schema_files.len(),
                path.display(),
                config.max_schemas_from_directory
            )));
        }

        for (command, file) in schema_files {
            let content = read_schema_file(&file, config.max_schema_file_size)?;
            registry.register(&command, &content)?;
            debug!(command, "loaded params schema");
        }

        Ok(registry)
    }

    /// Load from embedded `(command, schema)` pairs.
    pub fn from_embedded(schemas: &[(&str, &str)]) -> Result<Self> {
        let mut registry = Self::new();
        for (command, schema) in schemas {
            registry.register(command, schema)?;
        }
        Ok(registry)
    }

    /// Validate params for a command against its schema.
    pub fn validate(&self, command: &str, params: &Value) -> Result<()> {
        match self.validators.get(command) {
            Some(validator) => validate_params(command, params, validator),
            None if self.config.fail_on_missing_schema => {
                Err(SchemaError::NoSchema(command.to_string()))
            }
            None => Ok(()),
        }
    }

    /// Validate an outgoing envelope.
    pub fn validate_envelope(&self, envelope: &CommandEnvelope) -> Result<()> {
        if !self.has_schema(&envelope.name) && !self.config.fail_on_missing_schema {
            return Ok(());
        }
        self.validate(&envelope.name, &Value::Object(envelope.params.clone()))
    }

    /// Check if a command has a registered schema.
    pub fn has_schema(&self, command: &str) -> bool {
        self.validators.contains_key(command)
    }

    /// Commands that have registered schemas, sorted.
    pub fn commands(&self) -> Vec<&str> {
        let mut commands: Vec<&str> = self.validators.keys().map(String::as_str).collect();
        commands.sort_unstable();
        commands
    }

    /// Get registry configuration.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaRegistry")
            .field("commands", &self.commands())
            .field("config", &self.config)
            .finish()
    }
}

fn is_valid_command_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

/// `(command, path)` for every `<command>.schema.json` regular file.
fn list_schema_files(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let load_failed = |err: std::io::Error| SchemaError::LoadFailed(format!("{}: {err}", dir.display()));
    let mut files = Vec::new();

    for entry in fs::read_dir(dir).map_err(load_failed)? {
        let entry = entry.map_err(load_failed)?;
        let file_name = entry.file_name().to_string_lossy().into_owned();
        let Some(command) = file_name.strip_suffix(SCHEMA_SUFFIX) else {
            continue;
        };

        let file_type = entry.file_type().map_err(load_failed)?;
        if file_type.is_symlink() {
            return Err(SchemaError::LoadFailed(format!(
                "refusing to load schema symlink: {file_name}"
            )));
        }
        if !file_type.is_file() {
            continue;
        }
        if !is_valid_command_name(command) {
            return Err(SchemaError::LoadFailed(format!(
                "schema filename is not a command name: {file_name}"
            )));
        }
        files.push((command.to_string(), entry.path()));
    }

    files.sort();
    Ok(files)
}

fn read_schema_file(path: &Path, max_bytes: usize) -> Result<String> {
    let load_failed =
        |err: std::io::Error| SchemaError::LoadFailed(format!("{}: {err}", path.display()));

    let file = File::open(path).map_err(load_failed)?;
    let mut content = String::new();
    file.take(max_bytes as u64 + 1)
        .read_to_string(&mut content)
        .map_err(load_failed)?;

    if content.len() > max_bytes {
        return Err(SchemaError::LoadFailed(format!(
            "schema file over {max_bytes} bytes: {}",
            path.display()
        )));
    }
    Ok(content)
}

/// Keywords whose value is a map of subschemas.
const MAP_KEYWORDS: [&str; 5] = [
    "properties",
    "patternProperties",
    "dependentSchemas",
    "$defs",
    "definitions",
];

/// Keywords whose value is a single subschema.
const SINGLE_KEYWORDS: [&str; 11] = [
    "propertyNames",
    "additionalProperties",
    "unevaluatedProperties",
    "items",
    "contains",
    "additionalItems",
    "unevaluatedItems",
    "not",
    "if",
    "then",
    "else",
];

/// Keywords whose value is an array of subschemas.
const ARRAY_KEYWORDS: [&str; 4] = ["prefixItems", "allOf", "anyOf", "oneOf"];

/// Keywords that only make sense on object schemas.
const OBJECT_KEYWORDS: [&str; 8] = [
    "properties",
    "patternProperties",
    "additionalProperties",
    "unevaluatedProperties",
    "required",
    "dependentRequired",
    "dependentSchemas",
    "propertyNames",
];

/// Close every object schema to undeclared properties.
fn apply_strict_mode(value: &mut Value) {
    match value {
        Value::Object(map) => {
            if is_object_schema(map) && !map.contains_key("additionalProperties") {
                map.insert("additionalProperties".to_string(), Value::Bool(false));
            }
            for key in MAP_KEYWORDS {
                if let Some(Value::Object(children)) = map.get_mut(key) {
                    children.values_mut().for_each(apply_strict_mode);
                }
            }
            for key in SINGLE_KEYWORDS {
                if let Some(child) = map.get_mut(key) {
                    apply_strict_mode(child);
                }
            }
            for key in ARRAY_KEYWORDS {
                if let Some(Value::Array(children)) = map.get_mut(key) {
                    children.iter_mut().for_each(apply_strict_mode);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(apply_strict_mode),
        _ => {}
    }
}

fn is_object_schema(map: &Map<String, Value>) -> bool {
    match map.get("type") {
        Some(Value::String(kind)) => kind == "object",
        Some(Value::Array(kinds)) => kinds
            .iter()
            .any(|kind| matches!(kind, Value::String(k) if k == "object")),
        _ => OBJECT_KEYWORDS.iter().any(|keyword| map.contains_key(*keyword)),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use serde_json::json;

    use super::*;

    const SPAWN_SCHEMA: &str = r#"{
        "type": "object",
        "properties": {
            "prefab": { "type": "string" },
            "position": {
                "type": "array",
                "items": { "type": "number" },
                "minItems": 3,
                "maxItems": 3
            }
        },
        "required": ["prefab"]
    }"#;

    #[test]
    fn register_and_validate() {
        let mut registry = SchemaRegistry::new();
        registry.register("spawn", SPAWN_SCHEMA).unwrap();

        assert!(registry
            .validate("spawn", &json!({"prefab": "Cube", "position": [0, 1, 2]}))
            .is_ok());
        assert!(matches!(
            registry.validate("spawn", &json!({"position": [0, 1, 2]})),
            Err(SchemaError::ValidationFailed { command, .. }) if command == "spawn"
        ));
    }

    #[test]
    fn failure_message_lists_violations() {
        let mut registry = SchemaRegistry::new();
        registry.register("spawn", SPAWN_SCHEMA).unwrap();

        let err = registry
            .validate("spawn", &json!({"prefab": 7, "position": [1]}))
            .unwrap_err();
        let SchemaError::ValidationFailed { message, .. } = err else {
            panic!("expected validation failure");
        };
        assert!(message.contains("; "), "message was {message}");
    }

    #[test]
    fn missing_schema_permissive_passes() {
        let registry = SchemaRegistry::new();
        assert!(registry.validate("anything", &json!({"any": "thing"})).is_ok());
    }

    #[test]
    fn missing_schema_strict_fails() {
        let registry =
            SchemaRegistry::with_config(RegistryConfig::default().with_fail_on_missing_schema(true));

        assert!(matches!(
            registry.validate("unknown", &json!({})),
            Err(SchemaError::NoSchema(name)) if name == "unknown"
        ));
    }

    #[test]
    fn strict_mode_rejects_additional_properties() {
        let mut permissive = SchemaRegistry::new();
        permissive.register("spawn", SPAWN_SCHEMA).unwrap();

        let mut strict = SchemaRegistry::with_config(RegistryConfig::strict());
        strict.register("spawn", SPAWN_SCHEMA).unwrap();

        let params = json!({"prefab": "Cube", "colour": "red"});
        assert!(permissive.validate("spawn", &params).is_ok());
        assert!(matches!(
            strict.validate("spawn", &params),
            Err(SchemaError::ValidationFailed { .. })
        ));
    }

    #[test]
    fn strict_mode_applies_nested_objects() {
        let schema = r#"{
            "type": "object",
            "properties": {
                "transform": {
                    "properties": { "x": { "type": "number" } }
                }
            }
        }"#;
        let mut strict = SchemaRegistry::with_config(RegistryConfig::strict());
        strict.register("move", schema).unwrap();

        assert!(strict.validate("move", &json!({"transform": {"x": 1}})).is_ok());
        assert!(strict
            .validate("move", &json!({"transform": {"x": 1, "y": 2}}))
            .is_err());
    }

    #[test]
    fn invalid_schema_fails_compile() {
        let mut registry = SchemaRegistry::new();
        assert!(matches!(
            registry.register("bad", r#"{"type":"definitely-not-a-type"}"#),
            Err(SchemaError::CompileFailed(_))
        ));
        assert!(matches!(
            registry.register("bad", "not json"),
            Err(SchemaError::InvalidJson(_))
        ));
    }

    #[test]
    fn validate_envelope_uses_command_name() {
        let registry = SchemaRegistry::from_embedded(&[("spawn", SPAWN_SCHEMA)]).unwrap();

        let ok = CommandEnvelope::from_value("spawn", json!({"prefab": "Cube"})).unwrap();
        let bad = CommandEnvelope::from_value("spawn", json!({})).unwrap();
        let other = CommandEnvelope::from_value("ping", json!({})).unwrap();

        assert!(registry.validate_envelope(&ok).is_ok());
        assert!(registry.validate_envelope(&bad).is_err());
        assert!(registry.validate_envelope(&other).is_ok());
    }

    #[test]
    fn from_directory_loads_by_file_stem() {
        let dir = make_temp_schema_dir("from-directory");
        write_schema(&dir, "spawn.schema.json", SPAWN_SCHEMA);
        write_schema(&dir, "get_scene.schema.json", r#"{"type":"object"}"#);
        write_schema(&dir, "notes.json", SPAWN_SCHEMA);

        let registry = SchemaRegistry::from_directory(&dir).unwrap();
        assert_eq!(registry.commands(), vec!["get_scene", "spawn"]);
        assert!(registry.validate("spawn", &json!({"prefab": "A"})).is_ok());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn from_directory_rejects_bad_command_names() {
        let dir = make_temp_schema_dir("bad-name");
        write_schema(&dir, "two words.schema.json", SPAWN_SCHEMA);

        let result = SchemaRegistry::from_directory(&dir);
        assert!(matches!(result, Err(SchemaError::LoadFailed(_))));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_schema_is_rejected() {
        let dir = make_temp_schema_dir("symlink-schema");
        let target = dir.join("target.json");
        std::fs::write(&target, SPAWN_SCHEMA.as_bytes()).unwrap();
        std::os::unix::fs::symlink(&target, dir.join("spawn.schema.json")).unwrap();

        let result = SchemaRegistry::from_directory(&dir);
        assert!(matches!(result, Err(SchemaError::LoadFailed(_))));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn schema_count_limit_is_enforced() {
        let dir = make_temp_schema_dir("count-limit");
        write_schema(&dir, "a.schema.json", SPAWN_SCHEMA);
        write_schema(&dir, "b.schema.json", SPAWN_SCHEMA);

        let config = RegistryConfig {
            max_schemas_from_directory: 1,
            ..RegistryConfig::default()
        };
        let result = SchemaRegistry::from_directory_with_config(&dir, config);
        assert!(matches!(result, Err(SchemaError::LoadFailed(_))));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn schema_file_size_limit_is_enforced() {
        let dir = make_temp_schema_dir("size-limit");
        write_schema(&dir, "spawn.schema.json", SPAWN_SCHEMA);

        let config = RegistryConfig {
            max_schema_file_size: 8,
            ..RegistryConfig::default()
        };
        let result = SchemaRegistry::from_directory_with_config(&dir, config);
        assert!(matches!(result, Err(SchemaError::LoadFailed(_))));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn command_name_rules() {
        assert!(is_valid_command_name("get_scene"));
        assert!(is_valid_command_name("ui.set-text"));
        assert!(!is_valid_command_name(""));
        assert!(!is_valid_command_name("a/b"));
    }

    fn make_temp_schema_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "cmdwire-schema-{tag}-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_schema(dir: &Path, file_name: &str, contents: &str) {
        std::fs::write(dir.join(file_name), contents.as_bytes()).unwrap();
    }
}
