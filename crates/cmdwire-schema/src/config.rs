/// How a [`SchemaRegistry`](crate::SchemaRegistry) compiles and applies
/// params schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Close every object schema to properties it does not declare.
    pub strict_mode: bool,
    /// Reject commands that have no schema (`SchemaError::NoSchema`)
    /// instead of passing them through.
    pub fail_on_missing_schema: bool,
    /// Limit on `<command>.schema.json` files per directory.
    pub max_schemas_from_directory: usize,
    /// Limit on the size of one schema file, in bytes.
    pub max_schema_file_size: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            strict_mode: false,
            fail_on_missing_schema: false,
            max_schemas_from_directory: 512,
            max_schema_file_size: 256 * 1024,
        }
    }
}

impl RegistryConfig {
    /// Strict schemas, unknown commands still allowed.
    pub fn strict() -> Self {
        Self {
            strict_mode: true,
            ..Self::default()
        }
    }

    pub fn with_fail_on_missing_schema(mut self, fail: bool) -> Self {
        self.fail_on_missing_schema = fail;
        self
    }
}
