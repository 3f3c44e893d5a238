/// Configuration for a [`System`](crate::System).
#[derive(Clone, Debug)]
pub struct SystemConf {
    /// Run the verifier on every instance right after it is built.
    pub verify_instances: bool,
    /// Query git for the repository and commit of the working directory when
    /// module metadata specifies neither.
    pub auto_provenance: bool,
    /// Emit a symbol-metadata operation for every module op created.
    pub emit_metadata: bool,
    /// Output file of external module declarations.
    pub external_output_file: String,
}

impl Default for SystemConf {
    fn default() -> Self {
        Self {
            verify_instances: true,
            auto_provenance: false,
            emit_metadata: true,
            external_output_file: "external_modules.sv".to_string(),
        }
    }
}
