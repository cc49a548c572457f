//! Error code definitions

/// Syntax/parsing errors (E0xxx)
pub mod syntax {
    pub const PARSE_ERROR: &str = "E0001";
}

/// Binder errors (E05xx)
pub mod binding {
    pub const EXPORT_NOT_FOUND: &str = "E0501";
    pub const EXPORT_OPEN_ALIAS: &str = "E0502";
    pub const REDEFINITION: &str = "E0503";
    pub const SHADOWING: &str = "E0504";
}

/// Name and module resolution errors (E06xx)
pub mod resolution {
    pub const IMPORT_MISSING: &str = "E0601";
    pub const EXPOSING_NOT_FOUND: &str = "E0602";
    pub const IMPORT_OPEN_ALIAS: &str = "E0603";
    pub const AMBIGUOUS_VAR: &str = "E0604";
    pub const AMBIGUOUS_TYPE: &str = "E0605";
    pub const AMBIGUOUS_CONSTRUCTOR: &str = "E0606";
    pub const MISSING_TYPE: &str = "E0607";
    pub const PORT_IN_NON_PORT_MODULE: &str = "E0608";
    pub const AMBIGUOUS_MODULE: &str = "E0609";
}

/// Type errors (E1xxx)
pub mod types {
    pub const TYPE_MISMATCH: &str = "E1001";
    pub const MISSING_VALUE: &str = "E1002";
    pub const ARGUMENT_COUNT: &str = "E1003";
    pub const PARAMETER_COUNT: &str = "E1004";
    pub const RECORD_FIELD: &str = "E1005";
    pub const RECORD_ACCESS: &str = "E1006";
    pub const RECURSIVE_DECLARATION: &str = "E1007";
    pub const RECURSIVE_LET: &str = "E1008";
    pub const RECURSIVE_ALIAS: &str = "E1009";
    pub const TYPE_ARGUMENT_COUNT: &str = "E1010";
    pub const NON_ASSOCIATIVE_OPERATOR: &str = "E1011";
    pub const INFINITE_TYPE: &str = "E1012";
    pub const INVALID_PATTERN: &str = "E1013";
}

/// Pattern-match errors (E11xx)
pub mod patterns {
    pub const INCOMPLETE_CASE: &str = "E1101";
    pub const INCOMPLETE_PATTERN: &str = "E1102";
    pub const REDUNDANT_PATTERN: &str = "E1103";
}

/// Advisory diagnostics (H0xxx)
pub mod suggestions {
    pub const MISSING_TYPE_ANNOTATION: &str = "H0001";
}
