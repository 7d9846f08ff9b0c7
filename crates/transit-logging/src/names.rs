//! Standard span names for consistency across crates

/// Span names for policy store operations
pub mod spans {
    pub const POLICY_CREATE_OR_GET: &str = "policy_create_or_get";
    pub const POLICY_READ: &str = "policy_read";
    pub const POLICY_DELETE: &str = "policy_delete";
    pub const POLICY_LIST: &str = "policy_list";
    pub const POLICY_ROTATE: &str = "policy_rotate";
}

