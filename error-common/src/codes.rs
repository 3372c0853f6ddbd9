// Error codes implementation
// Stable, client-facing identifiers for every error the auth core returns

pub mod validation {
    pub const INVALID_INPUT: &str = "VALIDATION_1001";
}

pub mod authentication {
    pub const INVALID_CREDENTIALS: &str = "AUTH_2001";
    pub const INVALID_TOKEN: &str = "AUTH_2002";
    pub const INVALID_CODE: &str = "AUTH_2003";
}

pub mod authorization {
    pub const INSUFFICIENT_PERMISSIONS: &str = "AUTHZ_3002";
}

pub mod rate_limit {
    pub const TOO_MANY_REQUESTS: &str = "RATE_5001";
}

pub mod system {
    pub const STORE_UNAVAILABLE: &str = "SYS_6001";
    pub const CONFIGURATION: &str = "SYS_6002";
    pub const INTERNAL: &str = "SYS_6003";
}
