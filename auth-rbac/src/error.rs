use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RbacError {
    #[error("Unknown role: {0}")]
    UnknownRole(String),

    #[error("Invalid permission string: {0}")]
    InvalidPermission(String),
}

pub type Result<T> = std::result::Result<T, RbacError>;
