mod jwt;

// Re-export for use in extractors and token-issuing collaborators
pub use jwt::{create_access_token, decode_token, extract_token, TokenClaims};
