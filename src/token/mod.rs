pub mod claims;
pub mod issuer;

pub use claims::{Claims, Identity};
pub use issuer::{
    TokenError, TokenIssuer, TokenKeys, TokenKind, TokenVerifier, ACCESS_TTL_SECONDS,
    REFRESH_TTL_SECONDS,
};
