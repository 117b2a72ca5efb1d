use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CredentialsError {
    #[error("authorization scheme must be Basic")]
    UnsupportedScheme,
    #[error("credentials are not valid base64")]
    InvalidEncoding,
    #[error("credentials are not valid UTF-8")]
    InvalidUtf8,
    #[error("credentials must have the form username:password")]
    MissingSeparator,
}

/// Username and password from an `Authorization: Basic ...` header.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Parses the value of an `Authorization` header.
///
/// The scheme is matched case-insensitively; the password may contain colons.
pub fn parse_basic_authorization(header: &str) -> Result<BasicCredentials, CredentialsError> {
    let (scheme, encoded) = header
        .trim()
        .split_once(' ')
        .ok_or(CredentialsError::UnsupportedScheme)?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return Err(CredentialsError::UnsupportedScheme);
    }

    let decoded = STANDARD
        .decode(encoded.trim())
        .map_err(|_| CredentialsError::InvalidEncoding)?;
    let decoded = String::from_utf8(decoded).map_err(|_| CredentialsError::InvalidUtf8)?;
    let (username, password) = decoded
        .split_once(':')
        .ok_or(CredentialsError::MissingSeparator)?;

    Ok(BasicCredentials {
        username: username.to_string(),
        password: password.to_string(),
    })
}
