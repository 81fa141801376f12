//! Route guarding for HTTP glue.
//!
//! The guard pulls a token out of an `Authorization: Bearer` header or a
//! `token=` query parameter, resolves it, and hands the handler a typed
//! [`Principal`]. Handlers never run for unauthenticated requests.
//!
//! Rejections are deliberately coarse: every token failure maps to the same
//! "token invalid" message so a client cannot learn which verification stage
//! refused it.

use std::fmt;

use crate::claims::ClaimSet;
use crate::credentials::CredentialStore;
use crate::error::AuthError;
use crate::service::AuthService;

/// Name of the query parameter that may carry a token.
pub const TOKEN_QUERY_PARAM: &str = "token";

const BEARER_SCHEME: &str = "Bearer";

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq)]
pub struct Principal {
    claims: ClaimSet,
}

impl Principal {
    /// The authenticated identity.
    #[must_use]
    pub fn subject(&self) -> &str {
        self.claims.subject()
    }

    /// All verified claims.
    #[must_use]
    pub fn claims(&self) -> &ClaimSet {
        &self.claims
    }
}

/// Why a request was refused, in client-safe terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// No token was presented.
    MissingToken,
    /// A token was presented and refused.
    InvalidToken,
    /// Username or password refused at login.
    InvalidCredentials,
    /// The server could not issue a token.
    Internal,
}

impl Rejection {
    /// HTTP status code for this rejection.
    #[must_use]
    pub const fn status(self) -> u16 {
        match self {
            Self::MissingToken | Self::InvalidToken | Self::InvalidCredentials => 401,
            Self::Internal => 500,
        }
    }

    /// Message safe to show to the client.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::MissingToken => "token missing",
            Self::InvalidToken => "token invalid",
            Self::InvalidCredentials => "credentials invalid",
            Self::Internal => "internal error",
        }
    }
}

impl From<&AuthError> for Rejection {
    fn from(err: &AuthError) -> Self {
        if err.is_token_error() {
            Self::InvalidToken
        } else if err.is_credential_error() {
            Self::InvalidCredentials
        } else {
            Self::Internal
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for Rejection {}

/// Extracts the token from an `Authorization` header value.
///
/// The scheme is matched case-insensitively.
///
/// # Examples
///
/// ```
/// use compact_auth::bearer_token;
///
/// assert_eq!(bearer_token("Bearer abc.def.ghi"), Some("abc.def.ghi"));
/// assert_eq!(bearer_token("bearer abc.def.ghi"), Some("abc.def.ghi"));
/// assert_eq!(bearer_token("Basic YWxpY2U6cHc="), None);
/// ```
#[must_use]
pub fn bearer_token(authorization: &str) -> Option<&str> {
    let (scheme, token) = authorization.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case(BEARER_SCHEME) {
        return None;
    }
    let token = token.trim_start_matches(' ');
    (!token.is_empty()).then_some(token)
}

/// Extracts the `token` parameter from a raw query string.
///
/// Returns `None` if the parameter is absent, empty, or given more than
/// once. Values are taken verbatim with no percent-decoding; a token never
/// contains characters that need escaping, so an escaped value is refused
/// when resolved.
///
/// # Examples
///
/// ```
/// use compact_auth::query_token;
///
/// assert_eq!(query_token("page=2&token=abc.def.ghi"), Some("abc.def.ghi"));
/// assert_eq!(query_token("page=2"), None);
/// assert_eq!(query_token("token=abc.def.ghi&token=jkl.mno.pqr"), None);
/// ```
#[must_use]
pub fn query_token(query: &str) -> Option<&str> {
    match QueryToken::find(query) {
        QueryToken::One(token) => Some(token),
        QueryToken::Absent | QueryToken::Ambiguous => None,
    }
}

enum QueryToken<'a> {
    Absent,
    One(&'a str),
    Ambiguous,
}

impl<'a> QueryToken<'a> {
    fn find(query: &'a str) -> Self {
        let mut values = query
            .trim_start_matches('?')
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .filter(|(key, _)| *key == TOKEN_QUERY_PARAM)
            .map(|(_, value)| value);

        match (values.next(), values.next()) {
            (None, _) => Self::Absent,
            (Some(token), None) if !token.is_empty() => Self::One(token),
            _ => Self::Ambiguous,
        }
    }
}

/// Middleware that authenticates requests before handlers run.
///
/// # Example
///
/// ```
/// use compact_auth::{AuthConfig, AuthService, Guard, Rejection};
///
/// let guard = Guard::new(AuthService::generate(AuthConfig::default()));
/// let token = guard.service().issue_default("alice").unwrap();
/// let header = format!("Bearer {token}");
///
/// let greeting = guard
///     .protect(Some(&header), None, |principal| format!("hello {}", principal.subject()))
///     .unwrap();
/// assert_eq!(greeting, "hello alice");
///
/// let refused = guard.protect(None, None, |principal| principal.subject().len());
/// assert_eq!(refused, Err(Rejection::MissingToken));
/// ```
#[derive(Debug, Clone)]
pub struct Guard {
    service: AuthService,
}

impl Guard {
    /// Creates a guard backed by `service`.
    #[must_use]
    pub fn new(service: AuthService) -> Self {
        Self { service }
    }

    /// Returns the backing service.
    #[must_use]
    pub fn service(&self) -> &AuthService {
        &self.service
    }

    /// Authenticates a request from its `Authorization` header and query
    /// string. The header wins when both carry a token.
    ///
    /// # Errors
    ///
    /// - `MissingToken` if neither location carries a token
    /// - `InvalidToken` if the token is refused for any reason, including a
    ///   query string with an empty or repeated `token` parameter
    pub fn authorize(
        &self,
        authorization: Option<&str>,
        query: Option<&str>,
    ) -> Result<Principal, Rejection> {
        let token = match authorization {
            Some(header) => bearer_token(header).ok_or(Rejection::InvalidToken)?,
            None => match query.map_or(QueryToken::Absent, QueryToken::find) {
                QueryToken::One(token) => token,
                QueryToken::Absent => return Err(Rejection::MissingToken),
                QueryToken::Ambiguous => return Err(Rejection::InvalidToken),
            },
        };

        self.service
            .resolve_claims(token)
            .map(|claims| Principal { claims })
            .map_err(|e| Rejection::from(&e))
    }

    /// Runs `handler` only if the request authenticates.
    ///
    /// # Errors
    ///
    /// See [`Guard::authorize`].
    pub fn protect<F, R>(
        &self,
        authorization: Option<&str>,
        query: Option<&str>,
        handler: F,
    ) -> Result<R, Rejection>
    where
        F: FnOnce(&Principal) -> R,
    {
        let principal = self.authorize(authorization, query)?;
        Ok(handler(&principal))
    }

    /// Handles a login: checks credentials and returns a fresh token.
    ///
    /// # Errors
    ///
    /// - `InvalidCredentials` if the store refuses the pair
    /// - `Internal` if the token cannot be issued
    pub fn login<S: CredentialStore + ?Sized>(
        &self,
        store: &S,
        username: &str,
        password: &str,
    ) -> Result<String, Rejection> {
        self.service
            .issue_token_for_user(store, username, password)
            .map_err(|e| Rejection::from(&e))
    }
}
