use std::convert::Infallible;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use lexchat_persist::Principal;

/// Set by the identity proxy in front of the service
pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_EMAIL_HEADER: &str = "x-user-email";

/// Principal of the request, `None` for anonymous callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestPrincipal(pub Option<Principal>);

impl RequestPrincipal {
    pub fn into_inner(self) -> Option<Principal> {
        self.0
    }
}

fn header_value(parts: &Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestPrincipal
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let principal = header_value(parts, USER_ID_HEADER).map(|user_id| {
            let principal = Principal::new(user_id);
            match header_value(parts, USER_EMAIL_HEADER) {
                Some(email) => principal.with_email(email),
                None => principal,
            }
        });

        Ok(RequestPrincipal(principal))
    }
}
