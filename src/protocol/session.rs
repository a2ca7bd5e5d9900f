use rand::Rng;

const SESSION_SUFFIX_LEN: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    Quote,
    Chart,
}

impl SessionKind {
    pub fn prefix(self) -> &'static str {
        match self {
            SessionKind::Quote => "qs_",
            SessionKind::Chart => "cs_",
        }
    }
}

/// Generate `qs_`/`cs_` followed by twelve lowercase letters drawn from `rng`.
pub fn new_session_id<R: Rng>(kind: SessionKind, rng: &mut R) -> String {
    let mut id = String::with_capacity(kind.prefix().len() + SESSION_SUFFIX_LEN);
    id.push_str(kind.prefix());
    for _ in 0..SESSION_SUFFIX_LEN {
        id.push(char::from(rng.random_range(b'a'..=b'z')));
    }
    id
}

/// The pair of subscription contexts the feed requires for one client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIds {
    pub quote: String,
    pub chart: String,
}

impl SessionIds {
    pub fn generate<R: Rng>(rng: &mut R) -> Self {
        Self {
            quote: new_session_id(SessionKind::Quote, rng),
            chart: new_session_id(SessionKind::Chart, rng),
        }
    }
}

/// Token presented to the feed with `set_auth_token`.
#[derive(Clone, PartialEq, Eq)]
pub enum AuthToken {
    Token(String),
    Unauthenticated,
}

impl AuthToken {
    pub const UNAUTHENTICATED: &'static str = "unauthorized_user_token";

    pub fn as_str(&self) -> &str {
        match self {
            AuthToken::Token(token) => token,
            AuthToken::Unauthenticated => Self::UNAUTHENTICATED,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthToken::Token(_))
    }
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthToken::Token(_) => f.write_str("AuthToken::Token(<redacted>)"),
            AuthToken::Unauthenticated => f.write_str("AuthToken::Unauthenticated"),
        }
    }
}
