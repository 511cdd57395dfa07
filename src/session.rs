/// Auth context for backend calls.
///
/// The bearer token is handed in by whoever owns the login flow;
/// nothing here stores or refreshes credentials. Passing the session
/// around explicitly is what keeps the client free of process-global
/// state.
#[derive(Debug, Clone)]
pub struct Session {
    token: String,
}

impl Session {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_header_value() {
        assert_eq!(Session::new("t0k3n").bearer(), "Bearer t0k3n");
    }
}
