use roster_auth::Principal;

/// Authenticated caller for a request, inserted by the auth middleware.
///
/// Present on every route under `/users`, `/teams` and `/auth`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal: Principal,
}

impl PrincipalContext {
    pub fn new(principal: Principal) -> Self {
        Self { principal }
    }

    pub fn subject_id(&self) -> &str {
        &self.principal.subject_id
    }

    pub fn user_uuid(&self) -> &str {
        &self.principal.user_uuid
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }
}
