// ABOUTME: Identity of the caller behind the current request
// ABOUTME: Anonymous, or a user resolved from an authentication token

/// An authenticated caller, resolved from a valid bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserIdentity {
    pub user_id: i64,
    pub is_activated: bool,
}

/// Who is making the current request.
///
/// Every request carries exactly one of these once it has passed the
/// authentication stage; a missing credential yields `Anonymous`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CallerIdentity {
    #[default]
    Anonymous,
    User(UserIdentity),
}

impl CallerIdentity {
    pub fn is_anonymous(&self) -> bool {
        matches!(self, CallerIdentity::Anonymous)
    }

    pub fn user(&self) -> Option<&UserIdentity> {
        match self {
            CallerIdentity::Anonymous => None,
            CallerIdentity::User(user) => Some(user),
        }
    }
}

impl From<UserIdentity> for CallerIdentity {
    fn from(user: UserIdentity) -> Self {
        CallerIdentity::User(user)
    }
}
