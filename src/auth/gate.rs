//! Per-request authorization decisions
//!
//! State-free checks composed by handlers after the middleware has validated
//! the bearer token. No superuser or bypass role exists; absence of a valid
//! token never reaches these functions.

use crate::api::RelationalStore;
use crate::auth::token::Claims;
use crate::core::errors::RegistrarError;
use crate::core::models::{Role, User};

/// Role check: allow iff the caller's validated role equals the required one
pub fn require_role(claims: &Claims, required: Role) -> Result<(), RegistrarError> {
    if claims.role == required {
        Ok(())
    } else {
        Err(RegistrarError::Forbidden("insufficient role".to_string()))
    }
}

/// Identity ownership check for resource-scoped writes
///
/// Resolves the caller from claims alone - never from a client-supplied
/// field - and requires that the claimed identity corresponds to an existing
/// user record of the required role. The stored record wins over the token
/// if the two disagree on role.
pub async fn resolve_actor(
    store: &dyn RelationalStore,
    claims: &Claims,
    required: Role,
) -> Result<User, RegistrarError> {
    require_role(claims, required)?;

    let user_id = claims.user_id()?;
    let user = store
        .get_user(user_id)
        .await?
        .ok_or(RegistrarError::Unauthorized)?;

    if user.role != required {
        return Err(RegistrarError::Unauthorized);
    }

    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::UserId;

    fn claims_for(role: Role) -> Claims {
        Claims {
            sub: UserId::generate().to_string(),
            name: "Test".to_string(),
            role,
            iss: "registrar".to_string(),
            aud: "registrar-clients".to_string(),
            iat: 0,
            exp: i64::MAX,
        }
    }

    #[test]
    fn test_matching_role_is_allowed() {
        assert!(require_role(&claims_for(Role::Instructor), Role::Instructor).is_ok());
        assert!(require_role(&claims_for(Role::Student), Role::Student).is_ok());
    }

    #[test]
    fn test_mismatched_role_is_denied() {
        let err = require_role(&claims_for(Role::Student), Role::Instructor).unwrap_err();
        match err {
            RegistrarError::Forbidden(reason) => assert_eq!(reason, "insufficient role"),
            other => panic!("expected Forbidden, got {:?}", other),
        }
    }
}
