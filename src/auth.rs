use axum::http::HeaderMap;
use rusqlite::Connection;

use crate::db::queries;
use crate::errors::AppError;

/// Request-scoped identity for staff endpoints. Authorization decisions are
/// made against this, never against ambient state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    Admin,
    Barber(String),
}

/// Resolve a Bearer token to an actor: the configured admin token, or a
/// barber's API token. Token issuance lives elsewhere; this only compares.
pub fn authenticate(
    conn: &Connection,
    headers: &HeaderMap,
    admin_token: &str,
) -> Result<Actor, AppError> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let token = auth.strip_prefix("Bearer ").unwrap_or("");

    if token.is_empty() {
        return Err(AppError::Unauthorized);
    }
    if token == admin_token {
        return Ok(Actor::Admin);
    }
    if let Some(barber) = queries::get_barber_by_token(conn, token)? {
        return Ok(Actor::Barber(barber.id));
    }
    Err(AppError::Unauthorized)
}

/// Admins manage every barber's data; a barber only their own.
pub fn can_manage_barber(actor: &Actor, barber_id: &str) -> bool {
    match actor {
        Actor::Admin => true,
        Actor::Barber(own_id) => own_id == barber_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::Barber;

    fn headers(token: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(token) = token {
            headers.insert("authorization", format!("Bearer {token}").parse().unwrap());
        }
        headers
    }

    fn setup_db() -> Connection {
        let conn = db::init_db(":memory:").unwrap();
        queries::insert_barber(
            &conn,
            &Barber {
                id: "b1".to_string(),
                name: "Marco".to_string(),
                bio: None,
                specialty: None,
                photo_url: None,
                active: true,
            },
            Some("barber-token"),
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_admin_token() {
        let conn = setup_db();
        let actor = authenticate(&conn, &headers(Some("secret")), "secret").unwrap();
        assert_eq!(actor, Actor::Admin);
    }

    #[test]
    fn test_barber_token() {
        let conn = setup_db();
        let actor = authenticate(&conn, &headers(Some("barber-token")), "secret").unwrap();
        assert_eq!(actor, Actor::Barber("b1".to_string()));
    }

    #[test]
    fn test_missing_or_wrong_token() {
        let conn = setup_db();
        assert!(matches!(
            authenticate(&conn, &headers(None), "secret"),
            Err(AppError::Unauthorized)
        ));
        assert!(matches!(
            authenticate(&conn, &headers(Some("nope")), "secret"),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn test_can_manage_barber() {
        assert!(can_manage_barber(&Actor::Admin, "b1"));
        assert!(can_manage_barber(&Actor::Barber("b1".to_string()), "b1"));
        assert!(!can_manage_barber(&Actor::Barber("b2".to_string()), "b1"));
    }
}
