use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};
use rocket::{
  http::Status,
  request::{FromRequest, Outcome, Request},
};
use serde::Serialize;
use tokio::sync::watch;

use super::{gen_passphrase, Profile, Site, UtcDateTime};

/// The process-wide authentication snapshot. Readers must treat every value
/// as possibly stale until the next notification.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AuthState {
  Authenticated { profile: Profile },
  Anonymous,
}

#[derive(Debug, Clone, Serialize)]
pub struct Session {
  pub token: String,
  #[serde(skip_serializing)]
  pub id_token: String,
  pub profile: Profile,
  #[serde(skip_serializing)]
  pub expires_on: UtcDateTime,
}

/// In-memory session tokens plus the current-user channel: the store is the
/// only writer, anyone may subscribe.
#[derive(Clone)]
pub struct SessionStore {
  tokens: Arc<Mutex<HashMap<String, Session>>>,
  current: Arc<watch::Sender<AuthState>>,
}

impl SessionStore {
  pub fn new() -> Self {
    let (current, _) = watch::channel(AuthState::Anonymous);
    Self {
      tokens: Arc::new(Mutex::new(HashMap::new())),
      current: Arc::new(current),
    }
  }

  pub fn sign_in(&self, profile: Profile, id_token: String) -> Session {
    let session = Session {
      token: gen_passphrase(),
      id_token,
      profile: profile.clone(),
      expires_on: Utc::now() + Duration::hours(72),
    };
    self
      .tokens
      .lock()
      .unwrap_or_else(|e| e.into_inner())
      .insert(session.token.clone(), session.clone());
    self.current.send_replace(AuthState::Authenticated { profile });
    session
  }

  pub fn find(&self, token: &str) -> Option<Session> {
    let mut tokens = self.tokens.lock().unwrap_or_else(|e| e.into_inner());
    match tokens.get(token) {
      Some(session) if session.expires_on > Utc::now() => Some(session.clone()),
      Some(_) => {
        tokens.remove(token);
        None
      }
      None => None,
    }
  }

  pub fn sign_out(&self, token: &str) {
    self
      .tokens
      .lock()
      .unwrap_or_else(|e| e.into_inner())
      .remove(token);
    self.current.send_replace(AuthState::Anonymous);
  }

  pub fn subscribe(&self) -> watch::Receiver<AuthState> {
    self.current.subscribe()
  }

  pub fn snapshot(&self) -> AuthState {
    self.current.borrow().clone()
  }
}

impl Default for SessionStore {
  fn default() -> Self {
    Self::new()
  }
}

fn session_from(req: &Request<'_>) -> Option<Session> {
  let site = req.rocket().state::<Site>()?;
  let token = req.query_value::<&str>("token").and_then(|r| r.ok())?;
  site.sessions.find(token)
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Session {
  type Error = ();

  async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
    match session_from(req) {
      Some(session) => Outcome::Success(session),
      None => Outcome::Error((Status::Unauthorized, ())),
    }
  }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthState {
  type Error = std::convert::Infallible;

  async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
    Outcome::Success(match session_from(req) {
      Some(session) => AuthState::Authenticated { profile: session.profile },
      None => AuthState::Anonymous,
    })
  }
}

#[cfg(test)]
mod test {
  use super::*;

  fn profile() -> Profile {
    Profile {
      uid: "uid_1".to_string(),
      email: "ana@example.com".to_string(),
      display_name: Some("Ana Silva".to_string()),
      photo_url: None,
      created_at: None,
      providers: vec!["password".to_string()],
    }
  }

  #[test]
  fn the_current_user_channel_observes_sign_in_and_out() {
    let store = SessionStore::new();
    let subscriber = store.subscribe();
    assert!(matches!(*subscriber.borrow(), AuthState::Anonymous));

    let session = store.sign_in(profile(), "tok_1".to_string());
    match &*subscriber.borrow() {
      AuthState::Authenticated { profile } => assert_eq!(profile.email, "ana@example.com"),
      AuthState::Anonymous => panic!("expected an authenticated snapshot"),
    }

    store.sign_out(&session.token);
    assert!(matches!(*subscriber.borrow(), AuthState::Anonymous));
    assert!(store.find(&session.token).is_none());
  }

  #[test]
  fn tokens_round_trip_until_signed_out() {
    let store = SessionStore::new();
    let session = store.sign_in(profile(), "tok_1".to_string());
    let found = store.find(&session.token).expect("session");
    assert_eq!(found.profile.uid, "uid_1");
    assert!(store.find("some+other+token").is_none());
  }

  #[test]
  fn profiles_know_their_linked_providers() {
    assert!(!profile().is_google());
    assert_eq!(profile().display_label(), "Ana Silva");
  }
}
