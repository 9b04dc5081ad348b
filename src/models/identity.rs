use chrono::TimeZone;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::UtcDateTime;
use crate::error::{Error, Result};

/// A signed-in user as reported by the identity provider's lookup endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
  pub uid: String,
  pub email: String,
  pub display_name: Option<String>,
  pub photo_url: Option<String>,
  pub created_at: Option<UtcDateTime>,
  pub providers: Vec<String>,
}

impl Profile {
  pub fn display_label(&self) -> &str {
    self.display_name.as_deref().unwrap_or("Usuário")
  }

  pub fn is_google(&self) -> bool {
    self.providers.iter().any(|p| p == "google.com")
  }
}

/// A rejection from the identity provider. Always retryable: the code is
/// translated to a fixed user-facing message and surfaced inline.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("identity provider rejected the request: {code}")]
pub struct IdentityError {
  pub code: String,
}

impl IdentityError {
  // Some provider codes arrive with a trailing explanation, e.g.
  // "WEAK_PASSWORD : Password should be at least 6 characters".
  pub fn from_message(message: &str) -> Self {
    let code = message.split(" :").next().unwrap_or(message).trim().to_string();
    IdentityError { code }
  }

  pub fn user_message(&self) -> &'static str {
    match self.code.as_str() {
      "EMAIL_NOT_FOUND" => "Usuário não encontrado.",
      "INVALID_PASSWORD" => "Senha incorreta.",
      "USER_DISABLED" => "Esta conta foi desativada.",
      "EMAIL_EXISTS" => "Este email já está em uso.",
      "WEAK_PASSWORD" => "A nova senha deve ter pelo menos 6 caracteres.",
      "CREDENTIAL_TOO_OLD_LOGIN_AGAIN" | "TOKEN_EXPIRED" | "INVALID_ID_TOKEN" => {
        "Para alterar email ou senha, faça login novamente."
      }
      _ => "Erro ao processar sua solicitação. Tente novamente.",
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedIn {
  pub id_token: String,
  pub local_id: String,
  pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityClient {
  pub base_url: String,
  pub api_key: String,
}

impl IdentityClient {
  pub fn new(base_url: &str, api_key: &str) -> Self {
    Self {
      base_url: base_url.trim_end_matches('/').to_string(),
      api_key: api_key.to_string(),
    }
  }

  fn call(&self, action: &str, body: Value) -> Result<Value> {
    let url = format!("{}/v1/accounts:{}?key={}", self.base_url, action, self.api_key);
    match ureq::post(&url).send_json(body) {
      Ok(response) => Ok(response.into_json()?),
      Err(ureq::Error::Status(_, response)) => {
        let body: Value = response.into_json().unwrap_or(Value::Null);
        let message = body["error"]["message"].as_str().unwrap_or("UNKNOWN");
        Err(Error::Identity(IdentityError::from_message(message)))
      }
      Err(e) => Err(e.into()),
    }
  }

  pub fn sign_in_with_password(&self, email: &str, password: &str) -> Result<SignedIn> {
    let response = self.call(
      "signInWithPassword",
      json!({ "email": email, "password": password, "returnSecureToken": true }),
    )?;
    Ok(serde_json::from_value(response)?)
  }

  pub fn sign_up(&self, email: &str, password: &str) -> Result<SignedIn> {
    let response = self.call(
      "signUp",
      json!({ "email": email, "password": password, "returnSecureToken": true }),
    )?;
    Ok(serde_json::from_value(response)?)
  }

  pub fn sign_in_with_idp(&self, provider_id: &str, access_token: &str) -> Result<SignedIn> {
    let response = self.call(
      "signInWithIdp",
      json!({
        "postBody": format!("access_token={}&providerId={}", access_token, provider_id),
        "requestUri": "http://localhost",
        "returnSecureToken": true,
      }),
    )?;
    Ok(serde_json::from_value(response)?)
  }

  pub fn lookup(&self, id_token: &str) -> Result<Profile> {
    let response = self.call("lookup", json!({ "idToken": id_token }))?;
    let user = response["users"]
      .get(0)
      .ok_or_else(|| Error::Identity(IdentityError::from_message("USER_NOT_FOUND")))?;

    let created_at = user["createdAt"]
      .as_str()
      .and_then(|millis| millis.parse::<i64>().ok())
      .and_then(|millis| chrono::Utc.timestamp_millis_opt(millis).single());

    let providers = user["providerUserInfo"]
      .as_array()
      .map(|infos| {
        infos
          .iter()
          .filter_map(|info| info["providerId"].as_str().map(str::to_string))
          .collect()
      })
      .unwrap_or_default();

    Ok(Profile {
      uid: user["localId"].as_str().unwrap_or_default().to_string(),
      email: user["email"].as_str().unwrap_or_default().to_string(),
      display_name: user["displayName"].as_str().map(str::to_string),
      photo_url: user["photoUrl"].as_str().map(str::to_string),
      created_at,
      providers,
    })
  }

  pub fn update_profile(&self, id_token: &str, display_name: &str) -> Result<()> {
    self.call(
      "update",
      json!({ "idToken": id_token, "displayName": display_name, "returnSecureToken": true }),
    )?;
    Ok(())
  }

  pub fn update_email(&self, id_token: &str, email: &str) -> Result<()> {
    self.call(
      "update",
      json!({ "idToken": id_token, "email": email, "returnSecureToken": true }),
    )?;
    Ok(())
  }

  pub fn update_password(&self, id_token: &str, password: &str) -> Result<()> {
    self.call(
      "update",
      json!({ "idToken": id_token, "password": password, "returnSecureToken": true }),
    )?;
    Ok(())
  }

  pub fn reauthenticate(&self, email: &str, current_password: &str) -> Result<SignedIn> {
    self.sign_in_with_password(email, current_password)
  }

  pub fn delete_account(&self, id_token: &str) -> Result<()> {
    self.call("delete", json!({ "idToken": id_token }))?;
    Ok(())
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn provider_codes_lose_their_trailing_explanation() {
    let error =
      IdentityError::from_message("WEAK_PASSWORD : Password should be at least 6 characters");
    assert_eq!(error.code, "WEAK_PASSWORD");
    assert_eq!(
      error.user_message(),
      "A nova senha deve ter pelo menos 6 caracteres."
    );
  }

  #[test]
  fn provider_codes_map_to_localized_messages() {
    assert_eq!(
      IdentityError::from_message("INVALID_PASSWORD").user_message(),
      "Senha incorreta."
    );
    assert_eq!(
      IdentityError::from_message("EMAIL_EXISTS").user_message(),
      "Este email já está em uso."
    );
    assert_eq!(
      IdentityError::from_message("CREDENTIAL_TOO_OLD_LOGIN_AGAIN").user_message(),
      "Para alterar email ou senha, faça login novamente."
    );
    assert_eq!(
      IdentityError::from_message("SOMETHING_ELSE").user_message(),
      "Erro ao processar sua solicitação. Tente novamente."
    );
  }

  #[test]
  fn signs_in_against_a_mock_provider() {
    let _mock = mockito::mock(
      "POST",
      mockito::Matcher::Regex(".*signInWithPassword.*".to_string()),
    )
    .with_body(r#"{"idToken": "tok_1", "localId": "uid_1", "email": "ana@example.com"}"#)
    .create();

    let client = IdentityClient::new(&mockito::server_url(), "test_key");
    let signed_in = client
      .sign_in_with_password("ana@example.com", "secret1")
      .expect("sign in");
    assert_eq!(signed_in.id_token, "tok_1");
    assert_eq!(signed_in.local_id, "uid_1");
  }

  #[test]
  fn wrong_passwords_become_identity_errors() {
    let _mock = mockito::mock(
      "POST",
      mockito::Matcher::Regex(".*signUp.*".to_string()),
    )
    .with_status(400)
    .with_body(r#"{"error": {"code": 400, "message": "EMAIL_EXISTS", "errors": []}}"#)
    .create();

    let client = IdentityClient::new(&mockito::server_url(), "test_key");
    match client.sign_up("ana@example.com", "secret1") {
      Err(Error::Identity(e)) => assert_eq!(e.code, "EMAIL_EXISTS"),
      other => panic!("expected an identity error, got {:?}", other.map(|s| s.local_id)),
    }
  }
}
