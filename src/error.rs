use std::error::Error as ErrorTrait;

use rocket::{
  http::Status,
  request::Request,
  response::{self, Responder},
  serde::json::{json, Json},
  warn,
};

use crate::models::IdentityError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error(transparent)]
  IOError(#[from] std::io::Error),
  #[error("Invalid {field}: {message}")]
  Validation { field: String, message: String },
  #[error(transparent)]
  ValidationError(#[from] validator::ValidationErrors),
  #[error(transparent)]
  Config(#[from] rocket::figment::Error),
  #[error(transparent)]
  Template(#[from] tera::Error),
  #[error(transparent)]
  JsonSerde(#[from] serde_json::Error),
  #[error(transparent)]
  Identity(#[from] IdentityError),
  #[error(transparent)]
  UreqError(#[from] ureq::Error),
  #[error("Not found")]
  NotFound,
}

impl Error {
  pub fn validation(field: &str, message: &str) -> Error {
    Error::Validation {
      field: field.to_string(),
      message: message.to_string(),
    }
  }
}

impl<'r> Responder<'r, 'static> for Error {
  fn respond_to(self, request: &'r Request<'_>) -> response::Result<'static> {
    let response = match self {
      Error::ValidationError(_) | Error::Validation { .. } => (
        Status::UnprocessableEntity,
        Json(json![{"error": self.to_string()}]),
      ),
      Error::Identity(ref e) => (
        Status::UnprocessableEntity,
        Json(json![{"error": e.user_message()}]),
      ),
      Error::NotFound => (Status::NotFound, Json(json![{ "error": "Não encontrado" }])),
      _ => {
        warn!(
          "A wild error appeared: {:?}\n\n{:?}\n",
          &self,
          &self.source()
        );
        (
          Status::InternalServerError,
          Json(json![{ "error": "Unexpected Error" }]),
        )
      }
    };

    response.respond_to(request)
  }
}

pub type Result<T> = std::result::Result<T, Error>;
