pub use rocket::{serde::json::Json, State};
pub use serde::{Deserialize, Serialize};

pub use crate::error::*;
pub use crate::models::*;

pub type JsonResult<T> = Result<Json<T>>;

pub mod payments;
pub mod plans;
pub mod profiles;
pub mod sessions;
pub mod videos;

#[catch(404)]
pub fn not_found() -> rocket::serde::json::Value {
  rocket::serde::json::json![{ "error": "Página não encontrada" }]
}
