use chrono::{DateTime, Utc};

pub mod site;
pub use site::*;
pub mod plan;
pub use plan::*;
pub mod video;
pub use video::*;
pub mod identity;
pub use identity::*;
pub mod auth;
pub use auth::*;
pub mod checkout;
pub use checkout::*;

pub type UtcDateTime = DateTime<Utc>;

pub fn gen_passphrase() -> String {
  use chbs::{config::BasicConfig, prelude::*};
  let mut config = BasicConfig::default();
  config.separator = "+".into();
  config.capitalize_first = false.into();
  config.to_scheme().generate()
}
