#[macro_use]
extern crate rocket;

use rocket::{Build, Rocket};
use tera::Tera;

lazy_static::lazy_static! {
  pub static ref TEMPLATES: Tera = {
    let mut tera = Tera::default();
    tera.add_raw_templates([
      ("emails/welcome", include_str!("templates/emails/welcome.html.tera")),
      ("emails/receipt", include_str!("templates/emails/receipt.html.tera"))
    ]).expect("No static");
    tera
  };
}

pub mod models;
pub mod error;
pub mod controllers;
pub mod test_support;
pub use controllers::*;
pub use error::{Error, Result};

pub fn server(site: models::Site) -> Rocket<Build> {
  let cors = rocket_cors::CorsOptions::default()
    .to_cors()
    .expect("Could not build CORS options");

  rocket::build()
    .manage(site)
    .mount("/", routes![videos::home])
    .mount("/videos", routes![videos::index])
    .mount("/planos", routes![plans::index])
    .mount(
      "/sessions",
      routes![
        sessions::create,
        sessions::create_with_google,
        sessions::destroy,
        sessions::current
      ],
    )
    .mount("/registrations", routes![sessions::register])
    .mount(
      "/perfil",
      routes![profiles::show, profiles::update, profiles::destroy],
    )
    .mount(
      "/pagamentos",
      routes![
        payments::create,
        payments::show,
        payments::select_method,
        payments::edit_field,
        payments::submit,
        payments::discard
      ],
    )
    .register("/", catchers![controllers::not_found])
    .attach(cors)
}
