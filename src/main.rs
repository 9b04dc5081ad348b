#[macro_use]
extern crate rocket;

use masterplays_api::models::SiteSettings;

#[launch]
fn rocket() -> _ {
  let settings: SiteSettings = rocket::Config::figment()
    .extract_inner("site")
    .unwrap_or_default();
  let site = settings.into_site().expect("Could not validate site state");
  masterplays_api::server(site)
}
