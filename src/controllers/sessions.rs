use validator::Validate;

use super::*;

#[derive(Debug, Deserialize)]
pub struct SignInForm {
  pub email: String,
  pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SignUpForm {
  #[validate(email(message = "Email inválido"))]
  pub email: String,
  #[validate(length(min = 6, message = "A senha deve ter pelo menos 6 caracteres."))]
  pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct GoogleSignInForm {
  pub access_token: String,
}

#[derive(Debug, Serialize)]
pub struct SessionState {
  pub token: String,
  pub profile: Profile,
}

impl SessionState {
  fn new(session: Session) -> Self {
    Self {
      token: session.token,
      profile: session.profile,
    }
  }
}

#[post("/", data = "<form>")]
pub async fn create(form: Json<SignInForm>, site: &State<Site>) -> JsonResult<SessionState> {
  let signed_in = site.identity.sign_in_with_password(&form.email, &form.password)?;
  let profile = site.identity.lookup(&signed_in.id_token)?;
  let session = site.sessions.sign_in(profile, signed_in.id_token);
  info!("session opened for {}", session.profile.email);
  Ok(Json(SessionState::new(session)))
}

#[post("/google", data = "<form>")]
pub async fn create_with_google(
  form: Json<GoogleSignInForm>,
  site: &State<Site>,
) -> JsonResult<SessionState> {
  let signed_in = site.identity.sign_in_with_idp("google.com", &form.access_token)?;
  let profile = site.identity.lookup(&signed_in.id_token)?;
  let session = site.sessions.sign_in(profile, signed_in.id_token);
  Ok(Json(SessionState::new(session)))
}

#[post("/", data = "<form>")]
pub async fn register(form: Json<SignUpForm>, site: &State<Site>) -> JsonResult<SessionState> {
  form.validate()?;
  let signed_in = site.identity.sign_up(&form.email, &form.password)?;
  let profile = site.identity.lookup(&signed_in.id_token)?;

  let mut context = tera::Context::new();
  context.insert("email", &profile.email);
  let welcome = crate::TEMPLATES.render("emails/welcome", &context)?;
  info!("welcome mail for {} rendered, {} bytes", profile.email, welcome.len());

  let session = site.sessions.sign_in(profile, signed_in.id_token);
  Ok(Json(SessionState::new(session)))
}

#[delete("/")]
pub async fn destroy(session: Session, site: &State<Site>) -> JsonResult<&'static str> {
  site.sessions.sign_out(&session.token);
  info!("session closed for {}", session.profile.email);
  Ok(Json("OK"))
}

#[get("/current")]
pub async fn current(auth: AuthState) -> Json<AuthState> {
  Json(auth)
}
