use super::*;

#[derive(Debug, Deserialize)]
pub struct ProfileUpdateForm {
  pub display_name: Option<String>,
  pub email: Option<String>,
  pub current_password: Option<String>,
  pub new_password: Option<String>,
  pub confirm_password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteAccountForm {
  pub current_password: Option<String>,
}

#[get("/")]
pub async fn show(session: Session) -> JsonResult<Profile> {
  Ok(Json(session.profile))
}

/// Display name changes apply directly; changing email or password needs the
/// current password for re-authentication, as the provider demands.
#[put("/", data = "<form>")]
pub async fn update(
  form: Json<ProfileUpdateForm>,
  session: Session,
  site: &State<Site>,
) -> JsonResult<Profile> {
  let form = form.into_inner();

  if let Some(ref display_name) = form.display_name {
    site.identity.update_profile(&session.id_token, display_name)?;
  }

  let new_email = form.email.as_ref().filter(|email| **email != session.profile.email);
  if let (Some(email), Some(password)) = (new_email, form.current_password.as_ref()) {
    site.identity.reauthenticate(&session.profile.email, password)?;
    site.identity.update_email(&session.id_token, email)?;
  }

  if let (Some(new_password), Some(password)) =
    (form.new_password.as_ref(), form.current_password.as_ref())
  {
    if form.confirm_password.as_deref() != Some(new_password.as_str()) {
      return Err(Error::validation("confirm_password", "As senhas não coincidem"));
    }
    site.identity.reauthenticate(&session.profile.email, password)?;
    site.identity.update_password(&session.id_token, new_password)?;
  }

  Ok(Json(site.identity.lookup(&session.id_token)?))
}

#[delete("/", data = "<form>")]
pub async fn destroy(
  form: Json<DeleteAccountForm>,
  session: Session,
  site: &State<Site>,
) -> JsonResult<&'static str> {
  let password = form
    .current_password
    .as_deref()
    .filter(|p| !p.is_empty())
    .ok_or_else(|| {
      Error::validation(
        "current_password",
        "Digite sua senha atual para confirmar a exclusão.",
      )
    })?;

  site.identity.reauthenticate(&session.profile.email, password)?;
  site.identity.delete_account(&session.id_token)?;
  site.sessions.sign_out(&session.token);
  info!("account deleted for {}", session.profile.email);
  Ok(Json("Conta excluída com sucesso."))
}
