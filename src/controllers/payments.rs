use super::*;

#[derive(Debug, Deserialize)]
pub struct FieldEdit {
  pub field: String,
  pub value: String,
}

/// The selected plan arrives as the `plano` / `preco` query parameters the
/// plan list passes along. Without a resolvable plan there is nothing to
/// check out, and the front end sends the user back to the plan list.
#[post("/?<plano>&<preco>")]
pub async fn create(
  plano: Option<String>,
  preco: Option<String>,
  session: Session,
  site: &State<Site>,
) -> JsonResult<CheckoutSessionState> {
  let name = plano
    .filter(|name| !name.is_empty())
    .ok_or_else(|| Error::validation("plano", "Selecione um plano."))?;
  let plan = Plan::by_name(&name).ok_or_else(|| Error::validation("plano", "Plano desconhecido."))?;

  if let Some(preco) = preco {
    if preco != plan.preco {
      return Err(Error::validation("preco", "Preço não corresponde ao plano selecionado."));
    }
  }

  Ok(Json(site.checkouts.create(&session.profile.uid, plan)?))
}

#[get("/<id>")]
pub async fn show(id: i32, session: Session, site: &State<Site>) -> JsonResult<CheckoutSessionState> {
  Ok(Json(site.checkouts.find(id, &session.profile.uid)?))
}

#[put("/<id>/metodo?<metodo>")]
pub async fn select_method(
  id: i32,
  metodo: PaymentMethod,
  session: Session,
  site: &State<Site>,
) -> JsonResult<CheckoutSessionState> {
  Ok(Json(site.checkouts.select_method(id, &session.profile.uid, metodo)?))
}

#[put("/<id>/campos", data = "<edit>")]
pub async fn edit_field(
  id: i32,
  edit: Json<FieldEdit>,
  session: Session,
  site: &State<Site>,
) -> JsonResult<CheckoutSessionState> {
  Ok(Json(site.checkouts.edit(id, &session.profile.uid, &edit.field, &edit.value)?))
}

#[post("/<id>/confirmar")]
pub async fn submit(
  id: i32,
  session: Session,
  site: &State<Site>,
) -> JsonResult<CheckoutSessionState> {
  Ok(Json(site.checkouts.submit(id, &session.profile.uid)?))
}

#[delete("/<id>")]
pub async fn discard(id: i32, session: Session, site: &State<Site>) -> JsonResult<&'static str> {
  site.checkouts.discard(id, &session.profile.uid)?;
  Ok(Json("OK"))
}
