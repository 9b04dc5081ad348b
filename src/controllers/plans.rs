use super::*;

#[get("/")]
pub async fn index() -> Json<Vec<Plan>> {
  Json(Plan::all())
}
