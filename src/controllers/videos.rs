use super::*;

#[derive(Debug, Serialize)]
pub struct CatalogPage {
  pub total: usize,
  pub categories: Vec<&'static str>,
  pub videos: Vec<&'static VideoRecord>,
}

fn category_filters() -> Vec<&'static str> {
  let mut filters = vec!["Todos"];
  filters.extend(Category::ALL.iter().map(Category::as_str));
  filters
}

#[get("/?<busca>&<categoria>&<ordenar>")]
pub async fn index(
  busca: Option<String>,
  categoria: Option<String>,
  ordenar: Option<SortKey>,
) -> Json<CatalogPage> {
  let videos = query(
    &CATALOG,
    busca.as_deref().unwrap_or(""),
    categoria.as_deref().unwrap_or("Todos"),
    ordenar.unwrap_or(SortKey::Recentes),
  );

  Json(CatalogPage {
    total: videos.len(),
    categories: category_filters(),
    videos,
  })
}

#[derive(Debug, Serialize)]
pub struct HomePage {
  pub featured: &'static VideoRecord,
  pub videos: Vec<&'static VideoRecord>,
  pub auth: AuthState,
}

#[get("/?<categoria>")]
pub async fn home(categoria: Option<String>, auth: AuthState) -> Json<HomePage> {
  let videos = query(
    &CATALOG,
    "",
    categoria.as_deref().unwrap_or("Todos"),
    SortKey::Recentes,
  );

  Json(HomePage {
    featured: featured(),
    videos,
    auth,
  })
}
