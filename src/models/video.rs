use std::cmp::Ordering;

use chrono::NaiveDate;
use lazy_static::lazy_static;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Category {
  #[serde(rename = "Programação")]
  Programacao,
  Design,
  #[serde(rename = "IA")]
  Ia,
  Fotografia,
  #[serde(rename = "Música")]
  Musica,
  Viagem,
  Games,
  #[serde(rename = "Culinária")]
  Culinaria,
  Fitness,
}

impl Category {
  pub const ALL: [Category; 9] = [
    Category::Programacao,
    Category::Design,
    Category::Ia,
    Category::Fotografia,
    Category::Musica,
    Category::Viagem,
    Category::Games,
    Category::Culinaria,
    Category::Fitness,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      Category::Programacao => "Programação",
      Category::Design => "Design",
      Category::Ia => "IA",
      Category::Fotografia => "Fotografia",
      Category::Musica => "Música",
      Category::Viagem => "Viagem",
      Category::Games => "Games",
      Category::Culinaria => "Culinária",
      Category::Fitness => "Fitness",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromFormField)]
pub enum SortKey {
  Recentes,
  Visualizacoes,
  Duracao,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRecord {
  pub id: &'static str,
  pub title: &'static str,
  pub thumbnail: &'static str,
  pub category: Category,
  pub duration: &'static str,
  pub views: &'static str,
  pub upload_date: NaiveDate,
  pub is_new: bool,
  pub featured: bool,
  pub tags: &'static [&'static str],
}

lazy_static! {
  pub static ref CATALOG: Vec<VideoRecord> = vec![
    VideoRecord {
      id: "1",
      title: "Tutorial React Avançado - Hooks e Context API",
      thumbnail: "https://images.unsplash.com/photo-1633356122544-f134324a6cee?w=400&h=225&fit=crop",
      category: Category::Programacao,
      duration: "45:30",
      views: "12.5K",
      upload_date: date("2024-12-20"),
      is_new: true,
      featured: true,
      tags: &["React", "JavaScript", "Frontend"],
    },
    VideoRecord {
      id: "2",
      title: "Design de Interfaces Modernas com Figma",
      thumbnail: "https://images.unsplash.com/photo-1561070791-2526d30994b5?w=400&h=225&fit=crop",
      category: Category::Design,
      duration: "32:15",
      views: "8.2K",
      upload_date: date("2024-12-18"),
      is_new: false,
      featured: false,
      tags: &["Figma", "UI/UX", "Design"],
    },
    VideoRecord {
      id: "3",
      title: "Machine Learning Básico - Introdução à IA",
      thumbnail: "https://images.unsplash.com/photo-1555949963-aa79dcee981c?w=400&h=225&fit=crop",
      category: Category::Ia,
      duration: "28:45",
      views: "15.7K",
      upload_date: date("2024-12-15"),
      is_new: false,
      featured: false,
      tags: &["Machine Learning", "Python", "IA"],
    },
    VideoRecord {
      id: "4",
      title: "Fotografia Profissional - Técnicas Avançadas",
      thumbnail: "https://images.unsplash.com/photo-1452587925148-ce544e77e70d?w=400&h=225&fit=crop",
      category: Category::Fotografia,
      duration: "52:20",
      views: "6.9K",
      upload_date: date("2024-12-12"),
      is_new: false,
      featured: false,
      tags: &["Fotografia", "Camera", "Edição"],
    },
    VideoRecord {
      id: "5",
      title: "Produção de Música Eletrônica 2024",
      thumbnail: "https://images.unsplash.com/photo-1493225457124-a3eb161ffa5f?w=400&h=225&fit=crop",
      category: Category::Musica,
      duration: "38:12",
      views: "9.3K",
      upload_date: date("2024-12-10"),
      is_new: false,
      featured: false,
      tags: &["Música", "Produção", "Eletrônica"],
    },
    VideoRecord {
      id: "6",
      title: "Viagem pelo Mundo - Destinos Incríveis",
      thumbnail: "https://images.unsplash.com/photo-1488646953014-85cb44e25828?w=400&h=225&fit=crop",
      category: Category::Viagem,
      duration: "41:33",
      views: "11.1K",
      upload_date: date("2024-12-08"),
      is_new: false,
      featured: false,
      tags: &["Viagem", "Turismo", "Aventura"],
    },
    VideoRecord {
      id: "7",
      title: "Jogos Indie - Descobertas 2024",
      thumbnail: "https://images.unsplash.com/photo-1556438064-2d7646166914?w=400&h=225&fit=crop",
      category: Category::Games,
      duration: "29:45",
      views: "18.2K",
      upload_date: date("2024-12-05"),
      is_new: true,
      featured: false,
      tags: &["Games", "Indie", "Reviews"],
    },
    VideoRecord {
      id: "8",
      title: "Culinária Gourmet - Receitas Premium",
      thumbnail: "https://images.unsplash.com/photo-1556909114-f6e7ad7d3136?w=400&h=225&fit=crop",
      category: Category::Culinaria,
      duration: "35:20",
      views: "7.8K",
      upload_date: date("2024-12-03"),
      is_new: false,
      featured: false,
      tags: &["Culinária", "Receitas", "Gourmet"],
    },
    VideoRecord {
      id: "9",
      title: "Fitness e Saúde - Rotina Completa",
      thumbnail: "https://images.unsplash.com/photo-1571019613454-1cb2f99b2d8b?w=400&h=225&fit=crop",
      category: Category::Fitness,
      duration: "42:10",
      views: "14.6K",
      upload_date: date("2024-12-01"),
      is_new: false,
      featured: false,
      tags: &["Fitness", "Saúde", "Exercícios"],
    },
  ];
}

fn date(value: &str) -> NaiveDate {
  value.parse().expect("catalog date")
}

/// Filters and orders the catalog. Sorting is stable, so records that tie
/// under the selected key keep their fixture order.
pub fn query<'a>(
  all: &'a [VideoRecord],
  search: &str,
  category: &str,
  sort: SortKey,
) -> Vec<&'a VideoRecord> {
  let term = search.to_lowercase();

  let mut found: Vec<&VideoRecord> = all
    .iter()
    .filter(|video| {
      let matches_search = term.is_empty()
        || video.title.to_lowercase().contains(&term)
        || video.tags.iter().any(|tag| tag.to_lowercase().contains(&term));
      let matches_category = category == "Todos" || video.category.as_str() == category;
      matches_search && matches_category
    })
    .collect();

  match sort {
    SortKey::Recentes => found.sort_by(|a, b| b.upload_date.cmp(&a.upload_date)),
    SortKey::Visualizacoes => found.sort_by(|a, b| {
      views_value(b.views)
        .partial_cmp(&views_value(a.views))
        .unwrap_or(Ordering::Equal)
    }),
    SortKey::Duracao => {
      found.sort_by(|a, b| duration_minutes(b.duration).cmp(&duration_minutes(a.duration)))
    }
  }

  found
}

// View counts are strings like "12.5K"; only a trailing K is understood, so
// a record counted in "M" would misrank.
pub fn views_value(views: &str) -> f64 {
  views.trim_end_matches('K').parse().unwrap_or(0.0)
}

// Ordering by duration only looks at the minutes in "mm:ss".
pub fn duration_minutes(duration: &str) -> u32 {
  duration
    .split(':')
    .next()
    .and_then(|minutes| minutes.parse().ok())
    .unwrap_or(0)
}

pub fn featured() -> &'static VideoRecord {
  CATALOG.iter().find(|video| video.featured).unwrap_or(&CATALOG[0])
}
