use serde::{Deserialize, Serialize};

#[derive(PartialEq, Eq, Copy, Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanCode {
  Basico,
  Premium,
  Master,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Plan {
  pub code: PlanCode,
  pub nome: String,
  pub preco: String,
  pub recursos: Vec<String>,
}

impl Plan {
  pub fn by_code(code: PlanCode) -> Plan {
    match code {
      PlanCode::Basico => Plan {
        code,
        nome: "Básico".to_string(),
        preco: "R$ 19,90/mês".to_string(),
        recursos: vec![
          "Acesso a vídeos básicos".to_string(),
          "Qualidade SD".to_string(),
          "1 tela simultânea".to_string(),
        ],
      },
      PlanCode::Premium => Plan {
        code,
        nome: "Premium".to_string(),
        preco: "R$ 39,90/mês".to_string(),
        recursos: vec![
          "Acesso a todos os vídeos".to_string(),
          "Qualidade Full HD".to_string(),
          "3 telas simultâneas".to_string(),
          "Conteúdo exclusivo".to_string(),
        ],
      },
      PlanCode::Master => Plan {
        code,
        nome: "Master".to_string(),
        preco: "R$ 59,90/mês".to_string(),
        recursos: vec![
          "Acesso a todos os vídeos".to_string(),
          "Qualidade 4K".to_string(),
          "Telas ilimitadas".to_string(),
          "Conteúdo exclusivo".to_string(),
          "Suporte prioritário".to_string(),
        ],
      },
    }
  }

  pub fn all() -> Vec<Plan> {
    vec![
      Plan::by_code(PlanCode::Basico),
      Plan::by_code(PlanCode::Premium),
      Plan::by_code(PlanCode::Master),
    ]
  }

  pub fn by_name(name: &str) -> Option<Plan> {
    Plan::all().into_iter().find(|p| p.nome == name)
  }

  // Prices are kept as the localized strings the catalog displays.
  pub fn price_value(&self) -> f64 {
    self
      .preco
      .replace("R$ ", "")
      .replace("/mês", "")
      .replace(',', ".")
      .parse()
      .unwrap_or(0.0)
  }

  pub fn installment_label(&self, installments: u32) -> String {
    let share = self.price_value() / installments as f64;
    let amount = format!("{:.2}", share).replace('.', ",");
    format!("{}x de R$ {}", installments, amount)
  }

  pub fn installment_options(&self) -> Vec<String> {
    (1..=3).map(|n| self.installment_label(n)).collect()
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn finds_plans_by_name() {
    let plan = Plan::by_name("Premium").expect("Premium plan");
    assert_eq!(plan.code, PlanCode::Premium);
    assert_eq!(plan.preco, "R$ 39,90/mês");
    assert!(Plan::by_name("Diamante").is_none());
  }

  #[test]
  fn parses_localized_prices() {
    assert_eq!(Plan::by_code(PlanCode::Basico).price_value(), 19.90);
    assert_eq!(Plan::by_code(PlanCode::Master).price_value(), 59.90);
  }

  #[test]
  fn builds_installment_labels() {
    let plan = Plan::by_code(PlanCode::Premium);
    assert_eq!(
      plan.installment_options(),
      vec!["1x de R$ 39,90", "2x de R$ 19,95", "3x de R$ 13,30"]
    );
  }
}
