use std::collections::HashMap;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::Plan;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, FromFormField)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
  #[field(value = "credit_card")]
  CreditCard,
  Pix,
  Boleto,
}

impl PaymentMethod {
  pub fn label(&self) -> &'static str {
    match self {
      PaymentMethod::CreditCard => "Cartão de Crédito",
      PaymentMethod::Pix => "PIX",
      PaymentMethod::Boleto => "Boleto Bancário",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutState {
  SelectingMethod,
  EnteringDetails,
  Submitting,
  Succeeded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditCardForm {
  pub number: String,
  pub name: String,
  pub expiry: String,
  pub cvv: String,
  pub installments: String,
}

impl Default for CreditCardForm {
  fn default() -> Self {
    Self {
      number: String::new(),
      name: String::new(),
      expiry: String::new(),
      cvv: String::new(),
      installments: "1".to_string(),
    }
  }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PixForm {
  pub cpf: String,
  pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoletoForm {
  pub cpf: String,
  pub name: String,
  pub email: String,
  pub phone: String,
}

pub fn digits(value: &str) -> String {
  value.chars().filter(|c| c.is_ascii_digit()).collect()
}

pub fn format_card_number(value: &str) -> String {
  let stripped: String = digits(value).chars().take(16).collect();
  let mut parts = Vec::new();
  let mut rest = stripped.as_str();
  while !rest.is_empty() {
    let (head, tail) = rest.split_at(rest.len().min(4));
    parts.push(head);
    rest = tail;
  }
  parts.join(" ")
}

pub fn format_expiry(value: &str) -> String {
  let stripped: String = digits(value).chars().take(4).collect();
  if stripped.len() >= 2 {
    format!("{}/{}", &stripped[..2], &stripped[2..])
  } else {
    stripped
  }
}

// The mask only applies once all 11 digits are present.
pub fn format_cpf(value: &str) -> String {
  let stripped = digits(value);
  if stripped.len() == 11 {
    format!(
      "{}.{}.{}-{}",
      &stripped[..3],
      &stripped[3..6],
      &stripped[6..9],
      &stripped[9..]
    )
  } else {
    stripped
  }
}

pub fn format_phone(value: &str) -> String {
  let stripped = digits(value);
  match stripped.len() {
    10 => format!("({}) {}-{}", &stripped[..2], &stripped[2..6], &stripped[6..]),
    11 => format!("({}) {}-{}", &stripped[..2], &stripped[2..7], &stripped[7..]),
    _ => stripped,
  }
}

fn acceptable_email(value: &str) -> bool {
  let mut parts = value.split('@');
  match (parts.next(), parts.next(), parts.next()) {
    (Some(local), Some(domain), None) => {
      !local.is_empty()
        && !local.contains(char::is_whitespace)
        && !domain.contains(char::is_whitespace)
        && domain.split('.').count() >= 2
        && domain.split('.').all(|part| !part.is_empty())
    }
    _ => false,
  }
}

fn acceptable_expiry(value: &str) -> bool {
  value.len() == 5
    && value.as_bytes()[2] == b'/'
    && value[..2].chars().all(|c| c.is_ascii_digit())
    && value[3..].chars().all(|c| c.is_ascii_digit())
}

#[derive(Debug, Clone)]
pub struct CheckoutSession {
  pub id: i32,
  pub student_uid: String,
  pub plan: Plan,
  pub state: CheckoutState,
  pub method: Option<PaymentMethod>,
  pub credit_card: CreditCardForm,
  pub pix: PixForm,
  pub boleto: BoletoForm,
  pub errors: HashMap<String, String>,
  pub confirmation: Option<String>,
}

impl CheckoutSession {
  pub fn new(id: i32, student_uid: &str, plan: Plan) -> Self {
    Self {
      id,
      student_uid: student_uid.to_string(),
      plan,
      state: CheckoutState::SelectingMethod,
      method: None,
      credit_card: CreditCardForm::default(),
      pix: PixForm::default(),
      boleto: BoletoForm::default(),
      errors: HashMap::new(),
      confirmation: None,
    }
  }

  /// Picking a method always lands on the details step and forgets errors
  /// left behind by a previously selected method. The other field sets stay
  /// in memory but are neither shown nor validated.
  pub fn select_method(&mut self, method: PaymentMethod) -> Result<()> {
    match self.state {
      CheckoutState::SelectingMethod | CheckoutState::EnteringDetails => {
        self.method = Some(method);
        self.errors.clear();
        self.state = CheckoutState::EnteringDetails;
        Ok(())
      }
      _ => Err(Error::validation("estado", "Método não pode ser alterado agora.")),
    }
  }

  /// Formatting runs on every edit, independent of validation.
  pub fn edit(&mut self, field: &str, value: &str) -> Result<()> {
    if self.state != CheckoutState::EnteringDetails {
      return Err(Error::validation("estado", "Pagamento não aceita alterações agora."));
    }
    let method = self
      .method
      .ok_or_else(|| Error::validation("metodo", "Selecione um método de pagamento."))?;

    match method {
      PaymentMethod::CreditCard => match field {
        "number" => self.credit_card.number = format_card_number(value),
        "name" => self.credit_card.name = value.to_uppercase(),
        "expiry" => self.credit_card.expiry = format_expiry(value),
        "cvv" => self.credit_card.cvv = digits(value).chars().take(4).collect(),
        "installments" => self.credit_card.installments = digits(value),
        _ => return Err(Error::validation(field, "Campo desconhecido para este método.")),
      },
      PaymentMethod::Pix => match field {
        "cpf" => self.pix.cpf = format_cpf(value),
        "name" => self.pix.name = value.to_string(),
        _ => return Err(Error::validation(field, "Campo desconhecido para este método.")),
      },
      PaymentMethod::Boleto => match field {
        "cpf" => self.boleto.cpf = format_cpf(value),
        "name" => self.boleto.name = value.to_string(),
        "email" => self.boleto.email = value.to_string(),
        "phone" => self.boleto.phone = format_phone(value),
        _ => return Err(Error::validation(field, "Campo desconhecido para este método.")),
      },
    }
    Ok(())
  }

  fn validate_active(&self) -> HashMap<String, String> {
    let mut errors = HashMap::new();
    match self.method {
      Some(PaymentMethod::CreditCard) => {
        if digits(&self.credit_card.number).len() != 16 {
          errors.insert(
            "number".to_string(),
            "Número do cartão deve ter 16 dígitos".to_string(),
          );
        }
        if self.credit_card.name.trim().is_empty() {
          errors.insert("name".to_string(), "Nome no cartão é obrigatório".to_string());
        }
        if !acceptable_expiry(&self.credit_card.expiry) {
          errors.insert(
            "expiry".to_string(),
            "Data de validade deve estar no formato MM/AA".to_string(),
          );
        }
        if !(3..=4).contains(&digits(&self.credit_card.cvv).len()) {
          errors.insert("cvv".to_string(), "CVV deve ter 3 ou 4 dígitos".to_string());
        }
      }
      Some(PaymentMethod::Pix) => {
        if digits(&self.pix.cpf).len() != 11 {
          errors.insert("cpf".to_string(), "CPF deve ter 11 dígitos".to_string());
        }
        if self.pix.name.trim().is_empty() {
          errors.insert("name".to_string(), "Nome é obrigatório".to_string());
        }
      }
      Some(PaymentMethod::Boleto) => {
        if digits(&self.boleto.cpf).len() != 11 {
          errors.insert("cpf".to_string(), "CPF deve ter 11 dígitos".to_string());
        }
        if self.boleto.name.trim().is_empty() {
          errors.insert("name".to_string(), "Nome é obrigatório".to_string());
        }
        if !acceptable_email(&self.boleto.email) {
          errors.insert("email".to_string(), "Email inválido".to_string());
        }
        if !(10..=11).contains(&digits(&self.boleto.phone).len()) {
          errors.insert(
            "phone".to_string(),
            "Telefone deve ter 10 ou 11 dígitos".to_string(),
          );
        }
      }
      None => {
        errors.insert(
          "metodo".to_string(),
          "Selecione um método de pagamento.".to_string(),
        );
      }
    }
    errors
  }

  /// Validates the active method. Returns true when the session moved to
  /// `Submitting`; on validation failure it stays on the details step with
  /// the error map populated.
  pub fn submit(&mut self) -> Result<bool> {
    match self.state {
      CheckoutState::EnteringDetails => {}
      CheckoutState::Submitting => {
        return Err(Error::validation("estado", "Pagamento em processamento."));
      }
      _ => return Err(Error::validation("estado", "Pagamento não pode ser enviado agora.")),
    }

    self.errors = self.validate_active();
    if self.errors.is_empty() {
      self.state = CheckoutState::Submitting;
      Ok(true)
    } else {
      Ok(false)
    }
  }

  fn settle(&mut self) {
    self.state = CheckoutState::Succeeded;
    self.confirmation = Some(self.confirmation_message());
  }

  fn confirmation_message(&self) -> String {
    match self.method {
      Some(PaymentMethod::CreditCard) => {
        let stripped = digits(&self.credit_card.number);
        let last4 = if stripped.len() >= 4 { &stripped[stripped.len() - 4..] } else { "" };
        format!(
          "✅ Pagamento do plano {} via Cartão de Crédito processado com sucesso! Valor: {} Cartão: **** **** **** {}",
          self.plan.nome, self.plan.preco, last4
        )
      }
      Some(PaymentMethod::Pix) => format!(
        "✅ Pagamento do plano {} via PIX processado com sucesso! Valor: {} Código PIX gerado e enviado para seu email.",
        self.plan.nome, self.plan.preco
      ),
      _ => format!(
        "✅ Boleto do plano {} gerado com sucesso! Valor: {} Boleto enviado para seu email.",
        self.plan.nome, self.plan.preco
      ),
    }
  }

  pub fn receipt_html(&self) -> Result<String> {
    let mut context = tera::Context::new();
    context.insert("plan", &self.plan.nome);
    context.insert("price", &self.plan.preco);
    context.insert("method", self.method.map(|m| m.label()).unwrap_or(""));
    context.insert("confirmation", self.confirmation.as_deref().unwrap_or(""));
    Ok(crate::TEMPLATES.render("emails/receipt", &context)?)
  }
}

/// The serialized session as the front end sees it: only the active method's
/// field set and its errors are ever exposed.
#[derive(Debug, Serialize)]
pub struct CheckoutSessionState {
  pub id: i32,
  pub plan: Plan,
  pub state: CheckoutState,
  pub method: Option<PaymentMethod>,
  pub fields: Value,
  pub installment_options: Option<Vec<String>>,
  pub errors: HashMap<String, String>,
  pub confirmation: Option<String>,
}

impl CheckoutSessionState {
  pub fn new(session: &CheckoutSession) -> Self {
    let fields = match session.method {
      Some(PaymentMethod::CreditCard) => json!(session.credit_card),
      Some(PaymentMethod::Pix) => json!(session.pix),
      Some(PaymentMethod::Boleto) => json!(session.boleto),
      None => Value::Null,
    };
    let installment_options = match session.method {
      Some(PaymentMethod::CreditCard) => Some(session.plan.installment_options()),
      _ => None,
    };

    Self {
      id: session.id,
      plan: session.plan.clone(),
      state: session.state,
      method: session.method,
      fields,
      installment_options,
      errors: session.errors.clone(),
      confirmation: session.confirmation.clone(),
    }
  }
}

/// All live checkout flows, scoped per user session and never persisted.
#[derive(Clone)]
pub struct CheckoutStore {
  entries: Arc<Mutex<HashMap<i32, CheckoutSession>>>,
  next_id: Arc<AtomicI32>,
  settlement_delay: Duration,
}

impl CheckoutStore {
  pub fn new(settlement_delay: Duration) -> Self {
    Self {
      entries: Arc::new(Mutex::new(HashMap::new())),
      next_id: Arc::new(AtomicI32::new(1)),
      settlement_delay,
    }
  }

  fn with_session<T>(
    &self,
    id: i32,
    student_uid: &str,
    apply: impl FnOnce(&mut CheckoutSession) -> Result<T>,
  ) -> Result<T> {
    let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
    let session = entries
      .get_mut(&id)
      .filter(|s| s.student_uid == student_uid)
      .ok_or(Error::NotFound)?;
    apply(session)
  }

  pub fn create(&self, student_uid: &str, plan: Plan) -> Result<CheckoutSessionState> {
    let id = self.next_id.fetch_add(1, Ordering::SeqCst);
    let session = CheckoutSession::new(id, student_uid, plan);
    let state = CheckoutSessionState::new(&session);
    self
      .entries
      .lock()
      .unwrap_or_else(|e| e.into_inner())
      .insert(id, session);
    Ok(state)
  }

  pub fn find(&self, id: i32, student_uid: &str) -> Result<CheckoutSessionState> {
    self.with_session(id, student_uid, |session| Ok(CheckoutSessionState::new(session)))
  }

  pub fn select_method(
    &self,
    id: i32,
    student_uid: &str,
    method: PaymentMethod,
  ) -> Result<CheckoutSessionState> {
    self.with_session(id, student_uid, |session| {
      session.select_method(method)?;
      Ok(CheckoutSessionState::new(session))
    })
  }

  pub fn edit(
    &self,
    id: i32,
    student_uid: &str,
    field: &str,
    value: &str,
  ) -> Result<CheckoutSessionState> {
    self.with_session(id, student_uid, |session| {
      session.edit(field, value)?;
      Ok(CheckoutSessionState::new(session))
    })
  }

  /// One settlement task at most is outstanding per session: only the
  /// `EnteringDetails -> Submitting` transition spawns it, and a second
  /// submit while `Submitting` is refused.
  pub fn submit(&self, id: i32, student_uid: &str) -> Result<CheckoutSessionState> {
    let (moved, state) = self.with_session(id, student_uid, |session| {
      let moved = session.submit()?;
      Ok((moved, CheckoutSessionState::new(session)))
    })?;

    if moved {
      let store = self.clone();
      let delay = self.settlement_delay;
      tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        store.settle(id);
      });
    }

    Ok(state)
  }

  fn settle(&self, id: i32) {
    let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
    // The session may have been discarded while the timer was pending.
    if let Some(session) = entries.get_mut(&id) {
      if session.state == CheckoutState::Submitting {
        session.settle();
        info!("checkout {} settled for plan {}", id, session.plan.nome);
        match session.receipt_html() {
          Ok(body) => info!("checkout {} receipt rendered, {} bytes", id, body.len()),
          Err(e) => warn!("checkout {} receipt failed to render: {}", id, e),
        }
      }
    }
  }

  pub fn discard(&self, id: i32, student_uid: &str) -> Result<()> {
    let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
    match entries.get(&id) {
      Some(session) if session.student_uid == student_uid => {
        entries.remove(&id);
        Ok(())
      }
      _ => Err(Error::NotFound),
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::models::{Plan, PlanCode};
  use crate::test_support::run_test;

  fn premium() -> Plan {
    Plan::by_code(PlanCode::Premium)
  }

  #[test]
  fn formats_card_numbers_in_groups_of_four() {
    assert_eq!(format_card_number("1234567890123456"), "1234 5678 9012 3456");
    assert_eq!(format_card_number("12345"), "1234 5");
    assert_eq!(format_card_number("123"), "123");
    assert_eq!(format_card_number("1234-5678 abcd 9012"), "1234 5678 9012");
    assert_eq!(format_card_number("12345678901234567890"), "1234 5678 9012 3456");
  }

  #[test]
  fn card_formatting_is_idempotent() {
    let formatted = format_card_number("1234567890123456");
    assert_eq!(format_card_number(&formatted), formatted);
  }

  #[test]
  fn formats_cpf_only_at_eleven_digits() {
    assert_eq!(format_cpf("12345678900"), "123.456.789-00");
    assert_eq!(format_cpf("1234"), "1234");
    assert_eq!(format_cpf("123.456.789-00"), "123.456.789-00");
    assert_eq!(format_cpf("123456789001"), "123456789001");
  }

  #[test]
  fn formats_expiry_and_cvv_like_inputs() {
    assert_eq!(format_expiry("1226"), "12/26");
    assert_eq!(format_expiry("12/26"), "12/26");
    assert_eq!(format_expiry("1"), "1");
    assert_eq!(format_expiry("122634"), "12/26");
  }

  #[test]
  fn formats_phones_for_ten_and_eleven_digits() {
    assert_eq!(format_phone("1199998888"), "(11) 9999-8888");
    assert_eq!(format_phone("11999998888"), "(11) 99999-8888");
    assert_eq!(format_phone("119999"), "119999");
  }

  #[test]
  fn a_fifteen_digit_card_number_blocks_submission() {
    let mut session = CheckoutSession::new(1, "uid_1", premium());
    session.select_method(PaymentMethod::CreditCard).expect("method");
    session.edit("number", "123456789012345").expect("number");
    session.edit("name", "João da Silva").expect("name");
    session.edit("expiry", "1226").expect("expiry");
    session.edit("cvv", "123").expect("cvv");

    let moved = session.submit().expect("submit");
    assert!(!moved);
    assert_eq!(session.state, CheckoutState::EnteringDetails);
    assert_eq!(
      session.errors.get("number").map(String::as_str),
      Some("Número do cartão deve ter 16 dígitos")
    );
    assert_eq!(session.credit_card.name, "JOÃO DA SILVA");
  }

  #[test]
  fn boleto_requires_a_plausible_email_and_phone() {
    let mut session = CheckoutSession::new(1, "uid_1", premium());
    session.select_method(PaymentMethod::Boleto).expect("method");
    session.edit("cpf", "12345678900").expect("cpf");
    session.edit("name", "João da Silva").expect("name");
    session.edit("email", "joao@email").expect("email");
    session.edit("phone", "119999").expect("phone");

    assert!(!session.submit().expect("submit"));
    assert_eq!(session.errors.get("email").map(String::as_str), Some("Email inválido"));
    assert_eq!(
      session.errors.get("phone").map(String::as_str),
      Some("Telefone deve ter 10 ou 11 dígitos")
    );

    session.edit("email", "joao@email.com").expect("email");
    session.edit("phone", "11999998888").expect("phone");
    assert!(session.submit().expect("submit"));
    assert_eq!(session.state, CheckoutState::Submitting);
  }

  #[test]
  fn switching_method_clears_the_previous_errors() {
    let mut session = CheckoutSession::new(1, "uid_1", premium());
    session.select_method(PaymentMethod::CreditCard).expect("method");
    assert!(!session.submit().expect("submit"));
    assert!(!session.errors.is_empty());

    session.select_method(PaymentMethod::Pix).expect("method");
    assert!(session.errors.is_empty());
    assert_eq!(session.state, CheckoutState::EnteringDetails);
  }

  #[test]
  fn editing_fields_of_another_method_is_refused() {
    let mut session = CheckoutSession::new(1, "uid_1", premium());
    session.select_method(PaymentMethod::Pix).expect("method");
    assert!(session.edit("cvv", "123").is_err());
  }

  #[test]
  fn the_pix_flow_reaches_succeeded_after_settlement() {
    run_test(async {
      let store = CheckoutStore::new(Duration::from_millis(10));
      let state = store.create("uid_1", premium())?;
      store.select_method(state.id, "uid_1", PaymentMethod::Pix)?;
      store.edit(state.id, "uid_1", "cpf", "12345678900")?;
      store.edit(state.id, "uid_1", "name", "João da Silva")?;

      let submitted = store.submit(state.id, "uid_1")?;
      assert_eq!(submitted.state, CheckoutState::Submitting);

      tokio::time::sleep(Duration::from_millis(100)).await;
      let settled = store.find(state.id, "uid_1")?;
      assert_eq!(settled.state, CheckoutState::Succeeded);
      let confirmation = settled.confirmation.unwrap_or_default();
      assert!(confirmation.contains("Premium"));
      assert!(confirmation.contains("PIX"));
      Ok::<(), crate::Error>(())
    });
  }

  #[test]
  fn a_second_submit_while_processing_is_refused() {
    run_test(async {
      let store = CheckoutStore::new(Duration::from_millis(200));
      let state = store.create("uid_1", premium())?;
      store.select_method(state.id, "uid_1", PaymentMethod::Pix)?;
      store.edit(state.id, "uid_1", "cpf", "12345678900")?;
      store.edit(state.id, "uid_1", "name", "João da Silva")?;
      store.submit(state.id, "uid_1")?;

      assert!(matches!(
        store.submit(state.id, "uid_1"),
        Err(Error::Validation { .. })
      ));
      Ok::<(), crate::Error>(())
    });
  }

  #[test]
  fn discarding_before_settlement_leaves_nothing_to_update() {
    run_test(async {
      let store = CheckoutStore::new(Duration::from_millis(50));
      let state = store.create("uid_1", premium())?;
      store.select_method(state.id, "uid_1", PaymentMethod::Pix)?;
      store.edit(state.id, "uid_1", "cpf", "12345678900")?;
      store.edit(state.id, "uid_1", "name", "João da Silva")?;
      store.submit(state.id, "uid_1")?;
      store.discard(state.id, "uid_1")?;

      tokio::time::sleep(Duration::from_millis(150)).await;
      assert!(matches!(store.find(state.id, "uid_1"), Err(Error::NotFound)));
      Ok::<(), crate::Error>(())
    });
  }

  #[test]
  fn sessions_are_only_visible_to_their_owner() {
    let store = CheckoutStore::new(Duration::from_millis(10));
    let state = store.create("uid_1", premium()).expect("create");
    assert!(matches!(store.find(state.id, "uid_2"), Err(Error::NotFound)));
  }
}
