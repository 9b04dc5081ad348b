use std::fmt::Display;
use std::future::Future;

use rocket::{
  http::{ContentType, Status},
  local::asynchronous::Client,
};
pub use serde::{de::DeserializeOwned, Deserialize};
use tokio::runtime::Runtime;

pub fn run_test<F, E>(future: F)
where
  F: Future<Output = std::result::Result<(), E>>,
  E: std::fmt::Debug,
{
  let result = Runtime::new()
    .expect("could not build runtime")
    .block_on(future);
  result.unwrap();
}

/// Builds a mockito-backed site and an API client, then runs the test body.
#[macro_export]
macro_rules! api_test {
  ($i:ident($client:ident, $site:ident) $($e:tt)* ) => {
    #[test]
    fn $i() {
      $crate::test_support::run_test(async move {
        let $site = $crate::models::SiteSettings::testing(&mockito::server_url())
          .into_site()
          .expect("Could not validate site state");
        let $client = $crate::test_support::PublicApiClient::new($crate::server($site.clone())).await;
        {$($e)*};
        Ok::<(), anyhow::Error>(())
      })
    }
  }
}

#[derive(Deserialize)]
pub struct ApiError {
  pub error: String,
}

pub struct PublicApiClient {
  pub client: Client,
}

impl PublicApiClient {
  pub async fn new(server: rocket::Rocket<rocket::Build>) -> Self {
    Self {
      client: Client::tracked(server).await.expect("valid `Rocket`"),
    }
  }

  pub async fn get<T: DeserializeOwned, P: Display>(&self, path: P) -> T {
    let response = self.raw_get(path).await;
    serde_json::from_str(&response)
      .unwrap_or_else(|_| panic!("Could not parse response {}", response))
  }

  pub async fn raw_get<P: Display>(&self, path: P) -> String {
    self
      .client
      .get(path.to_string())
      .dispatch()
      .await
      .into_string()
      .await
      .expect("response body")
  }

  pub async fn post<T: DeserializeOwned, P: Display>(&self, path: P, body: serde_json::Value) -> T {
    let (status, response) = self.raw_post(path, body).await;
    assert_eq!(status, Status::Ok, "unexpected response {}", response);
    serde_json::from_str(&response)
      .unwrap_or_else(|_| panic!("Could not parse response {}", response))
  }

  pub async fn raw_post<P: Display>(&self, path: P, body: serde_json::Value) -> (Status, String) {
    let response = self
      .client
      .post(path.to_string())
      .header(ContentType::JSON)
      .body(body.to_string())
      .dispatch()
      .await;
    let status = response.status();
    (status, response.into_string().await.expect("response body"))
  }

  pub async fn put<T: DeserializeOwned, P: Display>(&self, path: P, body: serde_json::Value) -> T {
    let (status, response) = self.raw_put(path, body).await;
    assert_eq!(status, Status::Ok, "unexpected response {}", response);
    serde_json::from_str(&response)
      .unwrap_or_else(|_| panic!("Could not parse response {}", response))
  }

  pub async fn raw_put<P: Display>(&self, path: P, body: serde_json::Value) -> (Status, String) {
    let response = self
      .client
      .put(path.to_string())
      .header(ContentType::JSON)
      .body(body.to_string())
      .dispatch()
      .await;
    let status = response.status();
    (status, response.into_string().await.expect("response body"))
  }

  pub async fn delete<P: Display>(&self, path: P, body: serde_json::Value) -> (Status, String) {
    let response = self
      .client
      .delete(path.to_string())
      .header(ContentType::JSON)
      .body(body.to_string())
      .dispatch()
      .await;
    let status = response.status();
    (status, response.into_string().await.expect("response body"))
  }

  pub async fn assert_unauthorized_get<P: Display>(&self, path: P) {
    let response = self.client.get(path.to_string()).dispatch().await;
    assert_eq!(response.status(), Status::Unauthorized);
  }
}
