//! Users API example
//!
//! Serves a `User` resource keyed by name over the in-memory store:
//!
//! ```sh
//! cargo run --example users
//!
//! curl -X POST localhost:3000/users -d '{"name":"brad","email":"brad@example.com"}'
//! curl localhost:3000/users/brad
//! curl -X PUT localhost:3000/users/brad -d '{"name":"brad","email":"b@example.com"}'
//! curl -X DELETE localhost:3000/users/brad
//! ```

use keyed_rest::config::ServerConfig;
use keyed_rest::prelude::*;
use keyed_rest::storage::InMemoryStore;

const CONFIG: &str = r#"
service_name: users-api
bind_addr: 127.0.0.1:3000
log:
  level: keyed_rest=debug,tower_http=debug,info
resources:
  - name: users
    collection_path: /users
    key_param: name
"#;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct User {
    name: String,
    #[serde(default)]
    email: String,
}

impl Keyed<String> for User {
    fn key(&self) -> String {
        self.name.clone()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::from_yaml_str(CONFIG)?;
    init_tracing(&config.log)?;

    let store = InMemoryStore::<String, User>::new();
    store
        .create(User {
            name: "admin".to_string(),
            email: "admin@example.com".to_string(),
        })
        .await?;

    tracing::info!(service = %config.service_name, "starting users example");

    ServerBuilder::new()
        .with_config(config)
        .register_configured("users", store)?
        .serve()
        .await
}
