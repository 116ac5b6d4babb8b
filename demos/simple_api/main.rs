//! Simple example exposing two in-memory collections
//!
//! ```text
//! cargo run --example simple_api
//! curl 'http://127.0.0.1:3000/people?json={"query":{"name":{"$regex":"^a"}}}'
//! curl 'http://127.0.0.1:3000/people?json={"projection":{"name":1,"password":1}}'
//! curl -X POST http://127.0.0.1:3000/people -H 'content-type: application/json' \
//!      -d '{"json":{"query":{"name":"dan","password":"x"}}}'
//! ```

use collection_rest::prelude::*;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn person(name: &str, age: u32) -> Document {
    let mut doc = Document::new();
    doc.insert("name".to_string(), json!(name));
    doc.insert("age".to_string(), json!(age));
    doc.insert("password".to_string(), json!("secret"));
    doc
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("collection_rest=debug,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let people = InMemoryCollection::with_documents(vec![
        person("alice", 31),
        person("bob", 25),
        person("amy", 19),
    ]);

    // Passwords never leave the server; clients may read at most 100 people
    let people_options = ResourceOptions::new()
        .with_projection(Projection::new().with("password", false))
        .with_limit(100);

    // Read-only view over the same documents, with verbose errors
    let audit_options = ResourceOptions::new().with_methods([Method::Get]);

    ServerBuilder::new()
        .with_service_name("simple-api")
        .register(
            "/people",
            RestResource::new(people.clone(), Some(people_options), false),
        )
        .register(
            "/audit",
            RestResource::new(people, Some(audit_options), true),
        )
        .serve("127.0.0.1:3000")
        .await
}
