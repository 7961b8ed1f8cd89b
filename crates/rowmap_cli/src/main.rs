//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `rowmap_core` wiring end to end against a real SQLite database.
//! - Keep output deterministic for quick local sanity checks.
//!
//! Usage: `rowmap_cli [db_path]` (in-memory database when omitted).

use rowmap_core::{
    EntityDefinition, EntityRegistry, ModelHandle, OrmError, PropertySpec, Record,
    SqliteGateway, SqliteGatewayConfig, ValidationRule, Value, DEFAULT_DATABASE,
};
use std::process::ExitCode;
use std::rc::Rc;

const USERS_SCHEMA: &str = "CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    first_name TEXT NOT NULL
);";

fn main() -> ExitCode {
    println!("rowmap_core version={}", rowmap_core::core_version());
    match run(std::env::args().nth(1)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("rowmap_cli error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(db_path: Option<String>) -> Result<(), OrmError> {
    let config = match db_path {
        Some(path) => SqliteGatewayConfig::file(path),
        None => SqliteGatewayConfig::in_memory(),
    };
    let gateway = Rc::new(SqliteGateway::new(config));
    gateway.execute_batch(DEFAULT_DATABASE, USERS_SCHEMA)?;

    let mut registry = EntityRegistry::new();
    registry.register(
        EntityDefinition::new("user")
            .property("id", PropertySpec::new("users", "id"))
            .property(
                "firstName",
                PropertySpec::new("users", "first_name")
                    .with_rule(ValidationRule::non_empty_text()),
            ),
        gateway,
    )?;

    let entity = registry.get("user")?;
    let mut data = Record::new();
    data.insert("firstName".to_string(), Value::from("Ada"));
    let model = ModelHandle::new(entity.factory().create(&data));

    let Some(id) = entity.repository().add(&model)? else {
        println!("rowmap_cli create=empty");
        return Ok(());
    };
    let fetched = entity.repository().get_by_id(id)?;
    let same_instance = fetched
        .as_ref()
        .is_some_and(|fetched| fetched.same_instance(&model));

    let json = serde_json::to_string(&model.data()).unwrap_or_else(|_| "{}".to_string());
    println!("rowmap_cli user id={id} identity_map_hit={same_instance} data={json}");
    Ok(())
}
