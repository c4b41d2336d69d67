use crate::{OutputMode, emit_success};
use owo_colors::OwoColorize;
use std::path::Path;
use waypoint::config::{self, WaypointConfig};
use waypoint::storage::{RecordStore, catalog};
use waypoint::ui::{self, Icons, RecordTable, section, success};
use waypoint::{Predicate, Record};

pub fn unix_now() -> String {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

fn print_records(store: &RecordStore, schema_name: &str, records: Vec<Record>) -> anyhow::Result<()> {
    let schema = store.schema(schema_name)?;
    if records.is_empty() {
        println!("{} No records found in {}.", Icons::EMPTY, schema_name);
        return Ok(());
    }
    let count = records.len();
    let mut table = RecordTable::new(schema);
    for record in records {
        table.add_record(record);
    }
    println!("{}", table.build());
    println!("{}", ui::muted(&format!("{} record(s)", count)));
    Ok(())
}

pub fn run_init(
    output_mode: OutputMode,
    config_path: &Path,
    database: &Path,
    force: bool,
) -> anyhow::Result<()> {
    let settings = WaypointConfig {
        database: Some(database.display().to_string()),
        log_level: Some("warn".to_string()),
    };
    config::write_config(config_path, &settings, force)?;

    config::ensure_db_dir(database)?;
    let store = RecordStore::init(catalog::default_registry()?, database);
    if !store.is_connected() {
        anyhow::bail!("could not create database at {}", database.display());
    }

    if output_mode.is_human() {
        success(&format!("Wrote {}", config_path.display()));
        ui::info("Database", &database.display().to_string());
        ui::info("Tables", &store.registry().names().collect::<Vec<_>>().join(", "));
    } else {
        let data = serde_json::json!({
            "config": config_path.display().to_string(),
            "database": database.display().to_string(),
        });
        emit_success(output_mode, "init", data)?;
    }
    Ok(())
}

pub fn run_schemas(output_mode: OutputMode) -> anyhow::Result<()> {
    let registry = catalog::default_registry()?;
    if output_mode.is_human() {
        for schema in registry.iter() {
            section(&format!(" {} {} ", Icons::SCHEMA, schema.name()));
            println!("{}", schema);
            if let Some(key) = schema.key_field() {
                ui::info("Key", &key.name.style(ui::theme().key.clone()).to_string());
            }
            println!("{}", ui::muted(schema.create_statement()));
        }
    } else {
        let data: Vec<_> = registry
            .iter()
            .map(|s| {
                serde_json::json!({
                    "name": s.name(),
                    "fields": s.fields().iter().map(|f| {
                        serde_json::json!({ "name": f.name, "type": f.field_type.as_str() })
                    }).collect::<Vec<_>>(),
                    "key": s.key_field().map(|f| f.name.clone()),
                })
            })
            .collect();
        emit_success(output_mode, "schemas", serde_json::Value::Array(data))?;
    }
    Ok(())
}

pub fn run_insert(
    output_mode: OutputMode,
    store: &RecordStore,
    schema_name: &str,
    values: &[String],
) -> anyhow::Result<()> {
    let schema = store.schema(schema_name)?;
    store.insert(schema, values)?;

    if output_mode.is_human() {
        success(&format!("{} Inserted into {}", Icons::NEW, schema_name));
    } else {
        emit_success(output_mode, "insert", serde_json::json!({ "schema": schema_name, "record": values }))?;
    }
    Ok(())
}

pub fn run_search(
    output_mode: OutputMode,
    store: &RecordStore,
    schema_name: &str,
    terms: &[String],
) -> anyhow::Result<()> {
    let schema = store.schema(schema_name)?;
    let records = store.search(schema, &Predicate::parse_terms(terms))?;

    if output_mode.is_human() {
        println!("{} Searching {} for {:?}...", Icons::SEARCH, schema_name, terms);
        print_records(store, schema_name, records)?;
    } else {
        emit_success(output_mode, "search", serde_json::json!({ "schema": schema_name, "records": records }))?;
    }
    Ok(())
}

pub fn run_delete(
    output_mode: OutputMode,
    store: &RecordStore,
    schema_name: &str,
    terms: &[String],
) -> anyhow::Result<()> {
    let schema = store.schema(schema_name)?;
    let removed = store.delete(schema, &Predicate::parse_terms(terms))?;

    if output_mode.is_human() {
        println!("{} Removed {} record(s) from {}", Icons::DEL, removed, schema_name);
    } else {
        emit_success(output_mode, "delete", serde_json::json!({ "schema": schema_name, "removed": removed }))?;
    }
    Ok(())
}

pub fn run_dump(output_mode: OutputMode, store: &RecordStore, schema_name: &str) -> anyhow::Result<()> {
    let records = store.fetch_all(schema_name)?;

    if output_mode.is_human() {
        print_records(store, schema_name, records)?;
    } else {
        emit_success(output_mode, "dump", serde_json::json!({ "schema": schema_name, "records": records }))?;
    }
    Ok(())
}

pub fn run_stats(output_mode: OutputMode, store: &RecordStore, database: &Path) -> anyhow::Result<()> {
    let stats = store.stats()?;

    if output_mode.is_human() {
        ui::header(&format!("Waypoint Statistics ({})", database.display()));
        println!("{}", ui::stats_table(&stats.tables));
        ui::info("Total", &stats.total().to_string());
    } else {
        let tables: serde_json::Map<_, _> = stats
            .tables
            .iter()
            .map(|(name, rows)| (name.clone(), serde_json::json!(rows)))
            .collect();
        emit_success(output_mode, "stats", serde_json::json!({ "tables": tables, "total": stats.total() }))?;
    }
    Ok(())
}

pub fn run_register(
    output_mode: OutputMode,
    store: &RecordStore,
    username: &str,
    password: &str,
    profile: &[(&str, &str)],
) -> anyhow::Result<()> {
    let users = store.schema(catalog::USERS)?;
    waypoint::register_user(store, users, username, password, profile)?;

    if output_mode.is_human() {
        success(&format!("{} Registered {}", Icons::PERSON, username.style(ui::theme().key.clone())));
    } else {
        emit_success(output_mode, "register", serde_json::json!({ "username": username }))?;
    }
    Ok(())
}

pub fn run_login(
    output_mode: OutputMode,
    store: &RecordStore,
    username: &str,
    password: &str,
) -> anyhow::Result<()> {
    let users = store.schema(catalog::USERS)?;
    let verified = waypoint::verify_credentials(store, users, username, password)?;

    if !verified {
        anyhow::bail!("{} Invalid username or password", Icons::LOCK);
    }

    if output_mode.is_human() {
        success(&format!("{} Credentials accepted for {}", Icons::KEY, username));
    } else {
        emit_success(output_mode, "login", serde_json::json!({ "username": username }))?;
    }
    Ok(())
}
