use std::{io::Write, process, sync::Arc};

use log::{error, info};
use shardcore::{
    catalog::resource::MemoryDataSourceFactory,
    config::BootstrapConfig,
    mode::ContextManager,
    persist::{repository::MemoryPersistRepository, MetaDataPersistService},
};

fn main() {
    env_logger::Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} {} {}:{} {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.file().unwrap_or("?"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .filter(None, log::LevelFilter::Info)
        .init();

    let path = match std::env::args().nth(1) {
        Some(path) => path,
        None => {
            eprintln!("usage: meta_inspect <config.json>");
            process::exit(2);
        }
    };
    let config = match BootstrapConfig::from_file(&path) {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            process::exit(1);
        }
    };

    let factory = Arc::new(MemoryDataSourceFactory::new());
    config.seed(&factory);
    let repository = Arc::new(MemoryPersistRepository::new());
    let persist_service = Arc::new(MetaDataPersistService::new(repository));
    let manager = match ContextManager::from_config(&config, factory, Some(Arc::clone(&persist_service))) {
        Ok(manager) => manager,
        Err(e) => {
            error!("{e}");
            process::exit(1);
        }
    };

    let contexts = manager.meta_data_contexts();
    info!("protocol {}", contexts.protocol_type().name());
    for name in contexts.all_database_names() {
        let database = match contexts.database(&name) {
            Some(database) => database,
            None => continue,
        };
        let engine = manager
            .transaction_engine(&name)
            .map(|engine| format!("{:?}", engine.transaction_type()))
            .unwrap_or_default();
        info!(
            "database {name}: data sources {:?}, {} rules, transaction {engine}",
            database.resource().data_source_names(),
            database.rule_meta_data().rules().len()
        );
        let mut schema_names: Vec<&String> = database.schemas().keys().collect();
        schema_names.sort();
        for schema_name in schema_names {
            if let Some(schema) = database.schema(schema_name) {
                info!("  schema {schema_name}: {:?}", schema.all_table_names());
            }
        }
    }
    match persist_service.load_all_database_names() {
        Ok(names) => info!("persisted databases {names:?}"),
        Err(e) => error!("{e}"),
    }
    manager.close();
}
