use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::sync::Arc;

use shardcore::{
    ast::{segment::SimpleTableSegment, AlterTableStmt, CreateTableStmt, Statement},
    catalog::{
        column::ColumnMetaData,
        resource::{DataSource, MemoryDataSourceFactory},
        tableinfo::TableMetaData,
    },
    config::{datasource::DataSourceProperties, BootstrapConfig},
    error::Error,
    event::MetaDataEvent,
    mode::ContextManager,
    persist::{
        repository::{MemoryPersistRepository, PersistRepository},
        MetaDataPersistService,
    },
    rule::{
        sharding::{ShardingRuleConfiguration, ShardingTableRuleConfiguration},
        transaction::{TransactionRuleConfiguration, TransactionType},
        RuleConfiguration,
    },
    types::LogicalType,
};

const CONFIG: &str = r#"{
    "databases": {
        "sharding_db": {
            "data_sources": {"ds_0": {"url": "mem://it_0"}},
            "rules": [{
                "type": "sharding",
                "tables": [{"logic_table": "t_order", "actual_data_nodes": ["ds_0.t_order_0", "ds_0.t_order_1"]}]
            }]
        }
    },
    "shards": {
        "mem://it_0": {
            "sharding_db": [
                {"name": "t_user", "columns": [{"name": "user_id", "data_type": "Int64", "primary_key": true}]},
                {"name": "t_order_0", "columns": [{"name": "order_id", "data_type": "Int64", "primary_key": true}]},
                {"name": "t_order_1", "columns": [{"name": "order_id", "data_type": "Int64", "primary_key": true}]}
            ]
        }
    }
}"#;

struct Fixture {
    factory: Arc<MemoryDataSourceFactory>,
    repository: Arc<MemoryPersistRepository>,
    manager: ContextManager,
}

fn fixture(config: &BootstrapConfig) -> Fixture {
    let factory = Arc::new(MemoryDataSourceFactory::new());
    config.seed(&factory);
    let repository = Arc::new(MemoryPersistRepository::new());
    let service = Arc::new(MetaDataPersistService::new(repository.clone()));
    let manager = ContextManager::from_config(config, factory.clone(), Some(service)).unwrap();
    Fixture {
        factory,
        repository,
        manager,
    }
}

fn sharding_fixture() -> Fixture {
    fixture(&BootstrapConfig::from_json(CONFIG).unwrap())
}

fn table(name: &str) -> TableMetaData {
    TableMetaData::new(
        name,
        vec![ColumnMetaData::new("user_id", LogicalType::Int64, true)],
        vec![],
        vec![],
    )
}

fn props(url: &str) -> BTreeMap<String, DataSourceProperties> {
    let mut result = BTreeMap::new();
    result.insert("ds_0".to_owned(), DataSourceProperties::new(url));
    result
}

#[test]
fn test_bootstrap_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(CONFIG.as_bytes()).unwrap();
    let config = BootstrapConfig::from_file(file.path()).unwrap();
    let Fixture {
        repository, manager, ..
    } = fixture(&config);

    let database = manager.database("SHARDING_DB").unwrap();
    let schema = database.schema("sharding_db").unwrap();
    assert_eq!(schema.all_table_names(), vec!["t_order", "t_user"]);
    let single = database.rule_meta_data().single_table_rule().unwrap();
    assert!(single.contains("sharding_db", "t_user"));
    assert!(!single.contains("sharding_db", "t_order_0"));
    assert!(repository
        .get("/metadata/sharding_db/schemas/sharding_db/tables/t_order")
        .unwrap()
        .is_some());
    let names = MetaDataPersistService::new(repository).load_all_database_names().unwrap();
    assert!(names.contains(&"sharding_db".to_owned()));
}

#[test]
fn test_add_database_is_idempotent() {
    let Fixture { manager, .. } = sharding_fixture();
    let before = manager.database("sharding_db").unwrap();
    let engine = manager.transaction_engine("sharding_db").unwrap();

    manager.add_database("sharding_db").unwrap();

    assert!(Arc::ptr_eq(&before, &manager.database("sharding_db").unwrap()));
    assert!(Arc::ptr_eq(&engine, &manager.transaction_engine("sharding_db").unwrap()));
    assert!(!engine.is_closed());
}

#[test]
fn test_add_database_registers_empty_database() {
    let Fixture {
        repository, manager, ..
    } = sharding_fixture();
    manager.add_database("foo_db").unwrap();

    let contexts = manager.meta_data_contexts();
    let database = contexts.database("foo_db").unwrap();
    assert!(database.rule_meta_data().rules().is_empty());
    assert!(database.resource().is_empty());
    assert!(database.schema("foo_db").unwrap().is_empty());
    let federation = contexts.optimizer_context().federation_database("foo_db").unwrap();
    assert!(federation.schema("foo_db").is_some());
    assert!(contexts.optimizer_context().planner_context("foo_db").is_some());
    assert!(manager.transaction_engine("foo_db").is_some());
    assert!(repository.get("/metadata/foo_db").unwrap().is_some());
}

#[test]
fn test_refresh_rename_table() {
    let Fixture {
        factory,
        repository,
        manager,
    } = sharding_fixture();
    let events = manager.event_bus().subscribe();
    let shard = factory.shard("mem://it_0");
    shard.drop_table("sharding_db", "t_user");
    shard.create_table("sharding_db", table("t_member"));

    let statement = Statement::AlterTable(AlterTableStmt {
        table: Some(SimpleTableSegment::new("t_user")),
        rename_table: Some(SimpleTableSegment::new("t_member")),
        ..Default::default()
    });
    manager
        .refresh("sharding_db", "sharding_db", &["ds_0".to_owned()], &statement)
        .unwrap();

    let contexts = manager.meta_data_contexts();
    let database = contexts.database("sharding_db").unwrap();
    assert!(database.contains_table("sharding_db", "t_member"));
    assert!(!database.contains_table("sharding_db", "t_user"));
    let planner = contexts.optimizer_context().planner_context("sharding_db").unwrap();
    assert!(planner.info_by_name("sharding_db", "t_member").is_some());
    assert!(planner.info_by_name("sharding_db", "t_user").is_none());
    let single = database.rule_meta_data().single_table_rule().unwrap();
    assert!(single.contains("sharding_db", "t_member"));
    assert!(!single.contains("sharding_db", "t_user"));

    assert!(repository
        .get("/metadata/sharding_db/schemas/sharding_db/tables/t_member")
        .unwrap()
        .is_some());
    assert!(repository
        .get("/metadata/sharding_db/schemas/sharding_db/tables/t_user")
        .unwrap()
        .is_none());

    let received: Vec<MetaDataEvent> = events.try_iter().collect();
    assert_eq!(received.len(), 1);
    match &received[0] {
        MetaDataEvent::SchemaAltered {
            altered_tables,
            dropped_tables,
            ..
        } => {
            assert_eq!(altered_tables, &vec!["t_member".to_owned()]);
            assert_eq!(dropped_tables, &vec!["t_user".to_owned()]);
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[test]
fn test_failed_refresh_keeps_snapshot() {
    let Fixture { factory, manager, .. } = sharding_fixture();
    let events = manager.event_bus().subscribe();
    factory.shard("mem://it_0").create_table("sharding_db", table("t_new"));
    for (_, ds) in manager.data_source_map("sharding_db").unwrap() {
        ds.close().unwrap();
    }
    let before = manager.meta_data_contexts();

    let statement = Statement::CreateTable(CreateTableStmt {
        table: SimpleTableSegment::new("t_new"),
        columns: vec![],
        if_not_exists: false,
    });
    let result = manager.refresh("sharding_db", "sharding_db", &["ds_0".to_owned()], &statement);

    assert!(matches!(result, Err(Error::DataSource(_))));
    assert!(Arc::ptr_eq(&before, &manager.meta_data_contexts()));
    assert!(events.try_recv().is_err());
}

#[test]
fn test_replaced_pools_closed_after_publish() {
    let Fixture { factory, manager, .. } = sharding_fixture();
    factory.shard("mem://it_1").create_schema("sharding_db");
    let old_snapshot = manager.meta_data_contexts();
    let old_pool = manager.data_source_map("sharding_db").unwrap()[0].1.clone();
    let old_engine = manager.transaction_engine("sharding_db").unwrap();

    let broken = RuleConfiguration::Sharding(ShardingRuleConfiguration {
        tables: vec![ShardingTableRuleConfiguration {
            logic_table: "t_order".to_owned(),
            actual_data_nodes: vec!["ds_9.t_order_0".to_owned()],
        }],
        ..Default::default()
    });
    let result =
        manager.alter_data_source_and_rule_configuration("sharding_db", &props("mem://it_1"), vec![broken]);
    assert!(matches!(result, Err(Error::Config(_))));
    assert!(Arc::ptr_eq(&old_snapshot, &manager.meta_data_contexts()));
    assert!(!old_pool.is_closed());
    assert!(!old_engine.is_closed());
    // the pool opened for the rejected change is released again
    assert!(factory.created().last().unwrap().is_closed());

    manager.alter_resource("sharding_db", &props("mem://it_1")).unwrap();

    let new_pool = manager.data_source_map("sharding_db").unwrap()[0].1.clone();
    assert_eq!(new_pool.properties().url, "mem://it_1");
    assert!(!new_pool.is_closed());
    assert!(old_pool.is_closed());
    assert!(old_engine.is_closed());
    let new_engine = manager.transaction_engine("sharding_db").unwrap();
    assert!(!new_engine.is_closed());
    assert!(!Arc::ptr_eq(&old_engine, &new_engine));

    assert!(old_snapshot
        .database("sharding_db")
        .unwrap()
        .contains_table("sharding_db", "t_user"));
    assert!(!manager
        .database("sharding_db")
        .unwrap()
        .contains_table("sharding_db", "t_user"));
}

#[test]
fn test_alter_data_source_configuration_drops_missing() {
    let Fixture {
        repository, manager, ..
    } = sharding_fixture();
    let mut data_sources = props("mem://it_0");
    data_sources.insert("ds_1".to_owned(), DataSourceProperties::new("mem://it_2"));
    manager.add_resource("sharding_db", &data_sources).unwrap();
    assert_eq!(manager.data_source_map("sharding_db").unwrap().len(), 2);
    let ds_1 = manager.data_source_map("sharding_db").unwrap()[1].1.clone();

    manager
        .alter_data_source_configuration("sharding_db", &props("mem://it_0"))
        .unwrap();
    let names: Vec<String> = manager
        .data_source_map("sharding_db")
        .unwrap()
        .into_iter()
        .map(|(name, _)| name)
        .collect();
    assert_eq!(names, vec!["ds_0"]);
    assert!(ds_1.is_closed());
    let persisted = MetaDataPersistService::new(repository)
        .load_data_sources("sharding_db")
        .unwrap();
    assert_eq!(persisted.keys().collect::<Vec<_>>(), vec!["ds_0"]);

    manager.add_resource("sharding_db", &data_sources).unwrap();
    manager.drop_resource("sharding_db", &["ds_1".to_owned()]).unwrap();
    assert_eq!(manager.data_source_map("sharding_db").unwrap().len(), 1);
}

#[test]
fn test_transaction_rule_change_renews_engines() {
    let Fixture { manager, .. } = sharding_fixture();
    let local = manager.transaction_engine("sharding_db").unwrap();
    assert_eq!(local.transaction_type(), TransactionType::Local);

    let xa = RuleConfiguration::Transaction(TransactionRuleConfiguration {
        default_type: TransactionType::XA,
        ..Default::default()
    });
    manager.alter_global_rule_configuration(vec![xa.clone()]).unwrap();
    let renewed = manager.transaction_engine("sharding_db").unwrap();
    assert_eq!(renewed.transaction_type(), TransactionType::XA);
    assert!(local.is_closed());

    manager.alter_global_rule_configuration(vec![xa]).unwrap();
    assert!(Arc::ptr_eq(&renewed, &manager.transaction_engine("sharding_db").unwrap()));
}

#[test]
fn test_persist_failure_keeps_published_snapshot() {
    let Fixture {
        repository, manager, ..
    } = sharding_fixture();
    repository.set_unavailable(true);
    manager.add_database("foo_db").unwrap();
    assert!(manager
        .database("foo_db")
        .unwrap()
        .rule_meta_data()
        .rules()
        .is_empty());
    assert!(manager.transaction_engine("foo_db").is_some());

    repository.set_unavailable(false);
    assert!(repository.get("/metadata/foo_db").unwrap().is_none());
}

#[test]
fn test_drop_database_keeps_old_snapshot() {
    let Fixture {
        repository, manager, ..
    } = sharding_fixture();
    let old = manager.meta_data_contexts();
    let engine = manager.transaction_engine("sharding_db").unwrap();

    manager.drop_database("sharding_db").unwrap();

    assert!(manager.database("sharding_db").is_none());
    assert!(manager.transaction_engine("sharding_db").is_none());
    assert!(engine.is_closed());
    assert!(old.contains_database("sharding_db"));
    assert!(old.optimizer_context().planner_context("sharding_db").is_some());
    assert!(manager
        .meta_data_contexts()
        .optimizer_context()
        .planner_context("sharding_db")
        .is_none());
    assert!(repository.get("/metadata/sharding_db").unwrap().is_none());
}

#[test]
fn test_readers_see_consistent_snapshots() {
    let Fixture { manager, .. } = sharding_fixture();
    std::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                for _ in 0..200 {
                    let contexts = manager.meta_data_contexts();
                    let database = contexts.database("sharding_db").unwrap();
                    let federation = contexts
                        .optimizer_context()
                        .federation_database("sharding_db")
                        .unwrap();
                    let schemas: BTreeSet<&String> = database.schemas().keys().collect();
                    let federated: BTreeSet<&String> = federation.schemas().keys().collect();
                    assert_eq!(schemas, federated);
                }
            });
        }
        s.spawn(|| {
            for i in 0..50 {
                let name = format!("archive_{i}");
                manager.add_schema("sharding_db", &name).unwrap();
                if i % 2 == 0 {
                    manager.drop_schema("sharding_db", &name).unwrap();
                }
            }
        });
    });
    let database = manager.database("sharding_db").unwrap();
    assert!(database.schema("archive_1").is_some());
    assert!(database.schema("archive_0").is_none());
}
