use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use log::{debug, error, info, warn};
use parking_lot::{Mutex, RwLock};

use super::{builder::MetaDataContextsBuilder, contexts::MetaDataContexts};
use crate::{
    ast::Statement,
    catalog::{
        loader::TableMetaDataLoader,
        resource::{DataSourceFactory, DataSourceRef, Resource},
        schema::Schema,
        tableinfo::TableMetaData,
        Database,
    },
    config::{datasource::DataSourceProperties, props::ConfigurationProperties, BootstrapConfig, DatabaseConfiguration},
    error::{Error::MetaData, Result},
    event::{EventBus, MetaDataEvent},
    fmt_err,
    persist::MetaDataPersistService,
    planner::federation::{FederationDatabaseMetaData, FederationSchemaMetaData},
    refresher::{RefreshFragment, RefresherRegistry},
    rule::{build_database_rules, build_global_rules, RuleConfiguration},
    transaction::{TransactionContexts, TransactionManagerEngine},
};

/// Data sources of a database after a reconfiguration, plus the pools it obsoletes.
struct DataSourceChange {
    data_sources: Vec<(String, DataSourceRef)>,
    created: Vec<DataSourceRef>,
    pending_close: Vec<DataSourceRef>,
}

impl DataSourceChange {
    fn unchanged(resource: &Resource) -> Self {
        Self {
            data_sources: resource.data_sources().to_vec(),
            created: vec![],
            pending_close: vec![],
        }
    }

    // pools opened for a change that never got published
    fn discard(self, resource: &Resource) {
        for ds in &self.created {
            resource.close(ds);
        }
    }
}

/// Owner of the published metadata snapshot and of the per-database transaction engines.
///
/// Readers take the current snapshot with `meta_data_contexts()` and keep it for the
/// whole statement. Every mutation runs under one write gate, builds a new snapshot
/// and publishes it with a single pointer swap. Stale transaction engines and pools
/// are closed only after that swap. Persistence is best effort: a failure is logged
/// and the published snapshot stays.
pub struct ContextManager {
    meta_data_contexts: RwLock<Arc<MetaDataContexts>>,
    transaction_contexts: RwLock<TransactionContexts>,
    write_gate: Mutex<()>,
    event_bus: Arc<EventBus>,
    data_source_factory: Arc<dyn DataSourceFactory>,
}

impl ContextManager {
    pub fn new(
        meta_data_contexts: MetaDataContexts,
        data_source_factory: Arc<dyn DataSourceFactory>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        let mut transaction_contexts = TransactionContexts::default();
        for database in meta_data_contexts.databases().values() {
            transaction_contexts.put(TransactionManagerEngine::new(
                database.name(),
                database.resource(),
                meta_data_contexts.global_rule_meta_data().transaction_rule(),
            ));
        }
        Self {
            meta_data_contexts: RwLock::new(Arc::new(meta_data_contexts)),
            transaction_contexts: RwLock::new(transaction_contexts),
            write_gate: Mutex::new(()),
            event_bus,
            data_source_factory,
        }
    }

    /// Build a coordinator from a bootstrap configuration and persist what it loaded.
    pub fn from_config(
        config: &BootstrapConfig,
        data_source_factory: Arc<dyn DataSourceFactory>,
        persist_service: Option<Arc<MetaDataPersistService>>,
    ) -> Result<Self> {
        let contexts = MetaDataContextsBuilder::from_config(config, data_source_factory.as_ref())?
            .build(persist_service)?;
        let manager = Self::new(contexts, data_source_factory, Arc::new(EventBus::new()));
        manager.persist_all();
        info!(
            "context manager ready with databases {:?}",
            manager.all_database_names()
        );
        Ok(manager)
    }

    pub fn meta_data_contexts(&self) -> Arc<MetaDataContexts> {
        Arc::clone(&self.meta_data_contexts.read())
    }

    pub fn database(&self, database_name: &str) -> Option<Arc<Database>> {
        self.meta_data_contexts().database(database_name).cloned()
    }

    pub fn all_database_names(&self) -> Vec<String> {
        self.meta_data_contexts().all_database_names()
    }

    pub fn data_source_map(&self, database_name: &str) -> Result<Vec<(String, DataSourceRef)>> {
        let contexts = self.meta_data_contexts();
        Ok(require_database(&contexts, database_name)?
            .resource()
            .data_sources()
            .to_vec())
    }

    pub fn transaction_engine(&self, database_name: &str) -> Option<Arc<TransactionManagerEngine>> {
        self.transaction_contexts.read().get(database_name).cloned()
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    /// Add an empty database; a no-op when the name is taken.
    pub fn add_database(&self, database_name: &str) -> Result<()> {
        let _gate = self.write_gate.lock();
        let current = self.meta_data_contexts();
        if current.contains_database(database_name) {
            debug!("database {database_name} exists, skip add");
            return Ok(());
        }
        let database = Database::create(
            database_name,
            current.protocol_type(),
            &DatabaseConfiguration::default(),
            current.props(),
        )?;
        let federation = FederationDatabaseMetaData::from_database(&database);
        self.publish(current.with_database(database, federation)?);
        self.renew_transaction_context(database_name);
        info!("add database {database_name}");

        let contexts = self.meta_data_contexts();
        if let Some(database) = contexts.database(database_name) {
            self.persist(&contexts, "database", |service| {
                service.persist_database(database_name)?;
                for (schema_name, schema) in database.schemas() {
                    service.persist_tables(database_name, schema_name, schema)?;
                }
                Ok(())
            });
        }
        Ok(())
    }

    pub fn drop_database(&self, database_name: &str) -> Result<()> {
        let _gate = self.write_gate.lock();
        let current = self.meta_data_contexts();
        let removed = match current.database(database_name) {
            Some(database) => Arc::clone(database),
            None => return Ok(()),
        };
        self.publish(current.without_database(database_name));
        if let Some(engine) = self.transaction_contexts.write().remove(database_name) {
            engine.close();
        }
        for (_, ds) in removed.resource().data_sources() {
            removed.resource().close(ds);
        }
        info!("drop database {database_name}");
        self.persist(&current, "database", |service| service.delete_database(database_name));
        Ok(())
    }

    /// Add an empty schema; a no-op when it exists.
    pub fn add_schema(&self, database_name: &str, schema_name: &str) -> Result<()> {
        let _gate = self.write_gate.lock();
        let current = self.meta_data_contexts();
        let database = require_database(&current, database_name)?;
        if database.schema(schema_name).is_some() {
            return Ok(());
        }
        let mut database = Database::clone(database);
        database.put_schema(schema_name, Arc::new(Schema::default()));
        let mut federation = federation_of(&current, &database);
        federation.put_schema(FederationSchemaMetaData::new(&schema_name.to_lowercase()));
        self.publish(current.with_database(database, federation)?);
        self.persist(&current, "schema", |service| service.persist_schema(database_name, schema_name));
        Ok(())
    }

    pub fn drop_schema(&self, database_name: &str, schema_name: &str) -> Result<()> {
        let _gate = self.write_gate.lock();
        let current = self.meta_data_contexts();
        let database = match current.database(database_name) {
            Some(database) if database.schema(schema_name).is_some() => database,
            _ => return Ok(()),
        };
        let mut database = Database::clone(database);
        database.remove_schema(schema_name);
        let mut federation = federation_of(&current, &database);
        federation.remove_schema(schema_name);
        self.publish(current.with_database(database, federation)?);
        self.persist(&current, "schema", |service| service.delete_schema(database_name, schema_name));
        Ok(())
    }

    /// Replace every schema of a database at once.
    pub fn alter_schemas(&self, database_name: &str, schemas: HashMap<String, Schema>) -> Result<()> {
        let _gate = self.write_gate.lock();
        self.replace_schemas(database_name, schemas)
    }

    /// Apply a table change observed elsewhere, e.g. on another instance sharing the
    /// repository. Unknown databases are ignored.
    pub fn alter_schema(
        &self,
        database_name: &str,
        schema_name: &str,
        changed_table: Option<TableMetaData>,
        deleted_table: Option<&str>,
    ) -> Result<()> {
        let _gate = self.write_gate.lock();
        let current = self.meta_data_contexts();
        let database = match current.database(database_name) {
            Some(database) => database,
            None => return Ok(()),
        };
        let mut database = Database::clone(database);
        let mut federation = federation_of(&current, &database);
        if let Some(table) = changed_table {
            if !database
                .rule_meta_data()
                .contains_in_immutable_data_node_rule(&table.name)
            {
                let rules = build_database_rules(
                    database_name,
                    database.protocol_type(),
                    database.resource(),
                    database.rule_meta_data().configurations(),
                )?;
                *database.rule_meta_data_mut() = rules;
            }
            let table = Arc::new(table);
            database
                .schema_mut_or_default(schema_name)
                .put(Arc::clone(&table));
            federation.put_table(schema_name, table);
        }
        if let Some(table_name) = deleted_table {
            if let Some(schema) = database.schema_mut(schema_name) {
                schema.remove(table_name);
                federation.remove_table(schema_name, table_name);
            }
        }
        self.publish(current.with_database(database, federation)?);
        Ok(())
    }

    /// Add data sources to a database; a name already present with other properties
    /// replaces the old pool.
    pub fn add_resource(&self, database_name: &str, data_source_props: &BTreeMap<String, DataSourceProperties>) -> Result<()> {
        let _gate = self.write_gate.lock();
        let current = self.meta_data_contexts();
        let database = require_database(&current, database_name)?;
        let change = self.upsert_data_sources(database.resource(), data_source_props, false)?;
        let rule_configs = database.rule_meta_data().configurations().to_vec();
        self.apply_database_change(&current, database_name, change, rule_configs)
    }

    pub fn alter_resource(&self, database_name: &str, data_source_props: &BTreeMap<String, DataSourceProperties>) -> Result<()> {
        self.add_resource(database_name, data_source_props)
    }

    pub fn drop_resource(&self, database_name: &str, data_source_names: &[String]) -> Result<()> {
        let _gate = self.write_gate.lock();
        let current = self.meta_data_contexts();
        let database = require_database(&current, database_name)?;
        let mut change = DataSourceChange::unchanged(database.resource());
        for name in data_source_names {
            if !database.resource().contains(name) {
                warn!("data source {name} is not part of {database_name}, skip drop");
            }
        }
        let (dropped, kept) = change
            .data_sources
            .drain(..)
            .partition::<Vec<_>, _>(|(name, _)| data_source_names.contains(name));
        change.data_sources = kept;
        change.pending_close = dropped.into_iter().map(|(_, ds)| ds).collect();
        let rule_configs = database.rule_meta_data().configurations().to_vec();
        self.apply_database_change(&current, database_name, change, rule_configs)
    }

    pub fn alter_rule_configuration(&self, database_name: &str, rule_configs: Vec<RuleConfiguration>) -> Result<()> {
        let _gate = self.write_gate.lock();
        let current = self.meta_data_contexts();
        let database = require_database(&current, database_name)?;
        let change = DataSourceChange::unchanged(database.resource());
        self.apply_database_change(&current, database_name, change, rule_configs)
            .map_err(|e| {
                error!("alter rule configuration of {database_name} failed: {e}");
                e
            })
    }

    /// Make `data_source_props` the complete data source set of the database: missing
    /// names are dropped, changed ones rebuilt, new ones created.
    pub fn alter_data_source_configuration(
        &self,
        database_name: &str,
        data_source_props: &BTreeMap<String, DataSourceProperties>,
    ) -> Result<()> {
        let _gate = self.write_gate.lock();
        let current = self.meta_data_contexts();
        let database = require_database(&current, database_name)?;
        let change = self.upsert_data_sources(database.resource(), data_source_props, true)?;
        let rule_configs = database.rule_meta_data().configurations().to_vec();
        self.apply_database_change(&current, database_name, change, rule_configs)
            .map_err(|e| {
                error!("alter data source configuration of {database_name} failed: {e}");
                e
            })
    }

    pub fn alter_data_source_and_rule_configuration(
        &self,
        database_name: &str,
        data_source_props: &BTreeMap<String, DataSourceProperties>,
        rule_configs: Vec<RuleConfiguration>,
    ) -> Result<()> {
        let _gate = self.write_gate.lock();
        let current = self.meta_data_contexts();
        let database = require_database(&current, database_name)?;
        let change = self.upsert_data_sources(database.resource(), data_source_props, true)?;
        self.apply_database_change(&current, database_name, change, rule_configs)
            .map_err(|e| {
                error!("alter data source and rule configuration of {database_name} failed: {e}");
                e
            })
    }

    /// Replace the global rules. Transaction engines are rebuilt only when the
    /// transaction rule configuration really changed.
    pub fn alter_global_rule_configuration(&self, rule_configs: Vec<RuleConfiguration>) -> Result<()> {
        if rule_configs.is_empty() {
            return Ok(());
        }
        let _gate = self.write_gate.lock();
        let current = self.meta_data_contexts();
        let global = build_global_rules(&rule_configs);
        let renew = global.transaction_rule_configuration()
            != current.global_rule_meta_data().transaction_rule_configuration()
            && global.transaction_rule_configuration().is_some();
        self.publish(current.with_global_rule_meta_data(global));
        if renew {
            for name in current.databases().keys() {
                self.renew_transaction_context(name);
            }
        }
        self.persist(&current, "global rules", |service| {
            service.persist_global_rule_configs(&rule_configs)
        });
        Ok(())
    }

    pub fn alter_properties(&self, props: BTreeMap<String, String>) -> Result<()> {
        let props = ConfigurationProperties::new(props)?;
        let _gate = self.write_gate.lock();
        let current = self.meta_data_contexts();
        self.publish(current.with_props(props.clone()));
        self.persist(&current, "props", |service| service.persist_props(&props));
        Ok(())
    }

    /// Reload every schema of a database from its shards.
    pub fn reload_meta_data(&self, database_name: &str, schema_name: &str) -> Result<()> {
        let _gate = self.write_gate.lock();
        let current = self.meta_data_contexts();
        let database = require_database(&current, database_name)?;
        let schemas = {
            let materials = database.materials(current.props(), &database.default_schema_name());
            TableMetaDataLoader::load_schemas(&materials)
        };
        match schemas {
            Ok(schemas) => self.replace_schemas(database_name, schemas),
            Err(e) => {
                error!("reload meta data of {database_name}.{schema_name} failed: {e}");
                Err(e)
            }
        }
    }

    pub fn reload_table_meta_data(&self, database_name: &str, schema_name: &str, table_name: &str) -> Result<()> {
        let _gate = self.write_gate.lock();
        let current = self.meta_data_contexts();
        let database = require_database(&current, database_name)?;
        let loaded = TableMetaDataLoader::load(
            &[table_name.to_owned()],
            schema_name,
            &database.materials(current.props(), schema_name),
        );
        self.put_reloaded_table(&current, database_name, schema_name, table_name, loaded)
    }

    /// Reload one table from a single data source of the database.
    pub fn reload_table_meta_data_on(
        &self,
        database_name: &str,
        schema_name: &str,
        table_name: &str,
        data_source_name: &str,
    ) -> Result<()> {
        let _gate = self.write_gate.lock();
        let current = self.meta_data_contexts();
        let database = require_database(&current, database_name)?;
        let ds = database.resource().data_source(data_source_name).ok_or_else(|| {
            MetaData(fmt_err!("data source {data_source_name} is not part of {database_name}"))
        })?;
        let single = Resource::new(vec![(data_source_name.to_owned(), Arc::clone(ds))]);
        let mut materials = database.materials(current.props(), schema_name);
        materials.resource = &single;
        let loaded = TableMetaDataLoader::load(&[table_name.to_owned()], schema_name, &materials);
        self.put_reloaded_table(&current, database_name, schema_name, table_name, loaded)
    }

    /// Apply the metadata effect of a DDL statement that already ran on the shards.
    ///
    /// The refresher works on a private copy of the database; only a complete refresh
    /// is published, together with the rebuilt planner context. Events are posted
    /// after publication.
    pub fn refresh(
        &self,
        database_name: &str,
        schema_name: &str,
        logic_data_source_names: &[String],
        statement: &Statement,
    ) -> Result<()> {
        let registry = RefresherRegistry::global();
        if !registry.contains(statement.kind()) {
            return Ok(());
        }
        let _gate = self.write_gate.lock();
        let current = self.meta_data_contexts();
        let database = require_database(&current, database_name)?;
        let mut fragment = RefreshFragment::new(
            Database::clone(database),
            federation_of(&current, database),
        );
        if let Err(e) = registry.refresh(
            &mut fragment,
            logic_data_source_names,
            schema_name,
            statement,
            current.props(),
        ) {
            error!("refresh {database_name}.{schema_name} by {statement} failed: {e}");
            return Err(e);
        }

        let RefreshFragment {
            database,
            federation,
            events,
        } = fragment;
        self.publish(current.with_database(database, federation)?);
        let published = self.meta_data_contexts();
        for event in events {
            self.persist_event(&published, &event);
            self.event_bus.post(event);
        }
        Ok(())
    }

    pub fn renew_all_transaction_contexts(&self) {
        let _gate = self.write_gate.lock();
        for name in self.meta_data_contexts().databases().keys() {
            self.renew_transaction_context(name);
        }
    }

    /// Close every transaction engine, pool and the repository.
    pub fn close(&self) {
        let _gate = self.write_gate.lock();
        self.transaction_contexts.read().close();
        let contexts = self.meta_data_contexts();
        for database in contexts.databases().values() {
            for (_, ds) in database.resource().data_sources() {
                database.resource().close(ds);
            }
        }
        if let Some(service) = contexts.persist_service() {
            service.repository().close();
        }
        info!("context manager closed");
    }

    fn publish(&self, contexts: MetaDataContexts) {
        *self.meta_data_contexts.write() = Arc::new(contexts);
    }

    // the new engine goes live before the stale one is closed
    fn renew_transaction_context(&self, database_name: &str) {
        let contexts = self.meta_data_contexts();
        let database = match contexts.database(database_name) {
            Some(database) => database,
            None => return,
        };
        let engine = TransactionManagerEngine::new(
            database.name(),
            database.resource(),
            contexts.global_rule_meta_data().transaction_rule(),
        );
        let stale = self.transaction_contexts.write().put(engine);
        if let Some(stale) = stale {
            stale.close();
        }
    }

    fn upsert_data_sources(
        &self,
        resource: &Resource,
        data_source_props: &BTreeMap<String, DataSourceProperties>,
        drop_missing: bool,
    ) -> Result<DataSourceChange> {
        let mut change = DataSourceChange {
            data_sources: vec![],
            created: vec![],
            pending_close: vec![],
        };
        for (name, ds) in resource.data_sources() {
            match data_source_props.get(name) {
                None if drop_missing => change.pending_close.push(Arc::clone(ds)),
                Some(props) if props != ds.properties() => {
                    let created = match self.data_source_factory.create(name, props) {
                        Ok(created) => created,
                        Err(e) => {
                            change.discard(resource);
                            return Err(e);
                        }
                    };
                    change.created.push(Arc::clone(&created));
                    change.pending_close.push(Arc::clone(ds));
                    change.data_sources.push((name.clone(), created));
                }
                _ => change.data_sources.push((name.clone(), Arc::clone(ds))),
            }
        }
        for (name, props) in data_source_props {
            if resource.contains(name) {
                continue;
            }
            match self.data_source_factory.create(name, props) {
                Ok(created) => {
                    change.created.push(Arc::clone(&created));
                    change.data_sources.push((name.clone(), created));
                }
                Err(e) => {
                    change.discard(resource);
                    return Err(e);
                }
            }
        }
        Ok(change)
    }

    // rebuild rules and schemas of one database over the changed data sources, publish,
    // renew its transaction engine and only then close the pools it replaced
    fn apply_database_change(
        &self,
        current: &MetaDataContexts,
        database_name: &str,
        change: DataSourceChange,
        rule_configs: Vec<RuleConfiguration>,
    ) -> Result<()> {
        let resource = match current.database(database_name) {
            Some(database) => Arc::clone(database.resource()),
            None => Arc::new(Resource::default()),
        };
        let config = DatabaseConfiguration::new(change.data_sources.clone(), rule_configs);
        let built = Database::create(database_name, current.protocol_type(), &config, current.props())
            .and_then(|database| {
                let federation = FederationDatabaseMetaData::from_database(&database);
                current.with_database(database, federation)
            });
        let contexts = match built {
            Ok(contexts) => contexts,
            Err(e) => {
                change.discard(&resource);
                return Err(e);
            }
        };
        self.publish(contexts);
        self.renew_transaction_context(database_name);
        for ds in &change.pending_close {
            resource.close(ds);
        }
        debug!(
            "database {database_name} now on {:?}, closed {} pools",
            config.data_sources.iter().map(|(name, _)| name).collect::<Vec<_>>(),
            change.pending_close.len()
        );

        let published = self.meta_data_contexts();
        if let Some(database) = published.database(database_name) {
            self.persist(&published, "database configuration", |service| {
                service.persist_database_configuration(
                    database_name,
                    &config.data_source_props,
                    &config.rule_configs,
                    database.schemas(),
                )
            });
        }
        Ok(())
    }

    fn replace_schemas(&self, database_name: &str, schemas: HashMap<String, Schema>) -> Result<()> {
        let current = self.meta_data_contexts();
        let database = require_database(&current, database_name)?;
        let database = database.with_schemas(
            schemas
                .into_iter()
                .map(|(name, schema)| (name, Arc::new(schema)))
                .collect(),
        );
        let federation = FederationDatabaseMetaData::from_database(&database);
        self.publish(current.with_database(database, federation)?);

        let published = self.meta_data_contexts();
        if let Some(database) = published.database(database_name) {
            self.persist(&published, "schemas", |service| {
                for (schema_name, schema) in database.schemas() {
                    service.persist_tables(database_name, schema_name, schema)?;
                }
                Ok(())
            });
        }
        Ok(())
    }

    fn put_reloaded_table(
        &self,
        current: &MetaDataContexts,
        database_name: &str,
        schema_name: &str,
        table_name: &str,
        loaded: Result<Vec<TableMetaData>>,
    ) -> Result<()> {
        let table = match loaded {
            Ok(tables) => match tables.into_iter().next() {
                Some(table) => Arc::new(table),
                None => {
                    debug!("table {database_name}.{schema_name}.{table_name} not found on shards");
                    return Ok(());
                }
            },
            Err(e) => {
                error!("reload table {database_name}.{schema_name}.{table_name} failed: {e}");
                return Err(e);
            }
        };
        let database = require_database(current, database_name)?;
        let mut database = Database::clone(database);
        let mut federation = federation_of(current, &database);
        database
            .schema_mut_or_default(schema_name)
            .put(Arc::clone(&table));
        federation.put_table(schema_name, Arc::clone(&table));
        self.publish(current.with_database(database, federation)?);
        self.persist(current, "table", |service| {
            service.persist_table(database_name, schema_name, &table)
        });
        Ok(())
    }

    fn persist_event(&self, contexts: &MetaDataContexts, event: &MetaDataEvent) {
        match event {
            MetaDataEvent::SchemaAltered {
                database_name,
                schema_name,
                altered_tables,
                dropped_tables,
                ..
            } => self.persist(contexts, "altered schema", |service| {
                service.persist_schema(database_name, schema_name)?;
                for name in altered_tables {
                    if let Some(table) = contexts
                        .database(database_name)
                        .and_then(|db| db.table(schema_name, name))
                    {
                        service.persist_table(database_name, schema_name, table)?;
                    }
                }
                for name in dropped_tables {
                    service.delete_table(database_name, schema_name, name)?;
                }
                Ok(())
            }),
            MetaDataEvent::SchemaRenamed {
                database_name,
                schema_name,
                rename_schema_name,
                ..
            } => self.persist(contexts, "renamed schema", |service| {
                service.delete_schema(database_name, schema_name)?;
                if let Some(schema) = contexts
                    .database(database_name)
                    .and_then(|db| db.schema(rename_schema_name))
                {
                    service.persist_tables(database_name, rename_schema_name, schema)?;
                }
                Ok(())
            }),
        }
    }

    fn persist_all(&self) {
        let contexts = self.meta_data_contexts();
        self.persist(&contexts, "bootstrap meta data", |service| {
            service.persist_props(contexts.props())?;
            service.persist_global_rule_configs(contexts.global_rule_meta_data().configurations())?;
            for database in contexts.databases().values() {
                let data_sources = database
                    .resource()
                    .data_sources()
                    .iter()
                    .map(|(name, ds)| (name.clone(), ds.properties().clone()))
                    .collect();
                service.persist_database_configuration(
                    database.name(),
                    &data_sources,
                    database.rule_meta_data().configurations(),
                    database.schemas(),
                )?;
            }
            Ok(())
        });
    }

    fn persist<F>(&self, contexts: &MetaDataContexts, what: &str, f: F)
    where
        F: FnOnce(&MetaDataPersistService) -> Result<()>,
    {
        if let Some(service) = contexts.persist_service() {
            if let Err(e) = f(service) {
                warn!("persist {what} failed, in-memory meta data is kept: {e}");
            }
        }
    }
}

fn require_database<'a>(contexts: &'a MetaDataContexts, database_name: &str) -> Result<&'a Arc<Database>> {
    contexts
        .database(database_name)
        .ok_or_else(|| MetaData(fmt_err!("unknown database {database_name}")))
}

// owned copy of the federation metadata of `database`, mirrored from it when missing
fn federation_of(contexts: &MetaDataContexts, database: &Database) -> FederationDatabaseMetaData {
    contexts
        .optimizer_context()
        .federation_database(database.name())
        .map(|federation| FederationDatabaseMetaData::clone(federation))
        .unwrap_or_else(|| FederationDatabaseMetaData::from_database(database))
}
