pub mod index;
pub mod schema;
pub mod table;
pub mod view;

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use log::debug;

use self::{
    index::{AlterIndexRefresher, CreateIndexRefresher, DropIndexRefresher},
    schema::{AlterSchemaRefresher, CreateSchemaRefresher, DropSchemaRefresher},
    table::{AlterTableRefresher, CreateTableRefresher, DropTableRefresher},
    view::{AlterViewRefresher, CreateViewRefresher, DropViewRefresher},
};
use crate::{
    ast::{Statement, StatementKind},
    catalog::{loader::TableMetaDataLoader, schema::Schema, tableinfo::TableMetaData, Database},
    config::props::ConfigurationProperties,
    error::Result,
    event::MetaDataEvent,
    planner::federation::FederationDatabaseMetaData,
};

/// Working copy of one database a DDL refresh is applied to.
///
/// Nothing here is visible to readers until the coordinator publishes it; dropping a
/// fragment leaves the published snapshot untouched.
#[derive(Debug, Clone)]
pub struct RefreshFragment {
    pub database: Database,
    pub federation: FederationDatabaseMetaData,
    pub events: Vec<MetaDataEvent>,
}

impl RefreshFragment {
    pub fn new(database: Database, federation: FederationDatabaseMetaData) -> Self {
        Self {
            database,
            federation,
            events: vec![],
        }
    }

    /// Load `table_name` of `schema_name` from its shard and make it visible in the
    /// schema map and federation metadata. Tables not placed by an immutable rule are
    /// first tracked as single tables on the first logic data source.
    ///
    /// Returns the loaded table, `None` when no shard has it.
    pub fn put_table(
        &mut self,
        logic_data_source_names: &[String],
        schema_name: &str,
        table_name: &str,
        props: &ConfigurationProperties,
    ) -> Result<Option<Arc<TableMetaData>>> {
        self.put_data_node(logic_data_source_names, schema_name, table_name);
        let loaded = TableMetaDataLoader::load(
            &[table_name.to_owned()],
            schema_name,
            &self.database.materials(props, schema_name),
        )?;
        let table = match loaded.into_iter().next() {
            Some(table) => Arc::new(table),
            None => {
                debug!("no shard has {schema_name}.{table_name}, skip put");
                return Ok(None);
            }
        };
        self.schema_mut(schema_name).put(Arc::clone(&table));
        self.federation.put_table(schema_name, Arc::clone(&table));
        Ok(Some(table))
    }

    /// Drop `table_name` from the schema map, the mutable rules and federation metadata.
    pub fn remove_table(&mut self, schema_name: &str, table_name: &str) {
        if let Some(schema) = self.database.schema_mut(schema_name) {
            schema.remove(table_name);
        }
        self.remove_data_node(schema_name, table_name);
        self.federation.remove_table(schema_name, table_name);
    }

    pub fn put_data_node(&mut self, logic_data_source_names: &[String], schema_name: &str, table_name: &str) {
        if self
            .database
            .rule_meta_data()
            .contains_in_immutable_data_node_rule(table_name)
        {
            return;
        }
        for rule in self.database.rule_meta_data_mut().single_table_rules_mut() {
            // the route wins; the rule's default only covers DDL routed nowhere
            let data_source_name = match logic_data_source_names.first() {
                Some(name) => name.clone(),
                None => match rule.default_data_source() {
                    Some(name) => name.to_owned(),
                    None => continue,
                },
            };
            rule.put(&data_source_name, schema_name, table_name);
        }
    }

    pub fn remove_data_node(&mut self, schema_name: &str, table_name: &str) {
        if self.database.rule_meta_data().single_table_rule().is_none() {
            return;
        }
        for rule in self.database.rule_meta_data_mut().single_table_rules_mut() {
            rule.remove(schema_name, table_name);
        }
    }

    pub fn schema_mut(&mut self, schema_name: &str) -> &mut Schema {
        self.database.schema_mut_or_default(schema_name)
    }

    pub fn post(&mut self, event: MetaDataEvent) {
        self.events.push(event);
    }
}

/// Applies the metadata effect of one executed DDL statement to a fragment.
pub trait MetaDataRefresher: Send + Sync {
    fn refresh(
        &self,
        fragment: &mut RefreshFragment,
        logic_data_source_names: &[String],
        schema_name: &str,
        statement: &Statement,
        props: &ConfigurationProperties,
    ) -> Result<()>;
}

/// Statement kind => refresher.
pub struct RefresherRegistry {
    refreshers: HashMap<StatementKind, Box<dyn MetaDataRefresher>>,
}

impl RefresherRegistry {
    pub fn new() -> Self {
        let mut refreshers: HashMap<StatementKind, Box<dyn MetaDataRefresher>> = HashMap::new();
        refreshers.insert(StatementKind::CreateTable, Box::new(CreateTableRefresher));
        refreshers.insert(StatementKind::AlterTable, Box::new(AlterTableRefresher));
        refreshers.insert(StatementKind::DropTable, Box::new(DropTableRefresher));
        refreshers.insert(StatementKind::CreateView, Box::new(CreateViewRefresher));
        refreshers.insert(StatementKind::AlterView, Box::new(AlterViewRefresher));
        refreshers.insert(StatementKind::DropView, Box::new(DropViewRefresher));
        refreshers.insert(StatementKind::CreateIndex, Box::new(CreateIndexRefresher));
        refreshers.insert(StatementKind::AlterIndex, Box::new(AlterIndexRefresher));
        refreshers.insert(StatementKind::DropIndex, Box::new(DropIndexRefresher));
        refreshers.insert(StatementKind::CreateSchema, Box::new(CreateSchemaRefresher));
        refreshers.insert(StatementKind::AlterSchema, Box::new(AlterSchemaRefresher));
        refreshers.insert(StatementKind::DropSchema, Box::new(DropSchemaRefresher));
        Self { refreshers }
    }

    pub fn global() -> &'static RefresherRegistry {
        static REGISTRY: OnceLock<RefresherRegistry> = OnceLock::new();
        REGISTRY.get_or_init(RefresherRegistry::new)
    }

    pub fn contains(&self, kind: StatementKind) -> bool {
        self.refreshers.contains_key(&kind)
    }

    /// Run the refresher of `statement`; returns false when none is registered.
    pub fn refresh(
        &self,
        fragment: &mut RefreshFragment,
        logic_data_source_names: &[String],
        schema_name: &str,
        statement: &Statement,
        props: &ConfigurationProperties,
    ) -> Result<bool> {
        match self.refreshers.get(&statement.kind()) {
            Some(refresher) => {
                debug!(
                    "refresh {}.{schema_name} by {statement}",
                    fragment.database.name()
                );
                refresher.refresh(fragment, logic_data_source_names, schema_name, statement, props)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl Default for RefresherRegistry {
    fn default() -> Self {
        Self::new()
    }
}
