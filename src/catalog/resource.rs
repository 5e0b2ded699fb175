use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, warn};
use parking_lot::{Mutex, RwLock};

use super::tableinfo::TableMetaData;
use crate::{
    config::datasource::DataSourceProperties,
    error::{Error::DataSource as DataSourceErr, Result},
    fmt_err,
    types::DatabaseType,
};

/// A pool of connections to one physical database.
pub trait DataSource: Send + Sync + Debug {
    fn properties(&self) -> &DataSourceProperties;

    fn database_type(&self) -> DatabaseType {
        self.properties().database_type()
    }

    fn schema_names(&self) -> Result<Vec<String>>;

    /// Load actual table metadata of `schema_name`; an empty `table_names` loads every table.
    /// Tables that do not exist are skipped.
    fn load_tables(&self, schema_name: &str, table_names: &[String]) -> Result<Vec<TableMetaData>>;

    fn close(&self) -> Result<()>;

    fn is_closed(&self) -> bool;
}

pub type DataSourceRef = Arc<dyn DataSource>;

/// Creates connection pools from their properties.
pub trait DataSourceFactory: Send + Sync {
    fn create(&self, name: &str, props: &DataSourceProperties) -> Result<DataSourceRef>;

    fn create_all(
        &self,
        props_map: &BTreeMap<String, DataSourceProperties>,
    ) -> Result<Vec<(String, DataSourceRef)>> {
        let mut result = Vec::with_capacity(props_map.len());
        for (name, props) in props_map {
            result.push((name.clone(), self.create(name, props)?));
        }
        Ok(result)
    }
}

/// Named physical data sources of one logical database, in configuration order.
#[derive(Debug, Clone, Default)]
pub struct Resource {
    data_sources: Vec<(String, DataSourceRef)>,
}

impl Resource {
    pub fn new(data_sources: Vec<(String, DataSourceRef)>) -> Self {
        Self { data_sources }
    }

    pub fn data_source(&self, name: &str) -> Option<&DataSourceRef> {
        self.data_sources
            .iter()
            .find(|(each, _)| each == name)
            .map(|(_, ds)| ds)
    }

    pub fn data_sources(&self) -> &[(String, DataSourceRef)] {
        &self.data_sources
    }

    pub fn data_source_names(&self) -> Vec<String> {
        self.data_sources.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.data_source(name).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.data_sources.is_empty()
    }

    /// One data source name per backing instance, first configured wins.
    pub fn all_instance_data_source_names(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut result = vec![];
        for (name, ds) in &self.data_sources {
            let key = ds
                .properties()
                .instance_key()
                .unwrap_or_else(|| format!("#{name}"));
            if seen.insert(key) {
                result.push(name.clone());
            }
        }
        result
    }

    /// Storage dialect, taken from the first data source.
    pub fn database_type(&self) -> Option<DatabaseType> {
        self.data_sources.first().map(|(_, ds)| ds.database_type())
    }

    pub fn close(&self, data_source: &DataSourceRef) {
        if let Err(e) = data_source.close() {
            warn!("close data source {} failed: {e}", data_source.properties().url);
        }
    }
}

type ShardCatalog = Arc<RwLock<BTreeMap<String, BTreeMap<String, TableMetaData>>>>;

/// Data source backed by an in-process catalog; pools created for the same url share
/// one catalog the way two pools share one physical database.
#[derive(Debug)]
pub struct MemoryDataSource {
    props: DataSourceProperties,
    catalog: ShardCatalog,
    closed: AtomicBool,
}

impl MemoryDataSource {
    pub fn new(props: DataSourceProperties) -> Self {
        Self::with_catalog(props, Arc::new(RwLock::new(BTreeMap::new())))
    }

    fn with_catalog(props: DataSourceProperties, catalog: ShardCatalog) -> Self {
        Self {
            props,
            catalog,
            closed: AtomicBool::new(false),
        }
    }

    /// Execute `CREATE TABLE` on the shard itself.
    pub fn create_table(&self, schema_name: &str, table: TableMetaData) {
        self.catalog
            .write()
            .entry(schema_name.to_lowercase())
            .or_default()
            .insert(table.name.to_lowercase(), table);
    }

    pub fn drop_table(&self, schema_name: &str, table_name: &str) {
        if let Some(schema) = self.catalog.write().get_mut(&schema_name.to_lowercase()) {
            schema.remove(&table_name.to_lowercase());
        }
    }

    pub fn create_schema(&self, schema_name: &str) {
        self.catalog
            .write()
            .entry(schema_name.to_lowercase())
            .or_default();
    }

    fn check_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(DataSourceErr(fmt_err!("data source {} is closed", self.props.url)));
        }
        Ok(())
    }
}

impl DataSource for MemoryDataSource {
    fn properties(&self) -> &DataSourceProperties {
        &self.props
    }

    fn schema_names(&self) -> Result<Vec<String>> {
        self.check_open()?;
        Ok(self.catalog.read().keys().cloned().collect())
    }

    fn load_tables(&self, schema_name: &str, table_names: &[String]) -> Result<Vec<TableMetaData>> {
        self.check_open()?;
        let catalog = self.catalog.read();
        let schema = match catalog.get(&schema_name.to_lowercase()) {
            Some(schema) => schema,
            None => return Ok(vec![]),
        };
        if table_names.is_empty() {
            return Ok(schema.values().cloned().collect());
        }
        Ok(table_names
            .iter()
            .filter_map(|name| schema.get(&name.to_lowercase()).cloned())
            .collect())
    }

    fn close(&self) -> Result<()> {
        debug!("close memory data source {}", self.props.url);
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Hands out `MemoryDataSource` pools; the same url always reaches the same catalog.
#[derive(Debug, Default)]
pub struct MemoryDataSourceFactory {
    shards: Mutex<HashMap<String, ShardCatalog>>,
    created: Mutex<Vec<Arc<MemoryDataSource>>>,
}

impl MemoryDataSourceFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// A pool on `url` outside of any coordinator, handy to run DDL against a shard.
    pub fn shard(&self, url: &str) -> Arc<MemoryDataSource> {
        let catalog = self.catalog(url);
        Arc::new(MemoryDataSource::with_catalog(
            DataSourceProperties::new(url),
            catalog,
        ))
    }

    /// Every pool this factory has created, in creation order.
    pub fn created(&self) -> Vec<Arc<MemoryDataSource>> {
        self.created.lock().clone()
    }

    fn catalog(&self, url: &str) -> ShardCatalog {
        Arc::clone(
            self.shards
                .lock()
                .entry(url.to_owned())
                .or_insert_with(|| Arc::new(RwLock::new(BTreeMap::new()))),
        )
    }
}

impl DataSourceFactory for MemoryDataSourceFactory {
    fn create(&self, name: &str, props: &DataSourceProperties) -> Result<DataSourceRef> {
        debug!("create memory data source {name} on {}", props.url);
        let ds = Arc::new(MemoryDataSource::with_catalog(
            props.clone(),
            self.catalog(&props.url),
        ));
        self.created.lock().push(Arc::clone(&ds));
        Ok(ds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{catalog::column::ColumnMetaData, types::LogicalType};

    fn table(name: &str) -> TableMetaData {
        TableMetaData::new(
            name,
            vec![ColumnMetaData::new("id", LogicalType::Int64, true)],
            vec![],
            vec![],
        )
    }

    #[test]
    fn test_same_url_shares_catalog() {
        let factory = MemoryDataSourceFactory::new();
        let ds = factory
            .create("ds_0", &DataSourceProperties::new("mem://shard_0"))
            .unwrap();
        factory.shard("mem://shard_0").create_table("public", table("t_user"));
        let loaded = ds.load_tables("public", &[]).unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(ds
            .load_tables("public", &["t_missing".to_owned()])
            .unwrap()
            .is_empty());
        ds.close().unwrap();
        assert!(ds.load_tables("public", &[]).is_err());
    }

    #[test]
    fn test_all_instance_data_source_names() {
        let factory = MemoryDataSourceFactory::new();
        let resource = Resource::new(vec![
            (
                "ds_0".to_owned(),
                factory
                    .create("ds_0", &DataSourceProperties::new("mysql://127.0.0.1:3306/ds_0"))
                    .unwrap(),
            ),
            (
                "ds_1".to_owned(),
                factory
                    .create("ds_1", &DataSourceProperties::new("mysql://127.0.0.1:3306/ds_1"))
                    .unwrap(),
            ),
            (
                "ds_2".to_owned(),
                factory
                    .create("ds_2", &DataSourceProperties::new("mysql://127.0.0.2:3306/ds_2"))
                    .unwrap(),
            ),
        ]);
        assert_eq!(
            resource.all_instance_data_source_names(),
            vec!["ds_0".to_owned(), "ds_2".to_owned()]
        );
        assert_eq!(resource.database_type(), Some(DatabaseType::MySQL));
    }
}
