use std::sync::Arc;

use super::{MetaDataRefresher, RefreshFragment};
use crate::{
    ast::Statement,
    catalog::schema::Schema,
    config::props::ConfigurationProperties,
    error::Result,
    event::MetaDataEvent,
    planner::federation::FederationSchemaMetaData,
    statement_of,
};

pub struct CreateSchemaRefresher;

impl MetaDataRefresher for CreateSchemaRefresher {
    fn refresh(
        &self,
        fragment: &mut RefreshFragment,
        _logic_data_source_names: &[String],
        _schema_name: &str,
        statement: &Statement,
        _props: &ConfigurationProperties,
    ) -> Result<()> {
        let stmt = statement_of!(statement, CreateSchema);
        let name = stmt.schema_name.to_lowercase();
        if fragment.database.schema(&name).is_some() {
            return Ok(());
        }
        fragment
            .database
            .put_schema(&name, Arc::new(Schema::default()));
        fragment
            .federation
            .put_schema(FederationSchemaMetaData::new(&name));
        let event = MetaDataEvent::schema_altered(fragment.database.name(), &name, vec![], vec![]);
        fragment.post(event);
        Ok(())
    }
}

/// Renames move every table of the schema, data nodes included, under the new name.
pub struct AlterSchemaRefresher;

impl MetaDataRefresher for AlterSchemaRefresher {
    fn refresh(
        &self,
        fragment: &mut RefreshFragment,
        logic_data_source_names: &[String],
        _schema_name: &str,
        statement: &Statement,
        _props: &ConfigurationProperties,
    ) -> Result<()> {
        let stmt = statement_of!(statement, AlterSchema);
        let rename = match &stmt.rename_schema {
            Some(rename) => rename.to_lowercase(),
            None => return Ok(()),
        };
        let actual = stmt.schema_name.to_lowercase();
        let schema = match fragment.database.schema(&actual) {
            Some(schema) => Arc::clone(schema),
            None => return Ok(()),
        };

        fragment.database.put_schema(&rename, Arc::clone(&schema));
        let mut renamed = FederationSchemaMetaData::new(&rename);
        if let Some(fed) = fragment.federation.schema(&actual) {
            for table in fed.tables().values() {
                renamed.put_table(Arc::clone(table));
            }
        }
        fragment.federation.put_schema(renamed);
        let table_names = schema.all_table_names();
        for name in &table_names {
            fragment.put_data_node(logic_data_source_names, &rename, name);
        }

        fragment.database.remove_schema(&actual);
        fragment.federation.remove_schema(&actual);
        for name in &table_names {
            fragment.remove_data_node(&actual, name);
        }

        let event = MetaDataEvent::schema_renamed(fragment.database.name(), &actual, &rename);
        fragment.post(event);
        Ok(())
    }
}

pub struct DropSchemaRefresher;

impl MetaDataRefresher for DropSchemaRefresher {
    fn refresh(
        &self,
        fragment: &mut RefreshFragment,
        _logic_data_source_names: &[String],
        _schema_name: &str,
        statement: &Statement,
        _props: &ConfigurationProperties,
    ) -> Result<()> {
        let stmt = statement_of!(statement, DropSchema);
        for name in &stmt.schema_names {
            let schema = match fragment.database.remove_schema(name) {
                Some(schema) => schema,
                None => continue,
            };
            fragment.federation.remove_schema(name);
            let table_names = schema.all_table_names();
            for table in &table_names {
                fragment.remove_data_node(name, table);
            }
            let event =
                MetaDataEvent::schema_altered(fragment.database.name(), name, vec![], table_names);
            fragment.post(event);
        }
        Ok(())
    }
}
