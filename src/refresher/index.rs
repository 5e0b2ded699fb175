use super::{MetaDataRefresher, RefreshFragment};
use crate::{
    ast::{
        segment::{IndexSegment, SimpleTableSegment},
        Statement,
    },
    config::props::ConfigurationProperties,
    error::Result,
    event::MetaDataEvent,
    statement_of,
};

// the table named by the statement, else the table owning the index before the DDL ran
fn owner_table(
    fragment: &RefreshFragment,
    schema_name: &str,
    table: Option<&SimpleTableSegment>,
    index: &IndexSegment,
) -> Option<String> {
    match table {
        Some(table) => Some(table.name.clone()),
        None => fragment
            .database
            .schema(schema_name)?
            .find_table_by_index(&index.name),
    }
}

fn reload_tables(
    fragment: &mut RefreshFragment,
    logic_data_source_names: &[String],
    schema_name: &str,
    table_names: Vec<String>,
    props: &ConfigurationProperties,
) -> Result<()> {
    let mut altered = vec![];
    for name in table_names {
        if let Some(table) = fragment.put_table(logic_data_source_names, schema_name, &name, props)? {
            altered.push(table.name.clone());
        }
    }
    let event = MetaDataEvent::schema_altered(fragment.database.name(), schema_name, altered, vec![]);
    fragment.post(event);
    Ok(())
}

pub struct CreateIndexRefresher;

impl MetaDataRefresher for CreateIndexRefresher {
    fn refresh(
        &self,
        fragment: &mut RefreshFragment,
        logic_data_source_names: &[String],
        schema_name: &str,
        statement: &Statement,
        props: &ConfigurationProperties,
    ) -> Result<()> {
        let stmt = statement_of!(statement, CreateIndex);
        reload_tables(
            fragment,
            logic_data_source_names,
            schema_name,
            vec![stmt.table.name.clone()],
            props,
        )
    }
}

pub struct AlterIndexRefresher;

impl MetaDataRefresher for AlterIndexRefresher {
    fn refresh(
        &self,
        fragment: &mut RefreshFragment,
        logic_data_source_names: &[String],
        schema_name: &str,
        statement: &Statement,
        props: &ConfigurationProperties,
    ) -> Result<()> {
        let stmt = statement_of!(statement, AlterIndex);
        let owners = owner_table(fragment, schema_name, stmt.table.as_ref(), &stmt.index)
            .into_iter()
            .collect();
        reload_tables(fragment, logic_data_source_names, schema_name, owners, props)
    }
}

pub struct DropIndexRefresher;

impl MetaDataRefresher for DropIndexRefresher {
    fn refresh(
        &self,
        fragment: &mut RefreshFragment,
        logic_data_source_names: &[String],
        schema_name: &str,
        statement: &Statement,
        props: &ConfigurationProperties,
    ) -> Result<()> {
        let stmt = statement_of!(statement, DropIndex);
        let mut owners: Vec<String> = vec![];
        for index in &stmt.indexes {
            if let Some(owner) = owner_table(fragment, schema_name, stmt.table.as_ref(), index) {
                if !owners.iter().any(|o| o.eq_ignore_ascii_case(&owner)) {
                    owners.push(owner);
                }
            }
        }
        reload_tables(fragment, logic_data_source_names, schema_name, owners, props)
    }
}
