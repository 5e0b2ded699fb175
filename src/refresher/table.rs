use super::{MetaDataRefresher, RefreshFragment};
use crate::{
    ast::Statement, config::props::ConfigurationProperties, error::Result,
    event::MetaDataEvent, statement_of,
};

pub struct CreateTableRefresher;

impl MetaDataRefresher for CreateTableRefresher {
    fn refresh(
        &self,
        fragment: &mut RefreshFragment,
        logic_data_source_names: &[String],
        schema_name: &str,
        statement: &Statement,
        props: &ConfigurationProperties,
    ) -> Result<()> {
        let stmt = statement_of!(statement, CreateTable);
        let mut altered = vec![];
        if let Some(table) =
            fragment.put_table(logic_data_source_names, schema_name, &stmt.table.name, props)?
        {
            altered.push(table.name.clone());
        }
        let event = MetaDataEvent::schema_altered(fragment.database.name(), schema_name, altered, vec![]);
        fragment.post(event);
        Ok(())
    }
}

/// `ALTER TABLE t RENAME TO t2` puts `t2` before removing `t`; any other alter
/// reloads `t` in place.
pub struct AlterTableRefresher;

impl MetaDataRefresher for AlterTableRefresher {
    fn refresh(
        &self,
        fragment: &mut RefreshFragment,
        logic_data_source_names: &[String],
        schema_name: &str,
        statement: &Statement,
        props: &ConfigurationProperties,
    ) -> Result<()> {
        let stmt = statement_of!(statement, AlterTable);
        let table_name = match &stmt.table {
            Some(table) => &table.name,
            None => return Ok(()),
        };
        let mut altered = vec![];
        let mut dropped = vec![];
        match &stmt.rename_table {
            Some(rename) => {
                if let Some(table) =
                    fragment.put_table(logic_data_source_names, schema_name, &rename.name, props)?
                {
                    altered.push(table.name.clone());
                }
                fragment.remove_table(schema_name, table_name);
                dropped.push(table_name.clone());
            }
            None => {
                if let Some(table) =
                    fragment.put_table(logic_data_source_names, schema_name, table_name, props)?
                {
                    altered.push(table.name.clone());
                }
            }
        }
        let event = MetaDataEvent::schema_altered(fragment.database.name(), schema_name, altered, dropped);
        fragment.post(event);
        Ok(())
    }
}

pub struct DropTableRefresher;

impl MetaDataRefresher for DropTableRefresher {
    fn refresh(
        &self,
        fragment: &mut RefreshFragment,
        _logic_data_source_names: &[String],
        schema_name: &str,
        statement: &Statement,
        _props: &ConfigurationProperties,
    ) -> Result<()> {
        let stmt = statement_of!(statement, DropTable);
        let mut dropped = Vec::with_capacity(stmt.tables.len());
        for table in &stmt.tables {
            fragment.remove_table(schema_name, &table.name);
            dropped.push(table.name.clone());
        }
        let event = MetaDataEvent::schema_altered(fragment.database.name(), schema_name, vec![], dropped);
        fragment.post(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ast::{segment::SimpleTableSegment, AlterTableStmt, DropTableStmt},
        error::Error,
        refresher::{
            tests::{fragment, logic_names, user_table},
            RefresherRegistry,
        },
    };

    fn refresh(fragment: &mut RefreshFragment, stmt: Statement) -> Result<bool> {
        RefresherRegistry::global().refresh(
            fragment,
            &logic_names(),
            "sharding_db",
            &stmt,
            &ConfigurationProperties::default(),
        )
    }

    #[test]
    fn test_rename_table() {
        let (shard, mut fragment) = fragment();
        // the shard already ran the DDL
        shard.drop_table("sharding_db", "t_user");
        shard.create_table("sharding_db", user_table("t_user_new"));

        let stmt = Statement::AlterTable(AlterTableStmt {
            table: Some(SimpleTableSegment::new("t_user")),
            rename_table: Some(SimpleTableSegment::new("t_user_new")),
            ..Default::default()
        });
        assert!(refresh(&mut fragment, stmt).unwrap());

        let single = fragment.database.rule_meta_data().single_table_rule().unwrap();
        assert!(fragment.database.contains_table("sharding_db", "t_user_new"));
        assert!(fragment.federation.contains_table("sharding_db", "t_user_new"));
        assert!(single.contains("sharding_db", "t_user_new"));
        assert!(!fragment.database.contains_table("sharding_db", "t_user"));
        assert!(!fragment.federation.contains_table("sharding_db", "t_user"));
        assert!(!single.contains("sharding_db", "t_user"));
        match &fragment.events[..] {
            [MetaDataEvent::SchemaAltered {
                altered_tables,
                dropped_tables,
                ..
            }] => {
                assert_eq!(altered_tables, &vec!["t_user_new".to_owned()]);
                assert_eq!(dropped_tables, &vec!["t_user".to_owned()]);
            }
            other => panic!("unexpected events {other:?}"),
        }
    }

    #[test]
    fn test_drop_table() {
        let (_, mut fragment) = fragment();
        let stmt = Statement::DropTable(DropTableStmt {
            tables: vec![SimpleTableSegment::new("T_USER")],
            if_exists: false,
        });
        refresh(&mut fragment, stmt).unwrap();
        assert!(!fragment.database.contains_table("sharding_db", "t_user"));
        assert!(!fragment.federation.contains_table("sharding_db", "t_user"));
        assert!(fragment.database.contains_table("sharding_db", "t_order"));
    }

    #[test]
    fn test_mismatched_statement() {
        let (_, mut fragment) = fragment();
        let stmt = Statement::DropTable(DropTableStmt {
            tables: vec![],
            if_exists: false,
        });
        let err = CreateTableRefresher
            .refresh(
                &mut fragment,
                &logic_names(),
                "sharding_db",
                &stmt,
                &ConfigurationProperties::default(),
            )
            .unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }
}
