use super::{MetaDataRefresher, RefreshFragment};
use crate::{
    ast::Statement, config::props::ConfigurationProperties, error::Result,
    event::MetaDataEvent, statement_of,
};

pub struct CreateViewRefresher;

impl MetaDataRefresher for CreateViewRefresher {
    fn refresh(
        &self,
        fragment: &mut RefreshFragment,
        logic_data_source_names: &[String],
        schema_name: &str,
        statement: &Statement,
        props: &ConfigurationProperties,
    ) -> Result<()> {
        let stmt = statement_of!(statement, CreateView);
        let mut altered = vec![];
        if let Some(view) =
            fragment.put_table(logic_data_source_names, schema_name, &stmt.view.name, props)?
        {
            altered.push(view.name.clone());
        }
        let event = MetaDataEvent::schema_altered(fragment.database.name(), schema_name, altered, vec![]);
        fragment.post(event);
        Ok(())
    }
}

pub struct AlterViewRefresher;

impl MetaDataRefresher for AlterViewRefresher {
    fn refresh(
        &self,
        fragment: &mut RefreshFragment,
        logic_data_source_names: &[String],
        schema_name: &str,
        statement: &Statement,
        props: &ConfigurationProperties,
    ) -> Result<()> {
        let stmt = statement_of!(statement, AlterView);
        let view_name = &stmt.view.name;
        let mut altered = vec![];
        let mut dropped = vec![];
        if let Some(rename) = &stmt.rename_view {
            if let Some(view) =
                fragment.put_table(logic_data_source_names, schema_name, &rename.name, props)?
            {
                altered.push(view.name.clone());
            }
            fragment.remove_table(schema_name, view_name);
            dropped.push(view_name.clone());
        } else if let Some(view) =
            fragment.put_table(logic_data_source_names, schema_name, view_name, props)?
        {
            altered.push(view.name.clone());
        }
        let event = MetaDataEvent::schema_altered(fragment.database.name(), schema_name, altered, dropped);
        fragment.post(event);
        Ok(())
    }
}

pub struct DropViewRefresher;

impl MetaDataRefresher for DropViewRefresher {
    fn refresh(
        &self,
        fragment: &mut RefreshFragment,
        _logic_data_source_names: &[String],
        schema_name: &str,
        statement: &Statement,
        _props: &ConfigurationProperties,
    ) -> Result<()> {
        let stmt = statement_of!(statement, DropView);
        let mut dropped = Vec::with_capacity(stmt.views.len());
        for view in &stmt.views {
            fragment.remove_table(schema_name, &view.name);
            dropped.push(view.name.clone());
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
        ast::{
            segment::{Projection, SimpleTableSegment, TableSegment},
            AlterViewStmt, CreateViewStmt, DropViewStmt, SelectStmt,
        },
        refresher::{
            tests::{fragment, logic_names, user_table},
            RefresherRegistry,
        },
    };

    fn refresh(fragment: &mut RefreshFragment, stmt: Statement) {
        RefresherRegistry::global()
            .refresh(
                fragment,
                &logic_names(),
                "sharding_db",
                &stmt,
                &ConfigurationProperties::default(),
            )
            .unwrap();
    }

    fn select_user() -> SelectStmt {
        SelectStmt {
            projections: vec![Projection::Star { owner: None }],
            from: Some(TableSegment::Simple(SimpleTableSegment::new("t_user"))),
            ..Default::default()
        }
    }

    #[test]
    fn test_view_lifecycle() {
        let (shard, mut fragment) = fragment();
        shard.create_table("sharding_db", user_table("v_user"));
        refresh(
            &mut fragment,
            Statement::CreateView(CreateViewStmt {
                view: SimpleTableSegment::new("v_user"),
                select: select_user(),
                or_replace: false,
            }),
        );
        assert!(fragment.database.contains_table("sharding_db", "v_user"));

        shard.drop_table("sharding_db", "v_user");
        shard.create_table("sharding_db", user_table("v_user_1"));
        refresh(
            &mut fragment,
            Statement::AlterView(AlterViewStmt {
                view: SimpleTableSegment::new("v_user"),
                rename_view: Some(SimpleTableSegment::new("v_user_1")),
                select: None,
            }),
        );
        assert!(!fragment.database.contains_table("sharding_db", "v_user"));
        assert!(fragment.federation.contains_table("sharding_db", "v_user_1"));

        refresh(
            &mut fragment,
            Statement::DropView(DropViewStmt {
                views: vec![SimpleTableSegment::new("v_user_1")],
                if_exists: false,
            }),
        );
        let single = fragment.database.rule_meta_data().single_table_rule().unwrap();
        assert!(!single.contains("sharding_db", "v_user_1"));
        assert!(!fragment.database.contains_table("sharding_db", "v_user_1"));
        assert!(!fragment.federation.contains_table("sharding_db", "v_user_1"));
        assert_eq!(fragment.events.len(), 3);
    }
}
