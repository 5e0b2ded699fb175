pub mod validator;

use std::collections::BTreeSet;

/// Logic name paired with the actual name routing picked for it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteMapper {
    pub logic_name: String,
    pub actual_name: String,
}

impl RouteMapper {
    pub fn new(logic_name: &str, actual_name: &str) -> Self {
        Self {
            logic_name: logic_name.to_owned(),
            actual_name: actual_name.to_owned(),
        }
    }
}

/// One data source and the tables a statement touches on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteUnit {
    pub data_source_mapper: RouteMapper,
    pub table_mappers: Vec<RouteMapper>,
}

impl RouteUnit {
    pub fn new(data_source_mapper: RouteMapper, table_mappers: Vec<RouteMapper>) -> Self {
        Self {
            data_source_mapper,
            table_mappers,
        }
    }

    pub fn actual_table_names(&self, logic_table: &str) -> BTreeSet<String> {
        self.table_mappers
            .iter()
            .filter(|m| m.logic_name.eq_ignore_ascii_case(logic_table))
            .map(|m| m.actual_name.clone())
            .collect()
    }

    pub fn find_table_mapper(&self, data_source_name: &str, actual_table: &str) -> Option<&RouteMapper> {
        if !self
            .data_source_mapper
            .actual_name
            .eq_ignore_ascii_case(data_source_name)
        {
            return None;
        }
        self.table_mappers
            .iter()
            .find(|m| m.actual_name.eq_ignore_ascii_case(actual_table))
    }
}

/// Result of routing one statement; units keep the order they were routed in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteContext {
    route_units: Vec<RouteUnit>,
}

impl RouteContext {
    pub fn new(route_units: Vec<RouteUnit>) -> Self {
        let mut ctx = Self::default();
        for unit in route_units {
            ctx.put_route_unit(unit);
        }
        ctx
    }

    /// Duplicates are dropped.
    pub fn put_route_unit(&mut self, unit: RouteUnit) {
        if !self.route_units.contains(&unit) {
            self.route_units.push(unit);
        }
    }

    pub fn route_units(&self) -> &[RouteUnit] {
        &self.route_units
    }

    pub fn actual_data_source_names(&self) -> BTreeSet<String> {
        self.route_units
            .iter()
            .map(|unit| unit.data_source_mapper.actual_name.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_context() {
        let unit = |ds: &str, table: &str| {
            RouteUnit::new(
                RouteMapper::new(ds, ds),
                vec![RouteMapper::new("t_order", table)],
            )
        };
        let ctx = RouteContext::new(vec![
            unit("ds_1", "t_order_1"),
            unit("ds_0", "t_order_0"),
            unit("ds_1", "t_order_1"),
        ]);
        assert_eq!(ctx.route_units().len(), 2);
        assert_eq!(ctx.route_units()[0].data_source_mapper.actual_name, "ds_1");
        assert_eq!(ctx.actual_data_source_names().len(), 2);
        assert!(ctx.route_units()[1].find_table_mapper("DS_0", "t_order_0").is_some());
        assert_eq!(
            ctx.route_units()[0].actual_table_names("T_ORDER").into_iter().collect::<Vec<_>>(),
            vec!["t_order_1".to_owned()]
        );
    }
}
