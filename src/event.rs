use std::sync::mpsc::{channel, Receiver, Sender};

use chrono::{DateTime, Local};
use log::debug;
use parking_lot::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub enum MetaDataEvent {
    SchemaAltered {
        database_name: String,
        schema_name: String,
        altered_tables: Vec<String>,
        dropped_tables: Vec<String>,
        at: DateTime<Local>,
    },
    SchemaRenamed {
        database_name: String,
        schema_name: String,
        rename_schema_name: String,
        at: DateTime<Local>,
    },
}

impl MetaDataEvent {
    pub fn schema_altered(
        database_name: &str,
        schema_name: &str,
        altered_tables: Vec<String>,
        dropped_tables: Vec<String>,
    ) -> Self {
        Self::SchemaAltered {
            database_name: database_name.to_owned(),
            schema_name: schema_name.to_owned(),
            altered_tables,
            dropped_tables,
            at: Local::now(),
        }
    }

    pub fn schema_renamed(database_name: &str, schema_name: &str, rename_schema_name: &str) -> Self {
        Self::SchemaRenamed {
            database_name: database_name.to_owned(),
            schema_name: schema_name.to_owned(),
            rename_schema_name: rename_schema_name.to_owned(),
            at: Local::now(),
        }
    }
}

/// Process-wide fan-out of metadata events. Posting never blocks and never fails;
/// subscribers whose receiver is gone are dropped.
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<Sender<MetaDataEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Receiver<MetaDataEvent> {
        let (tx, rx) = channel();
        self.subscribers.lock().push(tx);
        rx
    }

    pub fn post(&self, event: MetaDataEvent) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        debug!("post {:?} to {} subscribers", event, subscribers.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post() {
        let bus = EventBus::new();
        let rx = bus.subscribe();
        drop(bus.subscribe());
        bus.post(MetaDataEvent::schema_altered("db", "db", vec!["t_user".to_owned()], vec![]));
        match rx.try_recv().unwrap() {
            MetaDataEvent::SchemaAltered { altered_tables, .. } => {
                assert_eq!(altered_tables, vec!["t_user".to_owned()])
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(bus.subscribers.lock().len(), 1);
    }
}
