#![allow(dead_code)]

use recordsync::prelude::*;
use recordsync::storage::{StoreConfig, StoreCoordinator};
use std::path::Path;
use std::sync::Arc;

managed_record!(pub Article, "Article", sort = [SortDescriptor::ascending("name")]);

impl Article {
    pub fn name(&self) -> Option<String> {
        self.object()
            .get("name")
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
    }
}

impl RemoteRecord for Article {
    fn unpack_fields(&self, payload: &Payload) -> Result<()> {
        if let Some(name) = payload.text("name") {
            self.object().set("name", name)?;
        }
        if let Some(updated_at) = payload.date(UPDATED_AT_KEY) {
            self.set_updated_at(updated_at)?;
        }
        Ok(())
    }

    fn should_unpack_dictionary(&self, payload: &Payload) -> Result<bool> {
        match (payload.date(UPDATED_AT_KEY), self.updated_at()?) {
            (Some(remote), Some(local)) => Ok(remote > local),
            _ => Ok(true),
        }
    }
}

pub fn article_entity() -> EntityDescription {
    remote_entity("Article", AttributeType::Text)
        .attribute(AttributeDescription::new("name", AttributeType::Text))
}

pub fn model() -> ManagedObjectModel {
    ManagedObjectModel::new()
        .with_entity(article_entity())
        .expect("valid model")
}

pub fn in_memory_context() -> Context {
    let coordinator = StoreCoordinator::open(StoreConfig::in_memory().model(model()))
        .expect("open in-memory store");
    Context::new(Arc::new(coordinator))
}

pub fn file_context(path: &Path) -> Context {
    let coordinator =
        StoreCoordinator::open(StoreConfig::new(path).model(model())).expect("open store file");
    Context::new(Arc::new(coordinator))
}

pub fn payload(value: serde_json::Value) -> Payload {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("payload must be a JSON object, got {}", other),
    }
}
