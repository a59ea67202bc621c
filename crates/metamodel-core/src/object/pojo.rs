use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::{MetaModelError, Result};
use crate::methods::naming;

/// A domain instance as the metamodel sees it.
pub trait DomainObject: Send + Sync + fmt::Debug {
    /// Registered class name of the instance (its runtime type).
    fn type_name(&self) -> &str;

    /// Persistent identifier, when the object has one.
    fn object_id(&self) -> Option<String> {
        None
    }

    /// Serializable state, used as the memento of view models and values.
    fn state(&self) -> Value;

    fn property(&self, name: &str) -> Option<Value>;

    fn invoke(&self, method: &str, _args: &[Value]) -> Result<Value> {
        Err(MetaModelError::not_implemented(format!(
            "{}#{method} cannot be invoked",
            self.type_name()
        )))
    }

    fn as_any(&self) -> &dyn Any;
}

pub type Pojo = Arc<dyn DomainObject>;

type Handler = Arc<dyn Fn(&DynObject, &[Value]) -> Result<Value> + Send + Sync>;

/// Property-bag [`DomainObject`] with optional method handlers.
///
/// Invoking `getX` or `isX` without a handler reads property `x`.
#[derive(Clone)]
pub struct DynObject {
    type_name: String,
    id: Option<String>,
    properties: Map<String, Value>,
    handlers: BTreeMap<String, Handler>,
}

impl DynObject {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            id: None,
            properties: Map::new(),
            handlers: BTreeMap::new(),
        }
    }

    /// Rebuilds an object from a [`DomainObject::state`] memento.
    pub fn from_state(type_name: impl Into<String>, state: Value) -> Result<Self> {
        let type_name = type_name.into();
        match state {
            Value::Object(properties) => Ok(Self {
                properties,
                ..Self::new(type_name)
            }),
            other => Err(MetaModelError::illegal_argument(format!(
                "memento of `{type_name}` must be a JSON object, got {other}"
            ))),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn with_handler(
        mut self,
        method: impl Into<String>,
        handler: impl Fn(&DynObject, &[Value]) -> Result<Value> + Send + Sync + 'static,
    ) -> Self {
        self.handlers.insert(method.into(), Arc::new(handler));
        self
    }

    pub fn into_pojo(self) -> Pojo {
        Arc::new(self)
    }
}

impl fmt::Debug for DynObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynObject")
            .field("type_name", &self.type_name)
            .field("id", &self.id)
            .field("properties", &self.properties)
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl DomainObject for DynObject {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn object_id(&self) -> Option<String> {
        self.id.clone()
    }

    fn state(&self) -> Value {
        Value::Object(self.properties.clone())
    }

    fn property(&self, name: &str) -> Option<Value> {
        self.properties.get(name).cloned()
    }

    fn invoke(&self, method: &str, args: &[Value]) -> Result<Value> {
        if let Some(handler) = self.handlers.get(method) {
            return handler(self, args);
        }
        let accessor = naming::strip_prefix(method, naming::GET_PREFIX)
            .or_else(|| naming::strip_prefix(method, naming::IS_PREFIX));
        match accessor {
            Some(suffix) if args.is_empty() => {
                Ok(self.property(&naming::decapitalize(suffix)).unwrap_or(Value::Null))
            }
            _ => Err(MetaModelError::not_implemented(format!(
                "{}#{method} has no handler",
                self.type_name
            ))),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accessors_read_properties() {
        let pojo = DynObject::new("crm.Customer")
            .with_property("name", "Ada")
            .with_property("active", true);
        assert_eq!(pojo.invoke("getName", &[]).expect("get"), json!("Ada"));
        assert_eq!(pojo.invoke("isActive", &[]).expect("is"), json!(true));
        assert!(pojo.invoke("placeOrder", &[]).unwrap_err().is_not_implemented());
    }

    #[test]
    fn handlers_take_precedence() {
        let pojo = DynObject::new("crm.Customer")
            .with_property("name", "Ada")
            .with_handler("title", |this, _| {
                Ok(json!(format!("Customer {}", this.property("name").unwrap_or_default())))
            });
        assert_eq!(pojo.invoke("title", &[]).expect("title"), json!("Customer \"Ada\""));
    }

    #[test]
    fn state_round_trips_through_from_state() {
        let pojo = DynObject::new("crm.Filter").with_property("query", "ad");
        let rebuilt = DynObject::from_state("crm.Filter", pojo.state()).expect("rebuild");
        assert_eq!(rebuilt.property("query"), Some(json!("ad")));
        assert!(DynObject::from_state("crm.Filter", json!(3))
            .unwrap_err()
            .is_illegal_argument());
    }
}
