//! # Step Handlers and Registry
//!
//! One handler per supported registrant operation, plus the registry the dispatcher
//! resolves step ids against. Handlers are constructed per call-scope around the
//! scope's authenticated client; their descriptors are captured once at registration.

pub mod check_registrant_field;
pub mod create_registrant;
pub mod discover_registrant;
pub mod forget_registrant;

pub use check_registrant_field::CheckRegistrantField;
pub use create_registrant::CreateRegistrant;
pub use discover_registrant::DiscoverRegistrant;
pub use forget_registrant::ForgetRegistrant;

use crate::client::RegistrantAware;
use crate::error::{CogError, Result};
use crate::step::{CogStep, FieldSpec, FieldType, RecordSpec, ResultRecord, StepDescriptor};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

pub(crate) const ERROR_CONNECTING: &str = "There was a problem connecting to ON24: %s";

/// Builds a handler bound to one call-scope's client.
pub type StepFactory = Arc<dyn Fn(Arc<dyn RegistrantAware>) -> Box<dyn CogStep> + Send + Sync>;

#[derive(Clone)]
struct Registration {
    descriptor: StepDescriptor,
    factory: StepFactory,
}

/// Step id to handler mapping. Read-only once the server starts.
#[derive(Clone, Default)]
pub struct StepRegistry {
    steps: HashMap<String, Registration>,
}

impl fmt::Debug for StepRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepRegistry")
            .field("step_ids", &self.step_ids())
            .finish()
    }
}

impl StepRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the four ON24 registrant steps.
    pub fn with_default_steps() -> Self {
        let mut registry = Self::new();
        registry.insert(CheckRegistrantField::descriptor(), |client| {
            Box::new(CheckRegistrantField::new(client))
        });
        registry.insert(CreateRegistrant::descriptor(), |client| {
            Box::new(CreateRegistrant::new(client))
        });
        registry.insert(DiscoverRegistrant::descriptor(), |client| {
            Box::new(DiscoverRegistrant::new(client))
        });
        registry.insert(ForgetRegistrant::descriptor(), |client| {
            Box::new(ForgetRegistrant::new(client))
        });
        registry
    }

    /// Register a handler. Step ids must be unique, as must field keys within a step.
    pub fn register<F>(&mut self, descriptor: StepDescriptor, factory: F) -> Result<()>
    where
        F: Fn(Arc<dyn RegistrantAware>) -> Box<dyn CogStep> + Send + Sync + 'static,
    {
        if self.steps.contains_key(&descriptor.step_id) {
            return Err(CogError::RegistryError(format!(
                "Step '{}' is already registered",
                descriptor.step_id
            )));
        }
        if !descriptor.has_unique_field_keys() {
            return Err(CogError::RegistryError(format!(
                "Step '{}' declares duplicate field keys",
                descriptor.step_id
            )));
        }
        self.insert(descriptor, factory);
        Ok(())
    }

    fn insert<F>(&mut self, descriptor: StepDescriptor, factory: F)
    where
        F: Fn(Arc<dyn RegistrantAware>) -> Box<dyn CogStep> + Send + Sync + 'static,
    {
        debug!(step_id = %descriptor.step_id, "Registering step");
        self.steps.insert(
            descriptor.step_id.clone(),
            Registration {
                descriptor,
                factory: Arc::new(factory),
            },
        );
    }

    pub fn contains(&self, step_id: &str) -> bool {
        self.steps.contains_key(step_id)
    }

    /// Handler for `step_id` bound to `client`, if the id is registered.
    pub fn resolve(
        &self,
        step_id: &str,
        client: Arc<dyn RegistrantAware>,
    ) -> Option<Box<dyn CogStep>> {
        self.steps
            .get(step_id)
            .map(|registration| (registration.factory)(client))
    }

    pub fn descriptor(&self, step_id: &str) -> Option<&StepDescriptor> {
        self.steps.get(step_id).map(|r| &r.descriptor)
    }

    /// All descriptors, ordered by step id so manifests are stable.
    pub fn descriptors(&self) -> Vec<StepDescriptor> {
        let mut descriptors: Vec<StepDescriptor> =
            self.steps.values().map(|r| r.descriptor.clone()).collect();
        descriptors.sort_by(|a, b| a.step_id.cmp(&b.step_id));
        descriptors
    }

    pub fn step_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.steps.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Key-value registrant record declared under `id`.
pub(crate) fn registrant_record_spec(id: &str, with_create_timestamp: bool) -> RecordSpec {
    let mut fields = vec![FieldSpec::required(
        "eventuserid",
        FieldType::Numeric,
        "Event User ID",
    )];
    if with_create_timestamp {
        fields.push(FieldSpec::required(
            "createtimestamp",
            FieldType::DateTime,
            "Registrant create date/time.",
        ));
    }
    fields.push(FieldSpec::required(
        "email",
        FieldType::Email,
        "Registrant's e-mail address",
    ));
    RecordSpec::key_value(id, fields).with_dynamic_fields()
}

/// `<base>.<order>` copy of a record so later steps can address this step's output.
pub(crate) fn ordered_record(
    base_id: &str,
    name: &str,
    fields: &Map<String, Value>,
    order: u64,
) -> ResultRecord {
    ResultRecord::key_value(
        format!("{base_id}.{order}"),
        format!("{name} from Step {order}"),
        fields.clone(),
    )
}
