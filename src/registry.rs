//! Metric descriptor registry.
//!
//! See [`DescriptorRegistry`] for details.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::ConfigurationError;

/// Process-wide metric namespace.
pub const NAMESPACE: &str = "hyperv";

/// Metric value kind.
///
/// Every value this exporter exposes is an instantaneous measurement, so the
/// only kind is [`MetricType::Gauge`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetricType {
    /// Instantaneous, directly settable value.
    Gauge,
}

impl MetricType {
    /// Returns the given metric type's str representation.
    pub fn as_str(&self) -> &str {
        match self {
            MetricType::Gauge => "gauge",
        }
    }
}

/// Joins namespace, subsystem and name with `_`, skipping empty components.
///
/// ```
/// # use hyperv_exporter::registry::build_fq_name;
/// assert_eq!("hyperv_os_time", build_fq_name("hyperv", "os", "time"));
/// assert_eq!("hyperv_time", build_fq_name("hyperv", "", "time"));
/// ```
pub fn build_fq_name(namespace: &str, subsystem: &str, name: &str) -> String {
    [namespace, subsystem, name]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("_")
}

/// Immutable identity of one metric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    name: String,
    help: String,
    label_names: Vec<Cow<'static, str>>,
    metric_type: MetricType,
}

impl Descriptor {
    /// Create new [`Descriptor`].
    ///
    /// Note: A full stop punctuation mark (`.`) is automatically added to the
    /// passed help text.
    pub fn new<H: Into<String>>(
        namespace: &str,
        subsystem: &str,
        name: &str,
        help: H,
        label_names: &[&'static str],
    ) -> Result<Self, ConfigurationError> {
        let name = build_fq_name(namespace, subsystem, name);
        if !is_valid_metric_name(&name) {
            return Err(ConfigurationError::InvalidMetricName(name));
        }

        let mut labels: Vec<Cow<'static, str>> = Vec::with_capacity(label_names.len());
        for label in label_names {
            if !is_valid_label_name(label) {
                return Err(ConfigurationError::InvalidLabelName(label.to_string()));
            }
            if labels.iter().any(|existing| existing == label) {
                return Err(ConfigurationError::DuplicateLabel {
                    metric: name,
                    label: label.to_string(),
                });
            }
            labels.push(Cow::Borrowed(label));
        }

        Ok(Descriptor {
            name,
            help: help.into() + ".",
            label_names: labels,
            metric_type: MetricType::Gauge,
        })
    }

    /// Returns the fully-qualified name of the [`Descriptor`].
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the help text of the [`Descriptor`].
    pub fn help(&self) -> &str {
        &self.help
    }

    /// Returns the ordered label names of the [`Descriptor`].
    pub fn label_names(&self) -> &[Cow<'static, str>] {
        &self.label_names
    }

    /// Returns the value kind of the [`Descriptor`].
    pub fn metric_type(&self) -> MetricType {
        self.metric_type
    }
}

/// A per-collector table mapping logical metric names to [`Descriptor`]s.
///
/// A registry is filled once while its owning collector is constructed and is
/// read-only afterwards. Descriptors are handed out as [`Arc`]s so samples
/// produced by concurrent scrapes can reference them without copying.
///
/// ```
/// # use hyperv_exporter::registry::{DescriptorRegistry, NAMESPACE};
/// let mut registry = DescriptorRegistry::new(NAMESPACE);
/// let critical = registry
///     .register("health_critical", "health", "critical", "Critical VMs", &[])
///     .unwrap();
/// assert_eq!("hyperv_health_critical", critical.name());
///
/// // Logical names are unique within a registry.
/// assert!(registry
///     .register("health_critical", "health", "other", "Other", &[])
///     .is_err());
/// ```
#[derive(Debug, Clone)]
pub struct DescriptorRegistry {
    namespace: String,
    descriptors: Vec<(String, Arc<Descriptor>)>,
    by_logical_name: HashMap<String, usize>,
}

impl DescriptorRegistry {
    /// Creates an empty registry whose descriptors live in `namespace`.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            descriptors: Vec::new(),
            by_logical_name: HashMap::new(),
        }
    }

    /// Builds a descriptor and registers it under `logical_name`.
    ///
    /// Fails with [`ConfigurationError::DuplicateDescriptor`] if either the
    /// logical name or the resulting fully-qualified name is already taken.
    pub fn register<H: Into<String>>(
        &mut self,
        logical_name: &str,
        subsystem: &str,
        name: &str,
        help: H,
        label_names: &[&'static str],
    ) -> Result<Arc<Descriptor>, ConfigurationError> {
        if self.by_logical_name.contains_key(logical_name) {
            return Err(ConfigurationError::DuplicateDescriptor(
                logical_name.to_string(),
            ));
        }

        let descriptor = Descriptor::new(&self.namespace, subsystem, name, help, label_names)?;
        if self
            .descriptors
            .iter()
            .any(|(_, existing)| existing.name() == descriptor.name())
        {
            return Err(ConfigurationError::DuplicateDescriptor(
                descriptor.name().to_string(),
            ));
        }

        let descriptor = Arc::new(descriptor);
        self.by_logical_name
            .insert(logical_name.to_string(), self.descriptors.len());
        self.descriptors
            .push((logical_name.to_string(), descriptor.clone()));
        Ok(descriptor)
    }

    /// Looks up a descriptor by its logical name.
    pub fn get(&self, logical_name: &str) -> Option<&Arc<Descriptor>> {
        self.by_logical_name
            .get(logical_name)
            .map(|index| &self.descriptors[*index].1)
    }

    /// Iterates descriptors in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Descriptor>> {
        self.descriptors.iter().map(|(_, descriptor)| descriptor)
    }

    /// Returns the number of registered descriptors.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Returns `true` if nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

fn is_valid_label_name(name: &str) -> bool {
    if name.starts_with("__") {
        return false;
    }
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
