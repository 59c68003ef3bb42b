//! Samples and the shared output stream they are written to.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::LabelMismatch;
use crate::registry::Descriptor;

/// One value of one metric, labeled.
///
/// A [`Sample`] can only be built with exactly as many label values as its
/// [`Descriptor`] declares label names, matched by position.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    descriptor: Arc<Descriptor>,
    value: f64,
    label_values: Vec<String>,
}

impl Sample {
    /// Creates a new [`Sample`], checking the label values against the
    /// descriptor's label schema.
    pub fn new(
        descriptor: Arc<Descriptor>,
        value: f64,
        label_values: Vec<String>,
    ) -> Result<Self, LabelMismatch> {
        if descriptor.label_names().len() != label_values.len() {
            return Err(LabelMismatch {
                metric: descriptor.name().to_string(),
                expected: descriptor.label_names().len(),
                actual: label_values.len(),
            });
        }

        Ok(Self {
            descriptor,
            value,
            label_values,
        })
    }

    /// The metric this sample belongs to.
    pub fn descriptor(&self) -> &Arc<Descriptor> {
        &self.descriptor
    }

    /// The sampled value.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Label values, position-aligned with the descriptor's label names.
    pub fn label_values(&self) -> &[String] {
        &self.label_values
    }

    /// Returns the value of the label called `name`, if declared.
    pub fn label(&self, name: &str) -> Option<&str> {
        self.descriptor
            .label_names()
            .iter()
            .position(|label| label == name)
            .map(|index| self.label_values[index].as_str())
    }
}

/// The output stream of one scrape.
///
/// Collectors running on different threads write into the same sink. Each
/// write takes the lock once, so a batch written with [`SampleSink::extend`]
/// is never interleaved with another writer's samples.
#[derive(Debug, Default)]
pub struct SampleSink {
    samples: Mutex<Vec<Sample>>,
}

impl SampleSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a sample and appends it.
    pub fn emit(
        &self,
        descriptor: &Arc<Descriptor>,
        value: f64,
        label_values: Vec<String>,
    ) -> Result<(), LabelMismatch> {
        let sample = Sample::new(descriptor.clone(), value, label_values)?;
        self.samples.lock().push(sample);
        Ok(())
    }

    /// Appends a batch of samples, keeping their relative order.
    pub fn extend(&self, samples: impl IntoIterator<Item = Sample>) {
        self.samples.lock().extend(samples);
    }

    /// Number of samples written so far.
    pub fn len(&self) -> usize {
        self.samples.lock().len()
    }

    /// Returns `true` if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.samples.lock().is_empty()
    }

    /// Copies out the samples written so far.
    pub fn snapshot(&self) -> Vec<Sample> {
        self.samples.lock().clone()
    }

    /// Consumes the sink, returning everything written to it.
    pub fn into_samples(self) -> Vec<Sample> {
        self.samples.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::NAMESPACE;

    fn descriptor(labels: &[&'static str]) -> Arc<Descriptor> {
        Arc::new(Descriptor::new(NAMESPACE, "vid", "remote_physical_pages", "", labels).unwrap())
    }

    #[test]
    fn rejects_label_count_mismatch() {
        let err = Sample::new(descriptor(&["instance"]), 1.0, vec![]).unwrap_err();
        assert_eq!(
            LabelMismatch {
                metric: "hyperv_vid_remote_physical_pages".to_string(),
                expected: 1,
                actual: 0,
            },
            err
        );

        assert!(Sample::new(descriptor(&[]), 1.0, vec!["vm".to_string()]).is_err());
    }

    #[test]
    fn label_lookup_by_name() {
        let sample = Sample::new(descriptor(&["instance"]), 3.0, vec!["vmA".to_string()]).unwrap();
        assert_eq!(Some("vmA"), sample.label("instance"));
        assert_eq!(None, sample.label("timezone"));
        assert_eq!(3.0, sample.value());
    }

    #[test]
    fn concurrent_writers_keep_batches_contiguous() {
        let sink = SampleSink::new();
        let a = descriptor(&["instance"]);

        std::thread::scope(|scope| {
            for writer in 0..4 {
                let sink = &sink;
                let a = a.clone();
                scope.spawn(move || {
                    let batch = (0..100).map(|i| {
                        Sample::new(a.clone(), i as f64, vec![writer.to_string()]).unwrap()
                    });
                    sink.extend(batch);
                });
            }
        });

        let samples = sink.into_samples();
        assert_eq!(400, samples.len());
        for chunk in samples.chunks(100) {
            let writer = chunk[0].label("instance");
            assert!(chunk.iter().all(|s| s.label("instance") == writer));
            assert!(chunk
                .iter()
                .enumerate()
                .all(|(i, s)| s.value() == i as f64));
        }
    }
}
