//! Prometheus text exposition format, version 0.0.4.
//!
//! ```
//! # use std::sync::Arc;
//! # use hyperv_exporter::encoding::text::encode;
//! # use hyperv_exporter::registry::{DescriptorRegistry, NAMESPACE};
//! # use hyperv_exporter::sample::Sample;
//! let mut registry = DescriptorRegistry::new(NAMESPACE);
//! let pages = registry
//!     .register("pages", "vid", "physical_pages_allocated", "Pages allocated", &["instance"])
//!     .unwrap();
//!
//! let samples = vec![Sample::new(pages, 1024.0, vec!["vmA".to_string()]).unwrap()];
//! let mut buffer = String::new();
//! encode(&mut buffer, &samples).unwrap();
//!
//! let expected = "# HELP hyperv_vid_physical_pages_allocated Pages allocated.\n".to_owned()
//!     + "# TYPE hyperv_vid_physical_pages_allocated gauge\n"
//!     + "hyperv_vid_physical_pages_allocated{instance=\"vmA\"} 1024\n";
//! assert_eq!(expected, buffer);
//! ```

use std::collections::HashMap;
use std::fmt::Write;

use crate::registry::Descriptor;
use crate::sample::Sample;

/// Content type of the rendered exposition.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Largest magnitude below which every integral `f64` is exact.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Encodes `samples` into the text format, appending to `writer`.
///
/// Samples are grouped under their metric, metrics appear in the order their
/// first sample does. `# HELP` and `# TYPE` are written once per metric.
pub fn encode<W: Write>(writer: &mut W, samples: &[Sample]) -> Result<(), std::fmt::Error> {
    let mut families: Vec<(&Descriptor, Vec<&Sample>)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for sample in samples {
        let descriptor = sample.descriptor().as_ref();
        match index.get(descriptor.name()) {
            Some(&i) => families[i].1.push(sample),
            None => {
                index.insert(descriptor.name(), families.len());
                families.push((descriptor, vec![sample]));
            }
        }
    }

    for (descriptor, samples) in families {
        encode_descriptor(writer, descriptor)?;
        for sample in samples {
            encode_sample(writer, descriptor, sample)?;
        }
    }

    Ok(())
}

fn encode_descriptor<W: Write>(writer: &mut W, descriptor: &Descriptor) -> std::fmt::Result {
    writer.write_str("# HELP ")?;
    writer.write_str(descriptor.name())?;
    writer.write_str(" ")?;
    write_escaped(writer, descriptor.help(), false)?;
    writer.write_str("\n")?;

    writer.write_str("# TYPE ")?;
    writer.write_str(descriptor.name())?;
    writer.write_str(" ")?;
    writer.write_str(descriptor.metric_type().as_str())?;
    writer.write_str("\n")
}

fn encode_sample<W: Write>(
    writer: &mut W,
    descriptor: &Descriptor,
    sample: &Sample,
) -> std::fmt::Result {
    writer.write_str(descriptor.name())?;

    if !sample.label_values().is_empty() {
        writer.write_str("{")?;
        let labels = descriptor.label_names().iter().zip(sample.label_values());
        for (i, (name, value)) in labels.enumerate() {
            if i > 0 {
                writer.write_str(",")?;
            }
            writer.write_str(name)?;
            writer.write_str("=\"")?;
            write_escaped(writer, value, true)?;
            writer.write_str("\"")?;
        }
        writer.write_str("}")?;
    }

    writer.write_str(" ")?;
    encode_value(writer, sample.value())?;
    writer.write_str("\n")
}

fn encode_value<W: Write>(writer: &mut W, v: f64) -> std::fmt::Result {
    if v.is_nan() {
        writer.write_str("NaN")
    } else if v.is_infinite() {
        writer.write_str(if v.is_sign_positive() { "+Inf" } else { "-Inf" })
    } else if v.fract() == 0.0 && v.abs() <= MAX_EXACT_INTEGER {
        writer.write_str(itoa::Buffer::new().format(v as i64))
    } else {
        writer.write_str(dtoa::Buffer::new().format_finite(v))
    }
}

/// Escapes `\` and newlines, plus `"` inside label values.
fn write_escaped<W: Write>(writer: &mut W, s: &str, quote: bool) -> std::fmt::Result {
    for c in s.chars() {
        match c {
            '\\' => writer.write_str("\\\\")?,
            '\n' => writer.write_str("\\n")?,
            '"' if quote => writer.write_str("\\\"")?,
            c => writer.write_char(c)?,
        }
    }
    Ok(())
}
