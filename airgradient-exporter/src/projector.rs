//! Projection of a measurement snapshot onto Prometheus metrics.
//!
//! The metric set is fixed: one `airgradient_device_info` sample carrying the
//! device identity as labels, followed by one sample per numeric measure.
//! Names and help texts are declared once in [`NUMERIC_METRICS`] and can be
//! listed with [`Projector::describe`] without talking to the device.

use std::fmt::{self, Write};

use clap::ValueEnum;
use prometheus_client::collector::Collector;
use prometheus_client::encoding::{
    DescriptorEncoder, EncodeLabelValue, EncodeMetric, LabelValueEncoder, text,
};
use prometheus_client::metrics::counter::ConstCounter;
use prometheus_client::metrics::gauge::ConstGauge;
use prometheus_client::metrics::info::Info;
use prometheus_client::registry::Registry;
use serde::{Deserialize, Serialize};

use crate::snapshot::Snapshot;

/// Prefix shared by every exported metric.
pub const METRIC_PREFIX: &str = "airgradient";

/// Label carrying the device serial number.
pub const SERIAL_LABEL: &str = "serialno";

/// Labels of the info metric, in emission order.
pub const INFO_LABELS: [&str; 4] = [SERIAL_LABEL, "firmware", "model", "ledmode"];

const INFO_NAME: &str = "device";
const INFO_HELP: &str = "Device information";

/// Which labels numeric samples carry.
///
/// This is a per-deployment decision; the info sample always carries the
/// full device identity regardless.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum LabelPolicy {
    /// Numeric samples are unlabeled; one device per scrape target.
    #[default]
    InfoOnly,
    /// Every numeric sample carries `serialno`, so several devices can share
    /// one scrape target.
    Serial,
}

impl LabelPolicy {
    /// Get the policy name as used in configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            LabelPolicy::InfoOnly => "info-only",
            LabelPolicy::Serial => "serial",
        }
    }
}

impl fmt::Display for LabelPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Prometheus metric kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Gauge,
    Counter,
    Info,
}

impl MetricKind {
    /// Get the Prometheus TYPE string.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Gauge => "gauge",
            MetricKind::Counter => "counter",
            MetricKind::Info => "info",
        }
    }

    /// Suffix appended to the family name on sample lines.
    fn sample_suffix(&self) -> Option<&'static str> {
        match self {
            MetricKind::Gauge => None,
            MetricKind::Counter => Some("total"),
            MetricKind::Info => Some("info"),
        }
    }
}

/// A numeric measure and how to read it from a snapshot.
pub struct NumericMetric {
    /// Family name without prefix or suffix.
    pub name: &'static str,
    pub help: &'static str,
    pub kind: MetricKind,
    value: fn(&Snapshot) -> f64,
}

impl fmt::Debug for NumericMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NumericMetric")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

macro_rules! numeric {
    ($name:literal, $kind:ident, $help:literal, |$s:ident| $value:expr) => {
        NumericMetric {
            name: $name,
            help: $help,
            kind: MetricKind::$kind,
            value: |$s: &Snapshot| $value as f64,
        }
    };
}

/// Every numeric measure, in emission order.
pub static NUMERIC_METRICS: [NumericMetric; 16] = [
    numeric!("wifi", Gauge, "WiFi signal strength", |s| s.wifi),
    numeric!("pm01", Gauge, "PM1 in ug/m3", |s| s.pm01),
    numeric!("pm02", Gauge, "PM2.5 in ug/m3", |s| s.pm02),
    numeric!("pm10", Gauge, "PM10 in ug/m3", |s| s.pm10),
    numeric!(
        "pm02_compensated",
        Gauge,
        "PM2.5 in ug/m3 with correction applied",
        |s| s.pm02_compensated
    ),
    numeric!("rco2", Gauge, "CO2 in ppm", |s| s.rco2),
    numeric!("pm003_count", Gauge, "Particle count per dL", |s| s.pm003_count),
    numeric!("atmp", Gauge, "Temperature in Degrees Celsius", |s| s.atmp),
    numeric!(
        "atmp_compensated",
        Gauge,
        "Temperature in Degrees Celsius with correction applied",
        |s| s.atmp_compensated
    ),
    numeric!("rhum", Gauge, "Relative Humidity", |s| s.rhum),
    numeric!(
        "rhum_compensated",
        Gauge,
        "Relative Humidity with correction applied",
        |s| s.rhum_compensated
    ),
    numeric!("tvoc_index", Gauge, "Sensirion VOC Index", |s| s.tvoc_index),
    numeric!("tvoc_raw", Gauge, "VOC raw value", |s| s.tvoc_raw),
    numeric!("nox_index", Gauge, "Sensirion NOx Index", |s| s.nox_index),
    numeric!("nox_raw", Gauge, "NOx raw value", |s| s.nox_raw),
    numeric!(
        "boot",
        Counter,
        "The total uptime of the device in minutes",
        |s| s.boot
    ),
];

/// Static description of one metric family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    /// Family name, including the prefix.
    pub name: String,
    pub help: &'static str,
    pub kind: MetricKind,
    /// Label names carried by every sample of this family.
    pub labels: Vec<&'static str>,
}

impl Descriptor {
    fn new(name: &str, help: &'static str, kind: MetricKind, labels: Vec<&'static str>) -> Self {
        Self {
            name: format!("{}_{}", METRIC_PREFIX, name),
            help,
            kind,
            labels,
        }
    }

    /// Name used on sample lines, e.g. `airgradient_boot_total`.
    pub fn sample_name(&self) -> String {
        match self.kind.sample_suffix() {
            Some(suffix) => format!("{}_{}", self.name, suffix),
            None => self.name.clone(),
        }
    }
}

/// One projected value.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Family name without prefix or suffix.
    pub name: &'static str,
    pub help: &'static str,
    pub kind: MetricKind,
    pub labels: Vec<(String, String)>,
    pub value: f64,
}

/// Maps snapshots onto the fixed metric set.
#[derive(Debug, Clone, Copy, Default)]
pub struct Projector {
    policy: LabelPolicy,
}

impl Projector {
    /// Create a projector with the given labeling policy.
    pub fn new(policy: LabelPolicy) -> Self {
        Self { policy }
    }

    /// The labeling policy in use.
    pub fn policy(&self) -> LabelPolicy {
        self.policy
    }

    fn numeric_label_names(&self) -> Vec<&'static str> {
        match self.policy {
            LabelPolicy::InfoOnly => Vec::new(),
            LabelPolicy::Serial => vec![SERIAL_LABEL],
        }
    }

    /// Every metric family this projector can emit, in emission order.
    pub fn describe(&self) -> Vec<Descriptor> {
        let mut descriptors = Vec::with_capacity(NUMERIC_METRICS.len() + 1);
        descriptors.push(Descriptor::new(
            INFO_NAME,
            INFO_HELP,
            MetricKind::Info,
            INFO_LABELS.to_vec(),
        ));
        descriptors.extend(NUMERIC_METRICS.iter().map(|metric| {
            Descriptor::new(
                metric.name,
                metric.help,
                metric.kind,
                self.numeric_label_names(),
            )
        }));
        descriptors
    }

    /// Project a snapshot: the info sample first, then one sample per
    /// numeric measure.
    pub fn project(&self, snapshot: &Snapshot) -> Vec<Sample> {
        let info_values = [
            &snapshot.serial_no,
            &snapshot.firmware,
            &snapshot.model,
            &snapshot.led_mode,
        ];
        let info_labels = INFO_LABELS
            .iter()
            .zip(info_values)
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();

        let numeric_labels = match self.policy {
            LabelPolicy::InfoOnly => Vec::new(),
            LabelPolicy::Serial => vec![(SERIAL_LABEL.to_string(), snapshot.serial_no.clone())],
        };

        let mut samples = Vec::with_capacity(NUMERIC_METRICS.len() + 1);
        samples.push(Sample {
            name: INFO_NAME,
            help: INFO_HELP,
            kind: MetricKind::Info,
            labels: info_labels,
            value: 1.0,
        });
        samples.extend(NUMERIC_METRICS.iter().map(|metric| Sample {
            name: metric.name,
            help: metric.help,
            kind: metric.kind,
            labels: numeric_labels.clone(),
            value: (metric.value)(snapshot),
        }));
        samples
    }

    /// Render one scrape round in the OpenMetrics text format.
    ///
    /// `None` means the fetch failed: the output is well-formed but holds no
    /// samples.
    pub fn render(&self, snapshot: Option<&Snapshot>) -> Result<String, fmt::Error> {
        let mut registry = Registry::with_prefix(METRIC_PREFIX);

        if let Some(snapshot) = snapshot {
            registry.register_collector(Box::new(ScrapeRound {
                samples: self.project(snapshot),
            }));
        }

        let mut body = String::new();
        text::encode(&mut body, &registry)?;
        Ok(body)
    }
}

/// The samples of one scrape round. Help texts are emitted as declared.
#[derive(Debug)]
struct ScrapeRound {
    samples: Vec<Sample>,
}

impl Collector for ScrapeRound {
    fn encode(&self, mut encoder: DescriptorEncoder) -> Result<(), fmt::Error> {
        for sample in &self.samples {
            let labels: Labels<'_> = sample
                .labels
                .iter()
                .map(|(k, v)| (k.as_str(), LabelValue(v.clone())))
                .collect();

            match sample.kind {
                MetricKind::Info => {
                    let info = Info::new(labels);
                    let metric_encoder = encoder.encode_descriptor(
                        sample.name,
                        sample.help,
                        None,
                        info.metric_type(),
                    )?;
                    info.encode(metric_encoder)?;
                }
                MetricKind::Gauge => {
                    encode_sample(&mut encoder, sample, &labels, ConstGauge::new(sample.value))?
                }
                MetricKind::Counter => {
                    encode_sample(&mut encoder, sample, &labels, ConstCounter::new(sample.value))?
                }
            }
        }
        Ok(())
    }
}

fn encode_sample(
    encoder: &mut DescriptorEncoder,
    sample: &Sample,
    labels: &Labels<'_>,
    metric: impl EncodeMetric,
) -> Result<(), fmt::Error> {
    let mut metric_encoder =
        encoder.encode_descriptor(sample.name, sample.help, None, metric.metric_type())?;
    if labels.is_empty() {
        metric.encode(metric_encoder)
    } else {
        metric.encode(metric_encoder.encode_family(labels)?)
    }
}

type Labels<'a> = Vec<(&'a str, LabelValue)>;

/// A label value escaped for the text exposition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct LabelValue(String);

impl EncodeLabelValue for LabelValue {
    fn encode(&self, encoder: &mut LabelValueEncoder) -> Result<(), fmt::Error> {
        encoder.write_str(&escape_label_value(&self.0))
    }
}

/// Escape a label value (`\`, `"` and newline).
fn escape_label_value(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            '\n' => result.push_str("\\n"),
            _ => result.push(c),
        }
    }
    result
}
