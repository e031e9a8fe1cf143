//! Gauge family definitions shared by all collectors
//!
//! Collectors build fresh families every cycle, so a family only ever
//! carries values from the latest round trip. Series keep the order in
//! which they were observed, one per observation.

use crate::error::Result;
use prometheus::core::Desc;
use prometheus::proto::{Gauge, LabelPair, Metric, MetricFamily, MetricType};
use std::collections::HashMap;

/// Prefix of every upstream-derived metric
pub const NAMESPACE: &str = "lcp_api";

/// Static shape of one gauge family: `<namespace>_<subsystem>_<name>{labels}`
#[derive(Debug, Clone, Copy)]
pub struct GaugeSpec {
    pub subsystem: &'static str,
    pub name: &'static str,
    pub help: &'static str,
    pub labels: &'static [&'static str],
}

impl GaugeSpec {
    pub const fn new(
        subsystem: &'static str,
        name: &'static str,
        help: &'static str,
        labels: &'static [&'static str],
    ) -> Self {
        Self {
            subsystem,
            name,
            help,
            labels,
        }
    }

    pub fn fq_name(&self) -> String {
        format!("{}_{}_{}", NAMESPACE, self.subsystem, self.name)
    }

    pub fn desc(&self) -> Result<Desc> {
        Ok(Desc::new(
            self.fq_name(),
            self.help.to_string(),
            self.labels.iter().map(|l| l.to_string()).collect(),
            HashMap::new(),
        )?)
    }

    /// A new, empty family for this spec
    pub fn family(&self) -> GaugeFamily {
        GaugeFamily {
            spec: *self,
            metrics: Vec::new(),
        }
    }
}

/// Gauge series accumulated in observation order
#[derive(Debug)]
pub struct GaugeFamily {
    spec: GaugeSpec,
    metrics: Vec<Metric>,
}

impl GaugeFamily {
    /// Append one series; `values` pair up with the spec's label names
    pub fn observe(&mut self, values: &[&str], value: f64) -> Result<()> {
        if values.len() != self.spec.labels.len() {
            return Err(prometheus::Error::InconsistentCardinality {
                expect: self.spec.labels.len(),
                got: values.len(),
            }
            .into());
        }

        let mut metric = Metric::default();
        for (name, label_value) in self.spec.labels.iter().zip(values) {
            let mut pair = LabelPair::default();
            pair.set_name(name.to_string());
            pair.set_value(label_value.to_string());
            metric.mut_label().push(pair);
        }

        let mut gauge = Gauge::default();
        gauge.set_value(value);
        metric.set_gauge(gauge);

        self.metrics.push(metric);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    pub fn into_family(self) -> MetricFamily {
        let mut family = MetricFamily::default();
        family.set_name(self.spec.fq_name());
        family.set_help(self.spec.help.to_string());
        family.set_field_type(MetricType::GAUGE);
        for metric in self.metrics {
            family.mut_metric().push(metric);
        }
        family
    }
}

/// Descriptors for a list of specs
pub fn describe_all(specs: &[GaugeSpec]) -> Result<Vec<Desc>> {
    specs.iter().map(GaugeSpec::desc).collect()
}

/// Finish the given families, in order
pub fn families(families: impl IntoIterator<Item = GaugeFamily>) -> Vec<MetricFamily> {
    families.into_iter().map(GaugeFamily::into_family).collect()
}
