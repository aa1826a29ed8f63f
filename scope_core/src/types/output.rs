use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Payload produced by one completed plugin invocation.
///
/// Each module owns a variant with a typed schema. `Raw` carries an arbitrary
/// JSON document for modules that have not defined one yet; its consumers are
/// expected to agree on the shape out of band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum ModuleOutput {
    PortScanPreparation(PreparationVerdict),
    Raw(Value),
}

/// Decision taken before port scanning a target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreparationVerdict {
    /// Host the verdict applies to
    pub target: String,

    /// Whether port scanning should be skipped
    pub skip_port_scan: bool,

    /// Why the scan is skipped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl PreparationVerdict {
    pub fn proceed(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            skip_port_scan: false,
            reason: None,
        }
    }

    pub fn skip(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            skip_port_scan: true,
            reason: Some(reason.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_output_wire_shape() {
        let output = ModuleOutput::PortScanPreparation(PreparationVerdict::skip(
            "example.com",
            "behind a CDN",
        ));
        assert_eq!(
            serde_json::to_value(&output).unwrap(),
            json!({
                "kind": "port_scan_preparation",
                "data": {
                    "target": "example.com",
                    "skip_port_scan": true,
                    "reason": "behind a CDN"
                }
            })
        );

        let output = ModuleOutput::PortScanPreparation(PreparationVerdict::proceed("10.0.0.1"));
        let value = serde_json::to_value(&output).unwrap();
        assert!(value["data"].get("reason").is_none());
    }
}
