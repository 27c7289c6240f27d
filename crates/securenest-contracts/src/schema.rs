//! Output contract handed to the generation service alongside the images.
//!
//! The schema uses the service's uppercase type names (`OBJECT`, `ARRAY`,
//! `STRING`, `NUMBER`) and mirrors [`crate::plan::SecurityPlan`] field for
//! field. Keep the two in sync.

use serde_json::{json, Value};

use crate::plan::Priority;

pub const ANALYSIS_INSTRUCTION: &str = "You are a world-class home security engineer and architect.
Analyze the provided images of a home.
Identify potential security risks (entry points, blind spots, lighting issues).
Design a complete security ecosystem for this user.
Provide a Bill of Materials (BOM) with realistic market prices in USD.
Return the response in strict JSON format matching the schema.";

pub const PLAN_REQUIRED_FIELDS: &[&str] = &[
    "vulnerabilities",
    "recommendations",
    "totalEstimatedCostMin",
    "totalEstimatedCostMax",
    "executiveSummary",
    "ecosystemBenefits",
];

pub const DEVICE_REQUIRED_FIELDS: &[&str] = &[
    "name",
    "category",
    "description",
    "reasoning",
    "estimatedCost",
    "priority",
];

pub fn security_plan_schema() -> Value {
    let priorities: Vec<&str> = Priority::ALL.iter().map(Priority::as_str).collect();
    json!({
        "type": "OBJECT",
        "properties": {
            "vulnerabilities": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "List of identified security weaknesses based on the image (e.g., dark corners, glass doors).",
            },
            "recommendations": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "name": { "type": "STRING", "description": "Name of the device (e.g., 'Outdoor Floodlight Camera')" },
                        "category": { "type": "STRING", "description": "Type of device" },
                        "description": { "type": "STRING", "description": "Brief tech specs or features" },
                        "reasoning": { "type": "STRING", "description": "Why this device is needed for this specific home" },
                        "estimatedCost": { "type": "NUMBER", "description": "Estimated average market price in USD" },
                        "priority": { "type": "STRING", "enum": priorities },
                    },
                    "required": DEVICE_REQUIRED_FIELDS,
                },
            },
            "totalEstimatedCostMin": { "type": "NUMBER", "description": "Minimum total budget estimate" },
            "totalEstimatedCostMax": { "type": "NUMBER", "description": "Maximum total budget estimate" },
            "executiveSummary": { "type": "STRING", "description": "A paragraph summarizing the security strategy." },
            "ecosystemBenefits": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "List of benefits of this integrated system.",
            },
        },
        "required": PLAN_REQUIRED_FIELDS,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::{security_plan_schema, DEVICE_REQUIRED_FIELDS, PLAN_REQUIRED_FIELDS};

    #[test]
    fn every_required_field_is_declared() {
        let schema = security_plan_schema();
        let properties = schema["properties"].as_object().cloned().unwrap_or_default();
        for field in PLAN_REQUIRED_FIELDS {
            assert!(properties.contains_key(*field), "missing property {field}");
        }
        assert_eq!(schema["required"], json!(PLAN_REQUIRED_FIELDS));

        let device = &schema["properties"]["recommendations"]["items"];
        for field in DEVICE_REQUIRED_FIELDS {
            assert!(
                device["properties"].get(*field).is_some(),
                "missing device property {field}"
            );
        }
        assert_eq!(device["required"], json!(DEVICE_REQUIRED_FIELDS));
    }

    #[test]
    fn priority_enum_matches_plan_type() {
        let schema = security_plan_schema();
        assert_eq!(
            schema["properties"]["recommendations"]["items"]["properties"]["priority"]["enum"],
            json!(["High", "Medium", "Low"])
        );
        assert_eq!(
            schema["properties"]["totalEstimatedCostMin"]["type"],
            Value::String("NUMBER".to_string())
        );
    }
}
