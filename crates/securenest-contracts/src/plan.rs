use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recommended product in a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityDevice {
    pub name: String,
    pub category: String,
    pub description: String,
    pub reasoning: String,
    pub estimated_cost: f64,
    pub priority: Priority,
}

/// Structured analysis result exactly as returned by the generation service.
///
/// Every field is required on the wire; unknown extra fields are ignored.
/// Cost figures are passed through untouched, so `total_estimated_cost_min <=
/// total_estimated_cost_max` holds only as far as the service honors it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityPlan {
    pub vulnerabilities: Vec<String>,
    pub recommendations: Vec<SecurityDevice>,
    pub total_estimated_cost_min: f64,
    pub total_estimated_cost_max: f64,
    pub executive_summary: String,
    pub ecosystem_benefits: Vec<String>,
}

impl SecurityPlan {
    pub fn devices_with_priority(
        &self,
        priority: Priority,
    ) -> impl Iterator<Item = &SecurityDevice> {
        self.recommendations
            .iter()
            .filter(move |device| device.priority == priority)
    }

    pub fn listed_device_cost(&self) -> f64 {
        self.recommendations
            .iter()
            .map(|device| device.estimated_cost)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{Priority, SecurityPlan};

    fn sample_plan_json() -> serde_json::Value {
        json!({
            "vulnerabilities": ["dark driveway", "glass back door"],
            "recommendations": [
                {
                    "name": "Floodlight Cam",
                    "category": "Camera",
                    "description": "1080p, motion-activated",
                    "reasoning": "covers dark driveway",
                    "estimatedCost": 120,
                    "priority": "High"
                },
                {
                    "name": "Glass Break Sensor",
                    "category": "Sensor",
                    "description": "acoustic, 25ft range",
                    "reasoning": "back door is mostly glass",
                    "estimatedCost": 35.5,
                    "priority": "Medium"
                }
            ],
            "totalEstimatedCostMin": 150,
            "totalEstimatedCostMax": 210,
            "executiveSummary": "Light the driveway and watch the rear entry.",
            "ecosystemBenefits": ["deters intrusion"]
        })
    }

    #[test]
    fn plan_reads_camel_case_fields() -> anyhow::Result<()> {
        let plan: SecurityPlan = serde_json::from_value(sample_plan_json())?;
        assert_eq!(plan.vulnerabilities.len(), 2);
        assert_eq!(plan.recommendations[0].estimated_cost, 120.0);
        assert_eq!(plan.recommendations[1].priority, Priority::Medium);
        assert_eq!(plan.total_estimated_cost_max, 210.0);
        let reparsed: SecurityPlan = serde_json::from_value(serde_json::to_value(&plan)?)?;
        assert_eq!(reparsed, plan);
        Ok(())
    }

    #[test]
    fn priority_outside_enum_is_rejected() {
        let mut payload = sample_plan_json();
        payload["recommendations"][0]["priority"] = json!("Urgent");
        assert!(serde_json::from_value::<SecurityPlan>(payload).is_err());
    }

    #[test]
    fn priority_filter_and_listed_cost() -> anyhow::Result<()> {
        let plan: SecurityPlan = serde_json::from_value(sample_plan_json())?;
        let high: Vec<&str> = plan
            .devices_with_priority(Priority::High)
            .map(|device| device.name.as_str())
            .collect();
        assert_eq!(high, vec!["Floodlight Cam"]);
        assert_eq!(plan.devices_with_priority(Priority::Low).count(), 0);
        assert_eq!(plan.listed_device_cost(), 155.5);
        Ok(())
    }
}
