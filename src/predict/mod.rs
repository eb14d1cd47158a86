//! Rule-based deployment risk scoring.
//!
//! A fixed rule table: each rule adds points, reasons and recommendations.
//! The uncapped total picks the risk level and stretches the downtime
//! estimate. The reported score is capped at 100.

use serde::{Deserialize, Serialize};

const CRITICAL_SERVICES: [&str; 3] = ["payments", "database", "auth"];
const HIGH_RISK_KEYWORDS: [&str; 5] = ["schema", "migration", "refactor", "breaking", "restructure"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateType {
    Minor,
    Major,
    Hotfix,
}

impl std::str::FromStr for UpdateType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "minor" => Ok(UpdateType::Minor),
            "major" => Ok(UpdateType::Major),
            "hotfix" => Ok(UpdateType::Hotfix),
            other => Err(format!("unknown update type '{other}' (expected minor, major or hotfix)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    fn from_score(score: u32) -> Self {
        match score {
            0..=30 => RiskLevel::Low,
            31..=60 => RiskLevel::Medium,
            _ => RiskLevel::High,
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateRiskRequest {
    pub update_title: String,
    pub update_type: UpdateType,
    pub services_affected: Vec<String>,
    pub db_migration: bool,
    pub expected_minutes: u32,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateRiskResponse {
    pub risk_score: u32,
    pub risk_level: RiskLevel,
    pub predicted_downtime_min: u32,
    pub predicted_downtime_max: u32,
    pub reasons: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Score a proposed deployment.
pub fn predict_risk(req: &UpdateRiskRequest) -> UpdateRiskResponse {
    let mut score: u32 = 0;
    let mut reasons: Vec<String> = Vec::new();
    let mut recommendations: Vec<String> = Vec::new();

    match req.update_type {
        UpdateType::Major => {
            score += 25;
            reasons.push("Major updates have higher risk of breaking changes".into());
            recommendations.push("Consider staging environment testing before production".into());
        }
        UpdateType::Hotfix => {
            score += 15;
            reasons.push("Hotfixes are often rushed and may introduce new issues".into());
            recommendations.push("Ensure comprehensive testing despite urgency".into());
        }
        UpdateType::Minor => {
            score += 5;
            reasons.push("Minor updates typically have lower risk".into());
        }
    }

    if req.db_migration {
        score += 30;
        reasons.push("Database migrations increase rollback complexity".into());
        recommendations.push("Create database backup before migration".into());
        recommendations.push("Test migration on staging environment first".into());
        recommendations.push("Have rollback script ready".into());
    }

    let critical: Vec<&str> = req
        .services_affected
        .iter()
        .map(String::as_str)
        .filter(|s| CRITICAL_SERVICES.contains(&s.to_lowercase().as_str()))
        .collect();
    if !critical.is_empty() {
        score += 20 * critical.len() as u32;
        reasons.push(format!("Critical services affected: {}", critical.join(", ")));
        recommendations.push("Schedule update during low-traffic period".into());
        recommendations.push("Enable maintenance mode before deployment".into());
    }

    if req.expected_minutes > 15 {
        score += 15;
        reasons.push("Longer deployment windows increase exposure to issues".into());
        recommendations.push("Break down into smaller, incremental updates if possible".into());
    }

    let description = req.description.to_lowercase();
    let keywords: Vec<&str> = HIGH_RISK_KEYWORDS
        .iter()
        .copied()
        .filter(|kw| description.contains(kw))
        .collect();
    if !keywords.is_empty() {
        score += 10;
        reasons.push(format!(
            "Description contains high-risk keywords: {}",
            keywords.join(", ")
        ));
    }

    if req.services_affected.len() > 3 {
        score += 10;
        reasons.push("Multiple services affected increases coordination complexity".into());
        recommendations.push("Consider deploying services sequentially".into());
    }

    let risk_level = RiskLevel::from_score(score);
    if risk_level == RiskLevel::High {
        recommendations.push("Consider postponing if not critical".into());
        recommendations.push("Ensure full team is available during deployment".into());
    }

    let expected = f64::from(req.expected_minutes);
    let predicted_downtime_min = ((expected * 0.8) as u32).max(1);
    let predicted_downtime_max = (expected * (1.4 + f64::from(score) / 100.0 * 0.3)) as u32;

    if recommendations.is_empty() {
        recommendations.push("Standard deployment procedures should be sufficient".into());
    }
    if reasons.is_empty() {
        reasons.push("Low risk deployment".into());
    }

    UpdateRiskResponse {
        risk_score: score.min(100),
        risk_level,
        predicted_downtime_min,
        predicted_downtime_max,
        reasons,
        recommendations,
    }
}
