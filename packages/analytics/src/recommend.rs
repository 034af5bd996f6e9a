//! Rule-based policy recommendations.
//!
//! A fixed rule table over the hotspot, precision and importance
//! artifacts. Rules fire in table order and the output order is stable for
//! identical inputs.

use crime_analysis_analytics_models::{
    BucketValue, FeatureImportance, HotspotReport, PolicyRecommendation, PrecisionMatrixResult,
    Priority, RecommendationTopic, RiskLevel,
};
use crime_analysis_crime_models::InputColumn;
use crime_analysis_ingest_models::IngestDiagnostics;

/// Overall violent share above which violent crime gets its own
/// recommendation.
pub const VIOLENT_SHARE_THRESHOLD: f64 = 0.3;

/// Input completeness below which data collection is flagged.
pub const COMPLETENESS_THRESHOLD: f64 = 0.9;

/// Peak-hour buckets named in the temporal deployment rule.
const PEAK_HOURS: usize = 3;

/// Top features named in the monitoring rule.
const MONITORED_FEATURES: usize = 3;

/// Everything the rule table reads. Absent artifacts (a failed component)
/// simply skip the rules that need them.
#[derive(Debug, Clone, Copy)]
pub struct RecommendationInputs<'a> {
    /// Hotspots grouped by city.
    pub hotspots: &'a HotspotReport,
    /// Hotspots grouped by hour of day.
    pub hourly: Option<&'a HotspotReport>,
    pub precision: Option<&'a PrecisionMatrixResult>,
    /// Importances, highest first.
    pub importances: Option<&'a [FeatureImportance]>,
    pub diagnostics: Option<&'a IngestDiagnostics>,
    /// Hotspots named in the patrol allocation rule.
    pub top_n: usize,
}

#[allow(clippy::cast_precision_loss)]
fn percent(ratio: f64) -> String {
    format!("{:.0}%", ratio * 100.0)
}

const fn time_period(hour: u8) -> &'static str {
    match hour {
        6..=11 => "morning",
        12..=17 => "afternoon",
        18..=21 => "evening",
        _ => "night",
    }
}

/// Share of required input cells that were present and parseable.
#[allow(clippy::cast_precision_loss)]
fn completeness(diagnostics: &IngestDiagnostics) -> Option<f64> {
    let cells = diagnostics.rows_in * InputColumn::REQUIRED.len() as u64;
    if cells == 0 {
        return None;
    }
    let bad: u64 = InputColumn::REQUIRED
        .iter()
        .map(|column| {
            let field = diagnostics.field(*column);
            field.missing + field.parse_failures
        })
        .sum();
    Some(1.0 - bad as f64 / cells as f64)
}

#[allow(clippy::cast_precision_loss)]
fn violent_share(report: &HotspotReport) -> Option<f64> {
    if report.total_records == 0 {
        return None;
    }
    let violent: u64 = report.hotspots.iter().map(|h| h.violent_count).sum();
    Some(violent as f64 / report.total_records as f64)
}

fn recommendation(
    topic: RecommendationTopic,
    priority: Priority,
    rationale: String,
    action: impl Into<String>,
) -> PolicyRecommendation {
    PolicyRecommendation {
        topic,
        priority,
        rationale,
        action: action.into(),
    }
}

fn patrol_allocation(inputs: &RecommendationInputs<'_>) -> Option<PolicyRecommendation> {
    let top = inputs.hotspots.top(inputs.top_n);
    if top.is_empty() {
        return None;
    }
    let described: Vec<String> = top
        .iter()
        .map(|h| {
            let ratio = h.violent_ratio.map_or_else(|| "n/a".to_string(), percent);
            format!("{} ({} incidents, {ratio} violent)", h.label(), h.incident_count)
        })
        .collect();
    let names: Vec<String> = top.iter().map(|h| h.label()).collect();
    let critical = inputs.hotspots.at_risk(RiskLevel::Critical).count();

    let mut rationale = format!("Top hotspots: {}", described.join(", "));
    if critical > 0 {
        rationale.push_str(&format!("; {critical} area(s) at critical risk"));
    }
    Some(recommendation(
        RecommendationTopic::ResourceAllocation,
        Priority::Immediate,
        rationale,
        format!(
            "Deploy additional patrol units and rapid response teams to {}",
            names.join(", ")
        ),
    ))
}

fn temporal_deployment(inputs: &RecommendationInputs<'_>) -> Option<PolicyRecommendation> {
    let hourly = inputs.hourly?;
    let peaks: Vec<String> = hourly
        .hotspots
        .iter()
        .filter_map(|h| match h.bucket {
            Some(BucketValue::Hour(hour)) => Some(format!(
                "{} ({}, {} incidents)",
                BucketValue::Hour(hour),
                time_period(hour),
                h.incident_count
            )),
            _ => None,
        })
        .take(PEAK_HOURS)
        .collect();
    if peaks.is_empty() {
        return None;
    }
    Some(recommendation(
        RecommendationTopic::TemporalDeployment,
        Priority::Immediate,
        format!("Peak crime hours: {}", peaks.join(", ")),
        "Increase patrol presence and surveillance during peak hours",
    ))
}

fn violent_focus(inputs: &RecommendationInputs<'_>) -> Option<PolicyRecommendation> {
    let share = violent_share(inputs.hotspots);
    let critical: Vec<String> = inputs
        .hotspots
        .at_risk(RiskLevel::Critical)
        .map(|h| h.label())
        .collect();
    let high_share = share.is_some_and(|s| s > VIOLENT_SHARE_THRESHOLD);
    if !high_share && critical.is_empty() {
        return None;
    }

    let mut reasons = Vec::new();
    if let Some(share) = share.filter(|_| high_share) {
        reasons.push(format!(
            "violent crimes are {} of all incidents (above {})",
            percent(share),
            percent(VIOLENT_SHARE_THRESHOLD)
        ));
    }
    if !critical.is_empty() {
        reasons.push(format!("critical-risk areas: {}", critical.join(", ")));
    }
    Some(recommendation(
        RecommendationTopic::ViolentCrimeFocus,
        Priority::Immediate,
        capitalize(&reasons.join("; ")),
        "Establish specialized violent crime units and intervention programs",
    ))
}

fn feature_monitoring(inputs: &RecommendationInputs<'_>) -> Option<PolicyRecommendation> {
    let top: Vec<String> = inputs
        .importances?
        .iter()
        .filter(|f| f.importance > 0.0)
        .take(MONITORED_FEATURES)
        .map(|f| format!("{} ({:.3})", f.feature, f.importance))
        .collect();
    if top.is_empty() {
        return None;
    }
    Some(recommendation(
        RecommendationTopic::FeatureMonitoring,
        Priority::ShortTerm,
        format!("Strongest predictors of violent crime: {}", top.join(", ")),
        "Track these factors in routine reporting and use them to prioritize predictive policing",
    ))
}

fn conditional_dependency(inputs: &RecommendationInputs<'_>) -> Option<PolicyRecommendation> {
    let edge = inputs.precision?.edges.first()?;
    Some(recommendation(
        RecommendationTopic::ConditionalDependency,
        Priority::ShortTerm,
        format!(
            "{} and {} remain dependent given all other factors (partial correlation {:.3})",
            edge.feature_a, edge.feature_b, edge.partial_correlation
        ),
        format!(
            "Analyze {} and {} jointly when planning interventions",
            edge.feature_a, edge.feature_b
        ),
    ))
}

fn data_collection(inputs: &RecommendationInputs<'_>) -> Option<PolicyRecommendation> {
    let mut reasons = Vec::new();
    if let Some(precision) = inputs.precision
        && !precision.excluded.is_empty()
    {
        let excluded: Vec<String> = precision
            .excluded
            .iter()
            .map(|e| format!("{} ({})", e.name, e.reason))
            .collect();
        reasons.push(format!(
            "features excluded from dependency analysis: {}",
            excluded.join(", ")
        ));
    }
    if let Some(completeness) = inputs.diagnostics.and_then(completeness)
        && completeness < COMPLETENESS_THRESHOLD
    {
        reasons.push(format!("input completeness is {}", percent(completeness)));
    }
    if reasons.is_empty() {
        return None;
    }
    Some(recommendation(
        RecommendationTopic::DataCollection,
        Priority::LongTerm,
        capitalize(&reasons.join("; ")),
        "Implement validation at collection points and train personnel on data entry",
    ))
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

fn standing() -> [PolicyRecommendation; 3] {
    [
        recommendation(
            RecommendationTopic::InvestigationImprovement,
            Priority::ShortTerm,
            "Case closure depends on investigative capacity".to_string(),
            "Strengthen investigation units and inter-agency coordination",
        ),
        recommendation(
            RecommendationTopic::VictimProtection,
            Priority::ShortTerm,
            "Victim support reduces repeat victimization".to_string(),
            "Enhance victim support services and protection programs",
        ),
        recommendation(
            RecommendationTopic::PreventivePatrolling,
            Priority::LongTerm,
            "Visible presence deters opportunistic crime".to_string(),
            "Implement community policing and hotspot-based preventive patrols",
        ),
    ]
}

/// Runs the rule table.
///
/// Order: patrol allocation, temporal deployment, violent-crime focus,
/// feature monitoring, conditional dependency, data collection, then the
/// three standing recommendations.
#[must_use]
pub fn synthesize_recommendations(inputs: &RecommendationInputs<'_>) -> Vec<PolicyRecommendation> {
    let rules: [fn(&RecommendationInputs<'_>) -> Option<PolicyRecommendation>; 6] = [
        patrol_allocation,
        temporal_deployment,
        violent_focus,
        feature_monitoring,
        conditional_dependency,
        data_collection,
    ];
    let mut recommendations: Vec<PolicyRecommendation> =
        rules.iter().filter_map(|rule| rule(inputs)).collect();
    recommendations.extend(standing());

    log::info!("Synthesized {} recommendations", recommendations.len());
    recommendations
}

#[cfg(test)]
mod tests {
    use crime_analysis_analytics_models::{
        ExcludedFeature, ExclusionReason, Hotspot, HotspotGrouping, PartialCorrelationEdge,
        TimeBucket,
    };

    use super::*;

    fn hotspot(location: &str, count: u64, violent: u64, risk_level: RiskLevel) -> Hotspot {
        #[allow(clippy::cast_precision_loss)]
        let ratio = violent as f64 / count as f64;
        Hotspot {
            location: Some(location.to_string()),
            bucket: None,
            incident_count: count,
            violent_count: violent,
            violent_ratio: Some(ratio),
            risk_level,
        }
    }

    fn cities() -> HotspotReport {
        HotspotReport {
            grouping: HotspotGrouping::Location,
            total_records: 100,
            hotspots: vec![
                hotspot("Delhi", 50, 10, RiskLevel::Medium),
                hotspot("Mumbai", 30, 5, RiskLevel::Medium),
                hotspot("Pune", 15, 2, RiskLevel::Low),
                hotspot("Agra", 5, 1, RiskLevel::Low),
            ],
        }
    }

    fn hourly() -> HotspotReport {
        let hotspots = [(20, 30), (14, 25), (2, 20), (9, 5)]
            .into_iter()
            .map(|(hour, count)| Hotspot {
                location: None,
                bucket: Some(BucketValue::Hour(hour)),
                incident_count: count,
                violent_count: 0,
                violent_ratio: Some(0.0),
                risk_level: RiskLevel::Low,
            })
            .collect();
        HotspotReport {
            grouping: HotspotGrouping::Time(TimeBucket::Hour),
            total_records: 80,
            hotspots,
        }
    }

    fn inputs(report: &HotspotReport) -> RecommendationInputs<'_> {
        RecommendationInputs {
            hotspots: report,
            hourly: None,
            precision: None,
            importances: None,
            diagnostics: None,
            top_n: 3,
        }
    }

    fn topics(recommendations: &[PolicyRecommendation]) -> Vec<RecommendationTopic> {
        recommendations.iter().map(|r| r.topic).collect()
    }

    #[test]
    fn minimal_inputs_give_patrol_and_standing() {
        let report = cities();
        let recommendations = synthesize_recommendations(&inputs(&report));
        assert_eq!(
            topics(&recommendations),
            vec![
                RecommendationTopic::ResourceAllocation,
                RecommendationTopic::InvestigationImprovement,
                RecommendationTopic::VictimProtection,
                RecommendationTopic::PreventivePatrolling,
            ]
        );
        let patrol = &recommendations[0];
        assert_eq!(patrol.priority, Priority::Immediate);
        assert!(patrol.action.ends_with("Delhi, Mumbai, Pune"));
        assert!(!patrol.rationale.contains("Agra"));
    }

    #[test]
    fn full_inputs_fire_every_rule_in_order() {
        let report = cities();
        let hourly = hourly();
        let precision = PrecisionMatrixResult {
            features: vec!["hour".to_string(), "victim_age".to_string()],
            matrix: vec![vec![1.2, -0.3], vec![-0.3, 1.1]],
            correlation: vec![vec![1.0, 0.25], vec![0.25, 1.0]],
            excluded: vec![ExcludedFeature {
                name: "police_deployed".to_string(),
                reason: ExclusionReason::InsufficientNonNull {
                    count: 800,
                    threshold: 1000,
                },
            }],
            edges: vec![PartialCorrelationEdge {
                feature_a: "hour".to_string(),
                feature_b: "victim_age".to_string(),
                precision: -0.3,
                partial_correlation: 0.26,
            }],
            alpha: 0.01,
            iterations: 4,
            complete_rows: 1200,
        };
        let importances = vec![
            FeatureImportance {
                feature: "hour".to_string(),
                importance: 0.7,
            },
            FeatureImportance {
                feature: "city".to_string(),
                importance: 0.3,
            },
        ];
        let mut critical = report.clone();
        critical.hotspots[0].risk_level = RiskLevel::Critical;

        let recommendations = synthesize_recommendations(&RecommendationInputs {
            hourly: Some(&hourly),
            precision: Some(&precision),
            importances: Some(&importances),
            ..inputs(&critical)
        });

        assert_eq!(
            topics(&recommendations),
            vec![
                RecommendationTopic::ResourceAllocation,
                RecommendationTopic::TemporalDeployment,
                RecommendationTopic::ViolentCrimeFocus,
                RecommendationTopic::FeatureMonitoring,
                RecommendationTopic::ConditionalDependency,
                RecommendationTopic::DataCollection,
                RecommendationTopic::InvestigationImprovement,
                RecommendationTopic::VictimProtection,
                RecommendationTopic::PreventivePatrolling,
            ]
        );
        assert!(recommendations[1].rationale.contains("20:00 (evening"));
        assert!(!recommendations[1].rationale.contains("09:00"));
        assert!(recommendations[5]
            .rationale
            .contains("insufficient non-null count: 800 < 1000"));
    }

    #[test]
    fn violent_share_alone_triggers_focus() {
        let mut report = cities();
        for h in &mut report.hotspots {
            h.violent_count = h.incident_count / 2;
        }
        let recommendations = synthesize_recommendations(&inputs(&report));
        let focus = recommendations
            .iter()
            .find(|r| r.topic == RecommendationTopic::ViolentCrimeFocus)
            .unwrap();
        assert!(focus.rationale.starts_with("Violent crimes are"));
    }

    #[test]
    fn low_completeness_flags_data_collection() {
        let report = cities();
        let mut diagnostics = IngestDiagnostics {
            rows_in: 10,
            ..IngestDiagnostics::default()
        };
        diagnostics.field_mut(InputColumn::VictimAge).missing = 10;
        diagnostics.field_mut(InputColumn::PoliceDeployed).missing = 10;

        let recommendations = synthesize_recommendations(&RecommendationInputs {
            diagnostics: Some(&diagnostics),
            ..inputs(&report)
        });
        assert!(topics(&recommendations).contains(&RecommendationTopic::DataCollection));
    }

    #[test]
    fn deterministic() {
        let report = cities();
        let hourly = hourly();
        let inputs = RecommendationInputs {
            hourly: Some(&hourly),
            ..inputs(&report)
        };
        assert_eq!(
            synthesize_recommendations(&inputs),
            synthesize_recommendations(&inputs)
        );
    }

    #[test]
    fn periods() {
        assert_eq!(time_period(6), "morning");
        assert_eq!(time_period(17), "afternoon");
        assert_eq!(time_period(21), "evening");
        assert_eq!(time_period(23), "night");
        assert_eq!(time_period(0), "night");
    }
}
