//! Metric threshold analysis.
//!
//! A fixed rule table maps each metric (including derived high/low rows
//! for temperature and humidity) to warning and critical thresholds. The
//! critical threshold is checked first. Output is advisory only: issue
//! records feed the `details` section of evaluations and never alter a
//! score or status.

use airsense_core::{CanonicalReading, Issue, Metric, Severity, UseCase};

/// Which side of the threshold is unhealthy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Above,
    Below,
}

struct IssueRule {
    /// Display label, distinguishing derived rows ("temperature_low").
    label: &'static str,
    metric: Metric,
    direction: Direction,
    warning: f64,
    critical: f64,
    use_cases: &'static [UseCase],
    warning_advice: &'static str,
    critical_advice: &'static str,
}

const RULES: &[IssueRule] = &[
    IssueRule {
        label: "co2",
        metric: Metric::Co2,
        direction: Direction::Above,
        warning: 1000.0,
        critical: 1600.0,
        use_cases: &[UseCase::Occupancy, UseCase::HealthIndex],
        warning_advice: "Increase ventilation to bring CO2 down",
        critical_advice: "Ventilate immediately; CO2 is at levels that impair concentration",
    },
    IssueRule {
        label: "voc",
        metric: Metric::Voc,
        direction: Direction::Above,
        warning: 400.0,
        critical: 1000.0,
        use_cases: &[UseCase::HealthIndex, UseCase::SmokeDetection],
        warning_advice: "Air out the room; VOC levels are elevated",
        critical_advice: "Identify and remove the VOC source; consider an air purifier",
    },
    IssueRule {
        label: "pm25",
        metric: Metric::Pm25,
        direction: Direction::Above,
        warning: 35.0,
        critical: 75.0,
        use_cases: &[UseCase::HealthIndex, UseCase::SmokeDetection],
        warning_advice: "Fine particulates elevated; run filtration if available",
        critical_advice: "Fine particulates at unhealthy levels; ventilate or filter now",
    },
    IssueRule {
        label: "pm10",
        metric: Metric::Pm10,
        direction: Direction::Above,
        warning: 50.0,
        critical: 100.0,
        use_cases: &[UseCase::HealthIndex, UseCase::SmokeDetection],
        warning_advice: "Coarse dust elevated; check for an indoor source",
        critical_advice: "Coarse dust at unhealthy levels; ventilate or filter now",
    },
    IssueRule {
        label: "pm1",
        metric: Metric::Pm1,
        direction: Direction::Above,
        warning: 25.0,
        critical: 60.0,
        use_cases: &[UseCase::SmokeDetection],
        warning_advice: "Ultrafine particulates elevated; possible combustion or emission source",
        critical_advice: "Ultrafine particulates very high; inspect for smoke or emission source",
    },
    IssueRule {
        label: "temperature_high",
        metric: Metric::TemperatureC,
        direction: Direction::Above,
        warning: 27.0,
        critical: 32.0,
        use_cases: &[UseCase::HealthIndex],
        warning_advice: "Room is warm; consider cooling",
        critical_advice: "Room is overheating; cool it down",
    },
    IssueRule {
        label: "temperature_low",
        metric: Metric::TemperatureC,
        direction: Direction::Below,
        warning: 17.0,
        critical: 10.0,
        use_cases: &[UseCase::HealthIndex],
        warning_advice: "Room is cold; consider heating",
        critical_advice: "Room is far below comfortable temperature; heat it up",
    },
    IssueRule {
        label: "humidity_high",
        metric: Metric::RelativeHumidity,
        direction: Direction::Above,
        warning: 60.0,
        critical: 70.0,
        use_cases: &[UseCase::HealthIndex],
        warning_advice: "Humidity high; consider dehumidifying",
        critical_advice: "Humidity very high; mold risk, dehumidify",
    },
    IssueRule {
        label: "humidity_low",
        metric: Metric::RelativeHumidity,
        direction: Direction::Below,
        warning: 30.0,
        critical: 20.0,
        use_cases: &[UseCase::HealthIndex],
        warning_advice: "Air is dry; consider humidifying",
        critical_advice: "Air is very dry; humidify to protect airways",
    },
];

impl IssueRule {
    fn check(&self, value: f64) -> Option<Severity> {
        match self.direction {
            Direction::Above => {
                if value >= self.critical {
                    Some(Severity::Critical)
                } else if value >= self.warning {
                    Some(Severity::Warning)
                } else {
                    None
                }
            }
            Direction::Below => {
                if value <= self.critical {
                    Some(Severity::Critical)
                } else if value <= self.warning {
                    Some(Severity::Warning)
                } else {
                    None
                }
            }
        }
    }

    fn message(&self, value: f64, severity: Severity) -> String {
        let (threshold, word) = match severity {
            Severity::Critical => (self.critical, "critical"),
            Severity::Warning => (self.warning, "warning"),
        };
        let relation = match self.direction {
            Direction::Above => "exceeds",
            Direction::Below => "is below",
        };
        format!(
            "{} at {:.1} {} {} the {} threshold ({:.1} {})",
            self.label,
            value,
            self.metric.unit(),
            relation,
            word,
            threshold,
            self.metric.unit()
        )
    }
}

/// Run the rule table over one reading.
pub fn analyze(reading: &CanonicalReading) -> Vec<Issue> {
    let mut issues = Vec::new();
    for rule in RULES {
        let Some(value) = reading.get(rule.metric) else {
            continue;
        };
        if let Some(severity) = rule.check(value) {
            let advice = match severity {
                Severity::Critical => rule.critical_advice,
                Severity::Warning => rule.warning_advice,
            };
            issues.push(Issue {
                metric: rule.label.to_string(),
                unit: rule.metric.unit().to_string(),
                value,
                severity,
                advice: advice.to_string(),
                message: rule.message(value, severity),
                use_cases: rule.use_cases.to_vec(),
            });
        }
    }
    issues
}

/// The subset of issues tagged to one use case.
pub fn for_use_case(issues: &[Issue], use_case: UseCase) -> Vec<Issue> {
    issues
        .iter()
        .filter(|issue| issue.use_cases.contains(&use_case))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn reading(fields: &[(Metric, f64)]) -> CanonicalReading {
        let mut r = CanonicalReading::empty("dev-1", Utc::now());
        for (metric, value) in fields {
            r.set(*metric, Some(*value));
        }
        r
    }

    #[test]
    fn critical_wins_over_warning() {
        let issues = analyze(&reading(&[(Metric::Co2, 1700.0)]));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Critical);
        assert!(issues[0].message.contains("critical"));
    }

    #[test]
    fn warning_band() {
        let issues = analyze(&reading(&[(Metric::Co2, 1200.0)]));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Warning);
        assert_eq!(issues[0].metric, "co2");
        assert_eq!(issues[0].unit, "ppm");
    }

    #[test]
    fn derived_low_rows_fire_below_threshold() {
        let issues = analyze(&reading(&[
            (Metric::TemperatureC, 8.0),
            (Metric::RelativeHumidity, 25.0),
        ]));
        let labels: Vec<&str> = issues.iter().map(|i| i.metric.as_str()).collect();
        assert_eq!(labels, vec!["temperature_low", "humidity_low"]);
        assert_eq!(issues[0].severity, Severity::Critical);
        assert_eq!(issues[1].severity, Severity::Warning);
    }

    #[test]
    fn one_metric_can_feed_multiple_use_cases() {
        let issues = analyze(&reading(&[(Metric::Pm25, 80.0)]));
        assert_eq!(issues.len(), 1);
        let health = for_use_case(&issues, UseCase::HealthIndex);
        let smoke = for_use_case(&issues, UseCase::SmokeDetection);
        let occupancy = for_use_case(&issues, UseCase::Occupancy);
        assert_eq!(health.len(), 1);
        assert_eq!(smoke.len(), 1);
        assert!(occupancy.is_empty());
    }

    #[test]
    fn clean_reading_yields_no_issues() {
        let issues = analyze(&reading(&[
            (Metric::Co2, 500.0),
            (Metric::Pm25, 8.0),
            (Metric::TemperatureC, 22.0),
            (Metric::RelativeHumidity, 45.0),
        ]));
        assert!(issues.is_empty());
    }

    #[test]
    fn missing_metrics_are_skipped() {
        let issues = analyze(&CanonicalReading::empty("dev-1", Utc::now()));
        assert!(issues.is_empty());
    }
}
