use crate::entities::security_event::{Severity, SeverityCount};

/// Sum of severity weights over the counted events: low 1, medium 3, high 5, critical 10.
pub fn threat_score(counts: &[SeverityCount]) -> u64 {
    counts
        .iter()
        .map(|c| c.severity.weight() * c.count.max(0) as u64)
        .sum()
}

/// Coarse label for the dashboard.
pub fn threat_level(score: u64) -> &'static str {
    match score {
        0..=9 => "low",
        10..=49 => "elevated",
        50..=99 => "high",
        _ => "critical",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_are_fixed() {
        let counts: Vec<SeverityCount> = Severity::ALL
            .iter()
            .map(|s| SeverityCount { severity: *s, count: 2 })
            .collect();
        assert_eq!(threat_score(&counts), 2 * (1 + 3 + 5 + 10));
        assert_eq!(threat_score(&[]), 0);
    }

    #[test]
    fn levels_follow_score() {
        assert_eq!(threat_level(0), "low");
        assert_eq!(threat_level(12), "elevated");
        assert_eq!(threat_level(120), "critical");
    }
}
