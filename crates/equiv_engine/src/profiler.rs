use rustc_hash::FxHashMap;
use std::cmp::Reverse;

/// Counts rule firings during one canonicalization.
#[derive(Debug, Default, Clone)]
pub struct RuleProfiler {
    hits: FxHashMap<String, usize>,
}

impl RuleProfiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, rule_name: &str) {
        match self.hits.get_mut(rule_name) {
            Some(count) => *count += 1,
            None => {
                self.hits.insert(rule_name.to_string(), 1);
            }
        }
    }

    pub fn total(&self) -> usize {
        self.hits.values().sum()
    }

    /// `(rule name, hits)`, most frequent first, ties by name.
    pub fn hits(&self) -> Vec<(String, usize)> {
        let mut entries: Vec<(String, usize)> =
            self.hits.iter().map(|(k, v)| (k.clone(), *v)).collect();
        entries.sort_by(|a, b| (Reverse(a.1), &a.0).cmp(&(Reverse(b.1), &b.0)));
        entries
    }

    pub fn report(&self) -> String {
        let entries = self.hits();
        if entries.is_empty() {
            return "No rules have been applied.".to_string();
        }

        let mut report = String::from("Rule Profiling Report\n");
        report.push_str("─────────────────────────────────────────────\n");
        report.push_str(&format!("{:40} {:>6}\n", "Rule", "Hits"));
        report.push_str("─────────────────────────────────────────────\n");
        for (name, count) in &entries {
            report.push_str(&format!("{:40} {:>6}\n", truncate(name, 40), count));
        }
        report.push_str("─────────────────────────────────────────────\n");
        report.push_str(&format!("{:40} {:>6}\n", "TOTAL", self.total()));
        report
    }

    pub fn clear(&mut self) {
        self.hits.clear();
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
