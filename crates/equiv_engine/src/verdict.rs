use serde::{Deserialize, Serialize};

/// Which tier (or failure) produced a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Method {
    FastCanonical,
    SlowDifference,
    SlowSimplify,
    ParseError,
    Timeout,
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Method::FastCanonical => "fast-canonical",
            Method::SlowDifference => "slow-difference",
            Method::SlowSimplify => "slow-simplify",
            Method::ParseError => "parse-error",
            Method::Timeout => "timeout",
        };
        f.write_str(s)
    }
}

/// Outcome of one equivalence check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub equivalent: bool,
    pub method: Method,
    pub elapsed_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub canonical_form_1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub canonical_form_2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl Verdict {
    pub(crate) fn new(equivalent: bool, method: Method) -> Self {
        Self {
            equivalent,
            method,
            elapsed_ms: 0.0,
            canonical_form_1: None,
            canonical_form_2: None,
            error: None,
        }
    }

    pub(crate) fn with_forms(mut self, form_1: Option<String>, form_2: Option<String>) -> Self {
        self.canonical_form_1 = form_1;
        self.canonical_form_2 = form_2;
        self
    }

    pub(crate) fn with_error(mut self, error: impl std::fmt::Display) -> Self {
        self.error = Some(error.to_string());
        self
    }

    /// `false` here means "not shown equivalent", not "shown different".
    /// Parse failures and timeouts are neither.
    pub fn is_inconclusive(&self) -> bool {
        matches!(self.method, Method::ParseError | Method::Timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_serializes_kebab_case() {
        let json = serde_json::to_string(&Method::SlowDifference).unwrap();
        assert_eq!(json, "\"slow-difference\"");
        assert_eq!(Method::FastCanonical.to_string(), "fast-canonical");
    }

    #[test]
    fn test_verdict_json_omits_missing_fields() {
        let verdict = Verdict::new(true, Method::FastCanonical);
        let json = serde_json::to_value(&verdict).unwrap();
        assert_eq!(json["equivalent"], true);
        assert_eq!(json["method"], "fast-canonical");
        assert!(json.get("error").is_none());
        let back: Verdict = serde_json::from_value(json).unwrap();
        assert_eq!(back, verdict);
    }

    #[test]
    fn test_inconclusive_methods() {
        assert!(Verdict::new(false, Method::Timeout).is_inconclusive());
        assert!(Verdict::new(false, Method::ParseError).is_inconclusive());
        assert!(!Verdict::new(false, Method::SlowSimplify).is_inconclusive());
    }
}
