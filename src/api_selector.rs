//! Chooses a strategy and parameters from the shape of an observed HTTP
//! response, with a small cache so repeated identical shapes are cheap
//! to re-classify.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::RwLock;
use std::time::Duration;

/// The header names consulted both for classification and for the
/// cache key. Only these — not the full header map — determine a
/// cache hit.
const KEY_HEADERS: [&str; 4] = [
    "x-ratelimit-limit",
    "x-amzn-errortype",
    "x-github-media-type",
    "content-type",
];

/// A strategy constructor parameter. Kept loosely typed since the
/// decision table produces a different parameter shape per strategy.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Duration(Duration),
    Float(f64),
    Int(u32),
    Bool(bool),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub strategy_name: &'static str,
    pub parameters: HashMap<String, ParamValue>,
}

/// The shape of an HTTP response the core bases a strategy choice on.
/// Headers are matched case-insensitively.
pub struct HttpResponseShape<'a> {
    pub status: u16,
    pub headers: &'a HashMap<String, String>,
    pub url: &'a str,
    pub body: &'a str,
}

impl HttpResponseShape<'_> {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

fn cache_key(shape: &HttpResponseShape) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    shape.status.hash(&mut hasher);
    shape.url.hash(&mut hasher);
    for name in KEY_HEADERS {
        shape.header(name).hash(&mut hasher);
    }
    hasher.finish()
}

/// Caches classification results keyed by a hash of `(status, url,
/// key headers)`. Misses release the read lock before computing, then
/// take the write lock to insert; since classification is a pure
/// function of the key, a duplicate compute on a race is harmless.
pub struct ApiTypeSelector {
    cache: RwLock<HashMap<u64, Selection>>,
}

impl Default for ApiTypeSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiTypeSelector {
    pub fn new() -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn select(&self, shape: &HttpResponseShape) -> Selection {
        let key = cache_key(shape);
        if let Some(hit) = self.cache.read().expect("selector lock poisoned").get(&key) {
            return hit.clone();
        }
        let selection = classify(shape);
        self.cache
            .write()
            .expect("selector lock poisoned")
            .insert(key, selection.clone());
        selection
    }
}

fn classify(shape: &HttpResponseShape) -> Selection {
    if shape.header("x-github-media-type").is_some() {
        let mut parameters = HashMap::new();
        if let Some(retry_after) = shape.header("retry-after").and_then(|v| v.trim().parse::<u64>().ok()) {
            parameters.insert(
                "base_delay".to_string(),
                ParamValue::Duration(Duration::from_secs(retry_after)),
            );
        }
        parameters.insert("max_attempts".to_string(), ParamValue::Int(5));
        parameters.insert("discovery".to_string(), ParamValue::Bool(true));
        return Selection {
            strategy_name: "diophantine",
            parameters,
        };
    }

    if shape.header("x-amzn-errortype").is_some() {
        let mut parameters = HashMap::new();
        parameters.insert("exponent".to_string(), ParamValue::Float(2.0));
        parameters.insert("coefficient".to_string(), ParamValue::Float(1.5));
        parameters.insert("max".to_string(), ParamValue::Duration(Duration::from_secs(300)));
        parameters.insert("jitter".to_string(), ParamValue::Bool(true));
        return Selection {
            strategy_name: "polynomial",
            parameters,
        };
    }

    if is_kubernetes_forbidden_body(shape.body) {
        let mut parameters = HashMap::new();
        parameters.insert("base".to_string(), ParamValue::Duration(Duration::from_secs(1)));
        parameters.insert("multiplier".to_string(), ParamValue::Float(2.0));
        parameters.insert("max".to_string(), ParamValue::Duration(Duration::from_secs(30)));
        parameters.insert("jitter".to_string(), ParamValue::Bool(true));
        return Selection {
            strategy_name: "exponential",
            parameters,
        };
    }

    if shape.status == 429 {
        let mut parameters = HashMap::new();
        parameters.insert("delay".to_string(), ParamValue::Duration(Duration::from_secs(60)));
        parameters.insert("attempts".to_string(), ParamValue::Int(3));
        return Selection {
            strategy_name: "fixed",
            parameters,
        };
    }

    if shape.status >= 500 {
        let mut parameters = HashMap::new();
        parameters.insert("base".to_string(), ParamValue::Duration(Duration::from_secs(1)));
        parameters.insert("multiplier".to_string(), ParamValue::Float(2.0));
        parameters.insert("max".to_string(), ParamValue::Duration(Duration::from_secs(30)));
        return Selection {
            strategy_name: "exponential",
            parameters,
        };
    }

    let mut parameters = HashMap::new();
    parameters.insert("learning".to_string(), ParamValue::Bool(true));
    Selection {
        strategy_name: "adaptive",
        parameters,
    }
}

fn is_kubernetes_forbidden_body(body: &str) -> bool {
    body.contains("\"kind\"") && body.contains("\"Status\"") && body.contains("\"reason\"") && body.contains("\"Forbidden\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn github_media_type_selects_diophantine() {
        let h = headers(&[("X-GitHub-Media-Type", "github.v3"), ("Retry-After", "30")]);
        let shape = HttpResponseShape {
            status: 403,
            headers: &h,
            url: "https://api.github.com/repos",
            body: "",
        };
        let selector = ApiTypeSelector::new();
        let selection = selector.select(&shape);
        assert_eq!(selection.strategy_name, "diophantine");
        assert_eq!(
            selection.parameters.get("base_delay"),
            Some(&ParamValue::Duration(Duration::from_secs(30)))
        );
    }

    #[test]
    fn amzn_error_type_selects_polynomial() {
        let h = headers(&[("X-Amzn-ErrorType", "ThrottlingException")]);
        let shape = HttpResponseShape {
            status: 400,
            headers: &h,
            url: "https://dynamodb.amazonaws.com",
            body: "",
        };
        let selection = ApiTypeSelector::new().select(&shape);
        assert_eq!(selection.strategy_name, "polynomial");
    }

    #[test]
    fn kubernetes_forbidden_body_selects_exponential_with_jitter() {
        let h = headers(&[]);
        let body = r#"{"kind":"Status","reason":"Forbidden"}"#;
        let shape = HttpResponseShape {
            status: 403,
            headers: &h,
            url: "https://k8s.local/api",
            body,
        };
        let selection = ApiTypeSelector::new().select(&shape);
        assert_eq!(selection.strategy_name, "exponential");
        assert_eq!(selection.parameters.get("jitter"), Some(&ParamValue::Bool(true)));
    }

    #[test]
    fn plain_429_selects_fixed() {
        let h = headers(&[]);
        let shape = HttpResponseShape {
            status: 429,
            headers: &h,
            url: "https://example.com",
            body: "",
        };
        let selection = ApiTypeSelector::new().select(&shape);
        assert_eq!(selection.strategy_name, "fixed");
    }

    #[test]
    fn server_error_selects_exponential_without_jitter_flag() {
        let h = headers(&[]);
        let shape = HttpResponseShape {
            status: 503,
            headers: &h,
            url: "https://example.com",
            body: "",
        };
        let selection = ApiTypeSelector::new().select(&shape);
        assert_eq!(selection.strategy_name, "exponential");
        assert!(!selection.parameters.contains_key("jitter"));
    }

    #[test]
    fn otherwise_selects_adaptive() {
        let h = headers(&[]);
        let shape = HttpResponseShape {
            status: 200,
            headers: &h,
            url: "https://example.com",
            body: "",
        };
        let selection = ApiTypeSelector::new().select(&shape);
        assert_eq!(selection.strategy_name, "adaptive");
    }

    #[test]
    fn identical_shapes_hit_the_cache_with_the_same_result() {
        let h = headers(&[("Content-Type", "application/json")]);
        let shape = HttpResponseShape {
            status: 500,
            headers: &h,
            url: "https://example.com",
            body: "",
        };
        let selector = ApiTypeSelector::new();
        let first = selector.select(&shape);
        let second = selector.select(&shape);
        assert_eq!(first, second);
    }
}
