//! Fetcher Module
//!
//! Remote-fetch functions and the `{code, data}` result they are normalized into.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::cache::SyncParams;

/// Future returned by a fetcher.
pub type FetchFuture = BoxFuture<'static, anyhow::Result<Value>>;

// == Fetcher ==
/// A user-supplied remote data source.
///
/// Called with the load's parameters and any extra options; must hand back
/// a future, which is driven to completion in its own task.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, params: &SyncParams, options: &[Value]) -> FetchFuture;
}

impl<F, Fut> Fetcher for F
where
    F: Fn(SyncParams, Vec<Value>) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    fn fetch(&self, params: &SyncParams, options: &[Value]) -> FetchFuture {
        (self)(params.clone(), options.to_vec()).boxed()
    }
}

/// Shared handle to a fetcher.
pub type SharedFetcher = Arc<dyn Fetcher>;

/// Fetchers registered per logical key prefix.
pub type SyncFnMap = HashMap<String, SharedFetcher>;

// == Fetch Result ==
/// Normalized result of a fetch.
///
/// `code == 0` means success; extra fields returned by the fetcher are kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchResult {
    pub code: i64,
    #[serde(default)]
    pub data: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FetchResult {
    // == Normalize ==
    /// Shapes a raw fetcher value into a `FetchResult`.
    ///
    /// An object with neither a `code` nor a `data` field (or any non-object)
    /// is wrapped whole as `data` with `code = 0`. Otherwise `code` is
    /// coerced to an integer, defaulting to 0.
    pub fn normalize(raw: Value) -> Self {
        match raw {
            Value::Object(mut fields) if has_envelope_fields(&fields) => {
                let code = coerce_code(fields.remove("code").as_ref());
                let data = fields.remove("data").unwrap_or(Value::Null);
                Self {
                    code,
                    data,
                    extra: fields,
                }
            }
            other => Self {
                code: 0,
                data: other,
                extra: Map::new(),
            },
        }
    }

    /// Returns true when `code` signals success.
    pub fn is_success(&self) -> bool {
        self.code == 0
    }

    /// Converts into a JSON object `{code, data, ...extra}`.
    pub fn into_value(self) -> Value {
        let mut fields = self.extra;
        fields.insert("code".to_string(), Value::from(self.code));
        fields.insert("data".to_string(), self.data);
        Value::Object(fields)
    }
}

fn has_envelope_fields(fields: &Map<String, Value>) -> bool {
    let present = |name: &str| fields.get(name).is_some_and(|v| !v.is_null());
    present("code") || present("data")
}

/// Numeric coercion with a zero fallback for anything non-numeric.
fn coerce_code(code: Option<&Value>) -> i64 {
    let number = match code {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) if s.trim().is_empty() => Some(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(Value::Bool(b)) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };

    match number {
        Some(n) if n.is_finite() => n.trunc() as i64,
        _ => 0,
    }
}
