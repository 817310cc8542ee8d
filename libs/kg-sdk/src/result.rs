//! Typed views over a [`ResponseContext`].

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::de::Error as _;
use serde_json::Value;
use uuid::Uuid;

use crate::context::ResponseContext;
use crate::error::{ClientError, KgError};
use crate::ids::uuid_from_absolute_id;

/// Builds a value of `Self` from one `data` element of a KG response.
pub trait ResponseObject: Sized {
    /// # Errors
    ///
    /// Returns a [`serde_json::Error`] when `value` does not have the
    /// expected shape.
    fn from_response(value: Value, id_namespace: &str) -> Result<Self, serde_json::Error>;
}

/// Implements [`ResponseObject`] through `serde::Deserialize`.
macro_rules! impl_response_object_via_serde {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::result::ResponseObject for $ty {
                fn from_response(
                    value: ::serde_json::Value,
                    _id_namespace: &str,
                ) -> Result<Self, ::serde_json::Error> {
                    ::serde_json::from_value(value)
                }
            }
        )+
    };
}
pub(crate) use impl_response_object_via_serde;

impl_response_object_via_serde!(String, bool, u64, i64);

impl ResponseObject for Value {
    fn from_response(value: Value, _id_namespace: &str) -> Result<Self, serde_json::Error> {
        Ok(value)
    }
}

impl ResponseObject for Uuid {
    /// Accepts bare UUIDs and absolute identifiers.
    fn from_response(value: Value, id_namespace: &str) -> Result<Self, serde_json::Error> {
        match &value {
            Value::String(id) => uuid_from_absolute_id(id, id_namespace)
                .ok_or_else(|| serde_json::Error::custom(format!("not an instance id: {id}"))),
            _ => Err(serde_json::Error::custom("expected an instance id string")),
        }
    }
}

impl<T: ResponseObject> ResponseObject for Vec<T> {
    fn from_response(value: Value, id_namespace: &str) -> Result<Self, serde_json::Error> {
        match value {
            Value::Array(items) => items
                .into_iter()
                .map(|item| T::from_response(item, id_namespace))
                .collect(),
            _ => Err(serde_json::Error::custom("expected an array")),
        }
    }
}

/// Element decoder carried by results and pages.
///
/// Usually [`response_object_decoder`]; any closure works for ad-hoc shapes.
pub type Decoder<T> = Arc<dyn Fn(Value, &str) -> Result<T, serde_json::Error> + Send + Sync>;

/// Decoder backed by `T`'s [`ResponseObject`] impl.
#[must_use]
pub fn response_object_decoder<T: ResponseObject + 'static>() -> Decoder<T> {
    Arc::new(T::from_response)
}

/// Envelope fields shared by every response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseMeta {
    pub message: Option<String>,
    pub start_time: Option<i64>,
    pub duration_in_ms: Option<i64>,
    /// Sent as a number or a string depending on the endpoint.
    pub transaction_id: Option<String>,
}

impl ResponseMeta {
    pub(crate) fn from_context(ctx: &ResponseContext) -> Self {
        Self {
            message: ctx.field("message").and_then(Value::as_str).map(str::to_owned),
            start_time: ctx.field("startTime").and_then(Value::as_i64),
            duration_in_ms: ctx.field("durationInMs").and_then(Value::as_i64),
            transaction_id: ctx.field("transactionId").and_then(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            }),
        }
    }
}

/// Remove `data` from the envelope; `null` counts as absent.
pub(crate) fn take_data(content: Option<Value>) -> Option<Value> {
    match content {
        Some(Value::Object(mut envelope)) => envelope.remove("data").filter(|d| !d.is_null()),
        _ => None,
    }
}

/// Result of a call that returns a single object.
///
/// `data` is `None` whenever `error` is set, and when the response had no
/// `data` at all.
#[derive(Debug, Clone)]
pub struct KgResult<T> {
    pub data: Option<T>,
    pub error: Option<KgError>,
    pub meta: ResponseMeta,
}

impl<T> KgResult<T> {
    /// # Errors
    ///
    /// Returns [`ClientError::Decode`] when `data` does not decode.
    pub fn from_context(ctx: ResponseContext, decoder: &Decoder<T>) -> Result<Self, ClientError> {
        let error = ctx.error();
        let meta = ResponseMeta::from_context(&ctx);
        let id_namespace = ctx.id_namespace().to_owned();

        let data = match (&error, take_data(ctx.into_parts().0)) {
            (None, Some(data)) => Some(decoder(data, &id_namespace)?),
            _ => None,
        };

        Ok(Self { data, error, meta })
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// `data`, or the error as [`ClientError::Api`].
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Api`] when the response carried an error.
    pub fn into_result(self) -> Result<Option<T>, ClientError> {
        match self.error {
            Some(e) => Err(ClientError::Api(e)),
            None => Ok(self.data),
        }
    }
}

/// Result of a call keyed by the requested identifiers. Each entry has its
/// own data and error.
#[derive(Debug, Clone)]
pub struct ResultsById<T> {
    pub data: Option<BTreeMap<String, KgResult<T>>>,
    pub error: Option<KgError>,
    pub meta: ResponseMeta,
}

impl<T> ResultsById<T> {
    /// # Errors
    ///
    /// Returns [`ClientError::Decode`] when an entry's `data` does not
    /// decode.
    pub fn from_context(ctx: ResponseContext, decoder: &Decoder<T>) -> Result<Self, ClientError> {
        let error = ctx.error();
        let meta = ResponseMeta::from_context(&ctx);

        let (content, _, transport) = ctx.into_parts();
        let entries = match take_data(content) {
            Some(Value::Object(entries)) if error.is_none() => Some(entries),
            _ => None,
        };
        let data = entries
            .map(|entries| {
                entries
                    .into_iter()
                    .map(|(key, entry)| {
                        let sub = ResponseContext::detached(entry, transport.clone());
                        KgResult::from_context(sub, decoder).map(|result| (key, result))
                    })
                    .collect::<Result<BTreeMap<_, _>, _>>()
            })
            .transpose()?;

        Ok(Self { data, error, meta })
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&KgResult<T>> {
        self.data.as_ref().and_then(|d| d.get(key))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::config::DEFAULT_ID_NAMESPACE;
    use serde_json::json;

    #[test]
    fn uuid_accepts_absolute_ids() {
        let raw = "3e0f3b5e-6d3c-4a55-9d4a-0b7c4d4c1c2a";
        let id = json!(format!("{DEFAULT_ID_NAMESPACE}{raw}"));
        assert_eq!(
            Uuid::from_response(id, DEFAULT_ID_NAMESPACE).unwrap().to_string(),
            raw
        );
        assert!(Uuid::from_response(json!("not-a-uuid"), DEFAULT_ID_NAMESPACE).is_err());
        assert!(Uuid::from_response(json!(42), DEFAULT_ID_NAMESPACE).is_err());
    }

    #[test]
    fn vec_decodes_elementwise() {
        let values = Vec::<String>::from_response(json!(["a", "b"]), DEFAULT_ID_NAMESPACE).unwrap();
        assert_eq!(values, vec!["a".to_owned(), "b".to_owned()]);
        assert!(Vec::<String>::from_response(json!({"a": 1}), DEFAULT_ID_NAMESPACE).is_err());
    }

    #[test]
    fn take_data_treats_null_as_absent() {
        assert!(take_data(Some(json!({"data": null}))).is_none());
        assert!(take_data(Some(json!({"message": "ok"}))).is_none());
        assert!(take_data(None).is_none());
        assert_eq!(take_data(Some(json!({"data": [1]}))), Some(json!([1])));
    }

    #[test]
    fn custom_decoder_is_a_closure() {
        let decoder: Decoder<usize> = Arc::new(|value: Value, _ns: &str| {
            value
                .as_str()
                .map(str::len)
                .ok_or_else(|| serde_json::Error::custom("expected a string"))
        });
        assert_eq!(decoder(json!("abcd"), DEFAULT_ID_NAMESPACE).unwrap(), 4);
    }
}
