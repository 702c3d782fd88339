use thiserror::Error;

/// Errors raised by the observation API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ObservableError {
    /// The value passed in is not wrapped by an [`Observable`](crate::Observable).
    #[error("value is not observable")]
    NotObservable,
}

/// Errors raised while invoking a method through a mutable-value adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdapterError {
    #[error("node does not wrap a mutable value")]
    NotAdapted,
    #[error("unknown method `{0}`")]
    UnknownMethod(String),
    #[error("invalid argument {index} for `{method}`")]
    InvalidArgument { method: String, index: usize },
    #[error("result of `{0}` is out of range")]
    OutOfRange(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages() {
        assert_eq!(ObservableError::NotObservable.to_string(), "value is not observable");
        let err = AdapterError::InvalidArgument {
            method: "set_date".into(),
            index: 1,
        };
        assert_eq!(err.to_string(), "invalid argument 1 for `set_date`");
    }
}
