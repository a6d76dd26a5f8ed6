pub mod llm {
    use http::StatusCode;
    use std::collections::HashMap;
    use std::error::Error as StdError;
    use std::sync::Arc;
    use thiserror::Error;

    /// Payload of a [`Response`]: raw text, or the parsed JSON document when the
    /// operation asked for parsing and the text was valid JSON.
    #[derive(Clone, Debug, PartialEq)]
    pub enum Body {
        Text(String),
        Json(serde_json::Value),
    }

    impl Body {
        /// Tries to parse `raw` as JSON, keeping the text unchanged when it is not.
        pub fn parse_or_text(raw: String) -> Self {
            match serde_json::from_str::<serde_json::Value>(&raw) {
                Ok(v) => Body::Json(v),
                Err(_) => Body::Text(raw),
            }
        }

        pub fn as_text(&self) -> Option<&str> {
            match self {
                Body::Text(s) => Some(s),
                Body::Json(_) => None,
            }
        }

        pub fn as_json(&self) -> Option<&serde_json::Value> {
            match self {
                Body::Json(v) => Some(v),
                Body::Text(_) => None,
            }
        }
    }

    /// A request that never produced an HTTP response.
    #[derive(Error, Debug, Clone)]
    #[error("{message}")]
    pub struct ConnectionError {
        message: String,
        #[source]
        source: Arc<dyn StdError + Send + Sync>,
    }

    impl ConnectionError {
        pub fn new<E>(message: impl Into<String>, source: E) -> Self
        where
            E: StdError + Send + Sync + 'static,
        {
            Self {
                message: message.into(),
                source: Arc::new(source),
            }
        }

        pub fn message(&self) -> &str {
            &self.message
        }

        /// The transport failure this error wraps.
        pub fn original_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self.source.as_ref()
        }
    }

    /// Normalized outcome of one request.
    ///
    /// `status` is 0 exactly when no HTTP response was received, and only then is
    /// `error` set. The constructors are the only way to build one.
    #[derive(Clone, Debug)]
    pub struct Response {
        status: u16,
        body: Body,
        headers: HashMap<String, String>,
        error: Option<ConnectionError>,
    }

    impl Response {
        /// A response the server actually sent. A `StatusCode` is always in
        /// 100..=999, so status 0 stays reserved for [`Response::disconnected`].
        pub fn received(status: StatusCode, body: Body, headers: HashMap<String, String>) -> Self {
            Self {
                status: status.as_u16(),
                body,
                headers,
                error: None,
            }
        }

        pub fn disconnected(error: ConnectionError) -> Self {
            Self {
                status: 0,
                body: Body::Text(error.message().to_string()),
                headers: HashMap::new(),
                error: Some(error),
            }
        }

        pub fn status(&self) -> u16 {
            self.status
        }

        pub fn body(&self) -> &Body {
            &self.body
        }

        pub fn headers(&self) -> &HashMap<String, String> {
            &self.headers
        }

        pub fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .get(&name.to_ascii_lowercase())
                .map(String::as_str)
        }

        pub fn error(&self) -> Option<&ConnectionError> {
            self.error.as_ref()
        }

        pub fn into_body(self) -> Body {
            self.body
        }
    }

    /// Success (`Ok`) or Failure (`Err`); both sides carry a full [`Response`].
    pub type Outcome = Result<Response, Response>;

    pub fn is_success_status(status: u16) -> bool {
        (200..=299).contains(&status)
    }

    pub fn classify(response: Response) -> Outcome {
        if is_success_status(response.status()) {
            Ok(response)
        } else {
            Err(response)
        }
    }

    /// Read access to the response regardless of which side it landed on.
    pub trait OutcomeExt {
        fn response(&self) -> &Response;
        fn into_response(self) -> Response;
    }

    impl OutcomeExt for Outcome {
        fn response(&self) -> &Response {
            match self {
                Ok(r) | Err(r) => r,
            }
        }

        fn into_response(self) -> Response {
            match self {
                Ok(r) | Err(r) => r,
            }
        }
    }
}

pub mod log {
    use std::fmt;

    /// Severity on the conventional 0-based scale; 2 (warn) is not used.
    /// `Fatal` only makes sense as a threshold: it silences every call.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub enum LogLevel {
        Debug = 0,
        #[default]
        Info = 1,
        Error = 3,
        Fatal = 4,
    }

    impl LogLevel {
        pub fn from_severity(n: i64) -> Option<Self> {
            match n {
                i64::MIN..=0 => Some(LogLevel::Debug),
                1 => Some(LogLevel::Info),
                // warn gates debug/info/error exactly like error does
                2 | 3 => Some(LogLevel::Error),
                4.. => Some(LogLevel::Fatal),
            }
        }

        /// Parses an integer severity such as the value of `LLM_CLIENT_LOG`.
        pub fn parse_severity(s: &str) -> Option<Self> {
            s.trim().parse::<i64>().ok().and_then(Self::from_severity)
        }

        pub fn severity(self) -> u8 {
            self as u8
        }
    }

    impl fmt::Display for LogLevel {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let s = match self {
                LogLevel::Debug => "DEBUG",
                LogLevel::Info => "INFO",
                LogLevel::Error => "ERROR",
                LogLevel::Fatal => "FATAL",
            };
            f.write_str(s)
        }
    }

    pub trait Logger: Send + Sync {
        fn log(&self, level: LogLevel, line: &str);
    }

    /// Forwards lines to `tracing` under the `llm_client` target.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct TracingLogger;

    impl Logger for TracingLogger {
        fn log(&self, level: LogLevel, line: &str) {
            match level {
                LogLevel::Debug => tracing::debug!(target: "llm_client", "{}", line),
                LogLevel::Info => tracing::info!(target: "llm_client", "{}", line),
                LogLevel::Error | LogLevel::Fatal => {
                    tracing::error!(target: "llm_client", "{}", line)
                }
            }
        }
    }

    pub fn format_line(message: &str, fields: &[(&str, Option<String>)]) -> String {
        let data = fields
            .iter()
            .filter_map(|(k, v)| v.as_ref().map(|v| format!("{}={}", k, v)))
            .collect::<Vec<_>>()
            .join(" ");
        format!("message={} {}", message, data).trim_end().to_string()
    }

    /// Writes one line when a logger is present and `threshold <= level`.
    pub fn emit(
        logger: Option<&dyn Logger>,
        threshold: LogLevel,
        level: LogLevel,
        message: &str,
        fields: &[(&str, Option<String>)],
    ) {
        let Some(logger) = logger else {
            return;
        };
        if threshold > level {
            return;
        }
        logger.log(level, &format_line(message, fields));
    }
}

#[cfg(test)]
mod tests {
    use super::llm::*;
    use super::log::*;
    use http::StatusCode;
    use std::collections::HashMap;
    use std::io;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<(LogLevel, String)>>);

    impl Logger for Recorder {
        fn log(&self, level: LogLevel, line: &str) {
            self.0.lock().unwrap().push((level, line.to_string()));
        }
    }

    fn refused() -> ConnectionError {
        ConnectionError::new(
            "heartbeat error",
            io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused"),
        )
    }

    #[test]
    fn classify_boundaries() {
        for (status, ok) in [(199, false), (200, true), (299, true), (300, false), (500, false)] {
            let code = StatusCode::from_u16(status).unwrap();
            let r = Response::received(code, Body::Text(String::new()), HashMap::new());
            assert_eq!(classify(r).is_ok(), ok, "status {}", status);
        }
    }

    #[test]
    fn received_status_is_never_zero() {
        assert!(StatusCode::from_u16(0).is_err());
        let lowest = StatusCode::from_u16(100).unwrap();
        let r = Response::received(lowest, Body::Text("x".into()), HashMap::new());
        assert_eq!(r.status() == 0, r.error().is_some());
        assert_eq!(r.status(), 100);
    }

    #[test]
    fn disconnected_response_shape() {
        let r = Response::disconnected(refused());
        assert_eq!(r.status(), 0);
        assert_eq!(r.body(), &Body::Text("heartbeat error".into()));
        assert!(r.headers().is_empty());
        let err = r.error().unwrap();
        assert_eq!(err.to_string(), "heartbeat error");
        let io_err = err.original_error().downcast_ref::<io::Error>().unwrap();
        assert_eq!(io_err.kind(), io::ErrorKind::ConnectionRefused);
        assert!(classify(r).is_err());
    }

    #[test]
    fn received_response_has_no_error() {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "text/plain".to_string());
        let r = Response::received(StatusCode::NOT_FOUND, Body::Text("nope".into()), headers);
        assert!(r.error().is_none());
        assert_eq!(r.header("Content-Type"), Some("text/plain"));
        let out = classify(r);
        assert_eq!(out.response().status(), 404);
        assert_eq!(out.into_response().into_body(), Body::Text("nope".into()));
    }

    #[test]
    fn parse_or_text_falls_back() {
        let parsed = Body::parse_or_text(r#"{"response":"hello"}"#.into());
        assert_eq!(
            parsed.as_json().unwrap()["response"],
            serde_json::json!("hello")
        );
        let raw = Body::parse_or_text("server error".into());
        assert_eq!(raw.as_text(), Some("server error"));
        let truncated = Body::parse_or_text(r#"{"response":"#.into());
        assert_eq!(truncated.as_text(), Some(r#"{"response":"#));
    }

    #[test]
    fn severity_parsing() {
        assert_eq!(LogLevel::parse_severity("0"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::parse_severity(" 1 "), Some(LogLevel::Info));
        assert_eq!(LogLevel::parse_severity("2"), Some(LogLevel::Error));
        assert_eq!(LogLevel::parse_severity("3"), Some(LogLevel::Error));
        assert_eq!(LogLevel::parse_severity("4"), Some(LogLevel::Fatal));
        assert_eq!(LogLevel::parse_severity("7"), Some(LogLevel::Fatal));
        assert_eq!(LogLevel::parse_severity("-1"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::parse_severity("debug"), None);
        assert_eq!(LogLevel::parse_severity(""), None);
        assert_eq!(LogLevel::default(), LogLevel::Info);
        assert!(LogLevel::Debug < LogLevel::Info && LogLevel::Info < LogLevel::Error);
    }

    #[test]
    fn format_line_skips_missing_fields() {
        let line = format_line(
            "Sending a request",
            &[("method", Some("GET".into())), ("skip", None), ("url", Some("http://x/heartbeat".into()))],
        );
        assert_eq!(line, "message=Sending a request method=GET url=http://x/heartbeat");
        assert_eq!(format_line("bare", &[("k", None)]), "message=bare");
    }

    #[test]
    fn emit_respects_threshold() {
        let rec = Recorder::default();
        emit(Some(&rec), LogLevel::Error, LogLevel::Debug, "d", &[]);
        emit(Some(&rec), LogLevel::Error, LogLevel::Info, "i", &[]);
        emit(Some(&rec), LogLevel::Error, LogLevel::Error, "e", &[]);
        emit(Some(&rec), LogLevel::Debug, LogLevel::Debug, "d2", &[]);
        let lines = rec.0.lock().unwrap().clone();
        assert_eq!(
            lines,
            vec![
                (LogLevel::Error, "message=e".to_string()),
                (LogLevel::Debug, "message=d2".to_string()),
            ]
        );
    }

    #[test]
    fn fatal_threshold_silences_everything() {
        let rec = Recorder::default();
        for level in [LogLevel::Debug, LogLevel::Info, LogLevel::Error] {
            emit(Some(&rec), LogLevel::Fatal, level, "m", &[]);
        }
        assert!(rec.0.lock().unwrap().is_empty());
    }

    #[test]
    fn emit_without_logger_is_silent() {
        emit(None, LogLevel::Debug, LogLevel::Error, "ignored", &[("k", Some("v".into()))]);
    }
}
