// Copyright 2026 hotcache Project Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::{
    backtrace::Backtrace,
    fmt::{Debug, Display},
    sync::Arc,
};

/// All kinds of [`Error`] raised by hotcache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Unknown or inconsistent configuration.
    Config,
    /// Malformed value.
    Parse,
    /// Parameter listing requested.
    ///
    /// Not a real error.
    ///
    /// Raised when the parameter text contains `print`. The message holds the effective parameters and the caller is
    /// expected to show them and stop.
    PrintRequested,
    /// The policy cannot perform the operation in its current state.
    Unsupported,
}

impl ErrorKind {
    /// Convert self into static str.
    pub fn into_static(self) -> &'static str {
        self.into()
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.into_static())
    }
}

impl From<ErrorKind> for &'static str {
    fn from(v: ErrorKind) -> &'static str {
        match v {
            ErrorKind::Config => "Config error",
            ErrorKind::Parse => "Parse error",
            ErrorKind::PrintRequested => "Parameter listing requested",
            ErrorKind::Unsupported => "Unsupported operation",
        }
    }
}

/// Error returned by fallible hotcache operations.
///
/// `Display` renders a single line:
///
/// ```shell
/// Config error, context: { policy: FIFO, key: foo } => unknown parameter
/// ```
///
/// `Debug` renders context, source and the captured backtrace on separate lines. `{:#?}` falls back to the struct
/// representation.
pub struct Error {
    kind: ErrorKind,
    message: String,

    context: Vec<(&'static str, String)>,

    source: Option<Arc<anyhow::Error>>,
    backtrace: Option<Arc<Backtrace>>,
}

impl Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if f.alternate() {
            return f
                .debug_struct("Error")
                .field("kind", &self.kind)
                .field("message", &self.message)
                .field("context", &self.context)
                .field("source", &self.source)
                .field("backtrace", &self.backtrace)
                .finish();
        }

        write!(f, "{}", self.kind)?;
        if !self.message.is_empty() {
            write!(f, " => {}", self.message)?;
        }
        writeln!(f)?;

        if !self.context.is_empty() {
            writeln!(f, "\nContext:")?;
            for (k, v) in self.context.iter() {
                writeln!(f, "  {k}: {v}")?;
            }
        }

        if let Some(source) = &self.source {
            writeln!(f, "\nSource:\n  {source:#}")?;
        }

        if let Some(backtrace) = &self.backtrace {
            writeln!(f, "\nBacktrace:\n{backtrace}")?;
        }

        Ok(())
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)?;

        if !self.context.is_empty() {
            let pairs = self
                .context
                .iter()
                .map(|(k, v)| format!("{k}: {v}"))
                .collect::<Vec<_>>()
                .join(", ");
            write!(f, ", context: {{ {pairs} }}")?;
        }

        if !self.message.is_empty() {
            write!(f, " => {}", self.message)?;
        }

        if let Some(source) = &self.source {
            write!(f, ", source: {source}")?;
        }

        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|v| v.as_ref().as_ref())
    }
}

impl Clone for Error {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            context: self.context.clone(),
            source: self.source.clone(),
            backtrace: self.backtrace.clone(),
        }
    }
}

impl Error {
    /// Create a new error.
    ///
    /// ```rust
    /// # use hotcache_common::error::{Error, ErrorKind};
    /// let e = Error::new(ErrorKind::Config, "unknown parameter").with_context("key", "foo");
    /// assert_eq!(e.kind(), ErrorKind::Config);
    /// ```
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            context: Vec::new(),
            source: None,
            backtrace: Some(Arc::new(Backtrace::capture())),
        }
    }

    /// Add more context in error.
    pub fn with_context(mut self, key: &'static str, value: impl ToString) -> Self {
        self.context.push((key, value.to_string()));
        self
    }

    /// Set source for error.
    ///
    /// Panics in debug builds if the source has been set already.
    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        debug_assert!(self.source.is_none(), "the source error has been set");
        self.source = Some(Arc::new(source.into()));
        self
    }

    /// Get the error kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Get the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the error context.
    pub fn context(&self) -> &[(&'static str, String)] {
        &self.context
    }

    /// Get the error backtrace.
    pub fn backtrace(&self) -> Option<&Backtrace> {
        self.backtrace.as_deref()
    }

    /// Get the error source.
    pub fn source(&self) -> Option<&anyhow::Error> {
        self.source.as_deref()
    }

    /// Downcast the source error.
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source.as_deref().and_then(|e| e.downcast_ref::<E>())
    }
}

/// Result type for hotcache.
pub type Result<T> = std::result::Result<T, Error>;

/// Helper constructors.
impl Error {
    /// An [`ErrorKind::Unsupported`] error for `op` on `policy`.
    pub fn unsupported(policy: impl ToString, op: &'static str) -> Self {
        Error::new(ErrorKind::Unsupported, format!("`{op}` is not supported"))
            .with_context("policy", policy)
            .with_context("op", op)
    }

    /// An [`ErrorKind::Config`] error for a parameter key the policy does not know.
    pub fn unknown_param(policy: &str, key: &str) -> Self {
        Error::new(ErrorKind::Config, "unknown parameter")
            .with_context("policy", policy)
            .with_context("key", key)
    }

    /// An [`ErrorKind::Parse`] error for a malformed parameter value.
    pub fn parse_param(key: &str, value: &str, source: impl Into<anyhow::Error>) -> Self {
        Error::new(ErrorKind::Parse, "malformed parameter value")
            .with_context("key", key)
            .with_context("value", value)
            .with_source(source)
    }

    /// The [`ErrorKind::PrintRequested`] signal carrying the effective parameters.
    pub fn print_requested(policy: &str, params: impl Into<String>) -> Self {
        Error::new(ErrorKind::PrintRequested, params).with_context("policy", policy)
    }

    /// Whether the error is the non-fatal [`ErrorKind::PrintRequested`] signal.
    pub fn is_print_requested(&self) -> bool {
        self.kind == ErrorKind::PrintRequested
    }
}
