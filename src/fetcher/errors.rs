use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("tls error: {0}")]
    Tls(String),

    #[error("connect timeout")]
    ConnectTimeout,

    #[error("request timeout")]
    RequestTimeout,

    #[error("http error {status}")]
    Http {
        status: reqwest::StatusCode,
        retriable: bool,
    },

    #[error("redirect without location header")]
    MissingLocation,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("external download tool failed: {0}")]
    Subprocess(String),

    #[error("local file error: {0}")]
    LocalFile(String),

    #[error("io error: {0}")]
    Io(String),
}

impl FetchError {
    /// Whether another attempt against the same URI could plausibly succeed.
    pub fn should_retry(&self) -> bool {
        match self {
            Self::InvalidUrl(_) => false,
            Self::UnsupportedScheme(_) => false,
            Self::MissingLocation => false,
            Self::Subprocess(_) => false,
            Self::LocalFile(_) => false,
            Self::Io(_) => false,
            Self::Http { retriable, .. } => *retriable,

            Self::Tls(_) => true,
            Self::ConnectTimeout => true,
            Self::RequestTimeout => true,
            Self::Transport(_) => true,
        }
    }

    /// TLS/certificate failures get one verification downgrade per fetcher
    /// lifetime before they count as ordinary transport errors.
    pub fn is_tls(&self) -> bool {
        matches!(self, Self::Tls(_))
    }

    pub fn from_reqwest(err: reqwest::Error) -> Self {
        // reqwest has no dedicated TLS variant; certificate and handshake
        // failures surface as connect errors whose source chain mentions
        // the TLS backend.
        let chain = error_chain(&err);
        if chain.contains("certificate")
            || chain.contains("handshake")
            || chain.contains("tls")
            || chain.contains("ssl")
        {
            return Self::Tls(chain);
        }
        if err.is_timeout() {
            if err.is_connect() {
                return Self::ConnectTimeout;
            }
            return Self::RequestTimeout;
        }
        if let Some(status) = err.status() {
            return Self::Http {
                status,
                retriable: status.is_server_error(),
            };
        }
        Self::Transport(err.to_string())
    }
}

fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut parts = vec![err.to_string().to_lowercase()];
    let mut source = err.source();
    while let Some(inner) = source {
        parts.push(inner.to_string().to_lowercase());
        source = inner.source();
    }
    parts.join(": ")
}
