use std::path::Path;

pub type SunlapseResult<T> = Result<T, SunlapseError>;

#[derive(thiserror::Error, Debug)]
pub enum SunlapseError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("solar data unavailable for {date}: {reason}")]
    SolarDataUnavailable {
        date: chrono::NaiveDate,
        reason: String,
    },

    #[error("invalid curve geometry: {0}")]
    InvalidCurveGeometry(String),

    #[error("frame synthesis failed for intensity {intensity}: {source}")]
    FrameSynthesis {
        intensity: u8,
        #[source]
        source: image::ImageError,
    },

    #[error("encoding error: ffmpeg exited with status {status}: {stderr}")]
    Encoding { status: String, stderr: String },

    #[error("io error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SunlapseError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn solar_unavailable(date: chrono::NaiveDate, reason: impl Into<String>) -> Self {
        Self::SolarDataUnavailable {
            date,
            reason: reason.into(),
        }
    }

    pub fn geometry(msg: impl Into<String>) -> Self {
        Self::InvalidCurveGeometry(msg.into())
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Shorthand for the common "`op` '`path`'" I/O context.
    pub fn io_at(op: &str, path: &Path, source: std::io::Error) -> Self {
        Self::io(format!("{op} '{}'", path.display()), source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            SunlapseError::validation("x")
                .to_string()
                .contains("validation error:")
        );
        assert!(
            SunlapseError::geometry("x")
                .to_string()
                .contains("invalid curve geometry:")
        );
        let date = chrono::NaiveDate::from_ymd_opt(2018, 6, 21).unwrap();
        assert_eq!(
            SunlapseError::solar_unavailable(date, "polar day").to_string(),
            "solar data unavailable for 2018-06-21: polar day"
        );
    }

    #[test]
    fn io_carries_context_and_source() {
        let err = SunlapseError::io_at(
            "create dir",
            Path::new("a/b"),
            std::io::Error::other("boom"),
        );
        let msg = err.to_string();
        assert!(msg.contains("create dir 'a/b'"));
        assert!(msg.contains("boom"));
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = SunlapseError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
