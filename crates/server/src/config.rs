use clap::Parser;
use qbr_core::SubstitutionPolicy;

/// HTTP service that merges QBR report fields into PPTX templates.
#[derive(Parser, Debug, Clone)]
#[command(name = "qbr-server")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Address to bind
    #[arg(long, env = "QBR_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "QBR_PORT", default_value_t = 5000)]
    pub port: u16,

    /// Largest accepted request body, in megabytes
    #[arg(long, env = "QBR_MAX_BODY_MB", default_value_t = 50)]
    pub max_body_mb: usize,

    /// Placeholder matching for shape text: whole-text or per-run
    #[arg(long, env = "QBR_POLICY", default_value = "whole-text")]
    pub policy: SubstitutionPolicy,
}

impl Config {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn max_body_bytes(&self) -> usize {
        self.max_body_mb.saturating_mul(1024 * 1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::parse_from(["qbr-server"]);
        assert_eq!(config.bind_addr(), "0.0.0.0:5000");
        assert_eq!(config.max_body_bytes(), 50 * 1024 * 1024);
        assert_eq!(config.policy, SubstitutionPolicy::WholeText);
    }

    #[test]
    fn test_flags() {
        let config = Config::parse_from([
            "qbr-server",
            "--host",
            "127.0.0.1",
            "-p",
            "8080",
            "--policy",
            "per-run",
        ]);
        assert_eq!(config.bind_addr(), "127.0.0.1:8080");
        assert_eq!(config.policy, SubstitutionPolicy::PerRun);
    }
}
