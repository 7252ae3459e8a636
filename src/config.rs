//! Server configuration, read from the command line or the environment.

use crate::graph::ChartOptions;
use clap::Parser;
use std::time::Duration;

#[derive(Clone, Debug, Parser)]
#[command(name = "website", about = "Upload a CSV or Excel file and explore it in the browser")]
pub struct Config {
    /// Address to listen on
    #[arg(long, env = "ANALYZER_HOST", default_value = "127.0.0.1")]
    pub host: String,

    #[arg(long, env = "ANALYZER_PORT", default_value_t = 3000)]
    pub port: u16,

    /// Largest accepted upload, in MiB
    #[arg(long, env = "ANALYZER_MAX_UPLOAD_MB", default_value_t = 200)]
    pub max_upload_mb: usize,

    #[arg(long, default_value_t = 800)]
    pub chart_width: u32,

    #[arg(long, default_value_t = 600)]
    pub chart_height: u32,

    /// Rows shown in table previews
    #[arg(long, default_value_t = 5)]
    pub preview_rows: usize,

    /// Idle time after which a session and its table are dropped, in seconds
    #[arg(long, env = "ANALYZER_SESSION_TTL", default_value_t = 24 * 60 * 60)]
    pub session_ttl: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: "127.0.0.1".to_string(),
            port: 3000,
            max_upload_mb: 200,
            chart_width: 800,
            chart_height: 600,
            preview_rows: 5,
            session_ttl: 24 * 60 * 60,
        }
    }
}

impl Config {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb * 1024 * 1024
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl)
    }

    pub fn chart_options(&self) -> ChartOptions {
        ChartOptions {
            width: self.chart_width,
            height: self.chart_height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parsed_defaults_match_default() {
        let parsed = Config::parse_from(["website"]);
        let default = Config::default();
        assert_eq!(parsed.port, default.port);
        assert_eq!(parsed.max_upload_mb, default.max_upload_mb);
        assert_eq!(parsed.session_ttl, default.session_ttl);
        assert_eq!(default.address(), "127.0.0.1:3000");
        assert_eq!(default.chart_options(), ChartOptions::default());
    }
}
