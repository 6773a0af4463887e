//! Application configuration
//!
//! Settings are read from environment variables, with CLI flags taking
//! precedence. Collaborator credentials are optional: when a credential is
//! absent the corresponding client degrades to a soft-failing stub so the
//! server still starts for local development.

use clap::Parser;

/// Server settings, one instance created at startup.
#[derive(Debug, Clone, Parser)]
#[command(name = "compass-server", version, about)]
pub struct Settings {
    /// Address to bind the HTTP/WebSocket server to
    #[arg(long, env = "API_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "API_PORT", default_value_t = 8000)]
    pub port: u16,

    /// Allowed CORS origins (comma separated); empty means allow any
    #[arg(long, env = "CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Vec<String>,

    /// Log level filter (error, warn, info, debug, trace)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Anthropic API key for the analysis agents
    #[arg(long, env = "ANTHROPIC_API_KEY")]
    pub anthropic_api_key: Option<String>,

    /// Claude model used by all agents
    #[arg(long, env = "CLAUDE_MODEL", default_value = "claude-3-5-sonnet-20241022")]
    pub claude_model: String,

    /// Max tokens per LLM completion
    #[arg(long, env = "MAX_TOKENS", default_value_t = 4096)]
    pub max_tokens: u32,

    /// Supabase project URL; unset falls back to the in-memory store
    #[arg(long, env = "SUPABASE_URL")]
    pub supabase_url: Option<String>,

    /// Supabase service key
    #[arg(long, env = "SUPABASE_SERVICE_KEY")]
    pub supabase_key: Option<String>,

    /// SendGrid API key for report delivery email
    #[arg(long, env = "SENDGRID_API_KEY")]
    pub sendgrid_api_key: Option<String>,

    /// From address on outbound email
    #[arg(long, env = "FROM_EMAIL", default_value = "noreply@bluepeak.ai")]
    pub from_email: String,

    /// Slack incoming-webhook URL for report delivery
    #[arg(long, env = "SLACK_WEBHOOK_URL")]
    pub slack_webhook_url: Option<String>,
}

impl Settings {
    /// Settings suitable for tests: ephemeral port, no collaborator credentials.
    ///
    /// Credentials are cleared explicitly: parsing honors the `env`
    /// attributes, so real keys in the test environment would otherwise
    /// leak in and make tests environment-dependent.
    pub fn for_tests() -> Self {
        let mut settings = Self::parse_from(["compass-server", "--host", "127.0.0.1", "--port", "0"]);
        settings.anthropic_api_key = None;
        settings.supabase_url = None;
        settings.supabase_key = None;
        settings.sendgrid_api_key = None;
        settings.slack_webhook_url = None;
        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::parse_from(["compass-server"]);
        assert_eq!(settings.port, 8000);
        assert_eq!(settings.host, "0.0.0.0");
        assert_eq!(settings.claude_model, "claude-3-5-sonnet-20241022");
        assert!(settings.cors_origins.is_empty());
        assert!(settings.supabase_url.is_none());
    }

    #[test]
    fn test_for_tests_ignores_ambient_credentials() {
        std::env::set_var("ANTHROPIC_API_KEY", "sk-ambient");
        let settings = Settings::for_tests();
        std::env::remove_var("ANTHROPIC_API_KEY");

        assert!(settings.anthropic_api_key.is_none());
        assert!(settings.sendgrid_api_key.is_none());
        assert_eq!(settings.host, "127.0.0.1");
    }

    #[test]
    fn test_cors_origins_comma_separated() {
        let settings = Settings::parse_from([
            "compass-server",
            "--cors-origins",
            "http://localhost:3000,http://localhost:8000",
        ]);
        assert_eq!(settings.cors_origins.len(), 2);
        assert_eq!(settings.cors_origins[0], "http://localhost:3000");
    }
}
