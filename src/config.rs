use anyhow::Context;
use chrono::FixedOffset;
use std::env;
use std::net::SocketAddr;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub rust_log: String,
    pub bind_addr: SocketAddr,
    /// Public base URL, used to build the links the auth service emails out.
    pub site_url: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub openai_model: String,
    pub allowed_origins: Vec<String>,
    pub display_offset: FixedOffset,
    pub run_migrations: bool,
    pub secure_cookies: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "debug".into());
        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".into())
            .parse()
            .context("BIND_ADDR is not a socket address")?;
        let site_url = env::var("SITE_URL").unwrap_or_else(|_| "http://localhost:3000".into());
        let supabase_url = env::var("SUPABASE_URL").context("SUPABASE_URL should be provided")?;
        let supabase_anon_key =
            env::var("SUPABASE_ANON_KEY").context("SUPABASE_ANON_KEY should be provided")?;
        let openai_api_key =
            env::var("OPENAI_API_KEY").context("OPENAI_API_KEY should be provided")?;
        let openai_base_url = env::var("OPENAI_BASE_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".into());
        let openai_model = env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-3.5-turbo".into());
        let allowed_origins = parse_origins(&env::var("ALLOWED_ORIGINS").unwrap_or_default());
        let display_offset = env::var("DISPLAY_UTC_OFFSET")
            .unwrap_or_else(|_| "+08:00".into())
            .parse::<FixedOffset>()
            .context("DISPLAY_UTC_OFFSET should look like +08:00")?;
        let run_migrations = parse_flag(env::var("RUN_MIGRATIONS").ok().as_deref(), true);
        let secure_cookies = parse_flag(env::var("SECURE_COOKIES").ok().as_deref(), false);

        Ok(Self {
            database_url,
            rust_log,
            bind_addr,
            site_url: site_url.trim_end_matches('/').to_string(),
            supabase_url: supabase_url.trim_end_matches('/').to_string(),
            supabase_anon_key,
            openai_api_key,
            openai_base_url: openai_base_url.trim_end_matches('/').to_string(),
            openai_model,
            allowed_origins,
            display_offset,
            run_migrations,
            secure_cookies,
        })
    }
}

pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|origin| origin.trim().trim_end_matches('/'))
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_flag(raw: Option<&str>, default: bool) -> bool {
    match raw.map(|v| v.trim().to_ascii_lowercase()) {
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => true,
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => false,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origins_are_trimmed_and_empties_dropped() {
        let origins = parse_origins(" https://carecard.app/ ,http://localhost:5173,, ");
        assert_eq!(origins, vec!["https://carecard.app", "http://localhost:5173"]);
    }

    #[test]
    fn empty_origin_list() {
        assert!(parse_origins("").is_empty());
    }

    #[test]
    fn flags_fall_back_to_default() {
        assert!(parse_flag(None, true));
        assert!(!parse_flag(Some("off"), true));
        assert!(parse_flag(Some("TRUE"), false));
        assert!(!parse_flag(Some("maybe"), false));
    }
}
