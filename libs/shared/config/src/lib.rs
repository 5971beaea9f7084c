use std::env;
use std::str::FromStr;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    pub host: String,
    pub port: u16,
    pub default_timezone: String,
    pub max_patient_daily_appointments: u32,
    pub default_session_minutes: i32,
    pub default_tax_rate: f64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            supabase_jwt_secret: String::new(),
            host: "0.0.0.0".to_string(),
            port: 3000,
            default_timezone: "UTC".to_string(),
            max_patient_daily_appointments: 3,
            default_session_minutes: 30,
            default_tax_rate: 0.15,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            host: env::var("API_HOST").unwrap_or(defaults.host),
            port: parse_var("API_PORT", defaults.port),
            default_timezone: env::var("DEFAULT_TIMEZONE").unwrap_or(defaults.default_timezone),
            max_patient_daily_appointments: parse_var(
                "MAX_APPOINTMENTS_PER_PATIENT_PER_DAY",
                defaults.max_patient_daily_appointments,
            ),
            default_session_minutes: parse_var("DEFAULT_SESSION_MINUTES", defaults.default_session_minutes),
            default_tax_rate: parse_var("DEFAULT_TAX_RATE", defaults.default_tax_rate),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} has an invalid value '{}', using default", name, raw);
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_not_configured() {
        let config = AppConfig::default();
        assert!(!config.is_configured());
        assert_eq!(config.port, 3000);
        assert_eq!(config.bind_address(), "0.0.0.0:3000");
    }

    #[test]
    fn parse_var_falls_back_on_garbage() {
        env::set_var("CLINIC_TEST_BAD_PORT", "not-a-number");
        let port: u16 = parse_var("CLINIC_TEST_BAD_PORT", 8080);
        assert_eq!(port, 8080);
        env::remove_var("CLINIC_TEST_BAD_PORT");
    }
}
