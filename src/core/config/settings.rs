use super::parsing::{
    env_optional, env_or_default, is_supported_receipt_extension, parse_bool, parse_cors_origins,
    parse_environment, parse_i64, parse_string_list, parse_u16, parse_u32, parse_u64,
    trim_trailing_slash,
};
use super::secret::load_or_create_secret_key;
use super::types::{
    AdminSettings, ApiSettings, ConfigError, CorsSettings, DatabaseSettings, EmailSettings,
    GamificationSettings, RedisSettings, RuntimeSettings, S3Settings, SecuritySettings, ServerHost,
    ServerPort, ServerSettings, Settings, StorageSettings, TelemetrySettings,
};

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let host = env_or_default("NEXUS_HOST", "0.0.0.0");
        let port = env_or_default("NEXUS_PORT", "8000");

        let environment =
            parse_environment(env_optional("NEXUS_ENV").or_else(|| env_optional("ENVIRONMENT")));
        let strict_config =
            env_optional("NEXUS_STRICT_CONFIG").map(|value| parse_bool(&value)).unwrap_or(false)
                || environment.is_production();

        let project_name = env_or_default("PROJECT_NAME", "Nexus4D API");
        let version = env_or_default("VERSION", env!("CARGO_PKG_VERSION"));
        let api_v1_str = env_or_default("API_V1_STR", "/api/v1");
        let client_base_url =
            trim_trailing_slash(env_or_default("CLIENT_BASE_URL", "http://localhost:5173"));

        let secret_key = match env_optional("SECRET_KEY") {
            Some(value) => value,
            None if strict_config => return Err(ConfigError::MissingSecret("SECRET_KEY")),
            None => load_or_create_secret_key(),
        };

        let access_token_expire_minutes = parse_u64(
            "ACCESS_TOKEN_EXPIRE_MINUTES",
            env_or_default("ACCESS_TOKEN_EXPIRE_MINUTES", "10080"),
        )?;
        let algorithm = env_or_default("ALGORITHM", "HS256");
        let login_rate_limit =
            parse_u64("LOGIN_RATE_LIMIT", env_or_default("LOGIN_RATE_LIMIT", "10"))?;
        let login_rate_window_seconds = parse_u64(
            "LOGIN_RATE_WINDOW_SECONDS",
            env_or_default("LOGIN_RATE_WINDOW_SECONDS", "60"),
        )?;

        let cors_origins = parse_cors_origins(env_optional("BACKEND_CORS_ORIGINS"))?;

        let postgres_server = env_or_default("POSTGRES_SERVER", "localhost");
        let postgres_port = parse_u16("POSTGRES_PORT", env_or_default("POSTGRES_PORT", "5432"))?;
        let postgres_user = env_or_default("POSTGRES_USER", "nexus");
        let postgres_password = env_or_default("POSTGRES_PASSWORD", "");
        let postgres_db = env_or_default("POSTGRES_DB", "nexus4d");
        let database_url = env_optional("DATABASE_URL");
        let max_connections =
            parse_u32("DATABASE_MAX_CONNECTIONS", env_or_default("DATABASE_MAX_CONNECTIONS", "20"))?;

        let redis_host = env_or_default("REDIS_HOST", "localhost");
        let redis_port = parse_u16("REDIS_PORT", env_or_default("REDIS_PORT", "6379"))?;
        let redis_db = parse_u16("REDIS_DB", env_or_default("REDIS_DB", "0"))?;
        let redis_password = env_or_default("REDIS_PASSWORD", "");

        let max_upload_size_mb =
            parse_u64("MAX_UPLOAD_SIZE_MB", env_or_default("MAX_UPLOAD_SIZE_MB", "10"))?;
        let allowed_receipt_extensions = parse_string_list(
            env_optional("ALLOWED_RECEIPT_EXTENSIONS"),
            &["jpg", "jpeg", "png", "webp"],
        );

        let s3_endpoint = env_or_default("S3_ENDPOINT", "");
        let s3_access_key = env_or_default("S3_ACCESS_KEY", "");
        let s3_secret_key = env_or_default("S3_SECRET_KEY", "");
        let s3_bucket = env_or_default("S3_BUCKET", "nexus4d-uploads");
        let s3_region = env_or_default("S3_REGION", "auto");
        let s3_public_base_url = trim_trailing_slash(env_or_default("S3_PUBLIC_BASE_URL", ""));

        let smtp_host = env_or_default("SMTP_HOST", "");
        let smtp_port = parse_u16("SMTP_PORT", env_or_default("SMTP_PORT", "587"))?;
        let smtp_user = env_or_default("SMTP_USER", "");
        let smtp_password = env_or_default("SMTP_PASSWORD", "");
        let smtp_from = env_or_default("SMTP_FROM", "Nexus4D <no-reply@nexus4d.com>");

        let xp_per_level = parse_i64("XP_PER_LEVEL", env_or_default("XP_PER_LEVEL", "500"))?;

        let first_superuser_email = env_or_default("FIRST_SUPERUSER_EMAIL", "admin@nexus4d.com");
        let first_superuser_password = env_or_default("FIRST_SUPERUSER_PASSWORD", "");

        let log_level = env_or_default("NEXUS_LOG_LEVEL", "info");
        let json = env_optional("NEXUS_LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);
        let prometheus_enabled =
            env_optional("PROMETHEUS_ENABLED").map(|value| parse_bool(&value)).unwrap_or(false);

        let settings = Self {
            server: ServerSettings {
                host: ServerHost::parse(host)?,
                port: ServerPort::parse(port)?,
            },
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings { project_name, version, api_v1_str, client_base_url },
            security: SecuritySettings {
                secret_key,
                access_token_expire_minutes,
                algorithm,
                login_rate_limit,
                login_rate_window_seconds,
            },
            cors: CorsSettings { origins: cors_origins },
            database: DatabaseSettings {
                postgres_server,
                postgres_port,
                postgres_user,
                postgres_password,
                postgres_db,
                database_url,
                max_connections,
            },
            redis: RedisSettings {
                host: redis_host,
                port: redis_port,
                db: redis_db,
                password: redis_password,
            },
            storage: StorageSettings { max_upload_size_mb, allowed_receipt_extensions },
            s3: S3Settings {
                endpoint: s3_endpoint,
                access_key: s3_access_key,
                secret_key: s3_secret_key,
                bucket: s3_bucket,
                region: s3_region,
                public_base_url: s3_public_base_url,
            },
            email: EmailSettings {
                smtp_host,
                smtp_port,
                smtp_user,
                smtp_password,
                from_address: smtp_from,
            },
            gamification: GamificationSettings { xp_per_level },
            admin: AdminSettings { first_superuser_email, first_superuser_password },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()?;
        Ok(settings)
    }

    pub(crate) fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host.0, self.server.port.0)
    }

    pub(crate) fn server_host(&self) -> &str {
        &self.server.host.0
    }

    pub(crate) fn server_port(&self) -> u16 {
        self.server.port.0
    }

    pub(crate) fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub(crate) fn security(&self) -> &SecuritySettings {
        &self.security
    }

    pub(crate) fn cors(&self) -> &CorsSettings {
        &self.cors
    }

    pub(crate) fn database(&self) -> &DatabaseSettings {
        &self.database
    }

    pub(crate) fn redis(&self) -> &RedisSettings {
        &self.redis
    }

    pub(crate) fn storage(&self) -> &StorageSettings {
        &self.storage
    }

    pub(crate) fn s3(&self) -> &S3Settings {
        &self.s3
    }

    pub(crate) fn email(&self) -> &EmailSettings {
        &self.email
    }

    pub(crate) fn gamification(&self) -> &GamificationSettings {
        &self.gamification
    }

    pub(crate) fn admin(&self) -> &AdminSettings {
        &self.admin
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.allowed_receipt_extensions.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "ALLOWED_RECEIPT_EXTENSIONS",
                value: String::from("<empty>"),
            });
        }

        for extension in &self.storage.allowed_receipt_extensions {
            if !is_supported_receipt_extension(extension) {
                return Err(ConfigError::InvalidValue {
                    field: "ALLOWED_RECEIPT_EXTENSIONS",
                    value: extension.clone(),
                });
            }
        }

        if self.storage.max_upload_size_mb == 0 {
            return Err(ConfigError::InvalidValue {
                field: "MAX_UPLOAD_SIZE_MB",
                value: "0".to_string(),
            });
        }

        if self.gamification.xp_per_level <= 0 {
            return Err(ConfigError::InvalidValue {
                field: "XP_PER_LEVEL",
                value: self.gamification.xp_per_level.to_string(),
            });
        }

        if self.security.login_rate_window_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "LOGIN_RATE_WINDOW_SECONDS",
                value: "0".to_string(),
            });
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if self.database.database_url.is_none() && self.database.postgres_password.is_empty() {
            return Err(ConfigError::MissingSecret("POSTGRES_PASSWORD"));
        }
        if self.s3.endpoint.is_empty() {
            return Err(ConfigError::MissingSecret("S3_ENDPOINT"));
        }
        if self.s3.access_key.is_empty() || self.s3.secret_key.is_empty() {
            return Err(ConfigError::MissingSecret("S3_ACCESS_KEY/S3_SECRET_KEY"));
        }
        if self.s3.public_base_url.is_empty() {
            return Err(ConfigError::MissingSecret("S3_PUBLIC_BASE_URL"));
        }
        if self.email.is_enabled() && self.email.smtp_password.is_empty() {
            return Err(ConfigError::MissingSecret("SMTP_PASSWORD"));
        }
        if self.admin.first_superuser_password.is_empty() {
            return Err(ConfigError::MissingSecret("FIRST_SUPERUSER_PASSWORD"));
        }

        Ok(())
    }
}
