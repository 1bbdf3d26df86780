use anyhow::Result;
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub cloudinary: CloudinaryConfig,
    pub generator: GeneratorConfig,
    pub free_plan_limit: i32,
    pub pro_plan_limit: i32,
    pub max_images_per_request: usize,
    pub temp_image_ttl_secs: i64,
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneratorConfig {
    pub mode: GeneratorMode,
    pub replicate_api_token: String,
    pub model: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorMode {
    Live,
    Demo,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Config {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgresql://localhost/jewelryai".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            cloudinary: CloudinaryConfig {
                cloud_name: env::var("CLOUDINARY_CLOUD_NAME")
                    .unwrap_or_else(|_| "demo".to_string()),
                api_key: env::var("CLOUDINARY_API_KEY").unwrap_or_default(),
                api_secret: env::var("CLOUDINARY_API_SECRET").unwrap_or_default(),
            },
            generator: GeneratorConfig {
                mode: match env::var("GENERATOR_MODE").as_deref() {
                    Ok("demo") => GeneratorMode::Demo,
                    _ => GeneratorMode::Live,
                },
                replicate_api_token: env::var("REPLICATE_API_TOKEN").unwrap_or_default(),
                model: env::var("GENERATION_MODEL")
                    .unwrap_or_else(|_| "bria/generate-background".to_string()),
            },
            free_plan_limit: env::var("FREE_PLAN_LIMIT")
                .unwrap_or_else(|_| "12".to_string())
                .parse()?,
            pro_plan_limit: env::var("PRO_PLAN_LIMIT")
                .unwrap_or_else(|_| "60".to_string())
                .parse()?,
            max_images_per_request: env::var("MAX_IMAGES_PER_REQUEST")
                .unwrap_or_else(|_| "4".to_string())
                .parse()?,
            temp_image_ttl_secs: env::var("TEMP_IMAGE_TTL_SECS")
                .unwrap_or_else(|_| "7200".to_string()) // 2 hours
                .parse()?,
            sweep_interval_secs: env::var("SWEEP_INTERVAL_SECS")
                .unwrap_or_else(|_| "900".to_string()) // 15 minutes
                .parse()?,
        })
    }
}
