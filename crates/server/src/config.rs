//! Command line and environment configuration of the server.

use std::io;
use std::path::PathBuf;

use clap::Parser;
use fitchat_openai_model::{
    DEFAULT_BASE_URL, DEFAULT_MODEL, OpenAIConfig, OpenAIConfigBuilder,
};

/// Command line and environment configuration of the server.
#[derive(Debug, Parser)]
#[command(name = "fitchat-server", about = "Health and wellbeing chat relay")]
pub struct ServerArgs {
    /// Address to listen on.
    #[arg(long, env = "FITCHAT_HTTP_ADDR", default_value = "127.0.0.1:3000")]
    pub http_addr: String,

    /// API key of the completion service.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Base URL of the OpenAI-compatible completion service.
    #[arg(long, env = "OPENAI_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Model to request completions from.
    #[arg(long, env = "OPENAI_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Replaces the built-in system prompt with the content of this file.
    #[arg(long, env = "FITCHAT_SYSTEM_PROMPT_FILE")]
    pub system_prompt_file: Option<PathBuf>,
}

impl ServerArgs {
    /// Builds the completion service configuration.
    pub fn openai_config(&self) -> OpenAIConfig {
        OpenAIConfigBuilder::with_api_key(&self.api_key)
            .with_base_url(&self.base_url)
            .with_model(&self.model)
            .build()
    }

    /// Reads the system prompt override, if configured.
    pub fn load_system_prompt(&self) -> io::Result<Option<String>> {
        let Some(path) = &self.system_prompt_file else {
            return Ok(None);
        };
        let prompt = std::fs::read_to_string(path)?;
        Ok(Some(prompt.trim().to_owned()))
    }
}
